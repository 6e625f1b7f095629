// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{fmt, str::FromStr};

use serde::Deserialize;

use crate::error::{Error, Result};

/// The number of channels in a fixture.
pub const CHANNEL_COUNT: usize = 4;

/// The default maximum brightness of a channel (8 bit).
pub const DEFAULT_MAX_BRIGHTNESS: u32 = 255;

/// A color slot of the fixture. The discriminant is the channel index, which is
/// observable through every multi-channel interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red = 0,
    Green = 1,
    Blue = 2,
    White = 3,
}

impl Color {
    /// All colors in channel order.
    pub const ALL: [Color; CHANNEL_COUNT] = [Color::Red, Color::Green, Color::Blue, Color::White];

    /// Gets the channel index of this color.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Gets the color for the given channel index.
    pub fn from_index(index: usize) -> Option<Color> {
        Color::ALL.get(index).copied()
    }

    /// Gets the lowercase name of the color.
    pub fn name(self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Green => "green",
            Color::Blue => "blue",
            Color::White => "white",
        }
    }

    /// Gets the capitalized label used in reports.
    pub fn label(self) -> &'static str {
        match self {
            Color::Red => "Red",
            Color::Green => "Green",
            Color::Blue => "Blue",
            Color::White => "White",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Color {
    type Err = Error;

    fn from_str(s: &str) -> Result<Color> {
        match s.trim().to_ascii_lowercase().as_str() {
            "red" => Ok(Color::Red),
            "green" => Ok(Color::Green),
            "blue" => Ok(Color::Blue),
            "white" => Ok(Color::White),
            other => Err(Error::InvalidFormat(format!("unknown color {:?}", other))),
        }
    }
}

/// How a channel's duty cycle is realized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// A hardware PWM peripheral.
    HardPwm,
    /// Software toggling of a digital line.
    SoftPwm,
}

impl ChannelKind {
    pub fn name(self) -> &'static str {
        match self {
            ChannelKind::HardPwm => "hard_pwm",
            ChannelKind::SoftPwm => "soft_pwm",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChannelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<ChannelKind> {
        match s.trim() {
            "hard_pwm" => Ok(ChannelKind::HardPwm),
            "soft_pwm" => Ok(ChannelKind::SoftPwm),
            other => Err(Error::InvalidFormat(format!("unknown channel kind {:?}", other))),
        }
    }
}

/// Caller-supplied properties of a channel, copied into the fixture on creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelProperties {
    /// Initial brightness.
    pub brightness: u32,
    /// Maximum brightness. Must be at least 1.
    pub max_brightness: u32,
    /// The channel kind. `None` means the caller could not supply a valid kind.
    pub kind: Option<ChannelKind>,
}

impl ChannelProperties {
    pub fn new(brightness: u32, max_brightness: u32, kind: ChannelKind) -> ChannelProperties {
        ChannelProperties {
            brightness,
            max_brightness,
            kind: Some(kind),
        }
    }

    /// The typical layout: hardware PWM for red, green and blue, software PWM for white,
    /// all dark at 8 bit resolution.
    pub fn typical() -> [ChannelProperties; CHANNEL_COUNT] {
        Color::ALL.map(|color| {
            let kind = if color == Color::White {
                ChannelKind::SoftPwm
            } else {
                ChannelKind::HardPwm
            };
            ChannelProperties::new(0, DEFAULT_MAX_BRIGHTNESS, kind)
        })
    }
}

/// The live state of a single channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channel {
    /// Current brightness, `0..=max_brightness`.
    brightness: u32,
    /// Maximum brightness, fixed after creation.
    max_brightness: u32,
    kind: ChannelKind,
    /// A suspended channel is pushed to the backend as off.
    suspended: bool,
    /// Scratch counter private to the running effect.
    pub(crate) cntr: u32,
}

impl Channel {
    /// Creates a channel. Brightness above the maximum is clamped.
    pub(crate) fn new(brightness: u32, max_brightness: u32, kind: ChannelKind) -> Channel {
        Channel {
            brightness: brightness.min(max_brightness),
            max_brightness,
            kind,
            suspended: false,
            cntr: 0,
        }
    }

    pub fn brightness(&self) -> u32 {
        self.brightness
    }

    pub fn max_brightness(&self) -> u32 {
        self.max_brightness
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Sets the brightness, failing if it exceeds the maximum.
    pub(crate) fn set_brightness(&mut self, brightness: u32) -> Result<()> {
        if brightness > self.max_brightness {
            return Err(Error::InvalidValue(format!(
                "brightness {} exceeds maximum {}",
                brightness, self.max_brightness
            )));
        }
        self.brightness = brightness;
        Ok(())
    }

    /// Sets the brightness, saturating at the maximum. Used by effects, which always
    /// compute values in range.
    pub(crate) fn set_brightness_saturating(&mut self, brightness: u32) {
        self.brightness = brightness.min(self.max_brightness);
    }

    pub(crate) fn set_suspended(&mut self, suspended: bool) {
        self.suspended = suspended;
    }

    /// The brightness that should be pushed to the backend.
    pub fn output_brightness(&self) -> u32 {
        if self.suspended {
            0
        } else {
            self.brightness
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_color_parse() {
        assert_eq!(Color::Red, "red".parse().unwrap());
        assert_eq!(Color::White, " WHITE\n".parse().unwrap());
        assert!(matches!(
            "purple".parse::<Color>(),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_color_indices() {
        for (i, color) in Color::ALL.iter().enumerate() {
            assert_eq!(i, color.index());
            assert_eq!(Some(*color), Color::from_index(i));
        }
        assert_eq!(None, Color::from_index(4));
    }

    #[test]
    fn test_channel_brightness_bounds() {
        let mut channel = Channel::new(0, 100, ChannelKind::HardPwm);
        assert!(channel.set_brightness(100).is_ok());
        assert_eq!(100, channel.brightness());

        assert!(matches!(
            channel.set_brightness(101),
            Err(Error::InvalidValue(_))
        ));
        assert_eq!(100, channel.brightness());

        channel.set_brightness_saturating(500);
        assert_eq!(100, channel.brightness());
    }

    #[test]
    fn test_channel_clamped_on_creation() {
        let channel = Channel::new(300, 255, ChannelKind::SoftPwm);
        assert_eq!(255, channel.brightness());
    }

    #[test]
    fn test_suspended_output() {
        let mut channel = Channel::new(42, 255, ChannelKind::HardPwm);
        assert_eq!(42, channel.output_brightness());
        channel.set_suspended(true);
        assert_eq!(0, channel.output_brightness());
        assert_eq!(42, channel.brightness());
        channel.set_suspended(false);
        assert_eq!(42, channel.output_brightness());
    }

    #[test]
    fn test_typical_layout() {
        let props = ChannelProperties::typical();
        assert_eq!(Some(ChannelKind::HardPwm), props[Color::Red.index()].kind);
        assert_eq!(Some(ChannelKind::SoftPwm), props[Color::White.index()].kind);
        assert!(props.iter().all(|p| p.max_brightness == 255));
    }
}
