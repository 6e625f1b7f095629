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
use std::{fmt, io, time::Duration};

use crate::channel::{ChannelKind, Color, CHANNEL_COUNT};

pub mod dryrun;
#[cfg(test)]
pub(crate) mod mock;
pub mod pwm;
pub mod softpwm;

/// The sink a fixture pushes channel state into.
pub trait Backend: Send + Sync {
    /// Programs the output for the given channel. The duty cycle is linear:
    /// `brightness / max_brightness`. Applying the same values twice is harmless.
    fn apply(&self, channel: Color, brightness: u32, max_brightness: u32) -> io::Result<()>;

    /// Gets the kind of output that drives the given channel.
    fn kind(&self, channel: Color) -> ChannelKind;
}

/// A duty cycle expressed as a ratio of brightness to maximum brightness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Duty {
    brightness: u32,
    max_brightness: u32,
}

impl Duty {
    /// Fully off.
    pub const OFF: Duty = Duty {
        brightness: 0,
        max_brightness: 1,
    };

    /// Creates a duty cycle. A zero maximum is treated as off, brightness above the
    /// maximum as fully on.
    pub fn new(brightness: u32, max_brightness: u32) -> Duty {
        if max_brightness == 0 {
            return Duty::OFF;
        }
        Duty {
            brightness: brightness.min(max_brightness),
            max_brightness,
        }
    }

    pub fn is_off(&self) -> bool {
        self.brightness == 0
    }

    pub fn is_full(&self) -> bool {
        self.brightness == self.max_brightness
    }

    /// The duty cycle as a fraction in `0.0..=1.0`.
    pub fn fraction(&self) -> f64 {
        f64::from(self.brightness) / f64::from(self.max_brightness)
    }

    /// Scales a period in nanoseconds by the duty cycle.
    pub fn scale_ns(&self, period_ns: u64) -> u64 {
        let scaled = u128::from(period_ns) * u128::from(self.brightness)
            / u128::from(self.max_brightness);
        // Never larger than period_ns.
        scaled as u64
    }

    /// Splits a period into its on and off times.
    pub fn split(&self, period: Duration) -> (Duration, Duration) {
        let period_ns = u64::try_from(period.as_nanos()).unwrap_or(u64::MAX);
        let on = Duration::from_nanos(self.scale_ns(period_ns));
        (on, period.saturating_sub(on))
    }
}

impl fmt::Display for Duty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}%", self.fraction() * 100.0)
    }
}

/// A single physical output: one PWM channel or one software modulated line.
pub trait Output: fmt::Display + Send + Sync {
    /// The kind of output.
    fn kind(&self) -> ChannelKind;

    /// Programs the duty cycle.
    fn set_duty(&self, duty: Duty) -> io::Result<()>;
}

/// The four-slot backend: one output per color, in channel order.
pub struct Outputs {
    slots: [Box<dyn Output>; CHANNEL_COUNT],
}

impl Outputs {
    /// Creates a backend from outputs ordered red, green, blue, white.
    pub fn new(slots: [Box<dyn Output>; CHANNEL_COUNT]) -> Outputs {
        Outputs { slots }
    }

    fn slot(&self, channel: Color) -> &dyn Output {
        self.slots[channel.index()].as_ref()
    }
}

impl Backend for Outputs {
    fn apply(&self, channel: Color, brightness: u32, max_brightness: u32) -> io::Result<()> {
        self.slot(channel)
            .set_duty(Duty::new(brightness, max_brightness))
    }

    fn kind(&self, channel: Color) -> ChannelKind {
        self.slot(channel).kind()
    }
}

impl fmt::Display for Outputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, color) in Color::ALL.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", color, self.slot(*color))?;
        }
        Ok(())
    }
}
