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
use std::{fmt, str::FromStr, time::Duration};

use crate::{
    channel::{Channel, Color, CHANNEL_COUNT},
    error::{Error, Result},
};

mod blink;
mod heartbeat;
mod pulse;
mod rainbow;
pub(crate) mod timer;

/// The pulse tick period.
pub const PULSE_STEP: Duration = Duration::from_millis(50);

/// The period of the blink, heartbeat and rainbow effects.
pub const BLINK_PERIOD: Duration = Duration::from_millis(750);

/// The number of pulse ticks from dark to full brightness.
pub const DEFAULT_PULSE_STEPS: u32 = 32;

/// The delay before the first tick of a freshly started effect.
pub(crate) const INITIAL_ARM: Duration = Duration::from_micros(1);

/// The kinds of effect a fixture can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    Pulse,
    Blink,
    Heartbeat,
    Rainbow,
}

impl EffectKind {
    pub const ALL: [EffectKind; 4] = [
        EffectKind::Pulse,
        EffectKind::Blink,
        EffectKind::Heartbeat,
        EffectKind::Rainbow,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EffectKind::Pulse => "pulse",
            EffectKind::Blink => "blink",
            EffectKind::Heartbeat => "heartbeat",
            EffectKind::Rainbow => "rainbow",
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EffectKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<EffectKind> {
        EffectKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s.trim())
            .ok_or_else(|| Error::InvalidFormat(format!("unknown effect {:?}", s.trim())))
    }
}

/// The running effect, if any. Only one effect can run at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Effect {
    #[default]
    None,
    /// Ramps a single color up and down.
    Pulse { color: Color },
    /// Square wave between dark and the saved values.
    Blink { phase: u8 },
    /// Double beat of the saved values followed by a rest.
    Heartbeat { phase: u8 },
    /// Rotates the RGB channels through a fixed hue palette.
    Rainbow { phase: u8 },
}

impl Effect {
    /// Creates the initial state of the given effect. Pulse requires a color.
    pub(crate) fn start(kind: EffectKind, color: Color) -> Effect {
        match kind {
            EffectKind::Pulse => Effect::Pulse { color },
            EffectKind::Blink => Effect::Blink { phase: 0 },
            EffectKind::Heartbeat => Effect::Heartbeat { phase: 0 },
            EffectKind::Rainbow => Effect::Rainbow { phase: 0 },
        }
    }

    pub fn kind(&self) -> Option<EffectKind> {
        match self {
            Effect::None => None,
            Effect::Pulse { .. } => Some(EffectKind::Pulse),
            Effect::Blink { .. } => Some(EffectKind::Blink),
            Effect::Heartbeat { .. } => Some(EffectKind::Heartbeat),
            Effect::Rainbow { .. } => Some(EffectKind::Rainbow),
        }
    }

    /// The color being pulsed, if pulse is running.
    pub fn pulse_color(&self) -> Option<Color> {
        match self {
            Effect::Pulse { color } => Some(*color),
            _ => None,
        }
    }

    /// The phase of a blink, heartbeat or rainbow effect.
    pub fn phase(&self) -> Option<u8> {
        match self {
            Effect::Blink { phase } | Effect::Heartbeat { phase } | Effect::Rainbow { phase } => {
                Some(*phase)
            }
            _ => None,
        }
    }
}

/// An argument written to the pulse control: a color to start pulsing, or stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseArg {
    Start(Color),
    Stop,
}

impl FromStr for PulseArg {
    type Err = Error;

    fn from_str(s: &str) -> Result<PulseArg> {
        match s.trim() {
            "stop" => Ok(PulseArg::Stop),
            other => other.parse().map(PulseArg::Start).map_err(|_| {
                Error::InvalidFormat(
                    "pulse only takes the arguments: [red | green | blue | white | stop]"
                        .to_string(),
                )
            }),
        }
    }
}

/// Parses the on/off argument of the blink, heartbeat and rainbow controls.
pub fn parse_toggle(s: &str) -> Result<bool> {
    let value: u64 = s
        .trim()
        .parse()
        .map_err(|_| Error::InvalidFormat(format!("expected 0 or 1, got {:?}", s.trim())))?;
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(Error::InvalidValue(format!("expected 0 or 1, got {}", other))),
    }
}

/// Tick periods of the effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Period of a pulse tick.
    pub pulse_step: Duration,
    /// Period of the blink, heartbeat and rainbow effects.
    pub blink_period: Duration,
    /// Pulse ticks from dark to full brightness.
    pub pulse_steps: u32,
}

impl Default for Timing {
    fn default() -> Self {
        Timing {
            pulse_step: PULSE_STEP,
            blink_period: BLINK_PERIOD,
            pulse_steps: DEFAULT_PULSE_STEPS,
        }
    }
}

impl Timing {
    /// The nominal tick period of an effect.
    pub fn period(&self, kind: EffectKind) -> Duration {
        match kind {
            EffectKind::Pulse => self.pulse_step,
            _ => self.blink_period,
        }
    }

    /// The settle time used by commands that push rainbow state twice.
    pub fn settle(&self) -> Duration {
        self.blink_period / 4
    }
}

/// Prepares the channels when an effect starts.
pub(crate) fn enter(effect: &Effect, channels: &mut [Channel; CHANNEL_COUNT]) {
    if let Effect::Pulse { color } = effect {
        pulse::enter(channels, *color);
    }
}

/// Advances the running effect by one tick, returning the delay until the next tick.
pub(crate) fn advance(
    effect: &mut Effect,
    channels: &mut [Channel; CHANNEL_COUNT],
    saved: &[u32; CHANNEL_COUNT],
    timing: &Timing,
) -> Option<Duration> {
    match effect {
        Effect::None => None,
        Effect::Pulse { color } => Some(pulse::tick(channels, *color, timing)),
        Effect::Blink { phase } => Some(blink::tick(channels, phase, saved, timing)),
        Effect::Heartbeat { phase } => Some(heartbeat::tick(channels, phase, saved, timing)),
        Effect::Rainbow { phase } => Some(rainbow::tick(channels, phase, timing)),
    }
}

/// Sets every channel to the given values.
fn assign(channels: &mut [Channel; CHANNEL_COUNT], values: &[u32; CHANNEL_COUNT]) {
    for (channel, value) in channels.iter_mut().zip(values) {
        channel.set_brightness_saturating(*value);
    }
}

#[cfg(test)]
pub(crate) fn test_channels(values: [u32; CHANNEL_COUNT]) -> [Channel; CHANNEL_COUNT] {
    use crate::channel::ChannelKind;

    values.map(|value| Channel::new(value, 255, ChannelKind::HardPwm))
}

#[cfg(test)]
pub(crate) fn brightness(channels: &[Channel; CHANNEL_COUNT]) -> [u32; CHANNEL_COUNT] {
    channels.map(|channel| channel.brightness())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_effect_accessors() {
        assert_eq!(None, Effect::None.kind());
        assert_eq!(None, Effect::None.pulse_color());

        let pulse = Effect::start(EffectKind::Pulse, Color::Green);
        assert_eq!(Some(EffectKind::Pulse), pulse.kind());
        assert_eq!(Some(Color::Green), pulse.pulse_color());
        assert_eq!(None, pulse.phase());

        let blink = Effect::start(EffectKind::Blink, Color::Red);
        assert_eq!(Some(EffectKind::Blink), blink.kind());
        assert_eq!(None, blink.pulse_color());
        assert_eq!(Some(0), blink.phase());
    }

    #[test]
    fn test_parse_pulse_arg() {
        assert_eq!(PulseArg::Stop, "stop\n".parse().unwrap());
        assert_eq!(PulseArg::Start(Color::Blue), "blue".parse().unwrap());
        assert!(matches!(
            "purple".parse::<PulseArg>(),
            Err(Error::InvalidFormat(_))
        ));
        assert!(matches!("".parse::<PulseArg>(), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn test_parse_toggle() {
        assert!(parse_toggle("1\n").unwrap());
        assert!(!parse_toggle("0").unwrap());
        assert!(matches!(parse_toggle("2"), Err(Error::InvalidValue(_))));
        assert!(matches!(parse_toggle("on"), Err(Error::InvalidFormat(_))));
        assert!(matches!(parse_toggle("-1"), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn test_parse_effect_kind() {
        for kind in EffectKind::ALL {
            assert_eq!(kind, kind.name().parse().unwrap());
        }
        assert!("strobe".parse::<EffectKind>().is_err());
    }

    #[test]
    fn test_timing() {
        let timing = Timing::default();
        assert_eq!(Duration::from_millis(50), timing.period(EffectKind::Pulse));
        assert_eq!(Duration::from_millis(750), timing.period(EffectKind::Rainbow));
        assert_eq!(Duration::from_micros(187_500), timing.settle());
    }

    #[test]
    fn test_advance_none() {
        let mut channels = test_channels([1, 2, 3, 4]);
        let mut effect = Effect::None;
        assert_eq!(
            None,
            advance(&mut effect, &mut channels, &[0; 4], &Timing::default())
        );
        assert_eq!([1, 2, 3, 4], brightness(&channels));
    }
}
