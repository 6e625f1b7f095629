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
use std::{path::Path, sync::Arc, time::Duration};

use config::{Config, File};
use duration_string::DurationString;
use serde::Deserialize;
use tracing::{info, warn};

use super::{error::ConfigError, output::Output};
use crate::{
    backend::Outputs,
    channel::{ChannelKind, ChannelProperties, Color, CHANNEL_COUNT, DEFAULT_MAX_BRIGHTNESS},
    effect::{Timing, BLINK_PERIOD, DEFAULT_PULSE_STEPS, PULSE_STEP},
    fixture::Options,
};

/// The default fixture name.
pub const DEFAULT_NAME: &str = "rgbw";

/// A YAML representation of a fixture.
#[derive(Deserialize, Clone, Debug)]
pub struct Fixture {
    /// The name of the fixture, used in logs.
    name: Option<String>,

    /// The four channels.
    channels: Channels,

    /// Effect timing.
    effects: Option<Effects>,

    /// Whether suspend and resume darken and restore the outputs.
    suspend_resume: Option<bool>,
}

impl Fixture {
    /// Parse a fixture from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Fixture, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Fixture>()?)
    }

    /// Gets the fixture name.
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_NAME)
    }

    /// Gets whether suspend and resume are honored.
    pub fn suspend_resume(&self) -> bool {
        self.suspend_resume.unwrap_or(true)
    }

    /// Gets the effect timing.
    pub fn timing(&self) -> Result<Timing, ConfigError> {
        match &self.effects {
            Some(effects) => effects.timing(),
            None => Ok(Timing::default()),
        }
    }

    /// Gets the fixture options.
    pub fn options(&self) -> Result<Options, ConfigError> {
        Ok(Options {
            timing: self.timing()?,
            suspend_resume: self.suspend_resume(),
        })
    }

    /// Gets the channel properties, ordered red, green, blue, white.
    pub fn properties(&self) -> [ChannelProperties; CHANNEL_COUNT] {
        self.channels.by_color().map(|(_, channel)| channel.properties())
    }

    /// Opens the outputs of every channel.
    pub fn outputs(&self) -> Result<Outputs, ConfigError> {
        let mut slots = Vec::with_capacity(CHANNEL_COUNT);
        for (color, channel) in self.channels.by_color() {
            let name = format!("{}-{}", self.name(), color);
            let kind = channel.kind().unwrap_or_else(|| typical_kind(color));
            slots.push(channel.output().open(&name, kind)?);
        }
        let slots = slots
            .try_into()
            .map_err(|_| ConfigError::Invalid("expected four outputs".to_string()))?;
        Ok(Outputs::new(slots))
    }

    /// Opens the outputs and creates the fixture.
    pub fn build(&self) -> Result<crate::fixture::Fixture, ConfigError> {
        let options = self.options()?;
        let outputs = self.outputs()?;
        info!(fixture = self.name(), outputs = %outputs, "Opened outputs");

        Ok(crate::fixture::Fixture::new(
            self.name(),
            self.properties(),
            Arc::new(outputs),
            options,
        )?)
    }
}

/// The channels of a fixture, one per color.
#[derive(Deserialize, Clone, Debug)]
pub struct Channels {
    red: Channel,
    green: Channel,
    blue: Channel,
    white: Channel,
}

impl Channels {
    fn by_color(&self) -> [(Color, &Channel); CHANNEL_COUNT] {
        [
            (Color::Red, &self.red),
            (Color::Green, &self.green),
            (Color::Blue, &self.blue),
            (Color::White, &self.white),
        ]
    }
}

/// A YAML representation of a single channel.
#[derive(Deserialize, Clone, Debug)]
pub struct Channel {
    /// `hard_pwm` or `soft_pwm`. Defaults to whatever the output realizes.
    kind: Option<String>,

    /// The maximum brightness.
    max_brightness: Option<u32>,

    /// The initial brightness.
    brightness: Option<u32>,

    /// The hardware behind the channel. Defaults to a dry run.
    output: Option<Output>,
}

impl Channel {
    /// Gets the channel kind. An unrecognized kind yields `None`, which the fixture
    /// resolves from the backend.
    pub fn kind(&self) -> Option<ChannelKind> {
        match &self.kind {
            Some(kind) => match kind.parse() {
                Ok(kind) => Some(kind),
                Err(e) => {
                    warn!(err = %e, "Ignoring channel kind");
                    None
                }
            },
            None => self.output().kind(),
        }
    }

    /// Gets the maximum brightness.
    pub fn max_brightness(&self) -> u32 {
        self.max_brightness.unwrap_or(DEFAULT_MAX_BRIGHTNESS)
    }

    /// Gets the initial brightness.
    pub fn brightness(&self) -> u32 {
        self.brightness.unwrap_or(0)
    }

    /// Gets the output.
    pub fn output(&self) -> Output {
        self.output.clone().unwrap_or(Output::DryRun)
    }

    fn properties(&self) -> ChannelProperties {
        ChannelProperties {
            brightness: self.brightness(),
            max_brightness: self.max_brightness(),
            kind: self.kind(),
        }
    }
}

/// A YAML representation of the effect timing.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Effects {
    /// The pulse tick period.
    pulse_step: Option<String>,

    /// The period of blink, heartbeat and rainbow.
    blink_period: Option<String>,

    /// Pulse ticks from dark to full brightness.
    pulse_steps: Option<u32>,
}

impl Effects {
    /// Gets the effect timing. Zero periods are rejected.
    pub fn timing(&self) -> Result<Timing, ConfigError> {
        let pulse_step = duration(&self.pulse_step, PULSE_STEP)?;
        let blink_period = duration(&self.blink_period, BLINK_PERIOD)?;
        let pulse_steps = self.pulse_steps.unwrap_or(DEFAULT_PULSE_STEPS);

        if pulse_step.is_zero() || blink_period.is_zero() {
            return Err(ConfigError::Invalid(
                "effect periods must be non-zero".to_string(),
            ));
        }
        if pulse_steps == 0 {
            return Err(ConfigError::Invalid(
                "pulse_steps must be at least 1".to_string(),
            ));
        }

        Ok(Timing {
            pulse_step,
            blink_period,
            pulse_steps,
        })
    }
}

fn duration(value: &Option<String>, default: Duration) -> Result<Duration, ConfigError> {
    value.as_ref().map_or(Ok(default), |duration| {
        Ok(DurationString::from_string(duration.clone())?.into())
    })
}

/// Hardware PWM for red, green and blue, software PWM for white.
fn typical_kind(color: Color) -> ChannelKind {
    match color {
        Color::White => ChannelKind::SoftPwm,
        _ => ChannelKind::HardPwm,
    }
}
