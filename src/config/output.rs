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
use std::{path::Path, time::Duration};

use duration_string::DurationString;
use serde::Deserialize;
use tracing::warn;

use super::error::ConfigError;
use crate::{
    backend::{
        dryrun::DryRun,
        pwm::SysfsPwm,
        softpwm::{SoftPwm, SysfsGpio, DEFAULT_FREQUENCY_HZ},
    },
    channel::ChannelKind,
};

/// The default hardware PWM period (1 kHz).
pub const DEFAULT_PWM_PERIOD: Duration = Duration::from_millis(1);

/// A YAML representation of the hardware behind a single channel.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Output {
    /// A sysfs PWM channel.
    Pwm {
        /// The PWM chip directory, e.g. `/sys/class/pwm/pwmchip0`.
        chip: String,
        /// The channel on the chip.
        channel: u32,
        /// The PWM period as a duration string.
        period: Option<String>,
    },

    /// A sysfs GPIO line toggled in software.
    Gpio {
        /// The GPIO value file, e.g. `/sys/class/gpio/gpio17/value`.
        value: String,
        /// The soft PWM frequency in Hz.
        frequency: Option<u32>,
        /// Whether the soft PWM thread should run at raised priority.
        raise_priority: Option<bool>,
    },

    /// No hardware, duty changes are only logged.
    DryRun,
}

impl Output {
    /// The kind of channel this output realizes, if the output determines it.
    pub fn kind(&self) -> Option<ChannelKind> {
        match self {
            Output::Pwm { .. } => Some(ChannelKind::HardPwm),
            Output::Gpio { .. } => Some(ChannelKind::SoftPwm),
            Output::DryRun => None,
        }
    }

    /// Opens the output. A dry run output reports the given kind.
    pub(crate) fn open(
        &self,
        name: &str,
        kind: ChannelKind,
    ) -> Result<Box<dyn crate::backend::Output>, ConfigError> {
        let output: Box<dyn crate::backend::Output> = match self {
            Output::Pwm {
                chip,
                channel,
                period,
            } => {
                let period = match period {
                    Some(period) => DurationString::from_string(period.clone())?.into(),
                    None => DEFAULT_PWM_PERIOD,
                };
                if period.is_zero() {
                    return Err(ConfigError::Invalid(format!(
                        "{}: PWM period must be non-zero",
                        name
                    )));
                }
                Box::new(SysfsPwm::open(Path::new(chip), *channel, period)?)
            }
            Output::Gpio {
                value,
                frequency,
                raise_priority,
            } => {
                let frequency = frequency.unwrap_or(DEFAULT_FREQUENCY_HZ);
                if frequency == 0 {
                    return Err(ConfigError::Invalid(format!(
                        "{}: soft PWM frequency must be non-zero",
                        name
                    )));
                }
                let line = SysfsGpio::open(Path::new(value))?;
                Box::new(SoftPwm::spawn(
                    name,
                    line,
                    frequency,
                    raise_priority.unwrap_or(false),
                ))
            }
            Output::DryRun => Box::new(DryRun::new(name, kind)),
        };

        if output.kind() != kind {
            warn!(
                output = %output,
                expected = %kind,
                "Output realizes a different channel kind"
            );
        }
        Ok(output)
    }
}
