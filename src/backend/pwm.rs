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
use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use tracing::{debug, info};

use super::{Duty, Output};
use crate::channel::ChannelKind;

/// A hardware PWM channel driven through the Linux sysfs PWM interface
/// (`/sys/class/pwm/pwmchipN/pwmM`).
pub struct SysfsPwm {
    /// The exported channel directory.
    path: PathBuf,
    /// The PWM period in nanoseconds.
    period_ns: u64,
}

impl SysfsPwm {
    /// Exports (if needed), configures and enables the given channel of a PWM chip.
    pub fn open(chip: &Path, channel: u32, period: Duration) -> io::Result<SysfsPwm> {
        let path = chip.join(format!("pwm{}", channel));
        if !path.exists() {
            debug!(chip = %chip.display(), channel, "Exporting PWM channel");
            fs::write(chip.join("export"), channel.to_string())?;
        }

        let period_ns = u64::try_from(period.as_nanos())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "PWM period too long"))?;
        if period_ns == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "PWM period must be non-zero",
            ));
        }

        // The duty cycle can never exceed the period, so clear it before changing the period.
        fs::write(path.join("duty_cycle"), "0")?;
        fs::write(path.join("period"), period_ns.to_string())?;
        fs::write(path.join("enable"), "1")?;

        info!(path = %path.display(), period_ns, "Opened PWM channel");
        Ok(SysfsPwm { path, period_ns })
    }
}

impl fmt::Display for SysfsPwm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pwm {}", self.path.display())
    }
}

impl Output for SysfsPwm {
    fn kind(&self) -> ChannelKind {
        ChannelKind::HardPwm
    }

    fn set_duty(&self, duty: Duty) -> io::Result<()> {
        fs::write(
            self.path.join("duty_cycle"),
            duty.scale_ns(self.period_ns).to_string(),
        )
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use super::*;

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_open_exported_channel() {
        let chip = tempfile::tempdir().unwrap();
        fs::create_dir(chip.path().join("pwm1")).unwrap();

        let pwm = SysfsPwm::open(chip.path(), 1, Duration::from_micros(1000)).unwrap();
        let channel = chip.path().join("pwm1");
        assert_eq!("1000000", read(&channel.join("period")));
        assert_eq!("1", read(&channel.join("enable")));
        assert_eq!("0", read(&channel.join("duty_cycle")));
        assert!(!chip.path().join("export").exists());

        pwm.set_duty(Duty::new(64, 256)).unwrap();
        assert_eq!("250000", read(&channel.join("duty_cycle")));

        pwm.set_duty(Duty::new(255, 255)).unwrap();
        assert_eq!("1000000", read(&channel.join("duty_cycle")));
        assert_eq!(ChannelKind::HardPwm, pwm.kind());
    }

    #[test]
    fn test_open_unexported_channel() {
        let chip = tempfile::tempdir().unwrap();

        // Nothing creates the pwm0 directory here, so configuring it fails after export.
        assert!(SysfsPwm::open(chip.path(), 0, Duration::from_millis(1)).is_err());
        assert_eq!("0", read(&chip.path().join("export")));
    }

    #[test]
    fn test_zero_period() {
        let chip = tempfile::tempdir().unwrap();
        fs::create_dir(chip.path().join("pwm0")).unwrap();
        let err = SysfsPwm::open(chip.path(), 0, Duration::ZERO)
            .err()
            .unwrap();
        assert_eq!(io::ErrorKind::InvalidInput, err.kind());
    }
}
