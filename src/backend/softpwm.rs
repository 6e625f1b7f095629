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
    fmt,
    fs::{File, OpenOptions},
    io::{self, Seek, Write},
    path::{Path, PathBuf},
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use parking_lot::Mutex;
use thread_priority::{set_current_thread_priority, ThreadPriority};
use tracing::{debug, info, span, warn, Level};

use super::{Duty, Output};
use crate::channel::ChannelKind;

/// The default software PWM frequency.
pub const DEFAULT_FREQUENCY_HZ: u32 = 200;

/// A digital output line.
pub trait Line: Send + 'static {
    /// Drives the line high or low.
    fn set(&mut self, high: bool) -> io::Result<()>;
}

/// A GPIO line driven through its sysfs `value` file.
pub struct SysfsGpio {
    path: PathBuf,
    value: File,
}

impl SysfsGpio {
    /// Opens the `value` file of an exported GPIO configured as an output.
    pub fn open(value_path: &Path) -> io::Result<SysfsGpio> {
        let value = OpenOptions::new().write(true).open(value_path)?;
        Ok(SysfsGpio {
            path: value_path.to_path_buf(),
            value,
        })
    }
}

impl Line for SysfsGpio {
    fn set(&mut self, high: bool) -> io::Result<()> {
        self.value.rewind()?;
        self.value.write_all(if high { b"1" } else { b"0" })
    }
}

impl fmt::Debug for SysfsGpio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gpio {}", self.path.display())
    }
}

/// A software PWM output. A worker thread toggles a line at a fixed frequency with
/// an on-fraction equal to the requested duty cycle.
pub struct SoftPwm {
    name: String,
    period: Duration,
    duty_tx: Option<Sender<Duty>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl SoftPwm {
    /// Starts the worker for the given line. The line starts low.
    pub fn spawn<L: Line>(name: &str, line: L, frequency_hz: u32, raise_priority: bool) -> SoftPwm {
        let period = Duration::from_secs(1) / frequency_hz.max(1);
        let (duty_tx, duty_rx) = crossbeam_channel::unbounded();
        let worker_name = name.to_string();

        let handle = thread::spawn(move || {
            let span = span!(Level::INFO, "soft pwm", name = worker_name.as_str());
            let _enter = span.enter();

            if raise_priority {
                if let Err(e) = set_current_thread_priority(ThreadPriority::Max) {
                    warn!(err = ?e, "Unable to raise soft PWM thread priority");
                }
            }

            SoftPwm::run(line, period, duty_rx);
            debug!("Soft PWM worker stopped.");
        });

        info!(name, ?period, "Started soft PWM worker");
        SoftPwm {
            name: name.to_string(),
            period,
            duty_tx: Some(duty_tx),
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Runs the on/off cycle until the sender is dropped. Fully off and fully on duty
    /// cycles hold the line and block until the next update.
    fn run<L: Line>(mut line: L, period: Duration, duty_rx: Receiver<Duty>) {
        let mut duty = Duty::OFF;
        let mut failing = false;
        let mut drive = |line: &mut L, high: bool| match line.set(high) {
            Ok(()) => failing = false,
            Err(e) => {
                if !failing {
                    warn!(err = e.to_string(), "Error driving soft PWM line");
                }
                failing = true;
            }
        };

        loop {
            loop {
                match duty_rx.try_recv() {
                    Ok(update) => duty = update,
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        drive(&mut line, false);
                        return;
                    }
                }
            }

            if duty.is_off() || duty.is_full() {
                drive(&mut line, duty.is_full());
                match duty_rx.recv() {
                    Ok(update) => duty = update,
                    Err(_) => {
                        drive(&mut line, false);
                        return;
                    }
                }
                continue;
            }

            let (on, off) = duty.split(period);
            drive(&mut line, true);
            spin_sleep::sleep(on);
            drive(&mut line, false);
            spin_sleep::sleep(off);
        }
    }
}

impl fmt::Display for SoftPwm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "soft pwm {} ({:?} period)", self.name, self.period)
    }
}

impl Output for SoftPwm {
    fn kind(&self) -> ChannelKind {
        ChannelKind::SoftPwm
    }

    fn set_duty(&self, duty: Duty) -> io::Result<()> {
        let stopped = || io::Error::new(io::ErrorKind::BrokenPipe, "soft PWM worker stopped");
        self.duty_tx
            .as_ref()
            .ok_or_else(stopped)?
            .send(duty)
            .map_err(|_| stopped())
    }
}

impl Drop for SoftPwm {
    fn drop(&mut self) {
        // Dropping the sender stops the worker.
        self.duty_tx.take();
        if let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                warn!(name = self.name.as_str(), "Soft PWM worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::{
        fs,
        sync::{
            atomic::{AtomicBool, AtomicUsize, Ordering},
            Arc,
        },
    };

    use super::*;
    use crate::testutil::eventually;

    #[derive(Clone, Default)]
    struct FakeLine {
        high: Arc<AtomicBool>,
        writes: Arc<AtomicUsize>,
        rising: Arc<AtomicUsize>,
    }

    impl Line for FakeLine {
        fn set(&mut self, high: bool) -> io::Result<()> {
            let was_high = self.high.swap(high, Ordering::SeqCst);
            if high && !was_high {
                self.rising.fetch_add(1, Ordering::SeqCst);
            }
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_full_and_off_hold_the_line() {
        let line = FakeLine::default();
        let pwm = SoftPwm::spawn("white", line.clone(), 1000, false);

        pwm.set_duty(Duty::new(255, 255)).unwrap();
        eventually(|| line.high.load(Ordering::SeqCst), "Line never went high");

        pwm.set_duty(Duty::OFF).unwrap();
        eventually(|| !line.high.load(Ordering::SeqCst), "Line never went low");
    }

    #[test]
    fn test_partial_duty_toggles() {
        let line = FakeLine::default();
        let pwm = SoftPwm::spawn("white", line.clone(), 1000, false);

        pwm.set_duty(Duty::new(128, 255)).unwrap();
        eventually(
            || line.rising.load(Ordering::SeqCst) > 5,
            "Line never toggled",
        );
        assert_eq!(ChannelKind::SoftPwm, pwm.kind());
    }

    #[test]
    fn test_drop_leaves_line_low() {
        let line = FakeLine::default();
        {
            let pwm = SoftPwm::spawn("white", line.clone(), 1000, false);
            pwm.set_duty(Duty::new(255, 255)).unwrap();
            eventually(|| line.high.load(Ordering::SeqCst), "Line never went high");
        }
        assert!(!line.high.load(Ordering::SeqCst));
    }

    #[test]
    fn test_sysfs_gpio_writes_value() {
        let dir = tempfile::tempdir().unwrap();
        let value = dir.path().join("value");
        fs::write(&value, "0").unwrap();

        let mut gpio = SysfsGpio::open(&value).unwrap();
        gpio.set(true).unwrap();
        assert_eq!("1", fs::read_to_string(&value).unwrap());
        gpio.set(false).unwrap();
        assert_eq!("0", fs::read_to_string(&value).unwrap());
    }
}
