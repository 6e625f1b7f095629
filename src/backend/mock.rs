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
    io,
    sync::atomic::{AtomicBool, Ordering},
};

use parking_lot::Mutex;

use super::Backend;
use crate::channel::{ChannelKind, Color, CHANNEL_COUNT};

/// A single recorded apply call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Apply {
    pub channel: Color,
    pub brightness: u32,
    pub max_brightness: u32,
}

/// Mock backend for testing. Records every apply call in order.
pub struct MockBackend {
    kinds: [ChannelKind; CHANNEL_COUNT],
    applied: Mutex<Vec<Apply>>,
    should_fail: AtomicBool,
}

impl MockBackend {
    /// Creates a mock with hardware PWM on red, green and blue and software PWM on white.
    pub fn new() -> MockBackend {
        MockBackend::with_kinds([
            ChannelKind::HardPwm,
            ChannelKind::HardPwm,
            ChannelKind::HardPwm,
            ChannelKind::SoftPwm,
        ])
    }

    pub fn with_kinds(kinds: [ChannelKind; CHANNEL_COUNT]) -> MockBackend {
        MockBackend {
            kinds,
            applied: Mutex::new(Vec::new()),
            should_fail: AtomicBool::new(false),
        }
    }

    /// Makes every subsequent apply call fail (after recording it).
    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    /// Gets all recorded apply calls.
    pub fn applied(&self) -> Vec<Apply> {
        self.applied.lock().clone()
    }

    /// Gets the number of recorded apply calls.
    pub fn apply_count(&self) -> usize {
        self.applied.lock().len()
    }

    /// Clears all recorded apply calls.
    pub fn clear(&self) {
        self.applied.lock().clear();
    }

    /// Groups the recorded calls into complete updates of all four channels, returning
    /// the brightness values of each update.
    pub fn updates(&self) -> Vec<[u32; CHANNEL_COUNT]> {
        self.applied
            .lock()
            .chunks_exact(CHANNEL_COUNT)
            .map(|chunk| {
                let mut values = [0; CHANNEL_COUNT];
                for apply in chunk {
                    values[apply.channel.index()] = apply.brightness;
                }
                values
            })
            .collect()
    }

    /// Gets the brightness values of the last complete update.
    pub fn last_update(&self) -> Option<[u32; CHANNEL_COUNT]> {
        self.updates().last().copied()
    }

    /// Gets every brightness pushed to a single channel, in order.
    pub fn channel_history(&self, channel: Color) -> Vec<u32> {
        self.applied
            .lock()
            .iter()
            .filter(|apply| apply.channel == channel)
            .map(|apply| apply.brightness)
            .collect()
    }
}

impl Backend for MockBackend {
    fn apply(&self, channel: Color, brightness: u32, max_brightness: u32) -> io::Result<()> {
        self.applied.lock().push(Apply {
            channel,
            brightness,
            max_brightness,
        });
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "mock backend failure"));
        }
        Ok(())
    }

    fn kind(&self, channel: Color) -> ChannelKind {
        self.kinds[channel.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_backend_records_in_order() {
        let backend = MockBackend::new();
        for (i, color) in Color::ALL.iter().enumerate() {
            backend.apply(*color, i as u32 * 10, 255).unwrap();
        }
        backend.apply(Color::Red, 1, 255).unwrap();

        assert_eq!(5, backend.apply_count());
        assert_eq!(vec![[0, 10, 20, 30]], backend.updates());
        assert_eq!(vec![0, 1], backend.channel_history(Color::Red));

        backend.clear();
        assert_eq!(0, backend.apply_count());
        assert_eq!(None, backend.last_update());
    }

    #[test]
    fn test_mock_backend_failure() {
        let backend = MockBackend::new();
        backend.set_should_fail(true);
        assert!(backend.apply(Color::Green, 1, 255).is_err());
        assert_eq!(1, backend.apply_count());
        assert_eq!(ChannelKind::SoftPwm, backend.kind(Color::White));
    }
}
