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
use std::{fmt, io};

use parking_lot::Mutex;
use tracing::debug;

use super::{Duty, Output};
use crate::channel::ChannelKind;

/// An output that only logs duty changes. Useful without hardware.
pub struct DryRun {
    name: String,
    kind: ChannelKind,
    last: Mutex<Option<Duty>>,
}

impl DryRun {
    pub fn new(name: &str, kind: ChannelKind) -> DryRun {
        DryRun {
            name: name.to_string(),
            kind,
            last: Mutex::new(None),
        }
    }

    /// Gets the last programmed duty cycle.
    pub fn last(&self) -> Option<Duty> {
        *self.last.lock()
    }
}

impl fmt::Display for DryRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dry run {} ({})", self.name, self.kind)
    }
}

impl Output for DryRun {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    fn set_duty(&self, duty: Duty) -> io::Result<()> {
        let mut last = self.last.lock();
        if *last != Some(duty) {
            debug!(output = self.name.as_str(), duty = %duty, "Duty cycle changed");
            *last = Some(duty);
        }
        Ok(())
    }
}
