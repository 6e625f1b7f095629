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
use std::time::Duration;

use super::{assign, Timing};
use crate::channel::{Channel, CHANNEL_COUNT};

/// Phase 0 darkens every channel, phase 1 restores the saved values.
pub(super) fn tick(
    channels: &mut [Channel; CHANNEL_COUNT],
    phase: &mut u8,
    saved: &[u32; CHANNEL_COUNT],
    timing: &Timing,
) -> Duration {
    if *phase == 0 {
        assign(channels, &[0; CHANNEL_COUNT]);
        *phase = 1;
    } else {
        assign(channels, saved);
        *phase = 0;
    }
    timing.blink_period
}
