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

const PHASES: u8 = 4;

/// How long each phase is held, in sixths of the period. Phase 0 is the rest
/// between beats, phases 1 and 3 are the beats.
const PHASE_SIXTHS: [u32; PHASES as usize] = [3, 1, 1, 1];

/// Advances the four phase cycle: off, saved, off, saved. The whole cycle spans one
/// period.
pub(super) fn tick(
    channels: &mut [Channel; CHANNEL_COUNT],
    phase: &mut u8,
    saved: &[u32; CHANNEL_COUNT],
    timing: &Timing,
) -> Duration {
    let current = *phase % PHASES;
    if current % 2 == 0 {
        assign(channels, &[0; CHANNEL_COUNT]);
    } else {
        assign(channels, saved);
    }
    *phase = (current + 1) % PHASES;

    timing.blink_period * PHASE_SIXTHS[usize::from(current)] / 6
}
