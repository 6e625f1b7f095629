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

use super::Timing;
use crate::channel::{Channel, Color, CHANNEL_COUNT};

/// Red, yellow, green, cyan, blue, magenta. Each entry lists which of R, G and B are
/// fully on.
const PALETTE: [[bool; 3]; 6] = [
    [true, false, false],
    [true, true, false],
    [false, true, false],
    [false, true, true],
    [false, false, true],
    [true, false, true],
];

/// Shows the current palette entry at full saturation and moves to the next one.
/// White is held dark.
pub(super) fn tick(
    channels: &mut [Channel; CHANNEL_COUNT],
    phase: &mut u8,
    timing: &Timing,
) -> Duration {
    let entry = PALETTE[usize::from(*phase) % PALETTE.len()];
    for (channel, on) in channels.iter_mut().zip(entry) {
        let brightness = if on { channel.max_brightness() } else { 0 };
        channel.set_brightness_saturating(brightness);
    }
    channels[Color::White.index()].set_brightness_saturating(0);

    *phase = ((usize::from(*phase) + 1) % PALETTE.len()) as u8;
    timing.blink_period
}
