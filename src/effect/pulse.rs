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
use crate::channel::{Channel, Color, CHANNEL_COUNT};

/// Darkens every channel and resets the pulsed color's counter.
pub(super) fn enter(channels: &mut [Channel; CHANNEL_COUNT], color: Color) {
    assign(channels, &[0; CHANNEL_COUNT]);
    channels[color.index()].cntr = 0;
}

/// One pulse tick. The counter walks a triangle of `2 * pulse_steps` ticks and the
/// pulsed color follows it from dark to its maximum and back.
pub(super) fn tick(
    channels: &mut [Channel; CHANNEL_COUNT],
    color: Color,
    timing: &Timing,
) -> Duration {
    let steps = timing.pulse_steps.max(1);
    let cycle = steps * 2;

    for other in Color::ALL.into_iter().filter(|other| *other != color) {
        channels[other.index()].set_brightness_saturating(0);
    }

    let channel = &mut channels[color.index()];
    channel.cntr = (channel.cntr + 1).min(cycle);
    let level = if channel.cntr <= steps {
        channel.cntr
    } else {
        cycle - channel.cntr
    };
    let brightness = u64::from(channel.max_brightness()) * u64::from(level) / u64::from(steps);
    channel.set_brightness_saturating(u32::try_from(brightness).unwrap_or(u32::MAX));

    if channel.cntr == cycle {
        channel.cntr = 0;
    }

    timing.pulse_step
}
