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

//! Control of RGB+W lighting fixtures: four channels driven through hardware or software
//! PWM, a small effect engine, and a line oriented command surface.

pub mod backend;
pub mod channel;
pub mod config;
pub mod controller;
pub mod effect;
pub mod error;
pub mod fixture;
pub mod html;
#[cfg(test)]
mod testutil;

pub use channel::{ChannelKind, ChannelProperties, Color};
pub use effect::{Effect, EffectKind, PulseArg, Timing};
pub use error::{Error, Result};
pub use fixture::{Fixture, Options};
