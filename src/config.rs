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
use std::path::Path;

use tracing::info;

mod error;
mod fixture;
mod output;

pub use self::error::ConfigError;
pub use self::fixture::{Channel, Channels, Effects, Fixture, DEFAULT_NAME};
pub use self::output::{Output, DEFAULT_PWM_PERIOD};

/// Loads the fixture config at the given path, opens its outputs and creates the fixture.
pub fn init_fixture(path: &Path) -> Result<crate::fixture::Fixture, ConfigError> {
    let config = Fixture::deserialize(path)?;
    let fixture = config.build()?;
    info!(path = %path.display(), fixture = fixture.name(), "Loaded fixture config");
    Ok(fixture)
}
