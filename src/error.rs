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
use std::io;

use crate::effect::EffectKind;

/// Typed errors returned by the fixture's control surface so callers can tell a
/// refusal apart from bad input without string matching.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input could not be parsed (bad HTML code, unknown token, non-numeric value).
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// The input parsed but is out of range for the target.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// An incompatible effect is running. Stop it first.
    #[error("{0} is currently active, stop it first")]
    EffectActive(EffectKind),

    /// The backend has been torn down.
    #[error("backend is no longer present")]
    BackendAbsent,

    /// The backend failed to program an output.
    #[error("backend I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns true if this error is a refusal due to a running effect.
    pub fn is_refusal(&self) -> bool {
        matches!(self, Error::EffectActive(_))
    }
}
