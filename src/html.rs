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

//! HTML style color codes: `#RRGGBB` or `#RRGGBBWW`.

use std::fmt::Write;

use crate::{
    channel::{Color, CHANNEL_COUNT},
    error::{Error, Result},
};

const RGB_LEN: usize = 7;
const RGBW_LEN: usize = 9;

/// A decoded color code. White is `None` when the code only carried RGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HtmlColor {
    pub rgb: [u8; 3],
    pub white: Option<u8>,
}

impl HtmlColor {
    /// Resolves the code into four channel values, keeping `current_white` if the code
    /// did not carry a white value.
    pub fn channels(&self, current_white: u32) -> [u32; CHANNEL_COUNT] {
        [
            u32::from(self.rgb[0]),
            u32::from(self.rgb[1]),
            u32::from(self.rgb[2]),
            self.white.map_or(current_white, u32::from),
        ]
    }
}

fn nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

fn byte(color: Color, pair: &[u8]) -> Result<u8> {
    match pair {
        [hi, lo] => match (nibble(*hi), nibble(*lo)) {
            (Some(hi), Some(lo)) => Ok(hi << 4 | lo),
            _ => Err(Error::InvalidFormat(format!(
                "the {} value is not in hex format",
                color
            ))),
        },
        _ => Err(Error::InvalidFormat(format!("the {} value is truncated", color))),
    }
}

/// Parses an HTML color code. Trailing whitespace (such as the newline left by
/// `echo`) is ignored; everything else must match the format exactly.
pub fn parse(input: &str) -> Result<HtmlColor> {
    let code = input.trim_end().as_bytes();

    if code.first() != Some(&b'#') {
        return Err(Error::InvalidFormat(
            "the HTML RGB[W] value must begin with the \"#\" symbol".to_string(),
        ));
    }
    if code.len() < RGB_LEN {
        return Err(Error::InvalidFormat(format!(
            "the HTML RGB[W] value is too short with {} characters, use \"#RRGGBB[WW]\"",
            code.len()
        )));
    }
    if code.len() > RGBW_LEN {
        return Err(Error::InvalidFormat(format!(
            "the HTML RGB[W] value is too long with {} characters, use \"#RRGGBB[WW]\"",
            code.len()
        )));
    }
    if code.len() == RGBW_LEN - 1 {
        return Err(Error::InvalidFormat(
            "the HTML [W] value is incomplete, use \"#RRGGBB[WW]\"".to_string(),
        ));
    }

    let digits = &code[1..];
    let rgb = [
        byte(Color::Red, &digits[0..2])?,
        byte(Color::Green, &digits[2..4])?,
        byte(Color::Blue, &digits[4..6])?,
    ];
    let white = match digits.get(6..8) {
        Some(pair) => Some(byte(Color::White, pair)?),
        None => None,
    };

    Ok(HtmlColor { rgb, white })
}

/// Formats four channel values as `#rrggbbww`. Values wider than 8 bits saturate.
pub fn format(values: &[u32; CHANNEL_COUNT]) -> String {
    let mut code = String::with_capacity(RGBW_LEN);
    code.push('#');
    for value in values {
        let value = u8::try_from(*value).unwrap_or(u8::MAX);
        // Writing to a String cannot fail.
        let _ = write!(code, "{:02x}", value);
    }
    code
}
