//! Bitstream export of arranged results.
//!
//! Bits are emitted shot-major, then per format character, then in ascending
//! round order (ancilla sections only), then in spatial order.

use crate::arrange::ArrangedResult;
use crate::roles::Role;
use crate::{MapError, Result};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Validated section order, e.g. `zxd`.
///
/// Repeats are allowed and emit the section again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionFormat(Vec<Role>);

impl SectionFormat {
    pub fn sections(&self) -> &[Role] {
        &self.0
    }
}

impl Default for SectionFormat {
    fn default() -> Self {
        Self(vec![Role::AncZ, Role::AncX, Role::Data])
    }
}

impl FromStr for SectionFormat {
    type Err = MapError;

    /// Checks every character before accepting any of them.
    fn from_str(s: &str) -> Result<Self> {
        s.chars()
            .enumerate()
            .map(|(position, character)| {
                Role::from_format_char(character)
                    .ok_or(MapError::InvalidFormatCharacter { character, position })
            })
            .collect::<Result<Vec<_>>>()
            .map(SectionFormat)
    }
}

impl fmt::Display for SectionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|r| write!(f, "{}", r.format_char()))
    }
}

/// Encodes `result` as a `'0'`/`'1'` string using a raw format string.
///
/// Fails with `InvalidFormatCharacter` before producing any output.
pub fn encode_bitstream(result: &ArrangedResult, format: &str) -> Result<String> {
    let format: SectionFormat = format.parse()?;
    Ok(encode_with(result, &format))
}

/// Encodes `result` with an already validated section order.
pub fn encode_with(result: &ArrangedResult, format: &SectionFormat) -> String {
    debug!(format = %format, shots = result.len(), "encoding bitstream");

    let mut out = String::new();
    for shot in result.shots() {
        for &role in format.sections() {
            out.extend(
                shot.section_values(role)
                    .into_iter()
                    .map(|bit| if bit { '1' } else { '0' }),
            );
        }
    }
    out
}
