//! The fixed 58-byte ASCII header record
//!
//! Layout: 6-byte version tag, 4 blank bytes, then three (begin, end)
//! pairs of right-justified 8-character ASCII decimals: TEXT, DATA,
//! ANALYSIS. DATA and ANALYSIS pairs may legitimately be zero, meaning
//! "see the dictionary instead".

use crate::error::{FcsError, Result};
use crate::format::constants::{
    HEADER_SIZE, MAX_HEADER_OFFSET, OFFSET_FIELD_WIDTH, VERSION_TAG_SIZE,
};
use crate::format::types::Version;
use crate::log::FileLog;
use alloc::format;
use alloc::string::String;

/// Decoded header record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FcsHeader {
    pub version: Version,
    /// TEXT segment (begin, end), inclusive byte offsets; required, non-empty
    pub text: (u64, u64),
    /// DATA segment (begin, end); (0, 0) defers to the dictionary
    pub data: (u64, u64),
    /// ANALYSIS segment (begin, end); (0, 0) means absent
    pub analysis: (u64, u64),
}

impl FcsHeader {
    pub const SIZE: usize = HEADER_SIZE;

    pub fn new(version: Version) -> Self {
        Self {
            version,
            text: (0, 0),
            data: (0, 0),
            analysis: (0, 0),
        }
    }

    /// Decode the header from the first bytes of a file
    pub fn from_bytes(bytes: &[u8], log: &mut FileLog) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            log.error(format!(
                "file provides {} bytes, the header requires {HEADER_SIZE}",
                bytes.len()
            ));
            return Err(FcsError::Truncated(String::from(
                "file is shorter than the 58-byte header",
            )));
        }

        let tag = &bytes[..VERSION_TAG_SIZE];
        let version = Version::from_tag(tag).ok_or_else(|| {
            log.error(format!("unrecognized version tag {:?}", tag));
            FcsError::Unsupported(String::from("unrecognized FCS version tag"))
        })?;

        let mut fields = [0u64; 6];
        for (i, field) in fields.iter_mut().enumerate() {
            let start = VERSION_TAG_SIZE + 4 + i * OFFSET_FIELD_WIDTH;
            *field = parse_offset_field(&bytes[start..start + OFFSET_FIELD_WIDTH], log)?;
        }
        let text = (fields[0], fields[1]);
        let mut data = (fields[2], fields[3]);
        let mut analysis = (fields[4], fields[5]);

        if text.0 == 0 || text.1 == 0 || text.0 > text.1 {
            log.error(format!(
                "header TEXT offsets ({}, {}) are non-positive, empty, or inverted",
                text.0, text.1
            ));
            return Err(FcsError::Malformed(String::from(
                "invalid TEXT segment offsets in header",
            )));
        }

        reconcile_half_zero_pair("DATA", &mut data, log);
        reconcile_half_zero_pair("ANALYSIS", &mut analysis, log);

        Ok(Self {
            version,
            text,
            data,
            analysis,
        })
    }

    /// Encode the header. Pairs whose end offset does not fit the 8-digit
    /// field are written as zero; the dictionary carries the true values.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [b' '; HEADER_SIZE];
        out[..VERSION_TAG_SIZE].copy_from_slice(self.version.tag());

        let pairs = [self.text, self.data, self.analysis];
        for (i, pair) in pairs.iter().enumerate() {
            let (begin, end) = if pair.0 > MAX_HEADER_OFFSET || pair.1 > MAX_HEADER_OFFSET {
                (0, 0)
            } else {
                *pair
            };
            let base = VERSION_TAG_SIZE + 4 + i * 2 * OFFSET_FIELD_WIDTH;
            write_offset_field(&mut out[base..base + OFFSET_FIELD_WIDTH], begin);
            write_offset_field(
                &mut out[base + OFFSET_FIELD_WIDTH..base + 2 * OFFSET_FIELD_WIDTH],
                end,
            );
        }
        out
    }
}

/// Parse one right-justified, blank-padded ASCII decimal field.
/// An all-blank field reads as zero.
fn parse_offset_field(field: &[u8], log: &mut FileLog) -> Result<u64> {
    let mut value: u64 = 0;
    let mut seen_digit = false;
    for &b in field {
        match b {
            b'0'..=b'9' => {
                seen_digit = true;
                value = value * 10 + (b - b'0') as u64;
            }
            b' ' if !seen_digit => {}
            _ => {
                log.error(format!(
                    "header offset field contains non-decimal byte 0x{b:02x}"
                ));
                return Err(FcsError::Malformed(String::from(
                    "non-decimal character in header offset field",
                )));
            }
        }
    }
    Ok(value)
}

fn write_offset_field(field: &mut [u8], value: u64) {
    let text = format!("{value:>width$}", width = OFFSET_FIELD_WIDTH);
    field.copy_from_slice(text.as_bytes());
}

/// A pair with exactly one zero half is a vendor error; the dangling
/// non-zero half is forced to zero so the dictionary values decide later.
fn reconcile_half_zero_pair(name: &str, pair: &mut (u64, u64), log: &mut FileLog) {
    if (pair.0 == 0) != (pair.1 == 0) {
        log.warning(format!(
            "header {name} offsets ({}, {}) mix zero and non-zero; treating the segment as dictionary-declared",
            pair.0, pair.1
        ));
        *pair = (0, 0);
    }
}
