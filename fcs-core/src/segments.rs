//! Segment offset reconciliation and validation
//!
//! The 8-digit ASCII header fields cannot address large files, so DATA and
//! ANALYSIS offsets legitimately live in the dictionary as well. Header
//! values seed the dictionary before TEXT decoding; afterwards the
//! dictionary values take precedence, except a dictionary zero against a
//! non-zero header value, which is a known vendor bug.

use crate::dictionary::Dictionary;
use crate::error::{FcsError, Result};
use crate::format::constants::keywords;
use crate::format::header::FcsHeader;
use crate::log::FileLog;
use alloc::format;
use alloc::string::ToString;

/// The four segments of a dataset as (begin, end) inclusive byte offsets.
/// A (0, 0) pair means the segment is absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SegmentOffsets {
    pub text: (u64, u64),
    pub supplemental_text: (u64, u64),
    pub data: (u64, u64),
    pub analysis: (u64, u64),
}

impl SegmentOffsets {
    pub fn from_header(header: &FcsHeader) -> Self {
        Self {
            text: header.text,
            supplemental_text: (0, 0),
            data: header.data,
            analysis: header.analysis,
        }
    }

    /// Write the header-declared DATA/ANALYSIS offsets into the dictionary
    /// before the TEXT segment is decoded, so that later resolution sees a
    /// uniform picture.
    pub fn seed_dictionary(&self, dict: &mut Dictionary) {
        dict.set(keywords::BEGIN_DATA, self.data.0.to_string());
        dict.set(keywords::END_DATA, self.data.1.to_string());
        dict.set(keywords::BEGIN_ANALYSIS, self.analysis.0.to_string());
        dict.set(keywords::END_ANALYSIS, self.analysis.1.to_string());
    }

    /// Reconcile with the dictionary after TEXT decoding
    pub fn resolve_from_dictionary(&mut self, dict: &Dictionary, log: &mut FileLog) -> Result<()> {
        self.data.0 = resolve_half(dict, keywords::BEGIN_DATA, self.data.0, log)?;
        self.data.1 = resolve_half(dict, keywords::END_DATA, self.data.1, log)?;
        self.analysis.0 = resolve_half(dict, keywords::BEGIN_ANALYSIS, self.analysis.0, log)?;
        self.analysis.1 = resolve_half(dict, keywords::END_ANALYSIS, self.analysis.1, log)?;

        // supplemental TEXT has no header field; the dictionary is the only source
        let begin = dict.get_u64(keywords::BEGIN_STEXT)?.unwrap_or(0);
        let end = dict.get_u64(keywords::END_STEXT)?.unwrap_or(0);
        self.supplemental_text = (begin, end);
        if begin != 0 && begin == self.text.0 {
            log.warning(format!(
                "supplemental TEXT offsets ({begin}, {end}) duplicate the TEXT segment; ignoring them"
            ));
            self.supplemental_text = (0, 0);
        }
        Ok(())
    }

    /// Bounds-check every segment against the measured file size
    pub fn validate(&self, file_size: u64, log: &mut FileLog) -> Result<()> {
        validate_pair("TEXT", self.text, true, file_size, log)?;
        validate_pair(
            "SUPPLEMENTAL TEXT",
            self.supplemental_text,
            false,
            file_size,
            log,
        )?;
        validate_pair("DATA", self.data, true, file_size, log)?;
        validate_pair("ANALYSIS", self.analysis, false, file_size, log)?;
        Ok(())
    }
}

fn resolve_half(dict: &Dictionary, keyword: &str, header_value: u64, log: &mut FileLog) -> Result<u64> {
    match dict.get_u64(keyword)? {
        None => Ok(header_value),
        Some(0) if header_value != 0 => {
            log.warning(format!(
                "{keyword} is zero in the dictionary but {header_value} in the header; keeping the header value"
            ));
            Ok(header_value)
        }
        Some(value) => Ok(value),
    }
}

fn validate_pair(
    name: &str,
    pair: (u64, u64),
    required: bool,
    file_size: u64,
    log: &mut FileLog,
) -> Result<()> {
    let (begin, end) = pair;
    if begin == 0 && end == 0 {
        if required {
            log.error(format!("required {name} segment is absent"));
            return Err(FcsError::Malformed(format!("missing {name} segment")));
        }
        return Ok(());
    }
    if begin == 0 {
        log.error(format!(
            "{name} segment has a zero begin offset with a non-zero end offset {end}"
        ));
        return Err(FcsError::Malformed(format!(
            "dangling {name} segment end offset"
        )));
    }
    if begin > end {
        log.error(format!("{name} segment offsets ({begin}, {end}) are inverted"));
        return Err(FcsError::Malformed(format!("inverted {name} segment offsets")));
    }
    if begin == end {
        log.error(format!("{name} segment offsets ({begin}, {end}) describe an empty segment"));
        return Err(FcsError::Malformed(format!("empty {name} segment")));
    }
    if end >= file_size {
        log.error(format!(
            "{name} segment ends at offset {end} but the file is only {file_size} bytes long"
        ));
        return Err(FcsError::Truncated(format!(
            "{name} segment extends past the end of the file"
        )));
    }
    Ok(())
}

/// Byte length of a non-empty (begin, end) inclusive pair
pub fn segment_len(pair: (u64, u64)) -> u64 {
    if pair == (0, 0) {
        0
    } else {
        pair.1 - pair.0 + 1
    }
}
