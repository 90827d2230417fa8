//! Save planning: TEXT layout selection and final offset computation
//!
//! Dictionary entries are bucketed by priority. The six segment-offset
//! keywords must sit in the primary TEXT segment; known standard keywords
//! are small and preferred there; everything else (unbounded vendor values)
//! is the first to spill into a supplemental TEXT segment when the primary
//! segment would outgrow the header's 8-digit offset fields.

use crate::dictionary::Dictionary;
use crate::error::{FcsError, Result};
use crate::format::constants::{keywords, HEADER_SIZE, MAX_HEADER_OFFSET};
use crate::log::FileLog;
use crate::segments::SegmentOffsets;
use crate::text;
use crate::vocabulary;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

/// Which entries ended up in which text segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextLayout {
    /// Everything in the primary TEXT segment
    AllPrimary,
    /// Standard keywords in TEXT, vendor/free-text in supplemental TEXT
    RestSupplemental,
    /// Only the offset keywords in TEXT, everything else supplemental
    MinimalPrimary,
}

/// A fully computed plan; segments can be written sequentially from it
#[derive(Debug, Clone)]
pub struct SavePlan {
    pub layout: TextLayout,
    pub offsets: SegmentOffsets,
    pub text_bytes: Vec<u8>,
    pub supplemental_text_bytes: Vec<u8>,
}

pub fn plan_save(
    dict: &Dictionary,
    data_len: u64,
    delimiter: u8,
    log: &mut FileLog,
) -> Result<SavePlan> {
    plan_save_with_limit(dict, data_len, delimiter, MAX_HEADER_OFFSET, log)
}

/// Same as [`plan_save`] with an explicit header-addressability limit
pub fn plan_save_with_limit(
    dict: &Dictionary,
    data_len: u64,
    delimiter: u8,
    offset_limit: u64,
    log: &mut FileLog,
) -> Result<SavePlan> {
    if data_len == 0 {
        log.error("cannot plan a file without a DATA segment");
        return Err(FcsError::Malformed(String::from(
            "a DATA segment is required",
        )));
    }

    // bucket in dictionary order; the offset keywords are regenerated
    let mut prefer: Vec<(&str, &str)> = Vec::new();
    let mut rest: Vec<(&str, &str)> = Vec::new();
    for (key, value) in dict.iter() {
        if keywords::OFFSET_KEYWORDS.contains(&key) {
            continue;
        }
        if vocabulary::lookup(key).is_some() {
            prefer.push((key, value));
        } else {
            rest.push((key, value));
        }
    }

    let mut everything = prefer.clone();
    everything.extend_from_slice(&rest);

    let mut plan = compute_layout(TextLayout::AllPrimary, &everything, &[], data_len, delimiter)?;
    if plan.offsets.text.1 > offset_limit {
        plan = compute_layout(
            TextLayout::RestSupplemental,
            &prefer,
            &rest,
            data_len,
            delimiter,
        )?;
    }
    if plan.offsets.text.1 > offset_limit {
        plan = compute_layout(
            TextLayout::MinimalPrimary,
            &[],
            &everything,
            data_len,
            delimiter,
        )?;
    }

    if plan.offsets.text.1 > offset_limit {
        log.error(format!(
            "primary TEXT segment ends at {} even with the minimal layout; the header cannot address it",
            plan.offsets.text.1
        ));
        return Err(FcsError::Malformed(String::from(
            "TEXT segment too large for the header offset fields",
        )));
    }
    if plan.layout != TextLayout::AllPrimary {
        log.info(format!(
            "{} dictionary entries moved to a supplemental TEXT segment",
            match plan.layout {
                TextLayout::RestSupplemental => rest.len(),
                _ => prefer.len() + rest.len(),
            }
        ));
    }
    Ok(plan)
}

/// Fixed-point offset computation: the offset keyword values feed back into
/// the TEXT segment length, so iterate until the offsets stop moving.
fn compute_layout(
    layout: TextLayout,
    primary_extra: &[(&str, &str)],
    supplemental: &[(&str, &str)],
    data_len: u64,
    delimiter: u8,
) -> Result<SavePlan> {
    let mut offsets = SegmentOffsets::default();
    let mut text_bytes = Vec::new();
    let mut supplemental_text_bytes = Vec::new();

    // digit counts only grow with offsets, so this converges in a few passes
    for _ in 0..8 {
        let must = offset_entries(&offsets);
        let entries = must
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .chain(primary_extra.iter().copied());
        text_bytes = text::serialize(entries, delimiter)?;
        supplemental_text_bytes = if supplemental.is_empty() {
            Vec::new()
        } else {
            text::serialize(supplemental.iter().copied(), delimiter)?
        };

        let text_begin = HEADER_SIZE as u64;
        let text_end = text_begin + text_bytes.len() as u64 - 1;
        let stext = if supplemental_text_bytes.is_empty() {
            (0, 0)
        } else {
            let begin = text_end + 1;
            (begin, begin + supplemental_text_bytes.len() as u64 - 1)
        };
        let data_begin = if stext == (0, 0) { text_end + 1 } else { stext.1 + 1 };
        let next = SegmentOffsets {
            text: (text_begin, text_end),
            supplemental_text: stext,
            data: (data_begin, data_begin + data_len - 1),
            analysis: (0, 0),
        };
        if next == offsets {
            break;
        }
        offsets = next;
    }

    Ok(SavePlan {
        layout,
        offsets,
        text_bytes,
        supplemental_text_bytes,
    })
}

/// The six MUST keyword values for a given set of offsets
pub fn offset_entries(offsets: &SegmentOffsets) -> [(String, String); 6] {
    [
        (
            keywords::BEGIN_STEXT.to_string(),
            offsets.supplemental_text.0.to_string(),
        ),
        (
            keywords::END_STEXT.to_string(),
            offsets.supplemental_text.1.to_string(),
        ),
        (keywords::BEGIN_DATA.to_string(), offsets.data.0.to_string()),
        (keywords::END_DATA.to_string(), offsets.data.1.to_string()),
        (
            keywords::BEGIN_ANALYSIS.to_string(),
            offsets.analysis.0.to_string(),
        ),
        (
            keywords::END_ANALYSIS.to_string(),
            offsets.analysis.1.to_string(),
        ),
    ]
}
