//! TEXT segment tokenizer and serializer
//!
//! A TEXT segment starts with its delimiter byte; every keyword and value
//! is bounded by that delimiter, and a doubled delimiter inside a value is
//! an escaped literal. Several vendor deviations must decode anyway:
//! whitespace padding around the segment, empty values written as two
//! consecutive delimiters, redundant delimiters at the end of the buffer,
//! and bytes that are not valid UTF-8 (replaced with `?`).

use crate::error::{FcsError, Result};
use crate::log::FileLog;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ReadyForKeyword,
    InKeyword,
    StartOfValue,
    MiddleOfValue,
}

/// Split a TEXT (or supplemental TEXT) segment into keyword-value pairs.
///
/// The delimiter is the segment's first non-blank byte. Returns the
/// delimiter together with the pairs in file order; keys are returned raw
/// (normalization happens in the dictionary).
pub fn tokenize(segment: &[u8], log: &mut FileLog) -> Result<(u8, Vec<(String, String)>)> {
    let trimmed = trim_ascii(segment);
    if trimmed.is_empty() {
        log.error("TEXT segment contains only whitespace or nothing at all");
        return Err(FcsError::Malformed(String::from("TEXT segment is empty")));
    }
    let delim = trimmed[0];
    let bytes = &trimmed[1..];

    let mut pairs = Vec::new();
    let mut keyword: Vec<u8> = Vec::new();
    let mut value: Vec<u8> = Vec::new();
    let mut replaced_invalid = false;
    let mut state = State::ReadyForKeyword;

    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();
        match state {
            State::ReadyForKeyword => {
                if b == delim {
                    if bytes[i..]
                        .iter()
                        .all(|&c| c == delim || c.is_ascii_whitespace())
                    {
                        // redundant closing delimiters at buffer end
                        break;
                    }
                    log.warning("skipping redundant delimiter between entries");
                } else {
                    keyword.push(ascii_or_replacement(b, &mut replaced_invalid));
                    state = State::InKeyword;
                }
                i += 1;
            }
            State::InKeyword => {
                if b == delim {
                    state = State::StartOfValue;
                } else {
                    keyword.push(ascii_or_replacement(b, &mut replaced_invalid));
                }
                i += 1;
            }
            State::StartOfValue => {
                if b == delim {
                    if redundant_tail(&bytes[i..], delim) {
                        // padding delimiters at buffer end; the empty value
                        // is closed by the one delimiter actually needed
                        save_pair(&mut pairs, &mut keyword, &mut value, &mut replaced_invalid);
                        state = State::ReadyForKeyword;
                        break;
                    }
                    if next == Some(delim) {
                        // escaped delimiter opens the value
                        value.push(delim);
                        state = State::MiddleOfValue;
                        i += 2;
                    } else {
                        // two consecutive delimiters: empty value, technically
                        // invalid but decoded without complaint
                        save_pair(&mut pairs, &mut keyword, &mut value, &mut replaced_invalid);
                        state = State::ReadyForKeyword;
                        i += 1;
                    }
                } else {
                    value.push(b);
                    state = State::MiddleOfValue;
                    i += 1;
                }
            }
            State::MiddleOfValue => {
                if b == delim {
                    if redundant_tail(&bytes[i..], delim) {
                        save_pair(&mut pairs, &mut keyword, &mut value, &mut replaced_invalid);
                        state = State::ReadyForKeyword;
                        break;
                    }
                    if next == Some(delim) {
                        value.push(delim);
                        i += 2;
                    } else {
                        save_pair(&mut pairs, &mut keyword, &mut value, &mut replaced_invalid);
                        state = State::ReadyForKeyword;
                        i += 1;
                    }
                } else {
                    value.push(b);
                    i += 1;
                }
            }
        }
    }

    match state {
        State::ReadyForKeyword => {}
        State::InKeyword => {
            log.warning(format!(
                "dropping unterminated keyword fragment '{}' at end of TEXT segment",
                String::from_utf8_lossy(&keyword)
            ));
        }
        State::StartOfValue | State::MiddleOfValue => {
            log.warning(format!(
                "value of keyword '{}' was not closed by a delimiter",
                String::from_utf8_lossy(&keyword)
            ));
            save_pair(&mut pairs, &mut keyword, &mut value, &mut replaced_invalid);
        }
    }

    if replaced_invalid {
        log.warning("bytes that were not valid UTF-8 were replaced with '?'");
    }

    Ok((delim, pairs))
}

fn save_pair(
    pairs: &mut Vec<(String, String)>,
    keyword: &mut Vec<u8>,
    value: &mut Vec<u8>,
    replaced_invalid: &mut bool,
) {
    let key = String::from_utf8_lossy(keyword).to_string();
    let val = match String::from_utf8(core::mem::take(value)) {
        Ok(s) => s,
        Err(e) => {
            *replaced_invalid = true;
            String::from_utf8_lossy(e.as_bytes()).replace('\u{FFFD}', "?")
        }
    };
    keyword.clear();
    pairs.push((key, val));
}

/// True when the rest of the buffer is delimiters only and their count is
/// even. An odd run is a legitimate sequence of escaped delimiters plus the
/// closing one; an even run cannot close the value and is writer padding.
fn redundant_tail(rest: &[u8], delim: u8) -> bool {
    rest.iter().all(|&c| c == delim) && rest.len() % 2 == 0
}

fn ascii_or_replacement(b: u8, replaced: &mut bool) -> u8 {
    if b & 0x80 != 0 {
        *replaced = true;
        b'?'
    } else {
        b
    }
}

/// Serialize entries to TEXT segment bytes.
///
/// Values have each delimiter occurrence doubled; empty values are written
/// as a single blank so the output stays decodable. A keyword containing
/// the delimiter cannot be represented unambiguously and is rejected.
pub fn serialize<'a>(
    entries: impl IntoIterator<Item = (&'a str, &'a str)>,
    delimiter: u8,
) -> Result<Vec<u8>> {
    if delimiter == 0 || delimiter & 0x80 != 0 || delimiter.is_ascii_whitespace() {
        return Err(FcsError::Malformed(format!(
            "delimiter byte 0x{delimiter:02x} is not a printable ASCII character"
        )));
    }
    let mut out = vec![delimiter];
    for (key, value) in entries {
        if key.is_empty() {
            return Err(FcsError::Malformed(String::from(
                "cannot serialize an empty keyword",
            )));
        }
        if key.as_bytes().contains(&delimiter) {
            return Err(FcsError::Malformed(format!(
                "keyword '{key}' contains the delimiter character"
            )));
        }
        out.extend_from_slice(key.as_bytes());
        out.push(delimiter);
        if value.is_empty() {
            out.push(b' ');
        } else {
            out.extend_from_slice(&escape(value.as_bytes(), delimiter));
        }
        out.push(delimiter);
    }
    Ok(out)
}

/// Double every delimiter occurrence
pub fn escape(raw: &[u8], delimiter: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    for &b in raw {
        out.push(b);
        if b == delimiter {
            out.push(b);
        }
    }
    out
}

/// Collapse every doubled delimiter; the inverse of [`escape`]
pub fn unescape(escaped: &[u8], delimiter: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(escaped.len());
    let mut i = 0;
    while i < escaped.len() {
        out.push(escaped[i]);
        if escaped[i] == delimiter && escaped.get(i + 1) == Some(&delimiter) {
            i += 2;
        } else {
            i += 1;
        }
    }
    out
}

/// A TEXT end offset one byte short of the closing delimiter is a known
/// vendor bug; extend by one when the byte after the segment is the
/// delimiter. Offsets are inclusive.
pub fn adjust_segment_end(file: &[u8], begin: usize, end: usize) -> usize {
    if begin >= file.len() || end + 1 >= file.len() {
        return end;
    }
    let delim = file[begin];
    if file[end] != delim && file[end + 1] == delim {
        end + 1
    } else {
        end
    }
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace() && *b != 0)
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace() && *b != 0)
        .map(|p| p + 1)
        .unwrap_or(start);
    &bytes[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs_of(segment: &[u8]) -> Vec<(String, String)> {
        let mut log = FileLog::new();
        tokenize(segment, &mut log).unwrap().1
    }

    #[test]
    fn test_basic_pairs() {
        let pairs = pairs_of(b"/$DATATYPE/F/$PAR/2/");
        assert_eq!(
            pairs,
            [
                ("$DATATYPE".to_string(), "F".to_string()),
                ("$PAR".to_string(), "2".to_string())
            ]
        );
    }

    #[test]
    fn test_delimiter_is_discovered_from_first_byte() {
        let pairs = pairs_of(b"|$MODE|L|");
        assert_eq!(pairs, [("$MODE".to_string(), "L".to_string())]);
    }

    #[test]
    fn test_escaped_delimiter_in_value() {
        let pairs = pairs_of(b"/$FIL/dir//file.fcs/");
        assert_eq!(pairs, [("$FIL".to_string(), "dir/file.fcs".to_string())]);
    }

    #[test]
    fn test_value_that_is_a_single_delimiter() {
        let pairs = pairs_of(b"/KEY////");
        assert_eq!(pairs, [("KEY".to_string(), "/".to_string())]);
    }

    #[test]
    fn test_empty_value_leniency() {
        // two consecutive delimiters with no blank between them
        let pairs = pairs_of(b"/$SMNO//$PAR/2/");
        assert_eq!(
            pairs,
            [
                ("$SMNO".to_string(), String::new()),
                ("$PAR".to_string(), "2".to_string())
            ]
        );
    }

    #[test]
    fn test_surrounding_whitespace_is_skipped() {
        let pairs = pairs_of(b"   /$PAR/2/  \n");
        assert_eq!(pairs, [("$PAR".to_string(), "2".to_string())]);
    }

    #[test]
    fn test_trailing_redundant_delimiters_collapse() {
        let pairs = pairs_of(b"/$PAR/2////");
        assert_eq!(pairs, [("$PAR".to_string(), "2".to_string())]);
    }

    #[test]
    fn test_high_bit_bytes_become_question_marks() {
        let mut log = FileLog::new();
        let (_, pairs) = tokenize(b"/KEY/caf\xe9/", &mut log).unwrap();
        assert_eq!(pairs, [("KEY".to_string(), "caf?".to_string())]);
        assert_eq!(log.warnings().count(), 1);
    }

    #[test]
    fn test_valid_utf8_value_survives() {
        let segment = "/CELLS/нейтрофилы/".as_bytes();
        let pairs = pairs_of(segment);
        assert_eq!(pairs[0].1, "нейтрофилы");
    }

    #[test]
    fn test_unterminated_value_is_kept_with_warning() {
        let mut log = FileLog::new();
        let (_, pairs) = tokenize(b"/$PAR/2/$CYT/Aurora", &mut log).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1], ("$CYT".to_string(), "Aurora".to_string()));
        assert_eq!(log.warnings().count(), 1);
    }

    #[test]
    fn test_empty_segment_is_malformed() {
        let mut log = FileLog::new();
        assert!(tokenize(b"   ", &mut log).is_err());
    }

    #[test]
    fn test_escape_is_involutive() {
        for value in [&b""[..], b"plain", b"/", b"a/b", b"//", b"a//b/c/"] {
            let escaped = escape(value, b'/');
            assert_eq!(unescape(&escaped, b'/'), value);
        }
    }

    #[test]
    fn test_serialize_roundtrip() {
        let entries = [
            ("$DATATYPE", "F"),
            ("$FIL", "dir/file.fcs"),
            ("$SMNO", ""),
            ("$CYT", "Aurora"),
        ];
        let bytes = serialize(entries.iter().copied(), b'/').unwrap();
        let mut log = FileLog::new();
        let (delim, pairs) = tokenize(&bytes, &mut log).unwrap();
        assert_eq!(delim, b'/');
        assert_eq!(pairs.len(), 4);
        assert_eq!(pairs[1].1, "dir/file.fcs");
        // empty values round-trip through a single blank
        assert_eq!(pairs[2].1, " ");
    }

    #[test]
    fn test_serialize_rejects_bad_delimiters_and_keys() {
        assert!(serialize([("K", "v")], b' ').is_err());
        assert!(serialize([("K", "v")], 0xFF).is_err());
        assert!(serialize([("", "v")], b'/').is_err());
        assert!(serialize([("A/B", "v")], b'/').is_err());
    }

    #[test]
    fn test_adjust_segment_end_extends_short_offset() {
        //                0123456789
        let file = b"xx/$PAR/2/yy";
        // end points at '2' (index 8); the closing delimiter is one past it
        assert_eq!(adjust_segment_end(file, 2, 8), 9);
        // correct end offset is left alone
        assert_eq!(adjust_segment_end(file, 2, 9), 9);
    }
}
