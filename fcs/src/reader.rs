//! File loading
//!
//! Loading walks the container front to back: header, primary TEXT,
//! offset reconciliation against the dictionary, supplemental TEXT, a
//! readiness check of the structural keywords, then the DATA segment.
//! Recoverable oddities go to the file log; unrecoverable ones abort with
//! an error that names the first fatal problem.

use crate::codec;
use crate::config::LoadConfig;
use crate::matrix::EventMatrix;
use crate::scaling;
use fcs_core::format::constants::{keywords, DEFAULT_DELIMITER};
use fcs_core::{
    text, ByteOrder, DataKind, Dictionary, FcsError, FcsHeader, FileLog, Mode,
    ParameterDescriptor, Result, SegmentOffsets, Version,
};
use std::fs::File;
use std::path::Path;

/// A loaded (or in-construction) FCS dataset
#[derive(Debug, Clone)]
pub struct FcsFile {
    pub version: Version,
    pub dictionary: Dictionary,
    pub offsets: SegmentOffsets,
    /// Non-fatal findings from the last load or save
    pub log: FileLog,
    /// Decoded event data; `None` until a DATA segment has been decoded
    /// or event data has been attached
    pub matrix: Option<EventMatrix>,
    /// TEXT delimiter, preserved from the loaded file
    pub(crate) delimiter: u8,
}

impl Default for FcsFile {
    fn default() -> Self {
        Self::new()
    }
}

impl FcsFile {
    /// An empty in-memory dataset, written as FCS3.1 by default
    pub fn new() -> Self {
        Self {
            version: Version::Fcs3_1,
            dictionary: Dictionary::new(),
            offsets: SegmentOffsets::default(),
            log: FileLog::new(),
            matrix: None,
            delimiter: DEFAULT_DELIMITER,
        }
    }

    /// Load a file with the default configuration
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with(path, LoadConfig::default())
    }

    pub fn load_with<P: AsRef<Path>>(path: P, config: LoadConfig) -> Result<Self> {
        let (result, _) = Self::load_logged(path, config);
        result
    }

    /// Load a file, returning the log alongside the result so findings
    /// survive a failed load
    pub fn load_logged<P: AsRef<Path>>(path: P, config: LoadConfig) -> (Result<Self>, FileLog) {
        let mut log = FileLog::new();
        match load_impl(path.as_ref(), &config, &mut log) {
            Ok(mut file) => {
                file.log = log.clone();
                (Ok(file), log)
            }
            Err(err) => (Err(err), log),
        }
    }

    /// The TEXT delimiter this dataset was loaded with, reused on save
    pub fn text_delimiter(&self) -> u8 {
        self.delimiter
    }

    pub fn set_text_delimiter(&mut self, delimiter: u8) {
        self.delimiter = delimiter;
    }

    /// Attach event data built in memory
    pub fn set_matrix(&mut self, matrix: EventMatrix) {
        self.matrix = Some(matrix);
    }
}

fn load_impl(path: &Path, config: &LoadConfig, log: &mut FileLog) -> Result<FcsFile> {
    let file = File::open(path).map_err(|e| {
        log.error(format!("failed to open {}: {e}", path.display()));
        FcsError::Io(format!("failed to open file: {e}"))
    })?;

    #[cfg(feature = "mmap")]
    let mapped = unsafe { memmap2::Mmap::map(&file) }.map_err(|e| {
        log.error(format!("failed to map {}: {e}", path.display()));
        FcsError::Io(format!("failed to memory-map file: {e}"))
    })?;
    #[cfg(feature = "mmap")]
    let bytes: &[u8] = &mapped;

    #[cfg(not(feature = "mmap"))]
    let buffer = {
        use std::io::Read;
        let mut buffer = Vec::new();
        (&file)
            .read_to_end(&mut buffer)
            .map_err(|e| FcsError::Io(format!("failed to read file: {e}")))?;
        buffer
    };
    #[cfg(not(feature = "mmap"))]
    let bytes: &[u8] = &buffer;

    decode_container(bytes, config, log)
}

/// Decode a whole container image already in memory
pub(crate) fn decode_container(
    bytes: &[u8],
    config: &LoadConfig,
    log: &mut FileLog,
) -> Result<FcsFile> {
    let file_size = bytes.len() as u64;
    let header = FcsHeader::from_bytes(bytes, log)?;
    if header.text.1 >= file_size {
        log.error(format!(
            "header places the TEXT segment end at {} in a {file_size}-byte file",
            header.text.1
        ));
        return Err(FcsError::Truncated(String::from(
            "TEXT segment extends past the end of the file",
        )));
    }

    let mut offsets = SegmentOffsets::from_header(&header);
    let mut dict = Dictionary::new();
    offsets.seed_dictionary(&mut dict);

    let text_begin = header.text.0 as usize;
    let text_end = text::adjust_segment_end(bytes, text_begin, header.text.1 as usize);
    let (delimiter, pairs) = text::tokenize(&bytes[text_begin..=text_end], log)?;
    for (key, value) in pairs {
        dict.set(&key, value);
    }

    offsets.resolve_from_dictionary(&dict, log)?;
    offsets.validate(file_size, log)?;

    if offsets.supplemental_text != (0, 0) {
        let begin = offsets.supplemental_text.0 as usize;
        let end = text::adjust_segment_end(bytes, begin, offsets.supplemental_text.1 as usize);
        let (_, pairs) = text::tokenize(&bytes[begin..=end], log)?;
        for (key, value) in pairs {
            if dict.contains_key(&key) {
                log.warning(format!(
                    "supplemental TEXT redefines {key}; keeping the primary value"
                ));
            } else {
                dict.set(&key, value);
            }
        }
    }

    // readiness: the structural keywords the codec depends on
    let kind = match dict.get(keywords::DATATYPE) {
        Some(value) => DataKind::from_keyword(value).map_err(|e| {
            log.error(e.message().to_string());
            e
        })?,
        None => {
            log.error("required keyword $DATATYPE is missing");
            return Err(FcsError::Malformed(String::from("missing $DATATYPE")));
        }
    };
    match dict.get(keywords::MODE) {
        Some(value) => {
            Mode::from_keyword(value).map_err(|e| {
                log.error(e.message().to_string());
                e
            })?;
        }
        None => log.info("$MODE is missing; assuming list mode"),
    }
    if dict.get_u64(keywords::NEXTDATA)?.unwrap_or(0) != 0 {
        log.error("$NEXTDATA points at a second dataset; only the first is supported");
        return Err(FcsError::Unsupported(String::from(
            "multi-dataset files are not supported",
        )));
    }
    let order = match dict.get(keywords::BYTEORD) {
        Some(value) => ByteOrder::from_keyword(value).map_err(|e| {
            log.error(e.message().to_string());
            e
        })?,
        None => {
            log.info("$BYTEORD is missing; assuming least-significant byte first");
            ByteOrder::LittleEndian
        }
    };
    let count = dict.get_u64(keywords::PAR)?.ok_or_else(|| {
        log.error("required keyword $PAR is missing");
        FcsError::Malformed(String::from("missing $PAR"))
    })? as usize;
    if count == 0 {
        log.error("$PAR declares zero parameters");
        return Err(FcsError::Malformed(String::from("$PAR must be positive")));
    }
    let params = (1..=count)
        .map(|n| ParameterDescriptor::from_dictionary(&dict, n, kind))
        .collect::<Result<Vec<_>>>()
        .map_err(|e| {
            log.error(e.message().to_string());
            e
        })?;

    let data = &bytes[offsets.data.0 as usize..=offsets.data.1 as usize];
    let declared = dict.get_u64(keywords::TOT)?;
    let mut matrix = codec::decode(
        data,
        kind,
        &params,
        order,
        declared,
        config.max_events,
        config.f32_significant_bits,
        log,
    )?;

    // keep the structural keywords consistent with what was materialized
    dict.set(keywords::TOT, matrix.event_count().to_string());

    if config.scale_data {
        scaling::apply_scaling(&mut matrix, &mut dict, log)?;
    }

    Ok(FcsFile {
        version: header.version,
        dictionary: dict,
        offsets,
        log: FileLog::new(),
        matrix: Some(matrix),
        delimiter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fcs_core::format::constants::CHECKSUM_FIELD;
    use fcs_core::EventStore;

    /// Build a minimal FCS3.1 image: header, TEXT, float32 DATA
    pub(crate) fn build_image(extra_keywords: &[(&str, &str)], values: &[&[f32]]) -> Vec<u8> {
        let count = values.len();
        let events = values.first().map_or(0, |c| c.len());
        let mut dict = Dictionary::new();
        dict.set("$DATATYPE", "F");
        dict.set("$MODE", "L");
        dict.set("$BYTEORD", "1,2,3,4");
        dict.set("$NEXTDATA", "0");
        dict.set("$PAR", count.to_string());
        dict.set("$TOT", events.to_string());
        for n in 1..=count {
            dict.set_param("$PnB", n, "32");
            dict.set_param("$PnN", n, format!("P{n}"));
            dict.set_param("$PnR", n, "1024");
        }
        for (k, v) in extra_keywords {
            dict.set(k, *v);
        }

        let data_len = (events * count * 4) as u64;
        let mut log = FileLog::new();
        let plan = fcs_core::plan_save(&dict, data_len, b'/', &mut log).unwrap();
        let header = FcsHeader {
            version: Version::Fcs3_1,
            text: plan.offsets.text,
            data: plan.offsets.data,
            analysis: (0, 0),
        };

        let mut image = Vec::new();
        image.extend_from_slice(&header.to_bytes());
        image.extend_from_slice(&plan.text_bytes);
        image.extend_from_slice(&plan.supplemental_text_bytes);
        for e in 0..events {
            for col in values {
                image.extend_from_slice(&col[e].to_le_bytes());
            }
        }
        image.extend_from_slice(&CHECKSUM_FIELD);
        image
    }

    #[test]
    fn test_decode_minimal_container() {
        let image = build_image(&[("$CYT", "TestCyt")], &[&[1.0, 2.0, 3.0], &[9.0, 8.0, 7.0]]);
        let mut log = FileLog::new();
        let file = decode_container(&image, &LoadConfig::default(), &mut log).unwrap();
        assert_eq!(file.version, Version::Fcs3_1);
        assert_eq!(file.dictionary.get("$CYT"), Some("TestCyt"));
        let m = file.matrix.unwrap();
        assert_eq!(m.dimensions(), (3, 2));
        assert_eq!(m.column_f32(0).unwrap(), &[1.0, 2.0, 3.0]);
        assert_eq!(m.names(), &["P1".to_string(), "P2".to_string()]);
        assert!(!log.has_errors());
    }

    #[test]
    fn test_missing_datatype_is_malformed() {
        let mut image = build_image(&[], &[&[1.0]]);
        // blank out the $DATATYPE entry in TEXT
        let needle = b"$DATATYPE/F/";
        let pos = image
            .windows(needle.len())
            .position(|w| w == needle)
            .unwrap();
        image[pos..pos + needle.len()].copy_from_slice(b"$DATAXYPE/F/");
        let mut log = FileLog::new();
        let err = decode_container(&image, &LoadConfig::default(), &mut log).unwrap_err();
        assert_eq!(err.kind(), fcs_core::ErrorKind::Malformed);
        assert!(log.has_errors());
    }

    #[test]
    fn test_multi_dataset_rejected() {
        let image = build_image(&[("$NEXTDATA", "4096")], &[&[1.0]]);
        let mut log = FileLog::new();
        let err = decode_container(&image, &LoadConfig::default(), &mut log).unwrap_err();
        assert_eq!(err.kind(), fcs_core::ErrorKind::Unsupported);
    }

    #[test]
    fn test_truncated_file_fails_with_truncated() {
        let image = build_image(&[], &[&[1.0, 2.0, 3.0, 4.0]]);
        let cut = &image[..image.len() - 16];
        let mut log = FileLog::new();
        let err = decode_container(cut, &LoadConfig::default(), &mut log).unwrap_err();
        assert_eq!(err.kind(), fcs_core::ErrorKind::Truncated);
    }

    #[test]
    fn test_max_events_cap() {
        let image = build_image(&[], &[&[1.0, 2.0, 3.0, 4.0]]);
        let config = LoadConfig::new().with_max_events(2);
        let mut log = FileLog::new();
        let file = decode_container(&image, &config, &mut log).unwrap();
        let m = file.matrix.unwrap();
        assert_eq!(m.event_count(), 2);
        assert_eq!(m.original_event_count(), 4);
        // $TOT reflects the materialized count
        assert_eq!(file.dictionary.get("$TOT"), Some("2"));
    }

    /// Image whose keywords are split across primary and supplemental TEXT,
    /// with `$CYT` deliberately present in both
    fn build_split_image(values: &[f32]) -> Vec<u8> {
        let primary: Vec<(&str, &str)> = vec![
            ("$DATATYPE", "F"),
            ("$MODE", "L"),
            ("$BYTEORD", "1,2,3,4"),
            ("$NEXTDATA", "0"),
            ("$PAR", "1"),
            ("$TOT", "2"),
            ("$P1B", "32"),
            ("$P1N", "P1"),
            ("$P1R", "1024"),
            ("$CYT", "PrimaryCyt"),
        ];
        let supplemental = [("VENDORBLOB", "vendor state"), ("$CYT", "ShadowCyt")];
        let stext_bytes = text::serialize(supplemental.iter().copied(), b'/').unwrap();
        let data_len = (values.len() * 4) as u64;

        // the offset keyword digits feed back into the TEXT length
        let mut offsets = SegmentOffsets::default();
        let mut text_bytes = Vec::new();
        for _ in 0..8 {
            let must = fcs_core::save_plan::offset_entries(&offsets);
            let entries = must
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .chain(primary.iter().copied());
            text_bytes = text::serialize(entries, b'/').unwrap();
            let text = (58u64, 58 + text_bytes.len() as u64 - 1);
            let stext = (text.1 + 1, text.1 + stext_bytes.len() as u64);
            let data = (stext.1 + 1, stext.1 + data_len);
            let next = SegmentOffsets {
                text,
                supplemental_text: stext,
                data,
                analysis: (0, 0),
            };
            if next == offsets {
                break;
            }
            offsets = next;
        }

        let header = FcsHeader {
            version: Version::Fcs3_1,
            text: offsets.text,
            data: offsets.data,
            analysis: (0, 0),
        };
        let mut image = Vec::new();
        image.extend_from_slice(&header.to_bytes());
        image.extend_from_slice(&text_bytes);
        image.extend_from_slice(&stext_bytes);
        for v in values {
            image.extend_from_slice(&v.to_le_bytes());
        }
        image.extend_from_slice(&CHECKSUM_FIELD);
        image
    }

    #[test]
    fn test_supplemental_text_merges_without_overwriting() {
        let image = build_split_image(&[4.0, 8.0]);
        let mut log = FileLog::new();
        let file = decode_container(&image, &LoadConfig::default(), &mut log).unwrap();

        // the vendor entry arrives from the supplemental segment
        assert_eq!(file.dictionary.get("VENDORBLOB"), Some("vendor state"));
        // the primary value wins the collision and the collision is logged
        assert_eq!(file.dictionary.get("$CYT"), Some("PrimaryCyt"));
        assert!(log
            .warnings()
            .any(|e| e.message.contains("supplemental TEXT redefines $CYT")));

        let m = file.matrix.unwrap();
        assert_eq!(m.column_f32(0).unwrap(), &[4.0, 8.0]);
    }

    #[test]
    fn test_delimiter_preserved() {
        let image = build_image(&[], &[&[1.0]]);
        let mut log = FileLog::new();
        let file = decode_container(&image, &LoadConfig::default(), &mut log).unwrap();
        assert_eq!(file.text_delimiter(), b'/');
    }
}
