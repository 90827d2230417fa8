//! File writing
//!
//! Saving always rewrites the structural keywords from the matrix itself
//! (precision, byte order, counts, widths), plans the TEXT layout, and
//! writes the segments sequentially: header, TEXT, supplemental TEXT,
//! DATA, then the fixed checksum field. Event data is always written as
//! floats of the matrix's own precision in native byte order.

use crate::codec;
use crate::reader::FcsFile;
use fcs_core::format::constants::{keywords, CHECKSUM_FIELD};
use fcs_core::save_plan::offset_entries;
use fcs_core::{plan_save, ByteOrder, EventStore, FcsError, FcsHeader, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

impl FcsFile {
    /// Write this dataset to `path`, replacing any existing file.
    ///
    /// On success the dataset's offsets and offset keywords describe the
    /// file just written.
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.log.clear();
        let path = path.as_ref();

        let matrix = match &self.matrix {
            Some(matrix) => matrix,
            None => {
                self.log.error("save requires decoded event data");
                return Err(FcsError::Malformed(String::from(
                    "no event data to save",
                )));
            }
        };
        let (events, count) = matrix.dimensions();
        if count == 0 {
            self.log.error("save requires at least one parameter");
            return Err(FcsError::Malformed(String::from(
                "cannot save a dataset with zero parameters",
            )));
        }
        let double = matrix.is_double_precision();

        // structural keywords always reflect the matrix, never stale input
        let dict = &mut self.dictionary;
        dict.set(keywords::DATATYPE, if double { "D" } else { "F" });
        dict.set(keywords::BYTEORD, ByteOrder::native().keyword_value());
        dict.set(keywords::MODE, "L");
        dict.set(keywords::NEXTDATA, "0");
        dict.set(keywords::PAR, count.to_string());
        dict.set(keywords::TOT, events.to_string());
        for n in 1..=count {
            dict.set_param(keywords::PN_BITS, n, if double { "64" } else { "32" });
            if dict.get_param(keywords::PN_SHORT_NAME, n).is_none() {
                let name = matrix.parameter_name(n - 1).unwrap_or("");
                dict.set_param(keywords::PN_SHORT_NAME, n, name);
            }
            if dict.get_param(keywords::PN_RANGE, n).is_none() {
                let max = matrix
                    .specified_range(n - 1)
                    .map(|r| r.max)
                    .filter(|&m| m > 0.0)
                    .or_else(|| matrix.observed_range(n - 1).map(|r| r.max))
                    .unwrap_or(0.0);
                dict.set_param(
                    keywords::PN_RANGE,
                    n,
                    format!("{}", max.max(0.0).ceil() as u64),
                );
            }
            if dict.get_param(keywords::PN_AMPLIFICATION, n).is_none() {
                dict.set_param(keywords::PN_AMPLIFICATION, n, "0,0");
            }
        }

        let data_len = codec::encoded_len(matrix);
        let plan = plan_save(dict, data_len, self.delimiter, &mut self.log)?;
        for (key, value) in offset_entries(&plan.offsets) {
            dict.set(&key, value);
        }

        let header = FcsHeader {
            version: self.version,
            text: plan.offsets.text,
            data: plan.offsets.data,
            analysis: (0, 0),
        };

        let file = File::create(path).map_err(|e| {
            self.log.error(format!("failed to create {}: {e}", path.display()));
            FcsError::Io(format!("failed to create file: {e}"))
        })?;
        let mut out = BufWriter::new(file);
        write_chunk(&mut out, &header.to_bytes(), &mut self.log)?;
        write_chunk(&mut out, &plan.text_bytes, &mut self.log)?;
        write_chunk(&mut out, &plan.supplemental_text_bytes, &mut self.log)?;
        codec::encode_into(matrix, ByteOrder::native(), &mut out)?;
        write_chunk(&mut out, &CHECKSUM_FIELD, &mut self.log)?;
        out.flush().map_err(|e| {
            self.log.error(format!("failed to flush output: {e}"));
            FcsError::Io(format!("failed to flush output file: {e}"))
        })?;

        self.offsets = plan.offsets;
        self.log.info(format!(
            "wrote {events} events, {count} parameters to {}",
            path.display()
        ));
        Ok(())
    }
}

fn write_chunk<W: Write>(out: &mut W, bytes: &[u8], log: &mut fcs_core::FileLog) -> Result<()> {
    out.write_all(bytes).map_err(|e| {
        log.error(format!("write failed: {e}"));
        FcsError::Io(format!("failed to write output file: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoadConfig;
    use crate::matrix::EventMatrix;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("fcs-writer-{}-{name}.fcs", std::process::id()));
        path
    }

    fn sample_file() -> FcsFile {
        let mut matrix = EventMatrix::new(
            vec!["FSC".to_string(), "SSC".to_string()],
            3,
            false,
        );
        for (e, (a, b)) in [(1.0, 10.0), (2.0, 20.0), (3.0, 30.0)].iter().enumerate() {
            matrix.set(e, 0, *a);
            matrix.set(e, 1, *b);
        }
        matrix.recompute_observed_ranges();
        let mut file = FcsFile::new();
        file.dictionary.set("$CYT", "SynthCyt");
        file.set_matrix(matrix);
        file
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let path = temp_path("roundtrip");
        let mut file = sample_file();
        file.save(&path).unwrap();

        let loaded = FcsFile::load_with(&path, LoadConfig::new().with_scaling(false)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.version, fcs_core::Version::Fcs3_1);
        assert_eq!(loaded.dictionary.get("$CYT"), Some("SynthCyt"));
        assert_eq!(loaded.dictionary.get("$PAR"), Some("2"));
        assert_eq!(loaded.dictionary.get("$TOT"), Some("3"));
        let m = loaded.matrix.unwrap();
        assert_eq!(m.column_f32(0).unwrap(), &[1.0, 2.0, 3.0]);
        assert_eq!(m.column_f32(1).unwrap(), &[10.0, 20.0, 30.0]);
        assert_eq!(m.names(), &["FSC".to_string(), "SSC".to_string()]);
    }

    #[test]
    fn test_save_refreshes_structural_keywords() {
        let path = temp_path("refresh");
        let mut file = sample_file();
        // stale values that must be overwritten on save
        file.dictionary.set("$DATATYPE", "I");
        file.dictionary.set("$TOT", "99999");
        file.save(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(file.dictionary.get("$DATATYPE"), Some("F"));
        assert_eq!(file.dictionary.get("$TOT"), Some("3"));
        assert_eq!(file.dictionary.get("$P1B"), Some("32"));
        assert_eq!(file.dictionary.get("$P1N"), Some("FSC"));
    }

    #[test]
    fn test_save_offsets_match_written_file() {
        let path = temp_path("offsets");
        let mut file = sample_file();
        file.save(&path).unwrap();
        let written = std::fs::read(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(
            file.dictionary.get("$BEGINDATA"),
            Some(file.offsets.data.0.to_string().as_str())
        );
        // checksum field trails the DATA segment
        assert_eq!(written.len() as u64, file.offsets.data.1 + 1 + 8);
        assert_eq!(&written[written.len() - 8..], b"00000000");
    }

    #[test]
    fn test_save_without_matrix_is_malformed() {
        let mut file = FcsFile::new();
        let err = file.save(temp_path("nodata")).unwrap_err();
        assert_eq!(err.kind(), fcs_core::ErrorKind::Malformed);
    }

    #[test]
    fn test_double_precision_roundtrip() {
        let path = temp_path("double");
        let mut matrix = EventMatrix::new(vec!["TIME".to_string()], 2, true);
        matrix.set(0, 0, 0.125);
        matrix.set(1, 0, 1e12);
        matrix.recompute_observed_ranges();
        let mut file = FcsFile::new();
        file.set_matrix(matrix);
        file.save(&path).unwrap();
        assert_eq!(file.dictionary.get("$DATATYPE"), Some("D"));
        assert_eq!(file.dictionary.get("$P1B"), Some("64"));

        let loaded = FcsFile::load_with(&path, LoadConfig::new().with_scaling(false)).unwrap();
        std::fs::remove_file(&path).ok();
        let m = loaded.matrix.unwrap();
        assert!(m.is_double_precision());
        assert_eq!(m.column_f64(0).unwrap(), &[0.125, 1e12]);
    }
}
