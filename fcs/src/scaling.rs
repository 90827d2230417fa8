//! Channel-to-scale value transforms
//!
//! Applies the `$PnE`/`$PnG` transforms declared per parameter, rewriting
//! the dictionary afterwards so the data is self-describing again: scaled
//! columns carry `$PnE=0,0`, no gain, and a range covering the scaled
//! values. Columns are independent, so they are transformed in parallel.

use crate::matrix::{EventData, EventMatrix};
use fcs_core::format::constants::keywords;
use fcs_core::{Dictionary, EventStore, FcsError, FileLog, ParameterScaling, Result};
use rayon::prelude::*;

/// Transform a stored channel value to its scale value
pub fn scale_value(channel: f64, scaling: &ParameterScaling, range: f64) -> f64 {
    match scaling {
        ParameterScaling::Linear { gain } => channel / gain,
        ParameterScaling::Logarithmic { decades, offset } => {
            10f64.powf(decades * channel / range) * offset
        }
    }
}

/// Inverse of [`scale_value`]
pub fn unscale_value(scaled: f64, scaling: &ParameterScaling, range: f64) -> f64 {
    match scaling {
        ParameterScaling::Linear { gain } => scaled * gain,
        ParameterScaling::Logarithmic { decades, offset } => {
            (scaled / offset).log10() * range / decades
        }
    }
}

/// Apply the declared scaling to every column of the matrix, then rewrite
/// the scaling keywords to describe the data as already scaled.
pub fn apply_scaling(
    matrix: &mut EventMatrix,
    dict: &mut Dictionary,
    log: &mut FileLog,
) -> Result<()> {
    let (_, count) = matrix.dimensions();
    let mut specs: Vec<(ParameterScaling, f64)> = Vec::with_capacity(count);
    for n in 1..=count {
        let scaling = ParameterScaling::from_keywords(
            dict.get_param(keywords::PN_AMPLIFICATION, n),
            dict.get_param(keywords::PN_GAIN, n),
        )?;
        let range = match dict.get_param(keywords::PN_RANGE, n) {
            Some(value) => value.trim().parse::<f64>().unwrap_or(0.0),
            None => 0.0,
        };
        if matches!(scaling, ParameterScaling::Logarithmic { .. }) && range <= 0.0 {
            log.error(format!(
                "parameter {n} declares log scaling but has no usable $PnR range"
            ));
            return Err(FcsError::Malformed(format!(
                "log scaling for parameter {n} requires a positive $PnR"
            )));
        }
        specs.push((scaling, range));
    }

    if specs.iter().all(|(s, _)| s.is_identity()) {
        return Ok(());
    }

    match matrix.data_mut() {
        EventData::Single(cols) => {
            cols.par_iter_mut().enumerate().for_each(|(i, col)| {
                let (scaling, range) = &specs[i];
                if scaling.is_identity() {
                    return;
                }
                for v in col.iter_mut() {
                    *v = scale_value(*v as f64, scaling, *range) as f32;
                }
            });
        }
        EventData::Double(cols) => {
            cols.par_iter_mut().enumerate().for_each(|(i, col)| {
                let (scaling, range) = &specs[i];
                if scaling.is_identity() {
                    return;
                }
                for v in col.iter_mut() {
                    *v = scale_value(*v, scaling, *range);
                }
            });
        }
    }

    let mut transformed = 0;
    for (i, (scaling, range)) in specs.iter().enumerate() {
        let n = i + 1;
        let (min, max) = match scaling {
            ParameterScaling::Logarithmic { decades, offset } => {
                (*offset, 10f64.powf(*decades) * offset)
            }
            ParameterScaling::Linear { gain } => (0.0, range / gain),
        };
        matrix.set_specified_range(i, min, max);
        if scaling.is_identity() {
            continue;
        }
        transformed += 1;
        dict.set_param(keywords::PN_AMPLIFICATION, n, "0,0");
        dict.remove_param(keywords::PN_GAIN, n);
        dict.set_param(keywords::PN_RANGE, n, format!("{}", max.ceil() as u64));
    }
    matrix.recompute_observed_ranges();
    log.info(format!("applied scaling to {transformed} of {count} parameters"));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_scale() {
        let s = ParameterScaling::Linear { gain: 2.0 };
        assert_eq!(scale_value(10.0, &s, 1024.0), 5.0);
        assert_eq!(unscale_value(5.0, &s, 1024.0), 10.0);
    }

    #[test]
    fn test_log_scale_endpoints() {
        // 4 decades over a 1024-channel range starting at 1.0
        let s = ParameterScaling::Logarithmic {
            decades: 4.0,
            offset: 1.0,
        };
        assert!((scale_value(0.0, &s, 1024.0) - 1.0).abs() < 1e-12);
        assert!((scale_value(1024.0, &s, 1024.0) - 10_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_scale_unscale_roundtrip() {
        let cases = [
            ParameterScaling::Linear { gain: 0.5 },
            ParameterScaling::Logarithmic {
                decades: 4.5,
                offset: 0.1,
            },
        ];
        for s in &cases {
            for channel in [0.0, 1.0, 17.5, 512.0, 1023.0] {
                let back = unscale_value(scale_value(channel, s, 1024.0), s, 1024.0);
                assert!(
                    (back - channel).abs() < 1e-9,
                    "roundtrip failed for {channel} under {s:?}"
                );
            }
        }
    }

    fn log_dict() -> Dictionary {
        let mut dict = Dictionary::new();
        dict.set("$P1N", "FL1");
        dict.set("$P1B", "16");
        dict.set("$P1R", "1024");
        dict.set("$P1E", "4,1");
        dict
    }

    #[test]
    fn test_apply_scaling_rewrites_keywords() {
        let mut matrix = EventMatrix::new(vec!["FL1".to_string()], 2, true);
        matrix.set(0, 0, 0.0);
        matrix.set(1, 0, 1024.0);
        let mut dict = log_dict();
        let mut log = FileLog::new();
        apply_scaling(&mut matrix, &mut dict, &mut log).unwrap();

        assert!((matrix.get(0, 0).unwrap() - 1.0).abs() < 1e-9);
        assert!((matrix.get(1, 0).unwrap() - 10_000.0).abs() < 1e-6);
        assert_eq!(dict.get("$P1E"), Some("0,0"));
        assert_eq!(dict.get("$P1G"), None);
        assert_eq!(dict.get("$P1R"), Some("10000"));

        let r = matrix.specified_range(0).unwrap();
        assert_eq!(r.min, 1.0);
        assert!((r.max - 10_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_apply_scaling_is_idempotent_after_rewrite() {
        let mut matrix = EventMatrix::new(vec!["FL1".to_string()], 1, true);
        matrix.set(0, 0, 512.0);
        let mut dict = log_dict();
        let mut log = FileLog::new();
        apply_scaling(&mut matrix, &mut dict, &mut log).unwrap();
        let once = matrix.get(0, 0).unwrap();
        apply_scaling(&mut matrix, &mut dict, &mut log).unwrap();
        assert_eq!(matrix.get(0, 0).unwrap(), once);
    }

    #[test]
    fn test_log_scaling_without_range_is_malformed() {
        let mut matrix = EventMatrix::new(vec!["FL1".to_string()], 1, false);
        let mut dict = log_dict();
        dict.remove("$P1R");
        let mut log = FileLog::new();
        let err = apply_scaling(&mut matrix, &mut dict, &mut log).unwrap_err();
        assert_eq!(err.kind(), fcs_core::ErrorKind::Malformed);
    }

    #[test]
    fn test_identity_scaling_leaves_dictionary_alone() {
        let mut matrix = EventMatrix::new(vec!["FSC".to_string()], 1, false);
        matrix.set(0, 0, 7.0);
        let mut dict = Dictionary::new();
        dict.set("$P1N", "FSC");
        dict.set("$P1R", "1024");
        let mut log = FileLog::new();
        apply_scaling(&mut matrix, &mut dict, &mut log).unwrap();
        assert_eq!(matrix.get(0, 0), Some(7.0));
        assert!(log.is_empty());
    }
}
