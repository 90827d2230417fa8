//! Per-parameter descriptors
//!
//! A descriptor is computed on demand from the dictionary keywords
//! `$PnB` (bit width), `$PnN` (short name), `$PnR` (range) and the scaling
//! keywords `$PnE`/`$PnG`. It is never stored independently.

use crate::dictionary::{param_key, Dictionary};
use crate::error::{FcsError, Result};
use crate::format::constants::keywords;
use crate::format::types::DataKind;
use alloc::format;
use alloc::string::{String, ToString};

/// Channel-to-scale conversion declared for one parameter
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParameterScaling {
    /// `scaled = channel / gain`; gain 1.0 is the identity
    Linear { gain: f64 },
    /// `scaled = 10^(decades * channel / range) * offset`
    Logarithmic { decades: f64, offset: f64 },
}

impl ParameterScaling {
    /// Build from the `$PnE` value (`decades,offset`) and the `$PnG` gain.
    /// A zero log offset is read as 1.0, resolving the pre-3.1 ambiguity.
    pub fn from_keywords(amplification: Option<&str>, gain: Option<&str>) -> Result<Self> {
        let (decades, offset) = match amplification {
            None => (0.0, 0.0),
            Some(value) => parse_amplification(value)?,
        };
        if decades < 0.0 {
            return Err(FcsError::Malformed(format!(
                "negative $PnE decade count {decades}"
            )));
        }
        if decades > 0.0 {
            let offset = if offset == 0.0 { 1.0 } else { offset };
            return Ok(ParameterScaling::Logarithmic { decades, offset });
        }
        let gain = match gain {
            None => 1.0,
            Some(value) => value.trim().parse::<f64>().map_err(|_| {
                FcsError::Malformed(format!("non-numeric $PnG value '{value}'"))
            })?,
        };
        if gain == 0.0 || !gain.is_finite() {
            return Err(FcsError::Malformed(format!("invalid $PnG gain {gain}")));
        }
        Ok(ParameterScaling::Linear { gain })
    }

    /// True when applying this scaling would not change any value
    pub fn is_identity(&self) -> bool {
        matches!(self, ParameterScaling::Linear { gain } if *gain == 1.0)
    }
}

fn parse_amplification(value: &str) -> Result<(f64, f64)> {
    let mut parts = value.split(',');
    let decades = parts.next().unwrap_or("").trim();
    let offset = parts.next().unwrap_or("").trim();
    if parts.next().is_some() || decades.is_empty() || offset.is_empty() {
        return Err(FcsError::Malformed(format!(
            "$PnE value '{value}' is not 'decades,offset'"
        )));
    }
    let decades = decades
        .parse::<f64>()
        .map_err(|_| FcsError::Malformed(format!("non-numeric $PnE decades '{decades}'")))?;
    let offset = offset
        .parse::<f64>()
        .map_err(|_| FcsError::Malformed(format!("non-numeric $PnE offset '{offset}'")))?;
    Ok((decades, offset))
}

/// Everything the data codec and scaling engine need to know about one
/// parameter (column)
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParameterDescriptor {
    /// 1-based parameter index
    pub index: usize,
    pub short_name: String,
    /// Declared storage width in bits
    pub bits: u32,
    /// Declared numeric range; 0 means unknown
    pub range: u64,
    pub scaling: ParameterScaling,
}

impl ParameterDescriptor {
    /// Compute the descriptor for parameter `n` from the dictionary
    pub fn from_dictionary(dict: &Dictionary, n: usize, kind: DataKind) -> Result<Self> {
        let short_name = dict
            .get_param(keywords::PN_SHORT_NAME, n)
            .ok_or_else(|| missing(keywords::PN_SHORT_NAME, n))?
            .to_string();
        let bits_value = dict
            .get_param(keywords::PN_BITS, n)
            .ok_or_else(|| missing(keywords::PN_BITS, n))?;
        let bits = bits_value.trim().parse::<u32>().map_err(|_| {
            FcsError::Malformed(format!(
                "{} has non-integer value '{bits_value}'",
                param_key(keywords::PN_BITS, n)
            ))
        })?;
        validate_bits(bits, kind, n)?;

        let range_value = dict
            .get_param(keywords::PN_RANGE, n)
            .ok_or_else(|| missing(keywords::PN_RANGE, n))?;
        // ranges are written as floats by some vendors
        let range = range_value.trim().parse::<f64>().map_err(|_| {
            FcsError::Malformed(format!(
                "{} has non-numeric value '{range_value}'",
                param_key(keywords::PN_RANGE, n)
            ))
        })? as u64;

        let scaling = ParameterScaling::from_keywords(
            dict.get_param(keywords::PN_AMPLIFICATION, n),
            dict.get_param(keywords::PN_GAIN, n),
        )?;

        Ok(Self {
            index: n,
            short_name,
            bits,
            range,
            scaling,
        })
    }

    pub const fn bytes(&self) -> usize {
        (self.bits / 8) as usize
    }

    /// Bitmask derived from the declared range: the smallest
    /// power-of-two-minus-one covering `range - 1`, capped at the storage
    /// width. An unknown range masks nothing.
    pub fn mask(&self) -> u64 {
        let full = self.full_mask();
        if self.range <= 1 {
            return full;
        }
        let needed = u64::MAX >> (self.range - 1).leading_zeros();
        needed.min(full)
    }

    /// True when masking this parameter would be a no-op
    pub fn has_full_mask(&self) -> bool {
        self.mask() == self.full_mask()
    }

    fn full_mask(&self) -> u64 {
        if self.bits >= 64 {
            u64::MAX
        } else {
            (1u64 << self.bits) - 1
        }
    }
}

fn validate_bits(bits: u32, kind: DataKind, n: usize) -> Result<()> {
    match kind {
        DataKind::Float if bits != 32 => Err(FcsError::Malformed(format!(
            "parameter {n} declares {bits} bits but $DATATYPE=F requires 32"
        ))),
        DataKind::Double if bits != 64 => Err(FcsError::Malformed(format!(
            "parameter {n} declares {bits} bits but $DATATYPE=D requires 64"
        ))),
        DataKind::Integer if !matches!(bits, 8 | 16 | 24 | 32 | 64) => {
            if bits % 8 != 0 {
                Err(FcsError::Unsupported(format!(
                    "non-byte-aligned integer width of {bits} bits for parameter {n}"
                )))
            } else {
                Err(FcsError::Unsupported(format!(
                    "integer width of {bits} bits for parameter {n}"
                )))
            }
        }
        _ => Ok(()),
    }
}

fn missing(template: &str, n: usize) -> FcsError {
    FcsError::Malformed(format!(
        "required keyword {} is missing",
        param_key(template, n)
    ))
}
