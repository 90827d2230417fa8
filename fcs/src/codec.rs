//! Binary DATA segment codec
//!
//! The wire format is row-major: one event after another, each event a
//! fixed-size record of one binary word per parameter. Decoding transposes
//! into the column-major [`EventMatrix`], block by block so that roughly
//! one block of wire data stays hot while its columns are filled.
//!
//! All wire words are read through a single f64-widening path and then
//! narrowed to the matrix precision. Precision is chosen once per file,
//! never per parameter.

use crate::matrix::{EventData, EventMatrix};
use fcs_core::format::constants::TRANSPOSE_BLOCK_EVENTS;
use fcs_core::{ByteOrder, DataKind, EventStore, FcsError, FileLog, ParameterDescriptor, Result};
use std::io::Write;

/// Wire encoding of the DATA segment, resolved from `$DATATYPE` and the
/// per-parameter `$PnB` widths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataEncoding {
    /// `$DATATYPE=F`: 32-bit IEEE floats, all parameters
    Float32,
    /// `$DATATYPE=D`: 64-bit IEEE floats, all parameters
    Float64,
    /// `$DATATYPE=I` with one shared width in bytes
    IntegerUniform(usize),
    /// `$DATATYPE=I` with per-parameter widths
    IntegerMixed,
}

/// Resolve the wire encoding. Parameter widths must already be validated.
pub fn resolve_encoding(kind: DataKind, params: &[ParameterDescriptor]) -> Result<DataEncoding> {
    if params.is_empty() {
        return Err(FcsError::Malformed(String::from(
            "cannot decode a DATA segment with zero parameters",
        )));
    }
    match kind {
        DataKind::Float => Ok(DataEncoding::Float32),
        DataKind::Double => Ok(DataEncoding::Float64),
        DataKind::Integer => {
            let first = params[0].bytes();
            if params.iter().all(|p| p.bytes() == first) {
                Ok(DataEncoding::IntegerUniform(first))
            } else {
                Ok(DataEncoding::IntegerMixed)
            }
        }
    }
}

/// Bytes per event on the wire
pub fn event_size(params: &[ParameterDescriptor]) -> usize {
    params.iter().map(ParameterDescriptor::bytes).sum()
}

/// Whether decoded integer data needs f64 columns to be lossless.
/// Float data keeps its own wire precision.
pub fn needs_double_precision(
    kind: DataKind,
    params: &[ParameterDescriptor],
    f32_significant_bits: u32,
) -> bool {
    // a threshold of 64 or more bits means no u64 range ever widens
    let limit = if f32_significant_bits >= 64 {
        u64::MAX
    } else {
        1u64 << f32_significant_bits
    };
    match kind {
        DataKind::Float => false,
        DataKind::Double => true,
        DataKind::Integer => params
            .iter()
            .any(|p| p.bits > 32 || (p.bits == 32 && (p.range == 0 || p.range > limit))),
    }
}

/// Decode a DATA segment into an event matrix.
///
/// `declared_events` is the `$TOT` value when present. When it is absent the
/// event count is derived from the segment length. `max_events` caps the
/// number of events actually materialized; the declared count is preserved
/// as the matrix's original event count.
#[allow(clippy::too_many_arguments)]
pub fn decode(
    bytes: &[u8],
    kind: DataKind,
    params: &[ParameterDescriptor],
    order: ByteOrder,
    declared_events: Option<u64>,
    max_events: Option<usize>,
    f32_significant_bits: u32,
    log: &mut FileLog,
) -> Result<EventMatrix> {
    let encoding = resolve_encoding(kind, params)?;
    let event_size = event_size(params);
    if event_size == 0 {
        return Err(FcsError::Malformed(String::from(
            "parameters declare a zero-byte event size",
        )));
    }
    let available = bytes.len() / event_size;
    let remainder = bytes.len() % event_size;

    let total = match declared_events {
        Some(declared) => {
            let declared = declared as usize;
            if declared > available {
                log.error(format!(
                    "$TOT declares {declared} events of {event_size} bytes but the DATA \
                     segment holds only {}; the end of the DATA segment was encountered \
                     unexpectedly",
                    bytes.len()
                ));
                return Err(FcsError::Truncated(String::from(
                    "DATA segment ends before the declared event count",
                )));
            }
            if declared < available {
                log.warning(format!(
                    "DATA segment holds {available} events but $TOT declares {declared}; \
                     the excess is ignored"
                ));
            }
            declared
        }
        None => {
            log.info(format!(
                "$TOT is missing; derived {available} events from the DATA segment length"
            ));
            available
        }
    };
    if remainder != 0 && declared_events.map_or(true, |d| d as usize == available) {
        log.warning(format!(
            "DATA segment has {remainder} trailing bytes that do not form a whole event"
        ));
    }

    let events = match max_events {
        Some(cap) if cap < total => {
            log.info(format!("loading {cap} of {total} events"));
            cap
        }
        _ => total,
    };

    let double = needs_double_precision(kind, params, f32_significant_bits);
    let names: Vec<String> = params.iter().map(|p| p.short_name.clone()).collect();
    let mut matrix = EventMatrix::new(names, events, double);
    matrix.set_original_event_count(total);

    match encoding {
        DataEncoding::Float32 => decode_floats::<f32>(bytes, &mut matrix, order, params),
        DataEncoding::Float64 => decode_floats::<f64>(bytes, &mut matrix, order, params),
        DataEncoding::IntegerUniform(_) | DataEncoding::IntegerMixed => {
            decode_integers(bytes, &mut matrix, order, params, encoding)
        }
    }

    for (i, p) in params.iter().enumerate() {
        matrix.set_specified_range(i, 0.0, p.range as f64);
    }
    matrix.recompute_observed_ranges();
    Ok(matrix)
}

/// Wire float word: byte swap and widening for the two IEEE sizes
trait WireFloat: bytemuck::Pod + Copy {
    fn swapped(self) -> Self;
    fn widen(self) -> f64;
    fn narrow(value: f64) -> Self;
}

impl WireFloat for f32 {
    fn swapped(self) -> Self {
        f32::from_bits(self.to_bits().swap_bytes())
    }
    fn widen(self) -> f64 {
        self as f64
    }
    fn narrow(value: f64) -> Self {
        value as f32
    }
}

impl WireFloat for f64 {
    fn swapped(self) -> Self {
        f64::from_bits(self.to_bits().swap_bytes())
    }
    fn widen(self) -> f64 {
        self
    }
    fn narrow(value: f64) -> Self {
        value
    }
}

fn decode_floats<T: WireFloat>(
    bytes: &[u8],
    matrix: &mut EventMatrix,
    order: ByteOrder,
    params: &[ParameterDescriptor],
) {
    let (events, count) = matrix.dimensions();
    let word = std::mem::size_of::<T>();
    let native = order.is_native();

    // aligned native-order input casts straight to the wire word type
    let cast: Option<&[T]> = if native {
        bytemuck::try_cast_slice(&bytes[..events * count * word]).ok()
    } else {
        None
    };

    match matrix.data_mut() {
        EventData::Single(cols) => {
            fill_float_columns::<T, f32>(bytes, cols, events, count, native, cast, params)
        }
        EventData::Double(cols) => {
            fill_float_columns::<T, f64>(bytes, cols, events, count, native, cast, params)
        }
    }
}

fn fill_float_columns<T: WireFloat, U: WireFloat>(
    bytes: &[u8],
    cols: &mut [Vec<U>],
    events: usize,
    count: usize,
    native: bool,
    cast: Option<&[T]>,
    params: &[ParameterDescriptor],
) {
    let word = std::mem::size_of::<T>();
    let event_size = event_size(params);
    let mut block_start = 0;
    while block_start < events {
        let block_end = (block_start + TRANSPOSE_BLOCK_EVENTS).min(events);
        for (p, col) in cols.iter_mut().enumerate() {
            let base = p * word;
            for e in block_start..block_end {
                let value = match cast {
                    Some(words) => words[e * count + p],
                    None => {
                        let off = e * event_size + base;
                        let raw = bytemuck::pod_read_unaligned::<T>(&bytes[off..off + word]);
                        if native {
                            raw
                        } else {
                            raw.swapped()
                        }
                    }
                };
                col[e] = U::narrow(value.widen());
            }
        }
        block_start = block_end;
    }
}

fn decode_integers(
    bytes: &[u8],
    matrix: &mut EventMatrix,
    order: ByteOrder,
    params: &[ParameterDescriptor],
    encoding: DataEncoding,
) {
    // a file whose ranges fill every word has nothing to mask
    let masks: Option<Vec<u64>> = if params.iter().all(ParameterDescriptor::has_full_mask) {
        None
    } else {
        Some(params.iter().map(ParameterDescriptor::mask).collect())
    };

    // one shared word width in native order casts straight to the wire
    // word type, like the float path
    if order.is_native() {
        if let DataEncoding::IntegerUniform(width) = encoding {
            let (events, count) = matrix.dimensions();
            let wire = &bytes[..events * count * width];
            let done = match width {
                1 => {
                    fill_cast_integer_columns(wire, matrix, masks.as_deref());
                    true
                }
                2 => bytemuck::try_cast_slice::<u8, u16>(wire)
                    .map(|words| fill_cast_integer_columns(words, matrix, masks.as_deref()))
                    .is_ok(),
                4 => bytemuck::try_cast_slice::<u8, u32>(wire)
                    .map(|words| fill_cast_integer_columns(words, matrix, masks.as_deref()))
                    .is_ok(),
                8 => bytemuck::try_cast_slice::<u8, u64>(wire)
                    .map(|words| fill_cast_integer_columns(words, matrix, masks.as_deref()))
                    .is_ok(),
                _ => false,
            };
            if done {
                return;
            }
        }
    }

    let event_size = event_size(params);
    let mut offsets = Vec::with_capacity(params.len());
    let mut widths = Vec::with_capacity(params.len());
    let mut running = 0;
    for p in params {
        offsets.push(running);
        widths.push(p.bytes());
        running += p.bytes();
    }

    match matrix.data_mut() {
        EventData::Single(cols) => fill_integer_columns(
            bytes, cols, event_size, &offsets, &widths, masks.as_deref(), order,
            |v| v as f32,
        ),
        EventData::Double(cols) => fill_integer_columns(
            bytes, cols, event_size, &offsets, &widths, masks.as_deref(), order,
            |v| v as f64,
        ),
    }
}

fn fill_cast_integer_columns<T: Into<u64> + Copy>(
    words: &[T],
    matrix: &mut EventMatrix,
    masks: Option<&[u64]>,
) {
    match matrix.data_mut() {
        EventData::Single(cols) => fill_cast_columns(words, cols, masks, |v| v as f32),
        EventData::Double(cols) => fill_cast_columns(words, cols, masks, |v| v as f64),
    }
}

fn fill_cast_columns<T: Into<u64> + Copy, U: Copy>(
    words: &[T],
    cols: &mut [Vec<U>],
    masks: Option<&[u64]>,
    convert: impl Fn(u64) -> U,
) {
    let count = cols.len();
    let events = cols.first().map_or(0, Vec::len);
    let mut block_start = 0;
    while block_start < events {
        let block_end = (block_start + TRANSPOSE_BLOCK_EVENTS).min(events);
        for (p, col) in cols.iter_mut().enumerate() {
            let mask = masks.map_or(u64::MAX, |m| m[p]);
            for e in block_start..block_end {
                col[e] = convert(words[e * count + p].into() & mask);
            }
        }
        block_start = block_end;
    }
}

#[allow(clippy::too_many_arguments)]
fn fill_integer_columns<U: Copy>(
    bytes: &[u8],
    cols: &mut [Vec<U>],
    event_size: usize,
    offsets: &[usize],
    widths: &[usize],
    masks: Option<&[u64]>,
    order: ByteOrder,
    convert: impl Fn(u64) -> U,
) {
    let events = cols.first().map_or(0, Vec::len);
    let mut block_start = 0;
    while block_start < events {
        let block_end = (block_start + TRANSPOSE_BLOCK_EVENTS).min(events);
        for (p, col) in cols.iter_mut().enumerate() {
            let base = offsets[p];
            let width = widths[p];
            let mask = masks.map(|m| m[p]);
            for e in block_start..block_end {
                let off = e * event_size + base;
                let mut value = read_uint(&bytes[off..off + width], order);
                if let Some(mask) = mask {
                    value &= mask;
                }
                col[e] = convert(value);
            }
        }
        block_start = block_end;
    }
}

/// Read an unsigned integer of 1 to 8 bytes in the given byte order.
/// Handles the odd widths (24-bit) uniformly.
fn read_uint(bytes: &[u8], order: ByteOrder) -> u64 {
    match order {
        ByteOrder::BigEndian => bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64),
        ByteOrder::LittleEndian => bytes
            .iter()
            .rev()
            .fold(0u64, |acc, &b| (acc << 8) | b as u64),
    }
}

/// Write one word of 1 to 8 bytes in the given byte order
fn write_uint(value: u64, width: usize, order: ByteOrder, out: &mut [u8]) {
    let le = value.to_le_bytes();
    match order {
        ByteOrder::LittleEndian => out[..width].copy_from_slice(&le[..width]),
        ByteOrder::BigEndian => {
            for (i, slot) in out[..width].iter_mut().enumerate() {
                *slot = le[width - 1 - i];
            }
        }
    }
}

/// Encoded DATA length in bytes for a matrix written as floats of its own
/// precision
pub fn encoded_len(matrix: &EventMatrix) -> u64 {
    let (events, count) = matrix.dimensions();
    let word = if matrix.is_double_precision() { 8 } else { 4 };
    (events * count * word) as u64
}

/// Encode the matrix row-major into a writer. Single-precision matrices
/// are written as 32-bit floats, double-precision as 64-bit.
pub fn encode_into<W: Write>(matrix: &EventMatrix, order: ByteOrder, out: &mut W) -> Result<()> {
    let (events, count) = matrix.dimensions();
    let word = if matrix.is_double_precision() { 8 } else { 4 };
    let mut row = vec![0u8; count * word];
    for e in 0..events {
        match matrix.data() {
            EventData::Single(cols) => {
                for (p, col) in cols.iter().enumerate() {
                    write_uint(
                        col[e].to_bits() as u64,
                        word,
                        order,
                        &mut row[p * word..],
                    );
                }
            }
            EventData::Double(cols) => {
                for (p, col) in cols.iter().enumerate() {
                    write_uint(col[e].to_bits(), word, order, &mut row[p * word..]);
                }
            }
        }
        out.write_all(&row)
            .map_err(|e| FcsError::Io(format!("failed to write DATA segment: {e}")))?;
    }
    Ok(())
}
