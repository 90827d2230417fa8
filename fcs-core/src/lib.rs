#![no_std]

//! FCS Core - ISAC FCS Container Format Definitions
//!
//! This crate provides the format definitions, text grammar, and validation
//! logic for the FCS flow-cytometry container: the 58-byte ASCII header,
//! the delimiter-escaped keyword dictionary, segment offset reconciliation,
//! parameter descriptors, and save planning. It performs no I/O; the `fcs`
//! crate supplies file loading, the binary data codec, and scaling.

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;

pub mod dictionary;
pub mod error;
pub mod format;
pub mod log;
pub mod parameter;
pub mod save_plan;
pub mod segments;
pub mod text;
pub mod vocabulary;

pub use dictionary::{param_key, Dictionary, Spillover};
pub use error::{ErrorKind, FcsError, Result};
pub use format::{ByteOrder, DataKind, FcsHeader, Mode, Version};
pub use log::{FileLog, LogEntry, Severity};
pub use parameter::{ParameterDescriptor, ParameterScaling};
pub use save_plan::{plan_save, SavePlan, TextLayout};
pub use segments::{segment_len, SegmentOffsets};

/// Core trait for the decoded event storage collaborator
///
/// The codec creates and populates an event store; afterwards the caller
/// owns it. Values are exposed as f64 regardless of the store's internal
/// precision.
pub trait EventStore {
    /// Construct with zeroed columns, one per parameter name
    fn with_dimensions(parameter_names: Vec<String>, events: usize, double_precision: bool)
        -> Self;

    /// (event count, parameter count)
    fn dimensions(&self) -> (usize, usize);

    /// Event count the file declared, which may exceed the live count
    /// after a partial load
    fn original_event_count(&self) -> usize;

    /// Value at (event, parameter), or `None` out of bounds
    fn value(&self, event: usize, parameter: usize) -> Option<f64>;

    /// Short name of a parameter column
    fn parameter_name(&self, parameter: usize) -> Option<&str>;

    /// Recompute the per-column observed minima and maxima
    fn recompute_observed_ranges(&mut self);
}
