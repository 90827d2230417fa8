//! FCS - ISAC FCS Flow-Cytometry File Codec
//!
//! This library reads and writes FCS container files: the 58-byte ASCII
//! header, the delimiter-escaped keyword dictionary, and the binary
//! row-major DATA segment, decoded into column-major event storage.
//!
//! ## Architecture
//!
//! FCS follows a clean format/implementation separation:
//!
//! - **fcs-core**: Pure format definitions, text grammar, and validation (no I/O)
//! - **fcs**: Concrete implementation with file I/O, the data codec, and scaling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fcs::{FcsFile, LoadConfig};
//!
//! fn example() -> Result<(), fcs::FcsError> {
//!     // Load the first 10k events without applying scaling
//!     let config = LoadConfig::new().with_max_events(10_000).with_scaling(false);
//!     let file = FcsFile::load_with("sample.fcs", config)?;
//!
//!     println!("{} keywords", file.dictionary.len());
//!     if let Some(matrix) = &file.matrix {
//!         let (events, parameters) = (matrix.event_count(), matrix.parameter_count());
//!         println!("{events} events x {parameters} parameters");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Memory-mapped I/O**: Zero-copy access to the TEXT and DATA segments
//! - **Lenient parsing**: Known vendor quirks are repaired and logged, not fatal
//! - **Parallel scaling**: Columns are transformed concurrently
//! - **Offset reconciliation**: Header and dictionary offsets cross-checked

// Re-export core abstractions and format definitions
pub use fcs_core::{
    // Core trait
    EventStore,
    // Format definitions
    ByteOrder, DataKind, FcsHeader, Mode, Version,
    // Dictionary and keywords
    param_key, Dictionary, Spillover,
    // Error handling
    ErrorKind, FcsError, Result,
    // Load/save findings
    FileLog, LogEntry, Severity,
    // Parameters and segments
    ParameterDescriptor, ParameterScaling, SegmentOffsets,
};

// Implementation modules
pub mod codec;
pub mod config;
pub mod matrix;
pub mod reader;
pub mod scaling;
pub mod writer;

// Public exports
pub use codec::DataEncoding;
pub use config::LoadConfig;
pub use matrix::{ColumnRange, EventData, EventMatrix};
pub use reader::FcsFile;
pub use scaling::{scale_value, unscale_value};
