//! FCS container format definitions
//!
//! Contains the header codec, file-wide enumerated properties, and format
//! constants.

pub mod constants;
pub mod header;
pub mod types;

pub use constants::*;
pub use header::FcsHeader;
pub use types::{ByteOrder, DataKind, Mode, Version};
