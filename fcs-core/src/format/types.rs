//! Enumerated file-wide properties declared by the header and dictionary

use crate::error::{FcsError, Result};
use alloc::format;
use alloc::string::String;

/// FCS format versions this codec recognizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Version {
    Fcs2_0,
    Fcs3_0,
    Fcs3_1,
    Fcs3_2,
}

impl Version {
    /// Parse the 6-byte version tag at the start of the header
    pub fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"FCS2.0" => Some(Version::Fcs2_0),
            b"FCS3.0" => Some(Version::Fcs3_0),
            b"FCS3.1" => Some(Version::Fcs3_1),
            b"FCS3.2" => Some(Version::Fcs3_2),
            _ => None,
        }
    }

    /// The 6-byte tag written at the start of the header
    pub const fn tag(self) -> &'static [u8; 6] {
        match self {
            Version::Fcs2_0 => b"FCS2.0",
            Version::Fcs3_0 => b"FCS3.0",
            Version::Fcs3_1 => b"FCS3.1",
            Version::Fcs3_2 => b"FCS3.2",
        }
    }
}

impl core::fmt::Display for Version {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // Tags are fixed ASCII
        for &b in self.tag() {
            write!(f, "{}", b as char)?;
        }
        Ok(())
    }
}

/// Base element type of the DATA segment, from `$DATATYPE`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataKind {
    /// Single-precision floating point, `$DATATYPE=F`
    Float,
    /// Double-precision floating point, `$DATATYPE=D`
    Double,
    /// Unsigned integers of per-parameter width, `$DATATYPE=I`
    Integer,
}

impl DataKind {
    pub fn from_keyword(value: &str) -> Result<Self> {
        match value.trim() {
            "F" | "f" => Ok(DataKind::Float),
            "D" | "d" => Ok(DataKind::Double),
            "I" | "i" => Ok(DataKind::Integer),
            "A" | "a" => Err(FcsError::Unsupported(String::from(
                "ASCII data mode ($DATATYPE=A) is not supported",
            ))),
            other => Err(FcsError::Malformed(format!(
                "invalid $DATATYPE value '{other}'"
            ))),
        }
    }

    pub const fn keyword_value(self) -> &'static str {
        match self {
            DataKind::Float => "F",
            DataKind::Double => "D",
            DataKind::Integer => "I",
        }
    }
}

/// Wire byte ordering of DATA segment elements, from `$BYTEORD`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ByteOrder {
    /// Least-significant byte first, `1,2,3,4`
    LittleEndian,
    /// Most-significant byte first, `4,3,2,1`
    BigEndian,
}

impl ByteOrder {
    pub fn from_keyword(value: &str) -> Result<Self> {
        // Whitespace inside the list is a known vendor habit
        let mut compact = String::with_capacity(value.len());
        for c in value.chars() {
            if !c.is_ascii_whitespace() {
                compact.push(c);
            }
        }
        match compact.as_str() {
            "1,2,3,4" | "1,2" => Ok(ByteOrder::LittleEndian),
            "4,3,2,1" | "2,1" => Ok(ByteOrder::BigEndian),
            other => Err(FcsError::Unsupported(format!(
                "mixed or unrecognized $BYTEORD value '{other}'"
            ))),
        }
    }

    pub const fn keyword_value(self) -> &'static str {
        match self {
            ByteOrder::LittleEndian => "1,2,3,4",
            ByteOrder::BigEndian => "4,3,2,1",
        }
    }

    /// Whether this ordering matches the host's
    pub const fn is_native(self) -> bool {
        match self {
            ByteOrder::LittleEndian => cfg!(target_endian = "little"),
            ByteOrder::BigEndian => cfg!(target_endian = "big"),
        }
    }

    /// The host's ordering
    pub const fn native() -> Self {
        if cfg!(target_endian = "little") {
            ByteOrder::LittleEndian
        } else {
            ByteOrder::BigEndian
        }
    }
}

/// Storage mode from `$MODE`. Only list mode is supported; the histogram
/// modes are recognized and rejected by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mode {
    List,
}

impl Mode {
    pub fn from_keyword(value: &str) -> Result<Self> {
        match value.trim() {
            "L" | "l" => Ok(Mode::List),
            "C" | "c" | "U" | "u" => Err(FcsError::Unsupported(String::from(
                "histogram data modes ($MODE=C/U) are not supported",
            ))),
            other => Err(FcsError::Malformed(format!("invalid $MODE value '{other}'"))),
        }
    }
}
