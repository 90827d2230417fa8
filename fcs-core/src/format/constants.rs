//! Format constants for the FCS container

/// Fixed size of the ASCII header record
pub const HEADER_SIZE: usize = 58;

/// Size of the version tag at the start of the header ("FCS" + major.minor)
pub const VERSION_TAG_SIZE: usize = 6;

/// Width of each ASCII-decimal offset field in the header
pub const OFFSET_FIELD_WIDTH: usize = 8;

/// Largest offset representable in an 8-digit ASCII header field.
/// Offsets beyond this are written as zero in the header and carried by
/// the dictionary instead.
pub const MAX_HEADER_OFFSET: u64 = 99_999_999;

/// Delimiter used when writing files that were not loaded from disk
pub const DEFAULT_DELIMITER: u8 = b'/';

/// Trailing checksum field. Always written verbatim, never computed or
/// verified.
pub const CHECKSUM_FIELD: [u8; 8] = *b"00000000";

/// Number of events transposed per block when decoding the DATA segment
pub const TRANSPOSE_BLOCK_EVENTS: usize = 1024;

/// Default significance threshold: 32-bit integer data whose declared range
/// needs more bits than this is widened to f64 instead of f32.
pub const F32_SIGNIFICANT_BITS: u32 = 24;

/// Standard keyword names used by the codec itself
pub mod keywords {
    /// The six segment-offset keywords, always kept in the primary TEXT segment
    pub const BEGIN_STEXT: &str = "$BEGINSTEXT";
    pub const END_STEXT: &str = "$ENDSTEXT";
    pub const BEGIN_DATA: &str = "$BEGINDATA";
    pub const END_DATA: &str = "$ENDDATA";
    pub const BEGIN_ANALYSIS: &str = "$BEGINANALYSIS";
    pub const END_ANALYSIS: &str = "$ENDANALYSIS";

    pub const OFFSET_KEYWORDS: [&str; 6] = [
        BEGIN_STEXT,
        END_STEXT,
        BEGIN_DATA,
        END_DATA,
        BEGIN_ANALYSIS,
        END_ANALYSIS,
    ];

    pub const DATATYPE: &str = "$DATATYPE";
    pub const BYTEORD: &str = "$BYTEORD";
    pub const MODE: &str = "$MODE";
    pub const NEXTDATA: &str = "$NEXTDATA";
    pub const PAR: &str = "$PAR";
    pub const TOT: &str = "$TOT";

    /// Parametric keyword templates; `n` is replaced by the 1-based index
    pub const PN_BITS: &str = "$PnB";
    pub const PN_SHORT_NAME: &str = "$PnN";
    pub const PN_RANGE: &str = "$PnR";
    pub const PN_AMPLIFICATION: &str = "$PnE";
    pub const PN_GAIN: &str = "$PnG";

    /// Spillover keyword fallbacks, searched in this order, first match wins
    pub const SPILLOVER_KEYWORDS: [&str; 4] = ["$SPILLOVER", "$COMP", "$SPILL", "SPILL"];
}
