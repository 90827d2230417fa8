//! Load-time configuration

use fcs_core::format::constants::F32_SIGNIFICANT_BITS;

/// Options controlling how a file is loaded
///
/// ```
/// use fcs::LoadConfig;
///
/// let config = LoadConfig::new().with_max_events(10_000).with_scaling(false);
/// assert_eq!(config.max_events, Some(10_000));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadConfig {
    /// Cap on the number of events materialized; `None` loads everything
    pub max_events: Option<usize>,
    /// Apply the declared `$PnE`/`$PnG` transforms after decoding
    pub scale_data: bool,
    /// Integer widths needing more significant bits than this are stored
    /// as f64 instead of f32
    pub f32_significant_bits: u32,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            max_events: None,
            scale_data: true,
            f32_significant_bits: F32_SIGNIFICANT_BITS,
        }
    }
}

impl LoadConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_events(mut self, max_events: usize) -> Self {
        self.max_events = Some(max_events);
        self
    }

    pub fn with_scaling(mut self, scale_data: bool) -> Self {
        self.scale_data = scale_data;
        self
    }

    pub fn with_f32_significant_bits(mut self, bits: u32) -> Self {
        self.f32_significant_bits = bits;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = LoadConfig::default();
        assert_eq!(c.max_events, None);
        assert!(c.scale_data);
        assert_eq!(c.f32_significant_bits, 24);
    }

    #[test]
    fn test_builder() {
        let c = LoadConfig::new()
            .with_max_events(5)
            .with_scaling(false)
            .with_f32_significant_bits(20);
        assert_eq!(c.max_events, Some(5));
        assert!(!c.scale_data);
        assert_eq!(c.f32_significant_bits, 20);
    }
}
