use serde::{Deserialize, Serialize};

use crate::error::{Result, VadError};

/// 16 ms per frame at 16 kHz.
pub const DEFAULT_HOP_SIZE: usize = 256;
pub const DEFAULT_THRESHOLD: f32 = 0.5;

/// Frame geometry and decision threshold for one stream.
///
/// Fields are private: a config only exists in validated form, and the
/// threshold changes only through [`StreamConfig::with_threshold`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawStreamConfig")]
pub struct StreamConfig {
    hop_size: usize,
    threshold: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStreamConfig {
    hop_size: usize,
    threshold: f32,
}

impl TryFrom<RawStreamConfig> for StreamConfig {
    type Error = VadError;

    fn try_from(raw: RawStreamConfig) -> Result<Self> {
        StreamConfig::new(raw.hop_size, raw.threshold)
    }
}

impl StreamConfig {
    /// # Errors
    /// `VadError::InvalidConfig` if `hop_size == 0` or `threshold ∉ [0, 1]`.
    pub fn new(hop_size: usize, threshold: f32) -> Result<Self> {
        let config = Self {
            hop_size,
            threshold,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.hop_size == 0 {
            return Err(VadError::InvalidConfig("hop_size must be positive".into()));
        }
        validate_threshold(self.threshold)
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Same hop size, new threshold.
    pub fn with_threshold(&self, threshold: f32) -> Result<Self> {
        Self::new(self.hop_size, threshold)
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            hop_size: DEFAULT_HOP_SIZE,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

pub(crate) fn validate_threshold(threshold: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(VadError::InvalidConfig(format!(
            "threshold must be between 0 and 1, got {threshold}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_hop_size() {
        let err = StreamConfig::new(0, 0.5).unwrap_err();
        assert!(matches!(err, VadError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_threshold_outside_unit_interval() {
        for threshold in [-0.01, 1.01, 1.5, f32::NAN, f32::INFINITY] {
            let err = StreamConfig::new(256, threshold).unwrap_err();
            assert!(matches!(err, VadError::InvalidConfig(_)), "{threshold}");
        }
    }

    #[test]
    fn accepts_boundaries() {
        assert!(StreamConfig::new(1, 0.0).is_ok());
        assert!(StreamConfig::new(256, 1.0).is_ok());
    }

    #[test]
    fn with_threshold_keeps_hop_size() {
        let config = StreamConfig::new(160, 0.5).unwrap();
        let updated = config.with_threshold(0.9).unwrap();
        assert_eq!(updated.hop_size(), 160);
        assert_eq!(updated.threshold(), 0.9);
        assert!(config.with_threshold(2.0).is_err());
    }

    #[test]
    fn deserialization_validates() {
        let ok: StreamConfig = serde_json::from_str(r#"{"hopSize":512,"threshold":0.3}"#).unwrap();
        assert_eq!(ok.hop_size(), 512);

        let bad = serde_json::from_str::<StreamConfig>(r#"{"hopSize":0,"threshold":0.3}"#);
        assert!(bad.is_err());
    }
}
