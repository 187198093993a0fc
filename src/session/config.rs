//! Verification timing configuration.
//!
//! All durations are in seconds. The configuration is fixed at process
//! start; there is no hot reload.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Thresholds and durations that drive the verification state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Minimum classifier confidence; samples must be strictly above it.
    pub confidence_threshold: f64,
    /// Sustained presence required before an outcome is declared.
    pub verification_threshold_secs: f64,
    /// Tolerated detection gap while tracking.
    pub no_face_grace_secs: f64,
    /// How long the outcome notification stays on screen.
    pub notification_duration_secs: f64,
    /// Cosmetic countdown before a new attempt may begin.
    pub reset_countdown_secs: f64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.6,
            verification_threshold_secs: 10.0,
            no_face_grace_secs: 2.0,
            notification_duration_secs: 3.0,
            reset_countdown_secs: 3.0,
        }
    }
}

impl VerificationConfig {
    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = self.confidence_threshold;
        if !c.is_finite() || !(0.0..1.0).contains(&c) {
            return Err(ConfigError::InvalidConfidenceThreshold(c));
        }

        let v = self.verification_threshold_secs;
        if !v.is_finite() || v <= 0.0 {
            return Err(ConfigError::InvalidDuration {
                field: "verification_threshold_secs",
                value: v,
            });
        }

        for (field, value) in [
            ("no_face_grace_secs", self.no_face_grace_secs),
            ("notification_duration_secs", self.notification_duration_secs),
            ("reset_countdown_secs", self.reset_countdown_secs),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidDuration { field, value });
            }
        }

        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Confidence threshold outside `[0, 1)` or not finite.
    #[error("confidence threshold {0} must lie in [0, 1)")]
    InvalidConfidenceThreshold(f64),
    /// A duration is negative, not finite, or zero where it must be positive.
    #[error("{field} = {value} is not a valid duration")]
    InvalidDuration {
        /// Name of the offending field.
        field: &'static str,
        /// Rejected value.
        value: f64,
    },
    /// Frame rate outside 1-240.
    #[error("invalid frame rate (must be 1-240 fps)")]
    InvalidFrameRate,
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// The file is not valid TOML for this format.
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// `[verification]` section.
    #[serde(default)]
    pub verification: VerificationConfig,
    /// `[stream]` section.
    #[serde(default)]
    pub stream: StreamConfig,
    /// `[output]` section.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Frame pacing of the tick loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Nominal frames per second of the detection source.
    pub fps: u32,
    /// Pace ticks against the wall clock instead of simulated time.
    pub realtime: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            realtime: false,
        }
    }
}

impl StreamConfig {
    /// Checks the frame rate is within 1-240.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fps == 0 || self.fps > 240 {
            return Err(ConfigError::InvalidFrameRate);
        }
        Ok(())
    }
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Metrics server port (0 to disable).
    pub metrics_port: u16,
    /// Print a status line every N ticks (0 prints only on phase changes).
    pub status_every: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            metrics_port: 9090,
            status_every: 0,
        }
    }
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.verification.validate()?;
        config.stream.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = VerificationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.confidence_threshold, 0.6);
        assert_eq!(config.verification_threshold_secs, 10.0);
    }

    #[test]
    fn test_threshold_out_of_range_invalid() {
        let config = VerificationConfig {
            confidence_threshold: 1.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidConfidenceThreshold(_))
        ));
    }

    #[test]
    fn test_zero_verification_threshold_invalid() {
        let config = VerificationConfig {
            verification_threshold_secs: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDuration {
                field: "verification_threshold_secs",
                ..
            })
        ));
    }

    #[test]
    fn test_negative_grace_invalid() {
        let config = VerificationConfig {
            no_face_grace_secs: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = FileConfig::from_toml(
            r#"
            [verification]
            verification_threshold_secs = 5.0

            [stream]
            fps = 15
            realtime = true
            "#,
        )
        .unwrap();

        assert_eq!(config.verification.verification_threshold_secs, 5.0);
        assert_eq!(config.verification.no_face_grace_secs, 2.0);
        assert_eq!(config.stream.fps, 15);
        assert_eq!(config.output.metrics_port, 9090);
    }

    #[test]
    fn test_partial_sections_fill_missing_keys() {
        let config = FileConfig::from_toml("[stream]\nfps = 15\n").unwrap();
        assert_eq!(config.stream.fps, 15);
        assert!(!config.stream.realtime);

        let config = FileConfig::from_toml("[output]\nstatus_every = 5\n").unwrap();
        assert_eq!(config.output.status_every, 5);
        assert_eq!(config.output.metrics_port, 9090);
        assert_eq!(config.stream.fps, 30);
    }

    #[test]
    fn test_zero_threshold_accepts_any_valid_sample() {
        let config = VerificationConfig {
            confidence_threshold: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let config = VerificationConfig {
            confidence_threshold: -0.1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_rejected() {
        assert!(matches!(
            FileConfig::from_toml("[verification]\nconfidence_threshold = \"high\""),
            Err(ConfigError::ParseError(_))
        ));
        assert!(matches!(
            FileConfig::from_toml("[stream]\nfps = 0\nrealtime = false"),
            Err(ConfigError::InvalidFrameRate)
        ));
    }
}
