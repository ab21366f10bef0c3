use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub detection: DetectionConfig,
    pub link: LinkConfig,
    pub video: VideoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// EAR below this reads as closed. Typically 0.15-0.25.
    pub eye_closed_threshold: f32,
    /// Consecutive sub-threshold frames before the alarm fires.
    /// Rejects normal blinks (~0.3 s at 30 FPS with the default).
    pub eyes_closed_frames_threshold: u32,
    /// Moving-average window over the combined per-frame ratio.
    pub smoothing_window: usize,
    /// Consecutive no-face frames before the smoothing buffer is dropped.
    pub face_lost_reset_frames: u32,
    /// Severity bands (closed-frame counts) for the progressive ladder.
    pub severity_warning_frames: u32,
    pub severity_serious_frames: u32,
    pub severity_critical_frames: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Serial device, e.g. "/dev/ttyACM0" (Linux) or "COM3" (Windows).
    pub port: String,
    pub baud_rate: u32,
    pub connect_timeout_ms: u64,
    pub send_timeout_ms: u64,
    /// The device resets when the port opens; commands before this delay
    /// elapses are lost.
    pub settle_delay_ms: u64,
    /// Consecutive send failures before the link trips to Faulted.
    pub max_send_failures: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub camera_index: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            eye_closed_threshold: 0.2,
            eyes_closed_frames_threshold: 10,
            smoothing_window: 5,
            face_lost_reset_frames: 15,
            severity_warning_frames: 5,
            severity_serious_frames: 15,
            severity_critical_frames: 30,
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyACM0".to_string(),
            baud_rate: 9600,
            connect_timeout_ms: 1000,
            send_timeout_ms: 1000,
            settle_delay_ms: 2000,
            max_send_failures: 3,
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            camera_index: 0,
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            detection: DetectionConfig::default(),
            link: LinkConfig::default(),
            video: VideoConfig::default(),
        }
    }
}

impl AppConfig {
    const PATH: &'static str = "config.json";

    pub fn load() -> Result<Self> {
        let config = if Path::new(Self::PATH).exists() {
            let content = fs::read_to_string(Self::PATH)?;
            // Missing fields fall back to defaults via #[serde(default)]
            match serde_json::from_str::<AppConfig>(&content) {
                Ok(c) => {
                    println!("Loaded configuration from {}", Self::PATH);
                    c
                }
                Err(e) => {
                    println!("Error parsing config: {}. Loading defaults.", e);
                    Self::default()
                }
            }
        } else {
            println!("Configuration file not found. Creating default at {}", Self::PATH);
            Self::default()
        };

        // Save back so new fields show up in the file
        config.save()?;
        config.validate()?;

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(Self::PATH, content)?;
        Ok(())
    }

    /// Rejects malformed values up front, before any component is built.
    pub fn validate(&self) -> Result<()> {
        let d = &self.detection;
        if !(d.eye_closed_threshold > 0.0) {
            bail!("eye_closed_threshold must be positive, got {}", d.eye_closed_threshold);
        }
        if d.eyes_closed_frames_threshold < 1 {
            bail!("eyes_closed_frames_threshold must be >= 1");
        }
        if d.smoothing_window < 1 {
            bail!("smoothing_window must be >= 1");
        }
        if !(d.severity_warning_frames < d.severity_serious_frames
            && d.severity_serious_frames < d.severity_critical_frames)
        {
            bail!(
                "severity bands must be strictly increasing, got {}/{}/{}",
                d.severity_warning_frames,
                d.severity_serious_frames,
                d.severity_critical_frames
            );
        }
        if self.link.baud_rate == 0 {
            bail!("baud_rate must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        AppConfig::default().validate().unwrap();
    }

    #[test]
    fn zero_smoothing_window_is_rejected() {
        let mut config = AppConfig::default();
        config.detection.smoothing_window = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_frames_threshold_is_rejected() {
        let mut config = AppConfig::default();
        config.detection.eyes_closed_frames_threshold = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn non_positive_ear_threshold_is_rejected() {
        let mut config = AppConfig::default();
        config.detection.eye_closed_threshold = 0.0;
        assert!(config.validate().is_err());
        config.detection.eye_closed_threshold = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn defaults_round_trip_through_json() {
        let json = serde_json::to_string(&AppConfig::default()).unwrap();
        let back: AppConfig = serde_json::from_str(&json).unwrap();
        back.validate().unwrap();
        assert_eq!(back.link.port, "/dev/ttyACM0");
        assert_eq!(back.detection.smoothing_window, 5);
    }
}
