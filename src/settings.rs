use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::audio::{TapConfig, ToneParams, Waveform};
use crate::render::{Color, ScopeStyle};

/// Returns the path to the settings file: `~/.config/wavescope/settings.json`
fn settings_path() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("wavescope");
    path.push("settings.json");
    path
}

/// Persisted application settings.
///
/// Serialized as JSON to the platform config directory.
/// Fields use `#[serde(default)]` so that adding new settings
/// won't break existing config files.
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    // UI
    pub show_settings: bool,

    // Scope display
    pub stroke_width: f32,
    pub show_grid: bool,

    // Colors (stored as u8 triples since the raster Color carries an
    // alpha the file doesn't need)
    pub stroke_r: u8,
    pub stroke_g: u8,
    pub stroke_b: u8,
    pub background_r: u8,
    pub background_g: u8,
    pub background_b: u8,

    // Analysis
    pub window_size: usize,
    pub smoothing: f32,

    // Tone
    pub tone_waveform: Waveform,
    pub tone_frequency: f32,
    pub tone_volume: f32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            show_settings: true,

            stroke_width: 2.0,
            show_grid: true,

            stroke_r: 100,
            stroke_g: 255,
            stroke_b: 100,
            background_r: 10,
            background_g: 20,
            background_b: 10,

            window_size: 2048,
            smoothing: 0.8,

            tone_waveform: Waveform::Sine,
            tone_frequency: 220.0,
            tone_volume: 0.5,
        }
    }
}

impl AppSettings {
    /// Load settings from disk, falling back to defaults on any error.
    pub fn load() -> Self {
        let path = settings_path();
        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    settings
                }
                Err(e) => {
                    log::warn!("Failed to parse settings ({}), using defaults", e);
                    Self::default()
                }
            },
            Err(e) => {
                log::info!("No settings file found ({}), using defaults", e);
                Self::default()
            }
        }
    }

    /// Save settings to disk as pretty JSON.
    pub fn save(&self) {
        let path = settings_path();
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::warn!("Failed to create config directory: {}", e);
                return;
            }
        }
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    log::warn!("Failed to write settings: {}", e);
                }
            }
            Err(e) => {
                log::warn!("Failed to serialize settings: {}", e);
            }
        }
    }

    /// Collect current runtime state for persisting.
    pub fn from_parts(
        style: &ScopeStyle,
        tap: TapConfig,
        tone: ToneParams,
        show_settings: bool,
    ) -> Self {
        Self {
            show_settings,

            stroke_width: style.stroke_width,
            show_grid: style.show_grid,

            stroke_r: style.stroke.r,
            stroke_g: style.stroke.g,
            stroke_b: style.stroke.b,
            background_r: style.background.r,
            background_g: style.background.g,
            background_b: style.background.b,

            window_size: tap.window_size,
            smoothing: tap.smoothing_time_constant,

            tone_waveform: tone.waveform,
            tone_frequency: tone.frequency,
            tone_volume: tone.volume,
        }
    }

    pub fn style(&self) -> ScopeStyle {
        ScopeStyle {
            stroke: Color::rgb(self.stroke_r, self.stroke_g, self.stroke_b),
            background: Color::rgb(self.background_r, self.background_g, self.background_b),
            stroke_width: self.stroke_width,
            show_grid: self.show_grid,
        }
    }

    pub fn tap_config(&self) -> TapConfig {
        TapConfig {
            window_size: self.window_size,
            smoothing_time_constant: self.smoothing,
        }
        .sanitized()
    }

    pub fn tone_params(&self) -> ToneParams {
        ToneParams {
            waveform: self.tone_waveform,
            frequency: self.tone_frequency,
            volume: self.tone_volume,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_json_round_trip() {
        let mut settings = AppSettings::default();
        settings.stroke_r = 1;
        settings.tone_frequency = 440.0;
        settings.window_size = 512;
        settings.tone_waveform = Waveform::Square;

        let json = serde_json::to_string(&settings).unwrap();
        let back: AppSettings = serde_json::from_str(&json).unwrap();

        assert_eq!(back.stroke_r, 1);
        assert_eq!(back.tone_frequency, 440.0);
        assert_eq!(back.window_size, 512);
        assert_eq!(back.tone_waveform, Waveform::Square);
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let settings: AppSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.window_size, 2048);
        assert_eq!(settings.smoothing, 0.8);
        assert_eq!(settings.style(), ScopeStyle::default());
    }

    #[test]
    fn test_parts_round_trip_through_settings() {
        let style = ScopeStyle {
            stroke: Color::rgb(200, 10, 10),
            background: Color::rgb(0, 0, 30),
            stroke_width: 3.0,
            show_grid: false,
        };
        let tap = TapConfig {
            window_size: 1024,
            smoothing_time_constant: 0.5,
        };
        let tone = ToneParams {
            waveform: Waveform::Sawtooth,
            frequency: 110.0,
            volume: 0.9,
        };

        let settings = AppSettings::from_parts(&style, tap, tone, false);
        assert_eq!(settings.style(), style);
        assert_eq!(settings.tap_config(), tap);
        assert_eq!(settings.tone_params(), tone);
        assert!(!settings.show_settings);
    }
}
