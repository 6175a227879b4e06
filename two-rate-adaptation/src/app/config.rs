//! Configuration Management

use crate::schedule::ConditionCode;
use crate::trial::{FeedbackParams, LayoutParams};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Session settings
    pub experiment: ExperimentConfig,
    /// Screen and workspace layout
    #[serde(default)]
    pub workspace: LayoutParams,
    /// Clamped-feedback tunables
    #[serde(default)]
    pub feedback: FeedbackParams,
    /// Data output
    #[serde(default)]
    pub output: OutputConfig,
}

/// Experiment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Condition code as entered by the experimenter
    pub condition: String,
    /// Seed for target shuffles (random if unset)
    #[serde(default)]
    pub seed: Option<u64>,
    /// Keys that end a trial early
    pub skip_keys: Vec<String>,
    /// Key that dismisses text screens
    pub continue_key: String,
    /// Key that aborts the session
    pub quit_key: String,
    /// How long the end screen stays up (seconds)
    pub end_screen_secs: f64,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for session data files
    pub directory: PathBuf,
}

/// The 26 lowercase letters.
pub fn default_skip_keys() -> Vec<String> {
    ('a'..='z').map(|c| c.to_string()).collect()
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            condition: "0".to_string(),
            seed: None,
            skip_keys: default_skip_keys(),
            continue_key: "space".to_string(),
            quit_key: "escape".to_string(),
            end_screen_secs: 1.0,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: Config::base_dir().join("data"),
        }
    }
}

impl ExperimentConfig {
    /// Condition code, falling back to 0 for unusable input.
    pub fn condition_code(&self) -> ConditionCode {
        ConditionCode::parse_or_default(&self.condition)
    }
}

impl Config {
    /// Validate config values are within acceptable ranges.
    /// Returns Ok(()) if valid, or Err with a description of the first invalid field.
    pub fn validate(&self) -> Result<(), crate::Error> {
        let exp = &self.experiment;
        if exp.continue_key.trim().is_empty() {
            return Err(crate::Error::Config("continue_key must not be empty".to_string()));
        }
        if exp.quit_key.trim().is_empty() {
            return Err(crate::Error::Config("quit_key must not be empty".to_string()));
        }
        if exp.continue_key == exp.quit_key {
            return Err(crate::Error::Config(format!(
                "continue_key and quit_key must differ, both are '{}'",
                exp.quit_key
            )));
        }
        for reserved in [&exp.continue_key, &exp.quit_key] {
            if exp.skip_keys.contains(reserved) {
                return Err(crate::Error::Config(format!(
                    "skip_keys must not contain '{}'",
                    reserved
                )));
            }
        }
        if !(0.0..=60.0).contains(&exp.end_screen_secs) {
            return Err(crate::Error::Config(format!(
                "end_screen_secs must be in [0, 60], got {}",
                exp.end_screen_secs
            )));
        }

        let ws = &self.workspace;
        if ws.screen_width <= 0.0 || ws.screen_height <= 0.0 {
            return Err(crate::Error::Config(format!(
                "screen size must be positive, got {}x{}",
                ws.screen_width, ws.screen_height
            )));
        }
        if ws.usable_fraction <= 0.0 || ws.usable_fraction > 1.0 {
            return Err(crate::Error::Config(format!(
                "usable_fraction must be in (0, 1], got {}",
                ws.usable_fraction
            )));
        }
        if ws.aspect <= 0.0 {
            return Err(crate::Error::Config(format!(
                "aspect must be > 0, got {}",
                ws.aspect
            )));
        }
        if !(0.0..=0.5).contains(&ws.home_offset) {
            return Err(crate::Error::Config(format!(
                "home_offset must be in [0, 0.5], got {}",
                ws.home_offset
            )));
        }
        if ws.cursor_radius_fraction <= 0.0 || ws.cursor_radius_fraction >= 0.5 {
            return Err(crate::Error::Config(format!(
                "cursor_radius_fraction must be in (0, 0.5), got {}",
                ws.cursor_radius_fraction
            )));
        }

        if !(0.0..=1.0).contains(&self.feedback.ring_threshold) {
            return Err(crate::Error::Config(format!(
                "ring_threshold must be in [0, 1], got {}",
                self.feedback.ring_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.feedback.ring_opacity) {
            return Err(crate::Error::Config(format!(
                "ring_opacity must be in [0, 1], got {}",
                self.feedback.ring_opacity
            )));
        }
        Ok(())
    }

    /// Load config from file
    pub fn load(path: &PathBuf) -> Result<Self, crate::Error> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from default location
    pub fn load_default() -> Result<Self, crate::Error> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &PathBuf) -> Result<(), crate::Error> {
        let content = self.to_toml()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// `~/.two_rate`
    pub fn base_dir() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".two_rate"))
            .unwrap_or_else(|| PathBuf::from(".two_rate"))
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        Self::base_dir().join("config.toml")
    }

    /// Generate TOML representation
    pub fn to_toml(&self) -> Result<String, crate::Error> {
        toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Look up a value by dotted key, e.g. `feedback.ring_opacity`.
    pub fn get_value(&self, key: &str) -> Result<Option<String>, crate::Error> {
        let root = toml::Value::try_from(self).map_err(|e| crate::Error::Config(e.to_string()))?;
        let mut node = &root;
        for part in key.split('.') {
            match node.get(part) {
                Some(next) => node = next,
                None => return Ok(None),
            }
        }
        Ok(Some(node.to_string()))
    }

    /// Set a value by dotted key. `value` is parsed as a TOML value, falling
    /// back to a plain string. The result is validated before it is returned.
    pub fn with_value(&self, key: &str, value: &str) -> Result<Self, crate::Error> {
        let mut root =
            toml::Value::try_from(self).map_err(|e| crate::Error::Config(e.to_string()))?;
        let parsed = parse_toml_value(value);

        let mut parts: Vec<&str> = key.split('.').collect();
        let leaf = parts
            .pop()
            .filter(|leaf| !leaf.is_empty())
            .ok_or_else(|| crate::Error::Config(format!("invalid key '{}'", key)))?;
        let mut node = &mut root;
        for part in parts {
            node = node
                .get_mut(part)
                .ok_or_else(|| crate::Error::Config(format!("unknown section '{}'", part)))?;
        }
        let table = node
            .as_table_mut()
            .ok_or_else(|| crate::Error::Config(format!("'{}' is not a section", key)))?;
        let parsed = match table.get(leaf) {
            None => return Err(crate::Error::Config(format!("unknown key '{}'", key))),
            // String fields take the raw text, e.g. `condition = "17"`.
            Some(toml::Value::String(_)) if !parsed.is_str() => {
                toml::Value::String(raw_string(value))
            }
            Some(_) => parsed,
        };
        table.insert(leaf.to_string(), parsed);

        let updated: Self = root
            .try_into()
            .map_err(|e: toml::de::Error| crate::Error::Config(e.to_string()))?;
        updated.validate()?;
        Ok(updated)
    }
}

fn parse_toml_value(raw: &str) -> toml::Value {
    let wrapped = format!("v = {}", raw);
    match toml::from_str::<toml::Table>(&wrapped) {
        Ok(mut table) => table
            .remove("v")
            .unwrap_or_else(|| toml::Value::String(raw.to_string())),
        Err(_) => toml::Value::String(raw.to_string()),
    }
}

fn raw_string(raw: &str) -> String {
    raw.trim().trim_matches('"').to_string()
}
