// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Decoder configuration files.
//!
//! ```yaml
//! duplicate_window: 50
//! show_command_layer_for_duplicates: true
//! show_pdo_meta_info: false
//! read_profile_mappings: true
//! ```
//!
//! Missing keys keep their defaults. `.json` files are read as JSON,
//! anything else as YAML.

use epl_sdo::DecoderConfig;
use std::path::Path;
use thiserror::Error;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn config_from_yaml(yaml: &str) -> Result<DecoderConfig, SettingsError> {
    // An empty document deserializes to unit, not to a map.
    if yaml.trim().is_empty() {
        return Ok(DecoderConfig::default());
    }
    Ok(serde_yaml::from_str(yaml)?)
}

pub fn config_from_json(json: &str) -> Result<DecoderConfig, SettingsError> {
    Ok(serde_json::from_str(json)?)
}

/// Load a decoder configuration file.
pub fn load_config(path: &Path) -> Result<DecoderConfig, SettingsError> {
    let content = std::fs::read_to_string(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => config_from_json(&content),
        _ => config_from_yaml(&content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = config_from_yaml("duplicate_window: 25\n").expect("parse yaml");
        assert_eq!(config.duplicate_window, 25);
        assert!(config.read_profile_mappings);
        assert!(!config.show_pdo_meta_info);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(config_from_yaml("\n").unwrap(), DecoderConfig::default());
    }

    #[test]
    fn test_json_config() {
        let config = config_from_json(r#"{"show_pdo_meta_info": true}"#).expect("parse json");
        assert!(config.show_pdo_meta_info);
        assert_eq!(config.duplicate_window, DecoderConfig::default().duplicate_window);
    }

    #[test]
    fn test_unknown_type_is_error() {
        assert!(matches!(
            config_from_yaml("duplicate_window: lots\n"),
            Err(SettingsError::Yaml(_))
        ));
    }
}
