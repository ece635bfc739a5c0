// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Decoder configuration.
//!
//! # Environment overrides
//!
//! | variable | field |
//! |----------|-------|
//! | `EPL_SDO_DUPLICATE_WINDOW` | `duplicate_window` |
//! | `EPL_SDO_SHOW_DUPLICATES` | `show_command_layer_for_duplicates` |
//! | `EPL_SDO_PDO_META` | `show_pdo_meta_info` |
//! | `EPL_SDO_PROFILE_MAPPINGS` | `read_profile_mappings` |
//!
//! Booleans accept `1/0`, `true/false`, `yes/no`, `on/off`.

use crate::sdo::DEFAULT_DUPLICATE_WINDOW;

/// Decoder configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DecoderConfig {
    /// Frame gap inside which a repeated sequence tuple is a duplicate.
    pub duplicate_window: u32,

    /// Decode the command layer of duplicated frames anyway.
    pub show_command_layer_for_duplicates: bool,

    /// Attach mapping provenance notes to decoded PDO fields.
    pub show_pdo_meta_info: bool,

    /// Seed conversation timelines from profile-declared mappings.
    pub read_profile_mappings: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            duplicate_window: DEFAULT_DUPLICATE_WINDOW,
            show_command_layer_for_duplicates: false,
            show_pdo_meta_info: false,
            read_profile_mappings: true,
        }
    }
}

impl DecoderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `EPL_SDO_*` environment variables on top of `self`.
    ///
    /// Unparsable values are ignored with a warning.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(raw) = std::env::var("EPL_SDO_DUPLICATE_WINDOW") {
            match raw.trim().parse() {
                Ok(window) => self.duplicate_window = window,
                Err(_) => log::warn!("[config] ignoring EPL_SDO_DUPLICATE_WINDOW={:?}", raw),
            }
        }
        override_flag("EPL_SDO_SHOW_DUPLICATES", &mut self.show_command_layer_for_duplicates);
        override_flag("EPL_SDO_PDO_META", &mut self.show_pdo_meta_info);
        override_flag("EPL_SDO_PROFILE_MAPPINGS", &mut self.read_profile_mappings);
        self
    }

    pub fn with_duplicate_window(mut self, frames: u32) -> Self {
        self.duplicate_window = frames;
        self
    }

    pub fn with_show_duplicates(mut self, enabled: bool) -> Self {
        self.show_command_layer_for_duplicates = enabled;
        self
    }

    pub fn with_pdo_meta_info(mut self, enabled: bool) -> Self {
        self.show_pdo_meta_info = enabled;
        self
    }

    pub fn with_profile_mappings(mut self, enabled: bool) -> Self {
        self.read_profile_mappings = enabled;
        self
    }
}

fn override_flag(var: &str, target: &mut bool) {
    let Ok(raw) = std::env::var(var) else {
        return;
    };
    match parse_flag(&raw) {
        Some(value) => *target = value,
        None => log::warn!("[config] ignoring {}={:?}", var, raw),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = DecoderConfig::default();
        assert_eq!(cfg.duplicate_window, 64);
        assert!(!cfg.show_command_layer_for_duplicates);
        assert!(!cfg.show_pdo_meta_info);
        assert!(cfg.read_profile_mappings);
    }

    #[test]
    fn test_fluent_setters() {
        let cfg = DecoderConfig::new()
            .with_duplicate_window(32)
            .with_show_duplicates(true)
            .with_pdo_meta_info(true)
            .with_profile_mappings(false);
        assert_eq!(cfg.duplicate_window, 32);
        assert!(cfg.show_command_layer_for_duplicates);
        assert!(cfg.show_pdo_meta_info);
        assert!(!cfg.read_profile_mappings);
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag(" Yes "), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
