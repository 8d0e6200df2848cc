//! Configuration for the bridge
//!
//! A small YAML file selects the MIDI ports and the OSC peer. Every field
//! has a default matching a stock Ardour setup with the X-Touch Mini on the
//! local machine; a missing file just means defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::info;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub midi: MidiConfig,
    #[serde(default)]
    pub osc: OscConfig,
    /// Number of mixer strips bridged to the encoder row
    #[serde(default = "default_strips")]
    pub strips: u8,
}

/// MIDI port selection, by case-insensitive substring
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MidiConfig {
    #[serde(default = "default_port_pattern")]
    pub input_port: String,
    #[serde(default = "default_port_pattern")]
    pub output_port: String,
}

/// OSC socket addresses
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OscConfig {
    /// Local address feedback arrives on
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Ardour's OSC port
    #[serde(default = "default_remote_addr")]
    pub remote_addr: String,
    /// Port announced to Ardour for feedback
    #[serde(default = "default_feedback_port")]
    pub feedback_port: u16,
}

fn default_strips() -> u8 {
    8
}

fn default_port_pattern() -> String {
    "x-touch mini".to_string()
}

fn default_bind_addr() -> String {
    "0.0.0.0:9000".to_string()
}

fn default_remote_addr() -> String {
    "127.0.0.1:3819".to_string()
}

fn default_feedback_port() -> u16 {
    9000
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            input_port: default_port_pattern(),
            output_port: default_port_pattern(),
        }
    }
}

impl Default for OscConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            remote_addr: default_remote_addr(),
            feedback_port: default_feedback_port(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            midi: MidiConfig::default(),
            osc: OscConfig::default(),
            strips: default_strips(),
        }
    }
}

impl AppConfig {
    /// Load from a YAML file, falling back to defaults when it is absent.
    pub async fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            info!("No config file at {}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;
        let config: Self = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path))?;
        Ok(config)
    }
}
