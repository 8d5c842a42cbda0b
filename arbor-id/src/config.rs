//! Configuration resolution for arbor-id
//!
//! Per-field resolution with ENV → TOML priority. The PlantNet key and
//! the media store endpoint are required; the admin secret and listen
//! address fall back to compiled defaults.

use arbor_common::config::TomlConfig;
use arbor_common::{Error, Result};
use tracing::{info, warn};

/// Default listen address
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5730";

/// Default admin shared secret (a gate, not a security boundary)
const DEFAULT_ADMIN_SECRET: &str = "treeadmin123";

/// Resolve the PlantNet API key
///
/// **Priority:** ENV → TOML
pub fn resolve_plantnet_api_key(toml_config: &TomlConfig) -> Result<String> {
    let env_key = std::env::var("ARBOR_PLANTNET_API_KEY").ok();
    let toml_key = toml_config.plantnet_api_key.clone();

    let mut sources = Vec::new();
    if env_key.as_deref().map(is_valid_key).unwrap_or(false) {
        sources.push("environment");
    }
    if toml_key.as_deref().map(is_valid_key).unwrap_or(false) {
        sources.push("TOML");
    }

    if sources.len() > 1 {
        warn!(
            "PlantNet API key found in multiple sources: {}. Using environment (highest priority).",
            sources.join(", ")
        );
    }

    if let Some(key) = env_key {
        if is_valid_key(&key) {
            info!("PlantNet API key loaded from environment variable");
            return Ok(key);
        }
    }

    if let Some(key) = toml_key {
        if is_valid_key(&key) {
            info!("PlantNet API key loaded from TOML config");
            return Ok(key);
        }
    }

    Err(Error::Config(
        "PlantNet API key not configured. Please configure using one of:\n\
         1. Environment: ARBOR_PLANTNET_API_KEY=your-key-here\n\
         2. TOML config: ~/.config/arbor/arbor.toml (plantnet_api_key = \"your-key\")\n\
         \n\
         Obtain API key at: https://my.plantnet.org"
            .to_string(),
    ))
}

/// Resolve the PlantNet base URL (override is optional)
pub fn resolve_plantnet_base_url(toml_config: &TomlConfig) -> Option<String> {
    std::env::var("ARBOR_PLANTNET_BASE_URL")
        .ok()
        .or_else(|| toml_config.plantnet_base_url.clone())
        .filter(|url| !url.trim().is_empty())
}

/// Resolve the media store upload endpoint
///
/// **Priority:** ENV → TOML
pub fn resolve_media_store_url(toml_config: &TomlConfig) -> Result<String> {
    if let Ok(url) = std::env::var("ARBOR_MEDIA_STORE_URL") {
        if !url.trim().is_empty() {
            info!("Media store URL loaded from environment variable");
            return Ok(url);
        }
    }

    if let Some(url) = &toml_config.media_store_url {
        if !url.trim().is_empty() {
            info!("Media store URL loaded from TOML config");
            return Ok(url.clone());
        }
    }

    Err(Error::Config(
        "Media store URL not configured. Please configure using one of:\n\
         1. Environment: ARBOR_MEDIA_STORE_URL=https://your-media-store/upload\n\
         2. TOML config: ~/.config/arbor/arbor.toml (media_store_url = \"...\")"
            .to_string(),
    ))
}

/// Resolve the admin shared secret, falling back to the default
pub fn resolve_admin_secret(toml_config: &TomlConfig) -> String {
    std::env::var("ARBOR_ADMIN_SECRET")
        .ok()
        .or_else(|| toml_config.admin_secret.clone())
        .filter(|secret| !secret.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_ADMIN_SECRET.to_string())
}

/// Resolve the listen address, falling back to the default
pub fn resolve_bind_addr(toml_config: &TomlConfig) -> String {
    std::env::var("ARBOR_BIND_ADDR")
        .ok()
        .or_else(|| toml_config.bind_addr.clone())
        .filter(|addr| !addr.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
