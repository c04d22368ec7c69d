use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Which of the three vendor payload schemas a vendor speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VendorFormat {
    Retail,
    Warehouse,
    Legacy,
}

impl std::fmt::Display for VendorFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VendorFormat::Retail => write!(f, "retail"),
            VendorFormat::Warehouse => write!(f, "warehouse"),
            VendorFormat::Legacy => write!(f, "legacy"),
        }
    }
}

/// One configured vendor backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorConfig {
    /// Stable identifier used in cache keys, telemetry, and responses.
    pub id: String,
    pub format: VendorFormat,
    /// Base URL of the vendor endpoint; the transport appends
    /// `/products/{sku}`.
    pub base_url: String,
}

#[derive(Debug, Deserialize)]
pub struct RosterFile {
    pub vendors: Vec<VendorConfig>,
}

/// Load and validate the vendor roster from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_roster(path: &Path) -> Result<RosterFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::RosterFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let roster: RosterFile = serde_yaml::from_str(&content).map_err(ConfigError::RosterFileParse)?;

    validate_roster(&roster)?;

    Ok(roster)
}

fn validate_roster(roster: &RosterFile) -> Result<(), ConfigError> {
    if roster.vendors.is_empty() {
        return Err(ConfigError::Validation(
            "vendor roster must list at least one vendor".to_string(),
        ));
    }

    let mut seen_ids = HashSet::new();

    for vendor in &roster.vendors {
        if vendor.id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "vendor id must be non-empty".to_string(),
            ));
        }

        if vendor.base_url.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "vendor '{}' has an empty base_url",
                vendor.id
            )));
        }

        if !seen_ids.insert(vendor.id.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate vendor id: '{}'",
                vendor.id
            )));
        }
    }

    Ok(())
}
