//! API credential lookup and region selection.
//!
//! Credentials come from `VERACODE_API_KEY_ID` / `VERACODE_API_KEY_SECRET`
//! when both are set, otherwise from a profile of `~/.veracode/credentials`.

use anyhow::{Context, Result, bail};
use std::path::PathBuf;

pub const KEY_ID_ENV: &str = "VERACODE_API_KEY_ID";
pub const KEY_SECRET_ENV: &str = "VERACODE_API_KEY_SECRET";
pub const PROFILE_ENV: &str = "VERACODE_API_PROFILE";
const DEFAULT_PROFILE: &str = "default";

const EU_KEY_PREFIX: &str = "vera01";
const REGION_PREFIXES: [&str; 2] = ["vera01ei-", "vera01es-"];

/// Region hosting the account, selected by the key id prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Commercial,
    European,
}

impl Region {
    /// Top-level domain of the region's hosts
    pub fn domain(&self) -> &'static str {
        match self {
            Region::Commercial => "com",
            Region::European => "eu",
        }
    }
}

/// API key pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCredentials {
    key_id: String,
    key_secret: String,
}

impl ApiCredentials {
    pub fn new(key_id: &str, key_secret: &str) -> Self {
        Self {
            key_id: key_id.trim().to_string(),
            key_secret: key_secret.trim().to_string(),
        }
    }

    /// Load credentials from the environment, falling back to the credentials file
    pub fn load() -> Result<Self> {
        if let (Ok(id), Ok(secret)) = (std::env::var(KEY_ID_ENV), std::env::var(KEY_SECRET_ENV))
            && !id.trim().is_empty()
            && !secret.trim().is_empty()
        {
            return Ok(Self::new(&id, &secret));
        }

        let path = Self::credentials_file()?;
        let content = std::fs::read_to_string(&path).with_context(|| {
            format!(
                "No API credentials found: set {} and {} or create {}",
                KEY_ID_ENV,
                KEY_SECRET_ENV,
                path.display()
            )
        })?;

        let profile =
            std::env::var(PROFILE_ENV).unwrap_or_else(|_| DEFAULT_PROFILE.to_string());
        Self::from_credentials_file(&content, &profile)
    }

    fn credentials_file() -> Result<PathBuf> {
        let home_dir = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?;
        Ok(home_dir.join(".veracode").join("credentials"))
    }

    /// Parse an INI-style credentials file and pick one profile
    pub fn from_credentials_file(content: &str, profile: &str) -> Result<Self> {
        let mut current_profile: Option<&str> = None;
        let mut key_id = None;
        let mut key_secret = None;

        for line in content.lines() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                current_profile = Some(name.trim());
                continue;
            }

            if current_profile != Some(profile) {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                match key.trim() {
                    "veracode_api_key_id" => key_id = Some(value.trim()),
                    "veracode_api_key_secret" => key_secret = Some(value.trim()),
                    _ => {}
                }
            }
        }

        match (key_id, key_secret) {
            (Some(id), Some(secret)) => Ok(Self::new(id, secret)),
            _ => bail!(
                "Profile '{}' in the credentials file is missing veracode_api_key_id or veracode_api_key_secret",
                profile
            ),
        }
    }

    #[cfg(test)]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn region(&self) -> Region {
        if self.key_id.starts_with(EU_KEY_PREFIX) {
            Region::European
        } else {
            Region::Commercial
        }
    }

    /// Key id without its region prefix
    pub fn signing_key_id(&self) -> &str {
        strip_region_prefix(&self.key_id)
    }

    /// Key secret without its region prefix
    pub fn signing_secret(&self) -> &str {
        strip_region_prefix(&self.key_secret)
    }
}

fn strip_region_prefix(value: &str) -> &str {
    REGION_PREFIXES
        .iter()
        .find_map(|prefix| value.strip_prefix(prefix))
        .unwrap_or(value)
}
