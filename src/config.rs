use anyhow::{Context, Result};
use std::path::PathBuf;
use url::Url;

use crate::credentials::Region;
use crate::import::retry::RetryPolicy;

/// Settings for one import run
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Workbook holding the application definitions
    pub file: PathBuf,
    /// 1-based row holding the column headers
    pub header_row: u32,
    pub verbose: bool,
    pub retry: RetryPolicy,
}

/// Base URLs of the JSON API and the legacy XML API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
    pub api_base: Url,
    pub legacy_base: Url,
}

impl ApiEndpoints {
    pub fn for_region(region: Region) -> Result<Self> {
        Self::from_api_base(&format!("https://api.veracode.{}/", region.domain()))
    }

    /// The legacy host is the API host with `api` replaced by `analysiscenter`
    pub fn from_api_base(api_base: &str) -> Result<Self> {
        let api_base =
            Url::parse(api_base).with_context(|| format!("Invalid API base URL: {}", api_base))?;

        let host = api_base
            .host_str()
            .with_context(|| format!("API base URL has no host: {}", api_base))?;
        let legacy_host = host.replacen("api", "analysiscenter", 1);

        let mut legacy_base = api_base.clone();
        legacy_base
            .set_host(Some(&legacy_host))
            .with_context(|| format!("Invalid legacy host: {}", legacy_host))?;

        Ok(Self {
            api_base,
            legacy_base,
        })
    }
}
