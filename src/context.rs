use anyhow::Result;
use std::sync::Arc;

use crate::credentials::ApiCredentials;
use crate::signing::HmacSigner;
use crate::traits::{
    HttpClient, Output, ReqwestHttpClient, TerminalOutput, WorkbookStore, XlsxWorkbookStore,
};

/// Application context that holds all dependencies for dependency injection
pub struct Context {
    pub output: Arc<dyn Output>,
    pub http: Arc<dyn HttpClient>,
    pub store: Arc<dyn WorkbookStore>,
}

impl Context {
    /// Create a new context with real implementations (for production use)
    pub fn new(credentials: &ApiCredentials) -> Result<Self> {
        let signer = HmacSigner::new(credentials)?;

        Ok(Self {
            output: Arc::new(TerminalOutput),
            http: Arc::new(ReqwestHttpClient::new(signer)?),
            store: Arc::new(XlsxWorkbookStore),
        })
    }

    /// Create a test context with specific mock implementations
    #[cfg(test)]
    pub fn test_with(
        output: Arc<dyn Output>,
        http: Arc<dyn HttpClient>,
        store: Arc<dyn WorkbookStore>,
    ) -> Self {
        Self {
            output,
            http,
            store,
        }
    }
}
