use serde::Deserialize;
use serde_json::Value;

use super::composer::RequestComposer;
use super::error::{ImportError, ImportResult};
use super::legacy::{LegacyFields, LegacyUpdate, LegacyUpdater};
use super::payload::ApplicationRequest;
use super::resolver::ReferenceResolver;
use super::retry::{RetryPolicy, RetryState};
use super::row::Row;
use crate::config::ApiEndpoints;
use crate::context::Context;

const APPLICATIONS_PATH: &str = "appsec/v1/applications";

/// Identifiers of a newly created application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedApplication {
    pub id: String,
    pub guid: Option<String>,
    pub legacy: LegacyUpdate,
}

#[derive(Debug, Deserialize)]
struct CreatedResponse {
    id: Value,
    #[serde(default)]
    guid: Option<String>,
}

/// Creates one application per row: JSON creation, then the legacy update
pub struct ApplicationCreator<'a> {
    ctx: &'a Context,
    endpoints: &'a ApiEndpoints,
    composer: RequestComposer<'a>,
    legacy: LegacyUpdater<'a>,
    verbose: bool,
}

impl<'a> ApplicationCreator<'a> {
    pub fn new(
        ctx: &'a Context,
        endpoints: &'a ApiEndpoints,
        policy: RetryPolicy,
        verbose: bool,
    ) -> Self {
        let http = ctx.http.as_ref();
        let output = ctx.output.as_ref();
        let resolver = ReferenceResolver::new(http, output, &endpoints.api_base, policy, verbose);

        Self {
            ctx,
            endpoints,
            composer: RequestComposer::new(resolver, output),
            legacy: LegacyUpdater::new(http, output, &endpoints.legacy_base, verbose),
            verbose,
        }
    }

    /// Create the application described by `row`.
    ///
    /// The creation call is attempted once. When it succeeds but the legacy
    /// update fails, the application exists and the error is still returned.
    pub fn create(&self, row: &Row, retry: &mut RetryState) -> ImportResult<CreatedApplication> {
        let request = self.composer.compose(row, retry)?;
        let (id, guid) = self.submit(&request)?;

        let legacy = self.legacy.update(&id, &LegacyFields::from_row(row))?;

        Ok(CreatedApplication { id, guid, legacy })
    }

    /// POST the request; returns the legacy id and the guid of the new application
    pub fn submit(&self, request: &ApplicationRequest) -> ImportResult<(String, Option<String>)> {
        let url = self
            .endpoints
            .api_base
            .join(APPLICATIONS_PATH)
            .map_err(|e| ImportError::MalformedResponse(format!("invalid creation URL: {}", e)))?;
        let body = serde_json::to_string(request)?;

        if self.verbose {
            self.ctx.output.debug(&serde_json::to_string_pretty(request)?);
        }

        let response = self
            .ctx
            .http
            .post_json(&url, &body)
            .map_err(ImportError::Transport)?;

        if self.verbose {
            self.ctx
                .output
                .debug(&format!("status code {}", response.status));
            if !response.body.is_empty() {
                self.ctx.output.debug(&response.body);
            }
        }

        if !response.is_success() {
            let body = response.body.trim();
            return Err(ImportError::Creation {
                status: response.status,
                body: (!body.is_empty()).then(|| body.to_string()),
            });
        }

        let created: CreatedResponse = serde_json::from_str(&response.body)?;
        let id = match created.id {
            Value::String(id) => id,
            Value::Number(id) => id.to_string(),
            other => {
                return Err(ImportError::MalformedResponse(format!(
                    "created application has an unexpected id: {}",
                    other
                )));
            }
        };

        self.ctx
            .output
            .success("Successfully created application profile.");

        Ok((id, created.guid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{MockHttpClient, MockOutput};
    use crate::workbook::{Sheet, Workbook};
    use crate::traits::MemoryWorkbookStore;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn context(http: Arc<MockHttpClient>) -> Context {
        let workbook = Workbook::new(vec![Sheet::new("Apps")]).unwrap();
        Context::test_with(
            Arc::new(MockOutput::new()),
            http,
            Arc::new(MemoryWorkbookStore::new(workbook)),
        )
    }

    fn endpoints() -> ApiEndpoints {
        ApiEndpoints::from_api_base("https://api.veracode.com/").unwrap()
    }

    fn create(http: Arc<MockHttpClient>, row: &Row) -> ImportResult<CreatedApplication> {
        let ctx = context(http);
        let endpoints = endpoints();
        let creator =
            ApplicationCreator::new(&ctx, &endpoints, RetryPolicy::new(10, Duration::ZERO), false);
        creator.create(row, &mut RetryState::new())
    }

    #[test]
    fn test_create_without_legacy_fields() {
        let http = Arc::new(MockHttpClient::new());
        http.respond("applications", 200, r#"{"id": 1234, "guid": "app-guid"}"#);
        let row = Row::from_pairs(
            2,
            &[
                ("Application Name", "App1"),
                ("Business Criticality", "very high"),
            ],
        );

        let created = create(http.clone(), &row).unwrap();

        assert_eq!(created.id, "1234");
        assert_eq!(created.guid.as_deref(), Some("app-guid"));
        assert_eq!(created.legacy, LegacyUpdate::Skipped);

        let calls = http.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, "POST");
        let sent: Value = serde_json::from_str(calls[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(sent["profile"]["business_criticality"], json!("VERY_HIGH"));
    }

    #[test]
    fn test_create_then_legacy_update() {
        let http = Arc::new(MockHttpClient::new());
        http.respond("appsec/v1/applications", 200, r#"{"id": 77, "guid": "g"}"#)
            .respond("updateapp.do", 200, "<appinfo/>");
        let row = Row::from_pairs(
            2,
            &[("Application Name", "App1"), ("Origin", "Third Party")],
        );

        let created = create(http.clone(), &row).unwrap();

        assert_eq!(created.legacy, LegacyUpdate::Applied);
        let calls = http.calls();
        assert_eq!(
            calls[1].url,
            "https://analysiscenter.veracode.com/api/5.0/updateapp.do?app_id=77&origin=Third+Party"
        );
    }

    #[test]
    fn test_creation_failure_is_not_retried_and_skips_legacy() {
        let http = Arc::new(MockHttpClient::new());
        http.respond("applications", 500, r#"{"message":"internal"}"#);
        let row = Row::from_pairs(2, &[("Application Name", "App1"), ("Industry", "Retail")]);

        let error = create(http.clone(), &row).unwrap_err();

        assert!(matches!(error, ImportError::Creation { status: 500, .. }));
        assert!(error.to_string().contains("500"));
        assert_eq!(http.call_count("applications"), 1);
        assert_eq!(http.call_count("updateapp.do"), 0);
    }

    #[test]
    fn test_unresolved_policy_skips_creation() {
        let http = Arc::new(MockHttpClient::new());
        http.respond("policies", 200, r#"{"_embedded":{"policy_versions":[]}}"#);
        let row = Row::from_pairs(
            2,
            &[("Application Name", "App1"), ("Policy", "Name-Does-Not-Exist")],
        );

        let error = create(http.clone(), &row).unwrap_err();

        assert!(matches!(error, ImportError::NotFound { .. }));
        assert_eq!(http.call_count("appsec/v1/applications"), 0);
    }

    #[test]
    fn test_legacy_error_after_creation() {
        let http = Arc::new(MockHttpClient::new());
        http.respond("applications", 200, r#"{"id": 5}"#)
            .respond("updateapp.do", 200, "<error>Invalid origin</error>");
        let row = Row::from_pairs(2, &[("Application Name", "App1"), ("Origin", "Moon")]);

        let error = create(http, &row).unwrap_err();

        assert!(matches!(error, ImportError::LegacyUpdate(_)));
    }
}
