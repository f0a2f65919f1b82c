//! Resolves human-readable reference names to platform identifiers.
//!
//! Lookups that come back with a non-success status are retried at a fixed
//! interval. The failure budget is a `RetryState` owned by the caller and
//! shared by every lookup of the same row.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use url::Url;

use super::error::{ImportError, ImportResult};
use super::retry::{RetryPolicy, RetryState};
use crate::traits::{ContentType, HttpClient, Output};

/// How an entry is picked from the lookup results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// First entry whose match field equals the name exactly
    Exact,
    /// First entry, trusting the server-side filter
    FirstResult,
}

/// Kind of referenced resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    BusinessUnit,
    Policy,
    Team,
}

impl ReferenceKind {
    fn endpoint(&self) -> &'static str {
        match self {
            ReferenceKind::BusinessUnit => "api/authn/v2/business_units",
            ReferenceKind::Policy => "appsec/v1/policies",
            ReferenceKind::Team => "api/authn/v2/teams",
        }
    }

    fn filters(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            ReferenceKind::BusinessUnit => &[],
            ReferenceKind::Policy => &[
                ("category", "APPLICATION"),
                ("name_exact", "true"),
                ("public_policy", "true"),
            ],
            ReferenceKind::Team => &[("all_for_org", "true")],
        }
    }

    fn name_parameter(&self) -> &'static str {
        match self {
            ReferenceKind::BusinessUnit => "bu_name",
            ReferenceKind::Policy => "name",
            ReferenceKind::Team => "team_name",
        }
    }

    /// Key of the result list inside `_embedded`
    pub fn collection(&self) -> &'static str {
        match self {
            ReferenceKind::BusinessUnit => "business_units",
            ReferenceKind::Policy => "policy_versions",
            ReferenceKind::Team => "teams",
        }
    }

    fn match_field(&self) -> &'static str {
        match self {
            ReferenceKind::BusinessUnit => "bu_name",
            ReferenceKind::Policy => "name",
            ReferenceKind::Team => "team_name",
        }
    }

    fn value_field(&self) -> &'static str {
        match self {
            ReferenceKind::BusinessUnit => "bu_id",
            ReferenceKind::Policy => "guid",
            ReferenceKind::Team => "team_id",
        }
    }

    pub fn match_mode(&self) -> MatchMode {
        match self {
            ReferenceKind::Policy => MatchMode::FirstResult,
            ReferenceKind::BusinessUnit | ReferenceKind::Team => MatchMode::Exact,
        }
    }
}

/// A name to resolve into an identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceQuery {
    pub kind: ReferenceKind,
    pub name: String,
}

impl ReferenceQuery {
    pub fn new(kind: ReferenceKind, name: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
        }
    }

    /// Lookup URL with the name percent-encoded
    pub fn url(&self, api_base: &Url) -> ImportResult<Url> {
        let mut url = api_base.join(self.kind.endpoint()).map_err(|e| {
            ImportError::MalformedResponse(format!("invalid lookup URL: {}", e))
        })?;

        {
            let mut query = url.query_pairs_mut();
            for (key, value) in self.kind.filters() {
                query.append_pair(key, value);
            }
            query.append_pair(self.kind.name_parameter(), &self.name);
        }

        Ok(url)
    }

    /// Pick the identifier out of a lookup response body
    pub fn select(&self, body: &str) -> ImportResult<String> {
        let envelope: LookupEnvelope = serde_json::from_str(body)?;
        let collection = self.kind.collection();
        let match_field = self.kind.match_field();

        let entries = envelope
            .embedded
            .as_ref()
            .and_then(|embedded| embedded.get(collection))
            .and_then(Value::as_array)
            .filter(|entries| !entries.is_empty())
            .ok_or_else(|| ImportError::not_found(collection, match_field, &self.name))?;

        let entry = match self.kind.match_mode() {
            MatchMode::Exact => entries
                .iter()
                .find(|entry| {
                    entry.get(match_field).and_then(Value::as_str) == Some(self.name.as_str())
                })
                .ok_or_else(|| ImportError::not_found(collection, match_field, &self.name))?,
            MatchMode::FirstResult => &entries[0],
        };

        let value_field = self.kind.value_field();
        match entry.get(value_field) {
            Some(Value::String(id)) => Ok(id.clone()),
            Some(Value::Number(id)) => Ok(id.to_string()),
            _ => Err(ImportError::MalformedResponse(format!(
                "{} entry for '{}' has no {}",
                collection, self.name, value_field
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LookupEnvelope {
    #[serde(rename = "_embedded", default)]
    embedded: Option<HashMap<String, Value>>,
}

/// Turns reference names into identifiers through lookup calls
pub struct ReferenceResolver<'a> {
    http: &'a dyn HttpClient,
    output: &'a dyn Output,
    api_base: &'a Url,
    policy: RetryPolicy,
    verbose: bool,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(
        http: &'a dyn HttpClient,
        output: &'a dyn Output,
        api_base: &'a Url,
        policy: RetryPolicy,
        verbose: bool,
    ) -> Self {
        Self {
            http,
            output,
            api_base,
            policy,
            verbose,
        }
    }

    /// Resolve one reference, retrying non-success statuses while `retry` allows
    pub fn resolve(&self, query: &ReferenceQuery, retry: &mut RetryState) -> ImportResult<String> {
        let url = query.url(self.api_base)?;
        let collection = query.kind.collection();

        loop {
            if self.verbose {
                self.output.debug(&format!("Calling: {}", url));
            }

            let response = self
                .http
                .get(&url, ContentType::Json)
                .map_err(ImportError::Transport)?;

            if response.is_success() {
                if self.verbose {
                    self.output.debug(&response.body);
                }
                return query.select(&response.body);
            }

            self.output.error(&format!(
                "Trying to get {} named {} failed with status {}",
                collection, query.name, response.status
            ));
            if self.verbose && !response.body.is_empty() {
                self.output.debug(&response.body);
            }

            retry.record_failure();
            if !self.policy.allows_retry(retry) {
                return Err(ImportError::LookupFailed {
                    collection: collection.to_string(),
                    name: query.name.clone(),
                    status: response.status,
                });
            }

            self.policy.wait();
        }
    }
}
