//! Builds the creation request for one row.

use super::error::ImportResult;
use super::headers::{
    ARCHER_APPLICATION_NAME, APPLICATION_NAME, BUSINESS_CRITICALITY, BUSINESS_OWNER,
    BUSINESS_UNIT, DESCRIPTION, DYNAMIC_SCAN_APPROVAL, OWNER_EMAIL, POLICY, TAGS, TEAMS,
};
use super::payload::{
    ApplicationProfile, ApplicationRequest, BusinessOwner, CustomField, GuidRef, ProfileSettings,
};
use super::resolver::{ReferenceKind, ReferenceQuery, ReferenceResolver};
use super::retry::RetryState;
use super::row::Row;
use crate::traits::Output;

/// Assembles `ApplicationRequest`s, resolving reference columns on the way
pub struct RequestComposer<'a> {
    resolver: ReferenceResolver<'a>,
    output: &'a dyn Output,
}

impl<'a> RequestComposer<'a> {
    pub fn new(resolver: ReferenceResolver<'a>, output: &'a dyn Output) -> Self {
        Self { resolver, output }
    }

    /// Compose the request for `row`.
    ///
    /// Business unit and policy lookups that fail abort the row; a team that
    /// cannot be resolved is only left out.
    pub fn compose(&self, row: &Row, retry: &mut RetryState) -> ImportResult<ApplicationRequest> {
        let business_unit = self.business_unit(row, retry)?;
        let policies = self.policies(row, retry)?;
        let teams = self.teams(row, retry)?;

        Ok(ApplicationRequest {
            profile: ApplicationProfile {
                name: row.text(APPLICATION_NAME).unwrap_or_default(),
                description: row.text(DESCRIPTION).unwrap_or_default(),
                tags: row.text(TAGS).unwrap_or_default(),
                business_criticality: normalize_criticality(
                    &row.text(BUSINESS_CRITICALITY).unwrap_or_default(),
                ),
                archer_app_name: row.text(ARCHER_APPLICATION_NAME),
                business_owners: business_owners(row),
                business_unit,
                policies,
                teams,
                settings: ProfileSettings {
                    dynamic_scan_approval_not_required: dynamic_scan_approval_not_required(row),
                },
                custom_fields: custom_fields(row),
            },
        })
    }

    fn business_unit(&self, row: &Row, retry: &mut RetryState) -> ImportResult<Option<GuidRef>> {
        let Some(name) = row.text(BUSINESS_UNIT) else {
            return Ok(None);
        };

        let query = ReferenceQuery::new(ReferenceKind::BusinessUnit, &name);
        let guid = self.resolver.resolve(&query, retry)?;
        Ok(Some(GuidRef::new(guid)))
    }

    fn policies(&self, row: &Row, retry: &mut RetryState) -> ImportResult<Vec<GuidRef>> {
        let Some(name) = row.text(POLICY) else {
            return Ok(Vec::new());
        };

        let query = ReferenceQuery::new(ReferenceKind::Policy, &name);
        let guid = self.resolver.resolve(&query, retry)?;
        Ok(vec![GuidRef::new(guid)])
    }

    fn teams(&self, row: &Row, retry: &mut RetryState) -> ImportResult<Vec<GuidRef>> {
        let Some(names) = row.text(TEAMS) else {
            return Ok(Vec::new());
        };

        let mut teams = Vec::new();
        for name in names.split(',').map(str::trim).filter(|name| !name.is_empty()) {
            let query = ReferenceQuery::new(ReferenceKind::Team, name);

            match self.resolver.resolve(&query, retry) {
                Ok(guid) => teams.push(GuidRef::new(guid)),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => self
                    .output
                    .warning(&format!("Leaving out team '{}': {}", name, err)),
            }
        }

        Ok(teams)
    }
}

/// "very high" -> "VERY_HIGH"; leading and trailing whitespace is dropped first
pub fn normalize_criticality(value: &str) -> String {
    value.trim().replace(' ', "_").to_uppercase()
}

/// Owners are only sent when both the name and the email are present
fn business_owners(row: &Row) -> Vec<BusinessOwner> {
    match (row.text(BUSINESS_OWNER), row.text(OWNER_EMAIL)) {
        (Some(name), Some(email)) => vec![BusinessOwner { email, name }],
        _ => Vec::new(),
    }
}

/// The column says whether approval is needed; the API wants the opposite flag.
/// Only a literal "false" means approval is not required.
fn dynamic_scan_approval_not_required(row: &Row) -> bool {
    row.text(DYNAMIC_SCAN_APPROVAL)
        .is_some_and(|value| value.trim().to_lowercase() == "false")
}

fn custom_fields(row: &Row) -> Vec<CustomField> {
    row.custom_fields()
        .into_iter()
        .map(|(name, value)| CustomField {
            name: name.to_string(),
            value,
        })
        .collect()
}
