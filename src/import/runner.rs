//! Resumable row loop.
//!
//! The status column (right after the last header) is both the resume marker
//! and the per-row report: rows already marked `success` are skipped, all
//! other rows are (re)processed and get their outcome written back. The
//! workbook is saved after every processed row.

use anyhow::{Context as _, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::creator::{ApplicationCreator, CreatedApplication};
use super::legacy::LegacyUpdate;
use super::headers::HeaderMap;
use super::retry::RetryState;
use super::row::Row;
use crate::config::{ApiEndpoints, ImportConfig};
use crate::context::Context;
use crate::workbook::CellValue;

pub const SUCCESS: &str = "success";

/// Longest text an Excel cell accepts
pub const MAX_CELL_CHARS: usize = 32_767;
const ELLIPSIS: &str = "...";

/// Result of processing one row, as written to its status cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Success,
    Failed(String),
}

impl RowOutcome {
    pub fn as_cell_text(&self) -> &str {
        match self {
            RowOutcome::Success => SUCCESS,
            RowOutcome::Failed(message) => message,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RowOutcome::Success)
    }

    /// Cell text cut down to what a cell can hold
    pub fn status_cell(&self) -> CellValue {
        let text = self.as_cell_text();
        if text.chars().count() <= MAX_CELL_CHARS {
            return CellValue::text(text);
        }

        let mut truncated: String = text.chars().take(MAX_CELL_CHARS - ELLIPSIS.len()).collect();
        truncated.push_str(ELLIPSIS);
        CellValue::Text(truncated)
    }
}

/// Counts for one pass over the workbook
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub interrupted: bool,
}

/// Processes every data row of the active sheet in order
pub struct ImportRunner<'a> {
    ctx: &'a Context,
    config: &'a ImportConfig,
    endpoints: &'a ApiEndpoints,
    stop: Option<Arc<AtomicBool>>,
}

impl<'a> ImportRunner<'a> {
    pub fn new(ctx: &'a Context, config: &'a ImportConfig, endpoints: &'a ApiEndpoints) -> Self {
        Self {
            ctx,
            config,
            endpoints,
            stop: None,
        }
    }

    /// Stop before the next row once `flag` is raised
    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop = Some(flag);
        self
    }

    fn stop_requested(&self) -> bool {
        self.stop
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    pub fn run(&self) -> Result<ImportSummary> {
        let output = self.ctx.output.as_ref();
        let path = &self.config.file;
        let header_row = self.config.header_row;

        let mut workbook = self.ctx.store.load(path)?;
        let headers = HeaderMap::from_sheet(workbook.active_sheet(), header_row);
        if headers.is_empty() {
            anyhow::bail!("No column headers found in row {} of {:?}", header_row, path);
        }

        output.info("Finished reading excel headers");
        if self.config.verbose {
            for (name, column) in headers.in_column_order() {
                output.key_value(&format!("Column {}", column), name);
            }
            let custom = headers.custom_field_names();
            if !custom.is_empty() {
                output.key_value("Custom fields", &custom.join(", "));
            }
        }

        let creator = ApplicationCreator::new(
            self.ctx,
            self.endpoints,
            self.config.retry,
            self.config.verbose,
        );
        let status_column = headers.status_column();
        let last_row = workbook.active_sheet().max_row();
        let mut summary = ImportSummary {
            total: last_row.saturating_sub(header_row) as usize,
            ..ImportSummary::default()
        };

        for row_index in (header_row + 1)..=last_row {
            if self.stop_requested() {
                output.warning("Import interrupted; remaining rows are left for the next run");
                summary.interrupted = true;
                break;
            }

            let position = (row_index - header_row) as usize;
            let sheet = workbook.active_sheet();

            if sheet.cell(row_index, status_column).to_string() == SUCCESS {
                output.info(&format!(
                    "Skipping row {}/{} as it was already done",
                    position, summary.total
                ));
                summary.skipped += 1;
                continue;
            }

            let row = Row::from_sheet(sheet, &headers, row_index);
            output.progress(position, summary.total, "Importing row");
            if self.config.verbose {
                for (name, value) in row.values() {
                    output.key_value(name, &value.to_string());
                }
            }

            // A fresh failure budget per row
            let mut retry = RetryState::new();
            let outcome = match creator.create(&row, &mut retry) {
                Ok(created) => {
                    self.report_created(&created);
                    RowOutcome::Success
                }
                Err(err) if err.is_fatal() => {
                    return Err(err).with_context(|| {
                        format!("Import stopped at row {}/{}", position, summary.total)
                    });
                }
                Err(err) => RowOutcome::Failed(err.to_string()),
            };

            if outcome.is_success() {
                summary.succeeded += 1;
                output.success(&format!("Finished importing row {}/{}", position, summary.total));
            } else {
                summary.failed += 1;
                output.error(outcome.as_cell_text());
            }
            output.separator();

            workbook
                .active_sheet_mut()
                .set_cell(row.index(), status_column, outcome.status_cell());
            self.ctx.store.save(path, &workbook)?;
        }

        Ok(summary)
    }

    fn report_created(&self, created: &CreatedApplication) {
        let output = self.ctx.output.as_ref();
        output.key_value("Application ID", &created.id);
        if let Some(guid) = &created.guid {
            output.key_value("Application GUID", guid);
        }

        match created.legacy {
            LegacyUpdate::Applied => output.info("Legacy-only fields applied"),
            LegacyUpdate::Skipped if self.config.verbose => {
                output.debug("No legacy-only fields to apply")
            }
            LegacyUpdate::Skipped => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::retry::RetryPolicy;
    use crate::traits::{MemoryWorkbookStore, MockHttpClient, MockOutput, OutputMessage};
    use crate::workbook::{Sheet, Workbook};
    use std::path::PathBuf;
    use std::time::Duration;

    const HEADER: &[&str] = &["Application Name", "Business Criticality", "Policy"];

    struct Harness {
        http: Arc<MockHttpClient>,
        store: Arc<MemoryWorkbookStore>,
        ctx: Context,
        config: ImportConfig,
        endpoints: ApiEndpoints,
    }

    impl Harness {
        fn new(sheet: Sheet, header_row: u32) -> Self {
            let http = Arc::new(MockHttpClient::new());
            let store = Arc::new(MemoryWorkbookStore::new(
                Workbook::new(vec![sheet]).unwrap(),
            ));
            let ctx = Context::test_with(Arc::new(MockOutput::new()), http.clone(), store.clone());

            Self {
                http,
                store,
                ctx,
                config: ImportConfig {
                    file: PathBuf::from("apps.xlsx"),
                    header_row,
                    verbose: false,
                    retry: RetryPolicy::new(10, Duration::ZERO),
                },
                endpoints: ApiEndpoints::from_api_base("https://api.veracode.com/").unwrap(),
            }
        }

        fn run(&self) -> Result<ImportSummary> {
            ImportRunner::new(&self.ctx, &self.config, &self.endpoints).run()
        }

        fn status(&self, row: u32) -> String {
            self.store
                .workbook()
                .active_sheet()
                .cell(row, 4)
                .to_string()
        }
    }

    #[test]
    fn test_all_done_is_a_no_op() {
        let mut sheet = Sheet::from_text_rows(
            "Apps",
            &[HEADER, &["App1", "High", ""], &["App2", "Low", ""]],
        );
        sheet.set_cell(2, 4, CellValue::text("success"));
        sheet.set_cell(3, 4, CellValue::text("success"));
        let harness = Harness::new(sheet.clone(), 1);

        let summary = harness.run().unwrap();

        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.succeeded + summary.failed, 0);
        assert!(harness.http.calls().is_empty());
        assert_eq!(harness.store.save_count(), 0);
        assert_eq!(harness.store.workbook().active_sheet(), &sheet);
    }

    #[test]
    fn test_rerun_skips_success_and_retries_failures() {
        let mut sheet = Sheet::from_text_rows(
            "Apps",
            &[
                &["Bulk import"],
                &[],
                &[],
                HEADER,
                &["App5", "High", ""],
                &["App6", "Low", ""],
            ],
        );
        sheet.set_cell(5, 4, CellValue::text("success"));
        sheet.set_cell(6, 4, CellValue::text("Unable to create application profile: 500"));
        let harness = Harness::new(sheet, 4);
        harness.http.respond("applications", 200, r#"{"id": 6}"#);

        let summary = harness.run().unwrap();

        assert_eq!(summary.total, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(harness.http.calls().len(), 1);
        assert!(harness.http.calls()[0].body.as_deref().unwrap().contains("App6"));
        assert_eq!(harness.status(5), "success");
        assert_eq!(harness.status(6), "success");
    }

    #[test]
    fn test_failures_are_recorded_and_do_not_stop_the_run() {
        let sheet = Sheet::from_text_rows(
            "Apps",
            &[
                HEADER,
                &["App1", "High", "Name-Does-Not-Exist"],
                &["App2", "High", ""],
                &["App3", "High", ""],
            ],
        );
        let harness = Harness::new(sheet, 1);
        harness
            .http
            .respond("policies", 200, r#"{"_embedded":{"policy_versions":[]}}"#)
            .respond("appsec/v1/applications", 500, "")
            .respond("appsec/v1/applications", 200, r#"{"id": 3}"#);

        let summary = harness.run().unwrap();

        assert_eq!(summary.failed, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(
            harness.status(2),
            "ERROR: No policy_versions with name equal to 'Name-Does-Not-Exist' found"
        );
        assert_eq!(harness.status(3), "Unable to create application profile: 500");
        assert_eq!(harness.status(4), "success");
        assert_eq!(harness.http.call_count("appsec/v1/applications"), 2);
        assert_eq!(harness.store.save_count(), 3);
    }

    #[test]
    fn test_oversized_error_body_is_cut_to_cell_limit() {
        let sheet = Sheet::from_text_rows(
            "Apps",
            &[HEADER, &["App1", "High", ""], &["App2", "High", ""]],
        );
        let harness = Harness::new(sheet, 1);
        let page = "x".repeat(40_000);
        harness
            .http
            .respond("applications", 502, &page)
            .respond("applications", 200, r#"{"id": 2}"#);

        let summary = harness.run().unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.succeeded, 1);
        let status = harness.status(2);
        assert_eq!(status.chars().count(), MAX_CELL_CHARS);
        assert!(status.starts_with("Unable to create application profile: 502 - xxx"));
        assert!(status.ends_with("..."));
        assert_eq!(harness.status(3), "success");
    }

    #[test]
    fn test_created_application_is_reported() {
        let sheet = Sheet::from_text_rows(
            "Apps",
            &[&["Application Name", "Origin"], &["App1", "Third Party"]],
        );
        let http = Arc::new(MockHttpClient::new());
        http.respond("appsec/v1/applications", 200, r#"{"id": 41, "guid": "app-guid"}"#)
            .respond("updateapp.do", 200, "<appinfo/>");
        let output = Arc::new(MockOutput::new());
        let store = Arc::new(MemoryWorkbookStore::new(Workbook::new(vec![sheet]).unwrap()));
        let ctx = Context::test_with(output.clone(), http, store.clone());
        let harness = Harness::new(Sheet::new("Unused"), 1);

        let summary = ImportRunner::new(&ctx, &harness.config, &harness.endpoints)
            .run()
            .unwrap();

        assert_eq!(summary.succeeded, 1);
        assert!(output.contains(&OutputMessage::KeyValue(
            "Application ID".to_string(),
            "41".to_string()
        )));
        assert!(output.contains(&OutputMessage::KeyValue(
            "Application GUID".to_string(),
            "app-guid".to_string()
        )));
        assert!(output.contains(&OutputMessage::Info("Legacy-only fields applied".to_string())));
        assert_eq!(
            store.workbook().active_sheet().cell(2, 3),
            &CellValue::text(SUCCESS)
        );
    }

    #[test]
    fn test_short_outcome_is_kept_whole() {
        let outcome = RowOutcome::Failed("Unable to create application profile: 500".to_string());

        assert_eq!(
            outcome.status_cell(),
            CellValue::text("Unable to create application profile: 500")
        );
        assert_eq!(RowOutcome::Success.status_cell(), CellValue::text(SUCCESS));
    }

    #[test]
    fn test_retry_budget_resets_per_row() {
        let sheet = Sheet::from_text_rows(
            "Apps",
            &[HEADER, &["App1", "High", "Strict"], &["App2", "High", "Strict"]],
        );
        let mut harness = Harness::new(sheet, 1);
        harness.config.retry = RetryPolicy::new(2, Duration::ZERO);
        let found = r#"{"_embedded":{"policy_versions":[{"name":"Strict","guid":"p-1"}]}}"#;
        harness
            .http
            .respond("policies", 500, "")
            .respond("policies", 200, found)
            .respond("policies", 500, "")
            .respond("policies", 200, found)
            .respond("appsec/v1/applications", 200, r#"{"id": 1}"#)
            .respond("appsec/v1/applications", 200, r#"{"id": 2}"#);

        let summary = harness.run().unwrap();

        assert_eq!(summary.succeeded, 2);
        assert_eq!(harness.http.call_count("policies"), 4);
    }

    #[test]
    fn test_transport_failure_stops_the_run_with_progress_saved() {
        let sheet = Sheet::from_text_rows(
            "Apps",
            &[HEADER, &["App1", "High", ""], &["App2", "High", ""], &["App3", "High", ""]],
        );
        let harness = Harness::new(sheet, 1);
        harness
            .http
            .respond("applications", 200, r#"{"id": 1}"#)
            .fail("applications", "connection reset");

        let error = harness.run().unwrap_err();

        assert!(format!("{:#}", error).contains("connection reset"));
        assert_eq!(harness.status(2), "success");
        assert_eq!(harness.status(3), "");
        assert_eq!(harness.status(4), "");
        assert_eq!(harness.http.call_count("applications"), 2);
    }

    #[test]
    fn test_stop_flag_halts_before_next_row() {
        let sheet = Sheet::from_text_rows("Apps", &[HEADER, &["App1", "High", ""]]);
        let harness = Harness::new(sheet, 1);
        let flag = Arc::new(AtomicBool::new(true));

        let summary = ImportRunner::new(&harness.ctx, &harness.config, &harness.endpoints)
            .with_stop_flag(flag)
            .run()
            .unwrap();

        assert!(summary.interrupted);
        assert!(harness.http.calls().is_empty());
    }

    #[test]
    fn test_missing_headers_is_an_error() {
        let sheet = Sheet::from_text_rows("Apps", &[HEADER, &["App1", "High", ""]]);
        let harness = Harness::new(sheet, 5);

        assert!(harness.run().is_err());
    }
}
