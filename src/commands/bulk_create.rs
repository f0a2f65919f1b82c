use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::config::{ApiEndpoints, ImportConfig};
use crate::context::Context;
use crate::import::{ImportRunner, ImportSummary};

/// Handles the bulk creation of application profiles from a workbook
pub struct BulkCreateCommand;

impl BulkCreateCommand {
    /// Execute the import and print the summary
    pub fn execute(
        ctx: &Context,
        config: &ImportConfig,
        endpoints: &ApiEndpoints,
        stop: Arc<AtomicBool>,
    ) -> Result<ImportSummary> {
        ctx.output.section("Bulk application creation");
        ctx.output
            .key_value("Workbook", &config.file.display().to_string());
        ctx.output
            .key_value("Header row", &config.header_row.to_string());
        if config.verbose {
            ctx.output.key_value("API", endpoints.api_base.as_str());
            ctx.output.key_value("Legacy API", endpoints.legacy_base.as_str());
        }

        let summary = ImportRunner::new(ctx, config, endpoints)
            .with_stop_flag(stop)
            .run()?;

        Self::print_summary(ctx, &summary);

        Ok(summary)
    }

    fn print_summary(ctx: &Context, summary: &ImportSummary) {
        ctx.output.section("Summary");
        ctx.output.key_value("Rows", &summary.total.to_string());
        ctx.output
            .key_value("Succeeded", &summary.succeeded.to_string());
        ctx.output.key_value("Failed", &summary.failed.to_string());
        ctx.output
            .key_value("Skipped (already done)", &summary.skipped.to_string());

        if summary.interrupted {
            ctx.output
                .warning("Interrupted; run again to continue with the remaining rows");
        } else if summary.failed > 0 {
            ctx.output.warning(&format!(
                "{} row(s) failed; fix them and run again to retry only those rows",
                summary.failed
            ));
        } else {
            ctx.output.success("All rows imported");
        }
    }
}
