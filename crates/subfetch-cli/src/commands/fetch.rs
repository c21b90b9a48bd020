use std::path::Path;

use anyhow::Result;
use subfetch::{ClashEngine, ContentLoader, Feedback, FetchReport, Pipeline, ProviderOutcome};

/// Print feedback items to stderr.
pub fn print_feedback(feedback: &[Feedback]) {
    for item in feedback {
        eprintln!("{item}");
    }
}

/// Run the pipeline, streaming status JSON to stdout and the summary to stderr.
pub async fn run<L: ContentLoader>(loader: L, dir: &Path, url: &str, force: bool) -> Result<()> {
    let pipeline = Pipeline::new(loader, ClashEngine);
    let sink = |json: &str| println!("{json}");

    let report = pipeline.fetch_and_validate(dir, url, force, &sink).await?;

    print_feedback(&report.feedback);
    eprintln!("{}", summary(&report, dir));

    Ok(())
}

fn summary(report: &FetchReport, dir: &Path) -> String {
    let skipped = report
        .providers
        .iter()
        .filter(|p| matches!(p, ProviderOutcome::Skipped { .. }))
        .count();
    let failed = report.failed_providers().count();

    let config = if report.fetched_config {
        "fetched"
    } else {
        "kept existing"
    };

    format!(
        "Configuration in {} {config}; providers: {} fetched, {skipped} skipped, {failed} failed.",
        dir.display(),
        report.fetched_providers(),
    )
}
