use anyhow::Result;
use log::warn;

use crate::pipeline::orchestrator::DigestStream;
use crate::types::{DigestReport, ErrorPolicy};

/// Drain `stream` into a [`DigestReport`], applying `policy` to per-file errors.
///
/// Under [`ErrorPolicy::AbortOnFirst`] the first failed file stops draining, cancels the run,
/// and is returned as the error; digests already received are discarded. Otherwise failures are
/// logged and kept in the report. An enumeration error fails the run under either policy.
pub fn collect_results(mut stream: DigestStream, policy: ErrorPolicy) -> Result<DigestReport> {
    let mut report = DigestReport::default();
    while let Some(result) = stream.next() {
        match result.outcome {
            Ok(digests) => {
                report.digests.insert(result.path, digests);
            }
            Err(err) => match policy {
                ErrorPolicy::AbortOnFirst => {
                    stream.cancel();
                    return Err(err.into());
                }
                ErrorPolicy::Continue => {
                    warn!("{}", err);
                    report.failures.push(err);
                }
            },
        }
    }
    report.enumerated = stream.close()?;
    if !report.failures.is_empty() {
        warn!(
            "{} of {} file(s) could not be digested",
            report.failures.len(),
            report.enumerated
        );
    }
    Ok(report)
}
