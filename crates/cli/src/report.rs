use madl_pipeline::{ManifestRecord, RunReport};
use std::fmt::Write;

pub fn render_run_summary(report: &RunReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Files scanned:        {}", report.files_scanned);
    let _ = writeln!(out, "Files changed:        {}", report.files_changed);
    let _ = writeln!(out, "Units extracted:      {}", report.units);
    let _ = writeln!(out, "Reusable units:       {}", report.reusable);
    let _ = writeln!(out, "Annotations inserted: {}", report.annotations_inserted);
    let _ = writeln!(out, "Blocks stripped:      {}", report.blocks_stripped);
    let _ = writeln!(out, "Call edges:           {}", report.call_edges);
    let _ = writeln!(
        out,
        "Verdicts:             {} model, {} fallback ({} calls spent)",
        report.model_verdicts, report.fallback_verdicts, report.quota_used
    );
    let _ = writeln!(out, "Indexed:              {}", report.indexed);
    let _ = write!(out, "Time:                 {}ms", report.time_ms);
    if report.cancelled {
        out.push_str("\nInterrupted: files not yet started were left untouched");
    }
    push_diagnostics(&mut out, report);
    out
}

pub fn render_strip_summary(report: &RunReport) -> String {
    let mut out = format!(
        "Stripped {} blocks from {} of {} files",
        report.blocks_stripped, report.files_changed, report.files_scanned
    );
    push_diagnostics(&mut out, report);
    out
}

/// One line per unit: location, signature and resolved callers
pub fn render_units(records: &[ManifestRecord]) -> String {
    let mut out = String::new();
    for record in records {
        let _ = write!(
            out,
            "{}:{} {}",
            record.file,
            record.line_range.start_line(),
            record.signature
        );
        if let Some(scope) = &record.scope {
            let _ = write!(out, " [{scope}]");
        }
        if !record.calls_in.is_empty() {
            let _ = write!(out, " <- {} caller(s)", record.calls_in.len());
        }
        out.push('\n');
    }
    let _ = write!(out, "{} units", records.len());
    out
}

fn push_diagnostics(out: &mut String, report: &RunReport) {
    if report.diagnostics.is_empty() {
        return;
    }
    let _ = write!(out, "\n\n{} issue(s):", report.diagnostics.len());
    for diagnostic in &report.diagnostics {
        let _ = write!(out, "\n  {diagnostic}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use madl_pipeline::{Diagnostic, DiagnosticKind};

    #[test]
    fn run_summary_lists_diagnostics() {
        let mut report = RunReport {
            files_scanned: 2,
            units: 5,
            reusable: 3,
            ..Default::default()
        };
        report.add_diagnostic(Diagnostic::file("a.py", DiagnosticKind::Read, "permission denied"));

        let text = render_run_summary(&report);
        assert!(text.contains("Units extracted:      5"));
        assert!(text.contains("1 issue(s):"));
        assert!(text.contains("[read] a.py: permission denied"));
        assert!(!text.contains("Interrupted"));
    }

    #[test]
    fn strip_summary() {
        let report = RunReport {
            files_scanned: 4,
            files_changed: 1,
            blocks_stripped: 2,
            ..Default::default()
        };
        assert_eq!(render_strip_summary(&report), "Stripped 2 blocks from 1 of 4 files");
    }
}
