/// Analysis pipeline entry point and result assembly.
///
/// `analyze` is synchronous and referentially transparent per call, modulo
/// the unique-id disambiguator in allocation records. The only error it ever
/// raises is input validation on empty source; every internal failure is
/// absorbed into the result itself.
use anyhow::{bail, Result};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, warn};

use crate::extractor::extract_events;
use crate::language::Language;
use crate::protocol::{AnalysisResult, Warning, WarningKind};
use crate::quality;
use crate::strip::strip_comments;
use crate::tracker::AllocationTracker;

pub fn analyze(source: &str, language: Language) -> Result<AnalysisResult> {
    if source.is_empty() {
        bail!("source text is empty");
    }

    // last line of defense: a panic anywhere below becomes a single
    // Analysis Error warning, never an error to the caller
    match catch_unwind(AssertUnwindSafe(|| run_pipeline(source, language))) {
        Ok(result) => Ok(result),
        Err(_) => {
            warn!("analysis pipeline panicked; returning synthetic error result");
            Ok(analysis_error_result())
        }
    }
}

fn run_pipeline(source: &str, language: Language) -> AnalysisResult {
    let cleaned = strip_comments(source);
    let events = extract_events(&cleaned, language);
    debug!(language = %language, events = events.len(), "extracted events");

    let mut tracker = AllocationTracker::new(language);
    for event in &events {
        tracker.process(event);
    }
    let output = tracker.finish();

    // the quality scan runs on the original line text, in parallel with the
    // tracker's view of the stripped source
    let quality_warnings = quality::scan_lines(source);

    assemble(source, output, quality_warnings)
}

/// Merge tracker output with quality-scanner warnings into the final,
/// immutable result. Tracker warnings carry only a line number; the
/// offending line text is filled in here from the original source.
fn assemble(
    source: &str,
    output: crate::tracker::TrackerOutput,
    quality_warnings: Vec<Warning>,
) -> AnalysisResult {
    let lines: Vec<&str> = source.lines().collect();
    let mut warnings = output.warnings;
    for warning in &mut warnings {
        if warning.source_line.is_empty() {
            if let Some(text) = warning.line.checked_sub(1).and_then(|i| lines.get(i)) {
                warning.source_line = text.trim().to_string();
            }
        }
    }
    warnings.extend(quality_warnings);
    AnalysisResult {
        allocations: output.allocations,
        frees: output.frees,
        leaks: output.leaks,
        warnings,
        timeline: output.timeline,
    }
}

fn analysis_error_result() -> AnalysisResult {
    let mut result = AnalysisResult::empty();
    result.warnings.push(Warning {
        kind: WarningKind::AnalysisError,
        line: 0,
        message: "analysis failed unexpectedly; results are empty".to_string(),
        source_line: String::new(),
    });
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_source_is_the_only_error() {
        assert!(analyze("", Language::C).is_err());
        assert!(analyze(" ", Language::C).is_ok());
    }

    #[test]
    fn comments_are_ignored_by_extraction() {
        let src = "// int *dead = malloc(4);\nint *p = malloc(8);\n/* free(p); */\n";
        let result = analyze(src, Language::C).unwrap();
        assert_eq!(result.allocations.len(), 1);
        assert_eq!(result.frees.len(), 0);
        assert_eq!(result.allocations[0].variable, "p");
    }

    #[test]
    fn quality_warnings_come_after_tracker_warnings() {
        let src = "strcpy(a, b);\nfree(p);\n";
        let result = analyze(src, Language::C).unwrap();
        assert_eq!(result.warnings.len(), 2);
        assert_eq!(result.warnings[0].kind, WarningKind::PotentialDoubleFree);
        assert_eq!(result.warnings[1].kind, WarningKind::UnsafeFunction);
    }

    #[test]
    fn tracker_warnings_carry_source_line_text() {
        let src = "int *p = malloc(4);\nfree(p);\nfree(p);\n";
        let result = analyze(src, Language::C).unwrap();
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].kind, WarningKind::PotentialDoubleFree);
        assert_eq!(result.warnings[0].source_line, "free(p);");
    }

    #[test]
    fn synthetic_error_result_shape() {
        let result = analysis_error_result();
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].kind, WarningKind::AnalysisError);
        assert!(result.allocations.is_empty());
        assert!(result.timeline.is_empty());
    }
}
