/// Event extraction: one extractor per language family plus a universal
/// line-scanning fallback.
///
/// The fallback chain is an explicit, testable control path, not a side
/// effect of error handling: try the structured extractor when the language
/// has one, then the line scanner, then give up with an empty sequence. No
/// extractor lets a failure escape to the caller.
use tracing::debug;

use crate::language::Language;
use crate::protocol::Event;

pub mod line_scan;
#[cfg(feature = "structured-js")]
pub mod structured;

pub use line_scan::LineScanExtractor;

/// A language-family extractor. `None` means this extractor could not
/// process the source and the next extractor in the chain should run.
pub trait EventExtractor {
    fn extract(&self, source: &str) -> Option<Vec<Event>>;

    /// Short name for logs and the CLI language listing
    fn name(&self) -> &'static str;
}

/// Structured extractor for the language, when one is built in
pub fn structured_extractor(language: Language) -> Option<Box<dyn EventExtractor>> {
    match language {
        #[cfg(feature = "structured-js")]
        Language::JavaScript => Some(Box::new(structured::StructuredJsExtractor::new())),
        _ => None,
    }
}

/// Human-readable description of the path a language takes, for `languages`
pub fn extraction_path(language: Language) -> &'static str {
    match language {
        #[cfg(feature = "structured-js")]
        Language::JavaScript => "structured parse, line-scan fallback",
        _ => "line-scan",
    }
}

/// Run the extraction chain for a language. Never fails; total failure
/// degrades to an empty event sequence.
pub fn extract_events(source: &str, language: Language) -> Vec<Event> {
    if let Some(extractor) = structured_extractor(language) {
        match extractor.extract(source) {
            Some(events) => {
                debug!(
                    extractor = extractor.name(),
                    count = events.len(),
                    "structured extraction succeeded"
                );
                return events;
            }
            None => {
                debug!(
                    extractor = extractor.name(),
                    "structured extraction failed, falling back to line scan"
                );
            }
        }
    }

    LineScanExtractor::new().extract(source).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::EventKind;

    #[test]
    fn c_goes_through_the_line_scanner() {
        let events = extract_events("int *p = malloc(4);", Language::C);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].primitive, "malloc");
    }

    #[test]
    fn unknown_language_behaves_like_c() {
        let events = extract_events("int *p = malloc(4); free(p);", Language::Other);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].kind, EventKind::Deallocation);
    }

    #[cfg(feature = "structured-js")]
    #[test]
    fn javascript_prefers_the_structured_path() {
        // null-assignment deallocations only exist on the structured path
        let events = extract_events("let a = new Foo();\na = null;\n", Language::JavaScript);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].primitive, "null-assignment");
    }

    #[cfg(feature = "structured-js")]
    #[test]
    fn broken_javascript_falls_back_to_line_scan() {
        let source = "x = new Array(50);\nfunction ( {{{\n";
        let events = extract_events(source, Language::JavaScript);
        // the structured parser rejects this, the line scanner still finds
        // the constructor allocation
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].variable, "x");
    }

    #[test]
    fn garbage_input_yields_empty_sequence() {
        let events = extract_events("\u{0}\u{1}]]]]%%%", Language::C);
        assert!(events.is_empty());
    }
}
