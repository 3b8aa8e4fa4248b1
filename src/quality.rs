/// Stateless line-local scan for known-unsafe function usage.
///
/// Runs on the original (un-stripped) line text, independent of allocation
/// tracking. One warning per occurrence. The table is the extension point
/// for new rules; no cross-line state is allowed here.
use once_cell::sync::Lazy;
use regex::Regex;

use crate::protocol::{Warning, WarningKind};

struct UnsafePattern {
    name: &'static str,
    safe_variant: &'static str,
    regex: Regex,
}

fn pattern(name: &'static str, safe_variant: &'static str) -> UnsafePattern {
    // word boundary keeps safe variants (strncpy, fgets, ...) from matching
    let regex = Regex::new(&format!(r"\b{}\s*\(", name)).expect("unsafe-function pattern");
    UnsafePattern {
        name,
        safe_variant,
        regex,
    }
}

static PATTERNS: Lazy<Vec<UnsafePattern>> = Lazy::new(|| {
    vec![
        pattern("strcpy", "strncpy"),
        pattern("strcat", "strncat"),
        pattern("sprintf", "snprintf"),
        pattern("vsprintf", "vsnprintf"),
        pattern("gets", "fgets"),
    ]
});

pub fn scan_lines(source: &str) -> Vec<Warning> {
    let mut warnings = Vec::new();
    for (idx, line) in source.lines().enumerate() {
        for pat in PATTERNS.iter() {
            for _ in pat.regex.find_iter(line) {
                warnings.push(Warning {
                    kind: WarningKind::UnsafeFunction,
                    line: idx + 1,
                    message: format!(
                        "unsafe function '{}' has no bounds checking; use '{}' instead",
                        pat.name, pat.safe_variant
                    ),
                    source_line: line.trim().to_string(),
                });
            }
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_strcpy_once_per_occurrence() {
        let warnings = scan_lines("strcpy(dst, src); strcpy(other, src);\n");
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].kind, WarningKind::UnsafeFunction);
        assert_eq!(warnings[0].line, 1);
        assert!(warnings[0].message.contains("strncpy"));
    }

    #[test]
    fn safe_variants_do_not_match() {
        assert!(scan_lines("strncpy(dst, src, n);\nfgets(buf, n, stdin);\nsnprintf(b, n, \"%d\", x);\n").is_empty());
    }

    #[test]
    fn reports_line_numbers_and_text() {
        let warnings = scan_lines("int x;\n  gets(buf);\n");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].line, 2);
        assert_eq!(warnings[0].source_line, "gets(buf);");
    }

    #[test]
    fn independent_of_allocation_state() {
        // no allocations anywhere, still warns
        let warnings = scan_lines("sprintf(msg, \"%s\", name);");
        assert_eq!(warnings.len(), 1);
    }
}
