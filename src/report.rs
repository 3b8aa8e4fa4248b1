/// Export and share collaborators. Both consume a finished `AnalysisResult`
/// and never mutate it.
use anyhow::Result;
use chrono::Local;
use serde::Serialize;
use std::path::PathBuf;

use crate::language::Language;
use crate::protocol::{AnalysisResult, AnalysisStats};

/// Structured export document: timestamp, language, derived statistics, and
/// the result sequences verbatim
#[derive(Debug, Serialize)]
pub struct ExportDocument<'a> {
    pub generated_at: String,
    pub language: Language,
    pub stats: AnalysisStats,
    #[serde(flatten)]
    pub result: &'a AnalysisResult,
}

impl<'a> ExportDocument<'a> {
    pub fn new(result: &'a AnalysisResult, language: Language) -> Self {
        Self {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            language,
            stats: result.stats(),
            result,
        }
    }
}

pub struct ReportGenerator {
    output_dir: PathBuf,
}

impl ReportGenerator {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    /// Write `analysis.json` and `summary.txt` into a timestamped session
    /// directory and return its path
    pub async fn generate(&self, result: &AnalysisResult, language: Language) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let session_dir = self.output_dir.join(format!("analysis_{}", timestamp));
        tokio::fs::create_dir_all(&session_dir).await?;

        let document = ExportDocument::new(result, language);
        let json = serde_json::to_string_pretty(&document)?;
        tokio::fs::write(session_dir.join("analysis.json"), json).await?;

        tokio::fs::write(session_dir.join("summary.txt"), share_text(result, language)).await?;

        Ok(session_dir)
    }
}

/// Condensed human-readable summary for share/clipboard hand-off
pub fn share_text(result: &AnalysisResult, language: Language) -> String {
    let stats = result.stats();
    let mut text = String::new();
    text.push_str("Memory Analysis Summary\n");
    text.push_str("=======================\n");
    text.push_str(&format!("Language: {}\n", language));
    text.push_str(&format!("Allocations: {}\n", stats.allocation_count));
    text.push_str(&format!("Frees: {}\n", stats.free_count));
    text.push_str(&format!("Leaks: {}\n", stats.leak_count));
    text.push_str(&format!("Warnings: {}\n", stats.warning_count));
    text.push_str(&format!("Leaked bytes: {}\n", format_bytes(stats.leaked_bytes)));

    if !result.leaks.is_empty() {
        text.push_str("\nLeaks:\n");
        for (i, leak) in result.leaks.iter().enumerate() {
            text.push_str(&format!(
                "{}. {} (Line {}) - {}\n",
                i + 1,
                leak.variable,
                leak.line,
                format_bytes(leak.size_bytes)
            ));
        }
    }

    text
}

pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;

    #[test]
    fn share_text_lists_each_leak() {
        let result = analyze("int *p = malloc(40);\nint *q = malloc(2048);\n", Language::C).unwrap();
        let text = share_text(&result, Language::C);
        assert!(text.contains("Allocations: 2"));
        assert!(text.contains("Leaks: 2"));
        assert!(text.contains("1. p (Line 1) - 40 B"));
        assert!(text.contains("2. q (Line 2) - 2.0 KB"));
    }

    #[test]
    fn share_text_without_leaks_has_no_leak_section() {
        let result = analyze("int *p = malloc(4); free(p);", Language::C).unwrap();
        let text = share_text(&result, Language::C);
        assert!(text.contains("Leaks: 0"));
        assert!(!text.contains("\nLeaks:\n"));
    }

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn export_document_serializes_all_sequences() {
        let result = analyze("int *p = malloc(4);\nstrcpy(a, b);\n", Language::C).unwrap();
        let document = ExportDocument::new(&result, Language::C);
        let json = serde_json::to_value(&document).unwrap();
        assert_eq!(json["language"], "c");
        assert_eq!(json["stats"]["allocation_count"], 1);
        assert!(json["allocations"].is_array());
        assert!(json["frees"].is_array());
        assert!(json["leaks"].is_array());
        assert!(json["warnings"].is_array());
        assert!(json["timeline"].is_array());
    }
}
