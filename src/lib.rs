//! leakscan: heuristic static analysis of memory-management calls.
//!
//! Scans source text for allocation and deallocation primitives across
//! several languages and reports suspected leaks, double frees and unsafe
//! function usage, together with a running-memory timeline. It never
//! executes code and is a best-effort linting aid: false positives and
//! negatives are expected, and malformed input degrades to empty or partial
//! results instead of failing.

pub mod analyzer;
pub mod extractor;
pub mod language;
pub mod protocol;
pub mod quality;
pub mod report;
pub mod size;
pub mod strip;
pub mod tracker;

pub use analyzer::analyze;
pub use language::Language;
pub use protocol::{AnalysisResult, AnalysisStats, LeakSortKey};
