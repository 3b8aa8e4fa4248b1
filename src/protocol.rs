/// Common data model shared by the extraction pipeline, the tracker and the
/// report consumers
use serde::{Deserialize, Serialize};

/// Kind of a memory-management event found in source text
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EventKind {
    /// A call or construct that requests memory (malloc, calloc, new, ...)
    Allocation,
    /// A call or construct that releases memory (free, delete, null-assignment)
    Deallocation,
}

/// A single evaluated argument from a structured (parsed) allocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ArgValue {
    /// Numeric literal, or `+`/`*` over two numeric literals
    Number(i64),
    /// Bare identifier
    Name(String),
}

/// Argument payload of an event. Line-scanned events carry the raw argument
/// text; structured events carry a list of evaluated values where `None`
/// marks an expression the evaluator refused.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum RawArguments {
    Text(String),
    Values(Vec<Option<ArgValue>>),
}

impl RawArguments {
    pub fn empty() -> Self {
        RawArguments::Text(String::new())
    }

    /// Argument text for pattern-based size estimation ("" for structured args)
    pub fn as_text(&self) -> &str {
        match self {
            RawArguments::Text(t) => t,
            RawArguments::Values(_) => "",
        }
    }

    /// First evaluated numeric argument, if any
    pub fn first_number(&self) -> Option<i64> {
        match self {
            RawArguments::Text(_) => None,
            RawArguments::Values(values) => values.iter().find_map(|v| match v {
                Some(ArgValue::Number(n)) => Some(*n),
                _ => None,
            }),
        }
    }
}

/// One allocation or deallocation occurrence, in document order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    /// Variable receiving or releasing the memory; "unknown" if unparsable
    pub variable: String,
    /// 1-based source line
    pub line: usize,
    /// Name of the primitive used: "malloc", "free", "new[]", a constructor
    /// name, "null-assignment", ...
    pub primitive: String,
    pub raw_arguments: RawArguments,
    pub enclosing_function: Option<String>,
    pub in_loop: bool,
    pub is_array_form: bool,
}

/// A live (or once-live) allocation owned by the tracker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationRecord {
    /// Unique id for cross-referencing in export data. Uniqueness is the
    /// contract; the format is incidental.
    pub id: String,
    pub variable: String,
    pub line: usize,
    pub primitive: String,
    pub size_bytes: u64,
    pub in_loop: bool,
    pub enclosing_function: Option<String>,
}

/// A successful deallocation, referencing the record it freed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreeRecord {
    pub allocation_id: String,
    pub variable: String,
    /// Line of the deallocation event
    pub line: usize,
    pub size_bytes: u64,
}

/// Why an allocation was reported as leaked
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LeakKind {
    /// Variable was bound to a new allocation while this one was still live
    Reassignment,
    /// Still live when the event stream ended
    EndOfStream,
}

/// A leaked allocation with remediation advice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leak {
    pub kind: LeakKind,
    pub variable: String,
    /// Line of the leaked allocation
    pub line: usize,
    pub primitive: String,
    pub size_bytes: u64,
    pub in_loop: bool,
    pub suggestion: String,
}

/// Category of a non-leak anomaly
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum WarningKind {
    /// Deallocation of a variable whose stack is present but empty
    DoubleFree,
    /// Deallocation of a variable with no tracked allocation at all
    PotentialDoubleFree,
    /// Use of a known-unsafe function
    UnsafeFunction,
    /// The pipeline itself failed; the result is otherwise empty
    AnalysisError,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub line: usize,
    pub message: String,
    /// Trimmed text of the offending source line
    pub source_line: String,
}

/// Running-memory sample, one per processed event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimelineSample {
    pub line: usize,
    pub memory_bytes: i64,
}

/// Sort order a consumer may request for leak listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeakSortKey {
    Line,
    Size,
    Variable,
}

/// Immutable outcome of one `analyze` call. All sequences are in the order
/// their triggering events were processed; never re-sorted implicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub allocations: Vec<AllocationRecord>,
    pub frees: Vec<FreeRecord>,
    pub leaks: Vec<Leak>,
    pub warnings: Vec<Warning>,
    pub timeline: Vec<TimelineSample>,
}

impl AnalysisResult {
    pub fn empty() -> Self {
        Self {
            allocations: vec![],
            frees: vec![],
            leaks: vec![],
            warnings: vec![],
            timeline: vec![],
        }
    }

    /// Leaks re-sorted on demand. Stable: ties keep document order.
    pub fn sorted_leaks(&self, key: LeakSortKey) -> Vec<Leak> {
        let mut leaks = self.leaks.clone();
        match key {
            LeakSortKey::Line => leaks.sort_by_key(|l| l.line),
            LeakSortKey::Size => leaks.sort_by_key(|l| l.size_bytes),
            LeakSortKey::Variable => leaks.sort_by(|a, b| a.variable.cmp(&b.variable)),
        }
        leaks
    }

    pub fn stats(&self) -> AnalysisStats {
        AnalysisStats {
            allocation_count: self.allocations.len(),
            free_count: self.frees.len(),
            leak_count: self.leaks.len(),
            warning_count: self.warnings.len(),
            leaked_bytes: self.leaks.iter().map(|l| l.size_bytes).sum(),
        }
    }
}

/// Derived counters used by the export and share collaborators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisStats {
    pub allocation_count: usize,
    pub free_count: usize,
    pub leak_count: usize,
    pub warning_count: usize,
    pub leaked_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leak(variable: &str, line: usize, size: u64) -> Leak {
        Leak {
            kind: LeakKind::EndOfStream,
            variable: variable.to_string(),
            line,
            primitive: "malloc".to_string(),
            size_bytes: size,
            in_loop: false,
            suggestion: String::new(),
        }
    }

    #[test]
    fn sorted_leaks_is_stable() {
        let mut result = AnalysisResult::empty();
        result.leaks = vec![leak("b", 5, 8), leak("a", 5, 8), leak("c", 2, 8)];

        let by_line: Vec<_> = result
            .sorted_leaks(LeakSortKey::Line)
            .into_iter()
            .map(|l| l.variable)
            .collect();
        // ties on line 5 keep document order (b before a)
        assert_eq!(by_line, vec!["c", "b", "a"]);

        let by_var: Vec<_> = result
            .sorted_leaks(LeakSortKey::Variable)
            .into_iter()
            .map(|l| l.variable)
            .collect();
        assert_eq!(by_var, vec!["a", "b", "c"]);

        // the input ordering is untouched
        assert_eq!(result.leaks[0].variable, "b");
    }

    #[test]
    fn stats_sums_leaked_bytes() {
        let mut result = AnalysisResult::empty();
        result.leaks = vec![leak("a", 1, 40), leak("b", 2, 20)];
        let stats = result.stats();
        assert_eq!(stats.leak_count, 2);
        assert_eq!(stats.leaked_bytes, 60);
    }
}
