/// Stateful allocation tracking.
///
/// One tracker is created per `analyze` call and discarded afterward; there
/// is no process-wide state. Events arrive in document order and drive a
/// per-variable stack of live allocation records: a new allocation for an
/// already-live variable evicts the previous record as a reassignment leak,
/// a deallocation pops the most recent record, and anything still live at
/// end of stream is a leak. Every event, whatever its outcome, appends one
/// running-memory sample to the timeline.
use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::language::Language;
use crate::protocol::{
    AllocationRecord, Event, EventKind, FreeRecord, Leak, LeakKind, TimelineSample, Warning,
    WarningKind,
};
use crate::size::estimate_size;

pub struct AllocationTracker {
    language: Language,
    live: HashMap<String, Vec<AllocationRecord>>,
    current_memory: i64,
    allocations: Vec<AllocationRecord>,
    frees: Vec<FreeRecord>,
    leaks: Vec<Leak>,
    warnings: Vec<Warning>,
    timeline: Vec<TimelineSample>,
    /// ids evicted by reassignment, so end-of-stream reporting can tell
    /// which allocations were never resolved
    evicted: HashSet<String>,
    freed: HashSet<String>,
}

/// Everything the tracker produced, consumed by the result assembler
pub struct TrackerOutput {
    pub allocations: Vec<AllocationRecord>,
    pub frees: Vec<FreeRecord>,
    pub leaks: Vec<Leak>,
    pub warnings: Vec<Warning>,
    pub timeline: Vec<TimelineSample>,
}

impl AllocationTracker {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            live: HashMap::new(),
            current_memory: 0,
            allocations: Vec::new(),
            frees: Vec::new(),
            leaks: Vec::new(),
            warnings: Vec::new(),
            timeline: Vec::new(),
            evicted: HashSet::new(),
            freed: HashSet::new(),
        }
    }

    pub fn process(&mut self, event: &Event) {
        // a malformed event is skipped, but still contributes a timeline
        // sample so chart length stays one-per-event
        if !event.variable.is_empty() {
            match event.kind {
                EventKind::Allocation => self.on_allocation(event),
                EventKind::Deallocation => self.on_deallocation(event),
            }
        }
        self.timeline.push(TimelineSample {
            line: event.line,
            memory_bytes: self.current_memory,
        });
    }

    fn on_allocation(&mut self, event: &Event) {
        let old = self.live.get_mut(&event.variable).and_then(|s| s.pop());
        if let Some(old) = old {
            self.current_memory -= old.size_bytes as i64;
            self.evicted.insert(old.id.clone());
            self.leaks.push(Leak {
                kind: LeakKind::Reassignment,
                variable: old.variable.clone(),
                line: old.line,
                primitive: old.primitive.clone(),
                size_bytes: old.size_bytes,
                in_loop: old.in_loop,
                suggestion: format!(
                    "'{}' was reassigned at line {} while the allocation from line {} was still live; free it before reassigning",
                    old.variable, event.line, old.line
                ),
            });
        }
        if self.live.get(&event.variable).map_or(false, |s| s.is_empty()) {
            self.live.remove(&event.variable);
        }

        let size_bytes = estimate_size(event, self.language);
        let record = AllocationRecord {
            id: format!(
                "{}:{}:{}",
                event.variable,
                event.line,
                Uuid::new_v4().simple()
            ),
            variable: event.variable.clone(),
            line: event.line,
            primitive: event.primitive.clone(),
            size_bytes,
            in_loop: event.in_loop,
            enclosing_function: event.enclosing_function.clone(),
        };
        self.current_memory += size_bytes as i64;
        self.allocations.push(record.clone());
        self.live.entry(event.variable.clone()).or_default().push(record);
    }

    fn on_deallocation(&mut self, event: &Event) {
        let popped = match self.live.get_mut(&event.variable) {
            None => {
                self.warnings.push(Warning {
                    kind: WarningKind::PotentialDoubleFree,
                    line: event.line,
                    message: format!(
                        "'{}' is released at line {} without a tracked allocation (potential double free or free of unallocated memory)",
                        event.variable, event.line
                    ),
                    source_line: String::new(),
                });
                return;
            }
            Some(stack) => stack.pop(),
        };

        match popped {
            Some(record) => {
                self.current_memory -= record.size_bytes as i64;
                self.freed.insert(record.id.clone());
                self.frees.push(FreeRecord {
                    allocation_id: record.id,
                    variable: event.variable.clone(),
                    line: event.line,
                    size_bytes: record.size_bytes,
                });
                if self.live.get(&event.variable).map_or(false, |s| s.is_empty()) {
                    self.live.remove(&event.variable);
                }
            }
            // an empty stack should have been evicted; handled defensively
            None => {
                self.live.remove(&event.variable);
                self.warnings.push(Warning {
                    kind: WarningKind::DoubleFree,
                    line: event.line,
                    message: format!(
                        "'{}' is released at line {} but was already freed (double free)",
                        event.variable, event.line
                    ),
                    source_line: String::new(),
                });
            }
        }
    }

    /// End of stream: everything still live leaks, reported in the order
    /// the allocations were recorded
    pub fn finish(mut self) -> TrackerOutput {
        for record in &self.allocations {
            if self.freed.contains(&record.id) || self.evicted.contains(&record.id) {
                continue;
            }
            self.leaks.push(Leak {
                kind: LeakKind::EndOfStream,
                variable: record.variable.clone(),
                line: record.line,
                primitive: record.primitive.clone(),
                size_bytes: record.size_bytes,
                in_loop: record.in_loop,
                suggestion: remediation(record),
            });
        }

        TrackerOutput {
            allocations: self.allocations,
            frees: self.frees,
            leaks: self.leaks,
            warnings: self.warnings,
            timeline: self.timeline,
        }
    }
}

fn remediation(record: &AllocationRecord) -> String {
    if record.in_loop {
        format!(
            "'{}' is allocated inside a loop and never released; release it inside the loop body, or collect the allocations and release them after the loop",
            record.variable
        )
    } else {
        match record.enclosing_function.as_deref() {
            Some(function) if function != "main" => format!(
                "'{}' is allocated in '{}' and never released; release it before '{}' returns, or make the caller responsible for releasing it",
                record.variable, function, function
            ),
            _ => format!(
                "'{}' is never released; release it before return or at a cleanup point",
                record.variable
            ),
        }
    }
}
