/// Generic line-scanning event extractor, used directly for every language
/// without a structured parser and as the universal fallback.
///
/// The scanner walks physical lines keeping three pieces of lexical context:
/// the enclosing function name, a brace-depth counter, and a loop-entry
/// stack. Physical lines accumulate into logical statements (trailing `\`
/// continuation, or a line that does not look terminated), and each logical
/// statement is matched against ordered pattern lists. Pattern priority is
/// part of the contract: reordering changes which leak and size output a
/// given statement produces, so the lists below are tried strictly first
/// match wins, never longest match.
use once_cell::sync::Lazy;
use regex::Regex;

use crate::extractor::EventExtractor;
use crate::protocol::{Event, EventKind, RawArguments};

pub struct LineScanExtractor;

impl LineScanExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl EventExtractor for LineScanExtractor {
    fn extract(&self, source: &str) -> Option<Vec<Event>> {
        // the scanner itself must never take the pipeline down; a panic in
        // here degrades to the empty event sequence
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| scan(source))).ok()
    }

    fn name(&self) -> &'static str {
        "line-scan"
    }
}

static LOOP_HEAD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(?:for|while|do)\b").unwrap());

static KEYWORD_FUNC_HEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:pub\s+)?(?:async\s+)?(?:def|fn|func)\s+([A-Za-z_]\w*)").unwrap()
});

static CALL_SHAPED_HEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:[A-Za-z_][\w:<>\[\],\*&\s]*?\s+\**\s*)?([A-Za-z_]\w*)\s*\([^;{}]*\)\s*\{?\s*$")
        .unwrap()
});

/// Names that look call-shaped at line head but never open a function
const NON_FUNCTION_NAMES: &[&str] = &[
    "if", "while", "for", "switch", "do", "else", "return", "sizeof", "catch", "malloc", "calloc",
    "realloc", "free", "delete", "new",
];

// Allocation patterns, in fixed priority order: typed-pointer declarations
// before bare assignments, parenthesized-constructor before bracket forms.
static ALLOC_TYPED_PTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:[A-Za-z_]\w*\s*)+\*+\s*([A-Za-z_]\w*)\s*=\s*(malloc|calloc|realloc)\s*\((.*)\)\s*$")
        .unwrap()
});
static ALLOC_ASSIGN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*\**([A-Za-z_][\w.\[\]>-]*)\s*=\s*(malloc|calloc|realloc)\s*\((.*)\)\s*$")
        .unwrap()
});
static ALLOC_NEW_PAREN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:[A-Za-z_][\w:<>\[\],\*&\s]*?\s+)?\**\s*([A-Za-z_]\w*)\s*=\s*new\s+[A-Za-z_][\w:<>]*\s*\((.*)\)\s*$")
        .unwrap()
});
static ALLOC_NEW_ARRAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:[A-Za-z_][\w:<>\[\],\*&\s]*?\s+)?\**\s*([A-Za-z_]\w*)\s*=\s*new\s+[A-Za-z_][\w:<>]*\s*\[(.*)\]\s*$")
        .unwrap()
});
static ALLOC_NEW_BARE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:[A-Za-z_][\w:<>\[\],\*&\s]*?\s+)?\**\s*([A-Za-z_]\w*)\s*=\s*new\s+[A-Za-z_][\w:<>]*\s*$")
        .unwrap()
});

// Deallocation patterns, in fixed priority order: release-with-parens,
// array release, then scalar release.
static DEALLOC_FREE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bfree\s*\(\s*\**([A-Za-z_]\w*)").unwrap());
static DEALLOC_DELETE_ARRAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bdelete\s*\[\s*\]\s*\(?\s*([A-Za-z_]\w*)\s*\)?").unwrap());
static DEALLOC_DELETE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bdelete\b\s*\(?\s*([A-Za-z_]\w*)\s*\)?").unwrap());

/// Context captured when a logical statement starts
struct StmtCtx {
    line: usize,
    in_loop: bool,
    function: Option<String>,
}

fn scan(source: &str) -> Vec<Event> {
    let mut events = Vec::new();
    let mut brace_depth: i32 = 0;
    let mut loop_entries: Vec<i32> = Vec::new();
    let mut function: Option<(String, i32)> = None;
    let mut buf = String::new();
    let mut ctx: Option<StmtCtx> = None;

    for (idx, line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();

        if LOOP_HEAD.is_match(line) {
            loop_entries.push(brace_depth);
        }
        if let Some(name) = match_function_head(line) {
            match &function {
                // inside a braced body: keep the current function
                Some((_, entry)) if brace_depth > *entry => {}
                _ => function = Some((name, brace_depth)),
            }
        }

        if ctx.is_none() && !trimmed.is_empty() {
            ctx = Some(StmtCtx {
                line: line_no,
                in_loop: !loop_entries.is_empty(),
                function: function.as_ref().map(|(n, _)| n.clone()),
            });
        }

        if let Some(joined) = trimmed.strip_suffix('\\') {
            buf.push_str(joined);
            buf.push(' ');
        } else {
            buf.push_str(trimmed);
            buf.push(' ');
            if statement_complete(trimmed) {
                if let Some(c) = ctx.take() {
                    flush_statements(&buf, &c, &mut events);
                }
                buf.clear();
            }
        }

        let opens = line.matches('{').count() as i32;
        let closes = line.matches('}').count() as i32;
        brace_depth += opens - closes;
        while matches!(loop_entries.last(), Some(&entry) if brace_depth <= entry) {
            loop_entries.pop();
        }
        if let Some((_, entry)) = &function {
            if closes > 0 && brace_depth <= *entry {
                function = None;
            }
        }
    }

    if let Some(c) = ctx.take() {
        flush_statements(&buf, &c, &mut events);
    }
    events
}

/// A line terminates the current logical statement when it is blank or ends
/// in a statement/block delimiter. Lines ending mid-expression accumulate.
fn statement_complete(trimmed: &str) -> bool {
    trimmed.is_empty()
        || trimmed.ends_with(';')
        || trimmed.ends_with('{')
        || trimmed.ends_with('}')
        || trimmed.ends_with(':')
        || trimmed.ends_with(')')
        || trimmed.ends_with(']')
}

fn match_function_head(line: &str) -> Option<String> {
    if let Some(caps) = KEYWORD_FUNC_HEAD.captures(line) {
        return Some(caps[1].to_string());
    }
    let caps = CALL_SHAPED_HEAD.captures(line)?;
    let name = caps[1].to_string();
    if NON_FUNCTION_NAMES.contains(&name.as_str()) {
        return None;
    }
    Some(name)
}

fn flush_statements(buf: &str, ctx: &StmtCtx, events: &mut Vec<Event>) {
    for segment in buf.split(';') {
        let stmt = segment.trim();
        if stmt.is_empty() {
            continue;
        }
        if let Some(event) = match_allocation(stmt, ctx) {
            events.push(event);
        }
        if let Some(event) = match_deallocation(stmt, ctx) {
            events.push(event);
        }
    }
}

fn match_allocation(stmt: &str, ctx: &StmtCtx) -> Option<Event> {
    if let Some(caps) = ALLOC_TYPED_PTR.captures(stmt).or_else(|| ALLOC_ASSIGN.captures(stmt)) {
        return Some(make_event(
            ctx,
            EventKind::Allocation,
            &caps[1],
            &caps[2],
            caps[3].trim(),
            false,
        ));
    }
    if let Some(caps) = ALLOC_NEW_PAREN.captures(stmt) {
        return Some(make_event(
            ctx,
            EventKind::Allocation,
            &caps[1],
            "new",
            caps[2].trim(),
            false,
        ));
    }
    if let Some(caps) = ALLOC_NEW_ARRAY.captures(stmt) {
        return Some(make_event(
            ctx,
            EventKind::Allocation,
            &caps[1],
            "new[]",
            caps[2].trim(),
            true,
        ));
    }
    if let Some(caps) = ALLOC_NEW_BARE.captures(stmt) {
        return Some(make_event(ctx, EventKind::Allocation, &caps[1], "new", "", false));
    }
    None
}

fn match_deallocation(stmt: &str, ctx: &StmtCtx) -> Option<Event> {
    if let Some(caps) = DEALLOC_FREE.captures(stmt) {
        return Some(make_event(ctx, EventKind::Deallocation, &caps[1], "free", "", false));
    }
    if let Some(caps) = DEALLOC_DELETE_ARRAY.captures(stmt) {
        return Some(make_event(
            ctx,
            EventKind::Deallocation,
            &caps[1],
            "delete[]",
            "",
            true,
        ));
    }
    if let Some(caps) = DEALLOC_DELETE.captures(stmt) {
        return Some(make_event(ctx, EventKind::Deallocation, &caps[1], "delete", "", false));
    }
    None
}

fn make_event(
    ctx: &StmtCtx,
    kind: EventKind,
    variable: &str,
    primitive: &str,
    args: &str,
    is_array_form: bool,
) -> Event {
    Event {
        kind,
        variable: variable.to_string(),
        line: ctx.line,
        primitive: primitive.to_string(),
        raw_arguments: RawArguments::Text(args.to_string()),
        enclosing_function: ctx.function.clone(),
        in_loop: ctx.in_loop,
        is_array_form,
    }
}
