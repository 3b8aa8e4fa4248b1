/// Byte-size estimation heuristics.
///
/// These are deliberately rough: element-count times primitive-type size for
/// C-family calls, a fixed per-language multiplier otherwise. Malformed
/// arguments produce the language default instead of an error.
use once_cell::sync::Lazy;
use regex::Regex;

use crate::language::Language;
use crate::protocol::Event;

static SIZEOF_AFTER_COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*\*\s*sizeof\s*\(\s*([^)]+)\)").unwrap());
static SIZEOF_BEFORE_COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"sizeof\s*\(\s*([^)]+)\)\s*\*\s*(\d+)").unwrap());
static FIRST_INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

pub fn estimate_size(event: &Event, language: Language) -> u64 {
    if language.is_c_family() {
        estimate_c_family(event, language)
    } else {
        let count = event
            .raw_arguments
            .first_number()
            .filter(|n| *n > 0)
            .map(|n| n as u64)
            .or_else(|| first_integer(event.raw_arguments.as_text()))
            .unwrap_or(1);
        count * language.default_primitive_size()
    }
}

fn estimate_c_family(event: &Event, language: Language) -> u64 {
    let default = language.default_primitive_size();
    let args = event.raw_arguments.as_text();

    match event.primitive.as_str() {
        // calloc(count, element_size): both default to 1 when unparsable
        "calloc" => {
            let mut parts = args.splitn(2, ',');
            let count = parse_or_one(parts.next());
            let elem = parse_or_one(parts.next());
            count * elem
        }
        "new[]" => first_integer(args).unwrap_or(1) * default,
        "new" => default,
        _ => {
            if let Some(caps) = SIZEOF_AFTER_COUNT.captures(args) {
                let count = caps[1].parse::<u64>().unwrap_or(1);
                return count * type_size(&caps[2], default);
            }
            if let Some(caps) = SIZEOF_BEFORE_COUNT.captures(args) {
                let count = caps[2].parse::<u64>().unwrap_or(1);
                return count * type_size(&caps[1], default);
            }
            first_integer(args).unwrap_or(1)
        }
    }
}

/// Fixed byte-size lookup for C primitive type names
fn type_size(type_name: &str, default: u64) -> u64 {
    let name = type_name.trim();
    if name.contains("double") {
        8
    } else if name.contains("char") || name.contains("bool") {
        1
    } else if name.contains("short") {
        2
    } else if name.contains("int") || name.contains("float") || name.contains("long") {
        4
    } else {
        default
    }
}

fn parse_or_one(part: Option<&str>) -> u64 {
    part.and_then(|p| p.trim().parse::<u64>().ok()).unwrap_or(1)
}

fn first_integer(text: &str) -> Option<u64> {
    FIRST_INTEGER.find(text).and_then(|m| m.as_str().parse::<u64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ArgValue, EventKind, RawArguments};

    fn alloc(primitive: &str, args: RawArguments) -> Event {
        Event {
            kind: EventKind::Allocation,
            variable: "p".to_string(),
            line: 1,
            primitive: primitive.to_string(),
            raw_arguments: args,
            enclosing_function: None,
            in_loop: false,
            is_array_form: primitive == "new[]",
        }
    }

    fn text(args: &str) -> RawArguments {
        RawArguments::Text(args.to_string())
    }

    #[test]
    fn malloc_with_sizeof_multiplies() {
        let ev = alloc("malloc", text("10 * sizeof(int)"));
        assert_eq!(estimate_size(&ev, Language::C), 40);
        let ev = alloc("malloc", text("sizeof(double) * 4"));
        assert_eq!(estimate_size(&ev, Language::C), 32);
        let ev = alloc("malloc", text("32 * sizeof(char)"));
        assert_eq!(estimate_size(&ev, Language::C), 32);
    }

    #[test]
    fn malloc_bare_integer() {
        let ev = alloc("malloc", text("10"));
        assert_eq!(estimate_size(&ev, Language::C), 10);
    }

    #[test]
    fn malloc_unparsable_defaults_to_one() {
        let ev = alloc("malloc", text("len"));
        assert_eq!(estimate_size(&ev, Language::C), 1);
    }

    #[test]
    fn calloc_multiplies_both_arguments() {
        let ev = alloc("calloc", text("5, 4"));
        assert_eq!(estimate_size(&ev, Language::C), 20);
        // each side defaults to 1 on parse failure
        let ev = alloc("calloc", text("n, 8"));
        assert_eq!(estimate_size(&ev, Language::C), 8);
        let ev = alloc("calloc", text("garbage"));
        assert_eq!(estimate_size(&ev, Language::C), 1);
    }

    #[test]
    fn unknown_type_uses_language_default() {
        let ev = alloc("malloc", text("3 * sizeof(struct node)"));
        // "struct node" is unrecognized, resolves to the 4-byte default
        assert_eq!(estimate_size(&ev, Language::C), 12);
    }

    #[test]
    fn new_forms_use_default_primitive_size() {
        let ev = alloc("new[]", text("10"));
        assert_eq!(estimate_size(&ev, Language::Cpp), 40);
        let ev = alloc("new", text(""));
        assert_eq!(estimate_size(&ev, Language::Cpp), 4);
    }

    #[test]
    fn managed_languages_multiply_by_eight() {
        let ev = alloc("Array", RawArguments::Values(vec![Some(ArgValue::Number(1000))]));
        assert_eq!(estimate_size(&ev, Language::JavaScript), 8000);
        let ev = alloc("new", text("16"));
        assert_eq!(estimate_size(&ev, Language::Java), 128);
    }

    #[test]
    fn value_languages_multiply_by_four() {
        let ev = alloc("new", text("16"));
        assert_eq!(estimate_size(&ev, Language::Go), 64);
    }

    #[test]
    fn managed_default_count_is_one() {
        let ev = alloc("Object", RawArguments::Values(vec![None]));
        assert_eq!(estimate_size(&ev, Language::Python), 8);
    }
}
