/// Structured JavaScript extractor backed by a real parser.
///
/// When the `structured-js` feature is on, JavaScript sources are parsed with
/// tree-sitter and events come from a depth-first walk over the syntax tree.
/// A source that fails to parse cleanly signals fallback (`None`) so the
/// caller can retry with the line scanner; nothing here ever panics past the
/// extractor boundary.
use tree_sitter::{Node, Parser};

use crate::extractor::EventExtractor;
use crate::protocol::{ArgValue, Event, EventKind, RawArguments};

pub struct StructuredJsExtractor;

impl StructuredJsExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl EventExtractor for StructuredJsExtractor {
    fn extract(&self, source: &str) -> Option<Vec<Event>> {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_javascript::language()).ok()?;
        let tree = parser.parse(source, None)?;
        if tree.root_node().has_error() {
            return None;
        }

        let mut walker = Walker {
            source: source.as_bytes(),
            events: Vec::new(),
            functions: Vec::new(),
            loop_depth: 0,
        };
        walker.visit(tree.root_node());
        Some(walker.events)
    }

    fn name(&self) -> &'static str {
        "structured-js"
    }
}

struct Walker<'a> {
    source: &'a [u8],
    events: Vec<Event>,
    functions: Vec<String>,
    loop_depth: usize,
}

impl<'a> Walker<'a> {
    fn visit(&mut self, node: Node<'_>) {
        match node.kind() {
            "function_declaration" | "generator_function_declaration" | "method_definition" => {
                let name = node
                    .child_by_field_name("name")
                    .map(|n| self.text(n))
                    .unwrap_or_else(|| "unknown".to_string());
                self.functions.push(name);
                self.visit_children(node);
                self.functions.pop();
            }
            "for_statement" | "for_in_statement" | "while_statement" | "do_statement" => {
                self.loop_depth += 1;
                self.visit_children(node);
                self.loop_depth -= 1;
            }
            "variable_declarator" => {
                self.visit_declarator(node);
                self.visit_children(node);
            }
            "assignment_expression" => {
                self.visit_assignment(node);
                self.visit_children(node);
            }
            _ => self.visit_children(node),
        }
    }

    fn visit_children(&mut self, node: Node<'_>) {
        for i in 0..node.child_count() {
            if let Some(child) = node.child(i) {
                self.visit(child);
            }
        }
    }

    fn visit_declarator(&mut self, node: Node<'_>) {
        let value = match node.child_by_field_name("value") {
            Some(v) => v,
            None => return,
        };
        let variable = node
            .child_by_field_name("name")
            .map(|n| self.text(n))
            .unwrap_or_else(|| "unknown".to_string());

        match value.kind() {
            "new_expression" => {
                let primitive = value
                    .child_by_field_name("constructor")
                    .map(|n| self.text(n))
                    .unwrap_or_else(|| "new".to_string());
                let values = value
                    .child_by_field_name("arguments")
                    .map(|args| self.eval_arguments(args))
                    .unwrap_or_default();
                let is_array_form = primitive == "Array";
                self.emit(
                    node,
                    EventKind::Allocation,
                    variable,
                    primitive,
                    RawArguments::Values(values),
                    is_array_form,
                );
            }
            // fixed-size array literal
            "array" => {
                let count = value.named_child_count() as i64;
                self.emit(
                    node,
                    EventKind::Allocation,
                    variable,
                    "Array".to_string(),
                    RawArguments::Values(vec![Some(ArgValue::Number(count))]),
                    true,
                );
            }
            // fixed-size object/record literal
            "object" => {
                let count = value.named_child_count() as i64;
                self.emit(
                    node,
                    EventKind::Allocation,
                    variable,
                    "Object".to_string(),
                    RawArguments::Values(vec![Some(ArgValue::Number(count))]),
                    false,
                );
            }
            _ => {}
        }
    }

    fn visit_assignment(&mut self, node: Node<'_>) {
        let (left, right) = match (
            node.child_by_field_name("left"),
            node.child_by_field_name("right"),
        ) {
            (Some(l), Some(r)) => (l, r),
            _ => return,
        };
        if left.kind() != "identifier" {
            return;
        }
        if right.kind() == "null" || right.kind() == "undefined" {
            let variable = self.text(left);
            self.emit(
                node,
                EventKind::Deallocation,
                variable,
                "null-assignment".to_string(),
                RawArguments::empty(),
                false,
            );
        }
    }

    /// Evaluate literal and simple binary-arithmetic arguments. Only numeric
    /// literals, identifiers, and `+`/`*` over two numeric literals are
    /// evaluated; anything else yields `None`.
    fn eval_arguments(&self, args: Node<'_>) -> Vec<Option<ArgValue>> {
        let mut values = Vec::new();
        for i in 0..args.named_child_count() {
            if let Some(arg) = args.named_child(i) {
                values.push(self.eval_expr(arg));
            }
        }
        values
    }

    fn eval_expr(&self, node: Node<'_>) -> Option<ArgValue> {
        match node.kind() {
            "number" => self.number(node).map(ArgValue::Number),
            "identifier" => Some(ArgValue::Name(self.text(node))),
            "binary_expression" => {
                let op = node.child_by_field_name("operator")?;
                let left = node.child_by_field_name("left")?;
                let right = node.child_by_field_name("right")?;
                if left.kind() != "number" || right.kind() != "number" {
                    return None;
                }
                let (l, r) = (self.number(left)?, self.number(right)?);
                match self.text(op).as_str() {
                    "+" => Some(ArgValue::Number(l + r)),
                    "*" => Some(ArgValue::Number(l * r)),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn number(&self, node: Node<'_>) -> Option<i64> {
        self.raw_text(node)?.trim().parse::<f64>().ok().map(|n| n as i64)
    }

    fn text(&self, node: Node<'_>) -> String {
        self.raw_text(node).unwrap_or_else(|| "unknown".to_string())
    }

    fn raw_text(&self, node: Node<'_>) -> Option<String> {
        node.utf8_text(self.source).ok().map(|s| s.to_string())
    }

    fn emit(
        &mut self,
        node: Node<'_>,
        kind: EventKind,
        variable: String,
        primitive: String,
        raw_arguments: RawArguments,
        is_array_form: bool,
    ) {
        self.events.push(Event {
            kind,
            variable,
            line: node.start_position().row + 1,
            primitive,
            raw_arguments,
            enclosing_function: self.functions.last().cloned(),
            in_loop: self.loop_depth > 0,
            is_array_form,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(source: &str) -> Option<Vec<Event>> {
        StructuredJsExtractor::new().extract(source)
    }

    #[test]
    fn extracts_new_expression_with_evaluated_args() {
        let evs = events("const buf = new ArrayBuffer(4 * 256);").unwrap();
        assert_eq!(evs.len(), 1);
        assert_eq!(evs[0].kind, EventKind::Allocation);
        assert_eq!(evs[0].variable, "buf");
        assert_eq!(evs[0].primitive, "ArrayBuffer");
        assert_eq!(evs[0].raw_arguments.first_number(), Some(1024));
    }

    #[test]
    fn array_and_object_literals() {
        let evs = events("let xs = [1, 2, 3];\nlet cfg = { a: 1, b: 2 };\n").unwrap();
        assert_eq!(evs.len(), 2);
        assert_eq!(evs[0].primitive, "Array");
        assert!(evs[0].is_array_form);
        assert_eq!(evs[0].raw_arguments.first_number(), Some(3));
        assert_eq!(evs[1].primitive, "Object");
        assert_eq!(evs[1].raw_arguments.first_number(), Some(2));
    }

    #[test]
    fn null_assignment_is_deallocation() {
        let evs = events("let a = new Foo();\na = null;\n").unwrap();
        assert_eq!(evs.len(), 2);
        assert_eq!(evs[1].kind, EventKind::Deallocation);
        assert_eq!(evs[1].primitive, "null-assignment");
        assert_eq!(evs[1].variable, "a");
    }

    #[test]
    fn tracks_function_and_loop_context() {
        let src = "function load() {\n  for (let i = 0; i < 3; i++) {\n    let b = new Buffer(8);\n  }\n}\n";
        let evs = events(src).unwrap();
        assert_eq!(evs.len(), 1);
        assert_eq!(evs[0].enclosing_function.as_deref(), Some("load"));
        assert!(evs[0].in_loop);
        assert_eq!(evs[0].line, 3);
    }

    #[test]
    fn non_literal_argument_becomes_none() {
        let evs = events("let b = new Buffer(size(), n);").unwrap();
        assert_eq!(evs.len(), 1);
        match &evs[0].raw_arguments {
            RawArguments::Values(vals) => {
                assert_eq!(vals[0], None);
                assert_eq!(vals[1], Some(ArgValue::Name("n".to_string())));
            }
            other => panic!("unexpected arguments: {:?}", other),
        }
    }

    #[test]
    fn syntax_error_signals_fallback() {
        assert!(events("function ( {{{").is_none());
    }
}
