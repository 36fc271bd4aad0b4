// ── Validation pipeline ──
//
// Pure, synchronous predicate rules over the current draft. Every draft
// change re-runs the whole pipeline; a failed rule contributes its
// "<field-path>:<rule-name>" code. Slow or asynchronous checks do not
// belong here — they surface as server-side submit failures instead.

use std::collections::HashSet;
use std::fmt;

use regex::Regex;
use serde_json::Value;

use crate::model::{Body, field};

type Check = Box<dyn Fn(&Body) -> bool + Send + Sync>;

/// A single named rule: a pure predicate plus the error code it yields
/// on failure.
pub struct Rule {
    code: String,
    check: Check,
}

impl Rule {
    /// Build a rule for `field_path` named `name`; the predicate returns
    /// `true` when the draft passes.
    pub fn new(
        field_path: &str,
        name: &str,
        check: impl Fn(&Body) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            code: format!("{field_path}:{name}"),
            check: Box::new(check),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule").field("code", &self.code).finish()
    }
}

// ── Stock rules ─────────────────────────────────────────────────────

/// The field must be present, non-null, and (for strings) non-empty.
pub fn required(field_path: &str) -> Rule {
    let path = field_path.to_owned();
    Rule::new(field_path, "required", move |body| {
        match field(body, &path) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    })
}

/// String fields must not exceed `limit` characters. Absent or
/// non-string values pass — combine with [`required`] when presence
/// matters.
pub fn max_length(field_path: &str, limit: usize) -> Rule {
    let path = field_path.to_owned();
    Rule::new(field_path, "max-length", move |body| {
        match field(body, &path) {
            Some(Value::String(s)) => s.chars().count() <= limit,
            _ => true,
        }
    })
}

/// String fields must match `pattern`. Absent or non-string values pass.
pub fn matches(field_path: &str, pattern: Regex) -> Rule {
    let path = field_path.to_owned();
    Rule::new(field_path, "pattern", move |body| {
        match field(body, &path) {
            Some(Value::String(s)) => pattern.is_match(s),
            _ => true,
        }
    })
}

// ── Pipeline ────────────────────────────────────────────────────────

/// An ordered list of rules evaluated against the current draft.
///
/// Results are collected in rule-declaration order and deduplicated by
/// code; validity is simply an empty result.
#[derive(Debug, Default)]
pub struct Pipeline {
    rules: Vec<Rule>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Append a rule, preserving declaration order.
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Evaluate every rule against `draft`, returning the ordered,
    /// deduplicated list of failure codes.
    pub fn evaluate(&self, draft: &Body) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut codes = Vec::new();
        for rule in &self.rules {
            if !(rule.check)(draft) && seen.insert(rule.code.as_str()) {
                codes.push(rule.code.clone());
            }
        }
        codes
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: serde_json::Value) -> Body {
        value.as_object().expect("test body is an object").clone()
    }

    #[test]
    fn required_fails_on_missing_null_and_empty() {
        let rule = required("name");
        assert!(!(rule.check)(&body(json!({}))));
        assert!(!(rule.check)(&body(json!({ "name": null }))));
        assert!(!(rule.check)(&body(json!({ "name": "" }))));
        assert!((rule.check)(&body(json!({ "name": "a" }))));
        assert!((rule.check)(&body(json!({ "name": 0 }))));
    }

    #[test]
    fn max_length_ignores_absent_values() {
        let rule = max_length("code", 5);
        assert!((rule.check)(&body(json!({}))));
        assert!((rule.check)(&body(json!({ "code": "abcde" }))));
        assert!(!(rule.check)(&body(json!({ "code": "abcdef" }))));
    }

    #[test]
    fn matches_checks_string_fields() {
        let re = Regex::new("^[A-Z]+$").expect("static pattern compiles");
        let rule = matches("code", re);
        assert!((rule.check)(&body(json!({ "code": "SPRING" }))));
        assert!(!(rule.check)(&body(json!({ "code": "spring" }))));
        assert!((rule.check)(&body(json!({ "code": 3 }))));
    }

    #[test]
    fn evaluate_preserves_declaration_order() {
        let pipeline = Pipeline::new()
            .rule(required("name"))
            .rule(required("code"))
            .rule(max_length("name", 2));

        let codes = pipeline.evaluate(&body(json!({ "name": "toolong" })));
        assert_eq!(codes, vec!["code:required", "name:max-length"]);
    }

    #[test]
    fn evaluate_deduplicates_by_code() {
        // Two rules producing the same code count once.
        let pipeline = Pipeline::new()
            .rule(Rule::new("name", "required", |b| b.contains_key("name")))
            .rule(Rule::new("name", "required", |_| false));

        let codes = pipeline.evaluate(&body(json!({})));
        assert_eq!(codes, vec!["name:required"]);
    }

    #[test]
    fn dotted_paths_reach_nested_fields() {
        let pipeline = Pipeline::new().rule(required("address.city"));
        assert!(pipeline.evaluate(&body(json!({ "address": { "city": "London" } }))).is_empty());
        assert_eq!(
            pipeline.evaluate(&body(json!({ "address": {} }))),
            vec!["address.city:required"]
        );
    }
}
