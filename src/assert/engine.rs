// Assertion engine: plugin-call dispatch with a jq-compatible filter fallback
// for plain path predicates.

use anyhow::Result;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::plugins::{PluginContext, PluginManager, PluginResult};

use jaq_interpret::{Ctx, FilterT, ParseCtx, RcIter, Val};

/// Assertion result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssertionResult {
    Pass,
    Fail {
        message: String,
        expected: Option<String>,
        actual: Option<String>,
    },
    Error(String),
}

impl AssertionResult {
    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail {
            message: message.into(),
            expected: None,
            actual: None,
        }
    }

    pub fn fail_with_diff(
        message: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::Fail {
            message: message.into(),
            expected: Some(expected.into()),
            actual: Some(actual.into()),
        }
    }
}

/// The four plugin-call forms a line can take, per the assertion language grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Equals,
    Test,
    Exists,
    Legacy,
}

struct PluginCall<'a> {
    name: &'a str,
    arg: String,
    value: Option<String>,
    op: OperationKind,
}

static PIPE_TEST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^@(?P<name>[A-Za-z_][A-Za-z0-9_]*)\((?P<arg>.*)\)\s*\|\s*test\((?P<pat>.*)\)$"#)
        .unwrap()
});
static EQUALS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^@(?P<name>[A-Za-z_][A-Za-z0-9_]*)\((?P<arg>.*)\)\s*==\s*(?P<val>.*)$"#).unwrap()
});
static LEGACY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^@(?P<name>[A-Za-z_][A-Za-z0-9_]*):(?P<args>.*)$"#).unwrap());
static EXISTS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^@(?P<name>[A-Za-z_][A-Za-z0-9_]*)\((?P<arg>.*)\)$"#).unwrap()
});

/// Parse a line into one of the four plugin-call forms, in priority order.
/// Pipe-test and equals are checked before the bare existence form since
/// both of those also match `@name(...)`.
fn try_parse_plugin_call(line: &str) -> Option<PluginCall<'_>> {
    if !line.starts_with('@') {
        return None;
    }

    if let Some(caps) = PIPE_TEST_RE.captures(line) {
        return Some(PluginCall {
            name: line_slice(line, caps.name("name").unwrap().range()),
            arg: caps["arg"].to_string(),
            value: Some(caps["pat"].to_string()),
            op: OperationKind::Test,
        });
    }
    if let Some(caps) = EQUALS_RE.captures(line) {
        return Some(PluginCall {
            name: line_slice(line, caps.name("name").unwrap().range()),
            arg: caps["arg"].to_string(),
            value: Some(caps["val"].trim().to_string()),
            op: OperationKind::Equals,
        });
    }
    if let Some(caps) = EXISTS_RE.captures(line) {
        return Some(PluginCall {
            name: line_slice(line, caps.name("name").unwrap().range()),
            arg: caps["arg"].to_string(),
            value: None,
            op: OperationKind::Exists,
        });
    }
    if let Some(caps) = LEGACY_RE.captures(line) {
        return Some(PluginCall {
            name: line_slice(line, caps.name("name").unwrap().range()),
            arg: caps["args"].to_string(),
            value: None,
            op: OperationKind::Legacy,
        });
    }
    None
}

fn line_slice(line: &str, range: std::ops::Range<usize>) -> &str {
    &line[range]
}

fn strip_quotes(s: &str) -> String {
    let t = s.trim();
    if t.len() >= 2 && t.starts_with('"') && t.ends_with('"') {
        t[1..t.len() - 1].to_string()
    } else {
        t.to_string()
    }
}

/// Assertion engine
pub struct AssertionEngine {
    plugin_manager: PluginManager,
}

impl AssertionEngine {
    /// Create a new assertion engine
    pub fn new() -> Self {
        Self {
            plugin_manager: PluginManager::new(),
        }
    }

    /// Evaluate a single assertion line against a response message.
    pub fn evaluate(
        &self,
        assertion: &str,
        response: &Value,
        headers: Option<&HashMap<String, String>>,
        trailers: Option<&HashMap<String, String>>,
    ) -> Result<AssertionResult> {
        self.evaluate_with_latency(assertion, response, headers, trailers, None)
    }

    /// Evaluate a single assertion line, also exposing the call's measured
    /// latency to plugins such as `grpc_response_time`.
    pub fn evaluate_with_latency(
        &self,
        assertion: &str,
        response: &Value,
        headers: Option<&HashMap<String, String>>,
        trailers: Option<&HashMap<String, String>>,
        latency_ms: Option<u64>,
    ) -> Result<AssertionResult> {
        let trimmed = assertion.trim();

        if let Some(call) = try_parse_plugin_call(trimmed) {
            return self.dispatch_plugin_call(call, response, headers, trailers, latency_ms);
        }

        match self.evaluate_path_predicate(trimmed, response, headers, trailers) {
            Ok(AssertionResult::Error(msg)) if msg.starts_with("Unsupported assertion syntax") => {
                self.evaluate_jaq(trimmed, response)
            }
            other => other,
        }
    }

    fn dispatch_plugin_call(
        &self,
        call: PluginCall,
        response: &Value,
        headers: Option<&HashMap<String, String>>,
        trailers: Option<&HashMap<String, String>>,
        latency_ms: Option<u64>,
    ) -> Result<AssertionResult> {
        let Some(plugin) = self.plugin_manager.get(call.name) else {
            return Ok(AssertionResult::Error(format!(
                "Unknown plugin: @{}",
                call.name
            )));
        };

        let mut context = PluginContext::new(response);
        if let Some(h) = headers {
            context = context.with_headers(h);
        }
        if let Some(t) = trailers {
            context = context.with_trailers(t);
        }
        if let Some(l) = latency_ms {
            context = context.with_latency_ms(l);
        }

        // header/trailer/grpc_response_time/env take their argument as a raw
        // string rather than a jq path expression.
        let args = match call.name {
            "header" | "trailer" | "env" | "grpc_response_time" | "asserts" | "proto" | "tls" => {
                vec![Value::String(strip_quotes(&call.arg))]
            }
            _ => vec![self.evaluate_expression(&call.arg, response, headers, trailers)],
        };

        let outcome = match plugin.execute(&args, &context) {
            Ok(o) => o,
            Err(e) => return Ok(AssertionResult::Error(format!("Plugin error: {}", e))),
        };

        match (outcome, call.op) {
            (PluginResult::Assertion(res), _) => Ok(res),
            (PluginResult::Value(val), OperationKind::Exists | OperationKind::Legacy) => {
                if !val.is_null() && val != Value::Bool(false) {
                    Ok(AssertionResult::Pass)
                } else {
                    Ok(AssertionResult::fail(format!(
                        "@{}({}) does not exist",
                        call.name, call.arg
                    )))
                }
            }
            (PluginResult::Value(val), OperationKind::Equals) => {
                let expected = call.value.map(|v| self.parse_value(&v)).unwrap_or(Value::Null);
                if val == expected {
                    Ok(AssertionResult::Pass)
                } else {
                    Ok(AssertionResult::fail_with_diff(
                        format!("@{}({}) == {:?} failed", call.name, call.arg, expected),
                        format!("{:?}", expected),
                        format!("{:?}", val),
                    ))
                }
            }
            (PluginResult::Value(val), OperationKind::Test) => {
                let pattern = call.value.map(|v| strip_quotes(&v)).unwrap_or_default();
                let subject = val.as_str().map(str::to_string).unwrap_or_else(|| val.to_string());
                match Regex::new(&pattern) {
                    Ok(re) if re.is_match(&subject) => Ok(AssertionResult::Pass),
                    Ok(_) => Ok(AssertionResult::fail(format!(
                        "@{}({}) | test(\"{}\") failed on {:?}",
                        call.name, call.arg, pattern, subject
                    ))),
                    Err(e) => Ok(AssertionResult::Error(format!("Invalid regex: {}", e))),
                }
            }
        }
    }

    /// Execute a jq query and return the result(s); used for plugin argument
    /// resolution and for the path-predicate fallback.
    pub fn query(&self, expr: &str, input: &Value) -> Result<Vec<Value>> {
        let main_expr = self.parse_jaq(expr)?;

        let mut defs = ParseCtx::new(Vec::new());
        defs.insert_natives(jaq_core::core());
        defs.insert_defs(jaq_std::std());

        let filter = defs.compile(main_expr);

        let inputs = RcIter::new(core::iter::empty());
        let out = filter.run((Ctx::new(vec![], &inputs), Val::from(input.clone())));

        let mut results = Vec::new();
        for r in out {
            match r {
                Ok(val) => results.push(val.into()),
                Err(e) => return Err(anyhow::anyhow!("JQ Runtime Error: {}", e)),
            }
        }

        Ok(results)
    }

    fn evaluate_jaq(&self, expr: &str, response: &Value) -> Result<AssertionResult> {
        let main_expr = match self.parse_jaq(expr) {
            Ok(main) => main,
            Err(e) => return Ok(AssertionResult::Error(format!("JQ Parse Error: {}", e))),
        };

        let mut defs = ParseCtx::new(Vec::new());
        defs.insert_natives(jaq_core::core());
        defs.insert_defs(jaq_std::std());

        let filter = defs.compile(main_expr);

        let inputs = RcIter::new(core::iter::empty());
        let out = filter.run((Ctx::new(vec![], &inputs), Val::from(response.clone())));

        let mut passed = false;
        let mut seen_false = false;
        let mut errors = Vec::new();

        for r in out {
            match r {
                Ok(val) => {
                    if val.as_bool() {
                        passed = true;
                    } else {
                        seen_false = true;
                    }
                }
                Err(e) => errors.push(format!("{}", e)),
            }
        }

        if !errors.is_empty() {
            return Ok(AssertionResult::Error(format!(
                "JQ Runtime Error: {}",
                errors.join(", ")
            )));
        }

        if seen_false {
            return Ok(AssertionResult::fail(format!(
                "JQ assertion evaluated to false: {}",
                expr
            )));
        }

        if passed {
            Ok(AssertionResult::Pass)
        } else {
            Ok(AssertionResult::fail(format!(
                "JQ assertion produced no output (falsey): {}",
                expr
            )))
        }
    }

    fn parse_jaq(&self, expr: &str) -> Result<jaq_syn::Main> {
        let parser = jaq_parse::main();
        let result = jaq_parse::parse(expr, parser);

        match result.0 {
            Some(main) => Ok(main),
            None => {
                let errs = result.1;
                Err(anyhow::anyhow!("Failed to parse JQ expression: {:?}", errs))
            }
        }
    }

    /// Plain `.path == value` / `.path | length > 0` style predicates that do
    /// not use the `@plugin(...)` call syntax.
    fn evaluate_path_predicate(
        &self,
        assertion: &str,
        response: &Value,
        headers: Option<&HashMap<String, String>>,
        trailers: Option<&HashMap<String, String>>,
    ) -> Result<AssertionResult> {
        let operators = [
            "contains",
            "matches",
            "startsWith",
            "endsWith",
            "==",
            "!=",
            ">=",
            "<=",
            ">",
            "<",
        ];

        for op in operators {
            if let Some(idx) = assertion.find(op) {
                let lhs_str = assertion[..idx].trim();
                let rhs_str = assertion[idx + op.len()..].trim();

                if lhs_str.is_empty() || lhs_str.contains('|') {
                    continue;
                }
                if lhs_str.contains('(') && !lhs_str.starts_with('@') {
                    continue;
                }

                let lhs_val = self.evaluate_expression(lhs_str, response, headers, trailers);
                let rhs_val = self.parse_value(rhs_str);

                return self.compare(lhs_val, op, rhs_val, lhs_str, rhs_str);
            }
        }

        Ok(AssertionResult::Error(format!(
            "Unsupported assertion syntax: {}",
            assertion
        )))
    }

    fn evaluate_expression(
        &self,
        expr: &str,
        response: &Value,
        headers: Option<&HashMap<String, String>>,
        trailers: Option<&HashMap<String, String>>,
    ) -> Value {
        if let Some(call) = try_parse_plugin_call(expr.trim()) {
            if let Some(plugin) = self.plugin_manager.get(call.name) {
                let mut context = PluginContext::new(response);
                if let Some(h) = headers {
                    context = context.with_headers(h);
                }
                if let Some(t) = trailers {
                    context = context.with_trailers(t);
                }
                let arg_val = self.evaluate_expression(&call.arg, response, headers, trailers);
                if let Ok(PluginResult::Value(v)) = plugin.execute(&[arg_val], &context) {
                    return v;
                }
                return Value::Null;
            }
        }
        self.resolve_path(expr, response)
    }

    fn parse_value(&self, s: &str) -> Value {
        if s.starts_with('"') {
            Value::String(strip_quotes(s))
        } else if s.parse::<f64>().is_ok() {
            serde_json::from_str(s).unwrap_or(Value::Null)
        } else if s == "true" {
            Value::Bool(true)
        } else if s == "false" {
            Value::Bool(false)
        } else if s == "null" {
            Value::Null
        } else {
            Value::String(s.to_string())
        }
    }

    fn compare(
        &self,
        lhs: Value,
        op: &str,
        rhs: Value,
        lhs_expr: &str,
        rhs_expr: &str,
    ) -> Result<AssertionResult> {
        let pass = match op {
            "==" => lhs == rhs,
            "!=" => lhs != rhs,
            ">" => matches!((lhs.as_f64(), rhs.as_f64()), (Some(l), Some(r)) if l > r),
            "<" => matches!((lhs.as_f64(), rhs.as_f64()), (Some(l), Some(r)) if l < r),
            ">=" => matches!((lhs.as_f64(), rhs.as_f64()), (Some(l), Some(r)) if l >= r),
            "<=" => matches!((lhs.as_f64(), rhs.as_f64()), (Some(l), Some(r)) if l <= r),
            "contains" => match (&lhs, &rhs) {
                (Value::String(l), Value::String(r)) => l.contains(r),
                (Value::Array(l), r) => l.contains(r),
                (Value::Object(l), Value::String(r)) => l.contains_key(r),
                _ => false,
            },
            "startsWith" => matches!((&lhs, &rhs), (Value::String(l), Value::String(r)) if l.starts_with(r)),
            "endsWith" => matches!((&lhs, &rhs), (Value::String(l), Value::String(r)) if l.ends_with(r)),
            "matches" => match (&lhs, &rhs) {
                (Value::String(l), Value::String(r)) => match Regex::new(r) {
                    Ok(re) => re.is_match(l),
                    Err(_) => return Ok(AssertionResult::Error(format!("Invalid regex: {}", r))),
                },
                _ => false,
            },
            _ => return Ok(AssertionResult::Error(format!("Unknown operator: {}", op))),
        };

        if pass {
            Ok(AssertionResult::Pass)
        } else {
            Ok(AssertionResult::Fail {
                message: format!(
                    "Assertion failed: {} {} {} (Values: {:?} vs {:?})",
                    lhs_expr, op, rhs_expr, lhs, rhs
                ),
                expected: Some(format!("{} {:?}", op, rhs)),
                actual: Some(format!("{:?}", lhs)),
            })
        }
    }

    fn resolve_path(&self, path: &str, root: &Value) -> Value {
        if path == "." {
            return root.clone();
        }

        let mut current = root;
        let clean_path = path.strip_prefix('.').unwrap_or(path);

        let mut parts = Vec::new();
        let mut start = 0;
        let chars = clean_path.chars().collect::<Vec<_>>();
        for (i, c) in chars.iter().enumerate() {
            if *c == '.' {
                parts.push(clean_path[start..i].to_string());
                start = i + 1;
            }
        }
        parts.push(clean_path[start..].to_string());

        for part in parts {
            if part.is_empty() {
                continue;
            }

            if let Some(bracket_start) = part.find('[') {
                if let Some(bracket_end) = part.find(']') {
                    let key = &part[0..bracket_start];
                    let index_str = &part[bracket_start + 1..bracket_end];

                    if !key.is_empty() {
                        match current.get(key) {
                            Some(val) => current = val,
                            None => return Value::Null,
                        }
                    }

                    match index_str.parse::<usize>().ok().and_then(|idx| current.get(idx)) {
                        Some(val) => current = val,
                        None => return Value::Null,
                    }
                }
            } else {
                match current.get(&part) {
                    Some(val) => current = val,
                    None => return Value::Null,
                }
            }
        }

        current.clone()
    }

    pub fn has_failures(&self, results: &[AssertionResult]) -> bool {
        results
            .iter()
            .any(|r| matches!(r, AssertionResult::Fail { .. } | AssertionResult::Error(_)))
    }

    pub fn get_failures<'a>(&self, results: &'a [AssertionResult]) -> Vec<&'a AssertionResult> {
        results
            .iter()
            .filter(|r| matches!(r, AssertionResult::Fail { .. } | AssertionResult::Error(_)))
            .collect()
    }

    /// Evaluate a block of assertion lines against one response message.
    /// A line prefixed with `[k]` applies only when `message_index == k-1`.
    pub fn evaluate_all(
        &self,
        assertions: &[String],
        response: &Value,
        headers: Option<&HashMap<String, String>>,
        trailers: Option<&HashMap<String, String>>,
    ) -> Vec<AssertionResult> {
        self.evaluate_all_indexed(assertions, response, headers, trailers, None, None)
    }

    /// Like [`Self::evaluate_all`], but able to scope `[k]`-prefixed lines to
    /// a specific 1-indexed streamed message and expose call latency.
    pub fn evaluate_all_indexed(
        &self,
        assertions: &[String],
        response: &Value,
        headers: Option<&HashMap<String, String>>,
        trailers: Option<&HashMap<String, String>>,
        message_index: Option<usize>,
        latency_ms: Option<u64>,
    ) -> Vec<AssertionResult> {
        assertions
            .iter()
            .filter_map(|assertion| {
                let (targeted_index, line) = parse_index_prefix(assertion);
                if let (Some(target), Some(actual)) = (targeted_index, message_index)
                    && target != actual
                {
                    return None;
                }
                Some(
                    self.evaluate_with_latency(line, response, headers, trailers, latency_ms)
                        .unwrap_or_else(|e| AssertionResult::Error(format!("Internal error: {}", e))),
                )
            })
            .collect()
    }
}

/// Strip a leading `[k]` message-index prefix (1-indexed) from an assertion
/// line, returning the target index (0-indexed) and the remaining text.
fn parse_index_prefix(line: &str) -> (Option<usize>, &str) {
    let trimmed = line.trim_start();
    if let Some(rest) = trimmed.strip_prefix('[')
        && let Some(close) = rest.find(']')
        && let Ok(k) = rest[..close].parse::<usize>()
        && k >= 1
    {
        return (Some(k - 1), rest[close + 1..].trim_start());
    }
    (None, trimmed)
}

impl Default for AssertionEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine() -> AssertionEngine {
        AssertionEngine::new()
    }

    #[test]
    fn path_predicate_equals() {
        let e = engine();
        let resp = json!({"status": "ok"});
        let r = e.evaluate(".status == \"ok\"", &resp, None, None).unwrap();
        assert_eq!(r, AssertionResult::Pass);
    }

    #[test]
    fn jaq_filter_fallback() {
        let e = engine();
        let resp = json!({"items": [1, 2, 3]});
        let r = e.evaluate(".items | length > 0", &resp, None, None).unwrap();
        assert_eq!(r, AssertionResult::Pass);
    }

    #[test]
    fn plugin_existence_pass() {
        let e = engine();
        let resp = json!({"id": "123e4567-e89b-12d3-a456-426614174000"});
        let r = e.evaluate("@uuid(.id)", &resp, None, None).unwrap();
        assert_eq!(r, AssertionResult::Pass);
    }

    #[test]
    fn plugin_header_pipe_test() {
        let e = engine();
        let mut headers = HashMap::new();
        headers.insert("x-request-id".to_string(), "7c3a1111-aaaa-bbbb-cccc-ddddeeeeffff".to_string());
        let resp = json!({});
        let r = e
            .evaluate(
                "@header(\"x-request-id\") | test(\"^[0-9a-f-]+$\")",
                &resp,
                Some(&headers),
                None,
            )
            .unwrap();
        assert_eq!(r, AssertionResult::Pass);
    }

    #[test]
    fn plugin_header_pipe_test_fail() {
        let e = engine();
        let mut headers = HashMap::new();
        headers.insert("x-request-id".to_string(), "not-hex!!".to_string());
        let resp = json!({});
        let r = e
            .evaluate(
                "@header(\"x-request-id\") | test(\"^[0-9a-f-]+$\")",
                &resp,
                Some(&headers),
                None,
            )
            .unwrap();
        assert!(matches!(r, AssertionResult::Fail { .. }));
    }

    #[test]
    fn plugin_header_equals() {
        let e = engine();
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        let resp = json!({});
        let r = e
            .evaluate(
                "@header(\"content-type\") == \"application/json\"",
                &resp,
                Some(&headers),
                None,
            )
            .unwrap();
        assert_eq!(r, AssertionResult::Pass);
    }

    #[test]
    fn plugin_unknown_errors() {
        let e = engine();
        let resp = json!({});
        let r = e.evaluate("@nope(\"x\")", &resp, None, None).unwrap();
        assert!(matches!(r, AssertionResult::Error(_)));
    }

    #[test]
    fn index_prefix_parsing() {
        assert_eq!(parse_index_prefix("[2] .status == \"ok\""), (Some(1), ".status == \"ok\""));
        assert_eq!(parse_index_prefix(".status == \"ok\""), (None, ".status == \"ok\""));
    }

    #[test]
    fn evaluate_all_respects_index_prefix() {
        let e = engine();
        let resp = json!({"status": "ok"});
        let lines = vec!["[1] .status == \"ok\"".to_string(), "[2] .status == \"bad\"".to_string()];
        let results = e.evaluate_all_indexed(&lines, &resp, None, None, Some(0), None);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0], AssertionResult::Pass);
    }
}
