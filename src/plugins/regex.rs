// Regex plugin for pattern matching
// Usage: @regex(field, "pattern")

use anyhow::Result;
use regex::Regex;
use serde_json::Value;

use crate::assert::engine::AssertionResult;
use crate::plugins::{
    Plugin, PluginContext, PluginPurity, PluginResult, PluginReturnKind, PluginSignature,
};

/// Regex plugin for pattern matching
#[derive(Debug, Clone, Default)]
pub struct RegexPlugin;

impl Plugin for RegexPlugin {
    fn name(&self) -> &'static str {
        "@regex"
    }

    fn description(&self) -> &'static str {
        "Validate field matches regex pattern"
    }

    fn signature(&self) -> PluginSignature {
        PluginSignature {
            return_kind: PluginReturnKind::Boolean,
            purity: PluginPurity::Pure,
            deterministic: true,
            idempotent: true,
            safe_for_rewrite: true,
            arg_names: &["value", "pattern"],
        }
    }

    fn execute(&self, args: &[Value], _context: &PluginContext) -> Result<PluginResult> {
        // Check argument count
        if args.len() != 2 {
            return Ok(PluginResult::Assertion(AssertionResult::fail(
                "@regex requires 2 arguments: field and pattern",
            )));
        }

        // Get field value
        let field_value = match &args[0] {
            Value::String(s) => s,
            Value::Number(n) => {
                return Ok(PluginResult::Assertion(AssertionResult::fail(format!(
                    "@regex expects string field, got number: {}",
                    n
                ))));
            }
            _ => {
                return Ok(PluginResult::Assertion(AssertionResult::fail(
                    "@regex first argument must be a string",
                )));
            }
        };

        // Get pattern
        let pattern = match &args[1] {
            Value::String(s) => s,
            _ => {
                return Ok(PluginResult::Assertion(AssertionResult::fail(
                    "@regex second argument (pattern) must be a string",
                )));
            }
        };

        // Compile and match regex
        match Regex::new(pattern) {
            Ok(re) => {
                if re.is_match(field_value) {
                    Ok(PluginResult::Assertion(AssertionResult::Pass))
                } else {
                    Ok(PluginResult::Assertion(AssertionResult::fail(format!(
                        "Value '{}' does not match pattern '{}'",
                        field_value, pattern
                    ))))
                }
            }
            Err(e) => Ok(PluginResult::Assertion(AssertionResult::fail(format!(
                "Invalid regex pattern '{}': {}",
                pattern, e
            )))),
        }
    }
}
