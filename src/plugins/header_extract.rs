// Header plugin for EXTRACT section
// Extracts values from gRPC metadata headers

use anyhow::Result;
use serde_json::Value;

use crate::assert::engine::AssertionResult;
use crate::plugins::{
    Plugin, PluginContext, PluginPurity, PluginResult, PluginReturnKind, PluginSignature,
};

/// Header plugin - extracts header values
#[derive(Debug, Clone, Default)]
pub struct HeaderExtractPlugin;

impl Plugin for HeaderExtractPlugin {
    fn name(&self) -> &'static str {
        "header"
    }

    fn description(&self) -> &'static str {
        "Extract value from gRPC metadata headers"
    }

    fn signature(&self) -> PluginSignature {
        PluginSignature {
            return_kind: PluginReturnKind::String,
            purity: PluginPurity::ContextDependent,
            deterministic: true,
            idempotent: true,
            safe_for_rewrite: false,
            arg_names: &["name"],
        }
    }

    fn execute(&self, args: &[Value], context: &PluginContext) -> Result<PluginResult> {
        // Check argument count
        if args.is_empty() {
            return Ok(PluginResult::Assertion(AssertionResult::fail(
                "@header requires 1 argument: the header name",
            )));
        }

        if args.len() > 1 {
            return Ok(PluginResult::Assertion(AssertionResult::fail(
                "@header accepts only 1 argument",
            )));
        }

        // Get header name
        let header_name = match &args[0] {
            Value::String(name) => name.to_lowercase(),
            _ => {
                return Ok(PluginResult::Assertion(AssertionResult::fail(
                    "@header argument must be a string",
                )));
            }
        };

        // Get headers from context
        let headers = match context.headers {
            Some(h) => h,
            None => {
                return Ok(PluginResult::Value(Value::Null));
            }
        };

        // Case-insensitive header lookup
        let value = headers
            .iter()
            .find(|(k, _)| k.to_lowercase() == header_name)
            .map(|(_, v)| v.clone());

        match value {
            Some(v) => Ok(PluginResult::Value(Value::String(v))),
            None => Ok(PluginResult::Value(Value::Null)),
        }
    }
}

/// HasHeader plugin - checks if header exists (returns boolean for assertions)
#[derive(Debug, Clone, Default)]
pub struct HasHeaderPlugin;

impl Plugin for HasHeaderPlugin {
    fn name(&self) -> &'static str {
        "has_header"
    }

    fn description(&self) -> &'static str {
        "Check if gRPC metadata header exists (returns true/false)"
    }

    fn signature(&self) -> PluginSignature {
        PluginSignature {
            return_kind: PluginReturnKind::Boolean,
            purity: PluginPurity::ContextDependent,
            deterministic: true,
            idempotent: true,
            safe_for_rewrite: true,
            arg_names: &["name"],
        }
    }

    fn execute(&self, args: &[Value], context: &PluginContext) -> Result<PluginResult> {
        // Check argument count
        if args.is_empty() {
            return Ok(PluginResult::Assertion(AssertionResult::fail(
                "@has_header requires 1 argument: the header name",
            )));
        }

        if args.len() > 1 {
            return Ok(PluginResult::Assertion(AssertionResult::fail(
                "@has_header accepts only 1 argument",
            )));
        }

        // Get header name
        let header_name = match &args[0] {
            Value::String(name) => name.to_lowercase(),
            _ => {
                return Ok(PluginResult::Assertion(AssertionResult::fail(
                    "@has_header argument must be a string",
                )));
            }
        };

        // Get headers from context
        let headers = match context.headers {
            Some(h) => h,
            None => {
                return Ok(PluginResult::Value(Value::Bool(false)));
            }
        };

        // Case-insensitive header lookup
        let exists = headers.iter().any(|(k, _)| k.to_lowercase() == header_name);

        Ok(PluginResult::Value(Value::Bool(exists)))
    }
}
