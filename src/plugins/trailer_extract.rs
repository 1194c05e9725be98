// Trailer plugin for EXTRACT section
// Extracts values from gRPC metadata trailers

use anyhow::Result;
use serde_json::Value;

use crate::assert::engine::AssertionResult;
use crate::plugins::{
    Plugin, PluginContext, PluginPurity, PluginResult, PluginReturnKind, PluginSignature,
};

/// Trailer plugin - extracts trailer values
#[derive(Debug, Clone, Default)]
pub struct TrailerExtractPlugin;

impl Plugin for TrailerExtractPlugin {
    fn name(&self) -> &'static str {
        "trailer"
    }

    fn description(&self) -> &'static str {
        "Extract value from gRPC metadata trailers"
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
                "@trailer requires 1 argument: the trailer name",
            )));
        }

        if args.len() > 1 {
            return Ok(PluginResult::Assertion(AssertionResult::fail(
                "@trailer accepts only 1 argument",
            )));
        }

        // Get trailer name
        let trailer_name = match &args[0] {
            Value::String(name) => name.to_lowercase(),
            _ => {
                return Ok(PluginResult::Assertion(AssertionResult::fail(
                    "@trailer argument must be a string",
                )));
            }
        };

        // Get trailers from context
        let trailers = match context.trailers {
            Some(t) => t,
            None => {
                return Ok(PluginResult::Value(Value::Null));
            }
        };

        // Case-insensitive trailer lookup
        let value = trailers
            .iter()
            .find(|(k, _)| k.to_lowercase() == trailer_name)
            .map(|(_, v)| v.clone());

        match value {
            Some(v) => Ok(PluginResult::Value(Value::String(v))),
            None => Ok(PluginResult::Value(Value::Null)),
        }
    }
}

/// HasTrailer plugin - checks if trailer exists (returns boolean for assertions)
#[derive(Debug, Clone, Default)]
pub struct HasTrailerPlugin;

impl Plugin for HasTrailerPlugin {
    fn name(&self) -> &'static str {
        "has_trailer"
    }

    fn description(&self) -> &'static str {
        "Check if gRPC metadata trailer exists (returns true/false)"
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
        if args.is_empty() {
            return Ok(PluginResult::Assertion(AssertionResult::fail(
                "@has_trailer requires 1 argument: the trailer name",
            )));
        }

        if args.len() > 1 {
            return Ok(PluginResult::Assertion(AssertionResult::fail(
                "@has_trailer accepts only 1 argument",
            )));
        }

        let trailer_name = match &args[0] {
            Value::String(name) => name.to_lowercase(),
            _ => {
                return Ok(PluginResult::Assertion(AssertionResult::fail(
                    "@has_trailer argument must be a string",
                )));
            }
        };

        let trailers = match context.trailers {
            Some(t) => t,
            None => return Ok(PluginResult::Value(Value::Bool(false))),
        };

        let exists = trailers
            .iter()
            .any(|(k, _)| k.to_lowercase() == trailer_name);

        Ok(PluginResult::Value(Value::Bool(exists)))
    }
}
