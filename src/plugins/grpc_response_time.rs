// Response-time plugin: @grpc_response_time(N) or @grpc_response_time(N-M)
// Passes when the measured call latency falls within the given bound(s).

use anyhow::Result;
use serde_json::Value;

use crate::assert::engine::AssertionResult;
use crate::plugins::{
    Plugin, PluginContext, PluginPurity, PluginResult, PluginReturnKind, PluginSignature,
};

#[derive(Debug, Clone, Default)]
pub struct GrpcResponseTimePlugin;

fn parse_bound(arg: &str) -> Option<(u64, u64)> {
    let arg = arg.trim();
    if let Some((lo, hi)) = arg.split_once('-') {
        let lo = lo.trim().parse::<u64>().ok()?;
        let hi = hi.trim().parse::<u64>().ok()?;
        Some((lo, hi))
    } else {
        let max = arg.parse::<u64>().ok()?;
        Some((0, max))
    }
}

impl Plugin for GrpcResponseTimePlugin {
    fn name(&self) -> &'static str {
        "grpc_response_time"
    }

    fn description(&self) -> &'static str {
        "Assert the gRPC call completed within N milliseconds, or within N-M"
    }

    fn signature(&self) -> PluginSignature {
        PluginSignature {
            return_kind: PluginReturnKind::Boolean,
            purity: PluginPurity::ContextDependent,
            deterministic: false,
            idempotent: true,
            safe_for_rewrite: false,
            arg_names: &["bound"],
        }
    }

    fn execute(&self, args: &[Value], context: &PluginContext) -> Result<PluginResult> {
        if args.len() != 1 {
            return Ok(PluginResult::Assertion(AssertionResult::fail(
                "@grpc_response_time requires 1 argument: N or N-M",
            )));
        }

        let arg_str = match &args[0] {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => {
                return Ok(PluginResult::Assertion(AssertionResult::fail(
                    "@grpc_response_time argument must be a string or number",
                )));
            }
        };

        let Some((lo, hi)) = parse_bound(&arg_str) else {
            return Ok(PluginResult::Assertion(AssertionResult::fail(format!(
                "@grpc_response_time could not parse bound: {}",
                arg_str
            ))));
        };

        let Some(latency) = context.latency_ms else {
            return Ok(PluginResult::Assertion(AssertionResult::fail(
                "@grpc_response_time: call latency was not recorded",
            )));
        };

        if latency >= lo && latency <= hi {
            Ok(PluginResult::Assertion(AssertionResult::Pass))
        } else {
            Ok(PluginResult::Assertion(AssertionResult::fail_with_diff(
                format!(
                    "response time {}ms outside bound {}",
                    latency, arg_str
                ),
                arg_str,
                format!("{}ms", latency),
            )))
        }
    }
}
