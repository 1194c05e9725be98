// Hook plugins for the ASSERTS, PROTO and TLS sections. Each receives the
// raw section body as its single argument and hands it back verbatim;
// they exist so the plugin registry is the single place the runner looks
// up a handler for these section names, the same way external plugins are
// looked up by name.

use anyhow::Result;
use serde_json::Value;

use crate::assert::engine::AssertionResult;
use crate::plugins::{
    Plugin, PluginContext, PluginPurity, PluginResult, PluginReturnKind, PluginSignature,
};

macro_rules! raw_body_hook {
    ($plugin:ident, $name:literal, $desc:literal) => {
        #[derive(Debug, Clone, Default)]
        pub struct $plugin;

        impl Plugin for $plugin {
            fn name(&self) -> &'static str {
                $name
            }

            fn description(&self) -> &'static str {
                $desc
            }

            fn signature(&self) -> PluginSignature {
                PluginSignature {
                    return_kind: PluginReturnKind::String,
                    purity: PluginPurity::Pure,
                    deterministic: true,
                    idempotent: true,
                    safe_for_rewrite: false,
                    arg_names: &["body"],
                }
            }

            fn execute(&self, args: &[Value], _context: &PluginContext) -> Result<PluginResult> {
                match args.first() {
                    Some(Value::String(body)) => Ok(PluginResult::Value(Value::String(body.clone()))),
                    Some(other) => Ok(PluginResult::Value(other.clone())),
                    None => Ok(PluginResult::Assertion(AssertionResult::fail(format!(
                        "@{} requires the section body as its argument",
                        $name
                    )))),
                }
            }
        }
    };
}

raw_body_hook!(AssertsHookPlugin, "asserts", "Raw-body hook for the ASSERTS section");
raw_body_hook!(ProtoHookPlugin, "proto", "Raw-body hook for the PROTO section");
raw_body_hook!(TlsHookPlugin, "tls", "Raw-body hook for the TLS section");
