// Test runner
// Executes tests defined in GctfDocument

use super::super::parser::GctfDocument;
use crate::assert::{get_json_diff, AssertionEngine, JsonComparator};
use crate::grpc::retry::{is_transient_error, probe_reachable};
use crate::grpc::{
    CircuitBreaker, CompressionMode, GrpcClient, GrpcClientConfig, ProtoConfig, RetryConfig,
    TlsConfig,
};
use crate::parser::ast::{SectionContent, SectionType};
use crate::report::CoverageCollector;
use crate::utils::file::FileUtils;
use anyhow::Result;
use futures::Stream;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::StreamExt;

/// Test execution status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestExecutionStatus {
    Pass,
    Fail(String),
}

/// Test execution result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestExecutionResult {
    pub status: TestExecutionStatus,
    pub grpc_duration_ms: Option<u64>,
    // Optional: captured response for updating the test file
    pub captured_response: Option<crate::grpc::GrpcResponse>,
}

impl TestExecutionResult {
    pub fn pass(grpc_duration_ms: Option<u64>) -> Self {
        Self {
            status: TestExecutionStatus::Pass,
            grpc_duration_ms,
            captured_response: None,
        }
    }

    pub fn fail(message: String, grpc_duration_ms: Option<u64>) -> Self {
        Self {
            status: TestExecutionStatus::Fail(message),
            grpc_duration_ms,
            captured_response: None,
        }
    }

    pub fn with_response(mut self, response: crate::grpc::GrpcResponse) -> Self {
        self.captured_response = Some(response);
        self
    }
}

/// Test runner
pub struct TestRunner {
    dry_run: bool,
    timeout_seconds: u64,
    no_assert: bool,
    update_mode: bool,
    verbose: bool,
    assertion_engine: AssertionEngine,
    coverage_collector: Option<Arc<CoverageCollector>>,
    retry_config: RetryConfig,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl TestRunner {
    fn full_service_name(package: &str, service: &str) -> String {
        if package.is_empty() {
            service.to_string()
        } else {
            format!("{}.{}", package, service)
        }
    }

    fn expected_values_for_response_section(section: &crate::parser::ast::Section) -> Vec<Value> {
        match &section.content {
            SectionContent::Json(v) => vec![v.clone()],
            SectionContent::JsonLines(values) => values.clone(),
            _ => Vec::new(),
        }
    }

    fn grpc_code_name_from_numeric(code: i64) -> Option<&'static str> {
        match code {
            0 => Some("OK"),
            1 => Some("Cancelled"),
            2 => Some("Unknown"),
            3 => Some("InvalidArgument"),
            4 => Some("DeadlineExceeded"),
            5 => Some("NotFound"),
            6 => Some("AlreadyExists"),
            7 => Some("PermissionDenied"),
            8 => Some("ResourceExhausted"),
            9 => Some("FailedPrecondition"),
            10 => Some("Aborted"),
            11 => Some("OutOfRange"),
            12 => Some("Unimplemented"),
            13 => Some("Internal"),
            14 => Some("Unavailable"),
            15 => Some("DataLoss"),
            16 => Some("Unauthenticated"),
            _ => None,
        }
    }

    fn error_matches_expected(error_text: &str, expected: &Value) -> bool {
        if let Some(expected_msg) = expected.get("message").and_then(|v| v.as_str()) {
            if !error_text.contains(expected_msg) {
                return false;
            }
        } else if expected.is_string() {
            if let Some(s) = expected.as_str() {
                if !error_text.contains(s) {
                    return false;
                }
            }
        }

        if let Some(code) = expected.get("code").and_then(|v| v.as_i64()) {
            if let Some(code_name) = Self::grpc_code_name_from_numeric(code) {
                let status_marker = format!("status: {}", code_name);
                if !error_text.contains(&status_marker) && !error_text.contains(&format!("code: {}", code)) {
                    return false;
                }
            }
        }

        true
    }

    /// Create a new test runner
    pub fn new(
        dry_run: bool,
        timeout_seconds: u64,
        no_assert: bool,
        update_mode: bool,
        verbose: bool,
        coverage_collector: Option<Arc<CoverageCollector>>,
    ) -> Self {
        Self::with_retry(
            dry_run,
            timeout_seconds,
            no_assert,
            update_mode,
            verbose,
            coverage_collector,
            RetryConfig::disabled(),
        )
    }

    /// Create a new test runner with connection-retry behavior configured
    /// (`--retry`/`--retry-delay`/`--no-retry`).
    #[allow(clippy::too_many_arguments)]
    pub fn with_retry(
        dry_run: bool,
        timeout_seconds: u64,
        no_assert: bool,
        update_mode: bool,
        verbose: bool,
        coverage_collector: Option<Arc<CoverageCollector>>,
        retry_config: RetryConfig,
    ) -> Self {
        Self {
            dry_run,
            timeout_seconds,
            no_assert,
            update_mode,
            verbose,
            assertion_engine: AssertionEngine::new(),
            coverage_collector,
            retry_config,
            circuit_breaker: Arc::new(CircuitBreaker::default_policy()),
        }
    }

    /// Connect to `address`, retrying transient connection failures with
    /// backoff and short-circuiting via the per-address circuit breaker.
    async fn connect_with_retry(&self, client_config: GrpcClientConfig) -> Result<GrpcClient> {
        let address = client_config.address.clone();

        if self.circuit_breaker.is_open(&address) {
            return Err(anyhow::anyhow!(
                "circuit breaker open for {}: too many recent connection failures",
                address
            ));
        }

        if !probe_reachable(&address, Duration::from_secs(5)).await {
            self.circuit_breaker.record_failure(&address);
            return Err(anyhow::anyhow!("address {} is unreachable", address));
        }

        let mut last_err = None;
        for attempt in 1..=self.retry_config.max_attempts {
            match GrpcClient::new(client_config.clone()).await {
                Ok(client) => {
                    self.circuit_breaker.record_success(&address);
                    return Ok(client);
                }
                Err(e) => {
                    self.circuit_breaker.record_failure(&address);
                    let transient = is_transient_error(&e);
                    last_err = Some(e);

                    if !transient || attempt == self.retry_config.max_attempts {
                        break;
                    }

                    let delay = self.retry_config.delay_for_attempt(attempt);
                    tracing::warn!(
                        address = %address,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "transient connection failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("failed to connect to {}", address)))
    }

    /// Invoke the call, retrying the whole attempt (fresh request stream
    /// included) if it fails with a transient status. Requests carry no
    /// dependency on prior responses, so replaying the full sequence is safe.
    async fn call_stream_with_retry(
        &self,
        client: &mut GrpcClient,
        full_service: &str,
        method: &str,
        request_values: &[Value],
    ) -> Result<(
        HashMap<String, String>,
        Pin<Box<dyn Stream<Item = Result<crate::grpc::client::StreamItem, tonic::Status>> + Send>>,
    )> {
        let mut last_err = None;
        for attempt in 1..=self.retry_config.max_attempts {
            let requests = futures::stream::iter(request_values.to_vec());
            match client.call_stream(full_service, method, requests).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    let transient = is_transient_error(&e);
                    last_err = Some(e);

                    if !transient || attempt == self.retry_config.max_attempts {
                        break;
                    }

                    let delay = self.retry_config.delay_for_attempt(attempt);
                    tracing::warn!(
                        full_service,
                        method,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "transient gRPC call failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("gRPC call to {}/{} failed", full_service, method)))
    }

    /// Run a single test
    pub async fn run_test(&self, document: &GctfDocument) -> Result<TestExecutionResult> {
        // Extract address
        let address = match document.get_address(
            std::env::var(crate::config::ENV_GRPCTESTIFY_ADDRESS)
                .ok()
                .as_deref(),
        ) {
            Some(a) => a,
            None => {
                // Default to localhost:4770 if no address is specified anywhere
                crate::config::default_address()
            }
        };

        // Extract endpoint
        let (package, service, method) = match document.parse_endpoint() {
            Some(e) => e,
            None => {
                return Ok(TestExecutionResult::fail(
                    "Invalid or missing endpoint".to_string(),
                    None,
                ))
            }
        };

        if document.sections.is_empty() {
            return Ok(TestExecutionResult::fail(
                "No sections found".to_string(),
                None,
            ));
        }

        if self.dry_run {
            // In dry-run, show detailed preview of what will be executed
            self.print_dry_run_preview(document, &address, &package, &service, &method);
            return Ok(TestExecutionResult::pass(None));
        }

        // Configure Client
        let document_path = Path::new(&document.file_path);

        let tls_config = document.get_tls_config().map(|tls_map| TlsConfig {
            ca_cert_path: tls_map.get("ca_cert").map(|p| {
                FileUtils::resolve_relative_path(document_path, p)
                    .to_string_lossy()
                    .to_string()
            }),
            client_cert_path: tls_map.get("client_cert").map(|p| {
                FileUtils::resolve_relative_path(document_path, p)
                    .to_string_lossy()
                    .to_string()
            }),
            client_key_path: tls_map.get("client_key").map(|p| {
                FileUtils::resolve_relative_path(document_path, p)
                    .to_string_lossy()
                    .to_string()
            }),
            server_name: tls_map.get("server_name").cloned(),
            insecure_skip_verify: tls_map
                .get("insecure")
                .map(|s| s == "true")
                .unwrap_or(false),
        });

        // Check for Proto config in document
        let proto_config = if let Some(proto_map) = document.get_proto_config() {
            let files = proto_map
                .get("files")
                .map(|s| {
                    s.split(',')
                        .map(|p| {
                            FileUtils::resolve_relative_path(document_path, p.trim())
                                .to_string_lossy()
                                .to_string()
                        })
                        .collect()
                })
                .unwrap_or_default();

            let import_paths = proto_map
                .get("import_paths")
                .map(|s| {
                    s.split(',')
                        .map(|p| {
                            FileUtils::resolve_relative_path(document_path, p.trim())
                                .to_string_lossy()
                                .to_string()
                        })
                        .collect()
                })
                .unwrap_or_default();

            let descriptor = proto_map.get("descriptor").map(|p| {
                FileUtils::resolve_relative_path(document_path, p)
                    .to_string_lossy()
                    .to_string()
            });

            Some(ProtoConfig {
                files,
                import_paths,
                descriptor,
            })
        } else {
            None
        };

        let full_service = Self::full_service_name(&package, &service);

        let client_config = GrpcClientConfig {
            address,
            timeout_seconds: self.timeout_seconds,
            tls_config,
            proto_config,
            metadata: document.get_request_headers(),
            target_service: Some(full_service.clone()),
            compression: CompressionMode::from_env(),
        };

        let mut client = self.connect_with_retry(client_config).await?;

        // Get input/output message types for field coverage tracking
        let input_message_type = client.descriptor_pool()
            .get_service_by_name(&full_service)
            .and_then(|s| s.methods().find(|m| m.name() == method))
            .map(|m| m.input().full_name().to_string());
        let output_message_type = client.descriptor_pool()
            .get_service_by_name(&full_service)
            .and_then(|s| s.methods().find(|m| m.name() == method))
            .map(|m| m.output().full_name().to_string());

        // Coverage: Register pool and record call
        if let Some(collector) = &self.coverage_collector {
            collector.register_pool(client.descriptor_pool());
            collector.record_call(&full_service, &method);
        }

        let start_time = std::time::Instant::now();

        // Iterator for sections
        // We iterate by index to allow lookahead
        let sections = &document.sections;

        // Requests carry no dependency on prior responses, so the full
        // sequence can be materialized upfront. An empty REQUEST section
        // (or no REQUEST section at all) sends no body for that message.
        let mut request_values: Vec<Value> = Vec::new();
        for section in sections.iter() {
            if section.section_type != SectionType::Request {
                continue;
            }
            let request_value = match &section.content {
                SectionContent::Json(req_json) => req_json.clone(),
                SectionContent::Empty => continue,
                _ => continue,
            };

            // Coverage: record request fields
            if let (Some(collector), Some(msg_type)) = (&self.coverage_collector, &input_message_type) {
                collector.record_fields_from_json(msg_type, &request_value);
            }

            tracing::debug!(
                "Sending Request:\n{}",
                serde_json::to_string_pretty(&request_value)
                    .unwrap_or_else(|_| request_value.to_string())
            );

            if self.verbose {
                println!("ðŸ” Sending request: '{}'",
                    serde_json::to_string_pretty(&request_value)
                        .unwrap_or_else(|_| request_value.to_string())
                );
            }

            request_values.push(request_value);
        }

        let mut call_outcome = Some(
            self.call_stream_with_retry(&mut client, &full_service, &method, &request_values)
                .await,
        );
        let mut response_stream = None;

        let mut captured_headers: HashMap<String, String> = HashMap::new();
        let mut captured_trailers: HashMap<String, String> = HashMap::new();
        let mut failure_reasons: Vec<String> = Vec::new();

        let mut skip_next_section = false;

        // Capture full response for update mode
        let mut captured_response = if self.update_mode {
            Some(crate::grpc::GrpcResponse::new())
        } else {
            None
        };

        for (i, section) in sections.iter().enumerate() {
            if skip_next_section {
                skip_next_section = false;
                continue;
            }

            match section.section_type {
                SectionType::Request => {}
                SectionType::Response => {
                    if response_stream.is_none() {
                        if let Some(outcome) = call_outcome.take() {
                            match outcome {
                                Ok((h, stream)) => {
                                    captured_headers = h.clone();
                                    if let Some(resp) = &mut captured_response {
                                        resp.headers = h;
                                    }
                                    response_stream = Some(stream);
                                }
                                Err(e) => {
                                    failure_reasons
                                        .push(format!("Failed to start gRPC stream: {}", e));
                                    break;
                                }
                            }
                        }
                    }

                    let mut received_messages_for_section: Vec<Value> = Vec::new();
                    let expected_values = Self::expected_values_for_response_section(section);

                    for expected_template in expected_values {
                        match response_stream.as_mut().unwrap().next().await {
                            Some(Ok(item)) => {
                                match item {
                                    crate::grpc::client::StreamItem::Message(msg) => {
                                        received_messages_for_section.push(msg.clone());
                                        if let Some(resp) = &mut captured_response {
                                            resp.messages.push(msg.clone());
                                        }

                                        tracing::debug!(
                                            "Received Response:\n{}",
                                            serde_json::to_string_pretty(&msg)
                                                .unwrap_or_else(|_| msg.to_string())
                                        );

                                        if self.no_assert {
                                            println!("--- RESPONSE (Raw) ---");
                                            println!(
                                                "{}",
                                                serde_json::to_string_pretty(&msg)
                                                    .unwrap_or_else(|_| msg.to_string())
                                            );
                                        } else if self.verbose {
                                            println!("ðŸ” gRPC response received: '{}'",
                                                serde_json::to_string_pretty(&msg)
                                                    .unwrap_or_else(|_| msg.to_string())
                                            );
                                        }

                                        if !self.no_assert {
                                            let expected = expected_template.clone();

                                            // Coverage: record expected response fields
                                            if let (Some(collector), Some(msg_type)) = (&self.coverage_collector, &output_message_type) {
                                                collector.record_fields_from_json(msg_type, &expected);
                                            }

                                            let diffs = JsonComparator::compare(
                                                &msg,
                                                &expected,
                                                &section.inline_options,
                                            );

                                            if !diffs.is_empty() {
                                                failure_reasons.push(format!(
                                                    "Response mismatch at line {}:",
                                                    section.start_line
                                                ));
                                                for diff in diffs {
                                                    match diff {
                                                        crate::assert::AssertionResult::Fail {
                                                            message,
                                                            expected,
                                                            actual,
                                                        } => {
                                                            let mut msg = format!("  - {}", message);
                                                            if let (Some(exp), Some(act)) =
                                                                (expected, actual)
                                                            {
                                                                msg.push_str(&format!("\n      Expected: {}\n      Actual:   {}", exp, act));
                                                            }
                                                            failure_reasons.push(msg);
                                                        }
                                                        crate::assert::AssertionResult::Error(m) => {
                                                            failure_reasons
                                                                .push(format!("  - Error: {}", m))
                                                        }
                                                        _ => {}
                                                    }
                                                }
                                                failure_reasons.push(get_json_diff(&expected, &msg));
                                            }
                                        }
                                    }
                                    crate::grpc::client::StreamItem::Trailers(t) => {
                                        captured_trailers.extend(t.clone());
                                        if let Some(resp) = &mut captured_response {
                                            resp.trailers.extend(t);
                                        }
                                        if !self.no_assert {
                                            failure_reasons.push(format!(
                                                "Expected message for RESPONSE section at line {}, but received Trailers (End of Stream)",
                                                section.start_line
                                            ));
                                        }
                                        break;
                                    }
                                }
                            }
                            Some(Err(status)) => {
                                if let Some(resp) = &mut captured_response {
                                    resp.error = Some(status.message().to_string());
                                }
                                if !self.no_assert {
                                    failure_reasons.push(format!(
                                        "Expected message for RESPONSE section at line {}, but received Error: {}",
                                        section.start_line,
                                        status.message()
                                    ));
                                } else {
                                    println!("--- RESPONSE (Error) ---");
                                    println!("{}", status.message());
                                }
                                break;
                            }
                            None => {
                                if !self.no_assert {
                                    failure_reasons.push(format!(
                                        "Expected message for RESPONSE section at line {}, but stream ended",
                                        section.start_line
                                    ));
                                }
                                break;
                            }
                        }
                    }

                    if section.inline_options.with_asserts {
                        if let Some(next_section) = sections.get(i + 1) {
                            if next_section.section_type == SectionType::Asserts {
                                if !self.no_assert {
                                    if let SectionContent::Assertions(lines) = &next_section.content {
                                        for (idx, msg) in received_messages_for_section.iter().enumerate() {
                                            self.run_assertions(
                                                lines,
                                                msg,
                                                &captured_headers,
                                                &captured_trailers,
                                                Some(idx),
                                                Some(start_time.elapsed().as_millis() as u64),
                                                &mut failure_reasons,
                                                format!(
                                                    "(attached to RESPONSE at line {})",
                                                    section.start_line
                                                ),
                                            );
                                        }
                                    }
                                }
                                skip_next_section = true;
                            } else if !self.no_assert {
                                failure_reasons.push(format!(
                                    "RESPONSE at line {} has 'with_asserts' but is not followed by ASSERTS",
                                    section.start_line
                                ));
                            }
                        }
                    }
                }
                SectionType::Asserts => {
                    if response_stream.is_none() {
                        if let Some(outcome) = call_outcome.take() {
                            match outcome {
                                Ok((h, stream)) => {
                                    captured_headers = h.clone();
                                    if let Some(resp) = &mut captured_response {
                                        resp.headers = h;
                                    }
                                    response_stream = Some(stream);
                                }
                                Err(e) => {
                                    failure_reasons
                                        .push(format!("Failed to start gRPC stream: {}", e));
                                    break;
                                }
                            }
                        }
                    }

                    // Standalone Asserts - consumes a new message
                    match response_stream.as_mut().unwrap().next().await {
                        Some(Ok(crate::grpc::client::StreamItem::Message(msg))) => {
                            tracing::debug!(
                                "Received Response (for Asserts):\n{}",
                                serde_json::to_string_pretty(&msg)
                                    .unwrap_or_else(|_| msg.to_string())
                            );

                            if self.no_assert {
                                println!("--- RESPONSE (Raw) ---");
                                println!(
                                    "{}",
                                    serde_json::to_string_pretty(&msg)
                                        .unwrap_or_else(|_| msg.to_string())
                                );
                            }

                            if !self.no_assert {
                                if let SectionContent::Assertions(lines) = &section.content {
                                    self.run_assertions(
                                        lines,
                                        &msg,
                                        &captured_headers,
                                        &captured_trailers,
                                        None,
                                        Some(start_time.elapsed().as_millis() as u64),
                                        &mut failure_reasons,
                                        format!("at line {}", section.start_line),
                                    );
                                }
                            }
                        }
                        Some(Ok(crate::grpc::client::StreamItem::Trailers(t))) => {
                            captured_trailers.extend(t);
                            if !self.no_assert {
                                failure_reasons.push(format!(
                                    "Expected message for ASSERTS section at line {}, but received Trailers",
                                    section.start_line
                                ));
                            }
                        }
                        Some(Err(status)) => {
                            if !self.no_assert {
                                failure_reasons.push(format!(
                                     "Expected message for ASSERTS section at line {}, but received Error: {}",
                                     section.start_line, status.message()
                                 ));
                            } else {
                                println!("--- RESPONSE (Error) ---");
                                println!("{}", status.message());
                            }
                        }
                        None => {
                            if !self.no_assert {
                                failure_reasons.push(format!(
                                    "Expected message for ASSERTS section at line {}, but stream ended",
                                    section.start_line
                                ));
                            }
                        }
                    }
                }

                SectionType::Error => {
                    if response_stream.is_none() {
                        if let Some(outcome) = call_outcome.take() {
                            match outcome {
                                Ok((h, stream)) => {
                                    captured_headers = h.clone();
                                    if let Some(resp) = &mut captured_response {
                                        resp.headers = h;
                                    }
                                    response_stream = Some(stream);
                                }
                                Err(e) => {
                                    // If ERROR section is expected, startup failures from unary/client-streaming
                                    // calls may represent the expected application error.
                                    if !self.no_assert {
                                        if let SectionContent::Json(expected_json) = &section.content {
                                            let expected = expected_json.clone();

                                            // Try to extract tonic Status from anyhow::Error
                                            let got = if let Some(status) = e.downcast_ref::<tonic::Status>() {
                                                let status_name = Self::grpc_code_name_from_numeric(status.code() as i64)
                                                    .unwrap_or("Unknown");
                                                format!("status: {}, message: \"{}\"", status_name, status.message())
                                            } else {
                                                // Fallback to error string representation
                                                e.to_string()
                                            };

                                            if self.verbose {
                                                println!("ðŸ” gRPC error received: '{}'", got);
                                            }

                                            if !Self::error_matches_expected(&got, &expected) {
                                                failure_reasons.push(format!(
                                                    "Error mismatch at line {}: expected {}, got '{}'",
                                                    section.start_line, expected, got
                                                ));
                                            }
                                        }
                                    } else {
                                        println!("--- RESPONSE (Error) ---");
                                        println!("{}", e);
                                    }
                                    // Error has been consumed at startup stage; continue with next sections.
                                    continue;
                                }
                            }
                        }
                    }

                    // Expect an error from the stream
                    match response_stream.as_mut().unwrap().next().await {
                        Some(Err(status)) => {
                            let err_msg = status.message();

                            if self.no_assert {
                                println!("--- RESPONSE (Error) ---");
                                println!("{}", err_msg);
                            } else if self.verbose {
                                println!("ðŸ” gRPC error received: '{}'", err_msg);
                            }

                            if !self.no_assert {
                                if let SectionContent::Json(expected_json) = &section.content {
                                    let expected = expected_json.clone();

                                    if !Self::error_matches_expected(err_msg, &expected) {
                                        failure_reasons.push(format!(
                                            "Error mismatch at line {}: expected {}, got '{}'",
                                            section.start_line, expected, err_msg
                                        ));
                                    }
                                }

                                // Handle with_asserts for Error
                                if section.inline_options.with_asserts {
                                    if let Some(next_section) = sections.get(i + 1) {
                                        if next_section.section_type == SectionType::Asserts {
                                            if let SectionContent::Assertions(lines) =
                                                &next_section.content
                                            {
                                                let error_value =
                                                    Value::String(err_msg.to_string());
                                                self.run_assertions(
                                                    lines,
                                                    &error_value,
                                                    &captured_headers,
                                                    &captured_trailers,
                                                    None,
                                                    Some(start_time.elapsed().as_millis() as u64),
                                                    &mut failure_reasons,
                                                    format!(
                                                        "(attached to ERROR at line {})",
                                                        section.start_line
                                                    ),
                                                );
                                            }
                                            skip_next_section = true;
                                        }
                                    }
                                }
                            } else {
                                // In no_assert mode, we still need to skip the attached ASSERTS section if present
                                if section.inline_options.with_asserts {
                                    if let Some(next_section) = sections.get(i + 1) {
                                        if next_section.section_type == SectionType::Asserts {
                                            skip_next_section = true;
                                        }
                                    }
                                }
                            }
                        }
                        Some(Ok(msg_item)) => {
                            if !self.no_assert {
                                failure_reasons.push(format!(
                                    "Expected ERROR at line {}, but received success message or trailers",
                                    section.start_line
                                ));
                            } else {
                                // If we got a message instead of error in no_assert mode, print it
                                if let crate::grpc::client::StreamItem::Message(msg) = msg_item {
                                    println!("--- RESPONSE (Raw) ---");
                                    println!(
                                        "{}",
                                        serde_json::to_string_pretty(&msg)
                                            .unwrap_or_else(|_| msg.to_string())
                                    );
                                }
                            }
                        }
                        None => {
                            if !self.no_assert {
                                failure_reasons.push(format!(
                                    "Expected ERROR at line {}, but stream ended successfully",
                                    section.start_line
                                ));
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        // If in update mode, capture any remaining responses
        if let Some(resp) = &mut captured_response {
            if response_stream.is_none() {
                if let Some(outcome) = call_outcome.take() {
                    match outcome {
                        Ok((h, stream)) => {
                            resp.headers = h;
                            response_stream = Some(stream);
                        }
                        Err(_) => {
                            response_stream = None;
                        }
                    }
                }
            }

            loop {
                let next_item = if let Some(stream) = response_stream.as_mut() {
                    stream.next().await
                } else {
                    None
                };

                let Some(item_res) = next_item else {
                    break;
                };

                match item_res {
                    Ok(crate::grpc::client::StreamItem::Message(msg)) => {
                        resp.messages.push(msg);
                    }
                    Ok(crate::grpc::client::StreamItem::Trailers(t)) => {
                        resp.trailers.extend(t);
                    }
                    Err(status) => {
                        resp.error = Some(status.message().to_string());
                    }
                }
            }
        }

        let grpc_duration = start_time.elapsed().as_millis() as u64;
        if let Some(resp) = &mut captured_response {
            resp.latency_ms = Some(grpc_duration);
        }

        if !failure_reasons.is_empty() {
            // Even if failed, we might want to return captured response?
            // Usually snapshot update only happens if user asks for it.
            // If update_mode is true, we should probably ignore failures?
            if self.update_mode {
                // In update mode, failures (mismatches) are expected because we are updating!
                // But validation errors (like invalid JSON) might still be relevant.
                // Let's assume update mode implies "I want to overwrite whatever happens".
                if let Some(resp) = captured_response {
                    return Ok(TestExecutionResult::pass(Some(grpc_duration)).with_response(resp));
                }
            }

            return Ok(TestExecutionResult::fail(
                format!("Validation failed:\n  - {}", failure_reasons.join("\n  - ")),
                Some(grpc_duration),
            ));
        }

        let mut result = TestExecutionResult::pass(Some(grpc_duration));
        if let Some(resp) = captured_response {
            result = result.with_response(resp);
        }
        Ok(result)
    }

    /// Validates a collected response against the document (for testing purposes)
    pub fn validate_response(
        &self,
        document: &GctfDocument,
        response: &crate::grpc::GrpcResponse,
        _timeout_ms: u64,
    ) -> TestExecutionResult {
        let mut failure_reasons: Vec<String> = Vec::new();

        let mut message_iter = response.messages.iter();
        let sections = &document.sections;
        let mut skip_next_section = false;

        for (i, section) in sections.iter().enumerate() {
            if skip_next_section {
                skip_next_section = false;
                continue;
            }

            match section.section_type {
                SectionType::Response => {
                    let expected_values = Self::expected_values_for_response_section(section);
                    let mut received_messages_for_section: Vec<Value> = Vec::new();

                    for expected_template in expected_values {
                        if let Some(msg) = message_iter.next() {
                            received_messages_for_section.push(msg.clone());

                            if !self.no_assert {
                                let expected = expected_template.clone();

                                let diffs = JsonComparator::compare(
                                    msg,
                                    &expected,
                                    &section.inline_options,
                                );

                                if !diffs.is_empty() {
                                    failure_reasons.push(format!(
                                        "Response mismatch at line {}:",
                                        section.start_line
                                    ));
                                    for diff in diffs {
                                        match diff {
                                            crate::assert::AssertionResult::Fail {
                                                message,
                                                expected,
                                                actual,
                                            } => {
                                                let mut msg = format!("  - {}", message);
                                                if let (Some(exp), Some(act)) = (expected, actual) {
                                                    msg.push_str(&format!(
                                                        "\n      Expected: {}\n      Actual:   {}",
                                                        exp, act
                                                    ));
                                                }
                                                failure_reasons.push(msg);
                                            }
                                            crate::assert::AssertionResult::Error(m) => {
                                                failure_reasons.push(format!("  - Error: {}", m))
                                            }
                                            _ => {}
                                        }
                                    }

                                    failure_reasons.push(get_json_diff(&expected, msg));
                                }
                            }
                        } else if !self.no_assert {
                            failure_reasons.push(format!(
                                "Expected message for RESPONSE section at line {}, but no more messages received",
                                section.start_line
                            ));
                            break;
                        }
                    }

                    if section.inline_options.with_asserts {
                        if let Some(next_section) = sections.get(i + 1) {
                            if next_section.section_type == SectionType::Asserts {
                                if !self.no_assert {
                                    if let SectionContent::Assertions(lines) =
                                        &next_section.content
                                    {
                                        for (idx, msg) in received_messages_for_section.iter().enumerate() {
                                            self.run_assertions(
                                                lines,
                                                msg,
                                                &response.headers,
                                                &response.trailers,
                                                Some(idx),
                                                response.latency_ms,
                                                &mut failure_reasons,
                                                format!(
                                                    "(attached to RESPONSE at line {})",
                                                    section.start_line
                                                ),
                                            );
                                        }
                                    }
                                }
                                skip_next_section = true;
                            }
                        }
                    }
                }
                SectionType::Asserts => {
                    // Standalone Asserts - consumes a new message
                    if let Some(msg) = message_iter.next() {
                        if !self.no_assert {
                            if let SectionContent::Assertions(lines) = &section.content {
                                self.run_assertions(
                                    lines,
                                    msg,
                                    &response.headers,
                                    &response.trailers,
                                    None,
                                    response.latency_ms,
                                    &mut failure_reasons,
                                    format!("at line {}", section.start_line),
                                );
                            }
                        }
                    } else if !self.no_assert {
                        failure_reasons.push(format!(
                            "Expected message for ASSERTS section at line {}, but no more messages received",
                            section.start_line
                        ));
                    }
                }
                _ => {}
            }
        }

        if !failure_reasons.is_empty() {
            TestExecutionResult::fail(
                format!("Validation failed:\n  - {}", failure_reasons.join("\n  - ")),
                None,
            )
        } else {
            TestExecutionResult::pass(None)
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn run_assertions(
        &self,
        lines: &[String],
        target_value: &Value,
        headers: &HashMap<String, String>,
        trailers: &HashMap<String, String>,
        message_index: Option<usize>,
        latency_ms: Option<u64>,
        failure_reasons: &mut Vec<String>,
        context: String,
    ) {
        let results = self.assertion_engine.evaluate_all_indexed(
            lines,
            target_value,
            Some(headers),
            Some(trailers),
            message_index,
            latency_ms,
        );

        if self.assertion_engine.has_failures(&results) {
            for fail in self.assertion_engine.get_failures(&results) {
                match fail {
                    crate::assert::AssertionResult::Fail {
                        message,
                        expected,
                        actual,
                    } => {
                        failure_reasons.push(format!("Assertion failed {}: {}", context, message));
                        if let (Some(exp), Some(act)) = (expected, actual) {
                            failure_reasons
                                .push(format!("    Expected: {}\n    Actual:   {}", exp, act));
                        }
                    }
                    crate::assert::AssertionResult::Error(msg) => {
                        failure_reasons.push(format!("Assertion error {}: {}", context, msg));
                    }
                    _ => {}
                }
            }
        }
    }

    /// Print dry-run preview of test execution
    fn print_dry_run_preview(
        &self,
        document: &GctfDocument,
        address: &str,
        package: &str,
        service: &str,
        method: &str,
    ) {
        println!();
        println!("ðŸ” Dry-Run Preview: {}", document.file_path);
        println!("â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•");
        println!();
        println!("ðŸ“ Target:");
        println!("   Address: {}", address);
        let full_service = Self::full_service_name(package, service);
        println!("   Endpoint: {} / {}", full_service, method);
        println!();

        // Display headers first
        let mut has_headers = false;
        for section in &document.sections {
            if section.section_type == SectionType::RequestHeaders {
                if !has_headers {
                    println!();
                    println!("ðŸ“‹ Request Headers:");
                    has_headers = true;
                }
                if let SectionContent::KeyValues(headers) = &section.content {
                    for (key, value) in headers {
                        println!("   {}: {}", key, value);
                    }
                }
            }
        }

        // Group requests and responses to show flow
        let mut has_request = false;
        let mut has_asserts = false;
        let mut has_error = false;

        for section in &document.sections {
            match section.section_type {
                SectionType::Address => {}
                SectionType::Endpoint => {}
                SectionType::RequestHeaders => {}
                SectionType::Options => {}
                SectionType::Tls => {}
                SectionType::Proto => {}
                SectionType::Request => {
                    if !has_request {
                        println!();
                        println!("ðŸ“¤ Request/Response Flow:");
                        has_request = true;
                    }
                    if let SectionContent::Json(json) = &section.content {
                        let json_str =
                            serde_json::to_string_pretty(json).unwrap_or_else(|_| json.to_string());
                        println!("   âž¤ REQUEST:");
                        println!("     {}", json_str.replace('\n', "\n     "));
                    }
                }
                SectionType::Response => {
                    let with_asserts = if section.inline_options.with_asserts {
                        " (with_asserts)"
                    } else {
                        ""
                    };
                    match &section.content {
                        SectionContent::Json(json) => {
                            let json_str = serde_json::to_string_pretty(json)
                                .unwrap_or_else(|_| json.to_string());
                            println!(
                                "   â†¤ RESPONSE (Line {}):{}",
                                section.start_line, with_asserts
                            );
                            println!("     {}", json_str.replace('\n', "\n     "));
                        }
                        SectionContent::JsonLines(values) => {
                            println!(
                                "   â†¤ RESPONSE (Line {}, {} messages):{}",
                                section.start_line,
                                values.len(),
                                with_asserts
                            );
                            for value in values {
                                let json_str = serde_json::to_string_pretty(value)
                                    .unwrap_or_else(|_| value.to_string());
                                println!("     {}", json_str.replace('\n', "\n     "));
                            }
                        }
                        _ => {}
                    }
                }
                SectionType::Asserts => {
                    if !has_asserts {
                        println!();
                        println!("âœ“ Assertions:");
                        has_asserts = true;
                    }
                    if let SectionContent::Assertions(lines) = &section.content {
                        for line in lines {
                            println!("   . {}", line);
                        }
                    }
                }
                SectionType::Error => {
                    if !has_error {
                        println!();
                        println!("âŒ Expected Error:");
                        has_error = true;
                    }
                    if let SectionContent::Json(json) = &section.content {
                        let json_str =
                            serde_json::to_string_pretty(json).unwrap_or_else(|_| json.to_string());
                        println!("   {}", json_str);
                    }
                }
            }
        }

        // Show TLS config if present
        if let Some(tls_config) = document.get_tls_config() {
            println!();
            println!("ðŸ”’ TLS Configuration:");
            if tls_config.contains_key("ca_cert") {
                println!("   CA Cert: {}", tls_config.get("ca_cert").unwrap());
            }
            if tls_config.contains_key("cert") {
                println!("   Client Cert: {}", tls_config.get("cert").unwrap());
            }
            if tls_config.contains_key("key") {
                println!("   Client Key: {}", tls_config.get("key").unwrap());
            }
            if tls_config.get("insecure") == Some(&"true".to_string()) {
                println!("   Insecure Skip Verify: true");
            }
        }

        // Show PROTO config if present
        if let Some(proto_config) = document.get_proto_config() {
            println!();
            println!("ðŸ“„ Proto Configuration:");
            if proto_config.contains_key("descriptor") {
                println!("   Descriptor: {}", proto_config.get("descriptor").unwrap());
            }
            if proto_config.contains_key("files") {
                println!("   Proto Files: {}", proto_config.get("files").unwrap());
            }
        }

        println!();
        println!("â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•â•");
        println!();
    }
}
