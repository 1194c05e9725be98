// Response Handler - handles response validation and processing

use crate::assert::{AssertionEngine, JsonComparator};
use crate::execution::runner::{TestExecutionResult, TestExecutionStatus};
use crate::grpc::GrpcResponse;
use crate::parser::GctfDocument;
use crate::parser::ast::{InlineOptions, Section, SectionContent, SectionType};
use serde_json::Value;

/// Response validation result
#[derive(Debug, Clone)]
pub struct ResponseValidationResult {
    pub status: TestExecutionStatus,
    pub failure_reasons: Vec<String>,
}

/// Response Handler - validates responses against expected values
pub struct ResponseHandler {
    no_assert: bool,
    assertion_engine: AssertionEngine,
}

impl ResponseHandler {
    /// Create new response handler
    pub fn new(no_assert: bool) -> Self {
        Self {
            no_assert,
            assertion_engine: AssertionEngine::new(),
        }
    }

    /// Validate a single response message against expected value
    pub fn validate_message(
        &self,
        actual: &Value,
        expected: &Value,
        options: &InlineOptions,
    ) -> Result<(), String> {
        if self.no_assert {
            return Ok(());
        }

        let expected_clone = expected.clone();

        let diffs = JsonComparator::compare(actual, &expected_clone, options);

        if !diffs.is_empty() {
            let mut messages = Vec::new();
            for diff in diffs {
                match diff {
                    crate::assert::AssertionResult::Fail {
                        message,
                        expected: exp,
                        actual: act,
                    } => {
                        let mut msg = format!("  - {}", message);
                        if let (Some(e), Some(a)) = (exp, act) {
                            msg.push_str(&format!(
                                "\n      Expected: {}\n      Actual:   {}",
                                e, a
                            ));
                        }
                        messages.push(msg);
                    }
                    crate::assert::AssertionResult::Error(m) => {
                        messages.push(format!("  - Error: {}", m))
                    }
                    _ => {}
                }
            }
            return Err(messages.join("\n"));
        }

        Ok(())
    }

    /// Validate response with assertions attached
    pub fn validate_with_asserts(
        &self,
        response: &GrpcResponse,
        sections: &[Section],
        response_index: usize,
    ) -> ResponseValidationResult {
        let mut failure_reasons = Vec::new();

        // Find the response section
        let mut section_count = 0;
        for (i, section) in sections.iter().enumerate() {
            if section.section_type == SectionType::Response {
                if section_count == response_index {
                    // This is our response section
                    let expected_values = Self::expected_values_for_section(section);

                    // Validate each expected value against received messages
                    for (msg_idx, msg) in response.messages.iter().enumerate() {
                        if msg_idx < expected_values.len()
                            && let Err(err) = self.validate_message(
                                msg,
                                &expected_values[msg_idx],
                                &section.inline_options,
                            )
                        {
                            failure_reasons.push(format!(
                                "Response mismatch at line {}: {}",
                                section.start_line, err
                            ));
                        }
                    }

                    // Check for with_asserts option
                    if section.inline_options.with_asserts
                        && let Some(next_section) = sections.get(i + 1)
                        && next_section.section_type == SectionType::Asserts
                        && let SectionContent::Assertions(lines) = &next_section.content
                    {
                        for msg in &response.messages {
                            for assertion in lines {
                                let assert_result = self.assertion_engine.evaluate_with_latency(
                                    assertion,
                                    msg,
                                    Some(&response.headers),
                                    Some(&response.trailers),
                                    response.latency_ms,
                                );
                                if let Err(err) = assert_result {
                                    failure_reasons.push(format!(
                                        "Assertion failed at line {}: {}",
                                        next_section.start_line, err
                                    ));
                                }
                            }
                        }
                    }
                    break;
                }
                section_count += 1;
            }
        }

        ResponseValidationResult {
            status: if failure_reasons.is_empty() {
                TestExecutionStatus::Pass
            } else {
                TestExecutionStatus::Fail(failure_reasons.join("\n"))
            },
            failure_reasons,
        }
    }

    /// Get expected values for a response section
    fn expected_values_for_section(section: &Section) -> Vec<Value> {
        match &section.content {
            SectionContent::Json(value) => vec![value.clone()],
            SectionContent::JsonLines(values) => values.clone(),
            _ => Vec::new(),
        }
    }

    /// Validate a full document against a response (for testing purposes)
    pub fn validate_document(
        &self,
        document: &GctfDocument,
        response: &GrpcResponse,
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
                    let expected_values = Self::expected_values_for_section(section);
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
                                                expected: exp,
                                                actual: act,
                                            } => {
                                                let mut msg = format!("  - {}", message);
                                                if let (Some(exp), Some(act)) = (exp, act) {
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

                                    failure_reasons
                                        .push(crate::assert::get_json_diff(&expected, msg));
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

                    if section.inline_options.with_asserts
                        && let Some(next_section) = sections.get(i + 1)
                        && next_section.section_type == SectionType::Asserts
                        && !self.no_assert
                        && let SectionContent::Assertions(lines) = &next_section.content
                    {
                        for (msg_idx, msg) in received_messages_for_section.iter().enumerate() {
                            let result = self.assertion_engine.evaluate_all_indexed(
                                lines,
                                msg,
                                Some(&response.headers),
                                Some(&response.trailers),
                                Some(msg_idx),
                                response.latency_ms,
                            );

                            if self.assertion_engine.has_failures(&result) {
                                for fail in self.assertion_engine.get_failures(&result) {
                                    match fail {
                                        crate::assert::AssertionResult::Fail {
                                            message,
                                            expected,
                                            actual,
                                        } => {
                                            let ctx = format!(
                                                "(attached to RESPONSE at line {})",
                                                section.start_line
                                            );
                                            failure_reasons.push(format!(
                                                "Assertion failed {}: {}",
                                                ctx, message
                                            ));
                                            if let (Some(exp), Some(act)) = (expected, actual) {
                                                failure_reasons.push(format!(
                                                    "    Expected: {}\n    Actual:   {}",
                                                    exp, act
                                                ));
                                            }
                                        }
                                        crate::assert::AssertionResult::Error(m) => {
                                            let ctx = format!(
                                                "(attached to RESPONSE at line {})",
                                                section.start_line
                                            );
                                            failure_reasons
                                                .push(format!("Assertion error {}: {}", ctx, m));
                                        }
                                        _ => {}
                                    }
                                }
                            }
                        }
                        skip_next_section = true;
                    }
                }
                SectionType::Asserts => {
                    if let Some(msg) = message_iter.next() {
                        if !self.no_assert
                            && let SectionContent::Assertions(lines) = &section.content
                        {
                            let result = self.assertion_engine.evaluate_all_indexed(
                                lines,
                                msg,
                                Some(&response.headers),
                                Some(&response.trailers),
                                None,
                                response.latency_ms,
                            );

                            if self.assertion_engine.has_failures(&result) {
                                for fail in self.assertion_engine.get_failures(&result) {
                                    match fail {
                                        crate::assert::AssertionResult::Fail {
                                            message,
                                            expected,
                                            actual,
                                        } => {
                                            let ctx = format!("at line {}", section.start_line);
                                            failure_reasons.push(format!(
                                                "Assertion failed {}: {}",
                                                ctx, message
                                            ));
                                            if let (Some(exp), Some(act)) = (expected, actual) {
                                                failure_reasons.push(format!(
                                                    "    Expected: {}\n    Actual:   {}",
                                                    exp, act
                                                ));
                                            }
                                        }
                                        crate::assert::AssertionResult::Error(m) => {
                                            let ctx = format!("at line {}", section.start_line);
                                            failure_reasons
                                                .push(format!("Assertion error {}: {}", ctx, m));
                                        }
                                        _ => {}
                                    }
                                }
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
}
