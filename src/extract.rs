//! Plan Extraction
//!
//! Turns an AI model's free-form response text into a structured [`Plan`].
//! Models emit the plan envelope either as a bare JSON document or wrapped in
//! a fenced markdown block, so parsing runs in passes: bare document first,
//! then fenced blocks, then a brace-balanced scan for an embedded object.
//!
//! Extraction is a pure function over its input; failures are classified
//! [`ExtractionFailure`] values inside the returned result, never errors.

use serde_json::Value;

use plan_forge_core::{ExtractionFailure, ExtractionResult, Plan, Step};

/// Extract a plan from raw model response text.
///
/// On success the result carries the plan and its step count; on failure it
/// carries a classified reason (`not-parseable`, `missing-plan`, or
/// `invalid-step:<field>`). The raw response is retained in the metadata for
/// audit either way.
pub fn extract_plan(raw: &str) -> ExtractionResult {
    match parse_envelope(raw) {
        Ok(plan) => ExtractionResult::ok(plan, raw),
        Err(reason) => ExtractionResult::failed(&reason, raw),
    }
}

fn parse_envelope(raw: &str) -> Result<Plan, ExtractionFailure> {
    let document = parse_document(raw).ok_or(ExtractionFailure::NotParseable)?;

    let elements = document
        .get("plan")
        .and_then(Value::as_array)
        .ok_or(ExtractionFailure::MissingPlan)?;

    let mut steps = Vec::with_capacity(elements.len());
    for (position, element) in elements.iter().enumerate() {
        steps.push(parse_step(position, element)?);
    }
    Ok(Plan::new(steps))
}

/// Locate and parse the JSON document inside the response text.
///
/// Pass 1: the whole trimmed text as a JSON object.
/// Pass 2: fenced ``` blocks (with or without a language tag).
/// Pass 3: brace-balanced scan from the first `{`.
fn parse_document(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if value.is_object() {
            return Some(value);
        }
    }

    for block in fenced_blocks(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(block.trim()) {
            if value.is_object() {
                return Some(value);
            }
        }
    }

    balanced_object(trimmed)
        .and_then(|candidate| serde_json::from_str::<Value>(candidate).ok())
        .filter(Value::is_object)
}

/// Contents of every ``` fenced block, language tag stripped.
fn fenced_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut remaining = text;

    while let Some(start) = remaining.find("```") {
        let after_fence = &remaining[start + 3..];
        // Skip the language tag up to the end of the fence line
        let content_start = after_fence.find('\n').map(|p| p + 1).unwrap_or(0);
        let content = &after_fence[content_start..];

        match content.find("```") {
            Some(end) => {
                blocks.push(&content[..end]);
                remaining = &content[end + 3..];
            }
            None => break,
        }
    }

    blocks
}

/// The first brace-balanced `{...}` span in the text, if any.
///
/// Counts braces outside JSON string literals so embedded prose around the
/// envelope does not defeat parsing.
fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match byte {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

fn parse_step(position: usize, element: &Value) -> Result<Step, ExtractionFailure> {
    let map = element
        .as_object()
        .ok_or(ExtractionFailure::InvalidStep {
            position,
            field: "object",
        })?;

    let index = map
        .get("step")
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or(ExtractionFailure::InvalidStep {
            position,
            field: "step",
        })?;

    let description = map
        .get("description")
        .and_then(Value::as_str)
        .ok_or(ExtractionFailure::InvalidStep {
            position,
            field: "description",
        })?
        .to_string();

    let operation = map
        .get("operation")
        .and_then(Value::as_str)
        .ok_or(ExtractionFailure::InvalidStep {
            position,
            field: "operation",
        })?
        .to_string();

    let parameters = map
        .get("parameters")
        .filter(|v| v.is_object())
        .cloned()
        .ok_or(ExtractionFailure::InvalidStep {
            position,
            field: "parameters",
        })?;

    let depends_on = match map.get("dependsOn") {
        None | Some(Value::Null) => Vec::new(),
        Some(value) => value
            .as_array()
            .map(|deps| {
                deps.iter()
                    .map(|d| {
                        d.as_u64()
                            .and_then(|v| u32::try_from(v).ok())
                            .ok_or(ExtractionFailure::InvalidStep {
                                position,
                                field: "dependsOn",
                            })
                    })
                    .collect::<Result<Vec<u32>, _>>()
            })
            .ok_or(ExtractionFailure::InvalidStep {
                position,
                field: "dependsOn",
            })??,
    };

    Ok(Step {
        index,
        description,
        operation,
        parameters,
        depends_on,
    })
}
