//! Config-driven data collection handlers.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use oluso_journey::{EngineResult, StepContext, StepHandler, StepHandlerResult};

/// A field in a dynamic form schema. Accepts either a bare string (a
/// required field of that name) or the full object form.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum FieldSpec {
    Name(String),
    Full {
        name: String,
        #[serde(default)]
        label: Option<String>,
        #[serde(default = "default_required")]
        required: bool,
    },
}

const fn default_required() -> bool {
    true
}

impl FieldSpec {
    fn name(&self) -> &str {
        match self {
            Self::Name(name) | Self::Full { name, .. } => name,
        }
    }

    fn required(&self) -> bool {
        match self {
            Self::Name(_) => true,
            Self::Full { required, .. } => *required,
        }
    }

    fn render(&self) -> Value {
        match self {
            Self::Name(name) => json!({ "name": name, "required": true }),
            Self::Full {
                name,
                label,
                required,
            } => json!({ "name": name, "label": label, "required": required }),
        }
    }
}

fn parse_fields(ctx: &StepContext) -> Option<Vec<FieldSpec>> {
    let raw = ctx.config_value("fields")?.clone();
    serde_json::from_value(raw).ok()
}

fn collect(
    ctx: &StepContext,
    fields: &[FieldSpec],
) -> Result<HashMap<String, Value>, Vec<String>> {
    let mut missing = Vec::new();
    let mut collected = HashMap::new();
    for field in fields {
        match ctx.value(field.name()) {
            Some(value) if !value.is_empty() => {
                collected.insert(field.name().to_string(), Value::String(value.to_string()));
            }
            _ if field.required() => missing.push(field.name().to_string()),
            _ => {}
        }
    }
    if missing.is_empty() {
        Ok(collected)
    } else {
        Err(missing)
    }
}

/// Renders a config-supplied field schema and copies the submitted values
/// into claims under their field names.
pub struct DynamicFormHandler;

#[async_trait]
impl StepHandler for DynamicFormHandler {
    fn step_type(&self) -> &'static str {
        "dynamic-form"
    }

    async fn execute(&self, ctx: &mut StepContext) -> EngineResult<StepHandlerResult> {
        let Some(fields) = parse_fields(ctx) else {
            return Ok(StepHandlerResult::fail(
                "step_misconfigured",
                "the form has no field schema",
            ));
        };
        let rendered: Vec<Value> = fields.iter().map(FieldSpec::render).collect();

        if !ctx.has_input() {
            return Ok(StepHandlerResult::show_ui(
                "dynamic_form",
                json!({ "fields": rendered }),
            ));
        }
        match collect(ctx, &fields) {
            Ok(claims) => Ok(StepHandlerResult::success_with(claims)),
            Err(missing) => Ok(StepHandlerResult::show_ui(
                "dynamic_form",
                json!({ "fields": rendered, "error": "missing_fields", "missing": missing }),
            )),
        }
    }
}

/// Like `dynamic-form`, but the emitted claim names are mapped through the
/// `claims` configuration (claim name to form field name).
pub struct ClaimsCollectionHandler;

#[async_trait]
impl StepHandler for ClaimsCollectionHandler {
    fn step_type(&self) -> &'static str {
        "claims-collection"
    }

    async fn execute(&self, ctx: &mut StepContext) -> EngineResult<StepHandlerResult> {
        let Some(mappings) = ctx.config_value("claims").and_then(Value::as_object).cloned()
        else {
            return Ok(StepHandlerResult::fail(
                "step_misconfigured",
                "no claim mappings configured",
            ));
        };
        let fields: Vec<&str> = mappings.values().filter_map(Value::as_str).collect();

        if !ctx.has_input() {
            return Ok(StepHandlerResult::show_ui(
                "claims_collection",
                json!({ "fields": fields }),
            ));
        }

        let mut claims = HashMap::new();
        let mut missing = Vec::new();
        for (claim, field) in &mappings {
            let Some(field) = field.as_str() else {
                continue;
            };
            match ctx.value(field) {
                Some(value) if !value.is_empty() => {
                    claims.insert(claim.clone(), Value::String(value.to_string()));
                }
                _ => missing.push(field.to_string()),
            }
        }
        if missing.is_empty() {
            Ok(StepHandlerResult::success_with(claims))
        } else {
            Ok(StepHandlerResult::show_ui(
                "claims_collection",
                json!({ "fields": fields, "error": "missing_fields", "missing": missing }),
            ))
        }
    }
}
