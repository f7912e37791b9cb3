//! Default response synthesis.
//!
//! Builds a schema-conforming placeholder instance without running the
//! computation it stands in for. Field-name overrides win over the
//! type-directed fallback at every nesting level.

use std::collections::BTreeMap;

use serde_json::{Map, Value, json};

use crate::error::{Result, ShimError, SynthesisError};
use crate::schema::{FieldType, Instance, ResponseModel, Schema};

/// Text default for every string field without an override.
pub const PLACEHOLDER_TEXT: &str = "Error in analysis, using default";

/// Field-name keyed defaults that take precedence over type defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefaultOverrides {
    values: BTreeMap<String, Value>,
}

impl DefaultOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Neutral stances for trading-agent responses.
    pub fn trading() -> Self {
        Self::new()
            .with("signal", "neutral")
            .with("action", "hold")
            .with("decisions", json!({}))
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Merge `other` on top of `self`; entries in `other` win.
    pub fn extend(&mut self, other: DefaultOverrides) {
        self.values.extend(other.values);
    }

    /// Parse `name=value` pairs. Values that parse as JSON are kept as JSON,
    /// anything else is taken as a plain string.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overrides = Self::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (name, raw) = pair.split_once('=').ok_or_else(|| ShimError::InvalidParams {
                message: format!("override '{}' is not in name=value form", pair),
            })?;
            let name = name.trim();
            if name.is_empty() {
                return Err(ShimError::InvalidParams {
                    message: format!("override '{}' has an empty field name", pair),
                });
            }
            let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
            overrides.insert(name, value);
        }
        Ok(overrides)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

/// Build a default instance for `schema`.
///
/// Fails with `UnsatisfiableDefault` for an empty enumerated literal and with
/// `InstantiationRejected` when a chosen default violates a field constraint.
pub fn synthesize(
    schema: &Schema,
    overrides: &DefaultOverrides,
) -> std::result::Result<Instance, SynthesisError> {
    warn_unused_overrides(schema, overrides);
    let instance = synthesize_object(schema, overrides)?;
    tracing::debug!(
        schema = %schema.name,
        fields = instance.len(),
        "synthesized default instance"
    );
    Ok(instance)
}

/// Build a default instance and deserialize it into `T`.
pub fn synthesize_model<T: ResponseModel>(
    overrides: &DefaultOverrides,
) -> std::result::Result<T, SynthesisError> {
    let schema = T::schema();
    let instance = synthesize(&schema, overrides)?;
    instantiate(&schema.name, Value::Object(instance))
}

/// Deserialize an assembled instance into its concrete type.
pub fn instantiate<T: serde::de::DeserializeOwned>(
    schema_name: &str,
    value: Value,
) -> std::result::Result<T, SynthesisError> {
    serde_json::from_value(value).map_err(|e| SynthesisError::InstantiationRejected {
        schema: schema_name.to_string(),
        reason: e.to_string(),
    })
}

fn synthesize_object(
    schema: &Schema,
    overrides: &DefaultOverrides,
) -> std::result::Result<Instance, SynthesisError> {
    let mut instance = Map::with_capacity(schema.fields.len());
    for field in &schema.fields {
        let value = match overrides.get(&field.name) {
            Some(value) => value.clone(),
            None => type_default(&field.name, &field.ty, overrides)?,
        };
        field
            .constraints
            .check(&value)
            .map_err(|reason| SynthesisError::InstantiationRejected {
                schema: schema.name.clone(),
                reason: format!("field '{}': {}", field.name, reason),
            })?;
        instance.insert(field.name.clone(), value);
    }
    Ok(instance)
}

fn type_default(
    name: &str,
    ty: &FieldType,
    overrides: &DefaultOverrides,
) -> std::result::Result<Value, SynthesisError> {
    let value = match ty {
        FieldType::Text => Value::String(PLACEHOLDER_TEXT.to_string()),
        FieldType::Float => json!(0.0),
        FieldType::Int => json!(0),
        FieldType::Bool => Value::Bool(false),
        FieldType::Sequence => Value::Array(Vec::new()),
        FieldType::Mapping => Value::Object(Map::new()),
        FieldType::EnumLiteral { values } => values.first().cloned().ok_or_else(|| {
            SynthesisError::UnsatisfiableDefault {
                field: name.to_string(),
            }
        })?,
        FieldType::Nested { schema } => Value::Object(synthesize_object(schema, overrides)?),
        FieldType::Unknown => Value::Null,
    };
    Ok(value)
}

fn warn_unused_overrides(schema: &Schema, overrides: &DefaultOverrides) {
    if overrides.is_empty() {
        return;
    }
    let known = schema.field_names();
    for name in overrides.names() {
        if known.contains(&name) {
            continue;
        }
        let suggestion = known
            .iter()
            .map(|candidate| (strsim::levenshtein(name, candidate), *candidate))
            .min()
            .filter(|(distance, _)| *distance <= 3)
            .map(|(_, candidate)| candidate);
        match suggestion {
            Some(candidate) => tracing::warn!(
                schema = %schema.name,
                "override '{}' matches no field; did you mean '{}'?",
                name,
                candidate
            ),
            None => tracing::warn!(
                schema = %schema.name,
                "override '{}' matches no field",
                name
            ),
        }
    }
}
