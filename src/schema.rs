//! Typed schema descriptor for structured LLM responses.
//!
//! A [`Schema`] is an ordered list of named fields, each tagged with a
//! [`FieldType`]. Descriptors are either built in code, deserialized from
//! their own JSON form, or converted from a JSON Schema document.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, ShimError};

/// Declared semantic type of a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Float,
    Int,
    Bool,
    Sequence,
    Mapping,
    /// Closed set of allowed values, in declaration order.
    EnumLiteral { values: Vec<Value> },
    Nested { schema: Schema },
    /// Anything the descriptor does not recognize (type unions, `null`, no type).
    Unknown,
}

/// Structural constraints enforced when an instance is built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
}

impl Constraints {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Check a candidate value. Returns the violated rule as text.
    pub fn check(&self, value: &Value) -> std::result::Result<(), String> {
        if let Some(n) = value.as_f64() {
            if let Some(min) = self.minimum
                && n < min
            {
                return Err(format!("{} is below minimum {}", n, min));
            }
            if let Some(max) = self.maximum
                && n > max
            {
                return Err(format!("{} is above maximum {}", n, max));
            }
        }
        if let (Some(min_len), Some(s)) = (self.min_length, value.as_str())
            && s.chars().count() < min_len
        {
            return Err(format!(
                "text of length {} is shorter than {}",
                s.chars().count(),
                min_len
            ));
        }
        if let (Some(min_items), Some(items)) = (self.min_items, value.as_array())
            && items.len() < min_items
        {
            return Err(format!(
                "sequence of {} items is shorter than {}",
                items.len(),
                min_items
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(flatten)]
    pub ty: FieldType,
    #[serde(default, skip_serializing_if = "Constraints::is_empty")]
    pub constraints: Constraints,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            constraints: Constraints::default(),
        }
    }

    pub fn with_minimum(mut self, minimum: f64) -> Self {
        self.constraints.minimum = Some(minimum);
        self
    }

    pub fn with_maximum(mut self, maximum: f64) -> Self {
        self.constraints.maximum = Some(maximum);
        self
    }

    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.constraints.min_length = Some(min_length);
        self
    }

    pub fn with_min_items(mut self, min_items: usize) -> Self {
        self.constraints.min_items = Some(min_items);
        self
    }
}

/// Named, ordered field set describing one response shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn text(self, name: impl Into<String>) -> Self {
        self.field(Field::new(name, FieldType::Text))
    }

    pub fn float(self, name: impl Into<String>) -> Self {
        self.field(Field::new(name, FieldType::Float))
    }

    pub fn int(self, name: impl Into<String>) -> Self {
        self.field(Field::new(name, FieldType::Int))
    }

    pub fn bool(self, name: impl Into<String>) -> Self {
        self.field(Field::new(name, FieldType::Bool))
    }

    pub fn sequence(self, name: impl Into<String>) -> Self {
        self.field(Field::new(name, FieldType::Sequence))
    }

    pub fn mapping(self, name: impl Into<String>) -> Self {
        self.field(Field::new(name, FieldType::Mapping))
    }

    pub fn enum_literal<I, V>(self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.field(Field::new(name, FieldType::EnumLiteral { values }))
    }

    pub fn nested(self, name: impl Into<String>, schema: Schema) -> Self {
        self.field(Field::new(name, FieldType::Nested { schema }))
    }

    /// Every field name at every nesting level, depth-first.
    pub fn field_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        for field in &self.fields {
            out.push(field.name.as_str());
            if let FieldType::Nested { schema } = &field.ty {
                schema.collect_names(out);
            }
        }
    }

    /// Convert a JSON Schema object document into a descriptor.
    ///
    /// Property order is preserved. Nested objects with `properties` become
    /// nested schemas named after their `title`, or the property name. Local
    /// `$ref`s into `$defs`/`definitions` are resolved against `document`.
    pub fn from_json_schema(name: impl Into<String>, document: &Value) -> Result<Self> {
        schema_from_object(name.into(), document, document, &mut Vec::new())
    }

    /// Accept either a descriptor (`{"name", "fields"}`) or a JSON Schema document.
    pub fn from_document(fallback_name: &str, document: &Value) -> Result<Self> {
        if document.get("fields").is_some() {
            return Ok(serde_json::from_value(document.clone())?);
        }
        let name = document
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or(fallback_name);
        Self::from_json_schema(name, document)
    }
}

fn schema_from_object(
    name: String,
    object: &Value,
    root: &Value,
    refs: &mut Vec<String>,
) -> Result<Schema> {
    let properties = object
        .get("properties")
        .and_then(Value::as_object)
        .ok_or_else(|| ShimError::InvalidParams {
            message: format!("schema '{}' has no 'properties' object", name),
        })?;

    let mut schema = Schema::new(name);
    for (prop_name, prop) in properties {
        schema
            .fields
            .push(field_from_property(prop_name, prop, root, refs)?);
    }
    Ok(schema)
}

fn field_from_property(
    name: &str,
    prop: &Value,
    root: &Value,
    refs: &mut Vec<String>,
) -> Result<Field> {
    let ty = property_type(name, prop, root, refs)?;

    let constraints = Constraints {
        minimum: prop.get("minimum").and_then(Value::as_f64),
        maximum: prop.get("maximum").and_then(Value::as_f64),
        min_length: prop
            .get("minLength")
            .and_then(Value::as_u64)
            .map(|n| n as usize),
        min_items: prop
            .get("minItems")
            .and_then(Value::as_u64)
            .map(|n| n as usize),
    };

    Ok(Field {
        name: name.to_string(),
        ty,
        constraints,
    })
}

fn property_type(
    name: &str,
    prop: &Value,
    root: &Value,
    refs: &mut Vec<String>,
) -> Result<FieldType> {
    if let Some(value) = prop.get("const") {
        return Ok(FieldType::EnumLiteral {
            values: vec![value.clone()],
        });
    }
    if let Some(values) = prop.get("enum").and_then(Value::as_array) {
        return Ok(FieldType::EnumLiteral {
            values: values.clone(),
        });
    }
    if let Some(reference) = prop.get("$ref").and_then(Value::as_str) {
        return resolve_ref(reference, root, refs);
    }
    // {"allOf": [{"$ref": ...}]} wraps a single model reference
    if let Some([single]) = prop.get("allOf").and_then(Value::as_array).map(Vec::as_slice) {
        return property_type(name, single, root, refs);
    }

    let ty = match prop.get("type").and_then(Value::as_str) {
        Some("string") => FieldType::Text,
        Some("number") => FieldType::Float,
        Some("integer") => FieldType::Int,
        Some("boolean") => FieldType::Bool,
        Some("array") => FieldType::Sequence,
        Some("object") | None if prop.get("properties").is_some() => {
            let nested_name = prop.get("title").and_then(Value::as_str).unwrap_or(name);
            FieldType::Nested {
                schema: schema_from_object(nested_name.to_string(), prop, root, refs)?,
            }
        }
        Some("object") => FieldType::Mapping,
        _ => FieldType::Unknown,
    };
    Ok(ty)
}

fn resolve_ref(reference: &str, root: &Value, refs: &mut Vec<String>) -> Result<FieldType> {
    let Some((section, def_name)) = ["$defs", "definitions"].iter().find_map(|section| {
        reference
            .strip_prefix("#/")
            .and_then(|rest| rest.strip_prefix(*section))
            .and_then(|rest| rest.strip_prefix('/'))
            .map(|def_name| (*section, def_name))
    }) else {
        tracing::debug!("Non-local $ref '{}' left as unknown type", reference);
        return Ok(FieldType::Unknown);
    };

    if refs.iter().any(|seen| seen == reference) {
        return Err(ShimError::InvalidParams {
            message: format!("recursive $ref '{}' has no finite default", reference),
        });
    }
    let target = root
        .get(section)
        .and_then(|defs| defs.get(def_name))
        .ok_or_else(|| ShimError::InvalidParams {
            message: format!("unresolved $ref '{}'", reference),
        })?;

    refs.push(reference.to_string());
    let ty = property_type(def_name, target, root, refs);
    refs.pop();
    ty
}

/// A concrete response type the shim can stand in for.
pub trait ResponseModel: DeserializeOwned {
    fn schema() -> Schema;
}

/// Shorthand for a JSON object instance.
pub type Instance = Map<String, Value>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_preserves_declaration_order() {
        let schema = Schema::new("Signal")
            .enum_literal("signal", ["bullish", "bearish", "neutral"])
            .float("confidence")
            .text("reasoning");
        let names: Vec<_> = schema.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["signal", "confidence", "reasoning"]);
    }

    #[test]
    fn test_from_json_schema_maps_types() {
        let doc = json!({
            "type": "object",
            "properties": {
                "reasoning": {"type": "string", "minLength": 1},
                "confidence": {"type": "number", "minimum": 0.0, "maximum": 100.0},
                "quantity": {"type": "integer"},
                "approved": {"type": "boolean"},
                "tags": {"type": "array", "items": {"type": "string"}},
                "decisions": {"type": "object"},
                "action": {"type": "string", "enum": ["buy", "sell", "hold"]},
                "risk": {
                    "type": "object",
                    "title": "RiskSummary",
                    "properties": {"note": {"type": "string"}}
                },
                "loose": {"type": ["integer", "string"]},
                "inner": {"$ref": "#/$defs/Inner"},
                "only": {"const": "x", "type": "string"}
            },
            "$defs": {
                "Inner": {
                    "title": "Inner",
                    "type": "object",
                    "properties": {"note": {"type": "string"}}
                }
            }
        });

        let schema = Schema::from_json_schema("Decision", &doc).unwrap();
        let types: Vec<_> = schema.fields.iter().map(|f| &f.ty).collect();
        assert_eq!(types[0], &FieldType::Text);
        assert_eq!(types[1], &FieldType::Float);
        assert_eq!(types[2], &FieldType::Int);
        assert_eq!(types[3], &FieldType::Bool);
        assert_eq!(types[4], &FieldType::Sequence);
        assert_eq!(types[5], &FieldType::Mapping);
        assert_eq!(
            types[6],
            &FieldType::EnumLiteral {
                values: vec![json!("buy"), json!("sell"), json!("hold")]
            }
        );
        match types[7] {
            FieldType::Nested { schema } => {
                assert_eq!(schema.name, "RiskSummary");
                assert_eq!(schema.fields[0].ty, FieldType::Text);
            }
            other => panic!("expected nested schema, got {:?}", other),
        }
        assert_eq!(types[8], &FieldType::Unknown);
        match types[9] {
            FieldType::Nested { schema } => {
                assert_eq!(schema.name, "Inner");
                assert_eq!(schema.fields[0].name, "note");
                assert_eq!(schema.fields[0].ty, FieldType::Text);
            }
            other => panic!("expected $ref to resolve to a nested schema, got {:?}", other),
        }
        assert_eq!(
            types[10],
            &FieldType::EnumLiteral {
                values: vec![json!("x")]
            }
        );

        assert_eq!(schema.fields[0].constraints.min_length, Some(1));
        assert_eq!(schema.fields[1].constraints.maximum, Some(100.0));
    }

    #[test]
    fn test_refs_resolve_through_definitions_and_all_of() {
        let doc = json!({
            "properties": {
                "decision": {"allOf": [{"$ref": "#/definitions/Decision"}]},
                "side": {"$ref": "#/definitions/Side"},
                "remote": {"$ref": "https://example.com/schema.json"}
            },
            "definitions": {
                "Decision": {
                    "properties": {"qty": {"type": "integer"}}
                },
                "Side": {"type": "string", "enum": ["long", "short"]}
            }
        });

        let schema = Schema::from_json_schema("Order", &doc).unwrap();
        match &schema.fields[0].ty {
            FieldType::Nested { schema } => {
                assert_eq!(schema.name, "Decision");
                assert_eq!(schema.fields[0].ty, FieldType::Int);
            }
            other => panic!("expected nested schema, got {:?}", other),
        }
        assert_eq!(
            schema.fields[1].ty,
            FieldType::EnumLiteral {
                values: vec![json!("long"), json!("short")]
            }
        );
        assert_eq!(schema.fields[2].ty, FieldType::Unknown);
    }

    #[test]
    fn test_unresolved_and_recursive_refs_are_rejected() {
        let missing = json!({"properties": {"a": {"$ref": "#/$defs/Missing"}}});
        let err = Schema::from_json_schema("M", &missing).unwrap_err();
        assert!(err.to_string().contains("unresolved $ref"));

        let recursive = json!({
            "properties": {"node": {"$ref": "#/$defs/Node"}},
            "$defs": {
                "Node": {"type": "object", "properties": {"next": {"$ref": "#/$defs/Node"}}}
            }
        });
        let err = Schema::from_json_schema("R", &recursive).unwrap_err();
        assert!(err.to_string().contains("recursive $ref"));
    }

    #[test]
    fn test_from_json_schema_requires_properties() {
        let err = Schema::from_json_schema("Empty", &json!({"type": "string"})).unwrap_err();
        assert!(err.to_string().contains("no 'properties'"));
    }

    #[test]
    fn test_descriptor_json_form_round_trips_through_from_document() {
        let doc = json!({
            "name": "Decision",
            "fields": [
                {"name": "action", "type": "enum_literal", "values": ["buy", "sell"]},
                {"name": "confidence", "type": "float", "constraints": {"minimum": 0.0}},
                {"name": "detail", "type": "nested", "schema": {
                    "name": "Detail",
                    "fields": [{"name": "note", "type": "text"}]
                }}
            ]
        });
        let schema = Schema::from_document("ignored", &doc).unwrap();
        assert_eq!(schema.name, "Decision");
        assert_eq!(schema.fields.len(), 3);
        assert_eq!(schema.fields[1].constraints.minimum, Some(0.0));
        assert_eq!(schema.field_names(), vec!["action", "confidence", "detail", "note"]);
    }

    #[test]
    fn test_constraints_check() {
        let c = Constraints {
            minimum: Some(1.0),
            ..Default::default()
        };
        assert!(c.check(&json!(0.0)).is_err());
        assert!(c.check(&json!(1)).is_ok());
        // Non-numeric values are not range-checked
        assert!(c.check(&json!("text")).is_ok());

        let c = Constraints {
            min_items: Some(1),
            ..Default::default()
        };
        assert!(c.check(&json!([])).is_err());
    }
}
