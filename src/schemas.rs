//! Built-in JSON Schema documents for common agent response models.

use serde_json::{Value, json};

pub fn analyst_signal_schema() -> Value {
    json!({
        "title": "AnalystSignal",
        "type": "object",
        "properties": {
            "signal": {"type": "string", "enum": ["bullish", "bearish", "neutral"]},
            "confidence": {"type": "number", "minimum": 0.0, "maximum": 100.0},
            "reasoning": {"type": "string"}
        },
        "required": ["signal", "confidence", "reasoning"]
    })
}

pub fn portfolio_decision_schema() -> Value {
    json!({
        "title": "PortfolioDecision",
        "type": "object",
        "properties": {
            "action": {"type": "string", "enum": ["buy", "sell", "short", "cover", "hold"]},
            "quantity": {"type": "integer", "minimum": 0},
            "confidence": {"type": "number", "minimum": 0.0, "maximum": 100.0},
            "reasoning": {"type": "string"}
        },
        "required": ["action", "quantity", "confidence", "reasoning"]
    })
}

pub fn portfolio_output_schema() -> Value {
    json!({
        "title": "PortfolioManagerOutput",
        "type": "object",
        "properties": {
            "decisions": {"type": "object"}
        },
        "required": ["decisions"]
    })
}

pub fn risk_assessment_schema() -> Value {
    json!({
        "title": "RiskAssessment",
        "type": "object",
        "properties": {
            "remaining_position_limit": {"type": "number", "minimum": 0.0},
            "current_price": {"type": "number", "minimum": 0.0},
            "flags": {"type": "array", "items": {"type": "string"}},
            "reasoning": {
                "type": "object",
                "title": "RiskReasoning",
                "properties": {
                    "portfolio_value": {"type": "number"},
                    "summary": {"type": "string"}
                }
            }
        }
    })
}

/// Look up a built-in document by short name.
pub fn builtin(name: &str) -> Option<Value> {
    match name {
        "analyst_signal" => Some(analyst_signal_schema()),
        "portfolio_decision" => Some(portfolio_decision_schema()),
        "portfolio_output" => Some(portfolio_output_schema()),
        "risk_assessment" => Some(risk_assessment_schema()),
        _ => None,
    }
}

pub const BUILTIN_NAMES: &[&str] = &[
    "analyst_signal",
    "portfolio_decision",
    "portfolio_output",
    "risk_assessment",
];
