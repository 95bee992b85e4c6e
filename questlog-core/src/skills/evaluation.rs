//! Parsing of evaluator replies.
//!
//! Evaluators wrap their JSON in prose or code fences, so the first complete
//! top-level object is cut out with a string-aware brace scan before it is
//! handed to serde.

use crate::constants::{SKILL_MAX_POINTS, SKILL_MIN_POINTS};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("evaluator reply contains no JSON object")]
    NoJsonObject,
    #[error("malformed evaluation: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustedSkill {
    pub name: String,
    pub description: String,
    pub required_points: u32,
}

/// Validated evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillEvaluation {
    pub is_valid: bool,
    /// Label as reported, e.g. `"3"` or `"Moderate"`
    pub power_level: String,
    pub required_points: u32,
    pub feedback: String,
    pub icon: String,
    pub adjusted_version: Option<AdjustedSkill>,
}

// Wire shape, camelCase and loosely typed
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvaluation {
    #[serde(default)]
    is_valid: bool,
    #[serde(default)]
    power_level: Option<RawPowerLevel>,
    #[serde(default)]
    required_points: Option<f64>,
    #[serde(default)]
    feedback: String,
    #[serde(default)]
    icon: String,
    #[serde(default)]
    adjusted_version: Option<RawAdjusted>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPowerLevel {
    Number(f64),
    Label(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAdjusted {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    required_points: Option<f64>,
}

/// First balanced `{...}` in `text`, ignoring braces inside JSON strings.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn points_in_range(field: &'static str, value: f64) -> Result<u32, EvaluationError> {
    let rounded = value.round();
    if !rounded.is_finite()
        || rounded < SKILL_MIN_POINTS as f64
        || rounded > SKILL_MAX_POINTS as f64
    {
        return Err(EvaluationError::OutOfRange {
            field,
            value: if rounded.is_finite() { rounded as i64 } else { i64::MAX },
        });
    }
    Ok(rounded as u32)
}

fn power_label(raw: Option<RawPowerLevel>) -> String {
    match raw {
        Some(RawPowerLevel::Number(n)) if n.fract() == 0.0 => format!("{}", n as i64),
        Some(RawPowerLevel::Number(n)) => n.to_string(),
        Some(RawPowerLevel::Label(s)) => s.trim().to_string(),
        None => String::new(),
    }
}

/// Evaluators fill `adjustedVersion` with placeholders when no adjustment is
/// needed, so an unusable one is dropped rather than failing the reply.
fn adjusted_skill(raw: RawAdjusted) -> Option<AdjustedSkill> {
    let name = raw.name.trim();
    if name.is_empty() {
        return None;
    }
    let required_points = raw
        .required_points
        .and_then(|p| points_in_range("adjustedVersion.requiredPoints", p).ok())?;
    Some(AdjustedSkill {
        name: name.to_string(),
        description: raw.description.trim().to_string(),
        required_points,
    })
}

/// Extract, deserialize and range-check an evaluator reply.
///
/// Point costs are only enforced for valid proposals: a rejection may carry
/// any (or no) cost.
pub fn parse_evaluation(text: &str) -> Result<SkillEvaluation, EvaluationError> {
    let json = extract_json_object(text).ok_or(EvaluationError::NoJsonObject)?;
    let raw: RawEvaluation = serde_json::from_str(json)?;

    let required_points = match (raw.is_valid, raw.required_points) {
        (true, Some(points)) => points_in_range("requiredPoints", points)?,
        (true, None) => {
            return Err(EvaluationError::OutOfRange {
                field: "requiredPoints",
                value: 0,
            })
        }
        (false, points) => points
            .filter(|p| p.is_finite() && *p >= 0.0)
            .map(|p| p.round() as u32)
            .unwrap_or(0),
    };

    let adjusted_version = raw.adjusted_version.and_then(adjusted_skill);

    Ok(SkillEvaluation {
        is_valid: raw.is_valid,
        power_level: power_label(raw.power_level),
        required_points,
        feedback: raw.feedback,
        icon: raw.icon,
        adjusted_version,
    })
}
