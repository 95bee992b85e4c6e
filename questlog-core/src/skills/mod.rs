//! Skill Validation Gate
//!
//! A proposed skill is sent to an evaluator, the reply is parsed by
//! [`evaluation`], and [`decide`] turns it into one of three outcomes given
//! the caller's skill point budget. Only a committed decision is ever
//! written, and the write debits the points in the same transaction.

pub mod evaluation;

pub use evaluation::{
    extract_json_object, parse_evaluation, AdjustedSkill, EvaluationError, SkillEvaluation,
};

use crate::constants::SKILL_START_LEVEL;
use serde::{Deserialize, Serialize};

const MAX_SKILL_NAME_CHARS: usize = 64;
const MAX_SKILL_DESCRIPTION_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProposalError {
    #[error("skill name is required")]
    MissingName,
    #[error("skill description is required")]
    MissingDescription,
    #[error("{field} is longer than {max} characters")]
    TooLong { field: &'static str, max: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillProposal {
    pub name: String,
    pub description: String,
}

impl SkillProposal {
    /// Trim and check a raw proposal
    pub fn new(name: &str, description: &str) -> Result<Self, ProposalError> {
        let name = name.trim();
        let description = description.trim();
        if name.is_empty() {
            return Err(ProposalError::MissingName);
        }
        if description.is_empty() {
            return Err(ProposalError::MissingDescription);
        }
        if name.chars().count() > MAX_SKILL_NAME_CHARS {
            return Err(ProposalError::TooLong {
                field: "name",
                max: MAX_SKILL_NAME_CHARS,
            });
        }
        if description.chars().count() > MAX_SKILL_DESCRIPTION_CHARS {
            return Err(ProposalError::TooLong {
                field: "description",
                max: MAX_SKILL_DESCRIPTION_CHARS,
            });
        }
        Ok(Self {
            name: name.to_string(),
            description: description.to_string(),
        })
    }
}

/// Prompt for the evaluator
pub fn evaluation_prompt(
    proposal: &SkillProposal,
    user_level: u32,
    available_points: u32,
) -> String {
    format!(
        r#"As a game master, evaluate this programming or self-improvement skill:
Name: {name}
Description: {description}
User Level: {user_level}
Available Skill Points: {available_points}

Analyze the skill and provide:
1. Is it valid (programming/self-improvement related)?
2. How powerful is it (scale 1-5)?
3. Required skill points (1-5 based on power)
4. If required points > available points, suggest a weaker version
5. Suggest an appropriate emoji icon

Respond with ONLY a JSON object:
{{
  "isValid": boolean,
  "powerLevel": number (1-5),
  "requiredPoints": number (1-5),
  "feedback": "explanation of evaluation",
  "icon": "emoji",
  "adjustedVersion": {{
    "name": "suggested weaker name if needed",
    "description": "adjusted description if needed",
    "requiredPoints": number
  }}
}}"#,
        name = proposal.name,
        description = proposal.description,
    )
}

// =====================================================
// Decisions
// =====================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SkillDecision {
    Rejected {
        feedback: String,
    },
    NeedsAdjustment {
        original: SkillProposal,
        required_points: u32,
        adjusted: Option<AdjustedSkill>,
        icon: String,
        power_level: String,
        feedback: String,
    },
    Approved {
        proposal: SkillProposal,
        required_points: u32,
        icon: String,
        power_level: String,
        feedback: String,
    },
}

/// A skill ready to be inserted, with the points it costs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSkill {
    pub name: String,
    pub description: String,
    pub icon: String,
    pub power_level: String,
    pub level: u32,
    pub cost: u32,
}

impl SkillDecision {
    pub fn outcome(&self) -> &'static str {
        match self {
            SkillDecision::Rejected { .. } => "rejected",
            SkillDecision::NeedsAdjustment { .. } => "needs_adjustment",
            SkillDecision::Approved { .. } => "approved",
        }
    }

    /// The skill a confirmation would write. Approved decisions commit the
    /// proposal as-is; an adjustment commits only its weaker version.
    pub fn committable(&self) -> Option<NewSkill> {
        match self {
            SkillDecision::Rejected { .. } => None,
            SkillDecision::Approved {
                proposal,
                required_points,
                icon,
                power_level,
                ..
            } => Some(NewSkill {
                name: proposal.name.clone(),
                description: proposal.description.clone(),
                icon: icon.clone(),
                power_level: power_level.clone(),
                level: SKILL_START_LEVEL,
                cost: *required_points,
            }),
            SkillDecision::NeedsAdjustment {
                adjusted,
                icon,
                power_level,
                ..
            } => adjusted.as_ref().map(|adj| NewSkill {
                name: adj.name.clone(),
                description: adj.description.clone(),
                icon: icon.clone(),
                power_level: power_level.clone(),
                level: SKILL_START_LEVEL,
                cost: adj.required_points,
            }),
        }
    }
}

pub fn decide(
    evaluation: SkillEvaluation,
    proposal: SkillProposal,
    available_points: u32,
) -> SkillDecision {
    if !evaluation.is_valid {
        return SkillDecision::Rejected {
            feedback: evaluation.feedback,
        };
    }
    if evaluation.required_points > available_points {
        return SkillDecision::NeedsAdjustment {
            original: proposal,
            required_points: evaluation.required_points,
            adjusted: evaluation.adjusted_version,
            icon: evaluation.icon,
            power_level: evaluation.power_level,
            feedback: evaluation.feedback,
        };
    }
    SkillDecision::Approved {
        proposal,
        required_points: evaluation.required_points,
        icon: evaluation.icon,
        power_level: evaluation.power_level,
        feedback: evaluation.feedback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal() -> SkillProposal {
        SkillProposal::new(
            "Rust Borrowck Mastery",
            "Write code the borrow checker accepts first try",
        )
        .unwrap()
    }

    fn evaluation(valid: bool, points: u32) -> SkillEvaluation {
        SkillEvaluation {
            is_valid: valid,
            power_level: points.to_string(),
            required_points: points,
            feedback: "fine".into(),
            icon: "🦀".into(),
            adjusted_version: Some(AdjustedSkill {
                name: "Borrowck Basics".into(),
                description: "Understand lifetimes".into(),
                required_points: 1,
            }),
        }
    }

    #[test]
    fn test_proposal_validation() {
        assert_eq!(SkillProposal::new("  ", "x"), Err(ProposalError::MissingName));
        assert_eq!(SkillProposal::new("x", ""), Err(ProposalError::MissingDescription));
        assert!(matches!(
            SkillProposal::new(&"n".repeat(65), "x"),
            Err(ProposalError::TooLong { field: "name", .. })
        ));
        assert_eq!(SkillProposal::new(" a ", " b ").unwrap().name, "a");
    }

    #[test]
    fn test_prompt_contents() {
        let prompt = evaluation_prompt(&proposal(), 12, 3);
        assert!(prompt.contains("Name: Rust Borrowck Mastery"));
        assert!(prompt.contains("User Level: 12"));
        assert!(prompt.contains("Available Skill Points: 3"));
        assert!(prompt.contains("\"adjustedVersion\": {"));
    }

    #[test]
    fn test_rejected() {
        let d = decide(evaluation(false, 0), proposal(), 5);
        assert_eq!(d.outcome(), "rejected");
        assert!(d.committable().is_none());
    }

    #[test]
    fn test_needs_adjustment_when_over_budget() {
        let d = decide(evaluation(true, 4), proposal(), 2);
        assert_eq!(d.outcome(), "needs_adjustment");
        let skill = d.committable().unwrap();
        assert_eq!(skill.name, "Borrowck Basics");
        assert_eq!(skill.cost, 1);
    }

    #[test]
    fn test_approved_within_budget() {
        let d = decide(evaluation(true, 2), proposal(), 2);
        assert_eq!(d.outcome(), "approved");
        let skill = d.committable().unwrap();
        assert_eq!(skill.name, "Rust Borrowck Mastery");
        assert_eq!(skill.cost, 2);
        assert_eq!(skill.level, 1);
        assert_eq!(skill.icon, "🦀");
    }

    #[test]
    fn test_adjustment_without_alternative_is_not_committable() {
        let mut eval = evaluation(true, 5);
        eval.adjusted_version = None;
        assert!(decide(eval, proposal(), 0).committable().is_none());
    }

    #[test]
    fn test_in_budget_reply_with_placeholder_adjustment_is_approved() {
        let reply = r#"{"isValid": true, "powerLevel": 2, "requiredPoints": 2,
            "feedback": "Good", "icon": "🦀",
            "adjustedVersion": {"name": "N/A", "description": "", "requiredPoints": 0}}"#;
        let d = decide(parse_evaluation(reply).unwrap(), proposal(), 5);
        assert_eq!(d.outcome(), "approved");
        assert_eq!(d.committable().unwrap().cost, 2);
    }

    #[test]
    fn test_decision_serializes_with_outcome_tag() {
        let json = serde_json::to_value(decide(evaluation(false, 0), proposal(), 1)).unwrap();
        assert_eq!(json["outcome"], "rejected");
        assert_eq!(json["feedback"], "fine");
    }
}
