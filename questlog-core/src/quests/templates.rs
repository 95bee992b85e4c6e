//! Local quest templates used when text generation is unavailable.

use rand::seq::SliceRandom;
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateCategory {
    pub name: &'static str,
    pub templates: &'static [&'static str],
}

pub const CATEGORIES: &[TemplateCategory] = &[
    TemplateCategory {
        name: "training",
        templates: &[
            "Practice {skill} by doing {specific_action} for {duration} minutes",
            "Improve your {skill} by completing {specific_action} {count} times",
            "Do {specific_action} to enhance your {skill} for {duration} minutes",
        ],
    },
    TemplateCategory {
        name: "study",
        templates: &[
            "Read about {skill} for {duration} minutes and take notes",
            "Watch {count} educational videos about {skill} and summarize key points",
            "Complete {count} practice problems related to {skill}",
        ],
    },
    TemplateCategory {
        name: "project",
        templates: &[
            "Create a small project using {skill} that demonstrates {specific_concept}",
            "Document your progress in {skill} by writing {count} journal entries",
            "Practice {skill} by helping someone else learn a basic concept",
        ],
    },
];

const SPECIFIC_ACTIONS: &[&str] = &[
    "focused repetition exercises",
    "timed practice sessions",
    "structured drills",
    "review exercises",
    "practical applications",
];

const SPECIFIC_CONCEPTS: &[&str] = &[
    "basic principles",
    "fundamental techniques",
    "problem-solving methods",
    "common use cases",
    "best practices",
];

const DURATIONS: &[&str] = &["15", "20", "25", "30", "45"];

const COUNTS: &[&str] = &["3", "5", "7", "10", "15"];

fn choices(key: &str) -> Option<&'static [&'static str]> {
    match key {
        "specific_action" => Some(SPECIFIC_ACTIONS),
        "specific_concept" => Some(SPECIFIC_CONCEPTS),
        "duration" => Some(DURATIONS),
        "count" => Some(COUNTS),
        _ => None,
    }
}

/// Pick a category, then a template within it.
pub fn pick_template<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    let category = CATEGORIES.choose(rng).unwrap_or(&CATEGORIES[0]);
    category
        .templates
        .choose(rng)
        .copied()
        .unwrap_or(category.templates[0])
}

/// Replace every `{word}` placeholder, left to right. `{skill}` becomes
/// `skill`, list placeholders draw uniformly from their list, anything
/// else stays verbatim.
pub fn fill_template<R: Rng + ?Sized>(template: &str, skill: &str, rng: &mut R) -> String {
    let mut out = String::with_capacity(template.len() + 32);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = match after.find('}') {
            Some(c) => c,
            None => {
                out.push_str(&rest[open..]);
                return out;
            }
        };
        let key = &after[..close];
        let is_word = !key.is_empty() && key.chars().all(|c| c.is_alphanumeric() || c == '_');

        if !is_word {
            // Not a placeholder; emit the brace and keep scanning after it
            out.push('{');
            rest = after;
            continue;
        }

        if key == "skill" {
            out.push_str(skill);
        } else if let Some(list) = choices(key) {
            out.push_str(list.choose(rng).copied().unwrap_or(""));
        } else {
            out.push('{');
            out.push_str(key);
            out.push('}');
        }
        rest = &after[close + 1..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seeded_rng;

    #[test]
    fn test_fill_all_placeholders() {
        let mut rng = seeded_rng(1);
        let text = fill_template(
            "Practice {skill} by doing {specific_action} for {duration} minutes",
            "wisdom",
            &mut rng,
        );
        assert!(text.starts_with("Practice wisdom by doing "));
        assert!(!text.contains('{'));
        assert!(DURATIONS.iter().any(|d| text.ends_with(&format!("for {d} minutes"))));
    }

    #[test]
    fn test_unknown_placeholder_left_verbatim() {
        let mut rng = seeded_rng(1);
        let text = fill_template("Train {skill} with {mentor} {count} times", "luck", &mut rng);
        assert!(text.contains("{mentor}"));
        assert!(text.starts_with("Train luck with {mentor} "));
    }

    #[test]
    fn test_stray_braces() {
        let mut rng = seeded_rng(1);
        assert_eq!(fill_template("a { b } {skill", "x", &mut rng), "a { b } {skill");
        assert_eq!(fill_template("{}{skill}", "x", &mut rng), "{}x");
    }

    #[test]
    fn test_every_template_fills_completely() {
        let mut rng = seeded_rng(3);
        for category in CATEGORIES {
            for template in category.templates {
                let text = fill_template(template, "agility", &mut rng);
                assert!(!text.contains('{'), "unfilled: {text}");
                assert!(text.contains("agility"));
            }
        }
    }

    #[test]
    fn test_pick_template_is_known() {
        let mut rng = seeded_rng(9);
        for _ in 0..50 {
            let t = pick_template(&mut rng);
            assert!(CATEGORIES.iter().any(|c| c.templates.contains(&t)));
        }
    }
}
