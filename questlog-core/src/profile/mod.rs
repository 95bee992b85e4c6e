//! Player Profile
//!
//! Username, profession and avatar customization. Only validation lives
//! here; the avatar is rendered client-side from the stored document.

use serde::{Deserialize, Serialize};

pub const USERNAME_MIN_CHARS: usize = 3;
pub const USERNAME_MAX_CHARS: usize = 24;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    #[error("username must be {min}-{max} characters")]
    UsernameLength { min: usize, max: usize },
    #[error("unknown profession: {0}")]
    UnknownProfession(String),
    #[error("invalid avatar {part}: {value}")]
    InvalidPart { part: &'static str, value: String },
    #[error("invalid avatar colour {field}: {value} (expected #RRGGBB)")]
    InvalidColor { field: &'static str, value: String },
}

// =====================================================
// Professions
// =====================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Profession {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
}

pub const PROFESSIONS: &[Profession] = &[
    Profession {
        id: "chaos_bringer",
        name: "Chaos Bringer",
        description: "A mysterious force that brings controlled chaos to systems and code.",
        icon: "🌀",
    },
    Profession {
        id: "code_sage",
        name: "Code Sage",
        description: "Master of algorithms and software architecture.",
        icon: "📚",
    },
    Profession {
        id: "tech_artificer",
        name: "Tech Artificer",
        description: "Creates and maintains complex technical systems.",
        icon: "⚡",
    },
    Profession {
        id: "data_weaver",
        name: "Data Weaver",
        description: "Manipulates and analyzes complex data structures.",
        icon: "🔮",
    },
];

pub fn find_profession(id: &str) -> Result<&'static Profession, ProfileError> {
    PROFESSIONS
        .iter()
        .find(|p| p.id == id.trim())
        .ok_or_else(|| ProfileError::UnknownProfession(id.to_string()))
}

/// Trimmed username of an allowed length
pub fn validate_username(raw: &str) -> Result<String, ProfileError> {
    let name = raw.trim();
    let len = name.chars().count();
    if !(USERNAME_MIN_CHARS..=USERNAME_MAX_CHARS).contains(&len) {
        return Err(ProfileError::UsernameLength {
            min: USERNAME_MIN_CHARS,
            max: USERNAME_MAX_CHARS,
        });
    }
    Ok(name.to_string())
}

// =====================================================
// Avatar
// =====================================================

pub const HAIR: &[&str] = &["default", "long", "short", "mohawk", "bald"];
pub const EYES: &[&str] = &["default", "happy", "angry", "sleepy", "cool"];
pub const MOUTH: &[&str] = &["default", "smile", "sad", "surprised", "neutral"];
pub const ACCESSORIES: &[&str] = &["none", "glasses", "sunglasses", "eyepatch", "monocle"];
pub const CLOTHES: &[&str] = &["tshirt", "hoodie", "suit", "tank", "jacket"];
pub const PANTS: &[&str] = &["jeans", "shorts", "skirt", "slacks", "cargo"];
pub const SHOES: &[&str] = &["sneakers", "boots", "sandals", "formal", "none"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarCustomization {
    pub hair: String,
    pub eyes: String,
    pub mouth: String,
    pub accessories: String,
    pub clothes: String,
    pub pants: String,
    pub shoes: String,
    pub skin_color: String,
    pub hair_color: String,
    pub clothes_color: String,
    pub pants_color: String,
    pub shoes_color: String,
}

impl Default for AvatarCustomization {
    fn default() -> Self {
        Self {
            hair: "default".into(),
            eyes: "default".into(),
            mouth: "default".into(),
            accessories: "none".into(),
            clothes: "tshirt".into(),
            pants: "jeans".into(),
            shoes: "sneakers".into(),
            skin_color: "#FFE0BD".into(),
            hair_color: "#000000".into(),
            clothes_color: "#FF0000".into(),
            pants_color: "#000080".into(),
            shoes_color: "#000000".into(),
        }
    }
}

fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

impl AvatarCustomization {
    pub fn validate(&self) -> Result<(), ProfileError> {
        let parts: [(&'static str, &str, &[&str]); 7] = [
            ("hair", self.hair.as_str(), HAIR),
            ("eyes", self.eyes.as_str(), EYES),
            ("mouth", self.mouth.as_str(), MOUTH),
            ("accessories", self.accessories.as_str(), ACCESSORIES),
            ("clothes", self.clothes.as_str(), CLOTHES),
            ("pants", self.pants.as_str(), PANTS),
            ("shoes", self.shoes.as_str(), SHOES),
        ];
        for (part, value, options) in parts {
            if !options.contains(&value) {
                return Err(ProfileError::InvalidPart {
                    part,
                    value: value.to_string(),
                });
            }
        }

        let colors: [(&'static str, &str); 5] = [
            ("skinColor", self.skin_color.as_str()),
            ("hairColor", self.hair_color.as_str()),
            ("clothesColor", self.clothes_color.as_str()),
            ("pantsColor", self.pants_color.as_str()),
            ("shoesColor", self.shoes_color.as_str()),
        ];
        for (field, value) in colors {
            if !is_hex_color(value) {
                return Err(ProfileError::InvalidColor {
                    field,
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub username: Option<String>,
    pub profession: Option<String>,
    pub avatar: Option<AvatarCustomization>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_bounds() {
        assert!(validate_username("ab").is_err());
        assert_eq!(validate_username("  abc  ").unwrap(), "abc");
        assert!(validate_username(&"x".repeat(24)).is_ok());
        assert!(validate_username(&"x".repeat(25)).is_err());
    }

    #[test]
    fn test_professions() {
        assert_eq!(PROFESSIONS.len(), 4);
        assert_eq!(find_profession("code_sage").unwrap().name, "Code Sage");
        assert!(matches!(
            find_profession("bard"),
            Err(ProfileError::UnknownProfession(_))
        ));
    }

    #[test]
    fn test_default_avatar_is_valid() {
        assert!(AvatarCustomization::default().validate().is_ok());
    }

    #[test]
    fn test_avatar_rejects_unknown_part() {
        let avatar = AvatarCustomization {
            hair: "afro-mullet".into(),
            ..Default::default()
        };
        assert!(matches!(
            avatar.validate(),
            Err(ProfileError::InvalidPart { part: "hair", .. })
        ));
    }

    #[test]
    fn test_avatar_colour_format() {
        let avatar = AvatarCustomization {
            pants_color: "navy".into(),
            ..Default::default()
        };
        assert!(matches!(
            avatar.validate(),
            Err(ProfileError::InvalidColor { field: "pantsColor", .. })
        ));
        assert!(is_hex_color("#a1B2c3"));
        assert!(!is_hex_color("#a1B2c"));
        assert!(!is_hex_color("#GGGGGG"));
    }

    #[test]
    fn test_avatar_camel_case_json() {
        let json = serde_json::to_value(AvatarCustomization::default()).unwrap();
        assert_eq!(json["skinColor"], "#FFE0BD");
        assert_eq!(json["accessories"], "none");
    }
}
