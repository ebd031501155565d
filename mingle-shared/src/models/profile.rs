use serde::{Deserialize, Deserializer, Serialize};

pub const PLACEHOLDER_PICTURE: &str = "https://via.placeholder.com/150";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileType {
    #[default]
    Personal,
    Business,
}

/// A `users/{uid}` document.
///
/// Documents written by older app versions may miss fields or carry `age`
/// as a string, so every field defaults and the list fields accept either
/// an array or a comma separated string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub id: String,
    pub profile_type: ProfileType,
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub profile_picture: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    #[serde(deserialize_with = "lenient_age")]
    pub age: Option<u32>,
    pub gender: String,
    #[serde(deserialize_with = "lenient_list")]
    pub interests: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub services_offered: Vec<String>,
    pub business_name: String,
    pub business_phone: String,
    pub business_email: String,
    pub short_description: String,
    #[serde(deserialize_with = "lenient_list")]
    pub followers: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub following: Vec<String>,
}

impl UserProfile {
    /// Document written when an account signs up.
    pub fn new_account(id: impl Into<String>, email: impl Into<String>, profile_type: ProfileType) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            profile_type,
            ..Self::default()
        }
    }

    /// Age in years; missing or unparseable ages count as 0.
    pub fn age_years(&self) -> u32 {
        self.age.unwrap_or(0)
    }

    pub fn is_personal(&self) -> bool {
        self.profile_type == ProfileType::Personal
    }

    pub fn is_followed_by(&self, uid: &str) -> bool {
        self.followers.iter().any(|f| f == uid)
    }

    /// Fill blank display fields with the placeholders the profile screen shows.
    pub fn with_display_defaults(mut self) -> Self {
        fn fill(field: &mut String, fallback: &str) {
            if field.trim().is_empty() {
                *field = fallback.to_string();
            }
        }
        fill(&mut self.full_name, "User Name");
        fill(&mut self.username, "username");
        fill(&mut self.profile_picture, PLACEHOLDER_PICTURE);
        fill(&mut self.city, "City");
        fill(&mut self.state, "State");
        fill(&mut self.short_description, "This is a short description.");
        self
    }
}

fn lenient_age<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .and_then(|n| u32::try_from(n).ok()),
        Some(serde_json::Value::String(s)) => s.trim().parse::<u32>().ok(),
        _ => None,
    })
}

fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| match v {
                serde_json::Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        Some(serde_json::Value::String(s)) => split_csv(&s),
        _ => Vec::new(),
    })
}

/// Split a comma separated list, trimming entries and dropping blanks.
pub fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_legacy_document_shapes() {
        let profile: UserProfile = serde_json::from_value(json!({
            "fullName": "Ana",
            "age": "29",
            "interests": "Music, Travel ,",
            "followers": null,
        }))
        .unwrap();
        assert_eq!(profile.full_name, "Ana");
        assert_eq!(profile.age, Some(29));
        assert_eq!(profile.interests, vec!["Music", "Travel"]);
        assert!(profile.followers.is_empty());
        assert_eq!(profile.profile_type, ProfileType::Personal);
    }

    #[test]
    fn invalid_age_counts_as_zero() {
        let profile: UserProfile = serde_json::from_value(json!({ "age": "old" })).unwrap();
        assert_eq!(profile.age, None);
        assert_eq!(profile.age_years(), 0);

        let profile: UserProfile = serde_json::from_value(json!({ "age": 31 })).unwrap();
        assert_eq!(profile.age_years(), 31);
    }

    #[test]
    fn display_defaults_only_fill_blanks() {
        let profile = UserProfile {
            city: "Austin".into(),
            ..UserProfile::default()
        }
        .with_display_defaults();
        assert_eq!(profile.city, "Austin");
        assert_eq!(profile.state, "State");
        assert_eq!(profile.full_name, "User Name");
        assert_eq!(profile.profile_picture, PLACEHOLDER_PICTURE);
    }

    #[test]
    fn serializes_camel_case() {
        let profile = UserProfile::new_account("u1", "u1@mingle.app", ProfileType::Business);
        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value["profileType"], "business");
        assert_eq!(value["email"], "u1@mingle.app");
        assert!(value.get("shortDescription").is_some());
    }
}
