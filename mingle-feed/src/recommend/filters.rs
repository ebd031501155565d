use serde::Deserialize;

use mingle_shared::models::{split_csv, Post, UserProfile};
use mingle_shared::{AppError, ErrorCode};

/// Raw search query parameters as sent by the feed screen.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub interests: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub age_min: Option<String>,
    #[serde(default)]
    pub age_max: Option<String>,
}

/// Parsed search filters. Empty strings, empty lists and absent bounds are
/// inactive and always pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedFilters {
    pub search_text: String,
    pub interests: Vec<String>,
    pub city: String,
    pub state: String,
    pub gender: String,
    pub age_min: Option<u32>,
    pub age_max: Option<u32>,
}

fn parse_bound(name: &str, raw: Option<String>) -> Result<Option<u32>, AppError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse::<u32>().map(Some).map_err(|_| {
            AppError::new(ErrorCode::InvalidFilter, format!("{name} must be a non-negative integer"))
        }),
    }
}

impl TryFrom<FeedQuery> for FeedFilters {
    type Error = AppError;

    fn try_from(query: FeedQuery) -> Result<Self, Self::Error> {
        let age_min = parse_bound("age_min", query.age_min)?;
        let age_max = parse_bound("age_max", query.age_max)?;
        if let (Some(min), Some(max)) = (age_min, age_max) {
            if min > max {
                return Err(AppError::new(ErrorCode::InvalidFilter, "age_min must not exceed age_max"));
            }
        }
        let text = |v: Option<String>| v.map(|s| s.trim().to_string()).unwrap_or_default();
        Ok(Self {
            search_text: text(query.q),
            interests: query.interests.as_deref().map(split_csv).unwrap_or_default(),
            city: text(query.city),
            state: text(query.state),
            gender: text(query.gender),
            age_min,
            age_max,
        })
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl FeedFilters {
    pub fn has_age_bound(&self) -> bool {
        self.age_min.is_some() || self.age_max.is_some()
    }

    /// Inclusive age range check; missing bounds are open.
    pub fn age_in_range(&self, age: u32) -> bool {
        self.age_min.map_or(true, |min| age >= min) && self.age_max.map_or(true, |max| age <= max)
    }

    pub fn gender_matches(&self, gender: &str) -> bool {
        gender.trim().to_lowercase() == self.gender.trim().to_lowercase()
    }

    fn location_passes(&self, profile: Option<&UserProfile>) -> bool {
        let city_ok = self.city.is_empty()
            || profile.map_or(false, |p| contains_ci(&p.city, &self.city));
        let state_ok = self.state.is_empty()
            || profile.map_or(false, |p| contains_ci(&p.state, &self.state));
        city_ok && state_ok
    }

    fn demographics_pass(&self, profile: Option<&UserProfile>) -> bool {
        let gender_ok = self.gender.is_empty()
            || profile.map_or(false, |p| self.gender_matches(&p.gender));
        let age = profile.map_or(0, UserProfile::age_years);
        gender_ok && self.age_in_range(age)
    }

    /// Post predicate; `owner` is the resolved owner profile, if any.
    pub fn post_matches(&self, post: &Post, owner: Option<&UserProfile>, viewer_id: &str) -> bool {
        let search_ok = self.search_text.is_empty() || contains_ci(&post.description, &self.search_text);
        let interests_ok = self.interests.is_empty()
            || self.interests.iter().any(|i| post.tags.contains(i));
        let not_own = post.owner_id != viewer_id;

        search_ok && interests_ok && not_own && self.location_passes(owner) && self.demographics_pass(owner)
    }

    pub fn user_matches(&self, candidate: &UserProfile, viewer: &UserProfile) -> bool {
        let search_ok = self.search_text.is_empty()
            || contains_ci(&candidate.full_name, &self.search_text)
            || contains_ci(&candidate.username, &self.search_text);
        let interests_ok = self.interests.is_empty()
            || candidate.interests.iter().any(|i| self.interests.contains(i));
        let not_viewer = candidate.id != viewer.id
            && (viewer.username.is_empty() || candidate.username != viewer.username);

        search_ok
            && interests_ok
            && not_viewer
            && self.location_passes(Some(candidate))
            && self.demographics_pass(Some(candidate))
    }
}
