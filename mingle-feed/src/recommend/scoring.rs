use mingle_shared::models::{Post, UserProfile};

use super::filters::FeedFilters;

/// Post ranking weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostWeights {
    pub interests: f64,
    pub engagement: f64,
    pub location: f64,
    pub demographics: f64,
    pub nlp: f64,
}

impl Default for PostWeights {
    fn default() -> Self {
        Self {
            interests: 15.0,
            engagement: 0.5,
            location: 20.0,
            demographics: 10.0,
            nlp: 100.0,
        }
    }
}

/// People ranking weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UserWeights {
    pub interests: f64,
    pub location: f64,
    pub nlp: f64,
}

impl Default for UserWeights {
    fn default() -> Self {
        Self {
            interests: 15.0,
            location: 20.0,
            nlp: 100.0,
        }
    }
}

/// Case-insensitive equality where an empty value never matches.
fn same_place(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    !a.is_empty() && !b.is_empty() && a.to_lowercase() == b.to_lowercase()
}

fn or_viewer<'a>(filter: &'a str, viewer: &'a str) -> &'a str {
    if filter.is_empty() { viewer } else { filter }
}

/// Every post score component except text similarity.
pub fn post_base_score(
    post: &Post,
    owner: Option<&UserProfile>,
    viewer: &UserProfile,
    filters: &FeedFilters,
    w: &PostWeights,
) -> f64 {
    let mut score = post.engagement() as f64 * w.engagement;

    let relevant = if filters.interests.is_empty() {
        &viewer.interests
    } else {
        &filters.interests
    };
    let description = post.description.to_lowercase();
    for interest in relevant {
        if post.tags.contains(interest) {
            score += w.interests;
        }
        if !interest.is_empty() && description.contains(&interest.to_lowercase()) {
            score += w.interests / 3.0;
        }
    }

    if let Some(owner) = owner {
        if same_place(&owner.city, or_viewer(&filters.city, &viewer.city)) {
            score += w.location;
        }
        if same_place(&owner.state, or_viewer(&filters.state, &viewer.state)) {
            score += w.location / 2.0;
        }
        if !filters.gender.is_empty() && filters.gender_matches(&owner.gender) {
            score += w.demographics;
        }
        if filters.has_age_bound() && filters.age_in_range(owner.age_years()) {
            score += w.demographics;
        }
    }

    score
}

pub fn post_score(base: f64, similarity: f64, w: &PostWeights) -> f64 {
    base + similarity * w.nlp
}

/// Every people score component except text similarity. Personal viewers
/// are matched on interests, business viewers on services offered.
pub fn user_base_score(candidate: &UserProfile, viewer: &UserProfile, w: &UserWeights) -> f64 {
    let (theirs, ours) = if viewer.is_personal() {
        (&candidate.interests, &viewer.interests)
    } else {
        (&candidate.services_offered, &viewer.services_offered)
    };
    let shared = theirs.iter().filter(|item| ours.contains(item)).count();
    let mut score = shared as f64 * w.interests;

    if same_place(&candidate.city, &viewer.city) {
        score += w.location;
    }
    if same_place(&candidate.state, &viewer.state) {
        score += w.location / 2.0;
    }
    score
}

pub fn user_score(base: f64, similarity: f64, w: &UserWeights) -> f64 {
    base + similarity * w.nlp
}
