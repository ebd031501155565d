use serde_json::Value;

use mingle_shared::clients::store::{collections, Direction, Query};
use mingle_shared::models::UserProfile;

/// Firestore caps `array-contains-any` at 30 values.
const MAX_ANY_VALUES: usize = 30;

/// Posts tagged with any of the viewer's interests, excluding the viewer's
/// own, grouped by owner and newest first. `None` when the viewer has no
/// interests.
pub fn post_candidates(viewer: &UserProfile, limit: usize) -> Option<Query> {
    if viewer.interests.is_empty() {
        return None;
    }
    let interests: Vec<Value> = viewer
        .interests
        .iter()
        .take(MAX_ANY_VALUES)
        .cloned()
        .map(Value::String)
        .collect();
    Some(
        Query::collection(collections::POSTS)
            .where_array_contains_any("tags", interests)
            .where_ne("ownerId", viewer.id.as_str())
            .order_by("ownerId", Direction::Ascending)
            .order_by("createdAt", Direction::Descending)
            .limit(limit),
    )
}

/// Everyone but the viewer, by username. `None` when the viewer has no
/// username yet.
pub fn user_candidates(viewer: &UserProfile, limit: usize) -> Option<Query> {
    if viewer.username.trim().is_empty() {
        return None;
    }
    Some(
        Query::collection(collections::USERS)
            .where_ne("username", viewer.username.as_str())
            .limit(limit),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use mingle_shared::clients::store::FilterOp;

    #[test]
    fn no_interests_means_no_post_candidates() {
        assert!(post_candidates(&UserProfile::default(), 100).is_none());
    }

    #[test]
    fn post_query_shape() {
        let viewer = UserProfile {
            id: "me".into(),
            interests: (0..40).map(|i| format!("i{i}")).collect(),
            ..UserProfile::default()
        };
        let q = post_candidates(&viewer, 100).unwrap();
        assert_eq!(q.filters[0].op, FilterOp::ArrayContainsAny);
        assert_eq!(q.filters[0].value.as_array().unwrap().len(), 30);
        assert_eq!(q.filters[1].op, FilterOp::NotEqual);
        assert_eq!(q.order_by[1].field, "createdAt");
        assert_eq!(q.limit, Some(100));
    }

    #[test]
    fn user_query_excludes_viewer_username() {
        let viewer = UserProfile {
            username: "ana".into(),
            ..UserProfile::default()
        };
        let q = user_candidates(&viewer, 500).unwrap();
        assert_eq!(q.filters[0].value, "ana");
        assert!(user_candidates(&UserProfile::default(), 500).is_none());
    }
}
