use futures::future::join_all;
use serde::Serialize;

use mingle_shared::clients::store::{collections, DocumentStore, DocumentStoreExt, FieldUpdate, StoreResult};
use mingle_shared::errors::{AppError, AppResult, ErrorCode};
use mingle_shared::models::UserProfile;

use super::profile_service;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowState {
    pub following: bool,
}

fn ensure_not_self(actor: &str, target: &str) -> AppResult<()> {
    if actor == target {
        return Err(AppError::new(ErrorCode::CannotFollowSelf, "cannot follow yourself"));
    }
    Ok(())
}

/// Issue both sides of a relation change concurrently.
///
/// The writes are independent and idempotent, so repeating the request after
/// a partial failure converges to a symmetric relation.
async fn apply_pair(
    store: &dyn DocumentStore,
    actor: &str,
    target: &str,
    following_update: FieldUpdate,
    followers_update: FieldUpdate,
    action: &'static str,
) -> AppResult<()> {
    let (actor_side, target_side): (StoreResult<_>, StoreResult<_>) = tokio::join!(
        store.update(collections::USERS, actor, vec![("following".to_string(), following_update)]),
        store.update(collections::USERS, target, vec![("followers".to_string(), followers_update)]),
    );

    match (actor_side, target_side) {
        (Ok(_), Ok(_)) => {
            tracing::info!(actor = %actor, target = %target, action, "follow relation updated");
            Ok(())
        }
        (Err(e), Err(_)) => Err(e.into()),
        (actor_side, target_side) => {
            let failed = if actor_side.is_err() { "following" } else { "followers" };
            tracing::warn!(
                actor = %actor,
                target = %target,
                action,
                failed_list = failed,
                "asymmetric follow relation after partial write"
            );
            Err(AppError::new(
                ErrorCode::FollowPartiallyApplied,
                format!("{action} only partially applied; retry to complete it"),
            ))
        }
    }
}

pub async fn follow(store: &dyn DocumentStore, actor: &str, target: &str) -> AppResult<FollowState> {
    ensure_not_self(actor, target)?;
    apply_pair(
        store,
        actor,
        target,
        FieldUpdate::union_str(target),
        FieldUpdate::union_str(actor),
        "follow",
    )
    .await?;
    Ok(FollowState { following: true })
}

pub async fn unfollow(store: &dyn DocumentStore, actor: &str, target: &str) -> AppResult<FollowState> {
    ensure_not_self(actor, target)?;
    apply_pair(
        store,
        actor,
        target,
        FieldUpdate::remove_str(target),
        FieldUpdate::remove_str(actor),
        "unfollow",
    )
    .await?;
    Ok(FollowState { following: false })
}

/// Follow if the actor is not among the target's followers, else unfollow.
pub async fn toggle_follow(store: &dyn DocumentStore, actor: &str, target: &str) -> AppResult<FollowState> {
    ensure_not_self(actor, target)?;
    // Both profiles must exist before either list is touched.
    profile_service::load(store, actor).await?;
    let target_profile = profile_service::load(store, target).await?;

    if target_profile.is_followed_by(actor) {
        unfollow(store, actor, target).await
    } else {
        follow(store, actor, target).await
    }
}

pub async fn is_following(store: &dyn DocumentStore, actor: &str, target: &str) -> AppResult<bool> {
    let target_profile = profile_service::load(store, target).await?;
    Ok(target_profile.is_followed_by(actor))
}

/// Resolve ids to profiles, skipping ids with no profile document.
async fn resolve(store: &dyn DocumentStore, ids: &[String]) -> AppResult<Vec<UserProfile>> {
    let results = join_all(ids.iter().map(|id| store.get_as::<UserProfile>(collections::USERS, id))).await;
    let mut profiles = Vec::with_capacity(results.len());
    for result in results {
        if let Some(profile) = result? {
            profiles.push(profile.with_display_defaults());
        }
    }
    Ok(profiles)
}

pub async fn list_followers(store: &dyn DocumentStore, user_id: &str) -> AppResult<Vec<UserProfile>> {
    let profile = profile_service::load(store, user_id).await?;
    resolve(store, &profile.followers).await
}

pub async fn list_following(store: &dyn DocumentStore, user_id: &str) -> AppResult<Vec<UserProfile>> {
    let profile = profile_service::load(store, user_id).await?;
    resolve(store, &profile.following).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use mingle_shared::clients::store::{encode_fields, MemoryStore};
    use mingle_shared::models::ProfileType;

    async fn with_users(ids: &[&str]) -> MemoryStore {
        let store = MemoryStore::new();
        for id in ids {
            let mut profile = UserProfile::new_account(*id, format!("{id}@example.com"), ProfileType::Personal);
            profile.username = id.to_string();
            store
                .create(collections::USERS, Some(*id), encode_fields(&profile).unwrap())
                .await
                .unwrap();
        }
        store
    }

    async fn profile(store: &MemoryStore, id: &str) -> UserProfile {
        profile_service::load(store, id).await.unwrap()
    }

    #[tokio::test]
    async fn toggle_follow_then_unfollow() {
        let store = with_users(&["alice", "bob"]).await;

        let state = toggle_follow(&store, "alice", "bob").await.unwrap();
        assert!(state.following);
        assert_eq!(profile(&store, "alice").await.following, vec!["bob"]);
        assert_eq!(profile(&store, "bob").await.followers, vec!["alice"]);
        assert!(is_following(&store, "alice", "bob").await.unwrap());

        let state = toggle_follow(&store, "alice", "bob").await.unwrap();
        assert!(!state.following);
        assert!(profile(&store, "alice").await.following.is_empty());
        assert!(profile(&store, "bob").await.followers.is_empty());
    }

    #[tokio::test]
    async fn follow_is_idempotent() {
        let store = with_users(&["alice", "bob"]).await;
        follow(&store, "alice", "bob").await.unwrap();
        follow(&store, "alice", "bob").await.unwrap();
        assert_eq!(profile(&store, "bob").await.followers, vec!["alice"]);
    }

    #[tokio::test]
    async fn cannot_follow_self() {
        let store = with_users(&["alice"]).await;
        let err = toggle_follow(&store, "alice", "alice").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::CannotFollowSelf);
    }

    #[tokio::test]
    async fn missing_target_is_not_found() {
        let store = with_users(&["alice"]).await;
        let err = toggle_follow(&store, "alice", "ghost").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ProfileNotFound);
        assert!(profile(&store, "alice").await.following.is_empty());
    }

    #[tokio::test]
    async fn partial_write_is_reported() {
        let store = with_users(&["alice"]).await;
        // The target document is missing, so only the actor side lands.
        let err = follow(&store, "alice", "ghost").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::FollowPartiallyApplied);
        assert_eq!(profile(&store, "alice").await.following, vec!["ghost"]);
    }

    #[tokio::test]
    async fn lists_resolve_and_skip_unknown_ids() {
        let store = with_users(&["alice", "bob", "carol"]).await;
        follow(&store, "bob", "alice").await.unwrap();
        follow(&store, "carol", "alice").await.unwrap();
        store
            .update(collections::USERS, "alice", vec![("followers".into(), FieldUpdate::union_str("deleted"))])
            .await
            .unwrap();

        let followers = list_followers(&store, "alice").await.unwrap();
        let names: Vec<&str> = followers.iter().map(|p| p.username.as_str()).collect();
        assert_eq!(names, vec!["bob", "carol"]);

        let following = list_following(&store, "bob").await.unwrap();
        assert_eq!(following.len(), 1);
        assert_eq!(following[0].id, "alice");
    }
}
