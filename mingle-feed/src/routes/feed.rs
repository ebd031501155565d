use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use mingle_shared::types::api::ApiResponse;
use mingle_shared::types::auth::AuthUser;
use mingle_shared::AppResult;

use crate::recommend::filters::{FeedFilters, FeedQuery};
use crate::recommend::{RankedPost, RankedUser};
use crate::AppState;

/// GET /feed/posts
pub async fn search_posts(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<FeedQuery>,
) -> AppResult<Json<ApiResponse<Vec<RankedPost>>>> {
    let filters = FeedFilters::try_from(query)?;
    let posts = state.recommender.search_posts(&auth.id, &filters).await?;
    tracing::info!(user_id = %auth.id, results = posts.len(), "post search");
    Ok(Json(ApiResponse::ok(posts)))
}

/// GET /feed/users
pub async fn search_users(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<FeedQuery>,
) -> AppResult<Json<ApiResponse<Vec<RankedUser>>>> {
    let filters = FeedFilters::try_from(query)?;
    let users = state.recommender.search_users(&auth.id, &filters).await?;
    tracing::info!(user_id = %auth.id, results = users.len(), "user search");
    Ok(Json(ApiResponse::ok(users)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::recommend::embedder::tests::StubProvider;
    use crate::recommend::Recommender;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use mingle_shared::clients::store::{collections, encode_fields, DocumentStore, MemoryStore};
    use mingle_shared::middleware::sign_token;
    use mingle_shared::models::{Post, UserProfile};
    use mingle_shared::types::auth::Claims;
    use tower::ServiceExt;

    async fn app() -> axum::Router {
        let store = Arc::new(MemoryStore::new());
        let viewer = UserProfile {
            username: "me".into(),
            interests: vec!["Music".into()],
            ..UserProfile::default()
        };
        store.set(collections::USERS, "me", encode_fields(&viewer).unwrap()).await.unwrap();
        let owner = UserProfile { username: "ana".into(), city: "Austin".into(), ..UserProfile::default() };
        store.set(collections::USERS, "ana", encode_fields(&owner).unwrap()).await.unwrap();
        let post = Post {
            owner_id: "ana".into(),
            tags: vec!["Music".into()],
            description: "Summer tour".into(),
            ..Post::default()
        };
        store.set(collections::POSTS, "p1", encode_fields(&post).unwrap()).await.unwrap();

        let config = AppConfig::default();
        let recommender = Recommender::new(store.clone(), Arc::new(StubProvider::default()), &config);
        crate::router(Arc::new(AppState {
            config,
            store,
            recommender,
            metrics_handle: None,
        }))
    }

    fn get(uri: &str) -> Request<Body> {
        let token = sign_token(&Claims::new("me", None, 3600)).unwrap();
        Request::builder()
            .uri(uri)
            .header("Authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    async fn json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn post_search_returns_scored_posts() {
        let response = app().await.oneshot(get("/feed/posts?q=tour&city=aus")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"][0]["id"], "p1");
        assert_eq!(body["data"][0]["ownerId"], "ana");
        assert_eq!(body["data"][0]["trending"], false);
        assert!(body["data"][0]["score"].as_f64().unwrap() >= 15.0);
    }

    #[tokio::test]
    async fn restrictive_filter_empties_results() {
        let response = app().await.oneshot(get("/feed/posts?city=dallas")).await.unwrap();
        let body = json(response).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn user_search_lists_other_people() {
        let response = app().await.oneshot(get("/feed/users?interests=")).await.unwrap();
        let body = json(response).await;
        let users = body["data"].as_array().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0]["username"], "ana");
    }

    #[tokio::test]
    async fn invalid_age_is_rejected() {
        let response = app().await.oneshot(get("/feed/users?age_min=abc")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json(response).await;
        assert_eq!(body["error"]["code"], "E3001");
    }

    #[tokio::test]
    async fn requires_authentication() {
        let request = Request::builder().uri("/feed/posts").body(Body::empty()).unwrap();
        let response = app().await.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
