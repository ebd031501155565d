//! Search filters and heuristic relevance ranking for the feed screen.

pub mod cache;
pub mod candidates;
pub mod embedder;
pub mod filters;
pub mod owners;
pub mod scoring;
pub mod similarity;

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use metrics::histogram;
use serde::Serialize;

use mingle_shared::clients::embeddings::EmbeddingProvider;
use mingle_shared::clients::store::{collections, DocumentStore, DocumentStoreExt};
use mingle_shared::models::{Post, UserProfile};
use mingle_shared::{AppError, AppResult, ErrorCode};

use crate::config::AppConfig;
use embedder::Embedder;
use filters::FeedFilters;
use owners::OwnerDirectory;
use scoring::{PostWeights, UserWeights};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedPost {
    #[serde(flatten)]
    pub post: Post,
    pub score: f64,
    pub trending: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedUser {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub score: f64,
}

pub struct Recommender {
    store: Arc<dyn DocumentStore>,
    embedder: Embedder,
    owners: OwnerDirectory,
    post_weights: PostWeights,
    user_weights: UserWeights,
    post_limit: usize,
    user_limit: usize,
}

fn by_score_desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

impl Recommender {
    pub fn new(store: Arc<dyn DocumentStore>, embeddings: Arc<dyn EmbeddingProvider>, config: &AppConfig) -> Self {
        Self {
            embedder: Embedder::new(embeddings, config.embedding_cache_capacity, config.embedding_dimensions),
            owners: OwnerDirectory::new(store.clone(), config.profile_cache_capacity),
            store,
            post_weights: PostWeights::default(),
            user_weights: UserWeights::default(),
            post_limit: config.post_candidate_limit,
            user_limit: config.user_candidate_limit,
        }
    }

    async fn viewer(&self, uid: &str) -> AppResult<UserProfile> {
        self.store
            .get_as::<UserProfile>(collections::USERS, uid)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "create your profile before searching"))
    }

    /// Full post search for a signed-in user: candidates, filters, ranking.
    pub async fn search_posts(&self, uid: &str, filters: &FeedFilters) -> AppResult<Vec<RankedPost>> {
        let viewer = self.viewer(uid).await?;
        let Some(query) = candidates::post_candidates(&viewer, self.post_limit) else {
            return Ok(Vec::new());
        };
        let posts: Vec<Post> = self.store.query_as_lossy(&query).await?;
        Ok(self.rank_posts(&viewer, posts, filters).await)
    }

    /// Full people search for a signed-in user.
    pub async fn search_users(&self, uid: &str, filters: &FeedFilters) -> AppResult<Vec<RankedUser>> {
        let viewer = self.viewer(uid).await?;
        let Some(query) = candidates::user_candidates(&viewer, self.user_limit) else {
            return Ok(Vec::new());
        };
        let users: Vec<UserProfile> = self.store.query_as_lossy(&query).await?;
        Ok(self.rank_users(&viewer, users, filters).await)
    }

    pub async fn rank_posts(&self, viewer: &UserProfile, candidates: Vec<Post>, filters: &FeedFilters) -> Vec<RankedPost> {
        let started = Instant::now();
        let total = candidates.len();

        let owners = self
            .owners
            .resolve_many(candidates.iter().map(|p| p.owner_id.as_str()))
            .await;

        let kept: Vec<Post> = candidates
            .into_iter()
            .filter(|p| filters.post_matches(p, owners.get(&p.owner_id), &viewer.id))
            .collect();

        let bio = viewer.short_description.as_str();
        if !bio.trim().is_empty() {
            let mut texts: Vec<String> = kept
                .iter()
                .filter(|p| !p.description.trim().is_empty())
                .map(|p| p.description.clone())
                .collect();
            texts.push(bio.to_string());
            self.embedder.warm(texts).await;
        }

        let scores = join_all(kept.iter().map(|post| {
            let owner = owners.get(&post.owner_id);
            async move {
                let base = scoring::post_base_score(post, owner, viewer, filters, &self.post_weights);
                let similarity = self.embedder.similarity(&post.description, bio).await;
                scoring::post_score(base, similarity, &self.post_weights)
            }
        }))
        .await;

        let mut ranked: Vec<RankedPost> = kept
            .into_iter()
            .zip(scores)
            .map(|(post, score)| RankedPost {
                trending: post.is_trending(),
                post,
                score,
            })
            .collect();
        ranked.sort_by(|a, b| by_score_desc(a.score, b.score));

        histogram!("mingle_feed_rank_duration_seconds", "kind" => "posts").record(started.elapsed().as_secs_f64());
        tracing::debug!(candidates = total, kept = ranked.len(), "posts ranked");
        ranked
    }

    pub async fn rank_users(
        &self,
        viewer: &UserProfile,
        candidates: Vec<UserProfile>,
        filters: &FeedFilters,
    ) -> Vec<RankedUser> {
        let started = Instant::now();
        let total = candidates.len();

        let kept: Vec<UserProfile> = candidates
            .into_iter()
            .filter(|u| filters.user_matches(u, viewer))
            .collect();

        let bio = viewer.short_description.as_str();
        if !bio.trim().is_empty() {
            let mut texts: Vec<String> = kept
                .iter()
                .filter(|u| !u.short_description.trim().is_empty())
                .map(|u| u.short_description.clone())
                .collect();
            texts.push(bio.to_string());
            self.embedder.warm(texts).await;
        }

        let scores = join_all(kept.iter().map(|user| async move {
            let base = scoring::user_base_score(user, viewer, &self.user_weights);
            let similarity = self.embedder.similarity(&user.short_description, bio).await;
            scoring::user_score(base, similarity, &self.user_weights)
        }))
        .await;

        let mut ranked: Vec<RankedUser> = kept
            .into_iter()
            .zip(scores)
            .map(|(profile, score)| RankedUser { profile, score })
            .collect();
        ranked.sort_by(|a, b| by_score_desc(a.score, b.score));

        histogram!("mingle_feed_rank_duration_seconds", "kind" => "users").record(started.elapsed().as_secs_f64());
        tracing::debug!(candidates = total, kept = ranked.len(), "users ranked");
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommend::embedder::tests::StubProvider;
    use mingle_shared::clients::store::{encode_fields, MemoryStore};

    async fn seed_user(store: &MemoryStore, id: &str, profile: UserProfile) {
        store
            .set(collections::USERS, id, encode_fields(&profile).unwrap())
            .await
            .unwrap();
    }

    async fn seed_post(store: &MemoryStore, id: &str, post: Post) {
        store
            .set(collections::POSTS, id, encode_fields(&post).unwrap())
            .await
            .unwrap();
    }

    fn recommender(store: Arc<MemoryStore>, provider: Arc<StubProvider>) -> Recommender {
        Recommender::new(store, provider, &AppConfig::default())
    }

    fn viewer() -> UserProfile {
        UserProfile {
            username: "me".into(),
            city: "Austin".into(),
            interests: vec!["Music".into(), "Travel".into()],
            short_description: "I love live music and touring".into(),
            ..UserProfile::default()
        }
    }

    #[tokio::test]
    async fn search_posts_filters_ranks_and_flags_trending() {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(StubProvider::default());
        seed_user(&store, "me", viewer()).await;
        seed_user(&store, "austin", UserProfile { city: "Austin".into(), ..UserProfile::default() }).await;
        seed_user(&store, "dallas", UserProfile { city: "Dallas".into(), ..UserProfile::default() }).await;

        seed_post(&store, "p-own", Post { owner_id: "me".into(), tags: vec!["Music".into()], ..Post::default() }).await;
        seed_post(&store, "p-food", Post { owner_id: "austin".into(), tags: vec!["Food".into()], ..Post::default() }).await;
        seed_post(&store, "p-dallas", Post {
            owner_id: "dallas".into(),
            tags: vec!["Music".into()],
            likes: (0..21).map(|i| format!("u{i}")).collect(),
            ..Post::default()
        })
        .await;
        seed_post(&store, "p-austin", Post { owner_id: "austin".into(), tags: vec!["Music".into()], ..Post::default() }).await;

        let ranked = recommender(store, provider)
            .search_posts("me", &FeedFilters::default())
            .await
            .unwrap();

        let ids: Vec<&str> = ranked.iter().map(|r| r.post.id.as_str()).collect();
        // dallas: 15 + 21 * 0.5 = 25.5; austin: 15 + 20 = 35; both + 0.5 * 100 for empty descriptions.
        assert_eq!(ids, vec!["p-austin", "p-dallas"]);
        assert_eq!(ranked[0].score, 85.0);
        assert!(ranked[1].trending);
        assert!(!ranked[0].trending);
    }

    #[tokio::test]
    async fn ranking_warms_embeddings_in_one_request() {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(StubProvider::default());
        let rec = recommender(store, provider.clone());
        let posts = vec![
            Post { id: "a".into(), owner_id: "x".into(), description: "tour dates".into(), ..Post::default() },
            Post { id: "b".into(), owner_id: "y".into(), description: "tour dates".into(), ..Post::default() },
            Post { id: "c".into(), owner_id: "z".into(), description: "cooking".into(), ..Post::default() },
        ];
        let ranked = rec.rank_posts(&viewer(), posts, &FeedFilters::default()).await;
        assert_eq!(ranked.len(), 3);

        let calls = provider.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].len(), 3);

        // Same texts again: fully cached.
        let again = vec![Post { id: "d".into(), owner_id: "x".into(), description: "cooking".into(), ..Post::default() }];
        rec.rank_posts(&viewer(), again, &FeedFilters::default()).await;
        assert_eq!(provider.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn equal_scores_keep_candidate_order() {
        let store = Arc::new(MemoryStore::new());
        let rec = recommender(store, Arc::new(StubProvider::default()));
        let posts: Vec<Post> = ["first", "second", "third"]
            .iter()
            .map(|id| Post { id: id.to_string(), owner_id: "x".into(), ..Post::default() })
            .collect();
        let ranked = rec.rank_posts(&viewer(), posts, &FeedFilters::default()).await;
        let ids: Vec<&str> = ranked.iter().map(|r| r.post.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn embedding_outage_does_not_fail_the_search() {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(StubProvider { fail: true, ..StubProvider::default() });
        let rec = recommender(store, provider);
        let posts = vec![Post { owner_id: "x".into(), description: "tour".into(), tags: vec!["Music".into()], ..Post::default() }];
        let ranked = rec.rank_posts(&viewer(), posts, &FeedFilters::default()).await;
        assert_eq!(ranked[0].score, 15.0);
    }

    #[tokio::test]
    async fn search_users_excludes_viewer_and_ranks_shared_interests() {
        let store = Arc::new(MemoryStore::new());
        seed_user(&store, "me", viewer()).await;
        seed_user(&store, "u1", UserProfile {
            username: "ana".into(),
            interests: vec!["Music".into()],
            ..UserProfile::default()
        })
        .await;
        seed_user(&store, "u2", UserProfile {
            username: "bob".into(),
            interests: vec!["Music".into(), "Travel".into()],
            city: "austin".into(),
            ..UserProfile::default()
        })
        .await;

        let ranked = recommender(store, Arc::new(StubProvider::default()))
            .search_users("me", &FeedFilters::default())
            .await
            .unwrap();
        let names: Vec<&str> = ranked.iter().map(|r| r.profile.username.as_str()).collect();
        assert_eq!(names, vec!["bob", "ana"]);
        assert_eq!(ranked[0].score, 30.0 + 20.0 + 50.0);
    }

    #[tokio::test]
    async fn undecodable_candidates_are_skipped() {
        let store = Arc::new(MemoryStore::new());
        seed_user(&store, "me", viewer()).await;
        seed_user(&store, "austin", UserProfile { city: "Austin".into(), ..UserProfile::default() }).await;
        seed_post(&store, "good", Post { owner_id: "austin".into(), tags: vec!["Music".into()], ..Post::default() }).await;
        let mut broken = encode_fields(&Post { owner_id: "austin".into(), tags: vec!["Music".into()], ..Post::default() }).unwrap();
        broken.insert("mediaType".into(), serde_json::json!("gif"));
        store.set(collections::POSTS, "broken", broken).await.unwrap();

        let ranked = recommender(store, Arc::new(StubProvider::default()))
            .search_posts("me", &FeedFilters::default())
            .await
            .unwrap();
        let ids: Vec<&str> = ranked.iter().map(|r| r.post.id.as_str()).collect();
        assert_eq!(ids, vec!["good"]);
    }

    #[tokio::test]
    async fn missing_viewer_profile_is_reported() {
        let rec = recommender(Arc::new(MemoryStore::new()), Arc::new(StubProvider::default()));
        let err = rec.search_posts("ghost", &FeedFilters::default()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ProfileNotFound);
    }
}
