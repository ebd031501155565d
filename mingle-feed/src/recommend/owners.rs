use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Mutex;

use mingle_shared::clients::store::{collections, DocumentStore, DocumentStoreExt};
use mingle_shared::models::UserProfile;

use super::cache::ProfileCache;

/// Resolves post owners to profiles through a bounded cache. Only found
/// profiles are cached; lookups that fail count as unknown owners.
pub struct OwnerDirectory {
    store: Arc<dyn DocumentStore>,
    cache: Mutex<ProfileCache>,
}

impl OwnerDirectory {
    pub fn new(store: Arc<dyn DocumentStore>, capacity: usize) -> Self {
        Self {
            store,
            cache: Mutex::new(ProfileCache::new(capacity)),
        }
    }

    pub async fn resolve(&self, uid: &str) -> Option<UserProfile> {
        if let Some(profile) = self.cache.lock().await.get(&uid.to_string()) {
            return Some(profile.clone());
        }

        match self.store.get_as::<UserProfile>(collections::USERS, uid).await {
            Ok(Some(profile)) => {
                self.cache.lock().await.insert(uid.to_string(), profile.clone());
                Some(profile)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, uid = %uid, "owner lookup failed");
                None
            }
        }
    }

    /// Resolve every distinct id concurrently. Unknown owners are absent
    /// from the result.
    pub async fn resolve_many<'a>(&self, uids: impl IntoIterator<Item = &'a str>) -> HashMap<String, UserProfile> {
        let mut seen = HashSet::new();
        let distinct: Vec<&str> = uids.into_iter().filter(|u| seen.insert(*u)).collect();
        let resolved = join_all(distinct.iter().map(|uid| self.resolve(uid))).await;
        distinct
            .into_iter()
            .zip(resolved)
            .filter_map(|(uid, profile)| profile.map(|p| (uid.to_string(), p)))
            .collect()
    }
}
