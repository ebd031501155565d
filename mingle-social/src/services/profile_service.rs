use serde::Deserialize;
use validator::Validate;

use mingle_shared::clients::blob::BlobStorage;
use mingle_shared::clients::store::{collections, encode_fields, DocumentStore, DocumentStoreExt, FieldUpdate};
use mingle_shared::errors::{AppError, AppResult, ErrorCode};
use mingle_shared::models::{split_csv, MediaType, ProfileType, UserProfile};

use super::post_service::{self, MediaUpload};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    #[serde(default)]
    pub profile_type: ProfileType,
    pub email: Option<String>,
}

/// A list field sent either as an array or as the comma separated text the
/// profile form collects.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListInput {
    List(Vec<String>),
    Csv(String),
}

impl ListInput {
    fn into_vec(self) -> Vec<String> {
        match self {
            ListInput::List(items) => items
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            ListInput::Csv(raw) => split_csv(&raw),
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfile {
    pub profile_type: Option<ProfileType>,
    #[validate(length(max = 100))]
    pub full_name: Option<String>,
    #[validate(length(min = 1, max = 30))]
    pub username: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(max = 100))]
    pub state: Option<String>,
    #[validate(length(max = 20))]
    pub zip_code: Option<String>,
    #[validate(range(max = 150))]
    pub age: Option<u32>,
    #[validate(length(max = 50))]
    pub gender: Option<String>,
    pub interests: Option<ListInput>,
    pub services_offered: Option<ListInput>,
    #[validate(length(max = 100))]
    pub business_name: Option<String>,
    #[validate(length(max = 30))]
    pub business_phone: Option<String>,
    #[validate(email)]
    pub business_email: Option<String>,
    #[validate(length(max = 500))]
    pub short_description: Option<String>,
}

impl UpdateProfile {
    fn into_updates(self) -> AppResult<Vec<(String, FieldUpdate)>> {
        let mut updates = Vec::new();
        let mut text = |field: &str, value: Option<String>| -> AppResult<()> {
            if let Some(v) = value {
                updates.push((field.to_string(), FieldUpdate::set(v.trim())?));
            }
            Ok(())
        };
        text("fullName", self.full_name)?;
        text("username", self.username)?;
        text("city", self.city)?;
        text("state", self.state)?;
        text("zipCode", self.zip_code)?;
        text("gender", self.gender)?;
        text("businessName", self.business_name)?;
        text("businessPhone", self.business_phone)?;
        text("businessEmail", self.business_email)?;
        text("shortDescription", self.short_description)?;

        if let Some(profile_type) = self.profile_type {
            updates.push(("profileType".to_string(), FieldUpdate::set(profile_type)?));
        }
        if let Some(age) = self.age {
            updates.push(("age".to_string(), FieldUpdate::set(age)?));
        }
        if let Some(interests) = self.interests {
            updates.push(("interests".to_string(), FieldUpdate::set(interests.into_vec())?));
        }
        if let Some(services) = self.services_offered {
            updates.push(("servicesOffered".to_string(), FieldUpdate::set(services.into_vec())?));
        }
        Ok(updates)
    }
}

pub async fn load(store: &dyn DocumentStore, user_id: &str) -> AppResult<UserProfile> {
    store
        .get_as(collections::USERS, user_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))
}

/// Write the sign-up document for `user_id`. Fails with a conflict when the
/// account already has one.
pub async fn create_account(
    store: &dyn DocumentStore,
    user_id: &str,
    token_email: Option<&str>,
    req: CreateAccountRequest,
) -> AppResult<UserProfile> {
    let email = req
        .email
        .as_deref()
        .or(token_email)
        .map(str::trim)
        .unwrap_or_default()
        .to_string();

    let profile = UserProfile::new_account(user_id, email, req.profile_type);
    let doc = store
        .create(collections::USERS, Some(user_id), encode_fields(&profile)?)
        .await?;

    tracing::info!(user_id = %user_id, profile_type = ?req.profile_type, "account created");
    Ok(doc.decode()?)
}

pub async fn get_own(store: &dyn DocumentStore, user_id: &str) -> AppResult<UserProfile> {
    load(store, user_id).await
}

/// Another user's profile as the profile screen shows it.
pub async fn get_public(store: &dyn DocumentStore, user_id: &str) -> AppResult<UserProfile> {
    Ok(load(store, user_id).await?.with_display_defaults())
}

pub async fn update_own(store: &dyn DocumentStore, user_id: &str, req: UpdateProfile) -> AppResult<UserProfile> {
    req.validate()?;
    let current = load(store, user_id).await?;

    let updates = req.into_updates()?;
    if updates.is_empty() {
        return Ok(current);
    }

    let fields: Vec<&str> = updates.iter().map(|(f, _)| f.as_str()).collect();
    tracing::debug!(user_id = %user_id, fields = ?fields, "updating profile");

    let doc = store.update(collections::USERS, user_id, updates).await?;
    Ok(doc.decode()?)
}

pub async fn upload_picture(
    store: &dyn DocumentStore,
    blobs: &dyn BlobStorage,
    user_id: &str,
    media: MediaUpload,
) -> AppResult<UserProfile> {
    if MediaType::from_content_type(&media.content_type) != Some(MediaType::Image) {
        return Err(AppError::new(ErrorCode::UnsupportedMedia, "profile pictures must be images"));
    }
    load(store, user_id).await?;

    let url = post_service::upload_media(blobs, "profile_pictures", user_id, media).await?;
    let doc = store
        .update(collections::USERS, user_id, vec![("profilePicture".to_string(), FieldUpdate::set(&url)?)])
        .await?;

    tracing::info!(user_id = %user_id, "profile picture updated");
    Ok(doc.decode()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mingle_shared::clients::blob::MemoryBlobStorage;
    use mingle_shared::clients::store::MemoryStore;
    use mingle_shared::models::PLACEHOLDER_PICTURE;

    #[tokio::test]
    async fn create_account_uses_token_email_as_fallback() {
        let store = MemoryStore::new();
        let profile = create_account(&store, "u1", Some("u1@example.com"), CreateAccountRequest::default())
            .await
            .unwrap();
        assert_eq!(profile.id, "u1");
        assert_eq!(profile.email, "u1@example.com");
        assert_eq!(profile.profile_type, ProfileType::Personal);
        assert!(profile.interests.is_empty());

        let req = CreateAccountRequest { profile_type: ProfileType::Business, email: Some("biz@example.com".into()) };
        let profile = create_account(&store, "u2", Some("ignored@example.com"), req).await.unwrap();
        assert_eq!(profile.email, "biz@example.com");
        assert!(!profile.is_personal());
    }

    #[tokio::test]
    async fn second_account_creation_conflicts() {
        let store = MemoryStore::new();
        create_account(&store, "u1", None, CreateAccountRequest::default()).await.unwrap();
        let err = create_account(&store, "u1", None, CreateAccountRequest::default()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn partial_update_touches_only_given_fields() {
        let store = MemoryStore::new();
        create_account(&store, "u1", Some("u1@example.com"), CreateAccountRequest::default()).await.unwrap();

        let req: UpdateProfile = serde_json::from_value(serde_json::json!({
            "fullName": " Ada Lovelace ",
            "city": "Austin",
            "age": 36,
            "interests": "Music, Travel,",
            "servicesOffered": ["Tutoring"]
        }))
        .unwrap();
        let profile = update_own(&store, "u1", req).await.unwrap();

        assert_eq!(profile.full_name, "Ada Lovelace");
        assert_eq!(profile.city, "Austin");
        assert_eq!(profile.age, Some(36));
        assert_eq!(profile.interests, vec!["Music", "Travel"]);
        assert_eq!(profile.services_offered, vec!["Tutoring"]);
        assert_eq!(profile.email, "u1@example.com");
    }

    #[tokio::test]
    async fn invalid_update_is_rejected() {
        let store = MemoryStore::new();
        create_account(&store, "u1", None, CreateAccountRequest::default()).await.unwrap();
        let req = UpdateProfile { business_email: Some("not-an-email".into()), ..UpdateProfile::default() };
        let err = update_own(&store, "u1", req).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn public_profile_fills_display_defaults() {
        let store = MemoryStore::new();
        create_account(&store, "u1", None, CreateAccountRequest::default()).await.unwrap();
        let profile = get_public(&store, "u1").await.unwrap();
        assert_eq!(profile.full_name, "User Name");
        assert_eq!(profile.profile_picture, PLACEHOLDER_PICTURE);

        let err = get_public(&store, "ghost").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ProfileNotFound);
    }

    #[tokio::test]
    async fn picture_upload_accepts_images_only() {
        let store = MemoryStore::new();
        let blobs = MemoryBlobStorage::new();
        create_account(&store, "u1", None, CreateAccountRequest::default()).await.unwrap();

        let video = MediaUpload { content_type: "video/mp4".into(), file_name: None, bytes: vec![1] };
        let err = upload_picture(&store, &blobs, "u1", video).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnsupportedMedia);

        let png = MediaUpload { content_type: "image/png".into(), file_name: None, bytes: vec![1] };
        let profile = upload_picture(&store, &blobs, "u1", png).await.unwrap();
        assert!(profile.profile_picture.starts_with("memory://profile_pictures/u1/"));
        assert!(profile.profile_picture.ends_with(".png"));
    }
}
