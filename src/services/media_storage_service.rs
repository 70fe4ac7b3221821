use anyhow::{Context, Result};
use aws_sdk_s3::{primitives::ByteStream, Client as S3Client};
use tracing::info;
use uuid::Uuid;

/// What an uploaded file is attached to; decides the key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    ProfilePicture,
    ExerciseVideo,
}

impl MediaKind {
    fn prefix(&self) -> &'static str {
        match self {
            MediaKind::ProfilePicture => "pictures",
            MediaKind::ExerciseVideo => "videos",
        }
    }

    /// Whether a content type is accepted for this kind of media.
    pub fn accepts(&self, content_type: &str) -> bool {
        match self {
            MediaKind::ProfilePicture => content_type.starts_with("image/"),
            MediaKind::ExerciseVideo => content_type.starts_with("video/"),
        }
    }
}

/// Service for profile pictures and exercise videos in S3-compatible storage
#[derive(Clone)]
pub struct MediaStorageService {
    client: S3Client,
    bucket_name: String,
}

impl MediaStorageService {
    pub fn new(client: S3Client, bucket_name: String) -> Self {
        Self { client, bucket_name }
    }

    /// Client configured from the standard AWS environment.
    pub async fn from_env(bucket_name: String) -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest()).load().await;
        Self::new(S3Client::new(&config), bucket_name)
    }

    /// Upload a file and return its storage key
    pub async fn upload(
        &self,
        kind: MediaKind,
        owner_id: Uuid,
        file_data: Vec<u8>,
        content_type: &str,
    ) -> Result<String> {
        let storage_key = generate_storage_key(kind, owner_id, Uuid::new_v4(), content_type);

        info!(
            "Uploading media to storage: bucket={}, key={}, size={}",
            self.bucket_name,
            storage_key,
            file_data.len()
        );

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&storage_key)
            .body(ByteStream::from(file_data))
            .content_type(content_type)
            .send()
            .await
            .context("Failed to upload media to S3")?;

        info!("Successfully uploaded media: {}", storage_key);
        Ok(storage_key)
    }

    pub async fn delete(&self, storage_key: &str) -> Result<()> {
        info!("Deleting media from storage: {}", storage_key);

        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(storage_key)
            .send()
            .await
            .context("Failed to delete media from S3")?;

        Ok(())
    }

    pub fn public_url(&self, storage_key: &str) -> String {
        format!("https://{}.s3.amazonaws.com/{}", self.bucket_name, storage_key)
    }
}

fn generate_storage_key(kind: MediaKind, owner_id: Uuid, file_id: Uuid, content_type: &str) -> String {
    format!(
        "{}/{}/{}.{}",
        kind.prefix(),
        owner_id,
        file_id,
        extract_file_extension(content_type)
    )
}

fn extract_file_extension(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "video/mp4" => "mp4",
        "video/quicktime" => "mov",
        "video/webm" => "webm",
        _ if content_type.starts_with("image/") => "jpg",
        _ => "mp4",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_storage_key() {
        let owner_id = Uuid::new_v4();
        let file_id = Uuid::new_v4();

        let key = generate_storage_key(MediaKind::ProfilePicture, owner_id, file_id, "image/png");
        assert!(key.starts_with("pictures/"));
        assert!(key.contains(&owner_id.to_string()));
        assert!(key.ends_with(&format!("{}.png", file_id)));

        let key = generate_storage_key(MediaKind::ExerciseVideo, owner_id, file_id, "video/quicktime");
        assert!(key.starts_with("videos/"));
        assert!(key.ends_with(".mov"));
    }

    #[test]
    fn test_extract_file_extension() {
        assert_eq!(extract_file_extension("image/jpeg"), "jpg");
        assert_eq!(extract_file_extension("image/heic"), "jpg");
        assert_eq!(extract_file_extension("video/webm"), "webm");
        assert_eq!(extract_file_extension("unknown"), "mp4");
    }

    #[test]
    fn test_media_kind_accepts() {
        assert!(MediaKind::ProfilePicture.accepts("image/png"));
        assert!(!MediaKind::ProfilePicture.accepts("video/mp4"));
        assert!(MediaKind::ExerciseVideo.accepts("video/mp4"));
    }

    #[test]
    fn test_public_url() {
        let config = aws_config::SdkConfig::builder()
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new("us-east-1"))
            .build();
        let service = MediaStorageService::new(S3Client::new(&config), "media-bucket".to_string());
        assert_eq!(
            service.public_url("pictures/a/b.png"),
            "https://media-bucket.s3.amazonaws.com/pictures/a/b.png"
        );
    }
}
