use mentora_shared::clients::{BucketSpec, StorageClient};
use mentora_shared::errors::AppResult;
use mentora_shared::types::Session;

const MB: u64 = 1024 * 1024;

/// Buckets the app expects to exist.
pub fn default_buckets() -> Vec<BucketSpec> {
    vec![
        BucketSpec::new("avatars", true)
            .with_size_limit(5 * MB)
            .with_mime_types(["image/jpeg", "image/png", "image/webp"]),
        BucketSpec::new("pitch-decks", false)
            .with_size_limit(20 * MB)
            .with_mime_types(["application/pdf"]),
        BucketSpec::new("post-media", true)
            .with_size_limit(50 * MB)
            .with_mime_types(["image/jpeg", "image/png", "image/webp", "video/mp4"]),
    ]
}

/// Create any missing buckets. Safe to run on every startup; existing
/// buckets are left untouched.
pub async fn provision_buckets(storage: &StorageClient, session: &Session) -> AppResult<()> {
    for spec in default_buckets() {
        storage.ensure_bucket(session, &spec).await?;
    }
    tracing::info!("storage buckets provisioned");
    Ok(())
}
