//! Blob store gateway.
//!
//! Entity rows hold object keys, never URLs; presigned URLs are minted at
//! the DTO boundary with a short validity window. The production binding
//! signs SigV4 requests itself; tests use the deterministic in-memory store.

pub mod keys;
mod memory;
mod s3;

pub use memory::MemoryBlobStore;
pub use s3::S3BlobStore;

use crate::error::BlobError;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use std::time::Duration;

pub type ByteStream = BoxStream<'static, std::io::Result<Vec<u8>>>;

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), BlobError>;

    async fn put_object_stream(
        &self,
        key: &str,
        stream: ByteStream,
        size: u64,
        content_type: &str,
    ) -> Result<(), BlobError>;

    /// Existence check. `Ok(false)` is "definitely absent"; transport
    /// problems surface as `Err`.
    async fn head_object(&self, key: &str) -> Result<bool, BlobError>;

    /// Best-effort: deletes are janitorial, so failures are logged by the
    /// implementation and swallowed.
    async fn delete_object(&self, key: &str);

    fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, BlobError>;

    fn presign_put(&self, key: &str, content_type: &str, ttl: Duration)
        -> Result<String, BlobError>;
}
