use super::{BlobStore, ByteStream};
use crate::error::BlobError;
use async_trait::async_trait;
use futures_util::StreamExt;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Deterministic in-memory blob store for tests.
///
/// Presigned URLs are `memory://{op}/{key}?ttl={secs}`: stable strings a
/// test can assert against without a signer.
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).map(|(b, _)| b.clone())
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Simulate a client completing a presigned PUT.
    pub fn insert(&self, key: &str, bytes: Vec<u8>, content_type: &str) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_owned(), (bytes, content_type.to_owned()));
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), BlobError> {
        self.insert(key, bytes, content_type);
        Ok(())
    }

    async fn put_object_stream(
        &self,
        key: &str,
        mut stream: ByteStream,
        _size: u64,
        content_type: &str,
    ) -> Result<(), BlobError> {
        let mut bytes = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| BlobError::new("put", key, e.to_string()))?;
            bytes.extend_from_slice(&chunk);
        }
        self.insert(key, bytes, content_type);
        Ok(())
    }

    async fn head_object(&self, key: &str) -> Result<bool, BlobError> {
        Ok(self.contains(key))
    }

    async fn delete_object(&self, key: &str) {
        self.objects.lock().unwrap().remove(key);
    }

    fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, BlobError> {
        Ok(format!("memory://get/{key}?ttl={}", ttl.as_secs()))
    }

    fn presign_put(
        &self,
        key: &str,
        _content_type: &str,
        ttl: Duration,
    ) -> Result<String, BlobError> {
        Ok(format!("memory://put/{key}?ttl={}", ttl.as_secs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    #[tokio::test]
    async fn put_then_head() {
        let store = MemoryBlobStore::new();
        assert!(!store.head_object("a/b").await.unwrap());
        store.put_object("a/b", b"video".to_vec(), "video/mp4").await.unwrap();
        assert!(store.head_object("a/b").await.unwrap());
        assert_eq!(store.object("a/b").unwrap(), b"video");
    }

    #[tokio::test]
    async fn stream_put_concatenates_chunks() {
        let store = MemoryBlobStore::new();
        let chunks: ByteStream =
            Box::pin(stream::iter(vec![Ok(b"ab".to_vec()), Ok(b"cd".to_vec())]));
        store
            .put_object_stream("s/key", chunks, 4, "video/webm")
            .await
            .unwrap();
        assert_eq!(store.object("s/key").unwrap(), b"abcd");
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryBlobStore::new();
        store.put_object("k", vec![1], "application/octet-stream").await.unwrap();
        store.delete_object("k").await;
        store.delete_object("k").await;
        assert!(!store.contains("k"));
    }

    #[test]
    fn presigned_urls_are_deterministic() {
        let store = MemoryBlobStore::new();
        let url = store.presign_get("a/b", Duration::from_secs(60)).unwrap();
        assert_eq!(url, "memory://get/a/b?ttl=60");
    }
}
