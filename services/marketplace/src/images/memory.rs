use super::{ImageError, ImageResult, ImageStore, check_key, decode_image, encode_image, image_key};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryImageStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }
}

#[async_trait]
impl ImageStore for InMemoryImageStore {
    async fn upload(&self, folder: &str, name: &str, data: &str) -> ImageResult<String> {
        let bytes = decode_image(data)?;
        let key = image_key(folder, name)?;
        self.blobs.write().await.insert(key.clone(), bytes);
        Ok(key)
    }

    async fn download(&self, key: &str) -> ImageResult<String> {
        check_key(key)?;
        self.blobs
            .read()
            .await
            .get(key)
            .map(|bytes| encode_image(bytes))
            .ok_or_else(|| ImageError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> ImageResult<()> {
        check_key(key)?;
        self.blobs.write().await.remove(key);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
