//! Image store rooted at a local directory.
use super::{ImageError, ImageResult, ImageStore, check_key, decode_image, encode_image, image_key};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub struct LocalImageStore {
    root: PathBuf,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> ImageResult<PathBuf> {
        check_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn upload(&self, folder: &str, name: &str, data: &str) -> ImageResult<String> {
        let bytes = decode_image(data)?;
        let key = image_key(folder, name)?;
        let path = self.path_for(&key)?;
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(%key, "stored image");
        Ok(key)
    }

    async fn download(&self, key: &str) -> ImageResult<String> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(encode_image(&bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(ImageError::NotFound(key.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn delete(&self, key: &str) -> ImageResult<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}
