//! Purpose: In-memory stand-in for bucket storage (upload, download, URLs).
//! Exports: `StorageApi`, `Bucket`, `StorageObject`.
//! Role: Keeps uploaded bytes in the shared store so reads see prior writes.
//! Invariants: Buckets appear implicitly on first upload; uploads overwrite silently.
//! Invariants: Public URLs are deterministic functions of bucket and path.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::defer;
use crate::core::error::{Error, ErrorKind};
use crate::core::store::Store;

#[derive(Clone, Debug)]
pub struct StorageApi {
    store: Arc<Store>,
}

impl StorageApi {
    pub(crate) fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn from(&self, bucket: impl Into<String>) -> Bucket {
        Bucket {
            store: Arc::clone(&self.store),
            name: bucket.into(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct StorageObject {
    pub name: String,
    pub size: usize,
}

#[derive(Clone, Debug)]
pub struct Bucket {
    store: Arc<Store>,
    name: String,
}

impl Bucket {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store bytes under `path` and return the stored path. Existing objects
    /// are overwritten; the fixture performs no validation.
    pub async fn upload(&self, path: &str, bytes: impl Into<Vec<u8>>) -> Result<String, Error> {
        defer().await;
        let bytes = bytes.into();
        tracing::debug!(bucket = %self.name, path, size = bytes.len(), "upload");
        self.store.put_object(&self.name, path, bytes);
        Ok(path.to_string())
    }

    pub async fn download(&self, path: &str) -> Result<Vec<u8>, Error> {
        defer().await;
        self.store.get_object(&self.name, path).ok_or_else(|| {
            Error::new(ErrorKind::NotFound)
                .with_message(format!("no object at {path}"))
                .with_hint(format!("Upload to bucket `{}` first.", self.name))
        })
    }

    /// Deterministic pseudo-URL for the object; the real service returns a
    /// CDN address here. No existence check, matching the hosted behavior.
    pub fn get_public_url(&self, path: &str) -> String {
        format!("understudy://storage/{}/{path}", self.name)
    }

    pub async fn list(&self) -> Result<Vec<StorageObject>, Error> {
        defer().await;
        let objects = self
            .store
            .list_objects(&self.name)
            .into_iter()
            .map(|name| {
                let size = self
                    .store
                    .get_object(&self.name, &name)
                    .map(|bytes| bytes.len())
                    .unwrap_or(0);
                StorageObject { name, size }
            })
            .collect();
        Ok(objects)
    }
}

#[cfg(test)]
mod tests {
    use super::StorageApi;
    use crate::core::error::ErrorKind;
    use crate::core::store::Store;
    use std::sync::Arc;

    #[tokio::test]
    async fn upload_then_download_round_trips() {
        let storage = StorageApi::new(Arc::new(Store::new()));
        let bucket = storage.from("drawings");
        let path = bucket.upload("site/a.pdf", b"pdf".to_vec()).await.expect("upload");
        assert_eq!(path, "site/a.pdf");
        let bytes = bucket.download("site/a.pdf").await.expect("download");
        assert_eq!(bytes, b"pdf");
    }

    #[tokio::test]
    async fn download_of_missing_object_is_not_found() {
        let storage = StorageApi::new(Arc::new(Store::new()));
        let err = storage
            .from("drawings")
            .download("nope.pdf")
            .await
            .expect_err("missing");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn public_url_is_deterministic_without_existence_check() {
        let storage = StorageApi::new(Arc::new(Store::new()));
        let bucket = storage.from("drawings");
        assert_eq!(
            bucket.get_public_url("site/a.pdf"),
            "understudy://storage/drawings/site/a.pdf"
        );
    }

    #[tokio::test]
    async fn list_reports_names_and_sizes() {
        let storage = StorageApi::new(Arc::new(Store::new()));
        let bucket = storage.from("drawings");
        bucket.upload("b.pdf", b"xy".to_vec()).await.expect("upload");
        bucket.upload("a.pdf", b"x".to_vec()).await.expect("upload");
        let objects = bucket.list().await.expect("list");
        let names: Vec<_> = objects.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["a.pdf", "b.pdf"]);
        assert_eq!(objects[1].size, 2);
    }
}
