//! Cloud Storage buckets and objects.

pub mod models;

use camino::Utf8Path;
use reqwest::Url;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::info;

use crate::api::{ApiClient, ApiError};
use crate::backend::{BackendFuture, BucketBackend, BucketRequest};
use crate::files;
use models::{Bucket, BucketResource, ListPage, Object};

const UPLOAD_CONTENT_TYPE: &str = "application/octet-stream";

/// Errors raised by the storage client.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum StorageError {
    /// Raised when a bucket or object name is empty.
    #[error("invalid storage request: {0}")]
    Validation(String),
    /// Raised when the local file cannot be read.
    #[error("failed to read {path}: {message}")]
    Io {
        /// Path that could not be read.
        path: String,
        /// Human-readable error message.
        message: String,
    },
    /// Wrapper for API level failures.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Client for Cloud Storage in one project.
#[derive(Clone, Debug)]
pub struct StorageClient {
    api: ApiClient,
    upload: ApiClient,
    project_id: String,
}

impl StorageClient {
    /// Creates a client from the JSON API and upload API roots.
    #[must_use]
    pub fn new(api: ApiClient, upload: ApiClient, project_id: impl Into<String>) -> Self {
        Self {
            api,
            upload,
            project_id: project_id.into(),
        }
    }

    fn require(field: &str, value: &str) -> Result<(), StorageError> {
        if value.trim().is_empty() {
            return Err(StorageError::Validation(field.to_owned()));
        }
        Ok(())
    }

    async fn list_all<T: DeserializeOwned>(&self, base: Url) -> Result<Vec<T>, StorageError> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut url = base.clone();
            if let Some(token) = &page_token {
                url.query_pairs_mut().append_pair("pageToken", token);
            }
            let page: ListPage<T> = self.api.get_json(&url).await?;
            items.extend(page.items);
            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) => page_token = Some(token),
                None => return Ok(items),
            }
        }
    }

    /// Creates a bucket with the requested location and storage class.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Validation`] for an empty name and
    /// [`StorageError::Api`] when the API rejects the bucket.
    pub async fn insert_bucket(&self, request: &BucketRequest) -> Result<Bucket, StorageError> {
        Self::require("bucket name", &request.name)?;
        let mut url = self.api.url(&["b"])?;
        url.query_pairs_mut().append_pair("project", &self.project_id);
        let body = BucketResource {
            name: &request.name,
            location: &request.location,
            storage_class: &request.storage_class,
        };
        let bucket: Bucket = self.api.post_json(&url, &body).await?;
        info!(bucket = %bucket.name, location = %request.location, storage_class = %request.storage_class, "created bucket");
        Ok(bucket)
    }

    /// Lists every bucket in the project.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Api`] when a page cannot be fetched.
    pub async fn buckets(&self) -> Result<Vec<Bucket>, StorageError> {
        let mut url = self.api.url(&["b"])?;
        url.query_pairs_mut().append_pair("project", &self.project_id);
        self.list_all(url).await
    }

    /// Lists every object in a bucket.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Api`] when a page cannot be fetched.
    pub async fn objects(&self, bucket: &str) -> Result<Vec<Object>, StorageError> {
        Self::require("bucket name", bucket)?;
        let url = self.api.url(&["b", bucket, "o"])?;
        self.list_all(url).await
    }

    /// Uploads bytes as an object with a simple media upload.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Api`] when the upload is rejected.
    pub async fn upload_bytes(
        &self,
        bucket: &str,
        object: &str,
        bytes: Vec<u8>,
    ) -> Result<Object, StorageError> {
        Self::require("bucket name", bucket)?;
        Self::require("object name", object)?;
        let mut url = self.upload.url(&["b", bucket, "o"])?;
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", object);
        Ok(self
            .upload
            .post_bytes(&url, UPLOAD_CONTENT_TYPE, bytes)
            .await?)
    }

    /// Object name used when no destination is given: the file name of
    /// `source`.
    #[must_use]
    pub fn default_object_name(source: &Utf8Path) -> String {
        source
            .file_name()
            .map_or_else(|| source.to_string(), str::to_owned)
    }

    /// Deletes an object.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Api`] when the delete is rejected.
    pub async fn remove_object(&self, bucket: &str, object: &str) -> Result<(), StorageError> {
        let url = self.api.url(&["b", bucket, "o", object])?;
        self.api.delete(&url).await?;
        info!(bucket, object, "deleted object");
        Ok(())
    }

    /// Deletes an empty bucket.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Api`] when the delete is rejected, for example
    /// because the bucket still holds objects.
    pub async fn remove_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        Self::require("bucket name", bucket)?;
        let url = self.api.url(&["b", bucket])?;
        self.api.delete(&url).await?;
        info!(bucket, "deleted bucket");
        Ok(())
    }
}

impl BucketBackend for StorageClient {
    type Error = StorageError;

    fn create_bucket<'a>(
        &'a self,
        request: &'a BucketRequest,
    ) -> BackendFuture<'a, String, Self::Error> {
        Box::pin(async move { Ok(self.insert_bucket(request).await?.name) })
    }

    fn list_buckets(&self) -> BackendFuture<'_, Vec<String>, Self::Error> {
        Box::pin(async move {
            let names = self
                .buckets()
                .await?
                .into_iter()
                .map(|bucket| bucket.name)
                .collect::<Vec<_>>();
            info!(?names, "buckets");
            Ok(names)
        })
    }

    fn upload_file<'a>(
        &'a self,
        bucket: &'a str,
        source: &'a Utf8Path,
        destination: Option<&'a str>,
    ) -> BackendFuture<'a, String, Self::Error> {
        Box::pin(async move {
            let object = destination.map_or_else(|| Self::default_object_name(source), str::to_owned);
            let bytes = files::read_bytes(source).map_err(|err| StorageError::Io {
                path: source.to_string(),
                message: err.to_string(),
            })?;
            let size = bytes.len();
            let stored = self.upload_bytes(bucket, &object, bytes).await?;
            info!(source = %source, bucket, object = %stored.name, size, "uploaded file");
            Ok(stored.name)
        })
    }

    fn list_objects<'a>(
        &'a self,
        bucket: &'a str,
    ) -> BackendFuture<'a, Vec<String>, Self::Error> {
        Box::pin(async move {
            Ok(self
                .objects(bucket)
                .await?
                .into_iter()
                .map(|object| object.name)
                .collect())
        })
    }

    fn delete_object<'a>(
        &'a self,
        bucket: &'a str,
        object: &'a str,
    ) -> BackendFuture<'a, (), Self::Error> {
        Box::pin(async move { self.remove_object(bucket, object).await })
    }

    fn delete_bucket<'a>(&'a self, bucket: &'a str) -> BackendFuture<'a, (), Self::Error> {
        Box::pin(async move { self.remove_bucket(bucket).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/tmp/report.png", "report.png")]
    #[case("report.png", "report.png")]
    #[case("nested/dir/data.csv", "data.csv")]
    fn default_object_name_is_the_file_name(#[case] source: &str, #[case] expected: &str) {
        assert_eq!(
            StorageClient::default_object_name(Utf8Path::new(source)),
            expected
        );
    }

    #[rstest]
    fn bucket_resource_uses_camel_case() {
        let body = serde_json::to_value(BucketResource {
            name: "b",
            location: "EU",
            storage_class: "NEARLINE",
        })
        .unwrap_or_else(|err| panic!("serialise: {err}"));
        assert_eq!(
            body,
            serde_json::json!({"name": "b", "location": "EU", "storageClass": "NEARLINE"})
        );
    }
}
