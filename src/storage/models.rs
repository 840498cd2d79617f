//! Cloud Storage JSON API models.

use serde::{Deserialize, Serialize};

/// Bucket insert body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketResource<'a> {
    /// Bucket name.
    pub name: &'a str,
    /// Bucket location.
    pub location: &'a str,
    /// Default storage class.
    pub storage_class: &'a str,
}

/// Bucket metadata.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    /// Bucket name.
    pub name: String,
    /// Bucket location, upper case.
    #[serde(default)]
    pub location: Option<String>,
    /// Default storage class.
    #[serde(default)]
    pub storage_class: Option<String>,
}

/// Object metadata.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct Object {
    /// Object name.
    pub name: String,
    /// Bucket holding the object.
    #[serde(default)]
    pub bucket: Option<String>,
    /// Size in bytes; uint64 fields travel as JSON strings.
    #[serde(default)]
    pub size: Option<String>,
}

/// Page of list results.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(bound(deserialize = "T: serde::de::DeserializeOwned"))]
pub struct ListPage<T> {
    /// Items on this page.
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    /// Token for the next page.
    #[serde(default)]
    pub next_page_token: Option<String>,
}
