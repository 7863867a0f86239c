//! Client for the Pyxis certification catalog.
//!
//! Only the digest lookup is implemented. It issues one batched GraphQL query
//! per call and projects the handful of fields callers need out of the much
//! larger `ContainerImage` schema.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::PyxisConfig;

const FIND_IMAGES_QUERY: &str = "query($digests:[String!]!){find_images(filter: {docker_image_digest:{in:$digests}}){data{_id,certified,deleted,docker_image_digest},error{status,detail},total,page}}";

/// Transport used to reach Pyxis.
///
/// Only a real `reqwest::Client` can build GraphQL requests; other
/// implementations are rejected up front by [`PyxisClient`].
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, request: reqwest::Request) -> reqwest::Result<reqwest::Response>;

    fn as_reqwest(&self) -> Option<&reqwest::Client> {
        None
    }
}

#[async_trait]
impl HttpClient for reqwest::Client {
    async fn execute(&self, request: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        reqwest::Client::execute(self, request).await
    }

    fn as_reqwest(&self) -> Option<&reqwest::Client> {
        Some(self)
    }
}

#[derive(Debug, Error)]
pub enum PyxisError {
    #[error("no digests specified")]
    NoDigests,

    #[error("client could not be used as a reqwest HTTP client")]
    UnsupportedClient,

    #[error("error while executing find_images query: {0}")]
    Request(#[source] reqwest::Error),

    #[error("error while executing find_images query: unexpected status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("error while executing find_images query: undecodable response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("error while executing find_images query: {0}")]
    Graphql(String),
}

pub struct PyxisClient {
    host: String,
    scheme: String,
    api_key: Option<String>,
    client: Arc<dyn HttpClient>,
}

impl PyxisClient {
    pub fn new(config: &PyxisConfig, client: Arc<dyn HttpClient>) -> Self {
        Self {
            host: config.host.clone(),
            scheme: config.scheme.clone(),
            api_key: config.api_key.clone(),
            client,
        }
    }

    pub fn graphql_url(&self) -> String {
        format!("{}://{}/graphql/", self.scheme, self.host)
    }

    /// Look up catalog records for a set of image digests.
    ///
    /// The lookup is unauthenticated unless an API key is configured. Only
    /// `id`, `certified`, `deleted` and `docker_image_digest` are populated on the
    /// returned records.
    pub async fn find_images_by_digest(
        &self,
        digests: &[String],
    ) -> Result<Vec<CertImage>, PyxisError> {
        if digests.is_empty() {
            return Err(PyxisError::NoDigests);
        }
        let http = self.client.as_reqwest().ok_or(PyxisError::UnsupportedClient)?;

        let body = json!({
            "query": FIND_IMAGES_QUERY,
            "variables": { "digests": digests },
        });
        let mut builder = http.post(self.graphql_url()).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.header("X-API-KEY", key);
        }
        let request = builder.build().map_err(PyxisError::Request)?;

        debug!(count = digests.len(), url = %request.url(), "querying find_images");
        let response = self
            .client
            .execute(request)
            .await
            .map_err(PyxisError::Request)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(PyxisError::Request)?;
        if !status.is_success() {
            return Err(PyxisError::Status {
                status,
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        let decoded: GraphqlResponse<FindImagesData> =
            serde_json::from_slice(&bytes).map_err(PyxisError::Decode)?;
        if !decoded.errors.is_empty() {
            let messages: Vec<_> = decoded.errors.into_iter().map(|e| e.message).collect();
            return Err(PyxisError::Graphql(messages.join("; ")));
        }
        let page = decoded
            .data
            .ok_or_else(|| PyxisError::Graphql("response carried no data".to_string()))?
            .find_images;

        if let Some(err) = page.error.filter(|e| e.status != 0 || !e.detail.is_empty()) {
            return Err(PyxisError::Graphql(format!("{} {}", err.status, err.detail)));
        }
        if page.total > page.data.len() as i64 {
            warn!(
                total = page.total,
                returned = page.data.len(),
                page = page.page,
                "find_images returned a partial page"
            );
        }

        Ok(page
            .data
            .into_iter()
            .map(|image| CertImage {
                id: image.id,
                certified: image.certified,
                deleted: image.deleted,
                docker_image_digest: image.docker_image_digest,
                ..Default::default()
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct FindImagesData {
    find_images: FindImagesPage,
}

#[derive(Debug, Deserialize)]
struct FindImagesPage {
    #[serde(default)]
    data: Vec<ImageProjection>,
    error: Option<ResponseError>,
    #[serde(default)]
    total: i64,
    #[serde(default)]
    page: i64,
}

#[derive(Debug, Deserialize)]
struct ResponseError {
    #[serde(default)]
    status: i64,
    #[serde(default)]
    detail: String,
}

#[derive(Debug, Deserialize)]
struct ImageProjection {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    certified: bool,
    #[serde(default)]
    deleted: bool,
    #[serde(default)]
    docker_image_digest: String,
}

/// A certified image as stored in Pyxis.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CertImage {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub certified: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub docker_image_digest: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub docker_image_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub isv_pid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed_data: Option<ParsedData>,
    #[serde(default)]
    pub architecture: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub raw_config: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repositories: Vec<Repository>,
    #[serde(default)]
    pub sum_layer_size_bytes: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uncompressed_top_layer_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub freshness_grades: Vec<FreshnessGrade>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ParsedData {
    pub architecture: String,
    pub command: String,
    pub comment: String,
    pub container: String,
    pub created: String,
    pub docker_version: String,
    pub image_id: String,
    pub labels: Vec<Label>,
    pub layers: Vec<String>,
    pub os: String,
    pub ports: String,
    pub size: i64,
    pub uncompressed_layer_sizes: Vec<Layer>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Repository {
    pub published: bool,
    pub push_date: String,
    pub registry: String,
    pub repository: String,
    pub tags: Vec<Tag>,
    pub manifest_list_digest: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Label {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Tag {
    pub added_date: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Layer {
    pub layer_id: String,
    #[serde(rename = "size_bytes")]
    pub size: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FreshnessGrade {
    pub grade: String,
    pub start_date: String,
    pub end_date: String,
}
