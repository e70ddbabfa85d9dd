//! registry::http
//!
//! Direct registry client speaking the Confluent-compatible REST API.
//!
//! # Design
//!
//! One request per trait operation, except where the API needs a second
//! round trip to fill in data the first response omits:
//! - `create_schema` only returns the id, so the version is resolved through
//!   `GET /schemas/ids/{id}/versions`
//! - permanent deletes must be preceded by a soft delete of the same path
//!
//! A 404 maps to [`RegistryError::NotFound`]; any other non-2xx response
//! surfaces the body's `{error_code, message}` as [`RegistryError::Api`].
//! Nothing is retried.
//!
//! # Example
//!
//! ```ignore
//! use protoreg::registry::{HttpRegistryClient, RegistryClient};
//!
//! let client = HttpRegistryClient::new("http://registry:8081".parse()?);
//! let subjects = client.get_subjects().await?;
//! ```

use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::{Reference, RegistryClient, RegistryError, Schema, SubjectVersion};
use crate::config::Credentials;

/// Media type used for every request and accepted for every response.
pub const CONTENT_TYPE_VALUE: &str = "application/vnd.schemaregistry.v1+json";

/// Registry URL used when none is configured.
pub const DEFAULT_URL: &str = "http://localhost:8081";

/// Direct registry client.
///
/// Holds no per-call state; cloning shares the underlying connection pool.
#[derive(Clone)]
pub struct HttpRegistryClient {
    /// HTTP client for making requests
    client: Client,
    /// Registry base URL
    base_url: Url,
    /// Basic-auth credentials, if configured
    credentials: Option<Credentials>,
}

// Custom Debug to keep credentials out of logs
impl std::fmt::Debug for HttpRegistryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRegistryClient")
            .field("base_url", &self.base_url.as_str())
            .field("has_credentials", &self.credentials.is_some())
            .finish()
    }
}

/// Body of create and compatibility requests.
#[derive(Debug, Serialize)]
struct SchemaRequest<'a> {
    schema: String,
    #[serde(rename = "schemaType")]
    schema_type: &'static str,
    references: &'a [Reference],
}

impl<'a> SchemaRequest<'a> {
    fn from_schema(schema: &'a Schema) -> Self {
        Self {
            schema: schema.raw_text(),
            schema_type: schema.schema_type.as_str(),
            references: &schema.references,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateSchemaResponse {
    id: u32,
}

#[derive(Debug, Deserialize)]
struct CompatibilityResponse {
    is_compatible: bool,
}

#[derive(Debug, Deserialize)]
struct RegistryErrorBody {
    error_code: i32,
    message: String,
}

impl HttpRegistryClient {
    /// Create a client for `base_url` with a default HTTP client and no
    /// credentials.
    pub fn new(base_url: Url) -> Self {
        Self::from_parts(Client::new(), base_url, None)
    }

    /// Create a client from an already configured HTTP client.
    pub fn from_parts(client: Client, base_url: Url, credentials: Option<Credentials>) -> Self {
        Self {
            client,
            base_url,
            credentials,
        }
    }

    /// Registry base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an endpoint URL; each segment is percent-encoded on its own.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, RegistryError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                RegistryError::Network(format!("registry url '{}' cannot be a base", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send one request, returning the raw response.
    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&SchemaRequest<'_>>,
    ) -> Result<Response, RegistryError> {
        debug!(%method, %url, "registry request");

        let mut request = self
            .client
            .request(method, url)
            .header(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_VALUE))
            .header(ACCEPT, HeaderValue::from_static(CONTENT_TYPE_VALUE));

        if let Some(credentials) = &self.credentials {
            request = request.basic_auth(&credentials.username, Some(&credentials.password));
        }

        if let Some(body) = body {
            let payload = serde_json::to_vec(body).map_err(|e| {
                RegistryError::InvalidResponse(format!("failed to encode request: {}", e))
            })?;
            request = request.body(payload);
        }

        request
            .send()
            .await
            .map_err(|e| RegistryError::Network(e.to_string()))
    }

    /// Send one request and decode a JSON response.
    async fn json_request<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&SchemaRequest<'_>>,
    ) -> Result<T, RegistryError> {
        let response = self.send(method, url, body).await?;
        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| {
                RegistryError::InvalidResponse(format!("failed to parse response: {}", e))
            })
        } else {
            Err(error_from_response(response, status).await)
        }
    }

    /// Send one request whose success body is irrelevant.
    async fn empty_request(&self, method: Method, url: Url) -> Result<(), RegistryError> {
        let response = self.send(method, url, None).await?;
        let status = response.status();

        if status.is_success() {
            Ok(())
        } else {
            Err(error_from_response(response, status).await)
        }
    }

    async fn subject_version_for_id(&self, id: u32, subject: &str) -> Result<i32, RegistryError> {
        let versions = self.get_schema_subject_versions(id).await?;
        Ok(versions
            .into_iter()
            .find(|sv| sv.subject == subject)
            .map(|sv| sv.version)
            .unwrap_or_default())
    }

    async fn schema_at(&self, subject: &str, version: &str) -> Result<Schema, RegistryError> {
        let url = self.endpoint(&["subjects", subject, "versions", version])?;
        let mut schema: Schema = self.json_request(Method::GET, url, None).await?;

        if schema.subject.is_empty() {
            schema.subject = subject.to_string();
        }
        if schema.version == 0 {
            schema.version = match version.parse() {
                Ok(version) => version,
                Err(_) => self.subject_version_for_id(schema.id, subject).await?,
            };
        }

        Ok(schema)
    }
}

/// Map a non-2xx response to a registry error.
async fn error_from_response(response: Response, status: StatusCode) -> RegistryError {
    let (error_code, message) = match response.json::<RegistryErrorBody>().await {
        Ok(body) => (body.error_code, body.message),
        Err(_) => (i32::from(status.as_u16()), status.to_string()),
    };

    if status == StatusCode::NOT_FOUND {
        RegistryError::NotFound(message)
    } else {
        RegistryError::Api {
            status: status.as_u16(),
            error_code,
            message,
        }
    }
}

fn permanent(mut url: Url) -> Url {
    url.query_pairs_mut().append_pair("permanent", "true");
    url
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn get_subjects(&self) -> Result<Vec<String>, RegistryError> {
        let url = self.endpoint(&["subjects"])?;
        self.json_request(Method::GET, url, None).await
    }

    async fn get_subject_versions(&self, subject: &str) -> Result<Vec<i32>, RegistryError> {
        let url = self.endpoint(&["subjects", subject, "versions"])?;
        self.json_request(Method::GET, url, None).await
    }

    async fn get_schema_by_id(&self, id: u32) -> Result<Schema, RegistryError> {
        let url = self.endpoint(&["schemas", "ids", &id.to_string()])?;
        let mut schema: Schema = self.json_request(Method::GET, url, None).await?;
        schema.id = id;
        Ok(schema)
    }

    async fn get_schema_by_version(
        &self,
        subject: &str,
        version: i32,
    ) -> Result<Schema, RegistryError> {
        self.schema_at(subject, &version.to_string()).await
    }

    async fn get_latest_schema(&self, subject: &str) -> Result<Schema, RegistryError> {
        self.schema_at(subject, "latest").await
    }

    async fn get_schema_subject_versions(
        &self,
        id: u32,
    ) -> Result<Vec<SubjectVersion>, RegistryError> {
        let url = self.endpoint(&["schemas", "ids", &id.to_string(), "versions"])?;
        self.json_request(Method::GET, url, None).await
    }

    async fn create_schema(&self, schema: &Schema) -> Result<Schema, RegistryError> {
        let url = self.endpoint(&["subjects", &schema.subject, "versions"])?;
        let body = SchemaRequest::from_schema(schema);
        let created: CreateSchemaResponse =
            self.json_request(Method::POST, url, Some(&body)).await?;

        let mut result = schema.clone();
        result.id = created.id;
        result.version = self.subject_version_for_id(created.id, &schema.subject).await?;

        debug!(
            subject = %result.subject,
            id = result.id,
            version = result.version,
            "schema created"
        );
        Ok(result)
    }

    async fn delete_subject(
        &self,
        subject: &str,
        permanent_delete: bool,
    ) -> Result<Vec<i32>, RegistryError> {
        let url = self.endpoint(&["subjects", subject])?;
        let versions: Vec<i32> = self.json_request(Method::DELETE, url.clone(), None).await?;

        if permanent_delete {
            self.empty_request(Method::DELETE, permanent(url)).await?;
        }

        Ok(versions)
    }

    async fn delete_schema_version(
        &self,
        subject: &str,
        version: i32,
        permanent_delete: bool,
    ) -> Result<i32, RegistryError> {
        let url = self.endpoint(&["subjects", subject, "versions", &version.to_string()])?;
        let deleted: i32 = self.json_request(Method::DELETE, url.clone(), None).await?;

        if permanent_delete {
            self.empty_request(Method::DELETE, permanent(url)).await?;
        }

        Ok(deleted)
    }

    async fn is_schema_compatible(&self, schema: &Schema) -> Result<bool, RegistryError> {
        let version = if schema.version > 0 {
            schema.version.to_string()
        } else {
            "latest".to_string()
        };
        let url = self.endpoint(&["compatibility", "subjects", &schema.subject, "versions", &version])?;
        let body = SchemaRequest::from_schema(schema);
        let response: CompatibilityResponse =
            self.json_request(Method::POST, url, Some(&body)).await?;
        Ok(response.is_compatible)
    }
}
