//! Remote document store HTTP client
//!
//! Typed client for the project document endpoints. Every request carries
//! the stored session key as a `sessionKey` cookie and the configured
//! user agent.
//!
//! ## Endpoints
//!
//! | Operation        | Request                                                   |
//! |------------------|-----------------------------------------------------------|
//! | list projects    | `GET    /organizations/{org}/projects`                    |
//! | list documents   | `GET    /organizations/{org}/projects/{project}/docs`     |
//! | create document  | `POST   /organizations/{org}/projects/{project}/docs`     |
//! | delete document  | `DELETE /organizations/{org}/projects/{project}/docs/{doc}` |
//!
//! ## Usage
//!
//! ```rust,no_run
//! use projsync_api::client::ApiClient;
//! use projsync_core::config::RemoteConfig;
//!
//! # async fn example(org: projsync_core::domain::OrganizationId) -> Result<(), projsync_api::ApiError> {
//! let client = ApiClient::new("session-key", &RemoteConfig::default())?;
//! for project in client.list_projects(&org).await? {
//!     println!("{} {}", project.uuid, project.name);
//! }
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use projsync_core::config::RemoteConfig;
use projsync_core::domain::{DocumentId, OrganizationId, ProjectId};
use projsync_core::ports::{ProjectSummary, RemoteDocument};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, COOKIE};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::ApiError;

/// Request timeout applied to every call
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Longest error body kept in an [`ApiError`]
const MAX_ERROR_BODY: usize = 512;

/// Body of a document creation request
#[derive(Debug, Serialize)]
struct CreateDocumentRequest<'a> {
    file_name: &'a str,
    content: &'a str,
}

// ============================================================================
// ApiClient
// ============================================================================

/// HTTP client for the remote document store
#[derive(Clone)]
pub struct ApiClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL, without trailing slash
    base_url: String,
    /// Session cookie value
    session_key: String,
}

impl ApiClient {
    /// Creates a client for the configured base URL
    ///
    /// # Arguments
    /// * `session_key` - Value of the `sessionKey` cookie
    /// * `config` - Base URL and user agent
    ///
    /// # Errors
    /// Returns `ApiError::NetworkError` if the HTTP client cannot be built
    pub fn new(session_key: impl Into<String>, config: &RemoteConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session_key: session_key.into(),
        })
    }

    /// Creates a client with a custom base URL (useful for testing)
    pub fn with_base_url(
        session_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, ApiError> {
        let config = RemoteConfig {
            base_url: base_url.into(),
            ..RemoteConfig::default()
        };
        Self::new(session_key, &config)
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Creates a request with the session cookie for `path`
    ///
    /// # Arguments
    /// * `method` - HTTP method
    /// * `path` - API path relative to the base URL, starting with `/`
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, url)
            .header(COOKIE, format!("sessionKey={}", self.session_key))
    }

    /// Lists the projects of `organization`
    pub async fn list_projects(
        &self,
        organization: &OrganizationId,
    ) -> Result<Vec<ProjectSummary>, ApiError> {
        let path = format!("/organizations/{organization}/projects");
        debug!(%organization, "Listing projects");
        self.get_json(&path).await
    }

    /// Lists every document of `project`
    pub async fn list_documents(
        &self,
        organization: &OrganizationId,
        project: &ProjectId,
    ) -> Result<Vec<RemoteDocument>, ApiError> {
        let path = docs_path(organization, project);
        debug!(%project, "Listing documents");
        self.get_json(&path).await
    }

    /// Creates a document named `file_name` holding `content`
    pub async fn create_document(
        &self,
        organization: &OrganizationId,
        project: &ProjectId,
        file_name: &str,
        content: &str,
    ) -> Result<RemoteDocument, ApiError> {
        let path = docs_path(organization, project);
        debug!(%project, file_name, bytes = content.len(), "Creating document");

        let response = self
            .request(Method::POST, &path)
            .json(&CreateDocumentRequest { file_name, content })
            .send()
            .await?;
        parse_json(check_status(response).await?).await
    }

    /// Deletes a document
    ///
    /// A 404 response counts as success; the document is gone either way.
    pub async fn delete_document(
        &self,
        organization: &OrganizationId,
        project: &ProjectId,
        document: &DocumentId,
    ) -> Result<(), ApiError> {
        let path = format!("{}/{document}", docs_path(organization, project));
        debug!(%document, "Deleting document");

        let response = self.request(Method::DELETE, &path).send().await?;
        match check_status(response).await {
            Ok(_) => Ok(()),
            Err(ApiError::NotFound(_)) => {
                warn!(%document, "Document already deleted");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.request(Method::GET, path).send().await?;
        parse_json(check_status(response).await?).await
    }
}

fn docs_path(organization: &OrganizationId, project: &ProjectId) -> String {
    format!("/organizations/{organization}/projects/{project}/docs")
}

/// Converts a non-success response into the matching [`ApiError`]
async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }

    Err(match status {
        StatusCode::UNAUTHORIZED => ApiError::Unauthorized(body),
        StatusCode::FORBIDDEN => ApiError::Forbidden(body),
        StatusCode::NOT_FOUND => ApiError::NotFound(body),
        _ => ApiError::Status {
            status: status.as_u16(),
            body,
        },
    })
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::InvalidResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = ApiClient::with_base_url("sk", "http://localhost:1234/api/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:1234/api");
    }

    #[test]
    fn test_docs_path() {
        let org: OrganizationId = "7d1c5a0e-9b1e-4c61-8b41-5f6f2f1f0a11".parse().unwrap();
        let project: ProjectId = "0b7f4c3a-1111-4c61-8b41-5f6f2f1f0a22".parse().unwrap();
        assert_eq!(
            docs_path(&org, &project),
            "/organizations/7d1c5a0e-9b1e-4c61-8b41-5f6f2f1f0a11/projects/0b7f4c3a-1111-4c61-8b41-5f6f2f1f0a22/docs"
        );
    }
}
