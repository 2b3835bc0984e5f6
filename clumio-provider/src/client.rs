//! Clumio REST client
//!
//! [`ClumioApi`] is the seam between resource logic and HTTP. [`HttpClient`]
//! is the reqwest implementation; tests substitute an in-memory fake.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clumio_core::provider::{ErrorKind, ProviderError};
use log::debug;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::config::ClumioConfig;
use crate::models::{
    AwsConnection, CreateAwsConnectionRequest, ErrorBody, ListResponse, ProtectionGroup,
    ProtectionGroupRequest, S3Bucket, SetBucketPropertiesRequest, Task, TaskReference,
    UpdateAwsConnectionRequest,
};

pub const HTTP_UNAUTHORIZED: u16 = 401;
pub const HTTP_FORBIDDEN: u16 = 403;
pub const HTTP_NOT_FOUND: u16 = 404;

pub const ORGANIZATIONAL_UNIT_HEADER: &str = "X-Clumio-OrganizationalUnit-Context";
const ACCEPT_VALUE: &str = "application/api.clumio.*=v1+json";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const PAGE_LIMIT: u64 = 100;

/// Errors that can occur when calling the API
#[derive(Debug, Error)]
pub enum ClientError {
    /// The API answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// No HTTP response was received
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The body could not be decoded into the expected type
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Success status but no payload
    #[error("unexpected API response: empty body")]
    EmptyResponse,

    #[error("invalid request URL: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(HTTP_NOT_FOUND)
    }
}

/// Classify an HTTP failure status
pub fn status_kind(status: u16) -> ErrorKind {
    match status {
        HTTP_NOT_FOUND => ErrorKind::NotFound,
        HTTP_UNAUTHORIZED | HTTP_FORBIDDEN => ErrorKind::Auth,
        _ => ErrorKind::Api,
    }
}

impl From<ClientError> for ProviderError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Http { status, message } => {
                ProviderError::new(status_kind(status), message).with_status(status)
            }
            ClientError::EmptyResponse => ProviderError::nil_response(),
            ClientError::Decode(e) => ProviderError::new(
                ErrorKind::NilResponse,
                format!("unexpected API response: {}", e),
            )
            .with_cause(e),
            ClientError::Transport(e) => {
                ProviderError::new(ErrorKind::Transport, e.to_string()).with_cause(e)
            }
            ClientError::InvalidUrl(msg) => ProviderError::invalid_config(msg),
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Operations of the Clumio API used by the provider
#[async_trait]
pub trait ClumioApi: Send + Sync {
    /// A client whose calls run under the given organizational unit.
    /// The receiver keeps its own context.
    fn scoped(&self, organizational_unit_id: &str) -> Arc<dyn ClumioApi>;

    async fn create_aws_connection(
        &self,
        request: &CreateAwsConnectionRequest,
    ) -> ClientResult<AwsConnection>;
    async fn read_aws_connection(&self, id: &str) -> ClientResult<AwsConnection>;
    async fn update_aws_connection(
        &self,
        id: &str,
        request: &UpdateAwsConnectionRequest,
    ) -> ClientResult<AwsConnection>;
    async fn delete_aws_connection(&self, id: &str) -> ClientResult<()>;
    async fn list_aws_connections(
        &self,
        filter: Option<&str>,
    ) -> ClientResult<Vec<AwsConnection>>;

    async fn create_protection_group(
        &self,
        request: &ProtectionGroupRequest,
    ) -> ClientResult<ProtectionGroup>;
    async fn read_protection_group(&self, id: &str) -> ClientResult<ProtectionGroup>;
    async fn update_protection_group(
        &self,
        id: &str,
        request: &ProtectionGroupRequest,
    ) -> ClientResult<ProtectionGroup>;
    async fn delete_protection_group(&self, id: &str) -> ClientResult<()>;
    async fn list_protection_groups(
        &self,
        filter: Option<&str>,
    ) -> ClientResult<Vec<ProtectionGroup>>;

    async fn read_s3_bucket(&self, bucket_id: &str) -> ClientResult<S3Bucket>;
    async fn set_s3_bucket_properties(
        &self,
        bucket_id: &str,
        request: &SetBucketPropertiesRequest,
    ) -> ClientResult<TaskReference>;

    async fn read_task(&self, task_id: &str) -> ClientResult<Task>;
}

/// reqwest based implementation of [`ClumioApi`]
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base_url: Url,
    api_token: String,
    organizational_unit: Option<String>,
}

impl HttpClient {
    pub fn new(config: &ClumioConfig) -> Result<Self, ProviderError> {
        config
            .validate()
            .map_err(|e| ProviderError::invalid_config(e.to_string()))?;
        let base_url = config
            .parsed_base_url()
            .map_err(|e| ProviderError::invalid_config(e.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("clumio-provider/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::from(ClientError::Transport(e)))?;

        Ok(Self {
            http,
            base_url,
            api_token: config.api_token.clone(),
            organizational_unit: config.organizational_unit_context.clone(),
        })
    }

    pub fn organizational_unit(&self) -> Option<&str> {
        self.organizational_unit.as_deref()
    }

    /// Append path segments to the base URL. Every segment is percent-encoded,
    /// so an identifier can never leave its collection.
    fn url(&self, segments: &[&str]) -> ClientResult<Url> {
        if let Some(bad) = segments
            .iter()
            .find(|s| s.is_empty() || **s == "." || **s == "..")
        {
            return Err(ClientError::InvalidUrl(format!(
                "invalid path segment {:?}",
                bad
            )));
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, path: &[&str]) -> ClientResult<RequestBuilder> {
        let url = self.url(path)?;
        debug!("{} {}", method, url);
        let mut builder = self.http.request(method, url).bearer_auth(&self.api_token);
        if let Some(ou) = &self.organizational_unit {
            builder = builder.header(ORGANIZATIONAL_UNIT_HEADER, ou);
        }
        Ok(builder)
    }

    async fn execute(&self, builder: RequestBuilder) -> ClientResult<Vec<u8>> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        check_status(status, &body)?;
        Ok(body.to_vec())
    }

    async fn call<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ClientResult<T> {
        let body = self.execute(builder).await?;
        decode_body(&body)
    }

    async fn get<T: DeserializeOwned>(&self, path: &[&str]) -> ClientResult<T> {
        self.call(self.request(Method::GET, path)?).await
    }

    async fn send_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &[&str],
        body: &B,
    ) -> ClientResult<T> {
        self.call(self.request(method, path)?.json(body)).await
    }

    async fn delete(&self, path: &[&str]) -> ClientResult<()> {
        self.execute(self.request(Method::DELETE, path)?).await?;
        Ok(())
    }

    /// Fetch every page of a list endpoint
    async fn list<T: DeserializeOwned>(
        &self,
        path: &[&str],
        filter: Option<&str>,
    ) -> ClientResult<Vec<T>> {
        let mut items = Vec::new();
        let mut page: u64 = 1;
        loop {
            let mut builder = self
                .request(Method::GET, path)?
                .query(&[("start", page), ("limit", PAGE_LIMIT)]);
            if let Some(filter) = filter {
                builder = builder.query(&[("filter", filter)]);
            }
            let list: ListResponse<T> = self.call(builder).await?;
            let more = list.has_more(page);
            items.extend(list.into_items());
            if !more {
                return Ok(items);
            }
            page += 1;
        }
    }
}

/// Turn a non-success status into [`ClientError::Http`] with the body's message
pub(crate) fn check_status(status: StatusCode, body: &[u8]) -> ClientResult<()> {
    if status.is_success() {
        return Ok(());
    }
    Err(ClientError::Http {
        status: status.as_u16(),
        message: parse_error_message(status, body),
    })
}

/// Decode a success body, treating an empty or `null` body as a nil response
pub(crate) fn decode_body<T: DeserializeOwned>(body: &[u8]) -> ClientResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ClientError::EmptyResponse);
    }
    let value: serde_json::Value = serde_json::from_slice(body)?;
    if value.is_null() {
        return Err(ClientError::EmptyResponse);
    }
    Ok(serde_json::from_value(value)?)
}

/// Extract a readable message from an error body
pub(crate) fn parse_error_message(status: StatusCode, body: &[u8]) -> String {
    if let Ok(parsed) = serde_json::from_slice::<ErrorBody>(body) {
        let messages: Vec<String> = parsed
            .errors
            .into_iter()
            .filter_map(|e| e.error_message)
            .filter(|m| !m.is_empty())
            .collect();
        if !messages.is_empty() {
            return messages.join("; ");
        }
    }
    let text = String::from_utf8_lossy(body).trim().to_string();
    if text.is_empty() {
        status.to_string()
    } else {
        text
    }
}

#[async_trait]
impl ClumioApi for HttpClient {
    fn scoped(&self, organizational_unit_id: &str) -> Arc<dyn ClumioApi> {
        let mut client = self.clone();
        client.organizational_unit = Some(organizational_unit_id.to_string());
        Arc::new(client)
    }

    async fn create_aws_connection(
        &self,
        request: &CreateAwsConnectionRequest,
    ) -> ClientResult<AwsConnection> {
        self.send_json(Method::POST, &["connections", "aws"], request)
            .await
    }

    async fn read_aws_connection(&self, id: &str) -> ClientResult<AwsConnection> {
        self.get(&["connections", "aws", id]).await
    }

    async fn update_aws_connection(
        &self,
        id: &str,
        request: &UpdateAwsConnectionRequest,
    ) -> ClientResult<AwsConnection> {
        self.send_json(Method::PATCH, &["connections", "aws", id], request)
            .await
    }

    async fn delete_aws_connection(&self, id: &str) -> ClientResult<()> {
        self.delete(&["connections", "aws", id]).await
    }

    async fn list_aws_connections(
        &self,
        filter: Option<&str>,
    ) -> ClientResult<Vec<AwsConnection>> {
        self.list(&["connections", "aws"], filter).await
    }

    async fn create_protection_group(
        &self,
        request: &ProtectionGroupRequest,
    ) -> ClientResult<ProtectionGroup> {
        self.send_json(Method::POST, &["datasources", "protection-groups"], request)
            .await
    }

    async fn read_protection_group(&self, id: &str) -> ClientResult<ProtectionGroup> {
        self.get(&["datasources", "protection-groups", id]).await
    }

    async fn update_protection_group(
        &self,
        id: &str,
        request: &ProtectionGroupRequest,
    ) -> ClientResult<ProtectionGroup> {
        self.send_json(
            Method::PUT,
            &["datasources", "protection-groups", id],
            request,
        )
        .await
    }

    async fn delete_protection_group(&self, id: &str) -> ClientResult<()> {
        self.delete(&["datasources", "protection-groups", id])
            .await
    }

    async fn list_protection_groups(
        &self,
        filter: Option<&str>,
    ) -> ClientResult<Vec<ProtectionGroup>> {
        self.list(&["datasources", "protection-groups"], filter)
            .await
    }

    async fn read_s3_bucket(&self, bucket_id: &str) -> ClientResult<S3Bucket> {
        self.get(&["datasources", "aws", "s3-buckets", bucket_id])
            .await
    }

    async fn set_s3_bucket_properties(
        &self,
        bucket_id: &str,
        request: &SetBucketPropertiesRequest,
    ) -> ClientResult<TaskReference> {
        self.send_json(
            Method::PATCH,
            &["datasources", "aws", "s3-buckets", bucket_id],
            request,
        )
        .await
    }

    async fn read_task(&self, task_id: &str) -> ClientResult<Task> {
        self.get(&["tasks", task_id]).await
    }
}
