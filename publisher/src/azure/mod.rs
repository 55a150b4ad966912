//! Azure Blob Storage client.
//!
//! Implements [`BlobStore`] over the Blob service REST API using block blobs
//! and Shared Key authorisation. Requests are synchronous and share one
//! `ureq` agent whose global timeout bounds every call.

mod block_list;
mod shared_key;

pub use block_list::block_list_xml;
pub use shared_key::{SharedKey, SignableRequest};

use crate::settings::PublishSettings;
use boxpub::store::{BlobStore, BlockListEntry, StoreError};
use boxpub::upload::BlockId;
use chrono::{DateTime, Utc};
use log::trace;
use std::io::{Cursor, Read};
use std::time::Duration;
use url::Url;

/// REST API version sent with every request.
pub const API_VERSION: &str = "2021-08-06";

const OCTET_STREAM: &str = "application/octet-stream";
const XML: &str = "application/xml";
const BLOB_NOT_FOUND: &str = "BlobNotFound";
const RFC1123_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Errors raised while configuring the client.
#[derive(Debug, thiserror::Error)]
pub enum AzureConfigError {
    /// The account key could not be decoded.
    #[error("invalid storage account key: {0}")]
    Key(#[source] StoreError),

    /// No usable endpoint URL could be built.
    #[error("cannot build blob endpoint for account {account}: {reason}")]
    Endpoint {
        /// The storage account name.
        account: String,
        /// Why the URL was rejected.
        reason: String,
    },
}

/// A [`BlobStore`] backed by an Azure storage account.
#[derive(Debug)]
pub struct AzureBlobStore {
    endpoint: Url,
    key: SharedKey,
    agent: ureq::Agent,
}

impl AzureBlobStore {
    /// Build a client from validated settings.
    ///
    /// # Errors
    ///
    /// Returns an [`AzureConfigError`] if the key or endpoint is unusable.
    pub fn new(settings: &PublishSettings) -> Result<Self, AzureConfigError> {
        let account = settings.storage_account_name.as_str();
        let endpoint = match &settings.endpoint {
            Some(url) => url.clone(),
            None => default_endpoint(account)?,
        };
        let key =
            SharedKey::from_base64(account, &settings.access_key).map_err(AzureConfigError::Key)?;
        Ok(Self {
            endpoint,
            key,
            agent: http_agent(settings.request_timeout),
        })
    }

    /// The URL of `path` inside `container`.
    ///
    /// Each `/`-separated component of `path` becomes one URL path segment.
    #[must_use]
    pub fn blob_url(&self, container: &str, path: &str) -> Url {
        blob_url(&self.endpoint, container, path)
    }

    fn put(
        &self,
        url: &Url,
        content_type: &str,
        extra_headers: &[(&'static str, String)],
        body: &[u8],
    ) -> Result<(), StoreError> {
        let mut ms_headers = standard_ms_headers(Utc::now());
        ms_headers.extend_from_slice(extra_headers);
        let authorization = self.key.authorization(&SignableRequest {
            method: "PUT",
            url,
            content_length: body.len(),
            content_type: Some(content_type),
            ms_headers: &ms_headers,
        })?;

        trace!("PUT {url} ({} bytes)", body.len());
        let mut request = self
            .agent
            .put(url.as_str())
            .header("Authorization", &authorization)
            .header("Content-Type", content_type);
        for (name, value) in &ms_headers {
            request = request.header(*name, value);
        }
        let response = request
            .send(body)
            .map_err(|e| map_ureq_error(url.as_str(), &e))?;
        check_status(url.as_str(), response.status().as_u16(), error_code(&response))
    }

    fn get(&self, url: &Url) -> Result<Vec<u8>, StoreError> {
        let ms_headers = standard_ms_headers(Utc::now());
        let authorization = self.key.authorization(&SignableRequest {
            method: "GET",
            url,
            content_length: 0,
            content_type: None,
            ms_headers: &ms_headers,
        })?;

        trace!("GET {url}");
        let mut request = self
            .agent
            .get(url.as_str())
            .header("Authorization", &authorization);
        for (name, value) in &ms_headers {
            request = request.header(*name, value);
        }
        let response = request
            .call()
            .map_err(|e| map_ureq_error(url.as_str(), &e))?;
        check_status(url.as_str(), response.status().as_u16(), error_code(&response))?;
        response
            .into_body()
            .read_to_vec()
            .map_err(|e| map_ureq_error(url.as_str(), &e))
    }
}

impl BlobStore for AzureBlobStore {
    fn create_empty_object(&self, container: &str, path: &str) -> Result<(), StoreError> {
        let url = self.blob_url(container, path);
        self.put(&url, OCTET_STREAM, &block_blob_header(), &[])
    }

    fn put_block(
        &self,
        container: &str,
        path: &str,
        block_id: &BlockId,
        data: &[u8],
    ) -> Result<(), StoreError> {
        let mut url = self.blob_url(container, path);
        url.query_pairs_mut()
            .append_pair("comp", "block")
            .append_pair("blockid", block_id.as_str());
        self.put(&url, OCTET_STREAM, &[], data)
    }

    fn put_block_list(
        &self,
        container: &str,
        path: &str,
        blocks: &[BlockListEntry],
    ) -> Result<(), StoreError> {
        let mut url = self.blob_url(container, path);
        url.query_pairs_mut().append_pair("comp", "blocklist");
        let body = block_list_xml(blocks).map_err(|e| StoreError::Rejected {
            operation: "put_block_list",
            location: url.to_string(),
            reason: e.to_string(),
        })?;
        self.put(&url, XML, &[], body.as_bytes())
    }

    fn get_object(
        &self,
        container: &str,
        path: &str,
    ) -> Result<Box<dyn Read + Send>, StoreError> {
        let url = self.blob_url(container, path);
        let body = self.get(&url)?;
        Ok(Box::new(Cursor::new(body)))
    }

    fn put_object(
        &self,
        container: &str,
        path: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<(), StoreError> {
        let url = self.blob_url(container, path);
        self.put(&url, content_type, &block_blob_header(), data)
    }

    fn object_url(&self, container: &str, path: &str) -> String {
        self.blob_url(container, path).into()
    }
}

fn default_endpoint(account: &str) -> Result<Url, AzureConfigError> {
    Url::parse(&format!("https://{account}.blob.core.windows.net")).map_err(|e| {
        AzureConfigError::Endpoint {
            account: account.to_owned(),
            reason: e.to_string(),
        }
    })
}

fn blob_url(endpoint: &Url, container: &str, path: &str) -> Url {
    let mut url = endpoint.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments
            .pop_if_empty()
            .push(container)
            .extend(path.split('/').filter(|s| !s.is_empty()));
    }
    url
}

fn http_agent(timeout: Duration) -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build();
    ureq::Agent::new_with_config(config)
}

fn format_request_date(now: DateTime<Utc>) -> String {
    now.format(RFC1123_FORMAT).to_string()
}

fn standard_ms_headers(now: DateTime<Utc>) -> Vec<(&'static str, String)> {
    vec![
        ("x-ms-date", format_request_date(now)),
        ("x-ms-version", API_VERSION.to_owned()),
    ]
}

fn block_blob_header() -> [(&'static str, String); 1] {
    [("x-ms-blob-type", "BlockBlob".to_owned())]
}

fn error_code<B>(response: &ureq::http::Response<B>) -> Option<&str> {
    response
        .headers()
        .get("x-ms-error-code")
        .and_then(|v| v.to_str().ok())
}

/// Classify a response status.
///
/// A 404 is a missing object only when the service says the blob itself is
/// absent; a missing container is a configuration problem and stays fatal.
fn check_status(location: &str, status: u16, error_code: Option<&str>) -> Result<(), StoreError> {
    match (status, error_code) {
        (200..=299, _) => Ok(()),
        (404, None | Some(BLOB_NOT_FOUND)) => Err(StoreError::NotFound {
            location: location.to_owned(),
        }),
        (403, code) => Err(StoreError::Auth {
            reason: format!(
                "HTTP 403 from {location}{}",
                code.map(|c| format!(" ({c})")).unwrap_or_default()
            ),
        }),
        (status, code) => Err(StoreError::Http {
            location: location.to_owned(),
            reason: match code {
                Some(code) => format!("HTTP {status} ({code})"),
                None => format!("HTTP {status}"),
            },
        }),
    }
}

/// Map a ureq transport error to a [`StoreError`].
fn map_ureq_error(location: &str, err: &ureq::Error) -> StoreError {
    match err {
        ureq::Error::StatusCode(404) => StoreError::NotFound {
            location: location.to_owned(),
        },
        other => StoreError::Http {
            location: location.to_owned(),
            reason: other.to_string(),
        },
    }
}
