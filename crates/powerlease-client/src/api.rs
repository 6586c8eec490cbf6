//! Lease API seam

use powerlease_api::{
    delete_path, DeleteResponse, ErrorBody, LeaseView, RenewQuery, RenewResponse, StatusResponse,
    LIST_PATH, RENEW_PATH, STATUS_PATH,
};
use powerlease_util::LeaseId;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::trace;

use crate::{ClientError, ClientResult};

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// What a lease handle needs from the server
pub trait LeaseApi: Send + Sync {
    /// Create or extend a lease; returns its id
    fn renew(&self, id: Option<&LeaseId>, ttl: Option<Duration>) -> ClientResult<LeaseId>;

    /// Whether the managed machine currently answers probes
    fn status(&self) -> ClientResult<bool>;
}

/// Blocking HTTP client for powerleased
#[derive(Debug, Clone)]
pub struct HttpLeaseApi {
    base_url: String,
    client: Client,
}

impl HttpLeaseApi {
    /// `base_url` is scheme + authority, e.g. `http://nas-power:8000`
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> ClientResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Remove a lease; returns whether it existed
    pub fn delete(&self, id: &LeaseId) -> ClientResult<bool> {
        let response: DeleteResponse = self.get(&delete_path(id.as_str()))?;
        Ok(response.deleted)
    }

    /// Every lease the server holds
    pub fn list(&self) -> ClientResult<Vec<LeaseView>> {
        self.get(LIST_PATH)
    }

    fn request(&self, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        trace!(url = %url, "GET");
        self.client.get(url)
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        decode(self.request(path).send()?)
    }
}

fn decode<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let status = response.status();
    if !status.is_success() {
        let message = response
            .json::<ErrorBody>()
            .map(|body| body.error)
            .unwrap_or_else(|_| status.canonical_reason().unwrap_or("unknown").to_string());
        return Err(ClientError::Status {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json::<T>()
        .map_err(|e| ClientError::Decode(e.to_string()))
}

impl LeaseApi for HttpLeaseApi {
    fn renew(&self, id: Option<&LeaseId>, ttl: Option<Duration>) -> ClientResult<LeaseId> {
        let query = RenewQuery {
            id: id.cloned(),
            expire_in_sec: ttl.map(|ttl| ttl.as_secs()),
        };
        let response: RenewResponse = decode(self.request(RENEW_PATH).query(&query).send()?)?;
        Ok(response.id)
    }

    fn status(&self) -> ClientResult<bool> {
        let response: StatusResponse = self.get(STATUS_PATH)?;
        Ok(response.online)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_dropped() {
        let api = HttpLeaseApi::new("http://nas-power:8000/").unwrap();
        assert_eq!(api.base_url(), "http://nas-power:8000");
    }

    #[test]
    fn test_unreachable_server_is_transport_error() {
        // Bind then drop to get a port nobody listens on
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let api =
            HttpLeaseApi::with_timeout(format!("http://127.0.0.1:{}", port), Duration::from_secs(1))
                .unwrap();

        let result = api.status();
        assert!(matches!(result, Err(ClientError::Transport(_) | ClientError::Timeout)));
    }
}
