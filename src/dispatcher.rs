//! An HTTP client that executes [`Request`]s against the Flagsmith API.
use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Url,
};
use serde::de::DeserializeOwned;

use crate::{
    request::{Request, ENVIRONMENT_KEY_HEADER},
    Error, Result,
};

/// Executes requests and normalizes every outcome into [`Result`].
///
/// Cloning is cheap: the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub(crate) struct Dispatcher {
    // Client holds a connection pool internally, so we're reusing the client between requests.
    client: reqwest::Client,
    base_url: String,
    environment_key: String,
}

impl Dispatcher {
    pub fn new(base_url: String, environment_key: String) -> Dispatcher {
        Dispatcher {
            client: reqwest::Client::new(),
            base_url,
            environment_key,
        }
    }

    /// Execute `request` and decode the response body into `T`.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        request: &Request,
        timeout: Duration,
    ) -> Result<T> {
        let body = self.send(request, timeout).await?;

        serde_json::from_str(&body).map_err(|err| {
            log::warn!(target: "flagsmith",
                       path = request.path();
                       "failed to decode response body: {:?}", err);
            Error::from(err)
        })
    }

    /// Execute `request`, ignoring the response body.
    pub async fn execute_discarding(&self, request: &Request, timeout: Duration) -> Result<()> {
        self.send(request, timeout).await.map(|_body| ())
    }

    /// Send `request` and return the body of a successful response.
    async fn send(&self, request: &Request, timeout: Duration) -> Result<String> {
        if self.environment_key.is_empty() {
            return Err(Error::Configuration(format!(
                "{ENVIRONMENT_KEY_HEADER} is empty, set environment key in ClientConfig"
            )));
        }

        let descriptor = request.descriptor(&self.environment_key);

        let url = Url::parse_with_params(
            &format!("{}{}", self.base_url, descriptor.path),
            &descriptor.query,
        )
        .map_err(Error::InvalidBaseUrl)?;

        let mut headers = HeaderMap::with_capacity(descriptor.headers.len());
        for (name, value) in &descriptor.headers {
            let invalid = || Error::Configuration(format!("invalid header {name}: {value:?}"));
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
            let value = HeaderValue::from_str(value).map_err(|_| invalid())?;
            headers.insert(name, value);
        }

        let mut builder = self
            .client
            .request(descriptor.method.clone(), url)
            .headers(headers);
        if let Some(body) = &descriptor.body {
            builder = builder.body(body.to_string());
        }

        log::debug!(target: "flagsmith",
                    method = descriptor.method.as_str(),
                    path = descriptor.path;
                    "sending request");

        let exchange = async {
            let response = builder.send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        // Dropping the in-flight future on timeout guarantees a late response is never delivered.
        let (status, body) = match tokio::time::timeout(timeout, exchange).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                log::warn!(target: "flagsmith",
                           path = descriptor.path;
                           "error while sending request: {:?}", err);
                return Err(Error::from(err));
            }
            Err(_elapsed) => {
                log::warn!(target: "flagsmith",
                           path = descriptor.path;
                           "request timed out after {:?}", timeout);
                return Err(Error::Timeout(timeout));
            }
        };

        if !status.is_success() {
            log::warn!(target: "flagsmith",
                       path = descriptor.path,
                       status = status.as_u16();
                       "received non-2xx response");
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        log::debug!(target: "flagsmith",
                    path = descriptor.path,
                    status = status.as_u16();
                    "received response");

        Ok(body)
    }
}
