//! reqwest-backed [`HttpRequest`] used outside of tests.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use telemetry::{Error, HttpRequest};
use tracing::debug;

const USER_AGENT: &str = "ThiswayVehicleEmulator/1.0";

#[derive(Debug, Clone)]
pub struct ReqwestProvider {
    client: reqwest::Client,
}

impl ReqwestProvider {
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("building HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpRequest for ReqwestProvider {
    async fn fetch(&self, request: Request<Vec<u8>>) -> Result<Response<Bytes>> {
        let uri = request.uri().to_string();
        let request = reqwest::Request::try_from(request).context("converting request")?;

        let response = self.client.execute(request).await.map_err(|e| classify(&uri, e))?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| classify(&uri, e))?;
        debug!(uri = %uri, status = status.as_u16(), bytes = body.len(), "fetched");

        let mut builder = Response::builder().status(status);
        if let Some(map) = builder.headers_mut() {
            *map = headers;
        }
        builder.body(body).context("building response")
    }
}

fn classify(uri: &str, err: reqwest::Error) -> anyhow::Error {
    if err.is_timeout() {
        Error::Timeout(format!("{uri}: {err}")).into()
    } else if err.is_connect() {
        Error::Connection(format!("{uri}: {err}")).into()
    } else {
        anyhow::Error::new(err).context(format!("request to {uri} failed"))
    }
}
