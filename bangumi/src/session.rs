use crate::Error;

use bytes::Bytes;
use reqwest::Url;
use reqwest::header;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://api.bgm.tv";

/// A shared connection to the catalog API.
///
/// Cloning is cheap; clones reuse the same connection pool.
#[derive(Debug, Clone)]
pub struct Session {
    client: reqwest::Client,
    endpoint: Url,
}

impl Session {
    pub fn new(endpoint: &str, user_agent: &str, timeout: Duration) -> Result<Self, Error> {
        let endpoint = Url::parse(endpoint)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| Error::InvalidEndpoint(endpoint.to_owned()))?;

        let client = reqwest::ClientBuilder::new()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        log::info!("Bangumi session started (endpoint: {endpoint}, user agent: {user_agent})");

        Ok(Self { client, endpoint })
    }

    pub async fn download(&self, url: &str) -> Result<Bytes, Error> {
        log::info!("Downloading image: {url}");

        let response = self.client.get(url).send().await?;

        Ok(response.error_for_status()?.bytes().await?)
    }

    pub(crate) fn url<'a>(
        &self,
        segments: impl IntoIterator<Item = &'a str>,
    ) -> Result<Url, Error> {
        let mut url = self.endpoint.clone();

        let _ = url
            .path_segments_mut()
            .map_err(|()| Error::InvalidEndpoint(self.endpoint.to_string()))?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    pub(crate) fn get(&self, url: Url) -> reqwest::RequestBuilder {
        log::info!("Fetching: {url}");

        self.client
            .get(url)
            .header(header::ACCEPT, "application/json")
    }

    pub(crate) async fn fetch<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        let response = self.get(url).send().await?.error_for_status()?;

        Ok(response.json().await?)
    }
}
