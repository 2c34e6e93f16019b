use anyhow::Context as _;
use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

use crate::dictionary::{Dictionary, DictionarySource, dictionary_path};
use crate::error::LoadError;

#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    pub fn new(user_agent: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("build reqwest client")?;
        Ok(Self { client })
    }

    pub async fn get_bytes(&self, url: Url) -> Result<Bytes, LoadError> {
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| LoadError::Request {
                url: url.clone(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(LoadError::Status {
                url,
                status: status.as_u16(),
            });
        }

        resp.bytes()
            .await
            .map_err(|source| LoadError::Request { url, source })
    }
}

#[derive(Clone)]
pub struct HttpSource {
    site_url: Url,
    fetcher: Fetcher,
}

impl HttpSource {
    pub fn new(site_url: Url, fetcher: Fetcher) -> Self {
        Self {
            site_url: as_directory(site_url),
            fetcher,
        }
    }

    pub fn dictionary_url(&self, code: &str) -> Result<Url, LoadError> {
        self.site_url
            .join(&dictionary_path(code))
            .map_err(|_| LoadError::UnusableCode(code.to_string()))
    }
}

#[async_trait]
impl DictionarySource for HttpSource {
    async fn fetch(&self, code: &str) -> Result<Dictionary, LoadError> {
        let url = self.dictionary_url(code)?;
        tracing::debug!(%url, "fetching dictionary");
        let bytes = self.fetcher.get_bytes(url).await?;
        Dictionary::from_json(code, &bytes)
    }
}

// `Url::join` replaces the last segment unless the base ends with a slash.
fn as_directory(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
