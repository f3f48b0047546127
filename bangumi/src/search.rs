use crate::subject::Subject;
use crate::{Error, Session};

use reqwest::{StatusCode, Url};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    list: Option<Vec<Subject>>,
}

impl Session {
    /// Searches anime subjects by keyword.
    ///
    /// The legacy endpoint answers "no matches" with a 404 or a body without
    /// a `list`; both are an empty result.
    pub async fn search(&self, keyword: &str) -> Result<Vec<Subject>, Error> {
        let response = self.get(self.search_url(keyword)?).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        let response: Response = response.error_for_status()?.json().await?;

        Ok(response.list.unwrap_or_default())
    }

    fn search_url(&self, keyword: &str) -> Result<Url, Error> {
        let mut url = self.url(["search", "subject", keyword])?;

        let _ = url
            .query_pairs_mut()
            .append_pair("type", "2")
            .append_pair("responseGroup", "small");

        Ok(url)
    }
}
