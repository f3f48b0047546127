use crate::subject::Subject;
use crate::{Error, Session};

use futures_util::future;
use reqwest::Url;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

const ANIME: &str = "2";
const PAGE_SIZE: &str = "30";

/// A collection status. Variants are declared in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Wish,
    Watching,
    Completed,
    OnHold,
    Dropped,
}

impl Category {
    pub const ALL: &[Self] = &[
        Self::Wish,
        Self::Watching,
        Self::Completed,
        Self::OnHold,
        Self::Dropped,
    ];

    /// The collection type code used by the API.
    pub fn code(self) -> u8 {
        match self {
            Self::Wish => 1,
            Self::Completed => 2,
            Self::Watching => 3,
            Self::OnHold => 4,
            Self::Dropped => 5,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Wish => "wish",
            Self::Watching => "watching",
            Self::Completed => "completed",
            Self::OnHold => "on_hold",
            Self::Dropped => "dropped",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Wish => "Wish",
            Self::Watching => "Watching",
            Self::Completed => "Completed",
            Self::OnHold => "On Hold",
            Self::Dropped => "Dropped",
        })
    }
}

/// A raw collection item.
#[derive(Debug, Clone, Deserialize)]
pub struct Item {
    pub subject: Subject,
    #[serde(default)]
    pub ep_status: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub subject: Subject,
    pub watched: u32,
    pub category: Category,
}

/// A user's collection, bucketed by category.
#[derive(Debug, Clone, Default)]
pub struct Shelf {
    buckets: BTreeMap<Category, Vec<Entry>>,
    failures: BTreeMap<Category, Error>,
}

impl Shelf {
    /// Fetches every category of the user's anime collection concurrently.
    ///
    /// A failed category does not discard the others; it is kept as a failure.
    pub fn fetch(session: &Session, user: &str) -> impl Future<Output = Self> + 'static {
        let session = session.clone();
        let user = user.to_owned();

        async move {
            let results = future::join_all(Category::ALL.iter().map(|&category| {
                let session = &session;
                let user = &user;

                async move { (category, session.collection(user, category).await) }
            }))
            .await;

            Self::from_results(results)
        }
    }

    pub fn from_results(
        results: impl IntoIterator<Item = (Category, Result<Vec<Item>, Error>)>,
    ) -> Self {
        let mut shelf = Self::default();

        for (category, result) in results {
            match result {
                Ok(items) => {
                    let bucket = shelf.buckets.entry(category).or_default();

                    bucket.extend(items.into_iter().map(|item| Entry {
                        subject: item.subject,
                        watched: item.ep_status.unwrap_or_default(),
                        category,
                    }));
                }
                Err(error) => {
                    log::error!(
                        "Failed to fetch {key} collection: {error}",
                        key = category.key()
                    );

                    let _ = shelf.failures.insert(category, error);
                }
            }
        }

        shelf
    }

    /// Non-empty buckets, in display order.
    pub fn sections(&self) -> impl Iterator<Item = (Category, &[Entry])> {
        self.buckets
            .iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(category, entries)| (*category, entries.as_slice()))
    }

    pub fn failures(&self) -> impl Iterator<Item = (Category, &Error)> {
        self.failures
            .iter()
            .map(|(category, error)| (*category, error))
    }

    pub fn total(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Whether no category could be fetched at all.
    pub fn is_unavailable(&self) -> bool {
        self.buckets.is_empty() && !self.failures.is_empty()
    }
}

impl Session {
    pub async fn collection(&self, user: &str, category: Category) -> Result<Vec<Item>, Error> {
        #[derive(Deserialize)]
        struct Response {
            #[serde(default)]
            data: Vec<Item>,
        }

        let response: Response = self.fetch(self.collection_url(user, category)?).await?;

        Ok(response.data)
    }

    fn collection_url(&self, user: &str, category: Category) -> Result<Url, Error> {
        let mut url = self.url(["v0", "users", user, "collections"])?;

        let _ = url
            .query_pairs_mut()
            .append_pair("subject_type", ANIME)
            .append_pair("type", &category.code().to_string())
            .append_pair("limit", PAGE_SIZE);

        Ok(url)
    }
}
