use crate::{Error, Session};

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(u64);

impl Id {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A catalog entry as embedded in collection and search results.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Subject {
    pub id: Id,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub name_cn: Option<String>,
    #[serde(default)]
    pub images: Option<Images>,
    #[serde(default)]
    pub eps: Option<u32>,
}

impl Subject {
    /// The localized name, if any; otherwise the native one.
    pub fn display_name(&self) -> &str {
        present(&self.name_cn).unwrap_or(self.name.as_str())
    }

    /// The native name, only when it is not already the display name.
    pub fn original_name(&self) -> Option<&str> {
        let localized = present(&self.name_cn)?;

        (!self.name.is_empty() && self.name != localized).then_some(self.name.as_str())
    }

    pub fn cover(&self) -> Option<&str> {
        let images = self.images.as_ref()?;

        images.large().or_else(|| images.common())
    }

    pub fn episodes(&self) -> u32 {
        self.eps.unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Images {
    #[serde(default)]
    pub large: Option<String>,
    #[serde(default)]
    pub common: Option<String>,
    #[serde(default)]
    pub medium: Option<String>,
    #[serde(default)]
    pub small: Option<String>,
    #[serde(default)]
    pub grid: Option<String>,
}

impl Images {
    pub fn large(&self) -> Option<&str> {
        present(&self.large)
    }

    pub fn common(&self) -> Option<&str> {
        present(&self.common)
    }
}

/// Full subject metadata, as served by `/v0/subjects/{id}`.
///
/// Every field is optional; absent and blank values are reported as `None`
/// by the accessors.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Detail {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub name_cn: Option<String>,
    #[serde(default)]
    pub images: Option<Images>,
    #[serde(default)]
    pub eps: Option<u32>,
    #[serde(default)]
    pub summary: Option<String>,
}

impl Detail {
    pub fn summary(&self) -> Option<&str> {
        present(&self.summary)
    }

    pub fn episodes(&self) -> Option<u32> {
        self.eps.filter(|eps| *eps > 0)
    }

    pub fn cover(&self) -> Option<&str> {
        self.images.as_ref()?.common()
    }
}

impl Session {
    pub async fn subject(&self, id: Id) -> Result<Detail, Error> {
        let id = id.to_string();
        let url = self.url(["v0", "subjects", &id])?;

        self.fetch(url).await
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}
