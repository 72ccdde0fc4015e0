//! Article model and content categories

use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// The content categories served by the API, one directory each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Announcements,
    Rules,
    Economy,
    ServerGuide,
    Life,
    Adventure,
    Transport,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Announcements,
        Category::Rules,
        Category::Economy,
        Category::ServerGuide,
        Category::Life,
        Category::Adventure,
        Category::Transport,
    ];

    /// Directory name under the content root
    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Announcements => "announcements",
            Category::Rules => "rules",
            Category::Economy => "economy",
            Category::ServerGuide => "server-guide",
            Category::Life => "life",
            Category::Adventure => "adventure",
            Category::Transport => "transport",
        }
    }

    /// Sort a category listing into its presentation order.
    ///
    /// Announcements: newest first, undated entries last. Rules and the
    /// server guide: explicit `order`, unordered entries last. Economy and
    /// life: grouped by `type` with untyped entries last, then `number`.
    /// Adventure and transport: `number`. File id breaks every tie so
    /// listings are stable.
    pub fn sort(&self, articles: &mut [Article]) {
        match self {
            Category::Announcements => articles.sort_by(|a, b| {
                match (a.sort_date(), b.sort_date()) {
                    (Some(x), Some(y)) => y.cmp(&x).then_with(|| a.id.cmp(&b.id)),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => a.id.cmp(&b.id),
                }
            }),
            Category::Rules | Category::ServerGuide => articles.sort_by(|a, b| {
                a.order
                    .unwrap_or(i64::MAX)
                    .cmp(&b.order.unwrap_or(i64::MAX))
                    .then_with(|| a.id.cmp(&b.id))
            }),
            Category::Economy | Category::Life => articles.sort_by(|a, b| {
                let ak = a.kind.as_deref();
                let bk = b.kind.as_deref();
                // Untyped entries go last, like every other missing sort key
                ak.is_none()
                    .cmp(&bk.is_none())
                    .then_with(|| ak.cmp(&bk))
                    .then_with(|| {
                        a.number
                            .unwrap_or(i64::MAX)
                            .cmp(&b.number.unwrap_or(i64::MAX))
                    })
                    .then_with(|| a.id.cmp(&b.id))
            }),
            Category::Adventure | Category::Transport => articles.sort_by(|a, b| {
                a.number
                    .unwrap_or(i64::MAX)
                    .cmp(&b.number.unwrap_or(i64::MAX))
                    .then_with(|| a.id.cmp(&b.id))
            }),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.dir_name() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Error for a category name outside [`Category::ALL`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown category: {}", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

/// One content file, as served by the API
#[derive(Debug, Clone, Serialize)]
pub struct Article {
    /// File stem, also the lookup key
    pub id: String,

    /// Category the file was loaded from
    pub category: Category,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Date exactly as authored; only parsed for sorting
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    /// Grouping key within economy and life listings
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<i64>,

    /// Rendered body
    #[serde(rename = "contentHtml", skip_serializing_if = "Option::is_none")]
    pub content_html: Option<String>,

    /// Raw markdown body, only present on detail responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Custom front-matter fields, passed through untouched
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_yaml::Value>,
}

impl Article {
    /// Parse the authored date for sorting. Accepts RFC 3339 plus the
    /// date and date-time layouts the content files actually use.
    pub fn sort_date(&self) -> Option<NaiveDateTime> {
        let s = self.date.as_deref()?.trim();

        if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
            return Some(dt.naive_utc());
        }
        for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d %H:%M:%S"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(dt);
            }
        }
        for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
            if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
                return d.and_hms_opt(0, 0, 0);
            }
        }
        None
    }
}

/// Typed front-matter schema for articles
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ArticleMatter {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub order: Option<i64>,
    pub number: Option<i64>,

    /// Additional custom fields
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_yaml::Value>,
}
