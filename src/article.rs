use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use lazy_static::*;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::text::{self, Body};

/// Slug used when no field yields a usable token.
pub const PLACEHOLDER_SLUG: &str = "untitled";
pub const PLACEHOLDER_TITLE: &str = "Untitled";

/// How an article's `content` should be interpreted.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentFormat {
    #[serde(alias = "plain")]
    Text,
    #[serde(alias = "markup")]
    Html,
}

/// An article as found in the data file. Every field is optional, and a
/// field holding a value of the wrong type is treated as absent.
#[derive(PartialEq, Debug, Clone, Deserialize, Default)]
pub struct ArticleRecord {
    pub id: Option<Value>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "lenient_format")]
    pub format: Option<ContentFormat>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub excerpt: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub author: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub published_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub images: Option<Vec<String>>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Numbers are milliseconds since the Unix epoch.
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|dt| dt.to_rfc3339()),
        _ => None,
    })
}

fn lenient_format<'de, D>(deserializer: D) -> Result<Option<ContentFormat>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(ContentFormat::deserialize(Value::deserialize(deserializer)?).ok())
}

/// A list of strings, or a single string. Other entries are dropped.
fn lenient_strings<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(vec![s]),
        Value::Array(values) => Some(
            values
                .into_iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    })
}

impl ArticleRecord {
    /// The article used when the data source is missing or empty.
    pub fn sample() -> ArticleRecord {
        ArticleRecord {
            title: Some("Welcome to the Newsroom".to_string()),
            content: Some(
                "This is a sample article.\n\nAdd your own articles to the data file and rebuild the site."
                    .to_string(),
            ),
            author: Some("The Editors".to_string()),
            ..Default::default()
        }
    }

    fn identifier(&self) -> Option<String> {
        match self.id.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn body(&self) -> Body<'_> {
        let content = self.content.as_deref().unwrap_or("");
        match self.format {
            Some(ContentFormat::Text) => Body::PlainText(content),
            Some(ContentFormat::Html) => Body::Markup(content),
            None => Body::sniff(content),
        }
    }

    fn image_refs(&self) -> Vec<String> {
        self.image
            .iter()
            .chain(self.images.iter().flatten())
            .filter(|s| !s.trim().is_empty())
            .cloned()
            .collect()
    }
}

/// Lowercase `s` and collapse every run of characters outside `[a-z0-9]`
/// into a single hyphen, without leading or trailing hyphens.
pub fn slugify(s: &str) -> String {
    lazy_static! {
        static ref NON_ALNUM: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
    }
    let lower = s.to_lowercase();
    NON_ALNUM
        .replace_all(&lower, "-")
        .trim_matches('-')
        .to_string()
}

/// Explicit slug, then identifier, then title. The first one that slugifies to
/// something non-empty wins.
pub fn derive_slug(record: &ArticleRecord) -> String {
    [record.slug.clone(), record.identifier(), record.title.clone()]
        .into_iter()
        .flatten()
        .map(|s| slugify(&s))
        .find(|s| !s.is_empty())
        .unwrap_or_else(|| PLACEHOLDER_SLUG.to_string())
}

pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    const NAIVE_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// The publication timestamp of a record: `date`, then `published_at`.
/// Unparseable values are ignored.
pub fn resolve_date(record: &ArticleRecord) -> Option<DateTime<Utc>> {
    [record.date.as_deref(), record.published_at.as_deref()]
        .into_iter()
        .flatten()
        .find_map(parse_timestamp)
}

/// An article ready for rendering.
#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct Article {
    pub slug: String,
    pub title: String,
    pub author: Option<String>,
    pub category: Option<String>,
    pub excerpt: String,
    /// Formatted body markup.
    pub content: String,
    pub images: Vec<String>,
    /// Timestamp taken from the record, if any. Used for ordering.
    #[serde(skip)]
    pub published: Option<DateTime<Utc>>,
    /// `published`, or the build time when the record has none.
    pub date: DateTime<Utc>,
    pub display_date: String,
}

impl Article {
    pub fn new(record: &ArticleRecord, build_time: DateTime<Utc>) -> Article {
        let published = resolve_date(record);
        let date = published.unwrap_or(build_time);
        let excerpt = match record.excerpt.as_deref() {
            Some(e) if !e.trim().is_empty() => text::truncate(e),
            _ => text::excerpt(record.content.as_deref().unwrap_or("")),
        };
        let title = match record.title.as_deref() {
            Some(t) if !t.trim().is_empty() => t.to_string(),
            _ => PLACEHOLDER_TITLE.to_string(),
        };

        Article {
            slug: derive_slug(record),
            title,
            author: record.author.clone().filter(|a| !a.trim().is_empty()),
            category: record.category.clone().filter(|c| !c.trim().is_empty()),
            excerpt,
            content: record.body().render(),
            images: record.image_refs(),
            published,
            date,
            display_date: date.format("%B %-d, %Y").to_string(),
        }
    }

    pub fn url(&self) -> String {
        format!("articles/{}.html", self.slug)
    }
}

/// Newest first. Articles without a timestamp sort as the Unix epoch; ties
/// keep input order.
pub fn sort_newest_first(articles: &mut [Article]) {
    articles.sort_by_key(|a| std::cmp::Reverse(a.published.unwrap_or_default()));
}
