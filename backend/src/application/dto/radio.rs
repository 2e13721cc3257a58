use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Decoded query-string pairs
pub type QueryParams = HashMap<String, String>;

/// Field name to the messages explaining why its value was rejected
pub type ParamErrors = BTreeMap<String, Vec<String>>;

const INVALID_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";

/// List filters parsed from a query string; empty values mean "no filter"
pub trait FromQueryParams: Sized {
    fn from_params(params: &QueryParams) -> Result<Self, ParamErrors>;
}

fn text(params: &QueryParams, key: &str) -> Option<String> {
    params.get(key).filter(|v| !v.is_empty()).cloned()
}

/// Primary-key filter; anything that is not an id is an invalid choice
fn id(params: &QueryParams, key: &str, errors: &mut ParamErrors) -> Option<i64> {
    let value = text(params, key)?;
    match value.trim().parse() {
        Ok(id) => Some(id),
        Err(_) => {
            errors.insert(key.to_string(), vec![INVALID_CHOICE.to_string()]);
            None
        }
    }
}

/// Boolean filter accepting `true`/`True`/`1` and `false`/`False`/`0`; anything else is ignored
fn flag(params: &QueryParams, key: &str) -> Option<bool> {
    match text(params, key)?.as_str() {
        "true" | "True" | "1" => Some(true),
        "false" | "False" | "0" => Some(false),
        _ => None,
    }
}

/// `?search=&ordering=` for categories and blog posts
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub search: Option<String>,
    pub ordering: Option<String>,
}

impl FromQueryParams for ListQuery {
    fn from_params(params: &QueryParams) -> Result<Self, ParamErrors> {
        Ok(ListQuery {
            search: text(params, "search"),
            ordering: text(params, "ordering"),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct StationQuery {
    pub category: Option<i64>,
    pub country: Option<String>,
    pub language: Option<String>,
    pub quality: Option<String>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

impl FromQueryParams for StationQuery {
    fn from_params(params: &QueryParams) -> Result<Self, ParamErrors> {
        let mut errors = ParamErrors::new();
        let query = StationQuery {
            category: id(params, "category", &mut errors),
            country: text(params, "country"),
            language: text(params, "language"),
            quality: text(params, "quality"),
            search: text(params, "search"),
            ordering: text(params, "ordering"),
        };
        if errors.is_empty() {
            Ok(query)
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    pub station: Option<i64>,
    pub event_type: Option<String>,
    pub is_featured: Option<bool>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

impl FromQueryParams for EventQuery {
    fn from_params(params: &QueryParams) -> Result<Self, ParamErrors> {
        let mut errors = ParamErrors::new();
        let query = EventQuery {
            station: id(params, "station", &mut errors),
            event_type: text(params, "event_type"),
            is_featured: flag(params, "is_featured"),
            search: text(params, "search"),
            ordering: text(params, "ordering"),
        };
        if errors.is_empty() {
            Ok(query)
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewListening {
    pub station: i64,
    #[serde(default)]
    pub duration_minutes: i64,
    pub listened_at: Option<DateTime<Utc>>,
}

/// Contact form; every field is required but may arrive missing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewContact {
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FavoriteToggle {
    pub is_favorited: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListenerCount {
    pub listeners_count: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryFixture {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StationFixture {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub stream_url: String,
    pub logo_url: Option<String>,
    /// Category name
    pub category: Option<String>,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub quality: String,
    #[serde(default)]
    pub listeners_count: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventFixture {
    /// Station name
    pub station: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub event_type: String,
    #[serde(default)]
    pub host: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub is_featured: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlogPostFixture {
    pub title: String,
    /// Derived from the title when absent
    pub slug: Option<String>,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub tags: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub is_featured: bool,
    pub published_at: Option<DateTime<Utc>>,
}

/// Seed data for the radio tables
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RadioFixtures {
    pub categories: Vec<CategoryFixture>,
    pub stations: Vec<StationFixture>,
    pub events: Vec<EventFixture>,
    pub blog_posts: Vec<BlogPostFixture>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FixtureImportSummary {
    pub categories: usize,
    pub stations: usize,
    pub events: usize,
    pub blog_posts: usize,
}

fn default_true() -> bool {
    true
}

fn default_status() -> String {
    "published".to_string()
}
