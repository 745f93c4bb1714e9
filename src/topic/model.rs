//! Typed record of a topic page's embedded `__NEXT_DATA__` payload
//!
//! Only the fields the harvest needs are modeled; anything else in the
//! payload is ignored on deserialization.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Root of the `__NEXT_DATA__` JSON document
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextData {
    pub props: Props,
    pub page: String,
    pub build_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Props {
    pub page_props: PageProps,
}

/// Page-level properties of a topic listing
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageProps {
    pub res_topic: Topic,
    pub current_page: u32,
    #[serde(default)]
    pub next_page: Option<u32>,
    #[serde(default)]
    pub articles: Vec<Article>,
}

/// The topic described by a page; this is what ends up in the metadata file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: u64,
    pub name: String,
    pub taggings_count: u64,
    pub image_url: String,
    pub display_name: String,
    pub articles_count: u64,
    pub books_count: u64,
    pub scraps_count: u64,
}

/// An article listed on a topic page
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: u64,
    pub title: String,
    pub slug: String,
    pub path: String,
    #[serde(default)]
    pub liked_count: u64,
    pub published_at: DateTime<FixedOffset>,
}
