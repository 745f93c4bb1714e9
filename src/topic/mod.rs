//! Topic pages: the typed payload record and its extraction from HTML

mod extract;
mod model;

pub use extract::{extract_next_data, extract_topic, find_one, find_one_or_none};
pub use model::{Article, NextData, PageProps, Props, Topic};
