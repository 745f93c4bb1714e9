//! Extraction of the `__NEXT_DATA__` payload from a topic page
//!
//! The page must contain exactly one
//! `<script type="application/json" id="__NEXT_DATA__">` element, and that
//! element exactly one text child. Anything else means the page layout is
//! not the one we know how to read, and the run fails.

use crate::topic::model::{NextData, Topic};
use crate::{HarvestError, Result};
use scraper::{Html, Selector};
use url::Url;

const NEXT_DATA_SELECTOR: &str = r#"script[type="application/json"]#__NEXT_DATA__"#;

/// Returns the only item, or an error naming `what` if there are zero or several
pub fn find_one<T>(items: impl IntoIterator<Item = T>, url: &Url, what: &str) -> Result<T> {
    match find_one_or_none(items, url, what)? {
        Some(item) => Ok(item),
        None => Err(HarvestError::AmbiguousPageStructure {
            url: url.to_string(),
            message: format!("no {} found", what),
        }),
    }
}

/// Returns the only item, `None` if there are none, or an error if there are several
pub fn find_one_or_none<T>(
    items: impl IntoIterator<Item = T>,
    url: &Url,
    what: &str,
) -> Result<Option<T>> {
    let mut items = items.into_iter();
    let first = items.next();

    if first.is_some() && items.next().is_some() {
        return Err(HarvestError::AmbiguousPageStructure {
            url: url.to_string(),
            message: format!("multiple {} found", what),
        });
    }

    Ok(first)
}

/// Parses the embedded payload of the page at `url`
pub fn extract_next_data(url: &Url, html: &str) -> Result<NextData> {
    let payload = {
        let document = Html::parse_document(html);
        let selector = Selector::parse(NEXT_DATA_SELECTOR).map_err(|e| {
            HarvestError::AmbiguousPageStructure {
                url: url.to_string(),
                message: format!("invalid selector: {:?}", e),
            }
        })?;

        let script = find_one(document.select(&selector), url, "__NEXT_DATA__ script")?;
        let child = find_one(script.children(), url, "__NEXT_DATA__ text node")?;

        match child.value().as_text() {
            Some(text) => text.text.to_string(),
            None => {
                return Err(HarvestError::AmbiguousPageStructure {
                    url: url.to_string(),
                    message: "__NEXT_DATA__ child is not text".to_string(),
                })
            }
        }
    };

    Ok(serde_json::from_str(&payload)?)
}

/// Extracts the topic record from the page at `url`
pub fn extract_topic(url: &Url, html: &str) -> Result<Topic> {
    let data = extract_next_data(url, html)?;
    tracing::debug!(
        "Parsed {} (page {}, {} article(s))",
        url,
        data.props.page_props.current_page,
        data.props.page_props.articles.len()
    );
    Ok(data.props.page_props.res_topic)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{
        "props": {
            "pageProps": {
                "resTopic": {
                    "id": 1,
                    "name": "rust",
                    "taggingsCount": 10,
                    "imageUrl": "https://cdn.example.com/topics/rust.png",
                    "displayName": "Rust",
                    "articlesCount": 8,
                    "booksCount": 1,
                    "scrapsCount": 1
                },
                "isContest": false,
                "currentPage": 1,
                "activeItemType": "article",
                "articles": [],
                "nextPage": 2
            }
        },
        "page": "/topics/[name]",
        "buildId": "abc123"
    }"#;

    fn page_url() -> Url {
        Url::parse("https://example.com/topics/rust").unwrap()
    }

    fn page_with(scripts: &str) -> String {
        format!("<html><head>{}</head><body><p>hi</p></body></html>", scripts)
    }

    fn next_data_script(body: &str) -> String {
        format!(
            r#"<script type="application/json" id="__NEXT_DATA__">{}</script>"#,
            body
        )
    }

    #[test]
    fn test_find_one() {
        let url = page_url();
        assert_eq!(find_one(vec![3], &url, "x").unwrap(), 3);
        assert!(matches!(
            find_one(Vec::<u8>::new(), &url, "x"),
            Err(HarvestError::AmbiguousPageStructure { .. })
        ));
        assert!(matches!(
            find_one(vec![1, 2], &url, "x"),
            Err(HarvestError::AmbiguousPageStructure { .. })
        ));
    }

    #[test]
    fn test_find_one_or_none() {
        let url = page_url();
        assert_eq!(find_one_or_none(Vec::<u8>::new(), &url, "x").unwrap(), None);
        assert_eq!(find_one_or_none(vec![5], &url, "x").unwrap(), Some(5));
        assert!(find_one_or_none(vec![1, 2, 3], &url, "x").is_err());
    }

    #[test]
    fn test_extract_topic() {
        let html = page_with(&next_data_script(PAYLOAD));
        let topic = extract_topic(&page_url(), &html).unwrap();

        assert_eq!(topic.name, "rust");
        assert_eq!(topic.display_name, "Rust");
        assert_eq!(topic.image_url, "https://cdn.example.com/topics/rust.png");
    }

    #[test]
    fn test_extract_next_data_fields() {
        let html = page_with(&next_data_script(PAYLOAD));
        let data = extract_next_data(&page_url(), &html).unwrap();

        assert_eq!(data.build_id, "abc123");
        assert_eq!(data.props.page_props.next_page, Some(2));
    }

    #[test]
    fn test_other_json_scripts_ignored() {
        let html = page_with(&format!(
            r#"<script type="application/json" id="other">{{}}</script>{}"#,
            next_data_script(PAYLOAD)
        ));
        assert!(extract_topic(&page_url(), &html).is_ok());
    }

    #[test]
    fn test_missing_payload_is_ambiguous() {
        let html = page_with("");
        let err = extract_topic(&page_url(), &html).unwrap_err();
        assert!(matches!(err, HarvestError::AmbiguousPageStructure { .. }));
    }

    #[test]
    fn test_duplicate_payload_is_ambiguous() {
        let script = next_data_script(PAYLOAD);
        let html = page_with(&format!("{}{}", script, script));
        let err = extract_topic(&page_url(), &html).unwrap_err();
        assert!(matches!(err, HarvestError::AmbiguousPageStructure { .. }));
    }

    #[test]
    fn test_empty_payload_is_ambiguous() {
        let html = page_with(&next_data_script(""));
        let err = extract_topic(&page_url(), &html).unwrap_err();
        assert!(matches!(err, HarvestError::AmbiguousPageStructure { .. }));
    }

    #[test]
    fn test_malformed_payload_is_json_error() {
        let html = page_with(&next_data_script("{not json"));
        let err = extract_topic(&page_url(), &html).unwrap_err();
        assert!(matches!(err, HarvestError::Json(_)));
    }
}
