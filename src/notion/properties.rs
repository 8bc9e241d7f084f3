//! Paper metadata → Notion database properties.
//!
//! | Property     | Notion type    | Source                                  |
//! |--------------|----------------|-----------------------------------------|
//! | `Name`       | `title`        | title                                   |
//! | `Authors`    | `multi_select` | authors, blanks dropped                 |
//! | `Year`       | `number`       | year, when present                      |
//! | `BibTeX Key` | `rich_text`    | citation key                            |
//! | `URL/DOI`    | `url`          | url, else DOI as `https://doi.org/...`  |
//!
//! The target database must define these property names with these types;
//! Notion rejects the page otherwise.

use crate::notion::PageProperties;
use crate::pipeline::blocks::{truncate, MAX_NODE_CHARS};
use crate::source::PaperMetadata;
use serde_json::{json, Value};

/// Longest multi-select option name Notion accepts.
const MAX_OPTION_CHARS: usize = 100;

/// Build the property map for one paper's page.
pub fn build_properties(metadata: &PaperMetadata) -> PageProperties {
    let mut props = PageProperties::new();

    props.insert("Name".into(), json!({ "title": [text(&metadata.title)] }));

    let authors = format_authors(&metadata.authors);
    if !authors.is_empty() {
        props.insert("Authors".into(), json!({ "multi_select": authors }));
    }

    if let Some(year) = metadata.year {
        props.insert("Year".into(), json!({ "number": year }));
    }

    props.insert(
        "BibTeX Key".into(),
        json!({ "rich_text": [text(&metadata.bib_key)] }),
    );

    if let Some(link) = url_or_doi(metadata) {
        props.insert("URL/DOI".into(), json!({ "url": link }));
    }

    props
}

/// Multi-select options for the author list, in order.
///
/// Notion forbids commas in option names, so `Last, First` is reordered to
/// `First Last`; blank names are dropped.
pub fn format_authors(authors: &[String]) -> Vec<Value> {
    authors
        .iter()
        .map(|a| display_name(a))
        .filter(|a| !a.is_empty())
        .map(|a| json!({ "name": truncate(&a, MAX_OPTION_CHARS) }))
        .collect()
}

fn display_name(author: &str) -> String {
    let author = author.trim();
    match author.split_once(',') {
        Some((last, first)) => format!("{first} {last}")
            .replace(',', " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" "),
        None => author.to_string(),
    }
}

/// The paper link: URL when present, else the DOI as a resolver URL.
pub fn url_or_doi(metadata: &PaperMetadata) -> Option<String> {
    if let Some(url) = &metadata.url {
        return Some(url.clone());
    }
    metadata.doi.as_ref().map(|doi| {
        if doi.starts_with("http://") || doi.starts_with("https://") {
            doi.clone()
        } else {
            format!("https://doi.org/{doi}")
        }
    })
}

fn text(content: &str) -> Value {
    json!({ "type": "text", "text": { "content": truncate(content, MAX_NODE_CHARS) } })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper() -> PaperMetadata {
        PaperMetadata {
            bib_key: "vaswani2017attention".into(),
            title: "Attention Is All You Need".into(),
            authors: vec!["Ashish Vaswani".into(), "  ".into(), "Shazeer, Noam".into()],
            year: Some(2017),
            url: None,
            doi: Some("10.48550/arXiv.1706.03762".into()),
        }
    }

    #[test]
    fn full_property_map() {
        let props = build_properties(&paper());
        assert_eq!(
            props["Name"]["title"][0]["text"]["content"],
            "Attention Is All You Need"
        );
        assert_eq!(props["Year"]["number"], 2017);
        assert_eq!(
            props["BibTeX Key"]["rich_text"][0]["text"]["content"],
            "vaswani2017attention"
        );
        assert_eq!(
            props["URL/DOI"]["url"],
            "https://doi.org/10.48550/arXiv.1706.03762"
        );
        let authors = props["Authors"]["multi_select"].as_array().unwrap();
        assert_eq!(authors.len(), 2);
        assert_eq!(authors[1]["name"], "Noam Shazeer");
    }

    #[test]
    fn optional_properties_are_omitted() {
        let meta = PaperMetadata {
            authors: vec![],
            year: None,
            doi: None,
            ..paper()
        };
        let props = build_properties(&meta);
        assert!(!props.contains_key("Authors"));
        assert!(!props.contains_key("Year"));
        assert!(!props.contains_key("URL/DOI"));
        assert!(props.contains_key("Name"));
        assert!(props.contains_key("BibTeX Key"));
    }

    #[test]
    fn url_is_preferred_over_doi() {
        let meta = PaperMetadata {
            url: Some("https://arxiv.org/abs/1706.03762".into()),
            ..paper()
        };
        assert_eq!(
            url_or_doi(&meta).as_deref(),
            Some("https://arxiv.org/abs/1706.03762")
        );
    }

    #[test]
    fn doi_that_is_already_a_url_is_kept() {
        let meta = PaperMetadata {
            doi: Some("https://doi.org/10.1/x".into()),
            ..paper()
        };
        assert_eq!(url_or_doi(&meta).as_deref(), Some("https://doi.org/10.1/x"));
    }

    #[test]
    fn author_names_never_contain_commas() {
        let opts = format_authors(&["Doe, Jr., John".into(), "Plato".into()]);
        assert_eq!(opts[0]["name"], "Jr. John Doe");
        assert_eq!(opts[1]["name"], "Plato");
    }
}
