//! Tool registry client
//!
//! Pages through the bio.tools listing for one topic. Only the fields the
//! resolver needs are deserialized; everything else in the payload is
//! ignored.

use async_trait::async_trait;
use pubmetric_common::{HttpSession, Result};
use serde::Deserialize;

/// One page of the registry listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistryPage {
    /// Total number of tools in the domain
    #[serde(default)]
    pub count: u64,

    /// Query string of the next page (`?page=N`), absent on the last page
    #[serde(default)]
    pub next: Option<String>,

    #[serde(default)]
    pub list: Vec<RegistryEntry>,
}

impl RegistryPage {
    /// Page number encoded in the `next` token
    pub fn next_page(&self) -> Option<u32> {
        let token = self.next.as_deref()?;
        token
            .rsplit("page=")
            .next()
            .and_then(|n| n.split('&').next())
            .and_then(|n| n.trim().parse().ok())
    }
}

/// A tool as listed by the registry
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistryEntry {
    pub name: String,

    #[serde(default)]
    pub publication: Option<Vec<Publication>>,
}

impl RegistryEntry {
    pub fn publications(&self) -> &[Publication] {
        self.publication.as_deref().unwrap_or(&[])
    }

    /// Primary publication: explicit primary flag, else the first listed
    ///
    /// The boolean tells whether a primary flag was found.
    pub fn primary_publication(&self) -> Option<(&Publication, bool)> {
        let publications = self.publications();
        publications
            .iter()
            .find(|p| p.is_primary())
            .map(|p| (p, true))
            .or_else(|| publications.first().map(|p| (p, false)))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Publication {
    #[serde(default)]
    pub pmid: Option<String>,

    #[serde(default)]
    pub doi: Option<String>,

    #[serde(default, rename = "type")]
    pub kind: Option<Vec<String>>,

    #[serde(default)]
    pub metadata: Option<PublicationMetadata>,
}

impl Publication {
    pub fn is_primary(&self) -> bool {
        self.kind
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .any(|k| k.eq_ignore_ascii_case("primary"))
    }

    /// Non-empty PubMed identifier
    pub fn identifier(&self) -> Option<&str> {
        non_empty(self.pmid.as_deref())
    }

    pub fn doi(&self) -> Option<&str> {
        non_empty(self.doi.as_deref())
    }

    /// Year from the registry's publication date (`2013-01-01T00:00:00Z`)
    pub fn year(&self) -> Option<i32> {
        self.metadata
            .as_ref()
            .and_then(|m| m.date.as_deref())
            .and_then(leading_year)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublicationMetadata {
    #[serde(default)]
    pub date: Option<String>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Leading four-digit year of a date string (`"2013 Jan 5"`, `"2013-01-01"`)
pub fn leading_year(date: &str) -> Option<i32> {
    let digits: String = date.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() == 4 {
        digits.parse().ok()
    } else {
        None
    }
}

/// Source of registry pages
#[async_trait]
pub trait RegistrySource: Send + Sync {
    /// Fetch one page (1-based) of the tools annotated with `domain`
    async fn fetch_page(&self, domain: &str, page: u32) -> Result<RegistryPage>;
}

/// bio.tools HTTP client
pub struct BioToolsRegistry {
    session: HttpSession,
    base_url: String,
}

impl BioToolsRegistry {
    pub fn new(session: HttpSession, base_url: impl Into<String>) -> Self {
        Self {
            session,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl RegistrySource for BioToolsRegistry {
    async fn fetch_page(&self, domain: &str, page: u32) -> Result<RegistryPage> {
        let url = format!("{}/t", self.base_url);
        self.session
            .get_json_with_query(
                &url,
                &[
                    ("topicID", format!("\"{}\"", domain)),
                    ("format", "json".to_string()),
                    ("page", page.to_string()),
                ],
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pubmetric_common::config::HttpConfig;

    const PAGE: &str = r#"{
        "count": 3,
        "next": "?page=2",
        "previous": null,
        "list": [
            {
                "name": "Comet",
                "biotoolsID": "comet",
                "publication": [
                    {"doi": "10.1002/pmic.201200439", "pmid": null, "type": ["Other"]},
                    {"doi": "10.1002/x", "pmid": "23148064", "type": ["Primary"],
                     "metadata": {"date": "2013-01-01T00:00:00Z"}}
                ],
                "topic": [{"uri": "http://edamontology.org/topic_0121", "term": "Proteomics"}]
            },
            {"name": "NoPubs", "publication": null}
        ]
    }"#;

    #[test]
    fn test_page_parsing() {
        let page: RegistryPage = serde_json::from_str(PAGE).unwrap();
        assert_eq!(page.count, 3);
        assert_eq!(page.next_page(), Some(2));
        assert_eq!(page.list.len(), 2);

        let comet = &page.list[0];
        let (primary, flagged) = comet.primary_publication().unwrap();
        assert!(flagged);
        assert_eq!(primary.identifier(), Some("23148064"));
        assert_eq!(primary.year(), Some(2013));

        assert!(page.list[1].primary_publication().is_none());
    }

    #[test]
    fn test_first_publication_without_primary_flag() {
        let entry = RegistryEntry {
            name: "Tool".into(),
            publication: Some(vec![
                Publication {
                    pmid: Some("1".into()),
                    ..Default::default()
                },
                Publication {
                    pmid: Some("2".into()),
                    ..Default::default()
                },
            ]),
            ..Default::default()
        };
        let (primary, flagged) = entry.primary_publication().unwrap();
        assert!(!flagged);
        assert_eq!(primary.identifier(), Some("1"));
    }

    #[test]
    fn test_last_page_has_no_next() {
        let page: RegistryPage = serde_json::from_str(r#"{"count": 1, "next": null, "list": []}"#).unwrap();
        assert_eq!(page.next_page(), None);
    }

    #[test]
    fn test_leading_year() {
        assert_eq!(leading_year("2019 Mar 12"), Some(2019));
        assert_eq!(leading_year("2013-01-01T00:00:00Z"), Some(2013));
        assert_eq!(leading_year("Spring"), None);
        assert_eq!(leading_year(""), None);
    }

    #[tokio::test]
    async fn test_fetch_page_over_http() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/t")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("topicID".into(), "\"topic_0121\"".into()),
                mockito::Matcher::UrlEncoded("format".into(), "json".into()),
                mockito::Matcher::UrlEncoded("page".into(), "1".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(PAGE)
            .create_async()
            .await;

        let session = HttpSession::new(&HttpConfig::default()).unwrap();
        let registry = BioToolsRegistry::new(session, server.url());
        let page = registry.fetch_page("topic_0121", 1).await.unwrap();

        assert_eq!(page.list.len(), 2);
        mock.assert_async().await;
    }
}
