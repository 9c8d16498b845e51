//! Citation index client (Europe PMC)

use async_trait::async_trait;
use pubmetric_common::{HttpSession, Result};
use serde::Deserialize;

/// One page of citing papers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitationPage {
    pub citing: Vec<String>,
    /// Total number of citing papers across all pages
    pub hit_count: u64,
}

/// Source of citing papers for a publication
#[async_trait]
pub trait CitationIndex: Send + Sync {
    /// Fetch one page (1-based) of the papers citing `identifier`
    async fn fetch_citations(&self, identifier: &str, page: u32, page_size: u32) -> Result<CitationPage>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CitationsResponse {
    #[serde(default)]
    hit_count: u64,
    #[serde(default)]
    citation_list: Option<CitationList>,
}

#[derive(Debug, Deserialize)]
struct CitationList {
    #[serde(default)]
    citation: Vec<Citation>,
}

#[derive(Debug, Deserialize)]
struct Citation {
    id: Option<String>,
}

/// Europe PMC REST client
pub struct EuropePmcClient {
    session: HttpSession,
    base_url: String,
    /// Identifier namespace, `MED` for PubMed
    source: String,
}

impl EuropePmcClient {
    pub fn new(session: HttpSession, base_url: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            session,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            source: source.into(),
        }
    }
}

#[async_trait]
impl CitationIndex for EuropePmcClient {
    async fn fetch_citations(&self, identifier: &str, page: u32, page_size: u32) -> Result<CitationPage> {
        let url = format!("{}/{}/{}/citations", self.base_url, self.source, identifier);
        let response: CitationsResponse = self
            .session
            .get_json_with_query(
                &url,
                &[
                    ("page", page.to_string()),
                    ("pageSize", page_size.to_string()),
                    ("format", "json".to_string()),
                ],
            )
            .await?;

        let citing = response
            .citation_list
            .map(|list| list.citation.into_iter().filter_map(|c| c.id).collect())
            .unwrap_or_default();

        Ok(CitationPage {
            citing,
            hit_count: response.hit_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use pubmetric_common::config::HttpConfig;

    #[tokio::test]
    async fn test_fetch_citations() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/MED/23148064/citations")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page".into(), "1".into()),
                Matcher::UrlEncoded("pageSize".into(), "1000".into()),
                Matcher::UrlEncoded("format".into(), "json".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"version": "6.9", "hitCount": 2, "request": {},
                    "citationList": {"citation": [
                        {"id": "31000001", "source": "MED"},
                        {"id": "31000002", "source": "MED"}
                    ]}}"#,
            )
            .create_async()
            .await;

        let session = HttpSession::new(&HttpConfig::default()).unwrap();
        let client = EuropePmcClient::new(session, server.url(), "MED");
        let page = client.fetch_citations("23148064", 1, 1000).await.unwrap();

        assert_eq!(page.hit_count, 2);
        assert_eq!(page.citing, vec!["31000001".to_string(), "31000002".to_string()]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_uncited_publication() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/MED/1/citations")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"hitCount": 0}"#)
            .create_async()
            .await;

        let session = HttpSession::new(&HttpConfig::default()).unwrap();
        let client = EuropePmcClient::new(session, server.url(), "MED");
        let page = client.fetch_citations("1", 1, 1000).await.unwrap();

        assert_eq!(page, CitationPage::default());
    }
}
