//! Literature lookups against NCBI E-utilities
//!
//! - `esearch` converts a DOI into a PubMed identifier
//! - `esummary` provides the publication date of an identifier

use crate::registry::leading_year;
use async_trait::async_trait;
use pubmetric_common::{HttpSession, Result};
use serde::Deserialize;

/// Secondary identifier resolution (DOI -> identifier)
#[async_trait]
pub trait IdentifierLookup: Send + Sync {
    async fn resolve_doi(&self, doi: &str) -> Result<Option<String>>;
}

/// Publication year of an identifier
#[async_trait]
pub trait PublicationDateLookup: Send + Sync {
    async fn publication_year(&self, identifier: &str) -> Result<Option<i32>>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    esearchresult: SearchResult,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

/// E-utilities client
pub struct NcbiClient {
    session: HttpSession,
    base_url: String,
}

impl NcbiClient {
    pub fn new(session: HttpSession, base_url: impl Into<String>) -> Self {
        Self {
            session,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl IdentifierLookup for NcbiClient {
    async fn resolve_doi(&self, doi: &str) -> Result<Option<String>> {
        let url = format!("{}/esearch.fcgi", self.base_url);
        let response: SearchResponse = self
            .session
            .get_json_with_query(
                &url,
                &[
                    ("db", "pubmed".to_string()),
                    ("retmode", "json".to_string()),
                    ("term", doi.to_string()),
                ],
            )
            .await?;

        Ok(response.esearchresult.idlist.into_iter().next())
    }
}

#[async_trait]
impl PublicationDateLookup for NcbiClient {
    async fn publication_year(&self, identifier: &str) -> Result<Option<i32>> {
        let url = format!("{}/esummary.fcgi", self.base_url);
        let response: serde_json::Value = self
            .session
            .get_json_with_query(
                &url,
                &[
                    ("db", "pubmed".to_string()),
                    ("retmode", "json".to_string()),
                    ("id", identifier.to_string()),
                ],
            )
            .await?;

        Ok(response
            .pointer(&format!("/result/{}/pubdate", identifier))
            .and_then(|v| v.as_str())
            .and_then(leading_year))
    }
}
