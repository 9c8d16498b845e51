//! Metadata resolver
//!
//! Turns a registry domain into deduplicated [`ToolRecord`]s:
//! 1. Page through the registry, picking each tool's primary publication
//! 2. Resolve the page's tools without an identifier through their DOI
//!    (cached in the [`DoiLibrary`])
//! 3. Deduplicate by identifier, paging on until the limit is met
//! 4. Backfill missing publication years

use crate::doi_library::DoiLibrary;
use crate::ncbi::{IdentifierLookup, PublicationDateLookup};
use crate::registry::{RegistryEntry, RegistrySource};
use futures::stream::{self, StreamExt};
use pubmetric_common::{metrics, AppError, Result, ToolRecord};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Counters describing how the domain was resolved
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionReport {
    /// Domain size announced by the registry
    pub total_in_domain: u64,
    pub entries_seen: usize,
    pub pages_fetched: u32,
    /// Later pages that failed and stopped pagination
    pub pages_failed: u32,
    pub without_publication: usize,
    pub without_primary_flag: usize,
    /// Tools whose primary publication had no identifier
    pub missing_identifier: usize,
    pub recovered_via_doi: usize,
    /// Tools lost because no identifier could be found
    pub dropped: usize,
    pub duplicates: usize,
    pub years_backfilled: usize,
}

/// Output of [`MetadataResolver::resolve_tools`]
#[derive(Debug, Clone)]
pub struct Resolution {
    pub records: Vec<ToolRecord>,
    pub report: ResolutionReport,
}

/// A tool waiting for its DOI to be converted
struct PendingTool {
    /// Position among the pending tools, in registry order
    order: usize,
    doi: String,
    record: ToolRecord,
}

pub struct MetadataResolver {
    registry: Arc<dyn RegistrySource>,
    identifiers: Arc<dyn IdentifierLookup>,
    dates: Arc<dyn PublicationDateLookup>,
    concurrency: usize,
}

impl MetadataResolver {
    pub fn new(
        registry: Arc<dyn RegistrySource>,
        identifiers: Arc<dyn IdentifierLookup>,
        dates: Arc<dyn PublicationDateLookup>,
    ) -> Self {
        Self {
            registry,
            identifiers,
            dates,
            concurrency: 4,
        }
    }

    /// Maximum lookups in flight during DOI resolution and year backfill
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Resolve every tool of `domain` to a record
    #[instrument(skip(self, library))]
    pub async fn resolve_tools(
        &self,
        domain: &str,
        limit: Option<usize>,
        library: &mut DoiLibrary,
    ) -> Result<Resolution> {
        let mut report = ResolutionReport::default();
        let mut records: Vec<ToolRecord> = Vec::new();
        let mut seen = HashSet::new();

        let mut page_number = 1;
        loop {
            let page = match self.registry.fetch_page(domain, page_number).await {
                Ok(page) => page,
                Err(e) if page_number == 1 => {
                    return Err(AppError::RegistryUnavailable {
                        domain: domain.to_string(),
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!(page = page_number, error = %e, "Registry page failed, keeping earlier pages");
                    report.pages_failed += 1;
                    break;
                }
            };

            report.pages_fetched += 1;
            report.total_in_domain = page.count;
            debug!(page = page_number, entries = page.list.len(), "Fetched registry page");

            let mut resolved = Vec::new();
            let mut pending = Vec::new();
            for entry in &page.list {
                report.entries_seen += 1;
                self.classify(entry, &mut report, &mut resolved, &mut pending);
            }
            resolved.extend(self.resolve_pending(pending, library, &mut report).await);

            // the limit counts distinct identifiers that actually resolved
            for record in resolved {
                if seen.insert(record.identifier.clone()) {
                    records.push(record);
                } else {
                    report.duplicates += 1;
                }
            }

            if limit.is_some_and(|limit| records.len() >= limit) {
                break;
            }
            match page.next_page() {
                Some(next) if next > page_number => page_number = next,
                _ => break,
            }
        }

        library.save()?;

        if let Some(limit) = limit {
            records.truncate(limit);
        }

        report.years_backfilled = self.backfill_years(&mut records).await;

        metrics::record_resolution(records.len(), report.dropped);
        info!(
            resolved = records.len(),
            total_in_domain = report.total_in_domain,
            dropped = report.dropped,
            recovered_via_doi = report.recovered_via_doi,
            "Resolved domain tools"
        );

        Ok(Resolution { records, report })
    }

    fn classify(
        &self,
        entry: &RegistryEntry,
        report: &mut ResolutionReport,
        resolved: &mut Vec<ToolRecord>,
        pending: &mut Vec<PendingTool>,
    ) {
        let Some((publication, flagged)) = entry.primary_publication() else {
            report.without_publication += 1;
            return;
        };
        if !flagged {
            report.without_primary_flag += 1;
        }

        let mut record = ToolRecord::new("", entry.name.clone()).with_year(publication.year());
        record.doi = publication.doi().map(str::to_string);

        match (publication.identifier(), publication.doi()) {
            (Some(identifier), _) => {
                record.identifier = identifier.to_string();
                resolved.push(record);
            }
            (None, Some(doi)) => {
                report.missing_identifier += 1;
                pending.push(PendingTool {
                    order: pending.len(),
                    doi: doi.to_string(),
                    record,
                });
            }
            (None, None) => {
                report.missing_identifier += 1;
                report.dropped += 1;
                debug!(tool = %entry.name, "No identifier or DOI, dropping tool");
            }
        }
    }

    async fn resolve_pending(
        &self,
        pending: Vec<PendingTool>,
        library: &mut DoiLibrary,
        report: &mut ResolutionReport,
    ) -> Vec<ToolRecord> {
        let mut recovered = Vec::new();
        let mut lookups = Vec::new();

        for tool in pending {
            match library.get(&tool.doi) {
                Some(identifier) => {
                    let mut record = tool.record;
                    record.identifier = identifier.to_string();
                    recovered.push((tool.order, record));
                }
                None => lookups.push(tool),
            }
        }

        let identifiers = self.identifiers.clone();
        let results: Vec<(PendingTool, Result<Option<String>>)> = stream::iter(lookups)
            .map(|tool| {
                let identifiers = identifiers.clone();
                async move {
                    let result = identifiers.resolve_doi(&tool.doi).await;
                    (tool, result)
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for (tool, result) in results {
            match result {
                Ok(Some(identifier)) => {
                    library.insert(&tool.doi, identifier.clone());
                    let mut record = tool.record;
                    record.identifier = identifier;
                    recovered.push((tool.order, record));
                }
                Ok(None) => {
                    debug!(doi = %tool.doi, "DOI not found, dropping tool");
                    report.dropped += 1;
                }
                Err(e) => {
                    warn!(doi = %tool.doi, error = %e, "DOI resolution failed, dropping tool");
                    report.dropped += 1;
                }
            }
        }

        recovered.sort_by_key(|(order, _)| *order);
        report.recovered_via_doi += recovered.len();
        recovered.into_iter().map(|(_, record)| record).collect()
    }

    async fn backfill_years(&self, records: &mut [ToolRecord]) -> usize {
        let missing: Vec<(usize, String)> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.publication_year.is_none())
            .map(|(i, r)| (i, r.identifier.clone()))
            .collect();

        let dates = self.dates.clone();
        let years: Vec<(usize, Option<i32>)> = stream::iter(missing)
            .map(|(index, identifier)| {
                let dates = dates.clone();
                async move {
                    match dates.publication_year(&identifier).await {
                        Ok(year) => (index, year),
                        Err(e) => {
                            warn!(identifier = %identifier, error = %e, "Publication year lookup failed");
                            (index, None)
                        }
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut filled = 0;
        for (index, year) in years {
            if year.is_some() {
                records[index].publication_year = year;
                filled += 1;
            }
        }
        filled
    }
}

/// Reproducible random subset of `size` records (all records when `size`
/// is not smaller than the input)
pub fn sample_records(records: &[ToolRecord], size: usize, seed: u64) -> Vec<ToolRecord> {
    if size >= records.len() {
        return records.to_vec();
    }
    let mut rng = StdRng::seed_from_u64(seed);
    records.choose_multiple(&mut rng, size).cloned().collect()
}

/// Restrict records to the given display names
pub fn select_tools(records: &[ToolRecord], names: &[String]) -> Result<Vec<ToolRecord>> {
    let wanted: HashSet<&str> = names.iter().map(String::as_str).collect();
    let selected: Vec<ToolRecord> = records
        .iter()
        .filter(|r| wanted.contains(r.display_name.as_str()))
        .cloned()
        .collect();

    if selected.is_empty() {
        return Err(AppError::Validation {
            message: format!("none of the {} selected tools were resolved", names.len()),
            field: Some("tool_selection".to_string()),
        });
    }
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Publication, PublicationMetadata, RegistryPage};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MockRegistry {
        pages: HashMap<u32, RegistryPage>,
        calls: Mutex<Vec<u32>>,
    }

    impl MockRegistry {
        fn new(pages: Vec<RegistryPage>) -> Self {
            Self {
                pages: pages.into_iter().enumerate().map(|(i, p)| (i as u32 + 1, p)).collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl RegistrySource for MockRegistry {
        async fn fetch_page(&self, _domain: &str, page: u32) -> Result<RegistryPage> {
            self.calls.lock().unwrap().push(page);
            self.pages.get(&page).cloned().ok_or_else(|| AppError::UpstreamStatus {
                url: format!("mock://t?page={page}"),
                status: 503,
            })
        }
    }

    #[derive(Default)]
    struct MockLiterature {
        dois: HashMap<String, String>,
        years: HashMap<String, i32>,
        doi_calls: Mutex<usize>,
    }

    #[async_trait]
    impl IdentifierLookup for MockLiterature {
        async fn resolve_doi(&self, doi: &str) -> Result<Option<String>> {
            *self.doi_calls.lock().unwrap() += 1;
            Ok(self.dois.get(doi).cloned())
        }
    }

    #[async_trait]
    impl PublicationDateLookup for MockLiterature {
        async fn publication_year(&self, identifier: &str) -> Result<Option<i32>> {
            Ok(self.years.get(identifier).copied())
        }
    }

    fn entry(name: &str, pmid: Option<&str>, doi: Option<&str>, year: Option<&str>, primary: bool) -> RegistryEntry {
        RegistryEntry {
            name: name.to_string(),
            publication: Some(vec![Publication {
                pmid: pmid.map(str::to_string),
                doi: doi.map(str::to_string),
                kind: primary.then(|| vec!["Primary".to_string()]),
                metadata: year.map(|d| PublicationMetadata {
                    date: Some(d.to_string()),
                }),
            }]),
            ..Default::default()
        }
    }

    fn page(count: u64, next: Option<&str>, list: Vec<RegistryEntry>) -> RegistryPage {
        RegistryPage {
            count,
            next: next.map(str::to_string),
            list,
        }
    }

    fn resolver(registry: MockRegistry, literature: MockLiterature) -> (MetadataResolver, Arc<MockRegistry>, Arc<MockLiterature>) {
        let registry = Arc::new(registry);
        let literature = Arc::new(literature);
        (
            MetadataResolver::new(registry.clone(), literature.clone(), literature.clone()),
            registry,
            literature,
        )
    }

    #[tokio::test]
    async fn test_resolves_across_pages_with_doi_fallback() {
        let registry = MockRegistry::new(vec![
            page(
                4,
                Some("?page=2"),
                vec![
                    entry("Comet", Some("111"), None, Some("2013-01-01T00:00:00Z"), true),
                    entry("Mascot", None, Some("10.1/mascot"), Some("1999-01-01"), true),
                ],
            ),
            page(
                4,
                None,
                vec![
                    entry("Orphan", None, None, None, false),
                    entry("Comet mirror", Some("111"), None, None, true),
                ],
            ),
        ]);
        let literature = MockLiterature {
            dois: HashMap::from([("10.1/mascot".to_string(), "222".to_string())]),
            ..Default::default()
        };
        let (resolver, _, _) = resolver(registry, literature);

        let mut library = DoiLibrary::in_memory();
        let resolution = resolver.resolve_tools("topic_0121", None, &mut library).await.unwrap();

        let ids: Vec<&str> = resolution.records.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(ids, vec!["111", "222"]);
        assert_eq!(resolution.records[1].publication_year, Some(1999));

        let report = resolution.report;
        assert_eq!(report.total_in_domain, 4);
        assert_eq!(report.pages_fetched, 2);
        assert_eq!(report.missing_identifier, 2);
        assert_eq!(report.recovered_via_doi, 1);
        assert_eq!(report.dropped, 1);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.without_primary_flag, 1);
        assert_eq!(library.get("10.1/mascot"), Some("222"));
    }

    #[tokio::test]
    async fn test_first_page_failure_is_fatal() {
        let (resolver, _, _) = resolver(MockRegistry::new(vec![]), MockLiterature::default());
        let err = resolver
            .resolve_tools("topic_0121", None, &mut DoiLibrary::in_memory())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::RegistryUnavailable { .. }));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_later_page_failure_keeps_earlier_tools() {
        let registry = MockRegistry::new(vec![page(
            10,
            Some("?page=2"),
            vec![entry("Comet", Some("111"), None, Some("2013"), true)],
        )]);
        let (resolver, _, _) = resolver(registry, MockLiterature::default());

        let resolution = resolver
            .resolve_tools("topic_0121", None, &mut DoiLibrary::in_memory())
            .await
            .unwrap();

        assert_eq!(resolution.records.len(), 1);
        assert_eq!(resolution.report.pages_failed, 1);
    }

    #[tokio::test]
    async fn test_limit_stops_pagination_and_truncates() {
        let registry = MockRegistry::new(vec![
            page(
                4,
                Some("?page=2"),
                vec![
                    entry("A", Some("1"), None, Some("2001"), true),
                    entry("B", Some("2"), None, Some("2002"), true),
                    entry("C", Some("3"), None, Some("2003"), true),
                ],
            ),
            page(4, None, vec![entry("D", Some("4"), None, Some("2004"), true)]),
        ]);
        let (resolver, registry, _) = resolver(registry, MockLiterature::default());

        let resolution = resolver
            .resolve_tools("topic_0121", Some(2), &mut DoiLibrary::in_memory())
            .await
            .unwrap();

        assert_eq!(resolution.records.len(), 2);
        assert_eq!(*registry.calls.lock().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_limit_counts_only_distinct_resolved_tools() {
        let registry = MockRegistry::new(vec![
            page(
                5,
                Some("?page=2"),
                vec![
                    entry("A", Some("1"), None, Some("2001"), true),
                    entry("A mirror", Some("1"), None, Some("2001"), true),
                    entry("Lost", None, Some("10.1/lost"), Some("2002"), true),
                ],
            ),
            page(5, None, vec![entry("B", Some("2"), None, Some("2003"), true)]),
        ]);
        let (resolver, registry, _) = resolver(registry, MockLiterature::default());

        let resolution = resolver
            .resolve_tools("topic_0121", Some(2), &mut DoiLibrary::in_memory())
            .await
            .unwrap();

        let ids: Vec<&str> = resolution.records.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(resolution.report.duplicates, 1);
        assert_eq!(resolution.report.dropped, 1);
        assert_eq!(*registry.calls.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_library_avoids_repeat_lookups_and_backfills_years() {
        let registry = MockRegistry::new(vec![page(
            1,
            None,
            vec![entry("Mascot", None, Some("10.1/mascot"), None, true)],
        )]);
        let literature = MockLiterature {
            years: HashMap::from([("222".to_string(), 1999)]),
            ..Default::default()
        };
        let (resolver, _, literature) = resolver(registry, literature);

        let mut library = DoiLibrary::in_memory();
        library.insert("10.1/mascot", "222");
        let resolution = resolver.resolve_tools("topic_0121", None, &mut library).await.unwrap();

        assert_eq!(*literature.doi_calls.lock().unwrap(), 0);
        assert_eq!(resolution.records[0].identifier, "222");
        assert_eq!(resolution.records[0].publication_year, Some(1999));
        assert_eq!(resolution.report.years_backfilled, 1);
    }

    fn records(n: usize) -> Vec<ToolRecord> {
        (0..n).map(|i| ToolRecord::new(i.to_string(), format!("tool{i}"))).collect()
    }

    #[test]
    fn test_sampling_is_reproducible() {
        let all = records(50);
        let first = sample_records(&all, 10, 42);
        let second = sample_records(&all, 10, 42);
        assert_eq!(first, second);
        assert_eq!(first.len(), 10);

        let unique: HashSet<&str> = first.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(unique.len(), 10);
    }

    #[test]
    fn test_sampling_larger_than_input_returns_all() {
        let all = records(3);
        assert_eq!(sample_records(&all, 10, 1), all);
    }

    #[test]
    fn test_select_tools() {
        let all = records(5);
        let selected = select_tools(&all, &["tool1".to_string(), "tool4".to_string()]).unwrap();
        assert_eq!(selected.len(), 2);

        let err = select_tools(&all, &["nope".to_string()]).unwrap_err();
        assert!(err.is_caller_error());
    }
}
