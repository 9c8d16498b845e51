//! Pubmetric harvesting
//!
//! Collects the raw material of a co-citation graph:
//! - [`resolver`] maps a registry domain to tool records
//! - [`collector`] gathers the papers citing each tool
//!
//! Upstream services sit behind traits ([`RegistrySource`],
//! [`IdentifierLookup`], [`PublicationDateLookup`], [`CitationIndex`]) with
//! HTTP implementations sharing one [`pubmetric_common::HttpSession`].

pub mod checkpoint;
pub mod citations;
pub mod collector;
pub mod doi_library;
pub mod ncbi;
pub mod registry;
pub mod resolver;

pub use checkpoint::{Checkpoint, CheckpointState};
pub use citations::{CitationIndex, CitationPage, EuropePmcClient};
pub use collector::{CitationCollector, Collection, CollectionReport};
pub use doi_library::DoiLibrary;
pub use ncbi::{IdentifierLookup, NcbiClient, PublicationDateLookup};
pub use registry::{BioToolsRegistry, RegistryPage, RegistrySource};
pub use resolver::{sample_records, select_tools, MetadataResolver, Resolution, ResolutionReport};
