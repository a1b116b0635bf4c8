//! Clients for the external document repository and bibliographic service
//!
//! Each client sits behind a trait so discovery and lineage can run against
//! synthetic implementations in tests.

pub mod document_fetcher;
pub mod existence_probe;
pub mod undl_client;

pub use document_fetcher::{
    build_download_url, document_file_name, DocumentFetcher, HttpDocumentFetcher,
};
pub use existence_probe::{ExistenceProbe, HttpExistenceProbe, ProbeError};
pub use undl_client::{parse_marc_xml, MetadataClient, UndlClient, UndlError, UndlMetadata};

/// User-Agent sent with every request
pub const USER_AGENT: &str = concat!("undocs/", env!("CARGO_PKG_VERSION"));
