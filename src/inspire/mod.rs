//! InspireHEP API access: the fetch collaborator and the typed client.

pub mod client;
pub mod fetcher;

pub use client::{
    Direction, InspireClient, ServerStats, SortOrder, TextFormat, LITERATURE_FIELDS,
    MAX_BATCH_SIZE, MAX_PAGE_SIZE,
};
pub use fetcher::{Accept, ApiFetcher, ApiRequest, HttpFetcher};
