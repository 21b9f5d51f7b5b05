#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Shared model for event discovery: search profiles, normalized events,
//! the text parsers adapters normalize with, and the adapter contract.

mod error;
mod event;
mod fingerprint;
pub mod parse;
mod profile;
mod source;

pub use error::SearchError;
pub use event::{CachedEvent, NormalizedEvent, export_eligible};
pub use fingerprint::{Fingerprint, fingerprint};
pub use parse::{parse_datetime, parse_price, resolve_window};
pub use profile::{PartialProfile, SearchProfile, TimeWindow};
pub use source::EventSource;
