//! Analytics data access.
//!
//! Layered leaf-first: the HTTP client, offset pagination on top of it,
//! concurrent fan-out, and the Dune queries built from all three.

pub mod client;
pub mod dune;
pub mod fanout;
pub mod pagination;

pub use client::{AnalyticsApi, DuneClient, Params};
pub use dune::{DuneService, LaunchpadReport};
pub use fanout::{aggregate, NamedQuery};
pub use pagination::{collect_pages, fetch_all_pages, PageLimits};
