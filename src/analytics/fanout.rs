//! Concurrent fan-out over independent named queries.
//!
//! All queries run at once and the call waits for every one of them.
//! A failing query never fails the batch: it is replaced by an empty
//! [`QueryResult`] whose `error` records what went wrong. Results come
//! back in input order whatever order the queries finish in.

use crate::analytics::client::Params;
use crate::error::TransportError;
use crate::models::QueryResult;
use futures::future::join_all;
use serde_json::Value;
use std::future::Future;
use tracing::{debug, warn};

/// One labeled query in a fan-out batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedQuery {
    pub label: String,
    pub query_id: u64,
    pub params: Params,
}

impl NamedQuery {
    pub fn new(label: impl Into<String>, query_id: u64, params: Params) -> Self {
        Self {
            label: label.into(),
            query_id,
            params,
        }
    }
}

/// Run every query concurrently and return one result per query, in order.
pub async fn aggregate<F, Fut>(queries: Vec<NamedQuery>, fetch: F) -> Vec<QueryResult>
where
    F: Fn(u64, Params) -> Fut,
    Fut: Future<Output = Result<Vec<Value>, TransportError>>,
{
    let branches = queries.into_iter().map(|query| {
        let NamedQuery {
            label,
            query_id,
            params,
        } = query;
        let pending = fetch(query_id, params);

        async move {
            match pending.await {
                Ok(rows) => {
                    debug!("{} ({}) returned {} rows", label, query_id, rows.len());
                    QueryResult::ok(label, query_id, rows)
                }
                Err(e) => {
                    warn!("Failed to fetch {} (ID {}): {}", label, query_id, e);
                    QueryResult::failed(label, query_id, e.to_string())
                }
            }
        }
    });

    join_all(branches).await
}
