//! Dune Analytics queries used by the Dune agent.
//!
//! Each operation issues a direct call, a paginated collection, or a
//! launchpad fan-out, and reshapes the free-form rows into a fixed
//! output type.

use crate::analytics::client::{params, result_rows, result_rows_or_empty, AnalyticsApi, Params};
use crate::analytics::fanout::{aggregate, NamedQuery};
use crate::analytics::pagination::{fetch_all_pages, PageLimits};
use crate::error::TransportError;
use crate::models::QueryResult;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

const DEX_COLUMNS: &str =
    "token_pair,projects,all_time_volume,usd_liquidity,seven_day_volume_liquidity_ratio";
const TOP_PAIRS_LIMIT: u32 = 100;
const EIGENLAYER_PATH: &str = "/v1/eigenlayer";
const SVM_BALANCES_PATH: &str = "/echo/beta/balances/svm/";

/// Statistics for one DEX token pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DexPairMetrics {
    #[serde(default)]
    pub token_pair: Option<String>,
    #[serde(default)]
    pub projects: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub all_time_volume: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub usd_liquidity: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub seven_day_volume_liquidity_ratio: Option<f64>,
}

/// A wallet token balance with the amount scaled by the token's decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenBalance {
    pub raw_amount: String,
    /// `None` when the raw amount or decimals could not be read.
    pub amount: Option<f64>,
    pub price_usd: Option<f64>,
    pub value_usd: Option<f64>,
    pub symbol: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawBalance {
    #[serde(default)]
    amount: Value,
    #[serde(default, deserialize_with = "lenient_u32")]
    decimals: Option<u32>,
    #[serde(default, deserialize_with = "lenient_f64")]
    price_usd: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    value_usd: Option<f64>,
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BalancesResponse {
    #[serde(default)]
    balances: Vec<RawBalance>,
}

/// Staking and operator totals for one AVS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvsMetrics {
    #[serde(default, deserialize_with = "lenient_count")]
    pub num_operators: Option<u64>,
    #[serde(rename = "total_TVL", default, deserialize_with = "lenient_f64")]
    pub total_tvl: Option<f64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub num_stakers: Option<u64>,
}

/// Totals for one operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorMetrics {
    pub operator_name: String,
    #[serde(rename = "total_TVL", default, deserialize_with = "lenient_f64")]
    pub total_tvl: Option<f64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub num_stakers: Option<u64>,
}

/// Launchpad dashboards fetched as a four-way fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchpadReport {
    /// Tokens launched in the last 24 hours.
    Tokens24h,
    /// Tokens that graduated from their bonding curve.
    Graduates,
    /// Active trading addresses.
    ActiveAddresses,
}

impl LaunchpadReport {
    /// Label and saved query id for every launchpad, in display order.
    pub fn queries(&self) -> &'static [(&'static str, u64)] {
        match self {
            LaunchpadReport::Tokens24h => &[
                ("LaunchLab Tokens", 5001416),
                ("LetsBonk Tokens", 5126341),
                ("Pumpfun Tokens", 4006260),
                ("Boop Tokens", 5073803),
            ],
            LaunchpadReport::Graduates => &[
                ("LaunchLab Tokens", 5126416),
                ("LetsBonk Tokens", 5126361),
                ("Pumpfun tokens", 5041379),
                ("Boop tokens", 5073810),
            ],
            LaunchpadReport::ActiveAddresses => &[
                ("LaunchLab", 5002608),
                ("LetsBonk", 5126485),
                ("Pumpfun", 4007266),
                ("Boop", 5073823),
            ],
        }
    }
}

/// Dune queries over a shared, read-only API client.
#[derive(Clone)]
pub struct DuneService {
    api: Arc<dyn AnalyticsApi>,
    limits: PageLimits,
    launchpad_limit: u32,
}

impl DuneService {
    pub fn new(api: Arc<dyn AnalyticsApi>, limits: PageLimits, launchpad_limit: u32) -> Self {
        Self {
            api,
            limits,
            launchpad_limit,
        }
    }

    /// Metrics for one token pair on a chain.
    pub async fn fetch_dex_metrics(
        &self,
        chain: &str,
        token_pair: &str,
    ) -> Result<Vec<DexPairMetrics>, TransportError> {
        let query = params([("token_pair", token_pair), ("columns", DEX_COLUMNS)]);
        let body = self.api.get(&dex_path(chain), &query).await?;
        decode_rows(result_rows(body)?)
    }

    /// Top token pairs on a chain by USD liquidity.
    pub async fn fetch_top_token_pairs(
        &self,
        chain: &str,
    ) -> Result<Vec<DexPairMetrics>, TransportError> {
        let query = params([
            ("columns", DEX_COLUMNS.to_string()),
            ("sort_by", "usd_liquidity desc".to_string()),
            ("limit", TOP_PAIRS_LIMIT.to_string()),
        ]);
        let body = self.api.get(&dex_path(chain), &query).await?;
        decode_rows(result_rows(body)?)
    }

    /// Token balances held by a Solana wallet.
    pub async fn fetch_svm_token_balances(
        &self,
        address: &str,
    ) -> Result<Vec<TokenBalance>, TransportError> {
        let path = format!("{}{}", SVM_BALANCES_PATH, address);
        let body = self.api.get(&path, &params([("chains", "solana")])).await?;
        let response: BalancesResponse =
            serde_json::from_value(body).map_err(|e| TransportError::Decode(e.to_string()))?;

        Ok(response.balances.into_iter().map(to_token_balance).collect())
    }

    /// AVS-level stats for the named AVS.
    pub async fn fetch_avs_metrics(&self, avs_name: &str) -> Result<Vec<AvsMetrics>, TransportError> {
        let rows = self.eigenlayer_rows("/avs-stats", &[]).await?;
        let matching = rows
            .into_iter()
            .filter(|row| row.get("avs_name").and_then(Value::as_str) == Some(avs_name))
            .collect();
        decode_rows(matching)
    }

    /// Stats for every operator registered with the named AVS.
    pub async fn fetch_operator_metrics(
        &self,
        avs_name: &str,
    ) -> Result<Vec<OperatorMetrics>, TransportError> {
        let filter = params([("filters", format!("avs_name = '{}'", avs_name))]);
        let mapping = self
            .eigenlayer_rows("/operator-to-avs-mapping", &filter)
            .await?;

        let operators: HashSet<String> = mapping
            .iter()
            .filter_map(|row| row.get("operator_name").and_then(Value::as_str))
            .map(str::to_string)
            .collect();
        info!("AVS {} has {} operators", avs_name, operators.len());

        let stats = self.eigenlayer_rows("/operator-stats", &[]).await?;
        let matching = stats
            .into_iter()
            .filter(|row| {
                row.get("operator_name")
                    .and_then(Value::as_str)
                    .is_some_and(|name| operators.contains(name))
            })
            .collect();
        decode_rows(matching)
    }

    /// Run a launchpad report across all launchpads concurrently.
    ///
    /// Always returns one entry per launchpad; failed launchpads have
    /// empty rows and an error message.
    pub async fn fetch_launchpad_report(
        &self,
        report: LaunchpadReport,
        limit: Option<u32>,
    ) -> Vec<QueryResult> {
        let limit = limit.unwrap_or(self.launchpad_limit).to_string();
        let queries = report
            .queries()
            .iter()
            .map(|(label, id)| NamedQuery::new(*label, *id, params([("limit", limit.as_str())])))
            .collect();

        aggregate(queries, |query_id, query| self.query_results(query_id, query)).await
    }

    /// Latest results of a saved query.
    async fn query_results(&self, query_id: u64, query: Params) -> Result<Vec<Value>, TransportError> {
        let path = format!("/v1/query/{}/results", query_id);
        let body = self.api.get(&path, &query).await?;
        Ok(result_rows_or_empty(body))
    }

    async fn eigenlayer_rows(
        &self,
        endpoint: &str,
        query: &[(String, String)],
    ) -> Result<Vec<Value>, TransportError> {
        let path = format!("{}{}", EIGENLAYER_PATH, endpoint);
        fetch_all_pages(self.api.as_ref(), &path, query, self.limits).await
    }
}

fn dex_path(chain: &str) -> String {
    format!("/v1/dex/pairs/{}", chain)
}

fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, TransportError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(|e| TransportError::Decode(e.to_string())))
        .collect()
}

/// A numeric column as the API may encode it: a JSON number or a string.
#[derive(Deserialize)]
#[serde(untagged)]
enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Numeric::Number(n) => *n,
            Numeric::Text(s) => s.trim().parse().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

/// Number or numeric string. Null and unparsable strings read as `None`.
fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Numeric>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Numeric::as_f64))
}

/// Like [`lenient_f64`], but only whole non-negative values count: `1500.0` is 1500.
fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    Ok(lenient_f64(deserializer)?
        .filter(|n| *n >= 0.0 && n.fract() == 0.0 && *n <= u64::MAX as f64)
        .map(|n| n as u64))
}

fn lenient_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    Ok(lenient_count(deserializer)?.and_then(|n| u32::try_from(n).ok()))
}

fn to_token_balance(raw: RawBalance) -> TokenBalance {
    let raw_amount = match raw.amount {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    };
    let amount = raw.decimals.and_then(|d| scale_amount(&raw_amount, d));

    TokenBalance {
        raw_amount,
        amount,
        price_usd: raw.price_usd,
        value_usd: raw.value_usd,
        symbol: raw.symbol,
        name: raw.name,
    }
}

/// `raw / 10^decimals` as a float.
pub fn scale_amount(raw: &str, decimals: u32) -> Option<f64> {
    let value: f64 = raw.trim().parse().ok()?;
    let scaled = value / 10f64.powi(i32::try_from(decimals).ok()?);
    scaled.is_finite().then_some(scaled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Scripted API: answers by path, records every request.
    #[derive(Default)]
    struct FakeApi {
        calls: Mutex<Vec<(String, Params)>>,
        pages: Mutex<std::collections::HashMap<String, Vec<Value>>>,
        failing: HashSet<String>,
    }

    impl FakeApi {
        fn with_rows(self, path: &str, rows: Vec<Value>) -> Self {
            self.pages.lock().unwrap().insert(path.to_string(), rows);
            self
        }

        fn failing(mut self, path: &str) -> Self {
            self.failing.insert(path.to_string());
            self
        }

        fn calls(&self) -> Vec<(String, Params)> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn param<'a>(query: &'a [(String, String)], key: &str) -> Option<&'a str> {
        query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    #[async_trait]
    impl AnalyticsApi for FakeApi {
        async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value, TransportError> {
            self.calls
                .lock()
                .unwrap()
                .push((path.to_string(), query.to_vec()));

            if self.failing.contains(path) {
                return Err(TransportError::Status {
                    status: 500,
                    body: "boom".to_string(),
                });
            }

            let rows = self.pages.lock().unwrap().get(path).cloned().unwrap_or_default();
            if path.starts_with(SVM_BALANCES_PATH) {
                return Ok(json!({ "balances": rows }));
            }

            // Slice by limit/offset when the caller paginates.
            let offset: usize = param(query, "offset").and_then(|v| v.parse().ok()).unwrap_or(0);
            let limit: usize = param(query, "limit")
                .and_then(|v| v.parse().ok())
                .unwrap_or(rows.len());
            let page: Vec<Value> = rows.into_iter().skip(offset).take(limit).collect();
            Ok(json!({ "result": { "rows": page } }))
        }
    }

    fn service(api: Arc<FakeApi>, page_size: usize) -> DuneService {
        DuneService::new(
            api,
            PageLimits {
                page_size,
                max_pages: 100,
            },
            1,
        )
    }

    #[tokio::test]
    async fn test_dex_metrics_request_shape() {
        let api = Arc::new(FakeApi::default().with_rows(
            "/v1/dex/pairs/solana",
            vec![json!({
                "token_pair": "USDC-SOL",
                "projects": ["raydium", "orca"],
                "all_time_volume": 1.5e9,
                "usd_liquidity": 2.0e7,
                "seven_day_volume_liquidity_ratio": 3.2
            })],
        ));

        let metrics = service(api.clone(), 100)
            .fetch_dex_metrics("solana", "USDC-SOL")
            .await
            .unwrap();

        assert_eq!(metrics.len(), 1);
        assert_eq!(
            metrics[0].projects,
            Some(vec!["raydium".to_string(), "orca".to_string()])
        );
        assert_eq!(metrics[0].usd_liquidity, Some(2.0e7));

        let calls = api.calls();
        assert_eq!(param(&calls[0].1, "token_pair"), Some("USDC-SOL"));
        assert_eq!(param(&calls[0].1, "columns"), Some(DEX_COLUMNS));
    }

    #[tokio::test]
    async fn test_top_pairs_sorted_by_liquidity() {
        let api = Arc::new(FakeApi::default().with_rows("/v1/dex/pairs/ethereum", vec![]));

        let metrics = service(api.clone(), 100)
            .fetch_top_token_pairs("ethereum")
            .await
            .unwrap();

        assert!(metrics.is_empty());
        let calls = api.calls();
        assert_eq!(param(&calls[0].1, "sort_by"), Some("usd_liquidity desc"));
        assert_eq!(param(&calls[0].1, "limit"), Some("100"));
    }

    #[tokio::test]
    async fn test_svm_balances_are_scaled_by_decimals() {
        let api = Arc::new(FakeApi::default().with_rows(
            "/echo/beta/balances/svm/Wallet111",
            vec![
                json!({"amount": "2500000", "decimals": 6, "symbol": "USDC", "name": "USD Coin",
                       "price_usd": 1.0, "value_usd": 2.5}),
                json!({"amount": "not-a-number", "decimals": 9, "symbol": "???"}),
            ],
        ));

        let balances = service(api.clone(), 100)
            .fetch_svm_token_balances("Wallet111")
            .await
            .unwrap();

        assert_eq!(balances[0].raw_amount, "2500000");
        assert_eq!(balances[0].amount, Some(2.5));
        assert_eq!(balances[0].symbol.as_deref(), Some("USDC"));
        assert_eq!(balances[1].amount, None);
        assert_eq!(param(&api.calls()[0].1, "chains"), Some("solana"));
    }

    #[test]
    fn test_scale_amount() {
        assert_eq!(scale_amount("1000000000", 9), Some(1.0));
        assert_eq!(scale_amount("42", 0), Some(42.0));
        assert_eq!(scale_amount("", 6), None);
    }

    #[tokio::test]
    async fn test_avs_metrics_paginates_and_filters() {
        let rows: Vec<Value> = (0..5)
            .map(|i| {
                json!({
                    "avs_name": if i == 3 { "EigenDA" } else { "Other" },
                    "num_operators": i,
                    "total_TVL": 10.0 * i as f64,
                    "num_stakers": 100 + i
                })
            })
            .collect();
        let api = Arc::new(FakeApi::default().with_rows("/v1/eigenlayer/avs-stats", rows));

        let metrics = service(api.clone(), 2)
            .fetch_avs_metrics("EigenDA")
            .await
            .unwrap();

        assert_eq!(
            metrics,
            vec![AvsMetrics {
                num_operators: Some(3),
                total_tvl: Some(30.0),
                num_stakers: Some(103),
            }]
        );
        let offsets: Vec<_> = api
            .calls()
            .iter()
            .map(|(_, q)| param(q, "offset").unwrap().to_string())
            .collect();
        assert_eq!(offsets, vec!["0", "2", "4"]);
    }

    #[tokio::test]
    async fn test_numeric_columns_accept_float_and_string_encodings() {
        let api = Arc::new(
            FakeApi::default()
                .with_rows(
                    "/v1/eigenlayer/avs-stats",
                    vec![json!({
                        "avs_name": "EigenDA",
                        "num_operators": "12",
                        "total_TVL": "9",
                        "num_stakers": 1500.0
                    })],
                )
                .with_rows(
                    "/echo/beta/balances/svm/Wallet111",
                    vec![json!({"amount": "2500000", "decimals": "6", "value_usd": "2.5"})],
                ),
        );
        let service = service(api, 100);

        let metrics = service.fetch_avs_metrics("EigenDA").await.unwrap();
        assert_eq!(
            metrics,
            vec![AvsMetrics {
                num_operators: Some(12),
                total_tvl: Some(9.0),
                num_stakers: Some(1500),
            }]
        );

        let balances = service.fetch_svm_token_balances("Wallet111").await.unwrap();
        assert_eq!(balances[0].amount, Some(2.5));
        assert_eq!(balances[0].value_usd, Some(2.5));
    }

    #[test]
    fn test_unreadable_numbers_become_none() {
        let row: OperatorMetrics = serde_json::from_value(json!({
            "operator_name": "alpha",
            "total_TVL": "n/a",
            "num_stakers": 2.5
        }))
        .unwrap();

        assert_eq!(row.total_tvl, None);
        assert_eq!(row.num_stakers, None);

        let row: OperatorMetrics =
            serde_json::from_value(json!({"operator_name": "beta", "total_TVL": null})).unwrap();
        assert_eq!(row.total_tvl, None);
        assert_eq!(row.num_stakers, None);
    }

    #[tokio::test]
    async fn test_operator_metrics_joins_mapping_and_stats() {
        let api = Arc::new(
            FakeApi::default()
                .with_rows(
                    "/v1/eigenlayer/operator-to-avs-mapping",
                    vec![
                        json!({"operator_name": "alpha", "avs_name": "EigenDA"}),
                        json!({"operator_name": "beta", "avs_name": "EigenDA"}),
                    ],
                )
                .with_rows(
                    "/v1/eigenlayer/operator-stats",
                    vec![
                        json!({"operator_name": "alpha", "total_TVL": 5.0, "num_stakers": 7}),
                        json!({"operator_name": "gamma", "total_TVL": 9.0, "num_stakers": 1}),
                        json!({"operator_name": "beta", "total_TVL": 1.0, "num_stakers": 2}),
                    ],
                ),
        );

        let metrics = service(api.clone(), 100)
            .fetch_operator_metrics("EigenDA")
            .await
            .unwrap();

        let names: Vec<_> = metrics.iter().map(|m| m.operator_name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);

        let calls = api.calls();
        assert_eq!(param(&calls[0].1, "filters"), Some("avs_name = 'EigenDA'"));
    }

    #[tokio::test]
    async fn test_pagination_error_propagates() {
        let api = Arc::new(FakeApi::default().failing("/v1/eigenlayer/avs-stats"));

        let result = service(api, 100).fetch_avs_metrics("EigenDA").await;
        assert!(matches!(result, Err(TransportError::Status { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_launchpad_report_isolates_failures() {
        let api = Arc::new(
            FakeApi::default()
                .with_rows("/v1/query/5001416/results", vec![json!({"tokens": 812})])
                .with_rows("/v1/query/4006260/results", vec![json!({"tokens": 20311})])
                .failing("/v1/query/5126341/results"),
        );

        let results = service(api.clone(), 100)
            .fetch_launchpad_report(LaunchpadReport::Tokens24h, None)
            .await;

        let labels: Vec<_> = results.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["LaunchLab Tokens", "LetsBonk Tokens", "Pumpfun Tokens", "Boop Tokens"]
        );
        assert_eq!(results[0].rows, vec![json!({"tokens": 812})]);
        assert!(results[1].rows.is_empty() && !results[1].is_ok());
        assert_eq!(results[2].rows, vec![json!({"tokens": 20311})]);
        assert!(results[3].rows.is_empty() && results[3].is_ok());

        assert!(api
            .calls()
            .iter()
            .all(|(_, q)| param(q, "limit") == Some("1")));
    }
}
