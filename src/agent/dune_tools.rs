//! Tools exposed by the Dune agent.
//!
//! Each tool parses its typed input, makes exactly one call into
//! [`DuneService`], and wraps the result in a fixed output shape.

use crate::agent::tools::{parse_input, to_output, FnTool, ToolRegistry};
use crate::analytics::dune::{DuneService, LaunchpadReport};
use crate::error::{ToolError, TransportError};
use crate::models::QueryResult;
use crate::solana::is_valid_public_key;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::future::Future;

/// Typed tool input with checks beyond what the schema expresses.
trait ToolInput: DeserializeOwned {
    fn check(&self) -> Result<(), String> {
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct DexPairInput {
    chain: String,
    token_pair: String,
}

impl ToolInput for DexPairInput {
    fn check(&self) -> Result<(), String> {
        check_chain(&self.chain)?;
        if self.token_pair.trim().is_empty() {
            return Err("token_pair must not be empty".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ChainInput {
    chain: String,
}

impl ToolInput for ChainInput {
    fn check(&self) -> Result<(), String> {
        check_chain(&self.chain)
    }
}

#[derive(Debug, Deserialize)]
struct WalletInput {
    wallet_address: String,
}

impl ToolInput for WalletInput {
    fn check(&self) -> Result<(), String> {
        if is_valid_public_key(&self.wallet_address) {
            Ok(())
        } else {
            Err(format!("'{}' is not a base58 wallet address", self.wallet_address))
        }
    }
}

#[derive(Debug, Deserialize)]
struct AvsInput {
    avs_name: String,
}

impl ToolInput for AvsInput {
    fn check(&self) -> Result<(), String> {
        if self.avs_name.trim().is_empty() {
            Err("avs_name must not be empty".to_string())
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Deserialize)]
struct LaunchpadInput {
    #[serde(default)]
    limit: Option<u32>,
}

impl ToolInput for LaunchpadInput {
    fn check(&self) -> Result<(), String> {
        match self.limit {
            Some(0) => Err("limit must be at least 1".to_string()),
            _ => Ok(()),
        }
    }
}

/// Chain names become a URL path segment.
fn check_chain(chain: &str) -> Result<(), String> {
    let valid = !chain.is_empty()
        && chain
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(format!("'{}' is not a valid chain name", chain))
    }
}

#[derive(Debug, Serialize)]
struct MetricsOutput<T> {
    metrics: Vec<T>,
}

#[derive(Debug, Serialize)]
struct OperatorMetricsOutput<T> {
    avs_name: String,
    metrics: Vec<T>,
}

#[derive(Debug, Serialize)]
struct BreakdownOutput {
    breakdown: Vec<QueryResult>,
}

/// Build a tool whose handler runs `run` on a clone of `service`.
fn dune_tool<I, O, F, Fut>(
    service: &DuneService,
    name: &'static str,
    description: &str,
    parameters: Value,
    run: F,
) -> FnTool
where
    I: ToolInput,
    O: Serialize,
    F: Fn(DuneService, I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, TransportError>> + Send + 'static,
{
    let service = service.clone();
    FnTool::new(name, description, parameters, move |input| {
        let pending = parse_input::<I>(name, input).and_then(|args| {
            args.check()
                .map_err(|message| ToolError::invalid_input(name, message))?;
            Ok(run(service.clone(), args))
        });

        async move {
            let output = pending?
                .await
                .map_err(|e| ToolError::execution(name, e))?;
            to_output(name, &output)
        }
    })
}

fn chain_property() -> Value {
    json!({
        "type": "string",
        "description": "The blockchain to query (e.g., solana, ethereum)"
    })
}

fn launchpad_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "limit": {
                "type": "integer",
                "description": "Rows to return per launchpad (default: 1, the latest)"
            }
        },
        "required": []
    })
}

fn launchpad_tool(
    service: &DuneService,
    name: &'static str,
    description: &str,
    report: LaunchpadReport,
) -> FnTool {
    dune_tool(
        service,
        name,
        description,
        launchpad_schema(),
        move |service: DuneService, args: LaunchpadInput| async move {
            let breakdown = service.fetch_launchpad_report(report, args.limit).await;
            Ok::<_, TransportError>(BreakdownOutput { breakdown })
        },
    )
}

/// Register every Dune tool on `registry`.
pub fn register_dune_tools(
    registry: &mut ToolRegistry,
    service: &DuneService,
) -> Result<(), ToolError> {
    registry.register(dune_tool(
        service,
        "get_dex_pair_metrics",
        "Given a blockchain, retrieves essential metadata and statistical data for a given token pair",
        json!({
            "type": "object",
            "properties": {
                "chain": chain_property(),
                "token_pair": {
                    "type": "string",
                    "description": "Token pair identifier (e.g., USDC/SOL)"
                }
            },
            "required": ["chain", "token_pair"]
        }),
        |service: DuneService, args: DexPairInput| async move {
            let metrics = service
                .fetch_dex_metrics(&args.chain, &args.token_pair)
                .await?;
            Ok::<_, TransportError>(MetricsOutput { metrics })
        },
    ))?;

    registry.register(dune_tool(
        service,
        "get_token_pairs_liquidity",
        "Identify token pairs with the highest USD liquidity on a given chain",
        json!({
            "type": "object",
            "properties": { "chain": chain_property() },
            "required": ["chain"]
        }),
        |service: DuneService, args: ChainInput| async move {
            let metrics = service.fetch_top_token_pairs(&args.chain).await?;
            Ok::<_, TransportError>(MetricsOutput { metrics })
        },
    ))?;

    registry.register(dune_tool(
        service,
        "get_svm_token_balances",
        "Get token balances for a Solana wallet address",
        json!({
            "type": "object",
            "properties": {
                "wallet_address": {
                    "type": "string",
                    "description": "The Solana wallet address (base58)"
                }
            },
            "required": ["wallet_address"]
        }),
        |service: DuneService, args: WalletInput| async move {
            let metrics = service
                .fetch_svm_token_balances(&args.wallet_address)
                .await?;
            Ok::<_, TransportError>(MetricsOutput { metrics })
        },
    ))?;

    registry.register(dune_tool(
        service,
        "get_eigenlayer_avs_metrics",
        "Get staking and operator metrics for a specific AVS",
        json!({
            "type": "object",
            "properties": {
                "avs_name": {
                    "type": "string",
                    "description": "The name of the AVS to query"
                }
            },
            "required": ["avs_name"]
        }),
        |service: DuneService, args: AvsInput| async move {
            let metrics = service.fetch_avs_metrics(&args.avs_name).await?;
            Ok::<_, TransportError>(MetricsOutput { metrics })
        },
    ))?;

    registry.register(dune_tool(
        service,
        "get_eigenlayer_operator_metrics",
        "Get the stats for all operators in a specific AVS",
        json!({
            "type": "object",
            "properties": {
                "avs_name": {
                    "type": "string",
                    "description": "The name of the AVS to get operator stats for"
                }
            },
            "required": ["avs_name"]
        }),
        |service: DuneService, args: AvsInput| async move {
            let metrics = service.fetch_operator_metrics(&args.avs_name).await?;
            Ok::<_, TransportError>(OperatorMetricsOutput {
                avs_name: args.avs_name,
                metrics,
            })
        },
    ))?;

    registry.register(launchpad_tool(
        service,
        "get_launchpad_tokens_24h",
        "Get the number of tokens launched in the last 24 hours on LaunchLab, LetsBonk, Pumpfun and Boop",
        LaunchpadReport::Tokens24h,
    ))?;

    registry.register(launchpad_tool(
        service,
        "get_launchpad_graduates",
        "Get the number of tokens that graduated from LaunchLab, LetsBonk, Pumpfun and Boop",
        LaunchpadReport::Graduates,
    ))?;

    registry.register(launchpad_tool(
        service,
        "get_launchpad_active_addresses",
        "Get active trading addresses on LaunchLab, LetsBonk, Pumpfun and Boop",
        LaunchpadReport::ActiveAddresses,
    ))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::client::DuneClient;
    use crate::analytics::pagination::PageLimits;
    use crate::config::DuneConfig;
    use std::sync::Arc;
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn registry_for(server: &MockServer) -> ToolRegistry {
        let client = DuneClient::new(&DuneConfig {
            base_url: server.uri(),
            api_key: Some("test-key".to_string()),
            ..DuneConfig::default()
        })
        .unwrap();
        let service = DuneService::new(Arc::new(client), PageLimits::default(), 1);

        let mut registry = ToolRegistry::new();
        register_dune_tools(&mut registry, &service).unwrap();
        registry
    }

    #[tokio::test]
    async fn test_registers_all_tools() {
        let server = MockServer::start().await;
        let registry = registry_for(&server);

        assert_eq!(
            registry.names(),
            vec![
                "get_dex_pair_metrics",
                "get_token_pairs_liquidity",
                "get_svm_token_balances",
                "get_eigenlayer_avs_metrics",
                "get_eigenlayer_operator_metrics",
                "get_launchpad_tokens_24h",
                "get_launchpad_graduates",
                "get_launchpad_active_addresses",
            ]
        );
    }

    #[tokio::test]
    async fn test_dex_metrics_tool_is_idempotent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/dex/pairs/solana"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {"rows": [{"token_pair": "USDC-SOL", "usd_liquidity": 1234.5}]}
            })))
            .expect(2)
            .mount(&server)
            .await;
        let registry = registry_for(&server);
        let input = json!({"chain": "solana", "token_pair": "USDC-SOL"});

        let first = registry
            .invoke("get_dex_pair_metrics", input.clone())
            .await
            .unwrap();
        let second = registry.invoke("get_dex_pair_metrics", input).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first["metrics"][0]["token_pair"], "USDC-SOL");
        assert_eq!(first["metrics"][0]["usd_liquidity"], 1234.5);
    }

    #[tokio::test]
    async fn test_balances_tool_converts_amounts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex("^/echo/beta/balances/svm/.+"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "balances": [{"amount": "123400000000", "decimals": 9, "symbol": "SOL",
                              "name": "Solana", "price_usd": 150.0, "value_usd": 18510.0}]
            })))
            .mount(&server)
            .await;
        let registry = registry_for(&server);

        let output = registry
            .invoke(
                "get_svm_token_balances",
                json!({"wallet_address": "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM"}),
            )
            .await
            .unwrap();

        assert_eq!(output["metrics"][0]["raw_amount"], "123400000000");
        assert_eq!(output["metrics"][0]["amount"], 123.4);
    }

    #[tokio::test]
    async fn test_invalid_inputs() {
        let server = MockServer::start().await;
        let registry = registry_for(&server);

        let missing = registry
            .invoke("get_dex_pair_metrics", json!({"chain": "solana"}))
            .await
            .unwrap_err();
        assert!(matches!(missing, ToolError::InvalidInput { .. }));

        let bad_chain = registry
            .invoke("get_token_pairs_liquidity", json!({"chain": "../v1/admin"}))
            .await
            .unwrap_err();
        assert!(matches!(bad_chain, ToolError::InvalidInput { .. }));

        let bad_wallet = registry
            .invoke("get_svm_token_balances", json!({"wallet_address": "not/a/key"}))
            .await
            .unwrap_err();
        assert!(matches!(bad_wallet, ToolError::InvalidInput { .. }));

        let zero_limit = registry
            .invoke("get_launchpad_graduates", json!({"limit": 0}))
            .await
            .unwrap_err();
        assert!(matches!(zero_limit, ToolError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn test_transport_failure_is_execution_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let registry = registry_for(&server);

        let err = registry
            .invoke("get_token_pairs_liquidity", json!({"chain": "ethereum"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Execution { .. }));
    }

    #[tokio::test]
    async fn test_launchpad_tool_survives_partial_outage() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/query/5041379/results"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex("^/v1/query/[0-9]+/results$"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"result": {"rows": [{"graduated": 12}]}})),
            )
            .mount(&server)
            .await;
        let registry = registry_for(&server);

        let output = registry
            .invoke("get_launchpad_graduates", json!({}))
            .await
            .unwrap();
        let breakdown = output["breakdown"].as_array().unwrap();

        assert_eq!(breakdown.len(), 4);
        assert_eq!(breakdown[2]["label"], "Pumpfun tokens");
        assert_eq!(breakdown[2]["rows"], json!([]));
        assert!(breakdown[2]["error"].is_string());
        assert_eq!(breakdown[0]["rows"][0]["graduated"], 12);
        assert!(breakdown[0].get("error").is_none());
    }
}
