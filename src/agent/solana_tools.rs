//! Tools exposed by the Solana agent.

use crate::agent::tools::{parse_input, to_output, FnTool, ToolRegistry};
use crate::error::ToolError;
use crate::solana::{is_valid_public_key, lamports_to_sol, SolanaClient};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Serialize)]
struct SlotOutput {
    slot: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BalanceInput {
    public_key: String,
}

#[derive(Debug, Serialize)]
struct BalanceOutput {
    balance: f64,
    unit: &'static str,
}

fn get_slot_tool(client: &SolanaClient) -> FnTool {
    const NAME: &str = "get_slot";
    let client = client.clone();

    FnTool::new(
        NAME,
        "Get the current slot of the Solana blockchain",
        json!({"type": "object", "properties": {}, "required": []}),
        move |_| {
            let client = client.clone();
            async move {
                let slot = client
                    .get_slot()
                    .await
                    .map_err(|e| ToolError::execution(NAME, e))?;
                to_output(NAME, &SlotOutput { slot })
            }
        },
    )
}

fn get_balance_tool(client: &SolanaClient) -> FnTool {
    const NAME: &str = "get_balance";
    let client = client.clone();

    FnTool::new(
        NAME,
        "Get the SOL balance of a wallet",
        json!({
            "type": "object",
            "properties": {
                "publicKey": {
                    "type": "string",
                    "description": "Base58 public key of the wallet"
                }
            },
            "required": ["publicKey"]
        }),
        move |input| {
            let client = client.clone();
            async move {
                let args: BalanceInput = parse_input(NAME, input)?;
                if !is_valid_public_key(&args.public_key) {
                    return Err(ToolError::invalid_input(
                        NAME,
                        format!("'{}' is not a base58 public key", args.public_key),
                    ));
                }

                let lamports = client
                    .get_balance(&args.public_key)
                    .await
                    .map_err(|e| ToolError::execution(NAME, e))?;
                to_output(
                    NAME,
                    &BalanceOutput {
                        balance: lamports_to_sol(lamports),
                        unit: "SOL",
                    },
                )
            }
        },
    )
}

/// Register `get_slot` and `get_balance` on `registry`.
pub fn register_solana_tools(
    registry: &mut ToolRegistry,
    client: &SolanaClient,
) -> Result<(), ToolError> {
    registry.register(get_slot_tool(client))?;
    registry.register(get_balance_tool(client))?;
    Ok(())
}
