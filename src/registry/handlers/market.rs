use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RpcError;
use crate::model::{Market, MarketCreateRequest, MarketType};
use crate::registry::catalog;
use crate::registry::contract::{Contract, Guard, ParamType};
use crate::registry::request::RpcRequest;
use crate::registry::{CommandCategory, CommandInfo, CommandOutput, CommandResult, RpcCommand};
use crate::service::MarketService;

// ── market_add ──────────────────────────────────────────────────

/// Create a new market for a profile.
///
/// ```text
/// [0] profileId       number
/// [1] name            string
/// [2] type            MarketType
/// [3] receiveKey      string
/// [4] receiveAddress  string
/// [5] publishKey      string, defaults to receiveKey
/// [6] publishAddress  string, defaults to receiveAddress
/// ```
///
/// The publish pair is all-or-nothing: supplying one without the other is a
/// `MissingParameter("publishAddress")`.
pub struct MarketAddCommand {
    contract: Contract,
    markets: Arc<dyn MarketService>,
}

impl MarketAddCommand {
    pub fn new(markets: Arc<dyn MarketService>) -> Result<Self, RpcError> {
        let contract = Contract::builder()
            .required("profileId", ParamType::Integer, "The id of the profile that owns the market.")
            .required("name", ParamType::String, "The unique name of the market being created.")
            .required("type", ParamType::enumeration::<MarketType>(), "The kind of market.")
            .required("receiveKey", ParamType::String, "The receive private key of the market.")
            .required("receiveAddress", ParamType::String, "The receive address matching the receive private key.")
            .defaulted("publishKey", ParamType::String, "receiveKey", "The publish private key of the market.")
            .defaulted(
                "publishAddress",
                ParamType::String,
                "receiveAddress",
                "The publish address matching the publish private key.",
            )
            .guard(Guard::LengthEquals {
                len: 6,
                missing: "publishAddress",
            })
            .guard(Guard::PresentWithout {
                present: 6,
                absent: 5,
                missing: "publishAddress",
            })
            .build()?;
        Ok(Self { contract, markets })
    }
}

#[async_trait]
impl RpcCommand for MarketAddCommand {
    fn info(&self) -> CommandInfo {
        CommandInfo {
            name: "market_add",
            description: "Create a new market.",
            category: CommandCategory::Market,
        }
    }

    fn contract(&self) -> &Contract {
        &self.contract
    }

    async fn execute(&self, request: RpcRequest) -> Result<CommandOutput, RpcError> {
        let create = MarketCreateRequest {
            profile_id: request.u64(0, "profileId")?,
            name: request.string(1, "name")?,
            market_type: request.named(2, "type")?,
            receive_key: request.string(3, "receiveKey")?,
            receive_address: request.string(4, "receiveAddress")?,
            publish_key: request.string(5, "publishKey")?,
            publish_address: request.string(6, "publishAddress")?,
        };
        let market = self.markets.create(create).await?;
        Ok(CommandOutput::new(
            format!(
                "Market \"{}\" created (id {}, type {}).",
                market.name, market.id, market.market_type
            ),
            CommandResult::MarketAdd(market),
        ))
    }

    fn example(&self) -> String {
        format!(
            "{} 1 'mymarket' 'MARKETPLACE' '2Zc2pc9jSx2qF5tpu25DCZEr1Dwj8JBoVL5WP4H1drJsX9sP4ek' \
             'pmktyVZshdMAQ6DPbbRXEFNGuzMbTMkqAA'",
            self.name()
        )
    }

    fn result_schema(&self) -> serde_json::Value {
        catalog::schema_value::<Market>()
    }
}

// ── market_list ─────────────────────────────────────────────────

/// List markets, optionally only those owned by one profile.
pub struct MarketListCommand {
    contract: Contract,
    markets: Arc<dyn MarketService>,
}

impl MarketListCommand {
    pub fn new(markets: Arc<dyn MarketService>) -> Result<Self, RpcError> {
        let contract = Contract::builder()
            .optional("profileId", ParamType::Integer, "Only list markets owned by this profile.")
            .build()?;
        Ok(Self { contract, markets })
    }
}

#[async_trait]
impl RpcCommand for MarketListCommand {
    fn info(&self) -> CommandInfo {
        CommandInfo {
            name: "market_list",
            description: "List markets.",
            category: CommandCategory::Market,
        }
    }

    fn contract(&self) -> &Contract {
        &self.contract
    }

    async fn execute(&self, request: RpcRequest) -> Result<CommandOutput, RpcError> {
        let profile_id = request.opt_u64(0, "profileId")?;
        let markets = self.markets.list(profile_id).await?;
        let mut lines = vec![format!("{} markets:", markets.len())];
        for m in &markets {
            lines.push(format!(
                "  - \"{}\" (id: {}, type: {}, profile: {})",
                m.name, m.id, m.market_type, m.profile_id
            ));
        }
        Ok(CommandOutput::new(lines.join("\n"), CommandResult::MarketList(markets)))
    }

    fn example(&self) -> String {
        format!("{} 1", self.name())
    }

    fn result_schema(&self) -> serde_json::Value {
        catalog::schema_value::<Vec<Market>>()
    }
}
