pub mod catalog;
pub mod contract;
pub mod handlers;
pub mod request;

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::error::RpcError;
use crate::model::Market;
use crate::service::Services;

use contract::Contract;
use request::{RpcCall, RpcRequest};

// ── Command metadata ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandCategory {
    Market,
}

impl CommandCategory {
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Market => "market",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Market => "Create and list markets",
        }
    }

    pub fn all() -> &'static [CommandCategory] {
        &[Self::Market]
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|c| c.slug().eq_ignore_ascii_case(slug))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommandInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub category: CommandCategory,
}

// ── Command output ──────────────────────────────────────────────

/// Typed result for every command, tagged by command name so callers can
/// narrow on `command`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", content = "data", rename_all = "snake_case")]
pub enum CommandResult {
    MarketAdd(Market),
    MarketList(Vec<Market>),
}

/// Result of executing a command. `message` serves the CLI, `result` carries
/// the service's entity unchanged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandOutput {
    pub message: String,
    pub result: CommandResult,
}

impl CommandOutput {
    pub fn new(message: impl Into<String>, result: CommandResult) -> Self {
        Self {
            message: message.into(),
            result,
        }
    }
}

// ── Command trait ───────────────────────────────────────────────

/// One RPC operation: a positional contract, an execute step backed by an
/// injected service, and metadata for help tooling.
///
/// Implementations hold no per-invocation state. The registry calls
/// [`RpcCommand::validate`] and only then [`RpcCommand::execute`].
#[async_trait]
pub trait RpcCommand: Send + Sync {
    fn info(&self) -> CommandInfo;

    fn contract(&self) -> &Contract;

    fn validate(&self, request: RpcRequest) -> Result<RpcRequest, RpcError> {
        self.contract().validate(request)
    }

    /// Precondition: `request` already passed [`RpcCommand::validate`].
    async fn execute(&self, request: RpcRequest) -> Result<CommandOutput, RpcError>;

    fn name(&self) -> &'static str {
        self.info().name
    }

    fn description(&self) -> &'static str {
        self.info().description
    }

    fn usage(&self) -> String {
        let synopsis = self.contract().synopsis();
        if synopsis.is_empty() {
            self.name().to_string()
        } else {
            format!("{} {synopsis}", self.name())
        }
    }

    fn help(&self) -> String {
        format!(
            "{} - {}\n{}",
            self.usage(),
            self.description(),
            self.contract().param_help()
        )
    }

    fn example(&self) -> String;

    /// JSON schema of the entity carried in this command's result.
    fn result_schema(&self) -> serde_json::Value {
        catalog::empty_object_schema()
    }
}

// ── Registry / dispatcher ───────────────────────────────────────

/// Name → command table. Built once at startup and read-only afterwards, so
/// it can be shared behind an `Arc` and dispatched from many tasks at once.
#[derive(Default)]
pub struct CommandRegistry {
    commands: IndexMap<&'static str, Arc<dyn RpcCommand>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, command: Arc<dyn RpcCommand>) -> Result<(), RpcError> {
        let name = command.name();
        if self.commands.contains_key(name) {
            return Err(RpcError::DuplicateCommand {
                name: name.to_string(),
            });
        }
        self.commands.insert(name, command);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn RpcCommand>> {
        self.commands.get(name)
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.commands.keys().copied()
    }

    pub fn commands(&self) -> impl Iterator<Item = &Arc<dyn RpcCommand>> {
        self.commands.values()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Resolve `name`, validate `request` against its contract, then execute.
    /// Errors are returned exactly as the validator or service produced them.
    pub async fn dispatch(&self, name: &str, request: RpcRequest) -> Result<CommandOutput, RpcError> {
        let Some(command) = self.commands.get(name) else {
            tracing::debug!(command = name, "unknown command");
            return Err(RpcError::UnknownCommand {
                name: name.to_string(),
            });
        };

        let span = tracing::debug_span!("dispatch", command = name, params = request.len());
        async move {
            let request = command.validate(request).inspect_err(|e| {
                tracing::debug!(error = %e, "validation rejected");
            })?;
            command.execute(request).await.inspect_err(|e| {
                tracing::warn!(error = %e, "command failed");
            })
        }
        .instrument(span)
        .await
    }

    pub async fn call(&self, call: RpcCall) -> Result<CommandOutput, RpcError> {
        self.dispatch(&call.command, RpcRequest::new(call.params)).await
    }
}

/// Wire every command to the already-constructed services.
pub fn build_registry(services: &Services) -> Result<CommandRegistry, RpcError> {
    let mut registry = CommandRegistry::new();
    registry.register(Arc::new(handlers::market::MarketAddCommand::new(
        Arc::clone(&services.markets),
    )?))?;
    registry.register(Arc::new(handlers::market::MarketListCommand::new(
        Arc::clone(&services.markets),
    )?))?;
    tracing::info!(commands = registry.len(), "command registry built");
    Ok(registry)
}
