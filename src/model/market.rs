use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::NamedEnum;

/// Kind of market a profile can create or join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketType {
    /// Public marketplace shared by many sellers.
    Marketplace,
    /// Single-seller storefront.
    Storefront,
    /// Admin view of a storefront, holds the publish key.
    StorefrontAdmin,
}

impl NamedEnum for MarketType {
    const NAME: &'static str = "MarketType";
    const ALL: &'static [Self] = &[Self::Marketplace, Self::Storefront, Self::StorefrontAdmin];

    fn as_name(self) -> &'static str {
        match self {
            Self::Marketplace => "MARKETPLACE",
            Self::Storefront => "STOREFRONT",
            Self::StorefrontAdmin => "STOREFRONT_ADMIN",
        }
    }
}

impl fmt::Display for MarketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct MarketId(pub u64);

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Typed request handed to the market service by `market_add`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MarketCreateRequest {
    pub profile_id: u64,
    pub name: String,
    pub market_type: MarketType,
    pub receive_key: String,
    pub receive_address: String,
    pub publish_key: String,
    pub publish_address: String,
}

/// A market as stored by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Market {
    pub id: MarketId,
    pub profile_id: u64,
    pub name: String,
    pub market_type: MarketType,
    pub receive_key: String,
    pub receive_address: String,
    pub publish_key: String,
    pub publish_address: String,
}

impl Market {
    pub fn from_request(id: MarketId, req: MarketCreateRequest) -> Self {
        Self {
            id,
            profile_id: req.profile_id,
            name: req.name,
            market_type: req.market_type,
            receive_key: req.receive_key,
            receive_address: req.receive_address,
            publish_key: req.publish_key,
            publish_address: req.publish_address,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_member_names_match_serde_names() {
        for member in MarketType::ALL {
            let json = serde_json::to_value(member).unwrap();
            assert_eq!(json, serde_json::Value::String(member.as_name().to_string()));
        }
    }

    #[test]
    fn test_from_name_is_case_sensitive() {
        assert_eq!(MarketType::from_name("STOREFRONT"), Some(MarketType::Storefront));
        assert_eq!(MarketType::from_name("storefront"), None);
        assert_eq!(MarketType::from_name("Marketplace"), None);
        assert_eq!(
            MarketType::member_names(),
            vec!["MARKETPLACE", "STOREFRONT", "STOREFRONT_ADMIN"]
        );
    }
}
