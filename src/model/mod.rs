pub mod market;

// Re-export commonly used types at the model level.
pub use market::{Market, MarketCreateRequest, MarketId, MarketType};

/// A fieldless enumeration whose members are addressed by their declared
/// names over the wire. Name matching is exact and case-sensitive.
pub trait NamedEnum: Sized + Copy + 'static {
    /// Type name reported in validation errors (e.g. `MarketType`).
    const NAME: &'static str;

    /// Every member, in declaration order.
    const ALL: &'static [Self];

    fn as_name(self) -> &'static str;

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| m.as_name() == name)
    }

    fn member_names() -> Vec<&'static str> {
        Self::ALL.iter().map(|m| m.as_name()).collect()
    }
}
