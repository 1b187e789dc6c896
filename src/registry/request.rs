use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RpcError;
use crate::model::NamedEnum;

/// Public invocation shape: a command name plus its ordered, untyped params.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcCall {
    pub command: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

/// Ordered parameter list for one invocation. Order is part of every
/// command's compatibility surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RpcRequest {
    pub params: Vec<Value>,
}

/// JavaScript-style falsiness: `null`, `false`, `0` and `""`.
/// Optional slots holding a falsy value count as not supplied.
#[allow(clippy::float_cmp)]
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f == 0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

#[allow(
    clippy::float_cmp,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn integral_u64(f: f64) -> Option<u64> {
    (f.fract() == 0.0 && f >= 0.0 && f < u64::MAX as f64).then_some(f as u64)
}

/// Non-negative integer value. JSON numbers with a zero fraction (`42.0`)
/// count. Shared by the `integer` type check and [`RpcRequest::u64`].
pub fn as_whole_number(value: &Value) -> Option<u64> {
    let Value::Number(n) = value else {
        return None;
    };
    n.as_u64().or_else(|| n.as_f64().and_then(integral_u64))
}

impl RpcRequest {
    pub fn new(params: Vec<Value>) -> Self {
        Self { params }
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn param(&self, index: usize) -> Option<&Value> {
        self.params.get(index)
    }

    /// True when slot `index` exists and holds a non-falsy value.
    pub fn is_supplied(&self, index: usize) -> bool {
        self.param(index).is_some_and(|v| !is_falsy(v))
    }

    // ── Typed extraction (used by execute on validated envelopes) ──

    pub fn string(&self, index: usize, name: &str) -> Result<String, RpcError> {
        match self.param(index) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(RpcError::invalid(name, "string")),
            None => Err(RpcError::missing(name)),
        }
    }

    pub fn u64(&self, index: usize, name: &str) -> Result<u64, RpcError> {
        match self.param(index) {
            Some(value) => as_whole_number(value).ok_or_else(|| RpcError::invalid(name, "number")),
            None => Err(RpcError::missing(name)),
        }
    }

    pub fn opt_u64(&self, index: usize, name: &str) -> Result<Option<u64>, RpcError> {
        if self.is_supplied(index) {
            self.u64(index, name).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn named<E: NamedEnum>(&self, index: usize, name: &str) -> Result<E, RpcError> {
        let raw = self.string(index, name)?;
        E::from_name(&raw).ok_or_else(|| RpcError::invalid(name, E::NAME))
    }
}

impl From<Vec<Value>> for RpcRequest {
    fn from(params: Vec<Value>) -> Self {
        Self::new(params)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::MarketType;
    use serde_json::json;

    #[test]
    fn test_falsy_values() {
        for v in [json!(null), json!(false), json!(0), json!(0.0), json!("")] {
            assert!(is_falsy(&v), "{v} should be falsy");
        }
        for v in [json!(true), json!(1), json!(-1), json!("x"), json!([]), json!({})] {
            assert!(!is_falsy(&v), "{v} should be truthy");
        }
    }

    #[test]
    fn test_request_serializes_as_bare_array() {
        let req = RpcRequest::new(vec![json!(1), json!("a")]);
        assert_eq!(serde_json::to_value(&req).unwrap(), json!([1, "a"]));
        let call: RpcCall = serde_json::from_value(json!({ "command": "market_list" })).unwrap();
        assert!(call.params.is_empty());
    }

    #[test]
    fn test_typed_extraction() {
        let req = RpcRequest::new(vec![json!(42), json!("MARKETPLACE"), json!(-3), json!(null)]);
        assert_eq!(req.u64(0, "profileId").unwrap(), 42);
        assert_eq!(req.named::<MarketType>(1, "type").unwrap(), MarketType::Marketplace);
        assert_eq!(req.u64(2, "n").unwrap_err(), RpcError::invalid("n", "number"));
        let floats = RpcRequest::new(vec![json!(42.0), json!(1.5), json!(-2.0)]);
        assert_eq!(floats.u64(0, "profileId").unwrap(), 42);
        assert_eq!(floats.u64(1, "n").unwrap_err(), RpcError::invalid("n", "number"));
        assert_eq!(floats.u64(2, "n").unwrap_err(), RpcError::invalid("n", "number"));
        assert_eq!(req.opt_u64(3, "opt").unwrap(), None);
        assert_eq!(req.string(9, "gone").unwrap_err(), RpcError::missing("gone"));
        assert_eq!(
            req.named::<MarketType>(0, "type").unwrap_err(),
            RpcError::invalid("type", "string")
        );
    }
}
