//! Positional parameter contracts and the validator that enforces them.
//!
//! A [`Contract`] is built once per command at startup and never changes.
//! [`Contract::validate`] runs four passes in a fixed order and reports the
//! first violation it meets:
//!
//! ```text
//! 1. lengths   required slots in index order, then the guard list
//! 2. types     every supplied slot, in index order
//! 3. enums     member-name check for enum-typed slots
//! 4. defaults  backfill absent/falsy optional slots from `default_from`
//! ```
//!
//! Only pass 4 touches the envelope, and re-running it is a no-op.

use std::fmt::Write;

use serde::Serialize;
use serde_json::Value;

use super::request::{as_whole_number, is_falsy, RpcRequest};
use crate::error::RpcError;
use crate::model::NamedEnum;

// ── Parameter types ─────────────────────────────────────────────

/// Closed set of names a parameter value may take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumDomain {
    #[serde(rename = "enum")]
    pub name: &'static str,
    pub members: Vec<&'static str>,
}

impl EnumDomain {
    pub fn of<E: NamedEnum>() -> Self {
        Self {
            name: E::NAME,
            members: E::member_names(),
        }
    }

    pub fn contains(&self, candidate: &str) -> bool {
        self.members.iter().any(|m| *m == candidate)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParamType {
    String,
    Number,
    /// Non-negative integer such as an id. Mismatches report `number`.
    Integer,
    Boolean,
    Enum(EnumDomain),
}

impl ParamType {
    pub fn enumeration<E: NamedEnum>() -> Self {
        ParamType::Enum(EnumDomain::of::<E>())
    }

    /// Name reported when the runtime type is wrong. Enum values travel as
    /// strings, so a non-string enum value reports `string`.
    pub fn runtime_name(&self) -> &'static str {
        match self {
            ParamType::String | ParamType::Enum(_) => "string",
            ParamType::Number | ParamType::Integer => "number",
            ParamType::Boolean => "boolean",
        }
    }

    /// Name shown in help and usage text.
    pub fn display_name(&self) -> &'static str {
        match self {
            ParamType::String => "String",
            ParamType::Number => "Number",
            ParamType::Integer => "Integer",
            ParamType::Boolean => "Boolean",
            ParamType::Enum(domain) => domain.name,
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamType::String | ParamType::Enum(_) => value.is_string(),
            ParamType::Number => value.is_number(),
            ParamType::Integer => as_whole_number(value).is_some(),
            ParamType::Boolean => value.is_boolean(),
        }
    }
}

// ── Specs and guards ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterSpec {
    pub index: usize,
    pub name: &'static str,
    pub required: bool,
    #[serde(flatten)]
    pub expected: ParamType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_from: Option<usize>,
    pub description: &'static str,
}

/// Extra length rule evaluated after the required-slot checks and before
/// any type check. Each failing guard reports `MissingParameter(missing)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "guard", rename_all = "snake_case")]
pub enum Guard {
    /// Fails when the envelope has exactly `len` entries.
    LengthEquals { len: usize, missing: &'static str },
    /// Fails when slot `present` is supplied but slot `absent` is not.
    PresentWithout {
        present: usize,
        absent: usize,
        missing: &'static str,
    },
}

impl Guard {
    fn violated(&self, request: &RpcRequest) -> Option<&'static str> {
        match *self {
            Guard::LengthEquals { len, missing } => (request.len() == len).then_some(missing),
            Guard::PresentWithout {
                present,
                absent,
                missing,
            } => (request.is_supplied(present) && !request.is_supplied(absent)).then_some(missing),
        }
    }
}

/// Rejected contract declaration. Raised while the registry is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "code", content = "detail")]
pub enum ContractError {
    #[error("duplicate parameter name \"{name}\"")]
    DuplicateName { name: String },
    #[error("required parameter \"{name}\" follows an optional one")]
    RequiredAfterOptional { name: String },
    #[error("parameter \"{name}\" defaults from unknown parameter \"{source_name}\"")]
    UnknownDefaultSource { name: String, source_name: String },
    #[error("parameter \"{name}\" must default from an earlier parameter")]
    DefaultNotEarlier { name: String },
    #[error("guard references slot {index} outside the contract")]
    GuardOutOfRange { index: usize },
    #[error("length guard {len} must lie strictly between the required and total parameter counts")]
    GuardLengthOutOfRange { len: usize },
    #[error("guard reports unknown parameter \"{name}\"")]
    UnknownGuardName { name: String },
}

// ── Contract ────────────────────────────────────────────────────

/// Immutable positional contract for one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contract {
    specs: Vec<ParameterSpec>,
    guards: Vec<Guard>,
}

impl Contract {
    pub fn builder() -> ContractBuilder {
        ContractBuilder::default()
    }

    pub fn specs(&self) -> &[ParameterSpec] {
        &self.specs
    }

    pub fn guards(&self) -> &[Guard] {
        &self.guards
    }

    pub fn spec(&self, name: &str) -> Option<&ParameterSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    /// Check `request` against the contract and backfill defaults. Returns the
    /// normalized envelope, or the first violation in index order.
    pub fn validate(&self, mut request: RpcRequest) -> Result<RpcRequest, RpcError> {
        self.check_lengths(&request)?;
        self.check_types(&request)?;
        self.check_enums(&request)?;
        self.fill_defaults(&mut request);
        Ok(request)
    }

    fn check_lengths(&self, request: &RpcRequest) -> Result<(), RpcError> {
        if let Some(spec) = self
            .specs
            .iter()
            .find(|s| s.required && request.len() <= s.index)
        {
            return Err(RpcError::missing(spec.name));
        }
        match self.guards.iter().find_map(|g| g.violated(request)) {
            Some(missing) => Err(RpcError::missing(missing)),
            None => Ok(()),
        }
    }

    fn check_types(&self, request: &RpcRequest) -> Result<(), RpcError> {
        for spec in &self.specs {
            let Some(value) = request.param(spec.index) else {
                continue;
            };
            if !spec.required && is_falsy(value) {
                continue;
            }
            if !spec.expected.accepts(value) {
                return Err(RpcError::invalid(spec.name, spec.expected.runtime_name()));
            }
        }
        Ok(())
    }

    fn check_enums(&self, request: &RpcRequest) -> Result<(), RpcError> {
        for spec in &self.specs {
            let ParamType::Enum(domain) = &spec.expected else {
                continue;
            };
            // Types already passed, so a supplied value here is a string.
            let Some(Value::String(candidate)) = request.param(spec.index) else {
                continue;
            };
            if !spec.required && candidate.is_empty() {
                continue;
            }
            if !domain.contains(candidate) {
                return Err(RpcError::invalid(spec.name, domain.name));
            }
        }
        Ok(())
    }

    fn fill_defaults(&self, request: &mut RpcRequest) {
        for spec in &self.specs {
            let Some(source) = spec.default_from else {
                continue;
            };
            if request.is_supplied(spec.index) {
                continue;
            }
            let fill = request.param(source).cloned().unwrap_or(Value::Null);
            if request.params.len() <= spec.index {
                request.params.resize(spec.index + 1, Value::Null);
            }
            if let Some(slot) = request.params.get_mut(spec.index) {
                *slot = fill;
            }
        }
    }

    // ── Metadata ────────────────────────────────────────────────

    /// Argument synopsis, e.g. `<name> <type> [publishKey]`.
    pub fn synopsis(&self) -> String {
        self.specs
            .iter()
            .map(|s| {
                if s.required {
                    format!("<{}>", s.name)
                } else {
                    format!("[{}]", s.name)
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// One aligned help line per parameter.
    pub fn param_help(&self) -> String {
        let width = self.specs.iter().map(|s| s.name.len() + 2).max().unwrap_or(0);
        let mut out = String::new();
        for spec in &self.specs {
            let label = if spec.required {
                format!("<{}>", spec.name)
            } else {
                format!("[{}]", spec.name)
            };
            let _ = write!(
                out,
                "    {label:<width$} - {} - {}",
                spec.expected.display_name(),
                spec.description
            );
            if let ParamType::Enum(domain) = &spec.expected {
                let _ = write!(out, " ({})", domain.members.join(" | "));
            }
            if let Some(source) = spec.default_from.and_then(|i| self.specs.get(i)) {
                let _ = write!(out, " Defaults to <{}>.", source.name);
            }
            out.push('\n');
        }
        out
    }
}

// ── Builder ─────────────────────────────────────────────────────

struct PendingSpec {
    name: &'static str,
    required: bool,
    expected: ParamType,
    default_from: Option<&'static str>,
    description: &'static str,
}

/// Declares parameters in positional order; `build` checks the invariants.
#[derive(Default)]
pub struct ContractBuilder {
    pending: Vec<PendingSpec>,
    guards: Vec<Guard>,
}

impl ContractBuilder {
    pub fn required(mut self, name: &'static str, expected: ParamType, description: &'static str) -> Self {
        self.pending.push(PendingSpec {
            name,
            required: true,
            expected,
            default_from: None,
            description,
        });
        self
    }

    pub fn optional(mut self, name: &'static str, expected: ParamType, description: &'static str) -> Self {
        self.pending.push(PendingSpec {
            name,
            required: false,
            expected,
            default_from: None,
            description,
        });
        self
    }

    /// Optional parameter backfilled from the earlier parameter `source`.
    pub fn defaulted(
        mut self,
        name: &'static str,
        expected: ParamType,
        source: &'static str,
        description: &'static str,
    ) -> Self {
        self.pending.push(PendingSpec {
            name,
            required: false,
            expected,
            default_from: Some(source),
            description,
        });
        self
    }

    pub fn guard(mut self, guard: Guard) -> Self {
        self.guards.push(guard);
        self
    }

    pub fn build(self) -> Result<Contract, ContractError> {
        let mut specs: Vec<ParameterSpec> = Vec::with_capacity(self.pending.len());
        let mut seen_optional = false;

        for (index, p) in self.pending.into_iter().enumerate() {
            if specs.iter().any(|s| s.name == p.name) {
                return Err(ContractError::DuplicateName {
                    name: p.name.to_string(),
                });
            }
            if p.required && seen_optional {
                return Err(ContractError::RequiredAfterOptional {
                    name: p.name.to_string(),
                });
            }
            seen_optional |= !p.required;

            let default_from = match p.default_from {
                None => None,
                Some(source) => match specs.iter().find(|s| s.name == source) {
                    Some(s) => Some(s.index),
                    None if p.name == source => {
                        return Err(ContractError::DefaultNotEarlier {
                            name: p.name.to_string(),
                        });
                    }
                    None => {
                        return Err(ContractError::UnknownDefaultSource {
                            name: p.name.to_string(),
                            source_name: source.to_string(),
                        });
                    }
                },
            };

            specs.push(ParameterSpec {
                index,
                name: p.name,
                required: p.required,
                expected: p.expected,
                default_from,
                description: p.description,
            });
        }

        let required_count = specs.iter().filter(|s| s.required).count();
        for guard in &self.guards {
            let (indices, missing) = match *guard {
                Guard::LengthEquals { len, missing } => {
                    // At or below the required count the required-slot check
                    // fires first; at the full length every slot is present.
                    if len <= required_count || len >= specs.len() {
                        return Err(ContractError::GuardLengthOutOfRange { len });
                    }
                    (vec![], missing)
                }
                Guard::PresentWithout {
                    present,
                    absent,
                    missing,
                } => (vec![present, absent], missing),
            };
            if let Some(&index) = indices.iter().find(|&&i| i >= specs.len()) {
                return Err(ContractError::GuardOutOfRange { index });
            }
            if !specs.iter().any(|s| s.name == missing) {
                return Err(ContractError::UnknownGuardName {
                    name: missing.to_string(),
                });
            }
        }

        Ok(Contract {
            specs,
            guards: self.guards,
        })
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::unreachable
)]
mod tests {
    use super::*;
    use crate::model::MarketType;
    use serde_json::json;

    /// Same layout as `market_add`.
    fn market_contract() -> Contract {
        Contract::builder()
            .required("profileId", ParamType::Integer, "Profile id.")
            .required("name", ParamType::String, "Market name.")
            .required("type", ParamType::enumeration::<MarketType>(), "Market type.")
            .required("receiveKey", ParamType::String, "Receive key.")
            .required("receiveAddress", ParamType::String, "Receive address.")
            .defaulted("publishKey", ParamType::String, "receiveKey", "Publish key.")
            .defaulted("publishAddress", ParamType::String, "receiveAddress", "Publish address.")
            .guard(Guard::LengthEquals {
                len: 6,
                missing: "publishAddress",
            })
            .guard(Guard::PresentWithout {
                present: 6,
                absent: 5,
                missing: "publishAddress",
            })
            .build()
            .expect("valid contract")
    }

    fn validate(params: Value) -> Result<Vec<Value>, RpcError> {
        let Value::Array(params) = params else {
            panic!("test params must be an array");
        };
        market_contract()
            .validate(RpcRequest::new(params))
            .map(|r| r.params)
    }

    #[test]
    fn test_defaults_fill_publish_pair() {
        let out = validate(json!([42, "mymarket", "MARKETPLACE", "K1", "A1"])).unwrap();
        assert_eq!(
            Value::Array(out),
            json!([42, "mymarket", "MARKETPLACE", "K1", "A1", "K1", "A1"])
        );
    }

    #[test]
    fn test_explicit_publish_pair_kept() {
        let out = validate(json!([42, "m", "STOREFRONT", "K1", "A1", "K2", "A2"])).unwrap();
        assert_eq!(out[5], json!("K2"));
        assert_eq!(out[6], json!("A2"));
    }

    #[test]
    fn test_null_publish_pair_is_defaulted() {
        let out = validate(json!([42, "m", "MARKETPLACE", "K1", "A1", null, null])).unwrap();
        assert_eq!(out[5], json!("K1"));
        assert_eq!(out[6], json!("A1"));
    }

    #[test]
    fn test_first_missing_required_reported() {
        let names = ["profileId", "name", "type", "receiveKey", "receiveAddress"];
        let full = [json!(42), json!("m"), json!("MARKETPLACE"), json!("K1"), json!("A1")];
        for (len, expected) in names.iter().enumerate() {
            let err = market_contract()
                .validate(RpcRequest::new(full[..len].to_vec()))
                .unwrap_err();
            assert_eq!(err, RpcError::missing(*expected), "len {len}");
        }
    }

    #[test]
    fn test_missing_beats_type_errors() {
        // Wrong type at index 0, but the envelope is also too short.
        let err = validate(json!(["not-a-number", "m"])).unwrap_err();
        assert_eq!(err, RpcError::missing("type"));
    }

    #[test]
    fn test_publish_key_without_address() {
        let err = validate(json!([42, "m", "MARKETPLACE", "K1", "A1", "K2"])).unwrap_err();
        assert_eq!(err, RpcError::missing("publishAddress"));
    }

    #[test]
    fn test_publish_address_without_key() {
        let err = validate(json!([42, "mymarket", "MARKETPLACE", "K1", "A1", null, "A2"])).unwrap_err();
        assert_eq!(err, RpcError::missing("publishAddress"));
    }

    #[test]
    fn test_guard_runs_before_type_check() {
        let err = validate(json!(["x", "m", "MARKETPLACE", "K1", "A1", "K2"])).unwrap_err();
        assert_eq!(err, RpcError::missing("publishAddress"));
    }

    #[test]
    fn test_type_errors_short_circuit_in_index_order() {
        let err = validate(json!(["42", 7, "MARKETPLACE", "K1", "A1"])).unwrap_err();
        assert_eq!(err, RpcError::invalid("profileId", "number"));

        for bad_id in [json!(-1), json!(4.5), json!(-2.0)] {
            let err = validate(json!([bad_id, "m", "MARKETPLACE", "K1", "A1"])).unwrap_err();
            assert_eq!(err, RpcError::invalid("profileId", "number"));
        }
        assert!(validate(json!([42.0, "m", "MARKETPLACE", "K1", "A1"])).is_ok());

        let err = validate(json!([42, 7, 8, "K1", "A1"])).unwrap_err();
        assert_eq!(err, RpcError::invalid("name", "string"));

        let err = validate(json!([42, "m", 8, "K1", "A1"])).unwrap_err();
        assert_eq!(err, RpcError::invalid("type", "string"));
    }

    #[test]
    fn test_required_null_is_a_type_error() {
        let err = validate(json!([42, null, "MARKETPLACE", "K1", "A1"])).unwrap_err();
        assert_eq!(err, RpcError::invalid("name", "string"));
    }

    #[test]
    fn test_optional_type_checked_when_supplied() {
        let err = validate(json!([42, "m", "MARKETPLACE", "K1", "A1", 5, "A2"])).unwrap_err();
        assert_eq!(err, RpcError::invalid("publishKey", "string"));
    }

    #[test]
    fn test_type_errors_reported_before_enum_errors() {
        let err = validate(json!([42, "m", "BOGUS_TYPE", 9, "A1"])).unwrap_err();
        assert_eq!(err, RpcError::invalid("receiveKey", "string"));
    }

    #[test]
    fn test_bogus_enum_names_type_field() {
        let err = validate(json!([42, "mymarket", "BOGUS_TYPE", "K1", "A1"])).unwrap_err();
        assert_eq!(err, RpcError::invalid("type", "MarketType"));
    }

    #[test]
    fn test_enum_is_case_sensitive() {
        let err = validate(json!([42, "m", "marketplace", "K1", "A1"])).unwrap_err();
        assert_eq!(err, RpcError::invalid("type", "MarketType"));
    }

    #[test]
    fn test_every_enum_member_passes() {
        for member in MarketType::member_names() {
            assert!(validate(json!([42, "m", member, "K1", "A1"])).is_ok(), "{member}");
        }
    }

    #[test]
    fn test_validation_is_idempotent() {
        let contract = market_contract();
        let inputs = [
            json!([42, "m", "MARKETPLACE", "K1", "A1"]),
            json!([42, "m", "MARKETPLACE", "K1", "A1", "K2", "A2"]),
            json!([42, "m", "MARKETPLACE", "", "", null, null]),
        ];
        for input in inputs {
            let Value::Array(params) = input else { unreachable!() };
            let once = contract.validate(RpcRequest::new(params)).unwrap();
            let twice = contract.validate(once.clone()).unwrap();
            assert_eq!(
                serde_json::to_string(&once).unwrap(),
                serde_json::to_string(&twice).unwrap()
            );
        }
    }

    #[test]
    fn test_extra_trailing_params_ignored() {
        let out = validate(json!([42, "m", "MARKETPLACE", "K1", "A1", "K2", "A2", "extra"])).unwrap();
        assert_eq!(out.len(), 8);
    }

    #[test]
    fn test_optional_without_default_left_alone() {
        let contract = Contract::builder()
            .optional("profileId", ParamType::Number, "Filter.")
            .build()
            .unwrap();
        assert_eq!(contract.validate(RpcRequest::default()).unwrap().len(), 0);
        assert_eq!(
            contract.validate(RpcRequest::new(vec![json!("x")])).unwrap_err(),
            RpcError::invalid("profileId", "number")
        );
        let out = contract.validate(RpcRequest::new(vec![json!(null)])).unwrap();
        assert_eq!(out.params, vec![json!(null)]);
    }

    #[test]
    fn test_boolean_param() {
        let contract = Contract::builder()
            .required("flag", ParamType::Boolean, "A flag.")
            .build()
            .unwrap();
        assert!(contract.validate(RpcRequest::new(vec![json!(false)])).is_ok());
        assert_eq!(
            contract.validate(RpcRequest::new(vec![json!("true")])).unwrap_err(),
            RpcError::invalid("flag", "boolean")
        );
    }

    #[test]
    fn test_build_rejects_required_after_optional() {
        let err = Contract::builder()
            .optional("a", ParamType::String, "")
            .required("b", ParamType::String, "")
            .build()
            .unwrap_err();
        assert_eq!(err, ContractError::RequiredAfterOptional { name: "b".into() });
    }

    #[test]
    fn test_build_rejects_bad_default_source() {
        let err = Contract::builder()
            .defaulted("a", ParamType::String, "b", "")
            .optional("b", ParamType::String, "")
            .build()
            .unwrap_err();
        assert!(matches!(err, ContractError::UnknownDefaultSource { .. }));

        let err = Contract::builder()
            .defaulted("a", ParamType::String, "a", "")
            .build()
            .unwrap_err();
        assert!(matches!(err, ContractError::DefaultNotEarlier { .. }));
    }

    #[test]
    fn test_build_rejects_bad_guards() {
        let err = Contract::builder()
            .optional("a", ParamType::String, "")
            .guard(Guard::PresentWithout {
                present: 3,
                absent: 0,
                missing: "a",
            })
            .build()
            .unwrap_err();
        assert_eq!(err, ContractError::GuardOutOfRange { index: 3 });

        let err = Contract::builder()
            .optional("a", ParamType::String, "")
            .optional("b", ParamType::String, "")
            .guard(Guard::LengthEquals { len: 1, missing: "zzz" })
            .build()
            .unwrap_err();
        assert!(matches!(err, ContractError::UnknownGuardName { .. }));
    }

    #[test]
    fn test_build_rejects_unreachable_length_guard() {
        let two_required = || {
            Contract::builder()
                .required("a", ParamType::String, "")
                .required("b", ParamType::String, "")
                .optional("c", ParamType::String, "")
                .optional("d", ParamType::String, "")
        };
        for len in [0, 1, 2, 4, 5] {
            let err = two_required()
                .guard(Guard::LengthEquals { len, missing: "d" })
                .build()
                .unwrap_err();
            assert_eq!(err, ContractError::GuardLengthOutOfRange { len });
        }
        let contract = two_required()
            .guard(Guard::LengthEquals { len: 3, missing: "d" })
            .build()
            .unwrap();
        assert_eq!(contract.guards().len(), 1);
    }

    #[test]
    fn test_build_rejects_duplicate_names() {
        let err = Contract::builder()
            .required("a", ParamType::String, "")
            .required("a", ParamType::Number, "")
            .build()
            .unwrap_err();
        assert_eq!(err, ContractError::DuplicateName { name: "a".into() });
    }

    #[test]
    fn test_indices_are_positional() {
        let contract = market_contract();
        for (i, spec) in contract.specs().iter().enumerate() {
            assert_eq!(spec.index, i);
        }
        assert_eq!(contract.spec("publishAddress").unwrap().default_from, Some(4));
    }

    #[test]
    fn test_synopsis_and_help() {
        let contract = market_contract();
        assert_eq!(
            contract.synopsis(),
            "<profileId> <name> <type> <receiveKey> <receiveAddress> [publishKey] [publishAddress]"
        );
        let help = contract.param_help();
        assert!(help.contains("<type>"));
        assert!(help.contains("MarketType"));
        assert!(help.contains("MARKETPLACE | STOREFRONT | STOREFRONT_ADMIN"));
        assert!(help.contains("Defaults to <receiveKey>."));
        assert_eq!(help.lines().count(), 7);
    }

    #[test]
    fn test_contract_serializes_for_catalog() {
        let json = serde_json::to_value(market_contract()).unwrap();
        assert_eq!(json["specs"][2]["type"], "enum");
        assert_eq!(json["specs"][2]["name"], "type");
        assert_eq!(json["specs"][2]["enum"], "MarketType");
        assert_eq!(json["specs"][0]["type"], "integer");
        assert_eq!(json["guards"][0]["guard"], "length_equals");
    }
}
