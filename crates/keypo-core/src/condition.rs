//! On-chain access conditions.
//!
//! A data record is gated by exactly one condition shape:
//!
//! - [`ContractPermission`]: call a registry contract's `checkPermission`
//!   view function with the record identifier and the requesting address,
//!   and expect `true`.
//! - [`BalanceStyle`]: compare a single value from the chain context
//!   (the executing action's IPFS id) against a target.
//!
//! Conditions serialize into the access-control network's wire shapes.
//! Serialization is deterministic (fixed field order), which is what makes
//! [`ResourceScope`](crate::resource::ResourceScope) derivation pure.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::error::{CoreError, Result};
use crate::types::{ChainName, DataIdentifier};

/// Name of the registry's permission check.
pub const CHECK_PERMISSION: &str = "checkPermission";

/// Placeholder the network substitutes with the requesting wallet address.
pub const USER_ADDRESS_PARAM: &str = ":userAddress";

/// Placeholder the network substitutes with the executing action's IPFS id.
pub const CURRENT_ACTION_IPFS_ID_PARAM: &str = ":currentActionIpfsId";

/// Comparison operator in a return-value test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
}

impl Comparator {
    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparator::Eq => "=",
            Comparator::Gt => ">",
            Comparator::Gte => ">=",
            Comparator::Lt => "<",
            Comparator::Lte => "<=",
            Comparator::Contains => "contains",
        }
    }
}

impl Serialize for Comparator {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A contract call that must return an expected boolean.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractPermission {
    pub chain: ChainName,
    pub contract_address: String,
    pub function_name: String,
    pub params: Vec<String>,
    pub expected: bool,
}

/// A single-value comparison against the chain context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceStyle {
    pub chain: ChainName,
    pub comparator: Comparator,
    pub value: String,
}

/// One access condition: exactly one of the two shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessCondition {
    ContractPermission(ContractPermission),
    BalanceStyle(BalanceStyle),
}

/// Which shape a condition has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionKind {
    ContractPermission,
    BalanceStyle,
}

impl AccessCondition {
    /// `registry.checkPermission(data_identifier, :userAddress) == true`.
    pub fn contract_permission(
        chain: ChainName,
        registry_address: impl Into<String>,
        data_identifier: &DataIdentifier,
    ) -> Result<Self> {
        let contract_address = registry_address.into();
        if contract_address.trim().is_empty() {
            return Err(CoreError::EmptyValue("registry address"));
        }
        Ok(AccessCondition::ContractPermission(ContractPermission {
            chain,
            contract_address,
            function_name: CHECK_PERMISSION.to_string(),
            params: vec![
                data_identifier.as_str().to_string(),
                USER_ADDRESS_PARAM.to_string(),
            ],
            expected: true,
        }))
    }

    /// `:currentActionIpfsId == proxy_address`.
    pub fn balance_style(chain: ChainName, proxy_address: impl Into<String>) -> Result<Self> {
        let value = proxy_address.into();
        if value.trim().is_empty() {
            return Err(CoreError::EmptyValue("proxy address"));
        }
        Ok(AccessCondition::BalanceStyle(BalanceStyle {
            chain,
            comparator: Comparator::Eq,
            value,
        }))
    }

    /// The shape of this condition.
    pub fn kind(&self) -> ConditionKind {
        match self {
            AccessCondition::ContractPermission(_) => ConditionKind::ContractPermission,
            AccessCondition::BalanceStyle(_) => ConditionKind::BalanceStyle,
        }
    }

    /// The chain this condition is evaluated on.
    pub fn chain(&self) -> &ChainName {
        match self {
            AccessCondition::ContractPermission(c) => &c.chain,
            AccessCondition::BalanceStyle(c) => &c.chain,
        }
    }
}

impl Serialize for AccessCondition {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            AccessCondition::ContractPermission(c) => {
                let mut st = serializer.serialize_struct("EvmContractCondition", 6)?;
                st.serialize_field("contractAddress", &c.contract_address)?;
                st.serialize_field("functionName", &c.function_name)?;
                st.serialize_field("functionParams", &c.params)?;
                st.serialize_field("functionAbi", &permission_abi(&c.function_name))?;
                st.serialize_field("chain", &c.chain)?;
                st.serialize_field(
                    "returnValueTest",
                    &ReturnValueTest {
                        comparator: Comparator::Eq.as_str(),
                        key: Some(""),
                        value: if c.expected { "true" } else { "false" },
                    },
                )?;
                st.end()
            }
            AccessCondition::BalanceStyle(c) => {
                let mut st = serializer.serialize_struct("AccessControlCondition", 6)?;
                st.serialize_field("contractAddress", "")?;
                st.serialize_field("standardContractType", "")?;
                st.serialize_field("chain", &c.chain)?;
                st.serialize_field("method", "")?;
                st.serialize_field("parameters", &[CURRENT_ACTION_IPFS_ID_PARAM])?;
                st.serialize_field(
                    "returnValueTest",
                    &ReturnValueTest {
                        comparator: c.comparator.as_str(),
                        key: None,
                        value: &c.value,
                    },
                )?;
                st.end()
            }
        }
    }
}

#[derive(Serialize)]
struct ReturnValueTest<'a> {
    comparator: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<&'a str>,
    value: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AbiParam<'a> {
    internal_type: &'a str,
    name: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AbiFunction<'a> {
    inputs: [AbiParam<'a>; 2],
    name: &'a str,
    outputs: [AbiParam<'a>; 1],
    state_mutability: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
}

/// ABI fragment for `function <name>(string fileIdentifier, address requestAddress) view returns (bool)`.
fn permission_abi(function_name: &str) -> AbiFunction<'_> {
    let param = |internal_type: &'static str, name: &'static str| AbiParam {
        internal_type,
        name,
        kind: internal_type,
    };
    AbiFunction {
        inputs: [param("string", "fileIdentifier"), param("address", "requestAddress")],
        name: function_name,
        outputs: [param("bool", "")],
        state_mutability: "view",
        kind: "function",
    }
}

/// The ordered conditions for one authorization attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConditionSet(Vec<AccessCondition>);

impl ConditionSet {
    /// A set holding a single condition.
    pub fn single(condition: AccessCondition) -> Self {
        Self(vec![condition])
    }

    /// Build from a list. Fails if empty.
    pub fn from_conditions(conditions: Vec<AccessCondition>) -> Result<Self> {
        if conditions.is_empty() {
            return Err(CoreError::EmptyConditions);
        }
        Ok(Self(conditions))
    }

    /// The conditions, in order.
    pub fn conditions(&self) -> &[AccessCondition] {
        &self.0
    }

    /// Number of conditions.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The shape shared by every condition, or `None` if shapes are mixed.
    pub fn kind(&self) -> Option<ConditionKind> {
        let first = self.0.first()?.kind();
        self.0.iter().all(|c| c.kind() == first).then_some(first)
    }

    /// Deterministic JSON encoding used for hashing.
    pub fn canonical_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.0)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> DataIdentifier {
        DataIdentifier::new("doc-123").unwrap()
    }

    #[test]
    fn test_contract_permission_wire_shape() {
        let cond =
            AccessCondition::contract_permission(ChainName::default(), "0xRegistry", &doc()).unwrap();
        let value = serde_json::to_value(&cond).unwrap();

        assert_eq!(value["contractAddress"], "0xRegistry");
        assert_eq!(value["functionName"], "checkPermission");
        assert_eq!(value["functionParams"], json!(["doc-123", ":userAddress"]));
        assert_eq!(value["functionAbi"]["name"], "checkPermission");
        assert_eq!(value["functionAbi"]["inputs"][1]["type"], "address");
        assert_eq!(value["chain"], "baseSepolia");
        assert_eq!(value["returnValueTest"]["value"], "true");
        assert_eq!(value["returnValueTest"]["comparator"], "=");
    }

    #[test]
    fn test_balance_style_wire_shape() {
        let cond = AccessCondition::balance_style(ChainName::default(), "0xProxy").unwrap();
        let value = serde_json::to_value(&cond).unwrap();

        assert_eq!(value["contractAddress"], "");
        assert_eq!(value["standardContractType"], "");
        assert_eq!(value["method"], "");
        assert_eq!(value["parameters"], json!([":currentActionIpfsId"]));
        assert_eq!(value["returnValueTest"], json!({"comparator": "=", "value": "0xProxy"}));
    }

    #[test]
    fn test_field_order_is_fixed() {
        let cond =
            AccessCondition::contract_permission(ChainName::default(), "0xRegistry", &doc()).unwrap();
        let text = serde_json::to_string(&cond).unwrap();
        let contract_at = text.find("contractAddress").unwrap();
        let chain_at = text.find("\"chain\"").unwrap();
        assert!(contract_at < chain_at);
    }

    #[test]
    fn test_empty_inputs_rejected() {
        assert!(AccessCondition::contract_permission(ChainName::default(), "", &doc()).is_err());
        assert!(AccessCondition::balance_style(ChainName::default(), " ").is_err());
        assert!(ConditionSet::from_conditions(vec![]).is_err());
    }

    #[test]
    fn test_set_kind() {
        let a = AccessCondition::balance_style(ChainName::default(), "0xProxy").unwrap();
        let b =
            AccessCondition::contract_permission(ChainName::default(), "0xRegistry", &doc()).unwrap();

        assert_eq!(
            ConditionSet::single(a.clone()).kind(),
            Some(ConditionKind::BalanceStyle)
        );
        assert_eq!(ConditionSet::from_conditions(vec![a, b]).unwrap().kind(), None);
    }
}
