//! Golden test vectors for resource scope derivation.
//!
//! The access-control network recomputes the scope from the conditions it
//! is shown, so the condition encoding and the scope string must match
//! byte for byte across implementations.

use keypo_core::{AccessCondition, ChainName, ConditionSet, DataIdentifier, ResourceScope};

/// Which condition a vector builds.
#[derive(Debug, Clone)]
pub enum VectorCondition {
    ContractPermission {
        registry: &'static str,
        data_identifier: &'static str,
    },
    BalanceStyle {
        proxy_address: &'static str,
    },
}

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub chain: &'static str,
    pub condition: VectorCondition,
    pub data_to_encrypt_hash: &'static str,
    /// Expected canonical JSON of the condition set.
    pub expected_json: &'static str,
    /// Expected scope string.
    pub expected_scope: &'static str,
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "registry check on baseSepolia",
            chain: "baseSepolia",
            condition: VectorCondition::ContractPermission {
                registry: "0x8a791620dd6260079bf849dc5567adc3f2fdc318",
                data_identifier: "doc-123",
            },
            data_to_encrypt_hash: "0xabc",
            expected_json: concat!(
                r#"[{"contractAddress":"0x8a791620dd6260079bf849dc5567adc3f2fdc318","#,
                r#""functionName":"checkPermission","functionParams":["doc-123",":userAddress"],"#,
                r#""functionAbi":{"inputs":[{"internalType":"string","name":"fileIdentifier","type":"string"},"#,
                r#"{"internalType":"address","name":"requestAddress","type":"address"}],"#,
                r#""name":"checkPermission","outputs":[{"internalType":"bool","name":"","type":"bool"}],"#,
                r#""stateMutability":"view","type":"function"},"chain":"baseSepolia","#,
                r#""returnValueTest":{"comparator":"=","key":"","value":"true"}}]"#,
            ),
            expected_scope:
                "7bf20085b31b8603a919d69dfbb4701fc6fb11e0b3d77207065589afcbfda46a/0xabc",
        },
        GoldenVector {
            name: "proxy check on baseSepolia",
            chain: "baseSepolia",
            condition: VectorCondition::BalanceStyle {
                proxy_address: "0xProxy",
            },
            data_to_encrypt_hash: "0xabc",
            expected_json: concat!(
                r#"[{"contractAddress":"","standardContractType":"","chain":"baseSepolia","#,
                r#""method":"","parameters":[":currentActionIpfsId"],"#,
                r#""returnValueTest":{"comparator":"=","value":"0xProxy"}}]"#,
            ),
            expected_scope:
                "26a650e51085157af79bfca8efacc31f06fee19708732150b9e94c11bb7eb668/0xabc",
        },
        GoldenVector {
            name: "registry check on ethereum",
            chain: "ethereum",
            condition: VectorCondition::ContractPermission {
                registry: "0x8a791620dd6260079bf849dc5567adc3f2fdc318",
                data_identifier: "doc-456",
            },
            data_to_encrypt_hash: "0xdef",
            expected_json: concat!(
                r#"[{"contractAddress":"0x8a791620dd6260079bf849dc5567adc3f2fdc318","#,
                r#""functionName":"checkPermission","functionParams":["doc-456",":userAddress"],"#,
                r#""functionAbi":{"inputs":[{"internalType":"string","name":"fileIdentifier","type":"string"},"#,
                r#"{"internalType":"address","name":"requestAddress","type":"address"}],"#,
                r#""name":"checkPermission","outputs":[{"internalType":"bool","name":"","type":"bool"}],"#,
                r#""stateMutability":"view","type":"function"},"chain":"ethereum","#,
                r#""returnValueTest":{"comparator":"=","key":"","value":"true"}}]"#,
            ),
            expected_scope:
                "5fc62e0c2bce6381c3146befc998a31c8f92e405235ff0035e03b74b09ecd809/0xdef",
        },
    ]
}

/// Build the condition set a vector describes.
pub fn conditions_from_vector(vector: &GoldenVector) -> ConditionSet {
    let chain = ChainName::new(vector.chain).expect("vector chain is non-empty");
    let condition = match &vector.condition {
        VectorCondition::ContractPermission {
            registry,
            data_identifier,
        } => {
            let id = DataIdentifier::new(*data_identifier).expect("vector identifier is non-empty");
            AccessCondition::contract_permission(chain, *registry, &id)
        }
        VectorCondition::BalanceStyle { proxy_address } => {
            AccessCondition::balance_style(chain, *proxy_address)
        }
    }
    .expect("vector condition is valid");
    ConditionSet::single(condition)
}

/// Verify all golden vectors; returns the names of vectors that failed.
pub fn verify_all_vectors() -> Vec<&'static str> {
    all_vectors()
        .into_iter()
        .filter(|vector| {
            let conditions = conditions_from_vector(vector);
            let json = conditions.canonical_json().expect("conditions serialize");
            let scope = ResourceScope::derive(&conditions, vector.data_to_encrypt_hash)
                .expect("vector scope derives");
            json != vector.expected_json.as_bytes() || scope.as_str() != vector.expected_scope
        })
        .map(|vector| vector.name)
        .collect()
}
