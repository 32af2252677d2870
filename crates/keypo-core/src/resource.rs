//! Resource scopes and resource/ability requests.
//!
//! A resource scope binds a condition set to one ciphertext:
//!
//! ```text
//! hex(sha256(json(conditions))) "/" dataToEncryptHash
//! ```
//!
//! Session credentials are requested for a list of (resource, ability)
//! pairs; the decryption ability is always scoped by a resource scope.

use serde::{Serialize, Serializer};
use std::fmt;

use crate::condition::ConditionSet;
use crate::crypto::Sha256Hash;
use crate::error::{CoreError, Result};

/// Wildcard resource key.
pub const WILDCARD: &str = "*";

/// Deterministic identifier for (condition set, ciphertext hash).
#[derive(Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ResourceScope(String);

impl ResourceScope {
    /// Derive the scope for `conditions` guarding the ciphertext `data_to_encrypt_hash`.
    pub fn derive(conditions: &ConditionSet, data_to_encrypt_hash: &str) -> Result<Self> {
        if conditions.is_empty() {
            return Err(CoreError::EmptyConditions);
        }
        if data_to_encrypt_hash.trim().is_empty() {
            return Err(CoreError::EmptyValue("dataToEncryptHash"));
        }
        let conditions_hash = Self::hash_conditions(conditions)?;
        Ok(Self(format!(
            "{}/{}",
            conditions_hash.to_hex(),
            data_to_encrypt_hash
        )))
    }

    /// SHA-256 over the canonical JSON of the condition set.
    pub fn hash_conditions(conditions: &ConditionSet) -> Result<Sha256Hash> {
        Ok(Sha256Hash::hash(&conditions.canonical_json()?))
    }

    /// The scope string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ResourceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceScope({})", self.0)
    }
}

impl fmt::Display for ResourceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A resource on the access-control network.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LitResource {
    /// Content gated by an access-control condition scope.
    AccessControlCondition(String),
    /// An executable action, by IPFS id or wildcard.
    LitAction(String),
}

impl LitResource {
    /// Decryption resource for a scope.
    pub fn for_scope(scope: &ResourceScope) -> Self {
        LitResource::AccessControlCondition(scope.as_str().to_string())
    }

    /// Every action.
    pub fn any_action() -> Self {
        LitResource::LitAction(WILDCARD.to_string())
    }

    /// URI scheme prefix.
    pub fn prefix(&self) -> &'static str {
        match self {
            LitResource::AccessControlCondition(_) => "lit-accesscontrolcondition",
            LitResource::LitAction(_) => "lit-litaction",
        }
    }

    /// The resource key (scope string, IPFS id, or `*`).
    pub fn key(&self) -> &str {
        match self {
            LitResource::AccessControlCondition(k) | LitResource::LitAction(k) => k,
        }
    }

    /// Full URI, e.g. `lit-litaction://*`.
    pub fn uri(&self) -> String {
        format!("{}://{}", self.prefix(), self.key())
    }

    /// Whether this resource covers `other` (equal, or wildcard of the same kind).
    pub fn covers(&self, other: &LitResource) -> bool {
        self.prefix() == other.prefix() && (self.key() == WILDCARD || self.key() == other.key())
    }
}

impl Serialize for LitResource {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut st = serializer.serialize_struct("LitResource", 2)?;
        st.serialize_field("resource", self.key())?;
        st.serialize_field("resourcePrefix", self.prefix())?;
        st.end()
    }
}

/// A capability on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LitAbility {
    #[serde(rename = "access-control-condition-decryption")]
    AccessControlConditionDecryption,
    #[serde(rename = "lit-action-execution")]
    LitActionExecution,
}

impl LitAbility {
    /// ReCap `(namespace, name)` for this ability.
    pub fn recap(&self) -> (&'static str, &'static str) {
        match self {
            LitAbility::AccessControlConditionDecryption => ("Threshold", "Decryption"),
            LitAbility::LitActionExecution => ("Threshold", "Execution"),
        }
    }

    /// Whether this ability may be exercised on `resource`.
    pub fn applies_to(&self, resource: &LitResource) -> bool {
        matches!(
            (self, resource),
            (
                LitAbility::AccessControlConditionDecryption,
                LitResource::AccessControlCondition(_)
            ) | (LitAbility::LitActionExecution, LitResource::LitAction(_))
        )
    }
}

/// A (resource, ability) pair requested for a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResourceAbilityRequest {
    pub resource: LitResource,
    pub ability: LitAbility,
}

impl ResourceAbilityRequest {
    /// Create a request. Fails if the ability does not apply to the resource kind.
    pub fn new(resource: LitResource, ability: LitAbility) -> Result<Self> {
        if !ability.applies_to(&resource) {
            return Err(CoreError::AbilityMismatch(format!(
                "{:?} on {}",
                ability,
                resource.uri()
            )));
        }
        Ok(Self { resource, ability })
    }

    /// Action execution on every action.
    pub fn execute_any_action() -> Self {
        Self {
            resource: LitResource::any_action(),
            ability: LitAbility::LitActionExecution,
        }
    }

    /// Decryption of the ciphertext bound by `scope`.
    pub fn decrypt(scope: &ResourceScope) -> Self {
        Self {
            resource: LitResource::for_scope(scope),
            ability: LitAbility::AccessControlConditionDecryption,
        }
    }
}

/// The two abilities a decrypting session needs: action execution and
/// decryption gated by `scope`.
pub fn decryption_session_resources(scope: &ResourceScope) -> Vec<ResourceAbilityRequest> {
    vec![
        ResourceAbilityRequest::execute_any_action(),
        ResourceAbilityRequest::decrypt(scope),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::AccessCondition;
    use crate::types::{ChainName, DataIdentifier};
    use proptest::prelude::*;

    fn contract_set(id: &str) -> ConditionSet {
        let id = DataIdentifier::new(id).unwrap();
        ConditionSet::single(
            AccessCondition::contract_permission(ChainName::default(), "0xRegistry", &id).unwrap(),
        )
    }

    #[test]
    fn test_scope_format() {
        let scope = ResourceScope::derive(&contract_set("doc-123"), "0xabc").unwrap();
        let (hash, tail) = scope.as_str().split_once('/').unwrap();
        assert_eq!(hash.len(), 64);
        assert_eq!(tail, "0xabc");
    }

    #[test]
    fn test_scope_depends_on_conditions() {
        let a = ResourceScope::derive(&contract_set("doc-1"), "0xabc").unwrap();
        let b = ResourceScope::derive(&contract_set("doc-2"), "0xabc").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_scope_requires_hash() {
        assert!(ResourceScope::derive(&contract_set("doc-1"), "").is_err());
    }

    #[test]
    fn test_resource_uri_and_cover() {
        let any = LitResource::any_action();
        assert_eq!(any.uri(), "lit-litaction://*");
        assert!(any.covers(&LitResource::LitAction("QmHash".into())));
        assert!(!any.covers(&LitResource::AccessControlCondition("x/y".into())));
    }

    #[test]
    fn test_ability_mismatch_rejected() {
        assert!(ResourceAbilityRequest::new(
            LitResource::any_action(),
            LitAbility::AccessControlConditionDecryption
        )
        .is_err());
    }

    #[test]
    fn test_request_serialization() {
        let req = ResourceAbilityRequest::execute_any_action();
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["resource"]["resource"], "*");
        assert_eq!(value["resource"]["resourcePrefix"], "lit-litaction");
        assert_eq!(value["ability"], "lit-action-execution");
    }

    proptest! {
        #[test]
        fn scope_is_deterministic(id in "[a-z][a-z0-9-]{0,31}", hash in "0x[0-9a-f]{1,64}") {
            let a = ResourceScope::derive(&contract_set(&id), &hash).unwrap();
            let b = ResourceScope::derive(&contract_set(&id), &hash).unwrap();
            prop_assert_eq!(a, b);
        }
    }
}
