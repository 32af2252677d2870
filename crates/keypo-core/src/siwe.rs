//! Sign-In With Ethereum (EIP-4361) messages with ReCap capabilities.
//!
//! The resource/ability list is embedded twice: as a `urn:recap:` resource
//! (base64url JSON) and as a human-readable suffix on the statement, so the
//! wallet shows the user what is being authorized.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{CoreError, Result};
use crate::resource::ResourceAbilityRequest;
use crate::types::EvmAddress;

/// SIWE message version.
pub const SIWE_VERSION: &str = "1";

/// Prefix of a ReCap resource URI.
pub const RECAP_URN_PREFIX: &str = "urn:recap:";

const RECAP_STATEMENT_PREFIX: &str =
    "I further authorize the stated URI to perform the following actions on my behalf:";

/// Format a timestamp the way SIWE fields carry it.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an RFC 3339 / ISO-8601 timestamp.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CoreError::InvalidTimestamp(format!("{s}: {e}")))
}

/// An EIP-4361 message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiweMessage {
    pub domain: String,
    pub address: EvmAddress,
    pub statement: Option<String>,
    pub uri: String,
    pub chain_id: u64,
    pub nonce: String,
    pub issued_at: DateTime<Utc>,
    pub expiration_time: Option<DateTime<Utc>>,
    pub resources: Vec<String>,
}

impl SiweMessage {
    /// Start a message for `address` at `uri` with `nonce`.
    pub fn new(
        domain: impl Into<String>,
        address: EvmAddress,
        uri: impl Into<String>,
        chain_id: u64,
        nonce: impl Into<String>,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            domain: domain.into(),
            address,
            statement: None,
            uri: uri.into(),
            chain_id,
            nonce: nonce.into(),
            issued_at,
            expiration_time: None,
            resources: Vec::new(),
        }
    }

    /// Set the expiration time.
    pub fn expires_at(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration_time = Some(expiration);
        self
    }

    /// Set the base statement.
    pub fn statement(mut self, statement: impl Into<String>) -> Self {
        self.statement = Some(statement.into());
        self
    }

    /// Attach a ReCap covering `requests`: appends the recap URN to the
    /// resources and the readable summary to the statement.
    pub fn with_recaps(mut self, requests: &[ResourceAbilityRequest]) -> Result<Self> {
        let recap = Recap::from_requests(requests);
        let summary = recap.statement();

        self.statement = Some(match self.statement.take() {
            Some(base) if !base.is_empty() => format!("{base} {summary}"),
            _ => summary,
        });
        self.resources.push(recap.to_urn()?);
        Ok(self)
    }

    /// The exact text the wallet signs.
    pub fn to_message(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SiweMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} wants you to sign in with your Ethereum account:",
            self.domain
        )?;
        writeln!(f, "{}", self.address.to_checksum())?;
        writeln!(f)?;
        if let Some(statement) = &self.statement {
            writeln!(f, "{statement}")?;
            writeln!(f)?;
        }
        writeln!(f, "URI: {}", self.uri)?;
        writeln!(f, "Version: {SIWE_VERSION}")?;
        writeln!(f, "Chain ID: {}", self.chain_id)?;
        writeln!(f, "Nonce: {}", self.nonce)?;
        write!(f, "Issued At: {}", format_timestamp(&self.issued_at))?;
        if let Some(expiration) = &self.expiration_time {
            write!(f, "\nExpiration Time: {}", format_timestamp(expiration))?;
        }
        if !self.resources.is_empty() {
            write!(f, "\nResources:")?;
            for resource in &self.resources {
                write!(f, "\n- {resource}")?;
            }
        }
        Ok(())
    }
}

/// A capability object: resource URI → `"namespace/name"` → caveats.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Recap {
    attenuations: BTreeMap<String, BTreeMap<String, Vec<Value>>>,
}

impl Recap {
    /// Build from resource/ability requests.
    pub fn from_requests(requests: &[ResourceAbilityRequest]) -> Self {
        let mut attenuations: BTreeMap<String, BTreeMap<String, Vec<Value>>> = BTreeMap::new();
        for request in requests {
            let (namespace, name) = request.ability.recap();
            attenuations
                .entry(request.resource.uri())
                .or_default()
                .insert(format!("{namespace}/{name}"), vec![Value::Object(Map::new())]);
        }
        Self { attenuations }
    }

    /// Whether `uri` is granted `namespace/name`.
    pub fn grants(&self, uri: &str, ability: &str) -> bool {
        self.attenuations
            .get(uri)
            .is_some_and(|abilities| abilities.contains_key(ability))
    }

    /// Resource URIs in the recap.
    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.attenuations.keys().map(String::as_str)
    }

    /// `urn:recap:<base64url(json)>`.
    pub fn to_urn(&self) -> Result<String> {
        let body = json!({ "att": self.attenuations, "prf": [] });
        let bytes = serde_json::to_vec(&body)?;
        Ok(format!("{RECAP_URN_PREFIX}{}", URL_SAFE_NO_PAD.encode(bytes)))
    }

    /// Decode a `urn:recap:` resource.
    pub fn from_urn(urn: &str) -> Result<Self> {
        let encoded = urn
            .strip_prefix(RECAP_URN_PREFIX)
            .ok_or_else(|| CoreError::InvalidRecap(format!("not a recap urn: {urn}")))?;
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| CoreError::InvalidRecap(format!("base64: {e}")))?;
        let body: Value = serde_json::from_slice(&bytes)?;
        let attenuations = serde_json::from_value(body["att"].clone())?;
        Ok(Self { attenuations })
    }

    /// Readable summary appended to the SIWE statement.
    pub fn statement(&self) -> String {
        let mut out = String::from(RECAP_STATEMENT_PREFIX);
        let mut n = 0;
        for (resource, abilities) in &self.attenuations {
            for ability in abilities.keys() {
                n += 1;
                let (namespace, name) = ability.split_once('/').unwrap_or((ability.as_str(), ""));
                out.push_str(&format!(" ({n}) '{namespace}': '{name}' for '{resource}'."));
            }
        }
        out
    }
}

/// Fields recovered from a signed SIWE message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSiwe {
    pub address: EvmAddress,
    pub uri: String,
    pub nonce: String,
    pub expiration_time: Option<DateTime<Utc>>,
    pub resources: Vec<String>,
}

impl ParsedSiwe {
    /// Parse the fields the network checks from a message text.
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines();
        lines.next(); // "<domain> wants you to sign in ..."
        let address_line = lines
            .next()
            .ok_or_else(|| CoreError::InvalidAddress("missing address line".into()))?;
        let address = EvmAddress::from_hex(address_line.trim())?;

        let mut uri = None;
        let mut nonce = None;
        let mut expiration_time = None;
        let mut resources = Vec::new();
        let mut in_resources = false;

        for line in lines {
            if in_resources {
                if let Some(resource) = line.strip_prefix("- ") {
                    resources.push(resource.to_string());
                    continue;
                }
                in_resources = false;
            }
            if let Some(v) = line.strip_prefix("URI: ") {
                uri = Some(v.to_string());
            } else if let Some(v) = line.strip_prefix("Nonce: ") {
                nonce = Some(v.to_string());
            } else if let Some(v) = line.strip_prefix("Expiration Time: ") {
                expiration_time = Some(parse_timestamp(v)?);
            } else if line == "Resources:" {
                in_resources = true;
            }
        }

        Ok(Self {
            address,
            uri: uri.ok_or(CoreError::EmptyValue("URI"))?,
            nonce: nonce.ok_or(CoreError::EmptyValue("Nonce"))?,
            expiration_time,
            resources,
        })
    }

    /// The embedded recap, if any.
    pub fn recap(&self) -> Result<Option<Recap>> {
        self.resources
            .iter()
            .find(|r| r.starts_with(RECAP_URN_PREFIX))
            .map(|r| Recap::from_urn(r))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{ResourceAbilityRequest, ResourceScope};
    use chrono::TimeZone;

    fn address() -> EvmAddress {
        EvmAddress::from_hex("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap()
    }

    fn issued() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_plain_message_layout() {
        let msg = SiweMessage::new("localhost", address(), "https://www.keypo.io", 1, "0xblock", issued())
            .expires_at(issued() + chrono::Duration::hours(24));
        let text = msg.to_message();

        let expected = "localhost wants you to sign in with your Ethereum account:\n\
            0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed\n\
            \n\
            URI: https://www.keypo.io\n\
            Version: 1\n\
            Chain ID: 1\n\
            Nonce: 0xblock\n\
            Issued At: 2026-10-19T12:00:00.000Z\n\
            Expiration Time: 2026-10-20T12:00:00.000Z";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_recap_roundtrip_through_text() {
        let scope = ResourceScope::derive(
            &crate::condition::ConditionSet::single(
                crate::condition::AccessCondition::balance_style(Default::default(), "0xProxy").unwrap(),
            ),
            "0xabc",
        )
        .unwrap();
        let requests = vec![
            ResourceAbilityRequest::execute_any_action(),
            ResourceAbilityRequest::decrypt(&scope),
        ];

        let msg = SiweMessage::new("localhost", address(), "lit:session:abc", 1, "0xblock", issued())
            .expires_at(issued() + chrono::Duration::minutes(10))
            .with_recaps(&requests)
            .unwrap();
        let text = msg.to_message();
        assert!(text.contains("'Threshold': 'Execution' for 'lit-litaction://*'"));

        let parsed = ParsedSiwe::parse(&text).unwrap();
        assert_eq!(parsed.address, address());
        assert_eq!(parsed.nonce, "0xblock");
        assert_eq!(parsed.uri, "lit:session:abc");
        assert_eq!(parsed.expiration_time, msg.expiration_time);

        let recap = parsed.recap().unwrap().unwrap();
        assert!(recap.grants("lit-litaction://*", "Threshold/Execution"));
        assert!(recap.grants(
            &format!("lit-accesscontrolcondition://{}", scope),
            "Threshold/Decryption"
        ));
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("tomorrow").is_err());
        assert!(parse_timestamp("2026-10-20T12:00:00Z").is_ok());
    }
}
