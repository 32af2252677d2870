//! Metadata describing an encrypted record.
//!
//! The remote API returns metadata as a JSON-encoded string. Only two paths
//! matter to authorization: `encryptedData.dataToEncryptHash` and
//! `proxyMetadata.proxyAddress`. They are read as loose views into the
//! document, so any well-formed JSON parses; a missing or unusable hash
//! surfaces later when the scope is derived. Everything else is carried
//! through untouched so it can be forwarded to the decryption API.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Parsed record metadata plus the raw JSON it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct DataMetadata {
    raw: Value,
    data_to_encrypt_hash: Option<String>,
    proxy: Option<ProxyMetadata>,
}

/// `proxyMetadata` block. Present only for proxied records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyMetadata {
    /// Empty when the block carries no usable address.
    pub proxy_address: String,
}

impl DataMetadata {
    /// Parse metadata from its JSON text. Fails only on malformed JSON.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let raw: Value = serde_json::from_str(text)?;
        Ok(Self::from_value(raw))
    }

    /// Build from an already-parsed JSON value.
    pub fn from_value(raw: Value) -> Self {
        let data_to_encrypt_hash = raw
            .pointer("/encryptedData/dataToEncryptHash")
            .and_then(scalar_text)
            .filter(|h| !h.is_empty());
        let proxy = raw
            .get("proxyMetadata")
            .filter(|block| is_truthy(block))
            .map(|block| ProxyMetadata {
                proxy_address: block
                    .get("proxyAddress")
                    .and_then(scalar_text)
                    .unwrap_or_default(),
            });
        Self {
            raw,
            data_to_encrypt_hash,
            proxy,
        }
    }

    /// Hash of the plaintext the ciphertext was produced from.
    pub fn data_to_encrypt_hash(&self) -> Option<&str> {
        self.data_to_encrypt_hash.as_deref()
    }

    /// Proxy block, if the record is proxied. `null`, `false`, `0` and `""`
    /// count as absent.
    pub fn proxy(&self) -> Option<&ProxyMetadata> {
        self.proxy.as_ref()
    }

    /// The full JSON as received.
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

/// Text of a string or number; `None` for anything else.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

impl Serialize for DataMetadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DataMetadata {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_metadata() {
        let meta = DataMetadata::parse(r#"{"encryptedData":{"dataToEncryptHash":"0xabc"}}"#).unwrap();
        assert_eq!(meta.data_to_encrypt_hash(), Some("0xabc"));
        assert!(meta.proxy().is_none());
    }

    #[test]
    fn test_proxy_metadata() {
        let meta = DataMetadata::parse(
            r#"{"encryptedData":{"dataToEncryptHash":"0xabc"},"proxyMetadata":{"proxyAddress":"0xProxy"}}"#,
        )
        .unwrap();
        assert_eq!(meta.proxy().unwrap().proxy_address, "0xProxy");
    }

    #[test]
    fn test_falsy_proxy_is_absent() {
        for block in ["null", "false", "0", r#""""#] {
            let meta = DataMetadata::parse(&format!(r#"{{"proxyMetadata":{block}}}"#)).unwrap();
            assert!(meta.proxy().is_none(), "{block}");
        }
        assert_eq!(
            DataMetadata::parse(r#"{"proxyMetadata":null}"#).unwrap().data_to_encrypt_hash(),
            None
        );
    }

    #[test]
    fn test_proxy_without_address() {
        let meta = DataMetadata::parse(r#"{"proxyMetadata":{}}"#).unwrap();
        assert_eq!(meta.proxy().unwrap().proxy_address, "");
    }

    #[test]
    fn test_unknown_fields_preserved() {
        let text = r#"{"encryptedData":{"dataToEncryptHash":"0xabc","ciphertext":"xyz"},"name":"report.pdf"}"#;
        let meta = DataMetadata::parse(text).unwrap();
        let back = serde_json::to_value(&meta).unwrap();
        assert_eq!(back["name"], "report.pdf");
        assert_eq!(back["encryptedData"]["ciphertext"], "xyz");
    }

    #[test]
    fn test_only_malformed_json_rejected() {
        assert!(DataMetadata::parse("{not json").is_err());
        assert!(DataMetadata::parse("").is_err());

        let array = DataMetadata::parse("[1,2,3]").unwrap();
        assert_eq!(array.data_to_encrypt_hash(), None);
        assert!(array.proxy().is_none());
    }

    #[test]
    fn test_wrongly_shaped_encrypted_data() {
        let meta = DataMetadata::parse(r#"{"encryptedData":"x"}"#).unwrap();
        assert_eq!(meta.data_to_encrypt_hash(), None);
    }

    #[test]
    fn test_numeric_hash_is_text() {
        let meta = DataMetadata::parse(r#"{"encryptedData":{"dataToEncryptHash":123}}"#).unwrap();
        assert_eq!(meta.data_to_encrypt_hash(), Some("123"));
    }

    #[test]
    fn test_empty_hash_is_missing() {
        let meta = DataMetadata::parse(r#"{"encryptedData":{"dataToEncryptHash":""}}"#).unwrap();
        assert_eq!(meta.data_to_encrypt_hash(), None);
    }
}
