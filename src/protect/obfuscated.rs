//! Serde field codec for obfuscated fields.
//!
//! Mark a field with `#[serde(with = "json_settings::obfuscated")]`. The value is encoded
//! to JSON, run through the active [`Obfuscator`](super::Obfuscator), and written as a
//! string. Decoding reverses those steps. Any `Serialize + DeserializeOwned` type works,
//! `Option` included.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::with_active;

const NO_ACTIVE_OBFUSCATOR: &str = "no obfuscator active for obfuscated field";

pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Serialize,
    S: Serializer,
{
    use serde::ser::Error as _;

    let plain = serde_json::to_vec(value).map_err(S::Error::custom)?;
    let encoded = with_active(|obfuscator| obfuscator.obfuscate(&plain))
        .ok_or_else(|| S::Error::custom(NO_ACTIVE_OBFUSCATOR))?;
    serializer.serialize_str(&encoded)
}

pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: DeserializeOwned,
    D: Deserializer<'de>,
{
    use serde::de::Error as _;

    let encoded = String::deserialize(deserializer)?;
    let plain = with_active(|obfuscator| obfuscator.deobfuscate(&encoded))
        .ok_or_else(|| D::Error::custom(NO_ACTIVE_OBFUSCATOR))?
        .map_err(D::Error::custom)?;
    serde_json::from_slice(&plain).map_err(D::Error::custom)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde::{Deserialize, Serialize};

    use crate::protect::{KeyedObfuscator, ObfuscationKey, with_obfuscator};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Record {
        name: String,
        #[serde(with = "crate::protect::obfuscated")]
        pin: u32,
        #[serde(with = "crate::protect::obfuscated")]
        note: Option<String>,
    }

    fn record() -> Record {
        Record {
            name: "visible".to_string(),
            pin: 4242,
            note: None,
        }
    }

    fn codec() -> Arc<KeyedObfuscator> {
        Arc::new(KeyedObfuscator::new(ObfuscationKey::from_secret(b"test")))
    }

    #[test]
    fn leaves_unmarked_fields_verbatim() {
        let json = with_obfuscator(codec(), || serde_json::to_value(record())).expect("encode");

        assert_eq!(json["name"], "visible");
        assert!(json["pin"].is_string());
        assert!(json["note"].is_string());
    }

    #[test]
    fn decodes_what_it_encoded() {
        let decoded: Record = with_obfuscator(codec(), || {
            let json = serde_json::to_string(&record())?;
            serde_json::from_str(&json)
        })
        .expect("round trip");

        assert_eq!(decoded, record());
    }

    #[test]
    fn fails_without_active_obfuscator() {
        assert!(serde_json::to_string(&record()).is_err());
    }

    #[test]
    fn surfaces_foreign_key_as_decode_error() {
        let json = with_obfuscator(codec(), || serde_json::to_string(&record())).expect("encode");
        let other = Arc::new(KeyedObfuscator::new(ObfuscationKey::from_secret(b"other")));

        let result: Result<Record, _> = with_obfuscator(other, || serde_json::from_str(&json));

        let err = result.expect_err("foreign key must fail");
        assert!(err.to_string().contains("obfuscation error"));
    }
}
