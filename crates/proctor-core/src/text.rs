//! Serde adapter for byte payloads in manifests and snapshots.
//!
//! UTF-8 payloads are written as plain strings. Anything else is written as
//! a `{ base64: ... }` map so it reads back byte for byte.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserializer, Serializer};

const BINARY_KEY: &str = "base64";

pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match std::str::from_utf8(bytes) {
        Ok(s) => serializer.serialize_str(s),
        Err(_) => {
            let mut map = serializer.serialize_map(Some(1))?;
            map.serialize_entry(BINARY_KEY, &STANDARD.encode(bytes))?;
            map.end()
        }
    }
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(PayloadVisitor)
}

struct PayloadVisitor;

impl<'de> Visitor<'de> for PayloadVisitor {
    type Value = Vec<u8>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a string or a map with a `{BINARY_KEY}` key")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Vec<u8>, E> {
        Ok(v.as_bytes().to_vec())
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Vec<u8>, E> {
        Ok(v.into_bytes())
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Vec<u8>, E> {
        Ok(v.to_vec())
    }

    // Unquoted YAML scalars such as `body: 42` keep their source text.
    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Vec<u8>, E> {
        Ok(v.to_string().into_bytes())
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Vec<u8>, E> {
        Ok(v.to_string().into_bytes())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Vec<u8>, E> {
        Ok(v.to_string().into_bytes())
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Vec<u8>, E> {
        Ok(v.to_string().into_bytes())
    }

    fn visit_unit<E: de::Error>(self) -> Result<Vec<u8>, E> {
        Ok(Vec::new())
    }

    fn visit_map<A>(self, mut map: A) -> Result<Vec<u8>, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut bytes = None;
        while let Some(key) = map.next_key::<String>()? {
            if key != BINARY_KEY {
                return Err(de::Error::unknown_field(&key, &[BINARY_KEY]));
            }
            let encoded: String = map.next_value()?;
            bytes = Some(STANDARD.decode(encoded.trim()).map_err(de::Error::custom)?);
        }
        bytes.ok_or_else(|| de::Error::missing_field(BINARY_KEY))
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Holder {
        #[serde(with = "crate::text")]
        body: Vec<u8>,
    }

    #[test]
    fn test_utf8_stays_readable() {
        let yaml = serde_yaml::to_string(&Holder { body: b"hello".to_vec() }).unwrap();
        assert_eq!(yaml, "body: hello\n");
    }

    #[test]
    fn test_binary_survives_yaml() {
        let original = Holder {
            body: vec![0x1f, 0x8b, 0x08, 0xff, 0x00],
        };
        let yaml = serde_yaml::to_string(&original).unwrap();
        assert!(yaml.contains("base64:") && yaml.contains("H4sI/wA="), "{yaml}");
        assert_eq!(serde_yaml::from_str::<Holder>(&yaml).unwrap(), original);
    }

    #[test]
    fn test_scalars_and_bad_maps() {
        let h: Holder = serde_yaml::from_str("body: 42").unwrap();
        assert_eq!(h.body, b"42");

        assert!(serde_yaml::from_str::<Holder>("body: { hex: ff }").is_err());
        assert!(serde_yaml::from_str::<Holder>("body: { base64: '!!' }").is_err());
    }
}
