//! Serde helpers for byte blobs in exported traces.

/// Byte blobs travel as standard (padded) base64 strings. `null` reads back
/// as an empty blob so that records written by other producers still load.
pub mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        match encoded {
            None => Ok(Vec::new()),
            Some(s) => BASE64
                .decode(s.as_bytes())
                .map_err(|e| serde::de::Error::custom(format!("invalid base64 blob: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Blob {
        #[serde(with = "super::base64_bytes")]
        b: Vec<u8>,
    }

    #[test]
    fn null_and_empty_decode_to_empty() {
        let a: Blob = serde_json::from_str(r#"{"b":null}"#).unwrap();
        let b: Blob = serde_json::from_str(r#"{"b":""}"#).unwrap();
        assert!(a.b.is_empty());
        assert!(b.b.is_empty());
    }

    #[test]
    fn rejects_garbage() {
        let err = serde_json::from_str::<Blob>(r#"{"b":"***"}"#).unwrap_err();
        assert!(err.to_string().contains("invalid base64 blob"));
    }

    #[test]
    fn encodes_standard_alphabet() {
        let json = serde_json::to_string(&Blob {
            b: vec![0xfb, 0xff],
        })
        .unwrap();
        assert_eq!(json, r#"{"b":"+/8="}"#);
    }
}
