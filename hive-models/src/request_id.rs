// Copyright (c) 2024 HIVE LABS <contact@hivelabs.dev>

use crate::error::ModelsError;
use std::fmt;
use std::str::FromStr;

const REQUEST_ID_PREFIX: &str = "req";
const REQUEST_ID_RAW_BYTES: usize = 16;

/// Globally unique identifier of one execution request.
///
/// Assigned by the head at the point it accepts the request from its
/// caller; every correlated message (roll call, cluster formation, work
/// order, responses) carries it, and it is the join key for every
/// rendezvous lookup. The inner string is the wire form: collision odds
/// for 16 random bytes are negligible.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(String);

impl RequestId {
    /// Draws a fresh random id.
    pub fn generate() -> Self {
        let raw: [u8; REQUEST_ID_RAW_BYTES] = rand::random();
        RequestId(format!(
            "{}{}",
            REQUEST_ID_PREFIX,
            bs58::encode(raw).with_check().into_string()
        ))
    }

    /// An id carried by an inbound message may be absent; protocol
    /// handlers treat that as an internal consistency violation.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        RequestId(String::new())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = ModelsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.starts_with(REQUEST_ID_PREFIX) {
            return Err(ModelsError::InvalidRequestId(s.to_string()));
        }
        bs58::decode(&s[REQUEST_ID_PREFIX.len()..])
            .with_check(None)
            .into_vec()
            .map_err(|_| ModelsError::InvalidRequestId(s.to_string()))?;
        Ok(RequestId(s.to_string()))
    }
}

impl ::serde::Serialize for RequestId {
    fn serialize<S: ::serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&self.0)
    }
}

impl<'de> ::serde::Deserialize<'de> for RequestId {
    /// Deserialization is permissive on purpose: inbound messages may
    /// carry an empty or foreign-formatted id, and the handlers decide
    /// what that means for the protocol.
    fn deserialize<D: ::serde::Deserializer<'de>>(d: D) -> Result<RequestId, D::Error> {
        let s = String::deserialize(d)?;
        Ok(RequestId(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_roundtrip() {
        let id = RequestId::generate();
        assert!(!id.is_empty());
        let parsed = RequestId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        assert_ne!(RequestId::generate(), RequestId::generate());
    }

    #[test]
    fn test_from_str_rejects_garbage() {
        assert!(RequestId::from_str("").is_err());
        assert!(RequestId::from_str("not-a-request-id").is_err());
    }

    #[test]
    fn test_deserialize_keeps_empty_id_for_handlers() {
        let id: RequestId = serde_json::from_str("\"\"").unwrap();
        assert!(id.is_empty());
    }
}
