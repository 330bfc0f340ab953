// Copyright (c) 2024 HIVE LABS <contact@hivelabs.dev>

use std::{fmt::Display, hash::Hash, str::FromStr};

use hive_signature::{KeyPair, PublicKey, Signature};
use serde::{Deserialize, Serialize};

use crate::NetworkError;

/// Network identity of a node: its public key. Signatures on attributed
/// results verify directly against the sender id, with no extra key
/// distribution step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId {
    public_key: PublicKey,
}

impl PeerId {
    pub fn from_public_key(public_key: PublicKey) -> Self {
        Self { public_key }
    }

    pub fn get_public_key(&self) -> PublicKey {
        self.public_key
    }

    pub fn verify_signature(
        &self,
        data: &[u8],
        signature: &Signature,
    ) -> Result<(), NetworkError> {
        self.public_key
            .verify_signature(data, signature)
            .map_err(|err| NetworkError::GeneralNetworkError(err.to_string()))
    }

    /// Fresh random identity, for tests and local tooling.
    pub fn generate() -> Self {
        Self {
            public_key: KeyPair::generate().get_public_key(),
        }
    }
}

impl FromStr for PeerId {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let public_key = PublicKey::from_str(s)
            .map_err(|err| NetworkError::GeneralNetworkError(err.to_string()))?;
        Ok(Self { public_key })
    }
}

impl Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.public_key.fmt(f)
    }
}

impl ::serde::Serialize for PeerId {
    fn serialize<S: ::serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&self.to_string())
    }
}

impl<'de> ::serde::Deserialize<'de> for PeerId {
    fn deserialize<D: ::serde::Deserializer<'de>>(d: D) -> Result<PeerId, D::Error> {
        struct Base58CheckVisitor;

        impl<'de> ::serde::de::Visitor<'de> for Base58CheckVisitor {
            type Value = PeerId;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("an ASCII base58check string")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: ::serde::de::Error,
            {
                PeerId::from_str(v).map_err(E::custom)
            }
        }
        d.deserialize_str(Base58CheckVisitor)
    }
}

/// Best-effort connectivity hint for a peer that cluster co-members may
/// not already know: its id plus the addresses it listens on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerRecord {
    pub peer_id: PeerId,
    #[serde(default)]
    pub addresses: Vec<String>,
}
