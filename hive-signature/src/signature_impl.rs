// Copyright (c) 2024 HIVE LABS <contact@hivelabs.dev>

use crate::error::HiveSignatureError;
use ed25519_dalek::{Signer, Verifier};
use std::hash::Hasher;
use std::str::FromStr;

/// Size of a public key
pub const PUBLIC_KEY_SIZE_BYTES: usize = ed25519_dalek::PUBLIC_KEY_LENGTH;
/// Size of a keypair secret seed
pub const KEYPAIR_SIZE_BYTES: usize = ed25519_dalek::SECRET_KEY_LENGTH;
/// Size of a signature
pub const SIGNATURE_SIZE_BYTES: usize = ed25519_dalek::SIGNATURE_LENGTH;

/// `KeyPair` is used for signing and identity derivation
#[derive(Debug, Clone)]
pub struct KeyPair(ed25519_dalek::SigningKey);

impl std::fmt::Display for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.to_bs58_check())
    }
}

impl FromStr for KeyPair {
    type Err = HiveSignatureError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyPair::from_bs58_check(s)
    }
}

impl KeyPair {
    /// Generate a new `KeyPair`
    ///
    /// # Example
    /// ```
    /// # use hive_signature::KeyPair;
    /// let keypair = KeyPair::generate();
    /// let signature = keypair.sign(b"Hello World!").unwrap();
    ///
    /// let serialized: String = signature.to_bs58_check();
    /// ```
    pub fn generate() -> KeyPair {
        let mut rng = rand::rngs::OsRng;
        KeyPair(ed25519_dalek::SigningKey::generate(&mut rng))
    }

    /// Returns the `Signature` produced by signing the given bytes
    /// with the secret key.
    ///
    /// # Example
    /// ```
    /// # use hive_signature::KeyPair;
    /// let keypair = KeyPair::generate();
    /// let signature = keypair.sign(b"Hello World!").unwrap();
    /// ```
    pub fn sign(&self, data: &[u8]) -> Result<Signature, HiveSignatureError> {
        Ok(Signature(self.0.try_sign(data)?))
    }

    /// Return the bytes representing the keypair secret seed
    pub fn to_bytes(&self) -> [u8; KEYPAIR_SIZE_BYTES] {
        self.0.to_bytes()
    }

    /// Convert a byte array of size `KEYPAIR_SIZE_BYTES` to a `KeyPair`
    ///
    /// # Example
    /// ```
    /// # use hive_signature::KeyPair;
    /// let keypair = KeyPair::generate();
    /// let bytes = keypair.to_bytes();
    /// let keypair2 = KeyPair::from_bytes(&bytes);
    /// assert_eq!(keypair.get_public_key(), keypair2.get_public_key());
    /// ```
    pub fn from_bytes(data: &[u8; KEYPAIR_SIZE_BYTES]) -> Self {
        KeyPair(ed25519_dalek::SigningKey::from_bytes(data))
    }

    /// Get the public key of the keypair
    ///
    /// # Example
    /// ```
    /// # use hive_signature::KeyPair;
    /// let keypair = KeyPair::generate();
    /// let public_key = keypair.get_public_key();
    /// ```
    pub fn get_public_key(&self) -> PublicKey {
        PublicKey(self.0.verifying_key())
    }

    /// Encode a keypair into its base58check form
    pub fn to_bs58_check(&self) -> String {
        bs58::encode(self.to_bytes()).with_check().into_string()
    }

    /// Decode a base58check encoded keypair
    ///
    /// # Example
    /// ```
    /// # use hive_signature::KeyPair;
    /// let keypair = KeyPair::generate();
    /// let bs58 = keypair.to_bs58_check();
    /// let keypair2 = KeyPair::from_bs58_check(&bs58).unwrap();
    /// ```
    pub fn from_bs58_check(data: &str) -> Result<Self, HiveSignatureError> {
        let decoded = bs58::decode(data)
            .with_check(None)
            .into_vec()
            .map_err(|err| {
                HiveSignatureError::ParsingError(format!(
                    "secret key bs58_check parsing error: {}",
                    err
                ))
            })?;
        let seed: [u8; KEYPAIR_SIZE_BYTES] = decoded.as_slice().try_into().map_err(|_| {
            HiveSignatureError::ParsingError("secret key bytes parsing error: bad length".into())
        })?;
        Ok(KeyPair::from_bytes(&seed))
    }
}

impl ::serde::Serialize for KeyPair {
    /// if the serializer is human readable,
    /// serialization is done using `to_bs58_check`,
    /// else it uses the raw seed bytes
    fn serialize<S: ::serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        if s.is_human_readable() {
            s.collect_str(&self.to_bs58_check())
        } else {
            s.serialize_bytes(&self.to_bytes())
        }
    }
}

impl<'de> ::serde::Deserialize<'de> for KeyPair {
    fn deserialize<D: ::serde::Deserializer<'de>>(d: D) -> Result<KeyPair, D::Error> {
        struct KeyPairVisitor;

        impl<'de> ::serde::de::Visitor<'de> for KeyPairVisitor {
            type Value = KeyPair;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("an ASCII base58check string or raw seed bytes")
            }

            fn visit_bytes<E>(self, v: &[u8]) -> Result<Self::Value, E>
            where
                E: ::serde::de::Error,
            {
                let seed: [u8; KEYPAIR_SIZE_BYTES] = v
                    .try_into()
                    .map_err(|_| E::invalid_length(v.len(), &self))?;
                Ok(KeyPair::from_bytes(&seed))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: ::serde::de::Error,
            {
                KeyPair::from_bs58_check(v).map_err(E::custom)
            }
        }
        if d.is_human_readable() {
            d.deserialize_str(KeyPairVisitor)
        } else {
            d.deserialize_bytes(KeyPairVisitor)
        }
    }
}

/// Public key used to check a `Signature` against its signer identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(ed25519_dalek::VerifyingKey);

impl std::hash::Hash for PublicKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.as_bytes().hash(state);
    }
}

impl PartialOrd for PublicKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PublicKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.as_bytes().cmp(other.0.as_bytes())
    }
}

impl std::fmt::Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.to_bs58_check())
    }
}

impl FromStr for PublicKey {
    type Err = HiveSignatureError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PublicKey::from_bs58_check(s)
    }
}

impl PublicKey {
    /// Checks if the `Signature` associated with data bytes
    /// was produced with the `KeyPair` associated to this `PublicKey`
    ///
    /// # Example
    /// ```
    /// # use hive_signature::KeyPair;
    /// let keypair = KeyPair::generate();
    /// let signature = keypair.sign(b"Hello World!").unwrap();
    ///
    /// let public_key = keypair.get_public_key();
    /// assert!(public_key.verify_signature(b"Hello World!", &signature).is_ok());
    /// ```
    pub fn verify_signature(
        &self,
        data: &[u8],
        signature: &Signature,
    ) -> Result<(), HiveSignatureError> {
        Ok(self.0.verify(data, &signature.0)?)
    }

    /// Return the bytes representing the public key
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_SIZE_BYTES] {
        self.0.to_bytes()
    }

    /// Convert a byte array of size `PUBLIC_KEY_SIZE_BYTES` to a `PublicKey`
    pub fn from_bytes(data: &[u8; PUBLIC_KEY_SIZE_BYTES]) -> Result<Self, HiveSignatureError> {
        ed25519_dalek::VerifyingKey::from_bytes(data)
            .map(Self)
            .map_err(|err| {
                HiveSignatureError::ParsingError(format!("public key bytes parsing error: {}", err))
            })
    }

    /// Encode a public key into its base58check form
    pub fn to_bs58_check(&self) -> String {
        bs58::encode(self.to_bytes()).with_check().into_string()
    }

    /// Decode a base58check encoded public key
    pub fn from_bs58_check(data: &str) -> Result<Self, HiveSignatureError> {
        let decoded = bs58::decode(data)
            .with_check(None)
            .into_vec()
            .map_err(|err| {
                HiveSignatureError::ParsingError(format!(
                    "public key bs58_check parsing error: {}",
                    err
                ))
            })?;
        let bytes: [u8; PUBLIC_KEY_SIZE_BYTES] = decoded.as_slice().try_into().map_err(|_| {
            HiveSignatureError::ParsingError("public key bytes parsing error: bad length".into())
        })?;
        PublicKey::from_bytes(&bytes)
    }
}

impl ::serde::Serialize for PublicKey {
    fn serialize<S: ::serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        if s.is_human_readable() {
            s.collect_str(&self.to_bs58_check())
        } else {
            s.serialize_bytes(&self.to_bytes())
        }
    }
}

impl<'de> ::serde::Deserialize<'de> for PublicKey {
    fn deserialize<D: ::serde::Deserializer<'de>>(d: D) -> Result<PublicKey, D::Error> {
        struct PublicKeyVisitor;

        impl<'de> ::serde::de::Visitor<'de> for PublicKeyVisitor {
            type Value = PublicKey;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("an ASCII base58check string or raw public key bytes")
            }

            fn visit_bytes<E>(self, v: &[u8]) -> Result<Self::Value, E>
            where
                E: ::serde::de::Error,
            {
                let bytes: [u8; PUBLIC_KEY_SIZE_BYTES] = v
                    .try_into()
                    .map_err(|_| E::invalid_length(v.len(), &self))?;
                PublicKey::from_bytes(&bytes).map_err(E::custom)
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: ::serde::de::Error,
            {
                PublicKey::from_bs58_check(v).map_err(E::custom)
            }
        }
        if d.is_human_readable() {
            d.deserialize_str(PublicKeyVisitor)
        } else {
            d.deserialize_bytes(PublicKeyVisitor)
        }
    }
}

/// Detached signature over message bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature(ed25519_dalek::Signature);

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.to_bs58_check())
    }
}

impl FromStr for Signature {
    type Err = HiveSignatureError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Signature::from_bs58_check(s)
    }
}

impl Signature {
    /// Return the bytes representing the signature
    pub fn to_bytes(&self) -> [u8; SIGNATURE_SIZE_BYTES] {
        self.0.to_bytes()
    }

    /// Convert a byte array of size `SIGNATURE_SIZE_BYTES` to a `Signature`
    pub fn from_bytes(data: &[u8; SIGNATURE_SIZE_BYTES]) -> Self {
        Signature(ed25519_dalek::Signature::from_bytes(data))
    }

    /// Encode a signature into its base58check form
    ///
    /// # Example
    /// ```
    /// # use hive_signature::KeyPair;
    /// let keypair = KeyPair::generate();
    /// let signature = keypair.sign(b"Hello World!").unwrap();
    /// let serialized: String = signature.to_bs58_check();
    /// ```
    pub fn to_bs58_check(&self) -> String {
        bs58::encode(self.to_bytes()).with_check().into_string()
    }

    /// Decode a base58check encoded signature
    ///
    /// # Example
    /// ```
    /// # use hive_signature::{KeyPair, Signature};
    /// let keypair = KeyPair::generate();
    /// let signature = keypair.sign(b"Hello World!").unwrap();
    /// let serialized: String = signature.to_bs58_check();
    /// let deserialized: Signature = Signature::from_bs58_check(&serialized).unwrap();
    /// assert_eq!(signature, deserialized);
    /// ```
    pub fn from_bs58_check(data: &str) -> Result<Self, HiveSignatureError> {
        let decoded = bs58::decode(data)
            .with_check(None)
            .into_vec()
            .map_err(|err| {
                HiveSignatureError::ParsingError(format!(
                    "signature bs58_check parsing error: {}",
                    err
                ))
            })?;
        let bytes: [u8; SIGNATURE_SIZE_BYTES] = decoded.as_slice().try_into().map_err(|_| {
            HiveSignatureError::ParsingError("signature bytes parsing error: bad length".into())
        })?;
        Ok(Signature::from_bytes(&bytes))
    }
}

impl ::serde::Serialize for Signature {
    fn serialize<S: ::serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        if s.is_human_readable() {
            s.collect_str(&self.to_bs58_check())
        } else {
            s.serialize_bytes(&self.to_bytes())
        }
    }
}

impl<'de> ::serde::Deserialize<'de> for Signature {
    fn deserialize<D: ::serde::Deserializer<'de>>(d: D) -> Result<Signature, D::Error> {
        struct SignatureVisitor;

        impl<'de> ::serde::de::Visitor<'de> for SignatureVisitor {
            type Value = Signature;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("an ASCII base58check string or raw signature bytes")
            }

            fn visit_bytes<E>(self, v: &[u8]) -> Result<Self::Value, E>
            where
                E: ::serde::de::Error,
            {
                let bytes: [u8; SIGNATURE_SIZE_BYTES] = v
                    .try_into()
                    .map_err(|_| E::invalid_length(v.len(), &self))?;
                Ok(Signature::from_bytes(&bytes))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: ::serde::de::Error,
            {
                Signature::from_bs58_check(v).map_err(E::custom)
            }
        }
        if d.is_human_readable() {
            d.deserialize_str(SignatureVisitor)
        } else {
            d.deserialize_bytes(SignatureVisitor)
        }
    }
}
