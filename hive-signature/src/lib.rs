// Copyright (c) 2024 HIVE LABS <contact@hivelabs.dev>
//! Node identity keys and detached signatures over message bytes

mod error;
mod signature_impl;

pub use error::HiveSignatureError;
pub use signature_impl::{
    KeyPair, PublicKey, Signature, KEYPAIR_SIZE_BYTES, PUBLIC_KEY_SIZE_BYTES, SIGNATURE_SIZE_BYTES,
};
