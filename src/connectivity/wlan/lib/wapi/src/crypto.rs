// Copyright 2023 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Hashing primitives and the elliptic curve capability used by certificate
//! authentication.

use {
    hmac::{Hmac, Mac},
    sha2::{Digest, Sha256},
    thiserror::Error,
    zeroize::Zeroizing,
};

/// Length of r‖s of a signature on the 192-bit WAPI curve.
pub const SIGNATURE_LEN: usize = 48;
pub const DIGEST_LEN: usize = 32;

pub type Signature = [u8; SIGNATURE_LEN];
pub type Digest256 = [u8; DIGEST_LEN];

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum Error {
    #[error("invalid key length: {0}")]
    InvalidKeyLength(usize),
    #[error("invalid EC public key")]
    InvalidPublicKey,
    #[error("invalid EC private key")]
    InvalidPrivateKey,
    #[error("EC operation failed: {0}")]
    Ec(String),
}

/// An EC key pair on the WAPI curve. The public key is an uncompressed point.
pub struct KeyPair {
    pub private_key: Zeroizing<Vec<u8>>,
    pub public_key: Vec<u8>,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair").field("public_key", &hex::encode(&self.public_key)).finish()
    }
}

/// EC operations on the 192-bit prime curve of GB 15629.11, OID 1.2.156.11235.1.1.2.1.
pub trait EcCrypto: Send {
    fn generate_key_pair(&self) -> Result<KeyPair, Error>;

    /// Returns the x-coordinate of the shared point.
    fn ecdh(&self, private_key: &[u8], peer_public_key: &[u8]) -> Result<Vec<u8>, Error>;

    /// Signs a SHA-256 digest, returning r‖s, each zero-padded to 24 bytes.
    fn sign(&self, private_key: &[u8], digest: &Digest256) -> Result<Signature, Error>;

    fn verify(&self, public_key: &[u8], digest: &Digest256, signature: &Signature) -> bool;
}

pub fn sha256(data: &[u8]) -> Digest256 {
    Sha256::digest(data).into()
}

pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Digest256, Error> {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(key)
        .map_err(|_| Error::InvalidKeyLength(key.len()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().into())
}

/// Checks `tag` against the leftmost bytes of HMAC-SHA256(key, data) in constant time.
pub fn verify_truncated_hmac_sha256(key: &[u8], data: &[u8], tag: &[u8]) -> Result<bool, Error> {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(key)
        .map_err(|_| Error::InvalidKeyLength(key.len()))?;
    mac.update(data);
    Ok(mac.verify_truncated_left(tag).is_ok())
}
