// Copyright 2023 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::Error,
    hex::FromHex,
    serde::{Deserialize, Serialize},
    zeroize::Zeroizing,
};

pub const DEFAULT_MAX_MESSAGE_LEN: usize = 32000;
pub const DEFAULT_MAX_FRAGMENT_LEN: usize = 1500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyType {
    Ascii,
    Hex,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    Psk { key_type: KeyType, key: String },
    Certificate { as_cert_uri: String, user_cert_uri: String, user_key_uri: String },
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthConfig::Psk { key_type, .. } => {
                f.debug_struct("Psk").field("key_type", key_type).finish_non_exhaustive()
            }
            AuthConfig::Certificate { as_cert_uri, user_cert_uri, user_key_uri } => f
                .debug_struct("Certificate")
                .field("as_cert_uri", as_cert_uri)
                .field("user_cert_uri", user_cert_uri)
                .field("user_key_uri", user_key_uri)
                .finish(),
        }
    }
}

impl AuthConfig {
    pub fn is_psk(&self) -> bool {
        matches!(self, AuthConfig::Psk { .. })
    }
}

/// Decodes a preshared key into the secret fed to the key derivation function.
pub fn psk_bytes(key_type: KeyType, key: &str) -> Result<Zeroizing<Vec<u8>>, Error> {
    if key.is_empty() {
        return Err(Error::InvalidPsk("empty key".to_string()));
    }
    match key_type {
        KeyType::Ascii => Ok(Zeroizing::new(key.as_bytes().to_vec())),
        KeyType::Hex => Vec::from_hex(key)
            .map(Zeroizing::new)
            .map_err(|e| Error::InvalidPsk(format!("invalid hex key: {}", e))),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub auth: AuthConfig,
    /// Upper bound of an encoded WAI message.
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,
    /// Upper bound of a transmitted WAI fragment, header included.
    #[serde(default = "default_max_fragment_len")]
    pub max_fragment_len: usize,
}

fn default_max_message_len() -> usize {
    DEFAULT_MAX_MESSAGE_LEN
}

fn default_max_fragment_len() -> usize {
    DEFAULT_MAX_FRAGMENT_LEN
}

impl Config {
    pub fn new(auth: AuthConfig) -> Self {
        Self {
            auth,
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
            max_fragment_len: DEFAULT_MAX_FRAGMENT_LEN,
        }
    }
}
