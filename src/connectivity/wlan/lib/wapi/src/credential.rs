// Copyright 2023 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::{config::AuthConfig, x509::Certificate, Error},
    anyhow::format_err,
    log::info,
    std::collections::HashMap,
    zeroize::Zeroizing,
};

pub const KEYSTORE_SCHEME: &str = "keystore://";

/// Keystore-style lookup of certificate and private key bytes by alias.
pub trait CredentialStore: Send {
    fn fetch(&self, alias: &str) -> Result<Vec<u8>, anyhow::Error>;
}

#[derive(Default)]
pub struct InMemoryCredentialStore {
    entries: HashMap<String, Vec<u8>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, alias: &str, value: Vec<u8>) {
        self.entries.insert(alias.to_string(), value);
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn fetch(&self, alias: &str) -> Result<Vec<u8>, anyhow::Error> {
        self.entries
            .get(alias)
            .cloned()
            .ok_or_else(|| format_err!("no credential stored under alias {:?}", alias))
    }
}

pub fn alias_from_uri(uri: &str) -> Result<&str, Error> {
    match uri.strip_prefix(KEYSTORE_SCHEME) {
        Some(alias) if !alias.is_empty() => Ok(alias),
        _ => Err(Error::UnsupportedCredentialUri(uri.to_string())),
    }
}

fn fetch_uri(store: &dyn CredentialStore, uri: &str) -> Result<Vec<u8>, Error> {
    store.fetch(alias_from_uri(uri)?).map_err(Error::Credential)
}

/// The station's certificate authentication material, fetched once per association.
pub struct Credentials {
    pub as_cert: Certificate,
    pub user_cert: Certificate,
    pub user_key: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("as_cert", &self.as_cert)
            .field("user_cert", &self.user_cert)
            .finish_non_exhaustive()
    }
}

pub fn fetch_credentials(
    store: &dyn CredentialStore,
    auth: &AuthConfig,
) -> Result<Credentials, Error> {
    let (as_cert_uri, user_cert_uri, user_key_uri) = match auth {
        AuthConfig::Certificate { as_cert_uri, user_cert_uri, user_key_uri } => {
            (as_cert_uri, user_cert_uri, user_key_uri)
        }
        AuthConfig::Psk { .. } => return Err(Error::NoCertificateConfig),
    };
    let as_cert = Certificate::parse(&fetch_uri(store, as_cert_uri)?[..])?;
    let user_cert = Certificate::parse(&fetch_uri(store, user_cert_uri)?[..])?;
    let user_key = Zeroizing::new(fetch_uri(store, user_key_uri)?);
    info!("fetched WAPI credentials from {} and {}", as_cert_uri, user_cert_uri);
    Ok(Credentials { as_cert, user_cert, user_key })
}
