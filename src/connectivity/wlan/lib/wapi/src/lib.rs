// Copyright 2023 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Station-side (ASUE) implementation of WAPI, the WLAN Authentication and Privacy
//! Infrastructure of GB 15629.11.
//!
//! The crate covers the WAI message codec, the WAPI information element, the WAI key
//! hierarchy (base key, unicast session keys and multicast session keys) and the
//! [`Supplicant`] state machine which drives certificate or PSK based authentication
//! and key negotiation for a single association.
//!
//! EC operations on the WAPI curve, credential storage and frame transmission are
//! provided by the host through the [`crypto::EcCrypto`], [`credential::CredentialStore`]
//! and [`host::Host`] traits.

pub mod appendable;
pub mod buffer_reader;
pub mod config;
pub mod credential;
pub mod crypto;
pub mod host;
pub mod ie;
pub mod kdf;
pub mod key;
pub mod keywrap;
pub mod mac;
pub mod supplicant;
pub mod update;
pub mod wai;
pub mod x509;

#[cfg(test)]
pub mod test_util;

pub use {
    config::{AuthConfig, Config, KeyType},
    supplicant::{State, Supplicant},
    update::{SecAssocUpdate, UpdateSink},
};

use {
    thiserror::Error,
    wai::{fragment::ReassemblyError, DecodeError, EncodeError, Subtype},
};

#[derive(Debug, Error)]
pub enum Error {
    #[error("error decoding WAI frame: {0}")]
    Decode(#[from] DecodeError),
    #[error("error encoding WAI frame: {0}")]
    Encode(#[from] EncodeError),
    #[error("error reassembling WAI frame: {0}")]
    Reassembly(#[from] ReassemblyError),
    #[error("station is not associated")]
    NotAssociated,
    #[error("unexpected WAI message {0:?} in state {1:?}")]
    UnexpectedMessage(Subtype, State),
    #[error("base key was not established")]
    NoBaseKey,
    #[error("unicast session key was not established")]
    NoUnicastKey,
    #[error("BKID does not match the established base key")]
    BkidMismatch,
    #[error("ADDID does not match the association")]
    AddidMismatch,
    #[error("USKID mismatch; expected {expected}, got {actual}")]
    UskidMismatch { expected: u8, actual: u8 },
    #[error("invalid message authentication code in {0:?}")]
    InvalidMac(Subtype),
    #[error("invalid signature in {0:?}")]
    InvalidSignature(Subtype),
    #[error("{0:?} carried no signature")]
    MissingSignature(Subtype),
    #[error("challenge does not match the locally stored challenge")]
    ChallengeMismatch,
    #[error("authentication identifier does not match the expected one")]
    AuthIdMismatch,
    #[error("stale or replayed key announcement identifier")]
    StaleAnnouncementId,
    #[error("STAKey negotiation is not supported")]
    StakeyNotSupported,
    #[error("certificate verification result rejected: {0}")]
    CertificateCheck(&'static str),
    #[error("access authentication failed with result {0}")]
    AccessDenied(u8),
    #[error("peer WAPI IE does not match the one announced by the AP")]
    IeMismatch,
    #[error("AE requested unsupported ECDH parameters")]
    UnsupportedEcdhParams,
    #[error("no peer certificate; authentication activation was not received")]
    NoPeerCertificate,
    #[error("invalid certificate: {0}")]
    Certificate(#[from] x509::Error),
    #[error("credential store error: {0}")]
    Credential(anyhow::Error),
    #[error("unsupported credential URI: {0}")]
    UnsupportedCredentialUri(String),
    #[error("configuration does not use certificate authentication")]
    NoCertificateConfig,
    #[error("EC operation failed: {0}")]
    Crypto(#[from] crypto::Error),
    #[error("invalid PSK: {0}")]
    InvalidPsk(String),
    #[error("invalid key length: {0}")]
    InvalidKeyLength(usize),
}
