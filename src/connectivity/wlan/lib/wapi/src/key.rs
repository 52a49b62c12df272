// Copyright 2023 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The WAI key hierarchy: base key, unicast session keys and multicast session keys.

use {
    crate::{
        config::{psk_bytes, KeyType},
        crypto::sha256,
        kdf::{self, kdf},
        mac::{AddId, MacAddr},
        Error,
    },
    std::fmt,
    zeroize::{Zeroize, ZeroizeOnDrop},
};

pub const KEY_LEN: usize = 16;
pub const CHALLENGE_LEN: usize = 32;
pub const BKID_LEN: usize = 16;

pub type Challenge = [u8; CHALLENGE_LEN];
pub type Bkid = [u8; BKID_LEN];

#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct BaseKey([u8; KEY_LEN]);

impl fmt::Debug for BaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BaseKey(..)")
    }
}

impl BaseKey {
    pub fn new(key: [u8; KEY_LEN]) -> Self {
        Self(key)
    }

    pub fn from_psk(key_type: KeyType, key: &str) -> Result<Self, Error> {
        let psk = psk_bytes(key_type, key)?;
        let out = kdf(kdf::PSK_LABEL, &psk[..], KEY_LEN)?;
        let mut bk = [0u8; KEY_LEN];
        bk.copy_from_slice(&out[..]);
        Ok(Self(bk))
    }

    /// Derives the base key from the x-coordinate of the ECDH shared point. Also returns
    /// the authentication identifier the AE is expected to use when rekeying the base key.
    pub fn from_ecdh(
        shared_x: &[u8],
        ae_challenge: &Challenge,
        asue_challenge: &Challenge,
    ) -> Result<(Self, Challenge), Error> {
        let mut label = Vec::with_capacity(2 * CHALLENGE_LEN + kdf::BASE_KEY_LABEL.len());
        label.extend_from_slice(&ae_challenge[..]);
        label.extend_from_slice(&asue_challenge[..]);
        label.extend_from_slice(kdf::BASE_KEY_LABEL);
        let out = kdf(&label[..], shared_x, KEY_LEN + CHALLENGE_LEN)?;
        let mut bk = [0u8; KEY_LEN];
        bk.copy_from_slice(&out[..KEY_LEN]);
        Ok((Self(bk), sha256(&out[KEY_LEN..])))
    }

    pub fn bkid(&self, addid: &AddId) -> Result<Bkid, Error> {
        let out = kdf(&addid[..], &self.0[..], BKID_LEN)?;
        let mut bkid = [0u8; BKID_LEN];
        bkid.copy_from_slice(&out[..]);
        Ok(bkid)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

/// Unicast session key bundle.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Usk {
    encryption: [u8; KEY_LEN],
    integrity: [u8; KEY_LEN],
    kck: [u8; KEY_LEN],
    kek: [u8; KEY_LEN],
    seed: [u8; CHALLENGE_LEN],
}

impl fmt::Debug for Usk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Usk(..)")
    }
}

impl Usk {
    pub const LEN: usize = 4 * KEY_LEN + CHALLENGE_LEN;

    // GB 15629.11-2003/XG1-2006, 8.1.4.2.3
    pub fn derive(
        bk: &BaseKey,
        addid: &AddId,
        ae_challenge: &Challenge,
        asue_challenge: &Challenge,
    ) -> Result<Self, Error> {
        let mut label = Vec::with_capacity(
            addid.len() + 2 * CHALLENGE_LEN + kdf::UNICAST_KEY_LABEL.len(),
        );
        label.extend_from_slice(&addid[..]);
        label.extend_from_slice(&ae_challenge[..]);
        label.extend_from_slice(&asue_challenge[..]);
        label.extend_from_slice(kdf::UNICAST_KEY_LABEL);
        let out = kdf(&label[..], &bk.0[..], Self::LEN)?;

        let mut usk = Usk {
            encryption: [0u8; KEY_LEN],
            integrity: [0u8; KEY_LEN],
            kck: [0u8; KEY_LEN],
            kek: [0u8; KEY_LEN],
            seed: [0u8; CHALLENGE_LEN],
        };
        usk.encryption.copy_from_slice(&out[..16]);
        usk.integrity.copy_from_slice(&out[16..32]);
        usk.kck.copy_from_slice(&out[32..48]);
        usk.kek.copy_from_slice(&out[48..64]);
        usk.seed.copy_from_slice(&out[64..96]);
        Ok(usk)
    }

    pub fn encryption_key(&self) -> &[u8; KEY_LEN] {
        &self.encryption
    }

    pub fn integrity_key(&self) -> &[u8; KEY_LEN] {
        &self.integrity
    }

    pub fn kck(&self) -> &[u8; KEY_LEN] {
        &self.kck
    }

    pub fn kek(&self) -> &[u8; KEY_LEN] {
        &self.kek
    }

    /// The challenge the AE must present when it next rekeys the USK.
    pub fn next_challenge(&self) -> Challenge {
        sha256(&self.seed[..])
    }

    /// Encryption key followed by integrity key, the layout installed into the driver.
    pub fn data_key(&self) -> Vec<u8> {
        [&self.encryption[..], &self.integrity[..]].concat()
    }
}

/// Multicast session key bundle.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Msk {
    msk: [u8; KEY_LEN],
    mic: [u8; KEY_LEN],
}

impl fmt::Debug for Msk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Msk(..)")
    }
}

impl Msk {
    /// Expands the notification master key unwrapped from a multicast key announcement.
    pub fn derive(nmk: &[u8]) -> Result<Self, Error> {
        let out = kdf(kdf::MULTICAST_KEY_LABEL, nmk, 2 * KEY_LEN)?;
        let mut msk = Msk { msk: [0u8; KEY_LEN], mic: [0u8; KEY_LEN] };
        msk.msk.copy_from_slice(&out[..KEY_LEN]);
        msk.mic.copy_from_slice(&out[KEY_LEN..]);
        Ok(msk)
    }

    pub fn msk(&self) -> &[u8; KEY_LEN] {
        &self.msk
    }

    pub fn mic(&self) -> &[u8; KEY_LEN] {
        &self.mic
    }

    pub fn data_key(&self) -> Vec<u8> {
        [&self.msk[..], &self.mic[..]].concat()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlg {
    Sms4,
}

/// A key handed to the host for installation into the driver.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct KeyConfig {
    #[zeroize(skip)]
    pub alg: KeyAlg,
    pub addr: MacAddr,
    pub key_index: u8,
    pub is_tx: bool,
    pub key: Vec<u8>,
}

impl fmt::Debug for KeyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyConfig")
            .field("alg", &self.alg)
            .field("addr", &self.addr)
            .field("key_index", &self.key_index)
            .field("is_tx", &self.is_tx)
            .field("key_len", &self.key.len())
            .finish()
    }
}
