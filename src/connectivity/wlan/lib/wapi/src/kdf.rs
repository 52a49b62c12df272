// Copyright 2023 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The WAI key derivation function and message authentication code.

use {
    crate::crypto::{self, hmac_sha256, verify_truncated_hmac_sha256},
    zeroize::Zeroizing,
};

pub const MAC_LEN: usize = 20;

pub const PSK_LABEL: &[u8] = b"preshared key expansion for authentication and key negotiation";
pub const BASE_KEY_LABEL: &[u8] = b"base key expansion for key and additional nonce";
pub const UNICAST_KEY_LABEL: &[u8] =
    b"pairwise key expansion for unicast and additional keys and nonce";
pub const MULTICAST_KEY_LABEL: &[u8] =
    b"multicast or station key expansion for station unicast and multicast and broadcast";

/// GB 15629.11-2003/XG1-2006, 8.1.4.1
/// Iterates HMAC-SHA256 keyed with `secret`, feeding each 32 byte output back in as the
/// next input, starting from `label`. The concatenated output is truncated to `len`.
pub fn kdf(label: &[u8], secret: &[u8], len: usize) -> Result<Zeroizing<Vec<u8>>, crypto::Error> {
    let mut out = Zeroizing::new(Vec::with_capacity(len + crypto::DIGEST_LEN));
    let mut block = Zeroizing::new(hmac_sha256(secret, label)?);
    loop {
        out.extend_from_slice(&block[..]);
        if out.len() >= len {
            break;
        }
        block = Zeroizing::new(hmac_sha256(secret, &block[..])?);
    }
    out.truncate(len);
    Ok(out)
}

pub fn compute_mac(kck: &[u8], data: &[u8]) -> Result<[u8; MAC_LEN], crypto::Error> {
    let digest = hmac_sha256(kck, data)?;
    let mut mac = [0u8; MAC_LEN];
    mac.copy_from_slice(&digest[..MAC_LEN]);
    Ok(mac)
}

pub fn verify_mac(kck: &[u8], data: &[u8], mac: &[u8]) -> Result<bool, crypto::Error> {
    if mac.len() != MAC_LEN {
        return Ok(false);
    }
    verify_truncated_hmac_sha256(kck, data, mac)
}
