// Copyright 2023 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::key::KEY_LEN,
    sm4::{
        cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit},
        Sm4,
    },
    zeroize::Zeroizing,
};

pub const BLOCK_LEN: usize = 16;

/// Unwraps key data protected with SMS4 in output feedback mode. OFB is symmetric, so
/// the same routine also wraps.
pub fn sms4_ofb_decrypt(
    key: &[u8; KEY_LEN],
    iv: &[u8; BLOCK_LEN],
    data: &[u8],
) -> Zeroizing<Vec<u8>> {
    let cipher = Sm4::new(GenericArray::from_slice(&key[..]));
    let mut keystream = GenericArray::clone_from_slice(&iv[..]);
    let mut out = Zeroizing::new(Vec::with_capacity(data.len()));
    for chunk in data.chunks(BLOCK_LEN) {
        cipher.encrypt_block(&mut keystream);
        out.extend(chunk.iter().zip(keystream.iter()).map(|(d, k)| d ^ k));
    }
    out
}
