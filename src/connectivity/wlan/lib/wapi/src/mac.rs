// Copyright 2023 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

pub type MacAddr = [u8; 6];

pub const BCAST_ADDR: MacAddr = [0xFF; 6];

/// ADDID: the AE's MAC address followed by the ASUE's MAC address.
pub type AddId = [u8; 12];

pub fn addid(ae_addr: &MacAddr, asue_addr: &MacAddr) -> AddId {
    let mut addid = [0u8; 12];
    addid[..6].copy_from_slice(&ae_addr[..]);
    addid[6..].copy_from_slice(&asue_addr[..]);
    addid
}

pub trait MacFmt {
    fn to_mac_str(&self) -> String;
}

impl MacFmt for MacAddr {
    fn to_mac_str(&self) -> String {
        format!(
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self[0], self[1], self[2], self[3], self[4], self[5]
        )
    }
}

/// Reason codes used when asking the host to deauthenticate.
/// IEEE Std 802.11-2016, 9.4.1.7
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default)]
pub struct ReasonCode(pub u16);

impl ReasonCode {
    pub const UNSPECIFIED_REASON: Self = Self(1);
    pub const INVALID_AUTHENTICATION: Self = Self(2);
    pub const MIC_FAILURE: Self = Self(14);
    pub const HANDSHAKE_ELEMENT_MISMATCH: Self = Self(17);
}
