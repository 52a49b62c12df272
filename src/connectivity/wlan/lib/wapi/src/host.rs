// Copyright 2023 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::{
        key::KeyConfig,
        mac::{MacAddr, MacFmt, ReasonCode},
        supplicant::State,
        update::{SecAssocUpdate, UpdateSink},
    },
    log::{error, info},
    std::io,
};

/// Callbacks into the host supplicant and the link layer.
pub trait Host {
    fn transmit_frame(&mut self, dst: &MacAddr, frame: &[u8]) -> io::Result<()>;
    fn set_state(&mut self, state: State);
    fn deauthenticate(&mut self, reason: ReasonCode);
    fn install_key(&mut self, key: &KeyConfig);
    fn cancel_auth_timeout(&mut self);
    fn cancel_scan(&mut self);
    fn set_port(&mut self, authorized: bool);
}

/// Applies updates to the host in the order they were produced. A failed transmission is
/// logged and does not stop the remaining updates.
pub fn apply_updates<H: Host + ?Sized>(host: &mut H, updates: UpdateSink) {
    for update in updates {
        match update {
            SecAssocUpdate::TxWaiFrame { dst, frame } => {
                if let Err(e) = host.transmit_frame(&dst, &frame[..]) {
                    error!("error sending WAI frame to {}: {}", dst.to_mac_str(), e);
                }
            }
            SecAssocUpdate::Key(key) => host.install_key(&key),
            SecAssocUpdate::State(state) => {
                info!("WAPI state: {:?}", state);
                host.set_state(state)
            }
            SecAssocUpdate::Deauthenticate(reason) => host.deauthenticate(reason),
            SecAssocUpdate::CancelAuthTimeout => host.cancel_auth_timeout(),
            SecAssocUpdate::CancelScan => host.cancel_scan(),
            SecAssocUpdate::SetPort(authorized) => host.set_port(authorized),
        }
    }
}
