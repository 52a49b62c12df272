// Copyright 2023 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use crate::{
    key::KeyConfig,
    mac::{MacAddr, ReasonCode},
    supplicant::State,
};

/// Side effects requested by the supplicant, applied by the host in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecAssocUpdate {
    TxWaiFrame { dst: MacAddr, frame: Vec<u8> },
    Key(KeyConfig),
    State(State),
    Deauthenticate(ReasonCode),
    CancelAuthTimeout,
    CancelScan,
    /// Opens or closes the controlled port for data frames.
    SetPort(bool),
}

pub type UpdateSink = Vec<SecAssocUpdate>;
