// Copyright 2023 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    super::suite_selector::{self, Oui},
    bitflags::bitflags,
};

// GB 15629.11-2003/XG1-2006, 7.3.2.25
pub const CERTIFICATE: u8 = 1;
pub const PSK: u8 = 2;

bitflags! {
    /// AKM suites understood by this station.
    pub struct AkmSuites: u32 {
        const CERTIFICATE = 1 << 0;
        const PSK = 1 << 1;
    }
}

#[derive(PartialOrd, PartialEq, Eq, Clone, Copy, Debug)]
pub struct Akm {
    pub oui: Oui,
    pub suite_type: u8,
}

impl Akm {
    pub fn new_wapi(suite_type: u8) -> Self {
        Akm { oui: Oui::WAPI, suite_type }
    }

    /// Unknown suites map to an empty set.
    pub fn mask(&self) -> AkmSuites {
        if self.oui != Oui::WAPI {
            return AkmSuites::empty();
        }
        match self.suite_type {
            CERTIFICATE => AkmSuites::CERTIFICATE,
            PSK => AkmSuites::PSK,
            _ => AkmSuites::empty(),
        }
    }
}

impl suite_selector::Factory for Akm {
    type Suite = Akm;

    fn new(oui: Oui, suite_type: u8) -> Self::Suite {
        Akm { oui, suite_type }
    }
}
