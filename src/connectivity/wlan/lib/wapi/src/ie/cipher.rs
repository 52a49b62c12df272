// Copyright 2023 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    super::suite_selector::{self, Oui},
    bitflags::bitflags,
};

pub const SMS4: u8 = 1;

bitflags! {
    pub struct CipherSuites: u32 {
        const SMS4 = 1 << 0;
    }
}

#[derive(PartialOrd, PartialEq, Eq, Clone, Copy, Debug)]
pub struct Cipher {
    pub oui: Oui,
    pub suite_type: u8,
}

impl Cipher {
    pub fn new_wapi(suite_type: u8) -> Self {
        Cipher { oui: Oui::WAPI, suite_type }
    }

    pub fn mask(&self) -> CipherSuites {
        match (self.oui, self.suite_type) {
            (Oui::WAPI, SMS4) => CipherSuites::SMS4,
            _ => CipherSuites::empty(),
        }
    }
}

impl suite_selector::Factory for Cipher {
    type Suite = Cipher;

    fn new(oui: Oui, suite_type: u8) -> Self::Suite {
        Cipher { oui, suite_type }
    }
}
