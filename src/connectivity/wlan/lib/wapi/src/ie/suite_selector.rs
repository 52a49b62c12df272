// Copyright 2023 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::fmt;

/// Organizationally unique identifier of a suite selector.
#[derive(PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
pub struct Oui([u8; 3]);

impl Oui {
    /// OUI assigned to the WAPI suites of GB 15629.11.
    pub const WAPI: Self = Self([0x00, 0x14, 0x72]);

    pub fn new(oui: [u8; 3]) -> Self {
        Self(oui)
    }

    pub fn as_bytes(&self) -> &[u8; 3] {
        &self.0
    }
}

impl fmt::Debug for Oui {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}-{:02X}-{:02X}", self.0[0], self.0[1], self.0[2])
    }
}

pub trait Factory {
    type Suite;

    fn new(oui: Oui, suite_type: u8) -> Self::Suite;
}
