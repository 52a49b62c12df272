// Copyright 2023 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    super::DecodeError,
    crate::{
        appendable::{Appendable, BufferTooSmall},
        buffer_reader::BufferReader,
    },
};

/// Identity TLV type.
pub const IDENTITY_X509: u16 = 1;
/// Certificate TLV type.
pub const CERTIFICATE_X509: u16 = 1;
/// ECDH parameter TLV type: the value is the curve's OID.
pub const ECDH_PARAMS_OID: u16 = 1;

/// DER encoded OID 1.2.156.11235.1.1.2.1 of the 192-bit WAPI curve.
pub const ECDH_CURVE_OID: [u8; 11] =
    [0x06, 0x09, 0x2A, 0x81, 0x1C, 0xD7, 0x63, 0x01, 0x01, 0x02, 0x01];

/// A type-length-value field borrowing its value from the surrounding frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tlv<'a> {
    pub type_: u16,
    pub value: &'a [u8],
}

impl<'a> Tlv<'a> {
    pub fn new(type_: u16, value: &'a [u8]) -> Self {
        Self { type_, value }
    }

    pub fn ecdh_params() -> Tlv<'static> {
        Tlv { type_: ECDH_PARAMS_OID, value: &ECDH_CURVE_OID[..] }
    }

    /// Two byte type and two byte length.
    pub fn parse(rdr: &mut BufferReader<'a>) -> Result<Self, DecodeError> {
        let type_ = rdr.read_be_u16()?;
        let len = rdr.read_be_u16()?;
        Ok(Self { type_, value: rdr.read_bytes(len as usize)? })
    }

    /// One byte type and two byte length, as used by the ECDH parameter field.
    pub fn parse_short(rdr: &mut BufferReader<'a>) -> Result<Self, DecodeError> {
        let type_ = rdr.read_u8()? as u16;
        let len = rdr.read_be_u16()?;
        Ok(Self { type_, value: rdr.read_bytes(len as usize)? })
    }

    pub fn len(&self) -> usize {
        4 + self.value.len()
    }

    pub fn write_into<A: Appendable>(&self, buf: &mut A) -> Result<(), BufferTooSmall> {
        buf.append_be_u16(self.type_)?;
        buf.append_be_u16(value_len(self.value)?)?;
        buf.append_bytes(self.value)
    }

    pub fn write_short_into<A: Appendable>(&self, buf: &mut A) -> Result<(), BufferTooSmall> {
        buf.append_byte(self.type_ as u8)?;
        buf.append_be_u16(value_len(self.value)?)?;
        buf.append_bytes(self.value)
    }
}

fn value_len(value: &[u8]) -> Result<u16, BufferTooSmall> {
    u16::try_from(value.len()).map_err(|_| BufferTooSmall)
}
