// Copyright 2023 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    super::{DecodeError, Subtype},
    crate::{
        appendable::{Appendable, BufferTooSmall},
        buffer_reader::BufferReader,
    },
    bitfield::bitfield,
};

pub const HEADER_LEN: usize = 12;
pub const VERSION: u16 = 1;
pub const WAI_TYPE: u8 = 1;

// Byte offsets of the fields patched after a frame was written.
pub(crate) const LENGTH_OFFSET: usize = 6;
pub(crate) const PACKET_SEQ_OFFSET: usize = 8;
pub(crate) const FRAG_SEQ_OFFSET: usize = 10;
pub(crate) const FLAG_OFFSET: usize = 11;

pub const MORE_FRAGMENTS: u8 = 1 << 0;

/// GB 15629.11-2003/XG1-2006, 8.1.4.1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaiHeader {
    pub version: u16,
    pub type_: u8,
    /// Kept raw so fragments of messages this station can't decode still reassemble.
    pub subtype: u8,
    pub length: u16,
    pub packet_seq: u16,
    pub frag_seq: u8,
    pub more_fragments: bool,
}

impl WaiHeader {
    pub fn new(subtype: Subtype, packet_seq: u16) -> Self {
        Self {
            version: VERSION,
            type_: WAI_TYPE,
            subtype: subtype as u8,
            length: 0,
            packet_seq,
            frag_seq: 0,
            more_fragments: false,
        }
    }

    pub fn parse(rdr: &mut BufferReader<'_>) -> Result<Self, DecodeError> {
        let version = rdr.read_be_u16()?;
        let type_ = rdr.read_u8()?;
        let subtype = rdr.read_u8()?;
        let _reserved = rdr.read_be_u16()?;
        let length = rdr.read_be_u16()?;
        let packet_seq = rdr.read_be_u16()?;
        let frag_seq = rdr.read_u8()?;
        let flag = rdr.read_u8()?;
        if version != VERSION {
            return Err(DecodeError::InvalidHeader("unsupported WAI version"));
        }
        if type_ != WAI_TYPE {
            return Err(DecodeError::InvalidHeader("not a WAI protocol frame"));
        }
        Ok(Self {
            version,
            type_,
            subtype,
            length,
            packet_seq,
            frag_seq,
            more_fragments: flag & MORE_FRAGMENTS != 0,
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        Self::parse(&mut BufferReader::new(bytes))
    }

    pub fn write_into<A: Appendable>(&self, buf: &mut A) -> Result<(), BufferTooSmall> {
        buf.append_be_u16(self.version)?;
        buf.append_byte(self.type_)?;
        buf.append_byte(self.subtype)?;
        buf.append_be_u16(0)?;
        buf.append_be_u16(self.length)?;
        buf.append_be_u16(self.packet_seq)?;
        buf.append_byte(self.frag_seq)?;
        buf.append_byte(if self.more_fragments { MORE_FRAGMENTS } else { 0 })
    }
}

pub(crate) fn set_be_u16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_be_bytes()[..]);
}

bitfield! {
    /// Flag field leading every WAI message body.
    pub struct WaiFlags(u8);
    impl Debug;
    pub bk_rekeying, set_bk_rekeying: 0;
    pub preauth, set_preauth: 1;
    pub cert_auth_request, set_cert_auth_request: 2;
    pub optional_field, set_optional_field: 3;
    pub usk_rekeying, set_usk_rekeying: 4;
    pub stakey_negotiation, set_stakey_negotiation: 5;
    pub stakey_revoking, set_stakey_revoking: 6;
    // Bit 7 reserved.
    pub value, _: 7, 0;
}

impl Clone for WaiFlags {
    fn clone(&self) -> Self {
        Self(self.0)
    }
}

impl Copy for WaiFlags {}

impl PartialEq for WaiFlags {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for WaiFlags {}
