// Copyright 2023 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Reassembly of inbound WAI fragments and fragmentation of outbound messages.

use {
    super::{
        header::{self, WaiHeader, HEADER_LEN, MORE_FRAGMENTS},
        DecodeError, EncodeError,
    },
    bytes::{Bytes, BytesMut},
    thiserror::Error,
};

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ReassemblyError {
    #[error("invalid fragment header: {0}")]
    Header(#[from] DecodeError),
    #[error("fragment {frag_seq} of packet {packet_seq} arrived without a first fragment")]
    NoActiveBuffer { packet_seq: u16, frag_seq: u8 },
    #[error(
        "fragment {frag_seq} of packet {packet_seq} does not continue fragment \
         {expected_frag_seq} of packet {expected_packet_seq}"
    )]
    OutOfOrder { packet_seq: u16, frag_seq: u8, expected_packet_seq: u16, expected_frag_seq: u8 },
    #[error("reassembled message exceeds {0} bytes")]
    TooLarge(usize),
}

#[derive(Debug)]
struct Partial {
    packet_seq: u16,
    next_frag_seq: u8,
    buf: BytesMut,
}

/// Collects the fragments of one inbound message at a time.
#[derive(Debug)]
pub struct Reassembler {
    /// Upper bound on a reassembled message, header included.
    max_len: usize,
    partial: Option<Partial>,
}

impl Reassembler {
    pub fn new(max_len: usize) -> Self {
        // The header length field cannot describe anything longer.
        Self { max_len: max_len.min(u16::MAX as usize), partial: None }
    }

    pub fn in_progress(&self) -> bool {
        self.partial.is_some()
    }

    /// Returns the complete message once its last fragment was pushed. Any error discards
    /// the partially reassembled message.
    pub fn push(&mut self, frame: &[u8]) -> Result<Option<Bytes>, ReassemblyError> {
        let hdr = match WaiHeader::from_bytes(frame) {
            Ok(hdr) => hdr,
            Err(e) => {
                self.partial = None;
                return Err(e.into());
            }
        };

        if hdr.frag_seq == 0 {
            // A first fragment always restarts reassembly.
            self.partial = None;
            if frame.len() > self.max_len {
                return Err(ReassemblyError::TooLarge(self.max_len));
            }
            if !hdr.more_fragments {
                return Ok(Some(Bytes::copy_from_slice(frame)));
            }
            self.partial = Some(Partial {
                packet_seq: hdr.packet_seq,
                next_frag_seq: 1,
                buf: BytesMut::from(frame),
            });
            return Ok(None);
        }

        let mut partial = self.partial.take().ok_or(ReassemblyError::NoActiveBuffer {
            packet_seq: hdr.packet_seq,
            frag_seq: hdr.frag_seq,
        })?;
        if hdr.packet_seq != partial.packet_seq || hdr.frag_seq != partial.next_frag_seq {
            return Err(ReassemblyError::OutOfOrder {
                packet_seq: hdr.packet_seq,
                frag_seq: hdr.frag_seq,
                expected_packet_seq: partial.packet_seq,
                expected_frag_seq: partial.next_frag_seq,
            });
        }

        partial.buf.extend_from_slice(&frame[HEADER_LEN..]);
        if partial.buf.len() > self.max_len {
            return Err(ReassemblyError::TooLarge(self.max_len));
        }
        if hdr.more_fragments {
            partial.next_frag_seq = partial.next_frag_seq.wrapping_add(1);
            self.partial = Some(partial);
            return Ok(None);
        }

        let mut buf = partial.buf;
        let len = buf.len() as u16;
        header::set_be_u16(&mut buf[..], header::LENGTH_OFFSET, len);
        buf[header::FRAG_SEQ_OFFSET] = 0;
        buf[header::FLAG_OFFSET] &= !MORE_FRAGMENTS;
        Ok(Some(buf.freeze()))
    }
}

/// Splits an encoded message into fragments no longer than `max_fragment_len`, each with
/// a copy of the message header.
pub fn fragment(frame: &[u8], max_fragment_len: usize) -> Result<Vec<Vec<u8>>, EncodeError> {
    if frame.len() < HEADER_LEN || max_fragment_len <= HEADER_LEN {
        return Err(EncodeError::BufferTooSmall);
    }
    if frame.len() <= max_fragment_len {
        return Ok(vec![frame.to_vec()]);
    }
    let chunks: Vec<&[u8]> = frame[HEADER_LEN..].chunks(max_fragment_len - HEADER_LEN).collect();
    if chunks.len() > u8::MAX as usize + 1 {
        return Err(EncodeError::BufferTooSmall);
    }
    let last = chunks.len() - 1;
    Ok(chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| {
            let mut fragment = Vec::with_capacity(HEADER_LEN + chunk.len());
            fragment.extend_from_slice(&frame[..HEADER_LEN]);
            fragment.extend_from_slice(chunk);
            let len = fragment.len() as u16;
            header::set_be_u16(&mut fragment[..], header::LENGTH_OFFSET, len);
            fragment[header::FRAG_SEQ_OFFSET] = i as u8;
            fragment[header::FLAG_OFFSET] = if i < last { MORE_FRAGMENTS } else { 0 };
            fragment
        })
        .collect())
}
