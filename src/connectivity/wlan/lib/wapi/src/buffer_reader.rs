// Copyright 2023 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    byteorder::{BigEndian, ByteOrder},
    thiserror::Error,
};

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
#[error("buffer too short; needed {needed} bytes but only {remaining} remain")]
pub struct BufferTooShort {
    pub needed: usize,
    pub remaining: usize,
}

/// A cursor over a borrowed byte slice. Every read is bounds checked and fails without
/// consuming input if the slice is exhausted. Returned slices borrow from the underlying
/// buffer and never copy.
#[derive(Debug, Clone)]
pub struct BufferReader<'a> {
    buf: &'a [u8],
    read: usize,
}

impl<'a> BufferReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, read: 0 }
    }

    pub fn bytes_read(&self) -> usize {
        self.read
    }

    pub fn bytes_remaining(&self) -> usize {
        self.buf.len() - self.read
    }

    pub fn is_empty(&self) -> bool {
        self.bytes_remaining() == 0
    }

    /// The unread tail of the buffer.
    pub fn remaining(&self) -> &'a [u8] {
        &self.buf[self.read..]
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], BufferTooShort> {
        let remaining = self.bytes_remaining();
        if len > remaining {
            return Err(BufferTooShort { needed: len, remaining });
        }
        let bytes = &self.buf[self.read..self.read + len];
        self.read += len;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], BufferTooShort> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.read_bytes(N)?);
        Ok(array)
    }

    pub fn read_u8(&mut self) -> Result<u8, BufferTooShort> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_be_u16(&mut self) -> Result<u16, BufferTooShort> {
        Ok(BigEndian::read_u16(self.read_bytes(2)?))
    }
}
