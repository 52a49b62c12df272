// Copyright 2023 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
#[error("buffer too small")]
pub struct BufferTooSmall;

/// A growable sink for frame and element writers.
pub trait Appendable {
    fn append_bytes(&mut self, bytes: &[u8]) -> Result<(), BufferTooSmall>;

    fn append_bytes_zeroed(&mut self, len: usize) -> Result<&mut [u8], BufferTooSmall>;

    fn bytes_written(&self) -> usize;

    fn can_append(&self, bytes: usize) -> bool;

    fn append_byte(&mut self, byte: u8) -> Result<(), BufferTooSmall> {
        self.append_bytes(&[byte])
    }

    fn append_be_u16(&mut self, value: u16) -> Result<(), BufferTooSmall> {
        self.append_bytes(&value.to_be_bytes()[..])
    }

    fn append_le_u16(&mut self, value: u16) -> Result<(), BufferTooSmall> {
        self.append_bytes(&value.to_le_bytes()[..])
    }
}

impl Appendable for Vec<u8> {
    fn append_bytes(&mut self, bytes: &[u8]) -> Result<(), BufferTooSmall> {
        self.extend_from_slice(bytes);
        Ok(())
    }

    fn append_bytes_zeroed(&mut self, len: usize) -> Result<&mut [u8], BufferTooSmall> {
        let old_len = self.len();
        self.resize(old_len + len, 0);
        Ok(&mut self[old_len..])
    }

    fn bytes_written(&self) -> usize {
        self.len()
    }

    fn can_append(&self, _bytes: usize) -> bool {
        true
    }
}

/// A `Vec` backed buffer which refuses to grow beyond a fixed capacity.
#[derive(Debug)]
pub struct BoundedBuffer {
    buf: Vec<u8>,
    capacity: usize,
}

impl BoundedBuffer {
    pub fn new(capacity: usize) -> Self {
        Self { buf: Vec::new(), capacity }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.buf[..]
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..]
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

impl Appendable for BoundedBuffer {
    fn append_bytes(&mut self, bytes: &[u8]) -> Result<(), BufferTooSmall> {
        if !self.can_append(bytes.len()) {
            return Err(BufferTooSmall);
        }
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    fn append_bytes_zeroed(&mut self, len: usize) -> Result<&mut [u8], BufferTooSmall> {
        if !self.can_append(len) {
            return Err(BufferTooSmall);
        }
        let old_len = self.buf.len();
        self.buf.resize(old_len + len, 0);
        Ok(&mut self.buf[old_len..])
    }

    fn bytes_written(&self) -> usize {
        self.buf.len()
    }

    fn can_append(&self, bytes: usize) -> bool {
        self.buf.len() + bytes <= self.capacity
    }
}
