// Copyright 2023 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Extracts what WAI needs from an X.509 certificate: the serial number, issuer and
//! subject names, and the subject public key.

use {
    derp::Tag,
    thiserror::Error,
    untrusted::{Input, Reader},
};

const TAG_EXPLICIT_VERSION: u8 = 0xA0;

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed DER: {0:?}")]
    Der(derp::Error),
    #[error("{0} trailing bytes after certificate")]
    TrailingBytes(usize),
    #[error("malformed subject public key")]
    InvalidPublicKey,
}

impl From<derp::Error> for Error {
    fn from(e: derp::Error) -> Self {
        Error::Der(e)
    }
}

/// Reads one element with the given tag and returns its full encoding, header included.
fn read_raw<'a>(rdr: &mut Reader<'a>, tag: Tag) -> Result<&'a [u8], derp::Error> {
    let (raw, _) = rdr.read_partial(|rdr| derp::expect_tag_and_get_value(rdr, tag))?;
    Ok(raw.as_slice_less_safe())
}

/// An X.509 certificate, retained together with its DER encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    pub raw: Vec<u8>,
    /// DER encoding of the serial number INTEGER.
    pub serial: Vec<u8>,
    /// DER encoding of the issuer Name.
    pub issuer: Vec<u8>,
    /// DER encoding of the subject Name.
    pub subject: Vec<u8>,
    /// Subject public key, an uncompressed EC point.
    pub public_key: Vec<u8>,
}

impl Certificate {
    // RFC 5280, 4.1
    pub fn parse(der: &[u8]) -> Result<Self, Error> {
        let mut rdr = Reader::new(Input::from(der));
        let (serial, issuer, subject, key) = derp::nested(&mut rdr, Tag::Sequence, |cert| {
            let fields = derp::nested(cert, Tag::Sequence, |tbs| {
                if tbs.peek(TAG_EXPLICIT_VERSION) {
                    derp::read_tag_and_get_value(tbs)?;
                }
                let serial = read_raw(tbs, Tag::Integer)?;
                let _signature_alg = derp::expect_tag_and_get_value(tbs, Tag::Sequence)?;
                let issuer = read_raw(tbs, Tag::Sequence)?;
                let _validity = derp::expect_tag_and_get_value(tbs, Tag::Sequence)?;
                let subject = read_raw(tbs, Tag::Sequence)?;
                let key = derp::nested(tbs, Tag::Sequence, |spki| {
                    let _key_alg = derp::expect_tag_and_get_value(spki, Tag::Sequence)?;
                    derp::bit_string_with_no_unused_bits(spki)
                })?;
                // Unique identifiers and extensions are not used.
                tbs.read_bytes_to_end();
                Ok((serial, issuer, subject, key.as_slice_less_safe()))
            })?;
            cert.read_bytes_to_end();
            Ok(fields)
        })?;
        if !rdr.at_end() {
            return Err(Error::TrailingBytes(rdr.read_bytes_to_end().len()));
        }
        if key.is_empty() {
            return Err(Error::InvalidPublicKey);
        }

        Ok(Self {
            raw: der.to_vec(),
            serial: serial.to_vec(),
            issuer: issuer.to_vec(),
            subject: subject.to_vec(),
            public_key: key.to_vec(),
        })
    }

    /// The WAI identity of the certificate holder: subject, issuer and serial number.
    pub fn identity(&self) -> Vec<u8> {
        [&self.subject[..], &self.issuer[..], &self.serial[..]].concat()
    }
}
