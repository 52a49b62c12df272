// Copyright 2023 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The WAPI information element carried in beacons, probe responses and association
//! requests, and echoed inside the unicast key negotiation messages.

pub mod akm;
pub mod cipher;
pub mod suite_selector;

use {
    crate::{
        appendable::{Appendable, BufferTooSmall},
        config::AuthConfig,
        wai::DecodeError,
    },
    akm::{Akm, AkmSuites},
    cipher::{Cipher, CipherSuites},
    log::warn,
    nom::{
        bytes::complete::take,
        combinator::{eof, map},
        multi::count,
        number::complete::le_u16,
        IResult,
    },
    suite_selector::Oui,
};

pub const ID: u8 = 0x44;
pub const VERSION: u16 = 1;

const HDR_LEN: usize = 2;
const SUITE_LEN: usize = 4;
pub const BKID_LEN: usize = 16;

pub type Bkid = [u8; BKID_LEN];

// GB 15629.11-2003/XG1-2006, 7.3.2.25
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct WapiIe {
    pub version: u16,
    pub akm_suites: Vec<Akm>,
    pub unicast_cipher_suites: Vec<Cipher>,
    pub multicast_cipher_suite: Cipher,
    pub capabilities: u16,
    pub bkids: Vec<Bkid>,
}

impl WapiIe {
    /// Length of the element's body, excluding the element ID and length octets.
    fn body_len(&self) -> usize {
        2 + 2
            + self.akm_suites.len() * SUITE_LEN
            + 2
            + self.unicast_cipher_suites.len() * SUITE_LEN
            + SUITE_LEN
            + 2
            + 2
            + self.bkids.len() * BKID_LEN
    }

    pub fn len(&self) -> usize {
        HDR_LEN + self.body_len()
    }

    pub fn write_into<A: Appendable>(&self, buf: &mut A) -> Result<(), BufferTooSmall> {
        let body_len = self.body_len();
        if body_len > u8::MAX as usize {
            return Err(BufferTooSmall);
        }
        if !buf.can_append(HDR_LEN + body_len) {
            return Err(BufferTooSmall);
        }

        buf.append_byte(ID)?;
        buf.append_byte(body_len as u8)?;
        buf.append_le_u16(self.version)?;

        buf.append_le_u16(self.akm_suites.len() as u16)?;
        for akm in &self.akm_suites {
            buf.append_bytes(&akm.oui.as_bytes()[..])?;
            buf.append_byte(akm.suite_type)?;
        }

        buf.append_le_u16(self.unicast_cipher_suites.len() as u16)?;
        for cipher in &self.unicast_cipher_suites {
            buf.append_bytes(&cipher.oui.as_bytes()[..])?;
            buf.append_byte(cipher.suite_type)?;
        }

        buf.append_bytes(&self.multicast_cipher_suite.oui.as_bytes()[..])?;
        buf.append_byte(self.multicast_cipher_suite.suite_type)?;

        buf.append_le_u16(self.capabilities)?;

        buf.append_le_u16(self.bkids.len() as u16)?;
        for bkid in &self.bkids {
            buf.append_bytes(&bkid[..])?;
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, BufferTooSmall> {
        let mut buf = Vec::with_capacity(self.len());
        self.write_into(&mut buf)?;
        Ok(buf)
    }

    pub fn akm_mask(&self) -> AkmSuites {
        self.akm_suites.iter().fold(AkmSuites::empty(), |mask, akm| mask | akm.mask())
    }

    pub fn unicast_mask(&self) -> CipherSuites {
        self.unicast_cipher_suites.iter().fold(CipherSuites::empty(), |mask, c| mask | c.mask())
    }
}

/// Parses a complete WAPI IE, including element ID and length octets.
pub fn from_bytes(bytes: &[u8]) -> Result<WapiIe, DecodeError> {
    // Bounds are checked before the length octet is used.
    if bytes.len() < HDR_LEN {
        return Err(DecodeError::TooShort);
    }
    if bytes[0] != ID {
        return Err(DecodeError::MalformedIe("unexpected element ID"));
    }
    let body_len = bytes[1] as usize;
    if bytes.len() < HDR_LEN + body_len {
        return Err(DecodeError::TooShort);
    }
    let body = &bytes[HDR_LEN..HDR_LEN + body_len];

    let (rest, version) = le_u16::<_, ()>(body).map_err(|_| DecodeError::TooShort)?;
    if version != VERSION {
        return Err(DecodeError::MalformedIe("unsupported version"));
    }
    match parse_body(rest) {
        Ok((_, (akm_suites, unicast_cipher_suites, multicast_cipher_suite, capabilities, bkids))) => {
            Ok(WapiIe {
                version,
                akm_suites,
                unicast_cipher_suites,
                multicast_cipher_suite,
                capabilities,
                bkids,
            })
        }
        Err(_) => Err(DecodeError::MalformedIe("truncated or trailing fields")),
    }
}

fn read_suite_selector<T>(input: &[u8]) -> IResult<&[u8], T>
where
    T: suite_selector::Factory<Suite = T>,
{
    let (i1, bytes) = take(SUITE_LEN)(input)?;
    let oui = Oui::new([bytes[0], bytes[1], bytes[2]]);
    Ok((i1, T::new(oui, bytes[3])))
}

fn read_bkid(input: &[u8]) -> IResult<&[u8], Bkid> {
    map(take(BKID_LEN), |bytes: &[u8]| {
        let mut bkid = [0u8; BKID_LEN];
        bkid.copy_from_slice(bytes);
        bkid
    })(input)
}

type Body = (Vec<Akm>, Vec<Cipher>, Cipher, u16, Vec<Bkid>);

fn parse_body(i0: &[u8]) -> IResult<&[u8], Body> {
    let (i1, akm_count) = le_u16(i0)?;
    let (i2, akms) = count(read_suite_selector::<Akm>, akm_count as usize)(i1)?;
    let (i3, unicast_count) = le_u16(i2)?;
    let (i4, unicast) = count(read_suite_selector::<Cipher>, unicast_count as usize)(i3)?;
    let (i5, multicast) = read_suite_selector::<Cipher>(i4)?;
    let (i6, capabilities) = le_u16(i5)?;
    // Some APs omit the BKID list entirely.
    if i6.is_empty() {
        return Ok((i6, (akms, unicast, multicast, capabilities, vec![])));
    }
    let (i7, bkid_count) = le_u16(i6)?;
    let (i8, bkids) = count(read_bkid, bkid_count as usize)(i7)?;
    let (i9, _) = eof(i8)?;
    Ok((i9, (akms, unicast, multicast, capabilities, bkids)))
}

/// Summary of a parsed WAPI IE with suites reduced to the bits this station knows.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct WapiIeData {
    pub akm: AkmSuites,
    pub unicast: CipherSuites,
    pub multicast: CipherSuites,
    pub capabilities: u16,
    pub bkids: Vec<Bkid>,
}

pub fn parse_ie(bytes: &[u8]) -> Result<WapiIeData, DecodeError> {
    let ie = from_bytes(bytes)?;
    let data = WapiIeData {
        akm: ie.akm_mask(),
        unicast: ie.unicast_mask(),
        multicast: ie.multicast_cipher_suite.mask(),
        capabilities: ie.capabilities,
        bkids: ie.bkids,
    };
    if data.akm.is_empty() {
        warn!("WAPI IE carries no known AKM suite: {:?}", ie.akm_suites);
    }
    if data.unicast.is_empty() {
        warn!("WAPI IE carries no known unicast cipher: {:?}", ie.unicast_cipher_suites);
    }
    if data.multicast.is_empty() {
        warn!("WAPI IE carries unknown multicast cipher: {:?}", ie.multicast_cipher_suite);
    }
    Ok(data)
}

/// Builds the station's own WAPI IE for the configured authentication method.
pub fn gen_ie(auth: &AuthConfig) -> WapiIe {
    let akm = match auth {
        AuthConfig::Psk { .. } => akm::PSK,
        AuthConfig::Certificate { .. } => akm::CERTIFICATE,
    };
    WapiIe {
        version: VERSION,
        akm_suites: vec![Akm::new_wapi(akm)],
        unicast_cipher_suites: vec![Cipher::new_wapi(cipher::SMS4)],
        multicast_cipher_suite: Cipher::new_wapi(cipher::SMS4),
        capabilities: 0,
        bkids: vec![],
    }
}
