// Copyright 2023 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! WAI frame codec. All multi-byte integers are big-endian.

pub mod fragment;
pub mod header;
pub mod message;
pub mod tlv;
mod writer;

pub use {
    header::{WaiFlags, WaiHeader, HEADER_LEN},
    message::{
        AccessAuthRequest, AccessAuthResponse, AuthActivation, CertVerification, Mcvr, Message,
        MulticastKeyAnnounce, MulticastKeyResponse, ProtectionKind, SignatureAttr,
        UnicastKeyConfirm, UnicastKeyRequest, UnicastKeyResponse,
    },
    tlv::Tlv,
    writer::write_mcvr,
};

use {
    crate::{
        appendable::{Appendable, BoundedBuffer, BufferTooSmall},
        buffer_reader::{BufferReader, BufferTooShort},
        crypto::{self, sha256, EcCrypto},
        kdf::compute_mac,
    },
    thiserror::Error,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Subtype {
    PreAuthStart = 1,
    StakeyRequest = 2,
    AuthActivation = 3,
    AccessAuthRequest = 4,
    AccessAuthResponse = 5,
    CertAuthRequest = 6,
    CertAuthResponse = 7,
    UnicastKeyNegotiationRequest = 8,
    UnicastKeyNegotiationResponse = 9,
    UnicastKeyNegotiationConfirm = 10,
    MulticastKeyStakeyAnnounce = 11,
    MulticastKeyStakeyAnnounceResponse = 12,
}

impl Subtype {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            1 => Subtype::PreAuthStart,
            2 => Subtype::StakeyRequest,
            3 => Subtype::AuthActivation,
            4 => Subtype::AccessAuthRequest,
            5 => Subtype::AccessAuthResponse,
            6 => Subtype::CertAuthRequest,
            7 => Subtype::CertAuthResponse,
            8 => Subtype::UnicastKeyNegotiationRequest,
            9 => Subtype::UnicastKeyNegotiationResponse,
            10 => Subtype::UnicastKeyNegotiationConfirm,
            11 => Subtype::MulticastKeyStakeyAnnounce,
            12 => Subtype::MulticastKeyStakeyAnnounceResponse,
            _ => return None,
        })
    }
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum DecodeError {
    #[error("frame too short")]
    TooShort,
    #[error("invalid WAI header: {0}")]
    InvalidHeader(&'static str),
    #[error("header length {header} does not match frame length {actual}")]
    LengthMismatch { header: u16, actual: usize },
    #[error("subtype {0:?} is not supported by the station")]
    UnsupportedSubtype(Subtype),
    #[error("unknown subtype {0}")]
    UnknownSubtype(u8),
    #[error("{0} trailing bytes after message body")]
    TrailingBytes(usize),
    #[error("malformed message: {0}")]
    Malformed(&'static str),
    #[error("malformed WAPI IE: {0}")]
    MalformedIe(&'static str),
}

impl From<BufferTooShort> for DecodeError {
    fn from(_: BufferTooShort) -> Self {
        DecodeError::TooShort
    }
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum EncodeError {
    #[error("subtype {0:?} is never sent by the station")]
    UnsupportedSubtype(Subtype),
    #[error("subtype {0:?} requires a key for its integrity protection")]
    MissingKey(Subtype),
    #[error("message exceeds the buffer")]
    BufferTooSmall,
    #[error("error computing integrity protection: {0}")]
    Crypto(#[from] crypto::Error),
}

impl From<BufferTooSmall> for EncodeError {
    fn from(_: BufferTooSmall) -> Self {
        EncodeError::BufferTooSmall
    }
}

/// A decoded WAI frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub header: WaiHeader,
    /// Everything following the header. MACs and signatures are computed over prefixes
    /// of the body.
    pub body: &'a [u8],
    pub message: Message<'a>,
}

impl<'a> Frame<'a> {
    /// The part of the body covered by the trailing MAC.
    pub fn mac_input(&self) -> &'a [u8] {
        &self.body[..self.body.len().saturating_sub(crate::kdf::MAC_LEN)]
    }

    /// The part of the body covered by the trailing signature attribute.
    pub fn signed_input(&self, signature: &SignatureAttr<'_>) -> &'a [u8] {
        &self.body[..self.body.len().saturating_sub(signature.len())]
    }
}

pub fn decode(buf: &[u8]) -> Result<Frame<'_>, DecodeError> {
    let mut rdr = BufferReader::new(buf);
    let header = WaiHeader::parse(&mut rdr)?;
    if header.length as usize != buf.len() {
        return Err(DecodeError::LengthMismatch { header: header.length, actual: buf.len() });
    }
    if header.more_fragments || header.frag_seq != 0 {
        return Err(DecodeError::InvalidHeader("fragment of a larger message"));
    }
    let subtype =
        Subtype::from_u8(header.subtype).ok_or(DecodeError::UnknownSubtype(header.subtype))?;
    let body = rdr.remaining();
    let message = Message::parse(subtype, &mut rdr)?;
    if !rdr.is_empty() {
        return Err(DecodeError::TrailingBytes(rdr.bytes_remaining()));
    }
    Ok(Frame { header, body, message })
}

/// Key material protecting an outbound message.
pub enum Protection<'a> {
    None,
    Mac { kck: &'a [u8] },
    Signature { crypto: &'a dyn EcCrypto, private_key: &'a [u8], identity: Tlv<'a> },
}

/// Encodes a message the station sends to the AE.
pub fn encode(
    msg: &Message<'_>,
    packet_seq: u16,
    protection: &Protection<'_>,
    max_len: usize,
) -> Result<Vec<u8>, EncodeError> {
    match msg {
        Message::AuthActivation(_) | Message::AccessAuthResponse(_) => {
            Err(EncodeError::UnsupportedSubtype(msg.subtype()))
        }
        _ => write_frame(msg, packet_seq, protection, max_len),
    }
}

/// Encodes any message, including the ones only the AE sends.
pub(crate) fn write_frame(
    msg: &Message<'_>,
    packet_seq: u16,
    protection: &Protection<'_>,
    max_len: usize,
) -> Result<Vec<u8>, EncodeError> {
    let subtype = msg.subtype();
    let mut buf = BoundedBuffer::new(max_len);
    WaiHeader::new(subtype, packet_seq).write_into(&mut buf)?;
    writer::write_body(&mut buf, msg)?;

    match (msg.protection_kind(), protection) {
        (ProtectionKind::None, _) => (),
        (ProtectionKind::Mac, Protection::Mac { kck }) => {
            let mac = compute_mac(kck, &buf.as_slice()[HEADER_LEN..])?;
            buf.append_bytes(&mac[..])?;
        }
        (ProtectionKind::Signature, Protection::Signature { crypto, private_key, identity }) => {
            let digest = sha256(&buf.as_slice()[HEADER_LEN..]);
            let value = crypto.sign(private_key, &digest)?;
            writer::write_signature_attr(&mut buf, &SignatureAttr::new(*identity, value))?;
        }
        _ => return Err(EncodeError::MissingKey(subtype)),
    }

    let len = u16::try_from(buf.bytes_written()).map_err(|_| EncodeError::BufferTooSmall)?;
    header::set_be_u16(buf.as_mut_slice(), header::LENGTH_OFFSET, len);
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            ie,
            key::Challenge,
            test_util::{self, FakeEcCrypto},
        },
        assert_matches::assert_matches,
        test_case::test_case,
    };

    const KCK: [u8; 16] = [0x11; 16];

    fn unicast_request() -> UnicastKeyRequest {
        UnicastKeyRequest {
            flags: WaiFlags(0),
            bkid: [0xB1; 16],
            uskid: 1,
            addid: test_util::addid(),
            ae_challenge: [0xAE; 32],
        }
    }

    #[test]
    fn unicast_request_round_trip() {
        let msg = Message::UnicastKeyRequest(unicast_request());
        let bytes = encode(&msg, 7, &Protection::None, 32000).expect("error encoding");
        assert_eq!(bytes.len(), HEADER_LEN + 1 + 16 + 1 + 12 + 32);
        let frame = decode(&bytes[..]).expect("error decoding");
        assert_eq!(frame.message, msg);
        assert_eq!(frame.header.packet_seq, 7);
        assert_eq!(frame.header.length as usize, bytes.len());
    }

    #[test]
    fn unicast_response_round_trip() {
        let ie = ie::gen_ie(&test_util::psk_config().auth).to_bytes().expect("error writing IE");
        let mut msg = UnicastKeyResponse {
            flags: WaiFlags(0x10),
            bkid: [0xB1; 16],
            uskid: 0,
            addid: test_util::addid(),
            asue_challenge: [0x01; 32],
            ae_challenge: [0x02; 32],
            wapi_ie: &ie[..],
            mac: [0; 20],
        };
        let bytes = encode(&Message::UnicastKeyResponse(msg), 1, &Protection::Mac { kck: &KCK }, 32000)
            .expect("error encoding");
        let frame = decode(&bytes[..]).expect("error decoding");
        msg.mac = compute_mac(&KCK, &bytes[HEADER_LEN..bytes.len() - 20]).expect("mac");
        assert_eq!(frame.message, Message::UnicastKeyResponse(msg));
        assert_eq!(frame.mac_input(), &bytes[HEADER_LEN..bytes.len() - 20]);
    }

    #[test]
    fn multicast_response_round_trip() {
        let mut msg = MulticastKeyResponse {
            flags: WaiFlags(0),
            mskid: 1,
            uskid: 0,
            addid: test_util::addid(),
            announcement_id: [0x5C; 16],
            mac: [0; 20],
        };
        let bytes = encode(&Message::MulticastKeyResponse(msg), 3, &Protection::Mac { kck: &KCK }, 32000)
            .expect("error encoding");
        assert_eq!(bytes.len(), HEADER_LEN + 1 + 1 + 1 + 12 + 16 + 20);
        msg.mac = compute_mac(&KCK, &bytes[HEADER_LEN..bytes.len() - 20]).expect("mac");
        assert_eq!(decode(&bytes[..]).expect("error decoding").message, Message::MulticastKeyResponse(msg));
    }

    #[test]
    fn multicast_announce_round_trip() {
        let key_data = [0x3C; 16];
        let mut msg = MulticastKeyAnnounce {
            flags: WaiFlags(0),
            mskid: 1,
            uskid: 0,
            addid: test_util::addid(),
            data_seq: [0x5C; 16],
            announcement_id: [0x00; 16],
            key_data: &key_data[..],
            mac: [0; 20],
        };
        let bytes =
            write_frame(&Message::MulticastKeyAnnounce(msg), 3, &Protection::Mac { kck: &KCK }, 32000)
                .expect("error encoding");
        msg.mac = compute_mac(&KCK, &bytes[HEADER_LEN..bytes.len() - 20]).expect("mac");
        assert_eq!(decode(&bytes[..]).expect("error decoding").message, Message::MulticastKeyAnnounce(msg));
    }

    #[test]
    fn access_auth_request_round_trip() {
        let crypto = FakeEcCrypto::new(test_util::ASUE_PRIVATE_KEY);
        let public_key = test_util::fake_public_key(&test_util::ASUE_PRIVATE_KEY[..]);
        let cert = test_util::asue_certificate();
        let identity = [0x1Du8; 20];
        let asue_identity = [0x2Au8; 24];
        let asu_list = [0x99u8; 5];
        let mut flags = WaiFlags(0);
        flags.set_optional_field(true);
        let mut msg = AccessAuthRequest {
            flags,
            auth_id: [0xA1; 32],
            asue_challenge: [0xC1; 32],
            asue_key_data: &public_key[..],
            ae_identity: Tlv::new(tlv::IDENTITY_X509, &identity[..]),
            asue_certificate: Tlv::new(tlv::CERTIFICATE_X509, &cert[..]),
            ecdh_params: Tlv::ecdh_params(),
            asu_identity_list: Some(Tlv::new(3, &asu_list[..])),
            signature: None,
        };
        let protection = Protection::Signature {
            crypto: &crypto,
            private_key: &test_util::ASUE_PRIVATE_KEY[..],
            identity: Tlv::new(tlv::IDENTITY_X509, &asue_identity[..]),
        };
        let bytes = encode(&Message::AccessAuthRequest(msg), 2, &protection, 32000)
            .expect("error encoding");
        let frame = decode(&bytes[..]).expect("error decoding");
        let signature = match frame.message {
            Message::AccessAuthRequest(AccessAuthRequest { signature: Some(signature), .. }) => {
                signature
            }
            other => panic!("unexpected message: {:?}", other),
        };
        assert_eq!(signature.identity.value, &asue_identity[..]);
        let digest = sha256(frame.signed_input(&signature));
        assert!(crypto.verify(&public_key[..], &digest, &signature.value));
        assert_eq!(&bytes[bytes.len() - 48..], &signature.value[..]);

        msg.signature = Some(signature);
        assert_eq!(frame.message, Message::AccessAuthRequest(msg));
    }

    fn access_auth_response_bytes(server_signatures: usize) -> Vec<u8> {
        let cert = test_util::asue_certificate();
        let mut flags = WaiFlags(0);
        flags.set_optional_field(server_signatures > 0);
        let challenge: Challenge = [0xC1; 32];
        let mcvr = Mcvr {
            raw: &[],
            asue_challenge: challenge,
            ae_challenge: [0xC2; 32],
            asue_result: 0,
            asue_certificate: Tlv::new(1, &cert[..]),
            ae_result: 0,
            ae_certificate: Tlv::new(1, &cert[..]),
        };
        let server_sig = SignatureAttr::new(Tlv::new(1, &[0x77; 8][..]), [0x55; 48]);
        let verification = match server_signatures {
            0 => None,
            1 => Some(CertVerification { mcvr, server_signature_asue: server_sig, server_signature_ae: None }),
            _ => Some(CertVerification {
                mcvr,
                server_signature_asue: server_sig,
                server_signature_ae: Some(SignatureAttr::new(Tlv::new(1, &[0x78; 8][..]), [0x56; 48])),
            }),
        };
        let msg = AccessAuthResponse {
            flags,
            asue_challenge: challenge,
            ae_challenge: [0xC2; 32],
            access_result: 0,
            asue_key_data: &[0x04, 1, 1][..],
            ae_key_data: &[0x04, 2, 2][..],
            ae_identity: Tlv::new(1, &[0xAE; 10][..]),
            asue_identity: Tlv::new(1, &[0xA5; 10][..]),
            verification,
            signature: None,
        };
        let crypto = FakeEcCrypto::new(test_util::AE_PRIVATE_KEY);
        let protection = Protection::Signature {
            crypto: &crypto,
            private_key: &test_util::AE_PRIVATE_KEY[..],
            identity: Tlv::new(1, &[0xAE; 10][..]),
        };
        write_frame(&Message::AccessAuthResponse(msg), 1, &protection, 32000)
            .expect("error encoding")
    }

    #[test_case(0, false, false)]
    #[test_case(1, true, false)]
    #[test_case(2, true, true)]
    fn access_auth_response_signatures(server_signatures: usize, mcvr: bool, server_ae: bool) {
        let bytes = access_auth_response_bytes(server_signatures);
        let frame = decode(&bytes[..]).expect("error decoding");
        let resp = match frame.message {
            Message::AccessAuthResponse(resp) => resp,
            other => panic!("unexpected message: {:?}", other),
        };
        assert_eq!(resp.verification.is_some(), mcvr);
        assert_eq!(
            resp.verification.map(|v| v.server_signature_ae.is_some()).unwrap_or(false),
            server_ae
        );
        // The AE's signature is always the last attribute.
        let signature = resp.signature.expect("AE signature missing");
        assert_eq!(signature.identity.value, &[0xAE; 10][..]);
        assert_eq!(&bytes[bytes.len() - 48..], &signature.value[..]);
        if let Some(verification) = resp.verification {
            assert_eq!(verification.server_signature_asue.value, [0x55; 48]);
            assert_eq!(verification.mcvr.raw[0], 2);
            assert_eq!(verification.mcvr.raw.len(), 3 + verification.mcvr.body_len());
        }
    }

    #[test]
    fn access_auth_response_missing_ae_signature() {
        let bytes = access_auth_response_bytes(1);
        // Drop the AE signature and fix up the length.
        let sig_len = 3 + 4 + 10 + 18 + 2 + 48;
        let mut truncated = bytes[..bytes.len() - sig_len].to_vec();
        let len = truncated.len() as u16;
        header::set_be_u16(&mut truncated[..], header::LENGTH_OFFSET, len);
        assert_matches!(decode(&truncated[..]), Err(DecodeError::Malformed(_)));
    }

    #[test]
    fn auth_activation_round_trip() {
        let cert = test_util::ae_certificate();
        let asu = [0x42u8; 12];
        let msg = AuthActivation {
            flags: WaiFlags(0),
            auth_id: [0xA1; 32],
            asu_identity: Tlv::new(tlv::IDENTITY_X509, &asu[..]),
            ae_certificate: Tlv::new(tlv::CERTIFICATE_X509, &cert[..]),
            ecdh_params: Tlv::ecdh_params(),
        };
        assert_matches!(
            encode(&Message::AuthActivation(msg), 1, &Protection::None, 32000),
            Err(EncodeError::UnsupportedSubtype(Subtype::AuthActivation))
        );
        let bytes = write_frame(&Message::AuthActivation(msg), 1, &Protection::None, 32000)
            .expect("error encoding");
        assert_eq!(decode(&bytes[..]).expect("error decoding").message, Message::AuthActivation(msg));
    }

    #[test]
    fn mac_subtype_without_key() {
        let msg = Message::MulticastKeyResponse(MulticastKeyResponse {
            flags: WaiFlags(0),
            mskid: 0,
            uskid: 0,
            addid: test_util::addid(),
            announcement_id: [0; 16],
            mac: [0; 20],
        });
        assert_matches!(
            encode(&msg, 1, &Protection::None, 32000),
            Err(EncodeError::MissingKey(Subtype::MulticastKeyStakeyAnnounceResponse))
        );
    }

    #[test]
    fn buffer_bound() {
        let msg = Message::UnicastKeyRequest(unicast_request());
        assert_matches!(encode(&msg, 1, &Protection::None, 40), Err(EncodeError::BufferTooSmall));
        assert!(encode(&msg, 1, &Protection::None, 74).is_ok());
    }

    #[test]
    fn truncated_frames() {
        let bytes = encode(&Message::UnicastKeyRequest(unicast_request()), 1, &Protection::None, 32000)
            .expect("error encoding");
        for len in [0, 5, HEADER_LEN, HEADER_LEN + 20, bytes.len() - 1] {
            let mut truncated = bytes[..len].to_vec();
            if len >= HEADER_LEN {
                header::set_be_u16(&mut truncated[..], header::LENGTH_OFFSET, len as u16);
            }
            assert_matches!(decode(&truncated[..]), Err(DecodeError::TooShort));
        }
    }

    #[test]
    fn length_mismatch() {
        let mut bytes = encode(&Message::UnicastKeyRequest(unicast_request()), 1, &Protection::None, 32000)
            .expect("error encoding");
        bytes.push(0);
        assert_matches!(decode(&bytes[..]), Err(DecodeError::LengthMismatch { header: 74, actual: 75 }));
    }

    #[test]
    fn trailing_bytes() {
        let mut bytes = encode(&Message::UnicastKeyRequest(unicast_request()), 1, &Protection::None, 32000)
            .expect("error encoding");
        bytes.push(0);
        header::set_be_u16(&mut bytes[..], header::LENGTH_OFFSET, 75);
        assert_matches!(decode(&bytes[..]), Err(DecodeError::TrailingBytes(1)));
    }

    #[test_case(1, DecodeError::UnsupportedSubtype(Subtype::PreAuthStart))]
    #[test_case(2, DecodeError::UnsupportedSubtype(Subtype::StakeyRequest))]
    #[test_case(6, DecodeError::UnsupportedSubtype(Subtype::CertAuthRequest))]
    #[test_case(7, DecodeError::UnsupportedSubtype(Subtype::CertAuthResponse))]
    #[test_case(0, DecodeError::UnknownSubtype(0))]
    #[test_case(13, DecodeError::UnknownSubtype(13))]
    fn unsupported_subtypes(subtype: u8, expected: DecodeError) {
        let mut hdr = WaiHeader::new(Subtype::AuthActivation, 1);
        hdr.subtype = subtype;
        hdr.length = (HEADER_LEN + 4) as u16;
        let mut bytes = vec![];
        hdr.write_into(&mut bytes).expect("error writing header");
        bytes.extend_from_slice(&[0; 4]);
        assert_eq!(decode(&bytes[..]), Err(expected));
    }

    #[test]
    fn fragment_is_not_decoded() {
        let mut bytes = encode(&Message::UnicastKeyRequest(unicast_request()), 1, &Protection::None, 32000)
            .expect("error encoding");
        bytes[header::FLAG_OFFSET] = header::MORE_FRAGMENTS;
        assert_matches!(decode(&bytes[..]), Err(DecodeError::InvalidHeader(_)));
    }

    #[test]
    fn confirm_with_bad_ie_id() {
        let ie = [0x30, 0x02, 0x01, 0x00];
        let msg = Message::UnicastKeyConfirm(UnicastKeyConfirm {
            flags: WaiFlags(0),
            bkid: [0; 16],
            uskid: 0,
            addid: test_util::addid(),
            asue_challenge: [0; 32],
            wapi_ie: &ie[..],
            mac: [0; 20],
        });
        let bytes = write_frame(&msg, 1, &Protection::Mac { kck: &KCK }, 32000).expect("error encoding");
        assert_matches!(decode(&bytes[..]), Err(DecodeError::MalformedIe(_)));
    }
}
