// Copyright 2023 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! WAI message bodies. Variable length fields borrow from the decoded frame.

use {
    super::{header::WaiFlags, tlv::Tlv, DecodeError, Subtype},
    crate::{
        buffer_reader::BufferReader,
        crypto::{Signature, SIGNATURE_LEN},
        ie::Bkid,
        kdf::MAC_LEN,
        key::{Challenge, CHALLENGE_LEN},
        mac::AddId,
    },
};

pub const AUTH_ID_LEN: usize = 32;
pub const ANNOUNCEMENT_ID_LEN: usize = 16;

pub type AuthId = [u8; AUTH_ID_LEN];
pub type AnnouncementId = [u8; ANNOUNCEMENT_ID_LEN];
pub type MacField = [u8; MAC_LEN];

pub const SIGNATURE_ATTR_TYPE: u8 = 1;
pub const MCVR_ATTR_TYPE: u8 = 2;

/// Length-prefixed signature algorithm block: SHA-256, ECDSA, OID parameter naming the
/// 192-bit WAPI curve.
pub const SIGNATURE_ALGORITHM: [u8; 18] = [
    0x00, 0x10, 0x01, 0x01, 0x01, 0x00, 0x0B, 0x06, 0x09, 0x2A, 0x81, 0x1C, 0xD7, 0x63, 0x01,
    0x01, 0x02, 0x01,
];

/// Result code of a successful certificate verification or access authentication.
pub const RESULT_SUCCESS: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureAttr<'a> {
    pub identity: Tlv<'a>,
    /// Algorithm block including its length prefix.
    pub algorithm: &'a [u8],
    pub value: Signature,
}

impl<'a> SignatureAttr<'a> {
    pub fn new(identity: Tlv<'a>, value: Signature) -> Self {
        Self { identity, algorithm: &SIGNATURE_ALGORITHM[..], value }
    }

    /// Length of the attribute body following the type and length fields.
    pub fn body_len(&self) -> usize {
        self.identity.len() + self.algorithm.len() + 2 + SIGNATURE_LEN
    }

    /// Length of the attribute on the wire.
    pub fn len(&self) -> usize {
        3 + self.body_len()
    }

    fn parse(rdr: &mut BufferReader<'a>) -> Result<Self, DecodeError> {
        let type_ = rdr.read_u8()?;
        if type_ != SIGNATURE_ATTR_TYPE {
            return Err(DecodeError::Malformed("expected signature attribute"));
        }
        let len = rdr.read_be_u16()? as usize;
        let mut attr = BufferReader::new(rdr.read_bytes(len)?);
        let identity = Tlv::parse(&mut attr)?;
        let alg_start = attr.remaining();
        let alg_len = attr.read_be_u16()? as usize;
        attr.read_bytes(alg_len)?;
        let algorithm = &alg_start[..2 + alg_len];
        let sig_len = attr.read_be_u16()? as usize;
        if sig_len != SIGNATURE_LEN {
            return Err(DecodeError::Malformed("unexpected signature length"));
        }
        let value = attr.read_array::<SIGNATURE_LEN>()?;
        if !attr.is_empty() {
            return Err(DecodeError::Malformed("trailing bytes in signature attribute"));
        }
        Ok(Self { identity, algorithm, value })
    }
}

/// Multicast certificate verification result, signed by the authentication server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mcvr<'a> {
    /// The attribute as it appeared on the wire, covered by the server's signatures.
    pub raw: &'a [u8],
    pub asue_challenge: Challenge,
    pub ae_challenge: Challenge,
    pub asue_result: u8,
    pub asue_certificate: Tlv<'a>,
    pub ae_result: u8,
    pub ae_certificate: Tlv<'a>,
}

impl<'a> Mcvr<'a> {
    pub fn body_len(&self) -> usize {
        2 * CHALLENGE_LEN + 1 + self.asue_certificate.len() + 1 + self.ae_certificate.len()
    }

    fn parse(rdr: &mut BufferReader<'a>) -> Result<Self, DecodeError> {
        let start = rdr.remaining();
        let type_ = rdr.read_u8()?;
        if type_ != MCVR_ATTR_TYPE {
            return Err(DecodeError::Malformed("expected certificate verification result"));
        }
        let len = rdr.read_be_u16()? as usize;
        let mut attr = BufferReader::new(rdr.read_bytes(len)?);
        let mcvr = Self {
            raw: &start[..3 + len],
            asue_challenge: attr.read_array()?,
            ae_challenge: attr.read_array()?,
            asue_result: attr.read_u8()?,
            asue_certificate: Tlv::parse(&mut attr)?,
            ae_result: attr.read_u8()?,
            ae_certificate: Tlv::parse(&mut attr)?,
        };
        if !attr.is_empty() {
            return Err(DecodeError::Malformed("trailing bytes in verification result"));
        }
        Ok(mcvr)
    }
}

/// The authentication server's verdict, present when the optional field flag is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CertVerification<'a> {
    pub mcvr: Mcvr<'a>,
    /// Server signature addressed to the ASUE.
    pub server_signature_asue: SignatureAttr<'a>,
    /// Server signature addressed to the AE, when the server produced two.
    pub server_signature_ae: Option<SignatureAttr<'a>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthActivation<'a> {
    pub flags: WaiFlags,
    pub auth_id: AuthId,
    pub asu_identity: Tlv<'a>,
    pub ae_certificate: Tlv<'a>,
    pub ecdh_params: Tlv<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessAuthRequest<'a> {
    pub flags: WaiFlags,
    pub auth_id: AuthId,
    pub asue_challenge: Challenge,
    pub asue_key_data: &'a [u8],
    pub ae_identity: Tlv<'a>,
    pub asue_certificate: Tlv<'a>,
    pub ecdh_params: Tlv<'a>,
    pub asu_identity_list: Option<Tlv<'a>>,
    /// Present on decode. The encoder always computes a fresh signature.
    pub signature: Option<SignatureAttr<'a>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessAuthResponse<'a> {
    pub flags: WaiFlags,
    pub asue_challenge: Challenge,
    pub ae_challenge: Challenge,
    pub access_result: u8,
    pub asue_key_data: &'a [u8],
    pub ae_key_data: &'a [u8],
    pub ae_identity: Tlv<'a>,
    pub asue_identity: Tlv<'a>,
    pub verification: Option<CertVerification<'a>>,
    /// The AE's signature. Present on decode. The encoder always computes a fresh one.
    pub signature: Option<SignatureAttr<'a>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnicastKeyRequest {
    pub flags: WaiFlags,
    pub bkid: Bkid,
    pub uskid: u8,
    pub addid: AddId,
    pub ae_challenge: Challenge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnicastKeyResponse<'a> {
    pub flags: WaiFlags,
    pub bkid: Bkid,
    pub uskid: u8,
    pub addid: AddId,
    pub asue_challenge: Challenge,
    pub ae_challenge: Challenge,
    /// The ASUE's WAPI IE, element ID and length included.
    pub wapi_ie: &'a [u8],
    pub mac: MacField,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnicastKeyConfirm<'a> {
    pub flags: WaiFlags,
    pub bkid: Bkid,
    pub uskid: u8,
    pub addid: AddId,
    pub asue_challenge: Challenge,
    /// The AE's WAPI IE, element ID and length included.
    pub wapi_ie: &'a [u8],
    pub mac: MacField,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MulticastKeyAnnounce<'a> {
    pub flags: WaiFlags,
    pub mskid: u8,
    pub uskid: u8,
    pub addid: AddId,
    pub data_seq: [u8; 16],
    pub announcement_id: AnnouncementId,
    /// Notification master key wrapped with the KEK.
    pub key_data: &'a [u8],
    pub mac: MacField,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MulticastKeyResponse {
    pub flags: WaiFlags,
    pub mskid: u8,
    pub uskid: u8,
    pub addid: AddId,
    pub announcement_id: AnnouncementId,
    pub mac: MacField,
}

/// A WAI message body, one variant per subtype this station handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message<'a> {
    AuthActivation(AuthActivation<'a>),
    AccessAuthRequest(AccessAuthRequest<'a>),
    AccessAuthResponse(AccessAuthResponse<'a>),
    UnicastKeyRequest(UnicastKeyRequest),
    UnicastKeyResponse(UnicastKeyResponse<'a>),
    UnicastKeyConfirm(UnicastKeyConfirm<'a>),
    MulticastKeyAnnounce(MulticastKeyAnnounce<'a>),
    MulticastKeyResponse(MulticastKeyResponse),
}

/// Integrity protection a message carries at its tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionKind {
    None,
    Mac,
    Signature,
}

impl<'a> Message<'a> {
    pub fn subtype(&self) -> Subtype {
        match self {
            Message::AuthActivation(_) => Subtype::AuthActivation,
            Message::AccessAuthRequest(_) => Subtype::AccessAuthRequest,
            Message::AccessAuthResponse(_) => Subtype::AccessAuthResponse,
            Message::UnicastKeyRequest(_) => Subtype::UnicastKeyNegotiationRequest,
            Message::UnicastKeyResponse(_) => Subtype::UnicastKeyNegotiationResponse,
            Message::UnicastKeyConfirm(_) => Subtype::UnicastKeyNegotiationConfirm,
            Message::MulticastKeyAnnounce(_) => Subtype::MulticastKeyStakeyAnnounce,
            Message::MulticastKeyResponse(_) => Subtype::MulticastKeyStakeyAnnounceResponse,
        }
    }

    pub fn protection_kind(&self) -> ProtectionKind {
        match self {
            Message::AuthActivation(_) | Message::UnicastKeyRequest(_) => ProtectionKind::None,
            Message::AccessAuthRequest(_) | Message::AccessAuthResponse(_) => {
                ProtectionKind::Signature
            }
            Message::UnicastKeyResponse(_)
            | Message::UnicastKeyConfirm(_)
            | Message::MulticastKeyAnnounce(_)
            | Message::MulticastKeyResponse(_) => ProtectionKind::Mac,
        }
    }

    pub(crate) fn parse(
        subtype: Subtype,
        rdr: &mut BufferReader<'a>,
    ) -> Result<Self, DecodeError> {
        match subtype {
            Subtype::AuthActivation => parse_auth_activation(rdr),
            Subtype::AccessAuthRequest => parse_access_auth_request(rdr),
            Subtype::AccessAuthResponse => parse_access_auth_response(rdr),
            Subtype::UnicastKeyNegotiationRequest => parse_unicast_key_request(rdr),
            Subtype::UnicastKeyNegotiationResponse => parse_unicast_key_response(rdr),
            Subtype::UnicastKeyNegotiationConfirm => parse_unicast_key_confirm(rdr),
            Subtype::MulticastKeyStakeyAnnounce => parse_multicast_key_announce(rdr),
            Subtype::MulticastKeyStakeyAnnounceResponse => parse_multicast_key_response(rdr),
            Subtype::PreAuthStart
            | Subtype::StakeyRequest
            | Subtype::CertAuthRequest
            | Subtype::CertAuthResponse => Err(DecodeError::UnsupportedSubtype(subtype)),
        }
    }
}

fn read_flags(rdr: &mut BufferReader<'_>) -> Result<WaiFlags, DecodeError> {
    Ok(WaiFlags(rdr.read_u8()?))
}

fn read_key_data<'a>(rdr: &mut BufferReader<'a>) -> Result<&'a [u8], DecodeError> {
    let len = rdr.read_u8()? as usize;
    Ok(rdr.read_bytes(len)?)
}

fn read_wapi_ie<'a>(rdr: &mut BufferReader<'a>) -> Result<&'a [u8], DecodeError> {
    let start = rdr.remaining();
    if rdr.read_u8()? != crate::ie::ID {
        return Err(DecodeError::MalformedIe("unexpected element ID"));
    }
    let len = rdr.read_u8()? as usize;
    rdr.read_bytes(len)?;
    Ok(&start[..2 + len])
}

fn parse_auth_activation<'a>(rdr: &mut BufferReader<'a>) -> Result<Message<'a>, DecodeError> {
    Ok(Message::AuthActivation(AuthActivation {
        flags: read_flags(rdr)?,
        auth_id: rdr.read_array()?,
        asu_identity: Tlv::parse(rdr)?,
        ae_certificate: Tlv::parse(rdr)?,
        ecdh_params: Tlv::parse_short(rdr)?,
    }))
}

fn parse_access_auth_request<'a>(rdr: &mut BufferReader<'a>) -> Result<Message<'a>, DecodeError> {
    let flags = read_flags(rdr)?;
    let auth_id = rdr.read_array()?;
    let asue_challenge = rdr.read_array()?;
    let asue_key_data = read_key_data(rdr)?;
    let ae_identity = Tlv::parse(rdr)?;
    let asue_certificate = Tlv::parse(rdr)?;
    let ecdh_params = Tlv::parse_short(rdr)?;
    let asu_identity_list =
        if flags.optional_field() { Some(Tlv::parse(rdr)?) } else { None };
    let signature = Some(SignatureAttr::parse(rdr)?);
    Ok(Message::AccessAuthRequest(AccessAuthRequest {
        flags,
        auth_id,
        asue_challenge,
        asue_key_data,
        ae_identity,
        asue_certificate,
        ecdh_params,
        asu_identity_list,
        signature,
    }))
}

fn parse_access_auth_response<'a>(
    rdr: &mut BufferReader<'a>,
) -> Result<Message<'a>, DecodeError> {
    let flags = read_flags(rdr)?;
    let asue_challenge = rdr.read_array()?;
    let ae_challenge = rdr.read_array()?;
    let access_result = rdr.read_u8()?;
    let asue_key_data = read_key_data(rdr)?;
    let ae_key_data = read_key_data(rdr)?;
    let ae_identity = Tlv::parse(rdr)?;
    let asue_identity = Tlv::parse(rdr)?;

    let (verification, signature) = if flags.optional_field() {
        let mcvr = Mcvr::parse(rdr)?;
        // The server's signatures and the AE's signature trail the verification result.
        // Two signatures mean the server signed once; three mean it signed for each peer.
        let mut signatures = vec![];
        while !rdr.is_empty() {
            signatures.push(SignatureAttr::parse(rdr)?);
        }
        match signatures[..] {
            [server_signature_asue, signature] => (
                Some(CertVerification { mcvr, server_signature_asue, server_signature_ae: None }),
                signature,
            ),
            [server_signature_asue, server_signature_ae, signature] => (
                Some(CertVerification {
                    mcvr,
                    server_signature_asue,
                    server_signature_ae: Some(server_signature_ae),
                }),
                signature,
            ),
            _ => return Err(DecodeError::Malformed("unexpected number of signatures")),
        }
    } else {
        (None, SignatureAttr::parse(rdr)?)
    };

    Ok(Message::AccessAuthResponse(AccessAuthResponse {
        flags,
        asue_challenge,
        ae_challenge,
        access_result,
        asue_key_data,
        ae_key_data,
        ae_identity,
        asue_identity,
        verification,
        signature: Some(signature),
    }))
}

fn parse_unicast_key_request<'a>(rdr: &mut BufferReader<'a>) -> Result<Message<'a>, DecodeError> {
    Ok(Message::UnicastKeyRequest(UnicastKeyRequest {
        flags: read_flags(rdr)?,
        bkid: rdr.read_array()?,
        uskid: rdr.read_u8()?,
        addid: rdr.read_array()?,
        ae_challenge: rdr.read_array()?,
    }))
}

fn parse_unicast_key_response<'a>(
    rdr: &mut BufferReader<'a>,
) -> Result<Message<'a>, DecodeError> {
    Ok(Message::UnicastKeyResponse(UnicastKeyResponse {
        flags: read_flags(rdr)?,
        bkid: rdr.read_array()?,
        uskid: rdr.read_u8()?,
        addid: rdr.read_array()?,
        asue_challenge: rdr.read_array()?,
        ae_challenge: rdr.read_array()?,
        wapi_ie: read_wapi_ie(rdr)?,
        mac: rdr.read_array()?,
    }))
}

fn parse_unicast_key_confirm<'a>(rdr: &mut BufferReader<'a>) -> Result<Message<'a>, DecodeError> {
    Ok(Message::UnicastKeyConfirm(UnicastKeyConfirm {
        flags: read_flags(rdr)?,
        bkid: rdr.read_array()?,
        uskid: rdr.read_u8()?,
        addid: rdr.read_array()?,
        asue_challenge: rdr.read_array()?,
        wapi_ie: read_wapi_ie(rdr)?,
        mac: rdr.read_array()?,
    }))
}

fn parse_multicast_key_announce<'a>(
    rdr: &mut BufferReader<'a>,
) -> Result<Message<'a>, DecodeError> {
    Ok(Message::MulticastKeyAnnounce(MulticastKeyAnnounce {
        flags: read_flags(rdr)?,
        mskid: rdr.read_u8()?,
        uskid: rdr.read_u8()?,
        addid: rdr.read_array()?,
        data_seq: rdr.read_array()?,
        announcement_id: rdr.read_array()?,
        key_data: read_key_data(rdr)?,
        mac: rdr.read_array()?,
    }))
}

fn parse_multicast_key_response<'a>(
    rdr: &mut BufferReader<'a>,
) -> Result<Message<'a>, DecodeError> {
    Ok(Message::MulticastKeyResponse(MulticastKeyResponse {
        flags: read_flags(rdr)?,
        mskid: rdr.read_u8()?,
        uskid: rdr.read_u8()?,
        addid: rdr.read_array()?,
        announcement_id: rdr.read_array()?,
        mac: rdr.read_array()?,
    }))
}
