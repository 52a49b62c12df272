// Copyright 2023 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    super::{
        header::WaiFlags,
        message::{
            AccessAuthRequest, AccessAuthResponse, AuthActivation, CertVerification, Mcvr,
            Message, MulticastKeyAnnounce, MulticastKeyResponse, SignatureAttr,
            UnicastKeyConfirm, UnicastKeyRequest, UnicastKeyResponse, MCVR_ATTR_TYPE,
            SIGNATURE_ATTR_TYPE,
        },
    },
    crate::{
        appendable::{Appendable, BufferTooSmall},
        crypto::SIGNATURE_LEN,
    },
};

fn write_flags<A: Appendable>(buf: &mut A, flags: WaiFlags) -> Result<(), BufferTooSmall> {
    buf.append_byte(flags.value())
}

fn write_key_data<A: Appendable>(buf: &mut A, data: &[u8]) -> Result<(), BufferTooSmall> {
    let len = u8::try_from(data.len()).map_err(|_| BufferTooSmall)?;
    buf.append_byte(len)?;
    buf.append_bytes(data)
}

fn attr_len(len: usize) -> Result<u16, BufferTooSmall> {
    u16::try_from(len).map_err(|_| BufferTooSmall)
}

pub fn write_signature_attr<A: Appendable>(
    buf: &mut A,
    attr: &SignatureAttr<'_>,
) -> Result<(), BufferTooSmall> {
    buf.append_byte(SIGNATURE_ATTR_TYPE)?;
    buf.append_be_u16(attr_len(attr.body_len())?)?;
    attr.identity.write_into(buf)?;
    buf.append_bytes(attr.algorithm)?;
    buf.append_be_u16(SIGNATURE_LEN as u16)?;
    buf.append_bytes(&attr.value[..])
}

/// Writes the verification result from its fields, ignoring `raw`.
pub fn write_mcvr<A: Appendable>(buf: &mut A, mcvr: &Mcvr<'_>) -> Result<(), BufferTooSmall> {
    buf.append_byte(MCVR_ATTR_TYPE)?;
    buf.append_be_u16(attr_len(mcvr.body_len())?)?;
    buf.append_bytes(&mcvr.asue_challenge[..])?;
    buf.append_bytes(&mcvr.ae_challenge[..])?;
    buf.append_byte(mcvr.asue_result)?;
    mcvr.asue_certificate.write_into(buf)?;
    buf.append_byte(mcvr.ae_result)?;
    mcvr.ae_certificate.write_into(buf)
}

fn write_cert_verification<A: Appendable>(
    buf: &mut A,
    verification: &CertVerification<'_>,
) -> Result<(), BufferTooSmall> {
    write_mcvr(buf, &verification.mcvr)?;
    write_signature_attr(buf, &verification.server_signature_asue)?;
    if let Some(server_signature_ae) = verification.server_signature_ae.as_ref() {
        write_signature_attr(buf, server_signature_ae)?;
    }
    Ok(())
}

/// Writes every field of the message body except the trailing MAC or signature.
pub fn write_body<A: Appendable>(buf: &mut A, msg: &Message<'_>) -> Result<(), BufferTooSmall> {
    match msg {
        Message::AuthActivation(AuthActivation {
            flags,
            auth_id,
            asu_identity,
            ae_certificate,
            ecdh_params,
        }) => {
            write_flags(buf, *flags)?;
            buf.append_bytes(&auth_id[..])?;
            asu_identity.write_into(buf)?;
            ae_certificate.write_into(buf)?;
            ecdh_params.write_short_into(buf)
        }
        Message::AccessAuthRequest(AccessAuthRequest {
            flags,
            auth_id,
            asue_challenge,
            asue_key_data,
            ae_identity,
            asue_certificate,
            ecdh_params,
            asu_identity_list,
            signature: _,
        }) => {
            write_flags(buf, *flags)?;
            buf.append_bytes(&auth_id[..])?;
            buf.append_bytes(&asue_challenge[..])?;
            write_key_data(buf, asue_key_data)?;
            ae_identity.write_into(buf)?;
            asue_certificate.write_into(buf)?;
            ecdh_params.write_short_into(buf)?;
            if let Some(list) = asu_identity_list.as_ref() {
                list.write_into(buf)?;
            }
            Ok(())
        }
        Message::AccessAuthResponse(AccessAuthResponse {
            flags,
            asue_challenge,
            ae_challenge,
            access_result,
            asue_key_data,
            ae_key_data,
            ae_identity,
            asue_identity,
            verification,
            signature: _,
        }) => {
            write_flags(buf, *flags)?;
            buf.append_bytes(&asue_challenge[..])?;
            buf.append_bytes(&ae_challenge[..])?;
            buf.append_byte(*access_result)?;
            write_key_data(buf, asue_key_data)?;
            write_key_data(buf, ae_key_data)?;
            ae_identity.write_into(buf)?;
            asue_identity.write_into(buf)?;
            if let Some(verification) = verification.as_ref() {
                write_cert_verification(buf, verification)?;
            }
            Ok(())
        }
        Message::UnicastKeyRequest(UnicastKeyRequest {
            flags,
            bkid,
            uskid,
            addid,
            ae_challenge,
        }) => {
            write_flags(buf, *flags)?;
            buf.append_bytes(&bkid[..])?;
            buf.append_byte(*uskid)?;
            buf.append_bytes(&addid[..])?;
            buf.append_bytes(&ae_challenge[..])
        }
        Message::UnicastKeyResponse(UnicastKeyResponse {
            flags,
            bkid,
            uskid,
            addid,
            asue_challenge,
            ae_challenge,
            wapi_ie,
            mac: _,
        }) => {
            write_flags(buf, *flags)?;
            buf.append_bytes(&bkid[..])?;
            buf.append_byte(*uskid)?;
            buf.append_bytes(&addid[..])?;
            buf.append_bytes(&asue_challenge[..])?;
            buf.append_bytes(&ae_challenge[..])?;
            buf.append_bytes(wapi_ie)
        }
        Message::UnicastKeyConfirm(UnicastKeyConfirm {
            flags,
            bkid,
            uskid,
            addid,
            asue_challenge,
            wapi_ie,
            mac: _,
        }) => {
            write_flags(buf, *flags)?;
            buf.append_bytes(&bkid[..])?;
            buf.append_byte(*uskid)?;
            buf.append_bytes(&addid[..])?;
            buf.append_bytes(&asue_challenge[..])?;
            buf.append_bytes(wapi_ie)
        }
        Message::MulticastKeyAnnounce(MulticastKeyAnnounce {
            flags,
            mskid,
            uskid,
            addid,
            data_seq,
            announcement_id,
            key_data,
            mac: _,
        }) => {
            write_flags(buf, *flags)?;
            buf.append_byte(*mskid)?;
            buf.append_byte(*uskid)?;
            buf.append_bytes(&addid[..])?;
            buf.append_bytes(&data_seq[..])?;
            buf.append_bytes(&announcement_id[..])?;
            write_key_data(buf, key_data)
        }
        Message::MulticastKeyResponse(MulticastKeyResponse {
            flags,
            mskid,
            uskid,
            addid,
            announcement_id,
            mac: _,
        }) => {
            write_flags(buf, *flags)?;
            buf.append_byte(*mskid)?;
            buf.append_byte(*uskid)?;
            buf.append_bytes(&addid[..])?;
            buf.append_bytes(&announcement_id[..])
        }
    }
}
