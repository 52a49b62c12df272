// Copyright 2023 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Certificate authentication: authentication activation, access authentication request
//! and access authentication response. A successful exchange leaves the session with a
//! base key for the following unicast key negotiation.

use {
    super::{commit_tx, deauthenticate, encode_for_tx, Supplicant},
    crate::{
        credential::{self, Credentials},
        crypto::{sha256, EcCrypto},
        key::{BaseKey, Challenge, CHALLENGE_LEN},
        mac::ReasonCode,
        update::UpdateSink,
        wai::{
            message::RESULT_SUCCESS,
            tlv::{self, Tlv},
            AccessAuthRequest, AccessAuthResponse, AuthActivation, CertVerification, Frame,
            Message, Subtype, WaiFlags,
        },
        x509::Certificate,
        Error,
    },
    log::info,
    rand::RngCore,
    zeroize::Zeroizing,
};

impl Supplicant {
    pub(super) fn on_auth_activation(
        &mut self,
        update_sink: &mut UpdateSink,
        raw: &[u8],
        msg: AuthActivation<'_>,
    ) -> Result<(), Error> {
        if self.config.auth.is_psk() {
            return Err(Error::NoCertificateConfig);
        }
        let session = self.session.as_mut().ok_or(Error::NotAssociated)?;
        if session.credentials.is_none() {
            session.pending_activation = Some(raw.to_vec());
            return self.resume_with_credentials(update_sink);
        }

        if msg.flags.bk_rekeying() {
            if let Some(expected) = session.next_auth_id.as_ref() {
                if expected != &msg.auth_id {
                    return Err(Error::AuthIdMismatch);
                }
            }
        }
        if msg.ecdh_params.value != &tlv::ECDH_CURVE_OID[..] {
            return Err(Error::UnsupportedEcdhParams);
        }
        let ae_cert = Certificate::parse(msg.ae_certificate.value)?;
        if session.ecdh_key_pair.is_none() {
            session.ecdh_key_pair = Some(self.crypto.generate_key_pair()?);
        }
        let mut asue_challenge: Challenge = [0u8; CHALLENGE_LEN];
        self.rng.fill_bytes(&mut asue_challenge[..]);

        let mut flags = WaiFlags(0);
        flags.set_bk_rekeying(msg.flags.bk_rekeying());
        flags.set_cert_auth_request(true);
        let ae_identity = ae_cert.identity();
        let fragments = match (session.credentials.as_ref(), session.ecdh_key_pair.as_ref()) {
            (Some(creds), Some(key_pair)) => {
                let request = Message::AccessAuthRequest(AccessAuthRequest {
                    flags,
                    auth_id: msg.auth_id,
                    asue_challenge,
                    asue_key_data: &key_pair.public_key[..],
                    ae_identity: Tlv::new(tlv::IDENTITY_X509, &ae_identity[..]),
                    asue_certificate: Tlv::new(tlv::CERTIFICATE_X509, &creds.user_cert.raw[..]),
                    ecdh_params: Tlv::ecdh_params(),
                    asu_identity_list: None,
                    signature: None,
                });
                encode_for_tx(session, self.crypto.as_ref(), &self.config, &request)?
            }
            _ => return Err(Error::NoCertificateConfig),
        };
        session.peer_cert = Some(ae_cert);
        session.auth_challenge = Some(asue_challenge);
        commit_tx(session, update_sink, fragments);
        info!("sent access authentication request");
        Ok(())
    }

    /// Fetches the credentials and re-dispatches the activation held meanwhile. The
    /// activation is dropped if the fetch fails.
    fn resume_with_credentials(&mut self, update_sink: &mut UpdateSink) -> Result<(), Error> {
        let session = self.session.as_mut().ok_or(Error::NotAssociated)?;
        let pending = session.pending_activation.take();
        let credentials =
            credential::fetch_credentials(self.credential_store.as_ref(), &self.config.auth)?;
        session.credentials = Some(credentials);
        match pending {
            Some(raw) => self.dispatch(update_sink, &raw[..]),
            None => Ok(()),
        }
    }

    pub(super) fn on_access_auth_response(
        &mut self,
        update_sink: &mut UpdateSink,
        frame: &Frame<'_>,
        msg: AccessAuthResponse<'_>,
    ) -> Result<(), Error> {
        let session = self.session.as_mut().ok_or(Error::NotAssociated)?;
        let auth_challenge = session
            .auth_challenge
            .ok_or(Error::UnexpectedMessage(Subtype::AccessAuthResponse, session.state))?;
        let creds = session.credentials.as_ref().ok_or(Error::NoCertificateConfig)?;
        let peer_cert = session.peer_cert.as_ref().ok_or(Error::NoPeerCertificate)?;
        let key_pair = session.ecdh_key_pair.as_ref().ok_or(Error::NoPeerCertificate)?;

        let signature =
            msg.signature.as_ref().ok_or(Error::MissingSignature(Subtype::AccessAuthResponse))?;
        let digest = sha256(frame.signed_input(signature));
        if !self.crypto.verify(&peer_cert.public_key[..], &digest, &signature.value) {
            return Err(Error::InvalidSignature(Subtype::AccessAuthResponse));
        }
        if msg.asue_challenge != auth_challenge || msg.asue_key_data != &key_pair.public_key[..] {
            return Err(Error::ChallengeMismatch);
        }
        if let Some(verification) = msg.verification.as_ref() {
            check_verification(
                self.crypto.as_ref(),
                creds,
                peer_cert,
                &auth_challenge,
                &msg.ae_challenge,
                verification,
            )
            .map_err(|e| deauthenticate(update_sink, ReasonCode::UNSPECIFIED_REASON, e))?;
        }
        if msg.access_result != RESULT_SUCCESS {
            return Err(deauthenticate(
                update_sink,
                ReasonCode::UNSPECIFIED_REASON,
                Error::AccessDenied(msg.access_result),
            ));
        }

        let shared_x = Zeroizing::new(self.crypto.ecdh(&key_pair.private_key[..], msg.ae_key_data)?);
        let (bk, next_auth_id) =
            BaseKey::from_ecdh(&shared_x[..], &msg.ae_challenge, &msg.asue_challenge)?;
        session.bk = Some(bk);
        session.next_auth_id = Some(next_auth_id);
        session.ecdh_key_pair = None;
        session.auth_challenge = None;
        info!("certificate authentication succeeded, base key established");
        Ok(())
    }
}

/// Checks the authentication server's verdict on both certificates.
fn check_verification(
    crypto: &dyn EcCrypto,
    creds: &Credentials,
    peer_cert: &Certificate,
    asue_challenge: &Challenge,
    ae_challenge: &Challenge,
    verification: &CertVerification<'_>,
) -> Result<(), Error> {
    let mcvr = &verification.mcvr;
    let digest = sha256(mcvr.raw);
    let server_signature = &verification.server_signature_asue.value;
    if !crypto.verify(&creds.as_cert.public_key[..], &digest, server_signature) {
        return Err(Error::InvalidSignature(Subtype::AccessAuthResponse));
    }
    if &mcvr.asue_challenge != asue_challenge || &mcvr.ae_challenge != ae_challenge {
        return Err(Error::ChallengeMismatch);
    }
    if mcvr.asue_result != RESULT_SUCCESS {
        return Err(Error::CertificateCheck("station certificate rejected"));
    }
    if mcvr.ae_result != RESULT_SUCCESS {
        return Err(Error::CertificateCheck("AE certificate rejected"));
    }
    if mcvr.asue_certificate.value != &creds.user_cert.raw[..] {
        return Err(Error::CertificateCheck("verified station certificate differs"));
    }
    if mcvr.ae_certificate.value != &peer_cert.raw[..] {
        return Err(Error::CertificateCheck("verified AE certificate differs"));
    }
    Ok(())
}
