// Copyright 2023 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    super::{commit_tx, deauthenticate, encode_for_tx, State, Supplicant},
    crate::{
        config::AuthConfig,
        kdf::{verify_mac, MAC_LEN},
        key::{BaseKey, Challenge, KeyAlg, KeyConfig, Usk, CHALLENGE_LEN},
        mac::{addid, ReasonCode},
        update::{SecAssocUpdate, UpdateSink},
        wai::{Frame, Message, Subtype, UnicastKeyConfirm, UnicastKeyRequest, UnicastKeyResponse},
        Error,
    },
    log::info,
    rand::RngCore,
};

impl Supplicant {
    pub(super) fn on_unicast_key_request(
        &mut self,
        update_sink: &mut UpdateSink,
        msg: UnicastKeyRequest,
    ) -> Result<(), Error> {
        let own_ie = self.own_ie()?;
        let session = self.session.as_mut().ok_or(Error::NotAssociated)?;
        if msg.addid != addid(&session.bssid, &self.own_addr) {
            return Err(Error::AddidMismatch);
        }
        if session.bk.is_none() {
            match &self.config.auth {
                AuthConfig::Psk { key_type, key } => {
                    session.bk = Some(BaseKey::from_psk(*key_type, key)?);
                }
                // The base key comes from the access authentication.
                AuthConfig::Certificate { .. } => return Err(Error::NoBaseKey),
            }
        }
        let bk = session.bk.as_ref().ok_or(Error::NoBaseKey)?;
        if bk.bkid(&msg.addid)? != msg.bkid {
            return Err(Error::BkidMismatch);
        }
        if msg.flags.usk_rekeying() {
            if let Some(expected) = session.next_ae_challenge.as_ref() {
                if expected != &msg.ae_challenge {
                    return Err(Error::ChallengeMismatch);
                }
            }
        }

        // A retransmitted request reuses the challenge of the unconfirmed negotiation.
        let asue_challenge = match session.local_challenge {
            Some(challenge) => challenge,
            None => {
                let mut challenge: Challenge = [0u8; CHALLENGE_LEN];
                self.rng.fill_bytes(&mut challenge[..]);
                challenge
            }
        };
        let usk = Usk::derive(bk, &msg.addid, &msg.ae_challenge, &asue_challenge)?;
        let data_key = usk.data_key();

        let prev_usk = session.usk.replace(usk);
        let prev_uskid = session.uskid.replace(msg.uskid);
        let response = Message::UnicastKeyResponse(UnicastKeyResponse {
            flags: msg.flags,
            bkid: msg.bkid,
            uskid: msg.uskid,
            addid: msg.addid,
            asue_challenge,
            ae_challenge: msg.ae_challenge,
            wapi_ie: &own_ie[..],
            mac: [0u8; MAC_LEN],
        });
        let fragments = match encode_for_tx(session, self.crypto.as_ref(), &self.config, &response)
        {
            Ok(fragments) => fragments,
            Err(e) => {
                session.usk = prev_usk;
                session.uskid = prev_uskid;
                return Err(e);
            }
        };
        session.local_challenge = Some(asue_challenge);
        commit_tx(session, update_sink, fragments);

        update_sink.push(SecAssocUpdate::Key(KeyConfig {
            alg: KeyAlg::Sms4,
            addr: session.bssid,
            key_index: msg.uskid,
            is_tx: true,
            key: data_key,
        }));
        info!("unicast key {} installed", msg.uskid);
        if session.state != State::Done {
            session.transition(update_sink, State::UnicastKeyNegotiating);
        }
        Ok(())
    }

    pub(super) fn on_unicast_key_confirm(
        &mut self,
        update_sink: &mut UpdateSink,
        frame: &Frame<'_>,
        msg: UnicastKeyConfirm<'_>,
    ) -> Result<(), Error> {
        let session = self.session.as_mut().ok_or(Error::NotAssociated)?;
        let local_challenge = session.local_challenge.ok_or(Error::UnexpectedMessage(
            Subtype::UnicastKeyNegotiationConfirm,
            session.state,
        ))?;
        if msg.asue_challenge != local_challenge {
            return Err(Error::ChallengeMismatch);
        }
        if msg.addid != addid(&session.bssid, &self.own_addr) {
            return Err(Error::AddidMismatch);
        }
        let uskid = session.uskid.ok_or(Error::NoUnicastKey)?;
        if msg.uskid != uskid {
            return Err(Error::UskidMismatch { expected: uskid, actual: msg.uskid });
        }
        let usk = session.usk.as_ref().ok_or(Error::NoUnicastKey)?;
        if !verify_mac(&usk.kck()[..], frame.mac_input(), &msg.mac[..])? {
            return Err(Error::InvalidMac(Subtype::UnicastKeyNegotiationConfirm));
        }
        if let Some(ap_ie) = self.ap_ie.as_ref() {
            if msg.wapi_ie != &ap_ie[..] {
                return Err(deauthenticate(
                    update_sink,
                    ReasonCode::HANDSHAKE_ELEMENT_MISMATCH,
                    Error::IeMismatch,
                ));
            }
        }

        session.next_ae_challenge = Some(usk.next_challenge());
        session.local_challenge = None;
        info!("unicast key {} confirmed", uskid);
        if session.state != State::Done {
            session.transition(update_sink, State::UnicastKeyDone);
        }
        Ok(())
    }
}
