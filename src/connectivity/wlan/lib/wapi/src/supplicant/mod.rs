// Copyright 2023 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The station side WAI state machine.
//!
//! A [`Supplicant`] lives as long as the host's WAPI configuration and holds one
//! `Session` per association. Inbound frames are fed through [`Supplicant::on_wai_frame`],
//! which never fails: malformed or unauthenticated frames are logged and dropped. All
//! side effects are reported as [`SecAssocUpdate`]s.

mod cert_auth;
mod multicast;
mod session;
mod unicast;

use {
    crate::{
        config::Config,
        credential::CredentialStore,
        crypto::EcCrypto,
        ie::{self, parse_ie},
        mac::{MacAddr, MacFmt, ReasonCode},
        update::{SecAssocUpdate, UpdateSink},
        wai::{
            self,
            fragment::{fragment, Reassembler},
            tlv::{self, Tlv},
            Message, Protection, ProtectionKind,
        },
        Error,
    },
    log::{error, info, warn},
    rand::RngCore,
    session::Session,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Waiting for the AE to start unicast key negotiation, possibly after certificate
    /// authentication.
    InitPsk,
    UnicastKeyNegotiating,
    UnicastKeyDone,
    /// Unicast and multicast keys are installed and the port is open.
    Done,
}

pub struct Supplicant {
    config: Config,
    own_addr: MacAddr,
    crypto: Box<dyn EcCrypto>,
    credential_store: Box<dyn CredentialStore>,
    rng: Box<dyn RngCore + Send>,
    /// The WAPI IE this station sent in its association request.
    assoc_ie: Option<Vec<u8>>,
    /// The WAPI IE the AP announced in its beacon or probe response.
    ap_ie: Option<Vec<u8>>,
    session: Option<Session>,
}

impl std::fmt::Debug for Supplicant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supplicant")
            .field("config", &self.config)
            .field("own_addr", &self.own_addr.to_mac_str())
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl Supplicant {
    pub fn new(
        config: Config,
        own_addr: MacAddr,
        crypto: Box<dyn EcCrypto>,
        credential_store: Box<dyn CredentialStore>,
        rng: Box<dyn RngCore + Send>,
    ) -> Self {
        info!("WAPI supplicant for {} using {:?}", own_addr.to_mac_str(), config.auth);
        Self {
            config,
            own_addr,
            crypto,
            credential_store,
            rng,
            assoc_ie: None,
            ap_ie: None,
            session: None,
        }
    }

    /// Tears the supplicant down. All key material is zeroized.
    pub fn deinit(self) {
        info!("WAPI supplicant for {} deinitialized", self.own_addr.to_mac_str());
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// `None` while not associated.
    pub fn state(&self) -> Option<State> {
        self.session.as_ref().map(|s| s.state)
    }

    pub fn notify_assoc(&mut self, bssid: MacAddr) {
        info!("WAPI association with {}", bssid.to_mac_str());
        self.session = Some(Session::new(bssid, self.config.max_message_len));
    }

    pub fn notify_disassoc(&mut self) {
        if let Some(session) = self.session.take() {
            info!("WAPI disassociation from {}", session.bssid.to_mac_str());
        }
    }

    pub fn set_assoc_ie(&mut self, ie: &[u8]) -> Result<(), Error> {
        parse_ie(ie)?;
        self.assoc_ie = Some(ie.to_vec());
        Ok(())
    }

    pub fn set_ap_ie(&mut self, ie: &[u8]) -> Result<(), Error> {
        parse_ie(ie)?;
        self.ap_ie = Some(ie.to_vec());
        Ok(())
    }

    /// Replaces the configuration. The base key and cached credentials of the current
    /// session derive from the old configuration and are dropped.
    pub fn set_config(&mut self, config: Config) {
        info!("WAPI configuration changed to {:?}", config.auth);
        self.config = config;
        if let Some(session) = self.session.as_mut() {
            session.invalidate_base_key();
            session.reassembler = Reassembler::new(self.config.max_message_len);
        }
    }

    /// The IE this station advertises: the one sent while associating if known, otherwise
    /// one generated from the configuration.
    pub fn own_ie(&self) -> Result<Vec<u8>, Error> {
        match self.assoc_ie.as_ref() {
            Some(ie) => Ok(ie.clone()),
            None => Ok(ie::gen_ie(&self.config.auth).to_bytes().map_err(wai::EncodeError::from)?),
        }
    }

    /// Processes an inbound WAI frame. Errors are logged and the frame dropped.
    pub fn on_wai_frame(&mut self, update_sink: &mut UpdateSink, frame: &[u8]) {
        if let Err(e) = self.rx_wai(update_sink, frame) {
            error!("dropping WAI frame: {}", e);
        }
    }

    /// Encodes and queues a message for the AE, fragmenting it if required.
    pub fn tx_wai(&mut self, update_sink: &mut UpdateSink, msg: &Message<'_>) -> Result<(), Error> {
        let session = self.session.as_mut().ok_or(Error::NotAssociated)?;
        let fragments = encode_for_tx(session, self.crypto.as_ref(), &self.config, msg)?;
        commit_tx(session, update_sink, fragments);
        Ok(())
    }

    fn rx_wai(&mut self, update_sink: &mut UpdateSink, frame: &[u8]) -> Result<(), Error> {
        let session = self.session.as_mut().ok_or(Error::NotAssociated)?;
        match session.reassembler.push(frame)? {
            Some(message) => self.dispatch(update_sink, &message[..]),
            None => Ok(()),
        }
    }

    fn dispatch(&mut self, update_sink: &mut UpdateSink, raw: &[u8]) -> Result<(), Error> {
        let frame = wai::decode(raw)?;
        match frame.message {
            Message::AuthActivation(msg) => self.on_auth_activation(update_sink, raw, msg),
            Message::AccessAuthResponse(msg) => {
                self.on_access_auth_response(update_sink, &frame, msg)
            }
            Message::UnicastKeyRequest(msg) => self.on_unicast_key_request(update_sink, msg),
            Message::UnicastKeyConfirm(msg) => {
                self.on_unicast_key_confirm(update_sink, &frame, msg)
            }
            Message::MulticastKeyAnnounce(msg) => {
                self.on_multicast_key_announce(update_sink, &frame, msg)
            }
            other => {
                let state = self.state().unwrap_or(State::InitPsk);
                Err(Error::UnexpectedMessage(other.subtype(), state))
            }
        }
    }
}

/// Encodes `msg` with the protection its subtype requires and splits it into fragments.
/// The packet sequence number is only consumed by `commit_tx`.
fn encode_for_tx(
    session: &Session,
    crypto: &dyn EcCrypto,
    config: &Config,
    msg: &Message<'_>,
) -> Result<Vec<Vec<u8>>, Error> {
    let identity;
    let protection = match msg.protection_kind() {
        ProtectionKind::None => Protection::None,
        ProtectionKind::Mac => {
            let usk = session.usk.as_ref().ok_or(Error::NoUnicastKey)?;
            Protection::Mac { kck: &usk.kck()[..] }
        }
        ProtectionKind::Signature => {
            let creds = session.credentials.as_ref().ok_or(Error::NoCertificateConfig)?;
            identity = creds.user_cert.identity();
            Protection::Signature {
                crypto,
                private_key: &creds.user_key[..],
                identity: Tlv::new(tlv::IDENTITY_X509, &identity[..]),
            }
        }
    };
    let frame = wai::encode(msg, session.packet_seq, &protection, config.max_message_len)?;
    Ok(fragment(&frame[..], config.max_fragment_len)?)
}

fn commit_tx(session: &mut Session, update_sink: &mut UpdateSink, fragments: Vec<Vec<u8>>) {
    session.advance_packet_seq();
    if fragments.len() > 1 {
        warn!("WAI message sent in {} fragments", fragments.len());
    }
    for frame in fragments {
        update_sink.push(SecAssocUpdate::TxWaiFrame { dst: session.bssid, frame });
    }
}

/// Asks the host to deauthenticate and passes `error` through for logging.
fn deauthenticate(update_sink: &mut UpdateSink, reason: ReasonCode, error: Error) -> Error {
    update_sink.push(SecAssocUpdate::Deauthenticate(reason));
    error
}
