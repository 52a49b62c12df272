// Copyright 2023 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    super::State,
    crate::{
        credential::Credentials,
        crypto::KeyPair,
        key::{BaseKey, Challenge, Msk, Usk},
        mac::MacAddr,
        update::{SecAssocUpdate, UpdateSink},
        wai::{fragment::Reassembler, message::AnnouncementId},
        x509::Certificate,
    },
    log::info,
};

/// Per-association protocol state. Dropping a session zeroizes every key it holds.
#[derive(Debug)]
pub(crate) struct Session {
    pub state: State,
    pub bssid: MacAddr,
    pub packet_seq: u16,
    pub reassembler: Reassembler,

    pub bk: Option<BaseKey>,
    /// Authentication identifier expected in the next base key rekeying activation.
    pub next_auth_id: Option<Challenge>,
    pub usk: Option<Usk>,
    pub uskid: Option<u8>,
    pub msk: Option<Msk>,
    /// The ASUE challenge of the ongoing unicast key negotiation. `None` once the
    /// negotiation was confirmed, so the next one uses a fresh challenge.
    pub local_challenge: Option<Challenge>,
    /// Challenge the AE must present when it rekeys the USK.
    pub next_ae_challenge: Option<Challenge>,
    pub prev_announcement_id: AnnouncementId,

    /// Raw activation frame held while credentials are fetched.
    pub pending_activation: Option<Vec<u8>>,
    pub credentials: Option<Credentials>,
    pub ecdh_key_pair: Option<KeyPair>,
    pub peer_cert: Option<Certificate>,
    /// ASUE challenge sent in the access authentication request.
    pub auth_challenge: Option<Challenge>,
}

impl Session {
    pub fn new(bssid: MacAddr, max_message_len: usize) -> Self {
        Self {
            state: State::InitPsk,
            bssid,
            packet_seq: 1,
            reassembler: Reassembler::new(max_message_len),
            bk: None,
            next_auth_id: None,
            usk: None,
            uskid: None,
            msk: None,
            local_challenge: None,
            next_ae_challenge: None,
            prev_announcement_id: [0u8; 16],
            pending_activation: None,
            credentials: None,
            ecdh_key_pair: None,
            peer_cert: None,
            auth_challenge: None,
        }
    }

    /// Called once the frame carrying the current packet sequence number was queued.
    pub fn advance_packet_seq(&mut self) {
        self.packet_seq = self.packet_seq.wrapping_add(1);
    }

    pub fn transition(&mut self, update_sink: &mut UpdateSink, state: State) {
        if self.state != state {
            info!("WAPI state {:?} -> {:?}", self.state, state);
            self.state = state;
            update_sink.push(SecAssocUpdate::State(state));
        }
    }

    /// Drops all base key dependent material.
    pub fn invalidate_base_key(&mut self) {
        self.bk = None;
        self.next_auth_id = None;
        self.credentials = None;
        self.ecdh_key_pair = None;
        self.auth_challenge = None;
        self.pending_activation = None;
    }
}
