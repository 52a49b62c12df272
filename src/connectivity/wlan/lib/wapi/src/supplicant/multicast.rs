// Copyright 2023 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    super::{commit_tx, encode_for_tx, State, Supplicant},
    crate::{
        kdf::{verify_mac, MAC_LEN},
        key::{KeyAlg, KeyConfig, Msk, KEY_LEN},
        keywrap::sms4_ofb_decrypt,
        mac::{addid, BCAST_ADDR},
        update::{SecAssocUpdate, UpdateSink},
        wai::{DecodeError, Frame, Message, MulticastKeyAnnounce, MulticastKeyResponse, Subtype},
        Error,
    },
    log::info,
};

impl Supplicant {
    pub(super) fn on_multicast_key_announce(
        &mut self,
        update_sink: &mut UpdateSink,
        frame: &Frame<'_>,
        msg: MulticastKeyAnnounce<'_>,
    ) -> Result<(), Error> {
        if msg.flags.stakey_negotiation() {
            return Err(Error::StakeyNotSupported);
        }
        let session = self.session.as_mut().ok_or(Error::NotAssociated)?;
        // The USK is only usable once the AE confirmed it.
        if !matches!(session.state, State::UnicastKeyDone | State::Done) {
            return Err(Error::UnexpectedMessage(
                Subtype::MulticastKeyStakeyAnnounce,
                session.state,
            ));
        }
        let usk = session.usk.as_ref().ok_or(Error::NoUnicastKey)?;
        let uskid = session.uskid.ok_or(Error::NoUnicastKey)?;
        if msg.uskid != uskid {
            return Err(Error::UskidMismatch { expected: uskid, actual: msg.uskid });
        }
        if msg.addid != addid(&session.bssid, &self.own_addr) {
            return Err(Error::AddidMismatch);
        }
        if !verify_mac(&usk.kck()[..], frame.mac_input(), &msg.mac[..])? {
            return Err(Error::InvalidMac(Subtype::MulticastKeyStakeyAnnounce));
        }
        // Announcement identifiers compare as big-endian counters.
        if msg.announcement_id <= session.prev_announcement_id {
            return Err(Error::StaleAnnouncementId);
        }
        if msg.key_data.len() != KEY_LEN {
            return Err(DecodeError::Malformed("unexpected multicast key data length").into());
        }

        let nmk = sms4_ofb_decrypt(usk.kek(), &msg.announcement_id, msg.key_data);
        let msk = Msk::derive(&nmk[..])?;
        let response = Message::MulticastKeyResponse(MulticastKeyResponse {
            flags: msg.flags,
            mskid: msg.mskid,
            uskid: msg.uskid,
            addid: msg.addid,
            announcement_id: msg.announcement_id,
            mac: [0u8; MAC_LEN],
        });
        let fragments = encode_for_tx(session, self.crypto.as_ref(), &self.config, &response)?;
        session.prev_announcement_id = msg.announcement_id;
        commit_tx(session, update_sink, fragments);

        update_sink.push(SecAssocUpdate::Key(KeyConfig {
            alg: KeyAlg::Sms4,
            addr: BCAST_ADDR,
            key_index: msg.mskid,
            is_tx: false,
            key: msk.data_key(),
        }));
        session.msk = Some(msk);
        info!("multicast key {} installed", msg.mskid);

        if session.state != State::Done {
            update_sink.push(SecAssocUpdate::CancelAuthTimeout);
            update_sink.push(SecAssocUpdate::CancelScan);
            update_sink.push(SecAssocUpdate::SetPort(true));
            session.transition(update_sink, State::Done);
        }
        Ok(())
    }
}
