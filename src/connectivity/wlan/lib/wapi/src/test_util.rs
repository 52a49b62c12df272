// Copyright 2023 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::{
        config::{AuthConfig, Config, KeyType},
        credential::{InMemoryCredentialStore, KEYSTORE_SCHEME},
        crypto::{self, sha256, Digest256, EcCrypto, KeyPair, Signature, SIGNATURE_LEN},
        host::Host,
        ie,
        kdf::MAC_LEN,
        key::{BaseKey, Bkid, Challenge, KeyConfig, Usk, CHALLENGE_LEN, KEY_LEN},
        keywrap::sms4_ofb_decrypt,
        mac::{self, AddId, MacAddr, ReasonCode},
        supplicant::{State, Supplicant},
        wai::{
            self,
            message::{AnnouncementId, AuthId},
            tlv::{self, Tlv},
            AccessAuthResponse, AuthActivation, CertVerification, Mcvr, Message,
            MulticastKeyAnnounce, Protection, SignatureAttr, UnicastKeyConfirm,
            UnicastKeyRequest, UnicastKeyResponse, WaiFlags,
        },
        x509::Certificate,
    },
    rand::RngCore,
    std::io,
    zeroize::Zeroizing,
};

pub const AE_ADDR: MacAddr = [0x00, 0x1b, 0x2c, 0x3d, 0x4e, 0x5f];
pub const ASUE_ADDR: MacAddr = [0x02, 0x11, 0x22, 0x33, 0x44, 0x55];

pub const PSK: &str = "12345678";

pub const AS_CERT_ALIAS: &str = "WAPISERVERCERT_test";
pub const USER_CERT_ALIAS: &str = "WAPIUSERCERT_test";
pub const USER_KEY_ALIAS: &str = "WAPIUSERKEY_test";

pub const ASUE_PRIVATE_KEY: [u8; 24] = [0x11; 24];
pub const AE_PRIVATE_KEY: [u8; 24] = [0x22; 24];
pub const AS_PRIVATE_KEY: [u8; 24] = [0x33; 24];
/// Ephemeral ECDH keys.
pub const ASUE_ECDH_KEY: [u8; 24] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
    0x0f, 0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17,
];
pub const AE_ECDH_KEY: [u8; 24] = [0x5A; 24];

pub fn addid() -> AddId {
    mac::addid(&AE_ADDR, &ASUE_ADDR)
}

/// 32 consecutive byte values beginning at `start`.
pub fn challenge(start: u8) -> Challenge {
    let mut c = [0u8; CHALLENGE_LEN];
    for (i, b) in c.iter_mut().enumerate() {
        *b = start.wrapping_add(i as u8);
    }
    c
}

pub fn psk_config() -> Config {
    Config::new(AuthConfig::Psk { key_type: KeyType::Ascii, key: PSK.to_string() })
}

pub fn cert_config() -> Config {
    Config::new(AuthConfig::Certificate {
        as_cert_uri: format!("{}{}", KEYSTORE_SCHEME, AS_CERT_ALIAS),
        user_cert_uri: format!("{}{}", KEYSTORE_SCHEME, USER_CERT_ALIAS),
        user_key_uri: format!("{}{}", KEYSTORE_SCHEME, USER_KEY_ALIAS),
    })
}

pub fn psk_ie() -> Vec<u8> {
    ie::gen_ie(&psk_config().auth).to_bytes().expect("error writing IE")
}

/// Produces consecutive byte values, so the n-th generated challenge is predictable.
pub struct CountingRng(pub u8);

impl RngCore for CountingRng {
    fn next_u32(&mut self) -> u32 {
        let mut bytes = [0u8; 4];
        self.fill_bytes(&mut bytes[..]);
        u32::from_le_bytes(bytes)
    }

    fn next_u64(&mut self) -> u64 {
        let mut bytes = [0u8; 8];
        self.fill_bytes(&mut bytes[..]);
        u64::from_le_bytes(bytes)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for b in dest.iter_mut() {
            *b = self.0;
            self.0 = self.0.wrapping_add(1);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

pub fn fake_public_key(private_key: &[u8]) -> Vec<u8> {
    [&[0x04][..], private_key, private_key].concat()
}

/// Stand-in for the WAPI curve. The public key embeds the private key, so the "shared
/// secret" of two keys is their XOR and a signature is a hash over the public key.
pub struct FakeEcCrypto {
    ephemeral_key: [u8; 24],
}

impl FakeEcCrypto {
    pub fn new(ephemeral_key: [u8; 24]) -> Self {
        Self { ephemeral_key }
    }

    fn signature(public_key: &[u8], digest: &Digest256) -> Signature {
        let mut value = [0u8; SIGNATURE_LEN];
        value[..32].copy_from_slice(&sha256(&[public_key, &digest[..]].concat())[..]);
        value
    }
}

impl EcCrypto for FakeEcCrypto {
    fn generate_key_pair(&self) -> Result<KeyPair, crypto::Error> {
        Ok(KeyPair {
            private_key: Zeroizing::new(self.ephemeral_key.to_vec()),
            public_key: fake_public_key(&self.ephemeral_key[..]),
        })
    }

    fn ecdh(&self, private_key: &[u8], peer_public_key: &[u8]) -> Result<Vec<u8>, crypto::Error> {
        if private_key.len() != 24 {
            return Err(crypto::Error::InvalidPrivateKey);
        }
        if peer_public_key.len() != 49 || peer_public_key[0] != 0x04 {
            return Err(crypto::Error::InvalidPublicKey);
        }
        Ok(private_key.iter().zip(&peer_public_key[1..25]).map(|(a, b)| a ^ b).collect())
    }

    fn sign(&self, private_key: &[u8], digest: &Digest256) -> Result<Signature, crypto::Error> {
        if private_key.len() != 24 {
            return Err(crypto::Error::InvalidPrivateKey);
        }
        Ok(Self::signature(&fake_public_key(private_key)[..], digest))
    }

    fn verify(&self, public_key: &[u8], digest: &Digest256, signature: &Signature) -> bool {
        &Self::signature(public_key, digest)[..] == &signature[..]
    }
}

fn der(tag: u8, contents: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    if contents.len() < 0x80 {
        out.push(contents.len() as u8);
    } else {
        let len = (contents.len() as u32).to_be_bytes();
        let skip = len.iter().take_while(|b| **b == 0).count();
        out.push(0x80 | (4 - skip) as u8);
        out.extend_from_slice(&len[skip..]);
    }
    out.extend_from_slice(contents);
    out
}

fn der_integer(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count().min(7);
    let mut contents = bytes[skip..].to_vec();
    if contents[0] & 0x80 != 0 {
        contents.insert(0, 0);
    }
    der(0x02, &contents[..])
}

/// An X.501 Name with a single common name.
pub fn make_name(common_name: &str) -> Vec<u8> {
    let attr = [der(0x06, &[0x55, 0x04, 0x03]), der(0x0C, common_name.as_bytes())].concat();
    der(0x30, &der(0x31, &der(0x30, &attr[..]))[..])
}

pub fn make_certificate(subject: &str, issuer: &str, serial: u64, public_key: &[u8]) -> Vec<u8> {
    let sig_alg = der(0x30, &der(0x06, &[0x2A, 0x81, 0x1C, 0xD7, 0x63, 0x01, 0x01, 0x01])[..]);
    let validity = [der(0x17, b"230101000000Z"), der(0x17, b"330101000000Z")].concat();
    let key_alg = [
        der(0x06, &[0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x02, 0x01]),
        der(0x06, &tlv::ECDH_CURVE_OID[2..]),
    ]
    .concat();
    let spki = [der(0x30, &key_alg[..]), der(0x03, &[&[0u8][..], public_key].concat())].concat();
    let tbs = [
        der(0xA0, &der_integer(2)[..]),
        der_integer(serial),
        sig_alg.clone(),
        make_name(issuer),
        der(0x30, &validity[..]),
        make_name(subject),
        der(0x30, &spki[..]),
    ]
    .concat();
    let cert = [der(0x30, &tbs[..]), sig_alg, der(0x03, &[0x00, 0x30, 0x00])].concat();
    der(0x30, &cert[..])
}

pub fn as_certificate() -> Vec<u8> {
    make_certificate("WAPI AS", "WAPI AS", 1, &fake_public_key(&AS_PRIVATE_KEY[..])[..])
}

pub fn asue_certificate() -> Vec<u8> {
    make_certificate("station", "WAPI AS", 0x0102, &fake_public_key(&ASUE_PRIVATE_KEY[..])[..])
}

pub fn ae_certificate() -> Vec<u8> {
    make_certificate("access point", "WAPI AS", 0x0103, &fake_public_key(&AE_PRIVATE_KEY[..])[..])
}

pub fn make_credential_store() -> InMemoryCredentialStore {
    let mut store = InMemoryCredentialStore::new();
    store.insert(AS_CERT_ALIAS, as_certificate());
    store.insert(USER_CERT_ALIAS, asue_certificate());
    store.insert(USER_KEY_ALIAS, ASUE_PRIVATE_KEY.to_vec());
    store
}

pub fn supplicant_with_store(config: Config, store: InMemoryCredentialStore) -> Supplicant {
    Supplicant::new(
        config,
        ASUE_ADDR,
        Box::new(FakeEcCrypto::new(ASUE_ECDH_KEY)),
        Box::new(store),
        Box::new(CountingRng(0x80)),
    )
}

pub fn supplicant_with_config(config: Config) -> Supplicant {
    supplicant_with_store(config, make_credential_store())
}

pub fn psk_supplicant() -> Supplicant {
    supplicant_with_config(psk_config())
}

pub fn cert_supplicant() -> Supplicant {
    supplicant_with_config(cert_config())
}

/// Records host callbacks as readable events.
#[derive(Default)]
pub struct RecordingHost {
    pub events: Vec<String>,
    pub keys: Vec<KeyConfig>,
    pub fail_tx: bool,
}

impl Host for RecordingHost {
    fn transmit_frame(&mut self, dst: &MacAddr, frame: &[u8]) -> io::Result<()> {
        if self.fail_tx {
            return Err(io::Error::new(io::ErrorKind::Other, "link down"));
        }
        self.events.push(format!("tx {:?} {:?}", dst, frame));
        Ok(())
    }

    fn set_state(&mut self, state: State) {
        self.events.push(format!("state {:?}", state));
    }

    fn deauthenticate(&mut self, reason: ReasonCode) {
        self.events.push(format!("deauth {}", reason.0));
    }

    fn install_key(&mut self, key: &KeyConfig) {
        self.events.push(format!("key {} {} {}", key.key_index, key.is_tx, key.key.len()));
        self.keys.push(key.clone());
    }

    fn cancel_auth_timeout(&mut self) {
        self.events.push("cancel_auth_timeout".to_string());
    }

    fn cancel_scan(&mut self) {
        self.events.push("cancel_scan".to_string());
    }

    fn set_port(&mut self, authorized: bool) {
        self.events.push(format!("port {}", authorized));
    }
}

/// What the authentication server reports in an access authentication response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsVerdict {
    Accept,
    /// No certificate verification result is attached.
    Omitted,
    RejectStation,
    RejectAe,
    ForgedSignature,
    /// The verification result echoes a different station challenge.
    StaleStationChallenge,
    /// The verification result echoes a different AE challenge.
    StaleAeChallenge,
    /// The verification result covers another certificate than the station's.
    SwappedStationCertificate,
    /// The verification result covers another certificate than the AE's.
    SwappedAeCertificate,
    AccessDenied,
}

/// The AE side of the protocol, building the frames a real AP would send.
pub struct Ae {
    pub bk: Option<BaseKey>,
    pub auth_id: AuthId,
    pub next_auth_id: Option<Challenge>,
    pub certificate: Vec<u8>,
    /// AE challenge of the next unicast key negotiation.
    pub challenge: Challenge,
    pub asue_challenge: Option<Challenge>,
    pub usk: Option<Usk>,
    pub ie: Vec<u8>,
}

impl Ae {
    fn new(bk: Option<BaseKey>) -> Self {
        Self {
            bk,
            auth_id: [0xA1; 32],
            next_auth_id: None,
            certificate: ae_certificate(),
            challenge: challenge(0x20),
            asue_challenge: None,
            usk: None,
            ie: psk_ie(),
        }
    }

    pub fn new_psk() -> Self {
        Self::new(Some(BaseKey::from_psk(KeyType::Ascii, PSK).expect("error deriving BK")))
    }

    pub fn new_cert() -> Self {
        Self::new(None)
    }

    pub fn next_challenge(&mut self) {
        self.challenge = sha256(&self.challenge[..]);
    }

    pub fn bkid(&self) -> Bkid {
        match self.bk.as_ref() {
            Some(bk) => bk.bkid(&addid()).expect("error deriving BKID"),
            None => [0; 16],
        }
    }

    fn kck(&self) -> [u8; KEY_LEN] {
        self.usk.as_ref().map(|usk| *usk.kck()).unwrap_or([0; KEY_LEN])
    }

    fn kek(&self) -> [u8; KEY_LEN] {
        self.usk.as_ref().map(|usk| *usk.kek()).unwrap_or([0; KEY_LEN])
    }

    fn write(&self, msg: Message<'_>, protection: &Protection<'_>) -> Vec<u8> {
        wai::write_frame(&msg, 1, protection, 32000).expect("error writing AE frame")
    }

    pub fn auth_activation(&self, bk_rekeying: bool) -> Vec<u8> {
        let as_identity = Certificate::parse(&as_certificate()[..]).expect("bad cert").identity();
        let mut flags = WaiFlags(0);
        flags.set_bk_rekeying(bk_rekeying);
        self.write(
            Message::AuthActivation(AuthActivation {
                flags,
                auth_id: self.auth_id,
                asu_identity: Tlv::new(tlv::IDENTITY_X509, &as_identity[..]),
                ae_certificate: Tlv::new(tlv::CERTIFICATE_X509, &self.certificate[..]),
                ecdh_params: Tlv::ecdh_params(),
            }),
            &Protection::None,
        )
    }

    /// Answers an access authentication request and derives the base key.
    pub fn access_auth_response(&mut self, request: &[u8], verdict: AsVerdict) -> Vec<u8> {
        let frame = wai::decode(request).expect("error decoding request");
        let req = match frame.message {
            Message::AccessAuthRequest(req) => req,
            other => panic!("unexpected message: {:?}", other),
        };
        let crypto = FakeEcCrypto::new(AE_ECDH_KEY);
        let ae_key = fake_public_key(&AE_ECDH_KEY[..]);
        let shared_x =
            crypto.ecdh(&AE_ECDH_KEY[..], req.asue_key_data).expect("error computing ECDH");
        let (bk, next_auth_id) =
            BaseKey::from_ecdh(&shared_x[..], &self.challenge, &req.asue_challenge)
                .expect("error deriving BK");
        self.bk = Some(bk);
        self.next_auth_id = Some(next_auth_id);

        let mcvr = Mcvr {
            raw: &[],
            asue_challenge: match verdict {
                AsVerdict::StaleStationChallenge => sha256(&req.asue_challenge[..]),
                _ => req.asue_challenge,
            },
            ae_challenge: match verdict {
                AsVerdict::StaleAeChallenge => sha256(&self.challenge[..]),
                _ => self.challenge,
            },
            asue_result: if verdict == AsVerdict::RejectStation { 1 } else { 0 },
            asue_certificate: Tlv::new(tlv::CERTIFICATE_X509, match verdict {
                AsVerdict::SwappedStationCertificate => &self.certificate[..],
                _ => req.asue_certificate.value,
            }),
            ae_result: if verdict == AsVerdict::RejectAe { 1 } else { 0 },
            ae_certificate: Tlv::new(tlv::CERTIFICATE_X509, match verdict {
                AsVerdict::SwappedAeCertificate => req.asue_certificate.value,
                _ => &self.certificate[..],
            }),
        };
        let mut mcvr_bytes = vec![];
        wai::write_mcvr(&mut mcvr_bytes, &mcvr).expect("error writing MCVR");
        let server_signature = match verdict {
            AsVerdict::ForgedSignature => [0x5A; SIGNATURE_LEN],
            _ => crypto.sign(&AS_PRIVATE_KEY[..], &sha256(&mcvr_bytes[..])).expect("sign"),
        };
        let as_identity = Certificate::parse(&as_certificate()[..]).expect("bad cert").identity();
        let verification = match verdict {
            AsVerdict::Omitted => None,
            _ => Some(CertVerification {
                mcvr,
                server_signature_asue: SignatureAttr::new(
                    Tlv::new(tlv::IDENTITY_X509, &as_identity[..]),
                    server_signature,
                ),
                server_signature_ae: None,
            }),
        };

        let ae_identity = Certificate::parse(&self.certificate[..]).expect("bad cert").identity();
        let asue_identity =
            Certificate::parse(&asue_certificate()[..]).expect("bad cert").identity();
        let mut flags = WaiFlags(0);
        flags.set_optional_field(verification.is_some());
        let msg = Message::AccessAuthResponse(AccessAuthResponse {
            flags,
            asue_challenge: req.asue_challenge,
            ae_challenge: self.challenge,
            access_result: if verdict == AsVerdict::AccessDenied { 1 } else { 0 },
            asue_key_data: req.asue_key_data,
            ae_key_data: &ae_key[..],
            ae_identity: Tlv::new(tlv::IDENTITY_X509, &ae_identity[..]),
            asue_identity: Tlv::new(tlv::IDENTITY_X509, &asue_identity[..]),
            verification,
            signature: None,
        });
        self.write(msg, &Protection::Signature {
            crypto: &crypto,
            private_key: &AE_PRIVATE_KEY[..],
            identity: Tlv::new(tlv::IDENTITY_X509, &ae_identity[..]),
        })
    }

    pub fn unicast_key_request(&self, uskid: u8, flags: WaiFlags) -> Vec<u8> {
        self.write(
            Message::UnicastKeyRequest(UnicastKeyRequest {
                flags,
                bkid: self.bkid(),
                uskid,
                addid: addid(),
                ae_challenge: self.challenge,
            }),
            &Protection::None,
        )
    }

    /// A frame only the station sends.
    pub fn unicast_key_response_frame(&self) -> Vec<u8> {
        let kck = self.kck();
        self.write(
            Message::UnicastKeyResponse(UnicastKeyResponse {
                flags: WaiFlags(0),
                bkid: self.bkid(),
                uskid: 0,
                addid: addid(),
                asue_challenge: challenge(0x80),
                ae_challenge: self.challenge,
                wapi_ie: &self.ie[..],
                mac: [0; MAC_LEN],
            }),
            &Protection::Mac { kck: &kck[..] },
        )
    }

    /// Derives the USK from the station's unicast key negotiation response.
    pub fn process_unicast_response(&mut self, response: &[u8]) {
        let frame = wai::decode(response).expect("error decoding response");
        let resp = match frame.message {
            Message::UnicastKeyResponse(resp) => resp,
            other => panic!("unexpected message: {:?}", other),
        };
        let bk = self.bk.as_ref().expect("AE has no BK");
        let usk = Usk::derive(bk, &addid(), &resp.ae_challenge, &resp.asue_challenge)
            .expect("error deriving USK");
        assert!(crate::kdf::verify_mac(&usk.kck()[..], frame.mac_input(), &resp.mac[..])
            .expect("error verifying MAC"));
        self.asue_challenge = Some(resp.asue_challenge);
        self.usk = Some(usk);
    }

    pub fn unicast_key_confirm(&self) -> Vec<u8> {
        let kck = self.kck();
        self.write(
            Message::UnicastKeyConfirm(UnicastKeyConfirm {
                flags: WaiFlags(0),
                bkid: self.bkid(),
                uskid: 0,
                addid: addid(),
                asue_challenge: self.asue_challenge.expect("no station challenge"),
                wapi_ie: &self.ie[..],
                mac: [0; MAC_LEN],
            }),
            &Protection::Mac { kck: &kck[..] },
        )
    }

    /// Wraps `nmk` with the KEK, using the announcement identifier as IV.
    pub fn multicast_key_announce(
        &self,
        mskid: u8,
        announcement_id: AnnouncementId,
        nmk: &[u8],
        flags: WaiFlags,
    ) -> Vec<u8> {
        let kck = self.kck();
        let key_data = sms4_ofb_decrypt(&self.kek(), &announcement_id, nmk);
        self.write(
            Message::MulticastKeyAnnounce(MulticastKeyAnnounce {
                flags,
                mskid,
                uskid: 0,
                addid: addid(),
                data_seq: [0; 16],
                announcement_id,
                key_data: &key_data[..],
                mac: [0; MAC_LEN],
            }),
            &Protection::Mac { kck: &kck[..] },
        )
    }
}
