//! The dispatcher. `Engine` owns the one process-wide [`SessionState`] —
//! this engine supports exactly one concurrent session — and exposes the
//! single hot-loop entry point, `step()`, that the outer loop calls
//! repeatedly.

use rand::rngs::StdRng;
use rand::SeedableRng;

use cryptolink_types::{
    RequestTag, COMMAND_LEN, DER_SIZE, HMAC_SIZE, MAX_TOP_LEVEL_RECORD, PHASE2_REQUEST_LEN,
};

use crate::command;
use crate::config::EngineConfig;
use crate::device::Device;
use crate::error::EngineError;
use crate::handshake;
use crate::link::Link;
use crate::session::SessionState;

pub struct Engine {
    session: SessionState,
    rng: StdRng,
}

impl Engine {
    /// Generates the engine's RSA-2048 keypair and seeds its CSPRNG from
    /// platform entropy — the only two conditions treated as fatal.
    /// Everything that can go wrong once `step()` is running is recoverable
    /// and shows up as a [`RequestTag`], not an `Err` here.
    pub fn init(_config: EngineConfig) -> Result<Self, EngineError> {
        let mut rng =
            StdRng::from_rng(rand::rngs::OsRng).map_err(|_| EngineError::RngSeed)?;
        let keys = cryptolink_crypto::generate_keypair(&mut rng)
            .map_err(|_| EngineError::KeyGeneration)?;
        let mut own_pub_der = [0u8; DER_SIZE];
        cryptolink_crypto::der_encode(&keys.public, &mut own_pub_der)
            .map_err(|_| EngineError::KeyGeneration)?;

        Ok(Self {
            session: SessionState::new(keys, own_pub_der),
            rng,
        })
    }

    /// Whether the engine currently holds a live session (`session_id != 0`).
    pub fn has_session(&self) -> bool {
        self.session.is_live()
    }

    /// Reads one record from `link`, routes it by its MAC-verified payload
    /// length, and returns the tag describing what the peer asked for.
    /// `now_ms` is a caller-supplied monotonic millisecond clock — the
    /// engine has no notion of wall time on its own, which keeps it
    /// testable without a real clock and transport-agnostic.
    pub fn step(&mut self, link: &mut impl Link, device: &mut impl Device, now_ms: u64) -> RequestTag {
        let mut buf = [0u8; MAX_TOP_LEVEL_RECORD];
        let received = link.read_exact(&mut buf, MAX_TOP_LEVEL_RECORD);
        let payload_len = cryptolink_crypto::verify_inbound(&self.session.hmac_key, &buf, received);

        match payload_len {
            DER_SIZE => {
                if handshake::phase1(&mut self.session, link, &mut self.rng, &buf[..DER_SIZE]) {
                    RequestTag::HandshakePhase1
                } else {
                    RequestTag::Error
                }
            }
            PHASE2_REQUEST_LEN => {
                if handshake::phase2(
                    &mut self.session,
                    link,
                    &mut self.rng,
                    &buf[..PHASE2_REQUEST_LEN],
                    now_ms,
                ) {
                    RequestTag::HandshakePhase2
                } else {
                    RequestTag::Error
                }
            }
            COMMAND_LEN => {
                let mut block: [u8; COMMAND_LEN] = buf[..COMMAND_LEN]
                    .try_into()
                    .expect("slice has exactly COMMAND_LEN bytes");
                let tag = command::handle(&mut self.session, &mut block, now_ms, device);
                self.emit_command_record(link, &block);
                tag
            }
            _ => {
                let mut block = [0u8; COMMAND_LEN];
                command::respond_hash_error(&mut self.session, &mut block);
                self.emit_command_record(link, &block);
                RequestTag::Error
            }
        }
    }

    fn emit_command_record(&self, link: &mut impl Link, ciphertext: &[u8; COMMAND_LEN]) {
        let mut record = [0u8; COMMAND_LEN + HMAC_SIZE];
        record[..COMMAND_LEN].copy_from_slice(ciphertext);
        let total = cryptolink_crypto::frame_outbound(&self.session.hmac_key, &mut record, COMMAND_LEN);
        link.write_all(&record, total);
    }
}
