//! The command channel — one AES-256-CBC block in, one out, per request.

use cryptolink_crypto::{cbc_step_decrypt, cbc_step_encrypt};
use cryptolink_types::{
    CommandPlaintext, Opcode, RequestTag, ResponsePlaintext, StatusCode, AES_BLOCK, FORMAT_MARKER,
    KEEP_ALIVE_MS,
};
use zerocopy::{AsBytes, FromBytes};

use crate::device::{Device, Level};
use crate::session::SessionState;
use crate::trace_secret;

/// Runs one command-channel exchange and returns the 16-byte encrypted
/// response block plus the tag the outer loop should act on.
///
/// `ciphertext` is consumed in place as scratch: on return it holds the
/// response ciphertext, not the request plaintext.
pub fn handle(
    session: &mut SessionState,
    ciphertext: &mut [u8; AES_BLOCK],
    now_ms: u64,
    device: &mut impl Device,
) -> RequestTag {
    if !session.is_live() {
        trace_secret!("command: rejected, no live session");
        respond(session, StatusCode::InvalidSession, &[], ciphertext);
        return RequestTag::Error;
    }

    if now_ms.saturating_sub(session.last_seen_ms) > KEEP_ALIVE_MS {
        trace_secret!("command: session expired after {} ms idle", now_ms.saturating_sub(session.last_seen_ms));
        session.close();
        respond(session, StatusCode::Expired, &[], ciphertext);
        return RequestTag::Error;
    }
    session.last_seen_ms = now_ms;

    let received = *ciphertext;
    cbc_step_decrypt(&session.aes_key, &session.dec_iv, ciphertext);
    session.dec_iv = received;
    let plaintext = CommandPlaintext::read_from(&ciphertext[..])
        .expect("CommandPlaintext and a 16-byte block have identical layout");

    if plaintext.marker != FORMAT_MARKER {
        trace_secret!("command: rejected, marker byte was {} not FORMAT_MARKER", plaintext.marker);
        respond(session, StatusCode::BadRequest, &[], ciphertext);
        return RequestTag::Error;
    }
    if plaintext.session_id.get() != session.session_id {
        trace_secret!("command: rejected, session_id mismatch");
        respond(session, StatusCode::InvalidSession, &[], ciphertext);
        return RequestTag::Error;
    }

    match Opcode::from_byte(plaintext.opcode) {
        Some(Opcode::Close) => {
            session.close();
            respond(session, StatusCode::Okay, &[], ciphertext);
            RequestTag::Close
        }
        Some(Opcode::ToggleLed) => {
            let level = device.toggle_led();
            let text: &[u8] = match level {
                Level::High => b"ON",
                Level::Low => b"OFF",
            };
            respond(session, StatusCode::Okay, text, ciphertext);
            RequestTag::ToggleLed
        }
        Some(Opcode::GetTemperature) => {
            let celsius = device.read_temperature();
            let mut text = itoa_fixed2(celsius);
            respond(session, StatusCode::Okay, text.as_slice(), ciphertext);
            text.clear();
            RequestTag::GetTemperature
        }
        None => {
            respond(session, StatusCode::BadRequest, &[], ciphertext);
            RequestTag::Error
        }
    }
}

/// Builds a 16-byte response plaintext, AES-encrypts it under the current
/// `aes_key`/`enc_iv`, advances `enc_iv`, and leaves the ciphertext in
/// `out`. Used for every outcome, including the session-dead and expired
/// paths — those still round-trip through AES rather than special-casing
/// an unencrypted error.
pub(crate) fn respond(
    session: &mut SessionState,
    status: StatusCode,
    payload: &[u8],
    out: &mut [u8; AES_BLOCK],
) {
    let response = ResponsePlaintext::new(status, payload);
    out.copy_from_slice(response.as_bytes());
    cbc_step_encrypt(&session.aes_key, &session.enc_iv, out);
    session.enc_iv = *out;
}

/// The dispatcher-level `HASH_ERROR` path: an unrecognized record length,
/// including a MAC failure (which always reports length 0).
/// No session/device state changes — the record itself was rejected before
/// the command channel ever saw it.
pub(crate) fn respond_hash_error(session: &mut SessionState, out: &mut [u8; AES_BLOCK]) {
    respond(session, StatusCode::HashError, &[], out);
}

/// Formats a Celsius reading as ASCII with exactly two decimal places,
/// e.g. `53.25` — small enough to stay on the stack, no `alloc` needed in
/// this `std` crate but no reason to pull in a formatting dependency for
/// one field.
fn itoa_fixed2(value: f32) -> heapless_ascii::AsciiBuf {
    heapless_ascii::format_fixed2(value)
}

/// A tiny fixed-capacity ASCII buffer, just large enough for the command
/// channel's 15-byte payload field. Grounded in the wire shape, not a
/// general-purpose string type.
mod heapless_ascii {
    pub struct AsciiBuf {
        buf: [u8; 15],
        len: usize,
    }

    impl AsciiBuf {
        pub fn as_slice(&self) -> &[u8] {
            &self.buf[..self.len]
        }

        pub fn clear(&mut self) {
            self.len = 0;
        }

        fn push_str(&mut self, s: &str) {
            for &b in s.as_bytes() {
                if self.len < self.buf.len() {
                    self.buf[self.len] = b;
                    self.len += 1;
                }
            }
        }
    }

    /// `value` formatted with exactly two fractional digits, truncated
    /// toward zero (the sensor reading is never negative in practice, but
    /// truncation rather than rounding keeps this independent of any
    /// float-formatting crate).
    pub fn format_fixed2(value: f32) -> AsciiBuf {
        let mut buf = AsciiBuf { buf: [0; 15], len: 0 };
        let scaled = (value * 100.0).round() as i32;
        let (sign, scaled) = if scaled < 0 { ("-", -scaled) } else { ("", scaled) };
        let whole = scaled / 100;
        let frac = scaled % 100;

        let mut digits = [0u8; 10];
        let mut n = whole;
        let mut i = digits.len();
        loop {
            i -= 1;
            digits[i] = b'0' + (n % 10) as u8;
            n /= 10;
            if n == 0 {
                break;
            }
        }

        buf.push_str(sign);
        for &d in &digits[i..] {
            buf.buf[buf.len] = d;
            buf.len += 1;
        }
        buf.push_str(".");
        buf.buf[buf.len] = b'0' + (frac / 10) as u8;
        buf.len += 1;
        buf.buf[buf.len] = b'0' + (frac % 10) as u8;
        buf.len += 1;
        buf
    }
}
