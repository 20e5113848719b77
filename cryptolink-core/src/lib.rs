//! The protocol engine: the handshake and command channel wired up behind
//! the single `Engine::step()` dispatcher, operating on the process-wide
//! `SessionState` over a caller-provided `Link` and `Device`.
//!
//! This crate knows the wire shapes (from `cryptolink-types`) and the
//! primitives (from `cryptolink-crypto`); it does not know how bytes
//! actually move or how the LED/sensor are wired — those are the `Link`/
//! `Device` trait boundaries an embedder fills in.

/// Emits a trace line only in test builds or when the
/// `cryptolink_unsafe_logging` cfg is set. Mirrors `cryptolink_crypto`'s own
/// `trace_secret!` (itself mirroring the teacher's `unsafe_log!`) — kept as
/// a separate per-crate macro rather than imported across the crate
/// boundary, the same way the teacher's `unsafe_log!` stays local to
/// `rustyguard-crypto` rather than being shared with its sibling crates.
macro_rules! trace_secret {
    ($($t:tt)*) => {
        match core::format_args!($($t)*) {
            #[cfg(any(test, cryptolink_unsafe_logging))]
            args => ::std::eprintln!("{args}"),
            #[cfg(not(any(test, cryptolink_unsafe_logging)))]
            _ => {}
        };
    }
}
pub(crate) use trace_secret;

mod command;
mod config;
mod device;
mod error;
mod handshake;
mod link;
mod session;

mod engine;

pub use config::EngineConfig;
pub use device::{Device, Level};
pub use engine::Engine;
pub use error::EngineError;
pub use link::Link;

pub use cryptolink_types::RequestTag;
