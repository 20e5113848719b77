//! `cryptolink`: a secure request/response server for a resource-constrained
//! endpoint, guarding two device operations — toggle an indicator output and
//! read an on-die temperature — behind an RSA-2048 handshake and an
//! AES-256-CBC command channel.
//!
//! This crate is the public facade an embedder links against: it
//! re-exports the protocol [`Engine`] from `cryptolink-core` and the two
//! trait boundaries, [`Link`] and [`Device`], that the embedder implements
//! to wire the engine to a real byte transport and real hardware.
//!
//! The protocol itself — the handshake state machine, the MAC-framed wire
//! records, the command channel — lives in `cryptolink-core` and
//! `cryptolink-crypto`; this crate adds no protocol logic of its own.
//!
//! ```no_run
//! use cryptolink::{Device, Engine, EngineConfig, Level, Link};
//!
//! struct SerialLink;
//! impl Link for SerialLink {
//!     fn read_exact(&mut self, buf: &mut [u8], n: usize) -> usize { todo!() }
//!     fn write_all(&mut self, buf: &[u8], n: usize) -> bool { todo!() }
//! }
//!
//! struct Board;
//! impl Device for Board {
//!     fn toggle_led(&mut self) -> Level { todo!() }
//!     fn read_temperature(&mut self) -> f32 { todo!() }
//!     fn fault_signal(&mut self, _on: bool) { }
//! }
//!
//! let mut engine = Engine::init(EngineConfig::new()).expect("fatal: init");
//! let mut link = SerialLink;
//! let mut device = Board;
//! let _tag = engine.step(&mut link, &mut device, 0);
//! ```

pub use cryptolink_core::{Device, Engine, EngineConfig, EngineError, Level, Link, RequestTag};
