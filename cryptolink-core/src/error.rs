//! Fatal-only error type.
//!
//! Every other protocol failure is recoverable and surfaces as a
//! [`RequestTag`](crate::RequestTag)/status byte, not as an `Err` here —
//! this type exists solely for the two conditions that should abort
//! construction: failing to generate the RSA keypair, and failing to seed
//! the CSPRNG.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to generate the engine's RSA-2048 keypair")]
    KeyGeneration,
    #[error("failed to seed the CSPRNG from platform entropy")]
    RngSeed,
}
