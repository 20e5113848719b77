//! The byte-transport adapter contract.

/// A blocking, half-duplex, order-preserving byte transport.
///
/// Both operations are synchronous and assumed to either fully succeed or
/// be a bug in the transport itself — there is no partial-read
/// recovery at this layer. `read_exact` is used for two distinct shapes of
/// read: the record-boundary read at the top of [`Engine::step`](crate::Engine::step),
/// which asks for [`cryptolink_types::MAX_TOP_LEVEL_RECORD`] bytes of
/// *capacity* and returns however many the transport actually had framed up
/// (a shorter record is legal and is what most inbound records look like);
/// and the nested phase-1-B read, which asks for an amount the engine
/// already knows must be exactly met.
pub trait Link {
    /// Reads up to `n` bytes into `buf[..n]`, blocking until at least one
    /// record boundary's worth of data is available. Returns the number of
    /// bytes actually placed in `buf`, which may be less than `n`.
    fn read_exact(&mut self, buf: &mut [u8], n: usize) -> usize;

    /// Writes `buf[..n]` in full. Returns whether the transport accepted
    /// the entire write.
    fn write_all(&mut self, buf: &[u8], n: usize) -> bool;
}
