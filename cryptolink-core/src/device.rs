//! The side-effect surface the command channel dispatches to.

/// An indicator output's level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    High,
    Low,
}

/// The two device operations the protocol exposes, plus the out-of-band
/// fault line the outer loop raises on an `ERROR` tag.
pub trait Device {
    /// Flips the indicator output and reads it back.
    fn toggle_led(&mut self) -> Level;

    /// Reads the on-die temperature sensor, in degrees Celsius.
    fn read_temperature(&mut self) -> f32;

    /// Raises (or lowers) an out-of-band fault line. Informational only —
    /// the protocol's correctness never depends on this being observed.
    fn fault_signal(&mut self, on: bool);
}
