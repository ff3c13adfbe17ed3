pub mod common;
pub mod server;
pub mod transport;
pub mod ui;

/// Crate-wide defaults shared by config and tests.
pub mod defaults {
    /// First port probed when the caller does not request one.
    pub const PORT_START: u16 = 8000;
    /// Number of consecutive ports probed before giving up.
    pub const PORT_RANGE: u16 = 100;
    /// Auto-stop countdown when the caller does not pick one.
    pub const EXPIRE_MINUTES: u64 = 30;
}
