pub mod local;
pub mod tunnel;
