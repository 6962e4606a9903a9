pub mod format;
pub mod timer;
