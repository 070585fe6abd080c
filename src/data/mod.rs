//! Signal conditioning, session trimming and export.
pub mod motion;
pub mod storage;
pub mod trim;
