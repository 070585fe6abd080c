//! # Force DAQ Core Library
//!
//! This crate turns the raw streams of three kinds of sports-science hardware into
//! typed, timestamped samples:
//!
//! - a handheld **force dynamometer** streaming ASCII readings,
//! - a dual-channel **force platform** streaming binary packets at 80 Hz or 1 kHz,
//! - a rotary **distance encoder** streaming pulse counts that are smoothed and
//!   differentiated into distances.
//!
//! The transport (serial port or wireless notifications) is not part of the crate: it
//! hands each chunk to the core as a [`RawFrame`](core::RawFrame) and gets samples back.
//! Everything is synchronous call-and-return.
//!
//! ## Crate Structure
//!
//! - **`core`**: Device types, frames and the [`FrameDecoder`](core::FrameDecoder) trait.
//! - **`decoders`**: One stateless decoder per device family, plus shared hex/byte helpers
//!   and the outlier filter.
//! - **`data`**: The encoder [`MotionProcessor`](data::motion::MotionProcessor), trailing
//!   flat-run trimming and CSV export.
//! - **`router`**: [`DeviceRouter`](router::DeviceRouter) dispatching frames by device type.
//! - **`session`**: Acquisition sessions, control bytes and session books.
//! - **`config`**: Figment-based configuration loading and validation.
//! - **`logging`**: `tracing-subscriber` initialization.
//! - **`error`**: [`DaqError`](error::DaqError) and the decode drop taxonomy.
//! - **`metadata`**: Session metadata written into exports.
//! - **`validation`**: Small validation helpers for configuration values.
//!
//! ## Example
//!
//! ```
//! use force_daq::config::DaqConfig;
//! use force_daq::core::{Decoded, DeviceType, RawFrame};
//! use force_daq::session::AcquisitionSession;
//!
//! let mut session = AcquisitionSession::start(DeviceType::Dynamometer, &DaqConfig::default()).unwrap();
//! let ingested = session.ingest(&RawFrame::text("312e320d0a322e370d0a", 1000)).unwrap();
//! assert_eq!(ingested.decoded.len(), 2);
//!
//! let finished = session.finish("grip").unwrap();
//! assert!(matches!(finished.samples(), Decoded::Scalars(s) if s[1].value == 2.7));
//! ```

pub mod config;
pub mod core;
pub mod data;
pub mod decoders;
pub mod error;
pub mod logging;
pub mod measurement_types;
pub mod metadata;
pub mod router;
pub mod session;
pub mod validation;

pub use crate::core::{Decoded, DeviceType, FrameData, FrameDecoder, RawFrame};
pub use crate::error::{AppResult, DaqError, DecodeStats, DropReason};
pub use crate::measurement_types::{ForcePair, Sample};
pub use crate::router::DeviceRouter;
pub use crate::session::{AcquisitionSession, FinishedSession, SessionBook};
