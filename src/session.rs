//! Acquisition sessions.
//!
//! A session is one test: it starts when the operator begins recording, accumulates
//! every sample routed from the device, and ends either finished (trimmed, labelled and
//! frozen) or cancelled (discarded).
//!
//! ## Lifecycle
//!
//! ```text
//! start ──► Recording ──finish──► Finished
//!               │
//!               └──cancel───► Cancelled
//! ```
//!
//! Every session builds its own [`DeviceRouter`], and with it its own
//! [`MotionProcessor`](crate::data::motion::MotionProcessor), so encoder history never
//! leaks from one test into the next. Once a session is closed, further calls return
//! [`DaqError::SessionClosed`].
//!
//! ## Control bytes
//!
//! Devices send single-character control chunks on the same stream as their data: `I`
//! asks the host to identify itself and `R` resets the host's sample counter. These are
//! recognized before routing and reported through [`Ingested`]; the reply to an identify
//! request is produced by [`identify_reply`] for the transport to write back.
//!
//! ## Session books
//!
//! Finished sessions are collected in a [`SessionBook`], which can be saved to and loaded
//! from a JSON file with [`save_book`] and [`load_book`].

use crate::config::DaqConfig;
use crate::core::{Decoded, DeviceType, RawFrame};
use crate::data::trim::trim_flat_tail;
use crate::decoders::lexer;
use crate::error::{AppResult, DaqError, DecodeStats};
use crate::metadata::{SessionMetadata, SessionMetadataBuilder};
use crate::router::DeviceRouter;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Control request embedded in the device stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlSignal {
    /// `I`: the device asks the host to identify itself.
    Identify,
    /// `R`: the device asks the host to reset its sample counter.
    ResetCounter,
}

impl ControlSignal {
    /// Recognize a chunk consisting of a single control character.
    ///
    /// The character may arrive raw, hex-encoded (`"49"`, `"52"`) or surrounded by
    /// line terminators.
    pub fn detect(frame: &RawFrame<'_>) -> Option<Self> {
        let text = lexer::ascii_text(&lexer::normalize(&frame.data));
        match text.trim() {
            "I" => Some(ControlSignal::Identify),
            "R" => Some(ControlSignal::ResetCounter),
            _ => None,
        }
    }
}

/// The line written back to a device that sent an identify request.
pub fn identify_reply(machine_id: &str) -> String {
    format!("X:{machine_id}\n")
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Accepting frames.
    Recording,
    /// Finished and handed out as a [`FinishedSession`].
    Finished,
    /// Discarded.
    Cancelled,
}

/// Outcome of ingesting one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Ingested {
    /// Samples decoded from the frame (already appended to the session).
    pub decoded: Decoded,
    /// Control request found in the frame, if any.
    pub control: Option<ControlSignal>,
    /// Bytes the transport should write back to the device.
    pub reply: Option<String>,
}

/// A test being recorded.
#[derive(Debug)]
pub struct AcquisitionSession {
    device: DeviceType,
    router: DeviceRouter,
    samples: Decoded,
    metadata: SessionMetadata,
    max_flat_tail: usize,
    counter: u64,
    state: SessionState,
}

impl AcquisitionSession {
    /// Start recording from `device` with a fresh router and motion pipeline.
    ///
    /// # Errors
    /// Fails if the configured encoder terminators are unusable or the pipeline
    /// parameters cannot be recorded in the metadata.
    pub fn start(device: DeviceType, config: &DaqConfig) -> AppResult<Self> {
        let router = DeviceRouter::new(config)?;
        let metadata = SessionMetadataBuilder::new(device)
            .machine_id(device.machine_id())
            .parameter("decoders", serde_json::to_value(&config.decoders)?)
            .parameter("motion", serde_json::to_value(&config.motion)?)
            .build();
        info!(%device, "session started");
        Ok(Self {
            device,
            router,
            samples: Decoded::empty_for(device),
            metadata,
            max_flat_tail: config.session.max_flat_tail,
            counter: 0,
            state: SessionState::Recording,
        })
    }

    /// Attach free-form notes to the session metadata.
    pub fn set_notes(&mut self, notes: &str) {
        self.metadata.notes = notes.to_string();
    }

    /// Route one frame and append its samples.
    pub fn ingest(&mut self, frame: &RawFrame<'_>) -> AppResult<Ingested> {
        self.ensure_recording()?;

        if let Some(signal) = ControlSignal::detect(frame) {
            debug!(?signal, "control chunk");
            let reply = match signal {
                ControlSignal::Identify => Some(identify_reply(self.device.machine_id())),
                ControlSignal::ResetCounter => {
                    self.counter = 0;
                    None
                }
            };
            return Ok(Ingested {
                decoded: Decoded::empty_for(self.device),
                control: Some(signal),
                reply,
            });
        }

        let decoded = self.router.route(self.device, frame);
        self.counter += decoded.len() as u64;
        if !append_samples(&mut self.samples, &decoded) {
            warn!(device = %self.device, lost = decoded.len(), "decoded samples do not match session shape");
        }
        Ok(Ingested {
            decoded,
            control: None,
            reply: None,
        })
    }

    /// Trim the trailing plateau, label the session and freeze it.
    ///
    /// # Errors
    /// Returns [`DaqError::SessionClosed`] if the session is no longer recording and
    /// [`DaqError::InvalidMetadata`] for a blank label. A rejected label leaves the
    /// session recording.
    pub fn finish(&mut self, label: &str) -> AppResult<FinishedSession> {
        self.ensure_recording()?;

        let mut metadata = self.metadata.clone();
        metadata.label = label.trim().to_string();
        metadata.finished_at = Some(Utc::now());
        metadata.decode_stats = self.router.stats().into();
        metadata.validate().map_err(DaqError::InvalidMetadata)?;

        self.state = SessionState::Finished;
        let samples = match std::mem::replace(&mut self.samples, Decoded::empty_for(self.device)) {
            Decoded::Scalars(samples) => Decoded::Scalars(trim_flat_tail(samples, self.max_flat_tail)),
            Decoded::Forces(pairs) => Decoded::Forces(trim_flat_tail(pairs, self.max_flat_tail)),
        };

        info!(
            device = %self.device,
            label,
            samples = samples.len(),
            "session finished"
        );
        Ok(FinishedSession { metadata, samples })
    }

    /// Discard everything recorded so far.
    pub fn cancel(&mut self) -> AppResult<()> {
        self.ensure_recording()?;
        self.state = SessionState::Cancelled;
        info!(device = %self.device, discarded = self.samples.len(), "session cancelled");
        self.samples = Decoded::empty_for(self.device);
        Ok(())
    }

    fn ensure_recording(&self) -> AppResult<()> {
        match self.state {
            SessionState::Recording => Ok(()),
            _ => Err(DaqError::SessionClosed(format!(
                "{} started {}",
                self.device,
                self.metadata.started_at.to_rfc3339()
            ))),
        }
    }

    /// The device being recorded.
    pub fn device(&self) -> DeviceType {
        self.device
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Samples recorded so far.
    pub fn samples(&self) -> &Decoded {
        &self.samples
    }

    /// Samples since the device last sent a counter reset.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Decode statistics so far.
    pub fn stats(&self) -> DecodeStats {
        self.router.stats()
    }

    /// The router owned by this session.
    pub fn router(&self) -> &DeviceRouter {
        &self.router
    }
}

/// Append `new` to `all` when both have the same shape. Returns false otherwise.
fn append_samples(all: &mut Decoded, new: &Decoded) -> bool {
    match (all, new) {
        (Decoded::Scalars(all), Decoded::Scalars(new)) => all.extend_from_slice(new),
        (Decoded::Forces(all), Decoded::Forces(new)) => all.extend_from_slice(new),
        _ => return false,
    }
    true
}

/// A labelled, trimmed and immutable test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishedSession {
    metadata: SessionMetadata,
    samples: Decoded,
}

impl FinishedSession {
    /// Session metadata.
    pub fn metadata(&self) -> &SessionMetadata {
        &self.metadata
    }

    /// Final samples.
    pub fn samples(&self) -> &Decoded {
        &self.samples
    }

    /// Device the samples came from.
    pub fn device(&self) -> DeviceType {
        self.metadata.device
    }

    /// Operator label.
    pub fn label(&self) -> &str {
        &self.metadata.label
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when the session holds no sample.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// An ordered collection of finished sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionBook {
    sessions: Vec<FinishedSession>,
}

impl SessionBook {
    /// An empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finished session; returns its 1-based test number.
    pub fn push(&mut self, session: FinishedSession) -> usize {
        self.sessions.push(session);
        self.sessions.len()
    }

    /// Sessions in the order they were added.
    pub fn sessions(&self) -> &[FinishedSession] {
        &self.sessions
    }

    /// Number of sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// True when the book is empty.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Saves a session book to a JSON file, creating parent directories.
pub fn save_book(book: &SessionBook, path: &Path) -> AppResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(book)?;
    fs::write(path, json)?;
    Ok(())
}

/// Loads a session book from a JSON file.
pub fn load_book(path: &Path) -> AppResult<SessionBook> {
    let json = fs::read_to_string(path)?;
    let book = serde_json::from_str(&json)?;
    Ok(book)
}
