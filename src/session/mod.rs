//! Session recording, storage and playback
//!
//! # Features
//!
//! - Capture live telemetry into a [`RecordingBuffer`], optionally with an
//!   auto-stop deadline
//! - Save sessions as JSON files through a [`SessionStore`]
//! - Ingest legacy CSV recordings
//! - Replay CSV or session data at variable speed with looping and seeking
//!   through the [`PlaybackEngine`]

pub mod csv;
pub mod player;
pub mod recorder;
pub mod store;
pub mod types;

pub use csv::{load_csv, parse_csv, CsvRecording};
pub use player::{ActiveSession, EngineState, PlaybackEngine, PlaybackMode};
pub use recorder::RecordingBuffer;
pub use store::{LocalSessionStore, MemorySessionStore, SessionStore};
pub use types::{Frame, Session, SessionConfig, SessionMeta, SessionSummary};
