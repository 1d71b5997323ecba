//! Platform-facing lookups and reporting
//!
//! The engine itself owns no durable data. Subject metadata, per-subject
//! skill ratings, and formed-match reporting all live behind the traits in
//! this module, so the gateway can be wired to the real platform services
//! or to in-memory stand-ins in tests.

pub mod recorder;
pub mod stats;
pub mod subjects;

// Re-export commonly used types
pub use recorder::{LoggingMatchRecorder, MatchRecorder, RecordingMatchRecorder};
pub use stats::{InMemorySkillStats, SkillStatsProvider};
pub use subjects::{StaticSubjectDirectory, SubjectDirectory};
