//! Document-processing job pipeline.
//!
//! A job is submitted with a document, then analyzed by an external
//! [`Analyzer`]:
//! 1. `CreateJob` stores the job and records `JobCreated`
//! 2. `JobCreated` requests analysis with `AnalyzeJob`
//! 3. `AnalyzeJob` calls the analyzer and records `JobAnalyzed` or `JobFailed`
//!
//! An analyzer failure is a recorded outcome, not a crash: the chain still
//! completes and the job is stored with status `failed`.

pub mod analyzer;
pub mod commands;
pub mod error;
pub mod events;
pub mod handlers;
pub mod job;
pub mod wiring;

pub use analyzer::{Analysis, Analyzer, InMemoryAnalyzer};
pub use commands::{AnalyzeJob, CreateJob, JobCommand, JobCommandKind};
pub use error::{JobError, Result};
pub use events::{JobAnalyzedData, JobCreatedData, JobEvent, JobEventKind, JobFailedData};
pub use handlers::{AnalyzeJobHandler, CreateJobHandler, RequestAnalysisHandler};
pub use job::{JobStatus, JobView};
pub use wiring::{JobBus, JobMessage, build_bus};
