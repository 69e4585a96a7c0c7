//! Document analyzer client trait and in-memory implementation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use common::JobId;
use serde::{Deserialize, Serialize};

use crate::error::JobError;

/// What the analyzer reports about a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub words: usize,
    pub characters: usize,
    pub lines: usize,
}

/// External service that analyzes job documents.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Analyzes the document of the given job.
    async fn analyze(&self, external_job_id: &JobId, document: &str) -> Result<Analysis, JobError>;
}

#[derive(Debug, Default)]
struct InMemoryAnalyzerState {
    calls: AtomicUsize,
    fail_on_analyze: AtomicBool,
}

/// In-memory analyzer for tests and local runs.
///
/// Counts words, characters and lines locally.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAnalyzer {
    state: Arc<InMemoryAnalyzerState>,
}

impl InMemoryAnalyzer {
    /// Creates a new in-memory analyzer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the analyzer to fail every call.
    pub fn set_fail_on_analyze(&self, fail: bool) {
        self.state.fail_on_analyze.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of analyze calls made so far.
    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Analyzer for InMemoryAnalyzer {
    async fn analyze(&self, external_job_id: &JobId, document: &str) -> Result<Analysis, JobError> {
        self.state.calls.fetch_add(1, Ordering::SeqCst);

        if self.state.fail_on_analyze.load(Ordering::SeqCst) {
            return Err(JobError::Analyzer(format!(
                "analysis unavailable for {external_job_id}"
            )));
        }

        Ok(Analysis {
            words: document.split_whitespace().count(),
            characters: document.chars().count(),
            lines: document.lines().count(),
        })
    }
}
