//! Handler registration for the job pipeline.

use std::sync::Arc;

use bus::{Handler, Message, MessageBus};
use store::Store;

use crate::analyzer::Analyzer;
use crate::commands::{JobCommand, JobCommandKind};
use crate::events::{JobEvent, JobEventKind};
use crate::handlers::{AnalyzeJobHandler, CreateJobHandler, RequestAnalysisHandler};

pub type JobBus = MessageBus<JobCommand, JobEvent>;
pub type JobMessage = Message<JobCommand, JobEvent>;

/// Builds the job pipeline bus.
///
/// Transactional handlers work on handles forked from `store`. `JobAnalyzed`
/// and `JobFailed` have no handler and end the chain. Fails if a command kind
/// is left without a handler.
pub fn build_bus(store: &dyn Store, analyzer: Arc<dyn Analyzer>) -> bus::Result<JobBus> {
    JobBus::builder()
        .command(
            JobCommandKind::CreateJob,
            Handler::with_unit_of_work(CreateJobHandler, store.fork()),
        )
        .command(
            JobCommandKind::AnalyzeJob,
            Handler::with_unit_of_work(AnalyzeJobHandler::new(analyzer), store.fork()),
        )
        .event(
            JobEventKind::JobCreated,
            Handler::without_unit_of_work(RequestAnalysisHandler),
        )
        .try_build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::InMemoryAnalyzer;
    use bus::MessageKind;
    use store::InMemoryStore;

    #[test]
    fn test_every_command_has_a_handler() {
        let bus = build_bus(&InMemoryStore::new(), Arc::new(InMemoryAnalyzer::new())).unwrap();

        for kind in JobCommandKind::all() {
            assert!(bus.has_command_handler(*kind), "{} unhandled", kind.name());
        }
        assert!(bus.has_event_handler(JobEventKind::JobCreated));
        assert!(!bus.has_event_handler(JobEventKind::JobAnalyzed));
        assert!(!bus.has_event_handler(JobEventKind::JobFailed));
    }
}
