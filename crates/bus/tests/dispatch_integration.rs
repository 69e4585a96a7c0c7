//! Integration tests for the dispatch loop and handler envelopes.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bus::{
    Aggregate, BusError, Command, Event, Handler, HandlerContext, HandlerLogic, JobId,
    MessageBus, MessageHandler, MessageKind, ReadOnlyStore, Store,
};
use store::InMemoryStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum StepCommandKind {
    Create,
    Explode,
    FanOut,
    Step,
    CreatePair,
}

impl MessageKind for StepCommandKind {
    fn all() -> &'static [Self] {
        &[
            StepCommandKind::Create,
            StepCommandKind::Explode,
            StepCommandKind::FanOut,
            StepCommandKind::Step,
            StepCommandKind::CreatePair,
        ]
    }

    fn name(self) -> &'static str {
        match self {
            StepCommandKind::Create => "Create",
            StepCommandKind::Explode => "Explode",
            StepCommandKind::FanOut => "FanOut",
            StepCommandKind::Step => "Step",
            StepCommandKind::CreatePair => "CreatePair",
        }
    }
}

#[derive(Debug, Clone)]
enum StepCommand {
    Create(JobId),
    Explode(JobId),
    FanOut(JobId),
    Step(JobId, &'static str),
    CreatePair(JobId),
}

impl Command for StepCommand {
    type Kind = StepCommandKind;

    fn kind(&self) -> StepCommandKind {
        match self {
            StepCommand::Create(_) => StepCommandKind::Create,
            StepCommand::Explode(_) => StepCommandKind::Explode,
            StepCommand::FanOut(_) => StepCommandKind::FanOut,
            StepCommand::Step(..) => StepCommandKind::Step,
            StepCommand::CreatePair(_) => StepCommandKind::CreatePair,
        }
    }

    fn external_job_id(&self) -> &JobId {
        match self {
            StepCommand::Create(id)
            | StepCommand::Explode(id)
            | StepCommand::FanOut(id)
            | StepCommand::Step(id, _)
            | StepCommand::CreatePair(id) => id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum StepEventKind {
    Created,
    Branched,
    Stepped,
}

impl MessageKind for StepEventKind {
    fn all() -> &'static [Self] {
        &[
            StepEventKind::Created,
            StepEventKind::Branched,
            StepEventKind::Stepped,
        ]
    }

    fn name(self) -> &'static str {
        match self {
            StepEventKind::Created => "Created",
            StepEventKind::Branched => "Branched",
            StepEventKind::Stepped => "Stepped",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum StepEvent {
    Created(JobId),
    Branched(JobId, &'static str),
    Stepped(JobId, &'static str),
}

impl Event for StepEvent {
    type Kind = StepEventKind;

    fn kind(&self) -> StepEventKind {
        match self {
            StepEvent::Created(_) => StepEventKind::Created,
            StepEvent::Branched(..) => StepEventKind::Branched,
            StepEvent::Stepped(..) => StepEventKind::Stepped,
        }
    }

    fn external_job_id(&self) -> &JobId {
        match self {
            StepEvent::Created(id) | StepEvent::Branched(id, _) | StepEvent::Stepped(id, _) => {
                id
            }
        }
    }
}

type Bus = MessageBus<StepCommand, StepEvent>;
type Message = bus::Message<StepCommand, StepEvent>;
type Context<'a> = HandlerContext<'a, StepCommand, StepEvent>;
type Journal = Arc<Mutex<Vec<String>>>;

fn label(message: &Message) -> String {
    match message {
        Message::Event(StepEvent::Branched(_, name)) => name.to_string(),
        Message::Event(StepEvent::Stepped(_, name)) => format!("{name}-child"),
        other => other.name().to_string(),
    }
}

struct CreateLogic;

#[async_trait]
impl HandlerLogic<StepCommand, StepEvent> for CreateLogic {
    async fn run(&self, message: &Message, ctx: &mut Context<'_>) -> anyhow::Result<()> {
        let id = message.external_job_id().clone();
        let mut aggregate = Aggregate::new(id.clone());
        aggregate.set("status", "created");
        aggregate.record(StepEvent::Created(id));
        ctx.unit_of_work()?.add(aggregate).await?;
        Ok(())
    }
}

struct CreatePairLogic;

#[async_trait]
impl HandlerLogic<StepCommand, StepEvent> for CreatePairLogic {
    async fn run(&self, message: &Message, ctx: &mut Context<'_>) -> anyhow::Result<()> {
        let base = message.external_job_id();
        for suffix in ["first", "second"] {
            let id = JobId::new(format!("{base}-{suffix}"));
            let mut aggregate = Aggregate::new(id.clone());
            aggregate.record(StepEvent::Created(id));
            ctx.unit_of_work()?.add(aggregate).await?;
        }
        Ok(())
    }
}

struct ExplodeLogic;

#[async_trait]
impl HandlerLogic<StepCommand, StepEvent> for ExplodeLogic {
    async fn run(&self, message: &Message, ctx: &mut Context<'_>) -> anyhow::Result<()> {
        let mut aggregate = Aggregate::new(message.external_job_id().clone());
        aggregate.record(StepEvent::Created(message.external_job_id().clone()));
        ctx.unit_of_work()?.add(aggregate).await?;
        anyhow::bail!("boom")
    }
}

struct FanOutLogic {
    journal: Journal,
}

#[async_trait]
impl HandlerLogic<StepCommand, StepEvent> for FanOutLogic {
    async fn run(&self, message: &Message, ctx: &mut Context<'_>) -> anyhow::Result<()> {
        self.journal.lock().unwrap().push("A".to_string());
        let id = message.external_job_id().clone();
        ctx.emit_event(StepEvent::Branched(id.clone(), "B"));
        ctx.emit_event(StepEvent::Branched(id, "C"));
        Ok(())
    }
}

struct BranchLogic {
    journal: Journal,
}

#[async_trait]
impl HandlerLogic<StepCommand, StepEvent> for BranchLogic {
    async fn run(&self, message: &Message, ctx: &mut Context<'_>) -> anyhow::Result<()> {
        self.journal.lock().unwrap().push(label(message));
        if let Message::Event(StepEvent::Branched(id, name)) = message {
            ctx.emit_event(StepEvent::Stepped(id.clone(), *name));
        }
        Ok(())
    }
}

struct DelegateLogic;

#[async_trait]
impl HandlerLogic<StepCommand, StepEvent> for DelegateLogic {
    async fn run(&self, message: &Message, ctx: &mut Context<'_>) -> anyhow::Result<()> {
        ctx.emit_event(StepEvent::Created(message.external_job_id().clone()));
        ctx.emit_command(StepCommand::Step(message.external_job_id().clone(), "B"));
        Ok(())
    }
}

struct JournalLogic {
    journal: Journal,
}

#[async_trait]
impl HandlerLogic<StepCommand, StepEvent> for JournalLogic {
    async fn run(&self, message: &Message, _ctx: &mut Context<'_>) -> anyhow::Result<()> {
        self.journal.lock().unwrap().push(label(message));
        Ok(())
    }
}

fn create(id: &str) -> Message {
    Message::Command(StepCommand::Create(JobId::new(id)))
}

#[tokio::test]
async fn test_create_chain_persists_and_completes() {
    let store = InMemoryStore::new();
    let bus = Bus::builder()
        .command(
            StepCommandKind::Create,
            Handler::with_unit_of_work(CreateLogic, store.fork()),
        )
        .build();

    bus.handle(create("job-1")).await.unwrap();

    assert_eq!(store.record_count().await, 1);
    let stored = store.fetch(&JobId::new("job-1"), &[]).await.unwrap().unwrap();
    assert_eq!(stored.data["status"], "created");
    let stats = store.stats().await;
    assert_eq!(stats.sessions_opened, 1);
    assert_eq!(stats.sessions_closed, 1);
    assert_eq!(stats.commits, 1);
}

#[tokio::test]
async fn test_business_failure_rolls_back_once() {
    let store = InMemoryStore::new();
    let bus = Bus::builder()
        .command(
            StepCommandKind::Explode,
            Handler::with_unit_of_work(ExplodeLogic, store.fork()),
        )
        .build();

    let error = bus
        .handle(Message::Command(StepCommand::Explode(JobId::new("job-1"))))
        .await
        .unwrap_err();

    assert!(error.to_string().contains("boom"));
    assert_eq!(error.handler(), Some("ExplodeLogic"));
    assert_eq!(store.record_count().await, 0);
    let stats = store.stats().await;
    assert_eq!(stats.sessions_opened, 1);
    assert_eq!(stats.sessions_closed, 1);
    assert_eq!(stats.rollbacks, 1);
    assert_eq!(stats.commits, 0);
}

#[tokio::test]
async fn test_rollback_failure_still_releases_session() {
    let store = InMemoryStore::new();
    store.set_fail_on_rollback(true).await;
    let bus = Bus::builder()
        .command(
            StepCommandKind::Explode,
            Handler::with_unit_of_work(ExplodeLogic, store.fork()),
        )
        .build();

    let error = bus
        .handle(Message::Command(StepCommand::Explode(JobId::new("job-1"))))
        .await
        .unwrap_err();

    assert!(error.to_string().contains("boom"));
    assert_eq!(error.handler(), Some("ExplodeLogic"));
    assert_eq!(store.record_count().await, 0);
    let stats = store.stats().await;
    assert_eq!(stats.sessions_opened, 1);
    assert_eq!(stats.sessions_closed, 1);
    assert_eq!(stats.commits, 0);
}

#[tokio::test]
async fn test_commit_failure_releases_session() {
    let store = InMemoryStore::new();
    store.set_fail_on_commit(true).await;
    let bus = Bus::builder()
        .command(
            StepCommandKind::Create,
            Handler::with_unit_of_work(CreateLogic, store.fork()),
        )
        .build();

    let error = bus.handle(create("job-1")).await.unwrap_err();

    assert!(error.to_string().contains("commit rejected"));
    assert_eq!(store.record_count().await, 0);
    let stats = store.stats().await;
    assert_eq!(stats.sessions_opened, 1);
    assert_eq!(stats.sessions_closed, 1);
    assert_eq!(stats.rollbacks, 1);
}

#[tokio::test]
async fn test_fan_out_is_breadth_first() {
    let journal = Journal::default();
    let bus = Bus::builder()
        .command(
            StepCommandKind::FanOut,
            Handler::without_unit_of_work(FanOutLogic {
                journal: journal.clone(),
            }),
        )
        .event(
            StepEventKind::Branched,
            Handler::without_unit_of_work(BranchLogic {
                journal: journal.clone(),
            }),
        )
        .event(
            StepEventKind::Stepped,
            Handler::without_unit_of_work(JournalLogic {
                journal: journal.clone(),
            }),
        )
        .build();

    bus.handle(Message::Command(StepCommand::FanOut(JobId::new("job-1"))))
        .await
        .unwrap();

    let order = journal.lock().unwrap().clone();
    assert_eq!(order, vec!["A", "B", "C", "B-child", "C-child"]);
}

#[tokio::test]
async fn test_harvested_events_follow_add_order() {
    let store = InMemoryStore::new();
    let handler = Handler::with_unit_of_work(CreatePairLogic, store.fork());

    let outbound = handler
        .handle(Message::Command(StepCommand::CreatePair(JobId::new("job"))))
        .await
        .unwrap();

    let ids: Vec<_> = outbound
        .iter()
        .map(|m| m.external_job_id().to_string())
        .collect();
    assert_eq!(ids, vec!["job-first", "job-second"]);
    assert!(outbound.iter().all(|m| m.is_event()));
    assert_eq!(store.record_count().await, 2);
}

#[tokio::test]
async fn test_unhandled_command_fails_chain() {
    let bus = Bus::builder().build();

    let error = bus.handle(create("job-1")).await.unwrap_err();

    assert!(matches!(error, BusError::UnhandledCommand("Create")));
    assert!(error.to_string().contains("Create"));
}

#[tokio::test]
async fn test_unhandled_command_mid_chain_fails() {
    let store = InMemoryStore::new();
    let bus = Bus::builder()
        .command(
            StepCommandKind::FanOut,
            Handler::without_unit_of_work(DelegateLogic),
        )
        .event(
            StepEventKind::Created,
            Handler::with_unit_of_work(CreateLogic, store.fork()),
        )
        .build();

    let error = bus
        .handle(Message::Command(StepCommand::FanOut(JobId::new("job-1"))))
        .await
        .unwrap_err();

    // The event queued ahead of the command was still handled.
    assert!(matches!(error, BusError::UnhandledCommand("Step")));
    assert_eq!(store.record_count().await, 1);
}

#[tokio::test]
async fn test_unhandled_event_is_dropped() {
    let bus = Bus::builder().build();

    bus.handle(Message::Event(StepEvent::Created(JobId::new("job-1"))))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_concurrent_chains_share_one_bus() {
    let store = InMemoryStore::new();
    let bus = Arc::new(
        Bus::builder()
            .command(
                StepCommandKind::Create,
                Handler::with_unit_of_work(CreateLogic, store.fork()),
            )
            .build(),
    );

    let mut tasks = Vec::new();
    for i in 0..8 {
        let bus = Arc::clone(&bus);
        tasks.push(tokio::spawn(async move {
            bus.handle(create(&format!("job-{i}"))).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(store.record_count().await, 8);
    let stats = store.stats().await;
    assert_eq!(stats.sessions_opened, 8);
    assert_eq!(stats.sessions_closed, 8);
}
