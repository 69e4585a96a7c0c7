//! Handler template: the envelope business logic runs inside.

use async_trait::async_trait;
use store::Store;

use crate::error::{BusError, Result};
use crate::message::{Command, Event, Message};
use crate::unit_of_work::UnitOfWork;

/// Anything the bus can route a message to.
///
/// Implementations must be shareable across concurrent chains; per-call state
/// lives inside [`handle`](Self::handle).
#[async_trait]
pub trait MessageHandler<C: Command, E: Event>: Send + Sync {
    /// Identity used in logs and errors.
    fn name(&self) -> &'static str;

    /// Processes one message and returns the messages it produced, in order.
    async fn handle(&self, message: Message<C, E>) -> Result<Vec<Message<C, E>>>;
}

/// Business logic plugged into a [`Handler`].
///
/// # Example
///
/// ```ignore
/// struct CreateJobLogic;
///
/// #[async_trait]
/// impl HandlerLogic<JobCommand, JobEvent> for CreateJobLogic {
///     async fn run(
///         &self,
///         message: &Message<JobCommand, JobEvent>,
///         ctx: &mut HandlerContext<'_, JobCommand, JobEvent>,
///     ) -> anyhow::Result<()> {
///         let job = Aggregate::new(message.external_job_id().clone());
///         ctx.unit_of_work()?.add(job).await?;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait HandlerLogic<C: Command, E: Event>: Send + Sync {
    /// Identity used in logs and errors. Defaults to the type name.
    fn name(&self) -> &'static str {
        let full = std::any::type_name::<Self>();
        let path = full.split('<').next().unwrap_or(full);
        path.rsplit("::").next().unwrap_or(path)
    }

    async fn run(
        &self,
        message: &Message<C, E>,
        ctx: &mut HandlerContext<'_, C, E>,
    ) -> anyhow::Result<()>;
}

/// What business logic sees during one invocation.
pub struct HandlerContext<'a, C, E> {
    unit_of_work: Option<&'a mut UnitOfWork<E>>,
    outbound: Vec<Message<C, E>>,
}

impl<'a, C: Command, E: Event> HandlerContext<'a, C, E> {
    fn new(unit_of_work: Option<&'a mut UnitOfWork<E>>) -> Self {
        Self {
            unit_of_work,
            outbound: Vec::new(),
        }
    }

    /// Returns the invocation's unit of work.
    ///
    /// Fails for handlers registered without one.
    pub fn unit_of_work(&mut self) -> Result<&mut UnitOfWork<E>> {
        self.unit_of_work
            .as_deref_mut()
            .ok_or(BusError::UnitOfWorkNotInitialized)
    }

    pub fn has_unit_of_work(&self) -> bool {
        self.unit_of_work.is_some()
    }

    /// Queues a message to return to the bus.
    pub fn emit(&mut self, message: Message<C, E>) {
        self.outbound.push(message);
    }

    pub fn emit_command(&mut self, command: C) {
        self.emit(Message::Command(command));
    }

    pub fn emit_event(&mut self, event: E) {
        self.emit(Message::Event(event));
    }

    /// Messages emitted so far.
    pub fn outbound(&self) -> &[Message<C, E>] {
        &self.outbound
    }

    fn into_outbound(self) -> Vec<Message<C, E>> {
        self.outbound
    }
}

/// Reusable handler skeleton.
///
/// With a store attached, every invocation runs in a fresh [`UnitOfWork`]
/// forked from it: the logic runs, harvested events are appended after any
/// explicitly emitted messages, and the session commits. Any failure rolls
/// back. The session is released exactly once on every path.
///
/// Failures are logged here, once, and returned as [`BusError::Handler`].
pub struct Handler<L> {
    logic: L,
    store: Option<Box<dyn Store>>,
}

impl<L> Handler<L> {
    /// Runs `logic` inside a unit of work over handles forked from `store`.
    pub fn with_unit_of_work(logic: L, store: Box<dyn Store>) -> Self {
        Self {
            logic,
            store: Some(store),
        }
    }

    /// Runs `logic` with no storage access.
    pub fn without_unit_of_work(logic: L) -> Self {
        Self { logic, store: None }
    }

    pub fn logic(&self) -> &L {
        &self.logic
    }

    pub fn uses_unit_of_work(&self) -> bool {
        self.store.is_some()
    }

    async fn handle_in_unit_of_work<C, E>(
        &self,
        store: Box<dyn Store>,
        message: &Message<C, E>,
    ) -> Result<Vec<Message<C, E>>>
    where
        C: Command,
        E: Event,
        L: HandlerLogic<C, E>,
    {
        let name = self.logic.name();
        let mut uow = UnitOfWork::for_store(store);

        if let Err(error) = uow.enter().await {
            tracing::error!(handler = name, error = %error, "failed to open unit of work");
            return Err(BusError::in_handler(name, error));
        }

        let mut outbound = Vec::new();
        match self.run_and_commit(message, &mut uow, &mut outbound).await {
            Ok(()) => {
                if let Err(error) = uow.exit(None).await {
                    tracing::error!(handler = name, error = %error, "failed to release unit of work");
                    return Err(BusError::in_handler(name, error));
                }
                Ok(outbound)
            }
            Err(source) => {
                tracing::error!(handler = name, error = %format!("{source:#}"), "handler failed");
                let error = BusError::Handler {
                    handler: name,
                    source,
                };
                if let Err(exit_error) = uow.exit(Some(&error)).await {
                    tracing::error!(handler = name, error = %exit_error, "failed to release unit of work");
                }
                Err(error)
            }
        }
    }

    async fn run_and_commit<C, E>(
        &self,
        message: &Message<C, E>,
        uow: &mut UnitOfWork<E>,
        outbound: &mut Vec<Message<C, E>>,
    ) -> anyhow::Result<()>
    where
        C: Command,
        E: Event,
        L: HandlerLogic<C, E>,
    {
        let mut ctx = HandlerContext::new(Some(&mut *uow));
        self.logic.run(message, &mut ctx).await?;
        outbound.extend(ctx.into_outbound());

        let events = uow.collect_new_events()?;
        outbound.extend(events.iter().cloned().map(Message::Event));
        uow.commit().await?;
        Ok(())
    }

    async fn handle_plain<C, E>(&self, message: &Message<C, E>) -> Result<Vec<Message<C, E>>>
    where
        C: Command,
        E: Event,
        L: HandlerLogic<C, E>,
    {
        let name = self.logic.name();
        let mut ctx = HandlerContext::new(None);
        match self.logic.run(message, &mut ctx).await {
            Ok(()) => Ok(ctx.into_outbound()),
            Err(source) => {
                tracing::error!(handler = name, error = %format!("{source:#}"), "handler failed");
                Err(BusError::Handler {
                    handler: name,
                    source,
                })
            }
        }
    }
}

#[async_trait]
impl<C, E, L> MessageHandler<C, E> for Handler<L>
where
    C: Command,
    E: Event,
    L: HandlerLogic<C, E>,
{
    fn name(&self) -> &'static str {
        self.logic.name()
    }

    async fn handle(&self, message: Message<C, E>) -> Result<Vec<Message<C, E>>> {
        tracing::debug!(handler = self.logic.name(), message = %message.context(), "handling");
        match &self.store {
            Some(store) => self.handle_in_unit_of_work(store.fork(), &message).await,
            None => self.handle_plain(&message).await,
        }
    }
}
