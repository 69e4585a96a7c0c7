//! The dispatch loop.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use crate::error::{BusError, Result};
use crate::handler::MessageHandler;
use crate::message::{Command, Event, Message, MessageKind};

type SharedHandler<C, E> = Arc<dyn MessageHandler<C, E>>;

/// Routes messages to handlers until a chain settles.
///
/// Each call to [`handle`](Self::handle) owns its own FIFO queue, so one bus
/// can be shared behind an `Arc` by any number of concurrent chains. Within a
/// chain processing is strictly sequential and breadth-first: messages a
/// handler returns run after everything already queued, in returned order.
///
/// A command without a handler aborts the chain. An event without a handler
/// is a leaf and is dropped.
pub struct MessageBus<C: Command, E: Event> {
    command_handlers: HashMap<C::Kind, SharedHandler<C, E>>,
    event_handlers: HashMap<E::Kind, SharedHandler<C, E>>,
}

impl<C: Command, E: Event> MessageBus<C, E> {
    pub fn builder() -> MessageBusBuilder<C, E> {
        MessageBusBuilder::default()
    }

    pub fn has_command_handler(&self, kind: C::Kind) -> bool {
        self.command_handlers.contains_key(&kind)
    }

    pub fn has_event_handler(&self, kind: E::Kind) -> bool {
        self.event_handlers.contains_key(&kind)
    }

    /// Runs the chain started by `message` to completion.
    #[tracing::instrument(
        skip_all,
        fields(chain_id = %uuid::Uuid::new_v4(), initial = %message.context())
    )]
    pub async fn handle(&self, message: Message<C, E>) -> Result<()> {
        metrics::counter!("bus_chains_started_total").increment(1);
        let start = Instant::now();

        let result = self.run_chain(message).await;

        metrics::histogram!("bus_chain_duration_seconds").record(start.elapsed().as_secs_f64());
        match result {
            Ok(steps) => {
                tracing::info!(steps, "chain completed");
                Ok(())
            }
            Err(error) => {
                metrics::counter!("bus_chains_failed_total").increment(1);
                Err(error)
            }
        }
    }

    async fn run_chain(&self, initial: Message<C, E>) -> Result<usize> {
        let mut queue = VecDeque::from([initial]);
        let mut steps = 0;

        while let Some(message) = queue.pop_front() {
            let Some(handler) = self.route(&message)? else {
                continue;
            };

            metrics::counter!("bus_messages_dispatched_total", "message" => message.name())
                .increment(1);
            let produced = handler.handle(message).await?;
            tracing::debug!(
                handler = handler.name(),
                produced = produced.len(),
                "handler completed"
            );
            queue.extend(produced);
            steps += 1;
        }

        Ok(steps)
    }

    fn route(&self, message: &Message<C, E>) -> Result<Option<SharedHandler<C, E>>> {
        match message {
            Message::Command(command) => match self.command_handlers.get(&command.kind()) {
                Some(handler) => Ok(Some(Arc::clone(handler))),
                None => {
                    tracing::error!(command = %command.context(), "no handler registered for command");
                    Err(BusError::UnhandledCommand(command.name()))
                }
            },
            Message::Event(event) => match self.event_handlers.get(&event.kind()) {
                Some(handler) => Ok(Some(Arc::clone(handler))),
                None => {
                    tracing::debug!(event = %event.context(), "no handler registered for event, dropping");
                    metrics::counter!("bus_events_dropped_total", "event" => event.name())
                        .increment(1);
                    Ok(None)
                }
            },
        }
    }
}

/// Collects handler registrations for a [`MessageBus`].
pub struct MessageBusBuilder<C: Command, E: Event> {
    command_handlers: HashMap<C::Kind, SharedHandler<C, E>>,
    event_handlers: HashMap<E::Kind, SharedHandler<C, E>>,
}

impl<C: Command, E: Event> Default for MessageBusBuilder<C, E> {
    fn default() -> Self {
        Self {
            command_handlers: HashMap::new(),
            event_handlers: HashMap::new(),
        }
    }
}

impl<C: Command, E: Event> MessageBusBuilder<C, E> {
    /// Registers the handler for a command kind, replacing any earlier one.
    pub fn command(mut self, kind: C::Kind, handler: impl MessageHandler<C, E> + 'static) -> Self {
        if self
            .command_handlers
            .insert(kind, Arc::new(handler))
            .is_some()
        {
            tracing::warn!(command = kind.name(), "replacing command handler");
        }
        self
    }

    /// Registers the handler for an event kind, replacing any earlier one.
    pub fn event(mut self, kind: E::Kind, handler: impl MessageHandler<C, E> + 'static) -> Self {
        if self.event_handlers.insert(kind, Arc::new(handler)).is_some() {
            tracing::warn!(event = kind.name(), "replacing event handler");
        }
        self
    }

    /// Builds the bus without checking coverage.
    pub fn build(self) -> MessageBus<C, E> {
        MessageBus {
            command_handlers: self.command_handlers,
            event_handlers: self.event_handlers,
        }
    }

    /// Builds the bus, failing if any command kind has no handler.
    pub fn try_build(self) -> Result<MessageBus<C, E>> {
        let missing: Vec<&'static str> = <C::Kind as MessageKind>::all()
            .iter()
            .filter(|kind| !self.command_handlers.contains_key(*kind))
            .map(|kind| kind.name())
            .collect();

        if !missing.is_empty() {
            return Err(BusError::MissingCommandHandlers(missing));
        }
        Ok(self.build())
    }
}
