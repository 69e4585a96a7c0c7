//! Message model: commands, events and the sum type the bus routes.

use std::fmt::Debug;
use std::hash::Hash;

use common::JobId;

/// Routing tag of a concrete command or event variant.
///
/// Applications define one fieldless enum per message family; the bus keys
/// its handler maps by these tags.
pub trait MessageKind: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    /// Every variant of the family, used to check handler coverage.
    fn all() -> &'static [Self];

    /// Stable name of the variant, used in logs and errors.
    fn name(self) -> &'static str;
}

/// A request to change state.
///
/// Each command kind must have exactly one handler; a command the bus cannot
/// route aborts the chain.
pub trait Command: Debug + Send + Sync + 'static {
    /// The routing tag family of this command type.
    type Kind: MessageKind;

    /// Returns the concrete variant tag.
    fn kind(&self) -> Self::Kind;

    /// Returns the correlation id of the chain this command belongs to.
    fn external_job_id(&self) -> &JobId;

    /// Returns the variant name.
    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Human-readable description for logs.
    fn context(&self) -> String {
        format!("{} [{}]", self.name(), self.external_job_id())
    }
}

/// A fact that already happened to an aggregate.
///
/// Events may have zero or one handler; an unhandled event is a leaf of the
/// chain. An event carrying a non-empty [`Event::error`] describes a failed
/// step, not a crash.
pub trait Event: Debug + Clone + Send + Sync + 'static {
    /// The routing tag family of this event type.
    type Kind: MessageKind;

    /// Returns the concrete variant tag.
    fn kind(&self) -> Self::Kind;

    /// Returns the correlation id of the aggregate that produced the event.
    fn external_job_id(&self) -> &JobId;

    /// Failure description, if this event records a failed step.
    fn error(&self) -> Option<&str> {
        None
    }

    /// Returns true if the event carries a non-empty error.
    fn is_failure(&self) -> bool {
        self.error().is_some_and(|e| !e.is_empty())
    }

    /// Returns the variant name.
    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Event name combined with the aggregate's correlation id.
    fn context(&self) -> String {
        format!("{}:{}", self.name(), self.external_job_id())
    }
}

/// Anything that flows through the bus.
#[derive(Debug, Clone)]
pub enum Message<C, E> {
    Command(C),
    Event(E),
}

impl<C: Command, E: Event> Message<C, E> {
    /// Returns the concrete variant name.
    pub fn name(&self) -> &'static str {
        match self {
            Message::Command(command) => command.name(),
            Message::Event(event) => event.name(),
        }
    }

    /// Returns the log context of the wrapped message.
    pub fn context(&self) -> String {
        match self {
            Message::Command(command) => command.context(),
            Message::Event(event) => event.context(),
        }
    }

    /// Returns the correlation id of the wrapped message.
    pub fn external_job_id(&self) -> &JobId {
        match self {
            Message::Command(command) => command.external_job_id(),
            Message::Event(event) => event.external_job_id(),
        }
    }

    pub fn is_command(&self) -> bool {
        matches!(self, Message::Command(_))
    }

    pub fn is_event(&self) -> bool {
        matches!(self, Message::Event(_))
    }

    /// Returns the wrapped command, if this is one.
    pub fn as_command(&self) -> Option<&C> {
        match self {
            Message::Command(command) => Some(command),
            Message::Event(_) => None,
        }
    }

    /// Returns the wrapped event, if this is one.
    pub fn as_event(&self) -> Option<&E> {
        match self {
            Message::Event(event) => Some(event),
            Message::Command(_) => None,
        }
    }
}
