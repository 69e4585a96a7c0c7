//! Command/event dispatch core.
//!
//! This crate provides:
//! - The message model: [`Command`], [`Event`] and the [`Message`] sum type
//! - [`Aggregate`], the unit of business state that buffers the events it causes
//! - [`Repository`] and [`UnitOfWork`], the transactional envelope around a store
//!   session that harvests those events
//! - [`Handler`], the reusable skeleton business logic plugs into
//! - [`MessageBus`], the FIFO loop that routes messages until a chain settles

pub mod aggregate;
pub mod bus;
pub mod error;
pub mod handler;
pub mod message;
pub mod repository;
pub mod unit_of_work;

#[cfg(test)]
mod testing;

pub use aggregate::{Aggregate, EventBuffer};
pub use bus::{MessageBus, MessageBusBuilder};
pub use error::{BusError, Result};
pub use handler::{Handler, HandlerContext, HandlerLogic, MessageHandler};
pub use message::{Command, Event, Message, MessageKind};
pub use repository::Repository;
pub use unit_of_work::UnitOfWork;

pub use common::JobId;
pub use store::{ReadOnlyStore, Store, StoreError};
