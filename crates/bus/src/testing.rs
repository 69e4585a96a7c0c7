//! Message types shared by the unit tests of this crate.

use common::JobId;

use crate::message::{Command, Event, MessageKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteCommandKind {
    Write,
}

impl MessageKind for NoteCommandKind {
    fn all() -> &'static [Self] {
        &[NoteCommandKind::Write]
    }

    fn name(self) -> &'static str {
        "Write"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Write(pub JobId);

impl Command for Write {
    type Kind = NoteCommandKind;

    fn kind(&self) -> NoteCommandKind {
        NoteCommandKind::Write
    }

    fn external_job_id(&self) -> &JobId {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoteKind;

impl MessageKind for NoteKind {
    fn all() -> &'static [Self] {
        &[NoteKind]
    }

    fn name(self) -> &'static str {
        "Note"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Note(pub JobId, pub &'static str);

impl Note {
    pub fn new(id: &str, label: &'static str) -> Self {
        Self(JobId::new(id), label)
    }
}

impl Event for Note {
    type Kind = NoteKind;

    fn kind(&self) -> NoteKind {
        NoteKind
    }

    fn external_job_id(&self) -> &JobId {
        &self.0
    }
}
