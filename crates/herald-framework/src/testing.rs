//! In-memory interactions that record what the engine sends back.
//!
//! Available to this crate's tests and, behind the `testing` feature, to
//! downstream test suites.

use std::sync::Arc;

use async_trait::async_trait;
use herald_core::{
    AutocompleteInteraction, Choice, CommandInteraction, CommandOptions, FocusedOption,
    Interaction, Reply, TransportError, TransportResult, UserId,
};
use parking_lot::Mutex;
use serde_json::Value;

/// One call the engine made on a [`RecordingCommand`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Deferred,
    Reply(Reply),
    EditReply(Reply),
}

impl Recorded {
    /// The reply carried by this call, if any.
    pub fn reply(&self) -> Option<&Reply> {
        match self {
            Self::Deferred => None,
            Self::Reply(r) | Self::EditReply(r) => Some(r),
        }
    }
}

/// A command invocation that records every acknowledgement and reply.
#[derive(Debug)]
pub struct RecordingCommand {
    name: String,
    user: UserId,
    options: CommandOptions,
    fail_defer: bool,
    calls: Mutex<Vec<Recorded>>,
}

impl RecordingCommand {
    pub fn new(name: impl Into<String>, user: impl Into<UserId>) -> Self {
        Self {
            name: name.into(),
            user: user.into(),
            options: CommandOptions::new(),
            fail_defer: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_option(mut self, name: impl Into<String>, value: Value) -> Self {
        self.options.insert(name.into(), value);
        self
    }

    /// Makes `defer_reply` fail as if the interaction had expired.
    pub fn failing_defer(mut self) -> Self {
        self.fail_defer = true;
        self
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().clone()
    }

    /// The most recent reply, whether sent or edited.
    pub fn last_reply(&self) -> Option<Reply> {
        self.calls
            .lock()
            .iter()
            .rev()
            .find_map(|c| c.reply().cloned())
    }

    pub fn into_interaction(self) -> (Arc<Self>, Interaction) {
        let this = Arc::new(self);
        let interaction = Interaction::Command(this.clone());
        (this, interaction)
    }
}

#[async_trait]
impl CommandInteraction for RecordingCommand {
    fn command_name(&self) -> &str {
        &self.name
    }

    fn user(&self) -> &UserId {
        &self.user
    }

    fn options(&self) -> &CommandOptions {
        &self.options
    }

    async fn defer_reply(&self) -> TransportResult<()> {
        if self.fail_defer {
            return Err(TransportError::Expired);
        }
        self.calls.lock().push(Recorded::Deferred);
        Ok(())
    }

    async fn reply(&self, reply: Reply) -> TransportResult<()> {
        self.calls.lock().push(Recorded::Reply(reply));
        Ok(())
    }

    async fn edit_reply(&self, reply: Reply) -> TransportResult<()> {
        self.calls.lock().push(Recorded::EditReply(reply));
        Ok(())
    }
}

/// An autocomplete request that records every response.
#[derive(Debug)]
pub struct RecordingAutocomplete {
    name: String,
    user: UserId,
    focused: FocusedOption,
    responses: Mutex<Vec<Vec<Choice>>>,
}

impl RecordingAutocomplete {
    pub fn new(
        name: impl Into<String>,
        user: impl Into<UserId>,
        option: impl Into<String>,
        partial: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            user: user.into(),
            focused: FocusedOption::new(option, partial),
            responses: Mutex::new(Vec::new()),
        }
    }

    pub fn responses(&self) -> Vec<Vec<Choice>> {
        self.responses.lock().clone()
    }

    pub fn into_interaction(self) -> (Arc<Self>, Interaction) {
        let this = Arc::new(self);
        let interaction = Interaction::Autocomplete(this.clone());
        (this, interaction)
    }
}

#[async_trait]
impl AutocompleteInteraction for RecordingAutocomplete {
    fn command_name(&self) -> &str {
        &self.name
    }

    fn user(&self) -> &UserId {
        &self.user
    }

    fn focused(&self) -> &FocusedOption {
        &self.focused
    }

    async fn respond(&self, choices: Vec<Choice>) -> TransportResult<()> {
        self.responses.lock().push(choices);
        Ok(())
    }
}
