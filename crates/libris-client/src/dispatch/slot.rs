//! Per-action state machines
//!
//! Each [`ActionKind`] has one slot moving `Idle -> InFlight -> Succeeded | Failed`.
//! A slot that is `InFlight` refuses a second start, which is what keeps a
//! front end from submitting the same action twice.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

use crate::error::DispatchError;

/// A user-initiated action against the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActionKind {
    Borrow,
    Return,
    AddBook,
    DeleteBook,
    AddUser,
    DeleteUser,
}

impl ActionKind {
    pub const ALL: [ActionKind; 6] = [
        ActionKind::Borrow,
        ActionKind::Return,
        ActionKind::AddBook,
        ActionKind::DeleteBook,
        ActionKind::AddUser,
        ActionKind::DeleteUser,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::Borrow => "Borrow",
            ActionKind::Return => "Return",
            ActionKind::AddBook => "Add book",
            ActionKind::DeleteBook => "Delete book",
            ActionKind::AddUser => "Add user",
            ActionKind::DeleteUser => "Delete user",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SlotState {
    #[default]
    Idle,
    InFlight,
    Succeeded,
    /// Carries the message shown to the user
    Failed(String),
}

impl SlotState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, SlotState::InFlight)
    }
}

/// Current state of every slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotStates(BTreeMap<ActionKind, SlotState>);

impl SlotStates {
    pub fn get(&self, kind: ActionKind) -> &SlotState {
        // Every kind is inserted at construction
        static IDLE: SlotState = SlotState::Idle;
        self.0.get(&kind).unwrap_or(&IDLE)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ActionKind, &SlotState)> {
        self.0.iter().map(|(kind, state)| (*kind, state))
    }

    pub fn any_in_flight(&self) -> bool {
        self.0.values().any(SlotState::is_in_flight)
    }
}

impl Default for SlotStates {
    fn default() -> Self {
        Self(ActionKind::ALL.iter().map(|k| (*k, SlotState::Idle)).collect())
    }
}

/// Shared handle to the action slots
///
/// Clones observe and gate the same slots.
#[derive(Debug, Clone)]
pub struct ActionSlots {
    states: Arc<watch::Sender<SlotStates>>,
}

impl ActionSlots {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(SlotStates::default());
        Self {
            states: Arc::new(sender),
        }
    }

    pub fn state(&self, kind: ActionKind) -> SlotState {
        self.states.borrow().get(kind).clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SlotStates> {
        self.states.subscribe()
    }

    /// Move `kind` to `InFlight`, or refuse if it already is
    pub fn acquire(&self, kind: ActionKind) -> Result<SlotGuard, DispatchError> {
        let acquired = self.states.send_if_modified(|states| {
            if states.get(kind).is_in_flight() {
                return false;
            }
            states.0.insert(kind, SlotState::InFlight);
            true
        });

        if !acquired {
            tracing::debug!(action = %kind, "action already in flight");
            return Err(DispatchError::ActionInFlight(kind));
        }

        Ok(SlotGuard {
            slots: self.clone(),
            kind,
            finished: false,
        })
    }

    fn set(&self, kind: ActionKind, state: SlotState) {
        self.states.send_modify(|states| {
            states.0.insert(kind, state);
        });
    }
}

impl Default for ActionSlots {
    fn default() -> Self {
        Self::new()
    }
}

/// An acquired slot; dropping it unfinished returns the slot to `Idle`
#[derive(Debug)]
pub struct SlotGuard {
    slots: ActionSlots,
    kind: ActionKind,
    finished: bool,
}

impl SlotGuard {
    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    pub fn succeed(mut self) {
        self.finish(SlotState::Succeeded);
    }

    pub fn fail(mut self, message: impl Into<String>) {
        self.finish(SlotState::Failed(message.into()));
    }

    fn finish(&mut self, state: SlotState) {
        self.slots.set(self.kind, state);
        self.finished = true;
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        if !self.finished {
            self.slots.set(self.kind, SlotState::Idle);
        }
    }
}
