//! Plan workflow state machine
//!
//! The plan page never exposes its state directly. It is recovered from
//! which plan controls are visible: each [`PlanState`] carries the
//! visibility predicates that identify it, and [`PlanState::transition`]
//! rejects any move the UI cannot make.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};

/// Buttons on the plan page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlanAction {
    ApplyChangesAndBackfill,
    ApplyVirtualUpdate,
    StartOver,
    Cancel,
    GoBack,
}

impl PlanAction {
    pub fn label(&self) -> &'static str {
        match self {
            PlanAction::ApplyChangesAndBackfill => "Apply Changes And Backfill",
            PlanAction::ApplyVirtualUpdate => "Apply Virtual Update",
            PlanAction::StartOver => "Start Over",
            PlanAction::Cancel => "Cancel",
            PlanAction::GoBack => "Go Back",
        }
    }

    /// Whether the action is a primary apply button
    pub fn is_apply(&self) -> bool {
        matches!(self, PlanAction::ApplyChangesAndBackfill | PlanAction::ApplyVirtualUpdate)
    }
}

impl fmt::Display for PlanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PlanAction {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            PlanAction::ApplyChangesAndBackfill,
            PlanAction::ApplyVirtualUpdate,
            PlanAction::StartOver,
            PlanAction::Cancel,
            PlanAction::GoBack,
        ]
        .into_iter()
        .find(|a| a.label() == s)
        .ok_or_else(|| E2eError::assertion(format!("unknown plan action: {}", s)))
    }
}

/// A control whose visibility identifies the plan state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlanControl {
    /// The apply button labeled by the expected action
    Primary,
    StartOver,
    Cancel,
    GoBack,
    /// The `modal-confirmation` dialog
    Confirmation,
}

/// Expected visibility of one control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Predicate {
    pub control: PlanControl,
    pub visible: bool,

    /// Wait with the extended timeout
    pub extended: bool,
}

impl Predicate {
    const fn shown(control: PlanControl) -> Self {
        Self { control, visible: true, extended: false }
    }

    const fn hidden(control: PlanControl) -> Self {
        Self { control, visible: false, extended: false }
    }

    const fn settled(control: PlanControl) -> Self {
        Self { control, visible: false, extended: true }
    }
}

const DRAFTING_PREDICATES: &[Predicate] = &[
    Predicate::shown(PlanControl::Primary),
    Predicate::shown(PlanControl::StartOver),
    Predicate::hidden(PlanControl::Cancel),
];

const CONFIRMATION_PREDICATES: &[Predicate] = &[Predicate::shown(PlanControl::Confirmation)];

const RUNNING_PREDICATES: &[Predicate] = &[
    Predicate::shown(PlanControl::Cancel),
    Predicate::hidden(PlanControl::Primary),
    Predicate::hidden(PlanControl::StartOver),
];

// Cancel vanishing is the completion signal and may take as long as the
// backfill itself
const COMPLETED_PREDICATES: &[Predicate] = &[
    Predicate::settled(PlanControl::Cancel),
    Predicate::shown(PlanControl::GoBack),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanState {
    Idle,
    Drafting,
    Running,
    AwaitingConfirmation,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanEvent {
    /// The plan page was opened for an environment
    Open,
    /// The primary action was clicked
    Apply { requires_confirmation: bool },
    /// The confirmation modal was accepted
    Confirm,
    /// Cancel disappeared: the backend finished
    Finish,
    GoBack,
}

impl fmt::Display for PlanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for PlanEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanEvent::Open => f.write_str("open"),
            PlanEvent::Apply { requires_confirmation: true } => f.write_str("apply (confirmed)"),
            PlanEvent::Apply { requires_confirmation: false } => f.write_str("apply"),
            PlanEvent::Confirm => f.write_str("confirm"),
            PlanEvent::Finish => f.write_str("finish"),
            PlanEvent::GoBack => f.write_str("go back"),
        }
    }
}

impl PlanState {
    pub fn transition(self, event: PlanEvent) -> E2eResult<PlanState> {
        use PlanEvent::*;
        use PlanState::*;

        let next = match (self, event) {
            (Idle, Open) => Drafting,
            (Drafting, Apply { requires_confirmation: false }) => Running,
            (Drafting, Apply { requires_confirmation: true }) => AwaitingConfirmation,
            (AwaitingConfirmation, Confirm) => Running,
            (Running, Finish) => Completed,
            (Completed, GoBack) => Idle,
            (from, event) => {
                return Err(E2eError::InvalidTransition {
                    from: from.to_string(),
                    event: event.to_string(),
                })
            }
        };

        Ok(next)
    }

    /// Visibility predicates identifying this state, in assertion order
    pub fn predicates(&self) -> &'static [Predicate] {
        match self {
            PlanState::Idle => &[],
            PlanState::Drafting => DRAFTING_PREDICATES,
            PlanState::AwaitingConfirmation => CONFIRMATION_PREDICATES,
            PlanState::Running => RUNNING_PREDICATES,
            PlanState::Completed => COMPLETED_PREDICATES,
        }
    }

    /// Classify a snapshot of control visibility
    pub fn observe(controls: &PlanControls) -> E2eResult<PlanState> {
        let PlanControls { primary, start_over, cancel, go_back, confirmation } = *controls;

        let state = match (primary, start_over, cancel, go_back, confirmation) {
            (_, _, false, _, true) => PlanState::AwaitingConfirmation,
            (true, true, false, false, false) => PlanState::Drafting,
            (false, false, true, _, false) => PlanState::Running,
            (false, false, false, true, false) => PlanState::Completed,
            (false, false, false, false, false) => PlanState::Idle,
            _ => {
                return Err(E2eError::assertion(format!(
                    "plan controls match no state: {:?}",
                    controls
                )))
            }
        };

        Ok(state)
    }
}

/// Visibility snapshot of the plan controls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanControls {
    pub primary: bool,
    pub start_over: bool,
    pub cancel: bool,
    pub go_back: bool,
    pub confirmation: bool,
}

impl PlanControls {
    pub fn is_visible(&self, control: PlanControl) -> bool {
        match control {
            PlanControl::Primary => self.primary,
            PlanControl::StartOver => self.start_over,
            PlanControl::Cancel => self.cancel,
            PlanControl::GoBack => self.go_back,
            PlanControl::Confirmation => self.confirmation,
        }
    }

    /// Whether every predicate of `state` holds
    pub fn satisfies(&self, state: PlanState) -> bool {
        state
            .predicates()
            .iter()
            .all(|p| self.is_visible(p.control) == p.visible)
    }
}
