//! Lifecycle state machine - single source of truth for what the backend is
//! doing and for which user actions are currently allowed.
//!
//! State diagram (terminal states on the right are re-enterable):
//! ```text
//! WaitingForHost ──HostReady{ready}──> Initializing ──ok──> Idle <──ok── Inferencing
//!       │                                   │ err                │ req      │ err
//!       └─HostReady{!ready}─> NoModel   InitFailed        InferenceFailed ──┘
//!                                │
//!            Importing / Removing / Downloading ──ok──> re-check availability
//!                │ err                                  (Initializing | NoModel)
//!            *Failed ──new request──> transient state for that request
//! ```
//!
//! The machine runs for the process lifetime; there is no terminal state.
//! Every transition goes through [`compute_transition`], a pure function that
//! rejects invalid `(state, event)` pairs.

use std::sync::Mutex;

use crate::store::Store;

/// What the backend is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumIter)]
pub enum LifecycleState {
    /// The host process has not signalled readiness yet.
    #[strum(to_string = "Waiting for backend")]
    WaitingForHost,
    /// At least one model file is missing.
    #[strum(to_string = "No model")]
    NoModel,
    #[strum(to_string = "Importing model")]
    Importing,
    #[strum(to_string = "Import failed")]
    ImportFailed,
    #[strum(to_string = "Removing model")]
    Removing,
    #[strum(to_string = "Remove failed")]
    RemoveFailed,
    #[strum(to_string = "Downloading model")]
    Downloading,
    #[strum(to_string = "Download failed")]
    DownloadFailed,
    #[strum(to_string = "Initializing")]
    Initializing,
    #[strum(to_string = "Initialization failed")]
    InitFailed,
    #[strum(to_string = "Idle")]
    Idle,
    #[strum(to_string = "Inferencing")]
    Inferencing,
    #[strum(to_string = "Inference failed")]
    InferenceFailed,
}

impl LifecycleState {
    /// Gates every action that loads an image or starts an inference.
    pub fn runnable(self) -> bool {
        matches!(self, Self::Idle | Self::InferenceFailed)
    }

    pub fn is_running(self) -> bool {
        self == Self::Inferencing
    }

    pub fn is_downloading(self) -> bool {
        self == Self::Downloading
    }

    /// True while a backend call is in flight. Busy states exclude the guard
    /// predicates of every other action, which is what keeps at most one
    /// call pending without any lock or queue.
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            Self::Importing
                | Self::Removing
                | Self::Downloading
                | Self::Initializing
                | Self::Inferencing
        )
    }
}

/// Backend-backed actions the orchestrator can start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum LifecycleAction {
    Import,
    Remove,
    Download,
    Initialize,
    Infer,
}

impl LifecycleAction {
    /// The in-progress state entered while this action's call is in flight.
    pub fn transient_state(self) -> LifecycleState {
        match self {
            Self::Import => LifecycleState::Importing,
            Self::Remove => LifecycleState::Removing,
            Self::Download => LifecycleState::Downloading,
            Self::Initialize => LifecycleState::Initializing,
            Self::Infer => LifecycleState::Inferencing,
        }
    }

    /// The terminal state entered when this action's call fails.
    pub fn failed_state(self) -> LifecycleState {
        match self {
            Self::Import => LifecycleState::ImportFailed,
            Self::Remove => LifecycleState::RemoveFailed,
            Self::Download => LifecycleState::DownloadFailed,
            Self::Initialize => LifecycleState::InitFailed,
            Self::Infer => LifecycleState::InferenceFailed,
        }
    }
}

/// Events that can trigger state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// One-shot signal that the host process is up. `model_ready` carries the
    /// availability check pulled at that moment.
    HostReady { model_ready: bool },
    /// Model availability re-checked outside of an action settling.
    ModelsChanged { model_ready: bool },
    /// An action's guard passed and its backend call is about to be issued.
    Requested(LifecycleAction),
    /// The in-flight action's call returned ok. For file actions,
    /// `model_ready` is the availability re-check performed after the call.
    Succeeded {
        action: LifecycleAction,
        model_ready: bool,
    },
    /// The in-flight action's call returned an error.
    Failed(LifecycleAction),
}

/// Result of a successful state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionResult {
    Changed {
        from: LifecycleState,
        to: LifecycleState,
    },
    /// Event was valid but the state didn't change.
    Unchanged,
}

/// Reason a transition was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{event:?} rejected in {current_state} state")]
pub struct TransitionRejection {
    pub current_state: LifecycleState,
    pub event: LifecycleEvent,
}

/// Pure function: the next state for `(current, event)`, or `None` when the
/// pair is invalid.
pub fn compute_transition(
    current: LifecycleState,
    event: LifecycleEvent,
) -> Option<LifecycleState> {
    use LifecycleState::*;

    match event {
        LifecycleEvent::HostReady { model_ready } => match current {
            WaitingForHost => Some(if model_ready { Initializing } else { NoModel }),
            _ => None,
        },

        LifecycleEvent::ModelsChanged { model_ready } => {
            if current.is_busy() || current == WaitingForHost {
                return None;
            }
            if model_ready {
                match current {
                    // Already initialized; nothing to do.
                    Idle | InferenceFailed => Some(current),
                    _ => Some(Initializing),
                }
            } else {
                match current {
                    // Files disappeared behind a settled pipeline.
                    Idle | InferenceFailed | NoModel => Some(NoModel),
                    // Keep the failure visible until the user acts.
                    _ => Some(current),
                }
            }
        }

        LifecycleEvent::Requested(action) => {
            let allowed = match action {
                LifecycleAction::Infer => current.runnable(),
                LifecycleAction::Remove => !current.is_busy() && current != WaitingForHost,
                LifecycleAction::Import
                | LifecycleAction::Download
                | LifecycleAction::Initialize => matches!(
                    current,
                    NoModel | ImportFailed | RemoveFailed | DownloadFailed | InitFailed
                ),
            };
            allowed.then(|| action.transient_state())
        }

        LifecycleEvent::Succeeded {
            action,
            model_ready,
        } => {
            if current != action.transient_state() {
                return None;
            }
            match action {
                LifecycleAction::Initialize | LifecycleAction::Infer => Some(Idle),
                LifecycleAction::Import | LifecycleAction::Remove | LifecycleAction::Download => {
                    Some(if model_ready { Initializing } else { NoModel })
                }
            }
        }

        LifecycleEvent::Failed(action) => {
            if current == action.transient_state() {
                Some(action.failed_state())
            } else if action == LifecycleAction::Infer && current.runnable() {
                // An image that failed to load is reported as an inference
                // failure without ever entering Inferencing.
                Some(InferenceFailed)
            } else {
                None
            }
        }
    }
}

type Subscriber = Box<dyn Fn(LifecycleState) + Send>;

/// Thread-safe holder of the current lifecycle state and the last error
/// message. The only way to change state is [`LifecycleMachine::transition`],
/// plus [`LifecycleMachine::restore`] for the user-cancelled path.
pub struct LifecycleMachine {
    state: Mutex<LifecycleState>,
    subscribers: Mutex<Vec<Subscriber>>,
    error: Store<String>,
}

impl LifecycleMachine {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LifecycleState::WaitingForHost),
            subscribers: Mutex::new(Vec::new()),
            error: Store::new(String::new()),
        }
    }

    pub fn current(&self) -> LifecycleState {
        *self.state.lock().unwrap()
    }

    /// Most recent failure message; overwritten on every failure, never
    /// cleared explicitly.
    pub fn last_error(&self) -> String {
        self.error.get()
    }

    pub fn set_error(&self, message: impl Into<String>) {
        self.error.set(message.into());
    }

    /// Register a callback invoked after every effective state change.
    pub fn subscribe(&self, f: impl Fn(LifecycleState) + Send + 'static) {
        self.subscribers.lock().unwrap().push(Box::new(f));
    }

    /// Attempt a state transition based on an event.
    pub fn transition(
        &self,
        event: LifecycleEvent,
    ) -> Result<TransitionResult, TransitionRejection> {
        let (from, to) = {
            let mut state = self.state.lock().unwrap();
            let current = *state;
            match compute_transition(current, event) {
                Some(next) if next == current => return Ok(TransitionResult::Unchanged),
                Some(next) => {
                    *state = next;
                    (current, next)
                }
                None => {
                    return Err(TransitionRejection {
                        current_state: current,
                        event,
                    })
                }
            }
        };
        log::debug!("lifecycle: {from} -> {to}");
        self.notify(to);
        Ok(TransitionResult::Changed { from, to })
    }

    /// Reinstate the state captured before a transient transition.
    ///
    /// Only used when a picker call comes back with the user-cancelled
    /// payload: the attempt is erased as if it never happened.
    pub fn restore(&self, prior: LifecycleState) {
        {
            let mut state = self.state.lock().unwrap();
            if *state == prior {
                return;
            }
            *state = prior;
        }
        log::debug!("lifecycle: restored to {prior}");
        self.notify(prior);
    }

    fn notify(&self, state: LifecycleState) {
        for subscriber in self.subscribers.lock().unwrap().iter() {
            subscriber(state);
        }
    }
}

impl Default for LifecycleMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;
    use LifecycleAction::*;
    use LifecycleState::*;

    #[test]
    fn predicate_truth_tables() {
        for state in LifecycleState::iter() {
            assert_eq!(
                state.runnable(),
                state == Idle || state == InferenceFailed,
                "runnable({state})"
            );
            assert_eq!(state.is_running(), state == Inferencing, "is_running({state})");
            assert_eq!(
                state.is_downloading(),
                state == Downloading,
                "is_downloading({state})"
            );
        }
    }

    #[test]
    fn host_ready_branches_on_availability() {
        assert_eq!(
            compute_transition(WaitingForHost, LifecycleEvent::HostReady { model_ready: false }),
            Some(NoModel)
        );
        assert_eq!(
            compute_transition(WaitingForHost, LifecycleEvent::HostReady { model_ready: true }),
            Some(Initializing)
        );
        // One-shot: meaningless once the host is up.
        assert_eq!(
            compute_transition(Idle, LifecycleEvent::HostReady { model_ready: true }),
            None
        );
    }

    #[test]
    fn infer_only_from_runnable_states() {
        for state in LifecycleState::iter() {
            let next = compute_transition(state, LifecycleEvent::Requested(Infer));
            if state.runnable() {
                assert_eq!(next, Some(Inferencing));
            } else {
                assert_eq!(next, None, "Infer must be rejected in {state}");
            }
        }
    }

    #[test]
    fn busy_states_reject_every_request() {
        for state in LifecycleState::iter().filter(|s| s.is_busy()) {
            for action in [Import, Remove, Download, Initialize, Infer] {
                assert_eq!(
                    compute_transition(state, LifecycleEvent::Requested(action)),
                    None,
                    "{action} accepted while {state}"
                );
            }
        }
    }

    #[test]
    fn failed_states_are_reenterable() {
        for state in [ImportFailed, RemoveFailed, DownloadFailed, InitFailed] {
            assert_eq!(
                compute_transition(state, LifecycleEvent::Requested(Import)),
                Some(Importing)
            );
            assert_eq!(
                compute_transition(state, LifecycleEvent::Requested(Download)),
                Some(Downloading)
            );
        }
    }

    #[test]
    fn file_action_success_rechecks_availability() {
        for (action, transient) in [(Import, Importing), (Remove, Removing), (Download, Downloading)]
        {
            assert_eq!(
                compute_transition(
                    transient,
                    LifecycleEvent::Succeeded { action, model_ready: true }
                ),
                Some(Initializing)
            );
            assert_eq!(
                compute_transition(
                    transient,
                    LifecycleEvent::Succeeded { action, model_ready: false }
                ),
                Some(NoModel)
            );
            assert_eq!(
                compute_transition(transient, LifecycleEvent::Failed(action)),
                Some(action.failed_state())
            );
        }
    }

    #[test]
    fn settlement_must_match_the_inflight_action() {
        assert_eq!(
            compute_transition(
                Importing,
                LifecycleEvent::Succeeded { action: Download, model_ready: false }
            ),
            None
        );
        assert_eq!(compute_transition(Idle, LifecycleEvent::Failed(Download)), None);
    }

    #[test]
    fn inference_round_trip() {
        assert_eq!(
            compute_transition(Idle, LifecycleEvent::Requested(Infer)),
            Some(Inferencing)
        );
        assert_eq!(
            compute_transition(
                Inferencing,
                LifecycleEvent::Succeeded { action: Infer, model_ready: true }
            ),
            Some(Idle)
        );
        assert_eq!(
            compute_transition(Inferencing, LifecycleEvent::Failed(Infer)),
            Some(InferenceFailed)
        );
        // Retry after a failure.
        assert_eq!(
            compute_transition(InferenceFailed, LifecycleEvent::Requested(Infer)),
            Some(Inferencing)
        );
    }

    #[test]
    fn models_changed_outside_actions() {
        assert_eq!(
            compute_transition(NoModel, LifecycleEvent::ModelsChanged { model_ready: true }),
            Some(Initializing)
        );
        assert_eq!(
            compute_transition(Idle, LifecycleEvent::ModelsChanged { model_ready: false }),
            Some(NoModel)
        );
        // Already initialized and still complete: nothing to do.
        assert_eq!(
            compute_transition(Idle, LifecycleEvent::ModelsChanged { model_ready: true }),
            Some(Idle)
        );
        // Never while a call is in flight.
        assert_eq!(
            compute_transition(Downloading, LifecycleEvent::ModelsChanged { model_ready: true }),
            None
        );
    }

    #[test]
    fn machine_records_transitions_and_rejections() {
        let machine = LifecycleMachine::new();
        assert_eq!(machine.current(), WaitingForHost);

        let result = machine
            .transition(LifecycleEvent::HostReady { model_ready: false })
            .unwrap();
        assert_eq!(
            result,
            TransitionResult::Changed { from: WaitingForHost, to: NoModel }
        );

        let rejection = machine
            .transition(LifecycleEvent::Requested(Infer))
            .unwrap_err();
        assert_eq!(rejection.current_state, NoModel);
        assert_eq!(machine.current(), NoModel);
    }

    #[test]
    fn restore_reinstates_prior_state() {
        let machine = LifecycleMachine::new();
        machine
            .transition(LifecycleEvent::HostReady { model_ready: false })
            .unwrap();
        machine
            .transition(LifecycleEvent::Requested(Import))
            .unwrap();
        assert_eq!(machine.current(), Importing);

        machine.restore(NoModel);
        assert_eq!(machine.current(), NoModel);
    }

    #[test]
    fn error_message_is_overwritten_not_cleared() {
        let machine = LifecycleMachine::new();
        assert_eq!(machine.last_error(), "");
        machine.set_error("first");
        machine.set_error("second");
        assert_eq!(machine.last_error(), "second");
    }
}
