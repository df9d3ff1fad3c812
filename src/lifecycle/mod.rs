mod hold;
mod machine;
mod orchestrator;

// Public exports
pub use hold::{HoldGate, REMOVE_HOLD};
pub use machine::{
    compute_transition, LifecycleAction, LifecycleEvent, LifecycleMachine, LifecycleState,
    TransitionRejection, TransitionResult,
};
pub use orchestrator::Orchestrator;
