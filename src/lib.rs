//! Texa control core - the client-side control layer of the Texa desktop
//! image-to-text app.
//!
//! A GUI shell renders an image, lets the user edit the extracted text, and
//! shows it re-rendered as markdown + math markup; an out-of-process backend
//! performs model inference and file management. This crate is everything in
//! between:
//!
//! - [`lifecycle`]: a state machine tracking what the backend is doing, the
//!   derived predicates that gate every user action, and the orchestrator
//!   that wraps each backend round trip in guard / transient / settle steps;
//! - [`content`]: the immediate vs. debounced content buffers;
//! - [`render`]: per-block, fault-isolated markdown + math conversion;
//! - [`backend`]: the call contract the host process must implement;
//! - [`models`] and [`store`]: the mirrored model availability and the
//!   shared state container everything above is built on.
//!
//! The view layer and the backend both stay outside: the shell injects a
//! [`backend::Backend`] implementation and subscribes to the stores.

pub mod backend;
pub mod content;
pub mod lifecycle;
pub mod models;
pub mod render;
pub mod store;

pub use backend::{Backend, FileKind, FileStatus, HostReply, USER_CANCELLED};
pub use content::{ContentStore, DEBOUNCE_INTERVAL};
pub use lifecycle::{
    LifecycleAction, LifecycleEvent, LifecycleMachine, LifecycleState, Orchestrator,
};
pub use models::ModelAvailability;
pub use render::{render, MarkupConverter, MathMarkdownConverter, MathMode};
pub use store::Store;
