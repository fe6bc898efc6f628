//! # Controller Module
//!
//! Controllers, their per-instance state, and the lifecycle every instance goes
//! through.
//!
//! ## Lifecycle
//!
//! ```text
//! Constructed ── init ──> Initialized ── resolve_and_run ──> Dispatched ─┬─> Finalized  (finalize + render)
//!                                                                        └─> Suppressed (aborted)
//! ```
//!
//! - **Construction** resolves nothing at run time: the identity was resolved when
//!   the type was registered. Segments are flattened and empties dropped.
//! - **Dispatch** ([`ControllerInstance::resolve_and_run`]) normalizes the action
//!   name, looks up its handler and [`ActionMeta`](crate::action::ActionMeta),
//!   applies view/layout/format settings and the request-method constraint, then
//!   runs `before_action`, the handler and `after_action`.
//! - **Termination** ([`ControllerInstance::terminate`]) runs `finalize` and renders
//!   the view, unless the instance was aborted. [`run_and_finalize`] guarantees it
//!   happens once on every exit path of the code that drives the instance, and
//!   dropping a dispatched instance triggers it too. A terminated instance ignores
//!   further actions.
//!
//! ## Delegation
//!
//! [`Context::sub_call`] builds another controller without letting it render;
//! [`Context::hand_off`] passes rendering to it and aborts the caller.

mod core;
mod delegate;
mod instance;

pub use core::{segments_from, Context, Controller, Rendered, SegmentKey, DEFAULT_LAYOUT_KEY};
pub use instance::{run_and_finalize, ControllerInstance, LifecycleState};

pub(crate) use instance::{factory, Factory};
