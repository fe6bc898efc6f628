//! # Voodoo
//!
//! **Voodoo** is the request-dispatch core of a small MVC web framework. Given a request
//! and a target controller, it resolves the action to run, enforces the action's declared
//! constraints (HTTP method, output format, view and layout), runs application code around
//! it, and renders the controller's view exactly once unless the controller opted out.
//!
//! ## Architecture
//!
//! - **[`identity`]** - Derives module/controller names and directories from a controller's
//!   static descriptor
//! - **[`action`]** - Action tables and the per-action configuration records
//!   (`action_view`, `use_layout`, `render_as`, `request`)
//! - **[`controller`]** - The [`Controller`] trait, per-instance [`Context`], action
//!   resolution, the lifecycle state machine, and delegation (`sub_call` / `hand_off`)
//! - **[`view`]** - The view capability, the factory that creates one per instance, and a
//!   `minijinja`-backed default
//! - **[`registry`]** / **[`app`]** - Start-up registration of controller types and the
//!   router boundary
//! - **[`server`]** - Request and response capabilities the core consumes
//! - **[`config`]** / **[`env`]** - Dot-path configuration and process-wide environment
//! - **[`db`]** - Keyed connection cache safe under concurrent first use
//! - **[`logging`]** - `tracing` subscriber setup
//!
//! ### Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Host
//!     participant App as Application
//!     participant Inst as ControllerInstance
//!     participant Ctl as Controller
//!     participant View
//!
//!     Host->>App: dispatch("/blog/post/show/42", exchange)
//!     App->>Inst: construct(segments)
//!     Inst->>Ctl: init(ctx)
//!     App->>Inst: run("show")
//!     Inst->>Inst: resolve handler + ActionMeta
//!     Inst->>View: set_action_view / use_layout / render_to_json
//!     Inst->>Ctl: before_action, actionShow, after_action
//!     Note over Inst: terminal transition (unless aborted)
//!     Inst->>Ctl: finalize(ctx) -> commit status
//!     Inst->>View: render()
//!     View-->>Host: response body
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use voodoo::{Actions, Application, Context, Controller, ControllerDescriptor};
//!
//! #[derive(Default)]
//! pub struct Index;
//!
//! impl Controller for Index {
//!     fn descriptor() -> ControllerDescriptor {
//!         voodoo::controller_descriptor!("Index")
//!     }
//!
//!     fn actions(actions: Actions<Self>) -> Actions<Self> {
//!         actions.action("index", Self::index)
//!     }
//! }
//!
//! impl Index {
//!     fn index(&mut self, ctx: &mut Context) -> anyhow::Result<()> {
//!         ctx.set_http_code(200);
//!         Ok(())
//!     }
//! }
//!
//! let app = Application::builder()
//!     .root(env!("CARGO_MANIFEST_DIR"))
//!     .register::<Index>()?
//!     .view_factory(voodoo::view::TemplateViewFactory)
//!     .build();
//! app.dispatch("/", exchange)?;
//! ```
//!
//! ## Rendering Rules
//!
//! | Instance state at scope end | `finalize` (commit status) | render |
//! |-----------------------------|----------------------------|--------|
//! | default                     | yes                        | yes    |
//! | `disable_view(true)`        | yes                        | no     |
//! | `abort()`                   | no                         | no     |
//!
//! [`run_and_finalize`] (and [`ControllerInstance::run`], built on it) performs the
//! terminal transition on every exit path; a dispatched instance that is simply
//! dropped performs it in `Drop`.

pub mod action;
pub mod app;
pub mod config;
pub mod controller;
pub mod db;
pub mod env;
pub mod error;
pub mod identity;
pub mod ids;
pub mod logging;
pub mod naming;
pub mod registry;
pub mod server;
pub mod view;

pub use action::{ActionMeta, ActionMetadata, Actions, RenderFormat, RequestConstraint, RequestMethod};
pub use app::Application;
pub use controller::{
    run_and_finalize, Context, Controller, ControllerInstance, LifecycleState, Rendered,
    SegmentKey,
};
pub use error::DispatchError;
pub use identity::{ControllerDescriptor, ControllerIdentity};
pub use server::{BufferedResponse, Exchange, HttpRequest, Request, Response};
pub use view::{View, ViewFactory};
