use super::core::{Context, Controller};
use crate::action::{ActionMeta, ActionMetadata, Actions, RenderFormat};
use crate::app::Application;
use crate::error::DispatchError;
use crate::identity::ControllerIdentity;
use crate::naming::{action_method_name, camelize};
use crate::server::Exchange;
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Where an instance is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Identity resolved and segments stored
    Constructed,
    /// `init` hook has run
    Initialized,
    /// An action was requested
    Dispatched,
    /// Terminal: finalize ran and the view was rendered (or skipped)
    Finalized,
    /// Terminal: the instance was aborted, nothing ran
    Suppressed,
}

impl LifecycleState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, LifecycleState::Finalized | LifecycleState::Suppressed)
    }
}

/// Object-safe view of a controller value bound to its action table.
pub(crate) trait Dispatch {
    fn metadata(&self) -> &dyn ActionMetadata;
    fn has_action(&self, handler: &str) -> bool;
    fn init(&mut self, ctx: &mut Context) -> anyhow::Result<()>;
    fn before(&mut self, ctx: &mut Context) -> anyhow::Result<()>;
    fn invoke(&mut self, handler: &str, ctx: &mut Context) -> anyhow::Result<()>;
    fn after(&mut self, ctx: &mut Context) -> anyhow::Result<()>;
    fn finalize(&mut self, ctx: &mut Context);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Creates a fresh controller value for every instance of one registered type.
pub(crate) type Factory = Arc<dyn Fn() -> Box<dyn Dispatch> + Send + Sync>;

struct Bound<T: Controller> {
    controller: T,
    actions: Arc<Actions<T>>,
}

impl<T: Controller> Dispatch for Bound<T> {
    fn metadata(&self) -> &dyn ActionMetadata {
        self.actions.as_ref()
    }

    fn has_action(&self, handler: &str) -> bool {
        self.actions.contains(handler)
    }

    fn init(&mut self, ctx: &mut Context) -> anyhow::Result<()> {
        self.controller.init(ctx)
    }

    fn before(&mut self, ctx: &mut Context) -> anyhow::Result<()> {
        self.controller.before_action(ctx)
    }

    fn invoke(&mut self, handler: &str, ctx: &mut Context) -> anyhow::Result<()> {
        match self.actions.get(handler) {
            Some(action) => (action.handler)(&mut self.controller, ctx),
            None => Err(anyhow::anyhow!("handler '{handler}' is not registered")),
        }
    }

    fn after(&mut self, ctx: &mut Context) -> anyhow::Result<()> {
        self.controller.after_action(ctx)
    }

    fn finalize(&mut self, ctx: &mut Context) {
        self.controller.finalize(ctx);
    }

    fn as_any(&self) -> &dyn Any {
        &self.controller
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        &mut self.controller
    }
}

/// Build the factory for `T` over its already-declared action table.
pub(crate) fn factory<T: Controller>(actions: Actions<T>) -> Factory {
    let actions = Arc::new(actions);
    Arc::new(move || -> Box<dyn Dispatch> {
        Box::new(Bound {
            controller: T::default(),
            actions: Arc::clone(&actions),
        })
    })
}

/// One controller instance: the controller value plus its [`Context`].
///
/// Created by [`Application::construct`] or by delegation. Its terminal transition
/// (finalize + render, or nothing when aborted) runs exactly once, through
/// [`terminate`](Self::terminate), [`run`](Self::run), [`run_and_finalize`], or
/// when a dispatched instance is dropped.
pub struct ControllerInstance {
    ctx: Context,
    body: Box<dyn Dispatch>,
    state: LifecycleState,
    action_executed: bool,
}

impl ControllerInstance {
    /// Construct and initialize an instance.
    pub(crate) fn construct(
        app: Arc<Application>,
        identity: Arc<ControllerIdentity>,
        factory: &Factory,
        segments: Vec<String>,
        exchange: Exchange,
    ) -> Result<Self, DispatchError> {
        let ctx = Context::new(app, identity, exchange, segments);
        let mut instance = Self {
            ctx,
            body: factory(),
            state: LifecycleState::Constructed,
            action_executed: false,
        };
        debug!(
            controller = %instance.ctx.identity,
            request_id = %instance.ctx.request_id(),
            segments = ?instance.ctx.segments,
            "Controller constructed"
        );

        instance
            .body
            .init(&mut instance.ctx)
            .map_err(|source| DispatchError::Init {
                controller: instance.ctx.identity.qualified_name(),
                source,
            })?;
        instance.state = LifecycleState::Initialized;
        Ok(instance)
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Whether an action handler was invoked on this instance.
    #[must_use]
    pub fn action_executed(&self) -> bool {
        self.action_executed
    }

    #[must_use]
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.ctx
    }

    /// The controller value, if it is a `T`.
    #[must_use]
    pub fn controller<T: Controller>(&self) -> Option<&T> {
        self.body.as_any().downcast_ref::<T>()
    }

    pub fn controller_mut<T: Controller>(&mut self) -> Option<&mut T> {
        self.body.as_any_mut().downcast_mut::<T>()
    }

    /// Configuration declared for a handler of this controller.
    #[must_use]
    pub fn action_metadata(&self, handler: &str) -> Option<&ActionMeta> {
        self.body.metadata().action_metadata(handler)
    }

    /// Annotation value declared for a handler, by key.
    #[must_use]
    pub fn action_annotation(&self, handler: &str, key: &str) -> Option<Value> {
        self.body.metadata().action_annotation(handler, key)
    }

    /// Resolve `action` to its handler, apply its configuration and run it
    /// between the before and after hooks.
    ///
    /// A request-method mismatch sets status 405. Without a replacement view the
    /// handler is skipped and, when views are available, the 405 error view is
    /// selected. With a replacement view the handler still runs.
    ///
    /// The after hook does not run when the before hook or the handler fails.
    ///
    /// An instance that already reached a terminal state runs nothing.
    pub fn resolve_and_run(&mut self, action: &str) -> Result<(), DispatchError> {
        if self.state.is_terminal() {
            warn!(
                controller = %self.ctx.identity,
                request_id = %self.ctx.request_id(),
                state = ?self.state,
                action = %action,
                "Action requested on a terminated instance; ignored"
            );
            return Ok(());
        }
        self.state = LifecycleState::Dispatched;
        let start = Instant::now();

        let action_name = camelize(action);
        let handler = action_method_name(&action_name);
        self.ctx.action_name.clone_from(&action_name);

        if !self.body.has_action(&handler) {
            warn!(
                controller = %self.ctx.identity,
                request_id = %self.ctx.request_id(),
                handler = %handler,
                "Action not found"
            );
            return Err(DispatchError::ActionNotFound {
                controller: self.ctx.identity.qualified_name(),
                handler,
            });
        }

        let meta = self
            .body
            .metadata()
            .action_metadata(&handler)
            .cloned()
            .unwrap_or_default();
        let mut pending_view = meta.view.clone().unwrap_or(action_name);

        if let Some(constraint) = &meta.request {
            if let Some(method) = constraint.method {
                if !self.ctx.request().is(&method.as_method()) {
                    self.ctx.set_http_code(405);
                    warn!(
                        controller = %self.ctx.identity,
                        request_id = %self.ctx.request_id(),
                        handler = %handler,
                        expected = ?method,
                        actual = %self.ctx.request().method(),
                        "Request method not allowed"
                    );
                    if let Some(view) = self.ctx.view() {
                        view.set_error(&constraint.response);
                        view.assign_value("error", Value::String(constraint.response.clone()));
                    }
                    match &constraint.action_view {
                        Some(replacement) => pending_view.clone_from(replacement),
                        None => {
                            if let Some(view) = self.ctx.view() {
                                view.set_view_error(405);
                            }
                            return Ok(());
                        }
                    }
                }
            }
        }

        self.ctx.action_view.clone_from(&pending_view);
        if let Some(view) = self.ctx.view() {
            view.set_action_view(&pending_view);
            if let Some(layout) = &meta.layout {
                view.use_layout(layout);
            }
            if meta.render_as == Some(RenderFormat::Json) {
                view.render_to_json();
            }
        }

        info!(
            controller = %self.ctx.identity,
            request_id = %self.ctx.request_id(),
            handler = %handler,
            view = %pending_view,
            "Dispatching action"
        );

        self.body.before(&mut self.ctx)?;
        self.action_executed = true;
        self.body.invoke(&handler, &mut self.ctx)?;
        self.body.after(&mut self.ctx)?;

        info!(
            controller = %self.ctx.identity,
            request_id = %self.ctx.request_id(),
            handler = %handler,
            status = self.ctx.http_code(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Action completed"
        );
        Ok(())
    }

    /// Terminal transition: finalize then render, or nothing when aborted.
    ///
    /// Runs at most once; later calls are no-ops. Never fails: render errors are
    /// logged and dropped.
    pub fn terminate(&mut self) {
        if self.state.is_terminal() {
            return;
        }

        if self.ctx.is_aborted() {
            self.state = LifecycleState::Suppressed;
            debug!(
                controller = %self.ctx.identity,
                request_id = %self.ctx.request_id(),
                "Finalize and render suppressed"
            );
            return;
        }

        self.state = LifecycleState::Finalized;
        self.body.finalize(&mut self.ctx);
        match self.ctx.render_view(true) {
            Ok(rendered) => debug!(
                controller = %self.ctx.identity,
                request_id = %self.ctx.request_id(),
                rendered = ?rendered,
                "Instance finalized"
            ),
            Err(e) => error!(
                controller = %self.ctx.identity,
                request_id = %self.ctx.request_id(),
                error = %e,
                "Rendering failed"
            ),
        }
    }

    /// Run `action` inside [`run_and_finalize`].
    pub fn run(&mut self, action: &str) -> Result<(), DispatchError> {
        run_and_finalize(self, |instance| instance.resolve_and_run(action))
    }
}

/// A dispatched instance performs its terminal transition when dropped. One that
/// never had an action requested (a bare sub-call) is dropped silently.
impl Drop for ControllerInstance {
    fn drop(&mut self) {
        match self.state {
            LifecycleState::Dispatched => self.terminate(),
            LifecycleState::Constructed | LifecycleState::Initialized => debug!(
                controller = %self.ctx.identity,
                state = ?self.state,
                "Instance dropped before dispatch"
            ),
            LifecycleState::Finalized | LifecycleState::Suppressed => {}
        }
    }
}

impl std::fmt::Debug for ControllerInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerInstance")
            .field("state", &self.state)
            .field("action_executed", &self.action_executed)
            .field("ctx", &self.ctx)
            .finish()
    }
}

struct Scope<'a>(&'a mut ControllerInstance);

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        self.0.terminate();
    }
}

/// Run `f` on `instance`, then perform its terminal transition on every exit
/// path of `f`: normal return, `Err` return, or unwinding panic.
///
/// ```rust,ignore
/// let mut instance = app.construct("::app::www::controller::Index", segments, exchange)?;
/// run_and_finalize(&mut instance, |c| c.resolve_and_run("index"))?;
/// ```
pub fn run_and_finalize<R>(
    instance: &mut ControllerInstance,
    f: impl FnOnce(&mut ControllerInstance) -> R,
) -> R {
    let scope = Scope(instance);
    f(&mut *scope.0)
}
