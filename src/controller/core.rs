use crate::action::Actions;
use crate::app::Application;
use crate::config::{Config, ConfigError, CONTROLLER_CONFIG};
use crate::error::DispatchError;
use crate::identity::{ControllerDescriptor, ControllerIdentity};
use crate::ids::RequestId;
use crate::naming::{action_method_name, is_numeric};
use crate::server::{Exchange, Request, Response};
use crate::view::{View, ViewBinding, VIEWS_DIR};
use http::Method;
use once_cell::unsync::OnceCell;
use serde_json::{Map, Value};
use std::any::Any;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Config key naming the layout applied when an action chose none.
pub const DEFAULT_LAYOUT_KEY: &str = "views.layout";

/// Application-defined controller.
///
/// The framework owns everything about an instance except the controller value
/// itself: identity, segments, view, status and flags live in the [`Context`]
/// handed to every hook and handler.
///
/// ```rust,ignore
/// #[derive(Default)]
/// pub struct Index;
///
/// impl Controller for Index {
///     fn descriptor() -> ControllerDescriptor {
///         voodoo::controller_descriptor!("Index")
///     }
///
///     fn actions(actions: Actions<Self>) -> Actions<Self> {
///         actions.action("index", Self::index)
///     }
/// }
///
/// impl Index {
///     fn index(&mut self, ctx: &mut Context) -> anyhow::Result<()> {
///         if let Some(view) = ctx.view() {
///             view.assign_value("title", "Hello".into());
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Controller: Any + Default + Sized {
    /// Where the controller lives; see [`controller_descriptor!`](crate::controller_descriptor).
    fn descriptor() -> ControllerDescriptor;

    /// Declare the action table. Every controller must declare `index`.
    fn actions(actions: Actions<Self>) -> Actions<Self>;

    /// Runs once, right after construction.
    fn init(&mut self, _ctx: &mut Context) -> anyhow::Result<()> {
        Ok(())
    }

    /// Runs before every action handler.
    fn before_action(&mut self, _ctx: &mut Context) -> anyhow::Result<()> {
        Ok(())
    }

    /// Runs after an action handler that returned `Ok`.
    fn after_action(&mut self, _ctx: &mut Context) -> anyhow::Result<()> {
        Ok(())
    }

    /// Runs before rendering at the end of the instance's scope, unless aborted.
    fn finalize(&mut self, ctx: &mut Context) {
        ctx.commit_status();
    }
}

/// Outcome of [`Context::render_view`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    /// View disabled, unavailable, or the module has no `Views` directory
    Skipped,
    /// Content written to the response
    Emitted,
    /// Content returned to the caller
    Content(String),
}

/// Segment lookup key for [`Context::segment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKey<'a> {
    /// Position, counted from the offset
    Index(usize),
    /// The segment following the named one (`/page/2` -> `Name("page")` is `2`)
    Name(&'a str),
}

impl From<usize> for SegmentKey<'_> {
    fn from(i: usize) -> Self {
        SegmentKey::Index(i)
    }
}

impl<'a> From<&'a str> for SegmentKey<'a> {
    fn from(name: &'a str) -> Self {
        SegmentKey::Name(name)
    }
}

/// Framework state of one controller instance.
pub struct Context {
    pub(super) app: Arc<Application>,
    pub(super) identity: Arc<ControllerIdentity>,
    pub(super) exchange: Exchange,
    pub(super) segments: Vec<String>,
    pub(super) action_name: String,
    pub(super) action_view: String,
    view: Option<Box<dyn View>>,
    view_disabled: bool,
    aborted: bool,
    status: u16,
    pagination: Option<Value>,
    config: OnceCell<Config>,
}

impl Context {
    pub(crate) fn new(
        app: Arc<Application>,
        identity: Arc<ControllerIdentity>,
        exchange: Exchange,
        segments: Vec<String>,
    ) -> Self {
        Self {
            app,
            identity,
            exchange,
            segments,
            action_name: String::new(),
            action_view: String::new(),
            view: None,
            view_disabled: false,
            aborted: false,
            status: 200,
            pagination: None,
            config: OnceCell::new(),
        }
    }

    // Identity

    #[must_use]
    pub fn identity(&self) -> &ControllerIdentity {
        &self.identity
    }

    #[must_use]
    pub fn module_name(&self) -> &str {
        self.identity.module_name()
    }

    #[must_use]
    pub fn controller_name(&self) -> &str {
        self.identity.controller_name()
    }

    #[must_use]
    pub fn controller_namespace(&self) -> &str {
        self.identity.controller_namespace()
    }

    #[must_use]
    pub fn module_namespace(&self) -> &str {
        self.identity.module_namespace()
    }

    #[must_use]
    pub fn module_dir(&self) -> &Path {
        self.identity.module_dir()
    }

    #[must_use]
    pub fn application_dir(&self) -> &Path {
        self.identity.application_dir()
    }

    /// Normalized name of the action being dispatched, empty before dispatch.
    #[must_use]
    pub fn action_name(&self) -> &str {
        &self.action_name
    }

    /// `action` + action name, e.g. `actionIndex`.
    #[must_use]
    pub fn action_method_name(&self) -> String {
        action_method_name(&self.action_name)
    }

    /// View the action resolved to, empty until one was applied.
    #[must_use]
    pub fn action_view(&self) -> &str {
        &self.action_view
    }

    #[must_use]
    pub fn application(&self) -> &Arc<Application> {
        &self.app
    }

    // Request boundary

    #[must_use]
    pub fn exchange(&self) -> &Exchange {
        &self.exchange
    }

    #[must_use]
    pub fn request(&self) -> &dyn Request {
        self.exchange.request()
    }

    #[must_use]
    pub fn response(&self) -> &dyn Response {
        self.exchange.response()
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.exchange.request_id()
    }

    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.request().param(key)
    }

    #[must_use]
    pub fn param_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.param(key).unwrap_or(default)
    }

    #[must_use]
    pub fn is_post(&self) -> bool {
        self.request().is(&Method::POST)
    }

    #[must_use]
    pub fn is_get(&self) -> bool {
        self.request().is(&Method::GET)
    }

    #[must_use]
    pub fn is_ajax(&self) -> bool {
        self.request().is_ajax()
    }

    // Segments

    /// URL segments following module/controller/action, empties removed.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Segment by position or by preceding name, searching from `offset`.
    #[must_use]
    pub fn segment<'k>(&self, key: impl Into<SegmentKey<'k>>, offset: usize) -> Option<&str> {
        let found = match key.into() {
            SegmentKey::Index(i) => offset.checked_add(i).and_then(|k| self.segments.get(k)),
            SegmentKey::Name(name) => self
                .segments
                .iter()
                .skip(offset)
                .position(|s| s == name)
                .and_then(|pos| offset.checked_add(pos)?.checked_add(1))
                .and_then(|k| self.segments.get(k)),
        };
        found.map(String::as_str)
    }

    /// First numeric segment: `/music/rap/12573/Where-Have-You-Been` gives `12573`.
    #[must_use]
    pub fn catch_numeric_segment(&self) -> Option<&str> {
        self.segments
            .iter()
            .map(String::as_str)
            .find(|s| is_numeric(s))
    }

    // Status and flags

    pub fn set_http_code(&mut self, code: u16) {
        self.status = code;
    }

    #[must_use]
    pub fn http_code(&self) -> u16 {
        self.status
    }

    /// Apply the stored status to the response.
    pub fn commit_status(&self) {
        self.response().set_status(self.status);
    }

    /// Suppress finalize and render for this instance. Cannot be undone.
    pub fn abort(&mut self) {
        self.set_abort(true);
    }

    /// `set_abort(false)` leaves an aborted instance aborted.
    pub fn set_abort(&mut self, flag: bool) {
        if flag && !self.aborted {
            debug!(controller = %self.identity, "Instance aborted");
        }
        self.aborted |= flag;
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    pub fn disable_view(&mut self, disabled: bool) {
        self.view_disabled = disabled;
    }

    #[must_use]
    pub fn is_view_disabled(&self) -> bool {
        self.view_disabled
    }

    /// Redirect the client and abort, so nothing else is rendered.
    pub fn redirect(&mut self, url: &str, code: u16) {
        info!(
            controller = %self.identity,
            request_id = %self.request_id(),
            url = %url,
            status = code,
            "Redirecting"
        );
        self.abort();
        self.response().redirect(url, code);
    }

    /// Pagination state pushed into the view at render time.
    pub fn set_pagination(&mut self, pagination: Value) {
        self.pagination = Some(pagination);
    }

    #[must_use]
    pub fn pagination(&self) -> Option<&Value> {
        self.pagination.as_ref()
    }

    // Config

    /// Application `Config.*` merged with the module's, loaded on first use.
    pub fn config(&self) -> Result<&Config, ConfigError> {
        self.config.get_or_try_init(|| {
            let mut config = Config::new();
            config.load_optional(self.identity.application_dir(), CONTROLLER_CONFIG)?;
            config.load_optional(self.identity.module_dir(), CONTROLLER_CONFIG)?;
            debug!(
                controller = %self.identity,
                sources = config.sources().len(),
                "Controller config loaded"
            );
            Ok(config)
        })
    }

    /// Config value at `dot_path`; load failures are logged and read as absent.
    #[must_use]
    pub fn get_config(&self, dot_path: &str) -> Option<Value> {
        match self.config() {
            Ok(config) => config.get(dot_path).cloned(),
            Err(e) => {
                warn!(controller = %self.identity, error = %e, "Controller config unavailable");
                None
            }
        }
    }

    // View

    /// Whether the application can create views at all.
    #[must_use]
    pub fn view_available(&self) -> bool {
        self.app.view_factory().is_some()
    }

    fn ensure_view(&mut self) -> Option<&mut Box<dyn View>> {
        if self.view.is_none() {
            let factory = self.app.view_factory()?;
            let binding = ViewBinding {
                module_name: self.identity.module_name().to_string(),
                controller_name: self.identity.controller_name().to_string(),
                module_dir: self.identity.module_dir().to_path_buf(),
            };
            debug!(controller = %self.identity, "View created");
            self.view = Some(factory.create(&binding));
        }
        self.view.as_mut()
    }

    /// The instance's view, created on first access. `None` without a view factory.
    pub fn view(&mut self) -> Option<&mut dyn View> {
        match self.ensure_view() {
            Some(view) => Some(view.as_mut()),
            None => None,
        }
    }

    /// Like [`view`](Self::view), assigning `data` first.
    pub fn view_with(&mut self, data: Map<String, Value>) -> Option<&mut dyn View> {
        match self.ensure_view() {
            Some(view) => {
                view.assign(data);
                Some(view.as_mut())
            }
            None => None,
        }
    }

    fn views_dir_exists(&self) -> bool {
        self.identity.module_dir().join(VIEWS_DIR).is_dir()
    }

    /// Render the view, writing it to the response when `echo` is set.
    pub fn render_view(&mut self, echo: bool) -> Result<Rendered, DispatchError> {
        if self.view_disabled || !self.view_available() || !self.views_dir_exists() {
            return Ok(Rendered::Skipped);
        }

        let default_layout = self.default_layout()?;
        let pagination = self.pagination.clone();
        let controller = self.identity.qualified_name();
        let Some(view) = self.ensure_view() else {
            return Ok(Rendered::Skipped);
        };

        if let Some(pagination) = pagination {
            view.set_pagination(pagination);
        }
        if !view.isset_layout() {
            if let Some(layout) = default_layout {
                view.use_layout(&layout);
            }
        }
        let content = view
            .render()
            .map_err(|source| DispatchError::Render { controller, source })?;

        if echo {
            self.response().write(&content);
            Ok(Rendered::Emitted)
        } else {
            Ok(Rendered::Content(content))
        }
    }

    fn default_layout(&self) -> Result<Option<String>, DispatchError> {
        let config = self.config().map_err(|e| DispatchError::Render {
            controller: self.identity.qualified_name(),
            source: e.into(),
        })?;
        Ok(config
            .get_str(DEFAULT_LAYOUT_KEY)
            .filter(|s| !s.is_empty())
            .map(str::to_string))
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("controller", &self.identity.qualified_name())
            .field("segments", &self.segments)
            .field("action_name", &self.action_name)
            .field("action_view", &self.action_view)
            .field("status", &self.status)
            .field("aborted", &self.aborted)
            .field("view_disabled", &self.view_disabled)
            .field("has_view", &self.view.is_some())
            .finish_non_exhaustive()
    }
}

/// Flatten router or delegation parameters into URL segments.
///
/// Arrays and objects contribute their values in order, nested containers are
/// flattened, numbers and booleans are stringified, `null` and `""` are dropped.
#[must_use]
pub fn segments_from(params: &Value) -> Vec<String> {
    let mut out = Vec::new();
    push_segments(params, &mut out);
    out
}

fn push_segments(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Null => {}
        Value::String(s) if s.is_empty() => {}
        Value::String(s) => out.push(s.clone()),
        Value::Number(n) => out.push(n.to_string()),
        Value::Bool(b) => out.push(b.to_string()),
        Value::Array(items) => items.iter().for_each(|v| push_segments(v, out)),
        Value::Object(map) => map.values().for_each(|v| push_segments(v, out)),
    }
}
