#![allow(dead_code)]

/// Per-thread journal of hook and handler calls.
///
/// Each test runs on its own thread and dispatch is synchronous, so the journal
/// only ever sees the calls of the current test.
pub mod events {
    use std::cell::RefCell;

    thread_local! {
        static EVENTS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
    }

    pub fn record(event: impl Into<String>) {
        EVENTS.with(|events| events.borrow_mut().push(event.into()));
    }

    pub fn take() -> Vec<String> {
        EVENTS.with(|events| std::mem::take(&mut *events.borrow_mut()))
    }

    pub fn reset() {
        EVENTS.with(|events| events.borrow_mut().clear());
    }
}

/// View fake recording every call, keyed by controller name.
pub mod recording {
    use parking_lot::Mutex;
    use serde_json::{Map, Value};
    use std::collections::HashMap;
    use std::sync::Arc;
    use voodoo::view::{View, ViewBinding, ViewFactory};

    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct ViewRecord {
        pub created: usize,
        pub data: Map<String, Value>,
        pub action_view: Option<String>,
        pub layout: Option<String>,
        pub json: bool,
        pub errors: Vec<String>,
        pub view_error: Option<u16>,
        pub pagination: Option<Value>,
        pub renders: usize,
    }

    type Log = Arc<Mutex<HashMap<String, ViewRecord>>>;

    pub struct RecordingView {
        controller: String,
        log: Log,
    }

    impl RecordingView {
        fn with<R>(&self, f: impl FnOnce(&mut ViewRecord) -> R) -> R {
            let mut log = self.log.lock();
            f(log.entry(self.controller.clone()).or_default())
        }
    }

    impl View for RecordingView {
        fn assign(&mut self, data: Map<String, Value>) {
            self.with(|r| r.data.extend(data));
        }

        fn use_layout(&mut self, name: &str) {
            self.with(|r| r.layout = Some(name.to_string()));
        }

        fn isset_layout(&self) -> bool {
            self.with(|r| r.layout.is_some())
        }

        fn render_to_json(&mut self) {
            self.with(|r| r.json = true);
        }

        fn set_error(&mut self, message: &str) {
            self.with(|r| r.errors.push(message.to_string()));
        }

        fn set_view_error(&mut self, code: u16) {
            self.with(|r| r.view_error = Some(code));
        }

        fn set_action_view(&mut self, name: &str) {
            self.with(|r| r.action_view = Some(name.to_string()));
        }

        fn set_pagination(&mut self, data: Value) {
            self.with(|r| r.pagination = Some(data));
        }

        fn render(&mut self) -> anyhow::Result<String> {
            let controller = self.controller.clone();
            Ok(self.with(|r| {
                r.renders += 1;
                match r.view_error {
                    Some(code) => format!("<{controller}:error/{code}>"),
                    None => format!(
                        "<{controller}:{}>",
                        r.action_view.as_deref().unwrap_or_default()
                    ),
                }
            }))
        }
    }

    /// Factory handing out [`RecordingView`]s that share one log.
    #[derive(Clone, Default)]
    pub struct RecordingViews {
        log: Log,
    }

    impl RecordingViews {
        pub fn new() -> Self {
            Self::default()
        }

        /// What the views of `controller` were told, default when none was created.
        pub fn record(&self, controller: &str) -> ViewRecord {
            self.log.lock().get(controller).cloned().unwrap_or_default()
        }
    }

    impl ViewFactory for RecordingViews {
        fn create(&self, binding: &ViewBinding) -> Box<dyn View> {
            self.log
                .lock()
                .entry(binding.controller_name.clone())
                .or_default()
                .created += 1;
            Box::new(RecordingView {
                controller: binding.controller_name.clone(),
                log: Arc::clone(&self.log),
            })
        }
    }
}

/// Controllers of a small two-module site: `blog` (with views) and `admin` (without).
pub mod controllers {
    use super::events::record;
    use serde_json::json;
    use voodoo::{
        ActionMeta, Actions, Context, Controller, ControllerDescriptor, RenderFormat,
        RequestConstraint, RequestMethod,
    };

    #[derive(Default)]
    pub struct Post {
        pub shown: usize,
    }

    impl Controller for Post {
        fn descriptor() -> ControllerDescriptor {
            ControllerDescriptor::new("site::blog::controller", "Post", "app/blog/controller/post.rs")
        }

        fn actions(actions: Actions<Self>) -> Actions<Self> {
            actions
                .action("index", Self::index)
                .action("show", Self::show)
                .action_with("edit", Self::edit, ActionMeta::new().view("Editor"))
                .action_with(
                    "save",
                    Self::save,
                    ActionMeta::new().request(
                        RequestConstraint::method(RequestMethod::Post).response("POST only"),
                    ),
                )
                .action_with(
                    "update",
                    Self::update,
                    ActionMeta::new().request(
                        RequestConstraint::method(RequestMethod::Put)
                            .response("PUT only")
                            .action_view("Form"),
                    ),
                )
                .action_with(
                    "api",
                    Self::api,
                    ActionMeta::new()
                        .layout("_layouts/api")
                        .render_as(RenderFormat::Json),
                )
                .action("fail", Self::fail)
                .action("abort", Self::abort_action)
                .action("quiet", Self::quiet)
                .action("forward", Self::forward)
                .action("paginate", Self::paginate)
        }

        fn init(&mut self, _ctx: &mut Context) -> anyhow::Result<()> {
            record("init");
            Ok(())
        }

        fn before_action(&mut self, _ctx: &mut Context) -> anyhow::Result<()> {
            record("before");
            Ok(())
        }

        fn after_action(&mut self, _ctx: &mut Context) -> anyhow::Result<()> {
            record("after");
            Ok(())
        }

        fn finalize(&mut self, ctx: &mut Context) {
            record("finalize");
            ctx.commit_status();
        }
    }

    impl Post {
        fn index(&mut self, _ctx: &mut Context) -> anyhow::Result<()> {
            record("index");
            Ok(())
        }

        fn show(&mut self, ctx: &mut Context) -> anyhow::Result<()> {
            record("show");
            self.shown += 1;
            let id = ctx.catch_numeric_segment().unwrap_or("0").to_string();
            if let Some(view) = ctx.view() {
                view.assign_value("title", json!(format!("Post {id}")));
            }
            Ok(())
        }

        fn edit(&mut self, _ctx: &mut Context) -> anyhow::Result<()> {
            record("edit");
            Ok(())
        }

        fn save(&mut self, _ctx: &mut Context) -> anyhow::Result<()> {
            record("save");
            Ok(())
        }

        fn update(&mut self, _ctx: &mut Context) -> anyhow::Result<()> {
            record("update");
            Ok(())
        }

        fn api(&mut self, _ctx: &mut Context) -> anyhow::Result<()> {
            record("api");
            Ok(())
        }

        fn fail(&mut self, _ctx: &mut Context) -> anyhow::Result<()> {
            record("fail");
            anyhow::bail!("post storage unavailable")
        }

        fn abort_action(&mut self, ctx: &mut Context) -> anyhow::Result<()> {
            record("abort");
            ctx.abort();
            Ok(())
        }

        fn quiet(&mut self, ctx: &mut Context) -> anyhow::Result<()> {
            record("quiet");
            ctx.disable_view(true);
            ctx.set_http_code(204);
            Ok(())
        }

        fn forward(&mut self, ctx: &mut Context) -> anyhow::Result<()> {
            record("forward");
            let mut next = ctx.hand_off("other", json!({ "x": 1 }))?;
            next.run("index")?;
            Ok(())
        }

        fn paginate(&mut self, ctx: &mut Context) -> anyhow::Result<()> {
            ctx.set_pagination(json!({ "page": 2, "per_page": 10 }));
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct Other;

    impl Controller for Other {
        fn descriptor() -> ControllerDescriptor {
            ControllerDescriptor::new(
                "site::blog::controller",
                "Other",
                "app/blog/controller/other.rs",
            )
        }

        fn actions(actions: Actions<Self>) -> Actions<Self> {
            actions.action("index", Self::index)
        }

        fn init(&mut self, _ctx: &mut Context) -> anyhow::Result<()> {
            record("other.init");
            Ok(())
        }

        fn finalize(&mut self, ctx: &mut Context) {
            record("other.finalize");
            ctx.commit_status();
        }
    }

    impl Other {
        fn index(&mut self, ctx: &mut Context) -> anyhow::Result<()> {
            record(format!("other.index:{}", ctx.segments().join(",")));
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct Broken;

    impl Controller for Broken {
        fn descriptor() -> ControllerDescriptor {
            ControllerDescriptor::new(
                "site::blog::controller",
                "Broken",
                "app/blog/controller/broken.rs",
            )
        }

        fn actions(actions: Actions<Self>) -> Actions<Self> {
            actions.action("index", |_, _| Ok(()))
        }

        fn init(&mut self, _ctx: &mut Context) -> anyhow::Result<()> {
            anyhow::bail!("no database configured")
        }
    }

    #[derive(Default)]
    pub struct AdminIndex;

    impl Controller for AdminIndex {
        fn descriptor() -> ControllerDescriptor {
            ControllerDescriptor::new(
                "site::admin::controller",
                "Index",
                "app/admin/controller/index.rs",
            )
        }

        fn actions(actions: Actions<Self>) -> Actions<Self> {
            actions.action("index", Self::index)
        }

        fn finalize(&mut self, ctx: &mut Context) {
            record("admin.finalize");
            ctx.commit_status();
        }
    }

    impl AdminIndex {
        fn index(&mut self, _ctx: &mut Context) -> anyhow::Result<()> {
            record("admin.index");
            Ok(())
        }
    }
}

pub mod fixture {
    use super::controllers::{AdminIndex, Broken, Other, Post};
    use super::events;
    use super::recording::RecordingViews;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;
    use voodoo::app::ApplicationBuilder;
    use voodoo::{Application, BufferedResponse, Exchange, HttpRequest, Response};

    pub const POST: &str = "site::blog::controller::Post";
    pub const OTHER: &str = "site::blog::controller::Other";
    pub const BROKEN: &str = "site::blog::controller::Broken";
    pub const ADMIN: &str = "site::admin::controller::Index";

    /// `{root}/app/blog/Views` exists, `{root}/app/admin` has no views.
    pub fn site_dir() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("app/blog/Views")).unwrap();
        std::fs::create_dir_all(dir.path().join("app/admin")).unwrap();
        dir
    }

    pub fn builder(root: &Path) -> ApplicationBuilder {
        Application::builder()
            .root(root)
            .register::<Post>()
            .unwrap()
            .register::<Other>()
            .unwrap()
            .register::<Broken>()
            .unwrap()
            .register::<AdminIndex>()
            .unwrap()
    }

    pub struct Site {
        pub dir: TempDir,
        pub app: Arc<Application>,
        pub views: RecordingViews,
    }

    /// Site whose views are recorded; clears the event journal.
    pub fn site() -> Site {
        events::reset();
        let dir = site_dir();
        let views = RecordingViews::new();
        let app = builder(dir.path()).view_factory(views.clone()).build();
        Site { dir, app, views }
    }

    pub fn exchange(request: HttpRequest) -> (Exchange, Arc<BufferedResponse>) {
        let response = Arc::new(BufferedResponse::new());
        let exchange = Exchange::new(
            Arc::new(request),
            Arc::clone(&response) as Arc<dyn Response>,
        );
        (exchange, response)
    }

    pub fn get(uri: &str) -> (Exchange, Arc<BufferedResponse>) {
        exchange(HttpRequest::get(uri))
    }
}
