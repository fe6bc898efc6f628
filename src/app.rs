//! # Application
//!
//! The router boundary of the dispatch core. An [`Application`] holds the
//! controller registry and the view factory, constructs controller instances by
//! name, and maps request paths onto them.
//!
//! ```rust,ignore
//! let app = Application::builder()
//!     .root(env!("CARGO_MANIFEST_DIR"))
//!     .register::<www::Index>()?
//!     .register::<blog::Post>()?
//!     .view_factory(TemplateViewFactory)
//!     .build();
//!
//! app.dispatch("/blog/post/show/42", exchange)?;
//! ```
//!
//! ## Path mapping
//!
//! `/{module}/{controller}/{action}/{segments...}`, each part defaulting to
//! `Main`, `Index` and `Index`. Module and controller match registered identities
//! ignoring case after normalization, so `/blog/blog-post` reaches `BlogPost` in
//! module `Blog`.

use crate::controller::{segments_from, Controller, ControllerInstance};
use crate::error::DispatchError;
use crate::naming::{camelize, NS_SEPARATOR};
use crate::registry::{ControllerRegistry, Registration, DEFAULT_ACTION};
use crate::server::Exchange;
use crate::view::ViewFactory;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Module used when a path names none.
pub const DEFAULT_MODULE: &str = "Main";

/// Controller used when a path names none.
pub const DEFAULT_CONTROLLER: &str = "Index";

pub struct Application {
    registry: ControllerRegistry,
    view_factory: Option<Arc<dyn ViewFactory>>,
}

impl Application {
    #[must_use]
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::default()
    }

    #[must_use]
    pub fn registry(&self) -> &ControllerRegistry {
        &self.registry
    }

    /// Factory for controller views; `None` means the application renders nothing.
    #[must_use]
    pub fn view_factory(&self) -> Option<&dyn ViewFactory> {
        self.view_factory.as_deref()
    }

    /// Construct the controller registered as `name` with `segments`.
    ///
    /// A leading `::` on `name` is accepted. The instance is initialized but no
    /// action has run; drive it with [`ControllerInstance::run`].
    pub fn construct(
        self: &Arc<Self>,
        name: &str,
        segments: impl Into<Value>,
        exchange: Exchange,
    ) -> Result<ControllerInstance, DispatchError> {
        let name = name.strip_prefix(NS_SEPARATOR).unwrap_or(name);
        self.instantiate(name, segments_from(&segments.into()), exchange)
    }

    pub(crate) fn instantiate(
        self: &Arc<Self>,
        name: &str,
        segments: Vec<String>,
        exchange: Exchange,
    ) -> Result<ControllerInstance, DispatchError> {
        let registration = self.registry.get(name).ok_or_else(|| {
            warn!(
                controller = %name,
                request_id = %exchange.request_id(),
                "Controller not registered"
            );
            DispatchError::ControllerResolution {
                name: name.to_string(),
            }
        })?;
        self.instantiate_registration(registration, segments, exchange)
    }

    fn instantiate_registration(
        self: &Arc<Self>,
        registration: &Registration,
        segments: Vec<String>,
        exchange: Exchange,
    ) -> Result<ControllerInstance, DispatchError> {
        ControllerInstance::construct(
            Arc::clone(self),
            Arc::clone(registration.identity()),
            registration.factory(),
            segments,
            exchange,
        )
    }

    /// Map `path` onto a registered controller and run its action to completion,
    /// terminal transition included.
    pub fn dispatch(self: &Arc<Self>, path: &str, exchange: Exchange) -> Result<(), DispatchError> {
        let start = Instant::now();
        let route = Route::parse(path);
        let request_id = exchange.request_id();

        let registration = self
            .registry
            .find(&route.module, &route.controller)
            .ok_or_else(|| {
                warn!(
                    path = %path,
                    module = %route.module,
                    controller = %route.controller,
                    request_id = %request_id,
                    "No controller for path"
                );
                DispatchError::ControllerResolution {
                    name: format!("{}/{}", route.module, route.controller),
                }
            })?;

        let mut instance = self.instantiate_registration(registration, route.segments, exchange)?;
        let result = instance.run(&route.action);

        match &result {
            Ok(()) => info!(
                path = %path,
                controller = %registration.identity(),
                action = %route.action,
                request_id = %request_id,
                status = instance.context().http_code(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Request dispatched"
            ),
            Err(e) => error!(
                path = %path,
                controller = %registration.identity(),
                action = %route.action,
                request_id = %request_id,
                status = e.status(),
                error = %e,
                "Request failed"
            ),
        }
        result
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("registry", &self.registry)
            .field("has_view_factory", &self.view_factory.is_some())
            .finish()
    }
}

/// Module, controller and action named by a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub module: String,
    pub controller: String,
    pub action: String,
    pub segments: Vec<String>,
}

impl Route {
    /// Split `/{module}/{controller}/{action}/{segments...}`, ignoring the query string.
    #[must_use]
    pub fn parse(path: &str) -> Self {
        let path = path.split('?').next().unwrap_or("");
        let mut parts = path.split('/').filter(|p| !p.is_empty());
        let mut next_or = |default: &str| {
            parts
                .next()
                .map(camelize)
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let module = next_or(DEFAULT_MODULE);
        let controller = next_or(DEFAULT_CONTROLLER);
        let action = next_or(DEFAULT_ACTION);
        let segments = parts.map(str::to_string).collect();
        Self {
            module,
            controller,
            action,
            segments,
        }
    }
}

/// Builder for [`Application`].
#[derive(Default)]
pub struct ApplicationBuilder {
    registry: ControllerRegistry,
    view_factory: Option<Arc<dyn ViewFactory>>,
}

impl ApplicationBuilder {
    /// Anchor relative controller source paths at `root`. Call before registering.
    #[must_use]
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.registry.set_root(root.into());
        self
    }

    /// Register controller type `T`.
    pub fn register<T: Controller>(mut self) -> Result<Self, DispatchError> {
        self.registry.register::<T>()?;
        Ok(self)
    }

    /// Use an already populated registry.
    #[must_use]
    pub fn registry(mut self, registry: ControllerRegistry) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn view_factory(mut self, factory: impl ViewFactory + 'static) -> Self {
        self.view_factory = Some(Arc::new(factory));
        self
    }

    #[must_use]
    pub fn build(self) -> Arc<Application> {
        Arc::new(Application {
            registry: self.registry,
            view_factory: self.view_factory,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_defaults() {
        let route = Route::parse("/");
        assert_eq!(route.module, "Main");
        assert_eq!(route.controller, "Index");
        assert_eq!(route.action, "Index");
        assert!(route.segments.is_empty());
    }

    #[test]
    fn test_route_parts_are_normalized() {
        let route = Route::parse("/blog/blog-post/show-all/2024/page/3?sort=asc");
        assert_eq!(route.module, "Blog");
        assert_eq!(route.controller, "BlogPost");
        assert_eq!(route.action, "ShowAll");
        assert_eq!(route.segments, vec!["2024", "page", "3"]);
    }

    #[test]
    fn test_construct_unknown_controller() {
        let app = Application::builder().build();
        let exchange = Exchange::new(
            Arc::new(crate::server::HttpRequest::get("/")),
            Arc::new(crate::server::BufferedResponse::new()),
        );
        let err = app
            .construct("::site::main::controller::Missing", Value::Null, exchange)
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::ControllerResolution { ref name } if name == "site::main::controller::Missing"
        ));
    }
}
