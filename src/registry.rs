//! Controller registry: logical controller name -> factory.
//!
//! Controller types are registered once at start-up. Registration resolves the
//! type's identity, declares its action table and refuses types without an `Index`
//! action, so every failure a type can have surfaces before the first request.
//! A module/controller pair routes to at most one registered type.

use crate::action::Actions;
use crate::controller::{factory, Controller, Factory};
use crate::error::DispatchError;
use crate::identity::ControllerIdentity;
use crate::naming::action_method_name;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Action every controller must declare; routes without an action use it.
pub const DEFAULT_ACTION: &str = "Index";

/// A registered controller type.
#[derive(Clone)]
pub struct Registration {
    identity: Arc<ControllerIdentity>,
    handlers: Vec<String>,
    factory: Factory,
}

impl Registration {
    #[must_use]
    pub fn identity(&self) -> &Arc<ControllerIdentity> {
        &self.identity
    }

    /// Declared handler member names, sorted.
    #[must_use]
    pub fn handlers(&self) -> &[String] {
        &self.handlers
    }

    pub(crate) fn factory(&self) -> &Factory {
        &self.factory
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("identity", &self.identity)
            .field("handlers", &self.handlers)
            .finish_non_exhaustive()
    }
}

/// Registered controllers keyed by qualified name (`app::www::controller::Index`).
#[derive(Debug, Clone, Default)]
pub struct ControllerRegistry {
    root: Option<PathBuf>,
    entries: HashMap<String, Registration>,
}

impl ControllerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry resolving relative controller source paths against `root`.
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            entries: HashMap::new(),
        }
    }

    pub(crate) fn set_root(&mut self, root: PathBuf) {
        self.root = Some(root);
    }

    #[must_use]
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Register controller type `T`.
    ///
    /// Registering a name twice replaces the earlier type. A type whose module and
    /// controller name match another registration under a different qualified name
    /// is refused, since path dispatch could not tell the two apart.
    pub fn register<T: Controller>(&mut self) -> Result<Arc<ControllerIdentity>, DispatchError> {
        let identity = Arc::new(ControllerIdentity::resolve(
            &T::descriptor(),
            self.root.as_deref(),
        )?);
        let name = identity.qualified_name();

        let actions = T::actions(Actions::new());
        if !actions.contains(&action_method_name(DEFAULT_ACTION)) {
            warn!(controller = %name, "Controller declares no Index action");
            return Err(DispatchError::InvalidController {
                name,
                reason: format!("every controller must declare the {DEFAULT_ACTION} action"),
            });
        }
        let handlers = actions
            .handler_names()
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();

        if let Some(existing) = self.entries.values().find(|r| {
            r.identity.qualified_name() != name
                && r.identity.module_name().eq_ignore_ascii_case(identity.module_name())
                && r.identity
                    .controller_name()
                    .eq_ignore_ascii_case(identity.controller_name())
        }) {
            let existing = existing.identity.qualified_name();
            warn!(
                controller = %name,
                existing = %existing,
                "Controller route already taken by another registration"
            );
            return Err(DispatchError::InvalidController {
                reason: format!(
                    "module '{}' already routes controller '{}' to {existing}",
                    identity.module_name(),
                    identity.controller_name()
                ),
                name,
            });
        }

        if self.entries.contains_key(&name) {
            warn!(
                controller = %name,
                total_controllers = self.entries.len(),
                "Replaced existing controller registration"
            );
        }
        info!(
            controller = %name,
            module_dir = %identity.module_dir().display(),
            actions = handlers.len(),
            total_controllers = self.entries.len() + 1,
            "Controller registered"
        );

        self.entries.insert(
            name,
            Registration {
                identity: Arc::clone(&identity),
                handlers,
                factory: factory(actions),
            },
        );
        Ok(identity)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Registration> {
        self.entries.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Controller by module and controller name, ignoring case (`blog`, `post`).
    #[must_use]
    pub fn find(&self, module: &str, controller: &str) -> Option<&Registration> {
        self.entries.values().find(|r| {
            r.identity.module_name().eq_ignore_ascii_case(module)
                && r.identity.controller_name().eq_ignore_ascii_case(controller)
        })
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::Context;
    use crate::identity::ControllerDescriptor;

    #[derive(Default)]
    struct Home;

    impl Home {
        fn index(&mut self, _: &mut Context) -> anyhow::Result<()> {
            Ok(())
        }
    }

    impl Controller for Home {
        fn descriptor() -> ControllerDescriptor {
            ControllerDescriptor::new("site::main::controller", "Home", "main/controller/home.rs")
        }

        fn actions(actions: Actions<Self>) -> Actions<Self> {
            actions.action("index", Self::index).action("about", Self::index)
        }
    }

    #[derive(Default)]
    struct Shadow;

    impl Controller for Shadow {
        fn descriptor() -> ControllerDescriptor {
            ControllerDescriptor::new("other::main::controller", "HOME", "main/controller/home.rs")
        }

        fn actions(actions: Actions<Self>) -> Actions<Self> {
            actions.action("index", Self::index)
        }
    }

    impl Shadow {
        fn index(&mut self, _: &mut Context) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct NoIndex;

    impl Controller for NoIndex {
        fn descriptor() -> ControllerDescriptor {
            ControllerDescriptor::new("site::main::controller", "NoIndex", "main/controller/x.rs")
        }

        fn actions(actions: Actions<Self>) -> Actions<Self> {
            actions.action("about", Self::about)
        }
    }

    impl NoIndex {
        fn about(&mut self, _: &mut Context) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ControllerRegistry::with_root("/srv/site");
        let identity = registry.register::<Home>().unwrap();
        assert_eq!(identity.qualified_name(), "site::main::controller::Home");
        assert_eq!(identity.module_dir(), Path::new("/srv/site/main"));

        let reg = registry.get("site::main::controller::Home").unwrap();
        assert_eq!(reg.handlers(), ["actionAbout", "actionIndex"]);
        assert!(registry.find("MAIN", "home").is_some());
        assert!(registry.find("main", "other").is_none());
        assert_eq!(registry.names(), vec!["site::main::controller::Home"]);
    }

    #[test]
    fn test_register_requires_index_action() {
        let mut registry = ControllerRegistry::new();
        let err = registry.register::<NoIndex>().unwrap_err();
        assert!(matches!(err, DispatchError::InvalidController { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_twice_replaces() {
        let mut registry = ControllerRegistry::new();
        registry.register::<Home>().unwrap();
        registry.register::<Home>().unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_refuses_ambiguous_route() {
        let mut registry = ControllerRegistry::new();
        registry.register::<Home>().unwrap();

        let err = registry.register::<Shadow>().unwrap_err();

        match err {
            DispatchError::InvalidController { ref name, ref reason } => {
                assert_eq!(name, "other::main::controller::HOME");
                assert!(reason.contains("site::main::controller::Home"));
            }
            ref other => panic!("unexpected error: {other}"),
        }
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.find("main", "home").unwrap().identity().qualified_name(),
            "site::main::controller::Home"
        );
    }
}
