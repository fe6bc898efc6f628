//! # Action Module
//!
//! Actions are the named operations of a controller. Each controller type
//! declares its actions once, at registration time, as a table mapping the
//! handler member name (`actionIndex`, `actionSave`, ...) to a handler function
//! and its [`ActionMeta`]:
//!
//! ```rust,ignore
//! fn actions(actions: Actions<Self>) -> Actions<Self> {
//!     actions
//!         .action("index", Self::index)
//!         .action_with(
//!             "save",
//!             Self::save,
//!             ActionMeta::new()
//!                 .layout("_layouts/admin")
//!                 .request(RequestConstraint::method(RequestMethod::Post).response("POST only")),
//!         )
//! }
//! ```
//!
//! The table doubles as the action metadata capability ([`ActionMetadata`]) the
//! action resolver queries before running a handler.

mod meta;

pub use meta::{ActionMeta, RenderFormat, RequestConstraint, RequestMethod};

use crate::controller::Context;
use crate::naming::{action_method_name, camelize};
use serde_json::Value;
use std::collections::HashMap;

/// Action handler: a method on the controller taking the instance context.
pub type ActionFn<T> = fn(&mut T, &mut Context) -> anyhow::Result<()>;

/// A registered action handler and its configuration.
pub struct Action<T> {
    pub handler: ActionFn<T>,
    pub meta: ActionMeta,
}

/// Action table of one controller type, keyed by handler member name.
pub struct Actions<T> {
    entries: HashMap<String, Action<T>>,
}

impl<T> Default for Actions<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Actions<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register `handler` for the action `name` (normalized, so `show-post` is `ShowPost`).
    #[must_use]
    pub fn action(self, name: &str, handler: ActionFn<T>) -> Self {
        self.action_with(name, handler, ActionMeta::default())
    }

    /// Register `handler` with its action configuration.
    #[must_use]
    pub fn action_with(mut self, name: &str, handler: ActionFn<T>, meta: ActionMeta) -> Self {
        self.entries
            .insert(action_method_name(&camelize(name)), Action { handler, meta });
        self
    }

    #[must_use]
    pub fn get(&self, handler_name: &str) -> Option<&Action<T>> {
        self.entries.get(handler_name)
    }

    #[must_use]
    pub fn contains(&self, handler_name: &str) -> bool {
        self.entries.contains_key(handler_name)
    }

    /// Handler member names, sorted.
    #[must_use]
    pub fn handler_names(&self) -> Vec<&str> {
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

/// Action metadata capability: configuration declared for a handler.
pub trait ActionMetadata {
    fn action_metadata(&self, handler_name: &str) -> Option<&ActionMeta>;

    /// Single annotation value (`action_view`, `use_layout`, `render_as`, `request`).
    fn action_annotation(&self, handler_name: &str, key: &str) -> Option<Value> {
        self.action_metadata(handler_name)
            .and_then(|meta| meta.annotation(key))
    }
}

impl<T> ActionMetadata for Actions<T> {
    fn action_metadata(&self, handler_name: &str) -> Option<&ActionMeta> {
        self.entries.get(handler_name).map(|a| &a.meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Sample;

    fn noop(_: &mut Sample, _: &mut Context) -> anyhow::Result<()> {
        Ok(())
    }

    #[test]
    fn test_actions_are_keyed_by_handler_name() {
        let actions = Actions::<Sample>::new()
            .action("index", noop)
            .action("show-post", noop);
        assert!(actions.contains("actionIndex"));
        assert!(actions.contains("actionShowPost"));
        assert!(!actions.contains("index"));
        assert_eq!(actions.handler_names(), vec!["actionIndex", "actionShowPost"]);
        assert_eq!(actions.len(), 2);
    }

    #[test]
    fn test_metadata_capability() {
        let actions = Actions::<Sample>::new().action_with(
            "save",
            noop,
            ActionMeta::new().layout("_layouts/admin"),
        );
        assert_eq!(
            actions.action_annotation("actionSave", "use_layout"),
            Some(json!("_layouts/admin"))
        );
        assert_eq!(actions.action_annotation("actionSave", "action_view"), None);
        assert!(actions.action_metadata("actionMissing").is_none());
    }
}
