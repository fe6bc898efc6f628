//! Delegation between controllers of the same request.

use super::core::{segments_from, Context};
use super::instance::ControllerInstance;
use crate::error::DispatchError;
use crate::naming::{camelize, NS_SEPARATOR};
use serde_json::Value;
use tracing::info;

impl Context {
    /// Registry name `target` refers to from this controller.
    ///
    /// `::app::www::controller::Index` is absolute; anything else names a
    /// controller in this controller's namespace (`blog-post` -> `...::BlogPost`).
    #[must_use]
    pub fn resolve_controller_name(&self, target: &str) -> String {
        match target.strip_prefix(NS_SEPARATOR) {
            Some(absolute) => absolute.to_string(),
            None => format!(
                "{}{NS_SEPARATOR}{}",
                self.identity.controller_namespace(),
                camelize(target)
            ),
        }
    }

    /// Construct another controller with `params` as its segments and its view
    /// disabled. No action is run on it.
    ///
    /// Fails with [`DispatchError::ControllerResolution`] before anything is
    /// constructed when `target` is not a registered controller.
    pub fn sub_call(
        &self,
        target: &str,
        params: impl Into<Value>,
    ) -> Result<ControllerInstance, DispatchError> {
        self.delegate(target, segments_from(&params.into()))
    }

    /// Hand the request over to another controller.
    ///
    /// This instance is aborted with its view disabled, so it never renders. The
    /// new instance receives this instance's segments followed by `params`, and
    /// its view stays enabled: its own terminal transition renders the response,
    /// at the latest when it is dropped after running an action.
    pub fn hand_off(
        &mut self,
        target: &str,
        params: impl Into<Value>,
    ) -> Result<ControllerInstance, DispatchError> {
        self.disable_view(true);
        self.abort();

        let mut segments = self.segments.clone();
        segments.extend(segments_from(&params.into()));

        let mut instance = self.delegate(target, segments)?;
        instance.context_mut().disable_view(false);
        info!(
            from = %self.identity,
            to = %instance.context().identity(),
            request_id = %self.request_id(),
            "Request handed off"
        );
        Ok(instance)
    }

    fn delegate(
        &self,
        target: &str,
        segments: Vec<String>,
    ) -> Result<ControllerInstance, DispatchError> {
        let name = self.resolve_controller_name(target);
        let mut instance = self
            .app
            .instantiate(&name, segments, self.exchange.clone())?;
        instance.context_mut().disable_view(true);
        Ok(instance)
    }
}
