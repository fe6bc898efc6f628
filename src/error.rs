//! Error taxonomy for controller construction, action resolution and delegation.
//!
//! A failed request constraint is not an error value: it sets status 405 and
//! swaps the view.

use thiserror::Error;

/// Errors surfaced by the dispatch core to the router or host.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The requested action has no handler on the controller.
    #[error("Action '{handler}' is missing on controller '{controller}'")]
    ActionNotFound {
        /// Controller that was asked to run the action
        controller: String,
        /// Computed handler member name, e.g. `actionIndex`
        handler: String,
    },

    /// A delegation or routing target is missing or is not a registered controller.
    #[error("Controller '{name}' doesn't exist or is not a registered controller")]
    ControllerResolution {
        /// Fully resolved controller path that was looked up
        name: String,
    },

    /// A controller type failed start-up validation (identity or mandatory actions).
    #[error("Invalid controller '{name}': {reason}")]
    InvalidController {
        /// Controller short name or path
        name: String,
        /// Why the registration was refused
        reason: String,
    },

    /// The application-defined `init` hook failed while constructing an instance.
    #[error("Controller '{controller}' failed to initialize: {source}")]
    Init {
        /// Controller being constructed
        controller: String,
        /// Error raised by the hook
        #[source]
        source: anyhow::Error,
    },

    /// The view (or the config it reads its default layout from) failed to render.
    #[error("Rendering '{controller}' failed: {source}")]
    Render {
        controller: String,
        #[source]
        source: anyhow::Error,
    },

    /// A hook or action handler returned an error.
    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}

impl DispatchError {
    /// HTTP status a host should answer with when this error reaches it.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            DispatchError::ActionNotFound { .. } | DispatchError::ControllerResolution { .. } => {
                404
            }
            _ => 500,
        }
    }
}
