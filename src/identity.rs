//! # Identity Resolver
//!
//! Every controller type declares where it lives with a static
//! [`ControllerDescriptor`]: its namespace path, its short name and the source
//! file that defines it. At registration time the descriptor is resolved once into
//! a [`ControllerIdentity`], which every instance of that type then shares.
//!
//! ```text
//! namespace   app::www::controller          source   app/www/controller/index.rs
//!                  ^^^ module name                   app/www   <- module dir
//!             app::www  <- module namespace          app       <- application dir
//! ```
//!
//! The [`controller_descriptor!`](crate::controller_descriptor) macro fills the
//! descriptor from `module_path!()` and `file!()`, so a controller written at
//! `src/app/www/controller/index.rs` gets the layout above without typing it.

use crate::error::DispatchError;
use crate::naming::{parent_namespace, NS_SEPARATOR};
use std::path::{Path, PathBuf};

/// Static identity metadata supplied by a controller type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerDescriptor {
    /// Enclosing namespace, e.g. `app::www::controller`
    pub namespace: &'static str,
    /// Controller short name, e.g. `Index`
    pub name: &'static str,
    /// Source file defining the controller, e.g. `app/www/controller/index.rs`
    pub source_file: &'static str,
}

impl ControllerDescriptor {
    #[must_use]
    pub const fn new(namespace: &'static str, name: &'static str, source_file: &'static str) -> Self {
        Self {
            namespace,
            name,
            source_file,
        }
    }
}

/// Build a [`ControllerDescriptor`] for the controller defined in the calling module.
#[macro_export]
macro_rules! controller_descriptor {
    ($name:expr) => {
        $crate::identity::ControllerDescriptor::new(module_path!(), $name, file!())
    };
}

/// Identity derived from a [`ControllerDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerIdentity {
    module_name: String,
    controller_name: String,
    controller_namespace: String,
    module_namespace: String,
    module_dir: PathBuf,
    application_dir: PathBuf,
}

impl ControllerIdentity {
    /// Resolve a descriptor, anchoring relative source paths at `root` when given.
    ///
    /// Fails when the namespace has fewer than two segments (no module can be
    /// named) or when the source file does not sit two directories deep.
    pub fn resolve(
        descriptor: &ControllerDescriptor,
        root: Option<&Path>,
    ) -> Result<Self, DispatchError> {
        let invalid = |reason: &str| DispatchError::InvalidController {
            name: descriptor.name.to_string(),
            reason: reason.to_string(),
        };

        if descriptor.name.is_empty() {
            return Err(invalid("controller name is empty"));
        }

        let segments: Vec<&str> = descriptor
            .namespace
            .split(NS_SEPARATOR)
            .filter(|s| !s.is_empty())
            .collect();
        if segments.len() < 2 {
            return Err(invalid("namespace needs at least a module and a controller segment"));
        }
        let module_name = segments[segments.len() - 2].to_string();

        let source = match root {
            Some(root) if Path::new(descriptor.source_file).is_relative() => {
                root.join(descriptor.source_file)
            }
            _ => PathBuf::from(descriptor.source_file),
        };
        let module_dir = source
            .parent()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| invalid("source file must sit two directories below its module"))?
            .to_path_buf();
        let application_dir = module_dir
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

        Ok(Self {
            module_name,
            controller_name: descriptor.name.to_string(),
            controller_namespace: descriptor.namespace.to_string(),
            module_namespace: parent_namespace(descriptor.namespace).to_string(),
            module_dir,
            application_dir,
        })
    }

    #[must_use]
    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    #[must_use]
    pub fn controller_name(&self) -> &str {
        &self.controller_name
    }

    #[must_use]
    pub fn controller_namespace(&self) -> &str {
        &self.controller_namespace
    }

    #[must_use]
    pub fn module_namespace(&self) -> &str {
        &self.module_namespace
    }

    #[must_use]
    pub fn module_dir(&self) -> &Path {
        &self.module_dir
    }

    #[must_use]
    pub fn application_dir(&self) -> &Path {
        &self.application_dir
    }

    /// Registry key: `namespace::ShortName`.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!(
            "{}{NS_SEPARATOR}{}",
            self.controller_namespace, self.controller_name
        )
    }
}

impl std::fmt::Display for ControllerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.qualified_name())
    }
}
