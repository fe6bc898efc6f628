//! # View Module
//!
//! The view capability a controller renders through, and a default
//! implementation backed by `minijinja` templates.
//!
//! The template engine itself is a collaborator: the dispatch core only relies on
//! [`View`] and creates views through whatever [`ViewFactory`] the application was
//! built with. An application built without a factory has no views at all, and every
//! view-related step of action resolution and rendering is skipped.
//!
//! ## Template layout
//!
//! ```text
//! {module_dir}/Views/
//! ├── _layouts/main.html          # layouts, chosen by use_layout / views.layout
//! ├── _includes/error/405.html    # error views, chosen by set_view_error
//! └── Blog/Show.html              # {Controller}/{action view}
//! ```

mod core;
mod template;

pub use core::{View, ViewBinding, ViewFactory, VIEWS_DIR};
pub use template::{TemplateView, TemplateViewFactory};
