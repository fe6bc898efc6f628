use serde_json::{Map, Value};
use std::path::PathBuf;

/// Directory below a module root that holds its view templates.
pub const VIEWS_DIR: &str = "Views";

/// View capability consumed by controllers.
///
/// A controller owns at most one view, created on first access and mutated in
/// place for the rest of the instance's lifetime.
pub trait View {
    /// Merge `data` into the template variables
    fn assign(&mut self, data: Map<String, Value>);

    /// Assign a single template variable
    fn assign_value(&mut self, key: &str, value: Value) {
        let mut data = Map::new();
        data.insert(key.to_string(), value);
        self.assign(data);
    }

    /// Wrap the rendered action view in layout `name`
    fn use_layout(&mut self, name: &str);

    /// Whether a layout has been chosen
    fn isset_layout(&self) -> bool;

    /// Render the assigned data as JSON instead of HTML
    fn render_to_json(&mut self);

    /// Record a user-facing error message
    fn set_error(&mut self, message: &str);

    /// Replace the action view with the error view for `code`
    fn set_view_error(&mut self, code: u16);

    /// Select the action view to render
    fn set_action_view(&mut self, name: &str);

    /// Attach pagination state
    fn set_pagination(&mut self, data: Value);

    /// Produce the response body
    fn render(&mut self) -> anyhow::Result<String>;
}

/// What a view is bound to when its controller creates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewBinding {
    pub module_name: String,
    pub controller_name: String,
    pub module_dir: PathBuf,
}

impl ViewBinding {
    /// `{module_dir}/Views`
    #[must_use]
    pub fn views_dir(&self) -> PathBuf {
        self.module_dir.join(VIEWS_DIR)
    }
}

/// Creates the view object for a controller instance.
pub trait ViewFactory: Send + Sync {
    fn create(&self, binding: &ViewBinding) -> Box<dyn View>;
}

impl<F> ViewFactory for F
where
    F: Fn(&ViewBinding) -> Box<dyn View> + Send + Sync,
{
    fn create(&self, binding: &ViewBinding) -> Box<dyn View> {
        self(binding)
    }
}
