use super::core::{View, ViewBinding, ViewFactory};
use anyhow::Context as _;
use minijinja::{Environment, Value as TemplateValue};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Template-backed view rendering `{Views}/{Controller}/{action}.html`.
///
/// Views whose name contains a `/` are looked up relative to the views directory
/// (`_includes/error/405`), so replacement views can be shared across controllers.
#[derive(Debug, Clone)]
pub struct TemplateView {
    views_dir: PathBuf,
    controller: String,
    action_view: String,
    layout: Option<String>,
    json: bool,
    data: Map<String, Value>,
    errors: Vec<String>,
    error_code: Option<u16>,
    pagination: Option<Value>,
}

impl TemplateView {
    #[must_use]
    pub fn new(views_dir: impl Into<PathBuf>, controller: &str) -> Self {
        Self {
            views_dir: views_dir.into(),
            controller: controller.to_string(),
            action_view: String::new(),
            layout: None,
            json: false,
            data: Map::new(),
            errors: Vec::new(),
            error_code: None,
            pagination: None,
        }
    }

    fn template_path(&self) -> PathBuf {
        let name = match self.error_code {
            Some(code) => format!("_includes/error/{code}"),
            None => self.action_view.clone(),
        };
        if name.contains('/') {
            self.views_dir.join(format!("{name}.html"))
        } else {
            self.views_dir
                .join(&self.controller)
                .join(format!("{name}.html"))
        }
    }

    fn context(&self) -> Map<String, Value> {
        let mut ctx = self.data.clone();
        ctx.insert(
            "errors".to_string(),
            Value::Array(self.errors.iter().cloned().map(Value::String).collect()),
        );
        if let Some(pagination) = &self.pagination {
            ctx.insert("pagination".to_string(), pagination.clone());
        }
        ctx
    }

    fn render_file(path: &Path, ctx: TemplateValue) -> anyhow::Result<String> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("view template '{}' not readable", path.display()))?;
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("view.html")
            .to_string();
        let mut env = Environment::new();
        env.add_template_owned(name.clone(), source)?;
        let rendered = env.get_template(&name)?.render(ctx)?;
        Ok(rendered)
    }
}

impl View for TemplateView {
    fn assign(&mut self, data: Map<String, Value>) {
        self.data.extend(data);
    }

    fn use_layout(&mut self, name: &str) {
        self.layout = Some(name.to_string());
    }

    fn isset_layout(&self) -> bool {
        self.layout.is_some()
    }

    fn render_to_json(&mut self) {
        self.json = true;
    }

    fn set_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    fn set_view_error(&mut self, code: u16) {
        self.error_code = Some(code);
    }

    fn set_action_view(&mut self, name: &str) {
        self.action_view = name.to_string();
    }

    fn set_pagination(&mut self, data: Value) {
        self.pagination = Some(data);
    }

    fn render(&mut self) -> anyhow::Result<String> {
        let ctx = self.context();
        if self.json {
            return Ok(serde_json::to_string(&ctx)?);
        }

        let body = Self::render_file(&self.template_path(), TemplateValue::from_serialize(&ctx))?;
        match &self.layout {
            Some(layout) => {
                let layout_ctx: TemplateValue = ctx
                    .iter()
                    .map(|(k, v)| (k.as_str(), TemplateValue::from_serialize(v)))
                    .chain(std::iter::once((
                        "content",
                        TemplateValue::from_safe_string(body),
                    )))
                    .collect();
                Self::render_file(&self.views_dir.join(format!("{layout}.html")), layout_ctx)
            }
            None => Ok(body),
        }
    }
}

/// Factory creating a [`TemplateView`] over the module's `Views` directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateViewFactory;

impl ViewFactory for TemplateViewFactory {
    fn create(&self, binding: &ViewBinding) -> Box<dyn View> {
        Box::new(TemplateView::new(
            binding.views_dir(),
            &binding.controller_name,
        ))
    }
}
