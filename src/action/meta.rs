use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// Output format selected by the `render_as` annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RenderFormat {
    #[default]
    Html,
    Json,
}

impl RenderFormat {
    /// `JSON` in any case selects JSON; anything else keeps HTML.
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("json") {
            RenderFormat::Json
        } else {
            RenderFormat::Html
        }
    }
}

impl From<String> for RenderFormat {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<RenderFormat> for String {
    fn from(f: RenderFormat) -> Self {
        match f {
            RenderFormat::Html => "HTML".to_string(),
            RenderFormat::Json => "JSON".to_string(),
        }
    }
}

/// HTTP methods an action can be restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
    Post,
    Get,
    Put,
    Delete,
}

impl RequestMethod {
    #[must_use]
    pub fn as_method(&self) -> Method {
        match self {
            RequestMethod::Post => Method::POST,
            RequestMethod::Get => Method::GET,
            RequestMethod::Put => Method::PUT,
            RequestMethod::Delete => Method::DELETE,
        }
    }
}

impl FromStr for RequestMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "POST" => Ok(RequestMethod::Post),
            "GET" => Ok(RequestMethod::Get),
            "PUT" => Ok(RequestMethod::Put),
            "DELETE" => Ok(RequestMethod::Delete),
            other => Err(format!("unsupported request method '{other}'")),
        }
    }
}

/// The `request` annotation: accept the action only for one HTTP method.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequestConstraint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<RequestMethod>,
    /// Message shown to the user when the method does not match
    #[serde(default)]
    pub response: String,
    /// View rendered instead of the 405 error view when the method does not match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_view: Option<String>,
}

impl RequestConstraint {
    #[must_use]
    pub fn method(method: RequestMethod) -> Self {
        Self {
            method: Some(method),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn response(mut self, message: &str) -> Self {
        self.response = message.to_string();
        self
    }

    #[must_use]
    pub fn action_view(mut self, view: &str) -> Self {
        self.action_view = Some(view.to_string());
        self
    }
}

/// Declarative configuration attached to one action handler.
///
/// Field names on the wire match the annotation keys: `action_view`,
/// `use_layout`, `render_as`, `request`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActionMeta {
    #[serde(rename = "action_view", default, skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
    #[serde(rename = "use_layout", default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_as: Option<RenderFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestConstraint>,
}

impl ActionMeta {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn view(mut self, view: &str) -> Self {
        self.view = Some(view.to_string());
        self
    }

    #[must_use]
    pub fn layout(mut self, layout: &str) -> Self {
        self.layout = Some(layout.to_string());
        self
    }

    #[must_use]
    pub fn render_as(mut self, format: RenderFormat) -> Self {
        self.render_as = Some(format);
        self
    }

    #[must_use]
    pub fn request(mut self, constraint: RequestConstraint) -> Self {
        self.request = Some(constraint);
        self
    }

    /// Raw annotation value by key, `None` when the action does not declare it.
    #[must_use]
    pub fn annotation(&self, key: &str) -> Option<Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut map)) => map.remove(key),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_format_parse_is_case_insensitive() {
        assert_eq!(RenderFormat::parse("json"), RenderFormat::Json);
        assert_eq!(RenderFormat::parse("JSON"), RenderFormat::Json);
        assert_eq!(RenderFormat::parse("xml"), RenderFormat::Html);
    }

    #[test]
    fn test_request_method_from_str() {
        assert_eq!("post".parse::<RequestMethod>(), Ok(RequestMethod::Post));
        assert_eq!(RequestMethod::Delete.as_method(), Method::DELETE);
        assert!("PATCH".parse::<RequestMethod>().is_err());
    }

    #[test]
    fn test_annotation_lookup_by_key() {
        let meta = ActionMeta::new()
            .view("Edit")
            .render_as(RenderFormat::Json)
            .request(RequestConstraint::method(RequestMethod::Post).response("POST only"));
        assert_eq!(meta.annotation("action_view"), Some(json!("Edit")));
        assert_eq!(meta.annotation("render_as"), Some(json!("JSON")));
        assert_eq!(meta.annotation("request").unwrap()["method"], json!("POST"));
        assert_eq!(meta.annotation("use_layout"), None);
    }

    #[test]
    fn test_meta_deserializes_from_yaml() {
        let meta: ActionMeta = serde_yaml::from_str(
            "action_view: Form\nuse_layout: _layouts/admin\nrender_as: json\nrequest:\n  method: PUT\n  response: PUT only\n",
        )
        .unwrap();
        assert_eq!(meta.view.as_deref(), Some("Form"));
        assert_eq!(meta.layout.as_deref(), Some("_layouts/admin"));
        assert_eq!(meta.render_as, Some(RenderFormat::Json));
        let request = meta.request.unwrap();
        assert_eq!(request.method, Some(RequestMethod::Put));
        assert_eq!(request.action_view, None);
    }
}
