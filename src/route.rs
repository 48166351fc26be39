//! Route descriptors: the interface between a web framework's routing layer
//! and the request reconstruction engine.
//!
//! A [`RouteDescriptor`] captures everything the framework knows about an
//! endpoint that matters for rebuilding an equivalent outbound request: the
//! HTTP method set, the path template with its converters, the declared
//! header/cookie/query/path parameter schemas and the optional body schema.
//! Descriptors are immutable once registered with a route builder.

use ordermap::OrderMap;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::backend::types::HttpMethod;
use crate::errors::BuildError;

/// Schema for a single declared header/cookie/query/path parameter.
#[derive(Clone, Debug)]
pub struct ParamSpec {
    pub required: bool,
    pub default: Option<Value>,
}

impl ParamSpec {
    pub fn required() -> Self {
        Self {
            required: true,
            default: None,
        }
    }

    pub fn optional(default: Option<Value>) -> Self {
        Self {
            required: false,
            default,
        }
    }
}

/// Runtime JSON type expected for a declared body parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JsonType {
    Object,
    Array,
    String,
    Number,
    Boolean,
}

impl JsonType {
    /// Check whether a runtime value matches this type.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            JsonType::Object => value.is_object(),
            JsonType::Array => value.is_array(),
            JsonType::String => value.is_string(),
            JsonType::Number => value.is_number(),
            JsonType::Boolean => value.is_boolean(),
        }
    }
}

impl fmt::Display for JsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JsonType::Object => "object",
            JsonType::Array => "array",
            JsonType::String => "string",
            JsonType::Number => "number",
            JsonType::Boolean => "boolean",
        };
        write!(f, "{}", name)
    }
}

/// Schema for the declared body parameter of a route.
#[derive(Clone, Debug)]
pub struct BodySpec {
    pub name: String,
    pub required: bool,
    pub default: Option<Value>,
    pub expected: JsonType,
}

impl BodySpec {
    pub fn new(name: impl Into<String>, expected: JsonType) -> Self {
        Self {
            name: name.into(),
            required: true,
            default: None,
            expected,
        }
    }

    pub fn optional(mut self, default: Option<Value>) -> Self {
        self.required = false;
        self.default = default;
        self
    }
}

/// Converts a call-time value into a path segment string.
///
/// Converters come from the routing layer and may be stateful format objects,
/// so they are held as trait objects. On failure the converter returns the
/// type name it expected; the builder maps that into a `WrongType` error with
/// the parameter name attached.
pub trait PathConverter: Send + Sync {
    fn convert(&self, value: &Value) -> Result<String, String>;
}

/// Default converter: accepts any scalar and stringifies it.
pub struct PlainConverter;

impl PathConverter for PlainConverter {
    fn convert(&self, value: &Value) -> Result<String, String> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            _ => Err("string".to_string()),
        }
    }
}

/// Converter requiring an integer value.
pub struct IntConverter;

impl PathConverter for IntConverter {
    fn convert(&self, value: &Value) -> Result<String, String> {
        value
            .as_i64()
            .map(|n| n.to_string())
            .ok_or_else(|| "integer".to_string())
    }
}

/// Converter requiring a numeric value.
pub struct FloatConverter;

impl PathConverter for FloatConverter {
    fn convert(&self, value: &Value) -> Result<String, String> {
        value
            .as_f64()
            .map(|n| n.to_string())
            .ok_or_else(|| "number".to_string())
    }
}

/// Description of a single registered route, sufficient to reconstruct an
/// equivalent HTTP request outside the framework.
///
/// Construction is chainable:
///
/// ```rust,ignore
/// let route = RouteDescriptor::new("POST", "/on_user_create/{user_id}")
///     .unique_id("on_user_create")
///     .body(BodySpec::new("data", JsonType::Object));
/// ```
///
/// Every `{placeholder}` in the template gets a [`PlainConverter`] by default;
/// `converter()` and `path_param()` refine individual placeholders.
#[derive(Clone)]
pub struct RouteDescriptor {
    methods: BTreeSet<String>,
    path_template: String,
    converters: OrderMap<String, Arc<dyn PathConverter>>,
    header_params: OrderMap<String, ParamSpec>,
    cookie_params: OrderMap<String, ParamSpec>,
    query_params: OrderMap<String, ParamSpec>,
    path_params: OrderMap<String, ParamSpec>,
    body: Option<BodySpec>,
    unique_id: String,
}

impl RouteDescriptor {
    pub fn new(method: impl Into<String>, path_template: impl Into<String>) -> Self {
        let path_template = path_template.into();
        let mut converters: OrderMap<String, Arc<dyn PathConverter>> = OrderMap::new();
        for name in template_placeholders(&path_template) {
            converters.insert(name, Arc::new(PlainConverter));
        }
        let mut methods = BTreeSet::new();
        methods.insert(method.into().to_ascii_uppercase());
        let unique_id = derive_unique_id(&path_template);
        Self {
            methods,
            path_template,
            converters,
            header_params: OrderMap::new(),
            cookie_params: OrderMap::new(),
            query_params: OrderMap::new(),
            path_params: OrderMap::new(),
            body: None,
            unique_id,
        }
    }

    /// Add another HTTP method. Routes bound to more than one method cannot
    /// be submitted as tasks.
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.methods.insert(method.into().to_ascii_uppercase());
        self
    }

    /// Remove all bound methods. Only useful for exercising the zero-method
    /// failure path from tests.
    pub fn clear_methods(mut self) -> Self {
        self.methods.clear();
        self
    }

    pub fn unique_id(mut self, id: impl Into<String>) -> Self {
        self.unique_id = id.into();
        self
    }

    /// Declare a path parameter recognized directly by the routing layer.
    pub fn path_param(mut self, name: impl Into<String>, spec: ParamSpec) -> Self {
        self.path_params.insert(name.into(), spec);
        self
    }

    /// Override the converter for a path placeholder.
    pub fn converter(mut self, name: impl Into<String>, conv: Arc<dyn PathConverter>) -> Self {
        self.converters.insert(name.into(), conv);
        self
    }

    pub fn query_param(mut self, name: impl Into<String>, spec: ParamSpec) -> Self {
        self.query_params.insert(name.into(), spec);
        self
    }

    pub fn header_param(mut self, name: impl Into<String>, spec: ParamSpec) -> Self {
        self.header_params.insert(name.into(), spec);
        self
    }

    pub fn cookie_param(mut self, name: impl Into<String>, spec: ParamSpec) -> Self {
        self.cookie_params.insert(name.into(), spec);
        self
    }

    pub fn body(mut self, spec: BodySpec) -> Self {
        self.body = Some(spec);
        self
    }

    pub fn methods(&self) -> &BTreeSet<String> {
        &self.methods
    }

    pub fn path_template(&self) -> &str {
        &self.path_template
    }

    pub fn converters(&self) -> &OrderMap<String, Arc<dyn PathConverter>> {
        &self.converters
    }

    pub fn header_params(&self) -> &OrderMap<String, ParamSpec> {
        &self.header_params
    }

    pub fn cookie_params(&self) -> &OrderMap<String, ParamSpec> {
        &self.cookie_params
    }

    pub fn query_params(&self) -> &OrderMap<String, ParamSpec> {
        &self.query_params
    }

    pub fn path_params(&self) -> &OrderMap<String, ParamSpec> {
        &self.path_params
    }

    pub fn body_spec(&self) -> Option<&BodySpec> {
        self.body.as_ref()
    }

    pub fn id(&self) -> &str {
        &self.unique_id
    }

    /// Resolve the single HTTP method this route dispatches with.
    ///
    /// Fails when the route is bound to zero or multiple methods, or to a
    /// method the task backends do not support.
    pub fn resolve_method(&self) -> Result<HttpMethod, BuildError> {
        if self.methods.len() > 1 {
            return Err(BuildError::BadMethod {
                details: "Can't submit task for a route with multiple methods".to_string(),
            });
        }
        let method = self.methods.iter().next().ok_or_else(|| BuildError::BadMethod {
            details: "Can't submit task for a route with no bound method".to_string(),
        })?;
        HttpMethod::parse(method).ok_or_else(|| BuildError::BadMethod {
            details: format!("Unknown method {}", method),
        })
    }
}

impl fmt::Debug for RouteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDescriptor")
            .field("methods", &self.methods)
            .field("path_template", &self.path_template)
            .field("unique_id", &self.unique_id)
            .finish()
    }
}

/// Call-time keyword arguments: an ordered mapping from parameter name to
/// runtime JSON value. Unknown names are ignored unless a route schema or
/// path placeholder references them.
#[derive(Clone, Debug, Default)]
pub struct CallArguments(OrderMap<String, Value>);

impl CallArguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chainable insert. Structs go through `serde_json::json!`:
    ///
    /// ```rust,ignore
    /// CallArguments::new().arg("user_id", "007").arg("data", json!(payload))
    /// ```
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Extract `{placeholder}` names from a path template, in order.
pub(crate) fn template_placeholders(template: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        let name = &rest[start + 1..start + end];
        if !name.is_empty() {
            names.push(name.to_string());
        }
        rest = &rest[start + end + 1..];
    }
    names
}

/// Default unique id: template with separators folded to underscores, e.g.
/// `/on_user_create/{user_id}` -> `on_user_create_user_id`.
fn derive_unique_id(template: &str) -> String {
    let folded: String = template
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    folded.trim_matches('_').replace("__", "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_single_method() {
        let route = RouteDescriptor::new("post", "/hello");
        assert_eq!(route.resolve_method().unwrap(), HttpMethod::Post);
    }

    #[test]
    fn test_resolve_method_rejects_multiple() {
        let route = RouteDescriptor::new("POST", "/hello").method("GET");
        let err = route.resolve_method().unwrap_err();
        assert!(err.to_string().contains("multiple methods"));
    }

    #[test]
    fn test_resolve_method_rejects_empty() {
        let route = RouteDescriptor::new("POST", "/hello").clear_methods();
        let err = route.resolve_method().unwrap_err();
        assert!(err.to_string().contains("no bound method"));
    }

    #[test]
    fn test_resolve_method_rejects_unknown() {
        let route = RouteDescriptor::new("TRACE", "/hello");
        let err = route.resolve_method().unwrap_err();
        assert!(err.to_string().contains("Unknown method TRACE"));
    }

    #[test]
    fn test_template_placeholders() {
        assert_eq!(
            template_placeholders("/users/{user_id}/posts/{post_id}"),
            vec!["user_id".to_string(), "post_id".to_string()]
        );
        assert!(template_placeholders("/plain/path").is_empty());
    }

    #[test]
    fn test_placeholders_get_default_converters() {
        let route = RouteDescriptor::new("POST", "/users/{user_id}");
        assert!(route.converters().contains_key("user_id"));
    }

    #[test]
    fn test_derived_unique_id() {
        let route = RouteDescriptor::new("POST", "/on_user_create/{user_id}");
        assert_eq!(route.id(), "on_user_create_user_id");
    }

    #[test]
    fn test_json_type_matching() {
        assert!(JsonType::Object.matches(&json!({"a": 1})));
        assert!(JsonType::String.matches(&json!("hi")));
        assert!(!JsonType::Object.matches(&json!("hi")));
        assert!(JsonType::Number.matches(&json!(4.2)));
        assert!(JsonType::Boolean.matches(&json!(true)));
        assert!(JsonType::Array.matches(&json!([1, 2])));
    }

    #[test]
    fn test_int_converter() {
        assert_eq!(IntConverter.convert(&json!(42)).unwrap(), "42");
        assert_eq!(IntConverter.convert(&json!("x")).unwrap_err(), "integer");
    }

    #[test]
    fn test_call_arguments_ordering() {
        let args = CallArguments::new().arg("b", 1).arg("a", 2);
        assert_eq!(args.get("b"), Some(&json!(1)));
        assert_eq!(args.get("a"), Some(&json!(2)));
        assert!(args.get("missing").is_none());
    }
}
