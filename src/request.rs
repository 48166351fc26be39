//! Request reconstruction engine.
//!
//! Rebuilds the HTTP request a registered route would have received, from the
//! route descriptor and a set of call-time arguments: method, absolute URL
//! with path/query substitution, headers and a JSON body. Building is pure
//! and never touches the network; every failure here aborts the submission
//! before any backend call.

use ordermap::OrderMap;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

use crate::backend::types::HttpMethod;
use crate::constants::is_reserved_header;
use crate::errors::BuildError;
use crate::route::{CallArguments, ParamSpec, RouteDescriptor};

/// A fully reconstructed outbound request. Derived fresh per call, never
/// cached.
#[derive(Clone, Debug)]
pub struct BuiltRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: OrderMap<String, String>,
    pub body: Option<Vec<u8>>,
}

/// Builds [`BuiltRequest`]s for one route against one base URL.
#[derive(Clone)]
pub struct Requester {
    route: Arc<RouteDescriptor>,
    base_url: String,
}

impl Requester {
    pub fn new(route: Arc<RouteDescriptor>, base_url: &str) -> Self {
        Self {
            route,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn route(&self) -> &Arc<RouteDescriptor> {
        &self.route
    }

    /// Reconstruct the request for the given call arguments.
    pub fn build(&self, args: &CallArguments) -> Result<BuiltRequest, BuildError> {
        Ok(BuiltRequest {
            method: self.route.resolve_method()?,
            url: self.url(args)?,
            headers: self.headers(args)?,
            body: self.body(args)?,
        })
    }

    /// Render the absolute URL: substitute path placeholders, join onto the
    /// base URL and merge query strings (base query preserved, call-supplied
    /// params win on key collision).
    fn url(&self, args: &CallArguments) -> Result<String, BuildError> {
        let route = &self.route;

        // Declared path params first, then converters fill any placeholder
        // the schema did not cover.
        let mut path_values: OrderMap<String, String> = OrderMap::new();
        for (name, value) in resolve_params(route.path_params(), args)? {
            path_values.insert(name, value_to_string(&value));
        }
        for (name, converter) in route.converters() {
            if path_values.contains_key(name) {
                continue;
            }
            let value = args
                .get(name)
                .ok_or_else(|| BuildError::MissingParameter { name: name.clone() })?;
            let rendered = converter
                .convert(value)
                .map_err(|expected| BuildError::WrongType {
                    name: name.clone(),
                    expected,
                })?;
            path_values.insert(name.clone(), rendered);
        }

        let path = render_template(route.path_template(), &path_values)?;

        let mut url = Url::parse(&self.base_url).map_err(|e| BuildError::InvalidBaseUrl {
            url: self.base_url.clone(),
            details: e.to_string(),
        })?;

        // Merge query params: keep whatever the base URL already carries,
        // overwrite key-by-key with resolved route params.
        let mut query: OrderMap<String, String> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        for (name, value) in resolve_params(route.query_params(), args)? {
            query.insert(name, value_to_string(&value));
        }

        let joined = format!(
            "{}/{}",
            url.path().trim_end_matches('/'),
            path.trim_matches('/')
        );
        url.set_path(&joined);

        if query.is_empty() {
            url.set_query(None);
        } else {
            let encoded = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(query.iter())
                .finish();
            url.set_query(Some(&encoded));
        }

        Ok(url.to_string())
    }

    /// Resolve headers and cookies. Cookies fold into a single `Cookie`
    /// header; `Content-Type` is forced to JSON; reserved queue headers are
    /// stripped no matter what the caller supplied.
    fn headers(&self, args: &CallArguments) -> Result<OrderMap<String, String>, BuildError> {
        let mut headers: OrderMap<String, String> = OrderMap::new();
        for (name, value) in resolve_params(self.route.header_params(), args)? {
            headers.insert(name, value_to_string(&value));
        }

        let cookies = resolve_params(self.route.cookie_params(), args)?;
        if !cookies.is_empty() {
            let rendered = cookies
                .iter()
                .map(|(k, v)| format!("{}={}", k, value_to_string(v)))
                .collect::<Vec<_>>()
                .join("; ");
            headers.insert("Cookie".to_string(), rendered);
        }

        // We speak JSON only.
        headers.insert("Content-Type".to_string(), "application/json".to_string());

        headers.retain(|name, _| !is_reserved_header(name));
        Ok(headers)
    }

    /// Resolve and serialize the body, if the route declares one.
    fn body(&self, args: &CallArguments) -> Result<Option<Vec<u8>>, BuildError> {
        let Some(spec) = self.route.body_spec() else {
            return Ok(None);
        };

        let value = match args.get(&spec.name) {
            Some(v) => v.clone(),
            None => {
                if spec.required {
                    return Err(BuildError::MissingParameter {
                        name: spec.name.clone(),
                    });
                }
                match &spec.default {
                    Some(d) => d.clone(),
                    None => return Ok(None),
                }
            }
        };

        if !spec.expected.matches(&value) {
            return Err(BuildError::WrongType {
                name: spec.name.clone(),
                expected: spec.expected.to_string(),
            });
        }

        let bytes = serde_json::to_vec(&value).map_err(|e| BuildError::WrongType {
            name: spec.name.clone(),
            expected: format!("serializable value ({})", e),
        })?;
        Ok(Some(bytes))
    }
}

/// Resolve declared parameters against call arguments: present values win,
/// then defaults, missing optional params are dropped and missing required
/// ones fail.
fn resolve_params(
    schema: &OrderMap<String, ParamSpec>,
    args: &CallArguments,
) -> Result<OrderMap<String, Value>, BuildError> {
    let mut resolved = OrderMap::new();
    for (name, spec) in schema {
        if let Some(value) = args.get(name) {
            resolved.insert(name.clone(), value.clone());
        } else if let Some(default) = &spec.default {
            resolved.insert(name.clone(), default.clone());
        } else if spec.required {
            return Err(BuildError::MissingParameter { name: name.clone() });
        }
    }
    Ok(resolved)
}

/// Substitute every `{placeholder}` in the template.
fn render_template(
    template: &str,
    values: &OrderMap<String, String>,
) -> Result<String, BuildError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let Some(end) = rest[start..].find('}') else {
            out.push_str(rest);
            rest = "";
            break;
        };
        out.push_str(&rest[..start]);
        let name = &rest[start + 1..start + end];
        let value = values
            .get(name)
            .ok_or_else(|| BuildError::MissingParameter {
                name: name.to_string(),
            })?;
        out.push_str(value);
        rest = &rest[start + end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Coerce a JSON value into the string form used for path, query and header
/// values. Strings pass through unquoted; everything else renders as JSON.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
