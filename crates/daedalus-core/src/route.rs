//! Route registrations.
//!
//! A [`RouteSpec`] binds a method and path template to the schemas, access
//! requirements and documentation metadata of one endpoint. The same
//! registration drives runtime validation in the pipeline and static
//! documentation in the contract compiler.
//!
//! Routes are collected in a caller-owned [`RouteRegistry`].
//!
//! # Example
//!
//! ```
//! use daedalus_core::route::{ResponseSpec, RouteRegistry, RouteSpec};
//! use daedalus_core::schema::Schema;
//! use daedalus_core::Role;
//!
//! let mut registry = RouteRegistry::new();
//! registry.register(
//!     RouteSpec::get("/users/{id}")
//!         .tag("users")
//!         .path_params(Schema::object([("id", Schema::string())]))
//!         .roles([Role::admin()])
//!         .response(200, ResponseSpec::new("The user")),
//! );
//!
//! let route = registry.iter().next().unwrap();
//! assert_eq!(route.operation_id(), "getUsersById");
//! assert!(route.requires_auth);
//! ```

use crate::identity::Role;
use crate::schema::Schema;
use http::Method;
use indexmap::{IndexMap, IndexSet};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// A file upload field of a multipart route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileField {
    /// Form field name.
    pub name: String,
    /// Whether a file must be supplied.
    pub required: bool,
    /// Whether several files may be supplied.
    pub multiple: bool,
    /// Human description.
    pub description: Option<String>,
}

impl FileField {
    /// A required single-file field.
    #[must_use]
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
            multiple: false,
            description: None,
        }
    }

    /// An optional single-file field.
    #[must_use]
    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::required(name)
        }
    }

    /// Accepts several files.
    #[must_use]
    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }
}

/// A documented response of a route.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSpec {
    /// Human description.
    pub description: String,
    /// Body shape, if any.
    pub schema: Option<Arc<Schema>>,
}

impl ResponseSpec {
    /// A response without a body schema.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            schema: None,
        }
    }

    /// Sets the body schema.
    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<Arc<Schema>>) -> Self {
        self.schema = Some(schema.into());
        self
    }
}

/// The registration of a single endpoint.
#[derive(Debug, Clone)]
pub struct RouteSpec {
    /// HTTP method.
    pub method: Method,
    /// Path template with `{name}` placeholders.
    pub path: String,
    /// Explicit operation id. Derived from method and path when unset.
    pub operation_id: Option<String>,
    /// One-line summary.
    pub summary: Option<String>,
    /// Longer description.
    pub description: Option<String>,
    /// Grouping tags.
    pub tags: Vec<String>,
    /// JSON body shape.
    pub body: Option<Arc<Schema>>,
    /// Query string shape.
    pub query: Option<Arc<Schema>>,
    /// Path capture shape.
    pub path_params: Option<Arc<Schema>>,
    /// Non-file fields of a multipart body.
    pub form_fields: Option<Arc<Schema>>,
    /// File fields of a multipart body.
    pub file_fields: Vec<FileField>,
    /// Documented responses by status code.
    pub responses: IndexMap<u16, ResponseSpec>,
    /// Whether a bearer token is required.
    pub requires_auth: bool,
    /// Roles allowed to call the route. Empty means any authenticated caller.
    pub required_roles: IndexSet<Role>,
    /// Security scheme to reference in documentation, overriding the default.
    pub security_scheme: Option<String>,
    /// Whether the pipeline should leave the body unparsed.
    pub skip_body_parsing: bool,
}

impl RouteSpec {
    /// Creates a registration for `method` and `path`.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            operation_id: None,
            summary: None,
            description: None,
            tags: Vec::new(),
            body: None,
            query: None,
            path_params: None,
            form_fields: None,
            file_fields: Vec::new(),
            responses: IndexMap::new(),
            requires_auth: false,
            required_roles: IndexSet::new(),
            security_scheme: None,
            skip_body_parsing: false,
        }
    }

    /// A `GET` route.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// A `POST` route.
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// A `PUT` route.
    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// A `PATCH` route.
    #[must_use]
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    /// A `DELETE` route.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Sets the operation id.
    #[must_use]
    pub fn with_operation_id(mut self, id: impl Into<String>) -> Self {
        self.operation_id = Some(id.into());
        self
    }

    /// Sets the summary.
    #[must_use]
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    /// Sets the JSON body schema.
    #[must_use]
    pub fn body(mut self, schema: impl Into<Arc<Schema>>) -> Self {
        self.body = Some(schema.into());
        self
    }

    /// Sets the query string schema.
    #[must_use]
    pub fn query(mut self, schema: impl Into<Arc<Schema>>) -> Self {
        self.query = Some(schema.into());
        self
    }

    /// Sets the path capture schema.
    #[must_use]
    pub fn path_params(mut self, schema: impl Into<Arc<Schema>>) -> Self {
        self.path_params = Some(schema.into());
        self
    }

    /// Sets the schema of non-file multipart fields.
    #[must_use]
    pub fn form_fields(mut self, schema: impl Into<Arc<Schema>>) -> Self {
        self.form_fields = Some(schema.into());
        self
    }

    /// Adds a file upload field.
    #[must_use]
    pub fn file_field(mut self, field: FileField) -> Self {
        self.file_fields.push(field);
        self
    }

    /// Documents a response.
    #[must_use]
    pub fn response(mut self, status: u16, response: ResponseSpec) -> Self {
        self.responses.insert(status, response);
        self
    }

    /// Requires a bearer token.
    #[must_use]
    pub fn requires_auth(mut self) -> Self {
        self.requires_auth = true;
        self
    }

    /// Restricts the route to the given roles. Implies [`RouteSpec::requires_auth`].
    #[must_use]
    pub fn roles<I, R>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Role>,
    {
        self.required_roles.extend(roles.into_iter().map(Into::into));
        self.requires_auth = true;
        self
    }

    /// References a named security scheme instead of the document default.
    #[must_use]
    pub fn security_scheme(mut self, name: impl Into<String>) -> Self {
        self.security_scheme = Some(name.into());
        self.requires_auth = true;
        self
    }

    /// Leaves the request body unparsed.
    #[must_use]
    pub fn skip_body_parsing(mut self) -> Self {
        self.skip_body_parsing = true;
        self
    }

    /// Returns the registry key.
    #[must_use]
    pub fn key(&self) -> RouteKey {
        RouteKey {
            method: self.method.clone(),
            path: self.path.clone(),
        }
    }

    /// The explicit operation id, or one derived from method and path.
    #[must_use]
    pub fn operation_id(&self) -> String {
        self.operation_id
            .clone()
            .unwrap_or_else(|| derive_operation_id(&self.method, &self.path))
    }

    /// Placeholder names in the path template, in order.
    #[must_use]
    pub fn placeholders(&self) -> Vec<String> {
        path_placeholders(&self.path)
    }

    /// Returns `true` when the route accepts a multipart upload.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        !self.file_fields.is_empty()
    }
}

/// Identifies a route within a registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    /// HTTP method.
    pub method: Method,
    /// Path template.
    pub path: String,
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Ordered collection of route registrations.
///
/// Routes keep the position of their first registration. Registering the same
/// method and path again replaces the earlier registration; the collision is
/// logged and recorded in [`RouteRegistry::duplicates`].
#[derive(Debug, Clone, Default)]
pub struct RouteRegistry {
    routes: IndexMap<RouteKey, Arc<RouteSpec>>,
    duplicates: Vec<RouteKey>,
}

impl RouteRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a route, returning the registration it replaced.
    pub fn register(&mut self, route: impl Into<Arc<RouteSpec>>) -> Option<Arc<RouteSpec>> {
        let route = route.into();
        let key = route.key();
        let previous = self.routes.insert(key.clone(), route);
        if previous.is_some() {
            tracing::warn!(
                route = %key,
                "duplicate route registration; the later registration replaces the earlier one"
            );
            self.duplicates.push(key);
        }
        previous
    }

    /// Looks up a route.
    #[must_use]
    pub fn get(&self, method: &Method, path: &str) -> Option<&Arc<RouteSpec>> {
        self.routes.get(&RouteKey {
            method: method.clone(),
            path: path.to_string(),
        })
    }

    /// Iterates routes in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<RouteSpec>> {
        self.routes.values()
    }

    /// Number of distinct routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if no route is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Every key that was registered more than once, once per collision.
    #[must_use]
    pub fn duplicates(&self) -> &[RouteKey] {
        &self.duplicates
    }
}

impl<'a> IntoIterator for &'a RouteRegistry {
    type Item = &'a Arc<RouteSpec>;
    type IntoIter = indexmap::map::Values<'a, RouteKey, Arc<RouteSpec>>;

    fn into_iter(self) -> Self::IntoIter {
        self.routes.values()
    }
}

/// Extracts `{name}` placeholders from a path template.
#[must_use]
pub fn path_placeholders(path: &str) -> Vec<String> {
    static PLACEHOLDER: OnceLock<regex::Regex> = OnceLock::new();
    let regex =
        PLACEHOLDER.get_or_init(|| regex::Regex::new(r"\{([^}]+)\}").expect("valid regex"));
    regex
        .captures_iter(path)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Derives a camelCase operation id: `GET /users/{id}` becomes `getUsersById`.
#[must_use]
pub fn derive_operation_id(method: &Method, path: &str) -> String {
    let mut id = method.as_str().to_lowercase();
    let mut words = 0;
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if let Some(name) = segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            id.push_str("By");
            push_words(&mut id, name);
        } else {
            push_words(&mut id, segment);
        }
        words += 1;
    }
    if words == 0 {
        id.push_str("Root");
    }
    id
}

fn push_words(out: &mut String, segment: &str) {
    for word in segment
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            out.push_str(chars.as_str());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_id_derivation() {
        assert_eq!(derive_operation_id(&Method::GET, "/users/{id}"), "getUsersById");
        assert_eq!(
            derive_operation_id(&Method::POST, "/api/v1/user-profiles"),
            "postApiV1UserProfiles"
        );
        assert_eq!(
            derive_operation_id(&Method::DELETE, "/users/{user_id}/posts/{postId}"),
            "deleteUsersByUserIdPostsByPostId"
        );
        assert_eq!(derive_operation_id(&Method::GET, "/"), "getRoot");
    }

    #[test]
    fn test_explicit_operation_id_wins() {
        let route = RouteSpec::get("/users").with_operation_id("listUsers");
        assert_eq!(route.operation_id(), "listUsers");
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(
            path_placeholders("/orgs/{org}/members/{id}"),
            vec!["org".to_string(), "id".to_string()]
        );
        assert!(path_placeholders("/health").is_empty());
    }

    #[test]
    fn test_roles_imply_auth() {
        let route = RouteSpec::get("/admin").roles(["ADMIN", "admin"]);
        assert!(route.requires_auth);
        assert_eq!(route.required_roles.len(), 1);
    }

    #[test]
    fn test_tags_deduplicated() {
        let route = RouteSpec::get("/x").tag("a").tag("b").tag("a");
        assert_eq!(route.tags, vec!["a", "b"]);
    }

    #[test]
    fn test_registry_last_write_wins_keeps_position() {
        let mut registry = RouteRegistry::new();
        registry.register(RouteSpec::get("/a").summary("first"));
        registry.register(RouteSpec::get("/b"));
        let previous = registry.register(RouteSpec::get("/a").summary("second"));

        assert_eq!(previous.unwrap().summary.as_deref(), Some("first"));
        assert_eq!(registry.len(), 2);
        let order: Vec<_> = registry.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(order, vec!["/a", "/b"]);
        assert_eq!(
            registry.get(&Method::GET, "/a").unwrap().summary.as_deref(),
            Some("second")
        );
        assert_eq!(registry.duplicates().len(), 1);
        assert_eq!(registry.duplicates()[0].to_string(), "GET /a");
    }

    #[test]
    fn test_same_path_different_methods_are_distinct() {
        let mut registry = RouteRegistry::new();
        registry.register(RouteSpec::get("/a"));
        registry.register(RouteSpec::post("/a"));
        assert_eq!(registry.len(), 2);
        assert!(registry.duplicates().is_empty());
    }

    #[test]
    fn test_file_fields() {
        let route = RouteSpec::post("/upload")
            .file_field(FileField::required("file"))
            .file_field(FileField::optional("attachments").multiple());
        assert!(route.is_multipart());
        assert!(route.file_fields[0].required);
        assert!(route.file_fields[1].multiple && !route.file_fields[1].required);
    }
}
