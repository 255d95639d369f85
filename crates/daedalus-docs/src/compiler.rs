//! The contract compiler.
//!
//! [`ContractCompiler::generate`] turns a caller-owned [`RouteRegistry`] into an
//! [`OpenApi`] document. It is a pure function of the registry and the
//! compiler's configuration: calling it twice yields identical output, and
//! paths and operations follow registration order.

use crate::error::{DocsError, DocsResult};
use crate::openapi::{
    Components, Info, MediaType, OpenApi, Operation, Parameter, ParameterIn, PathItem,
    RequestBody, Response, SchemaObject, SecurityRequirement, SecurityScheme, Server, Tag,
    OPENAPI_VERSION,
};
use crate::render::{flatten_parameters, render_schema};
use daedalus_core::{ErrorCode, RouteRegistry, RouteSpec};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Component name of the shared error envelope schema.
pub const ERROR_ENVELOPE_SCHEMA: &str = "ErrorEnvelope";

const APPLICATION_JSON: &str = "application/json";
const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// Document-level settings, copied verbatim into every document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DocumentConfig {
    /// API metadata.
    pub info: Info,
    /// Servers.
    pub servers: Vec<Server>,
}

impl DocumentConfig {
    /// A config with the given title and version.
    #[must_use]
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            info: Info {
                title: title.into(),
                version: version.into(),
                ..Info::default()
            },
            servers: Vec::new(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.info.description = Some(description.into());
        self
    }

    /// Adds a server.
    #[must_use]
    pub fn server(mut self, server: Server) -> Self {
        self.servers.push(server);
        self
    }
}

/// Compiles route registrations into an OpenAPI document.
///
/// # Example
///
/// ```
/// use daedalus_core::{RouteRegistry, RouteSpec, Schema};
/// use daedalus_docs::{ContractCompiler, DocumentConfig, SecurityScheme};
///
/// let mut registry = RouteRegistry::new();
/// registry.register(
///     RouteSpec::get("/users/{id}")
///         .path_params(Schema::object([("id", Schema::string())]))
///         .requires_auth(),
/// );
///
/// let mut compiler = ContractCompiler::new(DocumentConfig::new("Users", "1.0.0"));
/// compiler.add_security_scheme("bearerAuth", SecurityScheme::bearer_jwt());
///
/// let doc = compiler.generate(&registry).unwrap();
/// let op = doc.paths["/users/{id}"].operation(&http::Method::GET).unwrap();
/// assert_eq!(op.operation_id, "getUsersById");
/// assert!(op.parameters[0].required);
/// assert!(op.responses.contains_key("401"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ContractCompiler {
    config: DocumentConfig,
    security_schemes: IndexMap<String, SecurityScheme>,
}

impl ContractCompiler {
    /// Creates a compiler with no security schemes.
    #[must_use]
    pub fn new(config: DocumentConfig) -> Self {
        Self {
            config,
            security_schemes: IndexMap::new(),
        }
    }

    /// Registers a reusable security scheme.
    ///
    /// The first scheme added is the default for routes that require auth
    /// without naming one. Re-adding a name replaces its definition.
    pub fn add_security_scheme(
        &mut self,
        name: impl Into<String>,
        scheme: SecurityScheme,
    ) -> &mut Self {
        self.security_schemes.insert(name.into(), scheme);
        self
    }

    /// Builder form of [`add_security_scheme`](Self::add_security_scheme).
    #[must_use]
    pub fn with_security_scheme(mut self, name: impl Into<String>, scheme: SecurityScheme) -> Self {
        self.add_security_scheme(name, scheme);
        self
    }

    /// The document settings.
    #[must_use]
    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }

    /// Compiles every route in `registry`.
    ///
    /// # Errors
    ///
    /// Fails when a route references an unknown security scheme, requires
    /// auth with no scheme added, describes its form fields with a
    /// non-object schema, or uses a method OpenAPI cannot describe.
    pub fn generate(&self, registry: &RouteRegistry) -> DocsResult<OpenApi> {
        let mut paths: IndexMap<String, PathItem> = IndexMap::new();
        let mut tags: IndexSet<String> = IndexSet::new();

        for route in registry {
            let operation = self.operation(route)?;
            tags.extend(operation.tags.iter().cloned());

            if PathItem::method_key(&route.method).is_none() {
                return Err(DocsError::UnsupportedMethod {
                    route: route.key().to_string(),
                    method: route.method.to_string(),
                });
            }
            paths
                .entry(route.path.clone())
                .or_default()
                .insert(&route.method, operation);
        }

        let mut schemas = IndexMap::new();
        schemas.insert(ERROR_ENVELOPE_SCHEMA.to_string(), error_envelope_schema());

        tracing::debug!(
            routes = registry.len(),
            paths = paths.len(),
            "contract compiled"
        );

        Ok(OpenApi {
            openapi: OPENAPI_VERSION.to_string(),
            info: self.config.info.clone(),
            servers: self.config.servers.clone(),
            tags: tags.into_iter().map(|name| Tag { name }).collect(),
            paths,
            components: Components {
                schemas,
                security_schemes: self.security_schemes.clone(),
            },
        })
    }

    /// Compiles the registry and renders it as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// See [`generate`](Self::generate).
    pub fn generate_json(&self, registry: &RouteRegistry) -> DocsResult<String> {
        let document = self.generate(registry)?;
        serde_json::to_string_pretty(&document).map_err(DocsError::from)
    }

    fn operation(&self, route: &RouteSpec) -> DocsResult<Operation> {
        Ok(Operation {
            operation_id: route.operation_id(),
            summary: route.summary.clone(),
            description: route.description.clone(),
            tags: route.tags.clone(),
            parameters: parameters(route),
            request_body: request_body(route)?,
            responses: responses(route),
            security: self.security(route)?,
        })
    }

    fn security(&self, route: &RouteSpec) -> DocsResult<Vec<SecurityRequirement>> {
        if !route.requires_auth && route.required_roles.is_empty() {
            return Ok(Vec::new());
        }
        let name = match &route.security_scheme {
            Some(name) if self.security_schemes.contains_key(name) => name.clone(),
            Some(name) => {
                return Err(DocsError::UnknownSecurityScheme {
                    route: route.key().to_string(),
                    scheme: name.clone(),
                })
            }
            None => self
                .security_schemes
                .keys()
                .next()
                .cloned()
                .ok_or_else(|| DocsError::NoSecurityScheme {
                    route: route.key().to_string(),
                })?,
        };
        let mut requirement = SecurityRequirement::new();
        requirement.insert(name, Vec::new());
        Ok(vec![requirement])
    }
}

fn parameters(route: &RouteSpec) -> Vec<Parameter> {
    let mut parameters = route
        .path_params
        .as_deref()
        .map(|schema| flatten_parameters(schema, ParameterIn::Path))
        .unwrap_or_default();

    // Placeholders the path schema does not describe are still parameters.
    for name in route.placeholders() {
        let described = parameters
            .iter()
            .any(|p| p.location == ParameterIn::Path && p.name == name);
        if !described {
            parameters.push(Parameter {
                name,
                location: ParameterIn::Path,
                description: None,
                required: true,
                schema: SchemaObject::string(),
            });
        }
    }

    if let Some(query) = route.query.as_deref() {
        parameters.extend(flatten_parameters(query, ParameterIn::Query));
    }
    parameters
}

fn request_body(route: &RouteSpec) -> DocsResult<Option<RequestBody>> {
    if route.is_multipart() {
        return multipart_body(route).map(Some);
    }
    Ok(route.body.as_deref().map(|body| RequestBody {
        description: body.description().map(ToString::to_string),
        required: !body.is_optional(),
        content: json_content(render_schema(body)),
    }))
}

fn multipart_body(route: &RouteSpec) -> DocsResult<RequestBody> {
    let mut schema = match route.form_fields.as_deref() {
        Some(form) if form.as_object().is_some() => render_schema(form),
        Some(form) => {
            return Err(DocsError::FormFieldsNotObject {
                route: route.key().to_string(),
                kind: form.kind_name(),
            })
        }
        None => SchemaObject::object(),
    };

    for field in &route.file_fields {
        let binary = SchemaObject::formatted_string("binary");
        let mut file = if field.multiple {
            SchemaObject::array(binary)
        } else {
            binary
        };
        file.description.clone_from(&field.description);
        schema = schema.property(&field.name, file, field.required);
    }

    let mut content = IndexMap::new();
    content.insert(MULTIPART_FORM_DATA.to_string(), MediaType { schema: schema.clone() });
    Ok(RequestBody {
        description: None,
        required: !schema.required.is_empty(),
        content,
    })
}

fn responses(route: &RouteSpec) -> IndexMap<String, Response> {
    let mut responses: IndexMap<String, Response> = route
        .responses
        .iter()
        .map(|(status, spec)| {
            let content = spec
                .schema
                .as_deref()
                .map(|schema| json_content(render_schema(schema)))
                .unwrap_or_default();
            (
                status.to_string(),
                Response {
                    description: spec.description.clone(),
                    content,
                },
            )
        })
        .collect();

    if responses.is_empty() {
        responses.insert(
            "200".to_string(),
            Response {
                description: "Successful response".to_string(),
                content: IndexMap::new(),
            },
        );
    }

    for code in error_codes(route) {
        responses
            .entry(code.status().as_u16().to_string())
            .or_insert_with(|| Response {
                description: code.description().to_string(),
                content: json_content(SchemaObject::component(ERROR_ENVELOPE_SCHEMA)),
            });
    }
    responses
}

/// Error codes a route can produce, in status order.
fn error_codes(route: &RouteSpec) -> Vec<ErrorCode> {
    let parses_json = route.body.is_some() && !route.skip_body_parsing && !route.is_multipart();
    let authenticates = route.requires_auth || !route.required_roles.is_empty();
    let validates = [&route.body, &route.query, &route.path_params, &route.form_fields]
        .iter()
        .any(|schema| schema.is_some());

    let mut codes = Vec::new();
    if parses_json {
        codes.push(ErrorCode::BadRequest);
    }
    if authenticates {
        codes.push(ErrorCode::Unauthorized);
    }
    if !route.required_roles.is_empty() {
        codes.push(ErrorCode::Forbidden);
    }
    if validates {
        codes.push(ErrorCode::ValidationError);
    }
    codes.push(ErrorCode::InternalError);
    codes
}

fn json_content(schema: SchemaObject) -> IndexMap<String, MediaType> {
    let mut content = IndexMap::new();
    content.insert(APPLICATION_JSON.to_string(), MediaType { schema });
    content
}

fn error_envelope_schema() -> SchemaObject {
    let code = SchemaObject {
        enum_values: ErrorCode::ALL
            .iter()
            .map(|code| Value::from(code.as_str()))
            .collect(),
        ..SchemaObject::string()
    };
    let detail = SchemaObject::object()
        .property("code", code, true)
        .property("message", SchemaObject::string(), true)
        .property(
            "details",
            SchemaObject::default()
                .with_description("Structured details. Validation errors list each violation."),
            false,
        );
    SchemaObject::object()
        .property("error", detail, true)
        .property("correlationId", SchemaObject::string(), true)
        .with_description("Envelope of every error response")
}

#[cfg(test)]
mod tests {
    use super::*;
    use daedalus_core::{FileField, ResponseSpec, Schema};

    fn compiler() -> ContractCompiler {
        ContractCompiler::new(DocumentConfig::new("Test", "1.0.0"))
            .with_security_scheme("bearerAuth", SecurityScheme::bearer_jwt())
    }

    #[test]
    fn test_error_codes_follow_route_shape() {
        let public = RouteSpec::get("/health");
        assert_eq!(error_codes(&public), vec![ErrorCode::InternalError]);

        let admin = RouteSpec::post("/users")
            .body(Schema::object([("name", Schema::string())]))
            .roles(["admin"]);
        assert_eq!(
            error_codes(&admin),
            vec![
                ErrorCode::BadRequest,
                ErrorCode::Unauthorized,
                ErrorCode::Forbidden,
                ErrorCode::ValidationError,
                ErrorCode::InternalError,
            ]
        );
    }

    #[test]
    fn test_declared_responses_win() {
        let route = RouteSpec::get("/items")
            .response(200, ResponseSpec::new("Items"))
            .response(500, ResponseSpec::new("Storage down"));
        let responses = responses(&route);
        let keys: Vec<_> = responses.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["200", "500"]);
        assert_eq!(responses["500"].description, "Storage down");
    }

    #[test]
    fn test_multiple_files_are_binary_arrays() {
        let route = RouteSpec::post("/albums/{id}/photos")
            .file_field(FileField::optional("photos").multiple());
        let body = request_body(&route).unwrap().unwrap();
        let schema = &body.content[MULTIPART_FORM_DATA].schema;
        let photos = &schema.properties["photos"];
        assert_eq!(photos.items.as_ref().unwrap().format.as_deref(), Some("binary"));
        assert!(!body.required);
    }

    #[test]
    fn test_form_fields_must_be_an_object() {
        let route = RouteSpec::post("/uploads")
            .form_fields(Schema::array(Schema::string()))
            .file_field(FileField::required("file"));
        let err = request_body(&route).unwrap_err();
        assert!(matches!(
            err,
            DocsError::FormFieldsNotObject { ref route, kind } if route == "POST /uploads" && kind == "array"
        ));
    }

    #[test]
    fn test_unknown_scheme_is_an_error() {
        let mut registry = RouteRegistry::new();
        registry.register(RouteSpec::get("/me").security_scheme("apiKey"));
        let err = compiler().generate(&registry).unwrap_err();
        assert!(matches!(err, DocsError::UnknownSecurityScheme { ref scheme, .. } if scheme == "apiKey"));
    }

    #[test]
    fn test_auth_without_schemes_is_an_error() {
        let mut registry = RouteRegistry::new();
        registry.register(RouteSpec::get("/me").requires_auth());
        let err = ContractCompiler::default().generate(&registry).unwrap_err();
        assert!(matches!(err, DocsError::NoSecurityScheme { .. }));
    }

    #[test]
    fn test_unsupported_method() {
        let mut registry = RouteRegistry::new();
        registry.register(RouteSpec::new(http::Method::CONNECT, "/tunnel"));
        let err = compiler().generate(&registry).unwrap_err();
        assert!(matches!(err, DocsError::UnsupportedMethod { .. }));
    }
}
