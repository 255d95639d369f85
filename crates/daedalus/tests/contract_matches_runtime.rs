//! The pipeline and the published document are built from one registry;
//! what the document declares is what the pipeline enforces.

use bytes::Bytes;
use daedalus::prelude::*;
use http::{Method, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};

const SECRET: &str = "shared-secret";

fn registry() -> RouteRegistry {
    let mut registry = RouteRegistry::new();
    registry.register(
        RouteSpec::post("/projects")
            .tag("projects")
            .roles(["owner"])
            .body(Schema::object([
                ("name", Schema::string().min(3.0)),
                ("visibility", Schema::enumeration(["public", "private"])),
                ("description", Schema::string().optional()),
            ]))
            .response(201, ResponseSpec::new("Project created")),
    );
    registry.register(RouteSpec::get("/health").tag("ops"));
    registry
}

fn config() -> DaedalusConfig {
    let mut config = DaedalusConfig::development();
    config.auth.secret = Some(SECRET.to_string());
    config.logging.enabled = false;
    config
}

async fn created(ctx: HandlerContext) -> ApiResult<HandlerResponse> {
    Ok(HandlerResponse::created(ctx.body().cloned().unwrap_or_default()))
}

fn pipeline(registry: &RouteRegistry, method: &Method, path: &str) -> Pipeline {
    let config = config();
    let route = registry.get(method, path).unwrap().clone();
    Pipeline::builder(route)
        .jwt(config.jwt_config().unwrap())
        .options(config.pipeline_options().unwrap())
        .build(created)
        .unwrap()
}

fn token(role: &str) -> String {
    TokenIssuer::new(config().jwt_config().unwrap())
        .issue(&TokenClaims::new("u-1", role, chrono::Duration::minutes(5)))
        .unwrap()
}

fn post_projects(auth: Option<String>, body: &'static [u8]) -> Request {
    let mut builder = http::Request::builder().method(Method::POST).uri("/projects");
    if let Some(token) = auth {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Bytes::from_static(body)).unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_required_fields_match_validation() {
    let registry = registry();
    let doc = ContractCompiler::new(config().document_config())
        .with_security_scheme("bearerAuth", SecurityScheme::bearer_jwt())
        .generate(&registry)
        .unwrap();
    let op = doc.paths["/projects"].operation(&Method::POST).unwrap();
    let schema = &op.request_body.as_ref().unwrap().content["application/json"].schema;
    assert_eq!(schema.required, vec!["name", "visibility"]);

    let response = pipeline(&registry, &Method::POST, "/projects")
        .handle(
            http::Request::builder()
                .method(Method::POST)
                .uri("/projects")
                .header("authorization", format!("Bearer {}", token("owner")))
                .body(Bytes::from_static(b"{}"))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_json(response).await;
    let reported: Vec<_> = body["error"]["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["path"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(reported, schema.required);
}

#[tokio::test]
async fn test_documented_status_codes_are_produced() {
    let registry = registry();
    let doc = ContractCompiler::new(config().document_config())
        .with_security_scheme("bearerAuth", SecurityScheme::bearer_jwt())
        .generate(&registry)
        .unwrap();
    let documented = &doc.paths["/projects"].operation(&Method::POST).unwrap().responses;
    let pipeline = pipeline(&registry, &Method::POST, "/projects");

    let cases = [
        (post_projects(Some(token("owner")), b"{\"name\":"), StatusCode::BAD_REQUEST),
        (post_projects(None, b"{}"), StatusCode::UNAUTHORIZED),
        (post_projects(Some(token("viewer")), b"{}"), StatusCode::FORBIDDEN),
        (post_projects(Some(token("owner")), b"{}"), StatusCode::UNPROCESSABLE_ENTITY),
        (
            post_projects(
                Some(token("owner")),
                br#"{"name":"atlas","visibility":"private"}"#,
            ),
            StatusCode::CREATED,
        ),
    ];
    for (request, expected) in cases {
        let response = pipeline.handle(request).await;
        assert_eq!(response.status(), expected);
        assert!(
            documented.contains_key(&expected.as_u16().to_string()),
            "{expected} is not documented"
        );
        if !expected.is_success() {
            assert!(body_json(response).await["correlationId"].is_string());
        }
    }
}

#[tokio::test]
async fn test_public_route_needs_no_token() {
    let registry = registry();
    let route = registry.get(&Method::GET, "/health").unwrap().clone();
    let pipeline = Pipeline::builder(route)
        .build(|_ctx: HandlerContext| async {
            Ok::<_, ApiError>(HandlerResponse::ok(json!({ "status": "up" })))
        })
        .unwrap();

    let response = pipeline
        .handle(
            http::Request::builder()
                .uri("/health")
                .body(Bytes::new())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "status": "up" }));
}
