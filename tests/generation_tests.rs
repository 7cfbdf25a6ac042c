//! End-to-end generation tests
//!
//! Drives the full pipeline over the JSON source units under
//! `tests/fixtures/project`.

use std::path::{Path, PathBuf};

use apigen::config::{ClientConfig, FormatConfig, Framework, OpenApiConfig};
use apigen::diagnostics::DiagnosticCode;
use apigen::pipeline::{generate, run_batch, run_task};
use apigen::writer::WriteStatus;
use apigen::{EmitterConfig, GenError, OutputMode, SourceUnit, TaskConfig};
use apigen::{JsonSourceReader, Result, SourceReader};
use serde_json::{json, Value};

fn fixtures_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn project_root() -> PathBuf {
    fixtures_path().join("project")
}

fn task(name: &str, emitter: EmitterConfig) -> TaskConfig {
    TaskConfig {
        name: name.to_string(),
        framework: Framework::Nest,
        controllers: vec!["**/*.controller.json".to_string()],
        types: vec!["**/*.dto.json".to_string()],
        emitter,
    }
}

fn client_config(output: PathBuf) -> ClientConfig {
    ClientConfig {
        output,
        types_output: None,
        request_module: None,
        overrides_param: None,
        header: None,
        format: FormatConfig::default(),
    }
}

fn openapi_config(output: PathBuf) -> OpenApiConfig {
    OpenApiConfig {
        output,
        title: "Users API".to_string(),
        version: "1.0.0".to_string(),
        description: Some("Fixture project".to_string()),
        stdout: false,
    }
}

fn client_text() -> String {
    let task = task("client", EmitterConfig::Client(client_config(PathBuf::from("api.ts"))));
    let (_, artifacts) = generate(&task, &project_root(), &JsonSourceReader::new()).unwrap();
    assert_eq!(artifacts.len(), 1);
    artifacts[0].contents.clone()
}

fn openapi_document() -> (Value, apigen::Diagnostics) {
    let task = task("docs", EmitterConfig::OpenApi(openapi_config(PathBuf::from("openapi.json"))));
    let (surface, artifacts) = generate(&task, &project_root(), &JsonSourceReader::new()).unwrap();
    (serde_json::from_str(&artifacts[0].contents).unwrap(), surface.diagnostics)
}

// =============================================================================
// Client Stubs
// =============================================================================

#[test]
fn test_client_path_parameter_function() {
    let text = client_text();

    assert!(text.starts_with("import axios from \"axios\";\n\n"));
    assert!(text.contains("export namespace USERS {"));
    assert!(text.contains("  /** Fetch a single user */\n  export function findOne(id: number): Promise<User> {"));
    assert!(text.contains("      method: \"get\",\n      url: `/users/${id}`,\n"));
    assert!(!text.contains("toEntity"));
}

#[test]
fn test_client_partial_query_merge() {
    let text = client_text();

    assert!(text.contains("export function search(n: string, i?: number): Promise<User[]> {"));
    assert!(text.contains("url: \"/users/search/by-name\","));
    assert!(text.contains("params: { name: n, id: i },"));
}

#[test]
fn test_client_whole_bindings_by_reference() {
    let text = client_text();

    assert!(text.contains("export function create(dto: CreateUserDto): Promise<User> {"));
    assert!(text.contains("data: dto,"));
    assert!(text.contains("export function list(filter: UserFilter): Promise<Page<User>> {"));
    assert!(text.contains("params: filter,"));
}

#[test]
fn test_client_emits_referenced_types_once() {
    let text = client_text();

    assert_eq!(text.matches("export interface User extends Entity {").count(), 1);
    assert!(text.contains("export interface Entity {"));
    assert!(text.contains("export enum Role {\n  Admin = \"admin\",\n  Member = \"member\",\n}"));
    assert!(text.contains("export interface Page<T> {"));
    assert!(text.contains("  /** Contact address */\n  email?: string;"));
    assert!(!text.contains("InternalCache"));
}

// =============================================================================
// Schema Document
// =============================================================================

#[test]
fn test_document_path_parameter_and_response() {
    let (doc, _) = openapi_document();
    let get = &doc["paths"]["/users/{id}"]["get"];

    assert_eq!(get["operationId"], "findOne");
    assert_eq!(get["summary"], "Fetch a single user");
    assert_eq!(get["tags"], json!(["users"]));
    assert_eq!(
        get["parameters"],
        json!([{"name": "id", "in": "path", "required": true, "schema": {"type": "number"}}])
    );
    assert_eq!(
        get["responses"]["200"]["content"]["application/json"]["schema"],
        json!({"$ref": "#/components/schemas/User"})
    );
}

#[test]
fn test_document_whole_body_is_reference() {
    let (doc, _) = openapi_document();
    let body = &doc["paths"]["/users"]["post"]["requestBody"];

    assert_eq!(body["required"], true);
    assert_eq!(
        body["content"]["application/json"]["schema"],
        json!({"$ref": "#/components/schemas/CreateUserDto"})
    );
}

#[test]
fn test_document_query_parameters() {
    let (doc, _) = openapi_document();

    let search = &doc["paths"]["/users/search/by-name"]["get"]["parameters"];
    assert_eq!(
        search,
        &json!([
            {"name": "name", "in": "query", "required": true, "schema": {"type": "string"}},
            {"name": "id", "in": "query", "required": false, "schema": {"type": "number"}}
        ])
    );

    let list = &doc["paths"]["/users"]["get"]["parameters"];
    let names: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["name", "limit", "offset"]);
}

#[test]
fn test_document_components() {
    let (doc, diags) = openapi_document();
    let schemas = &doc["components"]["schemas"];

    assert_eq!(
        schemas["User"],
        json!({
            "allOf": [
                {"$ref": "#/components/schemas/Entity"},
                {
                    "type": "object",
                    "description": "A registered user",
                    "properties": {
                        "name": {"type": "string"},
                        "email": {"type": "string", "description": "Contact address"},
                        "role": {"$ref": "#/components/schemas/Role"}
                    },
                    "required": ["name", "role"]
                }
            ]
        })
    );
    assert_eq!(schemas["Role"], json!({"type": "string", "enum": ["admin", "member"]}));
    assert!(schemas.get("InternalCache").is_none());

    assert_eq!(doc["tags"], json!([{"name": "users", "description": "User management"}]));
    assert_eq!(doc["info"]["description"], "Fixture project");

    // Page<User> in a response degrades to an untyped object
    assert_eq!(
        doc["paths"]["/users"]["get"]["responses"]["200"]["content"]["application/json"]["schema"],
        json!({"type": "object"})
    );
    assert_eq!(diags.with_code(DiagnosticCode::GenericArguments).count(), 1);
    assert_eq!(diags.with_code(DiagnosticCode::TypeParameter).count(), 1);
}

// =============================================================================
// Pipeline
// =============================================================================

#[test]
fn test_run_task_writes_then_reports_unchanged() {
    let out = tempfile::tempdir().unwrap();
    let mut config = client_config(out.path().join("client/api.ts"));
    config.types_output = Some(out.path().join("client/types.ts"));
    let task = task("client", EmitterConfig::Client(config));
    let reader = JsonSourceReader::new();

    let report = run_task(&task, &project_root(), &reader, OutputMode::Write).unwrap();
    assert_eq!(report.controllers, 1);
    assert_eq!(report.requests, 4);
    assert_eq!(report.declarations, 7);
    assert!(report.outcomes.iter().all(|o| o.status == WriteStatus::Created));

    let api = std::fs::read_to_string(out.path().join("client/api.ts")).unwrap();
    assert!(api.contains("import { User, CreateUserDto, UserFilter, Page } from \"./types\";"));
    let types = std::fs::read_to_string(out.path().join("client/types.ts")).unwrap();
    assert!(types.contains("export interface Paging {"));

    let report = run_task(&task, &project_root(), &reader, OutputMode::Check).unwrap();
    assert!(!report.has_drift());
}

#[test]
fn test_check_mode_detects_drift() {
    let out = tempfile::tempdir().unwrap();
    let output = out.path().join("openapi.json");
    let task = task("docs", EmitterConfig::OpenApi(openapi_config(output.clone())));
    let reader = JsonSourceReader::new();

    run_task(&task, &project_root(), &reader, OutputMode::Write).unwrap();
    std::fs::write(&output, "{}\n").unwrap();

    let report = run_task(&task, &project_root(), &reader, OutputMode::Check).unwrap();
    assert!(report.has_drift());
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "{}\n");
}

#[test]
fn test_batch_isolates_failing_task() {
    let out = tempfile::tempdir().unwrap();
    let mut good = task("docs", EmitterConfig::OpenApi(openapi_config(out.path().join("openapi.json"))));
    good.controllers = vec!["project/**/*.controller.json".to_string()];
    good.types = vec!["project/**/*.dto.json".to_string()];
    let mut broken = task("broken", EmitterConfig::OpenApi(openapi_config(out.path().join("broken.json"))));
    broken.controllers = vec!["broken/*.controller.json".to_string()];

    let results = run_batch(&[&good, &broken], &fixtures_path(), &JsonSourceReader::new(), OutputMode::Write);
    assert_eq!(results.len(), 2);
    for (name, result) in results {
        match name.as_str() {
            "docs" => assert!(result.is_ok()),
            "broken" => match result {
                Err(GenError::UnknownArgumentType { context, found, .. }) => {
                    assert_eq!(context, "OrdersController");
                    assert_eq!(found, "expression `ROUTES.orders`");
                }
                other => panic!("Expected UnknownArgumentType, got {:?}", other.map(|r| r.task)),
            },
            other => panic!("Unexpected task {}", other),
        }
    }
    assert!(out.path().join("openapi.json").exists());
    assert!(!out.path().join("broken.json").exists());
}

// =============================================================================
// Custom Readers
// =============================================================================

/// Serves fixed units regardless of patterns
struct StaticReader(Vec<SourceUnit>);

impl SourceReader for StaticReader {
    fn read(&self, _root: &Path, patterns: &[String]) -> Result<Vec<SourceUnit>> {
        if patterns.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.0.clone())
    }
}

#[test]
fn test_custom_reader_and_missing_path_field() {
    let unit: SourceUnit = serde_json::from_str(include_str!("fixtures/project/src/users/users.controller.json")).unwrap();
    let mut broken = unit.clone();
    broken.classes[0].methods[0].parameters[0].annotations[0].arguments.clear();

    let mut task = task("docs", EmitterConfig::OpenApi(openapi_config(PathBuf::from("openapi.json"))));
    task.types.clear();

    let (surface, _) = generate(&task, Path::new("."), &StaticReader(vec![unit])).unwrap();
    assert_eq!(surface.request_count(), 4);
    assert!(surface.catalog.is_empty());

    match generate(&task, Path::new("."), &StaticReader(vec![broken])) {
        Err(GenError::MissingPathField { controller, method, parameter }) => {
            assert_eq!(controller, "users");
            assert_eq!(method, "findOne");
            assert_eq!(parameter, "id");
        }
        other => panic!("Expected MissingPathField, got {:?}", other.map(|(s, _)| s.request_count())),
    }
}
