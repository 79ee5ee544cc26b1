//! Integration test for end-to-end service generation

use std::fs;

use smithygen_codegen::{Hooks, SmithyOptions, SmithyTask};
use smithygen_common::Policies;
use tempfile::TempDir;

const TABLES_MODEL: &str = r#"{
    "smithy": "2.0",
    "shapes": {
        "com.example.tables#Tables": {
            "type": "service",
            "version": "2024-01-01",
            "operations": [{"target": "com.example.tables#PutRow"}],
            "resources": [{"target": "com.example.tables#Table"}],
            "traits": {
                "aws.protocols#awsJson1_0": {},
                "smithy.api#documentation": "A small key-value table service.",
                "smithy.api#httpBearerAuth": {},
                "smithy.rules#endpointRuleSet": {
                    "version": "1.0",
                    "parameters": {
                        "Region": {"type": "String", "required": true}
                    },
                    "rules": [
                        {
                            "conditions": [{"fn": "isSet", "argv": [{"ref": "Region"}]}],
                            "endpoint": {"url": "https://tables.{Region}.example.com"},
                            "type": "endpoint"
                        },
                        {"conditions": [], "error": "Region must be set", "type": "error"}
                    ]
                },
                "smithy.rules#endpointTests": {
                    "testCases": [
                        {
                            "params": {"Region": "us-west-2"},
                            "expect": {"endpoint": {"url": "https://tables.us-west-2.example.com"}}
                        }
                    ]
                }
            }
        },
        "com.example.tables#Table": {
            "type": "resource",
            "identifiers": {"tableName": {"target": "smithy.api#String"}},
            "put": {"target": "com.example.tables#PutRow"}
        },
        "com.example.tables#PutRow": {
            "type": "operation",
            "input": {"target": "com.example.tables#PutRowInput"},
            "output": {"target": "com.example.tables#PutRowOutput"},
            "errors": [{"target": "com.example.tables#LimitExceededError"}],
            "traits": {"smithy.api#documentation": "Writes one row."}
        },
        "com.example.tables#PutRowInput": {
            "type": "structure",
            "members": {
                "TableName": {"target": "smithy.api#String", "traits": {"smithy.api#required": {}}},
                "Row": {"target": "com.example.tables#Row"}
            }
        },
        "com.example.tables#PutRowOutput": {
            "type": "structure",
            "members": {
                "Revision": {"target": "smithy.api#Long"}
            }
        },
        "com.example.tables#Row": {
            "type": "structure",
            "members": {
                "Values": {"target": "com.example.tables#ValueMap"}
            }
        },
        "com.example.tables#ValueMap": {
            "type": "map",
            "key": {"target": "smithy.api#String"},
            "value": {"target": "smithy.api#String"}
        },
        "com.example.tables#LimitExceededError": {
            "type": "structure",
            "members": {"message": {"target": "smithy.api#String"}},
            "traits": {
                "smithy.api#error": "client",
                "smithy.api#httpError": 429,
                "smithy.api#retryable": {}
            }
        }
    }
}"#;

fn run_generation(hooks: &Hooks) -> (TempDir, TempDir, smithygen_codegen::RunSummary) {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    fs::write(src.path().join("tables.json"), TABLES_MODEL).unwrap();
    let options = SmithyOptions {
        src_dir: src.path().to_path_buf(),
        out_dir: out.path().to_path_buf(),
        policies: Policies::default(),
    };
    let summary = SmithyTask::run(&options, hooks).unwrap();
    (src, out, summary)
}

#[test]
fn generates_expected_files() {
    let (_src, out, summary) = run_generation(&Hooks::new());
    assert_eq!(summary.services, vec!["tables".to_string()]);

    let service_dir = out.path().join("tables");
    for file in [
        "client.rs",
        "errors.rs",
        "endpoint.rs",
        "resource_table.rs",
        "README.md",
    ] {
        assert!(service_dir.join(file).exists(), "missing {file}");
    }
}

#[test]
fn client_contains_operation_and_schemas() {
    let (_src, out, _summary) = run_generation(&Hooks::new());
    let client = fs::read_to_string(out.path().join("tables/client.rs")).unwrap();
    assert!(client.contains("pub struct Client"));
    assert!(client.contains("pub fn put_row(&self, input: &Value)"));
    assert!(client.contains("JsonFlavor::AwsJson10"));
    assert!(client.contains("pub fn put_row_operation() -> OperationSchema"));
    assert!(client.contains("MemberSchema::new(\"table_name\", Schema::string()).api_name(\"TableName\")"));
    assert!(client.contains("pub struct PutRowInput"));
    assert!(client.contains("pub struct Row"));
}

#[test]
fn errors_file_carries_taxonomy() {
    let (_src, out, _summary) = run_generation(&Hooks::new());
    let errors = fs::read_to_string(out.path().join("tables/errors.rs")).unwrap();
    assert!(errors.contains("pub enum PutRowError"));
    assert!(errors.contains("LimitExceeded(ResolvedError)"));
    assert!(errors.contains(
        "ErrorDescriptor::new(\"LimitExceededError\", ErrorSource::Client).with_status(429).retryable()"
    ));
    assert!(errors.contains("pub fn http_status(&self) -> u16"));
}

#[test]
fn endpoint_file_present_iff_rule_set() {
    let (_src, out, _summary) = run_generation(&Hooks::new());
    let endpoint = fs::read_to_string(out.path().join("tables/endpoint.rs")).unwrap();
    assert!(endpoint.contains("pub fn resolve_endpoint"));
    assert!(endpoint.contains("https://tables.{}.example.com"));
    assert!(endpoint.contains("fn case_0()"));
}

#[test]
fn readme_lists_operations_and_auth() {
    let (_src, out, _summary) = run_generation(&Hooks::new());
    let readme = fs::read_to_string(out.path().join("tables/README.md")).unwrap();
    assert!(readme.contains("# Tables"));
    assert!(readme.contains("| PutRow | `put_row` | Writes one row. |"));
    assert!(readme.contains("`httpBearer`"));
    assert!(readme.contains("`LimitExceededError`"));
}

#[test]
fn repeated_runs_are_byte_identical() {
    let (_src, out_a, _) = run_generation(&Hooks::new());
    let (_src_b, out_b, _) = run_generation(&Hooks::new());
    for file in ["client.rs", "errors.rs", "endpoint.rs", "README.md"] {
        let a = fs::read(out_a.path().join("tables").join(file)).unwrap();
        let b = fs::read(out_b.path().join("tables").join(file)).unwrap();
        assert_eq!(a, b, "{file} differs between runs");
    }
}

#[test]
fn service_filter_hook_skips_generation() {
    let mut hooks = Hooks::new();
    hooks.service_filter = Some(Box::new(|slug| slug != "tables"));
    let (_src, out, summary) = run_generation(&hooks);
    assert!(summary.services.is_empty());
    assert!(!out.path().join("tables").exists());
}

#[test]
fn script_header_hook_overrides_banner() {
    let mut hooks = Hooks::new();
    hooks.script_header = Some(Box::new(|w| {
        w.comment("custom banner");
    }));
    let (_src, out, _summary) = run_generation(&hooks);
    let client = fs::read_to_string(out.path().join("tables/client.rs")).unwrap();
    assert!(client.starts_with("// custom banner"));
    assert!(!client.contains("Generated by smithygen. Do not edit."));
}

#[test]
fn endpoint_tests_without_rule_set_are_rejected() {
    use smithygen_codegen::{generate_service, CodegenError};
    use smithygen_common::IssuesBag;
    use smithygen_model::{parse_model, ParseOptions, SymbolsProvider, TraitRegistry};

    let model_json = br#"{
        "smithy": "2.0",
        "shapes": {
            "com.example#Svc": {
                "type": "service",
                "version": "1",
                "operations": [],
                "traits": {
                    "smithy.rules#endpointTests": {
                        "testCases": [
                            {"params": {}, "expect": {"error": "never resolvable"}}
                        ]
                    }
                }
            }
        }
    }"#;
    let registry = TraitRegistry::builtin();
    let opts = ParseOptions {
        registry: &registry,
        policy: Policies::default().parse,
    };
    let mut parse_issues = IssuesBag::new();
    let model = parse_model(model_json, &opts, &mut parse_issues).unwrap();
    let symbols = SymbolsProvider::consume(model).unwrap();

    let out = TempDir::new().unwrap();
    let mut issues = IssuesBag::new();
    let err = generate_service(
        out.path(),
        "svc",
        &symbols,
        &Hooks::new(),
        Policies::default().codegen,
        &mut issues,
    )
    .unwrap_err();
    assert!(matches!(err, CodegenError::MissingEndpointRuleSet));
    assert!(!out.path().join("svc/endpoint.rs").exists());
}

#[test]
fn unparsable_service_is_skipped_with_issue() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    fs::write(src.path().join("bad.json"), "{\"smithy\": \"1.0\"}").unwrap();
    fs::write(src.path().join("tables.json"), TABLES_MODEL).unwrap();
    let options = SmithyOptions {
        src_dir: src.path().to_path_buf(),
        out_dir: out.path().to_path_buf(),
        policies: Policies::default(),
    };
    let summary = SmithyTask::run(&options, &Hooks::new()).unwrap();
    // The bad file is skipped, the good one still generates.
    assert_eq!(summary.services, vec!["tables".to_string()]);
    assert!(!summary.issues.is_empty());
}
