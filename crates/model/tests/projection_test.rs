//! Integration test: parse a realistic service model and project it

use smithygen_common::{IssuesBag, Policies, SmithyId};
use smithygen_model::{
    parse_model, EnumValue, ParseOptions, Shape, SymbolsProvider, TraitRegistry,
};

const WEATHER_MODEL: &str = r#"{
    "smithy": "2.0",
    "metadata": {"authors": ["model-team"]},
    "shapes": {
        "example.weather#Weather": {
            "type": "service",
            "version": "2006-03-01",
            "operations": [{"target": "example.weather#GetForecast"}],
            "resources": [{"target": "example.weather#City"}],
            "rename": {"example.weather#Summary": "ForecastSummary"},
            "traits": {
                "smithy.api#httpApiKeyAuth": {"name": "x-api-key", "in": "header"},
                "smithy.api#httpBasicAuth": {},
                "aws.protocols#restJson1": {}
            }
        },
        "example.weather#City": {
            "type": "resource",
            "identifiers": {"cityId": {"target": "example.weather#CityId"}},
            "read": {"target": "example.weather#GetCity"},
            "collectionOperations": [{"target": "example.weather#ListCities"}]
        },
        "example.weather#CityId": {
            "type": "string",
            "traits": {"smithy.api#pattern": "^[A-Za-z0-9 ]+$"}
        },
        "example.weather#GetCity": {
            "type": "operation",
            "input": {"target": "example.weather#GetCityInput"},
            "output": {"target": "smithy.api#Unit"},
            "errors": [{"target": "example.weather#NoSuchCityError"}],
            "traits": {"smithy.api#readonly": {}}
        },
        "example.weather#GetCityInput": {
            "type": "structure",
            "members": {
                "cityId": {
                    "target": "example.weather#CityId",
                    "traits": {"smithy.api#required": {}, "smithy.api#httpLabel": {}}
                }
            }
        },
        "example.weather#ListCities": {
            "type": "operation",
            "input": {"target": "smithy.api#Unit"},
            "output": {"target": "example.weather#ListCitiesOutput"}
        },
        "example.weather#ListCitiesOutput": {
            "type": "structure",
            "members": {
                "items": {"target": "example.weather#CitySummaries"}
            }
        },
        "example.weather#CitySummaries": {
            "type": "list",
            "member": {"target": "example.weather#Summary"},
            "traits": {"smithy.api#sparse": {}}
        },
        "example.weather#Summary": {
            "type": "structure",
            "members": {
                "name": {"target": "smithy.api#String"},
                "conditions": {"target": "example.weather#Conditions"}
            }
        },
        "example.weather#Conditions": {
            "type": "union",
            "members": {
                "sunny": {"target": "smithy.api#Integer"},
                "rainy": {"target": "example.weather#Intensity"}
            }
        },
        "example.weather#Intensity": {
            "type": "enum",
            "members": {
                "LIGHT": {
                    "target": "smithy.api#Unit",
                    "traits": {"smithy.api#enumValue": "light"}
                },
                "HEAVY": {
                    "target": "smithy.api#Unit",
                    "traits": {"smithy.api#enumValue": "heavy"}
                }
            }
        },
        "example.weather#GetForecast": {
            "type": "operation",
            "input": {"target": "smithy.api#Unit"},
            "output": {"target": "example.weather#Summary"}
        },
        "example.weather#NoSuchCityError": {
            "type": "structure",
            "members": {"message": {"target": "smithy.api#String"}},
            "traits": {"smithy.api#error": "client", "smithy.api#httpError": 404}
        },
        "example.weather#Summary$docs": {
            "type": "apply",
            "traits": {"smithy.api#documentation": "A forecast summary."}
        }
    }
}"#;

fn project() -> SymbolsProvider {
    let registry = TraitRegistry::builtin();
    let opts = ParseOptions {
        registry: &registry,
        policy: Policies::default().parse,
    };
    let mut issues = IssuesBag::new();
    let model = parse_model(WEATHER_MODEL.as_bytes(), &opts, &mut issues).unwrap();
    assert!(issues.is_empty(), "unexpected issues: {:?}", issues.entries());
    SymbolsProvider::consume(model).unwrap()
}

#[test]
fn operations_follow_walk_order() {
    let symbols = project();
    let names: Vec<&str> = symbols
        .operations()
        .iter()
        .map(|id| symbols.local_name(*id).unwrap())
        .collect();
    // Service operations first, then resource lifecycle and collection ops.
    assert_eq!(names, vec!["GetForecast", "GetCity", "ListCities"]);
}

#[test]
fn union_and_enum_are_data_shapes() {
    let symbols = project();
    let conditions = SmithyId::of("example.weather#Conditions");
    let intensity = SmithyId::of("example.weather#Intensity");
    assert!(symbols.data_shapes().contains(&conditions));
    assert!(symbols.data_shapes().contains(&intensity));

    let Shape::Union { members } = symbols.shape(conditions).unwrap() else {
        panic!("expected union");
    };
    assert_eq!(members.len(), 2);

    let Shape::StrEnum { members } = symbols.shape(intensity).unwrap() else {
        panic!("expected enum");
    };
    let first_value = symbols.trait_bag(members[0]).enum_value().unwrap();
    assert_eq!(first_value, &EnumValue::Str("light".to_string()));
}

#[test]
fn named_string_shapes_walk_through() {
    let symbols = project();
    let city_id = SmithyId::of("example.weather#CityId");
    // Simple named shapes are reachable but never listed as data.
    assert!(!symbols.data_shapes().contains(&city_id));
    assert!(matches!(symbols.shape(city_id).unwrap(), Shape::String));
}

#[test]
fn errors_split_from_data() {
    let symbols = project();
    let error = SmithyId::of("example.weather#NoSuchCityError");
    assert_eq!(symbols.errors(), &[error]);
    assert!(!symbols.data_shapes().contains(&error));
    assert_eq!(symbols.trait_bag(error).http_error(), Some(404));
}

#[test]
fn apply_statement_merged_documentation() {
    let symbols = project();
    let member = SmithyId::of("example.weather#Summary$docs");
    assert_eq!(
        symbols.trait_bag(member).documentation(),
        Some("A forecast summary.")
    );
}

#[test]
fn auth_schemes_detected_and_sorted() {
    let symbols = project();
    assert_eq!(symbols.auth_schemes(), &["httpApiKey", "httpBasic"]);
}

#[test]
fn metadata_available_after_projection() {
    let symbols = project();
    assert_eq!(
        symbols.meta().get("authors"),
        Some(&serde_json::json!(["model-team"]))
    );
}

#[test]
fn service_rename_preserved() {
    let symbols = project();
    let Shape::Service(service) = symbols.shape(symbols.service_id()).unwrap() else {
        panic!("expected service");
    };
    assert_eq!(
        service.rename,
        vec![(
            SmithyId::of("example.weather#Summary"),
            "ForecastSummary".to_string()
        )]
    );
}

#[test]
fn sparse_list_trait_lands_on_list_shape() {
    let symbols = project();
    let list = SmithyId::of("example.weather#CitySummaries");
    assert!(symbols
        .trait_bag(list)
        .has(smithygen_model::traits::ids::SPARSE));
}
