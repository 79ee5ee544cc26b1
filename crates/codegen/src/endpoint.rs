//! Endpoint resolver generation
//!
//! Lowers the `endpointRuleSet` trait payload into a typed rule tree and
//! emits a resolver module: a parameters struct, a chained-`if` resolver
//! function, and one test per attached `endpointTests` case.

use serde_json::Value as Json;
use smithygen_common::to_snake_case;

use crate::error::{CodegenError, Result};
use crate::writer::{quoted, SourceWriter};

/// A lowered endpoint rule set.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub params: Vec<Param>,
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: ParamType,
    pub required: bool,
    pub default: Option<Json>,
    pub doc: Option<String>,
}

impl Param {
    fn field_name(&self) -> String {
        to_snake_case(&self.name).into_owned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Boolean,
}

#[derive(Debug, Clone)]
pub enum Rule {
    Endpoint {
        conditions: Vec<Condition>,
        url: String,
    },
    Error {
        conditions: Vec<Condition>,
        message: String,
    },
    Tree {
        conditions: Vec<Condition>,
        rules: Vec<Rule>,
    },
}

/// The restricted condition language the generator supports.
#[derive(Debug, Clone)]
pub enum Condition {
    IsSet(String),
    NotIsSet(String),
    BooleanEquals(String, bool),
    StringEquals(String, String),
}

impl RuleSet {
    /// Lower the raw `endpointRuleSet` document.
    pub fn from_document(doc: &Json) -> Result<RuleSet> {
        let params_doc = doc
            .get("parameters")
            .and_then(Json::as_object)
            .ok_or_else(|| CodegenError::EndpointRule("missing parameters".to_string()))?;
        let mut params = Vec::new();
        for (name, spec) in params_doc {
            let ty = match spec.get("type").and_then(Json::as_str) {
                Some("String" | "string") => ParamType::String,
                Some("Boolean" | "boolean") => ParamType::Boolean,
                other => {
                    return Err(CodegenError::EndpointRule(format!(
                        "unsupported parameter type {other:?} for {name}"
                    )))
                }
            };
            params.push(Param {
                name: name.clone(),
                ty,
                required: spec
                    .get("required")
                    .and_then(Json::as_bool)
                    .unwrap_or(false),
                default: spec.get("default").cloned(),
                doc: spec
                    .get("documentation")
                    .and_then(Json::as_str)
                    .map(str::to_string),
            });
        }

        let rules_doc = doc
            .get("rules")
            .and_then(Json::as_array)
            .ok_or_else(|| CodegenError::EndpointRule("missing rules".to_string()))?;
        let rules = rules_doc
            .iter()
            .map(lower_rule)
            .collect::<Result<Vec<_>>>()?;
        Ok(RuleSet { params, rules })
    }
}

fn lower_rule(doc: &Json) -> Result<Rule> {
    let conditions = doc
        .get("conditions")
        .and_then(Json::as_array)
        .map(|conds| conds.iter().map(lower_condition).collect::<Result<Vec<_>>>())
        .transpose()?
        .unwrap_or_default();
    match doc.get("type").and_then(Json::as_str) {
        Some("endpoint") | None if doc.get("endpoint").is_some() => {
            let url = doc
                .pointer("/endpoint/url")
                .and_then(Json::as_str)
                .ok_or_else(|| CodegenError::EndpointRule("endpoint without url".to_string()))?;
            Ok(Rule::Endpoint {
                conditions,
                url: url.to_string(),
            })
        }
        Some("error") | None if doc.get("error").is_some() => {
            let message = doc
                .get("error")
                .and_then(Json::as_str)
                .ok_or_else(|| CodegenError::EndpointRule("error without message".to_string()))?;
            Ok(Rule::Error {
                conditions,
                message: message.to_string(),
            })
        }
        Some("tree") | None if doc.get("rules").is_some() => {
            let rules = doc
                .get("rules")
                .and_then(Json::as_array)
                .ok_or_else(|| CodegenError::EndpointRule("tree without rules".to_string()))?
                .iter()
                .map(lower_rule)
                .collect::<Result<Vec<_>>>()?;
            Ok(Rule::Tree { conditions, rules })
        }
        other => Err(CodegenError::EndpointRule(format!(
            "unsupported rule type {other:?}"
        ))),
    }
}

fn lower_condition(doc: &Json) -> Result<Condition> {
    let func = doc
        .get("fn")
        .and_then(Json::as_str)
        .ok_or_else(|| CodegenError::EndpointRule("condition without fn".to_string()))?;
    let argv = doc
        .get("argv")
        .and_then(Json::as_array)
        .ok_or_else(|| CodegenError::EndpointRule("condition without argv".to_string()))?;
    match func {
        "isSet" => Ok(Condition::IsSet(arg_ref(argv, 0)?)),
        "not" => {
            // Only `not(isSet(...))` appears in the supported subset.
            let inner = argv
                .first()
                .ok_or_else(|| CodegenError::EndpointRule("not without argument".to_string()))?;
            match lower_condition(inner)? {
                Condition::IsSet(param) => Ok(Condition::NotIsSet(param)),
                other => Err(CodegenError::EndpointRule(format!(
                    "unsupported negation of {other:?}"
                ))),
            }
        }
        "booleanEquals" => {
            let value = argv
                .get(1)
                .and_then(Json::as_bool)
                .ok_or_else(|| CodegenError::EndpointRule("booleanEquals literal".to_string()))?;
            Ok(Condition::BooleanEquals(arg_ref(argv, 0)?, value))
        }
        "stringEquals" => {
            let value = argv
                .get(1)
                .and_then(Json::as_str)
                .ok_or_else(|| CodegenError::EndpointRule("stringEquals literal".to_string()))?;
            Ok(Condition::StringEquals(arg_ref(argv, 0)?, value.to_string()))
        }
        other => Err(CodegenError::EndpointRule(format!(
            "unsupported rule function `{other}`"
        ))),
    }
}

fn arg_ref(argv: &[Json], index: usize) -> Result<String> {
    argv.get(index)
        .and_then(|arg| arg.get("ref"))
        .and_then(Json::as_str)
        .map(str::to_string)
        .ok_or_else(|| CodegenError::EndpointRule("expected parameter reference".to_string()))
}

/// Emit the endpoint module source: config struct, resolver function, and
/// tests from the optional `endpointTests` payload.
pub fn generate_endpoint_module(rule_set: &RuleSet, tests: Option<&Json>) -> Result<String> {
    let mut w = SourceWriter::new();
    w.comment("Generated by smithygen. Do not edit.");
    w.blank();
    w.line("use std::fmt;");
    w.blank();
    w.doc("Parameters consumed by the endpoint rule set.");
    w.line("#[derive(Debug, Clone, Default)]");
    w.open("pub struct EndpointConfig");
    for param in &rule_set.params {
        if let Some(doc) = &param.doc {
            w.doc(doc);
        }
        let ty = match param.ty {
            ParamType::String => "Option<String>",
            ParamType::Boolean => "Option<bool>",
        };
        w.line(format!("pub {}: {},", param.field_name(), ty));
    }
    w.close();
    w.blank();
    w.line("#[derive(Debug, Clone, PartialEq, Eq)]");
    w.line("pub struct EndpointError(pub String);");
    w.blank();
    w.open("impl fmt::Display for EndpointError");
    w.open("fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result");
    w.line("write!(f, \"endpoint resolution failed: {}\", self.0)");
    w.close();
    w.close();
    w.blank();
    w.line("impl std::error::Error for EndpointError {}");
    w.blank();
    w.doc("Resolve the endpoint URL for the given configuration.");
    w.open("pub fn resolve_endpoint(config: &EndpointConfig) -> Result<String, EndpointError>");
    write_defaults(&mut w, rule_set);
    for rule in &rule_set.rules {
        write_rule(&mut w, rule_set, rule);
    }
    w.line("Err(EndpointError(\"no endpoint rule matched\".to_string()))");
    w.close();

    if let Some(tests) = tests {
        write_tests(&mut w, tests)?;
    }
    Ok(w.finish().as_str().to_string())
}

/// Bind every parameter into a local, applying rule-set defaults.
fn write_defaults(w: &mut SourceWriter, rule_set: &RuleSet) {
    for param in &rule_set.params {
        let field = param.field_name();
        match (&param.ty, &param.default) {
            (ParamType::Boolean, Some(Json::Bool(b))) => {
                w.line(format!("let {field} = config.{field}.unwrap_or({b});"));
            }
            (ParamType::Boolean, _) => {
                w.line(format!("let {field} = config.{field}.unwrap_or(false);"));
            }
            (ParamType::String, Some(Json::String(s))) => {
                w.line(format!(
                    "let {field} = config.{field}.clone().or_else(|| Some({}.to_string()));",
                    quoted(s)
                ));
            }
            (ParamType::String, _) => {
                w.line(format!("let {field} = config.{field}.clone();"));
            }
        }
    }
    w.blank();
}

fn param_type(rule_set: &RuleSet, name: &str) -> ParamType {
    rule_set
        .params
        .iter()
        .find(|p| p.name == name)
        .map(|p| p.ty)
        .unwrap_or(ParamType::String)
}

fn condition_expr(rule_set: &RuleSet, condition: &Condition) -> String {
    match condition {
        Condition::IsSet(name) => match param_type(rule_set, name) {
            ParamType::String => format!("{}.is_some()", field(name)),
            // Booleans are defaulted above, so isSet always holds.
            ParamType::Boolean => "true".to_string(),
        },
        Condition::NotIsSet(name) => match param_type(rule_set, name) {
            ParamType::String => format!("{}.is_none()", field(name)),
            ParamType::Boolean => "false".to_string(),
        },
        Condition::BooleanEquals(name, value) => format!("{} == {}", field(name), value),
        Condition::StringEquals(name, value) => {
            format!("{}.as_deref() == Some({})", field(name), quoted(value))
        }
    }
}

fn field(name: &str) -> String {
    to_snake_case(name).into_owned()
}

fn write_rule(w: &mut SourceWriter, rule_set: &RuleSet, rule: &Rule) {
    let conditions = match rule {
        Rule::Endpoint { conditions, .. }
        | Rule::Error { conditions, .. }
        | Rule::Tree { conditions, .. } => conditions,
    };
    let guard = if conditions.is_empty() {
        "true".to_string()
    } else {
        conditions
            .iter()
            .map(|c| condition_expr(rule_set, c))
            .collect::<Vec<_>>()
            .join(" && ")
    };
    w.open(format!("if {guard}"));
    match rule {
        Rule::Endpoint { url, .. } => {
            w.line(format!("return Ok({});", url_expr(rule_set, url)));
        }
        Rule::Error { message, .. } => {
            w.line(format!(
                "return Err(EndpointError({}.to_string()));",
                quoted(message)
            ));
        }
        Rule::Tree { rules, .. } => {
            for nested in rules {
                write_rule(w, rule_set, nested);
            }
        }
    }
    w.close();
}

/// Turn `https://{Region}.example.com` into a `format!` expression.
fn url_expr(rule_set: &RuleSet, url: &str) -> String {
    let mut template = String::new();
    let mut args = Vec::new();
    let mut rest = url;
    while let Some(open) = rest.find('{') {
        template.push_str(&rest[..open]);
        let Some(close) = rest[open..].find('}') else {
            template.push_str(&rest[open..]);
            rest = "";
            break;
        };
        let name = &rest[open + 1..open + close];
        template.push_str("{}");
        match param_type(rule_set, name) {
            ParamType::String => {
                args.push(format!("{}.clone().unwrap_or_default()", field(name)));
            }
            ParamType::Boolean => args.push(field(name)),
        }
        rest = &rest[open + close + 1..];
    }
    template.push_str(rest);
    if args.is_empty() {
        format!("{}.to_string()", quoted(&template))
    } else {
        format!("format!({}, {})", quoted(&template), args.join(", "))
    }
}

/// Emit one `#[test]` per endpointTests case.
fn write_tests(w: &mut SourceWriter, tests: &Json) -> Result<()> {
    let Some(cases) = tests.get("testCases").and_then(Json::as_array) else {
        return Ok(());
    };
    w.blank();
    w.line("#[cfg(test)]");
    w.open("mod tests");
    w.line("use super::*;");
    for (index, case) in cases.iter().enumerate() {
        w.blank();
        if let Some(doc) = case.get("documentation").and_then(Json::as_str) {
            w.comment(doc);
        }
        w.line("#[test]");
        w.open(format!("fn case_{index}()"));
        w.line("let config = EndpointConfig {");
        if let Some(params) = case.get("params").and_then(Json::as_object) {
            for (name, value) in params {
                let fname = field(name);
                match value {
                    Json::String(s) => {
                        w.line(format!("    {fname}: Some({}.to_string()),", quoted(s)));
                    }
                    Json::Bool(b) => w.line(format!("    {fname}: Some({b}),")),
                    other => {
                        return Err(CodegenError::EndpointRule(format!(
                            "unsupported test parameter {other}"
                        )))
                    }
                }
            }
        }
        w.line("    ..Default::default()");
        w.line("};");
        if let Some(url) = case.pointer("/expect/endpoint/url").and_then(Json::as_str) {
            w.line(format!(
                "assert_eq!(resolve_endpoint(&config).unwrap(), {});",
                quoted(url)
            ));
        } else if case.pointer("/expect/error").is_some() {
            w.line("assert!(resolve_endpoint(&config).is_err());");
        } else {
            return Err(CodegenError::EndpointRule(format!(
                "test case {index} has no expectation"
            )));
        }
        w.close();
    }
    w.close();
    Ok(())
}
