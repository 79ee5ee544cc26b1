//! Template loading and README rendering

use smithygen_common::to_snake_case;
use smithygen_model::{Shape, SymbolsProvider};
use tera::Tera;

use crate::error::Result;
use crate::lower::{Lowering, Protocol};
use crate::pipeline::Hooks;

/// Load all templates.
pub fn load_templates() -> Result<Tera> {
    let mut tera = Tera::default();
    tera.add_raw_template("README.md", include_str!("../templates/README.md.tera"))?;
    Ok(tera)
}

/// Render the per-service README.
pub fn render_readme(symbols: &SymbolsProvider, hooks: &Hooks) -> Result<String> {
    let tera = load_templates()?;
    let lowering = Lowering::new(symbols);
    let service_name = symbols.local_name(symbols.service_id())?.to_string();

    let mut context = tera::Context::new();
    let title = match &hooks.readme_title {
        Some(hook) => hook(&service_name),
        None => service_name.clone(),
    };
    context.insert("title", &title);
    context.insert("service", &service_name);
    if let Shape::Service(service) = symbols.shape(symbols.service_id())? {
        context.insert("version", &service.version);
    }
    context.insert(
        "protocol",
        match lowering.protocol {
            Protocol::AwsJson10 => "AWS JSON 1.0",
            Protocol::AwsJson11 => "AWS JSON 1.1",
            Protocol::RestJson => "REST JSON",
            Protocol::RestXml => "REST XML",
        },
    );
    if let Some(doc) = symbols.trait_bag(symbols.service_id()).documentation() {
        context.insert("documentation", doc);
    }

    let mut operations = Vec::new();
    for op_id in symbols.operations() {
        let name = symbols.local_name(*op_id)?.to_string();
        let mut entry = std::collections::BTreeMap::new();
        entry.insert("name", name.clone());
        entry.insert("method", to_snake_case(&name).into_owned());
        entry.insert(
            "doc",
            symbols
                .trait_bag(*op_id)
                .documentation()
                .unwrap_or("")
                .lines()
                .next()
                .unwrap_or("")
                .to_string(),
        );
        operations.push(entry);
    }
    context.insert("operations", &operations);
    context.insert("auth_schemes", symbols.auth_schemes());

    let mut errors = Vec::new();
    for error_id in symbols.errors() {
        errors.push(symbols.local_name(*error_id)?.to_string());
    }
    context.insert("errors", &errors);

    Ok(tera.render("README.md", &context)?)
}
