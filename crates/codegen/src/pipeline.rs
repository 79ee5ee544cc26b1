//! Pipeline and task runner
//!
//! Cooperative, single-threaded orchestration: tasks run to completion on
//! the caller's stack. A [`Pipeline`] carries scoped services (with
//! cleanup on scope exit), shadowable key/value slots, and the typed
//! override hooks a build can install. The top-level [`SmithyTask`] walks
//! the source directory, parses each service model, projects it, and
//! schedules the per-service writers.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use smithygen_common::{Issue, IssueKind, IssuesBag, Policies, Policy, PolicyAbort};
use smithygen_model::{parse_model, ParseOptions, SymbolsProvider, TraitRegistry};
use tracing::{debug, warn};

use crate::error::{CodegenError, Result};
use crate::service::generate_service;
use crate::writer::SourceWriter;

/// Typed override hooks. Each slot is a named extension point a pipeline
/// user can fill per build.
#[derive(Default)]
pub struct Hooks {
    /// Decide whether a service slug is generated at all.
    pub service_filter: Option<Box<dyn Fn(&str) -> bool>>,
    /// Replace the generated-file header comment.
    pub script_header: Option<Box<dyn Fn(&mut SourceWriter)>>,
    /// Override the README title for a service.
    pub readme_title: Option<Box<dyn Fn(&str) -> String>>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_override(&self, name: &str) -> bool {
        match name {
            "service_filter" => self.service_filter.is_some(),
            "script_header" => self.script_header.is_some(),
            "readme_title" => self.readme_title.is_some(),
            _ => false,
        }
    }
}

type CleanupFn = Box<dyn FnOnce(&mut dyn Any)>;

#[derive(Default)]
struct ScopeFrame {
    services: HashMap<TypeId, Box<dyn Any>>,
    cleanups: Vec<(TypeId, CleanupFn)>,
    values: HashMap<(TypeId, &'static str), Box<dyn Any>>,
}

/// Scoped service and value storage threaded through tasks.
#[derive(Default)]
pub struct Pipeline {
    frames: Vec<ScopeFrame>,
}

impl Pipeline {
    pub fn new() -> Self {
        Pipeline {
            frames: vec![ScopeFrame::default()],
        }
    }

    /// Run `task` inside a fresh scope; services provided within it are
    /// cleaned up (LIFO) when the scope exits, on success and on error.
    pub fn scoped<T>(&mut self, task: impl FnOnce(&mut Self) -> T) -> T {
        self.frames.push(ScopeFrame::default());
        let result = task(self);
        let mut frame = self.frames.pop().unwrap_or_default();
        while let Some((type_id, cleanup)) = frame.cleanups.pop() {
            if let Some(service) = frame.services.get_mut(&type_id) {
                cleanup(service.as_mut());
            }
        }
        result
    }

    /// Register a service visible to descendant tasks.
    pub fn provide_service<S: Any>(&mut self, service: S) {
        let frame = self.frames.last_mut().expect("pipeline has a root frame");
        frame.services.insert(TypeId::of::<S>(), Box::new(service));
    }

    /// Register a service with a cleanup callback run at scope exit.
    pub fn provide_service_with_cleanup<S: Any>(
        &mut self,
        service: S,
        cleanup: impl FnOnce(&mut S) + 'static,
    ) {
        let frame = self.frames.last_mut().expect("pipeline has a root frame");
        frame.services.insert(TypeId::of::<S>(), Box::new(service));
        frame.cleanups.push((
            TypeId::of::<S>(),
            Box::new(move |any| {
                if let Some(service) = any.downcast_mut::<S>() {
                    cleanup(service);
                }
            }),
        ));
    }

    /// Fetch a service from the nearest enclosing scope.
    pub fn service_mut<S: Any>(&mut self) -> Option<&mut S> {
        for frame in self.frames.iter_mut().rev() {
            if let Some(service) = frame.services.get_mut(&TypeId::of::<S>()) {
                return service.downcast_mut::<S>();
            }
        }
        None
    }

    /// Define a scoped value; inner scopes shadow outer ones.
    pub fn define_value<V: Any>(&mut self, tag: &'static str, value: V) {
        let frame = self.frames.last_mut().expect("pipeline has a root frame");
        frame
            .values
            .insert((TypeId::of::<V>(), tag), Box::new(value));
    }

    /// Read a scoped value, walking outward through shadowing scopes.
    pub fn read_value<V: Any>(&self, tag: &'static str) -> Option<&V> {
        for frame in self.frames.iter().rev() {
            if let Some(value) = frame.values.get(&(TypeId::of::<V>(), tag)) {
                return value.downcast_ref::<V>();
            }
        }
        None
    }
}

/// Inputs for the top-level task.
#[derive(Debug, Clone)]
pub struct SmithyOptions {
    pub src_dir: PathBuf,
    pub out_dir: PathBuf,
    pub policies: Policies,
}

/// Result of one pipeline run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Slugs generated, in processing order.
    pub services: Vec<String>,
    /// Files written per service.
    pub files: Vec<(String, Vec<String>)>,
    pub issues: Vec<Issue>,
}

/// The top-level generation task.
pub struct SmithyTask;

impl SmithyTask {
    /// Scan `src_dir` for `*.json` service models and generate each into
    /// `out_dir/<slug>/`.
    pub fn run(options: &SmithyOptions, hooks: &Hooks) -> Result<RunSummary> {
        // The traits registry is process-wide: built once here, read-only
        // afterwards.
        let registry = TraitRegistry::builtin();
        let mut pipeline = Pipeline::new();
        pipeline.provide_service(IssuesBag::new());
        pipeline.define_value::<PathBuf>("out_dir", options.out_dir.clone());

        let mut entries: Vec<PathBuf> = fs::read_dir(&options.src_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        entries.sort();

        fs::create_dir_all(&options.out_dir)?;

        let mut summary = RunSummary::default();
        for path in entries {
            let slug = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .map(str::to_string)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| CodegenError::MissingSlug(path.display().to_string()))?;

            if let Some(filter) = &hooks.service_filter {
                if !filter(&slug) {
                    debug!(slug = %slug, "skipped by service filter hook");
                    continue;
                }
            }

            let outcome = pipeline.scoped(|pipeline| {
                pipeline.define_value::<String>("slug", slug.clone());
                Self::process_service(pipeline, options, hooks, &registry, &path, &slug)
            });
            match outcome {
                Ok(files) => {
                    summary.services.push(slug.clone());
                    summary.files.push((slug, files));
                }
                Err(err) => {
                    if options.policies.service.process == Policy::Abort {
                        return Err(CodegenError::PolicyAbort(PolicyAbort {
                            context: "process service".to_string(),
                            item: slug,
                        }));
                    }
                    warn!(slug = %slug, error = %err, "service skipped");
                    if let Some(issues) = pipeline.service_mut::<IssuesBag>() {
                        issues.push(IssueKind::ServiceProcessFailed, &slug, err.to_string());
                    }
                }
            }
        }

        if let Some(issues) = pipeline.service_mut::<IssuesBag>() {
            summary.issues = issues.entries().to_vec();
        }
        Ok(summary)
    }

    fn process_service(
        pipeline: &mut Pipeline,
        options: &SmithyOptions,
        hooks: &Hooks,
        registry: &TraitRegistry,
        path: &std::path::Path,
        slug: &str,
    ) -> Result<Vec<String>> {
        debug!(slug = %slug, "parsing service model");
        let data = fs::read(path)?;

        let mut parse_issues = IssuesBag::new();
        let parse_opts = ParseOptions {
            registry,
            policy: options.policies.parse,
        };
        let model = match parse_model(&data, &parse_opts, &mut parse_issues) {
            Ok(model) => model,
            Err(err) => {
                if options.policies.service.parse == Policy::Abort {
                    return Err(err.into());
                }
                if let Some(issues) = pipeline.service_mut::<IssuesBag>() {
                    issues.push(IssueKind::ServiceParseFailed, slug, err.to_string());
                }
                return Ok(Vec::new());
            }
        };
        if let Some(issues) = pipeline.service_mut::<IssuesBag>() {
            for issue in parse_issues.entries() {
                issues.push(issue.kind, issue.context.clone(), issue.item.clone());
            }
        }

        let symbols = match SymbolsProvider::consume(model) {
            Ok(symbols) => symbols,
            Err(err) => {
                if options.policies.codegen.invalid_root == Policy::Abort {
                    return Err(err.into());
                }
                if let Some(issues) = pipeline.service_mut::<IssuesBag>() {
                    issues.push(IssueKind::InvalidRoot, slug, err.to_string());
                }
                return Ok(Vec::new());
            }
        };
        Self::codegen_service(pipeline, options, hooks, &symbols, slug)
    }

    fn codegen_service(
        pipeline: &mut Pipeline,
        options: &SmithyOptions,
        hooks: &Hooks,
        symbols: &SymbolsProvider,
        slug: &str,
    ) -> Result<Vec<String>> {
        let out_dir = pipeline
            .read_value::<PathBuf>("out_dir")
            .cloned()
            .unwrap_or_else(|| options.out_dir.clone());
        let mut codegen_issues = IssuesBag::new();
        let result = generate_service(
            &out_dir,
            slug,
            symbols,
            hooks,
            options.policies.codegen,
            &mut codegen_issues,
        );
        if let Some(issues) = pipeline.service_mut::<IssuesBag>() {
            for issue in codegen_issues.entries() {
                issues.push(issue.kind, issue.context.clone(), issue.item.clone());
            }
        }
        match result {
            Ok(files) => Ok(files),
            Err(err) => {
                if options.policies.service.codegen == Policy::Abort {
                    Err(err)
                } else {
                    if let Some(issues) = pipeline.service_mut::<IssuesBag>() {
                        issues.push(IssueKind::ServiceCodegenFailed, slug, err.to_string());
                    }
                    Ok(Vec::new())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoped_values_shadow_and_restore() {
        let mut pipeline = Pipeline::new();
        pipeline.define_value::<u32>("depth", 1);
        pipeline.scoped(|p| {
            p.define_value::<u32>("depth", 2);
            assert_eq!(p.read_value::<u32>("depth"), Some(&2));
        });
        assert_eq!(pipeline.read_value::<u32>("depth"), Some(&1));
    }

    #[test]
    fn services_resolve_from_outer_scopes() {
        let mut pipeline = Pipeline::new();
        pipeline.provide_service(IssuesBag::new());
        pipeline.scoped(|p| {
            let issues = p.service_mut::<IssuesBag>().unwrap();
            issues.push(IssueKind::UnknownTrait, "ctx", "item");
        });
        assert_eq!(pipeline.service_mut::<IssuesBag>().unwrap().len(), 1);
    }

    #[test]
    fn cleanup_runs_on_scope_exit() {
        struct Flag(std::rc::Rc<std::cell::Cell<bool>>);
        let flag = std::rc::Rc::new(std::cell::Cell::new(false));
        let mut pipeline = Pipeline::new();
        let captured = flag.clone();
        pipeline.scoped(|p| {
            p.provide_service_with_cleanup(Flag(captured.clone()), |f| f.0.set(true));
            assert!(!captured.get());
        });
        assert!(flag.get());
    }

    #[test]
    fn hook_override_detection() {
        let mut hooks = Hooks::new();
        assert!(!hooks.has_override("service_filter"));
        hooks.service_filter = Some(Box::new(|slug| slug != "skipped"));
        assert!(hooks.has_override("service_filter"));
        assert!(!hooks.has_override("unknown"));
    }
}
