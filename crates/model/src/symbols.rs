//! Symbol projection
//!
//! Consumes a parsed [`Model`] into the immutable view the code generator
//! works from: reachable operations and named data shapes in deterministic
//! insertion order, error shapes split out, auth schemes detected, and a
//! FIFO emission queue primed by downstream writers.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use smithygen_common::SmithyId;

use crate::error::{ModelError, Result};
use crate::model::{Model, Shape};
use crate::traits::{self, TraitBag};

/// Immutable, queryable projection of one service's model.
#[derive(Debug)]
pub struct SymbolsProvider {
    shapes: HashMap<SmithyId, Shape>,
    names: HashMap<SmithyId, String>,
    traits: HashMap<SmithyId, Vec<(SmithyId, crate::traits::TraitValue)>>,
    meta: BTreeMap<String, serde_json::Value>,
    service_id: SmithyId,
    operations: Vec<SmithyId>,
    data_shapes: Vec<SmithyId>,
    errors: Vec<SmithyId>,
    auth_schemes: Vec<String>,
    // The emission queue is primed by writers that only hold a shared
    // borrow of the projection.
    queue: RefCell<VecDeque<SmithyId>>,
    queued: RefCell<HashSet<SmithyId>>,
}

impl SymbolsProvider {
    /// Flatten mixins, run the reachability walk from the service root,
    /// and classify every reachable shape.
    pub fn consume(mut model: Model) -> Result<Self> {
        let service_id = model.service_id.ok_or(ModelError::MissingServiceShape)?;
        flatten_mixins(&mut model)?;

        let mut provider = SymbolsProvider {
            shapes: model.shapes,
            names: model.names,
            traits: model.traits,
            meta: model.meta,
            service_id,
            operations: Vec::new(),
            data_shapes: Vec::new(),
            errors: Vec::new(),
            auth_schemes: Vec::new(),
            queue: RefCell::new(VecDeque::new()),
            queued: RefCell::new(HashSet::new()),
        };
        provider.walk()?;
        provider.detect_auth_schemes();
        Ok(provider)
    }

    fn walk(&mut self) -> Result<()> {
        let mut pending = VecDeque::from([self.service_id]);
        let mut visited = HashSet::new();
        while let Some(id) = pending.pop_front() {
            if !visited.insert(id) || id.is_primitive() {
                continue;
            }
            let shape = self
                .shapes
                .get(&id)
                .ok_or_else(|| ModelError::ShapeNotFound(self.display_name(id)))?;
            match shape {
                Shape::Target(target) => pending.push_back(*target),
                Shape::List { member } => pending.push_back(*member),
                Shape::Map { key, value } => {
                    self.data_shapes.push(id);
                    pending.push_back(*key);
                    pending.push_back(*value);
                }
                Shape::Structure { members } => {
                    if self.trait_bag(id).error_source().is_some() {
                        self.errors.push(id);
                    } else {
                        self.data_shapes.push(id);
                    }
                    pending.extend(members.iter().copied());
                }
                Shape::Union { members }
                | Shape::StrEnum { members }
                | Shape::IntEnum { members } => {
                    self.data_shapes.push(id);
                    pending.extend(members.iter().copied());
                }
                Shape::Operation(op) => {
                    self.operations.push(id);
                    if let Some(input) = op.input {
                        pending.push_back(input);
                    }
                    if let Some(output) = op.output {
                        pending.push_back(output);
                    }
                    pending.extend(op.errors.iter().copied());
                }
                Shape::Service(service) => {
                    pending.extend(service.operations.iter().copied());
                    pending.extend(service.resources.iter().copied());
                    pending.extend(service.errors.iter().copied());
                }
                Shape::Resource(resource) => {
                    for op in [
                        resource.create,
                        resource.put,
                        resource.read,
                        resource.update,
                        resource.delete,
                        resource.list,
                    ]
                    .into_iter()
                    .flatten()
                    {
                        pending.push_back(op);
                    }
                    pending.extend(resource.operations.iter().copied());
                    pending.extend(resource.collection_ops.iter().copied());
                    pending.extend(resource.resources.iter().copied());
                }
                // Named simple shapes contribute only to the walk.
                _ => {}
            }
        }
        Ok(())
    }

    fn detect_auth_schemes(&mut self) {
        let bag = self.trait_bag(self.service_id);
        let schemes = [
            (traits::ids::HTTP_BASIC_AUTH, "httpBasic"),
            (traits::ids::HTTP_BEARER_AUTH, "httpBearer"),
            (traits::ids::HTTP_DIGEST_AUTH, "httpDigest"),
            (traits::ids::HTTP_API_KEY_AUTH, "httpApiKey"),
        ];
        let mut found: Vec<String> = schemes
            .iter()
            .filter(|(id, _)| bag.has(*id))
            .map(|(_, name)| (*name).to_string())
            .collect();
        found.sort_by_key(|name| name.to_ascii_lowercase());
        self.auth_schemes = found;
    }

    pub fn service_id(&self) -> SmithyId {
        self.service_id
    }

    /// Reachable operations, in walk insertion order.
    pub fn operations(&self) -> &[SmithyId] {
        &self.operations
    }

    /// Reachable named data shapes (errors excluded), in walk order.
    pub fn data_shapes(&self) -> &[SmithyId] {
        &self.data_shapes
    }

    /// Reachable error structures.
    pub fn errors(&self) -> &[SmithyId] {
        &self.errors
    }

    pub fn auth_schemes(&self) -> &[String] {
        &self.auth_schemes
    }

    pub fn meta(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.meta
    }

    pub fn shape(&self, id: SmithyId) -> Result<&Shape> {
        self.shapes
            .get(&id)
            .ok_or_else(|| ModelError::ShapeNotFound(self.display_name(id)))
    }

    pub fn name(&self, id: SmithyId) -> Result<&str> {
        self.names
            .get(&id)
            .map(String::as_str)
            .ok_or_else(|| ModelError::NameNotFound(id.to_string()))
    }

    /// The local (post-`#`) part of a shape name, after any `$member`.
    pub fn local_name(&self, id: SmithyId) -> Result<&str> {
        let name = self.name(id)?;
        let tail = name.rsplit_once('#').map_or(name, |(_, t)| t);
        Ok(tail.rsplit_once('$').map_or(tail, |(_, m)| m))
    }

    pub fn trait_bag(&self, id: SmithyId) -> TraitBag<'_> {
        self.traits
            .get(&id)
            .map(|entries| TraitBag::new(entries))
            .unwrap_or(TraitBag::EMPTY)
    }

    /// Follow `Target` links until a non-target shape id.
    pub fn resolve(&self, mut id: SmithyId) -> Result<SmithyId> {
        loop {
            if id.is_primitive() {
                return Ok(id);
            }
            match self.shape(id)? {
                Shape::Target(next) => id = *next,
                _ => return Ok(id),
            }
        }
    }

    pub fn display_name(&self, id: SmithyId) -> String {
        self.names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    /// Queue a shape for emission. Each id is emitted at most once per
    /// projection.
    pub fn enqueue(&self, id: SmithyId) {
        if self.queued.borrow_mut().insert(id) {
            self.queue.borrow_mut().push_back(id);
        }
    }

    /// Drain the emission queue in FIFO order.
    pub fn next(&self) -> Option<SmithyId> {
        self.queue.borrow_mut().pop_front()
    }
}

/// Replace every mixed-in structure's member list with mixin members
/// (depth-first, mixins first) followed by its own.
fn flatten_mixins(model: &mut Model) -> Result<()> {
    let mut ids: Vec<SmithyId> = model.mixins.keys().copied().collect();
    ids.sort_unstable();
    let mut done = HashSet::new();
    for id in ids {
        flatten_one(model, id, &mut done, &mut Vec::new())?;
    }
    Ok(())
}

fn flatten_one(
    model: &mut Model,
    id: SmithyId,
    done: &mut HashSet<SmithyId>,
    stack: &mut Vec<SmithyId>,
) -> Result<()> {
    if done.contains(&id) {
        return Ok(());
    }
    if stack.contains(&id) {
        return Err(ModelError::MixinCycle(model.display_name(id)));
    }
    stack.push(id);
    let mixins = model.mixins.get(&id).cloned().unwrap_or_default();
    for mixin in &mixins {
        flatten_one(model, *mixin, done, stack)?;
    }
    let mut inherited = Vec::new();
    for mixin in &mixins {
        if let Some(Shape::Structure { members }) = model.shapes.get(mixin) {
            inherited.extend(members.iter().copied());
        }
    }
    if !inherited.is_empty() {
        if let Some(Shape::Structure { members }) = model.shapes.get_mut(&id) {
            let own = std::mem::take(members);
            inherited.extend(own);
            // A shape redefining a mixin member keeps one entry.
            let mut seen = HashSet::new();
            inherited.retain(|m| seen.insert(*m));
            *members = inherited;
        }
    }
    stack.pop();
    done.insert(id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_model, ParseOptions};
    use crate::traits::TraitRegistry;
    use smithygen_common::{IssuesBag, Policies};

    fn project(json: &str) -> SymbolsProvider {
        let registry = TraitRegistry::builtin();
        let opts = ParseOptions {
            registry: &registry,
            policy: Policies::default().parse,
        };
        let mut issues = IssuesBag::new();
        let model = parse_model(json.as_bytes(), &opts, &mut issues).unwrap();
        SymbolsProvider::consume(model).unwrap()
    }

    const MODEL: &str = r#"{
        "smithy": "2.0",
        "shapes": {
            "com.example#Svc": {
                "type": "service",
                "version": "2024-01-01",
                "operations": [{"target": "com.example#PutItem"}],
                "traits": {
                    "smithy.api#httpBearerAuth": {},
                    "smithy.api#httpBasicAuth": {}
                }
            },
            "com.example#PutItem": {
                "type": "operation",
                "input": {"target": "com.example#PutItemInput"},
                "output": {"target": "smithy.api#Unit"},
                "errors": [{"target": "com.example#LimitExceededError"}]
            },
            "com.example#PutItemInput": {
                "type": "structure",
                "members": {
                    "name": {"target": "smithy.api#String"},
                    "tags": {"target": "com.example#TagList"}
                }
            },
            "com.example#TagList": {
                "type": "list",
                "member": {"target": "com.example#Tag"}
            },
            "com.example#Tag": {
                "type": "structure",
                "members": {"key": {"target": "smithy.api#String"}}
            },
            "com.example#LimitExceededError": {
                "type": "structure",
                "members": {"message": {"target": "smithy.api#String"}},
                "traits": {"smithy.api#error": "client", "smithy.api#retryable": {}}
            }
        }
    }"#;

    #[test]
    fn classifies_reachable_shapes() {
        let symbols = project(MODEL);
        let op = SmithyId::of("com.example#PutItem");
        let input = SmithyId::of("com.example#PutItemInput");
        let tag = SmithyId::of("com.example#Tag");
        let err = SmithyId::of("com.example#LimitExceededError");
        let list = SmithyId::of("com.example#TagList");

        assert_eq!(symbols.operations(), &[op]);
        assert!(symbols.data_shapes().contains(&input));
        assert!(symbols.data_shapes().contains(&tag));
        // Lists walk through without being listed.
        assert!(!symbols.data_shapes().contains(&list));
        // Errors are split out of the data list.
        assert!(!symbols.data_shapes().contains(&err));
        assert_eq!(symbols.errors(), &[err]);
    }

    #[test]
    fn every_reachable_id_has_name_and_resolves(){
        let symbols = project(MODEL);
        for id in symbols
            .operations()
            .iter()
            .chain(symbols.data_shapes())
            .chain(symbols.errors())
        {
            assert!(symbols.name(*id).is_ok());
            let resolved = symbols.resolve(*id).unwrap();
            assert!(!matches!(symbols.shape(resolved), Ok(Shape::Target(_))));
        }
    }

    #[test]
    fn auth_schemes_sorted_case_insensitively() {
        let symbols = project(MODEL);
        assert_eq!(symbols.auth_schemes(), &["httpBasic", "httpBearer"]);
    }

    #[test]
    fn emission_queue_is_fifo_and_deduplicated() {
        let symbols = project(MODEL);
        let a = SmithyId::of("com.example#PutItemInput");
        let b = SmithyId::of("com.example#Tag");
        symbols.enqueue(a);
        symbols.enqueue(b);
        symbols.enqueue(a);
        assert_eq!(symbols.next(), Some(a));
        assert_eq!(symbols.next(), Some(b));
        assert_eq!(symbols.next(), None);
    }

    #[test]
    fn deterministic_projection_order() {
        let first = project(MODEL);
        let second = project(MODEL);
        assert_eq!(first.operations(), second.operations());
        assert_eq!(first.data_shapes(), second.data_shapes());
        assert_eq!(first.errors(), second.errors());
    }

    #[test]
    fn mixin_members_are_flattened() {
        let symbols = project(
            r#"{
                "smithy": "2.0",
                "shapes": {
                    "com.example#Svc": {
                        "type": "service",
                        "version": "1",
                        "operations": [{"target": "com.example#Get"}]
                    },
                    "com.example#Get": {
                        "type": "operation",
                        "input": {"target": "com.example#GetInput"}
                    },
                    "com.example#Base": {
                        "type": "structure",
                        "members": {"id": {"target": "smithy.api#String"}},
                        "traits": {"smithy.api#mixin": {}}
                    },
                    "com.example#GetInput": {
                        "type": "structure",
                        "members": {"extra": {"target": "smithy.api#String"}},
                        "mixins": [{"target": "com.example#Base"}]
                    }
                }
            }"#,
        );
        let input = SmithyId::of("com.example#GetInput");
        let Shape::Structure { members } = symbols.shape(input).unwrap() else {
            panic!("expected structure");
        };
        assert_eq!(members.len(), 2);
        // Mixin members come first.
        assert_eq!(members[0], SmithyId::of("com.example#Base$id"));
        assert_eq!(members[1], SmithyId::of("com.example#GetInput$extra"));
    }

    #[test]
    fn mixin_cycle_is_fatal() {
        let registry = TraitRegistry::builtin();
        let opts = ParseOptions {
            registry: &registry,
            policy: Policies::default().parse,
        };
        let mut issues = IssuesBag::new();
        let model = parse_model(
            br#"{
                "smithy": "2.0",
                "shapes": {
                    "com.example#Svc": {"type": "service", "version": "1"},
                    "com.example#A": {
                        "type": "structure", "members": {},
                        "mixins": [{"target": "com.example#B"}]
                    },
                    "com.example#B": {
                        "type": "structure", "members": {},
                        "mixins": [{"target": "com.example#A"}]
                    }
                }
            }"#,
            &opts,
            &mut issues,
        )
        .unwrap();
        let err = SymbolsProvider::consume(model).unwrap_err();
        assert!(matches!(err, ModelError::MixinCycle(_)));
    }

    #[test]
    fn missing_service_is_fatal() {
        let registry = TraitRegistry::builtin();
        let opts = ParseOptions {
            registry: &registry,
            policy: Policies::default().parse,
        };
        let mut issues = IssuesBag::new();
        let model =
            parse_model(br#"{"smithy": "2.0", "shapes": {}}"#, &opts, &mut issues).unwrap();
        assert!(matches!(
            SymbolsProvider::consume(model).unwrap_err(),
            ModelError::MissingServiceShape
        ));
    }
}
