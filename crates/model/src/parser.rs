//! Smithy JSON AST parser
//!
//! Drives the token reader across the whole document. Each object scope
//! dispatches on the property name; unknown properties and unknown traits
//! are subject to the parse policy (abort, or record an issue and skip).

use smithygen_common::{IssueKind, IssuesBag, ParsePolicy, Policy, SmithyId};

use crate::error::{ModelError, Result};
use crate::model::{Model, OperationShape, ResourceShape, ServiceShape, Shape};
use crate::reader::JsonReader;
use crate::traits::{TraitRegistry, TraitValue};

/// Inputs for one parse run.
pub struct ParseOptions<'a> {
    pub registry: &'a TraitRegistry,
    pub policy: ParsePolicy,
}

/// Parse one Smithy JSON AST document into a [`Model`].
pub fn parse_model(
    data: &[u8],
    opts: &ParseOptions<'_>,
    issues: &mut IssuesBag,
) -> Result<Model> {
    let mut parser = Parser {
        reader: JsonReader::new(data),
        registry: opts.registry,
        policy: opts.policy,
        issues,
        model: Model::new(),
    };
    parser.parse_root()?;
    Ok(parser.model)
}

struct Parser<'r, 'a> {
    reader: JsonReader<'r>,
    registry: &'a TraitRegistry,
    policy: ParsePolicy,
    issues: &'a mut IssuesBag,
    model: Model,
}

impl Parser<'_, '_> {
    fn parse_root(&mut self) -> Result<()> {
        let mut version_seen = false;
        let mut key = self.reader.next_object_begin()?;
        while let Some(k) = key {
            match k.as_str() {
                "smithy" => {
                    let version = self.reader.next_string()?;
                    if version != "2" && version != "2.0" {
                        return Err(ModelError::InvalidVersion(version.to_string()));
                    }
                    version_seen = true;
                }
                "metadata" => self.parse_metadata()?,
                "shapes" => self.parse_shapes()?,
                _ => self.unknown_property("model root", &k)?,
            }
            key = self.reader.next_key()?;
        }
        if !version_seen {
            return Err(ModelError::InvalidVersion("<absent>".to_string()));
        }
        self.reader.finish()
    }

    fn parse_metadata(&mut self) -> Result<()> {
        let mut key = self.reader.next_object_begin()?;
        while let Some(k) = key {
            let value = self.reader.read_document()?;
            self.model.meta.insert(k, value);
            key = self.reader.next_key()?;
        }
        Ok(())
    }

    fn parse_shapes(&mut self) -> Result<()> {
        let mut key = self.reader.next_object_begin()?;
        while let Some(name) = key {
            self.parse_shape(&name)?;
            key = self.reader.next_key()?;
        }
        Ok(())
    }

    /// Parse one `"ns#Name": { "type": ..., ... }` entry. The `type`
    /// discriminator must come first; the streaming reader dispatches the
    /// remaining properties on it.
    fn parse_shape(&mut self, name: &str) -> Result<()> {
        let id = SmithyId::of(name);
        let first = self
            .reader
            .next_object_begin()?
            .ok_or_else(|| ModelError::UnknownType(format!("{name}: empty shape object")))?;
        if first != "type" {
            return Err(ModelError::InvalidShapeProperty {
                context: name.to_string(),
                property: first,
            });
        }
        let type_name = self.reader.next_string()?.to_string();

        match type_name.as_str() {
            "apply" => self.parse_apply(id, name),
            "structure" => self.parse_aggregate(id, name, AggregateKind::Structure),
            "union" => self.parse_aggregate(id, name, AggregateKind::Union),
            "enum" => self.parse_aggregate(id, name, AggregateKind::StrEnum),
            "intEnum" => self.parse_aggregate(id, name, AggregateKind::IntEnum),
            "list" | "set" => self.parse_list(id, name),
            "map" => self.parse_map(id, name),
            "service" => self.parse_service(id, name),
            "resource" => self.parse_resource(id, name),
            "operation" => self.parse_operation(id, name),
            "unit" => self.parse_simple(id, name, Shape::Unit),
            "blob" => self.parse_simple(id, name, Shape::Blob),
            "boolean" => self.parse_simple(id, name, Shape::Boolean),
            "string" => self.parse_simple(id, name, Shape::String),
            "byte" => self.parse_simple(id, name, Shape::Byte),
            "short" => self.parse_simple(id, name, Shape::Short),
            "integer" => self.parse_simple(id, name, Shape::Integer),
            "long" => self.parse_simple(id, name, Shape::Long),
            "float" => self.parse_simple(id, name, Shape::Float),
            "double" => self.parse_simple(id, name, Shape::Double),
            "bigInteger" => self.parse_simple(id, name, Shape::BigInteger),
            "bigDecimal" => self.parse_simple(id, name, Shape::BigDecimal),
            "timestamp" => self.parse_simple(id, name, Shape::Timestamp),
            "document" => self.parse_simple(id, name, Shape::Document),
            other => Err(ModelError::UnknownType(other.to_string())),
        }
    }

    /// `type: apply` merges traits onto the enclosing id without creating
    /// a shape.
    fn parse_apply(&mut self, id: SmithyId, name: &str) -> Result<()> {
        let mut key = self.reader.next_key()?;
        while let Some(k) = key {
            match k.as_str() {
                "traits" => {
                    let entries = self.parse_traits(name)?;
                    self.model.add_traits(id, entries);
                }
                _ => self.unknown_property(name, &k)?,
            }
            key = self.reader.next_key()?;
        }
        Ok(())
    }

    fn parse_simple(&mut self, id: SmithyId, name: &str, shape: Shape) -> Result<()> {
        let mut key = self.reader.next_key()?;
        while let Some(k) = key {
            match k.as_str() {
                "traits" => {
                    let entries = self.parse_traits(name)?;
                    self.model.add_traits(id, entries);
                }
                "mixins" => {
                    let mixins = self.parse_target_list(name)?;
                    self.model.mixins.insert(id, mixins);
                }
                _ => self.unknown_property(name, &k)?,
            }
            key = self.reader.next_key()?;
        }
        self.model.put_shape(id, name, shape)
    }

    fn parse_aggregate(&mut self, id: SmithyId, name: &str, kind: AggregateKind) -> Result<()> {
        let mut members = Vec::new();
        let mut key = self.reader.next_key()?;
        while let Some(k) = key {
            match k.as_str() {
                "members" => {
                    let mut member_key = self.reader.next_object_begin()?;
                    while let Some(member_name) = member_key {
                        members.push(self.parse_member(name, &member_name)?);
                        member_key = self.reader.next_key()?;
                    }
                }
                "traits" => {
                    let entries = self.parse_traits(name)?;
                    self.model.add_traits(id, entries);
                }
                "mixins" => {
                    let mixins = self.parse_target_list(name)?;
                    self.model.mixins.insert(id, mixins);
                }
                _ => self.unknown_property(name, &k)?,
            }
            key = self.reader.next_key()?;
        }
        let shape = match kind {
            AggregateKind::Structure => Shape::Structure { members },
            AggregateKind::Union => Shape::Union { members },
            AggregateKind::StrEnum => Shape::StrEnum { members },
            AggregateKind::IntEnum => Shape::IntEnum { members },
        };
        self.model.put_shape(id, name, shape)
    }

    fn parse_list(&mut self, id: SmithyId, name: &str) -> Result<()> {
        let mut member = None;
        let mut key = self.reader.next_key()?;
        while let Some(k) = key {
            match k.as_str() {
                "member" => member = Some(self.parse_member(name, "member")?),
                "traits" => {
                    let entries = self.parse_traits(name)?;
                    self.model.add_traits(id, entries);
                }
                "mixins" => {
                    let mixins = self.parse_target_list(name)?;
                    self.model.mixins.insert(id, mixins);
                }
                _ => self.unknown_property(name, &k)?,
            }
            key = self.reader.next_key()?;
        }
        let member = member.ok_or_else(|| ModelError::InvalidMemberTarget(name.to_string()))?;
        self.model.put_shape(id, name, Shape::List { member })
    }

    fn parse_map(&mut self, id: SmithyId, name: &str) -> Result<()> {
        let mut map_key = None;
        let mut map_value = None;
        let mut key = self.reader.next_key()?;
        while let Some(k) = key {
            match k.as_str() {
                "key" => map_key = Some(self.parse_member(name, "key")?),
                "value" => map_value = Some(self.parse_member(name, "value")?),
                "traits" => {
                    let entries = self.parse_traits(name)?;
                    self.model.add_traits(id, entries);
                }
                "mixins" => {
                    let mixins = self.parse_target_list(name)?;
                    self.model.mixins.insert(id, mixins);
                }
                _ => self.unknown_property(name, &k)?,
            }
            key = self.reader.next_key()?;
        }
        let map_key = map_key.ok_or_else(|| ModelError::InvalidMemberTarget(name.to_string()))?;
        let map_value =
            map_value.ok_or_else(|| ModelError::InvalidMemberTarget(name.to_string()))?;
        self.model.put_shape(
            id,
            name,
            Shape::Map {
                key: map_key,
                value: map_value,
            },
        )
    }

    fn parse_service(&mut self, id: SmithyId, name: &str) -> Result<()> {
        let mut service = ServiceShape::default();
        let mut key = self.reader.next_key()?;
        while let Some(k) = key {
            match k.as_str() {
                "version" => service.version = self.reader.next_string()?.to_string(),
                "operations" => service.operations = self.parse_target_list(name)?,
                "resources" => service.resources = self.parse_target_list(name)?,
                "errors" => service.errors = self.parse_target_list(name)?,
                "rename" => {
                    let mut rename_key = self.reader.next_object_begin()?;
                    while let Some(from) = rename_key {
                        let to = self.reader.next_string()?.to_string();
                        service.rename.push((SmithyId::of(&from), to));
                        rename_key = self.reader.next_key()?;
                    }
                }
                "traits" => {
                    let entries = self.parse_traits(name)?;
                    self.model.add_traits(id, entries);
                }
                "mixins" => {
                    let mixins = self.parse_target_list(name)?;
                    self.model.mixins.insert(id, mixins);
                }
                _ => self.unknown_property(name, &k)?,
            }
            key = self.reader.next_key()?;
        }
        self.model.put_shape(id, name, Shape::Service(Box::new(service)))?;
        if self.model.service_id.is_none() {
            self.model.service_id = Some(id);
        }
        Ok(())
    }

    fn parse_resource(&mut self, id: SmithyId, name: &str) -> Result<()> {
        let mut resource = ResourceShape::default();
        let mut key = self.reader.next_key()?;
        while let Some(k) = key {
            match k.as_str() {
                "identifiers" => resource.identifiers = self.parse_named_targets(name)?,
                "properties" => resource.properties = self.parse_named_targets(name)?,
                "create" => resource.create = Some(self.parse_target_object(name)?),
                "put" => resource.put = Some(self.parse_target_object(name)?),
                "read" => resource.read = Some(self.parse_target_object(name)?),
                "update" => resource.update = Some(self.parse_target_object(name)?),
                "delete" => resource.delete = Some(self.parse_target_object(name)?),
                "list" => resource.list = Some(self.parse_target_object(name)?),
                "operations" => resource.operations = self.parse_target_list(name)?,
                "collectionOperations" => {
                    resource.collection_ops = self.parse_target_list(name)?;
                }
                "resources" => resource.resources = self.parse_target_list(name)?,
                "traits" => {
                    let entries = self.parse_traits(name)?;
                    self.model.add_traits(id, entries);
                }
                "mixins" => {
                    let mixins = self.parse_target_list(name)?;
                    self.model.mixins.insert(id, mixins);
                }
                _ => self.unknown_property(name, &k)?,
            }
            key = self.reader.next_key()?;
        }
        self.model
            .put_shape(id, name, Shape::Resource(Box::new(resource)))
    }

    fn parse_operation(&mut self, id: SmithyId, name: &str) -> Result<()> {
        let mut op = OperationShape::default();
        let mut key = self.reader.next_key()?;
        while let Some(k) = key {
            match k.as_str() {
                "input" => op.input = Some(self.parse_target_object(name)?),
                "output" => op.output = Some(self.parse_target_object(name)?),
                "errors" => op.errors = self.parse_target_list(name)?,
                "traits" => {
                    let entries = self.parse_traits(name)?;
                    self.model.add_traits(id, entries);
                }
                "mixins" => {
                    let mixins = self.parse_target_list(name)?;
                    self.model.mixins.insert(id, mixins);
                }
                _ => self.unknown_property(name, &k)?,
            }
            key = self.reader.next_key()?;
        }
        self.model.put_shape(id, name, Shape::Operation(op))
    }

    /// Parse a member object `{ "target": "...", "traits": {...} }` and
    /// record it as `parent$member`.
    fn parse_member(&mut self, parent: &str, member_name: &str) -> Result<SmithyId> {
        let member_id = SmithyId::of_member(parent, member_name);
        let full_name = format!("{parent}${member_name}");
        let mut target = None;
        let mut entries = Vec::new();
        let mut key = self.reader.next_object_begin()?;
        while let Some(k) = key {
            match k.as_str() {
                "target" => target = Some(SmithyId::of(self.reader.next_string()?)),
                "traits" => entries.extend(self.parse_traits(&full_name)?),
                _ => self.unknown_property(&full_name, &k)?,
            }
            key = self.reader.next_key()?;
        }
        let target = target.ok_or_else(|| ModelError::InvalidMemberTarget(full_name.clone()))?;
        self.model
            .put_shape(member_id, &full_name, Shape::Target(target))?;
        if !entries.is_empty() {
            self.model.add_traits(member_id, entries);
        }
        Ok(member_id)
    }

    /// Parse `{ "target": "ns#Name" }`.
    fn parse_target_object(&mut self, context: &str) -> Result<SmithyId> {
        let mut target = None;
        let mut key = self.reader.next_object_begin()?;
        while let Some(k) = key {
            match k.as_str() {
                "target" => target = Some(SmithyId::of(self.reader.next_string()?)),
                _ => self.unknown_property(context, &k)?,
            }
            key = self.reader.next_key()?;
        }
        target.ok_or_else(|| ModelError::InvalidShapeTarget(context.to_string()))
    }

    /// Parse `[ { "target": ... }, ... ]`.
    fn parse_target_list(&mut self, context: &str) -> Result<Vec<SmithyId>> {
        let mut out = Vec::new();
        let mut more = self.reader.next_array_begin()?;
        while more {
            out.push(self.parse_target_object(context)?);
            more = self.reader.next_array_step()?;
        }
        Ok(out)
    }

    /// Parse `{ "name": { "target": ... }, ... }` (resource identifiers
    /// and properties).
    fn parse_named_targets(&mut self, context: &str) -> Result<Vec<(String, SmithyId)>> {
        let mut out = Vec::new();
        let mut key = self.reader.next_object_begin()?;
        while let Some(k) = key {
            let target = self.parse_target_object(context)?;
            out.push((k, target));
            key = self.reader.next_key()?;
        }
        Ok(out)
    }

    /// Parse a `"traits"` object via the registry.
    fn parse_traits(&mut self, context: &str) -> Result<Vec<(SmithyId, TraitValue)>> {
        let mut entries = Vec::new();
        let mut key = self.reader.next_object_begin()?;
        while let Some(trait_name) = key {
            let trait_id = SmithyId::of(&trait_name);
            match self.registry.parse(trait_id, &mut self.reader)? {
                Some(value) => entries.push((trait_id, value)),
                None => {
                    if self.policy.traits == Policy::Abort {
                        return Err(ModelError::UnknownTrait(trait_name));
                    }
                    self.issues
                        .push(IssueKind::UnknownTrait, context, trait_name);
                    self.reader.skip_value()?;
                }
            }
            key = self.reader.next_key()?;
        }
        Ok(entries)
    }

    fn unknown_property(&mut self, context: &str, property: &str) -> Result<()> {
        if self.policy.property == Policy::Abort {
            return Err(ModelError::InvalidShapeProperty {
                context: context.to_string(),
                property: property.to_string(),
            });
        }
        self.issues
            .push(IssueKind::UnknownProperty, context, property);
        self.reader.skip_value()
    }
}

enum AggregateKind {
    Structure,
    Union,
    StrEnum,
    IntEnum,
}

#[cfg(test)]
mod tests {
    use super::*;
    use smithygen_common::Policies;

    fn parse(json: &str) -> Result<Model> {
        let registry = TraitRegistry::builtin();
        let opts = ParseOptions {
            registry: &registry,
            policy: Policies::default().parse,
        };
        let mut issues = IssuesBag::new();
        parse_model(json.as_bytes(), &opts, &mut issues)
    }

    #[test]
    fn rejects_wrong_version() {
        let err = parse(r#"{"smithy": "1.0", "shapes": {}}"#).unwrap_err();
        assert!(matches!(err, ModelError::InvalidVersion(v) if v == "1.0"));
    }

    #[test]
    fn rejects_missing_version() {
        let err = parse(r#"{"shapes": {}}"#).unwrap_err();
        assert!(matches!(err, ModelError::InvalidVersion(_)));
    }

    #[test]
    fn parses_structure_with_members() {
        let model = parse(
            r#"{
                "smithy": "2.0",
                "shapes": {
                    "com.example#Item": {
                        "type": "structure",
                        "members": {
                            "name": {"target": "smithy.api#String", "traits": {"smithy.api#required": {}}},
                            "count": {"target": "smithy.api#Integer"}
                        }
                    }
                }
            }"#,
        )
        .unwrap();
        let id = SmithyId::of("com.example#Item");
        let Shape::Structure { members } = model.shape(id).unwrap() else {
            panic!("expected structure");
        };
        assert_eq!(members.len(), 2);
        let name_member = SmithyId::of("com.example#Item$name");
        assert_eq!(members[0], name_member);
        assert!(matches!(
            model.shape(name_member).unwrap(),
            Shape::Target(t) if *t == SmithyId::STRING
        ));
        assert!(model.trait_bag(name_member).is_required());
    }

    #[test]
    fn apply_merges_traits_without_creating_shape() {
        let model = parse(
            r#"{
                "smithy": "2",
                "shapes": {
                    "com.example#Item": {"type": "structure", "members": {}},
                    "com.example#Item$later": {
                        "type": "apply",
                        "traits": {"smithy.api#documentation": "added later"}
                    }
                }
            }"#,
        )
        .unwrap();
        let applied = SmithyId::of("com.example#Item$later");
        assert!(model.shapes.get(&applied).is_none());
        assert_eq!(
            model.trait_bag(applied).documentation(),
            Some("added later")
        );
    }

    #[test]
    fn parses_service_operation_resource() {
        let model = parse(
            r#"{
                "smithy": "2.0",
                "shapes": {
                    "com.example#Svc": {
                        "type": "service",
                        "version": "2024-01-01",
                        "operations": [{"target": "com.example#DoStuff"}],
                        "resources": [{"target": "com.example#Thing"}]
                    },
                    "com.example#DoStuff": {
                        "type": "operation",
                        "input": {"target": "smithy.api#Unit"},
                        "output": {"target": "smithy.api#Unit"},
                        "errors": [{"target": "com.example#OopsError"}]
                    },
                    "com.example#Thing": {
                        "type": "resource",
                        "identifiers": {"id": {"target": "smithy.api#String"}},
                        "read": {"target": "com.example#DoStuff"}
                    },
                    "com.example#OopsError": {
                        "type": "structure",
                        "members": {},
                        "traits": {"smithy.api#error": "client"}
                    }
                }
            }"#,
        )
        .unwrap();
        let svc = SmithyId::of("com.example#Svc");
        assert_eq!(model.service_id, Some(svc));
        let Shape::Service(service) = model.shape(svc).unwrap() else {
            panic!("expected service");
        };
        assert_eq!(service.version, "2024-01-01");
        assert_eq!(service.operations.len(), 1);
        let Shape::Resource(resource) =
            model.shape(SmithyId::of("com.example#Thing")).unwrap()
        else {
            panic!("expected resource");
        };
        assert_eq!(resource.identifiers[0].0, "id");
        assert!(resource.read.is_some());
    }

    #[test]
    fn unknown_trait_policy_skip_records_issue() {
        let registry = TraitRegistry::builtin();
        let opts = ParseOptions {
            registry: &registry,
            policy: ParsePolicy {
                property: Policy::Abort,
                traits: Policy::Skip,
            },
        };
        let mut issues = IssuesBag::new();
        let model = parse_model(
            br#"{
                "smithy": "2.0",
                "shapes": {
                    "com.example#S": {
                        "type": "string",
                        "traits": {"com.example#mystery": {"a": 1}}
                    }
                }
            }"#,
            &opts,
            &mut issues,
        )
        .unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues.entries()[0].item, "com.example#mystery");
        assert!(!model.trait_bag(SmithyId::of("com.example#S")).has(
            SmithyId::hashed("com.example#mystery")
        ));
    }

    #[test]
    fn unknown_trait_policy_abort_fails() {
        let registry = TraitRegistry::builtin();
        let opts = ParseOptions {
            registry: &registry,
            policy: ParsePolicy {
                property: Policy::Abort,
                traits: Policy::Abort,
            },
        };
        let mut issues = IssuesBag::new();
        let err = parse_model(
            br#"{
                "smithy": "2.0",
                "shapes": {
                    "com.example#S": {"type": "string", "traits": {"com.example#mystery": {}}}
                }
            }"#,
            &opts,
            &mut issues,
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::UnknownTrait(t) if t == "com.example#mystery"));
    }

    #[test]
    fn unknown_property_policy_skip() {
        let registry = TraitRegistry::builtin();
        let opts = ParseOptions {
            registry: &registry,
            policy: ParsePolicy {
                property: Policy::Skip,
                traits: Policy::Abort,
            },
        };
        let mut issues = IssuesBag::new();
        parse_model(
            br#"{
                "smithy": "2.0",
                "surprise": {"nested": [1, 2, 3]},
                "shapes": {}
            }"#,
            &opts,
            &mut issues,
        )
        .unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues.entries()[0].item, "surprise");
    }

    #[test]
    fn metadata_is_preserved() {
        let model = parse(
            r#"{"smithy": "2.0", "metadata": {"suppressions": [{"id": "X"}]}, "shapes": {}}"#,
        )
        .unwrap();
        assert!(model.meta.contains_key("suppressions"));
    }
}
