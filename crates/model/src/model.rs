//! The mutable shape graph owned by the parser

use std::collections::{BTreeMap, HashMap};

use smithygen_common::SmithyId;

use crate::error::{ModelError, Result};
use crate::traits::{self, TraitBag, TraitValue};

/// A Smithy shape. Aggregate members are edges to member ids; the member
/// shape itself is a `Target` alias pointing at the member's target type.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Unit,
    Blob,
    Boolean,
    String,
    Byte,
    Short,
    Integer,
    Long,
    Float,
    Double,
    BigInteger,
    BigDecimal,
    Timestamp,
    Document,
    Target(SmithyId),
    List { member: SmithyId },
    Map { key: SmithyId, value: SmithyId },
    Structure { members: Vec<SmithyId> },
    Union { members: Vec<SmithyId> },
    StrEnum { members: Vec<SmithyId> },
    IntEnum { members: Vec<SmithyId> },
    Operation(OperationShape),
    Resource(Box<ResourceShape>),
    Service(Box<ServiceShape>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationShape {
    pub input: Option<SmithyId>,
    pub output: Option<SmithyId>,
    pub errors: Vec<SmithyId>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceShape {
    pub identifiers: Vec<(String, SmithyId)>,
    pub properties: Vec<(String, SmithyId)>,
    pub create: Option<SmithyId>,
    pub put: Option<SmithyId>,
    pub read: Option<SmithyId>,
    pub update: Option<SmithyId>,
    pub delete: Option<SmithyId>,
    pub list: Option<SmithyId>,
    pub operations: Vec<SmithyId>,
    pub collection_ops: Vec<SmithyId>,
    pub resources: Vec<SmithyId>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceShape {
    pub version: String,
    pub operations: Vec<SmithyId>,
    pub resources: Vec<SmithyId>,
    pub errors: Vec<SmithyId>,
    pub rename: Vec<(SmithyId, String)>,
}

/// The raw model: five maps keyed by interned id, plus the service root.
#[derive(Debug, Default)]
pub struct Model {
    pub meta: BTreeMap<String, serde_json::Value>,
    pub shapes: HashMap<SmithyId, Shape>,
    pub names: HashMap<SmithyId, String>,
    pub traits: HashMap<SmithyId, Vec<(SmithyId, TraitValue)>>,
    pub mixins: HashMap<SmithyId, Vec<SmithyId>>,
    pub service_id: Option<SmithyId>,
}

impl Model {
    pub fn new() -> Self {
        let mut model = Model::default();
        model.seed_primitive_defaults();
        model
    }

    /// The smithy.api#Primitive* shapes implicitly carry a `default` trait
    /// with the zero value of their kind.
    fn seed_primitive_defaults(&mut self) {
        use serde_json::json;
        let zeros = [
            (SmithyId::PRIMITIVE_BOOLEAN, json!(false)),
            (SmithyId::PRIMITIVE_BYTE, json!(0)),
            (SmithyId::PRIMITIVE_SHORT, json!(0)),
            (SmithyId::PRIMITIVE_INTEGER, json!(0)),
            (SmithyId::PRIMITIVE_LONG, json!(0)),
            (SmithyId::PRIMITIVE_FLOAT, json!(0.0)),
            (SmithyId::PRIMITIVE_DOUBLE, json!(0.0)),
        ];
        for (id, zero) in zeros {
            self.traits
                .insert(id, vec![(traits::ids::DEFAULT, TraitValue::Default(zero))]);
        }
    }

    /// Record a shape under `id`, checking the name map for hash
    /// collisions (distinct names mapping to one id are fatal).
    pub fn put_shape(&mut self, id: SmithyId, name: &str, shape: Shape) -> Result<()> {
        if let Some(existing) = self.names.get(&id) {
            if existing != name {
                return Err(ModelError::IdCollision(existing.clone(), name.to_string()));
            }
        } else {
            self.names.insert(id, name.to_string());
        }
        self.shapes.insert(id, shape);
        Ok(())
    }

    /// Append traits to a shape; repeated `apply` merges are concatenative.
    pub fn add_traits(&mut self, id: SmithyId, entries: Vec<(SmithyId, TraitValue)>) {
        self.traits.entry(id).or_default().extend(entries);
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

    pub fn trait_bag(&self, id: SmithyId) -> TraitBag<'_> {
        self.traits
            .get(&id)
            .map(|entries| TraitBag::new(entries))
            .unwrap_or(TraitBag::EMPTY)
    }

    /// The shape's name when known, otherwise its raw id.
    pub fn display_name(&self, id: SmithyId) -> String {
        self.names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ids;

    #[test]
    fn put_shape_records_name_and_shape() {
        let mut model = Model::new();
        let id = SmithyId::of("com.example#Foo");
        model
            .put_shape(id, "com.example#Foo", Shape::Structure { members: vec![] })
            .unwrap();
        assert_eq!(model.name(id).unwrap(), "com.example#Foo");
        assert!(matches!(model.shape(id).unwrap(), Shape::Structure { .. }));
    }

    #[test]
    fn apply_merges_append() {
        let mut model = Model::new();
        let id = SmithyId::of("com.example#Foo");
        model.add_traits(id, vec![(ids::REQUIRED, TraitValue::Unit)]);
        model.add_traits(id, vec![(ids::SPARSE, TraitValue::Unit)]);
        let bag = model.trait_bag(id);
        assert!(bag.has(ids::REQUIRED));
        assert!(bag.has(ids::SPARSE));
    }

    #[test]
    fn primitive_defaults_are_seeded() {
        let model = Model::new();
        let bag = model.trait_bag(SmithyId::PRIMITIVE_INTEGER);
        assert!(bag.has_default());
        assert!(!model.trait_bag(SmithyId::INTEGER).has_default());
    }

    #[test]
    fn missing_shape_reports_id() {
        let model = Model::new();
        let err = model.shape(SmithyId::of("com.example#Nope")).unwrap_err();
        assert!(matches!(err, ModelError::ShapeNotFound(_)));
    }
}
