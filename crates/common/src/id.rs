//! Interned 64-bit shape ids
//!
//! Every Smithy shape name maps deterministically to a `SmithyId`. The
//! smithy.api prelude shapes and the shape-type keywords occupy reserved
//! low constants; every other absolute name (`ns#Name` or `ns#Name$member`)
//! hashes with FNV-1a. Hashed ids always carry the high bit, so the two
//! ranges cannot overlap.

use std::fmt;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Bit forced onto every hashed id.
const HASHED: u64 = 1 << 63;

/// Interned identifier for a shape, member, or trait.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SmithyId(u64);

impl SmithyId {
    pub const UNIT: SmithyId = SmithyId(0x01);
    pub const BLOB: SmithyId = SmithyId(0x02);
    pub const BOOLEAN: SmithyId = SmithyId(0x03);
    pub const STRING: SmithyId = SmithyId(0x04);
    pub const BYTE: SmithyId = SmithyId(0x05);
    pub const SHORT: SmithyId = SmithyId(0x06);
    pub const INTEGER: SmithyId = SmithyId(0x07);
    pub const LONG: SmithyId = SmithyId(0x08);
    pub const FLOAT: SmithyId = SmithyId(0x09);
    pub const DOUBLE: SmithyId = SmithyId(0x0a);
    pub const BIG_INTEGER: SmithyId = SmithyId(0x0b);
    pub const BIG_DECIMAL: SmithyId = SmithyId(0x0c);
    pub const TIMESTAMP: SmithyId = SmithyId(0x0d);
    pub const DOCUMENT: SmithyId = SmithyId(0x0e);
    pub const PRIMITIVE_BOOLEAN: SmithyId = SmithyId(0x0f);
    pub const PRIMITIVE_BYTE: SmithyId = SmithyId(0x10);
    pub const PRIMITIVE_SHORT: SmithyId = SmithyId(0x11);
    pub const PRIMITIVE_INTEGER: SmithyId = SmithyId(0x12);
    pub const PRIMITIVE_LONG: SmithyId = SmithyId(0x13);
    pub const PRIMITIVE_FLOAT: SmithyId = SmithyId(0x14);
    pub const PRIMITIVE_DOUBLE: SmithyId = SmithyId(0x15);
    pub const LIST: SmithyId = SmithyId(0x16);
    pub const MAP: SmithyId = SmithyId(0x17);
    pub const STRUCTURE: SmithyId = SmithyId(0x18);
    pub const UNION: SmithyId = SmithyId(0x19);
    pub const ENUM: SmithyId = SmithyId(0x1a);
    pub const INT_ENUM: SmithyId = SmithyId(0x1b);
    pub const OPERATION: SmithyId = SmithyId(0x1c);
    pub const RESOURCE: SmithyId = SmithyId(0x1d);
    pub const SERVICE: SmithyId = SmithyId(0x1e);
    pub const MEMBER: SmithyId = SmithyId(0x1f);
    pub const APPLY: SmithyId = SmithyId(0x20);

    /// Intern an absolute shape name or shape-type keyword.
    pub fn of(name: &str) -> SmithyId {
        match name {
            "unit" | "smithy.api#Unit" => Self::UNIT,
            "blob" | "smithy.api#Blob" => Self::BLOB,
            "boolean" | "smithy.api#Boolean" => Self::BOOLEAN,
            "string" | "smithy.api#String" => Self::STRING,
            "byte" | "smithy.api#Byte" => Self::BYTE,
            "short" | "smithy.api#Short" => Self::SHORT,
            "integer" | "smithy.api#Integer" => Self::INTEGER,
            "long" | "smithy.api#Long" => Self::LONG,
            "float" | "smithy.api#Float" => Self::FLOAT,
            "double" | "smithy.api#Double" => Self::DOUBLE,
            "bigInteger" | "smithy.api#BigInteger" => Self::BIG_INTEGER,
            "bigDecimal" | "smithy.api#BigDecimal" => Self::BIG_DECIMAL,
            "timestamp" | "smithy.api#Timestamp" => Self::TIMESTAMP,
            "document" | "smithy.api#Document" => Self::DOCUMENT,
            "smithy.api#PrimitiveBoolean" => Self::PRIMITIVE_BOOLEAN,
            "smithy.api#PrimitiveByte" => Self::PRIMITIVE_BYTE,
            "smithy.api#PrimitiveShort" => Self::PRIMITIVE_SHORT,
            "smithy.api#PrimitiveInteger" => Self::PRIMITIVE_INTEGER,
            "smithy.api#PrimitiveLong" => Self::PRIMITIVE_LONG,
            "smithy.api#PrimitiveFloat" => Self::PRIMITIVE_FLOAT,
            "smithy.api#PrimitiveDouble" => Self::PRIMITIVE_DOUBLE,
            "list" | "set" => Self::LIST,
            "map" => Self::MAP,
            "structure" => Self::STRUCTURE,
            "union" => Self::UNION,
            "enum" => Self::ENUM,
            "intEnum" => Self::INT_ENUM,
            "operation" => Self::OPERATION,
            "resource" => Self::RESOURCE,
            "service" => Self::SERVICE,
            "member" => Self::MEMBER,
            "apply" => Self::APPLY,
            _ => SmithyId(hash(name.as_bytes())),
        }
    }

    /// Intern a name known not to be a reserved constant (trait ids,
    /// user shapes). `const`, so trait ids can live in constants.
    pub const fn hashed(name: &str) -> SmithyId {
        SmithyId(hash(name.as_bytes()))
    }

    /// Intern a member id without building the `parent$member` string.
    pub fn of_member(parent: &str, member: &str) -> SmithyId {
        let mut h = FNV_OFFSET;
        for &b in parent.as_bytes() {
            h = (h ^ b as u64).wrapping_mul(FNV_PRIME);
        }
        h = (h ^ b'$' as u64).wrapping_mul(FNV_PRIME);
        for &b in member.as_bytes() {
            h = (h ^ b as u64).wrapping_mul(FNV_PRIME);
        }
        SmithyId(h | HASHED)
    }

    /// Whether this id is one of the reserved prelude/type constants.
    pub const fn is_reserved(self) -> bool {
        self.0 & HASHED == 0
    }

    /// Whether this id names a simple (scalar) prelude shape.
    pub const fn is_primitive(self) -> bool {
        self.0 >= Self::UNIT.0 && self.0 <= Self::PRIMITIVE_DOUBLE.0
    }

    /// The raw interned value.
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

const fn hash(bytes: &[u8]) -> u64 {
    let mut h = FNV_OFFSET;
    let mut i = 0;
    while i < bytes.len() {
        h = (h ^ bytes[i] as u64).wrapping_mul(FNV_PRIME);
        i += 1;
    }
    h | HASHED
}

impl fmt::Debug for SmithyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SmithyId({:#018x})", self.0)
    }
}

impl fmt::Display for SmithyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_constants() {
        assert_eq!(SmithyId::of("smithy.api#String"), SmithyId::STRING);
        assert_eq!(SmithyId::of("string"), SmithyId::STRING);
        assert_eq!(SmithyId::of("structure"), SmithyId::STRUCTURE);
        assert_eq!(SmithyId::of("intEnum"), SmithyId::INT_ENUM);
        assert!(SmithyId::STRING.is_reserved());
        assert!(SmithyId::STRING.is_primitive());
        assert!(!SmithyId::STRUCTURE.is_primitive());
    }

    #[test]
    fn hashed_ids_are_stable_and_distinct() {
        let a = SmithyId::of("com.example#Foo");
        let b = SmithyId::of("com.example#Foo");
        let c = SmithyId::of("com.example#Bar");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(!a.is_reserved());
    }

    #[test]
    fn member_composition_matches_full_name() {
        let composed = SmithyId::of_member("com.example#Foo", "bar");
        let full = SmithyId::of("com.example#Foo$bar");
        assert_eq!(composed, full);
    }

    #[test]
    fn hashes_never_collide_with_reserved() {
        for name in ["com.example#A", "ns#B$m", "x#y"] {
            assert!(!SmithyId::of(name).is_reserved());
        }
    }
}
