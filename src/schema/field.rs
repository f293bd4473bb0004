use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Serialize, Serializer};

/// One JSON base type. Declaration order is alphabetical, which is the
/// order tokens are rendered in a union.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BaseType {
    Array,
    Boolean,
    Null,
    Number,
    Object,
    String,
}

impl BaseType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Array => "array",
            Self::Boolean => "boolean",
            Self::Null => "null",
            Self::Number => "number",
            Self::Object => "object",
            Self::String => "string",
        }
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A union of base types such as `number | string` or `object | null`.
///
/// Rendered as its tokens in alphabetical order joined by `" | "`. A type
/// made nullable by adding `null` to a non-null type keeps `null` at the
/// end (`"string | null"`) until a union with a different type re-sorts it.
/// Equality and hashing look at the set of types only.
#[derive(Debug, Clone)]
pub struct TypeSet {
    types: BTreeSet<BaseType>,
    null_last: bool,
}

impl TypeSet {
    pub fn single(base: BaseType) -> Self {
        Self {
            types: BTreeSet::from([base]),
            null_last: false,
        }
    }

    pub fn contains(&self, base: BaseType) -> bool {
        self.types.contains(&base)
    }

    /// Exactly `null`, not a union that includes it.
    pub fn is_null(&self) -> bool {
        self.types.len() == 1 && self.contains(BaseType::Null)
    }

    /// Append `null`; a no-op when it is already a member.
    pub fn nullable(mut self) -> Self {
        if self.types.insert(BaseType::Null) {
            self.null_last = true;
        }
        self
    }

    pub fn with(mut self, base: BaseType) -> Self {
        self.types.insert(base);
        self
    }

    /// Set union, rendered fully sorted.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            types: self.types.union(&other.types).copied().collect(),
            null_last: false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = BaseType> + '_ {
        self.types.iter().copied()
    }
}

impl PartialEq for TypeSet {
    fn eq(&self, other: &Self) -> bool {
        self.types == other.types
    }
}

impl Eq for TypeSet {}

impl std::hash::Hash for TypeSet {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.types.hash(state);
    }
}

impl fmt::Display for TypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let trailing_null = self.null_last && self.contains(BaseType::Null);
        let tokens = self
            .types
            .iter()
            .filter(|t| !(trailing_null && **t == BaseType::Null))
            .chain(trailing_null.then_some(&BaseType::Null));
        for (i, token) in tokens.enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            f.write_str(token.as_str())?;
        }
        Ok(())
    }
}

impl Serialize for TypeSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Inferred structural schema for one JSON value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaField {
    #[serde(rename = "type")]
    pub ty: TypeSet,
    /// Present only for object types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, SchemaField>>,
    /// Present only for arrays that have been seen with at least one element
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaField>>,
    /// Present with a non-null value in every observation merged so far.
    /// `None` reads as required.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

impl SchemaField {
    pub fn leaf(base: BaseType) -> Self {
        Self::of(TypeSet::single(base))
    }

    pub fn of(ty: TypeSet) -> Self {
        Self {
            ty,
            properties: None,
            items: None,
            required: None,
        }
    }

    /// Only an explicit `false` makes a field optional.
    pub fn is_required(&self) -> bool {
        self.required != Some(false)
    }

    pub fn property(&self, name: &str) -> Option<&SchemaField> {
        self.properties.as_ref()?.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nullable_appends_null() {
        let ty = TypeSet::single(BaseType::String).nullable();
        assert_eq!(ty.to_string(), "string | null");
        assert_eq!(ty.clone().nullable().to_string(), "string | null");
        assert_eq!(TypeSet::single(BaseType::Null).to_string(), "null");
    }

    #[test]
    fn union_renders_fully_sorted() {
        let nullable = TypeSet::single(BaseType::String).nullable();
        let ty = nullable.union(&TypeSet::single(BaseType::Number));
        assert_eq!(ty.to_string(), "null | number | string");

        let plain = TypeSet::single(BaseType::String).with(BaseType::Boolean);
        assert_eq!(plain.to_string(), "boolean | string");
    }

    #[test]
    fn equality_ignores_render_order() {
        let appended = TypeSet::single(BaseType::String).nullable();
        let sorted = TypeSet::single(BaseType::Null).union(&TypeSet::single(BaseType::String));
        assert_ne!(appended.to_string(), sorted.to_string());
        assert_eq!(appended, sorted);
    }

    #[test]
    fn null_only_vs_nullable() {
        assert!(TypeSet::single(BaseType::Null).is_null());
        assert!(!TypeSet::single(BaseType::Object).with(BaseType::Null).is_null());
    }

    #[test]
    fn serializes_type_as_string_and_skips_absent_keys() {
        let field = SchemaField::leaf(BaseType::Array);
        assert_eq!(serde_json::to_string(&field).unwrap(), r#"{"type":"array"}"#);
    }
}
