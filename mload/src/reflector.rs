use std::collections::HashMap;
use std::str::FromStr;

use crate::errors::{ConfigError, SchemaError};
use crate::schema::{FieldDef, Schema, SchemaType, TypeKind};

pub const DEFAULT_LIST_SUFFIX: &str = "Connection";

/// Decides whether a field holds a collection.
pub trait ListPredicate: Send + Sync {
    fn is_list(&self, field: &FieldDef) -> bool;
}

/// The configurable list predicates.
///
/// `Wrapped` only trusts the `[T]` wrapper; `Suffix` treats any field whose
/// named type ends with the suffix (e.g. a `UserConnection` page type) as a
/// list; `Either` accepts both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ListRule {
    #[default]
    Wrapped,
    Suffix(String),
    Either(String),
}

impl ListRule {
    /// Builds a rule from its configuration name and an optional suffix.
    pub fn from_name(name: &str, suffix: Option<&str>) -> Result<Self, ConfigError> {
        let suffix = suffix.unwrap_or(DEFAULT_LIST_SUFFIX).to_string();
        match name.to_ascii_lowercase().as_str() {
            "wrapped" => Ok(ListRule::Wrapped),
            "suffix" => Ok(ListRule::Suffix(suffix)),
            "either" => Ok(ListRule::Either(suffix)),
            other => Err(ConfigError::UnknownListRule(other.to_string())),
        }
    }
}

impl FromStr for ListRule {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s, None)
    }
}

impl ListPredicate for ListRule {
    fn is_list(&self, field: &FieldDef) -> bool {
        match self {
            ListRule::Wrapped => field.type_ref.is_list(),
            ListRule::Suffix(suffix) => field.type_ref.named_type().ends_with(suffix.as_str()),
            ListRule::Either(suffix) => {
                field.type_ref.is_list() || field.type_ref.named_type().ends_with(suffix.as_str())
            }
        }
    }
}

/// The classification of one field of one type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub owner: String,
    pub name: String,
    pub named_type: String,
    pub is_list: bool,
    pub is_non_null: bool,
    pub is_object_type: bool,
    /// Kind of the named type; `None` for built-in scalars.
    pub kind: Option<TypeKind>,
    /// Allowed values when the named type is an enum.
    pub enum_values: Vec<String>,
}

impl FieldInfo {
    pub fn is_enum(&self) -> bool {
        self.kind == Some(TypeKind::Enum)
    }

    pub fn is_input_object(&self) -> bool {
        self.kind == Some(TypeKind::InputObject)
    }

    pub fn has_enum_value(&self, value: &str) -> bool {
        self.enum_values.iter().any(|allowed| allowed == value)
    }
}

/// Answers type and field questions about a schema, caching field
/// classifications for as long as it lives.
pub struct SchemaReflector<'s> {
    schema: &'s Schema,
    predicate: Box<dyn ListPredicate>,
    cache: HashMap<(String, String), FieldInfo>,
}

impl<'s> SchemaReflector<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self::with_predicate(schema, ListRule::default())
    }

    pub fn with_predicate(schema: &'s Schema, predicate: impl ListPredicate + 'static) -> Self {
        Self {
            schema,
            predicate: Box::new(predicate),
            cache: HashMap::new(),
        }
    }

    pub fn schema(&self) -> &'s Schema {
        self.schema
    }

    pub fn get_type(&self, name: &str) -> Option<&'s SchemaType> {
        self.schema.get_type(name)
    }

    pub fn require_type(&self, name: &str) -> Result<&'s SchemaType, SchemaError> {
        self.get_type(name)
            .ok_or_else(|| SchemaError::TypeNotFound(name.to_string()))
    }

    /// Looks up and classifies `field_name` on `type_name`.
    pub fn field(&mut self, type_name: &str, field_name: &str) -> Result<FieldInfo, SchemaError> {
        let key = (type_name.to_string(), field_name.to_string());
        if let Some(info) = self.cache.get(&key) {
            return Ok(info.clone());
        }

        let owner = self.require_type(type_name)?;
        let field = owner
            .field(field_name)
            .ok_or_else(|| SchemaError::UndefinedField {
                type_name: type_name.to_string(),
                field: field_name.to_string(),
            })?;

        let info = self.classify(owner, field);
        self.cache.insert(key, info.clone());
        Ok(info)
    }

    fn classify(&self, owner: &SchemaType, field: &FieldDef) -> FieldInfo {
        let named_type = field.type_ref.named_type();
        let target = self.schema.get_type(named_type);
        let kind = target.map(|ty| ty.kind);
        let enum_values = target
            .filter(|ty| ty.kind == TypeKind::Enum)
            .map(|ty| ty.enum_values.clone())
            .unwrap_or_default();
        FieldInfo {
            owner: owner.name.clone(),
            name: field.name.clone(),
            named_type: named_type.to_string(),
            is_list: self.predicate.is_list(field),
            is_non_null: field.type_ref.is_non_null(),
            is_object_type: kind.is_some_and(TypeKind::is_object_like),
            kind,
            enum_values,
        }
    }

    #[cfg(test)]
    fn cached(&self) -> usize {
        self.cache.len()
    }
}
