use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use gqlfetcher::GraphQLTransport;
use graphql_parser::schema as sdl;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::{Result, SchemaError};

/// A field's declared type, with list and non-null wrappers preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    /// The innermost type name after stripping every wrapper.
    pub fn named_type(&self) -> &str {
        match self {
            TypeRef::Named(name) => name,
            TypeRef::List(inner) | TypeRef::NonNull(inner) => inner.named_type(),
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, TypeRef::NonNull(_))
    }

    /// True when the outermost non-null-stripped wrapper is a list.
    pub fn is_list(&self) -> bool {
        match self {
            TypeRef::List(_) => true,
            TypeRef::NonNull(inner) => inner.is_list(),
            TypeRef::Named(_) => false,
        }
    }

    fn from_sdl(ty: &sdl::Type<'_, String>) -> Self {
        match ty {
            sdl::Type::NamedType(name) => TypeRef::Named(name.clone()),
            sdl::Type::ListType(inner) => TypeRef::List(Box::new(Self::from_sdl(inner))),
            sdl::Type::NonNullType(inner) => TypeRef::NonNull(Box::new(Self::from_sdl(inner))),
        }
    }

    fn from_introspection(ty: &IntrospectionTypeRef) -> std::result::Result<Self, SchemaError> {
        let inner = || {
            ty.of_type
                .as_deref()
                .ok_or_else(|| SchemaError::Parse(format!("{} type reference without ofType", ty.kind)))
                .and_then(Self::from_introspection)
        };
        match ty.kind.as_str() {
            "NON_NULL" => Ok(TypeRef::NonNull(Box::new(inner()?))),
            "LIST" => Ok(TypeRef::List(Box::new(inner()?))),
            _ => ty
                .name
                .clone()
                .map(TypeRef::Named)
                .ok_or_else(|| SchemaError::Parse(format!("unnamed {} type reference", ty.kind))),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(name) => write!(f, "{name}"),
            TypeRef::List(inner) => write!(f, "[{inner}]"),
            TypeRef::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
}

impl TypeKind {
    /// Object-like kinds are the ones whose fields describe relations.
    pub fn is_object_like(self) -> bool {
        matches!(self, TypeKind::Object | TypeKind::Interface | TypeKind::Union)
    }

    fn from_introspection(kind: &str) -> Option<Self> {
        match kind {
            "SCALAR" => Some(TypeKind::Scalar),
            "OBJECT" => Some(TypeKind::Object),
            "INTERFACE" => Some(TypeKind::Interface),
            "UNION" => Some(TypeKind::Union),
            "ENUM" => Some(TypeKind::Enum),
            "INPUT_OBJECT" => Some(TypeKind::InputObject),
            _ => None,
        }
    }
}

/// An argument of a field, or a field of an input object.
#[derive(Debug, Clone, PartialEq)]
pub struct InputValueDef {
    pub name: String,
    pub type_ref: TypeRef,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub type_ref: TypeRef,
    pub arguments: Vec<InputValueDef>,
    pub description: Option<String>,
}

/// A named type of the schema. Input objects keep their input fields in
/// `fields` (without arguments) so lookups work the same for every kind.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaType {
    pub name: String,
    pub kind: TypeKind,
    pub fields: Vec<FieldDef>,
    pub enum_values: Vec<String>,
    pub description: Option<String>,
}

impl SchemaType {
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }

    fn empty(name: &str, kind: TypeKind, description: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            fields: Vec::new(),
            enum_values: Vec::new(),
            description,
        }
    }
}

/// The loaded schema graph: every named type plus the mutation root.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    types: HashMap<String, SchemaType>,
    mutation_type: Option<String>,
}

impl Schema {
    /// Parses GraphQL SDL text.
    pub fn from_sdl(text: &str) -> std::result::Result<Self, SchemaError> {
        let document = sdl::parse_schema::<String>(text)
            .map_err(|err| SchemaError::Parse(err.to_string()))?;

        let mut schema = Schema::default();
        let mut declared_mutation = None;

        for definition in &document.definitions {
            match definition {
                sdl::Definition::SchemaDefinition(root) => {
                    declared_mutation = root.mutation.clone();
                }
                sdl::Definition::TypeDefinition(type_def) => {
                    let schema_type = convert_type_definition(type_def);
                    schema.types.insert(schema_type.name.clone(), schema_type);
                }
                sdl::Definition::TypeExtension(sdl::TypeExtension::Object(extension)) => {
                    let entry = schema
                        .types
                        .entry(extension.name.clone())
                        .or_insert_with(|| SchemaType::empty(&extension.name, TypeKind::Object, None));
                    entry.fields.extend(extension.fields.iter().map(convert_field));
                }
                _ => {}
            }
        }

        schema.mutation_type = declared_mutation
            .or_else(|| schema.types.contains_key("Mutation").then(|| "Mutation".to_string()));
        Ok(schema)
    }

    /// Builds the schema from an introspection result, accepting either the
    /// full response (`{ data: { __schema } }`) or just `{ __schema }`.
    pub fn from_introspection(value: &Value) -> std::result::Result<Self, SchemaError> {
        let raw = value
            .get("data")
            .unwrap_or(value)
            .get("__schema")
            .ok_or_else(|| SchemaError::Parse("introspection result has no __schema".to_string()))?;
        let introspected: IntrospectionSchema = serde_json::from_value(raw.clone())
            .map_err(|err| SchemaError::Parse(err.to_string()))?;

        let mut schema = Schema {
            types: HashMap::new(),
            mutation_type: introspected.mutation_type.map(|root| root.name),
        };

        for ty in introspected.types {
            if ty.name.starts_with("__") {
                continue;
            }
            let Some(kind) = TypeKind::from_introspection(&ty.kind) else {
                return Err(SchemaError::Parse(format!(
                    "type '{}' has unknown kind '{}'",
                    ty.name, ty.kind
                )));
            };
            let mut schema_type = SchemaType::empty(&ty.name, kind, ty.description);
            for field in ty.fields.unwrap_or_default() {
                schema_type.fields.push(FieldDef {
                    name: field.name,
                    type_ref: TypeRef::from_introspection(&field.type_ref)?,
                    arguments: field
                        .args
                        .unwrap_or_default()
                        .iter()
                        .map(IntrospectionInputValue::to_def)
                        .collect::<std::result::Result<_, _>>()?,
                    description: field.description,
                });
            }
            for input in ty.input_fields.unwrap_or_default() {
                schema_type.fields.push(FieldDef {
                    type_ref: TypeRef::from_introspection(&input.type_ref)?,
                    name: input.name,
                    arguments: Vec::new(),
                    description: input.description,
                });
            }
            schema_type.enum_values = ty
                .enum_values
                .unwrap_or_default()
                .into_iter()
                .map(|value| value.name)
                .collect();
            schema.types.insert(schema_type.name.clone(), schema_type);
        }

        Ok(schema)
    }

    /// Reads a schema file: `.json` is treated as an introspection result,
    /// anything else as SDL.
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path).await?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let schema = if is_json {
            let value: Value = serde_json::from_str(&text)?;
            Self::from_introspection(&value)?
        } else {
            Self::from_sdl(&text)?
        };
        log::debug!("Loaded {} types from {}", schema.types.len(), path.display());
        Ok(schema)
    }

    /// Fetches the schema from a live endpoint.
    pub async fn introspect(transport: &dyn GraphQLTransport) -> Result<Self> {
        let data = gqlfetcher::introspect(transport).await?;
        let schema = Self::from_introspection(&data)?;
        log::debug!("Introspected {} types", schema.types.len());
        Ok(schema)
    }

    pub fn get_type(&self, name: &str) -> Option<&SchemaType> {
        self.types.get(name)
    }

    /// True when `name` is an object, interface or union declared in the
    /// schema. Built-in scalars are never declared and so are never objects.
    pub fn is_object_type(&self, name: &str) -> bool {
        self.get_type(name).is_some_and(|ty| ty.kind.is_object_like())
    }

    pub fn mutation_type(&self) -> Option<&SchemaType> {
        self.mutation_type.as_deref().and_then(|name| self.get_type(name))
    }

    pub fn mutation(&self, name: &str) -> std::result::Result<&FieldDef, SchemaError> {
        self.mutation_type()
            .and_then(|root| root.field(name))
            .ok_or_else(|| SchemaError::MutationNotFound(name.to_string()))
    }

    /// Resolves the input object taken by `mutation`, which must have exactly
    /// one argument and that argument must be called `input`.
    pub fn input_type(&self, mutation: &FieldDef) -> std::result::Result<&SchemaType, SchemaError> {
        let [argument] = mutation.arguments.as_slice() else {
            return Err(SchemaError::InputArgumentMissing(mutation.name.clone()));
        };
        if argument.name != "input" {
            return Err(SchemaError::InputArgumentMissing(mutation.name.clone()));
        }
        let named = argument.type_ref.named_type();
        self.get_type(named)
            .ok_or_else(|| SchemaError::TypeNotFound(named.to_string()))
    }
}

fn convert_field(field: &sdl::Field<'_, String>) -> FieldDef {
    FieldDef {
        name: field.name.clone(),
        type_ref: TypeRef::from_sdl(&field.field_type),
        arguments: field.arguments.iter().map(convert_input_value).collect(),
        description: field.description.clone(),
    }
}

fn convert_input_value(value: &sdl::InputValue<'_, String>) -> InputValueDef {
    InputValueDef {
        name: value.name.clone(),
        type_ref: TypeRef::from_sdl(&value.value_type),
    }
}

fn convert_type_definition(type_def: &sdl::TypeDefinition<'_, String>) -> SchemaType {
    match type_def {
        sdl::TypeDefinition::Scalar(scalar) => {
            SchemaType::empty(&scalar.name, TypeKind::Scalar, scalar.description.clone())
        }
        sdl::TypeDefinition::Object(object) => SchemaType {
            fields: object.fields.iter().map(convert_field).collect(),
            ..SchemaType::empty(&object.name, TypeKind::Object, object.description.clone())
        },
        sdl::TypeDefinition::Interface(interface) => SchemaType {
            fields: interface.fields.iter().map(convert_field).collect(),
            ..SchemaType::empty(&interface.name, TypeKind::Interface, interface.description.clone())
        },
        sdl::TypeDefinition::Union(union_type) => {
            SchemaType::empty(&union_type.name, TypeKind::Union, union_type.description.clone())
        }
        sdl::TypeDefinition::Enum(enumeration) => SchemaType {
            enum_values: enumeration.values.iter().map(|v| v.name.clone()).collect(),
            ..SchemaType::empty(&enumeration.name, TypeKind::Enum, enumeration.description.clone())
        },
        sdl::TypeDefinition::InputObject(input) => SchemaType {
            fields: input
                .fields
                .iter()
                .map(|value| FieldDef {
                    name: value.name.clone(),
                    type_ref: TypeRef::from_sdl(&value.value_type),
                    arguments: Vec::new(),
                    description: value.description.clone(),
                })
                .collect(),
            ..SchemaType::empty(&input.name, TypeKind::InputObject, input.description.clone())
        },
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntrospectionSchema {
    mutation_type: Option<NamedRef>,
    types: Vec<IntrospectionType>,
}

#[derive(Deserialize)]
struct NamedRef {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntrospectionType {
    kind: String,
    name: String,
    description: Option<String>,
    fields: Option<Vec<IntrospectionField>>,
    input_fields: Option<Vec<IntrospectionInputValue>>,
    enum_values: Option<Vec<NamedRef>>,
}

#[derive(Deserialize)]
struct IntrospectionField {
    name: String,
    description: Option<String>,
    args: Option<Vec<IntrospectionInputValue>>,
    #[serde(rename = "type")]
    type_ref: IntrospectionTypeRef,
}

#[derive(Deserialize)]
struct IntrospectionInputValue {
    name: String,
    description: Option<String>,
    #[serde(rename = "type")]
    type_ref: IntrospectionTypeRef,
}

impl IntrospectionInputValue {
    fn to_def(&self) -> std::result::Result<InputValueDef, SchemaError> {
        Ok(InputValueDef {
            name: self.name.clone(),
            type_ref: TypeRef::from_introspection(&self.type_ref)?,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntrospectionTypeRef {
    kind: String,
    name: Option<String>,
    of_type: Option<Box<IntrospectionTypeRef>>,
}
