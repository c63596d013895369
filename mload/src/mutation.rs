//! Builds composite mutation documents for a batch of records.

use crate::classify::{ID_FIELD, classify_record, raw_id};
use crate::coerce::CoerceOptions;
use crate::errors::{RecordError, SchemaError};
use crate::reader::Record;
use crate::reflector::SchemaReflector;
use crate::schema::{FieldDef, Schema, SchemaType};
use crate::utils::id::normalize_id;
use crate::value::{FieldValue, Scalar, object_to_graphql};

/// What each aliased mutation selects from its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Id,
    Typename,
    None,
}

impl Selection {
    fn for_return_type(schema: &Schema, field: &FieldDef) -> Self {
        match schema.get_type(field.type_ref.named_type()) {
            Some(ty) if ty.kind.is_object_like() && ty.field(ID_FIELD).is_some() => Selection::Id,
            Some(ty) if ty.kind.is_object_like() => Selection::Typename,
            _ => Selection::None,
        }
    }

    fn render(self) -> &'static str {
        match self {
            Selection::Id => " { id }",
            Selection::Typename => " { __typename }",
            Selection::None => "",
        }
    }
}

/// A mutation resolved against the schema, ready to receive batches.
#[derive(Debug, Clone)]
pub struct MutationTarget<'s> {
    pub field: &'s FieldDef,
    pub input_type: &'s SchemaType,
    /// `input: [T]` takes the whole batch in one call; otherwise each record
    /// gets its own aliased call.
    pub input_is_list: bool,
    pub selection: Selection,
}

impl<'s> MutationTarget<'s> {
    pub fn resolve(schema: &'s Schema, mutation: &str) -> Result<Self, SchemaError> {
        let field = schema.mutation(mutation)?;
        let input_type = schema.input_type(field)?;
        let input_is_list = field
            .arguments
            .first()
            .is_some_and(|arg| arg.type_ref.is_list());
        Ok(Self {
            field,
            input_type,
            input_is_list,
            selection: Selection::for_return_type(schema, field),
        })
    }

    pub fn name(&self) -> &str {
        &self.field.name
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuiltMutation {
    pub text: String,
    /// Result keys in `data`, one per call in the document.
    pub aliases: Vec<String>,
    pub records: usize,
    pub warnings: Vec<String>,
}

/// Builds one mutation document for `records`. Any record that does not fit
/// the input type fails the whole batch.
pub fn build_mutation(
    reflector: &mut SchemaReflector<'_>,
    target: &MutationTarget<'_>,
    records: &[Record],
    options: CoerceOptions,
) -> Result<BuiltMutation, RecordError> {
    let input_type = target.input_type.name.as_str();
    let declares_id = target.input_type.field(ID_FIELD).is_some();

    let mut warnings = Vec::new();
    let mut literals = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let mut classified = classify_record(reflector, input_type, record, options)?;
        let mut fields = Vec::with_capacity(classified.fields.len() + 1);
        if declares_id {
            if let Some(id) = raw_id(record) {
                fields.push((
                    ID_FIELD.to_string(),
                    FieldValue::Scalar(Scalar::String(normalize_id(&id))),
                ));
            }
        }
        fields.append(&mut classified.fields);
        warnings.extend(
            classified
                .warnings
                .into_iter()
                .map(|warning| format!("record {index}: {warning}")),
        );
        literals.push(object_to_graphql(&fields));
    }

    let name = target.name();
    let selection = target.selection.render();
    let (text, aliases) = if target.input_is_list {
        (
            format!("mutation {{ m0: {name}(input: [{}]){selection} }}", literals.join(", ")),
            vec!["m0".to_string()],
        )
    } else {
        let aliases: Vec<String> = (0..literals.len()).map(|i| format!("m{i}")).collect();
        let calls: Vec<String> = aliases
            .iter()
            .zip(&literals)
            .map(|(alias, literal)| format!("{alias}: {name}(input: {literal}){selection}"))
            .collect();
        (format!("mutation {{ {} }}", calls.join(" ")), aliases)
    };

    Ok(BuiltMutation {
        text,
        aliases,
        records: records.len(),
        warnings,
    })
}
