use std::collections::{BTreeMap, HashSet};

use crate::firestore::api::field_value::FieldValueKind;
use crate::firestore::api::{FieldValue, UserData};
use crate::firestore::error::{internal_error, invalid_argument, FirestoreError, FirestoreResult};
use crate::firestore::model::{
    DatabaseId, DocumentKey, FieldMask, FieldPath, FieldTransform, IntoFieldPath, Mutation,
    ObjectValue, Precondition, TransformOperation,
};
use crate::firestore::value::FirestoreValue;

/// Options that configure how a `set` write treats existing document data.
#[derive(Clone, Debug, Default)]
pub struct SetOptions {
    /// When `true`, the provided data is merged into the existing document.
    pub merge: bool,
    /// Explicit field mask that should be merged. When set, this takes
    /// precedence over the `merge` flag.
    pub merge_fields: Option<Vec<FieldPath>>,
}

impl SetOptions {
    /// Merges every field present in the provided data.
    pub fn merge_all() -> Self {
        Self {
            merge: true,
            merge_fields: None,
        }
    }

    /// Merges only the given field paths. Duplicates are dropped.
    pub fn merge_fields<I, P>(fields: I) -> FirestoreResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: IntoFieldPath,
    {
        let mut unique = Vec::new();
        let mut seen = HashSet::new();
        for field in fields {
            let field = field.into_field_path()?;
            if seen.insert(field.canonical_string()) {
                unique.push(field);
            }
        }
        if unique.is_empty() {
            return Err(invalid_argument(
                "merge_fields requires at least one field path",
            ));
        }
        Ok(Self {
            merge: false,
            merge_fields: Some(unique),
        })
    }

    pub fn is_merge(&self) -> bool {
        self.merge || self.merge_fields.is_some()
    }
}

/// Where parsed data is going to be used. Decides which sentinels and field
/// names are legal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserDataSource {
    Set,
    MergeSet,
    Update,
    /// Query filter and cursor values.
    Argument,
    /// The operand of an `in` style filter, whose elements may themselves be
    /// arrays.
    ArrayArgument,
}

impl UserDataSource {
    fn is_write(self) -> bool {
        matches!(
            self,
            UserDataSource::Set | UserDataSource::MergeSet | UserDataSource::Update
        )
    }
}

/// Output of a `set` parse. `field_mask` is only present for merges.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedSetData {
    pub data: ObjectValue,
    pub field_mask: Option<FieldMask>,
    pub field_transforms: Vec<FieldTransform>,
}

impl ParsedSetData {
    pub fn to_mutation(&self, key: DocumentKey, precondition: Precondition) -> Mutation {
        let mutation = match &self.field_mask {
            Some(mask) => Mutation::patch(key, self.data.clone(), mask.clone(), precondition),
            None => Mutation::set(key, self.data.clone(), precondition),
        };
        mutation.with_transforms(self.field_transforms.clone())
    }
}

/// Output of an `update` parse.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedUpdateData {
    pub data: ObjectValue,
    pub field_mask: FieldMask,
    pub field_transforms: Vec<FieldTransform>,
}

impl ParsedUpdateData {
    pub fn to_mutation(&self, key: DocumentKey, precondition: Precondition) -> Mutation {
        Mutation::patch(
            key,
            self.data.clone(),
            self.field_mask.clone(),
            precondition,
        )
        .with_transforms(self.field_transforms.clone())
    }
}

impl From<ParsedUpdateData> for ParsedSetData {
    fn from(parsed: ParsedUpdateData) -> Self {
        Self {
            data: parsed.data,
            field_mask: Some(parsed.field_mask),
            field_transforms: parsed.field_transforms,
        }
    }
}

/// Turns [`UserData`] into validated values, collecting the field mask and
/// the transforms that sentinels ask for along the way.
#[derive(Clone, Debug)]
pub struct UserDataReader {
    database_id: DatabaseId,
}

impl UserDataReader {
    pub fn new(database_id: DatabaseId) -> Self {
        Self { database_id }
    }

    pub fn database_id(&self) -> &DatabaseId {
        &self.database_id
    }

    /// Parses a whole document for the given source.
    ///
    /// Writes use the matching set/update rules. Argument sources parse the
    /// map without producing a mask or transforms.
    pub fn parse(
        &self,
        method_name: &str,
        input: &UserData,
        source: UserDataSource,
    ) -> FirestoreResult<ParsedSetData> {
        match source {
            UserDataSource::Set => self.parse_set_data(method_name, input, &SetOptions::default()),
            UserDataSource::MergeSet => {
                self.parse_set_data(method_name, input, &SetOptions::merge_all())
            }
            UserDataSource::Update => self.parse_update_data(method_name, input).map(Into::into),
            UserDataSource::Argument | UserDataSource::ArrayArgument => {
                let mut accumulator = ParseAccumulator::default();
                let mut context =
                    ParseContext::root(source, method_name, &self.database_id, &mut accumulator);
                let fields = require_object(input, &context)?;
                let data = parse_object(fields, &mut context)?;
                Ok(ParsedSetData {
                    data: ObjectValue::from_map(data),
                    field_mask: None,
                    field_transforms: Vec::new(),
                })
            }
        }
    }

    pub fn parse_set_data(
        &self,
        method_name: &str,
        input: &UserData,
        options: &SetOptions,
    ) -> FirestoreResult<ParsedSetData> {
        let source = if options.is_merge() {
            UserDataSource::MergeSet
        } else {
            UserDataSource::Set
        };
        let mut accumulator = ParseAccumulator::default();
        let data = {
            let mut context =
                ParseContext::root(source, method_name, &self.database_id, &mut accumulator);
            let fields = require_object(input, &context)?;
            parse_object(fields, &mut context)?
        };
        let ParseAccumulator {
            field_mask,
            field_transforms,
        } = accumulator;

        let (field_mask, field_transforms) = match &options.merge_fields {
            Some(merge_fields) => {
                let mut validated = Vec::new();
                for path in merge_fields {
                    let traversed = field_mask.iter().any(|field| path.is_prefix_of(field))
                        || field_transforms
                            .iter()
                            .any(|transform| path.is_prefix_of(transform.field()));
                    if !traversed {
                        return Err(invalid_argument(format!(
                            "Field '{path}' is specified in your field mask but missing from your input data."
                        )));
                    }
                    validated.push(path.clone());
                }
                let mask = FieldMask::new(validated);
                let transforms = field_transforms
                    .into_iter()
                    .filter(|transform| mask.covers(transform.field()))
                    .collect();
                (Some(mask), transforms)
            }
            None if options.merge => (Some(FieldMask::new(field_mask)), field_transforms),
            None => (None, field_transforms),
        };

        Ok(ParsedSetData {
            data: ObjectValue::from_map(data),
            field_mask,
            field_transforms,
        })
    }

    /// Parses a merge `set` restricted to `merge_fields`.
    pub fn parse_merge_data<I, P>(
        &self,
        method_name: &str,
        input: &UserData,
        merge_fields: I,
    ) -> FirestoreResult<ParsedSetData>
    where
        I: IntoIterator<Item = P>,
        P: IntoFieldPath,
    {
        let options = SetOptions::merge_fields(merge_fields)?;
        self.parse_set_data(method_name, input, &options)
    }

    /// Parses an update given as a map whose keys are dot-separated paths.
    pub fn parse_update_data(
        &self,
        method_name: &str,
        input: &UserData,
    ) -> FirestoreResult<ParsedUpdateData> {
        let mut accumulator = ParseAccumulator::default();
        let mut context = ParseContext::root(
            UserDataSource::Update,
            method_name,
            &self.database_id,
            &mut accumulator,
        );
        let fields = require_object(input, &context)?;

        let mut entries = Vec::with_capacity(fields.len());
        for (key, value) in fields {
            let path = FieldPath::from_dot_separated(key)
                .map_err(|err| context.error(err.message()))?;
            entries.push((path, value));
        }
        let (data, field_mask) = parse_update_entries(entries, &mut context)?;
        drop(context);

        Ok(ParsedUpdateData {
            data,
            field_mask,
            field_transforms: accumulator.field_transforms,
        })
    }

    /// Parses an update given as field/value pairs. When a field appears more
    /// than once the last value wins.
    pub fn parse_update_varargs<I, P, V>(
        &self,
        method_name: &str,
        pairs: I,
    ) -> FirestoreResult<ParsedUpdateData>
    where
        I: IntoIterator<Item = (P, V)>,
        P: IntoFieldPath,
        V: Into<UserData>,
    {
        let mut accumulator = ParseAccumulator::default();
        let mut context = ParseContext::root(
            UserDataSource::Update,
            method_name,
            &self.database_id,
            &mut accumulator,
        );

        let mut parsed_pairs = Vec::new();
        for (path, value) in pairs {
            let path = path
                .into_field_path()
                .map_err(|err| context.error(err.message()))?;
            parsed_pairs.push((path, value.into()));
        }

        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        for (path, value) in parsed_pairs.iter().rev() {
            if seen.insert(path.clone()) {
                entries.push((path.clone(), value));
            }
        }
        let (data, field_mask) = parse_update_entries(entries, &mut context)?;
        drop(context);

        Ok(ParsedUpdateData {
            data,
            field_mask,
            field_transforms: accumulator.field_transforms,
        })
    }

    /// Parses a filter or cursor value. `allow_arrays` permits arrays nested
    /// directly in the operand, as used by `in` filters.
    pub fn parse_query_value(
        &self,
        method_name: &str,
        input: &UserData,
        allow_arrays: bool,
    ) -> FirestoreResult<FirestoreValue> {
        let source = if allow_arrays {
            UserDataSource::ArrayArgument
        } else {
            UserDataSource::Argument
        };
        let mut accumulator = ParseAccumulator::default();
        let mut context =
            ParseContext::root(source, method_name, &self.database_id, &mut accumulator);
        parse_data(input, &mut context)?
            .ok_or_else(|| internal_error("Parsed query value should not be empty"))
    }
}

#[derive(Debug, Default)]
struct ParseAccumulator {
    field_mask: Vec<FieldPath>,
    field_transforms: Vec<FieldTransform>,
}

/// Position of the parser inside the input. `path` is `None` inside arrays,
/// where field-level masks and transforms are not supported.
struct ParseContext<'a> {
    source: UserDataSource,
    method_name: &'a str,
    path: Option<FieldPath>,
    array_element: bool,
    database_id: &'a DatabaseId,
    accumulator: &'a mut ParseAccumulator,
}

impl<'a> ParseContext<'a> {
    fn root(
        source: UserDataSource,
        method_name: &'a str,
        database_id: &'a DatabaseId,
        accumulator: &'a mut ParseAccumulator,
    ) -> Self {
        Self {
            source,
            method_name,
            path: Some(FieldPath::empty()),
            array_element: false,
            database_id,
            accumulator,
        }
    }

    fn with_path(&mut self, path: Option<FieldPath>, array_element: bool) -> ParseContext<'_> {
        ParseContext {
            source: self.source,
            method_name: self.method_name,
            path,
            array_element,
            database_id: self.database_id,
            accumulator: &mut *self.accumulator,
        }
    }

    fn child_for_field(&mut self, field: &str) -> FirestoreResult<ParseContext<'_>> {
        let path = self.path.as_ref().map(|path| path.child(field));
        let child = self.with_path(path, false);
        child.validate_segment(field)?;
        Ok(child)
    }

    fn child_for_field_path(&mut self, field: &FieldPath) -> FirestoreResult<ParseContext<'_>> {
        let path = self.path.as_ref().map(|path| path.append(field));
        let child = self.with_path(path, false);
        for segment in field.segments() {
            child.validate_segment(segment)?;
        }
        Ok(child)
    }

    fn child_for_array(&mut self) -> ParseContext<'_> {
        self.with_path(None, true)
    }

    fn validate_segment(&self, segment: &str) -> FirestoreResult<()> {
        if segment.is_empty() {
            return Err(self.error("Document fields must not be empty"));
        }
        if self.source.is_write() && is_reserved_field_name(segment) {
            return Err(self.error("Document fields cannot begin and end with \"__\""));
        }
        Ok(())
    }

    fn record_mask(&mut self) {
        if let Some(path) = &self.path {
            self.accumulator.field_mask.push(path.clone());
        }
    }

    fn error(&self, reason: impl AsRef<str>) -> FirestoreError {
        let mut message = format!(
            "Function {}() called with invalid data. {}",
            self.method_name,
            reason.as_ref()
        );
        if let Some(path) = self.path.as_ref().filter(|path| !path.is_empty()) {
            message.push_str(&format!(" (found in field {path})"));
        }
        invalid_argument(message)
    }
}

fn is_reserved_field_name(segment: &str) -> bool {
    segment.len() >= 4 && segment.starts_with("__") && segment.ends_with("__")
}

fn require_object<'d>(
    input: &'d UserData,
    context: &ParseContext<'_>,
) -> FirestoreResult<&'d BTreeMap<String, UserData>> {
    match input {
        UserData::Map(fields) => Ok(fields),
        other => Err(context.error(format!(
            "Data must be an object, but it was: {}",
            other.describe()
        ))),
    }
}

fn parse_update_entries(
    entries: Vec<(FieldPath, &UserData)>,
    context: &mut ParseContext<'_>,
) -> FirestoreResult<(ObjectValue, FieldMask)> {
    let mut mask = Vec::new();
    let mut data = ObjectValue::empty();
    for (path, value) in entries {
        let mut child = context.child_for_field_path(&path)?;
        if matches!(value, UserData::FieldValue(sentinel) if sentinel.is_delete()) {
            mask.push(path);
            continue;
        }
        if let Some(parsed) = parse_data(value, &mut child)? {
            data.set(&path, parsed);
            mask.push(path);
        }
    }
    Ok((data, FieldMask::new(mask)))
}

/// Returns `None` for sentinels, which never appear in the parsed tree.
fn parse_data(
    input: &UserData,
    context: &mut ParseContext<'_>,
) -> FirestoreResult<Option<FirestoreValue>> {
    match input {
        UserData::Map(fields) => Ok(Some(FirestoreValue::from_map(parse_object(
            fields, context,
        )?))),
        UserData::FieldValue(sentinel) => {
            parse_sentinel(sentinel, context)?;
            Ok(None)
        }
        UserData::Array(values) => {
            context.record_mask();
            if context.array_element && context.source != UserDataSource::ArrayArgument {
                return Err(context.error("Nested arrays are not supported"));
            }
            parse_array(values, context).map(Some)
        }
        scalar => {
            context.record_mask();
            parse_scalar(scalar, context).map(Some)
        }
    }
}

fn parse_object(
    fields: &BTreeMap<String, UserData>,
    context: &mut ParseContext<'_>,
) -> FirestoreResult<BTreeMap<String, FirestoreValue>> {
    let mut parsed = BTreeMap::new();
    if fields.is_empty() {
        // An empty map still has to reach the backend.
        if context.path.as_ref().is_some_and(|path| !path.is_empty()) {
            context.record_mask();
        }
        return Ok(parsed);
    }
    for (key, value) in fields {
        let mut child = context.child_for_field(key)?;
        if let Some(value) = parse_data(value, &mut child)? {
            parsed.insert(key.clone(), value);
        }
    }
    Ok(parsed)
}

fn parse_array(
    values: &[UserData],
    context: &mut ParseContext<'_>,
) -> FirestoreResult<FirestoreValue> {
    let mut parsed = Vec::with_capacity(values.len());
    for value in values {
        let mut child = context.child_for_array();
        parsed.push(parse_data(value, &mut child)?.unwrap_or_else(FirestoreValue::null));
    }
    Ok(FirestoreValue::from_array(parsed))
}

fn parse_sentinel(sentinel: &FieldValue, context: &mut ParseContext<'_>) -> FirestoreResult<()> {
    let method = sentinel.method_name();
    if !context.source.is_write() {
        return Err(context.error(format!(
            "{method}() can only be used with update() and set()"
        )));
    }
    let Some(path) = context.path.clone() else {
        return Err(context.error(format!(
            "{method}() is not currently supported inside arrays"
        )));
    };

    let transform = match sentinel.kind() {
        FieldValueKind::Delete => {
            return match context.source {
                UserDataSource::MergeSet => {
                    context.accumulator.field_mask.push(path);
                    Ok(())
                }
                UserDataSource::Update => Err(context.error(format!(
                    "{method}() can only appear at the top level of your update data"
                ))),
                _ => Err(context.error(format!(
                    "{method}() cannot be used with set() unless you pass merge: true"
                ))),
            };
        }
        FieldValueKind::ServerTimestamp => TransformOperation::ServerTimestamp,
        FieldValueKind::ArrayUnion(elements) => {
            TransformOperation::ArrayUnion(parse_sentinel_elements(method, elements, context)?)
        }
        FieldValueKind::ArrayRemove(elements) => {
            TransformOperation::ArrayRemove(parse_sentinel_elements(method, elements, context)?)
        }
        FieldValueKind::Increment(operand) => match operand.as_ref() {
            UserData::Integer(value) => {
                TransformOperation::NumericIncrement(FirestoreValue::from_integer(*value))
            }
            UserData::Double(value) => {
                TransformOperation::NumericIncrement(FirestoreValue::from_double(*value))
            }
            other => {
                return Err(context.error(format!(
                    "{method}() requires a numeric operand, but it was: {}",
                    other.describe()
                )))
            }
        },
    };
    context
        .accumulator
        .field_transforms
        .push(FieldTransform::new(path, transform));
    Ok(())
}

/// Elements of array sentinels are plain arguments: they may not contain
/// sentinels or nested arrays, and they never touch the caller's mask.
fn parse_sentinel_elements(
    method: &str,
    elements: &[UserData],
    context: &ParseContext<'_>,
) -> FirestoreResult<Vec<FirestoreValue>> {
    let mut accumulator = ParseAccumulator::default();
    let mut element_context = ParseContext {
        source: UserDataSource::Argument,
        method_name: method,
        path: None,
        array_element: true,
        database_id: context.database_id,
        accumulator: &mut accumulator,
    };
    let mut parsed = Vec::with_capacity(elements.len());
    for element in elements {
        parsed.push(parse_data(element, &mut element_context)?.unwrap_or_else(FirestoreValue::null));
    }
    Ok(parsed)
}

fn parse_scalar(input: &UserData, context: &ParseContext<'_>) -> FirestoreResult<FirestoreValue> {
    Ok(match input {
        UserData::Null => FirestoreValue::null(),
        UserData::Boolean(value) => FirestoreValue::from_bool(*value),
        UserData::Integer(value) => FirestoreValue::from_integer(*value),
        UserData::Double(value) => FirestoreValue::from_double(*value),
        UserData::String(value) => FirestoreValue::from_string(value.clone()),
        UserData::Bytes(value) => FirestoreValue::from_bytes(value.clone()),
        UserData::Timestamp(value) => {
            value
                .validate()
                .map_err(|err| context.error(err.message()))?;
            // Stored with microsecond precision by the backend.
            FirestoreValue::from_timestamp(value.truncate_to_micros())
        }
        UserData::GeoPoint(value) => FirestoreValue::from_geo_point(*value),
        UserData::Reference(reference) => {
            let other = reference.database_id();
            if other != context.database_id {
                return Err(context.error(format!(
                    "Document reference is for database {}/{} but should be for database {}/{}",
                    other.project_id(),
                    other.database(),
                    context.database_id.project_id(),
                    context.database_id.database()
                )));
            }
            FirestoreValue::reference(other.clone(), reference.key().clone())
        }
        other => {
            return Err(context.error(format!(
                "Unsupported field value: {}",
                other.describe()
            )))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firestore::api::DocumentReference;
    use crate::firestore::model::{GeoPoint, Timestamp};
    use crate::firestore::test_support::{array, field_path, map, test_db};

    fn reader() -> UserDataReader {
        UserDataReader::new(test_db())
    }

    fn data<const N: usize>(entries: [(&str, UserData); N]) -> UserData {
        UserData::map(entries)
    }

    fn int(value: i64) -> FirestoreValue {
        FirestoreValue::from_integer(value)
    }

    #[test]
    fn set_without_merge_has_no_mask() {
        let parsed = reader()
            .parse_set_data(
                "setDoc",
                &data([("a", UserData::from(1_i64)), ("b", data([("c", "x".into())]))]),
                &SetOptions::default(),
            )
            .unwrap();
        assert!(parsed.field_mask.is_none());
        assert_eq!(
            parsed.data.value(),
            &map(vec![
                ("a", int(1)),
                ("b", map(vec![("c", FirestoreValue::from_string("x"))]))
            ])
        );
    }

    #[test]
    fn set_rejects_non_objects() {
        let err = reader()
            .parse_set_data("setDoc", &UserData::from(1_i64), &SetOptions::default())
            .unwrap_err();
        assert_eq!(
            err.message(),
            "Function setDoc() called with invalid data. Data must be an object, but it was: a number (1)"
        );
    }

    #[test]
    fn server_timestamp_becomes_transform() {
        let parsed = reader()
            .parse_set_data(
                "setDoc",
                &data([
                    ("a", UserData::from(1_i64)),
                    ("b", data([("when", FieldValue::server_timestamp().into())])),
                ]),
                &SetOptions::default(),
            )
            .unwrap();
        assert_eq!(parsed.data.field(&field_path("b")), Some(&map(vec![])));
        assert_eq!(
            parsed.field_transforms,
            vec![FieldTransform::new(
                field_path("b.when"),
                TransformOperation::ServerTimestamp
            )]
        );
    }

    #[test]
    fn delete_requires_merge_or_update() {
        let input = data([("a", FieldValue::delete().into())]);
        let err = reader()
            .parse_set_data("setDoc", &input, &SetOptions::default())
            .unwrap_err();
        assert!(err
            .message()
            .contains("FieldValue.delete() cannot be used with set() unless you pass merge: true"));
        assert!(err.message().ends_with("(found in field a)"));

        let merged = reader()
            .parse_set_data("setDoc", &input, &SetOptions::merge_all())
            .unwrap();
        assert_eq!(merged.field_mask, Some(FieldMask::new(vec![field_path("a")])));
        assert!(merged.data.is_empty());
        assert!(merged.field_transforms.is_empty());
    }

    #[test]
    fn merge_mask_lists_leaves_and_empty_maps() {
        let parsed = reader()
            .parse_set_data(
                "setDoc",
                &data([
                    ("a", data([("b", 1_i64.into())])),
                    ("e", data([])),
                    ("t", FieldValue::server_timestamp().into()),
                ]),
                &SetOptions::merge_all(),
            )
            .unwrap();
        assert_eq!(
            parsed.field_mask,
            Some(FieldMask::new(vec![field_path("a.b"), field_path("e")]))
        );
        assert_eq!(parsed.field_transforms.len(), 1);
    }

    #[test]
    fn merge_fields_filter_transforms_and_require_presence() {
        let input = data([
            ("a", 1_i64.into()),
            ("b", FieldValue::server_timestamp().into()),
            ("c", FieldValue::increment(1_i64).into()),
        ]);
        let options = SetOptions::merge_fields(["a", "b"]).unwrap();
        let parsed = reader().parse_set_data("setDoc", &input, &options).unwrap();
        assert_eq!(
            parsed.field_mask,
            Some(FieldMask::new(vec![field_path("a"), field_path("b")]))
        );
        assert_eq!(parsed.field_transforms.len(), 1);
        assert_eq!(parsed.field_transforms[0].field(), &field_path("b"));

        let err = reader()
            .parse_merge_data("setDoc", &input, ["missing"])
            .unwrap_err();
        assert_eq!(
            err.message(),
            "Field 'missing' is specified in your field mask but missing from your input data."
        );
    }

    #[test]
    fn sentinels_inside_arrays_are_rejected() {
        let input = data([("a", UserData::Array(vec![FieldValue::server_timestamp().into()]))]);
        let err = reader()
            .parse_set_data("setDoc", &input, &SetOptions::default())
            .unwrap_err();
        assert!(err
            .message()
            .contains("FieldValue.serverTimestamp() is not currently supported inside arrays"));
    }

    #[test]
    fn nested_arrays_are_rejected_except_for_array_arguments() {
        let nested = UserData::from(vec![UserData::from(vec![1_i64])]);
        let err = reader()
            .parse_set_data("setDoc", &data([("a", nested.clone())]), &SetOptions::default())
            .unwrap_err();
        assert!(err.message().contains("Nested arrays are not supported"));

        let value = reader().parse_query_value("where", &nested, true).unwrap();
        assert_eq!(value, array(vec![array(vec![int(1)])]));
        assert!(reader().parse_query_value("where", &nested, false).is_err());
    }

    #[test]
    fn reserved_names_only_rejected_for_writes() {
        let input = data([("__secret__", 1_i64.into())]);
        let err = reader()
            .parse_set_data("setDoc", &input, &SetOptions::default())
            .unwrap_err();
        assert!(err.message().contains("Document fields cannot begin and end with \"__\""));
        assert!(err.message().contains("(found in field __secret__)"));

        let parsed = reader()
            .parse("where", &input, UserDataSource::Argument)
            .unwrap();
        assert_eq!(parsed.data.field(&field_path("__secret__")), Some(&int(1)));
    }

    #[test]
    fn empty_field_names_are_rejected() {
        let err = reader()
            .parse_set_data("setDoc", &data([("", 1_i64.into())]), &SetOptions::default())
            .unwrap_err();
        assert!(err.message().contains("Document fields must not be empty"));
    }

    #[test]
    fn sentinels_rejected_in_queries() {
        let err = reader()
            .parse_query_value("where", &FieldValue::delete().into(), false)
            .unwrap_err();
        assert_eq!(
            err.message(),
            "Function where() called with invalid data. FieldValue.delete() can only be used with update() and set()"
        );
    }

    #[test]
    fn update_paths_and_deletes() {
        let parsed = reader()
            .parse_update_data(
                "updateDoc",
                &data([
                    ("a.b", 1_i64.into()),
                    ("c", FieldValue::delete().into()),
                    ("d", FieldValue::increment(2_i64).into()),
                ]),
            )
            .unwrap();
        assert_eq!(
            parsed.field_mask,
            FieldMask::new(vec![field_path("a.b"), field_path("c")])
        );
        assert_eq!(parsed.data.field(&field_path("a.b")), Some(&int(1)));
        assert_eq!(parsed.data.field(&field_path("c")), None);
        assert_eq!(
            parsed.field_transforms,
            vec![FieldTransform::new(
                field_path("d"),
                TransformOperation::NumericIncrement(int(2))
            )]
        );
    }

    #[test]
    fn nested_delete_in_update_is_rejected() {
        let err = reader()
            .parse_update_data("updateDoc", &data([("a", data([("b", FieldValue::delete().into())]))]))
            .unwrap_err();
        assert_eq!(
            err.message(),
            "Function updateDoc() called with invalid data. FieldValue.delete() can only appear at the top level of your update data (found in field a.b)"
        );
    }

    #[test]
    fn update_rejects_invalid_paths() {
        let err = reader()
            .parse_update_data("updateDoc", &data([("a..b", 1_i64.into())]))
            .unwrap_err();
        assert!(err.message().starts_with("Function updateDoc() called with invalid data. Invalid field path (a..b)"));
    }

    #[test]
    fn varargs_last_value_wins() {
        let parsed = reader()
            .parse_update_varargs(
                "updateDoc",
                vec![
                    ("a", UserData::from(1_i64)),
                    ("b", UserData::from("x")),
                    ("a", UserData::from(2_i64)),
                ],
            )
            .unwrap();
        assert_eq!(parsed.data.field(&field_path("a")), Some(&int(2)));
        assert_eq!(parsed.field_mask.len(), 2);
    }

    #[test]
    fn array_union_elements_are_arguments() {
        let parsed = reader()
            .parse_update_data(
                "updateDoc",
                &data([("tags", FieldValue::array_union(vec!["a", "b"]).into())]),
            )
            .unwrap();
        assert!(parsed.field_mask.is_empty());
        assert_eq!(
            parsed.field_transforms[0].transform(),
            &TransformOperation::ArrayUnion(vec![
                FirestoreValue::from_string("a"),
                FirestoreValue::from_string("b")
            ])
        );

        let err = reader()
            .parse_update_data(
                "updateDoc",
                &data([(
                    "tags",
                    FieldValue::array_remove(vec![UserData::from(vec![1_i64])]).into(),
                )]),
            )
            .unwrap_err();
        assert!(err.message().contains("Function FieldValue.arrayRemove() called with invalid data. Nested arrays are not supported"));
    }

    #[test]
    fn increment_requires_a_number() {
        let err = reader()
            .parse_update_data("updateDoc", &data([("n", FieldValue::increment("one").into())]))
            .unwrap_err();
        assert!(err.message().contains("FieldValue.increment() requires a numeric operand"));
    }

    #[test]
    fn timestamps_are_truncated_to_micros() {
        let parsed = reader()
            .parse_set_data(
                "setDoc",
                &data([("t", Timestamp::new(1, 123_456_789).into())]),
                &SetOptions::default(),
            )
            .unwrap();
        assert_eq!(
            parsed.data.field(&field_path("t")),
            Some(&FirestoreValue::from_timestamp(Timestamp::new(1, 123_456_000)))
        );
    }

    #[test]
    fn timestamps_with_unnormalized_nanos_are_rejected() {
        let input = data([(
            "t",
            UserData::Timestamp(Timestamp {
                seconds: 0,
                nanos: 2_000_000_000,
            }),
        )]);
        let err = reader()
            .parse_set_data("setDoc", &input, &SetOptions::default())
            .unwrap_err();
        assert_eq!(err.code_str(), "firestore/invalid-argument");
        assert!(err
            .message()
            .contains("Timestamp nanoseconds out of range: 2000000000 (found in field t)"));
    }

    #[test]
    fn references_must_match_database() {
        let foreign = DocumentReference::from_path(DatabaseId::default("other"), "c/d").unwrap();
        let err = reader()
            .parse_set_data("setDoc", &data([("r", foreign.into())]), &SetOptions::default())
            .unwrap_err();
        assert!(err.message().contains(
            "Document reference is for database other/(default) but should be for database test-project/(default)"
        ));

        let local = DocumentReference::from_path(test_db(), "c/d").unwrap();
        let parsed = reader()
            .parse_set_data(
                "setDoc",
                &data([("r", local.into()), ("g", GeoPoint::new(1.0, 2.0).unwrap().into())]),
                &SetOptions::default(),
            )
            .unwrap();
        assert!(parsed.data.field(&field_path("r")).is_some());
    }

    #[test]
    fn to_mutation_picks_set_or_patch() {
        let key = DocumentKey::from_string("c/d").unwrap();
        let plain = reader()
            .parse_set_data("setDoc", &data([("a", 1_i64.into())]), &SetOptions::default())
            .unwrap();
        assert!(matches!(
            plain.to_mutation(key.clone(), Precondition::None).kind(),
            crate::firestore::model::MutationKind::Set { .. }
        ));
        let merged = reader()
            .parse_set_data("setDoc", &data([("a", 1_i64.into())]), &SetOptions::merge_all())
            .unwrap();
        assert!(matches!(
            merged.to_mutation(key, Precondition::None).kind(),
            crate::firestore::model::MutationKind::Patch { .. }
        ));
    }
}
