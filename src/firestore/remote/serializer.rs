use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::{json, Map as JsonMap, Value as JsonValue};

use crate::firestore::error::{internal_error, FirestoreResult};
use crate::firestore::model::{
    DatabaseId, DocumentKey, FieldMask, FieldPath, FieldTransform, GeoPoint, MutableDocument,
    Mutation, MutationKind, MutationResult, ObjectValue, Precondition, ResourcePath,
    SnapshotVersion, Timestamp, TransformOperation,
};
use crate::firestore::value::{BytesValue, FirestoreValue, ValueKind};

/// Wire format switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SerializerOptions {
    /// Proto3 JSON writes timestamps as RFC 3339 strings and bytes as base64.
    /// Otherwise timestamps are `{seconds, nanos}` objects and bytes are
    /// arrays of numbers.
    pub use_proto3_json: bool,
}

impl Default for SerializerOptions {
    fn default() -> Self {
        Self {
            use_proto3_json: true,
        }
    }
}

/// Converts model types to and from the JSON shape of the Firestore REST
/// API. Decoding accepts every encoding either mode produces.
#[derive(Clone, Debug)]
pub struct JsonProtoSerializer {
    database_id: DatabaseId,
    options: SerializerOptions,
}

impl JsonProtoSerializer {
    pub fn new(database_id: DatabaseId) -> Self {
        Self::with_options(database_id, SerializerOptions::default())
    }

    pub fn with_options(database_id: DatabaseId, options: SerializerOptions) -> Self {
        Self {
            database_id,
            options,
        }
    }

    pub fn database_id(&self) -> &DatabaseId {
        &self.database_id
    }

    pub fn options(&self) -> SerializerOptions {
        self.options
    }

    pub fn database_name(&self) -> String {
        self.database_id.database_name()
    }

    pub fn document_name(&self, key: &DocumentKey) -> String {
        format!(
            "{}/documents/{}",
            self.database_name(),
            key.path().canonical_string()
        )
    }

    /// Parses a document resource name that must belong to this database.
    pub fn decode_document_name(&self, name: &str) -> FirestoreResult<DocumentKey> {
        let (database_id, key) = decode_resource_name(name)?;
        if database_id.project_id() != self.database_id.project_id() {
            return Err(internal_error(format!(
                "Tried to deserialize key from different project: {} vs {}",
                database_id.project_id(),
                self.database_id.project_id()
            )));
        }
        if database_id.database() != self.database_id.database() {
            return Err(internal_error(format!(
                "Tried to deserialize key from different database: {} vs {}",
                database_id.database(),
                self.database_id.database()
            )));
        }
        Ok(key)
    }

    pub fn encode_value(&self, value: &FirestoreValue) -> JsonValue {
        match value.kind() {
            ValueKind::Null => json!({ "nullValue": JsonValue::Null }),
            ValueKind::Boolean(boolean) => json!({ "booleanValue": boolean }),
            ValueKind::Integer(integer) => json!({ "integerValue": integer.to_string() }),
            ValueKind::Double(double) => json!({ "doubleValue": encode_double(*double) }),
            ValueKind::Timestamp(timestamp) => {
                json!({ "timestampValue": self.encode_timestamp(*timestamp) })
            }
            ValueKind::String(string) => json!({ "stringValue": string }),
            ValueKind::Bytes(bytes) => {
                let encoded = if self.options.use_proto3_json {
                    JsonValue::String(bytes.to_base64())
                } else {
                    JsonValue::Array(bytes.as_slice().iter().map(|byte| json!(byte)).collect())
                };
                json!({ "bytesValue": encoded })
            }
            ValueKind::Reference(reference) => {
                json!({ "referenceValue": reference.resource_name() })
            }
            ValueKind::GeoPoint(point) => json!({
                "geoPointValue": {
                    "latitude": point.latitude(),
                    "longitude": point.longitude(),
                }
            }),
            ValueKind::Array(array) => {
                let values = array
                    .iter()
                    .map(|value| self.encode_value(value))
                    .collect::<Vec<_>>();
                json!({ "arrayValue": { "values": values } })
            }
            ValueKind::Map(map) => json!({
                "mapValue": {
                    "fields": self.encode_fields(map.fields())
                }
            }),
        }
    }

    pub fn decode_value(&self, value: &JsonValue) -> FirestoreResult<FirestoreValue> {
        let object = value
            .as_object()
            .ok_or_else(|| internal_error("Expected Firestore value object"))?;
        if object.contains_key("nullValue") {
            return Ok(FirestoreValue::null());
        }
        if let Some(bool_value) = object.get("booleanValue") {
            let value = bool_value
                .as_bool()
                .ok_or_else(|| internal_error("booleanValue must be bool"))?;
            return Ok(FirestoreValue::from_bool(value));
        }
        if let Some(integer_value) = object.get("integerValue") {
            let parsed = match integer_value {
                JsonValue::String(value) => i64::from_str(value)
                    .map_err(|err| internal_error(format!("Invalid integerValue: {err}")))?,
                JsonValue::Number(number) => number
                    .as_i64()
                    .ok_or_else(|| internal_error("Integer out of range"))?,
                _ => return Err(internal_error("integerValue must be a string or number")),
            };
            return Ok(FirestoreValue::from_integer(parsed));
        }
        if let Some(double_value) = object.get("doubleValue") {
            return Ok(FirestoreValue::from_double(decode_double(double_value)?));
        }
        if let Some(timestamp_value) = object.get("timestampValue") {
            return Ok(FirestoreValue::from_timestamp(self.decode_timestamp(
                timestamp_value,
            )?));
        }
        if let Some(string_value) = object.get("stringValue") {
            let str_value = string_value
                .as_str()
                .ok_or_else(|| internal_error("stringValue must be string"))?;
            return Ok(FirestoreValue::from_string(str_value));
        }
        if let Some(bytes_value) = object.get("bytesValue") {
            return Ok(FirestoreValue::from_bytes(decode_bytes(bytes_value)?));
        }
        if let Some(reference_value) = object.get("referenceValue") {
            let name = reference_value
                .as_str()
                .ok_or_else(|| internal_error("referenceValue must be string"))?;
            let (database_id, key) = decode_resource_name(name)?;
            return Ok(FirestoreValue::reference(database_id, key));
        }
        if let Some(geo_point) = object.get("geoPointValue") {
            let coordinate = |name: &str| geo_point.get(name).and_then(JsonValue::as_f64);
            let point = GeoPoint::new(
                coordinate("latitude").unwrap_or_default(),
                coordinate("longitude").unwrap_or_default(),
            )
            .map_err(|err| internal_error(err.message()))?;
            return Ok(FirestoreValue::from_geo_point(point));
        }
        if let Some(array_value) = object.get("arrayValue") {
            // `values` is omitted for empty arrays.
            let decoded = match array_value.get("values").and_then(JsonValue::as_array) {
                Some(entries) => entries
                    .iter()
                    .map(|entry| self.decode_value(entry))
                    .collect::<FirestoreResult<Vec<_>>>()?,
                None => Vec::new(),
            };
            return Ok(FirestoreValue::from_array(decoded));
        }
        if let Some(map_value) = object.get("mapValue") {
            return Ok(FirestoreValue::from_map(
                self.decode_fields(map_value.get("fields"))?,
            ));
        }

        Err(internal_error(format!("Unknown Firestore value: {value}")))
    }

    pub fn encode_fields(&self, fields: &BTreeMap<String, FirestoreValue>) -> JsonValue {
        let encoded: JsonMap<String, JsonValue> = fields
            .iter()
            .map(|(key, value)| (key.clone(), self.encode_value(value)))
            .collect();
        JsonValue::Object(encoded)
    }

    /// Decodes a `fields` object. A missing object means no fields.
    pub fn decode_fields(
        &self,
        fields: Option<&JsonValue>,
    ) -> FirestoreResult<BTreeMap<String, FirestoreValue>> {
        let Some(fields) = fields else {
            return Ok(BTreeMap::new());
        };
        let object = fields
            .as_object()
            .ok_or_else(|| internal_error("Expected 'fields' to be an object"))?;
        object
            .iter()
            .map(|(key, value)| -> FirestoreResult<(String, FirestoreValue)> {
                Ok((key.clone(), self.decode_value(value)?))
            })
            .collect()
    }

    pub fn encode_timestamp(&self, timestamp: Timestamp) -> JsonValue {
        let rfc3339 = u32::try_from(timestamp.nanos)
            .ok()
            .and_then(|nanos| Utc.timestamp_opt(timestamp.seconds, nanos).single())
            .map(|datetime| datetime.to_rfc3339_opts(SecondsFormat::Nanos, true));
        match rfc3339 {
            Some(formatted) if self.options.use_proto3_json => JsonValue::String(formatted),
            _ => json!({
                "seconds": timestamp.seconds.to_string(),
                "nanos": timestamp.nanos,
            }),
        }
    }

    /// Accepts RFC 3339 strings and `{seconds, nanos}` objects.
    pub fn decode_timestamp(&self, value: &JsonValue) -> FirestoreResult<Timestamp> {
        match value {
            JsonValue::String(text) => parse_rfc3339(text),
            JsonValue::Object(object) => {
                let seconds = match object.get("seconds") {
                    None => 0,
                    Some(JsonValue::String(text)) => i64::from_str(text).map_err(|err| {
                        internal_error(format!("Invalid timestamp seconds: {err}"))
                    })?,
                    Some(JsonValue::Number(number)) => number
                        .as_i64()
                        .ok_or_else(|| internal_error("Invalid timestamp seconds"))?,
                    Some(_) => return Err(internal_error("Invalid timestamp seconds")),
                };
                let nanos = match object.get("nanos") {
                    None => 0,
                    Some(nanos) => nanos
                        .as_i64()
                        .and_then(|nanos| i32::try_from(nanos).ok())
                        .ok_or_else(|| internal_error("Invalid timestamp nanos"))?,
                };
                checked_timestamp(seconds, nanos)
            }
            _ => Err(internal_error(format!("Invalid timestamp: {value}"))),
        }
    }

    pub fn encode_version(&self, version: SnapshotVersion) -> JsonValue {
        self.encode_timestamp(version.timestamp())
    }

    pub fn decode_version(&self, value: &JsonValue) -> FirestoreResult<SnapshotVersion> {
        self.decode_timestamp(value).map(SnapshotVersion::new)
    }

    /// Document body with its update time, as stored by the backend.
    pub fn encode_document(&self, document: &MutableDocument) -> JsonValue {
        json!({
            "name": self.document_name(document.key()),
            "fields": self.encode_fields(document.data().fields()),
            "updateTime": self.encode_version(document.version()),
        })
    }

    pub fn decode_document(
        &self,
        value: &JsonValue,
        has_committed_mutations: bool,
    ) -> FirestoreResult<MutableDocument> {
        let name = value
            .get("name")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| internal_error("Document is missing its name"))?;
        let key = self.decode_document_name(name)?;
        let update_time = value
            .get("updateTime")
            .ok_or_else(|| internal_error("Document is missing its updateTime"))?;
        let version = self.decode_version(update_time)?;
        let data = ObjectValue::from_map(self.decode_fields(value.get("fields"))?);

        let mut document = MutableDocument::new_found_document(key, version, data);
        if has_committed_mutations {
            document.set_has_committed_mutations();
        }
        Ok(document)
    }

    /// One entry of a `batchGet` response: either `found` or `missing`.
    pub fn decode_maybe_document(&self, value: &JsonValue) -> FirestoreResult<MutableDocument> {
        let read_time = value
            .get("readTime")
            .map(|read_time| self.decode_version(read_time))
            .transpose()?;

        if let Some(found) = value.get("found") {
            let mut document = self.decode_document(found, false)?;
            if let Some(read_time) = read_time {
                document.set_read_time(read_time);
            }
            return Ok(document);
        }
        if let Some(missing) = value.get("missing") {
            let name = missing
                .as_str()
                .ok_or_else(|| internal_error("missing must be a document name"))?;
            let key = self.decode_document_name(name)?;
            let read_time = read_time.ok_or_else(|| {
                internal_error("Tried to deserialize a missing document without a read time.")
            })?;
            let mut document = MutableDocument::new_no_document(key, read_time);
            document.set_read_time(read_time);
            return Ok(document);
        }
        Err(internal_error(format!("Invalid batch get response: {value}")))
    }

    pub fn encode_batch_get_request(&self, keys: &[DocumentKey]) -> JsonValue {
        let documents: Vec<String> = keys.iter().map(|key| self.document_name(key)).collect();
        json!({ "documents": documents })
    }

    pub fn encode_commit_request(&self, mutations: &[Mutation]) -> JsonValue {
        let writes: Vec<JsonValue> = mutations
            .iter()
            .map(|mutation| self.encode_mutation(mutation))
            .collect();
        json!({ "writes": writes })
    }

    pub fn encode_mutation(&self, mutation: &Mutation) -> JsonValue {
        let mut write = JsonMap::new();
        let name = self.document_name(mutation.key());
        match mutation.kind() {
            MutationKind::Set { value } => {
                write.insert("update".to_string(), self.encode_mutation_document(name, value));
            }
            MutationKind::Patch { data, field_mask } => {
                write.insert("update".to_string(), self.encode_mutation_document(name, data));
                write.insert("updateMask".to_string(), encode_document_mask(field_mask));
            }
            MutationKind::Delete => {
                write.insert("delete".to_string(), JsonValue::String(name));
            }
            MutationKind::Verify => {
                write.insert("verify".to_string(), JsonValue::String(name));
            }
        }

        if !mutation.field_transforms().is_empty() {
            let transforms = mutation
                .field_transforms()
                .iter()
                .map(|transform| self.encode_field_transform(transform))
                .collect();
            write.insert("updateTransforms".to_string(), JsonValue::Array(transforms));
        }
        if let Some(precondition) = self.encode_precondition(mutation.precondition()) {
            write.insert("currentDocument".to_string(), precondition);
        }
        JsonValue::Object(write)
    }

    pub fn decode_mutation(&self, value: &JsonValue) -> FirestoreResult<Mutation> {
        let precondition = match value.get("currentDocument") {
            Some(current) => self.decode_precondition(current)?,
            None => Precondition::None,
        };
        let field_transforms = match value.get("updateTransforms") {
            Some(transforms) => self.decode_field_transforms(transforms)?,
            None => Vec::new(),
        };

        if let Some(update) = value.get("update") {
            let name = update
                .get("name")
                .and_then(JsonValue::as_str)
                .ok_or_else(|| internal_error("update is missing its name"))?;
            let key = self.decode_document_name(name)?;
            let data = ObjectValue::from_map(self.decode_fields(update.get("fields"))?);
            let mutation = match value.get("updateMask") {
                Some(mask) => Mutation::patch(key, data, decode_document_mask(mask)?, precondition),
                None => Mutation::set(key, data, precondition),
            };
            return Ok(mutation.with_transforms(field_transforms));
        }
        if let Some(delete) = value.get("delete").and_then(JsonValue::as_str) {
            return Ok(Mutation::delete(
                self.decode_document_name(delete)?,
                precondition,
            ));
        }
        if let Some(verify) = value.get("verify").and_then(JsonValue::as_str) {
            return Ok(Mutation::verify(
                self.decode_document_name(verify)?,
                precondition,
            ));
        }
        if let Some(transform) = value.get("transform") {
            // Older clients sent transforms as a write of their own.
            let name = transform
                .get("document")
                .and_then(JsonValue::as_str)
                .ok_or_else(|| internal_error("transform is missing its document"))?;
            let key = self.decode_document_name(name)?;
            if precondition != Precondition::Exists(true) {
                return Err(internal_error(
                    "Transforms only support precondition \"exists == true\"",
                ));
            }
            let transforms = match transform.get("fieldTransforms") {
                Some(transforms) => self.decode_field_transforms(transforms)?,
                None => Vec::new(),
            };
            return Ok(Mutation::patch(
                key,
                ObjectValue::empty(),
                FieldMask::empty(),
                Precondition::Exists(true),
            )
            .with_transforms(transforms));
        }
        Err(internal_error(format!("Unknown mutation: {value}")))
    }

    /// Decodes `writeResults` of a commit response. Deletes carry no
    /// `updateTime`, so the commit time stands in for them.
    pub fn decode_write_results(
        &self,
        write_results: &[JsonValue],
        commit_time: Option<&JsonValue>,
    ) -> FirestoreResult<Vec<MutationResult>> {
        if write_results.is_empty() {
            return Ok(Vec::new());
        }
        let commit_version = commit_time
            .map(|time| self.decode_version(time))
            .transpose()?
            .ok_or_else(|| internal_error("Received a write result without a commit time"))?;

        write_results
            .iter()
            .map(|result| -> FirestoreResult<MutationResult> {
                let version = match result.get("updateTime") {
                    Some(update_time) => self.decode_version(update_time)?,
                    None => commit_version,
                };
                let transform_results = match result
                    .get("transformResults")
                    .and_then(JsonValue::as_array)
                {
                    Some(values) => values
                        .iter()
                        .map(|value| self.decode_value(value))
                        .collect::<FirestoreResult<Vec<_>>>()?,
                    None => Vec::new(),
                };
                Ok(MutationResult::new(version, transform_results))
            })
            .collect()
    }

    /// Decodes a full commit response into the commit version and the
    /// per-write results.
    pub fn decode_commit_response(
        &self,
        response: &JsonValue,
    ) -> FirestoreResult<(SnapshotVersion, Vec<MutationResult>)> {
        let commit_time = response.get("commitTime");
        let results = match response.get("writeResults").and_then(JsonValue::as_array) {
            Some(results) => self.decode_write_results(results, commit_time)?,
            None => Vec::new(),
        };
        let commit_version = match commit_time {
            Some(time) => self.decode_version(time)?,
            None => SnapshotVersion::min(),
        };
        Ok((commit_version, results))
    }

    fn encode_mutation_document(&self, name: String, data: &ObjectValue) -> JsonValue {
        json!({
            "name": name,
            "fields": self.encode_fields(data.fields()),
        })
    }

    fn encode_precondition(&self, precondition: Precondition) -> Option<JsonValue> {
        match precondition {
            Precondition::None => None,
            Precondition::Exists(exists) => Some(json!({ "exists": exists })),
            Precondition::UpdateTime(version) => {
                Some(json!({ "updateTime": self.encode_version(version) }))
            }
        }
    }

    fn decode_precondition(&self, value: &JsonValue) -> FirestoreResult<Precondition> {
        if let Some(update_time) = value.get("updateTime") {
            return Ok(Precondition::UpdateTime(self.decode_version(update_time)?));
        }
        match value.get("exists") {
            Some(exists) => exists
                .as_bool()
                .map(Precondition::Exists)
                .ok_or_else(|| internal_error("exists must be bool")),
            None => Ok(Precondition::None),
        }
    }

    fn encode_field_transform(&self, transform: &FieldTransform) -> JsonValue {
        let field_path = transform.field().server_format();
        let encode_all = |elements: &[FirestoreValue]| {
            elements
                .iter()
                .map(|value| self.encode_value(value))
                .collect::<Vec<_>>()
        };
        match transform.transform() {
            TransformOperation::ServerTimestamp => json!({
                "fieldPath": field_path,
                "setToServerValue": "REQUEST_TIME"
            }),
            TransformOperation::ArrayUnion(elements) => json!({
                "fieldPath": field_path,
                "appendMissingElements": { "values": encode_all(elements) }
            }),
            TransformOperation::ArrayRemove(elements) => json!({
                "fieldPath": field_path,
                "removeAllFromArray": { "values": encode_all(elements) }
            }),
            TransformOperation::NumericIncrement(operand) => json!({
                "fieldPath": field_path,
                "increment": self.encode_value(operand)
            }),
        }
    }

    fn decode_field_transforms(&self, value: &JsonValue) -> FirestoreResult<Vec<FieldTransform>> {
        value
            .as_array()
            .ok_or_else(|| internal_error("fieldTransforms must be an array"))?
            .iter()
            .map(|transform| self.decode_field_transform(transform))
            .collect()
    }

    fn decode_field_transform(&self, value: &JsonValue) -> FirestoreResult<FieldTransform> {
        let decode_all = |container: &JsonValue| -> FirestoreResult<Vec<FirestoreValue>> {
            match container.get("values").and_then(JsonValue::as_array) {
                Some(values) => values.iter().map(|value| self.decode_value(value)).collect(),
                None => Ok(Vec::new()),
            }
        };

        let operation = if let Some(server_value) = value.get("setToServerValue") {
            if server_value.as_str() != Some("REQUEST_TIME") {
                return Err(internal_error(format!(
                    "Unknown server value transform: {value}"
                )));
            }
            TransformOperation::ServerTimestamp
        } else if let Some(union) = value.get("appendMissingElements") {
            TransformOperation::ArrayUnion(decode_all(union)?)
        } else if let Some(remove) = value.get("removeAllFromArray") {
            TransformOperation::ArrayRemove(decode_all(remove)?)
        } else if let Some(increment) = value.get("increment") {
            let operand = self.decode_value(increment)?;
            if !operand.is_number() {
                return Err(internal_error("NUMERIC_ADD transform requires a number"));
            }
            TransformOperation::NumericIncrement(operand)
        } else {
            return Err(internal_error(format!("Unknown transform: {value}")));
        };

        let field_path = value
            .get("fieldPath")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| internal_error("Transform is missing its fieldPath"))?;
        let field = FieldPath::from_server_format(field_path)
            .map_err(|err| internal_error(err.message()))?;
        Ok(FieldTransform::new(field, operation))
    }
}

/// JSON numbers cannot hold NaN or the infinities, so those always travel as
/// the proto3 string spellings.
fn encode_double(value: f64) -> JsonValue {
    if value.is_nan() {
        JsonValue::String("NaN".to_string())
    } else if value == f64::INFINITY {
        JsonValue::String("Infinity".to_string())
    } else if value == f64::NEG_INFINITY {
        JsonValue::String("-Infinity".to_string())
    } else {
        json!(value)
    }
}

fn decode_double(value: &JsonValue) -> FirestoreResult<f64> {
    match value {
        JsonValue::Number(number) => number
            .as_f64()
            .ok_or_else(|| internal_error("Invalid doubleValue")),
        JsonValue::String(text) => match text.as_str() {
            "NaN" => Ok(f64::NAN),
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            other => other
                .parse::<f64>()
                .map_err(|err| internal_error(format!("Invalid doubleValue: {err}"))),
        },
        _ => Err(internal_error("doubleValue must be a number or string")),
    }
}

fn decode_bytes(value: &JsonValue) -> FirestoreResult<BytesValue> {
    match value {
        JsonValue::String(text) => BytesValue::from_base64(text)
            .map_err(|err| internal_error(format!("Invalid bytesValue: {err}"))),
        JsonValue::Array(items) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|byte| u8::try_from(byte).ok())
                    .ok_or_else(|| internal_error("bytesValue entries must be bytes"))
            })
            .collect::<FirestoreResult<Vec<u8>>>()
            .map(BytesValue::from),
        _ => Err(internal_error("bytesValue must be a string or byte array")),
    }
}

/// Seconds come from chrono. Nanoseconds are read from the fraction digits
/// directly, padded or cut to nine places.
fn parse_rfc3339(text: &str) -> FirestoreResult<Timestamp> {
    let datetime = DateTime::parse_from_rfc3339(text)
        .map_err(|err| internal_error(format!("Invalid timestamp {text}: {err}")))?;
    let seconds = datetime.with_timezone(&Utc).timestamp();

    // `YYYY-MM-DD?hh:mm:ss` is fixed width whatever separator chrono accepted.
    let fraction: String = text
        .get(RFC3339_SECONDS_END..)
        .and_then(|rest| rest.strip_prefix('.'))
        .map(|digits| digits.chars().take_while(char::is_ascii_digit).take(9).collect())
        .unwrap_or_default();
    let nanos = if fraction.is_empty() {
        0
    } else {
        format!("{fraction:0<9}")
            .parse::<i32>()
            .map_err(|err| internal_error(format!("Invalid timestamp {text}: {err}")))?
    };
    checked_timestamp(seconds, nanos)
}

const RFC3339_SECONDS_END: usize = 19;

/// Builds a timestamp from wire parts without normalizing, rejecting values
/// outside the backend range.
fn checked_timestamp(seconds: i64, nanos: i32) -> FirestoreResult<Timestamp> {
    let timestamp = Timestamp { seconds, nanos };
    timestamp
        .validate()
        .map_err(|err| internal_error(format!("Invalid timestamp: {}", err.message())))?;
    Ok(timestamp)
}

/// Splits `projects/{p}/databases/{d}/documents/{path}`.
fn decode_resource_name(name: &str) -> FirestoreResult<(DatabaseId, DocumentKey)> {
    let resource = ResourcePath::from_string(name)
        .map_err(|_| internal_error(format!("Tried to deserialize invalid key {name}")))?;
    let valid = resource.len() >= 5
        && resource.get(0) == Some("projects")
        && resource.get(2) == Some("databases")
        && resource.get(4) == Some("documents");
    let (Some(project), Some(database)) = (resource.get(1), resource.get(3)) else {
        return Err(internal_error(format!("Tried to deserialize invalid key {name}")));
    };
    if !valid {
        return Err(internal_error(format!("Tried to deserialize invalid key {name}")));
    }
    let database_id = DatabaseId::new(project, database);
    let key = DocumentKey::from_path(resource.pop_first_n(5))
        .map_err(|err| internal_error(format!("Invalid document key in {name}: {}", err.message())))?;
    Ok((database_id, key))
}

fn encode_document_mask(mask: &FieldMask) -> JsonValue {
    let field_paths: Vec<String> = mask.fields().map(FieldPath::server_format).collect();
    json!({ "fieldPaths": field_paths })
}

fn decode_document_mask(value: &JsonValue) -> FirestoreResult<FieldMask> {
    let Some(paths) = value.get("fieldPaths").and_then(JsonValue::as_array) else {
        return Ok(FieldMask::empty());
    };
    paths
        .iter()
        .map(|path| -> FirestoreResult<FieldPath> {
            let path = path
                .as_str()
                .ok_or_else(|| internal_error("fieldPaths entries must be strings"))?;
            FieldPath::from_server_format(path).map_err(|err| internal_error(err.message()))
        })
        .collect()
}
