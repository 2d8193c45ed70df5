use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use crate::firestore::constants::DOCUMENT_KEY_NAME;
use crate::firestore::error::{invalid_argument, FirestoreResult};

const FORBIDDEN_CHARACTERS: &[char] = &['~', '*', '/', '[', ']'];

/// A dotted path into a document's fields.
///
/// The empty path addresses the whole document; it is only produced
/// internally (e.g. by [`FieldPath::empty`]) and never by the user-facing
/// parsers.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    pub fn new<S, I>(segments: I) -> FirestoreResult<Self>
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(invalid_argument(
                "Invalid field path. Provide at least one field name.",
            ));
        }
        if segments.iter().any(String::is_empty) {
            return Err(invalid_argument(
                "Invalid field name. Field names must not be empty.",
            ));
        }
        Ok(Self { segments })
    }

    pub fn empty() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    pub(crate) fn from_segments_unchecked(segments: Vec<String>) -> Self {
        Self { segments }
    }

    /// Parses a user supplied dotted path such as `address.city`.
    pub fn from_dot_separated(path: &str) -> FirestoreResult<Self> {
        if let Some(found) = path.chars().find(|ch| FORBIDDEN_CHARACTERS.contains(ch)) {
            return Err(invalid_argument(format!(
                "Invalid field path ({path}). Paths must not contain '{found}'"
            )));
        }
        if path.is_empty() || path.starts_with('.') || path.ends_with('.') || path.contains("..")
        {
            return Err(invalid_argument(format!(
                "Invalid field path ({path}). Paths must not be empty, begin with '.', end with '.', or contain '..'"
            )));
        }
        FieldPath::new(path.split('.'))
    }

    /// Parses the backend representation, where segments that are not plain
    /// identifiers are wrapped in back-ticks and may escape `` ` `` and `\`.
    pub fn from_server_format(path: &str) -> FirestoreResult<Self> {
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut in_backticks = false;
        let mut chars = path.chars();

        while let Some(ch) = chars.next() {
            match ch {
                '\\' => match chars.next() {
                    Some(escaped) => current.push(escaped),
                    None => {
                        return Err(invalid_argument(format!(
                            "Path has trailing escape character: {path}"
                        )))
                    }
                },
                '.' if !in_backticks => {
                    if current.is_empty() {
                        return Err(invalid_argument(format!(
                            "Invalid field path ({path}). Paths must not be empty, begin with '.', end with '.', or contain '..'"
                        )));
                    }
                    segments.push(std::mem::take(&mut current));
                }
                '`' => in_backticks = !in_backticks,
                other => current.push(other),
            }
        }

        if in_backticks {
            return Err(invalid_argument(format!("Unterminated ` in path: {path}")));
        }
        if current.is_empty() {
            return Err(invalid_argument(format!(
                "Invalid field path ({path}). Paths must not be empty, begin with '.', end with '.', or contain '..'"
            )));
        }
        segments.push(current);
        Ok(Self { segments })
    }

    pub fn document_id() -> Self {
        Self {
            segments: vec![DOCUMENT_KEY_NAME.to_string()],
        }
    }

    pub fn is_document_id(&self) -> bool {
        self.segments.len() == 1 && self.segments[0] == DOCUMENT_KEY_NAME
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn first_segment(&self) -> Option<&str> {
        self.segments.first().map(String::as_str)
    }

    pub fn last_segment(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    pub fn append(&self, other: &FieldPath) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    pub fn without_last(&self) -> Self {
        let mut segments = self.segments.clone();
        segments.pop();
        Self { segments }
    }

    pub fn pop_first(&self) -> Self {
        Self {
            segments: self.segments.iter().skip(1).cloned().collect(),
        }
    }

    pub fn is_prefix_of(&self, other: &FieldPath) -> bool {
        self.segments.len() <= other.segments.len()
            && self
                .segments
                .iter()
                .zip(other.segments.iter())
                .all(|(left, right)| left == right)
    }

    /// User facing form, segments joined with `.`.
    pub fn canonical_string(&self) -> String {
        self.segments.join(".")
    }

    /// Backend form, quoting segments that are not plain identifiers.
    pub fn server_format(&self) -> String {
        self.segments
            .iter()
            .map(|segment| escape_segment(segment))
            .collect::<Vec<_>>()
            .join(".")
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.segments.clone()
    }
}

fn is_valid_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

fn escape_segment(segment: &str) -> String {
    if is_valid_identifier(segment) {
        return segment.to_string();
    }
    let escaped = segment.replace('\\', "\\\\").replace('`', "\\`");
    format!("`{escaped}`")
}

impl PartialOrd for FieldPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FieldPath {
    fn cmp(&self, other: &Self) -> Ordering {
        for (left, right) in self.segments.iter().zip(other.segments.iter()) {
            match left.cmp(right) {
                Ordering::Equal => continue,
                ordering => return ordering,
            }
        }
        self.segments.len().cmp(&other.segments.len())
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical_string())
    }
}

/// Trait that converts common user inputs into a validated [`FieldPath`].
pub trait IntoFieldPath {
    fn into_field_path(self) -> FirestoreResult<FieldPath>;
}

impl IntoFieldPath for FieldPath {
    fn into_field_path(self) -> FirestoreResult<FieldPath> {
        Ok(self)
    }
}

impl<'a> IntoFieldPath for &'a FieldPath {
    fn into_field_path(self) -> FirestoreResult<FieldPath> {
        Ok(self.clone())
    }
}

impl IntoFieldPath for String {
    fn into_field_path(self) -> FirestoreResult<FieldPath> {
        FieldPath::from_dot_separated(&self)
    }
}

impl<'a> IntoFieldPath for &'a str {
    fn into_field_path(self) -> FirestoreResult<FieldPath> {
        FieldPath::from_dot_separated(self)
    }
}
