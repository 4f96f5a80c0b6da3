//! Wire types exchanged with the orchestrator.
//!
//! The orchestrator writes one [`Request`] document to the resource's stdin
//! and reads one response from its stdout. A `check` answers with a bare JSON
//! array of versions; `in` and `out` answer with a [`Response`] carrying the
//! version and optional [`Metadata`]. Each response is terminated by a
//! newline.

use std::fmt;

use serde::de::{Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

/// Request read from stdin.
///
/// Fragments are borrowed slices of the input buffer and stay undecoded until
/// the dispatcher knows which types to decode them into. A `null` fragment is
/// treated like an absent one. The envelope itself must be a JSON object.
///
/// # Example
///
/// ```
/// use resource_sdk::Request;
///
/// let input = br#"{"source":{"uri":"x"},"version":null}"#;
/// let request = Request::parse(input).expect("valid request");
/// assert_eq!(request.source().map(|raw| raw.get()), Some(r#"{"uri":"x"}"#));
/// assert!(request.version().is_none());
/// assert!(request.params().is_none());
/// ```
#[derive(Debug, Default)]
pub struct Request<'a> {
    source: Option<&'a RawValue>,
    version: Option<&'a RawValue>,
    params: Option<&'a RawValue>,
}

#[derive(Deserialize)]
#[serde(field_identifier, rename_all = "snake_case")]
enum Field {
    Source,
    Version,
    Params,
    #[serde(other)]
    Unknown,
}

struct RequestVisitor;

impl<'de> Visitor<'de> for RequestVisitor {
    type Value = Request<'de>;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a request object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Request<'de>, A::Error> {
        let mut request = Request::default();
        while let Some(field) = map.next_key::<Field>()? {
            let slot = match field {
                Field::Source => &mut request.source,
                Field::Version => &mut request.version,
                Field::Params => &mut request.params,
                Field::Unknown => {
                    map.next_value::<IgnoredAny>()?;
                    continue;
                }
            };
            *slot = map.next_value()?;
        }
        Ok(request)
    }
}

// Objects only: a derived impl also accepts a sequence in field order.
impl<'de> Deserialize<'de> for Request<'de> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RequestVisitor)
    }
}

impl<'a> Request<'a> {
    /// Parses a request envelope, borrowing its fragments from `input`.
    ///
    /// # Errors
    ///
    /// Returns the decode error when `input` is not a JSON object.
    pub fn parse(input: &'a [u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(input)
    }

    /// Returns the raw `source` fragment.
    #[must_use]
    pub const fn source(&self) -> Option<&'a RawValue> {
        self.source
    }

    /// Returns the raw `version` fragment.
    #[must_use]
    pub const fn version(&self) -> Option<&'a RawValue> {
        self.version
    }

    /// Returns the raw `params` fragment.
    #[must_use]
    pub const fn params(&self) -> Option<&'a RawValue> {
        self.params
    }
}

/// One name/value pair shown alongside a version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Metadata {
    name: String,
    value: String,
}

impl Metadata {
    /// Creates a metadata entry.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Returns the entry name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the entry value.
    #[must_use]
    pub const fn value(&self) -> &str {
        self.value.as_str()
    }
}

/// What a fetch or publish handler returns.
///
/// A fetch handler may leave the version out to report only metadata; the
/// dispatcher then echoes the requested version. A publish handler must
/// always produce one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output<V> {
    version: Option<V>,
    metadata: Vec<Metadata>,
}

impl<V> Output<V> {
    /// Creates an output carrying `version`.
    #[must_use]
    pub const fn new(version: V) -> Self {
        Self {
            version: Some(version),
            metadata: Vec::new(),
        }
    }

    /// Creates an output carrying only metadata.
    #[must_use]
    pub const fn metadata_only(metadata: Vec<Metadata>) -> Self {
        Self {
            version: None,
            metadata,
        }
    }

    /// Creates an output carrying no version.
    #[must_use]
    pub const fn empty() -> Self {
        Self::metadata_only(Vec::new())
    }

    /// Appends one metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.push(Metadata::new(name, value));
        self
    }

    /// Returns the version, if any.
    #[must_use]
    pub const fn version(&self) -> Option<&V> {
        self.version.as_ref()
    }

    /// Returns the metadata entries.
    #[must_use]
    pub fn metadata(&self) -> &[Metadata] {
        &self.metadata
    }

    /// Splits the output into its parts.
    #[must_use]
    pub fn into_parts(self) -> (Option<V>, Vec<Metadata>) {
        (self.version, self.metadata)
    }
}

/// Response written by `in` and `out`.
///
/// # Example
///
/// ```
/// use resource_sdk::Response;
///
/// let response = Response::new(serde_json::json!({"id": "1"}), vec![]);
/// let json = serde_json::to_string(&response).expect("serialize");
/// assert_eq!(json, r#"{"version":{"id":"1"}}"#);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Response<V> {
    version: V,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    metadata: Vec<Metadata>,
}

impl<V> Response<V> {
    /// Creates a response.
    #[must_use]
    pub const fn new(version: V, metadata: Vec<Metadata>) -> Self {
        Self { version, metadata }
    }

    /// Returns the version.
    #[must_use]
    pub const fn version(&self) -> &V {
        &self.version
    }

    /// Returns the metadata entries.
    #[must_use]
    pub fn metadata(&self) -> &[Metadata] {
        &self.metadata
    }
}

/// Serializes a response document followed by a newline.
///
/// # Errors
///
/// Returns the serialization error when `value` cannot be encoded.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut bytes = serde_json::to_vec(value)?;
    bytes.push(b'\n');
    Ok(bytes)
}
