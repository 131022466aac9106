//! Object graph values.
//!
//! An [`Object`] is one node of a document's object graph. Direct values nest
//! arrays and dictionaries by value; indirect objects live in a
//! [`Document`](crate::document::Document)'s object table and are addressed
//! through [`ObjectRef`].

use crate::error::{Error, Result};
use bytes::Bytes;
use indexmap::IndexMap;
use std::io::Read;

/// Dictionary type: insertion order is preserved for iteration and output.
pub type Dictionary = IndexMap<String, Object>;

/// Object graph node.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// Null object
    Null,
    /// Boolean value
    Boolean(bool),
    /// Integer value
    Integer(i64),
    /// Real (floating-point) value
    Real(f64),
    /// Name (written with a leading /)
    Name(String),
    /// Text string
    String(String),
    /// Binary string
    ByteString(Vec<u8>),
    /// Array of objects
    Array(Vec<Object>),
    /// Dictionary (key-value pairs)
    Dictionary(Dictionary),
    /// Stream (dictionary + data)
    Stream {
        /// Stream dictionary
        dict: Dictionary,
        /// Stream data, encoded according to `/Filter`
        data: Bytes,
    },
    /// Indirect object reference
    Reference(ObjectRef),
}

/// Reference to an indirect object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef {
    /// Object number
    pub id: u32,
    /// Generation number
    pub gen: u16,
}

impl ObjectRef {
    /// Create a new object reference.
    pub fn new(id: u32, gen: u16) -> Self {
        Self { id, gen }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} R", self.id, self.gen)
    }
}

/// One step of a path into nested arrays and dictionaries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathKey {
    /// Array position
    Index(usize),
    /// Dictionary key
    Name(String),
}

impl PathKey {
    /// Build a path step from a node: names and strings become keys,
    /// non-negative integers become indices.
    pub fn from_object(obj: &Object) -> Option<Self> {
        match obj {
            Object::Name(name) | Object::String(name) => Some(Self::Name(name.clone())),
            Object::Integer(i) => usize::try_from(*i).ok().map(Self::Index),
            _ => None,
        }
    }
}

impl From<usize> for PathKey {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for PathKey {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for PathKey {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl std::fmt::Display for PathKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathKey::Index(i) => write!(f, "[{}]", i),
            PathKey::Name(name) => write!(f, "/{}", name),
        }
    }
}

impl Object {
    /// Get the type name of this object (without data).
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "Null",
            Object::Boolean(_) => "Boolean",
            Object::Integer(_) => "Integer",
            Object::Real(_) => "Real",
            Object::Name(_) => "Name",
            Object::String(_) => "String",
            Object::ByteString(_) => "ByteString",
            Object::Array(_) => "Array",
            Object::Dictionary(_) => "Dictionary",
            Object::Stream { .. } => "Stream",
            Object::Reference(_) => "Reference",
        }
    }

    /// Build a dictionary from `(key, value)` pairs.
    pub fn dict<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Object)>,
    {
        Object::Dictionary(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Build a name object.
    pub fn name(name: impl Into<String>) -> Self {
        Object::Name(name.into())
    }

    /// Build a text string object.
    pub fn text(text: impl Into<String>) -> Self {
        Object::String(text.into())
    }

    /// Build a rectangle array `[x0 y0 x1 y1]`.
    pub fn rect(rect: [f64; 4]) -> Self {
        Object::Array(rect.iter().map(|&v| Object::number(v)).collect())
    }

    /// Build a number, using an integer when the value is integral.
    pub fn number(value: f64) -> Self {
        if value.fract() == 0.0 && value >= i32::MIN as f64 && value <= i32::MAX as f64 {
            Object::Integer(value as i64)
        } else {
            Object::Real(value)
        }
    }

    /// Try to cast to integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Object::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Integer or real as `f64`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Object::Integer(i) => Some(*i as f64),
            Object::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to cast to real number.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Object::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to cast to boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Object::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to cast to name.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Object::Name(s) => Some(s),
            _ => None,
        }
    }

    /// Text content of a string object.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Object::String(s) => Some(s),
            _ => None,
        }
    }

    /// Raw bytes of a text or binary string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Object::String(s) => Some(s.as_bytes()),
            Object::ByteString(b) => Some(b),
            _ => None,
        }
    }

    /// Try to cast to dictionary. Works for both Dictionary and Stream objects.
    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    /// Mutable dictionary access. Works for both Dictionary and Stream objects.
    pub fn as_dict_mut(&mut self) -> Option<&mut Dictionary> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    /// Try to cast to array.
    pub fn as_array(&self) -> Option<&Vec<Object>> {
        match self {
            Object::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Mutable array access.
    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Object>> {
        match self {
            Object::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Try to cast to reference.
    pub fn as_reference(&self) -> Option<ObjectRef> {
        match self {
            Object::Reference(r) => Some(*r),
            _ => None,
        }
    }

    /// Read four numbers as a rectangle.
    pub fn as_rect(&self) -> Option<[f64; 4]> {
        let arr = self.as_array()?;
        if arr.len() != 4 {
            return None;
        }
        let mut rect = [0.0; 4];
        for (slot, value) in rect.iter_mut().zip(arr) {
            *slot = value.as_number()?;
        }
        Some(rect)
    }

    /// Check if object is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    /// Check if object is a boolean.
    pub fn is_bool(&self) -> bool {
        matches!(self, Object::Boolean(_))
    }

    /// Check if object is an integer.
    pub fn is_integer(&self) -> bool {
        matches!(self, Object::Integer(_))
    }

    /// Check if object is a real.
    pub fn is_real(&self) -> bool {
        matches!(self, Object::Real(_))
    }

    /// Check if object is an integer or a real.
    pub fn is_number(&self) -> bool {
        matches!(self, Object::Integer(_) | Object::Real(_))
    }

    /// Check if object is a name.
    pub fn is_name(&self) -> bool {
        matches!(self, Object::Name(_))
    }

    /// Check if object is a text or binary string.
    pub fn is_string(&self) -> bool {
        matches!(self, Object::String(_) | Object::ByteString(_))
    }

    /// Check if object is an array.
    pub fn is_array(&self) -> bool {
        matches!(self, Object::Array(_))
    }

    /// Check if object is a dictionary or a stream.
    pub fn is_dict(&self) -> bool {
        matches!(self, Object::Dictionary(_) | Object::Stream { .. })
    }

    /// Check if object is a stream.
    pub fn is_stream(&self) -> bool {
        matches!(self, Object::Stream { .. })
    }

    /// Check if object is an indirect reference.
    pub fn is_reference(&self) -> bool {
        matches!(self, Object::Reference(_))
    }

    /// Number of elements of an array or entries of a dictionary; 0 otherwise.
    pub fn len(&self) -> usize {
        match self {
            Object::Array(arr) => arr.len(),
            Object::Dictionary(d) | Object::Stream { dict: d, .. } => d.len(),
            _ => 0,
        }
    }

    /// True when [`len`](Self::len) is zero.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Direct child lookup, without resolving references.
    pub fn get_key(&self, key: &PathKey) -> Option<&Object> {
        match key {
            PathKey::Name(name) => self.as_dict()?.get(name.as_str()),
            PathKey::Index(i) => self.as_array()?.get(*i),
        }
    }

    /// Set a dictionary entry or an array element.
    ///
    /// Writing at index `len` appends; anything further is an error.
    pub fn put(&mut self, key: impl Into<PathKey>, value: impl Into<Object>) -> Result<()> {
        let value = value.into();
        match (key.into(), self) {
            (PathKey::Name(name), Object::Dictionary(d))
            | (PathKey::Name(name), Object::Stream { dict: d, .. }) => {
                d.insert(name, value);
                Ok(())
            },
            (PathKey::Index(index), Object::Array(arr)) => {
                if index < arr.len() {
                    arr[index] = value;
                } else if index == arr.len() {
                    arr.push(value);
                } else {
                    return Err(Error::ArrayIndexOutOfRange {
                        index,
                        len: arr.len(),
                    });
                }
                Ok(())
            },
            (PathKey::Name(_), other) => Err(type_mismatch("Dictionary", other)),
            (PathKey::Index(_), other) => Err(type_mismatch("Array", other)),
        }
    }

    /// Append to an array.
    pub fn push(&mut self, value: impl Into<Object>) -> Result<()> {
        match self {
            Object::Array(arr) => {
                arr.push(value.into());
                Ok(())
            },
            other => Err(type_mismatch("Array", other)),
        }
    }

    /// Remove a dictionary entry or an array element.
    ///
    /// Removing a key that is not present is not an error.
    pub fn delete(&mut self, key: impl Into<PathKey>) -> Result<()> {
        match (key.into(), self) {
            (PathKey::Name(name), Object::Dictionary(d))
            | (PathKey::Name(name), Object::Stream { dict: d, .. }) => {
                d.shift_remove(name.as_str());
                Ok(())
            },
            (PathKey::Index(index), Object::Array(arr)) => {
                if index >= arr.len() {
                    return Err(Error::ArrayIndexOutOfRange {
                        index,
                        len: arr.len(),
                    });
                }
                arr.remove(index);
                Ok(())
            },
            (PathKey::Name(_), other) => Err(type_mismatch("Dictionary", other)),
            (PathKey::Index(_), other) => Err(type_mismatch("Array", other)),
        }
    }

    /// Convert a plain JSON value into an object.
    ///
    /// JSON integers become integers; floats go through [`Object::number`].
    /// A string wrapped in parentheses becomes a text string, any other
    /// string a name.
    pub fn from_plain(value: &serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Object::Null,
            Value::Bool(b) => Object::Boolean(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Object::Integer(i),
                None => Object::number(n.as_f64().unwrap_or(0.0)),
            },
            Value::String(s) => Object::from(s.as_str()),
            Value::Array(items) => Object::Array(items.iter().map(Object::from_plain).collect()),
            Value::Object(map) => Object::Dictionary(
                map.iter()
                    .map(|(k, v)| (k.clone(), Object::from_plain(v)))
                    .collect(),
            ),
        }
    }

    /// Decode stream data using the filters in the stream dictionary.
    ///
    /// Only `FlateDecode` is supported; a stream without `/Filter` is
    /// returned as is.
    pub fn decode_stream_data(&self) -> Result<Vec<u8>> {
        match self {
            Object::Stream { dict, data } => {
                let filters = dict
                    .get("Filter")
                    .map(extract_filter_names)
                    .unwrap_or_default();

                let mut decoded = data.to_vec();
                for filter in &filters {
                    decoded = match filter.as_str() {
                        "FlateDecode" | "Fl" => inflate(&decoded)?,
                        other => return Err(Error::UnsupportedFilter(other.to_string())),
                    };
                }
                Ok(decoded)
            },
            _ => Err(type_mismatch("Stream", self)),
        }
    }
}

fn type_mismatch(expected: &str, found: &Object) -> Error {
    Error::InvalidObjectType {
        expected: expected.to_string(),
        found: found.type_name().to_string(),
    }
}

fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = flate2::read::ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::Decode(format!("FlateDecode: {}", e)))?;
    Ok(out)
}

/// Extract filter names from a Filter object.
///
/// The Filter entry can be either:
/// - A single Name (e.g., /FlateDecode)
/// - An Array of Names (e.g., [/ASCII85Decode /FlateDecode])
fn extract_filter_names(filter_obj: &Object) -> Vec<String> {
    match filter_obj {
        Object::Name(name) => vec![name.clone()],
        Object::Array(arr) => arr
            .iter()
            .filter_map(|obj| obj.as_name().map(|s| s.to_string()))
            .collect(),
        _ => vec![],
    }
}

impl From<bool> for Object {
    fn from(b: bool) -> Self {
        Object::Boolean(b)
    }
}

impl From<i64> for Object {
    fn from(i: i64) -> Self {
        Object::Integer(i)
    }
}

impl From<i32> for Object {
    fn from(i: i32) -> Self {
        Object::Integer(i as i64)
    }
}

impl From<u32> for Object {
    fn from(i: u32) -> Self {
        Object::Integer(i as i64)
    }
}

impl From<usize> for Object {
    fn from(i: usize) -> Self {
        Object::Integer(i as i64)
    }
}

impl From<f64> for Object {
    fn from(r: f64) -> Self {
        Object::Real(r)
    }
}

impl From<&str> for Object {
    fn from(s: &str) -> Self {
        match s.strip_prefix('(').and_then(|rest| rest.strip_suffix(')')) {
            Some(text) => Object::String(text.to_string()),
            None => Object::Name(s.to_string()),
        }
    }
}

impl From<String> for Object {
    fn from(s: String) -> Self {
        Object::from(s.as_str())
    }
}

impl From<Vec<u8>> for Object {
    fn from(bytes: Vec<u8>) -> Self {
        Object::ByteString(bytes)
    }
}

impl From<Vec<Object>> for Object {
    fn from(items: Vec<Object>) -> Self {
        Object::Array(items)
    }
}

impl From<Dictionary> for Object {
    fn from(dict: Dictionary) -> Self {
        Object::Dictionary(dict)
    }
}

impl From<ObjectRef> for Object {
    fn from(r: ObjectRef) -> Self {
        Object::Reference(r)
    }
}

impl From<[f64; 4]> for Object {
    fn from(rect: [f64; 4]) -> Self {
        Object::rect(rect)
    }
}

impl From<&serde_json::Value> for Object {
    fn from(value: &serde_json::Value) -> Self {
        Object::from_plain(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_object_integer() {
        let obj = Object::Integer(42);
        assert_eq!(obj.as_integer(), Some(42));
        assert_eq!(obj.as_number(), Some(42.0));
        assert!(obj.as_name().is_none());
        assert!(!obj.is_null());
    }

    #[test]
    fn test_object_name() {
        let obj = Object::name("Type");
        assert_eq!(obj.as_name(), Some("Type"));
        assert!(obj.as_integer().is_none());
    }

    #[test]
    fn test_text_and_byte_strings() {
        let text = Object::text("Hello");
        assert_eq!(text.as_text(), Some("Hello"));
        assert_eq!(text.as_bytes(), Some(&b"Hello"[..]));

        let bin = Object::ByteString(vec![0xff, 0x00]);
        assert!(bin.as_text().is_none());
        assert_eq!(bin.as_bytes(), Some(&[0xff, 0x00][..]));
        assert!(bin.is_string());
    }

    #[test]
    fn test_object_stream_dict_access() {
        let obj = Object::Stream {
            dict: Object::dict([("Length", Object::Integer(100))])
                .as_dict()
                .cloned()
                .unwrap(),
            data: Bytes::from_static(b"stream data"),
        };

        let d = obj.as_dict().unwrap();
        assert_eq!(d.get("Length").unwrap().as_integer(), Some(100));
        assert!(obj.is_dict());
        assert!(obj.is_stream());
    }

    #[test]
    fn test_object_ref_display() {
        let obj_ref = ObjectRef::new(10, 0);
        assert_eq!(format!("{}", obj_ref), "10 0 R");
    }

    #[test]
    fn test_dictionary_keeps_insertion_order() {
        let mut obj = Object::dict(Vec::<(String, Object)>::new());
        obj.put("Zeta", 1).unwrap();
        obj.put("Alpha", 2).unwrap();
        obj.put("Mid", 3).unwrap();
        let keys: Vec<&str> = obj.as_dict().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["Zeta", "Alpha", "Mid"]);

        obj.delete("Alpha").unwrap();
        let keys: Vec<&str> = obj.as_dict().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["Zeta", "Mid"]);
    }

    #[test]
    fn test_put_array_append_and_bounds() {
        let mut arr = Object::Array(vec![Object::Integer(1)]);
        arr.put(0usize, 10).unwrap();
        arr.put(1usize, 20).unwrap();
        assert_eq!(arr, Object::Array(vec![Object::Integer(10), Object::Integer(20)]));

        let err = arr.put(5usize, 1).unwrap_err();
        assert!(matches!(err, Error::ArrayIndexOutOfRange { index: 5, len: 2 }));
    }

    #[test]
    fn test_put_wrong_container() {
        let mut arr = Object::Array(vec![]);
        let err = arr.put("Key", 1).unwrap_err();
        assert!(matches!(err, Error::InvalidObjectType { .. }));

        let mut int = Object::Integer(3);
        assert!(int.push(1).is_err());
        assert!(int.delete(0usize).is_err());
    }

    #[test]
    fn test_delete_missing_key_is_noop() {
        let mut obj = Object::dict([("A", Object::Integer(1))]);
        obj.delete("Missing").unwrap();
        assert_eq!(obj.len(), 1);
    }

    #[test]
    fn test_string_coercion() {
        assert_eq!(Object::from("Helvetica"), Object::name("Helvetica"));
        assert_eq!(Object::from("(Hello)"), Object::text("Hello"));
        assert_eq!(Object::from("()"), Object::text(""));
        assert_eq!(Object::from("("), Object::name("("));
    }

    #[test]
    fn test_from_plain() {
        let value = serde_json::json!({
            "Type": "Page",
            "Count": 3,
            "Scale": 1.5,
            "Whole": 2.0,
            "Title": "(Intro)",
            "Flags": [true, null],
        });
        let obj = Object::from_plain(&value);
        let dict = obj.as_dict().unwrap();
        assert_eq!(dict["Type"], Object::name("Page"));
        assert_eq!(dict["Count"], Object::Integer(3));
        assert_eq!(dict["Scale"], Object::Real(1.5));
        assert_eq!(dict["Whole"], Object::Integer(2));
        assert_eq!(dict["Title"], Object::text("Intro"));
        assert_eq!(
            dict["Flags"],
            Object::Array(vec![Object::Boolean(true), Object::Null])
        );
    }

    #[test]
    fn test_path_key_from_object() {
        assert_eq!(
            PathKey::from_object(&Object::name("Kids")),
            Some(PathKey::Name("Kids".into()))
        );
        assert_eq!(PathKey::from_object(&Object::Integer(2)), Some(PathKey::Index(2)));
        assert_eq!(PathKey::from_object(&Object::Integer(-1)), None);
        assert_eq!(PathKey::from_object(&Object::Null), None);
    }

    #[test]
    fn test_rect_round_trip() {
        let obj = Object::rect([0.0, 0.0, 612.0, 792.5]);
        assert_eq!(obj.as_array().unwrap()[2], Object::Integer(612));
        assert_eq!(obj.as_rect(), Some([0.0, 0.0, 612.0, 792.5]));
        assert_eq!(Object::Integer(1).as_rect(), None);
    }

    #[test]
    fn test_decode_stream_no_filter() {
        let obj = Object::Stream {
            dict: Dictionary::new(),
            data: Bytes::from_static(b"Hello"),
        };
        assert_eq!(obj.decode_stream_data().unwrap(), b"Hello");
    }

    #[test]
    fn test_decode_stream_flate() {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"BT /F1 12 Tf ET").unwrap();
        let compressed = encoder.finish().unwrap();

        let mut dict = Dictionary::new();
        dict.insert("Filter".to_string(), Object::name("FlateDecode"));
        let obj = Object::Stream {
            dict,
            data: Bytes::from(compressed),
        };
        assert_eq!(obj.decode_stream_data().unwrap(), b"BT /F1 12 Tf ET");
    }

    #[test]
    fn test_decode_stream_unsupported_filter() {
        let mut dict = Dictionary::new();
        dict.insert(
            "Filter".to_string(),
            Object::Array(vec![Object::name("ASCII85Decode")]),
        );
        let obj = Object::Stream {
            dict,
            data: Bytes::from_static(b"abc"),
        };
        assert!(matches!(obj.decode_stream_data(), Err(Error::UnsupportedFilter(f)) if f == "ASCII85Decode"));
    }

    #[test]
    fn test_decode_stream_not_a_stream() {
        match Object::Integer(42).decode_stream_data() {
            Err(Error::InvalidObjectType { expected, found }) => {
                assert_eq!(expected, "Stream");
                assert_eq!(found, "Integer");
            },
            _ => panic!("Expected InvalidObjectType error"),
        }
    }

    #[test]
    fn test_extract_filter_names_invalid() {
        assert!(extract_filter_names(&Object::Integer(42)).is_empty());
    }
}
