//! XMP value types
//!
//! Values cross the API as an [`XmpValue`]. Scalars are stored in the tree
//! as strings; [`ValueType`] converts and validates them on the way in.

use crate::core::error::{XmpError, XmpResult};
use crate::core::namespace::NamespaceMap;
use crate::core::node::{ArrayNode, ArrayType, Node, StructureNode};
use crate::utils::datetime::XmpDateTime;
use std::fmt;

/// XMP property value types
#[derive(Debug, Clone, PartialEq)]
pub enum XmpValue {
    /// String value
    String(String),
    /// Integer value
    Integer(i64),
    /// Floating point value
    Number(f64),
    /// Boolean value
    Boolean(bool),
    /// Date/time value
    DateTime(XmpDateTime),
    /// Array items
    Array(Vec<XmpValue>),
    /// Structure fields keyed by qualified name (`prefix:name`)
    Structure(Vec<(String, XmpValue)>),
}

impl XmpValue {
    /// Get the value as a string, if it is a string type
    pub fn as_str(&self) -> Option<&str> {
        match self {
            XmpValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as an integer, if it is an integer type
    pub fn as_int(&self) -> Option<i64> {
        match self {
            XmpValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the value as a float, if it is numeric
    pub fn as_float(&self) -> Option<f64> {
        match self {
            XmpValue::Number(n) => Some(*n),
            XmpValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get the value as a boolean, if it is a boolean type
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            XmpValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the value as a date, if it is a date type
    pub fn as_date(&self) -> Option<&XmpDateTime> {
        match self {
            XmpValue::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    /// Get the array items, if this is an array
    pub fn as_array(&self) -> Option<&[XmpValue]> {
        match self {
            XmpValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a structure field by qualified name
    pub fn field(&self, qname: &str) -> Option<&XmpValue> {
        match self {
            XmpValue::Structure(fields) => {
                fields.iter().find(|(k, _)| k == qname).map(|(_, v)| v)
            }
            _ => None,
        }
    }

    /// Whether this is a scalar (not an array or structure)
    pub fn is_scalar(&self) -> bool {
        !matches!(self, XmpValue::Array(_) | XmpValue::Structure(_))
    }

    /// The string stored in the tree for a scalar value
    pub fn to_xmp_string(&self) -> Option<String> {
        match self {
            XmpValue::String(s) => Some(s.clone()),
            XmpValue::Integer(i) => Some(i.to_string()),
            XmpValue::Number(n) => Some(n.to_string()),
            XmpValue::Boolean(b) => Some(if *b { "True" } else { "False" }.to_string()),
            XmpValue::DateTime(dt) => Some(dt.format()),
            XmpValue::Array(_) | XmpValue::Structure(_) => None,
        }
    }

    /// Snapshot a tree node as a value
    pub(crate) fn from_node(node: &Node, namespaces: &NamespaceMap) -> Self {
        match node {
            Node::Simple(s) => XmpValue::String(s.value.clone()),
            Node::Array(a) => XmpValue::Array(
                a.items
                    .iter()
                    .map(|item| XmpValue::from_node(item, namespaces))
                    .collect(),
            ),
            Node::Structure(s) => XmpValue::Structure(
                s.fields
                    .iter()
                    .map(|f| {
                        let key = match namespaces.get_prefix(&f.namespace) {
                            Some(prefix) => format!("{}:{}", prefix, f.name),
                            None => f.name.clone(),
                        };
                        (key, XmpValue::from_node(&f.node, namespaces))
                    })
                    .collect(),
            ),
        }
    }

    /// Build a tree node from this value.
    ///
    /// New arrays are ordered. Unprefixed structure keys take `default_ns`.
    pub(crate) fn to_node(&self, default_ns: &str, namespaces: &NamespaceMap) -> XmpResult<Node> {
        match self {
            XmpValue::Array(items) => {
                let mut array = ArrayNode::new(ArrayType::Ordered);
                for item in items {
                    array.append(item.to_node(default_ns, namespaces)?);
                }
                Ok(Node::Array(array))
            }
            XmpValue::Structure(fields) => {
                let mut structure = StructureNode::new();
                for (key, value) in fields {
                    let (uri, name) = match key.split_once(':') {
                        Some((prefix, name)) => {
                            let uri = namespaces.get_uri(prefix).ok_or_else(|| {
                                XmpError::BadSchema(format!(
                                    "Unknown namespace prefix '{}'",
                                    prefix
                                ))
                            })?;
                            (uri.to_string(), name)
                        }
                        None => (default_ns.to_string(), key.as_str()),
                    };
                    structure.set_field(&uri, name, value.to_node(default_ns, namespaces)?);
                }
                Ok(Node::Structure(structure))
            }
            scalar => Ok(Node::simple(scalar.to_xmp_string().unwrap_or_default())),
        }
    }
}

impl fmt::Display for XmpValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XmpValue::Array(_) => write!(f, "[Array]"),
            XmpValue::Structure(_) => write!(f, "[Structure]"),
            scalar => write!(f, "{}", scalar.to_xmp_string().unwrap_or_default()),
        }
    }
}

#[cfg(feature = "serde")]
impl serde::ser::Serialize for XmpValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        use serde::ser::SerializeMap;
        match self {
            XmpValue::String(s) => serializer.serialize_str(s),
            XmpValue::Integer(i) => serializer.serialize_i64(*i),
            XmpValue::Number(n) => serializer.serialize_f64(*n),
            XmpValue::Boolean(b) => serializer.serialize_bool(*b),
            XmpValue::DateTime(dt) => serializer.serialize_str(&dt.format()),
            XmpValue::Array(arr) => arr.serialize(serializer),
            XmpValue::Structure(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (k, v) in fields {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

impl From<String> for XmpValue {
    fn from(s: String) -> Self {
        XmpValue::String(s)
    }
}

impl From<&str> for XmpValue {
    fn from(s: &str) -> Self {
        XmpValue::String(s.to_string())
    }
}

impl From<i64> for XmpValue {
    fn from(i: i64) -> Self {
        XmpValue::Integer(i)
    }
}

impl From<f64> for XmpValue {
    fn from(n: f64) -> Self {
        XmpValue::Number(n)
    }
}

impl From<bool> for XmpValue {
    fn from(b: bool) -> Self {
        XmpValue::Boolean(b)
    }
}

impl From<XmpDateTime> for XmpValue {
    fn from(dt: XmpDateTime) -> Self {
        XmpValue::DateTime(dt)
    }
}

/// Target type tag for string values passed to typed setters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueType {
    /// Any string
    String,
    /// Signed 64-bit integer, decimal or `0x` hexadecimal
    Integer,
    /// Floating point number
    Number,
    /// `True`/`False` and the usual spellings of both
    Boolean,
    /// ISO 8601 date
    Date,
}

impl ValueType {
    /// Convert and validate `text`, failing with [`XmpError::BadValue`]
    pub fn convert(self, text: &str) -> XmpResult<XmpValue> {
        let trimmed = text.trim();
        let bad = || XmpError::BadValue(format!("'{}' is not a valid {:?}", text, self));
        match self {
            ValueType::String => Ok(XmpValue::String(text.to_string())),
            ValueType::Integer => {
                let (negative, digits) = match trimmed.strip_prefix('-') {
                    Some(rest) => (true, rest),
                    None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
                };
                let magnitude = match digits
                    .strip_prefix("0x")
                    .or_else(|| digits.strip_prefix("0X"))
                {
                    Some(hex) => i64::from_str_radix(hex, 16),
                    None => digits.parse::<i64>(),
                }
                .map_err(|_| bad())?;
                Ok(XmpValue::Integer(if negative { -magnitude } else { magnitude }))
            }
            ValueType::Number => trimmed
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(XmpValue::Number)
                .ok_or_else(bad),
            ValueType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "t" | "yes" | "on" | "1" => Ok(XmpValue::Boolean(true)),
                "false" | "f" | "no" | "off" | "0" => Ok(XmpValue::Boolean(false)),
                _ => Err(bad()),
            },
            ValueType::Date => XmpDateTime::parse(trimmed)
                .map(XmpValue::DateTime)
                .map_err(|_| bad()),
        }
    }
}
