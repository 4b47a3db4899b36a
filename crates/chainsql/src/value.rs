//! Dynamic SQL values and the named bind map.
//!
//! Builder verbs accept anything convertible into [`Value`]. A [`Value::List`] passed
//! to a filter verb becomes an OR group of individually bound terms.

use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use rust_decimal::Decimal;
use std::str::FromStr;
use tokio_postgres::types::{IsNull, Kind, ToSql, Type, WrongType, to_sql_checked};

/// A SQL value that travels as a bound parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// NULL value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// Text value.
    Text(String),
    /// A list of values. Only meaningful as a filter operand.
    List(Vec<Value>),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns `true` for [`Value::List`].
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    /// Borrow the text payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer payload, if any.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Render the value as an escaped SQL literal.
    ///
    /// Only DDL uses this (`DEFAULT ...`, where no driver binds parameters);
    /// everything else goes through bind parameters.
    pub fn to_sql_literal(&self) -> String {
        match self {
            Self::Null => String::from("NULL"),
            Self::Bool(true) => String::from("TRUE"),
            Self::Bool(false) => String::from("FALSE"),
            Self::Int(n) => n.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => format!("'{}'", s.replace('\'', "''")),
            Self::List(items) => {
                let parts: Vec<String> = items.iter().map(Self::to_sql_literal).collect();
                format!("({})", parts.join(", "))
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
            Self::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

macro_rules! value_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Int(i64::from(v))
                }
            }
        )*
    };
}

value_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<uuid::Uuid> for Value {
    fn from(v: uuid::Uuid) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<chrono::NaiveDate> for Value {
    fn from(v: chrono::NaiveDate) -> Self {
        Value::Text(v.format("%Y-%m-%d").to_string())
    }
}

impl From<chrono::NaiveDateTime> for Value {
    fn from(v: chrono::NaiveDateTime) -> Self {
        Value::Text(v.format("%Y-%m-%d %H:%M:%S%.f").to_string())
    }
}

impl From<chrono::DateTime<chrono::Utc>> for Value {
    fn from(v: chrono::DateTime<chrono::Utc>) -> Self {
        Value::Text(v.to_rfc3339())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value> + Clone, const N: usize> From<[T; N]> for Value {
    fn from(v: [T; N]) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

// Postgres infers parameter types from the statement; each variant is encoded as
// the type it asked for, or rejected when no faithful encoding exists.
impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => bool_to_sql(*b, ty, out),
            Value::Int(n) => int_to_sql(*n, ty, out),
            Value::Float(f) => float_to_sql(*f, ty, out),
            Value::Text(s) => text_to_sql(s, ty, out),
            Value::List(_) => Err("list values cannot be bound as a single parameter".into()),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

type EncodeResult = Result<IsNull, Box<dyn Error + Sync + Send>>;

/// Types that take the text encoding: the text family, `citext` and enums.
fn is_textual(ty: &Type) -> bool {
    <&str as ToSql>::accepts(ty) || matches!(ty.kind(), Kind::Enum(_))
}

fn wrong_type<T>(ty: &Type) -> EncodeResult {
    Err(Box::new(WrongType::new::<T>(ty.clone())))
}

fn bool_to_sql(b: bool, ty: &Type, out: &mut BytesMut) -> EncodeResult {
    match *ty {
        Type::BOOL => b.to_sql(ty, out),
        Type::JSON | Type::JSONB => serde_json::Value::Bool(b).to_sql(ty, out),
        _ if is_textual(ty) => <&str as ToSql>::to_sql(&b.to_string().as_str(), ty, out),
        _ => wrong_type::<bool>(ty),
    }
}

fn int_to_sql(n: i64, ty: &Type, out: &mut BytesMut) -> EncodeResult {
    match *ty {
        Type::INT2 => i16::try_from(n)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(n)?.to_sql(ty, out),
        Type::INT8 => n.to_sql(ty, out),
        Type::OID => u32::try_from(n)?.to_sql(ty, out),
        Type::FLOAT4 => (n as f32).to_sql(ty, out),
        Type::FLOAT8 => (n as f64).to_sql(ty, out),
        Type::NUMERIC => Decimal::from(n).to_sql(ty, out),
        Type::JSON | Type::JSONB => serde_json::Value::from(n).to_sql(ty, out),
        _ if is_textual(ty) => <&str as ToSql>::to_sql(&n.to_string().as_str(), ty, out),
        _ => wrong_type::<i64>(ty),
    }
}

fn float_to_sql(f: f64, ty: &Type, out: &mut BytesMut) -> EncodeResult {
    match *ty {
        Type::FLOAT4 => (f as f32).to_sql(ty, out),
        Type::FLOAT8 => f.to_sql(ty, out),
        Type::NUMERIC => Decimal::try_from(f)?.to_sql(ty, out),
        Type::JSON | Type::JSONB => {
            let number = serde_json::Number::from_f64(f)
                .ok_or("non-finite float cannot be encoded as JSON")?;
            serde_json::Value::Number(number).to_sql(ty, out)
        }
        _ if is_textual(ty) => <&str as ToSql>::to_sql(&f.to_string().as_str(), ty, out),
        _ => wrong_type::<f64>(ty),
    }
}

fn text_to_sql(s: &str, ty: &Type, out: &mut BytesMut) -> EncodeResult {
    match *ty {
        Type::INT2 => s.parse::<i16>()?.to_sql(ty, out),
        Type::INT4 => s.parse::<i32>()?.to_sql(ty, out),
        Type::INT8 => s.parse::<i64>()?.to_sql(ty, out),
        Type::FLOAT4 => s.parse::<f32>()?.to_sql(ty, out),
        Type::FLOAT8 => s.parse::<f64>()?.to_sql(ty, out),
        Type::NUMERIC => Decimal::from_str(s.trim())?.to_sql(ty, out),
        Type::BOOL => s.parse::<bool>()?.to_sql(ty, out),
        Type::UUID => uuid::Uuid::parse_str(s)?.to_sql(ty, out),
        Type::DATE => chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")?.to_sql(ty, out),
        Type::TIME => chrono::NaiveTime::parse_from_str(s, "%H:%M:%S%.f")?.to_sql(ty, out),
        Type::TIMESTAMP => parse_naive_datetime(s)?.to_sql(ty, out),
        Type::TIMESTAMPTZ => chrono::DateTime::parse_from_rfc3339(s)?
            .with_timezone(&chrono::Utc)
            .to_sql(ty, out),
        Type::JSON | Type::JSONB => serde_json::from_str::<serde_json::Value>(s)?.to_sql(ty, out),
        Type::BYTEA => <&[u8] as ToSql>::to_sql(&s.as_bytes(), ty, out),
        _ if is_textual(ty) => <&str as ToSql>::to_sql(&s, ty, out),
        _ => wrong_type::<String>(ty),
    }
}

fn parse_naive_datetime(s: &str) -> Result<chrono::NaiveDateTime, chrono::ParseError> {
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
}

/// Insertion-ordered map of bind key → value.
///
/// Re-inserting an existing key overwrites the value in place, keeping the
/// original position.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Bindings {
    entries: Vec<(String, Value)>,
}

impl Bindings {
    /// Create an empty bind map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a binding.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Whether a key is bound.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Look up a bound value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find_map(|(k, v)| (k == key).then_some(v))
    }

    /// Merge another map into this one; keys from `other` win.
    pub fn extend(&mut self, other: Bindings) {
        for (k, v) in other.entries {
            self.insert(k, v);
        }
    }

    /// Iterate bindings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Bound keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut out = Bindings::new();
        for (k, v) in iter {
            out.insert(k, v.into());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_escapes_quotes() {
        assert_eq!(Value::from("O'Brien").to_sql_literal(), "'O''Brien'");
        assert_eq!(Value::Null.to_sql_literal(), "NULL");
        assert_eq!(Value::from(false).to_sql_literal(), "FALSE");
    }

    #[test]
    fn option_and_vec_conversions() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some(3)), Value::Int(3));
        assert_eq!(
            Value::from(vec!["a", "b"]),
            Value::List(vec![Value::from("a"), Value::from("b")])
        );
    }

    #[test]
    fn display_is_raw() {
        assert_eq!(Value::from("x@a.com").to_string(), "x@a.com");
        assert_eq!(Value::from(vec![1, 2]).to_string(), "1,2");
    }

    #[test]
    fn bindings_overwrite_in_place() {
        let mut b = Bindings::new();
        b.insert("name", Value::from("a"));
        b.insert("slug", Value::from("b"));
        b.insert("name", Value::from("c"));
        let keys: Vec<&str> = b.keys().collect();
        assert_eq!(keys, ["name", "slug"]);
        assert_eq!(b.get("name"), Some(&Value::from("c")));
    }

    #[test]
    fn untagged_json_shape() {
        let json = serde_json::to_string(&Value::from(vec![Value::Int(1), Value::Null])).unwrap();
        assert_eq!(json, "[1,null]");
        let back: Value = serde_json::from_str("\"hi\"").unwrap();
        assert_eq!(back, Value::from("hi"));
    }

    fn encode(value: &Value, ty: &Type) -> Result<Vec<u8>, Box<dyn Error + Sync + Send>> {
        let mut buf = BytesMut::new();
        value.to_sql_checked(ty, &mut buf)?;
        Ok(buf.to_vec())
    }

    fn native<T: ToSql>(value: T, ty: &Type) -> Vec<u8> {
        let mut buf = BytesMut::new();
        value.to_sql(ty, &mut buf).unwrap();
        buf.to_vec()
    }

    fn decimal(bytes: &[u8]) -> Decimal {
        use tokio_postgres::types::FromSql;
        Decimal::from_sql(&Type::NUMERIC, bytes).unwrap()
    }

    #[test]
    fn int_takes_the_requested_width() {
        assert_eq!(encode(&Value::Int(10), &Type::INT2).unwrap(), native(10i16, &Type::INT2));
        assert_eq!(encode(&Value::Int(10), &Type::INT4).unwrap(), native(10i32, &Type::INT4));
        assert_eq!(encode(&Value::Int(10), &Type::INT8).unwrap(), native(10i64, &Type::INT8));
        assert_eq!(encode(&Value::Int(10), &Type::FLOAT8).unwrap(), native(10f64, &Type::FLOAT8));
        assert_eq!(encode(&Value::Int(10), &Type::TEXT).unwrap(), b"10");
        assert!(encode(&Value::Int(1 << 40), &Type::INT4).is_err());
    }

    #[test]
    fn numeric_parameters_go_through_decimal() {
        let bytes = encode(&Value::Int(10), &Type::NUMERIC).unwrap();
        assert_ne!(bytes, native(10i64, &Type::INT8));
        assert_eq!(decimal(&bytes), Decimal::from(10));

        let bytes = encode(&Value::Float(2.5), &Type::NUMERIC).unwrap();
        assert_eq!(decimal(&bytes), Decimal::new(25, 1));

        let bytes = encode(&Value::from("12.50"), &Type::NUMERIC).unwrap();
        assert_eq!(decimal(&bytes), Decimal::new(1250, 2));

        assert!(encode(&Value::Float(f64::NAN), &Type::NUMERIC).is_err());
        assert!(encode(&Value::from("ten"), &Type::NUMERIC).is_err());
    }

    #[test]
    fn bool_only_binds_to_boolean_or_text() {
        assert_eq!(encode(&Value::Bool(true), &Type::BOOL).unwrap(), native(true, &Type::BOOL));
        assert_eq!(encode(&Value::Bool(true), &Type::VARCHAR).unwrap(), b"true");
        assert!(encode(&Value::Bool(true), &Type::INT4).is_err());
    }

    #[test]
    fn float_coercions() {
        assert_eq!(encode(&Value::Float(1.5), &Type::FLOAT4).unwrap(), native(1.5f32, &Type::FLOAT4));
        assert_eq!(
            encode(&Value::Float(1.5), &Type::JSONB).unwrap(),
            native(serde_json::json!(1.5), &Type::JSONB)
        );
        assert!(encode(&Value::Float(1.5), &Type::INT4).is_err());
    }

    #[test]
    fn text_parses_into_the_requested_type() {
        assert_eq!(encode(&Value::from("42"), &Type::INT4).unwrap(), native(42i32, &Type::INT4));
        assert_eq!(
            encode(&Value::from("08:30:00"), &Type::TIME).unwrap(),
            native(chrono::NaiveTime::from_hms_opt(8, 30, 0).unwrap(), &Type::TIME)
        );
        assert_eq!(encode(&Value::from("raw"), &Type::BYTEA).unwrap(), b"raw");

        let mood = Type::new(
            "mood".into(),
            0,
            Kind::Enum(vec!["happy".into()]),
            "public".into(),
        );
        assert_eq!(encode(&Value::from("happy"), &mood).unwrap(), b"happy");
    }

    #[test]
    fn unsupported_targets_are_rejected() {
        assert!(encode(&Value::from("10.0.0.1"), &Type::INET).is_err());
        assert!(encode(&Value::Int(1), &Type::UUID).is_err());
        assert!(encode(&Value::from(vec![1, 2]), &Type::INT4).is_err());
    }

    #[test]
    fn null_binds_to_anything() {
        let mut buf = BytesMut::new();
        let is_null = Value::Null.to_sql_checked(&Type::NUMERIC, &mut buf).unwrap();
        assert!(matches!(is_null, IsNull::Yes));
        assert!(buf.is_empty());
    }
}
