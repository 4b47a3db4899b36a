//! Postgres adapter: placeholder rewriting, row decoding, and table introspection.

use tokio_postgres::error::SqlState;
use rust_decimal::Decimal;
use tokio_postgres::types::{FromSql, Kind, ToSql, Type};
use tokio_postgres::{GenericClient as PgClient, Row};

use crate::error::{OrmError, OrmResult};
use crate::row::Record;
use crate::schema::{ColumnDescriptor, ForeignKeyRef, TableDescription};
use crate::value::{Bindings, Value};

/// Rewrite `:name` placeholders to Postgres `$n` parameters.
///
/// Repeated names reuse their index. Quoted literals, quoted identifiers and
/// `::` casts are left alone. A name missing from `bindings` is a usage error.
pub fn to_positional<'a>(sql: &str, bindings: &'a Bindings) -> OrmResult<(String, Vec<&'a Value>)> {
    let mut out = String::with_capacity(sql.len());
    let mut order: Vec<&str> = Vec::new();
    let mut params: Vec<&'a Value> = Vec::new();
    let mut chars = sql.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '\'' | '"' => {
                out.push(c);
                for (_, inner) in chars.by_ref() {
                    out.push(inner);
                    if inner == c {
                        break;
                    }
                }
            }
            ':' if matches!(chars.peek(), Some((_, ':'))) => {
                out.push_str("::");
                chars.next();
            }
            ':' if matches!(chars.peek(), Some((_, n)) if n.is_ascii_alphabetic() || *n == '_') => {
                let start = i + 1;
                let mut end = start;
                while let Some((j, n)) = chars.peek().copied() {
                    if n.is_ascii_alphanumeric() || n == '_' {
                        end = j + n.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let name = &sql[start..end];
                let index = match order.iter().position(|k| *k == name) {
                    Some(pos) => pos + 1,
                    None => {
                        let value = bindings.get(name).ok_or_else(|| {
                            OrmError::usage(format!("no value bound for placeholder :{name}"))
                        })?;
                        order.push(name);
                        params.push(value);
                        order.len()
                    }
                };
                out.push('$');
                out.push_str(&index.to_string());
            }
            _ => out.push(c),
        }
    }

    Ok((out, params))
}

pub(crate) async fn fetch<C>(client: &C, sql: &str, bindings: &Bindings) -> OrmResult<Vec<Record>>
where
    C: PgClient + Sync,
{
    let (sql, values) = to_positional(sql, bindings)?;
    let params: Vec<&(dyn ToSql + Sync)> = values.iter().map(|v| *v as &(dyn ToSql + Sync)).collect();
    let rows = client.query(sql.as_str(), &params).await?;
    rows.iter().map(record_from_row).collect()
}

pub(crate) async fn execute<C>(client: &C, sql: &str, bindings: &Bindings) -> OrmResult<u64>
where
    C: PgClient + Sync,
{
    let (sql, values) = to_positional(sql, bindings)?;
    let params: Vec<&(dyn ToSql + Sync)> = values.iter().map(|v| *v as &(dyn ToSql + Sync)).collect();
    Ok(client.execute(sql.as_str(), &params).await?)
}

pub(crate) async fn last_insert_id<C>(client: &C) -> OrmResult<Option<Value>>
where
    C: PgClient + Sync,
{
    match client.query_one("SELECT lastval()", &[]).await {
        Ok(row) => Ok(Some(Value::Int(row.try_get::<_, i64>(0)?))),
        Err(e) if e.code() == Some(&SqlState::OBJECT_NOT_IN_PREREQUISITE_STATE) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Decode a driver row into a [`Record`].
pub fn record_from_row(row: &Row) -> OrmResult<Record> {
    let mut record = Record::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = decode_column(row, idx, column.type_())
            .map_err(|e| OrmError::decode(column.name(), e.to_string()))?;
        record.push(column.name(), value);
    }
    Ok(record)
}

type DecodeError = Box<dyn std::error::Error + Sync + Send>;

/// A column's undecoded bytes, accepted for every type.
struct RawColumn<'a>(&'a [u8]);

impl<'a> FromSql<'a> for RawColumn<'a> {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, DecodeError> {
        Ok(Self(raw))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

fn decode_column(row: &Row, idx: usize, ty: &Type) -> Result<Value, DecodeError> {
    match row.try_get::<_, Option<RawColumn<'_>>>(idx)? {
        Some(RawColumn(raw)) => decode_raw(ty, raw),
        None => Ok(Value::Null),
    }
}

/// Decode one non-NULL binary value.
///
/// NUMERIC keeps its exact text form. Types without a dedicated arm fall back
/// to their bytes as text (the binary form of enums and text-like types).
fn decode_raw(ty: &Type, raw: &[u8]) -> Result<Value, DecodeError> {
    let value = match *ty {
        Type::BOOL => bool::from_sql(ty, raw)?.into(),
        Type::INT2 => i16::from_sql(ty, raw)?.into(),
        Type::INT4 => i32::from_sql(ty, raw)?.into(),
        Type::INT8 => i64::from_sql(ty, raw)?.into(),
        Type::OID => u32::from_sql(ty, raw)?.into(),
        Type::FLOAT4 => f32::from_sql(ty, raw)?.into(),
        Type::FLOAT8 => f64::from_sql(ty, raw)?.into(),
        Type::NUMERIC => Value::Text(Decimal::from_sql(ty, raw)?.to_string()),
        Type::UUID => uuid::Uuid::from_sql(ty, raw)?.into(),
        Type::DATE => chrono::NaiveDate::from_sql(ty, raw)?.into(),
        Type::TIME => Value::Text(chrono::NaiveTime::from_sql(ty, raw)?.to_string()),
        Type::TIMESTAMP => chrono::NaiveDateTime::from_sql(ty, raw)?.into(),
        Type::TIMESTAMPTZ => chrono::DateTime::<chrono::Utc>::from_sql(ty, raw)?.into(),
        Type::INTERVAL => Value::Text(interval_text(raw)?),
        Type::JSON | Type::JSONB => Value::Text(serde_json::Value::from_sql(ty, raw)?.to_string()),
        Type::BYTEA => Value::Text(bytea_text(raw)),
        _ => match ty.kind() {
            Kind::Domain(inner) => decode_raw(inner, raw)?,
            Kind::Array(member) => Value::List(
                Vec::<Option<RawColumn<'_>>>::from_sql(ty, raw)?
                    .into_iter()
                    .map(|element| match element {
                        Some(RawColumn(raw)) => decode_raw(member, raw),
                        None => Ok(Value::Null),
                    })
                    .collect::<Result<_, _>>()?,
            ),
            _ => Value::Text(String::from_utf8_lossy(raw).into_owned()),
        },
    };
    Ok(value)
}

/// `\x`-prefixed hex, as Postgres prints BYTEA.
fn bytea_text(raw: &[u8]) -> String {
    let mut out = String::with_capacity(2 + raw.len() * 2);
    out.push_str("\\x");
    for byte in raw {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Binary INTERVAL (microseconds, days, months) as `M mons D days HH:MM:SS.ffffff`.
fn interval_text(raw: &[u8]) -> Result<String, DecodeError> {
    let raw: &[u8; 16] = raw
        .try_into()
        .map_err(|_| format!("invalid interval length {}", raw.len()))?;
    let micros = i64::from_be_bytes([
        raw[0], raw[1], raw[2], raw[3], raw[4], raw[5], raw[6], raw[7],
    ]);
    let days = i32::from_be_bytes([raw[8], raw[9], raw[10], raw[11]]);
    let months = i32::from_be_bytes([raw[12], raw[13], raw[14], raw[15]]);

    let sign = if micros < 0 { "-" } else { "" };
    let total = micros.unsigned_abs();
    let (secs, frac) = (total / 1_000_000, total % 1_000_000);
    Ok(format!(
        "{months} mons {days} days {sign}{:02}:{:02}:{:02}.{frac:06}",
        secs / 3600,
        secs / 60 % 60,
        secs % 60
    ))
}

const DESCRIBE_SQL: &str = r#"
SELECT
  a.attname::text AS column_name,
  pg_catalog.format_type(a.atttypid, a.atttypmod) AS data_type,
  a.attnotnull AS not_null,
  pg_catalog.pg_get_expr(ad.adbin, ad.adrelid) AS default_expr,
  (a.attidentity <> '') AS is_identity,
  pk.conname::text AS pk_name,
  EXISTS (
    SELECT 1 FROM pg_catalog.pg_constraint u
    WHERE u.conrelid = c.oid AND u.contype = 'u' AND u.conkey = ARRAY[a.attnum]
  ) AS is_unique,
  EXISTS (
    SELECT 1 FROM pg_catalog.pg_constraint ck
    WHERE ck.conrelid = c.oid AND ck.contype = 'c'
      AND ck.conname::text = c.relname::text || '_' || a.attname::text || '_unsigned'
  ) AS is_unsigned,
  fk.conname::text AS fk_name,
  fr.relname::text AS fk_table,
  fa.attname::text AS fk_column
FROM pg_catalog.pg_class c
JOIN pg_catalog.pg_attribute a ON a.attrelid = c.oid
LEFT JOIN pg_catalog.pg_attrdef ad ON ad.adrelid = c.oid AND ad.adnum = a.attnum
LEFT JOIN pg_catalog.pg_constraint pk
  ON pk.conrelid = c.oid AND pk.contype = 'p' AND a.attnum = ANY(pk.conkey)
LEFT JOIN LATERAL (
  SELECT f.conname, f.confrelid, f.confkey FROM pg_catalog.pg_constraint f
  WHERE f.conrelid = c.oid AND f.contype = 'f' AND f.conkey = ARRAY[a.attnum]
  LIMIT 1
) fk ON TRUE
LEFT JOIN pg_catalog.pg_class fr ON fr.oid = fk.confrelid
LEFT JOIN pg_catalog.pg_attribute fa ON fa.attrelid = fk.confrelid AND fa.attnum = fk.confkey[1]
WHERE c.relname = $1
  AND c.relkind IN ('r', 'p')
  AND pg_catalog.pg_table_is_visible(c.oid)
  AND a.attnum > 0
  AND NOT a.attisdropped
ORDER BY a.attnum
"#;

pub(crate) async fn describe_table<C>(client: &C, table: &str) -> OrmResult<TableDescription>
where
    C: PgClient + Sync,
{
    let rows = client.query(DESCRIBE_SQL, &[&table]).await?;
    if rows.is_empty() {
        return Err(OrmError::usage(format!("table '{table}' does not exist")));
    }

    let mut description = TableDescription::new(table);
    for row in &rows {
        let column = describe_column(row)?;
        if description.primary_key_constraint.is_none() {
            description.primary_key_constraint = get::<Option<String>>(row, "pk_name")?;
        }
        description.columns.push(column);
    }
    Ok(description)
}

fn describe_column(row: &Row) -> OrmResult<ColumnDescriptor> {
    let fk_name: Option<String> = get(row, "fk_name")?;
    let foreign_key = match fk_name {
        Some(constraint) => Some(ForeignKeyRef {
            constraint,
            table: get::<Option<String>>(row, "fk_table")?.unwrap_or_default(),
            column: get::<Option<String>>(row, "fk_column")?.unwrap_or_default(),
        }),
        None => None,
    };

    Ok(ColumnDescriptor {
        name: get(row, "column_name")?,
        data_type: get(row, "data_type")?,
        nullable: !get::<bool>(row, "not_null")?,
        default: get(row, "default_expr")?,
        primary_key: get::<Option<String>>(row, "pk_name")?.is_some(),
        unique: get(row, "is_unique")?,
        auto_increment: get(row, "is_identity")?,
        unsigned: get(row, "is_unsigned")?,
        foreign_key,
    })
}

fn get<'r, T>(row: &'r Row, column: &str) -> OrmResult<T>
where
    T: tokio_postgres::types::FromSql<'r>,
{
    row.try_get(column)
        .map_err(|e| OrmError::decode(column, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bindings(pairs: &[(&str, Value)]) -> Bindings {
        pairs.iter().cloned().collect()
    }

    #[test]
    fn rewrites_named_placeholders() {
        let b = bindings(&[("name", Value::from("a")), ("slug", Value::from("b"))]);
        let (sql, params) =
            to_positional("INSERT INTO t (name, slug) VALUES (:name, :slug)", &b).unwrap();
        assert_eq!(sql, "INSERT INTO t (name, slug) VALUES ($1, $2)");
        assert_eq!(params, [&Value::from("a"), &Value::from("b")]);
    }

    #[test]
    fn repeated_placeholder_reuses_index() {
        let b = bindings(&[("v", Value::from(1))]);
        let (sql, params) = to_positional("SELECT :v, :v + 1", &b).unwrap();
        assert_eq!(sql, "SELECT $1, $1 + 1");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn skips_casts_and_literals() {
        let b = bindings(&[("id", Value::from(3))]);
        let (sql, _) =
            to_positional("SELECT ':id', \"a:b\", x::text FROM t WHERE id = :id", &b).unwrap();
        assert_eq!(sql, "SELECT ':id', \"a:b\", x::text FROM t WHERE id = $1");
    }

    #[test]
    fn unbound_placeholder_is_usage_error() {
        let err = to_positional("SELECT * FROM t WHERE id = :id", &Bindings::new()).unwrap_err();
        assert!(err.is_usage());
    }

    fn encoded<T: ToSql>(value: T, ty: &Type) -> Vec<u8> {
        let mut buf = bytes::BytesMut::new();
        value.to_sql(ty, &mut buf).unwrap();
        buf.to_vec()
    }

    #[test]
    fn numeric_and_time_decode_as_text() {
        let price = encoded(Decimal::new(1250, 2), &Type::NUMERIC);
        assert_eq!(decode_raw(&Type::NUMERIC, &price).unwrap(), Value::from("12.50"));

        let time = encoded(chrono::NaiveTime::from_hms_opt(8, 30, 0).unwrap(), &Type::TIME);
        assert_eq!(decode_raw(&Type::TIME, &time).unwrap(), Value::from("08:30:00"));
    }

    #[test]
    fn scalar_columns_keep_their_kind() {
        let n = encoded(7i32, &Type::INT4);
        assert_eq!(decode_raw(&Type::INT4, &n).unwrap(), Value::Int(7));
        let b = encoded(true, &Type::BOOL);
        assert_eq!(decode_raw(&Type::BOOL, &b).unwrap(), Value::Bool(true));
        let t = encoded("hello", &Type::VARCHAR);
        assert_eq!(decode_raw(&Type::VARCHAR, &t).unwrap(), Value::from("hello"));
    }

    #[test]
    fn bytea_and_interval_render_like_postgres() {
        assert_eq!(
            decode_raw(&Type::BYTEA, &[0xde, 0xad, 0x01]).unwrap(),
            Value::from("\\xdead01")
        );

        let mut interval = Vec::new();
        interval.extend_from_slice(&(3_723_000_500i64).to_be_bytes());
        interval.extend_from_slice(&2i32.to_be_bytes());
        interval.extend_from_slice(&1i32.to_be_bytes());
        assert_eq!(
            decode_raw(&Type::INTERVAL, &interval).unwrap(),
            Value::from("1 mons 2 days 01:02:03.000500")
        );
        assert!(decode_raw(&Type::INTERVAL, &[0; 4]).is_err());
    }

    #[test]
    fn arrays_domains_and_enums() {
        let ints = encoded(vec![Some(1i32), None, Some(3)], &Type::INT4_ARRAY);
        assert_eq!(
            decode_raw(&Type::INT4_ARRAY, &ints).unwrap(),
            Value::List(vec![Value::Int(1), Value::Null, Value::Int(3)])
        );

        let price = Type::new("price".into(), 0, Kind::Domain(Type::NUMERIC), "public".into());
        let raw = encoded(Decimal::new(5, 0), &Type::NUMERIC);
        assert_eq!(decode_raw(&price, &raw).unwrap(), Value::from("5"));

        let mood = Type::new("mood".into(), 0, Kind::Enum(vec!["happy".into()]), "public".into());
        assert_eq!(decode_raw(&mood, b"happy").unwrap(), Value::from("happy"));
    }
}
