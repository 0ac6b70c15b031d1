//! Conversion between engine values and tokio-postgres parameters/rows.

use bytes::BytesMut;
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};
use tokio_postgres::Row;
use workload_core::{to_vector_literal, DbError, SqlRow, SqlValue};

/// NULL that binds to a parameter of any type.
#[derive(Debug)]
struct UntypedNull;

impl ToSql for UntypedNull {
    fn to_sql(
        &self,
        _ty: &Type,
        _out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        Ok(IsNull::Yes)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

/// Convert an engine value into a boxed tokio-postgres parameter.
pub fn to_boxed_param(value: &SqlValue) -> Box<dyn ToSql + Sync + Send> {
    match value {
        SqlValue::Null => Box::new(UntypedNull),
        SqlValue::Bool(b) => Box::new(*b),
        SqlValue::Int(i) => Box::new(*i),
        SqlValue::Float(f) => Box::new(*f),
        SqlValue::Text(s) => Box::new(s.clone()),
        SqlValue::Timestamp(ts) => Box::new(*ts),
        SqlValue::Vector(v) => Box::new(to_vector_literal(v)),
    }
}

/// Box every parameter of a statement.
pub fn to_params(values: &[SqlValue]) -> Vec<Box<dyn ToSql + Sync + Send>> {
    values.iter().map(to_boxed_param).collect()
}

/// Borrow boxed parameters in the form tokio-postgres expects.
pub fn param_refs(params: &[Box<dyn ToSql + Sync + Send>]) -> Vec<&(dyn ToSql + Sync)> {
    params
        .iter()
        .map(|p| p.as_ref() as &(dyn ToSql + Sync))
        .collect()
}

/// Decode a row into positional engine values.
///
/// Column types without an engine counterpart (e.g. `vector`) decode to
/// `Null`; select them as `::text` to read them.
pub fn from_row(row: &Row) -> Result<SqlRow, DbError> {
    let mut values = Vec::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        values.push(decode_column(row, idx, column.type_())?);
    }
    Ok(SqlRow::new(values))
}

fn decode_column(row: &Row, idx: usize, ty: &Type) -> Result<SqlValue, DbError> {
    let value: SqlValue = match *ty {
        Type::BOOL => row
            .try_get::<_, Option<bool>>(idx)
            .map_err(DbError::statement)?
            .into(),
        Type::INT2 => row
            .try_get::<_, Option<i16>>(idx)
            .map_err(DbError::statement)?
            .map(i64::from)
            .into(),
        Type::INT4 => row
            .try_get::<_, Option<i32>>(idx)
            .map_err(DbError::statement)?
            .into(),
        Type::INT8 => row
            .try_get::<_, Option<i64>>(idx)
            .map_err(DbError::statement)?
            .into(),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(idx)
            .map_err(DbError::statement)?
            .map(f64::from)
            .into(),
        Type::FLOAT8 => row
            .try_get::<_, Option<f64>>(idx)
            .map_err(DbError::statement)?
            .into(),
        Type::NUMERIC => row
            .try_get::<_, Option<Decimal>>(idx)
            .map_err(DbError::statement)?
            .and_then(|d| d.to_f64())
            .into(),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => row
            .try_get::<_, Option<String>>(idx)
            .map_err(DbError::statement)?
            .into(),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)
            .map_err(DbError::statement)?
            .into(),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(idx)
            .map_err(DbError::statement)?
            .map(|ts| ts.and_utc())
            .into(),
        _ => SqlValue::Null,
    };
    Ok(value)
}
