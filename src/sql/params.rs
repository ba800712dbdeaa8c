//! Typed values sqlx can bind, built from filter values and JSON payloads.

use crate::query::FilterValue;
use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::Database;

/// A value that can be bound to a PostgreSQL query. Reports its own type so the server
/// never has to guess from text.
#[derive(Clone, Debug, PartialEq)]
pub enum PgBindValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Uuid(uuid::Uuid),
    Timestamp(chrono::DateTime<chrono::Utc>),
    Json(Value),
}

impl PgBindValue {
    /// Scalar filter values only; lists are expanded by the builder.
    pub fn from_filter(v: &FilterValue) -> Self {
        match v {
            FilterValue::Text(s) => PgBindValue::String(s.clone()),
            FilterValue::Int(n) => PgBindValue::I64(*n),
            FilterValue::Float(n) => PgBindValue::F64(*n),
            FilterValue::Bool(b) => PgBindValue::Bool(*b),
            FilterValue::Uuid(u) => PgBindValue::Uuid(*u),
            FilterValue::Timestamp(t) => PgBindValue::Timestamp(*t),
            FilterValue::List(_) => PgBindValue::Null,
        }
    }

    fn pg_type(&self) -> PgTypeInfo {
        use sqlx::Type;
        match self {
            PgBindValue::Null | PgBindValue::String(_) => <String as Type<Postgres>>::type_info(),
            PgBindValue::Bool(_) => <bool as Type<Postgres>>::type_info(),
            PgBindValue::I64(_) => <i64 as Type<Postgres>>::type_info(),
            PgBindValue::F64(_) => <f64 as Type<Postgres>>::type_info(),
            PgBindValue::Uuid(_) => <uuid::Uuid as Type<Postgres>>::type_info(),
            PgBindValue::Timestamp(_) => {
                <chrono::DateTime<chrono::Utc> as Type<Postgres>>::type_info()
            }
            PgBindValue::Json(_) => <Value as Type<Postgres>>::type_info(),
        }
    }
}

impl<'q> Encode<'q, Postgres> for PgBindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        Ok(match self {
            PgBindValue::Null => <Option<String> as Encode<Postgres>>::encode_by_ref(&None, buf)?,
            PgBindValue::Bool(b) => <bool as Encode<Postgres>>::encode_by_ref(b, buf)?,
            PgBindValue::I64(n) => <i64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            PgBindValue::F64(n) => <f64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            PgBindValue::String(s) => <String as Encode<Postgres>>::encode_by_ref(s, buf)?,
            PgBindValue::Uuid(u) => <uuid::Uuid as Encode<Postgres>>::encode_by_ref(u, buf)?,
            PgBindValue::Timestamp(t) => {
                <chrono::DateTime<chrono::Utc> as Encode<Postgres>>::encode_by_ref(t, buf)?
            }
            PgBindValue::Json(v) => <Value as Encode<Postgres>>::encode_by_ref(v, buf)?,
        })
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Some(self.pg_type())
    }
}

impl sqlx::Type<Postgres> for PgBindValue {
    fn type_info() -> PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(_ty: &PgTypeInfo) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_values_keep_their_type() {
        assert_eq!(PgBindValue::from_filter(&FilterValue::Int(3)), PgBindValue::I64(3));
        assert_eq!(
            PgBindValue::from_filter(&FilterValue::Bool(true)),
            PgBindValue::Bool(true)
        );
        let u = uuid::Uuid::new_v4();
        assert_eq!(PgBindValue::from_filter(&FilterValue::Uuid(u)), PgBindValue::Uuid(u));
    }
}
