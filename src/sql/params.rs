//! Typed bind values for built queries.

use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::Query;

/// A value bound to a `$n` placeholder. Ids are BIGINT, data columns are text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SqlParam {
    Int(i64),
    Text(Option<String>),
}

impl From<i64> for SqlParam {
    fn from(v: i64) -> Self {
        SqlParam::Int(v)
    }
}

impl From<Option<String>> for SqlParam {
    fn from(v: Option<String>) -> Self {
        SqlParam::Text(v)
    }
}

/// Bind params in placeholder order.
pub fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &'q [SqlParam],
) -> Query<'q, Postgres, PgArguments> {
    for p in params {
        query = match p {
            SqlParam::Int(n) => query.bind(*n),
            SqlParam::Text(s) => query.bind(s.as_deref()),
        };
    }
    query
}
