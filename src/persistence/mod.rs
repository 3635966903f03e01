use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::ToSql;

use crate::DatabaseError;

pub mod players;

pub type DatabaseResult<T> = Result<T, DatabaseError>;

pub fn to_sql_option<T>(value: &Option<T>) -> Option<&dyn ToSql>
where
    T: ToSql,
{
    value.as_ref().map(|v| v as &dyn ToSql)
}

pub fn get_connection(
    pool: &Pool<SqliteConnectionManager>,
) -> DatabaseResult<PooledConnection<SqliteConnectionManager>> {
    pool.get().map_err(|e| DatabaseError::ConnectionError(e))
}
