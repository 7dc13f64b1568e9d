//! Row store collaborator contract and SQLite implementation.
//!
//! # Responsibility
//! - Describe the minimal "prepare, bind, run / fetch first" surface the
//!   row mapper needs from a row-oriented store.
//! - Provide a rusqlite-backed implementation.
//!
//! # Invariants
//! - Parameters are always bound positionally, never spliced into SQL text.
//! - Only single-row reads are issued; no DDL goes through this contract.

use crate::db::DbError;
use crate::model::column::ColumnValue;
use crate::model::row::Row;
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{params_from_iter, Connection};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure reported by a row store collaborator.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    /// Failure from a non-SQLite collaborator, already rendered to text.
    Backend(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Backend(message) => write!(f, "{message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Backend(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// A parameterized statement: SQL text plus positional values.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    params: Vec<ColumnValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Binds the next positional parameter.
    pub fn bind(mut self, value: impl Into<ColumnValue>) -> Self {
        self.params.push(value.into());
        self
    }

    pub fn bind_all<I>(mut self, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<ColumnValue>,
    {
        self.params.extend(values.into_iter().map(Into::into));
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[ColumnValue] {
        &self.params
    }
}

/// Row-oriented store the row mapper talks to.
pub trait RowStore {
    /// Executes a write and returns the number of rows it changed.
    fn run(&self, statement: &Statement) -> StoreResult<u64>;

    /// Executes a read and returns its first row, if any.
    fn first(&self, statement: &Statement) -> StoreResult<Option<Row>>;
}

impl<S: RowStore + ?Sized> RowStore for &S {
    fn run(&self, statement: &Statement) -> StoreResult<u64> {
        (**self).run(statement)
    }

    fn first(&self, statement: &Statement) -> StoreResult<Option<Row>> {
        (**self).first(statement)
    }
}

/// SQLite-backed row store.
pub struct SqliteRowStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRowStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl RowStore for SqliteRowStore<'_> {
    fn run(&self, statement: &Statement) -> StoreResult<u64> {
        let mut stmt = self.conn.prepare(statement.sql())?;
        let changed = stmt.execute(params_from_iter(statement.params()))?;
        Ok(changed as u64)
    }

    fn first(&self, statement: &Statement) -> StoreResult<Option<Row>> {
        let mut stmt = self.conn.prepare(statement.sql())?;
        let names: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut rows = stmt.query(params_from_iter(statement.params()))?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        let mut fetched = Row::new();
        for (index, name) in names.iter().enumerate() {
            let value = column_value_from_ref(name, row.get_ref(index)?)?;
            fetched.insert(name.clone(), value);
        }
        Ok(Some(fetched))
    }
}

impl ToSql for ColumnValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Null => ToSqlOutput::Owned(Value::Null),
            Self::Boolean(value) => ToSqlOutput::Owned(Value::Integer(i64::from(*value))),
            Self::Integer(value) => ToSqlOutput::Owned(Value::Integer(*value)),
            Self::Real(value) => ToSqlOutput::Owned(Value::Real(*value)),
            Self::Text(value) => ToSqlOutput::Borrowed(ValueRef::Text(value.as_bytes())),
            Self::Blob(value) => ToSqlOutput::Borrowed(ValueRef::Blob(value)),
        })
    }
}

fn column_value_from_ref(column: &str, value: ValueRef<'_>) -> Result<ColumnValue, DbError> {
    Ok(match value {
        ValueRef::Null => ColumnValue::Null,
        ValueRef::Integer(value) => ColumnValue::Integer(value),
        ValueRef::Real(value) => ColumnValue::Real(value),
        ValueRef::Text(bytes) => ColumnValue::Text(
            std::str::from_utf8(bytes)
                .map_err(|_| DbError::InvalidText {
                    column: column.to_string(),
                })?
                .to_string(),
        ),
        ValueRef::Blob(bytes) => ColumnValue::Blob(bytes.to_vec()),
    })
}

#[cfg(test)]
mod tests {
    use super::{RowStore, SqliteRowStore, Statement, StoreError};
    use crate::db::{open_db_in_memory, DbError};
    use crate::model::column::ColumnValue;

    #[test]
    fn statement_collects_positional_params() {
        let statement = Statement::new("SELECT ?1, ?2")
            .bind("a")
            .bind_all([1_i64, 2_i64]);
        assert_eq!(statement.sql(), "SELECT ?1, ?2");
        assert_eq!(
            statement.params(),
            &[
                ColumnValue::Text("a".into()),
                ColumnValue::Integer(1),
                ColumnValue::Integer(2)
            ]
        );
    }

    #[test]
    fn sqlite_store_roundtrips_every_value_kind() {
        let conn = open_db_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE kinds (id TEXT PRIMARY KEY, n, i, r, t, b, x);")
            .unwrap();
        let store = SqliteRowStore::new(&conn);

        let changed = store
            .run(
                &Statement::new("INSERT INTO kinds (id, n, i, r, t, b, x) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)")
                    .bind("k")
                    .bind(ColumnValue::Null)
                    .bind(7_i64)
                    .bind(1.5_f64)
                    .bind("text")
                    .bind(true)
                    .bind(vec![0_u8, 255]),
            )
            .unwrap();
        assert_eq!(changed, 1);

        let row = store
            .first(&Statement::new("SELECT * FROM kinds WHERE id = ?1").bind("k"))
            .unwrap()
            .unwrap();
        assert_eq!(row.get("n"), Some(&ColumnValue::Null));
        assert_eq!(row.get("i"), Some(&ColumnValue::Integer(7)));
        assert_eq!(row.get("r"), Some(&ColumnValue::Real(1.5)));
        assert_eq!(row.get("t"), Some(&ColumnValue::Text("text".into())));
        assert_eq!(row.get("b"), Some(&ColumnValue::Integer(1)));
        assert_eq!(row.get("x"), Some(&ColumnValue::Blob(vec![0, 255])));
    }

    #[test]
    fn first_returns_none_without_match() {
        let conn = open_db_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE empty (id TEXT PRIMARY KEY);")
            .unwrap();
        let store = SqliteRowStore::new(&conn);

        let row = store
            .first(&Statement::new("SELECT * FROM empty WHERE id = ?1").bind("missing"))
            .unwrap();
        assert!(row.is_none());
    }

    #[test]
    fn first_rejects_text_that_is_not_utf8() {
        let conn = open_db_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (id TEXT PRIMARY KEY, v TEXT);
             INSERT INTO t (id, v) VALUES ('bad', CAST(x'ff' AS TEXT));",
        )
        .unwrap();
        let store = SqliteRowStore::new(&conn);

        let err = store
            .first(&Statement::new("SELECT * FROM t WHERE id = ?1").bind("bad"))
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Db(DbError::InvalidText { ref column }) if column == "v"
        ));
    }
}
