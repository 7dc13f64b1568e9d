//! Generic CRUD over a row store, driven by an entity's declared structure.
//!
//! # Responsibility
//! - Build parameterized `INSERT`/`UPDATE`/`DELETE`/`SELECT` statements from
//!   `RowEntity::complete_structure()`.
//! - Report every failure with the operation, entity id and cause.
//!
//! # Invariants
//! - Values are bound positionally (`?1`, `?2`, ...); only declared table and
//!   column identifiers are interpolated, and only after they pass
//!   `is_valid_identifier`.
//! - Validation failures (`EmptyUpdate`, `ColumnNotFound`,
//!   `InvalidIdentifier`) are raised before the store is called.
//! - `refresh` never returns an entity built from a row missing a declared
//!   column.
//! - No version check is made before a write: concurrent writers to one id
//!   are last-write-wins.

use crate::model::column::Column;
use crate::model::row::{ParseError, ParseResult, Row};
use crate::store::row::{RowStore, Statement, StoreError};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Column every mapped table is keyed by.
pub const ID_COLUMN: &str = "id";
/// Column holding the optional entity schema version.
pub const VERSION_COLUMN: &str = "version";

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// Capability a concrete type implements to be persisted by `RowMapper`.
pub trait RowEntity: Sized {
    /// Table the entity's rows live in.
    const TABLE_NAME: &'static str;

    fn id(&self) -> &str;

    /// Stored alongside the row when present. Never compared before writes.
    fn version(&self) -> Option<i64> {
        None
    }

    /// Domain columns, excluding `id` and `version`.
    fn structure(&self) -> Vec<Column>;

    /// Every column the entity owns, in a stable order.
    ///
    /// Defaults to `id`, then `version` when present, then `structure()`.
    /// Must stay free of side effects.
    fn complete_structure(&self) -> Vec<Column> {
        let mut columns = vec![Column::new(ID_COLUMN, self.id())];
        if let Some(version) = self.version() {
            columns.push(Column::new(VERSION_COLUMN, version));
        }
        columns.extend(self.structure());
        columns
    }

    /// Rebuilds an entity from a fetched row.
    ///
    /// Types that are never read back may leave the default, which reports
    /// `ParseError::NotImplemented`.
    fn parse(_row: &Row) -> ParseResult<Self> {
        Err(ParseError::NotImplemented)
    }
}

pub type RowMapperResult<T> = Result<T, RowMapperError>;

#[derive(Debug)]
pub enum RowMapperError {
    Insert { id: String, source: StoreError },
    Update { id: String, source: StoreError },
    Delete { id: String, source: StoreError },
    Refresh { id: String, source: StoreError },
    EmptyUpdate { id: String },
    ColumnNotFound { id: String, column: String },
    InvalidIdentifier {
        operation: &'static str,
        id: String,
        name: String,
    },
    NotFound { table: &'static str, id: String },
    SchemaMismatch { id: String, column: String },
    ParseNotImplemented { table: &'static str, id: String },
    Parse { id: String, source: ParseError },
}

impl RowMapperError {
    /// Id of the entity the failed operation targeted.
    pub fn entity_id(&self) -> &str {
        match self {
            Self::Insert { id, .. }
            | Self::Update { id, .. }
            | Self::Delete { id, .. }
            | Self::Refresh { id, .. }
            | Self::EmptyUpdate { id }
            | Self::ColumnNotFound { id, .. }
            | Self::InvalidIdentifier { id, .. }
            | Self::NotFound { id, .. }
            | Self::SchemaMismatch { id, .. }
            | Self::ParseNotImplemented { id, .. }
            | Self::Parse { id, .. } => id,
        }
    }
}

impl Display for RowMapperError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Insert { id, source } => {
                write!(f, "failed to insert object {id} into the database: {source}")
            }
            Self::Update { id, source } => {
                write!(f, "failed to update object {id} in the database: {source}")
            }
            Self::Delete { id, source } => {
                write!(f, "failed to delete object {id} from the database: {source}")
            }
            Self::Refresh { id, source } => {
                write!(f, "failed to refresh object {id} from the database: {source}")
            }
            Self::EmptyUpdate { id } => {
                write!(f, "failed to update object {id}: no columns were requested")
            }
            Self::ColumnNotFound { id, column } => write!(
                f,
                "failed to update object {id}: column `{column}` is not in the complete structure"
            ),
            Self::InvalidIdentifier {
                operation,
                id,
                name,
            } => write!(
                f,
                "failed to {operation} object {id}: invalid SQL identifier `{name}`"
            ),
            Self::NotFound { table, id } => write!(
                f,
                "failed to refresh object {id} from the database: not found in `{table}`"
            ),
            Self::SchemaMismatch { id, column } => write!(
                f,
                "failed to refresh object {id}: column `{column}` is missing from the stored row"
            ),
            Self::ParseNotImplemented { table, id } => write!(
                f,
                "failed to refresh object {id}: no parse function is implemented for rows of `{table}`"
            ),
            Self::Parse { id, source } => write!(
                f,
                "failed to refresh object {id}: stored row could not be parsed: {source}"
            ),
        }
    }
}

impl Error for RowMapperError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Insert { source, .. }
            | Self::Update { source, .. }
            | Self::Delete { source, .. }
            | Self::Refresh { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Returns whether `name` can be interpolated into SQL as a table or column.
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name)
}

/// Runs `RowEntity` CRUD against one row store.
pub struct RowMapper<'s, S: RowStore + ?Sized> {
    store: &'s S,
}

impl<'s, S: RowStore + ?Sized> RowMapper<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Inserts every column of `entity.complete_structure()`.
    pub fn insert<T: RowEntity>(&self, entity: &T) -> RowMapperResult<()> {
        let statement = insert_statement(entity)?;
        match self.store.run(&statement) {
            Ok(_) => {
                debug!(
                    "event=row_insert module=mapper status=ok table={} id={}",
                    T::TABLE_NAME,
                    entity.id()
                );
                Ok(())
            }
            Err(source) => {
                warn!(
                    "event=row_insert module=mapper status=error table={} id={} error={source}",
                    T::TABLE_NAME,
                    entity.id()
                );
                Err(RowMapperError::Insert {
                    id: entity.id().to_string(),
                    source,
                })
            }
        }
    }

    /// Writes exactly `columns` (by current in-memory value) to the row with
    /// `entity.id()`.
    ///
    /// # Errors
    /// - `EmptyUpdate` when `columns` is empty.
    /// - `ColumnNotFound` when a name is not declared by the entity.
    /// - `Update` when the store rejects the statement.
    ///
    /// Updating an id with no stored row changes nothing and is not an error.
    pub fn update<T: RowEntity>(&self, entity: &T, columns: &[&str]) -> RowMapperResult<()> {
        let statement = update_statement(entity, columns)?;
        match self.store.run(&statement) {
            Ok(changed) => {
                debug!(
                    "event=row_update module=mapper status=ok table={} id={} columns={} changed={changed}",
                    T::TABLE_NAME,
                    entity.id(),
                    columns.join(",")
                );
                Ok(())
            }
            Err(source) => {
                warn!(
                    "event=row_update module=mapper status=error table={} id={} error={source}",
                    T::TABLE_NAME,
                    entity.id()
                );
                Err(RowMapperError::Update {
                    id: entity.id().to_string(),
                    source,
                })
            }
        }
    }

    /// Deletes the row with `entity.id()`. Zero matched rows is success.
    pub fn delete<T: RowEntity>(&self, entity: &T) -> RowMapperResult<()> {
        let statement = delete_statement::<T>(entity.id())?;
        match self.store.run(&statement) {
            Ok(changed) => {
                debug!(
                    "event=row_delete module=mapper status=ok table={} id={} changed={changed}",
                    T::TABLE_NAME,
                    entity.id()
                );
                Ok(())
            }
            Err(source) => {
                warn!(
                    "event=row_delete module=mapper status=error table={} id={} error={source}",
                    T::TABLE_NAME,
                    entity.id()
                );
                Err(RowMapperError::Delete {
                    id: entity.id().to_string(),
                    source,
                })
            }
        }
    }

    /// Re-reads the stored row for `entity.id()` and parses it into a new `T`.
    ///
    /// # Errors
    /// - `NotFound` when no row matches.
    /// - `SchemaMismatch` when the row lacks a declared column.
    /// - `ParseNotImplemented` / `Parse` from `T::parse`.
    /// - `Refresh` when the store rejects the read.
    pub fn refresh<T: RowEntity>(&self, entity: &T) -> RowMapperResult<T> {
        let id = entity.id();
        let row = self.fetch::<T>(id)?.ok_or_else(|| RowMapperError::NotFound {
            table: T::TABLE_NAME,
            id: id.to_string(),
        })?;

        if let Some(column) = entity
            .complete_structure()
            .into_iter()
            .find(|column| !row.contains(&column.key))
        {
            warn!(
                "event=row_refresh module=mapper status=error table={} id={id} error_code=schema_mismatch column={}",
                T::TABLE_NAME,
                column.key
            );
            return Err(RowMapperError::SchemaMismatch {
                id: id.to_string(),
                column: column.key,
            });
        }

        let refreshed = parse_row::<T>(id, &row)?;
        debug!(
            "event=row_refresh module=mapper status=ok table={} id={id}",
            T::TABLE_NAME
        );
        Ok(refreshed)
    }

    /// Loads the entity stored under `id`, or `None` when there is none.
    pub fn find<T: RowEntity>(&self, id: &str) -> RowMapperResult<Option<T>> {
        match self.fetch::<T>(id)? {
            Some(row) => parse_row::<T>(id, &row).map(Some),
            None => Ok(None),
        }
    }

    fn fetch<T: RowEntity>(&self, id: &str) -> RowMapperResult<Option<Row>> {
        let statement = select_statement::<T>(id)?;
        self.store.first(&statement).map_err(|source| {
            warn!(
                "event=row_refresh module=mapper status=error table={} id={id} error={source}",
                T::TABLE_NAME
            );
            RowMapperError::Refresh {
                id: id.to_string(),
                source,
            }
        })
    }
}

/// Builds `INSERT INTO <table> (<columns>) VALUES (?1, ...)` for `entity`.
pub fn insert_statement<T: RowEntity>(entity: &T) -> RowMapperResult<Statement> {
    let columns = entity.complete_structure();
    check_table::<T>("insert", entity.id())?;
    for column in &columns {
        check_identifier("insert", entity.id(), &column.key)?;
    }

    let keys = columns
        .iter()
        .map(|column| column.key.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=columns.len())
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(
        Statement::new(format!(
            "INSERT INTO {} ({keys}) VALUES ({placeholders})",
            T::TABLE_NAME
        ))
        .bind_all(columns.into_iter().map(|column| column.value)),
    )
}

/// Builds `UPDATE <table> SET c1 = ?1, ... WHERE id = ?n+1` for `columns`.
pub fn update_statement<T: RowEntity>(entity: &T, columns: &[&str]) -> RowMapperResult<Statement> {
    let id = entity.id();
    if columns.is_empty() {
        return Err(RowMapperError::EmptyUpdate { id: id.to_string() });
    }

    let structure = entity.complete_structure();
    let mut selected = Vec::with_capacity(columns.len());
    for name in columns {
        let column = structure
            .iter()
            .find(|column| column.key == *name)
            .ok_or_else(|| RowMapperError::ColumnNotFound {
                id: id.to_string(),
                column: (*name).to_string(),
            })?;
        selected.push(column.clone());
    }

    check_table::<T>("update", id)?;
    for column in &selected {
        check_identifier("update", id, &column.key)?;
    }

    let assignments = selected
        .iter()
        .enumerate()
        .map(|(index, column)| format!("{} = ?{}", column.key, index + 1))
        .collect::<Vec<_>>()
        .join(", ");
    let id_position = selected.len() + 1;

    Ok(Statement::new(format!(
        "UPDATE {} SET {assignments} WHERE {ID_COLUMN} = ?{id_position}",
        T::TABLE_NAME
    ))
    .bind_all(selected.into_iter().map(|column| column.value))
    .bind(id))
}

/// Builds `DELETE FROM <table> WHERE id = ?1`.
pub fn delete_statement<T: RowEntity>(id: &str) -> RowMapperResult<Statement> {
    check_table::<T>("delete", id)?;
    Ok(Statement::new(format!("DELETE FROM {} WHERE {ID_COLUMN} = ?1", T::TABLE_NAME)).bind(id))
}

/// Builds `SELECT * FROM <table> WHERE id = ?1`. Failures are reported as
/// part of a refresh.
pub fn select_statement<T: RowEntity>(id: &str) -> RowMapperResult<Statement> {
    check_table::<T>("refresh", id)?;
    Ok(Statement::new(format!("SELECT * FROM {} WHERE {ID_COLUMN} = ?1", T::TABLE_NAME)).bind(id))
}

fn parse_row<T: RowEntity>(id: &str, row: &Row) -> RowMapperResult<T> {
    T::parse(row).map_err(|source| match source {
        ParseError::NotImplemented => RowMapperError::ParseNotImplemented {
            table: T::TABLE_NAME,
            id: id.to_string(),
        },
        source => RowMapperError::Parse {
            id: id.to_string(),
            source,
        },
    })
}

fn check_table<T: RowEntity>(operation: &'static str, id: &str) -> RowMapperResult<()> {
    check_identifier(operation, id, T::TABLE_NAME)
}

fn check_identifier(operation: &'static str, id: &str, name: &str) -> RowMapperResult<()> {
    if is_valid_identifier(name) {
        return Ok(());
    }
    Err(RowMapperError::InvalidIdentifier {
        operation,
        id: id.to_string(),
        name: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::{
        delete_statement, insert_statement, is_valid_identifier, parse_row, select_statement,
        update_statement, RowEntity, RowMapperError,
    };
    use crate::model::column::{Column, ColumnValue};
    use crate::model::row::{ParseError, Row};
    use crate::store::row::StoreError;

    struct Link {
        id: String,
        url: String,
        count: i64,
    }

    impl RowEntity for Link {
        const TABLE_NAME: &'static str = "links";

        fn id(&self) -> &str {
            &self.id
        }

        fn version(&self) -> Option<i64> {
            Some(1)
        }

        fn structure(&self) -> Vec<Column> {
            vec![
                Column::new("url", self.url.as_str()),
                Column::new("count", self.count),
            ]
        }
    }

    struct BadTable;

    impl RowEntity for BadTable {
        const TABLE_NAME: &'static str = "links; DROP TABLE links";

        fn id(&self) -> &str {
            "x"
        }

        fn structure(&self) -> Vec<Column> {
            Vec::new()
        }
    }

    fn link() -> Link {
        Link {
            id: "abc".to_string(),
            url: "https://example.com".to_string(),
            count: 42,
        }
    }

    #[test]
    fn complete_structure_prepends_id_and_version() {
        let keys: Vec<String> = link()
            .complete_structure()
            .into_iter()
            .map(|column| column.key)
            .collect();
        assert_eq!(keys, ["id", "version", "url", "count"]);
    }

    #[test]
    fn insert_binds_every_declared_column_in_order() {
        let statement = insert_statement(&link()).unwrap();
        assert_eq!(
            statement.sql(),
            "INSERT INTO links (id, version, url, count) VALUES (?1, ?2, ?3, ?4)"
        );
        assert_eq!(
            statement.params(),
            &[
                ColumnValue::Text("abc".into()),
                ColumnValue::Integer(1),
                ColumnValue::Text("https://example.com".into()),
                ColumnValue::Integer(42),
            ]
        );
    }

    #[test]
    fn update_sets_requested_columns_then_binds_id_last() {
        let statement = update_statement(&link(), &["count", "url"]).unwrap();
        assert_eq!(
            statement.sql(),
            "UPDATE links SET count = ?1, url = ?2 WHERE id = ?3"
        );
        assert_eq!(
            statement.params(),
            &[
                ColumnValue::Integer(42),
                ColumnValue::Text("https://example.com".into()),
                ColumnValue::Text("abc".into()),
            ]
        );
    }

    #[test]
    fn update_rejects_empty_and_unknown_columns() {
        let err = update_statement(&link(), &[]).unwrap_err();
        assert!(matches!(err, RowMapperError::EmptyUpdate { ref id } if id == "abc"));

        let err = update_statement(&link(), &["count", "nonexistentColumn"]).unwrap_err();
        assert!(matches!(
            err,
            RowMapperError::ColumnNotFound { ref column, .. } if column == "nonexistentColumn"
        ));
    }

    #[test]
    fn delete_and_select_target_id() {
        assert_eq!(
            delete_statement::<Link>("abc").unwrap().sql(),
            "DELETE FROM links WHERE id = ?1"
        );
        let select = select_statement::<Link>("abc").unwrap();
        assert_eq!(select.sql(), "SELECT * FROM links WHERE id = ?1");
        assert_eq!(select.params(), &[ColumnValue::Text("abc".into())]);
    }

    #[test]
    fn identifiers_are_checked_before_interpolation() {
        assert!(is_valid_identifier("created_at"));
        assert!(!is_valid_identifier("1col"));
        assert!(!is_valid_identifier("a b"));

        let err = insert_statement(&BadTable).unwrap_err();
        assert!(matches!(
            err,
            RowMapperError::InvalidIdentifier { operation: "insert", ref name, .. }
                if name == BadTable::TABLE_NAME
        ));
        assert!(matches!(
            delete_statement::<BadTable>("x").unwrap_err(),
            RowMapperError::InvalidIdentifier { operation: "delete", .. }
        ));
        assert!(matches!(
            select_statement::<BadTable>("x").unwrap_err(),
            RowMapperError::InvalidIdentifier { operation: "refresh", .. }
        ));
    }

    #[test]
    fn error_messages_name_operation_and_id() {
        let store_error = || StoreError::Backend("disk full".to_string());
        let cases = [
            (
                RowMapperError::Insert {
                    id: "abc".into(),
                    source: store_error(),
                },
                "insert",
            ),
            (
                RowMapperError::Update {
                    id: "abc".into(),
                    source: store_error(),
                },
                "update",
            ),
            (
                RowMapperError::Delete {
                    id: "abc".into(),
                    source: store_error(),
                },
                "delete",
            ),
            (
                RowMapperError::Refresh {
                    id: "abc".into(),
                    source: store_error(),
                },
                "refresh",
            ),
            (update_statement(&link(), &[]).unwrap_err(), "update"),
            (update_statement(&link(), &["nope"]).unwrap_err(), "update"),
            (
                RowMapperError::InvalidIdentifier {
                    operation: "update",
                    id: "abc".into(),
                    name: "bad name".into(),
                },
                "update",
            ),
            (
                RowMapperError::NotFound {
                    table: "links",
                    id: "abc".into(),
                },
                "refresh",
            ),
            (
                RowMapperError::SchemaMismatch {
                    id: "abc".into(),
                    column: "url".into(),
                },
                "refresh",
            ),
            (
                parse_row::<Link>("abc", &Row::new()).map(|_| ()).unwrap_err(),
                "refresh",
            ),
            (
                RowMapperError::Parse {
                    id: "abc".into(),
                    source: ParseError::MissingColumn("url".into()),
                },
                "refresh",
            ),
        ];

        for (err, operation) in &cases {
            let message = err.to_string();
            assert!(message.contains(operation), "{message}");
            assert!(message.contains("abc"), "{message}");
            assert_eq!(err.entity_id(), "abc");
        }
        assert!(matches!(
            cases[9].0,
            RowMapperError::ParseNotImplemented { table: "links", .. }
        ));
    }
}
