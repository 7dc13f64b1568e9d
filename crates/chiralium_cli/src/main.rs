//! CLI smoke entry point.
//!
//! # Responsibility
//! - Wire configuration, logging, a SQLite row store and a blob bucket.
//! - Run one insert/update/refresh/delete pass and one upload pass, printing
//!   each step, so the core mappers can be checked end to end.

use chiralium_core::db::{open_db, open_db_in_memory};
use chiralium_core::upload::file_types;
use chiralium_core::{
    core_version, init_logging_from, read_key, resolve_id, BlobEntity, BlobMapper, BlobStore,
    Column, CoreConfig, ParseResult, RandomIds, Row, RowEntity, RowMapper, SqliteBucket,
    SqliteRowStore, UploadRequest,
};
use log::info;
use rusqlite::Connection;
use std::error::Error;
use std::process::ExitCode;

const LINKS_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS links (
    id TEXT PRIMARY KEY NOT NULL,
    version INTEGER NOT NULL,
    url TEXT NOT NULL,
    count INTEGER NOT NULL
);";

struct Link {
    id: String,
    version: i64,
    url: String,
    count: i64,
}

impl RowEntity for Link {
    const TABLE_NAME: &'static str = "links";

    fn id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> Option<i64> {
        Some(self.version)
    }

    fn structure(&self) -> Vec<Column> {
        vec![
            Column::new("url", self.url.as_str()),
            Column::new("count", self.count),
        ]
    }

    fn parse(row: &Row) -> ParseResult<Self> {
        Ok(Self {
            id: row.text("id")?,
            version: row.integer("version")?,
            url: row.text("url")?,
            count: row.integer("count")?,
        })
    }
}

struct Snapshot {
    id: String,
    image: Option<Vec<u8>>,
}

impl BlobEntity for Snapshot {
    const PREFIX: &'static str = "snapshot:";

    fn id(&self) -> &str {
        &self.id
    }

    fn payload(&self) -> Option<&[u8]> {
        self.image.as_deref()
    }

    fn clear_payload(&mut self) {
        self.image = None;
    }

    fn refresh(&self, bucket: &dyn BlobStore) -> Option<Self> {
        read_key(bucket, &self.key()).map(|image| Self {
            id: self.id.clone(),
            image: Some(image),
        })
    }

    fn accepted_file_types() -> Option<&'static [&'static str]> {
        Some(file_types::IMAGE)
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("chiralium error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let config = CoreConfig::from_env();
    let logging = init_logging_from(&config)?;
    println!("chiralium_core version={}", core_version());
    println!("logging enabled={logging} level={}", config.log_level);

    let conn = match config.db_path.as_deref() {
        Some(path) => open_db(path)?,
        None => open_db_in_memory()?,
    };
    conn.execute_batch(LINKS_TABLE_SQL)?;

    run_rows(&conn)?;
    run_blobs(&conn)?;
    info!("event=cli_smoke module=cli status=ok");
    Ok(())
}

fn run_rows(conn: &Connection) -> Result<(), Box<dyn Error>> {
    let store = SqliteRowStore::new(conn);
    let mapper = RowMapper::new(&store);

    let mut link = Link {
        id: resolve_id(None, &RandomIds),
        version: 1,
        url: "https://example.com".to_string(),
        count: 42,
    };
    mapper.insert(&link)?;

    link.count = 43;
    link.url = "https://example.org".to_string();
    mapper.update(&link, &["count", "url"])?;

    let refreshed = mapper.refresh(&link)?;
    let columns: Row = refreshed
        .complete_structure()
        .into_iter()
        .map(|column| (column.key, column.value))
        .collect();
    println!("row refreshed={}", serde_json::to_string(&columns)?);

    mapper.delete(&link)?;
    println!("row deleted id={}", link.id);
    Ok(())
}

fn run_blobs(conn: &Connection) -> Result<(), Box<dyn Error>> {
    let upload = UploadRequest::new()
        .with_content_type("image/png")
        .with_content_length(4);
    println!("upload valid={}", Snapshot::check_validity(&upload));

    let bucket = SqliteBucket::try_new(conn)?;
    let mapper = BlobMapper::new(&bucket);
    let mut snapshot = Snapshot {
        id: resolve_id(None, &RandomIds),
        image: Some(vec![0x89, b'P', b'N', b'G']),
    };

    let stored = mapper.put(&mut snapshot);
    let bytes = mapper
        .refresh(&snapshot)
        .and_then(|snapshot| snapshot.image)
        .map_or(0, |image| image.len());
    println!("blob key={} stored={stored} bytes={bytes}", snapshot.key());
    println!("blob deleted={}", mapper.delete(&snapshot));
    Ok(())
}
