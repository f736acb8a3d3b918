use std::path::Path;
use turso::Value;

use crate::catalog::repository::{CatalogRepository, RepositoryError};
use crate::model::{CurrencyRecord, NewCurrency, encode_banknote_images};

// ── Value extraction helpers ──

fn val_i64(v: &Value) -> i64 {
    match v {
        Value::Integer(i) => *i,
        _ => 0,
    }
}

fn val_opt_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Integer(i) => Some(*i),
        _ => None,
    }
}

fn val_string(v: &Value) -> String {
    match v {
        Value::Text(s) => s.clone(),
        _ => String::new(),
    }
}

fn positional(values: Vec<Value>) -> turso::params::Params {
    turso::params::Params::Positional(values)
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS currencies ( \
     id           INTEGER PRIMARY KEY, \
     code         TEXT NOT NULL, \
     name         TEXT NOT NULL, \
     flag_url     TEXT, \
     banknote_url TEXT, \
     sort_order   INTEGER \
     )";

/// Database handle wrapping a turso connection.
pub struct Database {
    conn: turso::Connection,
}

impl Database {
    /// Open (or create) a local SQLite catalog via Turso.
    pub async fn open(path: &Path) -> turso::Result<Self> {
        let path_str = path.to_string_lossy().to_string();
        let db = turso::Builder::new_local(&path_str).build().await?;
        let conn = db.connect()?;
        let database = Database { conn };
        database.init_schema().await?;
        tracing::info!(path = %path.display(), "catalog database opened");
        Ok(database)
    }

    async fn init_schema(&self) -> turso::Result<()> {
        self.conn.execute(SCHEMA, ()).await?;
        Ok(())
    }

    #[cfg(test)]
    pub async fn count(&self) -> turso::Result<i64> {
        let mut rows = self.conn.query("SELECT COUNT(*) FROM currencies", ()).await?;
        match rows.next().await? {
            Some(row) => Ok(val_i64(&row.get_value(0)?)),
            None => Ok(0),
        }
    }
}

impl CatalogRepository for Database {
    async fn fetch_all(&self) -> Result<Vec<CurrencyRecord>, RepositoryError> {
        let mut items = Vec::new();
        let mut rows = self
            .conn
            .query(
                "SELECT id, code, name, COALESCE(flag_url, ''), \
                 COALESCE(banknote_url, ''), sort_order \
                 FROM currencies \
                 ORDER BY CASE WHEN sort_order IS NULL THEN 1 ELSE 0 END, sort_order, id",
                (),
            )
            .await?;

        while let Some(row) = rows.next().await? {
            items.push(CurrencyRecord::from_columns(
                val_i64(&row.get_value(0)?),
                val_string(&row.get_value(1)?),
                val_string(&row.get_value(2)?),
                val_string(&row.get_value(3)?),
                &val_string(&row.get_value(4)?),
                val_opt_i64(&row.get_value(5)?),
            ));
        }
        Ok(items)
    }

    async fn update_rank(&self, id: i64, rank: i64) -> Result<(), RepositoryError> {
        let changed = self
            .conn
            .execute(
                "UPDATE currencies SET sort_order = ?1 WHERE id = ?2",
                positional(vec![Value::Integer(rank), Value::Integer(id)]),
            )
            .await?;
        if changed == 0 {
            return Err(RepositoryError::NotFound(id));
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        let changed = self
            .conn
            .execute(
                "DELETE FROM currencies WHERE id = ?1",
                positional(vec![Value::Integer(id)]),
            )
            .await?;
        if changed == 0 {
            return Err(RepositoryError::NotFound(id));
        }
        Ok(())
    }

    async fn insert(&self, entry: &NewCurrency) -> Result<i64, RepositoryError> {
        let sort_order = match entry.sort_order {
            Some(rank) => Value::Integer(rank),
            None => Value::Null,
        };
        self.conn
            .execute(
                "INSERT INTO currencies (code, name, flag_url, banknote_url, sort_order) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                positional(vec![
                    Value::Text(entry.code.clone()),
                    Value::Text(entry.name.clone()),
                    Value::Text(entry.flag_url.clone()),
                    Value::Text(encode_banknote_images(&entry.images())),
                    sort_order,
                ]),
            )
            .await?;

        match self.conn.last_insert_rowid() {
            0 => Err(RepositoryError::Unavailable("insert returned no row id".to_string())),
            id => Ok(id),
        }
    }
}
