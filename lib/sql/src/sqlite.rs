use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, TransactionBehavior};

use crate::error::SQLError;
use crate::traits::{Row, SQLStore, Value};

/// SqliteStore is a SQLStore implementation backed by rusqlite (bundled SQLite).
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path.
    pub fn open(path: &Path) -> Result<Self, SQLError> {
        let conn = Connection::open(path)
            .map_err(|e| SQLError::Connection(e.to_string()))?;

        // Enable WAL mode for better concurrent read performance.
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| SQLError::Connection(e.to_string()))?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| SQLError::Connection(e.to_string()))?;

        tracing::info!(path = %path.display(), "sqlite store opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite database (useful for tests).
    pub fn open_in_memory() -> Result<Self, SQLError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| SQLError::Connection(e.to_string()))?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| SQLError::Connection(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

/// Convert our Value enum to rusqlite's ToSql.
fn bind_params(params: &[Value]) -> Vec<Box<dyn rusqlite::types::ToSql + '_>> {
    params
        .iter()
        .map(|v| -> Box<dyn rusqlite::types::ToSql + '_> {
            match v {
                Value::Null => Box::new(rusqlite::types::Null),
                Value::Integer(i) => Box::new(*i),
                Value::Real(f) => Box::new(*f),
                Value::Text(s) => Box::new(s.as_str()),
                Value::Blob(b) => Box::new(b.as_slice()),
            }
        })
        .collect()
}

impl SQLStore for SqliteStore {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SQLError::Query(e.to_string()))?;

        let bound = bind_params(params);
        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            bound.iter().map(|b| b.as_ref()).collect();

        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| SQLError::Query(e.to_string()))?;

        let column_names: Vec<String> = stmt
            .column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), |row| {
                let mut columns = Vec::new();
                for (i, name) in column_names.iter().enumerate() {
                    let val = row_value_at(row, i);
                    columns.push((name.clone(), val));
                }
                Ok(Row { columns })
            })
            .map_err(|e| SQLError::Query(e.to_string()))?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row.map_err(|e| SQLError::Query(e.to_string()))?);
        }
        Ok(result)
    }

    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, SQLError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SQLError::Execution(e.to_string()))?;

        let bound = bind_params(params);
        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            bound.iter().map(|b| b.as_ref()).collect();

        let affected = conn
            .execute(sql, param_refs.as_slice())
            .map_err(|e| SQLError::Execution(e.to_string()))?;

        Ok(affected as u64)
    }

    fn exec_batch(&self, statements: &[(&str, &[Value])]) -> Result<Vec<u64>, SQLError> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| SQLError::Execution(e.to_string()))?;

        // IMMEDIATE takes the write lock up front so the whole batch sees
        // one consistent snapshot.
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| SQLError::Execution(e.to_string()))?;

        let mut affected = Vec::with_capacity(statements.len());
        for (idx, (sql, params)) in statements.iter().enumerate() {
            let bound = bind_params(params);
            let param_refs: Vec<&dyn rusqlite::types::ToSql> =
                bound.iter().map(|b| b.as_ref()).collect();

            let count = tx
                .execute(sql, param_refs.as_slice())
                .map_err(|e| SQLError::Execution(e.to_string()))?;
            // Dropping `tx` on the error paths above and below rolls the
            // whole batch back.
            if count == 0 {
                return Err(SQLError::Aborted(idx));
            }
            affected.push(count as u64);
        }

        tx.commit()
            .map_err(|e| SQLError::Execution(e.to_string()))?;
        Ok(affected)
    }
}

/// Extract a Value from a rusqlite row at a given column index.
fn row_value_at(row: &rusqlite::Row, idx: usize) -> Value {
    // Try integer first, then real, then text, then blob, then null.
    if let Ok(i) = row.get::<_, i64>(idx) {
        return Value::Integer(i);
    }
    if let Ok(f) = row.get::<_, f64>(idx) {
        return Value::Real(f);
    }
    if let Ok(s) = row.get::<_, String>(idx) {
        return Value::Text(s);
    }
    if let Ok(b) = row.get::<_, Vec<u8>>(idx) {
        return Value::Blob(b);
    }
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .exec(
                "CREATE TABLE kv (k TEXT PRIMARY KEY, v INTEGER NOT NULL)",
                &[],
            )
            .unwrap();
        store
    }

    #[test]
    fn exec_and_query() {
        let store = test_store();
        let affected = store
            .exec(
                "INSERT INTO kv (k, v) VALUES (?1, ?2)",
                &[Value::Text("a".into()), Value::Integer(1)],
            )
            .unwrap();
        assert_eq!(affected, 1);

        let rows = store
            .query("SELECT k, v FROM kv WHERE k = ?1", &[Value::Text("a".into())])
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_str("k"), Some("a"));
        assert_eq!(rows[0].get_i64("v"), Some(1));
    }

    #[test]
    fn exec_batch_commits_all() {
        let store = test_store();
        let a = [Value::Text("a".into()), Value::Integer(1)];
        let b = [Value::Text("b".into()), Value::Integer(2)];
        let bump = [Value::Text("a".into())];
        let statements: [(&str, &[Value]); 3] = [
            ("INSERT INTO kv (k, v) VALUES (?1, ?2)", &a),
            ("INSERT INTO kv (k, v) VALUES (?1, ?2)", &b),
            ("UPDATE kv SET v = v + 1 WHERE k = ?1", &bump),
        ];
        let counts = store.exec_batch(&statements).unwrap();
        assert_eq!(counts, vec![1, 1, 1]);

        let rows = store.query("SELECT v FROM kv WHERE k = 'a'", &[]).unwrap();
        assert_eq!(rows[0].get_i64("v"), Some(2));
    }

    #[test]
    fn exec_batch_rolls_back_on_error() {
        let store = test_store();
        store
            .exec(
                "INSERT INTO kv (k, v) VALUES ('a', 1)",
                &[],
            )
            .unwrap();

        // Second statement violates the primary key — the first must not stick.
        let bump = [Value::Text("a".into())];
        let dup = [Value::Text("a".into()), Value::Integer(2)];
        let statements: [(&str, &[Value]); 2] = [
            ("UPDATE kv SET v = 99 WHERE k = ?1", &bump),
            ("INSERT INTO kv (k, v) VALUES (?1, ?2)", &dup),
        ];
        let result = store.exec_batch(&statements);
        assert!(matches!(result, Err(SQLError::Execution(_))));

        let rows = store.query("SELECT v FROM kv WHERE k = 'a'", &[]).unwrap();
        assert_eq!(rows[0].get_i64("v"), Some(1));
    }

    #[test]
    fn exec_batch_aborts_on_zero_row_statement() {
        let store = test_store();
        store
            .exec(
                "INSERT INTO kv (k, v) VALUES ('a', 1)",
                &[],
            )
            .unwrap();

        // Guarded update whose precondition fails — whole batch rolls back.
        let first = [Value::Text("a".into())];
        let guarded = [Value::Text("a".into()), Value::Integer(555)];
        let statements: [(&str, &[Value]); 2] = [
            ("UPDATE kv SET v = 10 WHERE k = ?1", &first),
            ("UPDATE kv SET v = 20 WHERE k = ?1 AND v = ?2", &guarded),
        ];
        let result = store.exec_batch(&statements);
        assert!(matches!(result, Err(SQLError::Aborted(1))));

        let rows = store.query("SELECT v FROM kv WHERE k = 'a'", &[]).unwrap();
        assert_eq!(rows[0].get_i64("v"), Some(1));
    }

    #[test]
    fn query_null_and_real() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .exec("CREATE TABLE t (a REAL, b TEXT)", &[])
            .unwrap();
        store
            .exec(
                "INSERT INTO t (a, b) VALUES (?1, ?2)",
                &[Value::Real(1.5), Value::Null],
            )
            .unwrap();

        let rows = store.query("SELECT a, b FROM t", &[]).unwrap();
        assert_eq!(rows[0].get_f64("a"), Some(1.5));
        assert!(rows[0].get_str("b").is_none());
    }
}
