use std::sync::Arc;

use biblio_core::{ListResult, ServiceError};
use biblio_sql::{Row, SQLError, SQLStore, Value};

use crate::model::{
    BorrowRecord, BorrowRequest, LoanListQuery, LoanStatus, LoanView, RequestListQuery,
    RequestStatus,
};

/// SQL schema for the circulation ledger.
///
/// The partial unique index on ACTIVE records is the database-level backstop
/// for the one-active-loan-per-copy invariant: even a write that slips past
/// the coordinator's gate cannot create a second ACTIVE record.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS borrow_requests (
    id           TEXT PRIMARY KEY,
    student_id   TEXT NOT NULL,
    copy_id      TEXT NOT NULL,
    pickup_date  TEXT NOT NULL,
    pickup_time  TEXT NOT NULL,
    status       TEXT NOT NULL,
    requested_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_requests_status ON borrow_requests(status);
CREATE INDEX IF NOT EXISTS idx_requests_student ON borrow_requests(student_id);
CREATE TABLE IF NOT EXISTS borrow_records (
    id           TEXT PRIMARY KEY,
    student_id   TEXT NOT NULL,
    copy_id      TEXT NOT NULL,
    borrow_date  TEXT NOT NULL,
    due_date     TEXT NOT NULL,
    return_date  TEXT,
    status       TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_records_copy ON borrow_records(copy_id);
CREATE INDEX IF NOT EXISTS idx_records_student ON borrow_records(student_id);
CREATE INDEX IF NOT EXISTS idx_records_status ON borrow_records(status);
CREATE UNIQUE INDEX IF NOT EXISTS ux_records_active_copy
    ON borrow_records(copy_id) WHERE status = 'ACTIVE'
";

/// Persistent storage for the borrow ledger, backed by SQLStore (SQLite).
///
/// The accept/return/direct-borrow write sets also touch the catalog's
/// `copies` table: all modules share one database, and those flips must be
/// in the same transaction as the ledger writes.
pub struct CirculationStore {
    db: Arc<dyn SQLStore>,
}

impl CirculationStore {
    /// Create a new CirculationStore and initialise the schema.
    pub fn new(db: Arc<dyn SQLStore>) -> Result<Self, ServiceError> {
        for stmt in SCHEMA.split(';').filter(|s| !s.trim().is_empty()) {
            db.exec(stmt, &[])
                .map_err(|e| ServiceError::Storage(format!("circulation schema init: {e}")))?;
        }
        Ok(Self { db })
    }

    // -----------------------------------------------------------------------
    // Requests
    // -----------------------------------------------------------------------

    /// Insert a new PENDING request.
    pub fn insert_request(&self, request: &BorrowRequest) -> Result<(), ServiceError> {
        self.db
            .exec(
                "INSERT INTO borrow_requests \
                 (id, student_id, copy_id, pickup_date, pickup_time, status, requested_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                &[
                    Value::Text(request.id.clone()),
                    Value::Text(request.student_id.clone()),
                    Value::Text(request.copy_id.clone()),
                    Value::Text(request.pickup_date.clone()),
                    Value::Text(request.pickup_time.clone()),
                    Value::Text(request.status.as_str().to_string()),
                    Value::Text(request.requested_at.clone()),
                ],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Get a request by ID.
    pub fn get_request(&self, id: &str) -> Result<BorrowRequest, ServiceError> {
        let rows = self
            .db
            .query(
                "SELECT id, student_id, copy_id, pickup_date, pickup_time, status, requested_at \
                 FROM borrow_requests WHERE id = ?1",
                &[Value::Text(id.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        let row = rows
            .first()
            .ok_or_else(|| ServiceError::NotFound(format!("borrow request {id}")))?;
        row_to_request(row)
    }

    /// List requests, optionally filtered by status, oldest first.
    pub fn list_requests(
        &self,
        query: &RequestListQuery,
    ) -> Result<ListResult<BorrowRequest>, ServiceError> {
        let limit = query.limit.unwrap_or(50);
        let offset = query.offset.unwrap_or(0);

        let mut where_sql = String::new();
        let mut params: Vec<Value> = Vec::new();
        if let Some(ref s) = query.status {
            let status = RequestStatus::from_str(s)
                .ok_or_else(|| ServiceError::Validation(format!("invalid request status: {s}")))?;
            where_sql = "WHERE status = ?1".to_string();
            params.push(Value::Text(status.as_str().to_string()));
        }

        let count_sql = format!("SELECT COUNT(*) as cnt FROM borrow_requests {where_sql}");
        let count_rows = self
            .db
            .query(&count_sql, &params)
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        let total = count_rows
            .first()
            .and_then(|r| r.get_i64("cnt"))
            .unwrap_or(0) as usize;

        let idx = params.len() + 1;
        let select_sql = format!(
            "SELECT id, student_id, copy_id, pickup_date, pickup_time, status, requested_at \
             FROM borrow_requests {where_sql} ORDER BY requested_at ASC LIMIT ?{idx} OFFSET ?{}",
            idx + 1
        );
        params.push(Value::Integer(limit as i64));
        params.push(Value::Integer(offset as i64));

        let rows = self
            .db
            .query(&select_sql, &params)
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        let items = rows
            .iter()
            .map(row_to_request)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ListResult { items, total })
    }

    /// Atomically resolve a PENDING request to REJECTED (CAS).
    ///
    /// Returns `false` if the request was already resolved (or is unknown).
    pub fn mark_rejected(&self, id: &str) -> Result<bool, ServiceError> {
        let affected = self
            .db
            .exec(
                "UPDATE borrow_requests SET status = 'REJECTED' \
                 WHERE id = ?1 AND status = 'PENDING'",
                &[Value::Text(id.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        Ok(affected > 0)
    }

    // -----------------------------------------------------------------------
    // Atomic units (accept / direct borrow / return)
    // -----------------------------------------------------------------------

    /// The acceptance write set, as one transaction:
    ///
    /// 1. request PENDING → ACCEPTED (CAS)
    /// 2. insert the ACTIVE loan record
    /// 3. copy AVAILABLE → BORROWED (CAS)
    ///
    /// Any failed guard rolls the whole unit back — a record is never left
    /// behind without the copy flip, and vice versa.
    pub fn accept_batch(
        &self,
        request_id: &str,
        record: &BorrowRecord,
        now: &str,
    ) -> Result<(), ServiceError> {
        let request_p = [Value::Text(request_id.to_string())];
        let record_p = record_params(record);
        let copy_p = [
            Value::Text(now.to_string()),
            Value::Text(record.copy_id.clone()),
        ];
        let statements: [(&str, &[Value]); 3] = [
            (
                "UPDATE borrow_requests SET status = 'ACCEPTED' \
                 WHERE id = ?1 AND status = 'PENDING'",
                &request_p,
            ),
            (
                "INSERT INTO borrow_records \
                 (id, student_id, copy_id, borrow_date, due_date, return_date, status) \
                 VALUES (?1, ?2, ?3, ?4, ?5, NULL, 'ACTIVE')",
                &record_p,
            ),
            (
                "UPDATE copies SET status = 'BORROWED', updated_at = ?1 \
                 WHERE id = ?2 AND status = 'AVAILABLE'",
                &copy_p,
            ),
        ];

        match self.db.exec_batch(&statements) {
            Ok(_) => Ok(()),
            Err(SQLError::Aborted(0)) => Err(ServiceError::NotFound(format!(
                "borrow request {request_id} not found or already processed"
            ))),
            Err(SQLError::Aborted(_)) => Err(ServiceError::Conflict(format!(
                "copy {} is not available for borrowing",
                record.copy_id
            ))),
            Err(e) => Err(ServiceError::Storage(e.to_string())),
        }
    }

    /// The direct-borrow write set (no request): record insert + copy flip.
    pub fn direct_borrow_batch(
        &self,
        record: &BorrowRecord,
        now: &str,
    ) -> Result<(), ServiceError> {
        let record_p = record_params(record);
        let copy_p = [
            Value::Text(now.to_string()),
            Value::Text(record.copy_id.clone()),
        ];
        let statements: [(&str, &[Value]); 2] = [
            (
                "INSERT INTO borrow_records \
                 (id, student_id, copy_id, borrow_date, due_date, return_date, status) \
                 VALUES (?1, ?2, ?3, ?4, ?5, NULL, 'ACTIVE')",
                &record_p,
            ),
            (
                "UPDATE copies SET status = 'BORROWED', updated_at = ?1 \
                 WHERE id = ?2 AND status = 'AVAILABLE'",
                &copy_p,
            ),
        ];

        match self.db.exec_batch(&statements) {
            Ok(_) => Ok(()),
            Err(SQLError::Aborted(_)) => Err(ServiceError::Conflict(format!(
                "copy {} is not available for borrowing",
                record.copy_id
            ))),
            Err(e) => Err(ServiceError::Storage(e.to_string())),
        }
    }

    /// The return write set: record ACTIVE → RETURNED + copy BORROWED →
    /// AVAILABLE, as one transaction.
    pub fn return_batch(
        &self,
        record_id: &str,
        copy_id: &str,
        now: &str,
    ) -> Result<(), ServiceError> {
        let record_p = [
            Value::Text(now.to_string()),
            Value::Text(record_id.to_string()),
        ];
        let copy_p = [
            Value::Text(now.to_string()),
            Value::Text(copy_id.to_string()),
        ];
        let statements: [(&str, &[Value]); 2] = [
            (
                "UPDATE borrow_records SET status = 'RETURNED', return_date = ?1 \
                 WHERE id = ?2 AND status = 'ACTIVE'",
                &record_p,
            ),
            (
                "UPDATE copies SET status = 'AVAILABLE', updated_at = ?1 \
                 WHERE id = ?2 AND status = 'BORROWED'",
                &copy_p,
            ),
        ];

        match self.db.exec_batch(&statements) {
            Ok(_) => Ok(()),
            Err(SQLError::Aborted(0)) => Err(ServiceError::Conflict(format!(
                "loan record {record_id} is no longer active"
            ))),
            // Record flipped but the copy was not BORROWED: the ledger and
            // the catalog disagree. Rolled back; surface, don't repair.
            Err(SQLError::Aborted(_)) => Err(ServiceError::Internal(format!(
                "copy {copy_id} has an active loan record but is not marked BORROWED"
            ))),
            Err(e) => Err(ServiceError::Storage(e.to_string())),
        }
    }

    // -----------------------------------------------------------------------
    // Records
    // -----------------------------------------------------------------------

    /// Get a loan record by ID.
    pub fn get_record(&self, id: &str) -> Result<BorrowRecord, ServiceError> {
        let rows = self
            .db
            .query(
                "SELECT id, student_id, copy_id, borrow_date, due_date, return_date, status \
                 FROM borrow_records WHERE id = ?1",
                &[Value::Text(id.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        let row = rows
            .first()
            .ok_or_else(|| ServiceError::NotFound(format!("loan record {id}")))?;
        row_to_record(row)
    }

    /// The most recent ACTIVE record for a copy, if any.
    pub fn latest_active_record(
        &self,
        copy_id: &str,
    ) -> Result<Option<BorrowRecord>, ServiceError> {
        let rows = self
            .db
            .query(
                "SELECT id, student_id, copy_id, borrow_date, due_date, return_date, status \
                 FROM borrow_records WHERE copy_id = ?1 AND status = 'ACTIVE' \
                 ORDER BY borrow_date DESC LIMIT 1",
                &[Value::Text(copy_id.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        rows.first().map(row_to_record).transpose()
    }

    /// Count ACTIVE records for a copy (invariant probes in tests and
    /// consistency checks).
    pub fn count_active_for_copy(&self, copy_id: &str) -> Result<i64, ServiceError> {
        let rows = self
            .db
            .query(
                "SELECT COUNT(*) as cnt FROM borrow_records \
                 WHERE copy_id = ?1 AND status = 'ACTIVE'",
                &[Value::Text(copy_id.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        Ok(rows.first().and_then(|r| r.get_i64("cnt")).unwrap_or(0))
    }

    /// List loans joined with book metadata, soonest due date first.
    pub fn list_loans(
        &self,
        query: &LoanListQuery,
        now: &str,
    ) -> Result<ListResult<LoanView>, ServiceError> {
        let limit = query.limit.unwrap_or(50);
        let offset = query.offset.unwrap_or(0);

        let mut where_clauses: Vec<String> = Vec::new();
        let mut params: Vec<Value> = Vec::new();
        let mut idx = 1;

        if let Some(ref sid) = query.student_id {
            where_clauses.push(format!("br.student_id = ?{idx}"));
            params.push(Value::Text(sid.clone()));
            idx += 1;
        }
        if let Some(ref s) = query.status {
            let status = LoanStatus::from_str(s)
                .ok_or_else(|| ServiceError::Validation(format!("invalid loan status: {s}")))?;
            where_clauses.push(format!("br.status = ?{idx}"));
            params.push(Value::Text(status.as_str().to_string()));
            idx += 1;
        }
        if query.overdue.unwrap_or(false) {
            where_clauses.push(format!("br.status = 'ACTIVE' AND br.due_date < ?{idx}"));
            params.push(Value::Text(now.to_string()));
            idx += 1;
        }

        let where_sql = if where_clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", where_clauses.join(" AND "))
        };

        let count_sql = format!(
            "SELECT COUNT(*) as cnt FROM borrow_records br {where_sql}"
        );
        let count_rows = self
            .db
            .query(&count_sql, &params)
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        let total = count_rows
            .first()
            .and_then(|r| r.get_i64("cnt"))
            .unwrap_or(0) as usize;

        let select_sql = format!(
            "SELECT br.id, br.student_id, br.copy_id, br.borrow_date, br.due_date, \
             br.return_date, br.status, b.id as book_id, b.title, b.author, b.isbn \
             FROM borrow_records br \
             JOIN copies c ON br.copy_id = c.id \
             JOIN books b ON c.book_id = b.id \
             {where_sql} ORDER BY br.due_date ASC LIMIT ?{idx} OFFSET ?{}",
            idx + 1
        );
        params.push(Value::Integer(limit as i64));
        params.push(Value::Integer(offset as i64));

        let rows = self
            .db
            .query(&select_sql, &params)
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        let mut items = Vec::new();
        for row in &rows {
            items.push(LoanView {
                record: row_to_record(row)?,
                book_id: get_text(row, "book_id")?,
                title: get_text(row, "title")?,
                author: get_text(row, "author")?,
                isbn: get_text(row, "isbn")?,
            });
        }
        Ok(ListResult { items, total })
    }

    // -----------------------------------------------------------------------
    // Dashboard counts
    // -----------------------------------------------------------------------

    pub fn count_loans_for_student(
        &self,
        student_id: &str,
        overdue_before: Option<&str>,
    ) -> Result<i64, ServiceError> {
        let (sql, params): (&str, Vec<Value>) = match overdue_before {
            Some(now) => (
                "SELECT COUNT(*) as cnt FROM borrow_records \
                 WHERE student_id = ?1 AND status = 'ACTIVE' AND due_date < ?2",
                vec![
                    Value::Text(student_id.to_string()),
                    Value::Text(now.to_string()),
                ],
            ),
            None => (
                "SELECT COUNT(*) as cnt FROM borrow_records \
                 WHERE student_id = ?1 AND status = 'ACTIVE'",
                vec![Value::Text(student_id.to_string())],
            ),
        };
        let rows = self
            .db
            .query(sql, &params)
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        Ok(rows.first().and_then(|r| r.get_i64("cnt")).unwrap_or(0))
    }

    pub fn count_pending_requests_for_student(
        &self,
        student_id: &str,
    ) -> Result<i64, ServiceError> {
        let rows = self
            .db
            .query(
                "SELECT COUNT(*) as cnt FROM borrow_requests \
                 WHERE student_id = ?1 AND status = 'PENDING'",
                &[Value::Text(student_id.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        Ok(rows.first().and_then(|r| r.get_i64("cnt")).unwrap_or(0))
    }

    /// Library-wide counters for the staff dashboard.
    pub fn library_counts(&self, now: &str) -> Result<[i64; 6], ServiceError> {
        let count = |sql: &str, params: &[Value]| -> Result<i64, ServiceError> {
            let rows = self
                .db
                .query(sql, params)
                .map_err(|e| ServiceError::Storage(e.to_string()))?;
            Ok(rows.first().and_then(|r| r.get_i64("cnt")).unwrap_or(0))
        };

        Ok([
            count("SELECT COUNT(*) as cnt FROM books", &[])?,
            count("SELECT COUNT(*) as cnt FROM copies", &[])?,
            count(
                "SELECT COUNT(*) as cnt FROM copies WHERE status = 'BORROWED'",
                &[],
            )?,
            count(
                "SELECT COUNT(*) as cnt FROM borrow_records WHERE status = 'ACTIVE'",
                &[],
            )?,
            count(
                "SELECT COUNT(*) as cnt FROM borrow_records \
                 WHERE status = 'ACTIVE' AND due_date < ?1",
                &[Value::Text(now.to_string())],
            )?,
            count(
                "SELECT COUNT(*) as cnt FROM borrow_requests WHERE status = 'PENDING'",
                &[],
            )?,
        ])
    }
}

fn record_params(record: &BorrowRecord) -> Vec<Value> {
    vec![
        Value::Text(record.id.clone()),
        Value::Text(record.student_id.clone()),
        Value::Text(record.copy_id.clone()),
        Value::Text(record.borrow_date.clone()),
        Value::Text(record.due_date.clone()),
    ]
}

/// Deserialize a BorrowRequest from a row's columns.
fn row_to_request(row: &Row) -> Result<BorrowRequest, ServiceError> {
    let status_str = row
        .get_str("status")
        .ok_or_else(|| ServiceError::Storage("missing status column".into()))?;
    let status = RequestStatus::from_str(status_str)
        .ok_or_else(|| ServiceError::Internal(format!("unknown request status: {status_str}")))?;

    Ok(BorrowRequest {
        id: get_text(row, "id")?,
        student_id: get_text(row, "student_id")?,
        copy_id: get_text(row, "copy_id")?,
        pickup_date: get_text(row, "pickup_date")?,
        pickup_time: get_text(row, "pickup_time")?,
        status,
        requested_at: get_text(row, "requested_at")?,
    })
}

/// Deserialize a BorrowRecord from a row's columns.
fn row_to_record(row: &Row) -> Result<BorrowRecord, ServiceError> {
    let status_str = row
        .get_str("status")
        .ok_or_else(|| ServiceError::Storage("missing status column".into()))?;
    let status = LoanStatus::from_str(status_str)
        .ok_or_else(|| ServiceError::Internal(format!("unknown loan status: {status_str}")))?;

    Ok(BorrowRecord {
        id: get_text(row, "id")?,
        student_id: get_text(row, "student_id")?,
        copy_id: get_text(row, "copy_id")?,
        borrow_date: get_text(row, "borrow_date")?,
        due_date: get_text(row, "due_date")?,
        return_date: row.get_str("return_date").map(String::from),
        status,
    })
}

fn get_text(row: &Row, name: &str) -> Result<String, ServiceError> {
    row.get_str(name)
        .map(String::from)
        .ok_or_else(|| ServiceError::Storage(format!("missing {name} column")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use biblio_core::{new_id, now_rfc3339};
    use biblio_sql::SqliteStore;

    fn test_db() -> Arc<dyn SQLStore> {
        let db: Arc<dyn SQLStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        // The ledger shares the catalog's tables.
        biblio_catalog::CatalogStore::new(Arc::clone(&db)).unwrap();
        db
    }

    fn make_request(copy_id: &str) -> BorrowRequest {
        BorrowRequest {
            id: new_id(),
            student_id: "s1".into(),
            copy_id: copy_id.into(),
            pickup_date: "2026-08-10".into(),
            pickup_time: "14:00".into(),
            status: RequestStatus::Pending,
            requested_at: now_rfc3339(),
        }
    }

    fn make_record(copy_id: &str) -> BorrowRecord {
        let now = now_rfc3339();
        BorrowRecord {
            id: new_id(),
            student_id: "s1".into(),
            copy_id: copy_id.into(),
            borrow_date: now.clone(),
            due_date: now,
            return_date: None,
            status: LoanStatus::Active,
        }
    }

    fn seed_copy(db: &Arc<dyn SQLStore>) -> String {
        let catalog = biblio_catalog::CatalogStore::new(Arc::clone(db)).unwrap();
        let added = catalog
            .add_book(
                "Dune",
                "Frank Herbert",
                &new_id(),
                biblio_catalog::Category::Literature,
                1,
            )
            .unwrap();
        catalog.list_copies(&added.book.id).unwrap().remove(0).id
    }

    #[test]
    fn insert_and_get_request() {
        let db = test_db();
        let store = CirculationStore::new(Arc::clone(&db)).unwrap();
        let request = make_request("c1");
        store.insert_request(&request).unwrap();

        let got = store.get_request(&request.id).unwrap();
        assert_eq!(got, request);
    }

    #[test]
    fn mark_rejected_is_single_shot() {
        let db = test_db();
        let store = CirculationStore::new(Arc::clone(&db)).unwrap();
        let request = make_request("c1");
        store.insert_request(&request).unwrap();

        assert!(store.mark_rejected(&request.id).unwrap());
        assert!(!store.mark_rejected(&request.id).unwrap());
        assert_eq!(
            store.get_request(&request.id).unwrap().status,
            RequestStatus::Rejected
        );
    }

    #[test]
    fn accept_batch_flips_everything_or_nothing() {
        let db = test_db();
        let store = CirculationStore::new(Arc::clone(&db)).unwrap();
        let copy_id = seed_copy(&db);

        let request = make_request(&copy_id);
        store.insert_request(&request).unwrap();
        let record = make_record(&copy_id);

        store
            .accept_batch(&request.id, &record, &now_rfc3339())
            .unwrap();

        assert_eq!(
            store.get_request(&request.id).unwrap().status,
            RequestStatus::Accepted
        );
        assert_eq!(store.count_active_for_copy(&copy_id).unwrap(), 1);

        // Second accept against the same (now BORROWED) copy: nothing changes.
        let request2 = make_request(&copy_id);
        store.insert_request(&request2).unwrap();
        let record2 = make_record(&copy_id);
        let result = store.accept_batch(&request2.id, &record2, &now_rfc3339());
        assert!(matches!(result, Err(ServiceError::Conflict(_))));
        assert_eq!(
            store.get_request(&request2.id).unwrap().status,
            RequestStatus::Pending
        );
        assert_eq!(store.count_active_for_copy(&copy_id).unwrap(), 1);
    }

    #[test]
    fn accept_batch_rejects_processed_request() {
        let db = test_db();
        let store = CirculationStore::new(Arc::clone(&db)).unwrap();
        let copy_id = seed_copy(&db);

        let request = make_request(&copy_id);
        store.insert_request(&request).unwrap();
        store.mark_rejected(&request.id).unwrap();

        let record = make_record(&copy_id);
        let result = store.accept_batch(&request.id, &record, &now_rfc3339());
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
        assert_eq!(store.count_active_for_copy(&copy_id).unwrap(), 0);
    }

    #[test]
    fn return_batch_roundtrip() {
        let db = test_db();
        let store = CirculationStore::new(Arc::clone(&db)).unwrap();
        let copy_id = seed_copy(&db);

        let record = make_record(&copy_id);
        store.direct_borrow_batch(&record, &now_rfc3339()).unwrap();
        assert_eq!(store.count_active_for_copy(&copy_id).unwrap(), 1);

        store
            .return_batch(&record.id, &copy_id, &now_rfc3339())
            .unwrap();
        assert_eq!(store.count_active_for_copy(&copy_id).unwrap(), 0);

        let returned = store.get_record(&record.id).unwrap();
        assert_eq!(returned.status, LoanStatus::Returned);
        assert!(returned.return_date.is_some());

        // Returning again: the record is no longer active.
        let result = store.return_batch(&record.id, &copy_id, &now_rfc3339());
        assert!(matches!(result, Err(ServiceError::Conflict(_))));
    }

    #[test]
    fn active_unique_index_blocks_second_record() {
        let db = test_db();
        let store = CirculationStore::new(Arc::clone(&db)).unwrap();
        let copy_id = seed_copy(&db);

        store
            .direct_borrow_batch(&make_record(&copy_id), &now_rfc3339())
            .unwrap();

        // Bypass the CAS guard on copies entirely: the partial unique index
        // must still refuse a second ACTIVE record.
        let record = make_record(&copy_id);
        let result = db.exec(
            "INSERT INTO borrow_records \
             (id, student_id, copy_id, borrow_date, due_date, return_date, status) \
             VALUES (?1, ?2, ?3, ?4, ?5, NULL, 'ACTIVE')",
            &record_params(&record),
        );
        assert!(result.is_err());
    }

    #[test]
    fn list_loans_overdue_filter() {
        let db = test_db();
        let store = CirculationStore::new(Arc::clone(&db)).unwrap();
        let copy_id = seed_copy(&db);

        let mut record = make_record(&copy_id);
        record.due_date = "2020-01-01T00:00:00+00:00".into();
        store.direct_borrow_batch(&record, &now_rfc3339()).unwrap();

        let overdue = store
            .list_loans(
                &LoanListQuery {
                    overdue: Some(true),
                    ..Default::default()
                },
                &now_rfc3339(),
            )
            .unwrap();
        assert_eq!(overdue.total, 1);
        assert_eq!(overdue.items[0].title, "Dune");

        let not_overdue = store
            .list_loans(
                &LoanListQuery {
                    overdue: Some(true),
                    ..Default::default()
                },
                "2019-01-01T00:00:00+00:00",
            )
            .unwrap();
        assert_eq!(not_overdue.total, 0);
    }
}
