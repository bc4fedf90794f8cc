use std::sync::Arc;

use tracing::info;

use biblio_core::{ListResult, ServiceError, new_id, now_rfc3339};
use biblio_sql::{Row, SQLStore, Value};

use crate::model::{Book, BookListQuery, BookOverview, Category, Copy, CopyDetail, CopyStatus};

/// SQL schema for the catalog tables.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS books (
    id          TEXT PRIMARY KEY,
    title       TEXT NOT NULL,
    author      TEXT NOT NULL,
    isbn        TEXT NOT NULL UNIQUE,
    category    TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_books_category ON books(category);
CREATE INDEX IF NOT EXISTS idx_books_title ON books(title);
CREATE TABLE IF NOT EXISTS copies (
    id          TEXT PRIMARY KEY,
    book_id     TEXT NOT NULL REFERENCES books(id),
    status      TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_copies_book ON copies(book_id);
CREATE INDEX IF NOT EXISTS idx_copies_status ON copies(status);
";

/// Persistent storage for books and copies, backed by SQLStore (SQLite).
pub struct CatalogStore {
    db: Arc<dyn SQLStore>,
}

impl CatalogStore {
    /// Create a new CatalogStore and initialise the schema.
    pub fn new(db: Arc<dyn SQLStore>) -> Result<Self, ServiceError> {
        for stmt in SCHEMA.split(';').filter(|s| !s.trim().is_empty()) {
            db.exec(stmt, &[])
                .map_err(|e| ServiceError::Storage(format!("catalog schema init: {e}")))?;
        }
        Ok(Self { db })
    }

    /// The shared SQL handle (used by circulation's cross-table batches).
    pub fn db(&self) -> &Arc<dyn SQLStore> {
        &self.db
    }

    // -----------------------------------------------------------------------
    // Books
    // -----------------------------------------------------------------------

    /// Register a new title together with `copies` physical copies.
    pub fn add_book(
        &self,
        title: &str,
        author: &str,
        isbn: &str,
        category: Category,
        copies: u32,
    ) -> Result<BookOverview, ServiceError> {
        if title.trim().is_empty() || author.trim().is_empty() || isbn.trim().is_empty() {
            return Err(ServiceError::Validation(
                "title, author and isbn are required".into(),
            ));
        }

        let now = now_rfc3339();
        let book = Book {
            id: new_id(),
            title: title.to_string(),
            author: author.to_string(),
            isbn: isbn.to_string(),
            category,
            created_at: now.clone(),
            updated_at: now.clone(),
        };

        self.db
            .exec(
                "INSERT INTO books (id, title, author, isbn, category, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                &[
                    Value::Text(book.id.clone()),
                    Value::Text(book.title.clone()),
                    Value::Text(book.author.clone()),
                    Value::Text(book.isbn.clone()),
                    Value::Text(book.category.as_str().to_string()),
                    Value::Text(now.clone()),
                    Value::Text(now.clone()),
                ],
            )
            .map_err(|e| {
                let msg = e.to_string();
                if msg.contains("UNIQUE constraint") {
                    ServiceError::Conflict(format!("isbn {isbn} already exists"))
                } else {
                    ServiceError::Storage(msg)
                }
            })?;

        for _ in 0..copies {
            self.insert_copy(&book.id, &now)?;
        }

        info!(book_id = %book.id, title, copies, "book added");
        Ok(BookOverview {
            book,
            total_copies: copies as i64,
            available_copies: copies as i64,
        })
    }

    /// Get a book by ID.
    pub fn get_book(&self, id: &str) -> Result<Book, ServiceError> {
        let rows = self
            .db
            .query(
                "SELECT id, title, author, isbn, category, created_at, updated_at \
                 FROM books WHERE id = ?1",
                &[Value::Text(id.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        let row = rows
            .first()
            .ok_or_else(|| ServiceError::NotFound(format!("book {id}")))?;
        row_to_book(row)
    }

    /// Replace a book's metadata (explicit edit only).
    pub fn update_book(
        &self,
        id: &str,
        title: &str,
        author: &str,
        isbn: &str,
        category: Category,
    ) -> Result<Book, ServiceError> {
        let now = now_rfc3339();
        let affected = self
            .db
            .exec(
                "UPDATE books SET title = ?1, author = ?2, isbn = ?3, category = ?4, \
                 updated_at = ?5 WHERE id = ?6",
                &[
                    Value::Text(title.to_string()),
                    Value::Text(author.to_string()),
                    Value::Text(isbn.to_string()),
                    Value::Text(category.as_str().to_string()),
                    Value::Text(now),
                    Value::Text(id.to_string()),
                ],
            )
            .map_err(|e| {
                let msg = e.to_string();
                if msg.contains("UNIQUE constraint") {
                    ServiceError::Conflict(format!("isbn {isbn} already exists"))
                } else {
                    ServiceError::Storage(msg)
                }
            })?;

        if affected == 0 {
            return Err(ServiceError::NotFound(format!("book {id}")));
        }
        self.get_book(id)
    }

    /// Delete a book and its copies. Refused while any copy is on loan.
    pub fn delete_book(&self, id: &str) -> Result<(), ServiceError> {
        let borrowed = self.count_copies(id, Some(CopyStatus::Borrowed))?;
        if borrowed > 0 {
            return Err(ServiceError::Conflict(format!(
                "book {id} has {borrowed} copy(ies) on loan"
            )));
        }

        self.db
            .exec(
                "DELETE FROM copies WHERE book_id = ?1",
                &[Value::Text(id.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        let affected = self
            .db
            .exec(
                "DELETE FROM books WHERE id = ?1",
                &[Value::Text(id.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        if affected == 0 {
            return Err(ServiceError::NotFound(format!("book {id}")));
        }
        info!(book_id = id, "book deleted");
        Ok(())
    }

    /// List books with copy counts, optionally filtered by category and a
    /// title/author substring search.
    pub fn list_books(&self, query: &BookListQuery) -> Result<ListResult<BookOverview>, ServiceError> {
        let limit = query.limit.unwrap_or(50);
        let offset = query.offset.unwrap_or(0);

        let mut where_clauses: Vec<String> = Vec::new();
        let mut params: Vec<Value> = Vec::new();
        let mut idx = 1;

        if let Some(ref c) = query.category {
            let category = Category::from_str(c)
                .ok_or_else(|| ServiceError::Validation(format!("invalid category: {c}")))?;
            where_clauses.push(format!("b.category = ?{idx}"));
            params.push(Value::Text(category.as_str().to_string()));
            idx += 1;
        }
        if let Some(ref q) = query.q {
            let field = match query.by.as_deref() {
                None | Some("title") => "b.title",
                Some("author") => "b.author",
                Some(other) => {
                    return Err(ServiceError::Validation(format!(
                        "invalid search field: {other}"
                    )))
                }
            };
            where_clauses.push(format!("{field} LIKE ?{idx}"));
            params.push(Value::Text(format!("%{q}%")));
            idx += 1;
        }

        let where_sql = if where_clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", where_clauses.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) as cnt FROM books b {where_sql}");
        let count_rows = self
            .db
            .query(&count_sql, &params)
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        let total = count_rows
            .first()
            .and_then(|r| r.get_i64("cnt"))
            .unwrap_or(0) as usize;

        let select_sql = format!(
            "SELECT b.id, b.title, b.author, b.isbn, b.category, b.created_at, b.updated_at, \
             COUNT(c.id) as total_copies, \
             COALESCE(SUM(c.status = 'AVAILABLE'), 0) as available_copies \
             FROM books b LEFT JOIN copies c ON c.book_id = b.id \
             {where_sql} GROUP BY b.id ORDER BY b.title ASC LIMIT ?{idx} OFFSET ?{}",
            idx + 1
        );
        let mut select_params = params;
        select_params.push(Value::Integer(limit as i64));
        select_params.push(Value::Integer(offset as i64));

        let rows = self
            .db
            .query(&select_sql, &select_params)
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        let mut items = Vec::new();
        for row in &rows {
            items.push(BookOverview {
                book: row_to_book(row)?,
                total_copies: row.get_i64("total_copies").unwrap_or(0),
                available_copies: row.get_i64("available_copies").unwrap_or(0),
            });
        }

        Ok(ListResult { items, total })
    }

    // -----------------------------------------------------------------------
    // Copies
    // -----------------------------------------------------------------------

    /// Register an additional copy of an existing book.
    pub fn add_copy(&self, book_id: &str) -> Result<Copy, ServiceError> {
        // Validate the book exists first — the FK error alone is opaque.
        self.get_book(book_id)?;
        let now = now_rfc3339();
        let id = self.insert_copy(book_id, &now)?;
        self.get_copy(&id)
    }

    fn insert_copy(&self, book_id: &str, now: &str) -> Result<String, ServiceError> {
        let id = new_id();
        self.db
            .exec(
                "INSERT INTO copies (id, book_id, status, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                &[
                    Value::Text(id.clone()),
                    Value::Text(book_id.to_string()),
                    Value::Text(CopyStatus::Available.as_str().to_string()),
                    Value::Text(now.to_string()),
                    Value::Text(now.to_string()),
                ],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        Ok(id)
    }

    /// Get a copy by ID.
    pub fn get_copy(&self, id: &str) -> Result<Copy, ServiceError> {
        let rows = self
            .db
            .query(
                "SELECT id, book_id, status, created_at, updated_at FROM copies WHERE id = ?1",
                &[Value::Text(id.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        let row = rows
            .first()
            .ok_or_else(|| ServiceError::NotFound(format!("copy {id}")))?;
        row_to_copy(row)
    }

    /// Get a copy joined with its book's metadata.
    pub fn get_copy_detail(&self, id: &str) -> Result<CopyDetail, ServiceError> {
        let copy = self.get_copy(id)?;
        let book = self.get_book(&copy.book_id)?;
        Ok(CopyDetail {
            copy,
            title: book.title,
            author: book.author,
            isbn: book.isbn,
            category: book.category,
        })
    }

    /// List all copies of a book.
    pub fn list_copies(&self, book_id: &str) -> Result<Vec<Copy>, ServiceError> {
        self.get_book(book_id)?;
        let rows = self
            .db
            .query(
                "SELECT id, book_id, status, created_at, updated_at FROM copies \
                 WHERE book_id = ?1 ORDER BY created_at ASC",
                &[Value::Text(book_id.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        rows.iter().map(row_to_copy).collect()
    }

    /// Count copies of a book, optionally restricted to one status.
    pub fn count_copies(
        &self,
        book_id: &str,
        status: Option<CopyStatus>,
    ) -> Result<i64, ServiceError> {
        let (sql, params): (&str, Vec<Value>) = match status {
            Some(s) => (
                "SELECT COUNT(*) as cnt FROM copies WHERE book_id = ?1 AND status = ?2",
                vec![
                    Value::Text(book_id.to_string()),
                    Value::Text(s.as_str().to_string()),
                ],
            ),
            None => (
                "SELECT COUNT(*) as cnt FROM copies WHERE book_id = ?1",
                vec![Value::Text(book_id.to_string())],
            ),
        };
        let rows = self
            .db
            .query(sql, &params)
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        Ok(rows.first().and_then(|r| r.get_i64("cnt")).unwrap_or(0))
    }

    /// Mark a copy LOST / DAMAGED / MISSING, or restore it to AVAILABLE.
    ///
    /// BORROWED is owned by circulation's atomic units and refused here, in
    /// both directions: a copy on loan must come back through a return.
    pub fn set_copy_status(&self, id: &str, status: CopyStatus) -> Result<Copy, ServiceError> {
        if status == CopyStatus::Borrowed {
            return Err(ServiceError::Validation(
                "status BORROWED is managed by circulation".into(),
            ));
        }

        let now = now_rfc3339();
        let affected = self
            .db
            .exec(
                "UPDATE copies SET status = ?1, updated_at = ?2 \
                 WHERE id = ?3 AND status != 'BORROWED'",
                &[
                    Value::Text(status.as_str().to_string()),
                    Value::Text(now),
                    Value::Text(id.to_string()),
                ],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        if affected == 0 {
            // Either the copy is unknown (404 from the lookup) or the guard
            // rejected an on-loan copy.
            self.get_copy(id)?;
            return Err(ServiceError::Conflict(format!(
                "copy {id} is on loan; return it before changing its status"
            )));
        }
        info!(copy_id = id, status = %status, "copy status set");
        self.get_copy(id)
    }
}

/// Deserialize a Book from a row's columns.
fn row_to_book(row: &Row) -> Result<Book, ServiceError> {
    let category_str = row
        .get_str("category")
        .ok_or_else(|| ServiceError::Storage("missing category column".into()))?;
    let category = Category::from_str(category_str)
        .ok_or_else(|| ServiceError::Internal(format!("unknown category: {category_str}")))?;

    Ok(Book {
        id: get_text(row, "id")?,
        title: get_text(row, "title")?,
        author: get_text(row, "author")?,
        isbn: get_text(row, "isbn")?,
        category,
        created_at: get_text(row, "created_at")?,
        updated_at: get_text(row, "updated_at")?,
    })
}

/// Deserialize a Copy from a row's columns.
fn row_to_copy(row: &Row) -> Result<Copy, ServiceError> {
    let status_str = row
        .get_str("status")
        .ok_or_else(|| ServiceError::Storage("missing status column".into()))?;
    let status = CopyStatus::from_str(status_str)
        .ok_or_else(|| ServiceError::Internal(format!("unknown copy status: {status_str}")))?;

    Ok(Copy {
        id: get_text(row, "id")?,
        book_id: get_text(row, "book_id")?,
        status,
        created_at: get_text(row, "created_at")?,
        updated_at: get_text(row, "updated_at")?,
    })
}

fn get_text(row: &Row, name: &str) -> Result<String, ServiceError> {
    row.get_str(name)
        .map(String::from)
        .ok_or_else(|| ServiceError::Storage(format!("missing {name} column")))
}
