use std::sync::{Arc, Mutex};

use chrono::Duration;
use tracing::info;

use biblio_catalog::{CatalogStore, CopyStatus};
use biblio_core::{ListResult, ServiceError, new_id, now_rfc3339};
use biblio_directory::StudentStore;

use crate::model::{
    BorrowRecord, BorrowRequest, Decision, LibraryStats, LoanListQuery, LoanStatus, LoanView,
    RequestListQuery, RequestStatus, ResolveOutcome, ReturnOutcome, StudentSummary,
};
use crate::store::CirculationStore;

/// Configuration for the circulation service.
#[derive(Debug, Clone)]
pub struct CirculationConfig {
    /// Loan period applied at acceptance time, in days (default: 14).
    pub loan_period_days: i64,
}

impl Default for CirculationConfig {
    fn default() -> Self {
        Self {
            loan_period_days: 14,
        }
    }
}

/// The lifecycle coordinator for borrowing.
///
/// Moves a request through PENDING → {ACCEPTED, REJECTED} and keeps copy
/// status consistent with the ledger. Every read-check-write sequence runs
/// under `gate` and commits through a single store transaction, so two
/// concurrent accepts for the same copy can never both observe AVAILABLE
/// and both commit.
pub struct CirculationService {
    store: Arc<CirculationStore>,
    catalog: Arc<CatalogStore>,
    directory: Arc<StudentStore>,
    config: CirculationConfig,
    /// Serializes accept / return / direct-borrow decision sections.
    /// Never held across an await point — all store calls are synchronous.
    gate: Mutex<()>,
}

impl CirculationService {
    pub fn new(
        store: Arc<CirculationStore>,
        catalog: Arc<CatalogStore>,
        directory: Arc<StudentStore>,
        config: CirculationConfig,
    ) -> Self {
        Self {
            store,
            catalog,
            directory,
            config,
            gate: Mutex::new(()),
        }
    }

    /// Access the underlying store.
    pub fn store(&self) -> &Arc<CirculationStore> {
        &self.store
    }

    // =======================================================================
    // Requests
    // =======================================================================

    /// Record a borrower's intent to pick up a copy. No state change to the
    /// copy or the ledger — availability is re-checked at acceptance time.
    pub fn submit_request(
        &self,
        copy_id: &str,
        student_id: &str,
        pickup_date: &str,
        pickup_time: &str,
    ) -> Result<BorrowRequest, ServiceError> {
        if copy_id.trim().is_empty()
            || student_id.trim().is_empty()
            || pickup_date.trim().is_empty()
            || pickup_time.trim().is_empty()
        {
            return Err(ServiceError::Validation(
                "copyId, studentId, pickupDate and pickupTime are required".into(),
            ));
        }

        // Both referents must exist; their state does not matter yet.
        self.catalog.get_copy(copy_id)?;
        self.directory.get(student_id)?;

        let request = BorrowRequest {
            id: new_id(),
            student_id: student_id.to_string(),
            copy_id: copy_id.to_string(),
            pickup_date: pickup_date.to_string(),
            pickup_time: pickup_time.to_string(),
            status: RequestStatus::Pending,
            requested_at: now_rfc3339(),
        };
        self.store.insert_request(&request)?;

        info!(request_id = %request.id, copy_id, student_id, "borrow request submitted");
        Ok(request)
    }

    /// Resolve a PENDING request. Accept is the atomic unit that creates the
    /// loan and flips the copy; Reject only closes the request.
    pub fn resolve_request(
        &self,
        request_id: &str,
        decision: Decision,
    ) -> Result<ResolveOutcome, ServiceError> {
        let request = self.store.get_request(request_id)?;
        if request.status.is_terminal() {
            return Err(ServiceError::NotFound(format!(
                "borrow request {request_id} not found or already processed"
            )));
        }

        let detail = self.catalog.get_copy_detail(&request.copy_id)?;
        let book_title = detail.title.clone();

        match decision {
            Decision::Reject => {
                if !self.store.mark_rejected(request_id)? {
                    // Lost the race to another resolver.
                    return Err(ServiceError::NotFound(format!(
                        "borrow request {request_id} not found or already processed"
                    )));
                }
                info!(request_id, "borrow request rejected");
                Ok(ResolveOutcome {
                    request_id: request_id.to_string(),
                    status: RequestStatus::Rejected,
                    book_title: book_title.clone(),
                    borrow_record_id: None,
                    due_date: None,
                    message: format!("Borrow request for \"{book_title}\" rejected."),
                })
            }
            Decision::Accept => {
                let _guard = self
                    .gate
                    .lock()
                    .map_err(|e| ServiceError::Internal(e.to_string()))?;

                // Re-read the copy inside the critical section; the earlier
                // read was only for the title.
                let copy = self.catalog.get_copy(&request.copy_id)?;
                if copy.status != CopyStatus::Available {
                    return Err(ServiceError::Conflict(format!(
                        "book \"{book_title}\" is not available for borrowing (status: {})",
                        copy.status
                    )));
                }

                let record = self.new_record(&request.student_id, &request.copy_id);
                let now = now_rfc3339();
                self.store.accept_batch(request_id, &record, &now)?;

                info!(
                    request_id,
                    record_id = %record.id,
                    copy_id = %record.copy_id,
                    due_date = %record.due_date,
                    "borrow request accepted"
                );
                Ok(ResolveOutcome {
                    request_id: request_id.to_string(),
                    status: RequestStatus::Accepted,
                    book_title: book_title.clone(),
                    borrow_record_id: Some(record.id),
                    due_date: Some(record.due_date),
                    message: format!(
                        "Borrow request for \"{book_title}\" accepted; copy marked as borrowed."
                    ),
                })
            }
        }
    }

    /// Librarian-initiated loan with no prior request.
    pub fn direct_borrow(
        &self,
        copy_id: &str,
        student_id: &str,
    ) -> Result<BorrowRecord, ServiceError> {
        self.directory.get(student_id)?;

        let _guard = self
            .gate
            .lock()
            .map_err(|e| ServiceError::Internal(e.to_string()))?;

        let copy = self.catalog.get_copy(copy_id)?;
        if copy.status != CopyStatus::Available {
            return Err(ServiceError::Conflict(format!(
                "copy {copy_id} is not available for borrowing (status: {})",
                copy.status
            )));
        }

        let record = self.new_record(student_id, copy_id);
        let now = now_rfc3339();
        self.store.direct_borrow_batch(&record, &now)?;

        info!(record_id = %record.id, copy_id, student_id, "direct loan created");
        Ok(record)
    }

    // =======================================================================
    // Returns
    // =======================================================================

    /// Close the active loan for a copy and make it available again.
    ///
    /// Returning a copy that is already AVAILABLE succeeds idempotently. A
    /// copy marked BORROWED with no active record is an inconsistency and is
    /// surfaced as an internal error, never silently fixed.
    pub fn return_copy(&self, copy_id: &str) -> Result<ReturnOutcome, ServiceError> {
        let _guard = self
            .gate
            .lock()
            .map_err(|e| ServiceError::Internal(e.to_string()))?;

        let detail = self.catalog.get_copy_detail(copy_id)?;
        let book_title = detail.title.clone();

        let record = match self.store.latest_active_record(copy_id)? {
            Some(record) => record,
            None => {
                return match detail.copy.status {
                    CopyStatus::Available => Ok(ReturnOutcome {
                        book_title: book_title.clone(),
                        borrow_record_id: None,
                        student_id: None,
                        message: format!("Copy of \"{book_title}\" is already available."),
                    }),
                    CopyStatus::Borrowed => Err(ServiceError::Internal(format!(
                        "copy {copy_id} is marked BORROWED but has no active loan record"
                    ))),
                    status => Err(ServiceError::Conflict(format!(
                        "copy {copy_id} is not on loan (status: {status})"
                    ))),
                };
            }
        };

        let now = now_rfc3339();
        self.store.return_batch(&record.id, copy_id, &now)?;

        info!(record_id = %record.id, copy_id, "copy returned");
        Ok(ReturnOutcome {
            book_title: book_title.clone(),
            borrow_record_id: Some(record.id),
            student_id: Some(record.student_id),
            message: format!("\"{book_title}\" returned successfully."),
        })
    }

    // =======================================================================
    // Queries
    // =======================================================================

    pub fn get_request(&self, id: &str) -> Result<BorrowRequest, ServiceError> {
        self.store.get_request(id)
    }

    pub fn list_requests(
        &self,
        query: &RequestListQuery,
    ) -> Result<ListResult<BorrowRequest>, ServiceError> {
        self.store.list_requests(query)
    }

    pub fn list_loans(&self, query: &LoanListQuery) -> Result<ListResult<LoanView>, ServiceError> {
        self.store.list_loans(query, &now_rfc3339())
    }

    /// Per-student dashboard counters.
    pub fn student_summary(&self, student_id: &str) -> Result<StudentSummary, ServiceError> {
        self.directory.get(student_id)?;
        let now = now_rfc3339();
        Ok(StudentSummary {
            student_id: student_id.to_string(),
            active_loans: self.store.count_loans_for_student(student_id, None)?,
            overdue_loans: self
                .store
                .count_loans_for_student(student_id, Some(&now))?,
            pending_requests: self.store.count_pending_requests_for_student(student_id)?,
        })
    }

    /// Library-wide dashboard counters.
    pub fn library_stats(&self) -> Result<LibraryStats, ServiceError> {
        let [total_books, total_copies, borrowed_copies, active_loans, overdue_loans, pending_requests] =
            self.store.library_counts(&now_rfc3339())?;
        Ok(LibraryStats {
            total_books,
            total_copies,
            borrowed_copies,
            active_loans,
            overdue_loans,
            pending_requests,
        })
    }

    fn new_record(&self, student_id: &str, copy_id: &str) -> BorrowRecord {
        let now = chrono::Utc::now();
        let due = now + Duration::days(self.config.loan_period_days);
        BorrowRecord {
            id: new_id(),
            student_id: student_id.to_string(),
            copy_id: copy_id.to_string(),
            borrow_date: now.to_rfc3339(),
            due_date: due.to_rfc3339(),
            return_date: None,
            status: LoanStatus::Active,
        }
    }
}
