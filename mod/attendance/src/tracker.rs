use std::sync::{Arc, Mutex};

use tracing::info;

use biblio_core::{ServiceError, now_rfc3339};
use biblio_directory::StudentStore;

use crate::model::{OccupancyReport, OpenEntryView, ToggleAction, ToggleOutcome};
use crate::store::AttendanceStore;

/// Configuration for the attendance tracker.
#[derive(Debug, Clone)]
pub struct AttendanceConfig {
    /// Room capacity: check-ins are refused, not queued, once the open-entry
    /// count reaches this (default: 50). A toggle request may override it
    /// per call.
    pub max_capacity: u32,
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self { max_capacity: 50 }
    }
}

/// The occupancy tracker.
///
/// Per-student state machine: Outside → (check-in, if room) → Inside →
/// (check-out) → Outside. Each toggle is one atomic decision under `gate`,
/// so concurrent check-ins at capacity-1 cannot both pass the capacity
/// check and jointly exceed the limit.
pub struct AttendanceTracker {
    store: Arc<AttendanceStore>,
    directory: Arc<StudentStore>,
    config: AttendanceConfig,
    /// Serializes the look-up / capacity-check / write sequence.
    /// Never held across an await point — all store calls are synchronous.
    gate: Mutex<()>,
}

impl AttendanceTracker {
    pub fn new(
        store: Arc<AttendanceStore>,
        directory: Arc<StudentStore>,
        config: AttendanceConfig,
    ) -> Self {
        Self {
            store,
            directory,
            config,
            gate: Mutex::new(()),
        }
    }

    /// Access the underlying store.
    pub fn store(&self) -> &Arc<AttendanceStore> {
        &self.store
    }

    /// Current occupancy against the configured capacity. Pure read.
    pub fn occupancy(&self) -> Result<OccupancyReport, ServiceError> {
        Ok(OccupancyReport {
            count: self.store.occupancy()?,
            max_capacity: self.config.max_capacity,
        })
    }

    /// Everyone currently inside.
    pub fn open_entries(&self) -> Result<Vec<OpenEntryView>, ServiceError> {
        self.store.list_open()
    }

    /// Flip a student's presence.
    ///
    /// Inside → check-out. Outside → check-in, refused with AtCapacity when
    /// the room is full. The reported occupancy is re-read after the write,
    /// inside the same critical section — never a stale pre-write value.
    pub fn toggle(
        &self,
        student_id: &str,
        max_capacity: Option<u32>,
    ) -> Result<ToggleOutcome, ServiceError> {
        let student = self.directory.get(student_id)?;
        let capacity = max_capacity.unwrap_or(self.config.max_capacity);

        let _guard = self
            .gate
            .lock()
            .map_err(|e| ServiceError::Internal(e.to_string()))?;

        let now = now_rfc3339();
        let action = match self.store.open_entry(student_id)? {
            Some(entry) => {
                self.store.close_entry(&entry.id, &now)?;
                ToggleAction::CheckedOut
            }
            None => {
                let occupancy = self.store.occupancy()?;
                if occupancy >= capacity as i64 {
                    return Err(ServiceError::AtCapacity(format!(
                        "library is at capacity ({occupancy}/{capacity})"
                    )));
                }
                self.store.insert_entry(student_id, &now)?;
                ToggleAction::CheckedIn
            }
        };

        let occupancy = self.store.occupancy()?;
        info!(student_id, ?action, occupancy, "attendance toggled");
        Ok(ToggleOutcome {
            action,
            student_id: student.id,
            student_name: student.name,
            occupancy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biblio_sql::{SQLStore, SqliteStore};

    fn tracker_with_capacity(max_capacity: u32, students: usize) -> Arc<AttendanceTracker> {
        let db: Arc<dyn SQLStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let directory = Arc::new(StudentStore::new(Arc::clone(&db)).unwrap());
        let store = Arc::new(AttendanceStore::new(Arc::clone(&db)).unwrap());

        for i in 0..students {
            directory
                .register(
                    &format!("s{i}"),
                    &format!("Student {i}"),
                    &format!("s{i}@school.edu"),
                    None,
                )
                .unwrap();
        }

        Arc::new(AttendanceTracker::new(
            store,
            directory,
            AttendanceConfig { max_capacity },
        ))
    }

    #[test]
    fn toggle_unknown_student_not_found() {
        let tracker = tracker_with_capacity(10, 0);
        let result = tracker.toggle("ghost", None);
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[test]
    fn check_in_then_out_restores_occupancy() {
        let tracker = tracker_with_capacity(10, 1);
        assert_eq!(tracker.occupancy().unwrap().count, 0);

        let in_ = tracker.toggle("s0", None).unwrap();
        assert_eq!(in_.action, ToggleAction::CheckedIn);
        assert_eq!(in_.student_name, "Student 0");
        assert_eq!(in_.occupancy, 1);

        let out = tracker.toggle("s0", None).unwrap();
        assert_eq!(out.action, ToggleAction::CheckedOut);
        assert_eq!(out.occupancy, 0);

        // The next toggle is a fresh check-in, not a negative count.
        let again = tracker.toggle("s0", None).unwrap();
        assert_eq!(again.action, ToggleAction::CheckedIn);
        assert_eq!(again.occupancy, 1);
    }

    #[test]
    fn check_in_refused_at_capacity() {
        let tracker = tracker_with_capacity(2, 3);
        tracker.toggle("s0", None).unwrap();
        tracker.toggle("s1", None).unwrap();

        let refused = tracker.toggle("s2", None);
        assert!(matches!(refused, Err(ServiceError::AtCapacity(_))));
        assert_eq!(tracker.occupancy().unwrap().count, 2);

        // A check-out is always admitted, and frees a slot.
        tracker.toggle("s0", None).unwrap();
        let admitted = tracker.toggle("s2", None).unwrap();
        assert_eq!(admitted.action, ToggleAction::CheckedIn);
        assert_eq!(admitted.occupancy, 2);
    }

    #[test]
    fn per_call_capacity_override() {
        let tracker = tracker_with_capacity(50, 2);
        tracker.toggle("s0", None).unwrap();

        let refused = tracker.toggle("s1", Some(1));
        assert!(matches!(refused, Err(ServiceError::AtCapacity(_))));
    }

    #[test]
    fn concurrent_check_ins_never_exceed_capacity() {
        let capacity = 3u32;
        let tracker = tracker_with_capacity(capacity, 8);

        let mut handles = Vec::new();
        for i in 0..8 {
            let tracker = Arc::clone(&tracker);
            handles.push(std::thread::spawn(move || {
                tracker.toggle(&format!("s{i}"), None).is_ok()
            }));
        }
        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(successes, capacity as usize);
        assert_eq!(tracker.occupancy().unwrap().count, capacity as i64);
    }

    #[test]
    fn open_entries_lists_names() {
        let tracker = tracker_with_capacity(10, 2);
        tracker.toggle("s0", None).unwrap();
        tracker.toggle("s1", None).unwrap();

        let open = tracker.open_entries().unwrap();
        assert_eq!(open.len(), 2);
        assert_eq!(open[0].student_name, "Student 0");
    }
}
