use super::repository::CatalogRepository;
use crate::model::CurrencyRecord;
use std::collections::VecDeque;
use thiserror::Error;

/// Direction of a single-step move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Why a reorder was refused.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderError {
    #[error("the order is being saved")]
    SaveInFlight,

    #[error("reordering is disabled while a search filter is active")]
    Filtered,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistError {
    #[error("a save is already in progress")]
    InFlight,
}

/// One `(id, rank)` pair sent to the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankWrite {
    pub id: i64,
    pub rank: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedWrite {
    pub write: RankWrite,
    pub reason: String,
}

/// Exactly which rank writes reached the repository.
///
/// Writes are not transactional: after a failure the repository holds the
/// `applied` ranks and its old values for everything else.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistReport {
    pub applied: Vec<RankWrite>,
    pub failed: Option<FailedWrite>,
    pub unattempted: Vec<RankWrite>,
}

impl PersistReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_none()
    }

    pub fn is_partial(&self) -> bool {
        self.failed.is_some() && !self.applied.is_empty()
    }
}

/// A persist in progress. Each `step` issues one write and awaits it.
#[derive(Debug)]
pub struct PersistJob {
    pending: VecDeque<RankWrite>,
    applied: Vec<RankWrite>,
    total: usize,
}

impl PersistJob {
    fn new(writes: Vec<RankWrite>) -> Self {
        let total = writes.len();
        Self {
            pending: writes.into(),
            applied: Vec::with_capacity(total),
            total,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn completed(&self) -> usize {
        self.applied.len()
    }

    /// Issue the next write. Returns the final report once the job is over,
    /// either because every write succeeded or because one failed.
    pub async fn step<R: CatalogRepository>(&mut self, repo: &R) -> Option<PersistReport> {
        let Some(write) = self.pending.pop_front() else {
            return Some(self.report(None));
        };
        match repo.update_rank(write.id, write.rank).await {
            Ok(()) => {
                self.applied.push(write);
                if self.pending.is_empty() {
                    Some(self.report(None))
                } else {
                    None
                }
            }
            Err(e) => {
                tracing::warn!(id = write.id, rank = write.rank, error = %e, "rank write failed");
                Some(self.report(Some(FailedWrite {
                    write,
                    reason: e.user_message(),
                })))
            }
        }
    }

    /// Drive the job to completion.
    pub async fn run<R: CatalogRepository>(mut self, repo: &R) -> PersistReport {
        loop {
            if let Some(report) = self.step(repo).await {
                return report;
            }
        }
    }

    fn report(&mut self, failed: Option<FailedWrite>) -> PersistReport {
        PersistReport {
            applied: std::mem::take(&mut self.applied),
            failed,
            unattempted: self.pending.drain(..).collect(),
        }
    }
}

/// Record being dragged, tracked by id rather than by list position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DragState {
    id: i64,
}

/// Reorders the record list and persists the result as rank writes.
#[derive(Debug, Default)]
pub struct OrderingEngine {
    dirty: bool,
    saving: bool,
    drag: Option<DragState>,
}

impl OrderingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn dragged_id(&self) -> Option<i64> {
        self.drag.map(|d| d.id)
    }

    /// Forget local edits after the list has been replaced from storage.
    pub fn reset(&mut self) {
        self.dirty = false;
        self.drag = None;
    }

    /// Swap the record at `index` with its neighbor. Returns `Ok(false)` at
    /// the boundary.
    pub fn move_step(
        &mut self,
        records: &mut [CurrencyRecord],
        index: usize,
        direction: Direction,
    ) -> Result<bool, ReorderError> {
        self.ensure_idle()?;
        let target = match direction {
            Direction::Up => index.checked_sub(1),
            Direction::Down => index.checked_add(1),
        };
        match target {
            Some(target) if index < records.len() && target < records.len() => {
                records.swap(index, target);
                self.dirty = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Remove the record at `from` and reinsert it at `to`.
    pub fn drag_reorder(
        &mut self,
        records: &mut [CurrencyRecord],
        from: usize,
        to: usize,
    ) -> Result<bool, ReorderError> {
        self.ensure_idle()?;
        if from == to || from >= records.len() || to >= records.len() {
            return Ok(false);
        }
        if from < to {
            records[from..=to].rotate_left(1);
        } else {
            records[to..=from].rotate_right(1);
        }
        self.dirty = true;
        Ok(true)
    }

    /// Pick up the record at `index` for dragging.
    pub fn begin_drag(&mut self, records: &[CurrencyRecord], index: usize) -> Result<bool, ReorderError> {
        self.ensure_idle()?;
        match records.get(index) {
            Some(record) => {
                self.drag = Some(DragState { id: record.id });
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Move the dragged record to `target`, wherever it currently sits.
    pub fn drag_over(&mut self, records: &mut [CurrencyRecord], target: usize) -> Result<bool, ReorderError> {
        let Some(drag) = self.drag else {
            return Ok(false);
        };
        let Some(from) = records.iter().position(|r| r.id == drag.id) else {
            self.drag = None;
            return Ok(false);
        };
        self.drag_reorder(records, from, target)
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    /// Start a persist of the current order.
    ///
    /// Returns `Ok(None)` when nothing changed since the last save.
    pub fn begin_persist(&mut self, records: &[CurrencyRecord]) -> Result<Option<PersistJob>, PersistError> {
        if self.saving {
            return Err(PersistError::InFlight);
        }
        if !self.dirty {
            return Ok(None);
        }
        self.saving = true;
        self.drag = None;
        let writes = records
            .iter()
            .enumerate()
            .map(|(i, r)| RankWrite {
                id: r.id,
                rank: i as i64 + 1,
            })
            .collect();
        Ok(Some(PersistJob::new(writes)))
    }

    /// Apply a finished job's report: applied ranks are written back onto the
    /// records, and the dirty flag clears only on full success.
    pub fn finish_persist(&mut self, records: &mut [CurrencyRecord], report: &PersistReport) {
        self.saving = false;
        for write in &report.applied {
            if let Some(record) = records.iter_mut().find(|r| r.id == write.id) {
                record.sort_order = Some(write.rank);
            }
        }
        if report.is_success() {
            self.dirty = false;
        }
    }

    /// Persist the whole order, one awaited write at a time.
    pub async fn persist<R: CatalogRepository>(
        &mut self,
        records: &mut [CurrencyRecord],
        repo: &R,
    ) -> Result<PersistReport, PersistError> {
        let Some(job) = self.begin_persist(records)? else {
            return Ok(PersistReport::default());
        };
        let report = job.run(repo).await;
        self.finish_persist(records, &report);
        Ok(report)
    }

    fn ensure_idle(&self) -> Result<(), ReorderError> {
        if self.saving {
            Err(ReorderError::SaveInFlight)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::repository::memory::MemoryRepository;
    use crate::model::record;
    use proptest::prelude::*;

    fn letters(codes: &[&str]) -> Vec<CurrencyRecord> {
        codes
            .iter()
            .enumerate()
            .map(|(i, c)| record(i as i64 + 1, c, c))
            .collect()
    }

    fn codes(records: &[CurrencyRecord]) -> Vec<String> {
        records.iter().map(|r| r.code.clone()).collect()
    }

    #[test]
    fn test_move_step_swaps_and_marks_dirty() {
        let mut engine = OrderingEngine::new();
        let mut records = letters(&["A", "B", "C"]);
        assert_eq!(engine.move_step(&mut records, 1, Direction::Up), Ok(true));
        assert_eq!(codes(&records), ["B", "A", "C"]);
        assert!(engine.is_dirty());
    }

    #[test]
    fn test_move_step_at_boundary_is_noop() {
        let mut engine = OrderingEngine::new();
        let mut records = letters(&["A", "B", "C"]);
        assert_eq!(engine.move_step(&mut records, 0, Direction::Up), Ok(false));
        assert_eq!(engine.move_step(&mut records, 2, Direction::Down), Ok(false));
        assert_eq!(engine.move_step(&mut records, usize::MAX, Direction::Down), Ok(false));
        assert_eq!(codes(&records), ["A", "B", "C"]);
        assert!(!engine.is_dirty());
    }

    #[test]
    fn test_move_step_up_then_down_restores() {
        let mut engine = OrderingEngine::new();
        let mut records = letters(&["A", "B", "C", "D"]);
        engine.move_step(&mut records, 2, Direction::Up).unwrap();
        engine.move_step(&mut records, 1, Direction::Down).unwrap();
        assert_eq!(codes(&records), ["A", "B", "C", "D"]);
    }

    #[test]
    fn test_drag_reorder_is_a_splice() {
        let mut engine = OrderingEngine::new();
        let mut records = letters(&["A", "B", "C", "D"]);
        engine.drag_reorder(&mut records, 0, 2).unwrap();
        assert_eq!(codes(&records), ["B", "C", "A", "D"]);
        engine.drag_reorder(&mut records, 2, 0).unwrap();
        assert_eq!(codes(&records), ["A", "B", "C", "D"]);
    }

    #[test]
    fn test_repeated_long_drag_is_not_self_inverse() {
        let mut engine = OrderingEngine::new();
        let mut records = letters(&["A", "B", "C", "D", "E"]);
        // A swap of 0 and 3 would give [D, B, C, A, E].
        engine.drag_reorder(&mut records, 0, 3).unwrap();
        assert_eq!(codes(&records), ["B", "C", "D", "A", "E"]);
        // Repeating a swap restores the list; repeating a splice does not.
        engine.drag_reorder(&mut records, 0, 3).unwrap();
        assert_eq!(codes(&records), ["C", "D", "A", "B", "E"]);
        assert_ne!(codes(&records), ["A", "B", "C", "D", "E"]);
    }

    #[test]
    fn test_identity_drag_tracks_record_across_targets() {
        let mut engine = OrderingEngine::new();
        let mut records = letters(&["A", "B", "C", "D"]);
        assert_eq!(engine.begin_drag(&records, 0), Ok(true));
        assert!(engine.is_dragging());
        // Crossing each intermediate row, as a live drag does.
        engine.drag_over(&mut records, 1).unwrap();
        engine.drag_over(&mut records, 2).unwrap();
        engine.drag_over(&mut records, 3).unwrap();
        assert_eq!(codes(&records), ["B", "C", "D", "A"]);
        // Hovering the current position again changes nothing.
        assert_eq!(engine.drag_over(&mut records, 3), Ok(false));
        engine.end_drag();
        assert!(!engine.is_dragging());
        assert_eq!(engine.drag_over(&mut records, 0), Ok(false));
    }

    #[tokio::test]
    async fn test_persist_assigns_sequential_ranks() {
        let mut records = letters(&["A", "B", "C"]);
        let repo = MemoryRepository::with_records(records.clone());
        let mut engine = OrderingEngine::new();
        engine.drag_reorder(&mut records, 2, 0).unwrap();

        let report = engine.persist(&mut records, &repo).await.unwrap();
        assert!(report.is_success());
        assert_eq!(report.applied.len(), 3);
        assert_eq!(*repo.rank_calls.borrow(), vec![(3, 1), (1, 2), (2, 3)]);
        assert_eq!(repo.rank_of(3), Some(1));
        assert!(!engine.is_dirty());
        assert!(!engine.is_saving());
        assert_eq!(records[0].sort_order, Some(1));
    }

    #[tokio::test]
    async fn test_persist_is_idempotent_when_clean() {
        let mut records = letters(&["A", "B"]);
        let repo = MemoryRepository::with_records(records.clone());
        let mut engine = OrderingEngine::new();
        engine.move_step(&mut records, 0, Direction::Down).unwrap();
        engine.persist(&mut records, &repo).await.unwrap();
        let calls = repo.rank_calls.borrow().len();

        let report = engine.persist(&mut records, &repo).await.unwrap();
        assert!(report.is_success());
        assert!(report.applied.is_empty());
        assert_eq!(repo.rank_calls.borrow().len(), calls);
    }

    #[tokio::test]
    async fn test_partial_failure_reports_applied_and_stops() {
        let mut records = letters(&["A", "B", "C", "D"]);
        let repo = MemoryRepository::with_records(records.clone());
        repo.fail_rank_for.borrow_mut().insert(2);
        let mut engine = OrderingEngine::new();
        engine.drag_reorder(&mut records, 3, 0).unwrap(); // D A B C

        let report = engine.persist(&mut records, &repo).await.unwrap();
        assert!(!report.is_success());
        assert!(report.is_partial());
        assert_eq!(
            report.applied,
            vec![RankWrite { id: 4, rank: 1 }, RankWrite { id: 1, rank: 2 }]
        );
        assert_eq!(report.failed.as_ref().map(|f| f.write), Some(RankWrite { id: 2, rank: 3 }));
        assert_eq!(report.unattempted, vec![RankWrite { id: 3, rank: 4 }]);
        // No rollback of what already landed.
        assert_eq!(repo.rank_of(4), Some(1));
        assert_eq!(repo.rank_of(1), Some(2));
        assert_eq!(repo.rank_of(2), None);
        assert!(engine.is_dirty());
        assert!(!engine.is_saving());
    }

    #[tokio::test]
    async fn test_second_persist_is_rejected_while_in_flight() {
        let mut records = letters(&["A", "B", "C"]);
        let repo = MemoryRepository::with_records(records.clone());
        let mut engine = OrderingEngine::new();
        engine.move_step(&mut records, 0, Direction::Down).unwrap();

        let mut job = engine.begin_persist(&records).unwrap().unwrap();
        assert_eq!(job.total(), 3);
        assert!(job.step(&repo).await.is_none());
        assert_eq!(job.completed(), 1);

        assert_eq!(engine.begin_persist(&records).unwrap_err(), PersistError::InFlight);
        assert_eq!(
            engine.persist(&mut records, &repo).await.unwrap_err(),
            PersistError::InFlight
        );
        assert_eq!(
            engine.move_step(&mut records, 1, Direction::Up),
            Err(ReorderError::SaveInFlight)
        );
        assert_eq!(engine.drag_reorder(&mut records, 0, 2), Err(ReorderError::SaveInFlight));

        let report = job.run(&repo).await;
        engine.finish_persist(&mut records, &report);
        assert!(report.is_success());
        assert!(!engine.is_saving());
        assert_eq!(repo.rank_calls.borrow().len(), 3);
    }

    proptest! {
        #[test]
        fn prop_step_up_then_down_is_identity(len in 2usize..20, seed in 0usize..1000) {
            let index = 1 + seed % (len - 1);
            let mut records: Vec<_> = (0..len).map(|i| record(i as i64, "X", "x")).collect();
            let before: Vec<i64> = records.iter().map(|r| r.id).collect();
            let mut engine = OrderingEngine::new();
            prop_assert_eq!(engine.move_step(&mut records, index, Direction::Up), Ok(true));
            prop_assert_eq!(engine.move_step(&mut records, index - 1, Direction::Down), Ok(true));
            let after: Vec<i64> = records.iter().map(|r| r.id).collect();
            prop_assert_eq!(before, after);
        }

        #[test]
        fn prop_drag_reorder_keeps_membership(len in 1usize..20, from in 0usize..20, to in 0usize..20) {
            let mut records: Vec<_> = (0..len).map(|i| record(i as i64, "X", "x")).collect();
            let mut engine = OrderingEngine::new();
            let moved_id = records.get(from).map(|r| r.id);
            engine.drag_reorder(&mut records, from, to).unwrap();
            let mut ids: Vec<i64> = records.iter().map(|r| r.id).collect();
            if let (Some(id), true) = (moved_id, to < len) {
                prop_assert_eq!(records[to].id, id);
            }
            ids.sort();
            prop_assert_eq!(ids, (0..len as i64).collect::<Vec<_>>());
        }
    }
}
