use std::time::{Duration, Instant};

use crate::catalog::ordering::{Direction, PersistError, PersistJob, PersistReport};
use crate::catalog::repository::CatalogRepository;
use crate::catalog::store::{CatalogStore, LoadOutcome};
use crate::catalog::{Catalog, CatalogError};
use crate::config::AppConfig;
use crate::model::CurrencyRecord;
use crate::prefetch::{PrefetchEvent, Prefetcher};
use crate::toast::Toasts;
use crate::ui::confirm::ConfirmOverlay;
use crate::viewer::{MediaViewer, Point};

/// How the current page is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Table,
    Grid,
}

impl Layout {
    pub fn toggle(self) -> Self {
        match self {
            Self::Table => Self::Grid,
            Self::Grid => Self::Table,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Table => "Table",
            Self::Grid => "Grid",
        }
    }
}

/// Input mode for the search bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Cells moved per pan nudge from the keyboard.
pub const PAN_NUDGE: f32 = 2.0;

/// Main application state.
pub struct App<R: CatalogRepository> {
    pub repo: R,
    pub catalog: Catalog,
    pub viewer: MediaViewer,
    pub prefetcher: Prefetcher,
    pub toasts: Toasts,

    pub should_quit: bool,
    pub show_help: bool,
    pub layout: Layout,
    pub grid_columns: usize,

    pub filter: String,
    pub input_mode: InputMode,

    /// Index within the visible page
    pub selected: usize,

    pub confirm: Option<ConfirmOverlay>,
    pub viewer_title: String,

    persist_job: Option<PersistJob>,
    quit_after_save: bool,
    pub loading: bool,
    pub status_msg: String,
}

impl<R: CatalogRepository> App<R> {
    pub fn new(repo: R, config: &AppConfig, prefetcher: Prefetcher) -> Self {
        let store = CatalogStore::new(config.page_size, config.page_size_options.clone());
        Self {
            repo,
            catalog: Catalog::new(store),
            viewer: MediaViewer::new(),
            prefetcher,
            toasts: Toasts::new(Duration::from_secs(config.toast_seconds)),

            should_quit: false,
            show_help: false,
            layout: Layout::Table,
            grid_columns: config.grid_columns.max(1),

            filter: String::new(),
            input_mode: InputMode::Normal,

            selected: 0,

            confirm: None,
            viewer_title: String::new(),

            persist_job: None,
            quit_after_save: false,
            loading: false,
            status_msg: "Loading catalog...".to_string(),
        }
    }

    /// Initial data load.
    pub async fn init(&mut self) {
        self.reload().await;
    }

    /// Reload the catalog from the repository. Unsaved order is discarded.
    pub async fn reload(&mut self) {
        self.loading = true;
        let result = self.catalog.load(&self.repo).await;
        self.loading = false;
        match result {
            Ok(LoadOutcome::Loaded(count)) => {
                self.status_msg = format!("{} currencies loaded", count);
            }
            Ok(LoadOutcome::Retained(e)) => {
                self.status_msg = format!("Reload failed, showing previous data: {}", e.user_message());
            }
            Err(e) => {
                self.status_msg = catalog_error_message(&e);
            }
        }
        self.clamp_selection();
    }

    // ── Search and pagination ──

    pub fn apply_filter(&mut self) {
        self.catalog.end_drag();
        self.catalog.store_mut().set_search_term(&self.filter);
        self.selected = 0;

        let store = self.catalog.store();
        self.status_msg = if store.is_filtered() {
            format!("{} matches for \"{}\"", store.filtered_count(), self.filter.trim())
        } else {
            format!("{} currencies", store.records().len())
        };
    }

    pub fn clear_filter(&mut self) {
        if !self.filter.is_empty() {
            self.filter.clear();
            self.apply_filter();
        }
    }

    pub fn visible_len(&self) -> usize {
        self.catalog.store().visible().len()
    }

    pub fn selected_record(&self) -> Option<&CurrencyRecord> {
        self.catalog.store().visible().get(self.selected).copied()
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.visible_len() {
            self.selected += 1;
        } else if self.catalog.store_mut().next_page() {
            self.selected = 0;
        }
    }

    pub fn select_prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
        } else if self.catalog.store_mut().prev_page() {
            self.selected = self.visible_len().saturating_sub(1);
        }
    }

    pub fn select_row(&mut self, row: usize) {
        if row < self.visible_len() {
            self.selected = row;
        }
    }

    pub fn next_page(&mut self) {
        if self.catalog.store_mut().next_page() {
            self.selected = 0;
        }
    }

    pub fn prev_page(&mut self) {
        if self.catalog.store_mut().prev_page() {
            self.selected = 0;
        }
    }

    pub fn first_page(&mut self) {
        self.catalog.store_mut().first_page();
        self.selected = 0;
    }

    pub fn last_page(&mut self) {
        self.catalog.store_mut().last_page();
        self.selected = self.visible_len().saturating_sub(1);
    }

    pub fn cycle_page_size(&mut self) {
        let size = self.catalog.store_mut().cycle_page_size();
        self.selected = 0;
        self.status_msg = format!("{} per page", size);
    }

    pub fn toggle_layout(&mut self) {
        self.layout = self.layout.toggle();
    }

    fn clamp_selection(&mut self) {
        let len = self.visible_len();
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }

    /// Move the page window and selection onto the record with `id`.
    fn follow(&mut self, id: i64) {
        let store = self.catalog.store();
        if store.is_filtered() {
            return;
        }
        let Some(position) = store.position_of(id) else {
            return;
        };
        let page_size = store.page_size();
        self.catalog.store_mut().set_page(position / page_size + 1);
        self.selected = position % page_size;
    }

    // ── Reordering ──

    pub fn move_selected(&mut self, direction: Direction) {
        let Some(id) = self.selected_record().map(|r| r.id) else {
            return;
        };
        let index = self.catalog.store().page_offset() + self.selected;
        match self.catalog.move_step(index, direction) {
            Ok(true) => {
                self.follow(id);
                self.status_msg = "Order changed (s to save)".to_string();
            }
            Ok(false) => {}
            Err(e) => self.status_msg = e.to_string(),
        }
    }

    /// Pointer pressed on a visible row.
    pub fn begin_row_drag(&mut self, row: usize) {
        self.select_row(row);
        let index = self.catalog.store().page_offset() + row;
        if let Err(e) = self.catalog.begin_drag(index) {
            self.status_msg = e.to_string();
        }
    }

    /// Pointer dragged over a visible row.
    pub fn drag_over_row(&mut self, row: usize) {
        let Some(id) = self.catalog.ordering().dragged_id() else {
            return;
        };
        let target = self.catalog.store().page_offset() + row;
        match self.catalog.drag_over(target) {
            Ok(true) => self.follow(id),
            Ok(false) => {}
            Err(e) => self.status_msg = e.to_string(),
        }
    }

    pub fn end_row_drag(&mut self) {
        if self.catalog.ordering().is_dragging() {
            self.catalog.end_drag();
            if self.catalog.is_dirty() {
                self.status_msg = "Order changed (s to save)".to_string();
            }
        }
    }

    /// Quit now, or once the save in progress has written every rank.
    pub fn request_quit(&mut self) {
        if self.is_persisting() {
            self.quit_after_save = true;
            self.status_msg = "Quitting after the save finishes".to_string();
        } else {
            self.should_quit = true;
        }
    }

    // ── Saving ──

    pub fn is_persisting(&self) -> bool {
        self.persist_job.is_some()
    }

    /// `(completed, total)` writes of the save in progress.
    pub fn persist_progress(&self) -> Option<(usize, usize)> {
        self.persist_job.as_ref().map(|job| (job.completed(), job.total()))
    }

    pub fn start_save(&mut self) {
        match self.catalog.begin_persist() {
            Ok(Some(job)) => {
                tracing::info!(writes = job.total(), "saving order");
                self.status_msg = format!("Saving order (0/{})", job.total());
                self.persist_job = Some(job);
            }
            Ok(None) => self.status_msg = "Nothing to save".to_string(),
            Err(PersistError::InFlight) => self.status_msg = PersistError::InFlight.to_string(),
        }
    }

    /// Issue one write of the save in progress.
    pub async fn advance_persist(&mut self) {
        let Some(job) = self.persist_job.as_mut() else {
            return;
        };
        let finished = job.step(&self.repo).await;
        match finished {
            Some(report) => {
                self.persist_job = None;
                self.catalog.finish_persist(&report);
                self.report_persist(&report);
                if self.quit_after_save {
                    self.should_quit = true;
                }
            }
            None => {
                self.status_msg = format!("Saving order ({}/{})", job.completed(), job.total());
            }
        }
    }

    fn report_persist(&mut self, report: &PersistReport) {
        match &report.failed {
            None => {
                tracing::info!(writes = report.applied.len(), "order saved");
                self.status_msg = "Order saved".to_string();
                self.toasts.success("Order saved");
            }
            Some(failed) => {
                let total = report.applied.len() + 1 + report.unattempted.len();
                let message = format!(
                    "Saved {} of {} positions; {}",
                    report.applied.len(),
                    total,
                    failed.reason
                );
                tracing::warn!(
                    applied = report.applied.len(),
                    unattempted = report.unattempted.len(),
                    "order save stopped early"
                );
                self.status_msg = format!("{} (s to retry)", message);
                self.toasts.error(message);
            }
        }
    }

    // ── Deleting ──

    pub fn request_delete(&mut self) {
        if self.catalog.is_saving() {
            self.status_msg = CatalogError::Busy.to_string();
            return;
        }
        let Some(record) = self.selected_record() else {
            return;
        };
        self.confirm = Some(ConfirmOverlay::delete(record.id, &record.code, &record.name));
    }

    pub fn cancel_delete(&mut self) {
        self.confirm = None;
    }

    pub async fn confirm_delete(&mut self) {
        let Some(confirm) = self.confirm.take() else {
            return;
        };
        match self.catalog.delete(&self.repo, confirm.target()).await {
            Ok(outcome) => {
                self.toasts.success(format!("Deleted {}", confirm.label()));
                self.status_msg = match outcome {
                    LoadOutcome::Loaded(count) => format!("{} currencies", count),
                    LoadOutcome::Retained(e) => format!("Deleted, but reload failed: {}", e.user_message()),
                };
            }
            Err(e) => {
                let message = catalog_error_message(&e);
                self.toasts.error(format!("Delete failed: {}", message));
                self.status_msg = message;
            }
        }
        self.clamp_selection();
    }

    // ── Viewer ──

    pub fn open_viewer(&mut self) {
        let Some((code, title, images)) = self
            .selected_record()
            .map(|r| (r.code.clone(), format!("{}  {}", r.code, r.name), r.banknote_images.clone()))
        else {
            return;
        };
        if self.viewer.open(images.clone()).is_none() {
            self.status_msg = format!("{} has no banknote images", code);
            return;
        }
        self.viewer_title = title;
        self.prefetcher.prefetch(&images);
        self.sync_viewer_image();
    }

    pub fn close_viewer(&mut self) {
        self.viewer.close();
    }

    pub fn viewer_next(&mut self) {
        if self.viewer.next() {
            self.sync_viewer_image();
        }
    }

    pub fn viewer_prev(&mut self) {
        if self.viewer.prev() {
            self.sync_viewer_image();
        }
    }

    pub fn viewer_jump(&mut self, index: usize) {
        if self.viewer.jump_to(index) {
            self.sync_viewer_image();
        }
    }

    /// Move the image by a keyboard nudge, as a tiny pan gesture.
    pub fn nudge_pan(&mut self, dx: f32, dy: f32) {
        if self.viewer.pan_start(Point::ORIGIN) {
            self.viewer.pan_move(Point::new(dx, dy));
        }
        self.viewer.pan_end();
    }

    /// Resolve the loading state of the shown image from the fetch cache,
    /// or start a fetch if none is running.
    fn sync_viewer_image(&mut self) {
        let Some(session) = self.viewer.session() else {
            return;
        };
        let (id, index, url) = (session.id(), session.index(), session.current_image().to_string());
        if self.prefetcher.is_fetched(&url) {
            self.viewer.image_ready(id, index);
        } else if !self.prefetcher.is_in_flight(&url) {
            self.prefetcher.prefetch(std::slice::from_ref(&url));
        }
    }

    pub fn handle_prefetch_event(&mut self, event: PrefetchEvent) {
        let Some(session) = self.viewer.session() else {
            return;
        };
        if session.current_image() != event.url() {
            return;
        }
        let (id, index) = (session.id(), session.index());
        match event {
            PrefetchEvent::Fetched { .. } => {
                self.viewer.image_ready(id, index);
            }
            PrefetchEvent::Failed { reason, .. } => {
                self.status_msg = format!("Image failed to load: {}", reason);
            }
        }
    }

    pub fn poll_prefetch(&mut self) {
        for event in self.prefetcher.drain() {
            self.handle_prefetch_event(event);
        }
    }

    pub fn tick(&mut self, now: Instant) {
        self.toasts.prune(now);
    }
}

fn catalog_error_message(e: &CatalogError) -> String {
    match e {
        CatalogError::Busy => e.to_string(),
        CatalogError::Repository(inner) => inner.user_message(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::repository::memory::MemoryRepository;
    use crate::model::record;
    use crate::toast::ToastKind;
    use std::io::Write;

    fn config(page_size: usize) -> AppConfig {
        AppConfig {
            page_size,
            page_size_options: vec![2, 3, 10],
            ..AppConfig::default()
        }
    }

    fn prefetcher() -> Prefetcher {
        Prefetcher::new(Duration::from_secs(5)).unwrap()
    }

    async fn app_with(records: Vec<CurrencyRecord>, page_size: usize) -> App<MemoryRepository> {
        let repo = MemoryRepository::with_records(records);
        let mut app = App::new(repo, &config(page_size), prefetcher());
        app.init().await;
        app
    }

    fn five() -> Vec<CurrencyRecord> {
        vec![
            record(1, "USD", "US Dollar"),
            record(2, "EUR", "Euro"),
            record(3, "JPY", "Japanese Yen"),
            record(4, "GBP", "Pound Sterling"),
            record(5, "THB", "Thai Baht"),
        ]
    }

    fn codes(app: &App<MemoryRepository>) -> Vec<String> {
        app.catalog.store().records().iter().map(|r| r.code.clone()).collect()
    }

    #[tokio::test]
    async fn test_init_loads_records() {
        let app = app_with(five(), 2).await;
        assert_eq!(app.status_msg, "5 currencies loaded");
        assert_eq!(app.visible_len(), 2);
        assert!(!app.loading);
    }

    #[tokio::test]
    async fn test_selection_crosses_pages() {
        let mut app = app_with(five(), 2).await;
        app.select_next();
        app.select_next();
        assert_eq!(app.catalog.store().current_page(), 2);
        assert_eq!(app.selected_record().unwrap().code, "JPY");

        app.select_prev();
        assert_eq!(app.catalog.store().current_page(), 1);
        assert_eq!(app.selected_record().unwrap().code, "EUR");

        app.last_page();
        assert_eq!(app.selected_record().unwrap().code, "THB");
    }

    #[tokio::test]
    async fn test_filter_resets_selection_and_reports_matches() {
        let mut app = app_with(five(), 2).await;
        app.next_page();
        app.filter = "  YEN ".to_string();
        app.apply_filter();
        assert_eq!(app.catalog.store().current_page(), 1);
        assert_eq!(app.selected, 0);
        assert_eq!(app.status_msg, "1 matches for \"YEN\"");
        assert_eq!(app.selected_record().unwrap().code, "JPY");

        app.clear_filter();
        assert!(!app.catalog.store().is_filtered());
    }

    #[tokio::test]
    async fn test_move_selected_follows_record_across_page() {
        let mut app = app_with(five(), 2).await;
        app.select_next();
        app.move_selected(Direction::Down);
        assert_eq!(codes(&app), vec!["USD", "JPY", "EUR", "GBP", "THB"]);
        assert_eq!(app.catalog.store().current_page(), 2);
        assert_eq!(app.selected_record().unwrap().code, "EUR");
        assert!(app.catalog.is_dirty());
    }

    #[tokio::test]
    async fn test_reorder_refused_while_filtered() {
        let mut app = app_with(five(), 10).await;
        app.filter = "e".to_string();
        app.apply_filter();
        app.move_selected(Direction::Down);
        assert_eq!(codes(&app), vec!["USD", "EUR", "JPY", "GBP", "THB"]);
        assert!(app.status_msg.contains("search filter"));
        assert!(!app.catalog.is_dirty());
    }

    #[tokio::test]
    async fn test_mouse_drag_moves_row() {
        let mut app = app_with(five(), 10).await;
        app.begin_row_drag(0);
        app.drag_over_row(1);
        app.drag_over_row(3);
        app.end_row_drag();
        assert_eq!(codes(&app), vec!["EUR", "JPY", "GBP", "USD", "THB"]);
        assert_eq!(app.selected_record().unwrap().code, "USD");
        assert!(!app.catalog.ordering().is_dragging());
    }

    #[tokio::test]
    async fn test_save_runs_one_write_per_step() {
        let mut app = app_with(five(), 10).await;
        app.move_selected(Direction::Down);
        app.start_save();
        assert!(app.is_persisting());
        assert_eq!(app.persist_progress(), Some((0, 5)));

        app.advance_persist().await;
        assert_eq!(app.persist_progress(), Some((1, 5)));
        assert_eq!(app.repo.rank_calls.borrow().len(), 1);

        // Reordering and deleting are locked until the save finishes
        app.move_selected(Direction::Down);
        assert_eq!(codes(&app), vec!["EUR", "USD", "JPY", "GBP", "THB"]);
        app.request_delete();
        assert!(app.confirm.is_none());

        while app.is_persisting() {
            app.advance_persist().await;
        }
        assert!(!app.catalog.is_dirty());
        assert_eq!(app.repo.rank_of(2), Some(1));
        assert_eq!(app.repo.rank_of(1), Some(2));
        assert_eq!(app.toasts.latest().map(|t| t.kind), Some(ToastKind::Success));
    }

    #[tokio::test]
    async fn test_quit_waits_for_save_to_finish() {
        let mut app = app_with(five(), 10).await;
        app.move_selected(Direction::Down);
        app.start_save();
        app.advance_persist().await;

        app.request_quit();
        assert!(!app.should_quit);
        assert!(app.is_persisting());

        while app.is_persisting() {
            app.advance_persist().await;
        }
        assert!(app.should_quit);
        assert_eq!(app.repo.rank_calls.borrow().len(), 5);
        assert!(!app.catalog.is_dirty());
    }

    #[tokio::test]
    async fn test_quit_when_idle_is_immediate() {
        let mut app = app_with(five(), 10).await;
        app.request_quit();
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_save_when_clean_writes_nothing() {
        let mut app = app_with(five(), 10).await;
        app.start_save();
        assert!(!app.is_persisting());
        assert_eq!(app.status_msg, "Nothing to save");
        assert!(app.repo.rank_calls.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_failed_save_keeps_order_dirty() {
        let mut app = app_with(five(), 10).await;
        app.repo.fail_rank_for.borrow_mut().insert(1);
        app.move_selected(Direction::Down);
        app.start_save();
        while app.is_persisting() {
            app.advance_persist().await;
        }
        assert!(app.catalog.is_dirty());
        let toast = app.toasts.latest().unwrap();
        assert_eq!(toast.kind, ToastKind::Error);
        assert!(toast.message.starts_with("Saved 1 of 5 positions"));
        assert_eq!(app.repo.rank_of(2), Some(1));
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let mut app = app_with(five(), 10).await;
        app.select_next();
        app.request_delete();
        assert_eq!(app.confirm.as_ref().map(|c| c.target()), Some(2));

        app.cancel_delete();
        assert_eq!(app.catalog.store().records().len(), 5);

        app.request_delete();
        app.confirm_delete().await;
        assert!(app.confirm.is_none());
        assert_eq!(codes(&app), vec!["USD", "JPY", "GBP", "THB"]);
        assert_eq!(app.toasts.latest().map(|t| t.message.as_str()), Some("Deleted EUR"));
    }

    #[tokio::test]
    async fn test_delete_failure_keeps_list() {
        let mut app = app_with(five(), 10).await;
        app.repo.fail_delete.set(true);
        app.last_page();
        app.request_delete();
        app.confirm_delete().await;
        assert_eq!(app.catalog.store().records().len(), 5);
        assert_eq!(app.toasts.latest().map(|t| t.kind), Some(ToastKind::Error));
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_records() {
        let mut app = app_with(five(), 10).await;
        app.repo.fail_fetch.set(true);
        app.reload().await;
        assert_eq!(app.catalog.store().records().len(), 5);
        assert!(app.status_msg.starts_with("Reload failed"));
    }

    #[tokio::test]
    async fn test_viewer_refuses_record_without_images() {
        let mut usd = record(1, "USD", "US Dollar");
        usd.banknote_images.clear();
        let mut app = app_with(vec![usd], 10).await;
        app.open_viewer();
        assert!(!app.viewer.is_open());
        assert_eq!(app.status_msg, "USD has no banknote images");
    }

    #[tokio::test]
    async fn test_viewer_loading_follows_prefetch() {
        let mut front = tempfile::NamedTempFile::new().unwrap();
        front.write_all(b"front").unwrap();
        let mut back = tempfile::NamedTempFile::new().unwrap();
        back.write_all(b"back").unwrap();
        let urls = vec![
            front.path().to_string_lossy().to_string(),
            back.path().to_string_lossy().to_string(),
        ];

        let mut usd = record(1, "USD", "US Dollar");
        usd.banknote_images = urls.clone();
        let mut app = app_with(vec![usd], 10).await;

        app.open_viewer();
        assert!(app.viewer.session().unwrap().is_loading());
        assert_eq!(app.viewer_title, "USD  US Dollar");

        for _ in 0..2 {
            let event = app.prefetcher.recv().await.unwrap();
            app.handle_prefetch_event(event);
        }
        assert!(!app.viewer.session().unwrap().is_loading());

        // Already fetched: the next image is ready at once
        app.viewer_next();
        let session = app.viewer.session().unwrap();
        assert_eq!(session.index(), 1);
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn test_nudge_pan_only_when_zoomed() {
        let mut usd = record(1, "USD", "US Dollar");
        usd.banknote_images = vec!["https://cdn.example/usd.png".to_string()];
        let mut app = app_with(vec![usd], 10).await;
        app.open_viewer();

        app.nudge_pan(PAN_NUDGE, 0.0);
        assert_eq!(app.viewer.session().unwrap().pan(), Point::ORIGIN);

        app.viewer.zoom_in();
        app.nudge_pan(PAN_NUDGE, 0.0);
        app.nudge_pan(0.0, -PAN_NUDGE);
        assert_eq!(app.viewer.session().unwrap().pan(), Point::new(2.0, -2.0));
    }

    #[tokio::test]
    async fn test_cycle_page_size() {
        let mut app = app_with(five(), 2).await;
        app.next_page();
        app.cycle_page_size();
        assert_eq!(app.catalog.store().page_size(), 3);
        assert_eq!(app.catalog.store().current_page(), 1);
        assert_eq!(app.status_msg, "3 per page");
    }
}
