//! Modal multi-image viewer: navigation, zoom and pan over a fixed image list.

pub const MIN_ZOOM: f32 = 1.0;
pub const MAX_ZOOM: f32 = 4.0;
pub const ZOOM_STEP: f32 = 0.5;

/// A pointer position or pan offset in terminal cells.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn minus(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }
}

/// State of one open viewer session.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerSession {
    id: u64,
    images: Vec<String>,
    index: usize,
    zoom: f32,
    pan: Point,
    loading: bool,
    /// Pointer position minus pan, captured when a pan gesture starts.
    drag_anchor: Option<Point>,
}

impl ViewerSession {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current_image(&self) -> &str {
        &self.images[self.index]
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn pan(&self) -> Point {
        self.pan
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_anchor.is_some()
    }

    /// Next/prev, thumbnails and dots only exist for multi-image sets.
    pub fn has_navigation(&self) -> bool {
        self.images.len() > 1
    }

    pub fn can_go_next(&self) -> bool {
        self.index + 1 < self.images.len()
    }

    pub fn can_go_prev(&self) -> bool {
        self.index > 0
    }

    pub fn can_zoom_in(&self) -> bool {
        self.zoom < MAX_ZOOM
    }

    pub fn can_zoom_out(&self) -> bool {
        self.zoom > MIN_ZOOM
    }

    /// "2 / 5" style position label.
    pub fn counter(&self) -> String {
        format!("{} / {}", self.index + 1, self.images.len())
    }

    pub fn zoom_percent(&self) -> u32 {
        (self.zoom * 100.0).round() as u32
    }

    /// Translation applied at render time. Dividing by zoom keeps a pan drag
    /// moving 1:1 with the pointer at any magnification.
    pub fn display_offset(&self) -> Point {
        Point::new(self.pan.x / self.zoom, self.pan.y / self.zoom)
    }

    fn show(&mut self, index: usize) {
        self.index = index;
        self.loading = true;
        self.pan = Point::ORIGIN;
        self.drag_anchor = None;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum ViewerState {
    #[default]
    Closed,
    Open(ViewerSession),
}

/// Finite state machine behind the image modal.
#[derive(Debug, Default)]
pub struct MediaViewer {
    state: ViewerState,
    next_session: u64,
}

impl MediaViewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<&ViewerSession> {
        match &self.state {
            ViewerState::Open(session) => Some(session),
            ViewerState::Closed => None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, ViewerState::Open(_))
    }

    fn session_mut(&mut self) -> Option<&mut ViewerSession> {
        match &mut self.state {
            ViewerState::Open(session) => Some(session),
            ViewerState::Closed => None,
        }
    }

    /// Open a new session on `images`. An empty list leaves the viewer closed.
    ///
    /// Returns the session id, which tags load signals for this session.
    pub fn open(&mut self, images: Vec<String>) -> Option<u64> {
        if images.is_empty() {
            tracing::warn!("refusing to open viewer without images");
            return None;
        }
        self.next_session += 1;
        let id = self.next_session;
        self.state = ViewerState::Open(ViewerSession {
            id,
            images,
            index: 0,
            zoom: MIN_ZOOM,
            pan: Point::ORIGIN,
            loading: true,
            drag_anchor: None,
        });
        Some(id)
    }

    pub fn close(&mut self) {
        self.state = ViewerState::Closed;
    }

    pub fn next(&mut self) -> bool {
        let Some(session) = self.session_mut() else {
            return false;
        };
        if !session.can_go_next() {
            return false;
        }
        let index = session.index + 1;
        session.show(index);
        session.zoom = MIN_ZOOM;
        true
    }

    pub fn prev(&mut self) -> bool {
        let Some(session) = self.session_mut() else {
            return false;
        };
        if !session.can_go_prev() {
            return false;
        }
        let index = session.index - 1;
        session.show(index);
        session.zoom = MIN_ZOOM;
        true
    }

    /// Select an image directly (thumbnail or dot). Keeps the zoom level,
    /// unlike `next`/`prev`.
    pub fn jump_to(&mut self, index: usize) -> bool {
        let Some(session) = self.session_mut() else {
            return false;
        };
        if !session.has_navigation() || index >= session.images.len() || index == session.index {
            return false;
        }
        session.show(index);
        true
    }

    /// The image at `index` of session `session_id` finished loading.
    /// Signals for another session or another image are ignored.
    pub fn image_ready(&mut self, session_id: u64, index: usize) -> bool {
        match self.session_mut() {
            Some(session) if session.id == session_id && session.index == index && session.loading => {
                session.loading = false;
                true
            }
            _ => false,
        }
    }

    pub fn zoom_in(&mut self) {
        if let Some(session) = self.session_mut() {
            session.zoom = (session.zoom + ZOOM_STEP).min(MAX_ZOOM);
        }
    }

    pub fn zoom_out(&mut self) {
        if let Some(session) = self.session_mut() {
            session.zoom = (session.zoom - ZOOM_STEP).max(MIN_ZOOM);
            if session.zoom == MIN_ZOOM {
                session.pan = Point::ORIGIN;
            }
        }
    }

    pub fn zoom_reset(&mut self) {
        if let Some(session) = self.session_mut() {
            session.zoom = MIN_ZOOM;
            session.pan = Point::ORIGIN;
        }
    }

    /// Begin a pan gesture. Only meaningful while zoomed in.
    pub fn pan_start(&mut self, pointer: Point) -> bool {
        match self.session_mut() {
            Some(session) if session.zoom > MIN_ZOOM => {
                session.drag_anchor = Some(pointer.minus(session.pan));
                true
            }
            _ => false,
        }
    }

    pub fn pan_move(&mut self, pointer: Point) -> bool {
        match self.session_mut() {
            Some(session) if session.zoom > MIN_ZOOM => match session.drag_anchor {
                Some(anchor) => {
                    session.pan = pointer.minus(anchor);
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    pub fn pan_end(&mut self) {
        if let Some(session) = self.session_mut() {
            session.drag_anchor = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn open(names: &[&str]) -> MediaViewer {
        let mut viewer = MediaViewer::new();
        viewer.open(urls(names)).unwrap();
        viewer
    }

    fn session(viewer: &MediaViewer) -> &ViewerSession {
        viewer.session().expect("viewer should be open")
    }

    #[test]
    fn test_open_initial_state() {
        let viewer = open(&["a.png", "b.png"]);
        let s = session(&viewer);
        assert_eq!(s.index(), 0);
        assert_eq!(s.zoom(), 1.0);
        assert_eq!(s.pan(), Point::ORIGIN);
        assert!(s.is_loading());
        assert!(!s.is_dragging());
        assert_eq!(s.current_image(), "a.png");
    }

    #[test]
    fn test_open_empty_stays_closed() {
        let mut viewer = MediaViewer::new();
        assert_eq!(viewer.open(Vec::new()), None);
        assert!(!viewer.is_open());
    }

    #[test]
    fn test_single_image_disables_navigation() {
        let mut viewer = open(&["a.png"]);
        assert!(!session(&viewer).has_navigation());
        assert!(!viewer.next());
        assert!(!viewer.prev());
        assert!(!viewer.jump_to(0));
        assert_eq!(session(&viewer).index(), 0);
    }

    #[test]
    fn test_two_images_enable_navigation_and_jump() {
        let mut viewer = open(&["a.png", "b.png"]);
        let id = session(&viewer).id();
        viewer.image_ready(id, 0);
        assert!(session(&viewer).has_navigation());
        assert!(viewer.jump_to(1));
        assert_eq!(session(&viewer).index(), 1);
        assert!(session(&viewer).is_loading());
    }

    #[test]
    fn test_boundary_navigation_is_noop() {
        let mut viewer = open(&["a", "b", "c"]);
        let before = session(&viewer).clone();
        assert!(!viewer.prev());
        assert_eq!(session(&viewer), &before);

        viewer.next();
        viewer.next();
        let id = session(&viewer).id();
        viewer.image_ready(id, 2);
        viewer.zoom_in();
        let at_end = session(&viewer).clone();
        assert!(!viewer.next());
        assert_eq!(session(&viewer), &at_end);
    }

    #[test]
    fn test_next_resets_zoom_and_pan() {
        let mut viewer = open(&["a", "b"]);
        viewer.zoom_in();
        viewer.pan_start(Point::new(10.0, 10.0));
        viewer.pan_move(Point::new(14.0, 7.0));
        viewer.pan_end();
        assert_eq!(session(&viewer).pan(), Point::new(4.0, -3.0));

        assert!(viewer.next());
        let s = session(&viewer);
        assert_eq!(s.index(), 1);
        assert_eq!(s.zoom(), 1.0);
        assert_eq!(s.pan(), Point::ORIGIN);
        assert!(s.is_loading());

        viewer.zoom_in();
        assert!(viewer.prev());
        assert_eq!(session(&viewer).zoom(), 1.0);
    }

    #[test]
    fn test_jump_keeps_zoom_but_resets_pan() {
        let mut viewer = open(&["a", "b", "c"]);
        viewer.zoom_in();
        viewer.zoom_in();
        viewer.pan_start(Point::ORIGIN);
        viewer.pan_move(Point::new(5.0, 5.0));
        assert!(viewer.jump_to(2));
        let s = session(&viewer);
        assert_eq!(s.zoom(), 2.0);
        assert_eq!(s.pan(), Point::ORIGIN);
        assert!(!s.is_dragging());
        assert!(!viewer.jump_to(2));
        assert!(!viewer.jump_to(7));
    }

    #[test]
    fn test_zoom_caps() {
        let mut viewer = open(&["a"]);
        for _ in 0..10 {
            viewer.zoom_in();
        }
        assert_eq!(session(&viewer).zoom(), MAX_ZOOM);
        assert!(!session(&viewer).can_zoom_in());

        viewer.pan_start(Point::ORIGIN);
        viewer.pan_move(Point::new(3.0, 2.0));
        viewer.pan_end();
        for _ in 0..10 {
            viewer.zoom_out();
        }
        assert_eq!(session(&viewer).zoom(), MIN_ZOOM);
        assert_eq!(session(&viewer).pan(), Point::ORIGIN);
    }

    #[test]
    fn test_zoom_out_above_one_keeps_pan() {
        let mut viewer = open(&["a"]);
        viewer.zoom_in();
        viewer.zoom_in();
        viewer.pan_start(Point::ORIGIN);
        viewer.pan_move(Point::new(6.0, 0.0));
        viewer.zoom_out();
        assert_eq!(session(&viewer).zoom(), 1.5);
        assert_eq!(session(&viewer).pan(), Point::new(6.0, 0.0));
        viewer.zoom_reset();
        assert_eq!(session(&viewer).zoom(), 1.0);
        assert_eq!(session(&viewer).pan(), Point::ORIGIN);
    }

    #[test]
    fn test_pan_requires_zoom() {
        let mut viewer = open(&["a"]);
        assert!(!viewer.pan_start(Point::new(1.0, 1.0)));
        assert!(!viewer.pan_move(Point::new(5.0, 5.0)));
        assert_eq!(session(&viewer).pan(), Point::ORIGIN);
    }

    #[test]
    fn test_pan_tracks_pointer_from_anchor() {
        let mut viewer = open(&["a"]);
        viewer.zoom_in();
        viewer.zoom_in();
        viewer.pan_start(Point::new(10.0, 10.0));
        viewer.pan_move(Point::new(20.0, 16.0));
        viewer.pan_end();
        assert_eq!(session(&viewer).pan(), Point::new(10.0, 6.0));
        assert_eq!(session(&viewer).display_offset(), Point::new(5.0, 3.0));

        // A second gesture continues from the current offset.
        viewer.pan_start(Point::new(0.0, 0.0));
        viewer.pan_move(Point::new(-4.0, 0.0));
        assert_eq!(session(&viewer).pan(), Point::new(6.0, 6.0));
        viewer.pan_end();
        assert!(!viewer.pan_move(Point::new(100.0, 100.0)));
    }

    #[test]
    fn test_image_ready_only_for_current_session_and_index() {
        let mut viewer = open(&["a", "b"]);
        let first = session(&viewer).id();
        assert!(!viewer.image_ready(first, 1));
        assert!(viewer.image_ready(first, 0));
        assert!(!session(&viewer).is_loading());

        viewer.close();
        assert!(!viewer.image_ready(first, 0));
        assert!(!viewer.is_open());
        assert!(viewer.session().is_none());

        let second = viewer.open(urls(&["a"])).unwrap();
        assert_ne!(first, second);
        assert!(!viewer.image_ready(first, 0));
        assert!(session(&viewer).is_loading());
    }

    #[test]
    fn test_reopen_resets_state() {
        let mut viewer = open(&["a", "b"]);
        viewer.next();
        viewer.zoom_in();
        viewer.open(urls(&["c", "d"]));
        let s = session(&viewer);
        assert_eq!(s.index(), 0);
        assert_eq!(s.zoom(), 1.0);
        assert_eq!(s.pan(), Point::ORIGIN);
        assert_eq!(s.counter(), "1 / 2");
        assert_eq!(s.zoom_percent(), 100);
    }
}
