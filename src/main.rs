mod app;
mod catalog;
mod config;
mod db;
mod logging;
mod model;
mod prefetch;
mod toast;
mod ui;
mod viewer;

use app::{App, InputMode, PAN_NUDGE};
use catalog::ordering::Direction;
use catalog::repository::CatalogRepository;
use catalog::store::{CatalogStore, LoadOutcome};
use clap::{Parser, Subcommand};
use config::AppConfig;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
    MouseButton, MouseEvent, MouseEventKind,
};
use model::NewCurrency;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use ui::Regions;
use ui::confirm::ConfirmResult;
use viewer::Point;

/// Terminal catalog of currencies and their banknote images
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the SQLite catalog (overrides the config file)
    #[arg(short, long, global = true)]
    db: Option<PathBuf>,

    /// Path to the JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the TUI catalog (default)
    Run,
    /// Add currencies from a JSON file
    Import {
        /// JSON array of {code, name, flag_url, banknote_images, sort_order}
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Print one page of the catalog
    List {
        /// Filter by code or name
        #[arg(short, long)]
        search: Option<String>,
        /// Page number, starting at 1
        #[arg(short, long, default_value_t = 1)]
        page: usize,
        /// Records per page (defaults to the configured page size)
        #[arg(long)]
        page_size: Option<usize>,
    },
    /// Move a currency to a new position and save the order
    Move {
        /// Current position, starting at 1
        from: usize,
        /// New position, starting at 1
        to: usize,
    },
    /// Write a config file with default values
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => config::default_config_path()?,
    };
    let command = cli.command.unwrap_or(Commands::Run);

    let loaded = AppConfig::load_from(&config_path);
    let config = loaded.config;

    let log_dir = config::project_dirs()?.data_dir().join("logs");
    let _log_guard = logging::init(&log_dir, &config.log_filter);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting");
    if let Some(reason) = &loaded.reset_reason {
        tracing::warn!(reason = %reason, "config ignored, using defaults");
        eprintln!("Warning: config ignored, using defaults: {}", reason);
    }

    let db_path = match cli.db {
        Some(path) => path,
        None => config.resolve_database_path()?,
    };

    match command {
        Commands::InitConfig { force } => init_config(&config_path, force)?,
        Commands::Import { input } => {
            let database = open_database(&db_path).await?;
            import(&database, &input).await?;
        }
        Commands::List {
            search,
            page,
            page_size,
        } => {
            let database = open_database(&db_path).await?;
            print_page(&database, &config, search.as_deref(), page, page_size).await?;
        }
        Commands::Move { from, to } => {
            let database = open_database(&db_path).await?;
            move_record(&database, from, to).await?;
        }
        Commands::Run => {
            let database = open_database(&db_path).await?;
            run_tui(database, &config).await?;
        }
    }

    Ok(())
}

fn init_config(path: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() && !force {
        eprintln!("Error: {} already exists (use --force to overwrite)", path.display());
        std::process::exit(1);
    }
    AppConfig::default().save_to(path)?;
    eprintln!("Wrote default config to {}", path.display());
    Ok(())
}

async fn open_database(path: &Path) -> Result<db::Database, Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(db::Database::open(path).await?)
}

async fn import<R: CatalogRepository>(repo: &R, input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !input.exists() {
        eprintln!("Error: input file not found: {}", input.display());
        std::process::exit(1);
    }
    let json = std::fs::read_to_string(input)?;
    let entries: Vec<NewCurrency> = serde_json::from_str(&json)?;

    for entry in &entries {
        let id = repo.insert(entry).await?;
        tracing::debug!(id, code = %entry.code, "currency imported");
    }
    tracing::info!(count = entries.len(), file = %input.display(), "import finished");
    eprintln!("Imported {} currencies from {}", entries.len(), input.display());
    Ok(())
}

async fn print_page<R: CatalogRepository>(
    repo: &R,
    config: &AppConfig,
    search: Option<&str>,
    page: usize,
    page_size: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let page_size = page_size.unwrap_or(config.page_size).max(1);
    let mut store = CatalogStore::new(page_size, config.page_size_options.clone());
    if let LoadOutcome::Retained(e) = store.load(repo).await {
        return Err(e.into());
    }
    store.set_search_term(search.unwrap_or(""));

    let offset = page.saturating_sub(1).saturating_mul(page_size);
    for (i, record) in store.page(page, page_size).iter().enumerate() {
        println!(
            "{:>4}  {:<4} {:<32} {} banknotes",
            offset + i + 1,
            record.code,
            ui::truncate_str(&record.name, 32),
            record.banknote_count()
        );
    }
    println!(
        "page {}/{} · {} of {} currencies",
        page,
        store.total_pages(page_size).max(1),
        store.filtered_count(),
        store.records().len()
    );
    Ok(())
}

async fn move_record<R: CatalogRepository>(repo: &R, from: usize, to: usize) -> Result<(), Box<dyn std::error::Error>> {
    let mut catalog = catalog::Catalog::new(CatalogStore::default());
    if let LoadOutcome::Retained(e) = catalog.load(repo).await? {
        return Err(e.into());
    }
    let len = catalog.store().records().len();
    if from == 0 || to == 0 || from > len || to > len {
        eprintln!("Error: positions must be between 1 and {}", len);
        std::process::exit(1);
    }

    let code = catalog.store().records()[from - 1].code.clone();
    if !catalog.drag_reorder(from - 1, to - 1)? {
        eprintln!("{} is already at position {}", code, to);
        return Ok(());
    }

    let report = catalog.persist(repo).await?;
    if let Some(failed) = &report.failed {
        tracing::warn!(applied = report.applied.len(), reason = %failed.reason, "move only partly saved");
        eprintln!(
            "Error: saved {} of {} positions: {}",
            report.applied.len(),
            report.applied.len() + 1 + report.unattempted.len(),
            failed.reason
        );
        std::process::exit(1);
    }
    tracing::info!(code = %code, from, to, "currency moved");
    eprintln!("Moved {} from position {} to {}", code, from, to);
    Ok(())
}

async fn run_tui(database: db::Database, config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let prefetcher = prefetch::Prefetcher::new(Duration::from_secs(config.prefetch_timeout_seconds))?;
    let mut app = App::new(database, config, prefetcher);
    app.init().await;

    // Init terminal
    let mut terminal = ratatui::init();
    crossterm::execute!(std::io::stdout(), EnableMouseCapture)?;

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    let _ = crossterm::execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    if let Err(e) = result {
        tracing::error!(error = %e, "event loop failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run_app<R: CatalogRepository>(
    terminal: &mut ratatui::DefaultTerminal,
    app: &mut App<R>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut regions = Regions::default();
    loop {
        app.poll_prefetch();
        app.tick(Instant::now());

        terminal.draw(|frame| regions = ui::render(app, frame))?;

        if app.should_quit {
            return Ok(());
        }

        // One rank write per tick keeps input responsive during a save
        if app.is_persisting() {
            app.advance_persist().await;
        }

        let timeout = if app.is_persisting() {
            Duration::ZERO
        } else {
            Duration::from_millis(100)
        };
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    handle_key(app, key).await;
                }
                Event::Mouse(mouse) => handle_mouse(app, &regions, mouse),
                _ => {}
            }
        }
    }
}

async fn handle_key<R: CatalogRepository>(app: &mut App<R>, key: KeyEvent) {
    // Ctrl+C quits from anywhere
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.request_quit();
        return;
    }

    if let Some(confirm) = &app.confirm {
        match confirm.handle_key(key) {
            Some(ConfirmResult::Confirm) => app.confirm_delete().await,
            Some(ConfirmResult::Cancel) => app.cancel_delete(),
            None => {}
        }
        return;
    }

    // Help toggle
    if key.code == KeyCode::Char('?') && app.input_mode == InputMode::Normal {
        app.show_help = !app.show_help;
        return;
    }

    // If help is showing, any key closes it
    if app.show_help {
        app.show_help = false;
        return;
    }

    if app.viewer.is_open() {
        handle_viewer_key(app, key);
        return;
    }

    if app.input_mode == InputMode::Editing {
        handle_search_input(app, key);
        return;
    }
    handle_catalog_key(app, key).await;
}

fn handle_search_input<R: CatalogRepository>(app: &mut App<R>, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
            app.clear_filter();
        }
        KeyCode::Backspace => {
            app.filter.pop();
            app.apply_filter();
        }
        KeyCode::Char(c) => {
            app.filter.push(c);
            app.apply_filter();
        }
        _ => {}
    }
}

async fn handle_catalog_key<R: CatalogRepository>(app: &mut App<R>, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.request_quit(),
        KeyCode::Char('/') => app.input_mode = InputMode::Editing,
        KeyCode::Esc => app.clear_filter(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
        KeyCode::PageDown | KeyCode::Char('n') => app.next_page(),
        KeyCode::PageUp | KeyCode::Char('p') => app.prev_page(),
        KeyCode::Char('g') => app.first_page(),
        KeyCode::Char('G') => app.last_page(),
        KeyCode::Char('P') => app.cycle_page_size(),
        KeyCode::Char('J') => app.move_selected(Direction::Down),
        KeyCode::Char('K') => app.move_selected(Direction::Up),
        KeyCode::Char('s') => app.start_save(),
        KeyCode::Char('d') | KeyCode::Delete => app.request_delete(),
        KeyCode::Char('r') => app.reload().await,
        KeyCode::Char('v') => app.toggle_layout(),
        KeyCode::Enter => app.open_viewer(),
        _ => {}
    }
}

fn handle_viewer_key<R: CatalogRepository>(app: &mut App<R>, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => app.close_viewer(),
        KeyCode::Right | KeyCode::Char('l') => app.viewer_next(),
        KeyCode::Left | KeyCode::Char('h') => app.viewer_prev(),
        KeyCode::Char('+') | KeyCode::Char('=') => app.viewer.zoom_in(),
        KeyCode::Char('-') => app.viewer.zoom_out(),
        KeyCode::Char('0') => app.viewer.zoom_reset(),
        KeyCode::Char('H') => app.nudge_pan(-PAN_NUDGE, 0.0),
        KeyCode::Char('L') => app.nudge_pan(PAN_NUDGE, 0.0),
        KeyCode::Char('K') => app.nudge_pan(0.0, -PAN_NUDGE),
        KeyCode::Char('J') => app.nudge_pan(0.0, PAN_NUDGE),
        KeyCode::Char(c @ '1'..='9') => {
            if let Some(digit) = c.to_digit(10) {
                app.viewer_jump(digit as usize - 1);
            }
        }
        _ => {}
    }
}

fn handle_mouse<R: CatalogRepository>(app: &mut App<R>, regions: &Regions, mouse: MouseEvent) {
    if app.confirm.is_some() || app.show_help {
        return;
    }
    let (column, row) = (mouse.column, mouse.row);
    let pointer = Point::new(column as f32, row as f32);

    if app.viewer.is_open() {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(index) = regions.thumbnail_at(column, row) {
                    app.viewer_jump(index);
                } else if regions.in_image(column, row) {
                    app.viewer.pan_start(pointer);
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                app.viewer.pan_move(pointer);
            }
            MouseEventKind::Up(MouseButton::Left) => app.viewer.pan_end(),
            MouseEventKind::ScrollUp => app.viewer.zoom_in(),
            MouseEventKind::ScrollDown => app.viewer.zoom_out(),
            _ => {}
        }
        return;
    }

    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if let Some(index) = regions.row_at(column, row) {
                app.begin_row_drag(index);
            }
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            if let Some(index) = regions.row_at(column, row) {
                app.drag_over_row(index);
            }
        }
        MouseEventKind::Up(MouseButton::Left) => app.end_row_drag(),
        MouseEventKind::ScrollDown => app.select_next(),
        MouseEventKind::ScrollUp => app.select_prev(),
        _ => {}
    }
}
