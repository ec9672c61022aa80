//! Entry point: terminal setup, session restore, the async input pump, and
//! the redraw loop tying `core-actions`' dispatcher to `core-model`'s
//! viewport over `core-state`'s buffers.

mod clipboard;
mod session;

use anyhow::Result;
use clap::Parser;
use core_actions::{Dispatcher, QuitScope};
use core_config::load_from;
use core_events::{Event, InputEvent};
use core_model::{LayoutRegion, ViewState};
use core_state::EditorState;
use core_terminal::{CrosstermBackend, TerminalBackend};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

const SESSION_FILE_NAME: &str = ".purec.session";

#[derive(Parser, Debug)]
#[command(name = "purec", version, about = "A modal terminal text editor's buffer engine")]
struct Args {
    /// File to open at startup. A scratch buffer is used if omitted.
    path: Option<PathBuf>,
    #[arg(long = "config")]
    config: Option<PathBuf>,
    /// Restore the most recently saved session (cursor/scroll/open buffers).
    #[arg(short = 's', long = "load-session")]
    load_session: bool,
}

fn configure_logging() -> Option<WorkerGuard> {
    let log_dir = Path::new(".");
    let log_path = log_dir.join("purec.log");
    if log_path.exists() {
        let _ = std::fs::remove_file(&log_path);
    }
    let file_appender = tracing_appender::rolling::never(log_dir, "purec.log");
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(nb_writer)
        .try_init()
    {
        Ok(()) => Some(guard),
        Err(_) => None,
    }
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

fn terminal_size() -> (u16, u16) {
    crossterm::terminal::size().unwrap_or((80, 24))
}

/// Full-screen redraw: writes every visible line of the active frame's
/// buffer and leaves the cursor positioned at the frame's logical cursor.
/// Incremental/partial redraw is a rendering concern the spec scopes out of
/// this buffer engine; a host UI composes its own redraw over these types.
fn redraw(backend: &mut impl std::io::Write, state: &EditorState, view: &ViewState) -> Result<()> {
    use crossterm::cursor::MoveTo;
    use crossterm::queue;
    use crossterm::style::Print;
    use crossterm::terminal::{Clear, ClearType};

    let frame = view.frames.active();
    let Some(buf) = state.buffers.get(frame.buf_id) else {
        return Ok(());
    };
    queue!(backend, Clear(ClearType::All))?;
    let height = frame.rect.height as usize;
    for row in 0..height {
        let line_i = frame.scroll.line + row;
        let Some(line) = buf.text.line(line_i) else {
            break;
        };
        queue!(backend, MoveTo(frame.rect.x, frame.rect.y + row as u16), Print(line.as_str_lossy()))?;
    }
    let screen_row = frame.rect.y + frame.cur.line.saturating_sub(frame.scroll.line) as u16;
    let screen_col = frame.rect.x + frame.cur.col.saturating_sub(frame.scroll.col) as u16;
    queue!(backend, MoveTo(screen_col, screen_row))?;
    backend.flush()?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = configure_logging();
    install_panic_hook();
    info!(target: "runtime", "startup");

    let args = Args::parse();
    let _config = load_from(args.config.clone())?;

    let mut state = EditorState::new();
    if let Some(path) = args.path.as_ref() {
        match state.open_file(path) {
            Ok(_) => info!(target: "io", file = %path.display(), "file_open_ok"),
            Err(e) => error!(target: "io", ?e, file = %path.display(), "file_open_error"),
        }
    }

    let (cols, rows) = terminal_size();
    let mut view = ViewState::new(LayoutRegion::new(0, 0, cols, rows.saturating_sub(1)), &state);
    if args.load_session {
        restore_session(&mut state, &mut view);
    }

    let mut backend = CrosstermBackend::new();
    backend.set_title("purec")?;
    let _guard = backend.enter_guard()?;

    let (tx, mut rx) = tokio::sync::mpsc::channel::<Event>(256);
    let (_input_task, _input_shutdown) = core_input::spawn_async_input(tx);
    let clipboard = clipboard::ClipboardOwner::spawn();

    let mut dispatcher = Dispatcher::new();
    let mut stdout = std::io::stdout();
    redraw(&mut stdout, &state, &view)?;

    let mut quit_scope = None;
    while let Some(event) = rx.recv().await {
        match event {
            Event::Input(InputEvent::Key(key)) => {
                let outcome = dispatcher.handle_key(&mut state, &mut view, key);
                clipboard.set(dispatcher.unnamed_register_text());
                if let Some(msg) = outcome.status_message {
                    info!(target: "command", message = %msg, "command_error");
                }
                if let Some(scope) = outcome.quit {
                    quit_scope = Some(scope);
                    break;
                }
                redraw(&mut stdout, &state, &view)?;
            }
            Event::Input(InputEvent::Resize(w, h)) => {
                view.frames.active_mut().rect = LayoutRegion::new(0, 0, w, h.saturating_sub(1));
                redraw(&mut stdout, &state, &view)?;
            }
            Event::Input(InputEvent::CtrlC) | Event::Shutdown => break,
            _ => {}
        }
    }

    save_session(&state, &view);
    if quit_scope == Some(QuitScope::Force) {
        std::process::exit(1);
    }
    Ok(())
}

fn restore_session(state: &mut EditorState, view: &mut ViewState) {
    let Ok(Some(data)) = session::load(Path::new(SESSION_FILE_NAME)) else {
        return;
    };
    for record in &data.buffers {
        if let Some(path) = &record.path {
            let _ = state.open_file(path);
        }
    }
    if let Some(frame_record) = data.frames.first() {
        let frame = view.frames.active_mut();
        frame.cur = core_text::Position::new(frame_record.cursor_line, frame_record.cursor_col);
        frame.scroll = core_text::Position::new(frame_record.scroll_line, frame_record.scroll_col);
    }
}

fn save_session(state: &EditorState, view: &ViewState) {
    if let Err(e) = session::save(Path::new(SESSION_FILE_NAME), state, &view.frames) {
        error!(target: "io", ?e, "session_save_error");
    }
}
