mod animation;
mod charts;
mod clipboard;
mod help;
mod state;

use crate::cli::Cli;
use crate::engine::HttpBackend;
use crate::model::{
    Action, ClientConfig, GaugeReading, ModelLabel, RecommendedMeasure, SimilarCase, View,
};
use crate::orchestrator::{self, InteractionController, UiCommand};
use crate::render::RenderTarget;
use anyhow::{Context, Result};
use crossterm::{
    event::{
        self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEvent,
        KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Terminal,
};
use state::{UiEvent, UiState};
use std::path::PathBuf;
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Render target that forwards every call to the UI thread.
pub(crate) struct ChannelRenderer {
    tx: UnboundedSender<UiEvent>,
}

impl ChannelRenderer {
    fn send(&self, ev: UiEvent) {
        // The UI thread is gone only when quitting.
        let _ = self.tx.send(ev);
    }
}

impl RenderTarget for ChannelRenderer {
    fn set_gauge(&mut self, gauge: GaugeReading) {
        self.send(UiEvent::Gauge(gauge));
    }
    fn set_recommendations(&mut self, items: &[RecommendedMeasure]) {
        self.send(UiEvent::Recommendations(items.to_vec()));
    }
    fn set_similar_bars(&mut self, items: &[SimilarCase]) {
        self.send(UiEvent::SimilarBars(items.to_vec()));
    }
    fn set_view(&mut self, view: View) {
        self.send(UiEvent::View(view));
    }
    fn show_error(&mut self, message: &str) {
        self.send(UiEvent::Error(message.to_string()));
    }
    fn set_selected_file(&mut self, name: Option<&str>) {
        self.send(UiEvent::SelectedFile(name.map(str::to_string)));
    }
    fn set_session(&mut self, session_id: Option<&str>) {
        self.send(UiEvent::Session(session_id.map(str::to_string)));
    }
    fn set_labels(&mut self, labels: &[ModelLabel]) {
        self.send(UiEvent::Labels(labels.to_vec()));
    }
    fn set_loading(&mut self, action: Action, loading: bool) {
        self.send(UiEvent::Loading(action, loading));
    }
    fn clear_augment_input(&mut self) {
        self.send(UiEvent::ClearAugmentInput);
    }
    fn focus_augment_input(&mut self) {
        self.send(UiEvent::FocusAugmentInput);
    }
    fn show_info(&mut self, message: &str) {
        self.send(UiEvent::Info(message.to_string()));
    }
}

pub async fn run(args: Cli) -> Result<()> {
    let cfg = crate::cli::build_config(&args)?;
    let backend = Arc::new(HttpBackend::new(&cfg).context("create backend client")?);

    let (event_tx, event_rx) = mpsc::unbounded_channel::<UiEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let export_dir = std::env::current_dir().context("get current directory")?;
    let ctrl = InteractionController::new(
        backend,
        ChannelRenderer { tx: event_tx },
        cfg.max_file_size,
    );

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_cfg = cfg.clone();
    let initial_file = args.file.clone();
    let ui_handle =
        std::thread::spawn(move || run_threaded(ui_cfg, initial_file, event_rx, cmd_tx));

    let res = orchestrator::run_controller(ctrl, cmd_rx, export_dir).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
pub fn run_threaded(
    cfg: ClientConfig,
    initial_file: Option<PathBuf>,
    mut event_rx: UnboundedReceiver<UiEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState::new(cfg.base_url.clone());
    if let Some(path) = initial_file {
        let _ = cmd_tx.send(UiCommand::SelectFile(path));
    }

    let tick_rate = Duration::from_millis(33);
    let mut last_tick = Instant::now();
    let mut dirty = true;

    let res = loop {
        while let Ok(ev) = event_rx.try_recv() {
            state.apply(ev, Instant::now());
            dirty = true;
        }

        let now = Instant::now();
        if last_tick.elapsed() >= tick_rate
            && (dirty || state.bars_animating(now) || state.focus_flash.is_some())
        {
            terminal.draw(|f| draw(f.area(), f, &state, now)).ok();
            last_tick = Instant::now();
            dirty = false;
            if !state.is_focus_flashing(now) {
                state.focus_flash = None;
            }
        }

        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            let outcome = match event::read() {
                Ok(Event::Key(k)) if k.kind == KeyEventKind::Press => handle_key(&mut state, k),
                Ok(Event::Paste(text)) => handle_paste(&mut state, &text),
                Ok(Event::Resize(..)) => KeyOutcome::Redraw,
                _ => KeyOutcome::None,
            };
            match outcome {
                KeyOutcome::None => {}
                KeyOutcome::Redraw => dirty = true,
                KeyOutcome::Send(cmd) => {
                    tracing::debug!(?cmd, "ui command");
                    let _ = cmd_tx.send(cmd);
                    dirty = true;
                }
                KeyOutcome::CopySession => {
                    copy_session_id(&mut state);
                    dirty = true;
                }
                KeyOutcome::Quit => {
                    let _ = cmd_tx.send(UiCommand::Quit);
                    break Ok(());
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, DisableBracketedPaste, LeaveAlternateScreen).ok();
    res
}

#[derive(Debug, PartialEq)]
enum KeyOutcome {
    None,
    Redraw,
    Send(UiCommand),
    CopySession,
    Quit,
}

fn handle_key(state: &mut UiState, k: KeyEvent) -> KeyOutcome {
    let ctrl = k.modifiers.contains(KeyModifiers::CONTROL);
    match k.code {
        KeyCode::Char('c') if ctrl => return KeyOutcome::Quit,
        KeyCode::Tab => {
            state.tab = (state.tab + 1) % 2;
            return KeyOutcome::Redraw;
        }
        _ => {}
    }
    if state.tab == 1 {
        if k.code == KeyCode::Esc {
            state.tab = 0;
            return KeyOutcome::Redraw;
        }
        return KeyOutcome::None;
    }

    match k.code {
        KeyCode::Char('d') if ctrl => KeyOutcome::Send(UiCommand::SubmitDemo),
        KeyCode::Char('e') if ctrl => KeyOutcome::Send(UiCommand::Export),
        KeyCode::Char('y') if ctrl => KeyOutcome::CopySession,
        KeyCode::F(5) => KeyOutcome::Send(UiCommand::CheckHealth),
        KeyCode::Esc => match state.view {
            View::Reviewing => KeyOutcome::Send(UiCommand::Reset),
            View::Uploading => {
                state.path_input.clear();
                KeyOutcome::Redraw
            }
        },
        KeyCode::Enter => match state.view {
            View::Uploading => {
                if !state.path_input.trim().is_empty() {
                    let path = dropped_path(&state.path_input);
                    state.path_input.clear();
                    KeyOutcome::Send(UiCommand::SelectFile(path))
                } else if state.can_submit_upload() {
                    KeyOutcome::Send(UiCommand::SubmitUpload)
                } else {
                    KeyOutcome::None
                }
            }
            // Blank text still goes through so the controller can refuse it.
            View::Reviewing if !state.augment_pending => {
                KeyOutcome::Send(UiCommand::SubmitAugment(state.augment_input.clone()))
            }
            View::Reviewing => KeyOutcome::None,
        },
        KeyCode::Backspace => {
            state.active_input_mut().pop();
            KeyOutcome::Redraw
        }
        KeyCode::Char(c) if !ctrl => {
            state.active_input_mut().push(c);
            KeyOutcome::Redraw
        }
        _ => KeyOutcome::None,
    }
}

/// A paste in the upload view is a file dropped onto the terminal.
fn handle_paste(state: &mut UiState, text: &str) -> KeyOutcome {
    if state.tab != 0 {
        return KeyOutcome::None;
    }
    match state.view {
        View::Uploading if !text.trim().is_empty() => {
            state.path_input.clear();
            KeyOutcome::Send(UiCommand::SelectFile(dropped_path(text)))
        }
        View::Uploading => KeyOutcome::None,
        View::Reviewing => {
            state.augment_input.push_str(text);
            KeyOutcome::Redraw
        }
    }
}

/// Normalize a path as terminals paste it on drop: quoted, `file://`
/// prefixed or with backslash-escaped spaces.
fn dropped_path(raw: &str) -> PathBuf {
    let mut s = raw.trim();
    for quote in ['\'', '"'] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            s = &s[1..s.len() - 1];
        }
    }
    let s = s.strip_prefix("file://").unwrap_or(s);
    PathBuf::from(s.replace("\\ ", " "))
}

fn copy_session_id(state: &mut UiState) {
    let Some(id) = state.session_id.clone() else {
        state.apply(
            UiEvent::Error("No session to copy. Analyze a file first".into()),
            Instant::now(),
        );
        return;
    };
    let ev = match clipboard::copy_to_clipboard(&id) {
        Ok(()) => UiEvent::Info(format!("Copied session id: {id}")),
        Err(e) => UiEvent::Error(format!("Clipboard copy failed: {e:#}")),
    };
    state.apply(ev, Instant::now());
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState, now: Instant) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(3),
        ])
        .split(area);

    let tabs = Tabs::new(vec!["Dashboard", "Help"])
        .select(state.tab)
        .block(Block::default().borders(Borders::ALL).title(format!(
            "graphcare-cli ({})",
            state.base_url
        )))
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        1 => help::draw_help(chunks[1], f, &state.base_url),
        _ => match state.view {
            View::Uploading => draw_upload(chunks[1], f, state),
            View::Reviewing => draw_review(chunks[1], f, state, now),
        },
    }

    draw_status(chunks[2], f, state);
}

fn enabled_style(enabled: bool) -> Style {
    if enabled {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn draw_upload(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let selected = match state.selected_file.as_deref() {
        Some(name) => Span::styled(name.to_string(), Style::default().fg(Color::Cyan)),
        None => Span::styled("No file selected", Style::default().fg(Color::DarkGray)),
    };
    let submit = if state.upload_pending {
        Span::styled("Analyzing…", Style::default().fg(Color::Yellow))
    } else {
        Span::styled("[Enter] Analyze", enabled_style(state.can_submit_upload()))
    };

    let lines = vec![
        Line::from("Drop a file onto this window, or type a path and press Enter."),
        Line::from(""),
        Line::from(vec![
            Span::styled("Path: ", Style::default().fg(Color::Gray)),
            Span::raw(state.path_input.clone()),
            Span::styled("▏", Style::default().fg(Color::Yellow)),
        ]),
        Line::from(vec![
            Span::styled("File: ", Style::default().fg(Color::Gray)),
            selected,
        ]),
        Line::from(""),
        Line::from(vec![
            submit,
            Span::raw("   "),
            Span::styled("[Ctrl-D] Demo", enabled_style(!state.upload_pending)),
        ]),
    ];
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Upload"));
    f.render_widget(p, area);
}

fn draw_review(area: Rect, f: &mut ratatui::Frame, state: &UiState, now: Instant) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(12), Constraint::Percentage(50)])
        .split(columns[0]);
    charts::draw_gauge(left[0], f, &state.gauge);
    charts::draw_recommendations(left[1], f, state);

    let labels_height = if state.labels.is_empty() {
        0
    } else {
        (state.labels.len() as u16 + 2).min(8)
    };
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),
            Constraint::Length(labels_height),
            Constraint::Length(4),
        ])
        .split(columns[1]);
    charts::draw_similar_bars(right[0], f, state, now);
    if labels_height > 0 {
        charts::draw_labels(right[1], f, state);
    }
    draw_augment_input(right[2], f, state, now);
}

fn draw_augment_input(area: Rect, f: &mut ratatui::Frame, state: &UiState, now: Instant) {
    let border = if state.is_focus_flashing(now) {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let submit = if state.augment_pending {
        Span::styled("Refining…", Style::default().fg(Color::Yellow))
    } else {
        Span::styled("[Enter] Submit", enabled_style(state.can_submit_augment()))
    };
    let lines = vec![
        Line::from(vec![
            Span::raw(state.augment_input.clone()),
            Span::styled("▏", Style::default().fg(Color::Yellow)),
        ]),
        Line::from(vec![
            submit,
            Span::raw("   "),
            Span::styled("[Esc] Back", Style::default().fg(Color::Gray)),
        ]),
    ];
    let p = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title("Supplementary information"),
    );
    f.render_widget(p, area);
}

fn draw_status(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let mut spans = vec![Span::styled(
        format!(
            "Session: {}",
            state.session_id.as_deref().unwrap_or("-")
        ),
        Style::default().fg(Color::Gray),
    )];
    if let Some(notice) = state.notice.as_ref() {
        let style = if notice.is_error {
            Style::default().fg(Color::Red)
        } else {
            Style::default().fg(Color::Green)
        };
        spans.push(Span::raw("  "));
        spans.push(Span::styled(notice.text.clone(), style));
    }
    let p = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(p, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn reviewing_state() -> UiState {
        let mut s = UiState::new("http://localhost:8000");
        s.apply(UiEvent::Session(Some("s1".into())), Instant::now());
        s.apply(UiEvent::View(View::Reviewing), Instant::now());
        s
    }

    #[test]
    fn typed_path_is_selected_on_enter() {
        let mut s = UiState::new("http://localhost:8000");
        for c in "report.pdf".chars() {
            handle_key(&mut s, key(KeyCode::Char(c)));
        }
        assert_eq!(
            handle_key(&mut s, key(KeyCode::Enter)),
            KeyOutcome::Send(UiCommand::SelectFile(PathBuf::from("report.pdf")))
        );
        assert!(s.path_input.is_empty());
    }

    #[test]
    fn enter_without_file_does_nothing() {
        let mut s = UiState::new("http://localhost:8000");
        assert_eq!(handle_key(&mut s, key(KeyCode::Enter)), KeyOutcome::None);

        s.apply(UiEvent::SelectedFile(Some("report.pdf".into())), Instant::now());
        assert_eq!(
            handle_key(&mut s, key(KeyCode::Enter)),
            KeyOutcome::Send(UiCommand::SubmitUpload)
        );
    }

    #[test]
    fn enter_while_uploading_does_nothing() {
        let mut s = UiState::new("http://localhost:8000");
        s.apply(UiEvent::SelectedFile(Some("report.pdf".into())), Instant::now());
        s.apply(UiEvent::Loading(Action::Upload, true), Instant::now());
        assert_eq!(handle_key(&mut s, key(KeyCode::Enter)), KeyOutcome::None);
    }

    #[test]
    fn paste_selects_dropped_file() {
        let mut s = UiState::new("http://localhost:8000");
        assert_eq!(
            handle_paste(&mut s, "'/tmp/My Files/patient.json'\n"),
            KeyOutcome::Send(UiCommand::SelectFile(PathBuf::from(
                "/tmp/My Files/patient.json"
            )))
        );
    }

    #[test]
    fn dropped_paths_are_normalized() {
        assert_eq!(
            dropped_path("file:///tmp/a.json"),
            PathBuf::from("/tmp/a.json")
        );
        assert_eq!(
            dropped_path("/tmp/My\\ Files/a.json "),
            PathBuf::from("/tmp/My Files/a.json")
        );
        assert_eq!(dropped_path("\"/tmp/b.pdf\""), PathBuf::from("/tmp/b.pdf"));
    }

    #[test]
    fn review_enter_submits_text_and_esc_resets() {
        let mut s = reviewing_state();
        for c in "fever".chars() {
            handle_key(&mut s, key(KeyCode::Char(c)));
        }
        assert_eq!(
            handle_key(&mut s, key(KeyCode::Enter)),
            KeyOutcome::Send(UiCommand::SubmitAugment("fever".into()))
        );
        assert_eq!(
            handle_key(&mut s, key(KeyCode::Esc)),
            KeyOutcome::Send(UiCommand::Reset)
        );
    }

    #[test]
    fn review_enter_is_ignored_while_pending() {
        let mut s = reviewing_state();
        s.augment_input.push_str("fever");
        s.apply(UiEvent::Loading(Action::Augment, true), Instant::now());
        assert_eq!(handle_key(&mut s, key(KeyCode::Enter)), KeyOutcome::None);
    }

    #[test]
    fn esc_on_upload_view_only_clears_input() {
        let mut s = UiState::new("http://localhost:8000");
        s.path_input.push_str("/tmp/x");
        assert_eq!(handle_key(&mut s, key(KeyCode::Esc)), KeyOutcome::Redraw);
        assert!(s.path_input.is_empty());
    }

    #[test]
    fn global_shortcuts() {
        let mut s = UiState::new("http://localhost:8000");
        assert_eq!(handle_key(&mut s, ctrl('c')), KeyOutcome::Quit);
        assert_eq!(
            handle_key(&mut s, ctrl('d')),
            KeyOutcome::Send(UiCommand::SubmitDemo)
        );
        assert_eq!(
            handle_key(&mut s, key(KeyCode::F(5))),
            KeyOutcome::Send(UiCommand::CheckHealth)
        );
        assert_eq!(handle_key(&mut s, ctrl('e')), KeyOutcome::Send(UiCommand::Export));
        assert_eq!(handle_key(&mut s, ctrl('y')), KeyOutcome::CopySession);
        assert!(s.path_input.is_empty());
    }

    #[test]
    fn help_tab_swallows_typing() {
        let mut s = UiState::new("http://localhost:8000");
        handle_key(&mut s, key(KeyCode::Tab));
        assert_eq!(s.tab, 1);
        assert_eq!(handle_key(&mut s, key(KeyCode::Char('x'))), KeyOutcome::None);
        assert!(s.path_input.is_empty());
        handle_key(&mut s, key(KeyCode::Esc));
        assert_eq!(s.tab, 0);
    }

    #[test]
    fn copy_without_session_reports_error() {
        let mut s = UiState::new("http://localhost:8000");
        copy_session_id(&mut s);
        assert!(s.notice.as_ref().is_some_and(|n| n.is_error));
    }
}
