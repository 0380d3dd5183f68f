use super::format::{format_time, volume_icon};
use super::progress::PlaybackProgress;
use super::{AppEvent, EventHandler, TerminalManager};
use crate::audio::{EngineState, MusicPlayerManager, PlaybackEngine, RepeatMode};
use crate::config::UiConfig;
use crate::error::{PlayerError, Result as PlayerResult};
use crate::library::{MediaIndex, SongLoader};
use anyhow::Result;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

const STATUS_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq)]
pub enum LibraryStatus {
    Ready,
    PermissionDenied(PathBuf),
}

/// Everything the screen shows, minus the terminal itself.
pub struct AppState<E: PlaybackEngine> {
    manager: MusicPlayerManager<E>,
    index: Box<dyn MediaIndex>,
    library: LibraryStatus,
    ui: UiConfig,
    progress: PlaybackProgress,
    status_message: Option<(String, Instant)>,
    pub list_state: ListState,
    pub should_quit: bool,
}

impl<E: PlaybackEngine> AppState<E> {
    /// `access` is the result of the read-permission check; on failure the
    /// index is never queried.
    pub fn new(
        manager: MusicPlayerManager<E>,
        index: Box<dyn MediaIndex>,
        access: PlayerResult<()>,
        ui: UiConfig,
    ) -> Self {
        let library = match access {
            Ok(()) => LibraryStatus::Ready,
            Err(PlayerError::PermissionDenied { path }) => LibraryStatus::PermissionDenied(path),
            Err(e) => {
                warn!("Library unavailable: {}", e);
                LibraryStatus::PermissionDenied(PathBuf::new())
            }
        };

        let mut state = Self {
            manager,
            index,
            library,
            ui,
            progress: PlaybackProgress::default(),
            status_message: None,
            list_state: ListState::default(),
            should_quit: false,
        };
        state.reload_library();
        state
    }

    pub fn manager(&self) -> &MusicPlayerManager<E> {
        &self.manager
    }

    pub fn library(&self) -> &LibraryStatus {
        &self.library
    }

    pub fn poll_interval(&self) -> Duration {
        self.ui.poll_interval()
    }

    pub fn status(&self) -> Option<&str> {
        self.status_message
            .as_ref()
            .filter(|(_, at)| at.elapsed() < STATUS_TTL)
            .map(|(message, _)| message.as_str())
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now()));
    }

    fn report(&mut self, result: PlayerResult<()>) {
        if let Err(e) = result {
            warn!("{}", e);
            self.set_status(e.to_string());
        }
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        if let LibraryStatus::PermissionDenied(_) = self.library {
            if event == AppEvent::Quit {
                self.should_quit = true;
            }
            return;
        }

        match event {
            AppEvent::Quit => {
                self.should_quit = true;
            }
            AppEvent::Tick => {
                self.on_tick();
            }
            AppEvent::Render => {}
            AppEvent::TogglePlayPause => {
                let result = match self.manager.engine_state() {
                    EngineState::Playing => self.manager.pause(),
                    EngineState::Paused => self.manager.resume(),
                    EngineState::Idle => {
                        let index = self
                            .manager
                            .current_index()
                            .or(self.list_state.selected())
                            .unwrap_or(0);
                        self.progress.reset();
                        self.manager.play_at(index)
                    }
                };
                self.report(result);
            }
            AppEvent::Stop => {
                let result = self.manager.stop();
                self.progress.reset();
                self.report(result);
            }
            AppEvent::NextTrack => {
                let result = self.manager.play_next_song();
                self.after_track_change(result);
            }
            AppEvent::PreviousTrack => {
                let result = self.manager.play_previous_song();
                self.after_track_change(result);
            }
            AppEvent::SeekForward => {
                self.progress.scrub(self.ui.seek_step_ms as i64);
            }
            AppEvent::SeekBackward => {
                self.progress.scrub(-(self.ui.seek_step_ms as i64));
            }
            AppEvent::Release => {
                self.release();
                self.progress.reset();
                self.set_status("Player released");
            }
            AppEvent::Up => {
                self.move_selection(-1);
            }
            AppEvent::Down => {
                self.move_selection(1);
            }
            AppEvent::Enter => {
                let index = self.list_state.selected().unwrap_or(0);
                let result = self.manager.play_at(index);
                self.after_track_change(result);
            }
            AppEvent::VolumeUp => {
                let result = self.manager.set_volume(self.manager.volume() + self.ui.volume_step);
                self.report(result);
            }
            AppEvent::VolumeDown => {
                let result = self.manager.set_volume(self.manager.volume() - self.ui.volume_step);
                self.report(result);
            }
            AppEvent::ToggleShuffle => {
                let on = self.manager.toggle_shuffle();
                self.set_status(if on { "Shuffle on" } else { "Shuffle off" });
            }
            AppEvent::CycleRepeat => {
                let mode = self.manager.cycle_repeat_mode();
                self.set_status(format!("Repeat: {}", repeat_label(mode)));
            }
            AppEvent::RefreshLibrary => {
                self.reload_library();
                let count = self.manager.songs().len();
                self.set_status(format!("Loaded {} songs", count));
            }
        }
    }

    /// The one place position and duration get read from the player
    fn on_tick(&mut self) {
        if let Some(position) = self.progress.take_pending_seek() {
            let result = self.manager.seek_to(position);
            self.report(result);
        }

        if self.manager.is_finished() {
            let result = self.manager.advance_after_finish().map(|_| ());
            self.after_track_change(result);
        }

        self.progress.poll(&self.manager);
    }

    fn after_track_change(&mut self, result: PlayerResult<()>) {
        match result {
            Ok(()) => {
                self.progress.reset();
                if let Some(index) = self.manager.current_index() {
                    self.list_state.select(Some(index));
                }
            }
            Err(e) => self.report(Err(e)),
        }
    }

    fn move_selection(&mut self, delta: i32) {
        let len = self.manager.songs().len();
        if len == 0 {
            return;
        }

        let current = self.list_state.selected().unwrap_or(0);
        let new_index = if delta < 0 {
            current.saturating_sub(delta.unsigned_abs() as usize)
        } else {
            (current + delta as usize).min(len - 1)
        };

        self.list_state.select(Some(new_index));
    }

    fn reload_library(&mut self) {
        if self.library != LibraryStatus::Ready {
            return;
        }

        let songs = SongLoader::load_all_songs(self.index.as_ref());
        info!("Library ready with {} songs", songs.len());
        let empty = songs.is_empty();
        self.manager.set_queue(songs);

        let selected = self.manager.current_index().or(if empty { None } else { Some(0) });
        self.list_state.select(selected);
    }

    pub fn release(&mut self) {
        self.manager.release();
    }

    pub fn render(&mut self, f: &mut Frame) {
        let area = f.area();
        if let LibraryStatus::PermissionDenied(path) = &self.library {
            Self::render_permission_required(f, area, path);
            return;
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(3),    // Song list
                Constraint::Length(4), // Now playing
                Constraint::Length(3), // Progress
                Constraint::Length(3), // Volume
                Constraint::Length(1), // Status line
            ])
            .split(area);

        Self::render_header(f, chunks[0]);

        let mut list_state = self.list_state.clone();
        self.render_song_list(f, chunks[1], &mut list_state);
        self.list_state = list_state;

        self.render_now_playing(f, chunks[2]);
        self.render_progress(f, chunks[3]);
        self.render_volume(f, chunks[4]);
        self.render_status_line(f, chunks[5]);
    }

    fn render_permission_required(f: &mut Frame, area: Rect, path: &Path) {
        let mut lines = vec![Line::from(Span::styled(
            "Permission required to access songs!",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ))];
        if !path.as_os_str().is_empty() {
            lines.push(Line::from(format!("Cannot read {}", path.display())));
        }
        lines.push(Line::from("Press q to quit"));

        let message = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("PeaceFinder"))
            .wrap(Wrap { trim: true });
        f.render_widget(message, area);
    }

    fn render_header(f: &mut Frame, area: Rect) {
        let title = Paragraph::new("🎵 PeaceFinder")
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .block(Block::default().borders(Borders::ALL));

        f.render_widget(title, area);
    }

    fn render_song_list(&self, f: &mut Frame, area: Rect, list_state: &mut ListState) {
        let songs = self.manager.songs();
        let block = Block::default().borders(Borders::ALL).title("Songs");

        if songs.is_empty() {
            let hint = Paragraph::new("No songs found. Add music to your library and press F5 to rescan.")
                .block(block)
                .wrap(Wrap { trim: true });
            f.render_widget(hint, area);
            return;
        }

        let current = self.manager.current_index();
        let items: Vec<ListItem> = songs
            .iter()
            .enumerate()
            .map(|(i, song)| {
                let is_current = current == Some(i);
                let prefix = if is_current { "♪ " } else { "  " };
                let style = if is_current {
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };

                ListItem::new(Line::from(vec![
                    Span::styled(format!("{}{}", prefix, song.title), style),
                    Span::styled(format!("  {}", song.artist), Style::default().fg(Color::Gray)),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().bg(Color::DarkGray))
            .highlight_symbol("► ");

        f.render_stateful_widget(list, area, list_state);
    }

    fn render_now_playing(&self, f: &mut Frame, area: Rect) {
        let track_info = match self.manager.current_song() {
            Some(song) => song.display_line(),
            None => "No track selected".to_string(),
        };

        let (status_symbol, status_text, status_color) = match self.manager.engine_state() {
            EngineState::Playing => ("▶", "Playing", Color::Green),
            EngineState::Paused => ("⏸", "Paused", Color::Yellow),
            EngineState::Idle => ("⏹", "Stopped", Color::Gray),
        };

        let mode_style = |active: bool| {
            if active {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            }
        };
        let repeat = self.manager.repeat_mode();
        let repeat_symbol = if repeat == RepeatMode::One { "🔂" } else { "🔁" };

        let lines = vec![
            Line::from(Span::styled(
                track_info,
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            )),
            Line::from(vec![
                Span::styled(status_symbol, Style::default().fg(status_color).add_modifier(Modifier::BOLD)),
                Span::raw(" "),
                Span::styled(status_text, Style::default().fg(status_color)),
                Span::raw(" | "),
                Span::styled("🔀 shuffle", mode_style(self.manager.shuffle_state())),
                Span::raw(" | "),
                Span::styled(
                    format!("{} repeat {}", repeat_symbol, repeat_label(repeat)),
                    mode_style(repeat != RepeatMode::None),
                ),
            ]),
        ];

        let widget = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Now Playing"))
            .wrap(Wrap { trim: true });
        f.render_widget(widget, area);
    }

    fn render_progress(&self, f: &mut Frame, area: Rect) {
        let elapsed = format_time(self.progress.displayed_position().as_millis() as u64);
        let total = self
            .progress
            .duration()
            .map(|d| format_time(d.as_millis() as u64))
            .unwrap_or_else(|| "--:--".to_string());

        let color = if self.manager.is_playing() { Color::Green } else { Color::Yellow };
        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title("Progress  [ ] to seek"))
            .gauge_style(Style::default().fg(color))
            .ratio(self.progress.ratio())
            .label(format!("{} / {}", elapsed, total));

        f.render_widget(gauge, area);
    }

    fn render_volume(&self, f: &mut Frame, area: Rect) {
        let volume = self.manager.volume();
        let gauge = Gauge::default()
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("{} Volume  +/- to adjust", volume_icon(volume))),
            )
            .gauge_style(Style::default().fg(Color::Blue))
            .ratio(volume as f64)
            .label(format!("{}%", (volume * 100.0).round() as u32));

        f.render_widget(gauge, area);
    }

    fn render_status_line(&self, f: &mut Frame, area: Rect) {
        let line = match self.status() {
            Some(message) => Line::from(Span::styled(message.to_string(), Style::default().fg(Color::Yellow))),
            None => Line::from(Span::styled(
                "Space play/pause  n/b next/prev  s stop  z shuffle  r repeat  F5 rescan  x release  q quit",
                Style::default().fg(Color::DarkGray),
            )),
        };
        f.render_widget(Paragraph::new(line), area);
    }
}

fn repeat_label(mode: RepeatMode) -> &'static str {
    match mode {
        RepeatMode::None => "off",
        RepeatMode::All => "all",
        RepeatMode::One => "one",
    }
}

/// Terminal-owning shell around `AppState`.
pub struct App<E: PlaybackEngine> {
    terminal: TerminalManager,
    event_handler: EventHandler,
    state: AppState<E>,
}

impl<E: PlaybackEngine> App<E> {
    pub fn new(state: AppState<E>) -> Result<Self> {
        let terminal = TerminalManager::new()?;
        let event_handler = EventHandler::new();

        Ok(Self {
            terminal,
            event_handler,
            state,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        self.event_handler.spawn_terminal_reader();

        let mut ticker = tokio::time::interval(self.state.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while !self.state.should_quit {
            let state = &mut self.state;
            self.terminal.draw(|f| state.render(f))?;

            tokio::select! {
                _ = ticker.tick() => {
                    self.state.handle_event(AppEvent::Tick);
                }
                event = self.event_handler.next_event() => match event {
                    Some(event) => self.state.handle_event(event),
                    None => break,
                },
            }
        }

        self.state.release();
        Ok(())
    }
}
