use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    // UI Events
    Quit,
    Tick,
    Render,

    // Playback Events
    TogglePlayPause,
    Stop,
    NextTrack,
    PreviousTrack,
    SeekForward,
    SeekBackward,
    Release,

    // Navigation Events
    Up,
    Down,
    Enter,

    // Volume Events
    VolumeUp,
    VolumeDown,

    // Mode Events
    ToggleShuffle,
    CycleRepeat,

    // Library Events
    RefreshLibrary,
}

pub struct EventHandler {
    event_sender: mpsc::UnboundedSender<AppEvent>,
    event_receiver: mpsc::UnboundedReceiver<AppEvent>,
}

impl EventHandler {
    pub fn new() -> Self {
        let (event_sender, event_receiver) = mpsc::unbounded_channel();

        Self {
            event_sender,
            event_receiver,
        }
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<AppEvent> {
        self.event_sender.clone()
    }

    pub async fn next_event(&mut self) -> Option<AppEvent> {
        self.event_receiver.recv().await
    }

    /// Read terminal input on a blocking thread until the receiver goes away.
    ///
    /// Only input is forwarded; ticks come from the app's own interval.
    pub fn spawn_terminal_reader(&self) {
        let sender = self.sender();

        tokio::task::spawn_blocking(move || {
            loop {
                let ready = match event::poll(Duration::from_millis(50)) {
                    Ok(ready) => ready,
                    Err(e) => {
                        debug!("Terminal poll failed: {}", e);
                        break;
                    }
                };
                if !ready {
                    if sender.is_closed() {
                        break;
                    }
                    continue;
                }

                let app_event = match event::read() {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => key_to_app_event(key),
                    Ok(Event::Resize(_, _)) => Some(AppEvent::Render),
                    Ok(_) => None,
                    Err(e) => {
                        debug!("Terminal read failed: {}", e);
                        break;
                    }
                };

                if let Some(app_event) = app_event {
                    if sender.send(app_event).is_err() {
                        break;
                    }
                }
            }
        });
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

pub fn key_to_app_event(key: KeyEvent) -> Option<AppEvent> {
    match key.code {
        // Quit
        KeyCode::Char('q') | KeyCode::Esc => Some(AppEvent::Quit),

        // Playback controls
        KeyCode::Char(' ') => Some(AppEvent::TogglePlayPause),
        KeyCode::Char('s') => Some(AppEvent::Stop),
        KeyCode::Char('n') | KeyCode::Right => Some(AppEvent::NextTrack),
        KeyCode::Char('b') | KeyCode::Left => Some(AppEvent::PreviousTrack),
        KeyCode::Char(']') => Some(AppEvent::SeekForward),
        KeyCode::Char('[') => Some(AppEvent::SeekBackward),
        KeyCode::Char('x') => Some(AppEvent::Release),

        // Navigation
        KeyCode::Up => Some(AppEvent::Up),
        KeyCode::Down => Some(AppEvent::Down),
        KeyCode::Enter => Some(AppEvent::Enter),

        // Volume
        KeyCode::Char('+') | KeyCode::Char('=') => Some(AppEvent::VolumeUp),
        KeyCode::Char('-') => Some(AppEvent::VolumeDown),

        // Mode controls
        KeyCode::Char('z') => Some(AppEvent::ToggleShuffle),
        KeyCode::Char('r') => Some(AppEvent::CycleRepeat),

        // Library
        KeyCode::F(5) => Some(AppEvent::RefreshLibrary),

        _ => None,
    }
}
