use std::{
    io::stdout,
    panic,
    sync::mpsc::{self, Receiver, Sender},
    time::Duration,
};

use color_eyre::{config::HookBuilder, eyre};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use log::{info, warn};
use tui_logger::{TuiLoggerLevelOutput, TuiLoggerWidget};

use ratatui::{
    prelude::*,
    widgets::{Block, Paragraph},
};

use crate::{
    audio::ToneDriver,
    morse,
    ws::{self, Channel, Lifecycle, SocketEvent, SoundCommand, StatusMessage},
};

const MORSE_LABEL: &str = "Morse: ";
const TRANSLATED_LABEL: &str = "Translated: ";

pub fn run_app(host: String) -> color_eyre::Result<()> {
    install_error_hooks()?;

    tui_logger::init_logger(log::LevelFilter::Trace).unwrap();
    tui_logger::set_default_level(log::LevelFilter::Trace);

    let terminal = init_terminal()?;
    App::new(host).run(terminal).unwrap();
    restore_terminal()?;
    color_eyre::Result::Ok(())
}

/// The control panel: one text input translated live to Morse, two result
/// lines fed by the device, and a single initialize/reconnect action.
struct App {
    /// The current state of the app (running or quit)
    state: AppState,

    /// Device host both sockets connect to
    host: String,

    /// Text being translated as the operator types
    input: String,
    /// Morse rendering of `input`, recomputed in full on every edit
    morse_output: String,

    /// Result lines fed by the status channel
    morse_result: String,
    translated_result: String,

    connection_status: String,
    audio_status: String,
    init_hint: &'static str,

    audio: ToneDriver,
    status_socket: Lifecycle,
    sound_socket: Lifecycle,

    /// Channel the socket reader threads report into
    tx: Sender<SocketEvent>,
    rx: Receiver<SocketEvent>,
}

#[derive(Debug, Default, PartialEq, Eq)]
enum AppState {
    /// The app is running
    #[default]
    Running,

    /// The user has requested the app to quit
    Quit,
}

impl App {
    fn new(host: String) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            state: AppState::Running,
            host,
            input: String::new(),
            morse_output: String::new(),
            morse_result: MORSE_LABEL.to_string(),
            translated_result: TRANSLATED_LABEL.to_string(),
            connection_status: "Disconnected".to_string(),
            audio_status: "Audio off".to_string(),
            init_hint: "Initialize",
            audio: ToneDriver::default(),
            status_socket: Lifecycle::default(),
            sound_socket: Lifecycle::default(),
            tx,
            rx,
        }
    }

    /// Run the app
    ///
    /// This is the main event loop for the app.
    fn run(mut self, mut terminal: Terminal<impl Backend>) -> anyhow::Result<()> {
        while self.is_running() {
            terminal.draw(|frame| frame.render_widget(&mut self, frame.size()))?;
            self.handle_events()?;
            self.handle_socket_events();
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        matches!(self.state, AppState::Running)
    }

    /// Handle any events that have occurred since the last time the app was
    /// rendered.
    fn handle_events(&mut self) -> anyhow::Result<()> {
        // Block for at most one frame at ~60 FPS so socket events keep
        // draining even when the keyboard is idle
        let timeout = Duration::from_secs_f32(1.0 / 60.0);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Esc => self.state = AppState::Quit,
                        KeyCode::Enter => self.initialize(),
                        KeyCode::Backspace => {
                            self.input.pop();
                            self.refresh_translation();
                        }
                        KeyCode::Char(c) => {
                            self.input.push(c);
                            self.refresh_translation();
                        }
                        _ => {}
                    }
                }
            }
        }
        Ok(())
    }

    fn refresh_translation(&mut self) {
        self.morse_output = morse::encode(&self.input);
    }

    /// The single user action: arm audio and open whichever sockets are not
    /// already connecting or open. Each socket follows its own lifecycle, so
    /// a lost status connection can be reopened without touching the sound
    /// one and vice versa.
    fn initialize(&mut self) {
        match self.audio.arm() {
            Ok(()) => self.audio_status = "Audio initialized".to_string(),
            Err(e) => warn!("audio unavailable: {:#}", e),
        }

        if self.status_socket.begin_open() {
            self.connection_status = "Connecting...".to_string();
            ws::spawn_reader(ws::status_url(&self.host), Channel::Status, self.tx.clone());
        }
        if self.sound_socket.begin_open() {
            ws::spawn_reader(ws::sound_url(&self.host), Channel::Sound, self.tx.clone());
        }
    }

    /// Drain everything the reader threads have sent since the last frame.
    fn handle_socket_events(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            match event {
                SocketEvent::Opened(Channel::Status) => {
                    self.status_socket = Lifecycle::Open;
                    self.connection_status = "Connected".to_string();
                    self.init_hint = "Reconnect";
                    info!("status channel connected");
                }
                SocketEvent::Closed(Channel::Status) => {
                    self.status_socket = Lifecycle::Closed;
                    self.connection_status = "Connection lost".to_string();
                    info!("status channel closed");
                }
                SocketEvent::Text(Channel::Status, text) => {
                    self.apply_status(StatusMessage::parse(&text));
                }
                SocketEvent::Opened(Channel::Sound) => {
                    self.sound_socket = Lifecycle::Open;
                    info!("sound channel connected");
                }
                SocketEvent::Closed(Channel::Sound) => {
                    self.sound_socket = Lifecycle::Closed;
                    info!("sound channel closed");
                }
                SocketEvent::Text(Channel::Sound, text) => {
                    self.audio.apply(SoundCommand::parse(&text));
                }
            }
        }
    }

    fn apply_status(&mut self, message: StatusMessage) {
        match message {
            StatusMessage::Morse(rest) => {
                self.morse_result = format!("{}{}", MORSE_LABEL, rest);
            }
            StatusMessage::Translate(rest) => {
                self.translated_result = format!("{}{}", TRANSLATED_LABEL, rest);
            }
            StatusMessage::Clear => {
                self.morse_result = MORSE_LABEL.to_string();
                self.translated_result = TRANSLATED_LABEL.to_string();
            }
            StatusMessage::Unknown(raw) => warn!("unknown message: {}", raw),
        }
    }
}

/// Implement the Widget trait for &mut App so that it can be rendered
impl Widget for &mut App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        use Constraint::*;
        let [top, input, output, device, logs] =
            Layout::vertical([Length(1), Length(3), Length(3), Length(6), Min(8)]).areas(area);

        Text::from(format!(
            "morse panel @ {} | Enter: {} | Esc: quit",
            self.host, self.init_hint
        ))
        .centered()
        .render(top, buf);

        Paragraph::new(self.input.as_str())
            .block(Block::bordered().title("Text"))
            .render(input, buf);

        Paragraph::new(self.morse_output.as_str())
            .block(Block::bordered().title("Morse"))
            .render(output, buf);

        Paragraph::new(Text::from(vec![
            Line::from(self.morse_result.as_str()),
            Line::from(self.translated_result.as_str()),
            Line::from(format!("Connection: {}", self.connection_status)),
            Line::from(self.audio_status.as_str()),
        ]))
        .block(Block::bordered().title("Device"))
        .render(device, buf);

        TuiLoggerWidget::default()
            .block(Block::bordered().title("Logs"))
            .output_separator('|')
            .output_timestamp(Some("%H:%M:%S%.3f".to_string()))
            .output_level(Some(TuiLoggerLevelOutput::Long))
            .output_target(false)
            .output_file(false)
            .output_line(false)
            .style(Style::default().fg(Color::White))
            .render(logs, buf);
    }
}

/// Install color_eyre panic and error hooks
///
/// The hooks restore the terminal to a usable state before printing the
/// error message.
fn install_error_hooks() -> color_eyre::Result<()> {
    let (panic, error) = HookBuilder::default().into_hooks();
    let panic = panic.into_panic_hook();
    let error = error.into_eyre_hook();
    eyre::set_hook(Box::new(move |e| {
        let _ = restore_terminal();
        error(e)
    }))?;
    panic::set_hook(Box::new(move |info| {
        let _ = restore_terminal();
        panic(info)
    }));
    color_eyre::Result::Ok(())
}

fn init_terminal() -> color_eyre::Result<Terminal<impl Backend>> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;
    terminal.hide_cursor()?;
    color_eyre::Result::Ok(terminal)
}

fn restore_terminal() -> color_eyre::Result<()> {
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    color_eyre::Result::Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> App {
        App::new("localhost".to_string())
    }

    #[test]
    fn status_messages_update_result_lines() {
        let mut app = app();

        app.apply_status(StatusMessage::parse("MORSE:.-.-"));
        assert_eq!(app.morse_result, "Morse: .-.-");

        app.apply_status(StatusMessage::parse("TRANSLATE:SOS"));
        assert_eq!(app.translated_result, "Translated: SOS");

        app.apply_status(StatusMessage::parse("CLEAR"));
        assert_eq!(app.morse_result, "Morse: ");
        assert_eq!(app.translated_result, "Translated: ");
    }

    #[test]
    fn unknown_status_messages_leave_lines_alone() {
        let mut app = app();
        app.apply_status(StatusMessage::parse("MORSE:..."));
        app.apply_status(StatusMessage::parse("BOGUS"));
        assert_eq!(app.morse_result, "Morse: ...");
        assert_eq!(app.translated_result, "Translated: ");
    }

    #[test]
    fn typing_recomputes_the_full_translation() {
        let mut app = app();
        app.input.push_str("sos");
        app.refresh_translation();
        assert_eq!(app.morse_output, "... --- ... ");

        app.input.clear();
        app.refresh_translation();
        assert_eq!(app.morse_output, "");
    }

    #[test]
    fn sound_events_reach_the_tone_driver() {
        let mut app = app();

        // not armed: the command is dropped, not queued
        app.tx
            .send(SocketEvent::Text(Channel::Sound, "START".to_string()))
            .unwrap();
        app.handle_socket_events();
        assert_eq!(app.audio.gain(), None);
    }

    #[test]
    fn socket_events_track_lifecycle() {
        let mut app = app();

        app.tx.send(SocketEvent::Opened(Channel::Status)).unwrap();
        app.tx.send(SocketEvent::Opened(Channel::Sound)).unwrap();
        app.handle_socket_events();
        assert_eq!(app.status_socket, Lifecycle::Open);
        assert_eq!(app.sound_socket, Lifecycle::Open);
        assert_eq!(app.connection_status, "Connected");
        assert_eq!(app.init_hint, "Reconnect");

        // the two sockets close independently
        app.tx.send(SocketEvent::Closed(Channel::Status)).unwrap();
        app.handle_socket_events();
        assert_eq!(app.status_socket, Lifecycle::Closed);
        assert_eq!(app.sound_socket, Lifecycle::Open);
        assert_eq!(app.connection_status, "Connection lost");

        // which is what allows the status socket to be reopened alone
        assert!(app.status_socket.begin_open());
        assert!(!app.sound_socket.begin_open());
    }
}
