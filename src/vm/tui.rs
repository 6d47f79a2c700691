use std::time::Duration;

use crate::assembler::parser::Program;

use self::{app::App, event::Event, terminal::Terminal};

/// Replay state over a precomputed execution trace.
pub mod app;

/// Terminal event handling.
pub mod event;

/// Terminal setup and teardown.
pub mod terminal;

/// Widget rendering.
pub mod ui;

/// Key handling.
pub mod update;

/// Runs the step-through debugger over the given program.
///
/// The whole trace is computed up front; the interface then replays it one
/// snapshot at a time against the program's source text.
pub fn run(source: &str, program: Program) -> anyhow::Result<()> {
    let mut app = App::new(source, program)?;

    let backend = ratatui::backend::CrosstermBackend::new(std::io::stderr());
    let terminal = ratatui::Terminal::new(backend)?;
    let events = event::EventHandler::new(Duration::from_millis(250));
    let mut tui = Terminal::new(terminal, events);

    tui.enter()?;
    while !app.should_quit() {
        tui.draw(&mut app)?;
        match tui.events.next()? {
            Event::Tick => {}
            Event::Key(key_event) => update::update(&mut app, key_event),
            Event::Mouse(_) | Event::Resize(_, _) => {}
        }
    }
    tui.exit()?;

    Ok(())
}
