use ratatui::{prelude::*, widgets::*};

use crate::{isa::Register, vm::snapshot::Snapshot};

use super::app::App;

fn changed_style(changed: bool) -> Style {
    if changed {
        Style::default().light_yellow().bold()
    } else {
        Style::default()
    }
}

fn registers(app: &App) -> Paragraph<'_> {
    let current = app.current();
    let previous = app.previous();

    let mut lines: Vec<Line<'_>> = Vec::new();
    for register in Register::FILE {
        let value = current.and_then(|snapshot| snapshot.registers.get(&register));
        let text = match value {
            Some(value) => value.to_string(),
            None => "-".to_string(),
        };
        let changed = match (value, previous) {
            (Some(value), Some(previous)) => previous.registers.get(&register) != Some(value),
            (Some(_), None) => true,
            (None, _) => false,
        };
        lines.push(
            vec![
                Span::raw(format!("{:<4}", register.to_string())),
                Span::styled(text, changed_style(changed)),
            ]
            .into(),
        );
    }

    Paragraph::new(lines)
        .block(
            Block::default()
                .title("Registers")
                .title_alignment(Alignment::Center)
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded),
        )
        .style(Style::default().fg(Color::Yellow))
        .alignment(Alignment::Left)
}

fn flags(app: &App) -> Paragraph<'_> {
    let bit = |set: Option<bool>| match set {
        Some(true) => "1".to_string(),
        Some(false) => "0".to_string(),
        None => "-".to_string(),
    };
    let current = app.current().map(|snapshot| snapshot.flags);
    let previous = app.previous().map(|snapshot| snapshot.flags);
    let changed = current.is_some() && current != previous;

    let lines: Vec<Line<'_>> = vec![
        vec![
            Span::raw("Z "),
            Span::styled(bit(current.map(|flags| flags.zero)), changed_style(changed)),
        ]
        .into(),
        vec![
            Span::raw("N "),
            Span::styled(
                bit(current.map(|flags| flags.negative)),
                changed_style(changed),
            ),
        ]
        .into(),
        vec![
            Span::raw("P "),
            Span::styled(
                bit(current.map(|flags| flags.positive)),
                changed_style(changed),
            ),
        ]
        .into(),
    ];

    Paragraph::new(lines).block(
        Block::default()
            .title("Flags")
            .title_alignment(Alignment::Center)
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .style(Style::default().fg(Color::Yellow)),
    )
}

fn stack_view(app: &App) -> Paragraph<'_> {
    let mut lines: Vec<Line<'_>> = vec![Line::raw("Depth  Value")];
    if let Some(snapshot) = app.current() {
        for (depth, value) in snapshot.stack.iter().enumerate().rev() {
            lines.push(Line::raw(format!("{:<6} {}", depth, value)));
        }
    }

    Paragraph::new(lines).block(
        Block::default()
            .title("Stack")
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .style(Style::default().fg(Color::Yellow)),
    )
}

fn memory_view(app: &App) -> Paragraph<'_> {
    let mut lines: Vec<Line<'_>> = vec![Line::raw("Addr     Value")];
    if let Some(snapshot) = app.current() {
        let changed = |address, value| match app.previous() {
            Some(previous) => previous.memory.get(address) != Some(value),
            None => true,
        };
        for (address, value) in snapshot.memory.iter() {
            let line = format!("{:<8} {}", address.to_string(), value);
            if changed(address, value) {
                lines.push(Line::styled(line, Style::default().light_yellow().bold()));
            } else {
                lines.push(Line::raw(line));
            }
        }
    }

    Paragraph::new(lines).block(
        Block::default()
            .title("Memory")
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .style(Style::default().fg(Color::Yellow)),
    )
}

fn listing(app: &App) -> Paragraph<'_> {
    let current_line = app.current().map(|snapshot: &Snapshot| snapshot.line);
    let mut lines: Vec<Line<'_>> = Vec::new();

    for (index, text) in app.source_lines().iter().enumerate() {
        let line_number = index as u32 + 1;
        let line = format!("{:>4}  {}", line_number, text);
        if Some(line_number) == current_line {
            lines.push(Line::styled(line, Style::default().light_yellow().bold()));
        } else {
            lines.push(Line::raw(line));
        }
    }

    let title = match app.final_value() {
        Some(value) if app.at_end() => format!("Source - result: {}", value),
        _ => "Source".to_string(),
    };

    Paragraph::new(lines)
        .scroll((app.source_scroll, 0))
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .style(Style::default().fg(Color::Yellow)),
        )
}

fn top_bar(app: &App) -> Paragraph<'static> {
    let position = match app.step_count() {
        0 => "no executed instructions".to_string(),
        count => format!("step {}/{}", app.step_position(), count),
    };
    Paragraph::new(vec![format!("mockx64 debugger - {}", position).into()])
        .style(Style::default().fg(Color::Yellow).bold())
        .alignment(Alignment::Center)
}

fn bottom_bar() -> Paragraph<'static> {
    Paragraph::new(vec![
        "Press `Esc`, `Ctrl-C` or `q` to stop running.".into(),
        "Press `s` to step (wrapping past the last step) and `c` to jump to the end".into(),
        "Press `r` to rewind the replay".into(),
    ])
    .style(Style::default().fg(Color::Yellow).dim())
    .alignment(Alignment::Left)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Max(1), // Top bar
            Constraint::Min(1), // App layout
            Constraint::Max(3), // Bottom bar
        ])
        .split(frame.size());

    // App layout
    const REGISTER_LAYOUT_W: u16 = 16;
    let app_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Max(REGISTER_LAYOUT_W), // Registers and flags
            Constraint::Percentage(30),         // Stack and memory
            Constraint::Min(30),                // Source listing
        ])
        .split(main_layout[1]);

    let state_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(11), Constraint::Max(5)])
        .split(app_layout[0]);

    let data_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(app_layout[1]);

    frame.render_widget(top_bar(app), main_layout[0]);
    frame.render_widget(registers(app), state_layout[0]);
    frame.render_widget(flags(app), state_layout[1]);
    frame.render_widget(stack_view(app), data_layout[0]);
    frame.render_widget(memory_view(app), data_layout[1]);
    frame.render_widget(listing(app), app_layout[2]);
    frame.render_widget(bottom_bar(), main_layout[2]);
}
