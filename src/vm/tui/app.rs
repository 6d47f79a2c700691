use crate::{
    assembler::parser::Program,
    vm::{machine::StepOutcome, snapshot::Snapshot, Vm},
};

/// Upper bound on the precomputed trace, so a program stuck in a loop fails
/// instead of filling memory.
const MAX_TRACE_STEPS: usize = 100_000;

pub struct App {
    /// Source text, one entry per line, displayed in the listing pane
    source_lines: Vec<String>,
    /// Precomputed execution trace, one snapshot per executed instruction
    snapshots: Vec<Snapshot>,
    /// Final register value of the run
    final_value: Option<i64>,

    /// Current replay position; `None` before the first step
    cursor: Option<usize>,
    /// Scroll offset of the source listing
    pub source_scroll: u16,

    /// If the app should quit
    should_quit: bool,
}

impl App {
    /// Runs the program to completion and sets up the replay over its trace.
    pub fn new(source: &str, program: Program) -> anyhow::Result<Self> {
        let mut vm = Vm::new(program);
        let mut snapshots = Vec::new();
        let final_value = loop {
            if snapshots.len() >= MAX_TRACE_STEPS {
                anyhow::bail!("program did not halt within {} steps", MAX_TRACE_STEPS);
            }
            match vm.step()? {
                StepOutcome::Running(snapshot) => snapshots.push(snapshot),
                StepOutcome::Halted(value) => break value,
            }
        };

        Ok(Self {
            source_lines: source.lines().map(str::to_owned).collect(),
            snapshots,
            final_value,
            cursor: None,
            source_scroll: 0,
            should_quit: false,
        })
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Quits the application.
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Advances the replay by one step, wrapping back to the first step
    /// after the last one.
    pub fn step(&mut self) {
        if self.snapshots.is_empty() {
            return;
        }
        self.cursor = match self.cursor {
            Some(position) if position + 1 < self.snapshots.len() => Some(position + 1),
            Some(_) => Some(0),
            None => Some(0),
        };
    }

    /// Jumps the replay to the last step of the run.
    pub fn run_to_end(&mut self) {
        if !self.snapshots.is_empty() {
            self.cursor = Some(self.snapshots.len() - 1);
        }
    }

    /// Rewinds the replay to before the first step.
    pub fn reset(&mut self) {
        self.cursor = None;
    }

    pub fn current(&self) -> Option<&Snapshot> {
        self.cursor.and_then(|position| self.snapshots.get(position))
    }

    /// The snapshot before the current one, used to highlight changes.
    pub fn previous(&self) -> Option<&Snapshot> {
        match self.cursor {
            Some(position) if position > 0 => self.snapshots.get(position - 1),
            _ => None,
        }
    }

    /// The source line of the instruction the replay is positioned on, along
    /// with its literal text.
    pub fn current_source_line(&self) -> Option<(u32, &str)> {
        let line = self.current()?.line;
        let text = self.source_lines.get(line as usize - 1)?;
        Some((line, text))
    }

    pub fn source_lines(&self) -> &[String] {
        &self.source_lines
    }

    pub fn step_count(&self) -> usize {
        self.snapshots.len()
    }

    /// One-based replay position, 0 before the first step.
    pub fn step_position(&self) -> usize {
        self.cursor.map(|position| position + 1).unwrap_or(0)
    }

    pub fn at_end(&self) -> bool {
        matches!(self.cursor, Some(position) if position + 1 == self.snapshots.len())
    }

    pub fn final_value(&self) -> Option<i64> {
        self.final_value
    }

    pub fn scroll_up(&mut self) {
        self.source_scroll = self.source_scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        let limit = self.source_lines.len().saturating_sub(1) as u16;
        self.source_scroll = (self.source_scroll + 1).min(limit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::assemble;

    fn app(input: &str) -> App {
        let program = assemble(input).expect("assembly failed");
        App::new(input, program).expect("execution failed")
    }

    #[test]
    fn test_step_wraps_past_the_end() {
        let mut app = app("mov $5, rax\nmov $6, rdi\nret");
        assert_eq!(app.step_count(), 2);
        assert_eq!(app.step_position(), 0);

        app.step();
        assert_eq!(app.step_position(), 1);
        app.step();
        assert_eq!(app.step_position(), 2);
        assert!(app.at_end());
        app.step();
        assert_eq!(app.step_position(), 1);
    }

    #[test]
    fn test_run_to_end_and_reset() {
        let mut app = app("mov $5, rax\nmov $6, rdi\nret");
        app.run_to_end();
        assert!(app.at_end());
        assert_eq!(app.final_value(), Some(5));

        app.reset();
        assert_eq!(app.step_position(), 0);
        assert!(app.current().is_none());
    }

    #[test]
    fn test_current_source_line() {
        let mut app = app("mov $5, rax\nret");
        assert_eq!(app.current_source_line(), None);
        app.step();
        assert_eq!(app.current_source_line(), Some((1, "mov $5, rax")));
    }
}
