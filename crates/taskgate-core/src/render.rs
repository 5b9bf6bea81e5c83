use std::io::{self, IsTerminal, Stdout, Write};

use anyhow::anyhow;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::datetime::format_date;
use crate::form::ValidationError;
use crate::task::{Priority, Task};
use crate::view::{FilterMode, Stats};

/// Draws store state as text. Owns no logic beyond layout.
#[derive(Debug)]
pub struct Renderer<W: Write> {
    out: W,
    color: bool,
}

impl Renderer<Stdout> {
    pub fn stdout(cfg: &Config) -> anyhow::Result<Self> {
        let tty = io::stdout().is_terminal();
        Self::new(cfg, io::stdout(), tty)
    }
}

impl<W: Write> Renderer<W> {
    pub fn new(cfg: &Config, out: W, tty: bool) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self {
            out,
            color: color && tty,
        })
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn line(&mut self, text: &str) -> anyhow::Result<()> {
        writeln!(self.out, "{text}")?;
        Ok(())
    }

    /// Writes `text` without a newline and flushes.
    pub fn prompt(&mut self, text: &str) -> anyhow::Result<()> {
        write!(self.out, "{text}")?;
        self.out.flush()?;
        Ok(())
    }

    pub fn entry(&mut self) -> anyhow::Result<()> {
        writeln!(self.out, "Not logged in.")?;
        writeln!(self.out, "Run `taskgate login <name>` to continue.")?;
        Ok(())
    }

    pub fn greeting(&mut self, name: &str) -> anyhow::Result<()> {
        let name = self.paint(name, "1");
        writeln!(self.out, "Welcome back, {name}!")?;
        Ok(())
    }

    pub fn stats(&mut self, stats: Stats) -> anyhow::Result<()> {
        writeln!(
            self.out,
            "Total: {}  Completed: {}  Pending: {}",
            stats.total,
            self.paint(&stats.completed.to_string(), "32"),
            self.paint(&stats.pending.to_string(), "33"),
        )?;
        Ok(())
    }

    pub fn notice(&mut self, message: &str) -> anyhow::Result<()> {
        let banner = self.paint(&format!("* {message}"), "7");
        writeln!(self.out, "{banner}")?;
        Ok(())
    }

    pub fn validation_errors(&mut self, errors: &[ValidationError]) -> anyhow::Result<()> {
        for err in errors {
            let field = self.paint(err.field.as_str(), "31");
            writeln!(self.out, "  {field}: {}", err.message)?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn task_table(&mut self, tasks: &[Task], mode: FilterMode) -> anyhow::Result<()> {
        if tasks.is_empty() {
            let text = match mode {
                FilterMode::All => "No tasks found. Create your first task!".to_string(),
                other => format!("No {other} tasks."),
            };
            writeln!(self.out, "{text}")?;
            return Ok(());
        }

        let headers = ["ID", "Status", "Priority", "Start", "End", "Title"]
            .map(str::to_string)
            .to_vec();

        let rows = tasks
            .iter()
            .map(|task| {
                let status = if task.completed {
                    self.paint("done", "32")
                } else {
                    "pending".to_string()
                };
                vec![
                    self.paint(&task.id.to_string(), "33"),
                    status,
                    self.priority_cell(task.priority),
                    format_date(task.start_date),
                    format_date(task.end_date),
                    task.title.clone(),
                ]
            })
            .collect();

        write_table(&mut self.out, headers, rows)
    }

    pub fn task_detail(&mut self, task: &Task) -> anyhow::Result<()> {
        writeln!(self.out, "id          {}", task.id)?;
        writeln!(self.out, "title       {}", task.title)?;
        writeln!(
            self.out,
            "status      {}",
            if task.completed { "completed" } else { "pending" }
        )?;
        writeln!(self.out, "priority    {}", task.priority.label())?;
        writeln!(self.out, "start       {}", format_date(task.start_date))?;
        writeln!(self.out, "end         {}", format_date(task.end_date))?;
        writeln!(
            self.out,
            "created     {}",
            task.created_at.format("%Y-%m-%d %H:%M")
        )?;
        if !task.description.is_empty() {
            writeln!(self.out, "description {}", task.description)?;
        }
        Ok(())
    }

    fn priority_cell(&self, priority: Priority) -> String {
        match priority {
            Priority::Important => self.paint(priority.label(), "31"),
            Priority::Medium => self.paint(priority.label(), "33"),
            Priority::Least => self.paint(priority.label(), "34"),
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let mut widths: Vec<usize> = headers
        .iter()
        .map(|header| UnicodeWidthStr::width(header.as_str()))
        .collect();

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    let last = widths.len().saturating_sub(1);
    let mut emit = |cells: &[String]| -> io::Result<()> {
        for (idx, cell) in cells.iter().enumerate() {
            if idx == last {
                write!(writer, "{cell}")?;
            } else {
                let visible = UnicodeWidthStr::width(strip_ansi(cell).as_str());
                let padding = widths[idx].saturating_sub(visible);
                write!(writer, "{}{} ", cell, " ".repeat(padding))?;
            }
        }
        writeln!(writer)
    };

    emit(&headers)?;
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    emit(&rule)?;
    for row in &rows {
        emit(row)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
