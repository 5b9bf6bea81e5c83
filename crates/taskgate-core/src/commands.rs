mod modifiers;
pub mod shell;

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::cli::Invocation;
use crate::form::{FormState, TaskForm};
use crate::notice::Notice;
use crate::render::Renderer;
use crate::session::{Route, SessionError, SessionGate};
use crate::storage::Storage;
use crate::store::{Change, StoreError, TaskStore};
use crate::task::TaskStatus;
use crate::view::{FilterMode, visible};

use self::modifiers::{apply_mods, form_from_mods, parse_title_and_mods};

const DELETE_NOTICE: &str = "Task deleted successfully!";

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "login",
        "dashboard",
        "list",
        "add",
        "edit",
        "show",
        "done",
        "undone",
        "delete",
        "about",
        "shell",
        "help",
        "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &str, known: &[&'a str]) -> Option<&'a str> {
    if let Some(exact) = known.iter().copied().find(|name| *name == token) {
        return Some(exact);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

/// The view a command renders. Commands without a route need no session.
fn route_for(command: &str) -> Option<Route> {
    match command {
        "login" | "shell" => Some(Route::Entry),
        "dashboard" => Some(Route::Dashboard),
        "list" | "add" | "edit" | "show" | "done" | "undone" | "delete" => Some(Route::Tasks),
        "about" => Some(Route::About),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    /// No session; the entry view was shown instead.
    Redirected,
    /// Input was refused (validation failure, unknown id, blank name).
    Rejected,
}

/// Application root: owns the session gate, the task store and the view
/// state, all sharing one storage backend.
pub struct App<'s, S: Storage, W: Write> {
    gate: SessionGate<&'s S>,
    store: TaskStore<&'s S>,
    renderer: Renderer<W>,
    notice: Notice,
    changes: Rc<RefCell<Vec<Change>>>,
}

impl<'s, S: Storage, W: Write> App<'s, S, W> {
    pub fn new(
        storage: &'s S,
        renderer: Renderer<W>,
        notice_window: Duration,
    ) -> anyhow::Result<Self> {
        let mut store = TaskStore::load(storage).context("failed to load tasks")?;

        let changes: Rc<RefCell<Vec<Change>>> = Rc::default();
        let sink = Rc::clone(&changes);
        store.subscribe(move |change, _| sink.borrow_mut().push(change.clone()));

        Ok(Self {
            gate: SessionGate::new(storage),
            store,
            renderer,
            notice: Notice::new(notice_window),
            changes,
        })
    }

    pub fn renderer_mut(&mut self) -> &mut Renderer<W> {
        &mut self.renderer
    }

    pub fn into_renderer(self) -> Renderer<W> {
        self.renderer
    }

    #[instrument(skip(self, inv, now, instant), fields(command = %inv.command))]
    pub fn dispatch(
        &mut self,
        inv: &Invocation,
        now: DateTime<Utc>,
        instant: Instant,
    ) -> anyhow::Result<Outcome> {
        let command = inv.command.as_str();
        let args = inv.args.as_slice();

        if let Some(route) = route_for(command)
            && self.gate.guard(route)? != route
        {
            info!(%route, "redirected to entry");
            self.renderer.entry()?;
            return Ok(Outcome::Redirected);
        }

        debug!(args = ?args, "dispatching command");
        let outcome = match command {
            "login" => self.cmd_login(args)?,
            "dashboard" => self.cmd_dashboard()?,
            "list" => self.cmd_list(args)?,
            "add" => self.cmd_add(args, now)?,
            "edit" => self.cmd_edit(args, now)?,
            "show" => self.cmd_show(args)?,
            "done" => self.cmd_set_status(args, TaskStatus::Completed)?,
            "undone" => self.cmd_set_status(args, TaskStatus::Pending)?,
            "delete" => self.cmd_delete(args)?,
            "about" => self.cmd_about()?,
            "help" => {
                self.renderer.line(HELP_TEXT)?;
                Outcome::Done
            }
            "version" => {
                self.renderer.line(env!("CARGO_PKG_VERSION"))?;
                Outcome::Done
            }
            "shell" => return Err(anyhow!("shell cannot be nested")),
            other => return Err(anyhow!("unknown command: {other}")),
        };

        self.absorb_changes(instant);
        if let Some(message) = self.notice.current(instant) {
            self.renderer.notice(message)?;
        }
        Ok(outcome)
    }

    fn absorb_changes(&mut self, instant: Instant) {
        for change in self.changes.borrow_mut().drain(..) {
            if let Change::Deleted(id) = change {
                debug!(id, "raising delete notice");
                self.notice.show(DELETE_NOTICE, instant);
            }
        }
    }

    fn cmd_login(&mut self, args: &[String]) -> anyhow::Result<Outcome> {
        let name = args.join(" ");
        match self.gate.login(&name) {
            Ok(route) => {
                debug!(%route, "login landed");
                self.cmd_dashboard()
            }
            Err(SessionError::EmptyName) => {
                self.renderer.line(&SessionError::EmptyName.to_string())?;
                Ok(Outcome::Rejected)
            }
            Err(SessionError::Storage(err)) => Err(err),
        }
    }

    fn cmd_dashboard(&mut self) -> anyhow::Result<Outcome> {
        let name = self.gate.identity()?.unwrap_or_default();
        self.renderer.greeting(&name)?;
        self.renderer.stats(self.store.snapshot().stats)?;
        Ok(Outcome::Done)
    }

    fn cmd_list(&mut self, args: &[String]) -> anyhow::Result<Outcome> {
        let mode = match args {
            [] => FilterMode::All,
            [mode] => mode.parse()?,
            _ => return Err(anyhow!("list takes at most one filter: all, completed or pending")),
        };

        let snapshot = self.store.snapshot();
        self.renderer.task_table(&visible(&snapshot.tasks, mode), mode)?;
        self.renderer.stats(snapshot.stats)?;
        Ok(Outcome::Done)
    }

    fn cmd_add(&mut self, args: &[String], now: DateTime<Utc>) -> anyhow::Result<Outcome> {
        let (title, mods) = parse_title_and_mods(args, now)?;
        let mut state = FormState::new(form_from_mods(title, &mods));

        let form = match state.submit() {
            Ok(form) => form,
            Err(errors) => return self.rejected(StoreError::Validation(errors)),
        };
        match self.store.create(form, now) {
            Ok(task) => {
                self.renderer.line(&format!("Created task {}.", task.id))?;
                Ok(Outcome::Done)
            }
            Err(err) => self.rejected(err),
        }
    }

    fn cmd_edit(&mut self, args: &[String], now: DateTime<Utc>) -> anyhow::Result<Outcome> {
        let (id, rest) = split_id(args)?;
        let Some(task) = self.store.get(id) else {
            return self.rejected(StoreError::NotFound(id));
        };

        let (title, mods) = parse_title_and_mods(rest, now)?;
        let mut state = FormState::new(TaskForm::from_task(task));
        if !title.is_empty() {
            state.set_title(title);
        }
        apply_mods(&mut state, &mods);

        let form = match state.submit() {
            Ok(form) => form,
            Err(errors) => return self.rejected(StoreError::Validation(errors)),
        };
        match self.store.update(id, form) {
            Ok(task) => {
                self.renderer.line(&format!("Updated task {}.", task.id))?;
                Ok(Outcome::Done)
            }
            Err(err) => self.rejected(err),
        }
    }

    fn cmd_show(&mut self, args: &[String]) -> anyhow::Result<Outcome> {
        let (id, _) = split_id(args)?;
        match self.store.get(id).cloned() {
            Some(task) => {
                self.renderer.task_detail(&task)?;
                Ok(Outcome::Done)
            }
            None => self.rejected(StoreError::NotFound(id)),
        }
    }

    fn cmd_set_status(&mut self, args: &[String], status: TaskStatus) -> anyhow::Result<Outcome> {
        let (id, _) = split_id(args)?;
        match self.store.set_status(id, status) {
            Ok(task) => {
                let label = if task.completed { "completed" } else { "pending" };
                self.renderer
                    .line(&format!("Marked task {} {label}.", task.id))?;
                Ok(Outcome::Done)
            }
            Err(err) => self.rejected(err),
        }
    }

    fn cmd_delete(&mut self, args: &[String]) -> anyhow::Result<Outcome> {
        let (id, _) = split_id(args)?;
        match self.store.delete(id) {
            Ok(task) => {
                debug!(id = task.id, title = %task.title, "removed");
                Ok(Outcome::Done)
            }
            Err(err) => self.rejected(err),
        }
    }

    fn cmd_about(&mut self) -> anyhow::Result<Outcome> {
        self.renderer
            .line(&format!("taskgate {}", env!("CARGO_PKG_VERSION")))?;
        self.renderer.line(ABOUT_TEXT)?;
        Ok(Outcome::Done)
    }

    /// Renders a refused mutation. Storage failures stay errors.
    fn rejected(&mut self, err: StoreError) -> anyhow::Result<Outcome> {
        match err {
            StoreError::Validation(errors) => {
                self.renderer.line("Task not saved:")?;
                self.renderer.validation_errors(&errors)?;
                Ok(Outcome::Rejected)
            }
            StoreError::NotFound(id) => {
                self.renderer.line(&format!("No task with id {id}."))?;
                Ok(Outcome::Rejected)
            }
            StoreError::Storage(err) => Err(err),
            err @ StoreError::IdsExhausted(_) => Err(err.into()),
        }
    }
}

fn split_id(args: &[String]) -> anyhow::Result<(i64, &[String])> {
    let (first, rest) = args
        .split_first()
        .ok_or_else(|| anyhow!("expected a task id"))?;
    let id = first
        .parse::<i64>()
        .with_context(|| format!("invalid task id: {first}"))?;
    Ok((id, rest))
}

const ABOUT_TEXT: &str = "\
Plan your work as dated tasks, mark them done as you go and keep
everything on this machine. Tasks and your login name are stored in the
data directory; nothing is sent anywhere.";

const HELP_TEXT: &str = "\
usage: taskgate [-v|-q] [--config FILE] [--data DIR] [--rc KEY=VALUE] <command> [args]

commands:
  login <name>                      start a session
  dashboard                         greeting and task counts
  list [all|completed|pending]      tasks, newest first
  add <title> start:DATE end:DATE [priority:P] [desc:TEXT]
  edit <id> [title] [start:DATE] [end:DATE] [priority:P] [desc:TEXT]
  show <id>                         one task in full
  done <id> | undone <id>           set completion
  delete <id>                       remove a task
  about                             what this is
  shell                             interactive session (exit with 'quit')

DATE is YYYY-MM-DD, today, tomorrow or yesterday.
P is important, medium (default) or least.";
