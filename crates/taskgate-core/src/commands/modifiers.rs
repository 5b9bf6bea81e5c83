use chrono::{DateTime, NaiveDate, Utc};
use tracing::instrument;

use crate::datetime::parse_date_expr;
use crate::form::{FormState, TaskForm};
use crate::task::Priority;

/// A `key:value` token on the command line. An empty date value clears the
/// field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Mod {
    Start(Option<NaiveDate>),
    End(Option<NaiveDate>),
    Priority(Priority),
    Description(String),
}

/// Splits arguments into title words and modifiers. Everything after a bare
/// `--` is title text.
#[instrument(skip(args, now))]
pub(crate) fn parse_title_and_mods(
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<(String, Vec<Mod>)> {
    let mut title_parts = Vec::new();
    let mut mods = Vec::new();

    let mut literal = false;
    for arg in args {
        if arg == "--" && !literal {
            literal = true;
            continue;
        }

        if !literal && let Some(one_mod) = parse_one_mod(arg, now)? {
            mods.push(one_mod);
            continue;
        }

        title_parts.push(arg.as_str());
    }

    Ok((title_parts.join(" "), mods))
}

fn parse_one_mod(tok: &str, now: DateTime<Utc>) -> anyhow::Result<Option<Mod>> {
    let Some((key, value)) = tok.split_once(':') else {
        return Ok(None);
    };

    let parse_date = |value: &str| -> anyhow::Result<Option<NaiveDate>> {
        if value.trim().is_empty() {
            Ok(None)
        } else {
            parse_date_expr(value, now).map(Some)
        }
    };

    match key.to_ascii_lowercase().as_str() {
        "start" => Ok(Some(Mod::Start(parse_date(value)?))),
        "end" => Ok(Some(Mod::End(parse_date(value)?))),
        "pri" | "priority" => Ok(Some(Mod::Priority(value.parse()?))),
        "desc" | "description" => Ok(Some(Mod::Description(value.to_string()))),
        _ => Ok(None),
    }
}

/// Builds a new form straight from the modifiers, in any order. Repeated keys
/// keep the last value.
pub(crate) fn form_from_mods(title: String, mods: &[Mod]) -> TaskForm {
    let mut form = TaskForm {
        title,
        ..TaskForm::default()
    };
    for one_mod in mods {
        match one_mod {
            Mod::Start(date) => form.start_date = *date,
            Mod::End(date) => form.end_date = *date,
            Mod::Priority(priority) => form.priority = *priority,
            Mod::Description(text) => form.description = text.clone(),
        }
    }
    form
}

/// Edits an existing form field by field, so a later start date clears an
/// end date it overtakes.
pub(crate) fn apply_mods(state: &mut FormState, mods: &[Mod]) {
    for one_mod in mods {
        match one_mod {
            Mod::Start(date) => state.set_start_date(*date),
            Mod::End(date) => state.set_end_date(*date),
            Mod::Priority(priority) => state.set_priority(*priority),
            Mod::Description(text) => state.set_description(text.clone()),
        }
    }
}
