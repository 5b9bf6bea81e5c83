use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;

use crate::task::{Priority, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Title,
    StartDate,
    EndDate,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::StartDate => "startDate",
            Field::EndDate => "endDate",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: Field,
    pub message: &'static str,
}

impl ValidationError {
    fn new(field: Field, message: &'static str) -> Self {
        Self { field, message }
    }
}

/// User-editable task fields, as submitted for create or update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskForm {
    pub title: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub priority: Priority,
    pub description: String,
}

impl TaskForm {
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            start_date: Some(task.start_date),
            end_date: Some(task.end_date),
            priority: task.priority,
            description: task.description.clone(),
        }
    }

    /// Checks every field and reports all failures at once.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        self.checked_schedule().map(|_| ())
    }

    /// Validates the form and returns its `(start, end)` dates.
    pub fn checked_schedule(&self) -> Result<(NaiveDate, NaiveDate), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.title.trim().is_empty() {
            errors.push(ValidationError::new(Field::Title, "Title is required"));
        }
        if self.start_date.is_none() {
            errors.push(ValidationError::new(
                Field::StartDate,
                "Start date is required",
            ));
        }
        match (self.start_date, self.end_date) {
            (_, None) => {
                errors.push(ValidationError::new(Field::EndDate, "End date is required"));
            }
            (Some(start), Some(end)) if start > end => {
                errors.push(ValidationError::new(
                    Field::EndDate,
                    "End date must be after start date",
                ));
            }
            _ => {}
        }

        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) if errors.is_empty() => Ok((start, end)),
            _ => Err(errors),
        }
    }
}

/// An in-progress edit of a [`TaskForm`] together with the errors from the
/// last submission.
///
/// Changing a field clears that field's error so each one can be corrected
/// independently.
#[derive(Debug, Clone, Default)]
pub struct FormState {
    form: TaskForm,
    errors: BTreeMap<Field, &'static str>,
}

impl FormState {
    pub fn new(form: TaskForm) -> Self {
        Self {
            form,
            errors: BTreeMap::new(),
        }
    }

    pub fn form(&self) -> &TaskForm {
        &self.form
    }

    pub fn error(&self, field: Field) -> Option<&'static str> {
        self.errors.get(&field).copied()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.form.title = title.into();
        self.errors.remove(&Field::Title);
    }

    /// Sets the start date. A start after the chosen end date clears the end
    /// date so it has to be entered again.
    pub fn set_start_date(&mut self, start: Option<NaiveDate>) {
        self.form.start_date = start;
        self.errors.remove(&Field::StartDate);

        if let (Some(start), Some(end)) = (start, self.form.end_date)
            && start > end
        {
            self.form.end_date = None;
        }
    }

    pub fn set_end_date(&mut self, end: Option<NaiveDate>) {
        self.form.end_date = end;
        self.errors.remove(&Field::EndDate);
    }

    pub fn set_priority(&mut self, priority: Priority) {
        self.form.priority = priority;
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.form.description = description.into();
    }

    /// Validates the form, recording the errors for display.
    pub fn submit(&mut self) -> Result<TaskForm, Vec<ValidationError>> {
        self.errors.clear();
        match self.form.validate() {
            Ok(()) => Ok(self.form.clone()),
            Err(errors) => {
                for err in &errors {
                    self.errors.insert(err.field, err.message);
                }
                Err(errors)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{Field, FormState, TaskForm};

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn empty_form_reports_every_required_field() {
        let errors = TaskForm::default().validate().unwrap_err();
        let fields: Vec<Field> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec![Field::Title, Field::StartDate, Field::EndDate]);
    }

    #[test]
    fn whitespace_title_is_rejected() {
        let form = TaskForm {
            title: "   ".to_string(),
            start_date: date(2024, 1, 1),
            end_date: date(2024, 1, 1),
            ..TaskForm::default()
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Title is required");
    }

    #[test]
    fn end_before_start_is_an_end_date_error() {
        let form = TaskForm {
            title: "x".to_string(),
            start_date: date(2024, 1, 3),
            end_date: date(2024, 1, 1),
            ..TaskForm::default()
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, Field::EndDate);
        assert_eq!(errors[0].message, "End date must be after start date");
    }

    #[test]
    fn same_day_schedule_is_valid() {
        let form = TaskForm {
            title: "x".to_string(),
            start_date: date(2024, 1, 1),
            end_date: date(2024, 1, 1),
            ..TaskForm::default()
        };
        assert!(form.validate().is_ok());
    }

    #[test]
    fn moving_start_past_end_clears_end() {
        let mut state = FormState::new(TaskForm {
            title: "x".to_string(),
            start_date: date(2024, 1, 1),
            end_date: date(2024, 1, 3),
            ..TaskForm::default()
        });

        state.set_start_date(date(2024, 1, 2));
        assert_eq!(state.form().end_date, date(2024, 1, 3));

        state.set_start_date(date(2024, 1, 5));
        assert_eq!(state.form().end_date, None);
        assert!(!state.has_errors());

        let errors = state.submit().unwrap_err();
        assert_eq!(errors[0].message, "End date is required");
        assert_eq!(state.error(Field::EndDate), Some("End date is required"));
    }

    #[test]
    fn editing_a_field_clears_only_its_error() {
        let mut state = FormState::default();
        assert!(state.submit().is_err());
        assert!(state.error(Field::Title).is_some());
        assert!(state.error(Field::StartDate).is_some());

        state.set_title("Write spec");
        assert!(state.error(Field::Title).is_none());
        assert!(state.error(Field::StartDate).is_some());
        assert!(state.error(Field::EndDate).is_some());
    }
}
