//! Form parsing and per-field validation.
//!
//! Forms carry raw submitted strings. `clean` turns them into typed changes
//! plus a [`FieldErrors`] map; checks that need the database (uniqueness,
//! references) are added by the storage layer inside its transaction.

use crate::error::FieldErrors;
use crate::types::Priority;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;

/// Maximum length for task, task type and position names.
pub const NAME_MAX_LEN: usize = 63;

/// Maximum length for usernames and personal names.
pub const USERNAME_MAX_LEN: usize = 150;

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";
pub const PAST_DEADLINE: &str = "Deadline cannot be in the past.";
pub const INVALID_DATE: &str = "Enter a valid date.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";
pub const INVALID_USERNAME: &str = "Enter a valid username. This value may contain only \
                                    letters, numbers, and @/./+/-/_ characters.";

/// Whether a form creates a record (required fields enforced) or patches one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Update,
}

/// Submitted task fields. `None` means the field was not supplied.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub deadline: Option<String>,
    pub priority: Option<String>,
    pub task_type: Option<String>,
    pub assignees: Option<Vec<String>>,
}

/// Task fields after per-field checks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub priority: Option<Priority>,
    pub task_type_id: Option<i64>,
    pub assignee_ids: Option<Vec<i64>>,
}

impl TaskForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn deadline(mut self, deadline: NaiveDate) -> Self {
        self.deadline = Some(deadline.format("%Y-%m-%d").to_string());
        self
    }

    pub fn priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    pub fn task_type(mut self, task_type_id: i64) -> Self {
        self.task_type = Some(task_type_id.to_string());
        self
    }

    pub fn assignees(mut self, worker_ids: &[i64]) -> Self {
        self.assignees = Some(worker_ids.iter().map(i64::to_string).collect());
        self
    }

    /// Build a form from urlencoded key/value pairs.
    ///
    /// `assignees` may repeat (checkbox lists) or hold a comma-separated list.
    /// An `assignees` key with an empty value means "no assignees". Keys that
    /// are not task fields are ignored.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut form = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "name" => form.name = Some(value),
                "description" => form.description = Some(value),
                "deadline" => form.deadline = Some(value),
                "priority" => form.priority = Some(value),
                "task_type" => form.task_type = Some(value),
                "assignees" | "assignees[]" => {
                    let ids = form.assignees.get_or_insert_with(Vec::new);
                    ids.extend(
                        value
                            .split(',')
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(str::to_string),
                    );
                }
                _ => {}
            }
        }
        form
    }

    /// Run the per-field checks.
    pub fn clean(&self, mode: FormMode, today: NaiveDate) -> (TaskChanges, FieldErrors) {
        let mut errors = FieldErrors::new();
        let mut changes = TaskChanges::default();
        let creating = mode == FormMode::Create;

        match self.name.as_deref() {
            Some(raw) => match clean_name(raw, NAME_MAX_LEN) {
                Ok(name) => changes.name = Some(name),
                Err(msg) => errors.add("name", msg),
            },
            None if creating => errors.add("name", REQUIRED),
            None => {}
        }

        changes.description = match &self.description {
            Some(d) => Some(d.trim().to_string()),
            None if creating => Some(String::new()),
            None => None,
        };

        match self.deadline.as_deref().map(str::trim) {
            Some("") => errors.add("deadline", REQUIRED),
            Some(raw) => match parse_date(raw) {
                Some(date) if date < today => errors.add("deadline", PAST_DEADLINE),
                Some(date) => changes.deadline = Some(date),
                None => errors.add("deadline", INVALID_DATE),
            },
            None if creating => errors.add("deadline", REQUIRED),
            None => {}
        }

        match self.priority.as_deref().map(str::trim) {
            Some("") | None => {
                if creating {
                    changes.priority = Some(Priority::default());
                }
            }
            Some(raw) => match raw.parse::<Priority>() {
                Ok(p) => changes.priority = Some(p),
                Err(_) => errors.add(
                    "priority",
                    format!(
                        "Select a valid choice. {} is not one of the available choices.",
                        raw
                    ),
                ),
            },
        }

        match self.task_type.as_deref().map(str::trim) {
            Some("") | None => {
                if creating || self.task_type.is_some() {
                    errors.add("task_type", REQUIRED);
                }
            }
            Some(raw) => match raw.parse::<i64>() {
                Ok(id) => changes.task_type_id = Some(id),
                Err(_) => errors.add("task_type", INVALID_CHOICE),
            },
        }

        if let Some(raw_ids) = &self.assignees {
            let mut ids = Vec::with_capacity(raw_ids.len());
            for raw in raw_ids {
                match raw.trim().parse::<i64>() {
                    Ok(id) if !ids.contains(&id) => ids.push(id),
                    Ok(_) => {}
                    Err(_) => errors.add(
                        "assignees",
                        format!("\u{201c}{}\u{201d} is not a valid value.", raw),
                    ),
                }
            }
            changes.assignee_ids = Some(ids);
        } else if creating {
            changes.assignee_ids = Some(Vec::new());
        }

        (changes, errors)
    }
}

/// Submitted worker fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkerForm {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub position: Option<String>,
}

/// Worker fields after per-field checks. `position_id: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkerChanges {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub position_id: Option<Option<i64>>,
}

impl WorkerForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn full_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = Some(first.into());
        self.last_name = Some(last.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn position(mut self, position_id: i64) -> Self {
        self.position = Some(position_id.to_string());
        self
    }

    pub fn clean(&self, mode: FormMode) -> (WorkerChanges, FieldErrors) {
        let mut errors = FieldErrors::new();
        let mut changes = WorkerChanges::default();
        let creating = mode == FormMode::Create;

        match self.username.as_deref().map(str::trim) {
            Some("") => errors.add("username", REQUIRED),
            Some(raw) => {
                let len = raw.chars().count();
                if len > USERNAME_MAX_LEN {
                    errors.add("username", too_long(USERNAME_MAX_LEN, len));
                } else if !raw.chars().all(is_username_char) {
                    errors.add("username", INVALID_USERNAME);
                } else {
                    changes.username = Some(raw.to_string());
                }
            }
            None if creating => errors.add("username", REQUIRED),
            None => {}
        }

        for (field, raw, slot) in [
            ("first_name", &self.first_name, &mut changes.first_name),
            ("last_name", &self.last_name, &mut changes.last_name),
        ] {
            if let Some(raw) = raw {
                let value = raw.trim();
                let len = value.chars().count();
                if len > USERNAME_MAX_LEN {
                    errors.add(field, too_long(USERNAME_MAX_LEN, len));
                } else {
                    *slot = Some(value.to_string());
                }
            } else if creating {
                *slot = Some(String::new());
            }
        }

        match self.email.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() && !is_valid_email(raw) => {
                errors.add("email", INVALID_EMAIL)
            }
            Some(raw) => changes.email = Some(raw.to_string()),
            None if creating => changes.email = Some(String::new()),
            None => {}
        }

        match self.position.as_deref().map(str::trim) {
            Some("") => changes.position_id = Some(None),
            Some(raw) => match raw.parse::<i64>() {
                Ok(id) => changes.position_id = Some(Some(id)),
                Err(_) => errors.add("position", INVALID_CHOICE),
            },
            None if creating => changes.position_id = Some(None),
            None => {}
        }

        (changes, errors)
    }
}

/// Single-name form used by task types and positions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NameForm {
    pub name: Option<String>,
}

impl NameForm {
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }

    pub fn clean(&self) -> Result<String, FieldErrors> {
        match self.name.as_deref() {
            Some(raw) => clean_name(raw, NAME_MAX_LEN).map_err(|msg| FieldErrors::single("name", msg)),
            None => Err(FieldErrors::single("name", REQUIRED)),
        }
    }
}

/// Trim and length-check a required name.
fn clean_name(raw: &str, max: usize) -> Result<String, String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(REQUIRED.to_string());
    }
    let len = name.chars().count();
    if len > max {
        return Err(too_long(max, len));
    }
    Ok(name.to_string())
}

fn too_long(max: usize, len: usize) -> String {
    format!(
        "Ensure this value has at most {} characters (it has {}).",
        max, len
    )
}

fn is_username_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_')
}

/// Loose `local@domain.tld` shape check.
fn is_valid_email(raw: &str) -> bool {
    if raw.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = raw.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|l| !l.is_empty())
}

/// Parse a submitted date or date-time, keeping the date part.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 21).unwrap()
    }

    fn valid_form() -> TaskForm {
        TaskForm::new()
            .name("New Task")
            .description("A new task description.")
            .deadline(today())
            .task_type(1)
            .assignees(&[1])
    }

    #[test]
    fn valid_create_form_has_no_errors() {
        let (changes, errors) = valid_form().clean(FormMode::Create, today());
        assert!(errors.is_empty(), "{}", errors);
        assert_eq!(changes.name.as_deref(), Some("New Task"));
        assert_eq!(changes.deadline, Some(today()));
        assert_eq!(changes.priority, Some(Priority::Medium));
        assert_eq!(changes.assignee_ids, Some(vec![1]));
    }

    #[test]
    fn create_reports_every_missing_field() {
        let (_, errors) = TaskForm::new().clean(FormMode::Create, today());
        assert!(errors.contains("name"));
        assert!(errors.contains("deadline"));
        assert!(errors.contains("task_type"));
        assert!(!errors.contains("priority"));
        assert!(!errors.contains("assignees"));
    }

    #[test]
    fn update_accepts_partial_form() {
        let form = TaskForm::new().priority("urgent");
        let (changes, errors) = form.clean(FormMode::Update, today());
        assert!(errors.is_empty());
        assert_eq!(changes.priority, Some(Priority::Urgent));
        assert!(changes.name.is_none());
        assert!(changes.assignee_ids.is_none());
    }

    #[test]
    fn deadline_today_is_accepted_yesterday_rejected() {
        let yesterday = today().checked_sub_days(Days::new(1)).unwrap();
        let (_, errors) = valid_form().deadline(yesterday).clean(FormMode::Create, today());
        assert_eq!(errors.get("deadline"), Some(&[PAST_DEADLINE.to_string()][..]));

        let (changes, errors) = valid_form().clean(FormMode::Create, today());
        assert!(errors.is_empty());
        assert_eq!(changes.deadline, Some(today()));
    }

    #[test]
    fn deadline_accepts_datetime_input() {
        assert_eq!(parse_date("2024-09-21T10:20"), Some(today()));
        assert_eq!(parse_date("2024-09-21 10:20:00"), Some(today()));
        assert_eq!(parse_date("2024-09-21T10:20:00+02:00"), Some(today()));
        assert_eq!(parse_date("21/09/2024"), None);
    }

    #[test]
    fn unknown_priority_is_rejected() {
        let (_, errors) = valid_form().priority("critical").clean(FormMode::Create, today());
        assert!(errors.contains("priority"));
    }

    #[test]
    fn long_name_is_rejected() {
        let (_, errors) = valid_form()
            .name("x".repeat(64))
            .clean(FormMode::Create, today());
        assert_eq!(
            errors.get("name").unwrap()[0],
            "Ensure this value has at most 63 characters (it has 64)."
        );
    }

    #[test]
    fn blank_name_is_required() {
        let (_, errors) = valid_form().name("   ").clean(FormMode::Create, today());
        assert_eq!(errors.get("name").unwrap()[0], REQUIRED);
    }

    #[test]
    fn from_pairs_collects_assignees_and_ignores_creator() {
        let form = TaskForm::from_pairs(vec![
            ("name".to_string(), "Fix bug".to_string()),
            ("assignees".to_string(), "1".to_string()),
            ("assignees".to_string(), "2,3".to_string()),
            ("created_by".to_string(), "99".to_string()),
        ]);
        assert_eq!(form.name.as_deref(), Some("Fix bug"));
        assert_eq!(
            form.assignees,
            Some(vec!["1".to_string(), "2".to_string(), "3".to_string()])
        );
    }

    #[test]
    fn empty_assignees_value_clears_on_update() {
        let form = TaskForm::from_pairs(vec![("assignees".to_string(), String::new())]);
        let (changes, errors) = form.clean(FormMode::Update, today());
        assert!(errors.is_empty());
        assert_eq!(changes.assignee_ids, Some(vec![]));
    }

    #[test]
    fn duplicate_assignees_collapse() {
        let (changes, _) = valid_form().assignees(&[2, 2, 3]).clean(FormMode::Create, today());
        assert_eq!(changes.assignee_ids, Some(vec![2, 3]));
    }

    #[test]
    fn worker_form_validates_username_and_email() {
        let form = WorkerForm::new().username("bad name!").email("not-an-email");
        let (_, errors) = form.clean(FormMode::Create);
        assert_eq!(errors.get("username").unwrap()[0], INVALID_USERNAME);
        assert_eq!(errors.get("email").unwrap()[0], INVALID_EMAIL);

        let form = WorkerForm::new()
            .username("new.user+1")
            .full_name("New", "User")
            .email("newuser@example.com")
            .position(3);
        let (changes, errors) = form.clean(FormMode::Create);
        assert!(errors.is_empty());
        assert_eq!(changes.position_id, Some(Some(3)));
        assert_eq!(changes.first_name.as_deref(), Some("New"));
    }

    #[test]
    fn worker_form_blank_position_clears() {
        let form = WorkerForm {
            position: Some(String::new()),
            ..Default::default()
        };
        let (changes, errors) = form.clean(FormMode::Update);
        assert!(errors.is_empty());
        assert_eq!(changes.position_id, Some(None));
        assert!(changes.username.is_none());
    }

    #[test]
    fn name_form_requires_name() {
        assert!(NameForm::default().clean().is_err());
        assert_eq!(NameForm::with_name(" Bug Fix ").clean().unwrap(), "Bug Fix");
    }
}
