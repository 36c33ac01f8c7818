use serde::{Deserialize, Serialize};

use crate::types::{StatusCount, TaskStatus, User};

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
}

/// Fields of the task creation form. Every field is optional on the wire so
/// that a missing title is reported as a validation message.
#[derive(Debug, Default, Deserialize)]
pub struct TaskFields {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    /// Username of the assignee.
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IndexParams {
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub sort: Option<String>,
}

/// Form posted to `/task/{id}`; `action` selects which fields matter.
#[derive(Debug, Default, Deserialize)]
pub struct TaskActionForm {
    pub action: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MessageForm {
    pub receiver: String,
    pub content: String,
    #[serde(default)]
    pub task_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectForm {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Username of the managing user; defaults to the creator.
    #[serde(default)]
    pub manager: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserRoleForm {
    pub role: String,
    /// Username of the new manager; blank clears it.
    #[serde(default)]
    pub manager: Option<String>,
}

/// Username/role pair offered in assignee and recipient pickers.
#[derive(Debug, Serialize)]
pub struct UserOption {
    pub id: i64,
    pub username: String,
    pub role: String,
}

impl From<&User> for UserOption {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role.to_string(),
        }
    }
}

/// Per-member row of the statistics page.
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct MemberStats {
    pub username: String,
    pub new: i64,
    pub in_progress: i64,
    pub done: i64,
    /// Rows whose status predates the closed status set.
    pub other: i64,
    pub total: i64,
}

impl MemberStats {
    fn add(&mut self, status: &str, count: i64) {
        match TaskStatus::parse(status) {
            Some(TaskStatus::New) => self.new += count,
            Some(TaskStatus::InProgress) => self.in_progress += count,
            Some(TaskStatus::Done) => self.done += count,
            None => self.other += count,
        }
        self.total += count;
    }
}

/// Folds grouped counts into one row per member plus a totals row.
/// Members listed in `roster` appear even without tasks.
pub fn summarize_counts(roster: &[String], counts: &[StatusCount]) -> (Vec<MemberStats>, MemberStats) {
    let mut rows: Vec<MemberStats> = roster
        .iter()
        .map(|username| MemberStats {
            username: username.clone(),
            ..MemberStats::default()
        })
        .collect();
    let mut totals = MemberStats {
        username: "Total".to_string(),
        ..MemberStats::default()
    };

    for count in counts {
        let index = match rows.iter().position(|r| r.username == count.username) {
            Some(index) => index,
            None => {
                rows.push(MemberStats {
                    username: count.username.clone(),
                    ..MemberStats::default()
                });
                rows.len() - 1
            }
        };
        rows[index].add(&count.status, count.count);
        totals.add(&count.status, count.count);
    }

    rows.sort_by(|a, b| a.username.cmp(&b.username));
    (rows, totals)
}
