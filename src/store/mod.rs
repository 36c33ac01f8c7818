mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, user: &NewUser) -> Result<i64>;
    fn get_user(&self, id: i64) -> Result<Option<User>>;
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    fn list_users(&self) -> Result<Vec<User>>;
    fn list_team(&self, manager_id: i64) -> Result<Vec<User>>;
    fn update_user_role(&self, id: i64, role: Role, manager_id: Option<i64>) -> Result<()>;

    // Session operations
    fn create_session(&self, session: &Session) -> Result<()>;
    fn get_session(&self, id: &str) -> Result<Option<Session>>;
    fn delete_session(&self, id: &str) -> Result<bool>;
    fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize>;

    // Project operations
    fn create_project(&self, project: &NewProject) -> Result<i64>;
    fn get_project(&self, id: i64) -> Result<Option<Project>>;
    fn list_projects(&self) -> Result<Vec<Project>>;

    // Task operations
    /// Inserts the task together with its `created` history entry.
    fn create_task(&self, task: &NewTask) -> Result<i64>;
    fn get_task(&self, id: i64) -> Result<Option<Task>>;
    fn get_task_listing(&self, id: i64) -> Result<Option<TaskListing>>;
    fn list_visible_tasks(&self, user_id: i64, role: Role) -> Result<Vec<TaskListing>>;
    fn update_task(&self, task: &Task) -> Result<()>;
    fn set_task_status(&self, id: i64, status: TaskStatus) -> Result<()>;
    fn set_task_assignee(&self, id: i64, assignee: Option<i64>) -> Result<()>;
    /// Flips `done` and returns the new value, or `None` if the task is gone.
    fn toggle_task(&self, id: i64) -> Result<Option<bool>>;
    fn delete_task(&self, id: i64) -> Result<bool>;
    fn get_task_attachment(&self, id: i64) -> Result<Option<Attachment>>;

    // Comment operations
    fn add_comment(&self, task_id: i64, user_id: i64, content: &str) -> Result<i64>;
    fn list_comments(&self, task_id: i64) -> Result<Vec<Comment>>;

    // Task history operations
    fn add_history(
        &self,
        task_id: i64,
        user_id: i64,
        action: &str,
        details: Option<&str>,
    ) -> Result<()>;
    fn list_history(&self, task_id: i64) -> Result<Vec<TaskHistory>>;

    // Notification operations
    fn create_notification(&self, user_id: i64, message: &str, link: Option<&str>) -> Result<()>;
    fn list_notifications(&self, user_id: i64) -> Result<Vec<Notification>>;
    fn count_unread_notifications(&self, user_id: i64) -> Result<i64>;
    fn mark_notifications_read(&self, user_id: i64) -> Result<usize>;

    // Message operations
    fn create_message(&self, message: &NewMessage) -> Result<i64>;
    fn list_messages(&self, user_id: i64) -> Result<Vec<Message>>;

    /// Task counts grouped by assignee and status. `None` covers every user,
    /// `Some(manager)` only users reporting to that manager.
    fn team_status_counts(&self, manager_id: Option<i64>) -> Result<Vec<StatusCount>>;
}
