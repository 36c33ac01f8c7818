use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::Store;
use super::schema::{COLUMN_UPGRADES, INDEXES, SCHEMA};
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn parse_date(s: Option<String>) -> Option<NaiveDate> {
    let s = s?;
    match NaiveDate::parse_from_str(&s, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(e) => {
            tracing::warn!("Invalid due date in database: '{}' - {}", s, e);
            None
        }
    }
}

fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

// Older rows may hold values outside the known sets; they read back as the default.

fn parse_role(s: &str) -> Role {
    Role::parse(s).unwrap_or_else(|| {
        tracing::warn!("Unknown role in database: '{}'", s);
        Role::default()
    })
}

fn parse_status(s: &str) -> TaskStatus {
    TaskStatus::parse(s).unwrap_or_else(|| {
        tracing::warn!("Unknown task status in database: '{}'", s);
        TaskStatus::default()
    })
}

fn parse_priority(s: &str) -> Priority {
    Priority::parse(s).unwrap_or_else(|| {
        tracing::warn!("Unknown task priority in database: '{}'", s);
        Priority::default()
    })
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(names.iter().any(|name| name == column))
}

const USER_COLUMNS: &str = "id, username, password_hash, role, manager_id, created_at";

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        role: parse_role(&row.get::<_, String>(3)?),
        manager_id: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

const PROJECT_COLUMNS: &str = "id, name, description, manager_id, created_by, created_at";

fn row_to_project(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        manager_id: row.get(3)?,
        created_by: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

// Tasks created before users existed have no creator; they map to id 0 and
// are therefore visible to nobody.
const TASK_SELECT: &str = "SELECT t.id, t.title, t.description, t.status, t.priority, t.due_date,
        t.done, COALESCE(t.created_by, 0), t.assigned_to, t.project_id, t.file_name,
        t.created_at, t.updated_at, COALESCE(c.username, ''), a.username, p.name
     FROM tasks t
     LEFT JOIN users c ON c.id = t.created_by
     LEFT JOIN users a ON a.id = t.assigned_to
     LEFT JOIN projects p ON p.id = t.project_id";

fn row_to_listing(row: &Row<'_>) -> rusqlite::Result<TaskListing> {
    Ok(TaskListing {
        task: Task {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            status: parse_status(&row.get::<_, String>(3)?),
            priority: parse_priority(&row.get::<_, String>(4)?),
            due_date: parse_date(row.get(5)?),
            done: row.get(6)?,
            created_by: row.get(7)?,
            assigned_to: row.get(8)?,
            project_id: row.get(9)?,
            file_name: row.get(10)?,
            created_at: parse_datetime(&row.get::<_, String>(11)?),
            updated_at: parse_datetime(&row.get::<_, String>(12)?),
        },
        creator: row.get(13)?,
        assignee: row.get(14)?,
        project: row.get(15)?,
    })
}

fn row_to_status_count(row: &Row<'_>) -> rusqlite::Result<StatusCount> {
    Ok(StatusCount {
        username: row.get(0)?,
        status: row.get(1)?,
        count: row.get(2)?,
    })
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        let conn = self.conn();
        conn.execute_batch(SCHEMA)?;

        for (table, column, decl) in COLUMN_UPGRADES {
            if !has_column(&conn, table, column)? {
                conn.execute_batch(&format!("ALTER TABLE {table} ADD COLUMN {column} {decl}"))?;
                tracing::info!("Added missing column {}.{}", table, column);
            }
        }

        conn.execute_batch(INDEXES)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &NewUser) -> Result<i64> {
        let conn = self.conn();
        let result = conn.execute(
            "INSERT INTO users (username, password_hash, role, manager_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.username,
                user.password_hash,
                user.role.as_str(),
                user.manager_id,
                format_datetime(&Utc::now()),
            ],
        );

        match result {
            Ok(_) => Ok(conn.last_insert_rowid()),
            Err(e) if is_unique_violation(&e) => Err(Error::AlreadyExists),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            row_to_user,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
            params![username],
            row_to_user,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY username"
        ))?;

        let rows = stmt.query_map([], row_to_user)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_team(&self, manager_id: i64) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE manager_id = ?1 ORDER BY username"
        ))?;

        let rows = stmt.query_map(params![manager_id], row_to_user)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_user_role(&self, id: i64, role: Role, manager_id: Option<i64>) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE users SET role = ?1, manager_id = ?2 WHERE id = ?3",
            params![role.as_str(), manager_id, id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    // Session operations

    fn create_session(&self, session: &Session) -> Result<()> {
        self.conn().execute(
            "INSERT INTO sessions (id, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                session.id,
                session.user_id,
                format_datetime(&session.created_at),
                format_datetime(&session.expires_at),
            ],
        )?;
        Ok(())
    }

    fn get_session(&self, id: &str) -> Result<Option<Session>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, user_id, created_at, expires_at FROM sessions WHERE id = ?1",
            params![id],
            |row| {
                Ok(Session {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    created_at: parse_datetime(&row.get::<_, String>(2)?),
                    expires_at: parse_datetime(&row.get::<_, String>(3)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn delete_session(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
        let rows = self.conn().execute(
            "DELETE FROM sessions WHERE expires_at < ?1",
            params![format_datetime(&now)],
        )?;
        Ok(rows)
    }

    // Project operations

    fn create_project(&self, project: &NewProject) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO projects (name, description, manager_id, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                project.name,
                project.description,
                project.manager_id,
                project.created_by,
                format_datetime(&Utc::now()),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn get_project(&self, id: i64) -> Result<Option<Project>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
            params![id],
            row_to_project,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_projects(&self) -> Result<Vec<Project>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY name"
        ))?;

        let rows = stmt.query_map([], row_to_project)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Task operations

    fn create_task(&self, task: &NewTask) -> Result<i64> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let now = format_datetime(&Utc::now());

        tx.execute(
            "INSERT INTO tasks (title, description, status, priority, due_date, done, created_by,
                                assigned_to, project_id, file_data, file_name, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
            params![
                task.title,
                task.description,
                task.status.as_str(),
                task.priority.as_str(),
                task.due_date.as_ref().map(format_date),
                task.created_by,
                task.assigned_to,
                task.project_id,
                task.attachment.as_ref().map(|a| a.data.as_slice()),
                task.attachment.as_ref().map(|a| a.file_name.as_str()),
                now,
            ],
        )?;
        let id = tx.last_insert_rowid();

        tx.execute(
            "INSERT INTO task_history (task_id, user_id, action, details, created_at)
             VALUES (?1, ?2, 'created', ?3, ?4)",
            params![id, task.created_by, format!("Created \"{}\"", task.title), now],
        )?;

        tx.commit()?;
        Ok(id)
    }

    fn get_task(&self, id: i64) -> Result<Option<Task>> {
        Ok(self.get_task_listing(id)?.map(|listing| listing.task))
    }

    fn get_task_listing(&self, id: i64) -> Result<Option<TaskListing>> {
        let conn = self.conn();
        conn.query_row(
            &format!("{TASK_SELECT} WHERE t.id = ?1"),
            params![id],
            row_to_listing,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_visible_tasks(&self, user_id: i64, role: Role) -> Result<Vec<TaskListing>> {
        let filter = if role.is_lead() {
            "t.created_by = ?1 OR t.assigned_to = ?1"
        } else {
            "t.assigned_to = ?1"
        };

        let conn = self.conn();
        let mut stmt = conn.prepare(&format!("{TASK_SELECT} WHERE {filter} ORDER BY t.id"))?;

        let rows = stmt.query_map(params![user_id], row_to_listing)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_task(&self, task: &Task) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE tasks SET title = ?1, description = ?2, priority = ?3, due_date = ?4,
                              project_id = ?5, updated_at = ?6
             WHERE id = ?7",
            params![
                task.title,
                task.description,
                task.priority.as_str(),
                task.due_date.as_ref().map(format_date),
                task.project_id,
                format_datetime(&Utc::now()),
                task.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn set_task_status(&self, id: i64, status: TaskStatus) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE tasks SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), format_datetime(&Utc::now()), id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn set_task_assignee(&self, id: i64, assignee: Option<i64>) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE tasks SET assigned_to = ?1, updated_at = ?2 WHERE id = ?3",
            params![assignee, format_datetime(&Utc::now()), id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn toggle_task(&self, id: i64) -> Result<Option<bool>> {
        let conn = self.conn();
        conn.query_row(
            "UPDATE tasks SET done = NOT done, updated_at = ?1 WHERE id = ?2 RETURNING done",
            params![format_datetime(&Utc::now()), id],
            |row| row.get(0),
        )
        .optional()
        .map_err(Error::from)
    }

    fn delete_task(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn get_task_attachment(&self, id: i64) -> Result<Option<Attachment>> {
        let conn = self.conn();
        let row: Option<(Option<String>, Option<Vec<u8>>)> = conn
            .query_row(
                "SELECT file_name, file_data FROM tasks WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        Ok(match row {
            Some((Some(file_name), Some(data))) => Some(Attachment { file_name, data }),
            _ => None,
        })
    }

    // Comment operations

    fn add_comment(&self, task_id: i64, user_id: i64, content: &str) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO comments (task_id, user_id, content, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![task_id, user_id, content, format_datetime(&Utc::now())],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn list_comments(&self, task_id: i64) -> Result<Vec<Comment>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT c.id, c.task_id, c.user_id, u.username, c.content, c.created_at
             FROM comments c JOIN users u ON u.id = c.user_id
             WHERE c.task_id = ?1 ORDER BY c.id",
        )?;

        let rows = stmt.query_map(params![task_id], |row| {
            Ok(Comment {
                id: row.get(0)?,
                task_id: row.get(1)?,
                user_id: row.get(2)?,
                author: row.get(3)?,
                content: row.get(4)?,
                created_at: parse_datetime(&row.get::<_, String>(5)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Task history operations

    fn add_history(
        &self,
        task_id: i64,
        user_id: i64,
        action: &str,
        details: Option<&str>,
    ) -> Result<()> {
        self.conn().execute(
            "INSERT INTO task_history (task_id, user_id, action, details, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![task_id, user_id, action, details, format_datetime(&Utc::now())],
        )?;
        Ok(())
    }

    fn list_history(&self, task_id: i64) -> Result<Vec<TaskHistory>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT h.id, h.task_id, h.user_id, u.username, h.action, h.details, h.created_at
             FROM task_history h LEFT JOIN users u ON u.id = h.user_id
             WHERE h.task_id = ?1 ORDER BY h.id",
        )?;

        let rows = stmt.query_map(params![task_id], |row| {
            Ok(TaskHistory {
                id: row.get(0)?,
                task_id: row.get(1)?,
                user_id: row.get(2)?,
                actor: row.get(3)?,
                action: row.get(4)?,
                details: row.get(5)?,
                created_at: parse_datetime(&row.get::<_, String>(6)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Notification operations

    fn create_notification(&self, user_id: i64, message: &str, link: Option<&str>) -> Result<()> {
        self.conn().execute(
            "INSERT INTO notifications (user_id, message, is_read, link, created_at)
             VALUES (?1, ?2, 0, ?3, ?4)",
            params![user_id, message, link, format_datetime(&Utc::now())],
        )?;
        Ok(())
    }

    fn list_notifications(&self, user_id: i64) -> Result<Vec<Notification>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, message, is_read, link, created_at
             FROM notifications WHERE user_id = ?1 ORDER BY id DESC",
        )?;

        let rows = stmt.query_map(params![user_id], |row| {
            Ok(Notification {
                id: row.get(0)?,
                user_id: row.get(1)?,
                message: row.get(2)?,
                is_read: row.get(3)?,
                link: row.get(4)?,
                created_at: parse_datetime(&row.get::<_, String>(5)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn count_unread_notifications(&self, user_id: i64) -> Result<i64> {
        let conn = self.conn();
        conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0",
            params![user_id],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }

    fn mark_notifications_read(&self, user_id: i64) -> Result<usize> {
        let rows = self.conn().execute(
            "UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND is_read = 0",
            params![user_id],
        )?;
        Ok(rows)
    }

    // Message operations

    fn create_message(&self, message: &NewMessage) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO messages (sender_id, receiver_id, content, task_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                message.sender_id,
                message.receiver_id,
                message.content,
                message.task_id,
                format_datetime(&Utc::now()),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn list_messages(&self, user_id: i64) -> Result<Vec<Message>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT m.id, m.sender_id, s.username, m.receiver_id, r.username, m.content,
                    m.task_id, m.created_at
             FROM messages m
             JOIN users s ON s.id = m.sender_id
             JOIN users r ON r.id = m.receiver_id
             WHERE m.sender_id = ?1 OR m.receiver_id = ?1
             ORDER BY m.id DESC",
        )?;

        let rows = stmt.query_map(params![user_id], |row| {
            Ok(Message {
                id: row.get(0)?,
                sender_id: row.get(1)?,
                sender: row.get(2)?,
                receiver_id: row.get(3)?,
                receiver: row.get(4)?,
                content: row.get(5)?,
                task_id: row.get(6)?,
                created_at: parse_datetime(&row.get::<_, String>(7)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn team_status_counts(&self, manager_id: Option<i64>) -> Result<Vec<StatusCount>> {
        let conn = self.conn();

        let rows = match manager_id {
            Some(manager_id) => {
                let mut stmt = conn.prepare(
                    "SELECT u.username, t.status, COUNT(*)
                     FROM tasks t JOIN users u ON u.id = t.assigned_to
                     WHERE u.manager_id = ?1
                     GROUP BY u.username, t.status
                     ORDER BY u.username, t.status",
                )?;
                stmt.query_map(params![manager_id], row_to_status_count)?
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT u.username, t.status, COUNT(*)
                     FROM tasks t JOIN users u ON u.id = t.assigned_to
                     GROUP BY u.username, t.status
                     ORDER BY u.username, t.status",
                )?;
                stmt.query_map([], row_to_status_count)?
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
        };

        Ok(rows)
    }
}
