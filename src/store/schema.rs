pub const SCHEMA: &str = r#"
-- Accounts; passwords are argon2id PHC strings
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'executor',  -- admin | manager | executor
    manager_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Server-side sessions; id is a digest of the cookie token
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    expires_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT,
    manager_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
    created_by INTEGER REFERENCES users(id) ON DELETE SET NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL DEFAULT 'new',       -- new | in_progress | done
    priority TEXT NOT NULL DEFAULT 'medium',  -- low | medium | high
    due_date TEXT,                            -- YYYY-MM-DD
    done INTEGER NOT NULL DEFAULT 0,
    created_by INTEGER REFERENCES users(id) ON DELETE CASCADE,
    assigned_to INTEGER REFERENCES users(id) ON DELETE SET NULL,
    project_id INTEGER REFERENCES projects(id) ON DELETE SET NULL,

    -- Inline attachment
    file_data BLOB,
    file_name TEXT,

    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS comments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    task_id INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS task_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    task_id INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
    user_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
    action TEXT NOT NULL,  -- created | assigned | status_changed | updated | toggled
    details TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS notifications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    message TEXT NOT NULL,
    is_read INTEGER NOT NULL DEFAULT 0,
    link TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    sender_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    receiver_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    content TEXT NOT NULL,
    task_id INTEGER REFERENCES tasks(id) ON DELETE SET NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// Indexes are created after column upgrades so older tables have every
/// indexed column.
pub const INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);
CREATE INDEX IF NOT EXISTS idx_users_manager ON users(manager_id);
CREATE INDEX IF NOT EXISTS idx_tasks_created_by ON tasks(created_by);
CREATE INDEX IF NOT EXISTS idx_tasks_assigned_to ON tasks(assigned_to);
CREATE INDEX IF NOT EXISTS idx_comments_task ON comments(task_id);
CREATE INDEX IF NOT EXISTS idx_task_history_task ON task_history(task_id);
CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id);
CREATE INDEX IF NOT EXISTS idx_messages_sender ON messages(sender_id);
CREATE INDEX IF NOT EXISTS idx_messages_receiver ON messages(receiver_id);
"#;

/// Columns introduced after the first releases. Added on startup when an
/// older database lacks them. SQLite only accepts constant defaults here.
pub const COLUMN_UPGRADES: &[(&str, &str, &str)] = &[
    ("users", "password_hash", "TEXT NOT NULL DEFAULT ''"),
    ("users", "role", "TEXT NOT NULL DEFAULT 'executor'"),
    (
        "users",
        "manager_id",
        "INTEGER REFERENCES users(id) ON DELETE SET NULL",
    ),
    ("tasks", "description", "TEXT"),
    ("tasks", "status", "TEXT NOT NULL DEFAULT 'new'"),
    ("tasks", "priority", "TEXT NOT NULL DEFAULT 'medium'"),
    ("tasks", "due_date", "TEXT"),
    ("tasks", "done", "INTEGER NOT NULL DEFAULT 0"),
    (
        "tasks",
        "created_by",
        "INTEGER REFERENCES users(id) ON DELETE CASCADE",
    ),
    (
        "tasks",
        "assigned_to",
        "INTEGER REFERENCES users(id) ON DELETE SET NULL",
    ),
    (
        "tasks",
        "project_id",
        "INTEGER REFERENCES projects(id) ON DELETE SET NULL",
    ),
    ("tasks", "file_data", "BLOB"),
    ("tasks", "file_name", "TEXT"),
    (
        "tasks",
        "created_at",
        "TEXT NOT NULL DEFAULT '1970-01-01 00:00:00'",
    ),
    (
        "tasks",
        "updated_at",
        "TEXT NOT NULL DEFAULT '1970-01-01 00:00:00'",
    ),
    (
        "projects",
        "created_by",
        "INTEGER REFERENCES users(id) ON DELETE SET NULL",
    ),
    ("notifications", "link", "TEXT"),
    (
        "messages",
        "task_id",
        "INTEGER REFERENCES tasks(id) ON DELETE SET NULL",
    ),
];
