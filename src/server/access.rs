use super::AppState;
use super::dto::UserOption;
use super::response::{PageError, StoreOptionExt, StoreResultExt};
use super::validation::non_blank;
use crate::types::{Role, Task, User};

/// Loads a task the user created or is assigned to. Anything else answers
/// 404 so that other users' task ids are not disclosed.
pub fn load_accessible_task(state: &AppState, user: &User, id: i64) -> Result<Task, PageError> {
    let task = state
        .store
        .get_task(id)
        .page_err("Failed to load task")?
        .filter(|task| task.is_participant(user.id))
        .or_not_found("Task not found")?;

    Ok(task)
}

/// Rejects actions reserved to the task's creator.
pub fn require_creator(user: &User, task: &Task, back: &str) -> Result<(), PageError> {
    if task.created_by != user.id {
        return Err(PageError::flash(
            back,
            "Only the task's creator can do that",
        ));
    }
    Ok(())
}

/// Whether `actor` may hand a task to `target`.
#[must_use]
pub fn can_assign(actor: &User, target: &User) -> bool {
    if actor.id == target.id {
        return true;
    }
    match actor.role {
        Role::Admin => true,
        Role::Manager => target.manager_id == Some(actor.id),
        Role::Executor => false,
    }
}

/// Assignee for a blank picker. Executors only see tasks assigned to them,
/// so their tasks stay with them; leads may leave a task unassigned.
fn blank_assignee(actor: &User) -> Option<User> {
    match actor.role {
        Role::Executor => Some(actor.clone()),
        Role::Manager | Role::Admin => None,
    }
}

/// Resolves an assignee username from a form. A blank value falls back to
/// [`blank_assignee`]; unknown users and assignments outside the actor's
/// reach redirect to `back` with a message.
pub fn resolve_assignee(
    state: &AppState,
    actor: &User,
    username: Option<&str>,
    back: &str,
) -> Result<Option<User>, PageError> {
    let Some(username) = non_blank(username) else {
        return Ok(blank_assignee(actor));
    };

    let target = state
        .store
        .get_user_by_username(username)
        .page_err("Failed to look up assignee")?
        .ok_or_else(|| PageError::flash(back, format!("Unknown user '{username}'")))?;

    if !can_assign(actor, &target) {
        return Err(PageError::flash(
            back,
            match actor.role {
                Role::Executor => "Executors can only assign tasks to themselves".to_string(),
                _ => format!("You cannot assign tasks to {}", target.username),
            },
        ));
    }

    Ok(Some(target))
}

/// Users the actor may pick as an assignee, the actor first.
pub fn assignable_users(state: &AppState, actor: &User) -> Result<Vec<UserOption>, PageError> {
    let others = match actor.role {
        Role::Admin => state.store.list_users().page_err("Failed to list users")?,
        Role::Manager => state
            .store
            .list_team(actor.id)
            .page_err("Failed to list team")?,
        Role::Executor => Vec::new(),
    };

    let mut options = vec![UserOption::from(actor)];
    options.extend(
        others
            .iter()
            .filter(|user| user.id != actor.id)
            .map(UserOption::from),
    );
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(id: i64, role: Role, manager_id: Option<i64>) -> User {
        User {
            id,
            username: format!("user{id}"),
            password_hash: String::new(),
            role,
            manager_id,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_everyone_can_assign_to_self() {
        for role in Role::ALL {
            let actor = user(1, role, None);
            assert!(can_assign(&actor, &actor));
        }
    }

    #[test]
    fn test_manager_assigns_within_team() {
        let manager = user(1, Role::Manager, None);
        let report = user(2, Role::Executor, Some(1));
        let stranger = user(3, Role::Executor, Some(9));

        assert!(can_assign(&manager, &report));
        assert!(!can_assign(&manager, &stranger));
    }

    #[test]
    fn test_blank_assignee_by_role() {
        let executor = user(1, Role::Executor, Some(2));
        assert_eq!(blank_assignee(&executor).map(|u| u.id), Some(1));
        assert!(blank_assignee(&user(2, Role::Manager, None)).is_none());
        assert!(blank_assignee(&user(3, Role::Admin, None)).is_none());
    }

    #[test]
    fn test_admin_and_executor_reach() {
        let admin = user(1, Role::Admin, None);
        let executor = user(2, Role::Executor, Some(5));
        let other = user(3, Role::Executor, None);

        assert!(can_assign(&admin, &other));
        assert!(!can_assign(&executor, &other));
        assert!(!can_assign(&executor, &admin));
    }
}
