mod common;

use axum::http::StatusCode;
use axum::http::header::CONTENT_DISPOSITION;

use taskdesk::store::Store;
use taskdesk::types::{Role, TaskStatus};

use common::{TestApp, body_text, flash_message, location};

fn only_task_id(app: &TestApp, user_id: i64, role: Role) -> i64 {
    let tasks = app
        .store
        .list_visible_tasks(user_id, role)
        .expect("list tasks");
    assert_eq!(tasks.len(), 1, "expected exactly one visible task");
    tasks[0].task.id
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let response = app.get("/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "OK");
}

#[tokio::test]
async fn test_pages_require_login() {
    let app = TestApp::new();

    for path in ["/", "/messages", "/notifications", "/task/1", "/projects"] {
        let response = app.get(path, None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{path}");
        assert_eq!(location(&response), "/login", "{path}");
    }
}

#[tokio::test]
async fn test_task_lifecycle() {
    let app = TestApp::new();
    let alice = app.user("alice", Role::Executor, None).await;
    let cookie = Some(alice.cookie.as_str());

    let response = app
        .post_form("/", cookie, &[("title", "Buy milk"), ("priority", "high")])
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let id = only_task_id(&app, alice.id, Role::Executor);
    let page = body_text(app.get("/", cookie).await).await;
    assert!(page.contains("Buy milk"));
    assert!(page.contains(r#"data-priority="high" data-done="false""#));

    let response = app.get(&format!("/toggle/{id}"), cookie).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let page = body_text(app.get("/", cookie).await).await;
    assert!(page.contains(r#"data-done="true""#));

    let response = app.get(&format!("/delete/{id}"), cookie).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let page = body_text(app.get("/", cookie).await).await;
    assert!(!page.contains("Buy milk"));
    let response = app.get(&format!("/task/{id}"), cookie).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_empty_title_is_rejected() {
    let app = TestApp::new();
    let alice = app.user("alice", Role::Executor, None).await;

    let response = app
        .post_form("/", Some(&alice.cookie), &[("title", "   ")])
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        flash_message(&response).as_deref(),
        Some("Task title cannot be empty")
    );
    assert!(
        app.store
            .list_visible_tasks(alice.id, Role::Executor)
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_unknown_priority_is_rejected() {
    let app = TestApp::new();
    let alice = app.user("alice", Role::Executor, None).await;

    let response = app
        .post_form(
            "/",
            Some(&alice.cookie),
            &[("title", "Ship it"), ("priority", "urgent")],
        )
        .await;
    assert_eq!(
        flash_message(&response).as_deref(),
        Some("Unknown priority 'urgent'")
    );
}

#[tokio::test]
async fn test_outsiders_cannot_touch_task() {
    let app = TestApp::new();
    let alice = app.user("alice", Role::Executor, None).await;
    let mallory = app.user("mallory", Role::Executor, None).await;

    app.post_form("/", Some(&alice.cookie), &[("title", "Private")])
        .await;
    let id = only_task_id(&app, alice.id, Role::Executor);

    for path in [
        format!("/task/{id}"),
        format!("/toggle/{id}"),
        format!("/delete/{id}"),
        format!("/download/{id}"),
    ] {
        let response = app.get(&path, Some(&mallory.cookie)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{path}");
    }

    let response = app
        .post_form(
            &format!("/task/{id}"),
            Some(&mallory.cookie),
            &[("action", "comment"), ("content", "hi")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let task = app.store.get_task(id).unwrap().expect("task survives");
    assert!(!task.done);
    assert!(app.store.list_comments(id).unwrap().is_empty());
}

#[tokio::test]
async fn test_executor_cannot_assign_to_others() {
    let app = TestApp::new();
    let alice = app.user("alice", Role::Executor, None).await;
    app.user("bob", Role::Executor, None).await;

    let response = app
        .post_form(
            "/",
            Some(&alice.cookie),
            &[("title", "Delegate"), ("assignee", "bob")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        flash_message(&response).as_deref(),
        Some("Executors can only assign tasks to themselves")
    );
    assert!(
        app.store
            .list_visible_tasks(alice.id, Role::Executor)
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_executor_keeps_own_task_on_blank_reassign() {
    let app = TestApp::new();
    let alice = app.user("alice", Role::Executor, None).await;

    app.post_form("/", Some(&alice.cookie), &[("title", "Mine")])
        .await;
    let id = only_task_id(&app, alice.id, Role::Executor);
    let path = format!("/task/{id}");

    let response = app
        .post_form(
            &path,
            Some(&alice.cookie),
            &[("action", "assign"), ("assignee", "")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), path);

    let task = app.store.get_task(id).unwrap().unwrap();
    assert_eq!(task.assigned_to, Some(alice.id));
    assert_eq!(only_task_id(&app, alice.id, Role::Executor), id);

    let page = body_text(app.get("/", Some(&alice.cookie)).await).await;
    assert!(page.contains("Mine"));

    let page = body_text(app.get(&path, Some(&alice.cookie)).await).await;
    assert!(!page.contains("(unassigned)"));
}

#[tokio::test]
async fn test_manager_assigns_within_team() {
    let app = TestApp::new();
    let boss = app.user("boss", Role::Manager, None).await;
    let report = app.user("report", Role::Executor, Some(boss.id)).await;
    app.user("stranger", Role::Executor, None).await;

    let response = app
        .post_form(
            "/",
            Some(&boss.cookie),
            &[("title", "Outside"), ("assignee", "stranger")],
        )
        .await;
    assert_eq!(
        flash_message(&response).as_deref(),
        Some("You cannot assign tasks to stranger")
    );

    let response = app
        .post_form(
            "/",
            Some(&boss.cookie),
            &[("title", "Write report"), ("assignee", "report")],
        )
        .await;
    assert_eq!(location(&response), "/");
    assert_eq!(flash_message(&response), None);

    let id = only_task_id(&app, report.id, Role::Executor);
    assert_eq!(only_task_id(&app, boss.id, Role::Manager), id);
    assert_eq!(app.store.count_unread_notifications(report.id).unwrap(), 1);

    let page = body_text(app.get("/", Some(&report.cookie)).await).await;
    assert!(page.contains("Write report"));
}

#[tokio::test]
async fn test_only_creator_deletes() {
    let app = TestApp::new();
    let boss = app.user("boss", Role::Manager, None).await;
    let report = app.user("report", Role::Executor, Some(boss.id)).await;

    app.post_form(
        "/",
        Some(&boss.cookie),
        &[("title", "Keep me"), ("assignee", "report")],
    )
    .await;
    let id = only_task_id(&app, report.id, Role::Executor);

    let response = app.get(&format!("/delete/{id}"), Some(&report.cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        flash_message(&response).as_deref(),
        Some("Only the task's creator can do that")
    );
    assert!(app.store.get_task(id).unwrap().is_some());

    // The assignee may still toggle it.
    let response = app.get(&format!("/toggle/{id}"), Some(&report.cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(app.store.get_task(id).unwrap().unwrap().done);
}

#[tokio::test]
async fn test_task_actions() {
    let app = TestApp::new();
    let boss = app.user("boss", Role::Manager, None).await;
    let report = app.user("report", Role::Executor, Some(boss.id)).await;

    app.post_form(
        "/",
        Some(&boss.cookie),
        &[("title", "Plan sprint"), ("assignee", "report")],
    )
    .await;
    let id = only_task_id(&app, report.id, Role::Executor);
    let path = format!("/task/{id}");

    let response = app
        .post_form(
            &path,
            Some(&report.cookie),
            &[("action", "comment"), ("content", "On it")],
        )
        .await;
    assert_eq!(location(&response), path);

    let response = app
        .post_form(
            &path,
            Some(&report.cookie),
            &[("action", "status"), ("status", "in_progress")],
        )
        .await;
    assert_eq!(location(&response), path);
    let task = app.store.get_task(id).unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::InProgress);

    // Editing is reserved to the creator.
    let response = app
        .post_form(
            &path,
            Some(&report.cookie),
            &[("action", "edit"), ("title", "Hijacked")],
        )
        .await;
    assert_eq!(
        flash_message(&response).as_deref(),
        Some("Only the task's creator can do that")
    );

    let response = app
        .post_form(
            &path,
            Some(&boss.cookie),
            &[
                ("action", "edit"),
                ("title", "Plan the sprint"),
                ("priority", "low"),
                ("due_date", "2031-01-15"),
            ],
        )
        .await;
    assert_eq!(location(&response), path);

    let response = app
        .post_form(&path, Some(&boss.cookie), &[("action", "assign"), ("assignee", "")])
        .await;
    assert_eq!(location(&response), path);

    let task = app.store.get_task(id).unwrap().unwrap();
    assert_eq!(task.title, "Plan the sprint");
    assert_eq!(task.assigned_to, None);

    let actions: Vec<String> = app
        .store
        .list_history(id)
        .unwrap()
        .into_iter()
        .map(|h| h.action)
        .collect();
    assert_eq!(actions, vec!["created", "status_changed", "updated", "assigned"]);

    let page = body_text(app.get(&path, Some(&boss.cookie)).await).await;
    assert!(page.contains("On it"));
    assert!(page.contains("Plan the sprint"));
}

#[tokio::test]
async fn test_attachment_upload_and_download() {
    let app = TestApp::new();
    let alice = app.user("alice", Role::Executor, None).await;

    let boundary = "XTASKDESKBOUNDARY";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"title\"\r\n\r\n\
         Quarterly report\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"../my report.txt\"\r\n\
         Content-Type: text/plain\r\n\r\n\
         hello attachment\r\n\
         --{boundary}--\r\n"
    );

    let response = app
        .post_multipart("/", &alice.cookie, boundary, body.into_bytes())
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let id = only_task_id(&app, alice.id, Role::Executor);
    let response = app.get(&format!("/download/{id}"), Some(&alice.cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "application/octet-stream"
    );
    assert_eq!(
        response.headers()[CONTENT_DISPOSITION],
        "attachment; filename=\"my_report.txt\""
    );
    assert_eq!(body_text(response).await, "hello attachment");
}

#[tokio::test]
async fn test_oversized_attachment_rejected() {
    let app = TestApp::new();
    let alice = app.user("alice", Role::Executor, None).await;

    let boundary = "XTASKDESKBOUNDARY";
    let mut body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"title\"\r\n\r\n\
         Too big\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"big.bin\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend(std::iter::repeat_n(b'x', 17 * 1024 * 1024));
    body.extend(format!("\r\n--{boundary}--\r\n").into_bytes());

    let response = app.post_multipart("/", &alice.cookie, boundary, body).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    assert_eq!(
        flash_message(&response).as_deref(),
        Some("Attachments are limited to 16 MiB")
    );
    assert!(
        app.store
            .list_visible_tasks(alice.id, Role::Executor)
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_download_without_attachment() {
    let app = TestApp::new();
    let alice = app.user("alice", Role::Executor, None).await;

    app.post_form("/", Some(&alice.cookie), &[("title", "No file")])
        .await;
    let id = only_task_id(&app, alice.id, Role::Executor);

    let response = app.get(&format!("/download/{id}"), Some(&alice.cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_index_filter_and_counters() {
    let app = TestApp::new();
    let alice = app.user("alice", Role::Executor, None).await;
    let cookie = Some(alice.cookie.as_str());

    app.post_form("/", cookie, &[("title", "Open one")]).await;
    app.post_form("/", cookie, &[("title", "Closed one")]).await;
    let closed = app
        .store
        .list_visible_tasks(alice.id, Role::Executor)
        .unwrap()
        .into_iter()
        .find(|t| t.task.title == "Closed one")
        .unwrap()
        .task
        .id;
    app.get(&format!("/toggle/{closed}"), cookie).await;

    let page = body_text(app.get("/?filter=completed", cookie).await).await;
    assert!(page.contains("Closed one"));
    assert!(!page.contains("Open one"));
    assert!(page.contains("Total: 2"));
    assert!(page.contains("Active: 1"));
    assert!(page.contains("Completed: 1"));

    let page = body_text(app.get("/?filter=active&sort=title", cookie).await).await;
    assert!(page.contains("Open one"));
    assert!(!page.contains("Closed one"));
}
