//! End-to-end board lifecycle against a real workspace directory.

use anyhow::Result;
use chrono::NaiveDate;
use tempfile::TempDir;

use mdboard_store::storage::{NewComment, NewTask, TaskPatch, Workspace};
use mdboard_store::{Reference, ResourceKind};

#[test]
fn task_lifecycle_across_the_board() -> Result<()> {
    let dir = TempDir::new()?;
    let ws = Workspace::init(dir.path())?;

    let task = ws.board.create(NewTask::new("Fix bug"))?;
    assert_eq!(task.id, 1);
    assert_eq!(task.column, "backlog");
    assert_eq!(task.filename, "001-fix-bug.md");

    ws.board.move_task(task.id, "backlog", "in-progress")?;
    assert_eq!(ws.board.find(task.id)?.column, "in-progress");

    ws.comments.add(
        task.id,
        NewComment {
            author: Some("ana".to_string()),
            body: "Root cause found.\n".to_string(),
        },
    )?;
    assert_eq!(ws.comments.list(task.id)?.comments.len(), 1);

    // finishing: record the completion date, then move to done
    let patch = TaskPatch {
        completed: NaiveDate::from_ymd_opt(2026, 2, 8),
        ..TaskPatch::default()
    };
    let updated = ws.board.update(task.id, "in-progress", patch)?;
    assert_eq!(updated.completed, NaiveDate::from_ymd_opt(2026, 2, 8));
    assert_eq!(updated.title, "Fix bug");
    assert_eq!(updated.created, task.created);

    ws.board.move_task(task.id, "in-progress", "done")?;
    let done = ws.board.get(task.id, "done")?;
    assert_eq!(done.completed, NaiveDate::from_ymd_opt(2026, 2, 8));
    assert_eq!(done.title, "Fix bug");

    Ok(())
}

#[test]
fn hand_written_files_are_first_class() -> Result<()> {
    let dir = TempDir::new()?;
    let ws = Workspace::init(dir.path())?;

    // a file dropped in by an editor, with its own extra key
    std::fs::write(
        dir.path().join("tasks/todo/007-manual-entry.md"),
        "---\nid: 7\ntitle: Manual entry\nassignee: bo\ntags: [ops]\ncreated: 2026-01-15\nx-origin: email\n---\nImported from a thread.\n",
    )?;

    let task = ws.board.get(7, "todo")?;
    assert_eq!(task.assignee.as_deref(), Some("bo"));
    assert_eq!(task.tags, vec!["ops"]);

    // updating it keeps the foreign key intact
    let patch = TaskPatch {
        title: Some("Manual entry (triaged)".to_string()),
        ..TaskPatch::default()
    };
    ws.board.update(7, "todo", patch)?;
    let raw = std::fs::read_to_string(dir.path().join("tasks/todo/007-manual-entry.md"))?;
    assert!(raw.contains("x-origin: email"));

    // and allocation continues after it
    assert_eq!(ws.board.create(NewTask::new("Next"))?.id, 8);
    Ok(())
}

#[test]
fn poll_and_activity_track_every_store() -> Result<()> {
    let dir = TempDir::new()?;
    let ws = Workspace::init(dir.path())?;
    let idle = ws.poll()?;

    let task = ws.board.create(NewTask::new("Watch me"))?;
    let after_create = ws.poll()?;
    let delta = idle.board.compare(&after_create.board);
    assert_eq!(delta.added, vec!["backlog/001-watch-me.md"]);

    ws.board.move_task(task.id, "backlog", "review")?;
    let after_move = ws.poll()?;
    let delta = after_create.board.compare(&after_move.board);
    assert_eq!(delta.removed, vec!["backlog/001-watch-me.md"]);
    assert_eq!(delta.added, vec!["review/001-watch-me.md"]);

    // quiet workspace polls identical
    assert!(ws.poll()?.is_unchanged_from(&after_move));

    let feed = ws.activity(10)?;
    assert!(feed
        .iter()
        .any(|e| e.kind == "task" && e.path == "tasks/review/001-watch-me.md"));

    Ok(())
}

#[test]
fn cross_references_link_tasks_to_resources() -> Result<()> {
    let dir = TempDir::new()?;
    let ws = Workspace::init(dir.path())?;

    let prompt = ws
        .prompts
        .create(mdboard_store::storage::NewResource::new("Triage prompt"))?;

    let mut new = NewTask::new("Use the prompt");
    new.related = vec![Reference {
        kind: ResourceKind::Prompt,
        id: prompt.meta.id,
    }];
    let task = ws.board.create(new)?;

    let reread = ws.board.find(task.id)?;
    assert_eq!(reread.related.len(), 1);
    assert_eq!(reread.related[0].kind, ResourceKind::Prompt);
    assert_eq!(reread.related[0].id, prompt.meta.id);

    // the reference keeps pointing at the id even after deletion
    ws.prompts.delete(prompt.meta.id)?;
    assert_eq!(ws.board.find(task.id)?.related[0].id, prompt.meta.id);

    Ok(())
}

#[test]
fn checkbox_progress_is_derived_from_the_body() -> Result<()> {
    let dir = TempDir::new()?;
    let ws = Workspace::init(dir.path())?;
    let task = ws.board.create(NewTask::new("Checklist"))?;

    let patch = TaskPatch {
        body: Some("## Steps\n- [x] reproduce\n- [x] fix\n- [ ] release\n".to_string()),
        ..TaskPatch::default()
    };
    let updated = ws.board.update(task.id, "backlog", patch)?;

    assert_eq!(updated.progress.checked, 2);
    assert_eq!(updated.progress.total, 3);
    Ok(())
}
