//! Cross-component coverage of the tasks toolset's public `Tool` surface.

use cagent_tools::framing::{ToolCall, ToolContext, ToolSet};
use cagent_tools::tools::tasks::{TasksConfig, TasksToolSet};

fn toolset(dir: &std::path::Path) -> TasksToolSet {
    TasksToolSet::new(TasksConfig {
        store_path: dir.join("tasks.json"),
    })
}

#[tokio::test]
async fn priority_and_blocking_drive_list_and_next_order() {
    let dir = tempfile::tempdir().unwrap();
    let toolset = toolset(dir.path());
    let ctx = ToolContext::new();
    let tools = toolset.tools(&ctx).unwrap();
    let create = tools.iter().find(|t| t.name == "create_task").unwrap();
    let list = tools.iter().find(|t| t.name == "list_tasks").unwrap();
    let next = tools.iter().find(|t| t.name == "next_task").unwrap();
    let update = tools.iter().find(|t| t.name == "update_task").unwrap();
    let add_dep = tools.iter().find(|t| t.name == "add_dependency").unwrap();

    let a_result = create
        .invoke(&ctx, &ToolCall::new("create_task", r#"{"title":"A","priority":"high"}"#))
        .await
        .unwrap();
    assert!(!a_result.is_error);
    let a: serde_json::Value = serde_json::from_str(&a_result.output).unwrap();
    let a_id = a["id"].as_str().unwrap().to_string();

    let b_result = create
        .invoke(
            &ctx,
            &ToolCall::new(
                "create_task",
                format!(r#"{{"title":"B","priority":"critical","dependencies":["{a_id}"]}}"#),
            ),
        )
        .await
        .unwrap();
    assert!(!b_result.is_error);
    let b: serde_json::Value = serde_json::from_str(&b_result.output).unwrap();
    let b_id = b["id"].as_str().unwrap().to_string();
    assert_eq!(b["effective_status"], "blocked");

    let listed = list.invoke(&ctx, &ToolCall::new("list_tasks", "{}")).await.unwrap();
    let listed: Vec<serde_json::Value> = serde_json::from_str(&listed.output).unwrap();
    assert_eq!(listed[0]["id"], a_id, "non-blocked A sorts before blocked B");
    assert_eq!(listed[1]["id"], b_id);

    update
        .invoke(&ctx, &ToolCall::new("update_task", format!(r#"{{"id":"{a_id}","status":"done"}}"#)))
        .await
        .unwrap();

    let next_result = next.invoke(&ctx, &ToolCall::new("next_task", "{}")).await.unwrap();
    let next_task: serde_json::Value = serde_json::from_str(&next_result.output).unwrap();
    assert_eq!(next_task["id"], b_id);
    assert!(next_task["effective_status"] == "pending" || next_task["effective_status"] == "in_progress");

    let cycle = add_dep
        .invoke(&ctx, &ToolCall::new("add_dependency", format!(r#"{{"id":"{a_id}","dependency":"{b_id}"}}"#)))
        .await
        .unwrap();
    assert!(cycle.is_error);
    assert!(cycle.output.contains("cycle"), "got: {}", cycle.output);
}

#[tokio::test]
async fn deleting_a_task_removes_it_from_dependents() {
    let dir = tempfile::tempdir().unwrap();
    let toolset = toolset(dir.path());
    let ctx = ToolContext::new();
    let tools = toolset.tools(&ctx).unwrap();
    let create = tools.iter().find(|t| t.name == "create_task").unwrap();
    let delete = tools.iter().find(|t| t.name == "delete_task").unwrap();
    let get = tools.iter().find(|t| t.name == "get_task").unwrap();

    let a = create.invoke(&ctx, &ToolCall::new("create_task", r#"{"title":"A"}"#)).await.unwrap();
    let a: serde_json::Value = serde_json::from_str(&a.output).unwrap();
    let a_id = a["id"].as_str().unwrap().to_string();

    let b = create
        .invoke(&ctx, &ToolCall::new("create_task", format!(r#"{{"title":"B","dependencies":["{a_id}"]}}"#)))
        .await
        .unwrap();
    let b: serde_json::Value = serde_json::from_str(&b.output).unwrap();
    let b_id = b["id"].as_str().unwrap().to_string();

    delete.invoke(&ctx, &ToolCall::new("delete_task", format!(r#"{{"id":"{a_id}"}}"#))).await.unwrap();

    let b_after = get.invoke(&ctx, &ToolCall::new("get_task", format!(r#"{{"id":"{b_id}"}}"#))).await.unwrap();
    let b_after: serde_json::Value = serde_json::from_str(&b_after.output).unwrap();
    assert_eq!(b_after["effective_status"], "pending");
    assert!(b_after["dependencies"].as_array().unwrap().is_empty());

    let gone = get.invoke(&ctx, &ToolCall::new("get_task", format!(r#"{{"id":"{a_id}"}}"#))).await.unwrap();
    assert!(gone.is_error);
}
