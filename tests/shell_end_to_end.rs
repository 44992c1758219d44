//! Cross-component coverage of the shell toolset's public `Tool` surface,
//! exercising the end-to-end scenarios a host runtime would actually drive.

use cagent_tools::framing::{ToolCall, ToolContext, ToolSet};
use cagent_tools::shell::{ShellEngineConfig, ShellToolSet};

fn toolset(workspace: &std::path::Path) -> ShellToolSet {
    ShellToolSet::new(
        ShellEngineConfig {
            default_timeout_secs: 30,
            workspace: workspace.to_path_buf(),
        },
        None,
    )
}

#[tokio::test]
async fn foreground_echo_round_trips_through_the_tool_interface() {
    let dir = tempfile::tempdir().unwrap();
    let toolset = toolset(dir.path());
    let ctx = ToolContext::new();
    let tools = toolset.tools(&ctx).unwrap();
    let shell_exec = tools.iter().find(|t| t.name == "shell_exec").unwrap();

    let call = ToolCall::new("shell_exec", r#"{"cmd":"echo hello","cwd":""}"#);
    let result = shell_exec.invoke(&ctx, &call).await.unwrap();
    assert!(!result.is_error);
    assert!(result.output.contains("hello"));
}

#[tokio::test]
async fn foreground_timeout_reports_configured_duration() {
    let dir = tempfile::tempdir().unwrap();
    let toolset = toolset(dir.path());
    let ctx = ToolContext::new();
    let tools = toolset.tools(&ctx).unwrap();
    let shell_exec = tools.iter().find(|t| t.name == "shell_exec").unwrap();

    let call = ToolCall::new("shell_exec", r#"{"cmd":"sleep 5","cwd":"","timeout":1}"#);
    let result = shell_exec.invoke(&ctx, &call).await.unwrap();
    assert!(result.output.starts_with("Command timed out after 1s"), "got: {}", result.output);
}

#[tokio::test]
async fn background_job_lifecycle_start_list_stop() {
    let dir = tempfile::tempdir().unwrap();
    let toolset = toolset(dir.path());
    let ctx = ToolContext::new();
    let tools = toolset.tools(&ctx).unwrap();
    let start = tools.iter().find(|t| t.name == "start_background_job").unwrap();
    let list = tools.iter().find(|t| t.name == "list_background_jobs").unwrap();
    let stop = tools.iter().find(|t| t.name == "stop_background_job").unwrap();

    let start_result = start.invoke(&ctx, &ToolCall::new("start_background_job", r#"{"cmd":"sleep 10"}"#)).await.unwrap();
    assert!(!start_result.is_error);
    let job_id = start_result.output.trim().to_string();
    assert!(job_id.starts_with("job_"), "got: {job_id}");

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let list_result = list.invoke(&ctx, &ToolCall::new("list_background_jobs", "{}")).await.unwrap();
    assert!(list_result.output.contains(&job_id));
    assert!(list_result.output.contains("running"));

    let stop_call = ToolCall::new("stop_background_job", format!(r#"{{"job_id":"{job_id}"}}"#));
    let stop_result = stop.invoke(&ctx, &stop_call).await.unwrap();
    assert!(!stop_result.is_error);
    assert!(stop_result.output.contains("stopped"), "got: {}", stop_result.output);

    let second_stop = stop.invoke(&ctx, &stop_call).await.unwrap();
    assert!(second_stop.is_error);
}

#[tokio::test]
async fn toolset_stop_tears_down_running_jobs() {
    let dir = tempfile::tempdir().unwrap();
    let toolset = toolset(dir.path());
    let ctx = ToolContext::new();
    let tools = toolset.tools(&ctx).unwrap();
    let start = tools.iter().find(|t| t.name == "start_background_job").unwrap();
    let start_result = start.invoke(&ctx, &ToolCall::new("start_background_job", r#"{"cmd":"sleep 10"}"#)).await.unwrap();
    assert!(!start_result.is_error);

    toolset.stop(&ctx).await.unwrap();
}
