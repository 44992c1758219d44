//! Shell execution engine (spec §4.1/§4.2): foreground commands with
//! timeout+cancellation, plus a background job registry.

mod background;
mod detect;
mod format;
mod foreground;

pub use background::{BackgroundJobSummary, JobRegistry, JobStatus, MAX_JOB_OUTPUT_BYTES};
pub use detect::{detect_shell, ShellCommand};
pub use foreground::{ForegroundRequest, ShellEngineConfig, DEFAULT_TIMEOUT_SECS};

use std::sync::Arc;

use serde_json::json;

use crate::error::ShellError;
use crate::framing::{Tool, ToolAnnotations, ToolCall, ToolCallResult, ToolContext, ToolHandler, ToolSet};
use crate::limiter::limit_output;
use crate::sandbox::SandboxRunner;

/// Shared engine state behind the `ShellToolSet`'s tool closures, so each
/// closure clones a cheap `Arc` rather than rebuilding its own registry.
struct ShellEngineInner {
    config: ShellEngineConfig,
    jobs: JobRegistry,
    sandbox: Option<Arc<SandboxRunner>>,
}

impl ShellEngineInner {
    async fn exec_foreground(&self, ctx: &ToolContext, req: ForegroundRequest) -> Result<String, ShellError> {
        match &self.sandbox {
            Some(sandbox) => {
                let timeout = std::time::Duration::from_secs(req.timeout.unwrap_or(self.config.default_timeout_secs));
                let output: Arc<std::sync::Mutex<Vec<u8>>> = Arc::new(std::sync::Mutex::new(Vec::new()));
                tokio::select! {
                    biased;
                    _ = ctx.cancel.cancelled() => Ok(limit_output("Command cancelled")),
                    _ = tokio::time::sleep(timeout) => {
                        let raw = output.lock().expect("sandbox exec output buffer poisoned").clone();
                        let raw = String::from_utf8_lossy(&raw);
                        Ok(limit_output(&format!("Command timed out after {}s\nOutput: {raw}", timeout.as_secs())))
                    }
                    result = sandbox.exec(&req.cmd, req.cwd.as_deref(), &ctx.cancel, output.clone()) => {
                        match result {
                            Ok((output, Some(0))) => {
                                let trimmed = output.trim();
                                Ok(limit_output(if trimmed.is_empty() { "<no output>" } else { trimmed }))
                            }
                            Ok((output, code)) => Ok(limit_output(&format!(
                                "Error executing command: exit status: {}\nOutput: {output}",
                                code.map_or("unknown".to_string(), |c| c.to_string())
                            ))),
                            Err(e) => Ok(limit_output(&format!("Error executing command: {e}\nOutput: "))),
                        }
                    }
                }
            }
            None => foreground::run(&self.config, &ctx.cancel, req).await,
        }
    }
}

/// The shell toolset: owns the foreground config, the background job
/// registry, and (optionally) a sandbox runner that foreground commands are
/// delegated to instead of spawning natively.
pub struct ShellToolSet {
    inner: Arc<ShellEngineInner>,
}

impl ShellToolSet {
    pub fn new(config: ShellEngineConfig, sandbox: Option<Arc<SandboxRunner>>) -> Self {
        Self {
            inner: Arc::new(ShellEngineInner {
                config,
                jobs: JobRegistry::default(),
                sandbox,
            }),
        }
    }
}

impl ToolSet for ShellToolSet {
    fn tools(&self, _ctx: &ToolContext) -> anyhow::Result<Vec<Tool>> {
        let inner = self.inner.clone();

        let shell_exec = Tool::descriptor_only(
            "shell_exec",
            "shell",
            "Run a shell command and return its combined stdout/stderr, waiting for it to finish (or timing out).",
            json!({
                "type": "object",
                "properties": {
                    "cmd": {"type": "string", "description": "Command to run"},
                    "cwd": {"type": "string", "description": "Working directory; blank or '.' uses the configured workspace"},
                    "timeout": {"type": "integer", "description": "Timeout in seconds (default 30)"}
                },
                "required": ["cmd"],
                "additionalProperties": false
            }),
        )
        .with_annotations(ToolAnnotations {
            title: Some("Run shell command".to_string()),
            read_only_hint: false,
            destructive_hint: true,
        })
        .with_handler(Arc::new(handler(move |ctx, call| {
            let inner = inner.clone();
            let call = call.clone();
            let ctx = ctx.clone();
            Box::pin(async move {
                let req: ForegroundRequest = match call.parse_arguments() {
                    Ok(r) => r,
                    Err(e) => return Ok(ToolCallResult::error(format!("invalid arguments: {e}"))),
                };
                match inner.exec_foreground(&ctx, req).await {
                    Ok(output) => Ok(ToolCallResult::ok(output)),
                    Err(e) => Ok(ToolCallResult::error(format!("failed to execute command: {e}"))),
                }
            })
        })));

        let inner_for_start = self.inner.clone();
        let start_background_job = Tool::descriptor_only(
            "start_background_job",
            "shell",
            "Start a long-running shell command in the background and return its job id immediately.",
            json!({
                "type": "object",
                "properties": {
                    "cmd": {"type": "string"},
                    "cwd": {"type": "string"}
                },
                "required": ["cmd"],
                "additionalProperties": false
            }),
        )
        .with_handler(Arc::new(handler(move |_ctx, call| {
            let inner = inner_for_start.clone();
            let call = call.clone();
            Box::pin(async move {
                #[derive(serde::Deserialize)]
                struct Args {
                    cmd: String,
                    #[serde(default)]
                    cwd: Option<String>,
                }
                let args: Args = match call.parse_arguments() {
                    Ok(a) => a,
                    Err(e) => return Ok(ToolCallResult::error(format!("invalid arguments: {e}"))),
                };
                match inner.jobs.start(args.cmd, args.cwd, &inner.config.workspace).await {
                    Ok(id) => Ok(ToolCallResult::ok(id)),
                    Err(e) => Ok(ToolCallResult::error(format!("failed to start background job: {e}"))),
                }
            })
        })));

        let inner_for_list = self.inner.clone();
        let list_background_jobs = Tool::descriptor_only(
            "list_background_jobs",
            "shell",
            "List all background jobs with their status and elapsed time.",
            json!({"type": "object", "properties": {}, "required": [], "additionalProperties": false}),
        )
        .with_annotations(ToolAnnotations {
            read_only_hint: true,
            ..Default::default()
        })
        .with_handler(Arc::new(handler(move |_ctx, _call| {
            let inner = inner_for_list.clone();
            Box::pin(async move {
                let listed = inner.jobs.list();
                let rendered = serde_json::to_string_pretty(&listed).unwrap_or_else(|_| "[]".to_string());
                Ok(ToolCallResult::ok(limit_output(&rendered)))
            })
        })));

        let inner_for_view = self.inner.clone();
        let view_background_job = Tool::descriptor_only(
            "view_background_job",
            "shell",
            "Return the captured output of a background job so far.",
            json!({
                "type": "object",
                "properties": {"job_id": {"type": "string"}},
                "required": ["job_id"],
                "additionalProperties": false
            }),
        )
        .with_annotations(ToolAnnotations {
            read_only_hint: true,
            ..Default::default()
        })
        .with_handler(Arc::new(handler(move |_ctx, call| {
            let inner = inner_for_view.clone();
            let call = call.clone();
            Box::pin(async move {
                #[derive(serde::Deserialize)]
                struct Args {
                    job_id: String,
                }
                let args: Args = match call.parse_arguments() {
                    Ok(a) => a,
                    Err(e) => return Ok(ToolCallResult::error(format!("invalid arguments: {e}"))),
                };
                match inner.jobs.view(&args.job_id) {
                    Ok(output) => Ok(ToolCallResult::ok(limit_output(&output))),
                    Err(e) => Ok(ToolCallResult::error(e.to_string())),
                }
            })
        })));

        let inner_for_stop = self.inner.clone();
        let stop_background_job = Tool::descriptor_only(
            "stop_background_job",
            "shell",
            "Stop a running background job.",
            json!({
                "type": "object",
                "properties": {"job_id": {"type": "string"}},
                "required": ["job_id"],
                "additionalProperties": false
            }),
        )
        .with_annotations(ToolAnnotations {
            destructive_hint: true,
            ..Default::default()
        })
        .with_handler(Arc::new(handler(move |_ctx, call| {
            let inner = inner_for_stop.clone();
            let call = call.clone();
            Box::pin(async move {
                #[derive(serde::Deserialize)]
                struct Args {
                    job_id: String,
                }
                let args: Args = match call.parse_arguments() {
                    Ok(a) => a,
                    Err(e) => return Ok(ToolCallResult::error(format!("invalid arguments: {e}"))),
                };
                match inner.jobs.stop(&args.job_id) {
                    Ok(msg) => Ok(ToolCallResult::ok(msg)),
                    Err(e) => Ok(ToolCallResult::error(e.to_string())),
                }
            })
        })));

        Ok(vec![
            shell_exec,
            start_background_job,
            list_background_jobs,
            view_background_job,
            stop_background_job,
        ])
    }

    fn stop<'a>(&'a self, _ctx: &'a ToolContext) -> std::pin::Pin<Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.inner.jobs.stop_all();
            if let Some(sandbox) = &self.inner.sandbox {
                sandbox.stop().await?;
            }
            Ok(())
        })
    }
}

/// Adapt a plain closure into a `ToolHandler`.
fn handler<F>(f: F) -> impl ToolHandler
where
    F: for<'a> Fn(
            &'a ToolContext,
            &'a ToolCall,
        ) -> std::pin::Pin<Box<dyn std::future::Future<Output = anyhow::Result<ToolCallResult>> + Send + 'a>>
        + Send
        + Sync,
{
    f
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shell_toolset_publishes_five_tools() {
        let dir = tempfile::tempdir().unwrap();
        let toolset = ShellToolSet::new(
            ShellEngineConfig {
                default_timeout_secs: 30,
                workspace: dir.path().to_path_buf(),
            },
            None,
        );
        let ctx = ToolContext::new();
        let tools = toolset.tools(&ctx).unwrap();
        let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "shell_exec",
                "start_background_job",
                "list_background_jobs",
                "view_background_job",
                "stop_background_job",
            ]
        );
    }

    #[tokio::test]
    async fn shell_exec_tool_runs_and_returns_output() {
        let dir = tempfile::tempdir().unwrap();
        let toolset = ShellToolSet::new(
            ShellEngineConfig {
                default_timeout_secs: 30,
                workspace: dir.path().to_path_buf(),
            },
            None,
        );
        let ctx = ToolContext::new();
        let tools = toolset.tools(&ctx).unwrap();
        let shell_exec = tools.iter().find(|t| t.name == "shell_exec").unwrap();
        let call = ToolCall::new("shell_exec", r#"{"cmd":"echo hi there"}"#);
        let result = shell_exec.invoke(&ctx, &call).await.unwrap();
        assert!(!result.is_error);
        assert!(result.output.contains("hi there"));
    }
}
