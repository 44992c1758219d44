//! Persistent task graph toolset (spec §4.7).
//!
//! Grounds on the teacher's "single entry point behind a mutex, reload from
//! disk before every mutation" pattern (`safety/mod.rs`'s `SafetyLayer`
//! serializing all command execution through one guarded structure) applied
//! here to a JSON-file-backed task store instead of an in-memory command
//! filter.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::TasksError;
use crate::framing::{Tool, ToolAnnotations, ToolCallResult, ToolContext, ToolHandler, ToolSet};
use crate::limiter::limit_output;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    fn rank(self) -> u8 {
        match self {
            Priority::Critical => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }

    fn parse(s: &str) -> Result<Self, TasksError> {
        match s {
            "critical" => Ok(Priority::Critical),
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(TasksError::InvalidField {
                field: "priority".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    InProgress,
    Done,
    Blocked,
}

impl Status {
    fn parse(s: &str) -> Result<Self, TasksError> {
        match s {
            "pending" => Ok(Status::Pending),
            "in_progress" => Ok(Status::InProgress),
            "done" => Ok(Status::Done),
            "blocked" => Ok(Status::Blocked),
            other => Err(TasksError::InvalidField {
                field: "status".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::Pending
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: Status,
    pub dependencies: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// `done` short-circuits; otherwise any *existing* dependency that is
    /// not done makes this task `blocked`; otherwise the stored status.
    pub fn effective_status(&self, all: &HashMap<String, Task>) -> Status {
        if self.status == Status::Done {
            return Status::Done;
        }
        let blocked = self
            .dependencies
            .iter()
            .filter_map(|d| all.get(d))
            .any(|dep| dep.status != Status::Done);
        if blocked {
            Status::Blocked
        } else {
            self.status
        }
    }
}

/// A task plus its derived effective status, the shape returned to the
/// agent by every read-facing tool.
#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    pub effective_status: Status,
}

#[derive(Debug, Clone)]
pub struct TasksConfig {
    pub store_path: PathBuf,
}

#[derive(Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    tasks: HashMap<String, Task>,
}

/// Walk the proposed dependency ids (and transitively, each visited node's
/// own dependencies); if the walk ever reaches `target`, committing those
/// dependencies onto `target` would create a cycle.
fn creates_cycle(tasks: &HashMap<String, Task>, target: &str, proposed: &[String]) -> bool {
    fn visit(tasks: &HashMap<String, Task>, current: &str, target: &str, seen: &mut std::collections::HashSet<String>) -> bool {
        if current == target {
            return true;
        }
        if !seen.insert(current.to_string()) {
            return false;
        }
        tasks
            .get(current)
            .map(|t| t.dependencies.iter().any(|d| visit(tasks, d, target, seen)))
            .unwrap_or(false)
    }
    let mut seen = std::collections::HashSet::new();
    proposed.iter().any(|d| visit(tasks, d, target, &mut seen))
}

/// Lexically resolve `rel` under `base`, rejecting empty/absolute paths and
/// anything that escapes `base` once normalized.
fn resolve_under_base(base: &Path, rel: &str) -> Result<PathBuf, TasksError> {
    if rel.is_empty() || Path::new(rel).is_absolute() || rel.split('/').any(|seg| seg == "..") {
        return Err(TasksError::PathEscape { path: rel.to_string() });
    }
    let joined = base.join(rel);
    let cleaned = lexically_clean(&joined);
    if !cleaned.starts_with(base) {
        return Err(TasksError::PathEscape { path: rel.to_string() });
    }
    Ok(cleaned)
}

fn lexically_clean(path: &Path) -> PathBuf {
    let mut out = Vec::new();
    for component in path.components() {
        match component {
            std::path::Component::ParentDir => {
                out.pop();
            }
            std::path::Component::CurDir => {}
            other => out.push(other),
        }
    }
    out.into_iter().collect()
}

/// The persistent task store: every public operation reloads from disk,
/// mutates in memory, and rewrites the whole file before releasing the
/// per-instance lock, per spec §4.7.
pub struct TaskStore {
    path: PathBuf,
    base_path: PathBuf,
    lock: Mutex<()>,
}

impl TaskStore {
    pub fn new(config: TasksConfig) -> Self {
        let base_path = config
            .store_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            path: config.store_path,
            base_path,
            lock: Mutex::new(()),
        }
    }

    fn load(&self) -> HashMap<String, Task> {
        match std::fs::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice::<StoreFile>(&bytes) {
                Ok(file) => file.tasks,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to decode task store; treating as empty");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read task store; treating as empty");
                HashMap::new()
            }
        }
    }

    fn save(&self, tasks: &HashMap<String, Task>) -> Result<(), TasksError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
                set_dir_mode(parent, 0o700);
            }
        }
        let rendered = serde_json::to_string_pretty(&StoreFile { tasks: tasks.clone() })?;
        std::fs::write(&self.path, rendered)?;
        set_file_mode(&self.path, 0o644);
        Ok(())
    }

    /// Run `f` against a freshly reloaded copy of the store, then persist
    /// the result. The whole sequence is serialized by `lock`.
    fn with_store<T>(&self, f: impl FnOnce(&mut HashMap<String, Task>) -> Result<T, TasksError>) -> Result<T, TasksError> {
        let _guard = self.lock.lock().expect("task store mutex poisoned");
        let mut tasks = self.load();
        let result = f(&mut tasks)?;
        self.save(&tasks)?;
        Ok(result)
    }

    fn with_store_readonly<T>(&self, f: impl FnOnce(&HashMap<String, Task>) -> T) -> T {
        let _guard = self.lock.lock().expect("task store mutex poisoned");
        let tasks = self.load();
        f(&tasks)
    }

    pub fn create(&self, args: CreateTaskArgs) -> Result<TaskView, TasksError> {
        self.with_store(|tasks| {
            let description = match args.path.as_deref().filter(|p| !p.is_empty()) {
                Some(path) => {
                    let resolved = resolve_under_base(&self.base_path, path)?;
                    std::fs::read_to_string(resolved)?
                }
                None => args.description.unwrap_or_default(),
            };

            for dep in &args.dependencies {
                if !tasks.contains_key(dep) {
                    return Err(TasksError::DependencyNotFound { id: dep.clone() });
                }
            }

            let now = Utc::now();
            let priority = match args.priority.as_deref().filter(|p| !p.is_empty()) {
                Some(p) => Priority::parse(p)?,
                None => Priority::default(),
            };
            let status = match args.status.as_deref().filter(|s| !s.is_empty()) {
                Some(s) => Status::parse(s)?,
                None => Status::default(),
            };

            let task = Task {
                id: Uuid::new_v4().to_string(),
                title: args.title,
                description,
                priority,
                status,
                dependencies: args.dependencies,
                created_at: now,
                updated_at: now,
            };
            let view = TaskView {
                task: task.clone(),
                effective_status: task.effective_status(tasks),
            };
            tasks.insert(task.id.clone(), task);
            Ok(view)
        })
    }

    pub fn get(&self, id: &str) -> Result<TaskView, TasksError> {
        self.with_store_readonly(|tasks| {
            tasks
                .get(id)
                .map(|t| TaskView {
                    task: t.clone(),
                    effective_status: t.effective_status(tasks),
                })
                .ok_or_else(|| TasksError::NotFound { id: id.to_string() })
        })
    }

    pub fn update(&self, id: &str, args: UpdateTaskArgs) -> Result<TaskView, TasksError> {
        self.with_store(|tasks| {
            if let Some(deps) = &args.dependencies {
                for dep in deps {
                    if !tasks.contains_key(dep) {
                        return Err(TasksError::DependencyNotFound { id: dep.clone() });
                    }
                }
                if creates_cycle(tasks, id, deps) {
                    return Err(TasksError::CycleDetected);
                }
            }

            if !tasks.contains_key(id) {
                return Err(TasksError::NotFound { id: id.to_string() });
            }

            let priority = match args.priority.as_deref().filter(|p| !p.is_empty()) {
                Some(p) => Some(Priority::parse(p)?),
                None => None,
            };
            let status = match args.status.as_deref().filter(|s| !s.is_empty()) {
                Some(s) => Some(Status::parse(s)?),
                None => None,
            };

            let task = tasks.get_mut(id).expect("checked above");
            if let Some(title) = args.title.filter(|t| !t.is_empty()) {
                task.title = title;
            }
            if let Some(description) = args.description.filter(|d| !d.is_empty()) {
                task.description = description;
            }
            if let Some(priority) = priority {
                task.priority = priority;
            }
            if let Some(status) = status {
                task.status = status;
            }
            if let Some(deps) = args.dependencies {
                task.dependencies = deps;
            }
            task.updated_at = Utc::now();

            let task = tasks.get(id).expect("checked above").clone();
            Ok(TaskView {
                effective_status: task.effective_status(tasks),
                task,
            })
        })
    }

    pub fn delete(&self, id: &str) -> Result<(), TasksError> {
        self.with_store(|tasks| {
            if tasks.remove(id).is_none() {
                return Err(TasksError::NotFound { id: id.to_string() });
            }
            for task in tasks.values_mut() {
                task.dependencies.retain(|d| d != id);
            }
            Ok(())
        })
    }

    pub fn list(&self, status: Option<&str>, priority: Option<&str>) -> Result<Vec<TaskView>, TasksError> {
        let status_filter = status.filter(|s| !s.is_empty()).map(Status::parse).transpose()?;
        let priority_filter = priority.filter(|p| !p.is_empty()).map(Priority::parse).transpose()?;
        Ok(self.with_store_readonly(|tasks| {
            let mut views: Vec<TaskView> = tasks
                .values()
                .map(|t| TaskView {
                    task: t.clone(),
                    effective_status: t.effective_status(tasks),
                })
                .filter(|v| status_filter.is_none_or(|s| v.effective_status == s))
                .filter(|v| priority_filter.is_none_or(|p| v.task.priority == p))
                .collect();
            sort_views(&mut views);
            views
        }))
    }

    pub fn next(&self) -> Result<Option<TaskView>, TasksError> {
        Ok(self.with_store_readonly(|tasks| {
            let mut views: Vec<TaskView> = tasks
                .values()
                .map(|t| TaskView {
                    task: t.clone(),
                    effective_status: t.effective_status(tasks),
                })
                .collect();
            sort_views(&mut views);
            views
                .into_iter()
                .find(|v| !matches!(v.effective_status, Status::Done | Status::Blocked))
        }))
    }

    pub fn add_dependency(&self, id: &str, dependency: &str) -> Result<TaskView, TasksError> {
        self.with_store(|tasks| {
            if !tasks.contains_key(id) {
                return Err(TasksError::NotFound { id: id.to_string() });
            }
            if !tasks.contains_key(dependency) {
                return Err(TasksError::DependencyNotFound {
                    id: dependency.to_string(),
                });
            }
            if tasks[id].dependencies.iter().any(|d| d == dependency) {
                return Err(TasksError::DuplicateDependency);
            }
            let mut proposed = tasks[id].dependencies.clone();
            proposed.push(dependency.to_string());
            if creates_cycle(tasks, id, &proposed) {
                return Err(TasksError::CycleDetected);
            }
            let task = tasks.get_mut(id).expect("checked above");
            task.dependencies.push(dependency.to_string());
            task.updated_at = Utc::now();
            let task = tasks.get(id).expect("checked above").clone();
            Ok(TaskView {
                effective_status: task.effective_status(tasks),
                task,
            })
        })
    }

    pub fn remove_dependency(&self, id: &str, dependency: &str) -> Result<TaskView, TasksError> {
        self.with_store(|tasks| {
            if !tasks.contains_key(id) {
                return Err(TasksError::NotFound { id: id.to_string() });
            }
            let task = tasks.get_mut(id).expect("checked above");
            task.dependencies.retain(|d| d != dependency);
            task.updated_at = Utc::now();
            let task = tasks.get(id).expect("checked above").clone();
            Ok(TaskView {
                effective_status: task.effective_status(tasks),
                task,
            })
        })
    }
}

#[cfg(unix)]
fn set_file_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode));
}
#[cfg(not(unix))]
fn set_file_mode(_path: &Path, _mode: u32) {}

#[cfg(unix)]
fn set_dir_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode));
}
#[cfg(not(unix))]
fn set_dir_mode(_path: &Path, _mode: u32) {}

/// Non-blocked first, ascending priority rank, ties by ascending
/// `created_at`; stable.
fn sort_views(views: &mut [TaskView]) {
    views.sort_by(|a, b| {
        let a_blocked = a.effective_status == Status::Blocked;
        let b_blocked = b.effective_status == Status::Blocked;
        a_blocked
            .cmp(&b_blocked)
            .then_with(|| a.task.priority.rank().cmp(&b.task.priority.rank()))
            .then_with(|| a.task.created_at.cmp(&b.task.created_at))
    });
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTaskArgs {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTaskArgs {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub dependencies: Option<Vec<String>>,
}

/// The tasks toolset: `create_task`, `get_task`, `update_task`,
/// `delete_task`, `list_tasks`, `next_task`, `add_dependency`,
/// `remove_dependency`.
pub struct TasksToolSet {
    store: Arc<TaskStore>,
}

impl TasksToolSet {
    pub fn new(config: TasksConfig) -> Self {
        Self {
            store: Arc::new(TaskStore::new(config)),
        }
    }
}

macro_rules! json_tool {
    ($name:expr, $description:expr, $params:expr, $store:expr, $body:expr) => {{
        let store = $store.clone();
        Tool::descriptor_only($name, "tasks", $description, $params).with_handler(Arc::new(handler(move |_ctx, call| {
            let store = store.clone();
            let call = call.clone();
            Box::pin(async move { ($body)(store, call) })
        })))
    }};
}

impl ToolSet for TasksToolSet {
    fn tools(&self, _ctx: &ToolContext) -> anyhow::Result<Vec<Tool>> {
        let store = self.store.clone();

        let create_task = json_tool!(
            "create_task",
            "Create a new task with an optional priority, status, and dependency list.",
            json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string"},
                    "description": {"type": "string"},
                    "path": {"type": "string", "description": "Load the description from a file under the task store directory instead of inline"},
                    "priority": {"type": "string", "enum": ["critical", "high", "medium", "low"]},
                    "status": {"type": "string", "enum": ["pending", "in_progress", "done", "blocked"]},
                    "dependencies": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["title"],
                "additionalProperties": false
            }),
            store,
            |store: Arc<TaskStore>, call: crate::framing::ToolCall| {
                let args: CreateTaskArgs = match call.parse_arguments() {
                    Ok(a) => a,
                    Err(e) => return Ok(ToolCallResult::error(format!("invalid arguments: {e}"))),
                };
                render_result(store.create(args))
            }
        );

        let get_task = json_tool!(
            "get_task",
            "Fetch a task by id, including its derived effective status.",
            json!({
                "type": "object",
                "properties": {"id": {"type": "string"}},
                "required": ["id"],
                "additionalProperties": false
            }),
            store,
            |store: Arc<TaskStore>, call: crate::framing::ToolCall| {
                #[derive(Deserialize)]
                struct Args {
                    id: String,
                }
                let args: Args = match call.parse_arguments() {
                    Ok(a) => a,
                    Err(e) => return Ok(ToolCallResult::error(format!("invalid arguments: {e}"))),
                };
                render_result(store.get(&args.id))
            }
        )
        .with_annotations(ToolAnnotations {
            read_only_hint: true,
            ..Default::default()
        });

        let update_task = json_tool!(
            "update_task",
            "Partially update a task. An explicit empty string leaves that field unchanged; supplying `dependencies` replaces the full set.",
            json!({
                "type": "object",
                "properties": {
                    "id": {"type": "string"},
                    "title": {"type": "string"},
                    "description": {"type": "string"},
                    "priority": {"type": "string", "enum": ["critical", "high", "medium", "low"]},
                    "status": {"type": "string", "enum": ["pending", "in_progress", "done", "blocked"]},
                    "dependencies": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["id"],
                "additionalProperties": false
            }),
            store,
            |store: Arc<TaskStore>, call: crate::framing::ToolCall| {
                #[derive(Deserialize)]
                struct Args {
                    id: String,
                    #[serde(flatten)]
                    update: UpdateTaskArgs,
                }
                let args: Args = match call.parse_arguments() {
                    Ok(a) => a,
                    Err(e) => return Ok(ToolCallResult::error(format!("invalid arguments: {e}"))),
                };
                render_result(store.update(&args.id, args.update))
            }
        );

        let delete_task = json_tool!(
            "delete_task",
            "Delete a task, removing its id from every other task's dependency list first.",
            json!({
                "type": "object",
                "properties": {"id": {"type": "string"}},
                "required": ["id"],
                "additionalProperties": false
            }),
            store,
            |store: Arc<TaskStore>, call: crate::framing::ToolCall| {
                #[derive(Deserialize)]
                struct Args {
                    id: String,
                }
                let args: Args = match call.parse_arguments() {
                    Ok(a) => a,
                    Err(e) => return Ok(ToolCallResult::error(format!("invalid arguments: {e}"))),
                };
                match store.delete(&args.id) {
                    Ok(()) => Ok(ToolCallResult::ok(format!("Task {} deleted", args.id))),
                    Err(e) => Ok(ToolCallResult::error(e.to_string())),
                }
            }
        )
        .with_annotations(ToolAnnotations {
            destructive_hint: true,
            ..Default::default()
        });

        let list_tasks = json_tool!(
            "list_tasks",
            "List tasks sorted by actionability (non-blocked first, then priority, then creation time), with optional status/priority filters.",
            json!({
                "type": "object",
                "properties": {
                    "status": {"type": "string", "enum": ["pending", "in_progress", "done", "blocked"]},
                    "priority": {"type": "string", "enum": ["critical", "high", "medium", "low"]}
                },
                "required": [],
                "additionalProperties": false
            }),
            store,
            |store: Arc<TaskStore>, call: crate::framing::ToolCall| {
                #[derive(Deserialize, Default)]
                struct Args {
                    #[serde(default)]
                    status: Option<String>,
                    #[serde(default)]
                    priority: Option<String>,
                }
                let args: Args = match call.parse_arguments() {
                    Ok(a) => a,
                    Err(e) => return Ok(ToolCallResult::error(format!("invalid arguments: {e}"))),
                };
                match store.list(args.status.as_deref(), args.priority.as_deref()) {
                    Ok(views) => Ok(ToolCallResult::ok(limit_output(&render_json(&views)))),
                    Err(e) => Ok(ToolCallResult::error(e.to_string())),
                }
            }
        )
        .with_annotations(ToolAnnotations {
            read_only_hint: true,
            ..Default::default()
        });

        let next_task = json_tool!(
            "next_task",
            "Return the single highest-priority actionable (non-done, non-blocked) task.",
            json!({"type": "object", "properties": {}, "required": [], "additionalProperties": false}),
            store,
            |store: Arc<TaskStore>, _call: crate::framing::ToolCall| match store.next() {
                Ok(Some(view)) => Ok(ToolCallResult::ok(limit_output(&render_json(&view)))),
                Ok(None) => Ok(ToolCallResult::ok("No actionable tasks".to_string())),
                Err(e) => Ok(ToolCallResult::error(e.to_string())),
            }
        )
        .with_annotations(ToolAnnotations {
            read_only_hint: true,
            ..Default::default()
        });

        let add_dependency = json_tool!(
            "add_dependency",
            "Add a dependency to a task, rejecting duplicates and cycles.",
            json!({
                "type": "object",
                "properties": {"id": {"type": "string"}, "dependency": {"type": "string"}},
                "required": ["id", "dependency"],
                "additionalProperties": false
            }),
            store,
            |store: Arc<TaskStore>, call: crate::framing::ToolCall| {
                #[derive(Deserialize)]
                struct Args {
                    id: String,
                    dependency: String,
                }
                let args: Args = match call.parse_arguments() {
                    Ok(a) => a,
                    Err(e) => return Ok(ToolCallResult::error(format!("invalid arguments: {e}"))),
                };
                render_result(store.add_dependency(&args.id, &args.dependency))
            }
        );

        let remove_dependency = json_tool!(
            "remove_dependency",
            "Remove a dependency from a task, if present.",
            json!({
                "type": "object",
                "properties": {"id": {"type": "string"}, "dependency": {"type": "string"}},
                "required": ["id", "dependency"],
                "additionalProperties": false
            }),
            store,
            |store: Arc<TaskStore>, call: crate::framing::ToolCall| {
                #[derive(Deserialize)]
                struct Args {
                    id: String,
                    dependency: String,
                }
                let args: Args = match call.parse_arguments() {
                    Ok(a) => a,
                    Err(e) => return Ok(ToolCallResult::error(format!("invalid arguments: {e}"))),
                };
                render_result(store.remove_dependency(&args.id, &args.dependency))
            }
        );

        Ok(vec![
            create_task,
            get_task,
            update_task,
            delete_task,
            list_tasks,
            next_task,
            add_dependency,
            remove_dependency,
        ])
    }
}

fn render_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

fn render_result(result: Result<TaskView, TasksError>) -> anyhow::Result<ToolCallResult> {
    match result {
        Ok(view) => Ok(ToolCallResult::ok(limit_output(&render_json(&view)))),
        Err(e) => Ok(ToolCallResult::error(e.to_string())),
    }
}

fn handler<F>(f: F) -> impl ToolHandler
where
    F: for<'a> Fn(
            &'a ToolContext,
            &'a crate::framing::ToolCall,
        ) -> std::pin::Pin<Box<dyn std::future::Future<Output = anyhow::Result<ToolCallResult>> + Send + 'a>>
        + Send
        + Sync,
{
    f
}
