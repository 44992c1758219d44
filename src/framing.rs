//! Common `Tool`/`ToolSet`/`ToolCall`/`ToolCallResult` framing shared by every
//! toolset in this crate.
//!
//! A [`ToolSet`] is a named bundle of [`Tool`] descriptors with an optional
//! lifecycle (`start`/`stop`) and an `instructions()` blurb the agent loop
//! appends to its system prompt. The runtime resolves a tool by name and
//! invokes its `handler` with a [`ToolContext`] and a [`ToolCall`]; the
//! handler is expected to catch recoverable failures itself and report them
//! as `ToolCallResult{is_error: true, ..}` rather than returning `Err` --
//! `Err` is reserved for conditions the caller did not cause and cannot
//! react to (see `error` module docs).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Annotations surfaced to the agent describing tool-call safety properties.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ToolAnnotations {
    pub title: Option<String>,
    pub read_only_hint: bool,
    pub destructive_hint: bool,
}

/// Context passed to every tool handler invocation.
///
/// `cancel` is the outer cancellation token from the agent loop; handlers
/// must race their I/O against it (see `shell::foreground` for the
/// canonical pattern).
#[derive(Clone)]
pub struct ToolContext {
    pub cancel: CancellationToken,
}

impl ToolContext {
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
        }
    }

    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
        }
    }
}

impl Default for ToolContext {
    fn default() -> Self {
        Self::new()
    }
}

/// A single invocation request from the agent: `arguments` is always a
/// JSON-encoded string (possibly empty for tools with no inputs).
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub name: String,
    pub arguments: String,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Decode `arguments` into `T`, treating an empty/absent string as `{}`.
    pub fn parse_arguments<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        let raw = if self.arguments.trim().is_empty() {
            "{}"
        } else {
            self.arguments.as_str()
        };
        serde_json::from_str(raw)
    }
}

/// The result handed back to the agent for a tool call.
///
/// Recoverable failures (a bad command, a missing task id, a nonzero exit)
/// are reported with `is_error: true` inside an `Ok` result -- the agent
/// sees them and can react. Only conditions the tool genuinely could not
/// anticipate propagate as a handler `Err`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolCallResult {
    pub output: String,
    pub is_error: bool,
}

impl ToolCallResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            is_error: false,
        }
    }

    pub fn error(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            is_error: true,
        }
    }
}

type HandlerFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<ToolCallResult>> + Send + 'a>>;

/// Object-safe handler trait. Implementations return a boxed future rather
/// than an `async fn` so handlers can be stored as `Arc<dyn ToolHandler>`
/// inside a `Tool` descriptor and so mutually-dispatching handlers (a script
/// tool that itself invokes the shell engine, for instance) don't hit the
/// opaque-type recursion limit `async fn`-in-trait runs into.
pub trait ToolHandler: Send + Sync {
    fn call<'a>(&'a self, ctx: &'a ToolContext, call: &'a ToolCall) -> HandlerFuture<'a>;
}

impl<F> ToolHandler for F
where
    F: for<'a> Fn(&'a ToolContext, &'a ToolCall) -> HandlerFuture<'a> + Send + Sync,
{
    fn call<'a>(&'a self, ctx: &'a ToolContext, call: &'a ToolCall) -> HandlerFuture<'a> {
        (self)(ctx, call)
    }
}

/// An immutable tool descriptor. Construction is the only place its fields
/// are set; nothing in this crate mutates a `Tool` after it is built.
#[derive(Clone)]
pub struct Tool {
    pub name: String,
    pub category: String,
    pub description: String,
    pub title: Option<String>,
    pub parameters: Value,
    pub output_schema: Value,
    pub annotations: ToolAnnotations,
    pub add_description_parameter: bool,
    pub handler: Option<Arc<dyn ToolHandler>>,
}

impl Tool {
    /// Build a descriptor with no handler (see `tools::stubs`).
    pub fn descriptor_only(
        name: impl Into<String>,
        category: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            description: description.into(),
            title: None,
            parameters,
            output_schema: serde_json::json!({ "type": "string" }),
            annotations: ToolAnnotations::default(),
            add_description_parameter: false,
            handler: None,
        }
    }

    pub fn with_handler(mut self, handler: Arc<dyn ToolHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn with_annotations(mut self, annotations: ToolAnnotations) -> Self {
        self.annotations = annotations;
        self
    }

    /// Adds a free-form `description` string input to `parameters`, used by
    /// tools that want the agent to explain its intent alongside the call.
    pub fn with_description_parameter(mut self) -> Self {
        self.add_description_parameter = true;
        if let Some(props) = self
            .parameters
            .get_mut("properties")
            .and_then(|p| p.as_object_mut())
        {
            props.insert(
                "description".to_string(),
                serde_json::json!({
                    "type": "string",
                    "description": "Explanation of intent shown to the user"
                }),
            );
        }
        self
    }

    /// Run this tool's handler, if any. Descriptor-only tools have no
    /// handler; invoking one is a configuration error on the caller's part,
    /// surfaced as a genuine `Err` since it is not a condition the agent's
    /// arguments could have triggered.
    pub async fn invoke(&self, ctx: &ToolContext, call: &ToolCall) -> anyhow::Result<ToolCallResult> {
        match &self.handler {
            Some(handler) => handler.call(ctx, call).await,
            None => Err(anyhow::anyhow!(
                "tool '{}' has no handler (descriptor-only stub)",
                self.name
            )),
        }
    }
}

/// A named bundle of tools with an optional lifecycle.
///
/// `start`/`stop` are each called at most once by the runtime; `tools()`
/// must be idempotent and may itself fail (bad config -> `InvalidConfiguration`
/// per the error taxonomy).
pub trait ToolSet: Send + Sync {
    fn tools(&self, ctx: &ToolContext) -> anyhow::Result<Vec<Tool>>;

    fn instructions(&self) -> Option<String> {
        None
    }

    fn start<'a>(&'a self, ctx: &'a ToolContext) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        let _ = ctx;
        Box::pin(async { Ok(()) })
    }

    fn stop<'a>(&'a self, ctx: &'a ToolContext) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        let _ = ctx;
        Box::pin(async { Ok(()) })
    }
}
