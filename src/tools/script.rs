//! Scripted-shell toolset (spec §4.5): user-declared tools that each wrap a
//! fixed shell command template, filled in from the agent's call arguments
//! via environment variables.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;
use tokio::process::Command;

use crate::error::ScriptToolError;
use crate::framing::{Tool, ToolAnnotations, ToolCall, ToolCallResult, ToolContext, ToolHandler, ToolSet};
use crate::limiter::limit_output;
use crate::shell::detect_shell;

/// One user-declared scripted tool.
#[derive(Debug, Clone)]
pub struct ScriptDefinition {
    pub name: String,
    pub cmd: String,
    pub working_dir: Option<String>,
    pub args: HashMap<String, Value>,
    pub required: Option<Vec<String>>,
    pub description: Option<String>,
}

fn var_pattern() -> Regex {
    Regex::new(r"\$\{?([A-Za-z_][A-Za-z0-9_]*)\}?").expect("static pattern")
}

/// Resolve the effective required-args list and validate every referenced
/// `$NAME`/`${NAME}` in `cmd` names a declared arg.
fn validate(def: &ScriptDefinition) -> Result<Vec<String>, ScriptToolError> {
    let required = match &def.required {
        None => def.args.keys().cloned().collect(),
        Some(keys) => {
            for key in keys {
                if !def.args.contains_key(key) {
                    return Err(ScriptToolError::UnknownRequiredKey {
                        tool: def.name.clone(),
                        key: key.clone(),
                    });
                }
            }
            keys.clone()
        }
    };

    let pattern = var_pattern();
    let mut undefined: Vec<String> = pattern
        .captures_iter(&def.cmd)
        .map(|c| c[1].to_string())
        .filter(|name| !def.args.contains_key(name))
        .collect();
    undefined.sort();
    undefined.dedup();
    if !undefined.is_empty() {
        return Err(ScriptToolError::UndefinedArgs {
            tool: def.name.clone(),
            names: undefined,
        });
    }

    Ok(required)
}

fn schema_for(def: &ScriptDefinition, required: &[String]) -> Value {
    let properties: serde_json::Map<String, Value> = def.args.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

async fn invoke(def: &ScriptDefinition, call: &ToolCall) -> anyhow::Result<ToolCallResult> {
    let args: HashMap<String, Value> = match call.parse_arguments() {
        Ok(a) => a,
        Err(e) => return Ok(ToolCallResult::error(format!("invalid arguments: {e}"))),
    };

    let shell = detect_shell();
    let mut command = Command::new(&shell.program);
    command.arg(&shell.flag).arg(&def.cmd);
    if let Some(dir) = &def.working_dir {
        if !dir.is_empty() {
            command.current_dir(dir);
        }
    }
    for (key, value) in &args {
        if value.is_null() {
            continue;
        }
        let rendered = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        command.env(key, rendered);
    }
    command.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());

    let output = match command.output().await {
        Ok(o) => o,
        Err(e) => return Ok(ToolCallResult::error(format!("failed to execute command: {e}"))),
    };

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    if output.status.success() {
        let trimmed = combined.trim();
        Ok(ToolCallResult::ok(limit_output(if trimmed.is_empty() {
            "<no output>"
        } else {
            trimmed
        })))
    } else {
        Ok(ToolCallResult::error(limit_output(&format!(
            "Error executing command: {}\nOutput: {combined}",
            def.cmd
        ))))
    }
}

/// The scripted-shell toolset: one `Tool` per validated `ScriptDefinition`.
pub struct ScriptToolSet {
    definitions: Vec<(ScriptDefinition, Vec<String>)>,
}

impl ScriptToolSet {
    pub fn new(definitions: Vec<ScriptDefinition>) -> Result<Self, ScriptToolError> {
        let mut validated = Vec::with_capacity(definitions.len());
        for def in definitions {
            let required = validate(&def)?;
            validated.push((def, required));
        }
        Ok(Self { definitions: validated })
    }
}

impl ToolSet for ScriptToolSet {
    fn tools(&self, _ctx: &ToolContext) -> anyhow::Result<Vec<Tool>> {
        let mut tools = Vec::with_capacity(self.definitions.len());
        for (def, required) in &self.definitions {
            let parameters = schema_for(def, required);
            let def_clone = def.clone();
            let tool = Tool::descriptor_only(
                def.name.clone(),
                "script",
                def.description.clone().unwrap_or_else(|| format!("Run '{}'", def.cmd)),
                parameters,
            )
            .with_annotations(ToolAnnotations {
                destructive_hint: true,
                ..Default::default()
            })
            .with_handler(Arc::new(handler(move |_ctx, call| {
                let def_clone = def_clone.clone();
                let call = call.clone();
                Box::pin(async move { invoke(&def_clone, &call).await })
            })));
            tools.push(tool);
        }
        Ok(tools)
    }
}

fn handler<F>(f: F) -> impl ToolHandler
where
    F: for<'a> Fn(&'a ToolContext, &'a ToolCall) -> std::pin::Pin<Box<dyn std::future::Future<Output = anyhow::Result<ToolCallResult>> + Send + 'a>>
        + Send
        + Sync,
{
    f
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic_def(name: &str, cmd: &str, args: &[&str]) -> ScriptDefinition {
        ScriptDefinition {
            name: name.to_string(),
            cmd: cmd.to_string(),
            working_dir: None,
            args: args.iter().map(|a| (a.to_string(), serde_json::json!({"type": "string"}))).collect(),
            required: None,
            description: None,
        }
    }

    #[test]
    fn all_args_required_when_required_is_absent() {
        let def = basic_def("greet", "echo $NAME", &["NAME"]);
        let required = validate(&def).unwrap();
        assert_eq!(required, vec!["NAME".to_string()]);
    }

    #[test]
    fn undefined_arg_reference_fails_construction() {
        let def = basic_def("greet", "echo ${X}", &["Y"]);
        let err = validate(&def).unwrap_err();
        match err {
            ScriptToolError::UndefinedArgs { names, .. } => assert_eq!(names, vec!["X".to_string()]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unknown_required_key_fails_construction() {
        let mut def = basic_def("greet", "echo $NAME", &["NAME"]);
        def.required = Some(vec!["MISSING".to_string()]);
        let err = validate(&def).unwrap_err();
        assert!(matches!(err, ScriptToolError::UnknownRequiredKey { .. }));
    }

    #[tokio::test]
    async fn invocation_forwards_args_as_env_vars() {
        let def = basic_def("greet", "echo hello $NAME", &["NAME"]);
        let call = ToolCall::new("greet", r#"{"NAME":"world"}"#);
        let result = invoke(&def, &call).await.unwrap();
        assert!(!result.is_error);
        assert!(result.output.contains("hello"));
        assert!(result.output.contains("world"));
    }

    #[tokio::test]
    async fn nonzero_exit_is_reported_as_error() {
        let def = basic_def("fail", "exit 3", &[]);
        let call = ToolCall::new("fail", "{}");
        let result = invoke(&def, &call).await.unwrap();
        assert!(result.is_error);
        assert!(result.output.contains("exit 3"));
    }

    #[test]
    fn toolset_construction_publishes_one_tool_per_definition() {
        let toolset = ScriptToolSet::new(vec![basic_def("a", "echo $X", &["X"]), basic_def("b", "echo $Y", &["Y"])]).unwrap();
        let ctx = ToolContext::new();
        let tools = toolset.tools(&ctx).unwrap();
        assert_eq!(tools.len(), 2);
    }
}
