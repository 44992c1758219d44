//! Read-only skills toolset (spec §4.8): `read_skill` returns a skill's
//! primary file; `read_skill_file` returns an arbitrary file inside a
//! skill's directory, guarded against path traversal.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use crate::error::SkillsError;
use crate::framing::{Tool, ToolAnnotations, ToolCall, ToolCallResult, ToolContext, ToolHandler, ToolSet};
use crate::limiter::limit_output;

/// A loaded skill: `primary_file` is what `read_skill` returns; `base_dir`
/// bounds every `read_skill_file` lookup for this skill.
#[derive(Debug, Clone)]
pub struct Skill {
    pub name: String,
    pub base_dir: PathBuf,
    pub primary_file: PathBuf,
    pub file_count: usize,
}

/// Lexically clean `path` (resolving `.`/`..` without touching the
/// filesystem) and reject it unless it stays under `base`.
fn resolve_contained(base: &Path, requested: &str) -> Result<PathBuf, SkillsError> {
    if requested.is_empty() || Path::new(requested).is_absolute() || requested.split('/').any(|seg| seg == "..") {
        return Err(SkillsError::InvalidPath);
    }

    let joined = base.join(requested);
    let mut cleaned = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::ParentDir => {
                cleaned.pop();
            }
            Component::CurDir => {}
            other => cleaned.push(other),
        }
    }

    if !cleaned.starts_with(base) {
        return Err(SkillsError::PathTraversal {
            path: requested.to_string(),
        });
    }
    Ok(cleaned)
}

pub struct SkillsToolSet {
    skills: HashMap<String, Skill>,
}

impl SkillsToolSet {
    pub fn new(skills: Vec<Skill>) -> Self {
        Self {
            skills: skills.into_iter().map(|s| (s.name.clone(), s)).collect(),
        }
    }

    fn has_multi_file_skill(&self) -> bool {
        self.skills.values().any(|s| s.file_count > 1)
    }
}

impl ToolSet for SkillsToolSet {
    fn tools(&self, _ctx: &ToolContext) -> anyhow::Result<Vec<Tool>> {
        let skills = Arc::new(self.skills.clone());

        let skills_for_read = skills.clone();
        let read_skill = Tool::descriptor_only(
            "read_skill",
            "skills",
            "Read the primary file of a named skill.",
            json!({
                "type": "object",
                "properties": {"name": {"type": "string"}},
                "required": ["name"],
                "additionalProperties": false
            }),
        )
        .with_annotations(ToolAnnotations {
            read_only_hint: true,
            ..Default::default()
        })
        .with_handler(Arc::new(handler(move |_ctx, call| {
            let skills = skills_for_read.clone();
            let call = call.clone();
            Box::pin(async move {
                #[derive(Deserialize)]
                struct Args {
                    name: String,
                }
                let args: Args = match call.parse_arguments() {
                    Ok(a) => a,
                    Err(e) => return Ok(ToolCallResult::error(format!("invalid arguments: {e}"))),
                };
                let Some(skill) = skills.get(&args.name) else {
                    return Ok(ToolCallResult::error(SkillsError::NotFound { name: args.name }.to_string()));
                };
                match std::fs::read_to_string(&skill.primary_file) {
                    Ok(content) => Ok(ToolCallResult::ok(limit_output(&content))),
                    Err(e) => Ok(ToolCallResult::error(SkillsError::Io(e).to_string())),
                }
            })
        })));

        let mut tools = vec![read_skill];

        if self.has_multi_file_skill() {
            let skills_for_file = skills.clone();
            let read_skill_file = Tool::descriptor_only(
                "read_skill_file",
                "skills",
                "Read a specific file inside a skill's directory.",
                json!({
                    "type": "object",
                    "properties": {
                        "skill_name": {"type": "string"},
                        "path": {"type": "string"}
                    },
                    "required": ["skill_name", "path"],
                    "additionalProperties": false
                }),
            )
            .with_annotations(ToolAnnotations {
                read_only_hint: true,
                ..Default::default()
            })
            .with_handler(Arc::new(handler(move |_ctx, call| {
                let skills = skills_for_file.clone();
                let call = call.clone();
                Box::pin(async move {
                    #[derive(Deserialize)]
                    struct Args {
                        skill_name: String,
                        path: String,
                    }
                    let args: Args = match call.parse_arguments() {
                        Ok(a) => a,
                        Err(e) => return Ok(ToolCallResult::error(format!("invalid arguments: {e}"))),
                    };
                    let Some(skill) = skills.get(&args.skill_name) else {
                        return Ok(ToolCallResult::error(
                            SkillsError::NotFound { name: args.skill_name }.to_string(),
                        ));
                    };
                    let resolved = match resolve_contained(&skill.base_dir, &args.path) {
                        Ok(p) => p,
                        Err(e) => return Ok(ToolCallResult::error(e.to_string())),
                    };
                    match std::fs::read_to_string(resolved) {
                        Ok(content) => Ok(ToolCallResult::ok(limit_output(&content))),
                        Err(e) => Ok(ToolCallResult::error(SkillsError::Io(e).to_string())),
                    }
                })
            })));
            tools.push(read_skill_file);
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
