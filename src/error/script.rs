/// Errors raised while constructing a scripted-shell tool definition.
#[derive(Debug, thiserror::Error)]
pub enum ScriptToolError {
    #[error("tool '{tool}' uses undefined args: {names:?}")]
    UndefinedArgs { tool: String, names: Vec<String> },

    #[error("tool '{tool}' lists unknown key '{key}' in required")]
    UnknownRequiredKey { tool: String, key: String },
}
