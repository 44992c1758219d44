/// Errors raised while constructing an API tool definition.
#[derive(Debug, thiserror::Error)]
pub enum ApiToolError {
    #[error("endpoint '{endpoint}' is not a valid URL")]
    InvalidEndpoint { endpoint: String },

    #[error("endpoint scheme '{scheme}' is not supported (expected http or https)")]
    UnsupportedScheme { scheme: String },
}
