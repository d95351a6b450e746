use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Circular inheritance detected: {}", .0.join(" -> "))]
    CircularInheritance(Vec<String>),

    #[error("Invalid template name: {0}")]
    InvalidName(String),

    #[error("Syntax error in {template}: {message}")]
    Syntax { template: String, message: String },

    #[error("Render failure: {0}")]
    RenderFailure(String),

    #[error("Failed to read template {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, TemplateError>;
