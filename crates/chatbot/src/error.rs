use thiserror::Error;

/// Errors raised while wiring up the chatbot's attachment store.
#[derive(Debug, Error)]
pub enum ChatbotError {
    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// An I/O error (e.g. reading the config file).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid TOML.
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}
