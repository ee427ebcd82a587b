use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnchantError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid ability definition '{id}': {reason}")]
    InvalidDefinition { id: String, reason: String },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Unknown ability: {0}")]
    UnknownAbility(String),
}

impl From<toml::de::Error> for EnchantError {
    fn from(e: toml::de::Error) -> Self {
        EnchantError::ParseError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EnchantError>;

/// Failure raised by a single effect activation.
///
/// These never leave the engine; they are logged and the activation is
/// bookkept as completed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EffectError {
    #[error("effect requires a target block")]
    MissingTarget,

    #[error("world rejected operation: {0}")]
    World(String),

    #[error("effect panicked: {0}")]
    Panicked(String),
}
