/// Convenience result type used across ozkit.
pub type OzResult<T> = Result<T, OzError>;

/// Top-level error taxonomy for the fallible edges of the crate.
///
/// The module kernel and the animation engine never fail at runtime (unresolved modules
/// yield `None`, operations on idle targets are no-ops). Errors only surface where data
/// enters the crate: configuration, script sources and CSS value parsing.
#[derive(thiserror::Error, Debug)]
pub enum OzError {
    /// Invalid configuration document or option value.
    #[error("config error: {0}")]
    Config(String),

    /// A script source could not produce a script.
    #[error("source error: {0}")]
    Source(String),

    /// Malformed module document or definition.
    #[error("module error: {0}")]
    Module(String),

    /// Malformed animation value (transform list, unit, easing name).
    #[error("animation error: {0}")]
    Animation(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl OzError {
    /// Build a [`OzError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`OzError::Source`] value.
    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Build a [`OzError::Module`] value.
    pub fn module(msg: impl Into<String>) -> Self {
        Self::Module(msg.into())
    }

    /// Build a [`OzError::Animation`] value.
    pub fn animation(msg: impl Into<String>) -> Self {
        Self::Animation(msg.into())
    }

    /// Build a [`OzError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for OzError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
