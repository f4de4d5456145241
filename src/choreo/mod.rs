pub(crate) mod actor;
pub(crate) mod css;
pub(crate) mod engine;
pub(crate) mod stage;
pub(crate) mod style;
pub(crate) mod transform;
