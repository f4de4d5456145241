pub(crate) mod exec;
pub(crate) mod fetch;
pub(crate) mod loader;
pub(crate) mod naming;
pub(crate) mod record;
pub(crate) mod registry;
pub(crate) mod resolve;
pub(crate) mod source;
