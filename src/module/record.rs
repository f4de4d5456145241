use std::{fmt, rc::Rc, sync::mpsc::Sender};

use serde_json::{Map, Value};

use crate::module::{exec::LoaderSignal, naming, registry::Registry};

/// Fetch progress of a module backed by a script url.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadState {
    /// Known by url only.
    Unrequested,
    /// Script requested, not delivered yet.
    Loading,
    /// Script delivered, or the module was defined inline.
    Loaded,
}

/// Callback invoked with the export values of a `require` call, in request order.
pub type RequireCallback = Box<dyn FnOnce(&[Option<Value>])>;

/// Native factory body. Returning `Some` sets the export value explicitly.
pub type FactoryFn = dyn Fn(&mut FactoryCall<'_>) -> Option<Value>;

/// What produces a module's export value.
#[derive(Clone)]
pub enum Factory {
    /// Code run once with the resolved dependencies.
    Native(Rc<FactoryFn>),
    /// JSON module: the value is the export.
    Literal(Value),
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native(func) => f
                .debug_tuple("Native")
                .field(&Rc::as_ptr(func).cast::<()>())
                .finish(),
            Self::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
        }
    }
}

/// Registry entry for one module identifier.
#[derive(Clone, Debug)]
pub struct ModuleRecord {
    /// Canonical identifier; empty while an anonymous definition is unbound.
    pub name: String,
    /// Script url for remote modules, relative to the base url.
    pub url: Option<String>,
    /// Declared dependencies, rewritten to canonical ids once resolved.
    pub deps: Vec<String>,
    /// `None` for remote modules whose script has not defined them yet.
    pub factory: Option<Factory>,
    /// Fetch progress.
    pub load_state: LoadState,
    /// Cached export; `None` until the factory ran.
    pub exports: Option<Value>,
    /// Set while the factory waits for its `finish` signal.
    pub running: bool,
}

impl ModuleRecord {
    pub(crate) fn remote(name: String, url: String, deps: Vec<String>) -> Self {
        Self {
            name,
            url: Some(url),
            deps,
            factory: None,
            load_state: LoadState::Unrequested,
            exports: None,
            running: false,
        }
    }

    /// Fresh unexecuted copy used for `new!` requests.
    pub(crate) fn reset_copy(&self) -> Self {
        Self {
            name: self.name.clone(),
            url: self.url.clone(),
            deps: self.deps.clone(),
            factory: self.factory.clone(),
            load_state: self.load_state,
            exports: match &self.factory {
                Some(Factory::Literal(v)) => Some(v.clone()),
                _ => None,
            },
            running: false,
        }
    }

    pub(crate) fn is_executed(&self) -> bool {
        !self.running && self.exports.is_some()
    }
}

#[derive(Clone, Debug)]
pub(crate) enum DefBody {
    Factory(Factory),
    Remote(String),
    /// Declared by name and deps only; url derived from the name.
    Declared,
}

/// One `define` call, built through explicit constructors instead of argument sniffing.
#[derive(Clone, Debug)]
pub struct ModuleDef {
    pub(crate) name: String,
    pub(crate) deps: Vec<String>,
    pub(crate) body: DefBody,
}

impl ModuleDef {
    /// Named module; attach code with [`ModuleDef::factory`].
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            deps: Vec::new(),
            body: DefBody::Factory(Factory::Literal(Value::Null)),
        }
    }

    /// Anonymous module, bound to the name of the module whose script delivered it.
    pub fn anonymous() -> Self {
        Self::named("")
    }

    /// Module whose code lives in a script at `url`. `{alias}` placeholders are expanded.
    pub fn remote(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            deps: Vec::new(),
            body: DefBody::Remote(url.into()),
        }
    }

    /// Remote module known by name and dependencies; its url is the name plus the default
    /// suffix.
    pub fn declared<I, S>(name: impl Into<String>, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            deps: deps.into_iter().map(Into::into).collect(),
            body: DefBody::Declared,
        }
    }

    /// JSON module exporting `value`.
    pub fn literal(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            deps: Vec::new(),
            body: DefBody::Factory(Factory::Literal(value)),
        }
    }

    /// Set the dependency list.
    pub fn deps<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deps = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Set native code for the module.
    pub fn factory(
        mut self,
        f: impl Fn(&mut FactoryCall<'_>) -> Option<Value> + 'static,
    ) -> Self {
        self.body = DefBody::Factory(Factory::Native(Rc::new(f)));
        self
    }

    /// Module name as written (not yet alias-resolved).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn is_remote(&self) -> bool {
        matches!(self.body, DefBody::Remote(_) | DefBody::Declared)
    }
}

/// `module` pseudo-dependency.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleInfo {
    /// Canonical module id.
    pub id: String,
    /// Script url the module came from.
    pub filename: Option<String>,
}

/// Where a `finish` signal delivers its value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum WaitKey {
    Module(String),
    Reset(String),
}

/// Completion handle for modules that declare the `finish` dependency.
///
/// Execution of everything queued after the module waits until [`Finish::done`] is called.
/// The signal is processed on the loader's next turn.
#[derive(Clone)]
pub struct Finish {
    pub(crate) key: WaitKey,
    pub(crate) tx: Sender<LoaderSignal>,
}

impl fmt::Debug for Finish {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Finish").field("key", &self.key).finish()
    }
}

impl Finish {
    /// Complete the module, optionally replacing its export value.
    pub fn done(&self, value: Option<Value>) {
        // A dropped loader has nobody left to resume.
        let _ = self.tx.send(LoaderSignal::Finished {
            key: self.key.clone(),
            value,
        });
    }
}

/// Positional factory argument, one per declared dependency.
#[derive(Clone, Debug)]
pub enum Arg {
    /// `require` pseudo-dependency; use [`FactoryCall::require`].
    Require,
    /// `exports` pseudo-dependency; use [`FactoryCall::exports_mut`].
    Exports,
    /// `module` pseudo-dependency; use [`FactoryCall::module`].
    Module,
    /// `finish` pseudo-dependency.
    Finish(Finish),
    /// Export of another module; `None` when it could not be resolved.
    Value(Option<Value>),
}

/// Everything a native factory sees while it runs.
pub struct FactoryCall<'a> {
    pub(crate) args: Vec<Arg>,
    pub(crate) exports: Map<String, Value>,
    pub(crate) module_exports: Option<Value>,
    pub(crate) module: ModuleInfo,
    pub(crate) registry: &'a Registry,
    pub(crate) aliases: &'a std::collections::BTreeMap<String, String>,
    pub(crate) tx: Sender<LoaderSignal>,
}

impl FactoryCall<'_> {
    /// All positional arguments.
    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    /// Export value of the dependency at `index`, if it resolved to one.
    pub fn value(&self, index: usize) -> Option<&Value> {
        match self.args.get(index) {
            Some(Arg::Value(Some(v))) => Some(v),
            _ => None,
        }
    }

    /// The `finish` handle when the module declared that dependency.
    pub fn finish(&self) -> Option<Finish> {
        self.args.iter().find_map(|a| match a {
            Arg::Finish(f) => Some(f.clone()),
            _ => None,
        })
    }

    /// The module's `exports` object.
    pub fn exports_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.exports
    }

    /// Replace the export value wholesale (`module.exports = ...`).
    pub fn set_module_exports(&mut self, value: Value) {
        self.module_exports = Some(value);
    }

    /// Descriptor of the running module.
    pub fn module(&self) -> &ModuleInfo {
        &self.module
    }

    /// Synchronous lookup of an already executed module, relative to this module's file.
    pub fn require_value(&self, id: &str) -> Option<Value> {
        let (_, bare) = naming::split_plugin(id);
        let resolved = naming::realname(
            &naming::basename(bare, self.module.filename.as_deref()),
            self.aliases,
        );
        self.registry
            .get(&resolved)
            .and_then(|rec| rec.exports.clone())
    }

    /// Queue an asynchronous `require` resolved relative to this module's file.
    pub fn require<I, S>(&self, deps: I, callback: impl FnOnce(&[Option<Value>]) + 'static)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let _ = self.tx.send(LoaderSignal::Require {
            deps: deps.into_iter().map(Into::into).collect(),
            file_url: self.module.filename.clone(),
            callback: Box::new(callback),
        });
    }

    pub(crate) fn into_export(self, returned: Option<Value>) -> Value {
        if let Some(v) = returned {
            return v;
        }
        if let Some(v) = self.module_exports {
            return v;
        }
        if self.exports.is_empty() {
            Value::Null
        } else {
            Value::Object(self.exports)
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/module/record.rs"]
mod tests;
