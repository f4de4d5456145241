use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
    path::{Path, PathBuf},
    rc::Rc,
};

use anyhow::Context;
use serde_json::Value;

use crate::{
    foundation::error::{OzError, OzResult},
    module::record::ModuleDef,
};

/// A script delivered by a [`ScriptSource`]: the definitions it makes when evaluated.
#[derive(Debug)]
pub struct Delivery {
    /// The url exactly as passed to [`ScriptSource::request`].
    pub url: String,
    pub script: OzResult<Vec<ModuleDef>>,
}

/// Where remote module scripts come from.
///
/// `request` starts a load; completed loads are handed back by `poll`, one [`Delivery`]
/// per request, on a later loader turn.
pub trait ScriptSource {
    fn request(&mut self, url: &str);
    fn poll(&mut self) -> Vec<Delivery>;
}

#[derive(Debug, Default)]
struct MemoryInner {
    scripts: HashMap<String, Vec<ModuleDef>>,
    requests: Vec<String>,
    queue: VecDeque<String>,
    held: bool,
}

/// In-memory script table.
///
/// Clones share state, so a test can keep a handle after giving one to the loader and
/// inspect request counts or hold deliveries to simulate network latency.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    inner: Rc<RefCell<MemoryInner>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the definitions the script at `url` makes.
    pub fn insert(&self, url: impl Into<String>, defs: Vec<ModuleDef>) {
        self.inner.borrow_mut().scripts.insert(url.into(), defs);
    }

    pub fn with_script(self, url: impl Into<String>, defs: Vec<ModuleDef>) -> Self {
        self.insert(url, defs);
        self
    }

    /// How many times `url` was requested.
    pub fn request_count(&self, url: &str) -> usize {
        self.inner
            .borrow()
            .requests
            .iter()
            .filter(|u| *u == url)
            .count()
    }

    /// Every request in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.inner.borrow().requests.clone()
    }

    /// Stop delivering until [`MemorySource::release`].
    pub fn hold(&self) {
        self.inner.borrow_mut().held = true;
    }

    pub fn release(&self) {
        self.inner.borrow_mut().held = false;
    }

    /// Requests not delivered yet.
    pub fn pending(&self) -> usize {
        self.inner.borrow().queue.len()
    }
}

impl ScriptSource for MemorySource {
    fn request(&mut self, url: &str) {
        let mut inner = self.inner.borrow_mut();
        inner.requests.push(url.to_string());
        inner.queue.push_back(url.to_string());
    }

    fn poll(&mut self) -> Vec<Delivery> {
        let mut inner = self.inner.borrow_mut();
        if inner.held {
            return Vec::new();
        }
        let urls: Vec<String> = inner.queue.drain(..).collect();
        urls.into_iter()
            .map(|url| {
                let script = inner
                    .scripts
                    .get(&url)
                    .cloned()
                    .ok_or_else(|| OzError::source(format!("no script at '{url}'")));
                Delivery { url, script }
            })
            .collect()
    }
}

/// One module in a JSON module document.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ModuleDoc {
    /// Omitted for an anonymous module named by the file that holds it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub deps: Vec<String>,
    /// Export value; omitted means the module exports `null`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exports: Option<Value>,
    /// Makes the entry a remote declaration instead of a definition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ModuleDoc {
    pub fn into_def(self) -> ModuleDef {
        let name = self.name.unwrap_or_default();
        if let Some(url) = self.url {
            return ModuleDef::remote(name, url).deps(self.deps);
        }
        let exports = self.exports;
        let def = if name.is_empty() {
            ModuleDef::anonymous()
        } else {
            ModuleDef::named(name)
        };
        def.deps(self.deps)
            .factory(move |_| Some(exports.clone().unwrap_or(Value::Null)))
    }
}

/// A whole script file: either `{"modules": [...]}` or one module document.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum ScriptDoc {
    Bundle { modules: Vec<ModuleDoc> },
    Single(ModuleDoc),
}

impl ScriptDoc {
    /// Parse a document. A bundle may hold at most one anonymous module, since only one
    /// can take the name of the file.
    pub fn from_json(s: &str) -> OzResult<Self> {
        let doc: Self = serde_json::from_str(s)?;
        if let Self::Bundle { modules } = &doc {
            let anonymous = modules
                .iter()
                .filter(|m| m.name.as_deref().is_none_or(str::is_empty))
                .count();
            if anonymous > 1 {
                return Err(OzError::module(format!(
                    "bundle holds {anonymous} anonymous modules"
                )));
            }
        }
        Ok(doc)
    }

    pub fn into_defs(self) -> Vec<ModuleDef> {
        match self {
            Self::Bundle { modules } => modules.into_iter().map(ModuleDoc::into_def).collect(),
            Self::Single(doc) => vec![doc.into_def()],
        }
    }
}

/// Reads JSON module documents from a directory. Urls are paths relative to the root.
#[derive(Debug)]
pub struct DirSource {
    root: PathBuf,
    queue: VecDeque<String>,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            queue: VecDeque::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn load(&self, url: &str) -> OzResult<Vec<ModuleDef>> {
        let path = self.root.join(url);
        tracing::debug!(path = %path.display(), "reading module document");
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("read module document {}", path.display()))?;
        let doc = ScriptDoc::from_json(&text)
            .map_err(|e| OzError::source(format!("{}: {e}", path.display())))?;
        Ok(doc.into_defs())
    }
}

impl ScriptSource for DirSource {
    fn request(&mut self, url: &str) {
        self.queue.push_back(url.to_string());
    }

    fn poll(&mut self) -> Vec<Delivery> {
        let urls: Vec<String> = self.queue.drain(..).collect();
        urls.into_iter()
            .map(|url| {
                let script = self.load(&url);
                Delivery { url, script }
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/module/source.rs"]
mod tests;
