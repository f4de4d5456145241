//! Dependency resolution: a depth-first walk that emits modules leaves first.

use std::{
    collections::{HashSet, VecDeque},
    fmt,
};

use crate::{
    foundation::config::LoaderConfig,
    module::{
        naming,
        record::{ModuleDef, RequireCallback},
        registry::Registry,
    },
};

/// The caller of a `require`, executed after everything it depends on.
pub(crate) struct RequireEntry {
    pub deps: Vec<String>,
    pub file_url: Option<String>,
    pub callback: RequireCallback,
}

impl fmt::Debug for RequireEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequireEntry")
            .field("deps", &self.deps)
            .field("file_url", &self.file_url)
            .finish_non_exhaustive()
    }
}

/// One unit of the execution list.
#[derive(Debug)]
pub(crate) enum Step {
    Module(String),
    /// Fresh copy of `name`, consumed by the next dependent that asks for `alias`.
    Reset { name: String, alias: String },
    Entry(RequireEntry),
}

impl Step {
    /// Registry id the step needs loaded.
    pub(crate) fn module_name(&self) -> Option<&str> {
        match self {
            Self::Module(name) | Self::Reset { name, .. } => Some(name),
            Self::Entry(_) => None,
        }
    }
}

impl Registry {
    /// Walk `deps` (as written in `file_url`) and return the execution list, leaves first.
    ///
    /// Ids the registry has never seen are resolved relative to the referencing file and
    /// registered as remote modules so the fetcher can load them.
    pub(crate) fn scan(
        &mut self,
        cfg: &LoaderConfig,
        deps: &[String],
        file_url: Option<&str>,
    ) -> VecDeque<Step> {
        let mut visited = HashSet::new();
        let mut out = VecDeque::new();
        for dep in deps {
            self.visit(cfg, dep, file_url, &mut visited, &mut out);
        }
        out
    }

    fn visit(
        &mut self,
        cfg: &LoaderConfig,
        raw: &str,
        file_url: Option<&str>,
        visited: &mut HashSet<String>,
        out: &mut VecDeque<Step>,
    ) {
        let (plugin, bare) = naming::split_plugin(raw);
        let Some(canonical) = self.resolve_id(cfg, bare, file_url) else {
            return;
        };
        let reset = plugin == Some(naming::RESET_PLUGIN);
        // Reset copies may repeat, but not inside their own subtree.
        let guard = if reset {
            format!("{}!{canonical}", naming::RESET_PLUGIN)
        } else {
            canonical.clone()
        };
        if !visited.insert(guard.clone()) {
            return;
        }

        let Some(record) = self.get(&canonical) else {
            return;
        };
        let deps = record.deps.clone();
        let url = record.url.clone();
        for dep in &deps {
            if !visited.contains(dep) {
                self.visit(cfg, dep, url.as_deref(), visited, out);
            }
        }
        self.tidy_record(&canonical, cfg);

        if reset {
            visited.remove(&guard);
            out.push_back(Step::Reset {
                alias: guard,
                name: canonical,
            });
        } else {
            out.push_back(Step::Module(canonical));
        }
    }

    /// Canonical id for `bare` as written in `file_url`; `None` for pseudo-dependencies.
    fn resolve_id(&mut self, cfg: &LoaderConfig, bare: &str, file_url: Option<&str>) -> Option<String> {
        let mut id = naming::realname(bare, &cfg.aliases);
        if naming::is_builtin(&id) {
            return None;
        }
        if !self.contains(&id) {
            let true_id = naming::realname(&naming::basename(bare, file_url), &cfg.aliases);
            if true_id != id {
                self.remember_remap(file_url, id, true_id.clone());
                id = true_id;
            }
            if !self.contains(&id) {
                let url = naming::filesuffix(&id, cfg.suffix());
                self.define(ModuleDef::remote(id.clone(), url), cfg);
            }
        }
        self.contains(&id).then_some(id)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/module/resolve.rs"]
mod tests;
