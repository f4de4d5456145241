use std::collections::HashMap;

use crate::{
    foundation::config::LoaderConfig,
    module::{
        naming,
        record::{DefBody, Factory, LoadState, ModuleDef, ModuleRecord},
    },
};

/// Table from canonical identifier to module record.
///
/// Besides the records themselves the registry keeps two side tables: the file-scoped remap
/// memo written by the resolver (`(file url, id as written) -> canonical id`), and links
/// left behind when an alias configuration re-keys a record.
#[derive(Debug, Default)]
pub struct Registry {
    mods: HashMap<String, ModuleRecord>,
    links: HashMap<String, String>,
    remaps: HashMap<(String, String), String>,
    latest_anonymous: Option<ModuleRecord>,
}

impl Registry {
    fn key<'a>(&'a self, id: &'a str) -> &'a str {
        self.links.get(id).map_or(id, String::as_str)
    }

    pub fn get(&self, id: &str) -> Option<&ModuleRecord> {
        self.mods.get(self.key(id))
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut ModuleRecord> {
        let key = self.key(id).to_string();
        self.mods.get_mut(&key)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.mods.contains_key(self.key(id))
    }

    pub fn len(&self) -> usize {
        self.mods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mods.is_empty()
    }

    /// Canonical ids in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.mods.keys().map(String::as_str)
    }

    pub(crate) fn insert(&mut self, record: ModuleRecord) {
        self.links.remove(&record.name);
        self.mods.insert(record.name.clone(), record);
    }

    /// Register one definition. Returns `false` when the definition was ignored as a
    /// duplicate.
    pub(crate) fn define(&mut self, def: ModuleDef, cfg: &LoaderConfig) -> bool {
        let name = if def.name.is_empty() {
            String::new()
        } else {
            naming::realname(&def.name, &cfg.aliases)
        };
        let existing = if name.is_empty() { None } else { self.get(&name) };
        if let Some(prev) = existing {
            let settled = (def.is_remote() && prev.load_state == LoadState::Loaded)
                || prev.exports.is_some();
            if !cfg.debug() && !prev.name.is_empty() && settled {
                tracing::trace!(module = %name, "duplicate define ignored");
                return false;
            }
        }
        let prev_url = existing.and_then(|prev| prev.url.clone());
        let deps = if def.is_remote() && cfg.ozma() {
            Vec::new()
        } else {
            def.deps
        };

        let record = match def.body {
            DefBody::Remote(url) => ModuleRecord::remote(
                name.clone(),
                naming::expand_url_aliases(&url, &cfg.aliases),
                deps,
            ),
            DefBody::Declared => {
                let url = naming::filesuffix(
                    &naming::realname(&naming::basename(&def.name, None), &cfg.aliases),
                    cfg.suffix(),
                );
                ModuleRecord::remote(
                    name.clone(),
                    naming::expand_url_aliases(&url, &cfg.aliases),
                    deps,
                )
            }
            DefBody::Factory(factory) => ModuleRecord {
                name: name.clone(),
                url: prev_url,
                deps,
                exports: match &factory {
                    Factory::Literal(v) => Some(v.clone()),
                    Factory::Native(_) => None,
                },
                factory: Some(factory),
                load_state: LoadState::Loaded,
                running: false,
            },
        };

        if name.is_empty() {
            tracing::trace!("anonymous module captured");
            self.latest_anonymous = Some(record);
        } else {
            tracing::trace!(module = %name, url = ?record.url, "module defined");
            self.insert(record);
        }
        true
    }

    /// Bind the last anonymous definition to `name`, replacing the remote placeholder.
    pub(crate) fn bind_anonymous(&mut self, name: &str) {
        let Some(mut record) = self.latest_anonymous.take() else {
            return;
        };
        let url = self.get(name).and_then(|prev| prev.url.clone());
        tracing::debug!(module = %name, "anonymous module bound");
        record.name = name.to_string();
        record.url = url;
        self.insert(record);
    }

    /// Re-key records whose id now starts with a configured alias.
    pub(crate) fn rekey(&mut self, cfg: &LoaderConfig) {
        let moved: Vec<(String, String)> = self
            .mods
            .keys()
            .filter_map(|k| {
                let real = naming::realname(k, &cfg.aliases);
                (real != *k).then(|| (k.clone(), real))
            })
            .collect();
        for (old, new) in moved {
            if self.mods.contains_key(&new) {
                continue;
            }
            if let Some(mut record) = self.mods.remove(&old) {
                record.name = new.clone();
                self.mods.insert(new.clone(), record);
                self.links.insert(old, new);
            }
        }
    }

    pub(crate) fn remember_remap(&mut self, file_url: Option<&str>, id: String, canonical: String) {
        self.remaps
            .insert((file_url.unwrap_or("").to_string(), id), canonical);
    }

    /// Rewrite `deps` with the canonical ids the resolver chose for them from `file_url`.
    /// Plugin prefixes survive the rewrite.
    pub(crate) fn tidy(&self, deps: &mut [String], file_url: Option<&str>, cfg: &LoaderConfig) {
        let file = file_url.unwrap_or("");
        for dep in deps.iter_mut() {
            let (plugin, bare) = naming::split_plugin(dep);
            let key = (file.to_string(), naming::realname(bare, &cfg.aliases));
            if let Some(canonical) = self.remaps.get(&key) {
                *dep = match plugin {
                    Some(p) => format!("{p}!{canonical}"),
                    None => canonical.clone(),
                };
            }
        }
    }

    /// [`Registry::tidy`] applied to a record's own dependency list.
    pub(crate) fn tidy_record(&mut self, id: &str, cfg: &LoaderConfig) {
        let Some(record) = self.get(id) else {
            return;
        };
        let mut deps = record.deps.clone();
        let url = record.url.clone();
        self.tidy(&mut deps, url.as_deref(), cfg);
        if let Some(record) = self.get_mut(id) {
            record.deps = deps;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/module/registry.rs"]
mod tests;
