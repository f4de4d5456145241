use std::collections::HashMap;

use crate::{
    foundation::config::LoaderConfig,
    module::{naming, registry::Registry, source::ScriptSource},
};

/// Someone waiting for a module's script: the pending `require` it belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Observer {
    pub ticket: u64,
    pub module: String,
}

#[derive(Debug)]
enum ScriptState {
    Loading(Vec<Observer>),
    Loaded,
}

/// Delay gate of a module whose declared dependencies are still loading.
#[derive(Debug)]
enum Gate {
    Waiting {
        remaining: usize,
        observers: Vec<Observer>,
    },
    Open,
}

#[derive(Debug)]
enum Refer {
    Waiting(Vec<String>),
    Done,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum FetchOutcome {
    /// A request went out to the source for this url.
    Requested(String),
    /// Joined the observers of an in-flight request.
    Queued,
    /// Parked behind the module's delay gate.
    Deferred,
    /// Script already evaluated; the observer is handed straight back.
    AlreadyLoaded(Observer),
}

/// Per-url request deduplication with observer coalescing.
#[derive(Debug, Default)]
pub(crate) struct Fetcher {
    scripts: HashMap<String, ScriptState>,
    gates: HashMap<String, Gate>,
    refers: HashMap<String, Refer>,
    initiators: HashMap<String, String>,
    in_flight: HashMap<String, String>,
}

/// Url actually requested from the source for a module url.
pub(crate) fn true_url(url: &str, cfg: &LoaderConfig) -> String {
    if naming::has_scheme(url) {
        return url.to_string();
    }
    let base = match (&cfg.dist_url, cfg.ozma()) {
        (Some(dist), true) if !dist.is_empty() => dist.as_str(),
        _ => cfg.base_url(),
    };
    if cfg.auto_suffix() {
        format!("{base}{}", naming::namesuffix(url))
    } else {
        format!("{base}{url}")
    }
}

impl Fetcher {
    /// Fetch the script of `module` on behalf of `observer`.
    pub(crate) fn fetch(
        &mut self,
        registry: &Registry,
        cfg: &LoaderConfig,
        source: &mut dyn ScriptSource,
        module: &str,
        observer: Observer,
    ) -> FetchOutcome {
        let Some(record) = registry.get(module) else {
            return FetchOutcome::AlreadyLoaded(observer);
        };
        let Some(url) = record.url.clone() else {
            return FetchOutcome::AlreadyLoaded(observer);
        };

        match self.scripts.get_mut(&url) {
            Some(ScriptState::Loading(observers)) => {
                observers.push(observer);
                return FetchOutcome::Queued;
            }
            Some(ScriptState::Loaded) => return FetchOutcome::AlreadyLoaded(observer),
            None => {}
        }

        let gate_open = matches!(self.gates.get(module), Some(Gate::Open));
        if !record.deps.is_empty() && !gate_open {
            if let Some(Gate::Waiting { observers, .. }) = self.gates.get_mut(module) {
                observers.push(observer);
                return FetchOutcome::Deferred;
            }
            let mut remaining = 0;
            for dep in &record.deps {
                let dep = naming::realname(dep, &cfg.aliases);
                let done = matches!(self.refers.get(&dep), Some(Refer::Done));
                // only a request in flight can release the gate
                let loading = registry
                    .get(&dep)
                    .and_then(|d| d.url.as_ref())
                    .is_some_and(|u| matches!(self.scripts.get(u), Some(ScriptState::Loading(_))));
                if !done && loading {
                    if let Refer::Waiting(dependents) = self
                        .refers
                        .entry(dep)
                        .or_insert_with(|| Refer::Waiting(Vec::new()))
                    {
                        dependents.push(module.to_string());
                    }
                    remaining += 1;
                }
            }
            if remaining > 0 {
                tracing::debug!(module, remaining, "fetch delayed until dependencies load");
                self.gates.insert(
                    module.to_string(),
                    Gate::Waiting {
                        remaining,
                        observers: vec![observer],
                    },
                );
                return FetchOutcome::Deferred;
            }
            self.gates.insert(module.to_string(), Gate::Open);
        }

        let target = true_url(&url, cfg);
        tracing::debug!(module, url = %url, true_url = %target, "requesting script");
        self.scripts
            .insert(url.clone(), ScriptState::Loading(vec![observer]));
        self.initiators.insert(url.clone(), module.to_string());
        self.in_flight.insert(target.clone(), url);
        source.request(&target);
        FetchOutcome::Requested(target)
    }

    /// Map a delivered url back to the module url it was requested for.
    pub(crate) fn take_in_flight(&mut self, true_url: &str) -> Option<String> {
        self.in_flight.remove(true_url)
    }

    /// Mark `url` evaluated and hand back everyone waiting for it.
    pub(crate) fn mark_loaded(&mut self, url: &str) -> Vec<Observer> {
        match self.scripts.insert(url.to_string(), ScriptState::Loaded) {
            Some(ScriptState::Loading(observers)) => observers,
            _ => Vec::new(),
        }
    }

    /// Count down the gates of modules waiting on the module that requested `url`.
    /// Returns the modules whose gate opened, with the observers parked behind it.
    pub(crate) fn release(&mut self, url: &str) -> Vec<(String, Vec<Observer>)> {
        let Some(initiator) = self.initiators.get(url).cloned() else {
            return Vec::new();
        };
        let dependents = match self.refers.insert(initiator, Refer::Done) {
            Some(Refer::Waiting(dependents)) => dependents,
            _ => return Vec::new(),
        };
        let mut opened = Vec::new();
        for dependent in dependents {
            let Some(Gate::Waiting {
                remaining,
                observers,
            }) = self.gates.get_mut(&dependent)
            else {
                continue;
            };
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                let observers = std::mem::take(observers);
                self.gates.insert(dependent.clone(), Gate::Open);
                opened.push((dependent, observers));
            }
        }
        opened
    }

    pub(crate) fn is_loaded(&self, url: &str) -> bool {
        matches!(self.scripts.get(url), Some(ScriptState::Loaded))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/module/fetch.rs"]
mod tests;
