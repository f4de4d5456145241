use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::mpsc::{self, Receiver, Sender},
};

use serde_json::Value;

use crate::{
    foundation::{config::LoaderConfig, error::OzResult},
    module::{
        exec::LoaderSignal,
        fetch::{FetchOutcome, Fetcher, Observer},
        naming,
        record::{LoadState, ModuleDef, ModuleRecord, RequireCallback, WaitKey},
        registry::Registry,
        resolve::{RequireEntry, Step},
        source::{Delivery, ScriptSource},
    },
};

struct PendingRequire {
    remaining: usize,
    deps: Vec<String>,
    file_url: Option<String>,
    callback: RequireCallback,
}

/// AMD-style module kernel.
///
/// One loader owns the registry, the per-url script table and the deferred work queues.
/// Nothing runs on its own: callbacks, `finish` signals and script deliveries are
/// processed by [`Loader::run_turn`] / [`Loader::run_until_idle`].
///
/// ```
/// use ozkit::{Loader, MemorySource, ModuleDef};
/// use serde_json::json;
///
/// let mut loader = Loader::new(MemorySource::new());
/// loader.define(ModuleDef::named("a").factory(|_| Some(json!(1))));
/// loader.define(
///     ModuleDef::named("b")
///         .deps(["a"])
///         .factory(|call| Some(json!(call.value(0).and_then(|v| v.as_i64()).unwrap_or(0) + 1))),
/// );
/// let seen = std::rc::Rc::new(std::cell::RefCell::new(None));
/// let sink = seen.clone();
/// loader.require(["b"], move |values| *sink.borrow_mut() = values[0].clone());
/// loader.run_until_idle();
/// assert_eq!(*seen.borrow(), Some(json!(2)));
/// ```
pub struct Loader {
    pub(crate) config: LoaderConfig,
    pub(crate) registry: Registry,
    pub(crate) resets: HashMap<String, Vec<ModuleRecord>>,
    pub(crate) waiting: HashMap<WaitKey, Vec<VecDeque<Step>>>,
    pub(crate) executed: Vec<String>,
    pub(crate) tx: Sender<LoaderSignal>,
    rx: Receiver<LoaderSignal>,
    fetcher: Fetcher,
    source: Box<dyn ScriptSource>,
    pending: HashMap<u64, PendingRequire>,
    next_ticket: u64,
    ready: VecDeque<VecDeque<Step>>,
}

impl std::fmt::Debug for Loader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader")
            .field("config", &self.config)
            .field("modules", &self.registry.len())
            .field("pending", &self.pending.len())
            .field("ready", &self.ready.len())
            .finish_non_exhaustive()
    }
}

impl Loader {
    pub fn new(source: impl ScriptSource + 'static) -> Self {
        Self::with_config(LoaderConfig::default(), source)
    }

    pub fn with_config(config: LoaderConfig, source: impl ScriptSource + 'static) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            config,
            registry: Registry::default(),
            resets: HashMap::new(),
            waiting: HashMap::new(),
            executed: Vec::new(),
            tx,
            rx,
            fetcher: Fetcher::default(),
            source: Box::new(source),
            pending: HashMap::new(),
            next_ticket: 0,
            ready: VecDeque::new(),
        }
    }

    /// Register a module. A duplicate of an already loaded or executed module is ignored
    /// unless `debug` is configured.
    pub fn define(&mut self, def: ModuleDef) {
        self.registry.define(def, &self.config);
    }

    /// Overlay configuration. New aliases re-key existing records.
    pub fn config(&mut self, patch: LoaderConfig) -> OzResult<()> {
        patch.validate()?;
        let rekey = !patch.aliases.is_empty();
        self.config.merge(patch);
        if rekey {
            self.registry.rekey(&self.config);
        }
        Ok(())
    }

    pub fn current_config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Resolve `deps`, load what is missing, then call `callback` with their exports in
    /// request order on a later turn.
    pub fn require<I, S>(&mut self, deps: I, callback: impl FnOnce(&[Option<Value>]) + 'static)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let deps: Vec<String> = deps.into_iter().map(Into::into).collect();
        self.require_from(deps, None, Box::new(callback));
    }

    /// Cached export of an executed module; `None` when unknown or not executed yet.
    pub fn require_value(&self, id: &str) -> Option<Value> {
        let id = naming::realname(&naming::basename(id, None), &self.config.aliases);
        self.registry.get(&id).and_then(|rec| rec.exports.clone())
    }

    pub fn module(&self, id: &str) -> Option<&ModuleRecord> {
        let id = naming::realname(id, &self.config.aliases);
        self.registry.get(&id)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Ids in the order their factories ran; reset copies appear as `new!id`.
    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    /// Leaves-first order of the modules `ids` depend on, without loading or running them.
    pub fn resolve_order<I, S>(&mut self, ids: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        self.registry
            .scan(&self.config, &ids, None)
            .iter()
            .filter_map(|step| match step {
                Step::Module(name) => Some(name.clone()),
                Step::Reset { alias, .. } => Some(alias.clone()),
                Step::Entry(_) => None,
            })
            .collect()
    }

    #[tracing::instrument(level = "debug", skip(self, callback))]
    pub(crate) fn require_from(
        &mut self,
        deps: Vec<String>,
        file_url: Option<String>,
        callback: RequireCallback,
    ) {
        let mut steps = self.registry.scan(&self.config, &deps, file_url.as_deref());

        let mut seen = HashSet::new();
        let remotes: Vec<String> = steps
            .iter()
            .filter_map(Step::module_name)
            .filter(|name| {
                self.registry
                    .get(name)
                    .is_some_and(|r| r.url.is_some() && r.load_state != LoadState::Loaded)
            })
            .filter(|name| seen.insert(name.to_string()))
            .map(str::to_string)
            .collect();

        if remotes.is_empty() {
            let mut deps = deps;
            self.registry
                .tidy(&mut deps, file_url.as_deref(), &self.config);
            steps.push_back(Step::Entry(RequireEntry {
                deps,
                file_url,
                callback,
            }));
            self.ready.push_back(steps);
            return;
        }

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        tracing::debug!(ticket, remotes = remotes.len(), "require waits for scripts");
        self.pending.insert(
            ticket,
            PendingRequire {
                remaining: remotes.len(),
                deps,
                file_url,
                callback,
            },
        );
        let mut immediate = Vec::new();
        for name in remotes {
            if let Some(record) = self.registry.get_mut(&name) {
                record.load_state = LoadState::Loading;
            }
            let observer = Observer {
                ticket,
                module: name.clone(),
            };
            if let FetchOutcome::AlreadyLoaded(observer) = self.fetch_module(&name, observer) {
                immediate.push(observer);
            }
        }
        for observer in immediate {
            self.script_loaded(observer);
        }
    }

    fn fetch_module(&mut self, name: &str, observer: Observer) -> FetchOutcome {
        self.fetcher.fetch(
            &self.registry,
            &self.config,
            self.source.as_mut(),
            name,
            observer,
        )
    }

    /// The script of `observer.module` was evaluated.
    fn script_loaded(&mut self, observer: Observer) {
        if let Some(record) = self.registry.get_mut(&observer.module) {
            record.load_state = LoadState::Loaded;
        }
        self.registry.bind_anonymous(&observer.module);

        let Some(pending) = self.pending.get_mut(&observer.ticket) else {
            return;
        };
        pending.remaining = pending.remaining.saturating_sub(1);
        if pending.remaining > 0 {
            return;
        }
        if let Some(pending) = self.pending.remove(&observer.ticket) {
            // everything fetched: resolve again, the scripts may have declared new deps
            self.require_from(pending.deps, pending.file_url, pending.callback);
        }
    }

    fn deliver(&mut self, delivery: Delivery) {
        let Some(url) = self.fetcher.take_in_flight(&delivery.url) else {
            tracing::warn!(url = %delivery.url, "delivery for a url nobody requested");
            return;
        };
        let defs = match delivery.script {
            Ok(defs) => defs,
            Err(err) => {
                tracing::warn!(url = %delivery.url, %err, "script failed to load");
                Vec::new()
            }
        };
        for def in defs {
            self.registry.define(def, &self.config);
        }
        for observer in self.fetcher.mark_loaded(&url) {
            self.script_loaded(observer);
        }
        for (module, observers) in self.fetcher.release(&url) {
            for observer in observers {
                if let FetchOutcome::AlreadyLoaded(observer) = self.fetch_module(&module, observer)
                {
                    self.script_loaded(observer);
                }
            }
        }
    }

    /// One event-loop turn: signals from factories, queued executions, then script
    /// deliveries. Returns whether anything happened.
    pub fn run_turn(&mut self) -> bool {
        let mut progressed = false;
        while let Ok(signal) = self.rx.try_recv() {
            progressed = true;
            self.handle_signal(signal);
        }
        let ready: Vec<VecDeque<Step>> = self.ready.drain(..).collect();
        for steps in ready {
            progressed = true;
            self.exec(steps);
        }
        for delivery in self.source.poll() {
            progressed = true;
            self.deliver(delivery);
        }
        progressed
    }

    /// Run turns until nothing is left to do. Returns the number of busy turns.
    pub fn run_until_idle(&mut self) -> usize {
        let mut turns = 0;
        while self.run_turn() {
            turns += 1;
        }
        turns
    }

    /// Whether no work is queued. Requires blocked on held scripts or unfinished modules
    /// do not count as queued work.
    pub fn is_idle(&self) -> bool {
        self.ready.is_empty()
    }

    /// Requires still waiting for scripts.
    pub fn pending_requires(&self) -> usize {
        self.pending.len()
    }

    pub fn is_script_loaded(&self, url: &str) -> bool {
        self.fetcher.is_loaded(url)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/module/loader.rs"]
mod tests;
