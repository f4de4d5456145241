use std::collections::VecDeque;

use serde_json::{Map, Value};

use crate::module::{
    loader::Loader,
    naming,
    record::{
        Arg, Factory, Finish, FactoryCall, ModuleInfo, ModuleRecord, RequireCallback, WaitKey,
    },
    resolve::{RequireEntry, Step},
};

/// Messages handed back to the loader from inside factories.
pub(crate) enum LoaderSignal {
    Finished {
        key: WaitKey,
        value: Option<Value>,
    },
    Require {
        deps: Vec<String>,
        file_url: Option<String>,
        callback: RequireCallback,
    },
}

enum Run {
    Done(Value),
    Suspended(Value),
}

impl Loader {
    /// Execute `queue` front to back until it empties or reaches a module awaiting `finish`.
    pub(crate) fn exec(&mut self, mut queue: VecDeque<Step>) {
        while let Some(step) = queue.pop_front() {
            match step {
                Step::Entry(entry) => self.run_entry(entry),
                Step::Module(name) => {
                    let Some(record) = self.registry.get(&name) else {
                        continue;
                    };
                    if record.running {
                        self.park(WaitKey::Module(name), queue);
                        return;
                    }
                    if record.factory.is_none() || record.exports.is_some() {
                        continue;
                    }
                    let record = record.clone();
                    let key = WaitKey::Module(name.clone());
                    let run = self.run_factory(&record, key.clone());
                    let suspended = matches!(run, Run::Suspended(_));
                    if let Some(slot) = self.registry.get_mut(&name) {
                        let (Run::Done(value) | Run::Suspended(value)) = run;
                        slot.exports = Some(value);
                        slot.running = suspended;
                    }
                    self.executed.push(name);
                    if suspended {
                        self.park(key, queue);
                        return;
                    }
                }
                Step::Reset { name, alias } => {
                    let Some(record) = self.registry.get(&name) else {
                        continue;
                    };
                    let mut copy = record.reset_copy();
                    if copy.factory.is_none() || copy.is_executed() {
                        self.resets.entry(alias).or_default().push(copy);
                        continue;
                    }
                    let key = WaitKey::Reset(alias.clone());
                    let run = self.run_factory(&copy, key.clone());
                    let suspended = matches!(run, Run::Suspended(_));
                    let (Run::Done(value) | Run::Suspended(value)) = run;
                    copy.exports = Some(value);
                    copy.running = suspended;
                    self.resets.entry(alias.clone()).or_default().push(copy);
                    self.executed.push(alias);
                    if suspended {
                        self.park(key, queue);
                        return;
                    }
                }
            }
        }
    }

    fn park(&mut self, key: WaitKey, queue: VecDeque<Step>) {
        tracing::trace!(?key, remaining = queue.len(), "execution waits for finish");
        self.waiting.entry(key).or_default().push(queue);
    }

    /// Value for one declared dependency: a pending reset copy first, then the registry.
    fn dep_value(&mut self, dep: &str) -> Option<Value> {
        if let Some(copy) = self.resets.get_mut(dep).and_then(Vec::pop) {
            return copy.exports;
        }
        let (_, bare) = naming::split_plugin(dep);
        let id = naming::realname(bare, &self.config.aliases);
        self.registry.get(&id).and_then(|rec| rec.exports.clone())
    }

    fn run_factory(&mut self, record: &ModuleRecord, key: WaitKey) -> Run {
        let mut finish = None;
        let args: Vec<Arg> = record
            .deps
            .iter()
            .map(|dep| match dep.as_str() {
                "require" => Arg::Require,
                "exports" => Arg::Exports,
                "module" => Arg::Module,
                "host" => Arg::Value(None),
                "finish" => {
                    let handle = Finish {
                        key: key.clone(),
                        tx: self.tx.clone(),
                    };
                    finish = Some(handle.clone());
                    Arg::Finish(handle)
                }
                other => Arg::Value(self.dep_value(other)),
            })
            .collect();

        tracing::debug!(module = %record.name, "executing factory");
        let mut call = FactoryCall {
            args,
            exports: Map::new(),
            module_exports: None,
            module: ModuleInfo {
                id: record.name.clone(),
                filename: record.url.clone(),
            },
            registry: &self.registry,
            aliases: &self.config.aliases,
            tx: self.tx.clone(),
        };
        let returned = match &record.factory {
            Some(Factory::Native(f)) => f(&mut call),
            Some(Factory::Literal(v)) => Some(v.clone()),
            None => None,
        };
        let value = call.into_export(returned);
        if finish.is_some() {
            Run::Suspended(value)
        } else {
            Run::Done(value)
        }
    }

    fn run_entry(&mut self, entry: RequireEntry) {
        let values: Vec<Option<Value>> = entry
            .deps
            .iter()
            .map(|dep| {
                if naming::is_builtin(dep) {
                    None
                } else {
                    self.dep_value(dep)
                }
            })
            .collect();
        (entry.callback)(&values);
    }

    pub(crate) fn handle_signal(&mut self, signal: LoaderSignal) {
        match signal {
            LoaderSignal::Finished { key, value } => self.finished(key, value),
            LoaderSignal::Require {
                deps,
                file_url,
                callback,
            } => self.require_from(deps, file_url, callback),
        }
    }

    fn finished(&mut self, key: WaitKey, value: Option<Value>) {
        let slot = match &key {
            WaitKey::Module(name) => self.registry.get_mut(name),
            WaitKey::Reset(alias) => self
                .resets
                .get_mut(alias)
                .and_then(|copies| copies.iter_mut().rev().find(|c| c.running)),
        };
        let Some(slot) = slot else {
            return;
        };
        if !slot.running {
            tracing::trace!(?key, "finish signalled twice");
            return;
        }
        if value.is_some() {
            slot.exports = value;
        }
        slot.running = false;
        tracing::debug!(?key, "module finished");
        for queue in self.waiting.remove(&key).unwrap_or_default() {
            self.exec(queue);
        }
    }
}
