use super::*;
use crate::module::{
    record::{LoadState, ModuleDef},
    source::MemorySource,
};

fn observer(ticket: u64, module: &str) -> Observer {
    Observer {
        ticket,
        module: module.to_string(),
    }
}

fn remote(reg: &mut Registry, cfg: &LoaderConfig, name: &str, url: &str, deps: &[&str]) {
    reg.define(ModuleDef::remote(name, url).deps(deps.to_vec()), cfg);
}

#[test]
fn true_url_prefers_scheme_then_dist_then_base() {
    let mut cfg = LoaderConfig {
        base_url: Some("js/".to_string()),
        ..LoaderConfig::default()
    };
    assert_eq!(true_url("http://cdn/x.js", &cfg), "http://cdn/x.js");
    assert_eq!(true_url("mo/lang.js", &cfg), "js/mo/lang.js");

    cfg.enable_ozma = Some(true);
    assert_eq!(true_url("mo/lang.js", &cfg), "js/mo/lang.js");
    cfg.dist_url = Some("dist/".to_string());
    assert_eq!(true_url("mo/lang.js", &cfg), "dist/mo/lang.js");

    cfg.enable_auto_suffix = Some(true);
    assert_eq!(true_url("mo/lang.js", &cfg), "dist/mo/lang_pack.js");
    assert_eq!(true_url("lib/_g_src.js", &cfg), "dist/lib/_g_combo.js");
}

#[test]
fn second_requester_joins_observers() {
    let cfg = LoaderConfig::default();
    let mut reg = Registry::default();
    remote(&mut reg, &cfg, "a", "a.js", &[]);
    let handle = MemorySource::new();
    let mut source = handle.clone();
    let mut fetcher = Fetcher::default();

    let first = fetcher.fetch(&reg, &cfg, &mut source, "a", observer(1, "a"));
    assert_eq!(first, FetchOutcome::Requested("a.js".to_string()));
    let second = fetcher.fetch(&reg, &cfg, &mut source, "a", observer(2, "a"));
    assert_eq!(second, FetchOutcome::Queued);
    assert_eq!(handle.request_count("a.js"), 1);

    assert_eq!(fetcher.take_in_flight("a.js").as_deref(), Some("a.js"));
    let observers = fetcher.mark_loaded("a.js");
    assert_eq!(observers, vec![observer(1, "a"), observer(2, "a")]);
    assert!(fetcher.is_loaded("a.js"));

    let third = fetcher.fetch(&reg, &cfg, &mut source, "a", observer(3, "a"));
    assert_eq!(third, FetchOutcome::AlreadyLoaded(observer(3, "a")));
    assert_eq!(handle.request_count("a.js"), 1);
}

#[test]
fn dependent_fetch_waits_behind_delay_gate() {
    let cfg = LoaderConfig::default();
    let mut reg = Registry::default();
    remote(&mut reg, &cfg, "lib", "lib.js", &[]);
    remote(&mut reg, &cfg, "app", "app.js", &["lib"]);
    reg.get_mut("lib").unwrap().load_state = LoadState::Loading;
    let handle = MemorySource::new();
    let mut source = handle.clone();
    let mut fetcher = Fetcher::default();

    fetcher.fetch(&reg, &cfg, &mut source, "lib", observer(1, "lib"));
    let app = fetcher.fetch(&reg, &cfg, &mut source, "app", observer(1, "app"));
    assert_eq!(app, FetchOutcome::Deferred);
    let again = fetcher.fetch(&reg, &cfg, &mut source, "app", observer(2, "app"));
    assert_eq!(again, FetchOutcome::Deferred);
    assert_eq!(handle.requests(), vec!["lib.js".to_string()]);

    fetcher.mark_loaded("lib.js");
    reg.get_mut("lib").unwrap().load_state = LoadState::Loaded;
    let opened = fetcher.release("lib.js");
    assert_eq!(
        opened,
        vec![("app".to_string(), vec![observer(1, "app"), observer(2, "app")])]
    );
    assert!(fetcher.release("lib.js").is_empty());

    let app = fetcher.fetch(&reg, &cfg, &mut source, "app", observer(1, "app"));
    assert_eq!(app, FetchOutcome::Requested("app.js".to_string()));
}

#[test]
fn loaded_dependencies_do_not_delay() {
    let cfg = LoaderConfig::default();
    let mut reg = Registry::default();
    remote(&mut reg, &cfg, "lib", "lib.js", &[]);
    remote(&mut reg, &cfg, "app", "app.js", &["lib", "unknown"]);
    reg.get_mut("lib").unwrap().load_state = LoadState::Loaded;
    let mut source = MemorySource::new();
    let mut fetcher = Fetcher::default();
    let app = fetcher.fetch(&reg, &cfg, &mut source, "app", observer(1, "app"));
    assert_eq!(app, FetchOutcome::Requested("app.js".to_string()));
}

#[test]
fn mutually_declared_modules_do_not_gate_each_other() {
    let cfg = LoaderConfig::default();
    let mut reg = Registry::default();
    remote(&mut reg, &cfg, "a", "a.js", &["b"]);
    remote(&mut reg, &cfg, "b", "b.js", &["a"]);
    let handle = MemorySource::new();
    let mut source = handle.clone();
    let mut fetcher = Fetcher::default();

    let b = fetcher.fetch(&reg, &cfg, &mut source, "b", observer(1, "b"));
    assert_eq!(b, FetchOutcome::Requested("b.js".to_string()));
    let a = fetcher.fetch(&reg, &cfg, &mut source, "a", observer(1, "a"));
    assert_eq!(a, FetchOutcome::Deferred);

    assert_eq!(fetcher.take_in_flight("b.js").as_deref(), Some("b.js"));
    assert_eq!(fetcher.mark_loaded("b.js"), vec![observer(1, "b")]);
    assert_eq!(
        fetcher.release("b.js"),
        vec![("a".to_string(), vec![observer(1, "a")])]
    );
    let a = fetcher.fetch(&reg, &cfg, &mut source, "a", observer(1, "a"));
    assert_eq!(a, FetchOutcome::Requested("a.js".to_string()));
    assert_eq!(handle.requests(), vec!["b.js".to_string(), "a.js".to_string()]);
}

#[test]
fn unrequested_dependencies_do_not_delay() {
    let cfg = LoaderConfig::default();
    let mut reg = Registry::default();
    remote(&mut reg, &cfg, "lib", "lib.js", &[]);
    remote(&mut reg, &cfg, "app", "app.js", &["lib"]);
    reg.get_mut("lib").unwrap().load_state = LoadState::Loading;
    let mut source = MemorySource::new();
    let mut fetcher = Fetcher::default();
    let app = fetcher.fetch(&reg, &cfg, &mut source, "app", observer(1, "app"));
    assert_eq!(app, FetchOutcome::Requested("app.js".to_string()));
}
