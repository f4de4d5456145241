use super::*;
use crate::module::{record::Finish, source::MemorySource};
use serde_json::json;
use std::{cell::RefCell, rc::Rc};

type Seen = Rc<RefCell<Vec<Vec<Option<Value>>>>>;

fn sink() -> (Seen, impl Fn() -> Box<dyn FnOnce(&[Option<Value>])>) {
    let seen: Seen = Rc::new(RefCell::new(Vec::new()));
    let s = Rc::clone(&seen);
    let make = move || {
        let s = Rc::clone(&s);
        Box::new(move |values: &[Option<Value>]| s.borrow_mut().push(values.to_vec()))
            as Box<dyn FnOnce(&[Option<Value>])>
    };
    (seen, make)
}

#[test]
fn callback_runs_on_a_later_turn() {
    let mut loader = Loader::new(MemorySource::new());
    loader.define(ModuleDef::literal("a", json!("A")));
    let (seen, cb) = sink();
    loader.require(["a", "require"], cb());
    assert!(seen.borrow().is_empty());
    assert!(!loader.is_idle());
    loader.run_until_idle();
    assert_eq!(*seen.borrow(), vec![vec![Some(json!("A")), None]]);
    assert!(loader.is_idle());
    assert!(loader.executed().is_empty());
}

#[test]
fn remote_scripts_load_then_execute_leaves_first() {
    let source = MemorySource::new()
        .with_script(
            "js/app.js",
            vec![ModuleDef::named("app")
                .deps(["lib"])
                .factory(|call| Some(json!(format!("app+{}", call.value(0)?.as_str()?))))],
        )
        .with_script(
            "js/lib.js",
            vec![ModuleDef::named("lib").factory(|_| Some(json!("lib")))],
        );
    let handle = source.clone();
    let cfg = LoaderConfig {
        base_url: Some("js/".to_string()),
        ..LoaderConfig::default()
    };
    let mut loader = Loader::with_config(cfg, source);
    let (seen, cb) = sink();
    loader.require(["app"], cb());
    assert_eq!(loader.pending_requires(), 1);
    loader.run_until_idle();
    assert_eq!(*seen.borrow(), vec![vec![Some(json!("app+lib"))]]);
    assert_eq!(loader.executed(), ["lib".to_string(), "app".to_string()]);
    assert_eq!(handle.request_count("js/app.js"), 1);
    assert_eq!(handle.request_count("js/lib.js"), 1);
    assert!(loader.is_script_loaded("app.js"));
    assert_eq!(loader.pending_requires(), 0);
}

#[test]
fn declared_dependencies_delay_the_dependent_fetch() {
    let source = MemorySource::new()
        .with_script("lib.js", vec![ModuleDef::literal("lib", json!(1))])
        .with_script("app.js", vec![ModuleDef::anonymous().deps(["lib"]).factory(|call| call.value(0).cloned())]);
    let handle = source.clone();
    let mut loader = Loader::new(source);
    loader.define(ModuleDef::declared("app", ["lib"]));
    let (seen, cb) = sink();
    loader.require(["app"], cb());
    assert_eq!(handle.requests(), vec!["lib.js".to_string()]);
    loader.run_turn();
    assert_eq!(handle.requests(), vec!["lib.js".to_string(), "app.js".to_string()]);
    loader.run_until_idle();
    assert_eq!(*seen.borrow(), vec![vec![Some(json!(1))]]);
}

#[test]
fn mutually_declared_modules_still_load() {
    let source = MemorySource::new()
        .with_script("a.js", vec![ModuleDef::named("a").deps(["b"]).factory(|_| Some(json!("a")))])
        .with_script("b.js", vec![ModuleDef::named("b").deps(["a"]).factory(|_| Some(json!("b")))]);
    let handle = source.clone();
    let mut loader = Loader::new(source);
    loader.define(ModuleDef::declared("a", ["b"]));
    loader.define(ModuleDef::declared("b", ["a"]));
    let (seen, cb) = sink();
    loader.require(["a"], cb());
    loader.run_until_idle();
    assert_eq!(seen.borrow().len(), 1);
    assert_eq!(seen.borrow()[0], vec![Some(json!("a"))]);
    assert_eq!(handle.request_count("a.js"), 1);
    assert_eq!(handle.request_count("b.js"), 1);
    assert!(loader.is_idle());
}

#[test]
fn anonymous_module_takes_the_name_of_its_script() {
    let source = MemorySource::new().with_script(
        "widget.js",
        vec![ModuleDef::anonymous().factory(|call| Some(json!(call.module().id)))],
    );
    let mut loader = Loader::new(source);
    let (seen, cb) = sink();
    loader.require(["widget"], cb());
    loader.run_until_idle();
    assert_eq!(*seen.borrow(), vec![vec![Some(json!("widget"))]]);
    assert_eq!(
        loader.module("widget").and_then(|m| m.url.clone()).as_deref(),
        Some("widget.js")
    );
}

#[test]
fn failed_load_yields_undefined_and_does_not_stall() {
    let mut loader = Loader::new(MemorySource::new());
    let (seen, cb) = sink();
    loader.require(["nowhere"], cb());
    loader.run_until_idle();
    assert_eq!(*seen.borrow(), vec![vec![None]]);
    assert_eq!(
        loader.module("nowhere").map(|m| m.load_state),
        Some(LoadState::Loaded)
    );
}

#[test]
fn finish_suspends_dependents_until_done() {
    let parked: Rc<RefCell<Option<Finish>>> = Rc::new(RefCell::new(None));
    let slot = Rc::clone(&parked);
    let mut loader = Loader::new(MemorySource::new());
    loader.define(ModuleDef::named("ready").deps(["finish"]).factory(move |call| {
        *slot.borrow_mut() = call.finish();
        Some(json!("early"))
    }));
    loader.define(
        ModuleDef::named("page")
            .deps(["ready"])
            .factory(|call| call.value(0).cloned()),
    );
    let (seen, cb) = sink();
    loader.require(["page"], cb());
    let (seen2, cb2) = sink();
    loader.require(["ready"], cb2());
    loader.run_until_idle();
    assert!(seen.borrow().is_empty());
    assert!(seen2.borrow().is_empty());
    assert_eq!(loader.require_value("ready"), Some(json!("early")));

    let finish = parked.borrow_mut().take().unwrap();
    finish.done(Some(json!("late")));
    loader.run_until_idle();
    assert_eq!(*seen.borrow(), vec![vec![Some(json!("late"))]]);
    assert_eq!(*seen2.borrow(), vec![vec![Some(json!("late"))]]);
    assert_eq!(loader.executed(), ["ready".to_string(), "page".to_string()]);

    finish.done(Some(json!("again")));
    loader.run_until_idle();
    assert_eq!(loader.require_value("ready"), Some(json!("late")));
}

#[test]
fn factory_runs_once_across_requires() {
    let runs = Rc::new(RefCell::new(0));
    let r = Rc::clone(&runs);
    let mut loader = Loader::new(MemorySource::new());
    loader.define(ModuleDef::named("once").factory(move |_| {
        *r.borrow_mut() += 1;
        Some(json!(*r.borrow()))
    }));
    let (seen, cb) = sink();
    loader.require(["once"], cb());
    loader.require(["once"], cb());
    loader.run_until_idle();
    loader.require(["once"], cb());
    loader.run_until_idle();
    assert_eq!(*runs.borrow(), 1);
    assert_eq!(seen.borrow().len(), 3);
    assert!(seen.borrow().iter().all(|v| v == &vec![Some(json!(1))]));
}

#[test]
fn reset_variant_is_a_fresh_execution() {
    let runs = Rc::new(RefCell::new(0));
    let r = Rc::clone(&runs);
    let mut loader = Loader::new(MemorySource::new());
    loader.define(ModuleDef::named("counter").factory(move |_| {
        *r.borrow_mut() += 1;
        Some(json!(*r.borrow()))
    }));
    loader.define(
        ModuleDef::named("a")
            .deps(["counter", "new!counter"])
            .factory(|call| Some(json!([call.value(0), call.value(1)]))),
    );
    let (seen, cb) = sink();
    loader.require(["a", "counter"], cb());
    loader.run_until_idle();
    assert_eq!(*runs.borrow(), 2);
    assert_eq!(
        *seen.borrow(),
        vec![vec![Some(json!([1, 2])), Some(json!(1))]]
    );
    assert_eq!(
        loader.executed(),
        ["counter".to_string(), "new!counter".to_string(), "a".to_string()]
    );
}

#[test]
fn require_inside_factory_resolves_relative_to_its_file() {
    let source = MemorySource::new()
        .with_script(
            "game/main.js",
            vec![ModuleDef::named("game/main").factory(|call| {
                call.require(["./rules"], |values| {
                    assert_eq!(values, [Some(json!("rules"))]);
                });
                call.exports_mut().insert("ok".to_string(), json!(true));
                None
            })],
        )
        .with_script(
            "game/rules.js",
            vec![ModuleDef::named("game/rules").factory(|_| Some(json!("rules")))],
        );
    let handle = source.clone();
    let mut loader = Loader::new(source);
    let (seen, cb) = sink();
    loader.require(["game/main"], cb());
    loader.run_until_idle();
    assert_eq!(*seen.borrow(), vec![vec![Some(json!({ "ok": true }))]]);
    assert_eq!(handle.request_count("game/rules.js"), 1);
    assert_eq!(loader.require_value("game/rules"), Some(json!("rules")));
}

#[test]
fn config_aliases_rekey_and_resolve() {
    let mut loader = Loader::new(MemorySource::new());
    loader.define(ModuleDef::literal("pachislot/data", json!(7)));
    loader
        .config(LoaderConfig {
            aliases: [("pachislot".to_string(), "../pachislot/".to_string())].into(),
            ..LoaderConfig::default()
        })
        .unwrap();
    assert!(loader.module("../pachislot/data").is_some());
    let (seen, cb) = sink();
    loader.require(["pachislot/data"], cb());
    loader.run_until_idle();
    assert_eq!(*seen.borrow(), vec![vec![Some(json!(7))]]);

    let bad = LoaderConfig {
        default_suffix: Some(".js".to_string()),
        ..LoaderConfig::default()
    };
    assert!(loader.config(bad).is_err());
    assert_eq!(loader.current_config().suffix(), "js");
}

#[test]
fn resolve_order_plans_without_running() {
    let mut loader = Loader::new(MemorySource::new());
    loader.define(ModuleDef::named("a").deps(["b"]).factory(|_| None));
    loader.define(ModuleDef::named("b").factory(|_| None));
    assert_eq!(loader.resolve_order(["a"]), vec!["b".to_string(), "a".to_string()]);
    assert!(loader.executed().is_empty());
    assert_eq!(loader.require_value("a"), None);
}
