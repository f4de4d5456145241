use super::*;
use crate::module::record::LoadState;

fn names(steps: &VecDeque<Step>) -> Vec<String> {
    steps
        .iter()
        .map(|s| match s {
            Step::Module(n) => n.clone(),
            Step::Reset { alias, .. } => alias.clone(),
            Step::Entry(_) => "<entry>".to_string(),
        })
        .collect()
}

fn ids(xs: &[&str]) -> Vec<String> {
    xs.iter().map(|s| s.to_string()).collect()
}

fn define(reg: &mut Registry, name: &str, deps: &[&str]) {
    reg.define(
        ModuleDef::named(name).deps(deps.to_vec()).factory(|_| None),
        &LoaderConfig::default(),
    );
}

#[test]
fn leaves_first_in_declaration_order() {
    let mut reg = Registry::default();
    define(&mut reg, "a", &["b", "c"]);
    define(&mut reg, "b", &["c"]);
    define(&mut reg, "c", &[]);
    let steps = reg.scan(&LoaderConfig::default(), &ids(&["a"]), None);
    assert_eq!(names(&steps), ids(&["c", "b", "a"]));
}

#[test]
fn diamond_and_cycle_emit_each_module_once() {
    let mut reg = Registry::default();
    define(&mut reg, "a", &["b", "c"]);
    define(&mut reg, "b", &["d"]);
    define(&mut reg, "c", &["d", "a"]);
    define(&mut reg, "d", &["b"]);
    let steps = reg.scan(&LoaderConfig::default(), &ids(&["a", "c"]), None);
    assert_eq!(names(&steps), ids(&["d", "b", "c", "a"]));
}

#[test]
fn builtins_are_skipped() {
    let mut reg = Registry::default();
    define(&mut reg, "a", &["require", "exports", "module", "finish"]);
    let steps = reg.scan(&LoaderConfig::default(), &ids(&["a", "finish"]), None);
    assert_eq!(names(&steps), ids(&["a"]));
}

#[test]
fn unknown_ids_become_remote_modules() {
    let mut reg = Registry::default();
    define(&mut reg, "app", &["mo/lang", "data.json"]);
    let steps = reg.scan(&LoaderConfig::default(), &ids(&["app"]), None);
    assert_eq!(names(&steps), ids(&["mo/lang", "data.json", "app"]));
    let lang = reg.get("mo/lang").unwrap();
    assert_eq!(lang.url.as_deref(), Some("mo/lang.js"));
    assert_eq!(lang.load_state, LoadState::Unrequested);
    assert_eq!(reg.get("data.json").unwrap().url.as_deref(), Some("data.json"));
}

#[test]
fn relative_ids_resolve_against_module_url_and_are_tidied() {
    let mut reg = Registry::default();
    let cfg = LoaderConfig::default();
    reg.define(
        ModuleDef::remote("pachislot/app", "pachislot/app.js"),
        &cfg,
    );
    reg.define(
        ModuleDef::named("pachislot/app")
            .deps(["./horserace", "../mo/lang"])
            .factory(|_| None),
        &cfg,
    );
    let steps = reg.scan(&cfg, &ids(&["pachislot/app"]), None);
    assert_eq!(
        names(&steps),
        ids(&["pachislot/horserace", "mo/lang", "pachislot/app"])
    );
    assert_eq!(
        reg.get("pachislot/app").unwrap().deps,
        ids(&["pachislot/horserace", "mo/lang"])
    );
}

#[test]
fn aliases_apply_to_first_segment() {
    let mut cfg = LoaderConfig::default();
    cfg.aliases.insert("data".to_string(), "../data/".to_string());
    let mut reg = Registry::default();
    let steps = reg.scan(&cfg, &ids(&["data/2014"]), None);
    assert_eq!(names(&steps), ids(&["../data/2014"]));
    assert_eq!(
        reg.get("../data/2014").unwrap().url.as_deref(),
        Some("../data/2014.js")
    );
}

#[test]
fn reset_plugin_yields_a_reset_step_each_time() {
    let mut reg = Registry::default();
    define(&mut reg, "counter", &["base"]);
    define(&mut reg, "base", &[]);
    define(&mut reg, "a", &["new!counter"]);
    define(&mut reg, "b", &["new!counter", "counter"]);
    let steps = reg.scan(&LoaderConfig::default(), &ids(&["a", "b"]), None);
    assert_eq!(
        names(&steps),
        ids(&["base", "new!counter", "a", "new!counter", "counter", "b"])
    );
    match steps.get(1) {
        Some(Step::Reset { name, alias }) => {
            assert_eq!(name, "counter");
            assert_eq!(alias, "new!counter");
        }
        other => panic!("unexpected step {other:?}"),
    }
}

#[test]
fn self_referencing_reset_terminates() {
    let mut reg = Registry::default();
    define(&mut reg, "loop", &["new!loop"]);
    let steps = reg.scan(&LoaderConfig::default(), &ids(&["new!loop"]), None);
    assert_eq!(names(&steps), ids(&["new!loop"]));
}
