//! End-to-end behaviour through the public embedding API.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use ecmarun::abstract_ops::conversion::to_string;
use ecmarun::engine::{ErrorKind, Message};
use ecmarun::evaluator::{evaluate_script, script_evaluation_job};
use ecmarun::modules::{ModuleId, ModuleStatus, parse_module, top_level_module_evaluation_job};
use ecmarun::{Agent, Completion, Feature, HostDefinedOptions, JsValue, q};

fn agent_with(options: HostDefinedOptions) -> Agent {
    let agent = Agent::new(options);
    agent.initialize_host_defined_realm();
    agent
}

fn eval(agent: &Agent, source: &str) -> String {
    let result = evaluate_script(agent, source, None);
    agent.run_jobs();
    match result {
        Completion::Normal(v) => to_string(agent, &v).unwrap_normal().to_rust_string(),
        Completion::Throw(e) => format!("Throw: {}", agent.inspect(&e)),
        other => panic!("unexpected completion {}", other.kind()),
    }
}

fn fresh() -> Agent {
    agent_with(HostDefinedOptions::default())
}

#[test]
fn integer_keys_enumerate_before_strings() {
    let agent = fresh();
    let src = "var o = {}; o['2'] = 0; o.a = 0; o['0'] = 0; o.b = 0; o['1'] = 0; \
               JSON.stringify(Reflect.ownKeys(o))";
    assert_eq!(eval(&agent, src), r#"["0","1","2","a","b"]"#);
}

#[test]
fn array_length_shrink_stops_at_a_non_configurable_element() {
    let agent = fresh();
    let setup = "var a = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9]; \
                 Object.defineProperty(a, 5, { value: 5, configurable: false });";
    assert_eq!(eval(&agent, setup), "undefined");
    assert_eq!(eval(&agent, "Reflect.set(a, 'length', 0) + ',' + a.length"), "false,6");
    assert_eq!(eval(&agent, "a.hasOwnProperty(6) + ',' + a[4]"), "false,4");
    assert!(eval(&agent, "'use strict'; a.length = 0;").starts_with("Throw: TypeError"));
}

#[test]
fn throwing_comparator_abandons_the_sort() {
    let agent = fresh();
    let src = "var calls = 0; var input = [5, 1, 4, 2, 3]; \
               try { input.sort(function (x, y) { if (++calls === 3) throw new Error('stop'); return x - y; }); 'sorted' } \
               catch (e) { e.message + ',' + calls }";
    assert_eq!(eval(&agent, src), "stop,3");
}

fn twice(c: Completion<i32>) -> Completion<i32> {
    let v = q!(q!(Completion::<Completion<i32>>::Normal(c)));
    Completion::Normal(v + 1)
}

fn once(c: Completion<i32>) -> Completion<i32> {
    let v = q!(c);
    Completion::Normal(v + 1)
}

#[test]
fn nested_return_if_abrupt_matches_a_single_one() {
    let agent = fresh();
    let thrown = JsValue::from_str("boom");
    assert!(matches!((twice(Completion::Normal(1)), once(Completion::Normal(1))), (Completion::Normal(2), Completion::Normal(2))));
    match (twice(Completion::Throw(thrown.clone())), once(Completion::Throw(thrown))) {
        (Completion::Throw(a), Completion::Throw(b)) => assert_eq!(agent.inspect(&a), agent.inspect(&b)),
        _ => panic!("throw did not short-circuit"),
    }
    assert!(matches!(twice(Completion::Return(JsValue::Undefined)), Completion::Return(JsValue::Undefined)));
}

#[test]
fn cyclic_modules_evaluate_with_live_bindings() {
    let sources: FxHashMap<&str, &str> = [
        ("a.mjs", "import { b } from 'b.mjs'; export const a = 'A'; export function readB() { return b; }"),
        ("b.mjs", "import { a, readB } from 'a.mjs'; export const b = 'B'; export function readA() { return a; }"),
    ]
    .into_iter()
    .collect();
    let loaded: Rc<RefCell<FxHashMap<String, ModuleId>>> = Rc::default();
    let cache = loaded.clone();
    let options = HostDefinedOptions::default()
        .with_feature(Feature::GlobalThis)
        .on_resolve_imported_module(move |agent, _referrer, request| {
            if let Some(id) = cache.borrow().get(request) {
                return Completion::Normal(*id);
            }
            let Some(source) = sources.get(request) else {
                return agent.throw(ErrorKind::Error, Message::CouldNotResolveModule(request.to_owned()));
            };
            let id = q!(parse_module(agent, source, agent.current_realm(), Some(request.to_owned())));
            cache.borrow_mut().insert(request.to_owned(), id);
            Completion::Normal(id)
        });
    let agent = agent_with(options);
    let main = "import { readB } from 'a.mjs'; import { readA } from 'b.mjs'; globalThis.result = readA() + readB();";
    top_level_module_evaluation_job(&agent, main.to_owned(), Some("entry.mjs".to_owned()));
    agent.run_jobs();
    assert_eq!(eval(&agent, "result"), "AB");
    for name in ["a.mjs", "b.mjs"] {
        let id = loaded.borrow()[name];
        assert_eq!(agent.module(id).status(), ModuleStatus::Evaluated);
    }
}

#[test]
fn jobs_enqueued_by_a_job_run_after_earlier_jobs() {
    let agent = agent_with(HostDefinedOptions::default().with_feature(Feature::GlobalThis));
    eval(&agent, "var log = [];");
    script_evaluation_job(&agent, "log.push('J1'); Promise.resolve().then(() => log.push('J4'));".to_owned(), None);
    script_evaluation_job(&agent, "log.push('J2');".to_owned(), None);
    script_evaluation_job(&agent, "log.push('J3');".to_owned(), None);
    agent.run_jobs();
    assert_eq!(eval(&agent, "log.join()"), "J1,J2,J3,J4");
}

#[test]
fn promise_reactions_drain_in_fifo_order() {
    let agent = fresh();
    let src = "var log = []; \
               Promise.resolve().then(() => { log.push('J1'); Promise.resolve().then(() => log.push('J4')); }); \
               Promise.resolve().then(() => log.push('J2')); \
               Promise.resolve().then(() => log.push('J3'));";
    eval(&agent, src);
    assert_eq!(eval(&agent, "log.join()"), "J1,J2,J3,J4");
}

#[test]
fn let_loops_capture_a_binding_per_iteration() {
    let agent = fresh();
    let with_let = "var captured = []; for (let i = 0; i < 3; i++) { captured.push(() => i); } \
                    captured.map(f => f()).join()";
    let with_var = "var captured = []; for (var j = 0; j < 3; j++) { captured.push(() => j); } \
                    captured.map(f => f()).join()";
    assert_eq!(eval(&agent, with_let), "0,1,2");
    assert_eq!(eval(&agent, with_var), "3,3,3");
}

#[test]
fn uncaught_job_errors_reach_the_host_and_do_not_stop_the_queue() {
    let reported: Rc<RefCell<Vec<String>>> = Rc::default();
    let sink = reported.clone();
    let agent = agent_with(HostDefinedOptions::default().on_report_error(move |agent, error| {
        sink.borrow_mut().push(agent.inspect(error));
    }));
    eval(&agent, "var after = false;");
    script_evaluation_job(&agent, "null.x".to_owned(), None);
    script_evaluation_job(&agent, "after = true;".to_owned(), None);
    agent.run_jobs();
    assert_eq!(reported.borrow().len(), 1);
    assert!(reported.borrow()[0].starts_with("TypeError"));
    assert_eq!(eval(&agent, "after"), "true");
}
