//! Escenarios punta a punta del motor, de la instalación al estado final.

use docflow_adapters::{sample_document_types, sample_registry, task_lifecycle_declaration, Task, TeamUser};
use docflow_core::{CallableRegistry, CourseStatus, DocumentTypeRegistry, InMemoryInstanceStore, InMemorySpecStore,
                   WorkflowEngine};
use serde_json::{json, Value};

type Engine = WorkflowEngine<InMemorySpecStore, InMemoryInstanceStore>;

fn documents() -> DocumentTypeRegistry {
    let mut registry = DocumentTypeRegistry::new();
    registry.register_document_type("sample.Task");
    registry
}

fn engine_with(callables: CallableRegistry, decl: Value) -> Engine {
    let mut engine = WorkflowEngine::in_memory(callables, documents());
    engine.install_value(decl).expect("la declaración instala");
    engine
}

fn status_of(engine: &Engine, task: &Task, path: &str) -> CourseStatus {
    engine.status(task).expect("status")[path].clone()
}

#[test]
fn minimal_happy_path_runs_to_the_exit() {
    let decl = json!({
        "model": "sample.Task", "code": "wf", "name": "Minimal",
        "courses": [
            { "code": "", "name": "Root",
              "nodes": [
                  { "type": "enter", "code": "origin", "name": "Origin" },
                  { "type": "exit", "code": "done", "name": "Done", "exitValue": 100 },
                  { "type": "cancel", "code": "cancel", "name": "Cancel" }
              ],
              "transitions": [
                  { "origin": "origin", "destination": "done", "name": "Run" }
              ] }
        ]
    });
    let mut engine = engine_with(CallableRegistry::new(), decl);
    let owner = TeamUser::without_permissions("owner");
    let task = Task::deliverable("E2E-1");

    engine.create(&owner, "wf", &task).expect("create");
    engine.start(&owner, &task, "").expect("start");

    let status = engine.status(&task).expect("status");
    assert_eq!(status.len(), 1);
    assert_eq!(status[""], CourseStatus::Ended { exit_code: 100 });
}

#[test]
fn input_gate_honours_the_transition_permission() {
    let decl = json!({
        "model": "sample.Task", "code": "gated", "name": "Gated",
        "courses": [
            { "code": "", "name": "Root",
              "nodes": [
                  { "type": "enter", "code": "origin", "name": "Origin" },
                  { "type": "input", "code": "gate", "name": "Gate" },
                  { "type": "exit", "code": "done", "name": "Done", "exitValue": 100 },
                  { "type": "cancel", "code": "cancel", "name": "Cancel" }
              ],
              "transitions": [
                  { "origin": "origin", "destination": "gate", "name": "Wait" },
                  { "origin": "gate", "destination": "done", "name": "Submit",
                    "actionName": "submit", "permission": "sample.submit" }
              ] }
        ]
    });
    let mut engine = engine_with(CallableRegistry::new(), decl);
    let outsider = TeamUser::without_permissions("outsider");
    let clerk = TeamUser::new("clerk", ["sample.submit"]);
    let task = Task::deliverable("E2E-2");

    engine.create(&outsider, "gated", &task).expect("create");
    engine.start(&outsider, &task, "").expect("start");

    let err = engine.execute(&outsider, &task, "submit", "").unwrap_err();
    assert_eq!(err.code(), "advance-denied-by-transition");
    assert_eq!(status_of(&engine, &task, ""), CourseStatus::Waiting { node: "gate".into() });

    engine.execute(&clerk, &task, "submit", "").expect("submit");
    assert_eq!(status_of(&engine, &task, ""), CourseStatus::Ended { exit_code: 100 });
}

fn routed_declaration() -> Value {
    json!({
        "model": "sample.Task", "code": "routed", "name": "Routed",
        "courses": [
            { "code": "", "name": "Root",
              "nodes": [
                  { "type": "enter", "code": "origin", "name": "Origin" },
                  { "type": "input", "code": "gate", "name": "Gate" },
                  { "type": "multiplexer", "code": "router", "name": "Router" },
                  { "type": "exit", "code": "a", "name": "A", "exitValue": 101 },
                  { "type": "exit", "code": "b", "name": "B", "exitValue": 102 },
                  { "type": "cancel", "code": "cancel", "name": "Cancel" }
              ],
              "transitions": [
                  { "origin": "origin", "destination": "gate", "name": "Wait" },
                  { "origin": "gate", "destination": "router", "name": "Route", "actionName": "route" },
                  { "origin": "router", "destination": "a", "name": "A",
                    "priority": 1, "condition": "cond.a" },
                  { "origin": "router", "destination": "b", "name": "B",
                    "priority": 2, "condition": "cond.b" }
              ] }
        ]
    })
}

#[test]
fn multiplexer_routes_by_priority_order() {
    let mut callables = CallableRegistry::new();
    callables.register_condition("cond.a", |_d, _u| Ok(false));
    callables.register_condition("cond.b", |_d, _u| Ok(true));
    let mut engine = engine_with(callables, routed_declaration());
    let owner = TeamUser::without_permissions("owner");
    let task = Task::deliverable("E2E-3");

    engine.create(&owner, "routed", &task).expect("create");
    engine.start(&owner, &task, "").expect("start");
    engine.execute(&owner, &task, "route", "").expect("route");
    assert_eq!(status_of(&engine, &task, ""), CourseStatus::Ended { exit_code: 102 });
}

#[test]
fn multiplexer_without_a_truthy_condition_fails() {
    let mut callables = CallableRegistry::new();
    callables.register_condition("cond.a", |_d, _u| Ok(false));
    callables.register_condition("cond.b", |_d, _u| Ok(false));
    let mut engine = engine_with(callables, routed_declaration());
    let owner = TeamUser::without_permissions("owner");
    let task = Task::deliverable("E2E-4");

    engine.create(&owner, "routed", &task).expect("create");
    engine.start(&owner, &task, "").expect("start");
    let err = engine.execute(&owner, &task, "route", "").unwrap_err();
    assert_eq!(err.code(), "multiplexer-unsatisfied");
    assert_eq!(status_of(&engine, &task, ""), CourseStatus::Waiting { node: "gate".into() });
}

#[test]
fn rejecting_the_approval_joins_the_audit_and_loops_back() {
    let mut engine = WorkflowEngine::in_memory(sample_registry(), sample_document_types());
    engine.install_value(task_lifecycle_declaration()).expect("instala");
    let owner = TeamUser::with_all_permissions("owner");
    let task = Task::deliverable("E2E-5");

    engine.create(&owner, "task-lifecycle", &task).expect("create");
    engine.start(&owner, &task, "").expect("start");
    engine.execute(&owner, &task, "assign", "").expect("assign");
    engine.execute(&owner, &task, "start", "").expect("start action");
    engine.execute(&owner, &task, "complete", "").expect("complete");
    engine.start(&owner, &task, "control").expect("start control");
    engine.start(&owner, &task, "control.approval").expect("start approval");
    engine.start(&owner, &task, "control.audit").expect("start audit");

    // El joiner ve {approval: 102, audit: corriendo}, fuerza el join de la
    // auditoría y saca a control por `rejected`; el joiner de la raíz ve
    // control en 100 y toma `on-reject`, que vuelve al input `started`.
    engine.execute(&owner, &task, "reject", "control.approval").expect("reject");
    assert_eq!(status_of(&engine, &task, ""), CourseStatus::Waiting { node: "started".into() });
}

#[test]
fn cancelling_the_root_cascades_parent_first() {
    let branch = |code: &str, marker: &str| {
        json!({
            "code": code, "name": code, "description": "",
            "nodes": [
                { "type": "enter", "code": "origin", "name": "Origin" },
                { "type": "input", "code": "waiting", "name": "Waiting" },
                { "type": "exit", "code": "done", "name": "Done", "exitValue": 100 },
                { "type": "cancel", "code": "cancel", "name": "Cancel", "landingHandler": marker },
                { "type": "joined", "code": "joined", "name": "Joined" }
            ],
            "transitions": [
                { "origin": "origin", "destination": "waiting", "name": "Wait" },
                { "origin": "waiting", "destination": "done", "name": "Finish", "actionName": "finish" }
            ]
        })
    };
    let decl = json!({
        "model": "sample.Task", "code": "cancellable", "name": "Cancellable",
        "courses": [
            { "code": "", "name": "Root",
              "nodes": [
                  { "type": "enter", "code": "origin", "name": "Origin" },
                  { "type": "split", "code": "fork", "name": "Fork",
                    "branches": ["left", "right"], "joiner": "join.wait" },
                  { "type": "exit", "code": "done", "name": "Done", "exitValue": 100 },
                  { "type": "exit", "code": "alt", "name": "Alt", "exitValue": 101 },
                  { "type": "cancel", "code": "cancel", "name": "Cancel", "landingHandler": "mark.root" }
              ],
              "transitions": [
                  { "origin": "origin", "destination": "fork", "name": "Open" },
                  { "origin": "fork", "destination": "done", "name": "Go", "actionName": "go" },
                  { "origin": "fork", "destination": "alt", "name": "Alt", "actionName": "alt" }
              ] },
            branch("left", "mark.left"),
            branch("right", "mark.right")
        ]
    });
    let mut callables = CallableRegistry::new();
    callables.register_joiner("join.wait", |_d, _s, _r| Ok(None));
    callables.register_handler("mark.root", |d, _u| {
                 mark(d, "[root]");
                 Ok(())
             });
    callables.register_handler("mark.left", |d, _u| {
                 mark(d, "[left]");
                 Ok(())
             });
    callables.register_handler("mark.right", |d, _u| {
                 mark(d, "[right]");
                 Ok(())
             });

    let mut engine = engine_with(callables, decl);
    let owner = TeamUser::without_permissions("owner");
    let task = Task::new("E2E-6", docflow_adapters::ServiceType::Deliverable, "");

    engine.create(&owner, "cancellable", &task).expect("create");
    engine.start(&owner, &task, "").expect("start");
    engine.start(&owner, &task, "left").expect("start left");
    engine.start(&owner, &task, "right").expect("start right");

    engine.cancel(&owner, &task, "").expect("cancel");

    // Primero cayó el nodo cancel de la raíz y después el de cada rama; el
    // joiner `join.wait` nunca fue consultado (habría devuelto None con
    // todo terminado y reventado la cadena).
    assert_eq!(task.content(), "[root][left][right]");
    let status = engine.status(&task).expect("status");
    assert_eq!(status[""], CourseStatus::Cancelled { exit_code: -1 });
    assert_eq!(status.len(), 1);
}

#[test]
fn automatic_path_rejection_persists_nothing() {
    let decl = json!({
        "model": "sample.Task", "code": "auto", "name": "Auto",
        "courses": [
            { "code": "", "name": "Root",
              "nodes": [
                  { "type": "enter", "code": "origin", "name": "Origin" },
                  { "type": "split", "code": "fork", "name": "Fork", "branches": ["fast", "slow"],
                    "joiner": "join.wait" },
                  { "type": "exit", "code": "done", "name": "Done", "exitValue": 100 },
                  { "type": "exit", "code": "alt", "name": "Alt", "exitValue": 101 },
                  { "type": "cancel", "code": "cancel", "name": "Cancel" }
              ],
              "transitions": [
                  { "origin": "origin", "destination": "fork", "name": "Open" },
                  { "origin": "fork", "destination": "done", "name": "Go", "actionName": "go" },
                  { "origin": "fork", "destination": "alt", "name": "Alt", "actionName": "alt" }
              ] },
            { "code": "fast", "name": "Fast", "description": "",
              "nodes": [
                  { "type": "enter", "code": "origin", "name": "Origin" },
                  { "type": "step", "code": "bridge", "name": "Bridge" },
                  { "type": "exit", "code": "done", "name": "Done", "exitValue": 100 },
                  { "type": "cancel", "code": "cancel", "name": "Cancel" },
                  { "type": "joined", "code": "joined", "name": "Joined" }
              ],
              "transitions": [
                  { "origin": "origin", "destination": "bridge", "name": "Cross" },
                  { "origin": "bridge", "destination": "done", "name": "Land" }
              ] },
            { "code": "slow", "name": "Slow", "description": "",
              "nodes": [
                  { "type": "enter", "code": "origin", "name": "Origin" },
                  { "type": "input", "code": "waiting", "name": "Waiting" },
                  { "type": "exit", "code": "done", "name": "Done", "exitValue": 100 },
                  { "type": "cancel", "code": "cancel", "name": "Cancel" },
                  { "type": "joined", "code": "joined", "name": "Joined" }
              ],
              "transitions": [
                  { "origin": "origin", "destination": "waiting", "name": "Wait" },
                  { "origin": "waiting", "destination": "done", "name": "Finish", "actionName": "finish" }
              ] }
        ]
    });
    let mut callables = CallableRegistry::new();
    callables.register_joiner("join.wait", |_d, _s, _r| Ok(None));
    let mut engine = WorkflowEngine::in_memory(callables, documents());

    let err = engine.install_value(decl).unwrap_err();
    assert_eq!(err.code(), "course-has-automatic-path");

    let owner = TeamUser::without_permissions("owner");
    let task = Task::deliverable("E2E-7");
    let err = engine.create(&owner, "auto", &task).unwrap_err();
    assert_eq!(err.code(), "workflow-does-not-exist");
}

fn mark(document: &dyn docflow_core::Document, tag: &str) {
    if let Some(task) = document.as_any().downcast_ref::<Task>() {
        task.append_content(tag);
    }
}
