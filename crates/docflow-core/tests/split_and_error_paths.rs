//! Contratos del multiplexer y del joiner, incluidos los caminos de error y
//! el rollback de cadenas fallidas.

use docflow_adapters::{Task, TeamUser};
use docflow_core::{CallableRegistry, CourseStatus, DocumentTypeRegistry, InMemoryInstanceStore, InMemorySpecStore,
                   WorkflowEngine};
use serde_json::{json, Value};

type Engine = WorkflowEngine<InMemorySpecStore, InMemoryInstanceStore>;

fn test_registry() -> CallableRegistry {
    let mut registry = CallableRegistry::new();
    registry.register_condition("test.cond.yes", |_d, _u| Ok(true));
    registry.register_condition("test.cond.no", |_d, _u| Ok(false));
    registry.register_condition("test.cond.boom", |_d, _u| Err("condition exploded".into()));
    registry.register_handler("test.handler.boom", |_d, _u| Err("handler exploded".into()));
    registry.register_joiner("test.join.null", |_d, _s, _r| Ok(None));
    registry.register_joiner("test.join.blank", |_d, _s, _r| Ok(Some(String::new())));
    registry.register_joiner("test.join.ghost", |_d, _s, _r| Ok(Some("ghost".into())));
    registry.register_joiner("test.join.eager", |_d, _s, _r| Ok(Some("go".into())));
    registry
}

fn engine_with(decl: Value) -> Engine {
    let mut documents = DocumentTypeRegistry::new();
    documents.register_document_type("sample.Task");
    let mut engine = WorkflowEngine::in_memory(test_registry(), documents);
    engine.install_value(decl).expect("la declaración de prueba instala");
    engine
}

fn status_of(engine: &Engine, task: &Task, path: &str) -> CourseStatus {
    engine.status(task).expect("status")[path].clone()
}

/// Raíz con un input y un multiplexer de dos salidas (101 y 102).
fn mux_declaration(first: &str, second: &str) -> Value {
    json!({
        "model": "sample.Task", "code": "mux", "name": "Mux",
        "courses": [
            { "code": "", "name": "Root",
              "nodes": [
                  { "type": "enter", "code": "origin", "name": "Origin" },
                  { "type": "input", "code": "go", "name": "Go" },
                  { "type": "multiplexer", "code": "router", "name": "Router" },
                  { "type": "exit", "code": "low", "name": "Low", "exitValue": 101 },
                  { "type": "exit", "code": "high", "name": "High", "exitValue": 102 },
                  { "type": "cancel", "code": "cancel", "name": "Cancel" }
              ],
              "transitions": [
                  { "origin": "origin", "destination": "go", "name": "Wait" },
                  { "origin": "go", "destination": "router", "name": "Route", "actionName": "route" },
                  { "origin": "router", "destination": "low", "name": "Low",
                    "priority": 1, "condition": first },
                  { "origin": "router", "destination": "high", "name": "High",
                    "priority": 2, "condition": second }
              ] }
        ]
    })
}

/// Raíz con split de dos ramas de input y joiner parametrizable.
fn split_declaration(joiner: &str) -> Value {
    let branch = |code: &str| {
        json!({
            "code": code, "name": code, "description": "",
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
            ]
        })
    };
    json!({
        "model": "sample.Task", "code": "forked", "name": "Forked",
        "courses": [
            { "code": "", "name": "Root",
              "nodes": [
                  { "type": "enter", "code": "origin", "name": "Origin" },
                  { "type": "split", "code": "gate", "name": "Gate",
                    "branches": ["left", "right"], "joiner": joiner },
                  { "type": "exit", "code": "done", "name": "Done", "exitValue": 100 },
                  { "type": "exit", "code": "alt", "name": "Alt", "exitValue": 101 },
                  { "type": "cancel", "code": "cancel", "name": "Cancel" }
              ],
              "transitions": [
                  { "origin": "origin", "destination": "gate", "name": "Open" },
                  { "origin": "gate", "destination": "done", "name": "Go", "actionName": "go" },
                  { "origin": "gate", "destination": "alt", "name": "Alt", "actionName": "alt" }
              ] },
            branch("left"),
            branch("right")
        ]
    })
}

#[test]
fn multiplexer_takes_the_first_satisfied_condition() {
    let mut engine = engine_with(mux_declaration("test.cond.no", "test.cond.yes"));
    let owner = TeamUser::without_permissions("owner");
    let task = Task::deliverable("M-1");

    engine.create(&owner, "mux", &task).expect("create");
    engine.start(&owner, &task, "").expect("start");
    engine.execute(&owner, &task, "route", "").expect("route");
    assert_eq!(status_of(&engine, &task, ""), CourseStatus::Ended { exit_code: 102 });
}

#[test]
fn multiplexer_with_no_satisfied_condition_fails_and_rolls_back() {
    let mut engine = engine_with(mux_declaration("test.cond.no", "test.cond.no"));
    let owner = TeamUser::without_permissions("owner");
    let task = Task::deliverable("M-2");

    engine.create(&owner, "mux", &task).expect("create");
    engine.start(&owner, &task, "").expect("start");
    let err = engine.execute(&owner, &task, "route", "").unwrap_err();
    assert_eq!(err.code(), "multiplexer-unsatisfied");
    assert_eq!(err.http_status(), 500);
    assert_eq!(status_of(&engine, &task, ""), CourseStatus::Waiting { node: "go".into() });
}

#[test]
fn failing_condition_surfaces_as_execution_error() {
    let mut engine = engine_with(mux_declaration("test.cond.boom", "test.cond.yes"));
    let owner = TeamUser::without_permissions("owner");
    let task = Task::deliverable("M-3");

    engine.create(&owner, "mux", &task).expect("create");
    engine.start(&owner, &task, "").expect("start");
    let err = engine.execute(&owner, &task, "route", "").unwrap_err();
    assert_eq!(err.code(), "execution-error");
    assert_eq!(status_of(&engine, &task, ""), CourseStatus::Waiting { node: "go".into() });
}

#[test]
fn undecided_joiner_fails_once_every_branch_terminated() {
    let mut engine = engine_with(split_declaration("test.join.null"));
    let owner = TeamUser::without_permissions("owner");
    let task = Task::deliverable("S-1");

    engine.create(&owner, "forked", &task).expect("create");
    engine.start(&owner, &task, "").expect("start");
    engine.start(&owner, &task, "left").expect("start left");
    engine.start(&owner, &task, "right").expect("start right");

    // Primera rama: el joiner no decide y la otra sigue corriendo: espera.
    engine.execute(&owner, &task, "finish", "left").expect("finish left");
    assert_eq!(status_of(&engine, &task, "left"), CourseStatus::Ended { exit_code: 100 });

    // Segunda rama: el joiner sigue sin decidir con todo terminado: error,
    // y la cadena completa (incluida la salida de `right`) se revierte.
    let err = engine.execute(&owner, &task, "finish", "right").unwrap_err();
    assert_eq!(err.code(), "split-join-unresolved");
    assert_eq!(status_of(&engine, &task, "right"),
               CourseStatus::Waiting { node: "waiting".into() });
}

#[test]
fn blank_joiner_result_is_invalid() {
    let mut engine = engine_with(split_declaration("test.join.blank"));
    let owner = TeamUser::without_permissions("owner");
    let task = Task::deliverable("S-2");

    engine.create(&owner, "forked", &task).expect("create");
    engine.start(&owner, &task, "").expect("start");
    engine.start(&owner, &task, "left").expect("start left");

    let err = engine.execute(&owner, &task, "finish", "left").unwrap_err();
    assert_eq!(err.code(), "invalid-joiner-result");
    assert_eq!(status_of(&engine, &task, "left"),
               CourseStatus::Waiting { node: "waiting".into() });
}

#[test]
fn unknown_joiner_action_is_reported() {
    let mut engine = engine_with(split_declaration("test.join.ghost"));
    let owner = TeamUser::without_permissions("owner");
    let task = Task::deliverable("S-3");

    engine.create(&owner, "forked", &task).expect("create");
    engine.start(&owner, &task, "").expect("start");
    engine.start(&owner, &task, "left").expect("start left");

    let err = engine.execute(&owner, &task, "finish", "left").unwrap_err();
    assert_eq!(err.code(), "node-transition-does-not-exist");
}

#[test]
fn eager_joiner_force_joins_the_running_branch() {
    let mut engine = engine_with(split_declaration("test.join.eager"));
    let owner = TeamUser::without_permissions("owner");
    let task = Task::deliverable("S-4");

    engine.create(&owner, "forked", &task).expect("create");
    engine.start(&owner, &task, "").expect("start");
    engine.start(&owner, &task, "left").expect("start left");
    engine.start(&owner, &task, "right").expect("start right");

    // `right` queda corriendo: el joiner decide `go` igual, así que `right`
    // se une a la fuerza y la raíz sale por `done`.
    engine.execute(&owner, &task, "finish", "left").expect("finish left");
    assert_eq!(status_of(&engine, &task, ""), CourseStatus::Ended { exit_code: 100 });
}

#[test]
fn force_join_without_joined_node_fails_the_whole_chain() {
    // Split exterior con joiner; la rama `deep` abre un split interior sin
    // joiner cuyas hojas no tienen nodo joined. El join forzado de `deep`
    // debe recorrer sus hojas vivas y fallar, revirtiendo la cadena.
    let leaf = |code: &str| {
        json!({
            "code": code, "name": code, "description": "",
            "nodes": [
                { "type": "enter", "code": "origin", "name": "Origin" },
                { "type": "input", "code": "waiting", "name": "Waiting" },
                { "type": "exit", "code": "done", "name": "Done", "exitValue": 100 },
                { "type": "cancel", "code": "cancel", "name": "Cancel" }
            ],
            "transitions": [
                { "origin": "origin", "destination": "waiting", "name": "Wait" },
                { "origin": "waiting", "destination": "done", "name": "Finish", "actionName": "finish" }
            ]
        })
    };
    let decl = json!({
        "model": "sample.Task", "code": "deep-join", "name": "Deep Join",
        "courses": [
            { "code": "", "name": "Root",
              "nodes": [
                  { "type": "enter", "code": "origin", "name": "Origin" },
                  { "type": "split", "code": "outer", "name": "Outer",
                    "branches": ["deep", "flat"], "joiner": "test.join.eager" },
                  { "type": "exit", "code": "done", "name": "Done", "exitValue": 100 },
                  { "type": "exit", "code": "alt", "name": "Alt", "exitValue": 101 },
                  { "type": "cancel", "code": "cancel", "name": "Cancel" }
              ],
              "transitions": [
                  { "origin": "origin", "destination": "outer", "name": "Open" },
                  { "origin": "outer", "destination": "done", "name": "Go", "actionName": "go" },
                  { "origin": "outer", "destination": "alt", "name": "Alt", "actionName": "alt" }
              ] },
            { "code": "deep", "name": "Deep", "description": "",
              "nodes": [
                  { "type": "enter", "code": "origin", "name": "Origin" },
                  { "type": "split", "code": "inner", "name": "Inner",
                    "branches": ["leaf-a", "leaf-b"] },
                  { "type": "exit", "code": "done", "name": "Done", "exitValue": 100 },
                  { "type": "cancel", "code": "cancel", "name": "Cancel" },
                  { "type": "joined", "code": "joined", "name": "Joined" }
              ],
              "transitions": [
                  { "origin": "origin", "destination": "inner", "name": "Open" },
                  { "origin": "inner", "destination": "done", "name": "Close", "actionName": "close" }
              ] },
            { "code": "flat", "name": "Flat", "description": "",
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
              ] },
            leaf("leaf-a"),
            leaf("leaf-b")
        ]
    });
    let mut engine = engine_with(decl);
    let owner = TeamUser::without_permissions("owner");
    let task = Task::deliverable("S-5");

    engine.create(&owner, "deep-join", &task).expect("create");
    engine.start(&owner, &task, "").expect("start");
    engine.start(&owner, &task, "deep").expect("start deep");
    engine.start(&owner, &task, "flat").expect("start flat");

    // `flat` sale; el joiner decide `go` y el join forzado baja hasta las
    // hojas de `deep`, que no son unibles.
    let err = engine.execute(&owner, &task, "finish", "flat").unwrap_err();
    assert_eq!(err.code(), "course-not-joinable");

    // Rollback completo: `flat` sigue esperando y `deep` sigue abierto.
    assert_eq!(status_of(&engine, &task, "flat"),
               CourseStatus::Waiting { node: "waiting".into() });
    assert_eq!(status_of(&engine, &task, "deep"),
               CourseStatus::Splitting { node: "inner".into() });
}

#[test]
fn failing_landing_handler_rolls_back_the_start() {
    let decl = json!({
        "model": "sample.Task", "code": "boom", "name": "Boom",
        "courses": [
            { "code": "", "name": "Root",
              "nodes": [
                  { "type": "enter", "code": "origin", "name": "Origin" },
                  { "type": "input", "code": "trap", "name": "Trap",
                    "landingHandler": "test.handler.boom" },
                  { "type": "exit", "code": "done", "name": "Done", "exitValue": 100 },
                  { "type": "cancel", "code": "cancel", "name": "Cancel" }
              ],
              "transitions": [
                  { "origin": "origin", "destination": "trap", "name": "Fall" },
                  { "origin": "trap", "destination": "done", "name": "Finish", "actionName": "finish" }
              ] }
        ]
    });
    let mut engine = engine_with(decl);
    let owner = TeamUser::without_permissions("owner");
    let task = Task::deliverable("B-1");

    engine.create(&owner, "boom", &task).expect("create");
    let err = engine.start(&owner, &task, "").unwrap_err();
    assert_eq!(err.code(), "execution-error");
    assert_eq!(err.http_status(), 500);
    assert_eq!(status_of(&engine, &task, ""), CourseStatus::Pending);
}
