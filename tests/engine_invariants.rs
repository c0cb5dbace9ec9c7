//! Invariantes del motor observables desde la fachada.

use docflow_adapters::{sample_document_types, sample_registry, task_lifecycle_declaration, Task, TeamUser};
use docflow_core::{CourseStatus, InMemoryInstanceStore, InMemorySpecStore, WorkflowEngine};

type Engine = WorkflowEngine<InMemorySpecStore, InMemoryInstanceStore>;

fn engine() -> Engine {
    let mut engine = WorkflowEngine::in_memory(sample_registry(), sample_document_types());
    engine.install_value(task_lifecycle_declaration()).expect("instala");
    engine
}

fn status_of(engine: &Engine, task: &Task, path: &str) -> CourseStatus {
    engine.status(task).expect("status")[path].clone()
}

#[test]
fn create_denied_writes_nothing() {
    let mut engine = engine();
    let stranger = TeamUser::without_permissions("stranger");
    let task = Task::deliverable("I-1");

    let err = engine.create(&stranger, "task-lifecycle", &task).unwrap_err();
    assert_eq!(err.code(), "create-denied");
    assert_eq!(err.http_status(), 403);
    assert_eq!(engine.get(&task).unwrap_err().code(), "document-has-no-instance");
}

#[test]
fn terminated_courses_never_move_again() {
    let mut engine = engine();
    let owner = TeamUser::with_all_permissions("owner");
    let task = Task::service("I-2");

    engine.create(&owner, "task-lifecycle", &task).expect("create");
    engine.start(&owner, &task, "").expect("start");
    engine.execute(&owner, &task, "assign", "").expect("assign");
    engine.execute(&owner, &task, "start", "").expect("start action");
    engine.execute(&owner, &task, "complete", "").expect("complete");
    for path in ["control", "control.approval", "control.audit", "invoice"] {
        engine.start(&owner, &task, path).expect("start branch");
    }
    engine.execute(&owner, &task, "approve", "control.approval").expect("approve");
    engine.execute(&owner, &task, "audit", "control.audit").expect("audit");
    engine.execute(&owner, &task, "invoice", "invoice").expect("invoice");

    // Tarea de servicio: la raíz encadena hasta el exit 105.
    assert_eq!(status_of(&engine, &task, ""), CourseStatus::Ended { exit_code: 105 });

    // Monotonicidad de la terminación: nada vuelve a mover la raíz.
    assert_eq!(engine.start(&owner, &task, "").unwrap_err().code(), "instance-not-pending");
    assert_eq!(engine.execute(&owner, &task, "deliver", "").unwrap_err().code(), "course-not-waiting");
    assert_eq!(engine.cancel(&owner, &task, "").unwrap_err().code(), "course-already-terminated");
    assert_eq!(status_of(&engine, &task, ""), CourseStatus::Ended { exit_code: 105 });
}

#[test]
fn cancel_is_rejected_once_terminated_and_idempotence_reports_it() {
    let mut engine = engine();
    let owner = TeamUser::with_all_permissions("owner");
    let task = Task::deliverable("I-3");

    engine.create(&owner, "task-lifecycle", &task).expect("create");
    engine.start(&owner, &task, "").expect("start");
    engine.cancel(&owner, &task, "").expect("cancel");
    assert_eq!(status_of(&engine, &task, ""), CourseStatus::Cancelled { exit_code: -1 });

    let err = engine.cancel(&owner, &task, "").unwrap_err();
    assert_eq!(err.code(), "course-already-terminated");
    assert_eq!(status_of(&engine, &task, ""), CourseStatus::Cancelled { exit_code: -1 });
}

#[test]
fn split_branches_mirror_the_spec_and_instances_stay_consistent() {
    let mut engine = engine();
    let owner = TeamUser::with_all_permissions("owner");
    let task = Task::deliverable("I-4");

    engine.create(&owner, "task-lifecycle", &task).expect("create");
    engine.start(&owner, &task, "").expect("start");
    engine.execute(&owner, &task, "assign", "").expect("assign");
    engine.execute(&owner, &task, "start", "").expect("start action");
    engine.execute(&owner, &task, "complete", "").expect("complete");
    engine.start(&owner, &task, "control").expect("start control");

    let spec = engine.spec("task-lifecycle").expect("spec instalada");
    let instance = engine.get(&task).expect("instancia");
    instance.verify_consistency(spec).expect("biyección de ramas y referencias coherentes");

    // A lo sumo una instancia de nodo por curso, y sólo los cursos
    // pendientes carecen de ella.
    for (idx, course) in instance.courses().iter().enumerate() {
        assert_eq!(course.node_instance().is_none(), instance.is_pending(idx));
    }
}

#[test]
fn exit_codes_are_well_typed() {
    let mut engine = engine();
    let owner = TeamUser::with_all_permissions("owner");
    let task = Task::deliverable("I-5");

    engine.create(&owner, "task-lifecycle", &task).expect("create");
    engine.start(&owner, &task, "").expect("start");
    engine.execute(&owner, &task, "assign", "").expect("assign");
    engine.execute(&owner, &task, "start", "").expect("start action");
    engine.execute(&owner, &task, "complete", "").expect("complete");
    engine.cancel(&owner, &task, "invoice").expect("cancel invoice");

    let status = engine.status(&task).expect("status");
    // Cancelado: siempre -1. Terminado por exit: el exitValue del nodo.
    assert_eq!(status["invoice"], CourseStatus::Cancelled { exit_code: -1 });
    match &status["control"] {
        CourseStatus::Pending => {}
        other => panic!("control debía seguir pendiente, está {:?}", other),
    }
}
