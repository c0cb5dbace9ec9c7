//! Demo ejecutable del motor: instala el ciclo de vida de tareas, crea una
//! instancia y muestra el efecto de un rechazo (joins forzados incluidos)
//! antes de completar el camino feliz.

use docflow_adapters::{sample_document_types, sample_registry, task_lifecycle_declaration, Task, TeamUser};
use docflow_core::{EngineError, InMemoryInstanceStore, InMemorySpecStore, WorkflowEngine};

type Engine = WorkflowEngine<InMemorySpecStore, InMemoryInstanceStore>;

fn main() {
    if let Err(e) = run() {
        eprintln!("error [{}]: {}", e.code(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), EngineError> {
    let mut engine = WorkflowEngine::in_memory(sample_registry(), sample_document_types());
    let code = engine.install_value(task_lifecycle_declaration())?;
    println!("installed `{}`", code);

    let owner = TeamUser::with_all_permissions("owner");
    let task = Task::deliverable("T-1000");
    engine.create(&owner, &code, &task)?;
    engine.start(&owner, &task, "")?;
    engine.execute(&owner, &task, "assign", "")?;
    engine.execute(&owner, &task, "start", "")?;
    engine.execute(&owner, &task, "complete", "")?;
    dump(&engine, &task, "split abierto")?;

    // Un rechazo de la aprobación une a la fuerza la auditoría, saca al
    // curso de control con 100 y hace volver la raíz al input `started`.
    engine.start(&owner, &task, "control")?;
    engine.start(&owner, &task, "control.approval")?;
    engine.start(&owner, &task, "control.audit")?;
    engine.execute(&owner, &task, "reject", "control.approval")?;
    dump(&engine, &task, "tras el rechazo")?;

    // Segunda vuelta: todo aprobado, facturado y entregado.
    engine.execute(&owner, &task, "complete", "")?;
    engine.start(&owner, &task, "control")?;
    engine.start(&owner, &task, "control.approval")?;
    engine.start(&owner, &task, "control.audit")?;
    engine.execute(&owner, &task, "approve", "control.approval")?;
    engine.execute(&owner, &task, "audit", "control.audit")?;
    engine.start(&owner, &task, "invoice")?;
    engine.execute(&owner, &task, "invoice", "invoice")?;
    engine.execute(&owner, &task, "deliver", "")?;
    dump(&engine, &task, "final")?;

    println!("task content: {}", task.content());
    Ok(())
}

fn dump(engine: &Engine, task: &Task, label: &str) -> Result<(), EngineError> {
    println!("-- {}:", label);
    for (path, status) in engine.status(task)? {
        let shown = if path.is_empty() { "<root>".to_string() } else { path };
        println!("   {:<24} {:?}", shown, status);
    }
    Ok(())
}
