//! docflow-cli: demostración por línea de comandos.
//!
//! Instala una declaración (el primer argumento es un archivo JSON; sin
//! argumentos usa el ciclo de vida de tareas de muestra), crea una
//! instancia sobre una tarea de ejemplo y recorre el camino feliz
//! imprimiendo el estado tras cada paso. Los callables disponibles son los
//! del registro de muestra (`sample.support.*`).

use std::env;
use std::fs;
use std::process::ExitCode;

use docflow_adapters::{sample_document_types, sample_registry, task_lifecycle_declaration, Task, TeamUser};
use docflow_core::{EngineError, WorkflowEngine};

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error [{}]: {}", e.code(), e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), EngineError> {
    let mut engine = WorkflowEngine::in_memory(sample_registry(), sample_document_types());

    let code = match env::args().nth(1) {
        Some(path) => {
            let input = fs::read_to_string(&path)
                .map_err(|e| EngineError::MalformedInput { message: format!("cannot read `{}`: {}", path, e) })?;
            engine.install_json(&input)?
        }
        None => engine.install_value(task_lifecycle_declaration())?,
    };
    println!("installed workflow `{}`", code);

    if code != "task-lifecycle" {
        // Con una declaración externa sólo se demuestra la instalación.
        return Ok(());
    }

    let owner = TeamUser::with_all_permissions("owner");
    let task = Task::deliverable("T-demo");
    engine.create(&owner, &code, &task)?;
    engine.start(&owner, &task, "")?;
    print_status(&engine, &task)?;

    for action in ["assign", "start", "complete"] {
        engine.execute(&owner, &task, action, "")?;
        println!("-- after `{}`:", action);
        print_status(&engine, &task)?;
    }

    // Ramas paralelas: control (con su split interior) y facturación.
    for path in ["control", "control.approval", "control.audit", "invoice"] {
        engine.start(&owner, &task, path)?;
    }
    engine.execute(&owner, &task, "approve", "control.approval")?;
    engine.execute(&owner, &task, "audit", "control.audit")?;
    engine.execute(&owner, &task, "invoice", "invoice")?;
    println!("-- after the joins:");
    print_status(&engine, &task)?;

    engine.execute(&owner, &task, "deliver", "")?;
    println!("-- final:");
    print_status(&engine, &task)?;
    Ok(())
}

fn print_status(engine: &WorkflowEngine<docflow_core::InMemorySpecStore, docflow_core::InMemoryInstanceStore>,
                task: &Task)
                -> Result<(), EngineError> {
    for (path, status) in engine.status(task)? {
        let label = if path.is_empty() { "<root>".to_string() } else { path };
        println!("   {:<24} {:?}", label, status);
    }
    Ok(())
}
