//! Instalación atómica de declaraciones de workflow.
//!
//! Pasos: verificar el tipo de documento contra el registro del host,
//! construir la arena desde la declaración, resolver todas las rutas de
//! callables contra el registro y correr la validación estructural
//! completa. Sólo si todo pasó se persiste la spec: un fallo en cualquier
//! paso no deja estado observable.

use log::info;

use docflow_domain::{declaration, validator, WorkflowDeclaration};

use crate::errors::EngineError;
use crate::registry::{CallableRegistry, DocumentTypeRegistry};
use crate::store::SpecStore;

/// Instala una declaración ya parseada. Devuelve el código del workflow
/// instalado.
pub fn install(specs: &mut dyn SpecStore,
               documents: &DocumentTypeRegistry,
               callables: &CallableRegistry,
               decl: &WorkflowDeclaration)
               -> Result<String, EngineError> {
    documents.check(&decl.model)?;

    let spec = declaration::build(decl)?;

    if specs.contains(spec.code()) {
        return Err(EngineError::WorkflowAlreadyInstalled { workflow: spec.code().to_string() });
    }

    // Resolución temprana de callables: una ruta desconocida aborta la
    // instalación completa.
    for (kind, path) in spec.callable_paths() {
        match kind {
            "landing-handler" => {
                callables.handler(&path)?;
            }
            "joiner" => {
                callables.joiner(&path)?;
            }
            _ => {
                callables.condition(&path)?;
            }
        }
    }

    validator::validate(&spec)?;

    let code = spec.code().to_string();
    info!("workflow `{}` installed ({} courses)", code, spec.courses().len());
    specs.insert(spec);
    Ok(code)
}
