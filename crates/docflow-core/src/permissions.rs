//! Puertas de autorización del motor.
//!
//! Tres chequeos puros: instanciar, cancelar y avanzar. Todo permiso se
//! evalúa contra el documento asociado a la instancia, nunca contra un
//! espacio global. Cada función retorna normalmente o falla con el error de
//! denegación correspondiente.

use docflow_domain::{NodeKind, TransitionSpec, WorkflowSpec};

use crate::document::{Document, User};
use crate::errors::DeniedError;
use crate::instance::WorkflowInstance;

/// Puede el usuario crear una instancia de este workflow sobre `document`.
pub fn can_instantiate(spec: &WorkflowSpec, user: &dyn User, document: &dyn Document) -> Result<(), DeniedError> {
    if let Some(permission) = spec.create_permission() {
        if !user.has_permission(permission, document) {
            return Err(DeniedError::CreateDenied { workflow: spec.code().to_string() });
        }
    }
    Ok(())
}

/// Puede el usuario cancelar el curso en `idx`. Primero manda el permiso a
/// nivel workflow, luego el del propio curso.
pub fn can_cancel(spec: &WorkflowSpec,
                  instance: &WorkflowInstance,
                  idx: usize,
                  user: &dyn User,
                  document: &dyn Document)
                  -> Result<(), DeniedError> {
    if let Some(permission) = spec.cancel_permission() {
        if !user.has_permission(permission, document) {
            return Err(DeniedError::CancelDeniedByWorkflow { workflow: spec.code().to_string(),
                                                             path: instance.path_of(spec, idx) });
        }
    }
    let course = spec.course(instance.course(idx).course());
    if let Some(permission) = course.cancel_permission() {
        if !user.has_permission(permission, document) {
            return Err(DeniedError::CancelDeniedByCourse { workflow: spec.code().to_string(),
                                                           path: instance.path_of(spec, idx) });
        }
    }
    Ok(())
}

/// Puede el usuario tomar `transition` desde el estado actual del curso.
///
/// Caso de arranque (curso sin instancia de nodo): sólo cuenta el permiso de
/// la transición. Con nodo corriente: debe ser un input (las salidas de un
/// split las decide el joiner, sin mediación de usuario), y mandan primero
/// el permiso del nodo y después el de la transición.
pub fn can_advance(spec: &WorkflowSpec,
                   instance: &WorkflowInstance,
                   idx: usize,
                   transition: &TransitionSpec,
                   user: &dyn User,
                   document: &dyn Document)
                   -> Result<(), DeniedError> {
    let check_transition = |path: &str| -> Result<(), DeniedError> {
        if let Some(permission) = transition.permission() {
            if !user.has_permission(permission, document) {
                return Err(DeniedError::AdvanceDeniedByTransition {
                    action: transition.action_name().map(str::to_string),
                    path: path.to_string(),
                });
            }
        }
        Ok(())
    };

    match instance.current_node_idx(idx) {
        None => check_transition(&instance.path_of(spec, idx)),
        Some(node_idx) => {
            let node = spec.course(instance.course(idx).course()).node(node_idx);
            let path = instance.path_of(spec, idx);
            match node.kind() {
                NodeKind::Input => {
                    if let Some(permission) = node.execute_permission() {
                        if !user.has_permission(permission, document) {
                            return Err(DeniedError::AdvanceDeniedByNode { node: node.code().to_string(),
                                                                          path });
                        }
                    }
                    check_transition(&path)
                }
                NodeKind::Split => Ok(()),
                _ => Err(DeniedError::AdvanceDeniedWrongNodeType { node: node.code().to_string(),
                                                                   path }),
            }
        }
    }
}
