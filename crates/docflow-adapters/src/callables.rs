//! Callables de la aplicación de ejemplo.
//!
//! Las condiciones rutean por tipo de servicio; los joiners deciden la
//! salida de los splits según los códigos de salida de sus ramas. Las rutas
//! punteadas replican los nombres de la aplicación (`sample.support.*`).

use docflow_core::{CallableRegistry, Document, DocumentTypeRegistry};

use crate::documents::{ServiceType, Task};

fn as_task(document: &dyn Document) -> Result<&Task, String> {
    document.as_any()
            .downcast_ref::<Task>()
            .ok_or_else(|| format!("expected a sample.Task document, got `{}`", document.doc_type()))
}

/// Registro de callables con todo lo que usan las declaraciones de muestra.
pub fn sample_registry() -> CallableRegistry {
    let mut registry = CallableRegistry::new();

    registry.register_condition("sample.support.is_deliverable", |document, _user| {
                Ok(as_task(document)?.service_type() == ServiceType::Deliverable)
            });
    registry.register_condition("sample.support.is_non_deliverable", |document, _user| {
                Ok(as_task(document)?.service_type() == ServiceType::NonDeliverable)
            });
    registry.register_condition("sample.support.is_service", |document, _user| {
                Ok(as_task(document)?.service_type() == ServiceType::Service)
            });

    registry.register_handler("sample.support.on_pending_delivery", |document, _user| {
                as_task(document)?.append_content(" Pending Delivery");
                Ok(())
            });

    // Decide la salida del split facturación/control: un control rechazado
    // (100) fuerza el rechazo; ambos presentes aceptan; si no, esperar.
    registry.register_joiner("sample.support.invoice_control_joiner", |_document, statuses, _reached| {
                let control = statuses.get("control").and_then(|s| s.exit_code());
                let invoice = statuses.get("invoice").and_then(|s| s.exit_code());
                if control == Some(100) {
                    Ok(Some("on-reject".to_string()))
                } else if control.is_some() && invoice.is_some() {
                    Ok(Some("on-accept".to_string()))
                } else {
                    Ok(None)
                }
            });

    // Decide la salida del split aprobación/auditoría: una aprobación con
    // código 102 significa rechazo y no espera a la auditoría.
    registry.register_joiner("sample.support.approve_audit_joiner", |_document, statuses, _reached| {
                let approval = statuses.get("approval").and_then(|s| s.exit_code());
                let audit = statuses.get("audit").and_then(|s| s.exit_code());
                if approval == Some(102) {
                    Ok(Some("rejected".to_string()))
                } else if approval.is_some() && audit.is_some() {
                    Ok(Some("satisfied".to_string()))
                } else {
                    Ok(None)
                }
            });

    registry
}

/// Modelos que reconoce la aplicación de ejemplo: la tarea como documento
/// de workflow y un modelo plano para los casos negativos del instalador.
pub fn sample_document_types() -> DocumentTypeRegistry {
    let mut registry = DocumentTypeRegistry::new();
    registry.register_document_type("sample.Task");
    registry.register_plain_model("auth.User");
    registry
}
