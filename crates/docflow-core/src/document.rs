//! Contratos opacos del host: documentos y usuarios.
//!
//! El motor nunca inspecciona los campos de un documento: sólo necesita su
//! etiqueta de tipo y una identidad estable. Los handlers, condiciones y
//! joiners sí conocen el tipo concreto y pueden recuperarlo vía `as_any`.

use serde::{Deserialize, Serialize};

/// Documento de negocio asociado a una instancia de workflow.
pub trait Document {
    /// Etiqueta de tipo, como `<app>.<Model>`.
    fn doc_type(&self) -> &str;

    /// Identidad estable dentro del tipo.
    fn key(&self) -> String;

    /// Acceso al tipo concreto para los callables del host.
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Identidad persistible de un documento: tipo + clave.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
    pub doc_type: String,
    pub key: String,
}

impl DocumentRef {
    pub fn of(document: &dyn Document) -> Self {
        DocumentRef { doc_type: document.doc_type().to_string(),
                      key: document.key() }
    }
}

impl std::fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.doc_type, self.key)
    }
}

/// Usuario del host. La única capacidad que el motor necesita es evaluar un
/// permiso contra el documento asociado a la instancia.
pub trait User {
    fn username(&self) -> &str;

    fn has_permission(&self, permission: &str, document: &dyn Document) -> bool;
}
