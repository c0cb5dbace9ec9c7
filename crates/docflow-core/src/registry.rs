//! Registros de callables y de tipos de documento.
//!
//! Los specs referencian handlers de llegada, condiciones de multiplexer y
//! joiners por ruta punteada (`app.module.nombre`). El instalador resuelve
//! cada ruta contra el registro al momento de instalar; en ejecución la
//! invocación es opaca: cualquier fallo del callable se envuelve como error
//! de ejecución y revierte la transacción.
//!
//! Firmas fijas:
//! - handler de llegada: `(document, user) -> Result<(), String>`
//! - condición: `(document, user) -> Result<bool, String>`
//! - joiner: `(document, statuses, reached) -> Result<Option<acción>, String>`

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::document::{Document, User};
use crate::errors::{EngineError, LookupError};
use crate::instance::BranchStatus;

/// Handler disparado al aterrizar en un nodo.
pub type LandingHandler = Arc<dyn Fn(&dyn Document, &dyn User) -> Result<(), String>>;

/// Condición de una saliente de multiplexer.
pub type Condition = Arc<dyn Fn(&dyn Document, &dyn User) -> Result<bool, String>>;

/// Joiner de un split: decide la acción de salida (o `None` para esperar).
pub type Joiner = Arc<dyn Fn(&dyn Document, &IndexMap<String, BranchStatus>, &str) -> Result<Option<String>, String>>;

/// Registro de callables claveado por ruta punteada.
///
/// No es thread-safe por sí mismo: el motor es de un solo hilo por
/// transacción; hosts concurrentes deben envolverlo junto con el engine.
#[derive(Default)]
pub struct CallableRegistry {
    handlers: HashMap<String, LandingHandler>,
    conditions: HashMap<String, Condition>,
    joiners: HashMap<String, Joiner>,
}

impl CallableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_handler<F>(&mut self, path: impl Into<String>, handler: F)
        where F: Fn(&dyn Document, &dyn User) -> Result<(), String> + 'static
    {
        self.handlers.insert(path.into(), Arc::new(handler));
    }

    pub fn register_condition<F>(&mut self, path: impl Into<String>, condition: F)
        where F: Fn(&dyn Document, &dyn User) -> Result<bool, String> + 'static
    {
        self.conditions.insert(path.into(), Arc::new(condition));
    }

    pub fn register_joiner<F>(&mut self, path: impl Into<String>, joiner: F)
        where F: Fn(&dyn Document, &IndexMap<String, BranchStatus>, &str) -> Result<Option<String>, String> + 'static
    {
        self.joiners.insert(path.into(), Arc::new(joiner));
    }

    pub fn handler(&self, path: &str) -> Result<&LandingHandler, LookupError> {
        self.handlers.get(path).ok_or_else(|| LookupError::CallableDoesNotExist { kind: "landing handler",
                                                                                  path: path.to_string() })
    }

    pub fn condition(&self, path: &str) -> Result<&Condition, LookupError> {
        self.conditions.get(path).ok_or_else(|| LookupError::CallableDoesNotExist { kind: "condition",
                                                                                    path: path.to_string() })
    }

    pub fn joiner(&self, path: &str) -> Result<&Joiner, LookupError> {
        self.joiners.get(path).ok_or_else(|| LookupError::CallableDoesNotExist { kind: "joiner",
                                                                                 path: path.to_string() })
    }
}

impl std::fmt::Debug for CallableRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallableRegistry")
         .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
         .field("conditions", &self.conditions.keys().collect::<Vec<_>>())
         .field("joiners", &self.joiners.keys().collect::<Vec<_>>())
         .finish()
    }
}

/// Clase de un modelo registrado en el host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Acepta workflows.
    Document,
    /// Modelo conocido pero ajeno a los workflows.
    Plain,
}

/// Modelos que el host reconoce, distinguiendo cuáles son documentos de
/// workflow. Permite al instalador separar "modelo desconocido" (404) de
/// "modelo conocido pero no-documento" (400).
#[derive(Debug, Default)]
pub struct DocumentTypeRegistry {
    models: HashMap<String, ModelKind>,
}

impl DocumentTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_document_type(&mut self, model: impl Into<String>) {
        self.models.insert(model.into(), ModelKind::Document);
    }

    pub fn register_plain_model(&mut self, model: impl Into<String>) {
        self.models.insert(model.into(), ModelKind::Plain);
    }

    /// Verifica que `model` exista y sea un tipo de documento.
    pub fn check(&self, model: &str) -> Result<(), EngineError> {
        match self.models.get(model) {
            Some(ModelKind::Document) => Ok(()),
            Some(ModelKind::Plain) => Err(EngineError::NotADocumentType { model: model.to_string() }),
            None => Err(EngineError::Missing(LookupError::DocumentTypeUnknown { model: model.to_string() })),
        }
    }
}
