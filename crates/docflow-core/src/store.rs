//! Vistas clave/valor de especificaciones e instancias.
//!
//! El motor exige una vista transaccional mínima: specs por código
//! (insertar una vez, leer) e instancias por identidad de documento
//! (insertar única, leer, sobreescribir al confirmar). Las implementaciones
//! en memoria son volátiles y no sincronizadas por hilos; si se necesita
//! concurrencia, envolver el engine completo en `Mutex`/`RwLock` del host.
//!
//! La fachada (`engine`) implementa la semántica transaccional trabajando
//! sobre una copia de la instancia y confirmando con `update` sólo si la
//! cadena completa terminó sin error.

use std::collections::HashMap;

use docflow_domain::WorkflowSpec;

use crate::document::DocumentRef;
use crate::errors::InstanceError;
use crate::instance::WorkflowInstance;

/// Vista de especificaciones instaladas, por código de workflow.
pub trait SpecStore {
    fn insert(&mut self, spec: WorkflowSpec);

    fn get(&self, code: &str) -> Option<&WorkflowSpec>;

    fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }
}

/// Vista de instancias, por identidad de documento (única).
pub trait InstanceStore {
    /// Inserta una instancia nueva; la identidad de documento debe estar
    /// libre.
    fn insert(&mut self, instance: WorkflowInstance) -> Result<(), InstanceError>;

    fn get(&self, document: &DocumentRef) -> Option<&WorkflowInstance>;

    /// Sobreescribe la instancia del documento (confirmación de una
    /// transacción del motor).
    fn update(&mut self, instance: WorkflowInstance);
}

/// Implementación en memoria del `SpecStore`.
#[derive(Debug, Default)]
pub struct InMemorySpecStore {
    pub inner: HashMap<String, WorkflowSpec>,
}

impl InMemorySpecStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl SpecStore for InMemorySpecStore {
    fn insert(&mut self, spec: WorkflowSpec) {
        self.inner.insert(spec.code().to_string(), spec);
    }

    fn get(&self, code: &str) -> Option<&WorkflowSpec> {
        self.inner.get(code)
    }
}

/// Implementación en memoria del `InstanceStore`.
#[derive(Debug, Default)]
pub struct InMemoryInstanceStore {
    pub inner: HashMap<DocumentRef, WorkflowInstance>,
}

impl InMemoryInstanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl InstanceStore for InMemoryInstanceStore {
    fn insert(&mut self, instance: WorkflowInstance) -> Result<(), InstanceError> {
        let document = instance.document().clone();
        if self.inner.contains_key(&document) {
            return Err(InstanceError::DocumentAlreadyBound { doc_type: document.doc_type,
                                                             key: document.key });
        }
        self.inner.insert(document, instance);
        Ok(())
    }

    fn get(&self, document: &DocumentRef) -> Option<&WorkflowInstance> {
        self.inner.get(document)
    }

    fn update(&mut self, instance: WorkflowInstance) {
        self.inner.insert(instance.document().clone(), instance);
    }
}
