//! Fachada del motor: stores, registros y semántica transaccional.
//!
//! Cada operación pública corre como una transacción: el motor trabaja
//! sobre una copia de la instancia y confirma el resultado en el store sólo
//! si la cadena completa terminó sin error. Un fallo en cualquier punto
//! (permiso, callable, estado) deja el store exactamente como estaba.

use indexmap::IndexMap;
use log::info;
use uuid::Uuid;

use docflow_domain::WorkflowDeclaration;

use crate::document::{Document, DocumentRef, User};
use crate::errors::{EngineError, InstanceError, LookupError};
use crate::installer;
use crate::instance::{CourseStatus, WorkflowInstance};
use crate::permissions;
use crate::registry::{CallableRegistry, DocumentTypeRegistry};
use crate::runner::{self, CourseActions, Runner};
use crate::store::{InMemoryInstanceStore, InMemorySpecStore, InstanceStore, SpecStore};

/// Motor de workflows sobre stores genéricos.
///
/// El host decide las vistas de persistencia implementando `SpecStore` e
/// `InstanceStore`; `in_memory` arma la variante volátil para tests, demos
/// y procesos efímeros.
pub struct WorkflowEngine<S, I>
    where S: SpecStore,
          I: InstanceStore
{
    specs: S,
    instances: I,
    callables: CallableRegistry,
    documents: DocumentTypeRegistry,
}

impl WorkflowEngine<InMemorySpecStore, InMemoryInstanceStore> {
    /// Motor con stores en memoria.
    pub fn in_memory(callables: CallableRegistry, documents: DocumentTypeRegistry) -> Self {
        Self::with_stores(InMemorySpecStore::new(), InMemoryInstanceStore::new(), callables, documents)
    }
}

impl<S, I> WorkflowEngine<S, I>
    where S: SpecStore,
          I: InstanceStore
{
    pub fn with_stores(specs: S, instances: I, callables: CallableRegistry, documents: DocumentTypeRegistry) -> Self {
        WorkflowEngine { specs,
                         instances,
                         callables,
                         documents }
    }

    pub fn callables(&self) -> &CallableRegistry {
        &self.callables
    }

    /// Spec instalada, por código.
    pub fn spec(&self, code: &str) -> Option<&docflow_domain::WorkflowSpec> {
        self.specs.get(code)
    }

    pub fn document_types(&self) -> &DocumentTypeRegistry {
        &self.documents
    }

    /// Instala una declaración en JSON textual.
    pub fn install_json(&mut self, input: &str) -> Result<String, EngineError> {
        let decl = WorkflowDeclaration::from_json(input)
            .map_err(|e| EngineError::MalformedInput { message: e.to_string() })?;
        self.install(&decl)
    }

    /// Instala una declaración ya parseada como `Value`.
    pub fn install_value(&mut self, input: serde_json::Value) -> Result<String, EngineError> {
        let decl = WorkflowDeclaration::from_value(input)
            .map_err(|e| EngineError::MalformedInput { message: e.to_string() })?;
        self.install(&decl)
    }

    /// Instala una declaración. Atómico: si algo falla no queda estado.
    pub fn install(&mut self, decl: &WorkflowDeclaration) -> Result<String, EngineError> {
        installer::install(&mut self.specs, &self.documents, &self.callables, decl)
    }

    /// Crea una instancia del workflow `code` sobre `document`. La identidad
    /// del documento debe estar libre y el usuario debe satisfacer el
    /// permiso de creación, si lo hay.
    pub fn create(&mut self, user: &dyn User, code: &str, document: &dyn Document) -> Result<Uuid, EngineError> {
        let spec = self.specs
                       .get(code)
                       .ok_or_else(|| LookupError::WorkflowDoesNotExist { workflow: code.to_string() })?;
        if spec.document_type() != document.doc_type() {
            return Err(InstanceError::DoesNotAcceptDocument { workflow: code.to_string(),
                                                              expected: spec.document_type().to_string(),
                                                              actual: document.doc_type().to_string() }.into());
        }
        permissions::can_instantiate(spec, user, document)?;

        let instance = WorkflowInstance::new(spec, DocumentRef::of(document))?;
        let id = instance.id();
        self.instances.insert(instance)?;
        info!("instance {} of `{}` created over {}", id, code, DocumentRef::of(document));
        Ok(id)
    }

    /// Instancia ligada a un documento.
    pub fn get(&self, document: &dyn Document) -> Result<&WorkflowInstance, EngineError> {
        let document_ref = DocumentRef::of(document);
        self.instances
            .get(&document_ref)
            .ok_or_else(|| LookupError::DocumentHasNoInstance { doc_type: document_ref.doc_type.clone(),
                                                                key: document_ref.key.clone() }.into())
    }

    /// Arranca el curso pendiente en `path` (vacío: el principal).
    pub fn start(&mut self, user: &dyn User, document: &dyn Document, path: &str) -> Result<(), EngineError> {
        self.transact(user, document, |runner, instance| runner.start(instance, path))
    }

    /// Ejecuta la acción `action` sobre el input corriente del curso en
    /// `path`.
    pub fn execute(&mut self,
                   user: &dyn User,
                   document: &dyn Document,
                   action: &str,
                   path: &str)
                   -> Result<(), EngineError> {
        self.transact(user, document, |runner, instance| runner.execute(instance, action, path))
    }

    /// Cancela el curso en `path` y sus ramas vivas.
    pub fn cancel(&mut self, user: &dyn User, document: &dyn Document, path: &str) -> Result<(), EngineError> {
        self.transact(user, document, |runner, instance| runner.cancel(instance, path))
    }

    /// Acciones disponibles por curso vivo, filtradas por permisos.
    pub fn available_actions(&self,
                             user: &dyn User,
                             document: &dyn Document)
                             -> Result<IndexMap<String, CourseActions>, EngineError> {
        let instance = self.get(document)?;
        let spec = self.specs
                       .get(instance.workflow())
                       .ok_or_else(|| LookupError::WorkflowDoesNotExist { workflow: instance.workflow()
                                                                                            .to_string() })?;
        let runner = Runner { spec,
                              callables: &self.callables,
                              document,
                              user };
        Ok(runner.available_actions(instance))
    }

    /// Estado resumido por curso del árbol de la instancia.
    pub fn status(&self, document: &dyn Document) -> Result<IndexMap<String, CourseStatus>, EngineError> {
        let instance = self.get(document)?;
        let spec = self.specs
                       .get(instance.workflow())
                       .ok_or_else(|| LookupError::WorkflowDoesNotExist { workflow: instance.workflow()
                                                                                            .to_string() })?;
        Ok(runner::status(spec, instance))
    }

    /// Corre `operation` sobre una copia de la instancia y confirma sólo si
    /// terminó bien: el rollback de la cadena completa es no confirmar.
    fn transact<F>(&mut self, user: &dyn User, document: &dyn Document, operation: F) -> Result<(), EngineError>
        where F: FnOnce(&Runner<'_>, &mut WorkflowInstance) -> Result<(), EngineError>
    {
        let document_ref = DocumentRef::of(document);
        let stored = self.instances
                         .get(&document_ref)
                         .ok_or_else(|| LookupError::DocumentHasNoInstance { doc_type: document_ref.doc_type
                                                                                                   .clone(),
                                                                             key: document_ref.key.clone() })?;
        let spec = self.specs
                       .get(stored.workflow())
                       .ok_or_else(|| LookupError::WorkflowDoesNotExist { workflow: stored.workflow()
                                                                                          .to_string() })?;
        let mut working = stored.clone();
        let runner = Runner { spec,
                              callables: &self.callables,
                              document,
                              user };
        operation(&runner, &mut working)?;
        self.instances.update(working);
        Ok(())
    }
}
