//! docflow-core: runtime de ejecución de workflows
//!
//! Propósito:
//! - Instanciar especificaciones validadas (`docflow-domain`) sobre
//!   documentos de negocio opacos y avanzar las instancias por el grafo.
//! - Orquestar splits anidados (cursos paralelos), ruteo condicional por
//!   multiplexer, joins forzados y cancelación recursiva.
//! - Mediar cada avance disparado por usuario con el chequeo de permisos
//!   contra el documento asociado.
//!
//! Componentes principales:
//! - `document`: contratos opacos `Document` y `User` del host.
//! - `registry`: registros de callables (handlers, condiciones, joiners) y
//!   de tipos de documento, claveados por ruta punteada.
//! - `instance`: arena de instancias (workflow, cursos, nodos) y sus
//!   predicados de estado.
//! - `store`: vistas clave/valor de specs e instancias (traits + memoria).
//! - `installer`: instalación atómica de declaraciones.
//! - `permissions`: las tres puertas de autorización.
//! - `runner`: motor de recorrido (start/execute/cancel y encadenamiento).
//! - `engine`: fachada transaccional sobre stores y registries.
//!
//! Modelo de ejecución: síncrono y de un solo hilo por llamada. Cada punto
//! de entrada público corre dentro de una transacción del host; un error en
//! medio de una cadena de transiciones revierte la cadena completa.

pub mod document;
pub mod engine;
pub mod errors;
pub mod installer;
pub mod instance;
pub mod permissions;
pub mod registry;
pub mod runner;
pub mod store;

pub use document::{Document, DocumentRef, User};
pub use engine::WorkflowEngine;
pub use errors::{DeniedError, EngineError, ExecError, InstanceError, LookupError};
pub use instance::{BranchStatus, CourseInstance, CourseStatus, NodeInstance, WorkflowInstance};
pub use registry::{CallableRegistry, DocumentTypeRegistry, ModelKind};
pub use runner::CourseActions;
pub use store::{InMemoryInstanceStore, InMemorySpecStore, InstanceStore, SpecStore};
