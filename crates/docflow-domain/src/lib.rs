//! docflow-domain: modelo de especificación de workflows
//!
//! Propósito:
//! - Definir las entidades inmutables de especificación (workflow, cursos,
//!   nodos y transiciones) junto con sus invariantes estructurales.
//! - Proveer el cargador declarativo (JSON / estructura ya parseada) que
//!   resuelve códigos a índices de arena e infiere profundidades de curso.
//! - Proveer el validador de grafo completo: unicidad de curso raíz,
//!   aciclicidad del grafo de ramas, tablas de aridad por tipo de nodo,
//!   presencia de campos por tipo de origen, alcanzabilidad y prohibición de
//!   caminos automáticos en cursos no raíz.
//!
//! Componentes principales:
//! - `workflow` / `course` / `node` / `transition`: entidades de la spec.
//! - `declaration`: formato declarativo de entrada y su constructor.
//! - `validator`: verificación estructural ordenada y determinista.
//! - `slug`: reglas de los códigos internos.
//! - `errors`: errores semánticos de estado inválido, con la entidad
//!   ofensora y un código estable.
//!
//! Las entidades no conocen persistencia ni ejecución: el runtime vive en
//! `docflow-core`.

pub mod course;
pub mod declaration;
pub mod errors;
pub mod node;
pub mod slug;
pub mod transition;
pub mod validator;
pub mod workflow;

pub use course::CourseSpec;
pub use declaration::{CourseDeclaration, NodeDeclaration, TransitionDeclaration, WorkflowDeclaration};
pub use errors::{SpecEntity, SpecError};
pub use node::{NodeKind, NodeRef, NodeSpec};
pub use transition::TransitionSpec;
pub use validator::validate;
pub use workflow::WorkflowSpec;

/// Índice de curso dentro de la arena de un `WorkflowSpec`.
pub type CourseIdx = usize;
/// Índice de nodo dentro de un `CourseSpec`.
pub type NodeIdx = usize;
