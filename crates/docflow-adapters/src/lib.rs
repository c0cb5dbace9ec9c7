//! docflow-adapters: piezas de muestra para demos y tests.
//!
//! Provee un documento concreto (`Task`), un usuario con matriz de permisos
//! (`TeamUser`), los callables de la aplicación de ejemplo (condiciones por
//! tipo de servicio, joiners de facturación/control y aprobación/auditoría)
//! y la declaración del ciclo de vida de tareas que ejercita splits
//! anidados, multiplexer e inputs con permisos.

pub mod callables;
pub mod documents;
pub mod fixtures;

pub use callables::{sample_document_types, sample_registry};
pub use documents::{ServiceType, Task, TeamUser};
pub use fixtures::task_lifecycle_declaration;
