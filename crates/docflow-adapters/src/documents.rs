//! Documento y usuario de muestra.

use std::cell::RefCell;
use std::collections::HashSet;

use docflow_core::{Document, User};
use once_cell::sync::Lazy;

/// Permisos que maneja la aplicación de ejemplo.
static ALL_PERMISSIONS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec!["sample.create_task",
         "sample.cancel_task",
         "sample.review_task",
         "sample.start_task",
         "sample.complete_task",
         "sample.deliver_task",
         "sample.pick_attend_task"]
});

/// Tipo de servicio de una tarea; gobierna el ruteo del multiplexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceType {
    Deliverable,
    NonDeliverable,
    Service,
}

/// Tarea de la aplicación de ejemplo. El contenido es mutable con el motor
/// de un solo hilo: los handlers lo editan durante la transacción.
#[derive(Debug)]
pub struct Task {
    key: String,
    service_type: ServiceType,
    content: RefCell<String>,
}

impl Task {
    pub fn new(key: impl Into<String>, service_type: ServiceType, content: impl Into<String>) -> Self {
        Task { key: key.into(),
               service_type,
               content: RefCell::new(content.into()) }
    }

    /// Tarea entregable con contenido por defecto.
    pub fn deliverable(key: impl Into<String>) -> Self {
        Self::new(key, ServiceType::Deliverable, "Task")
    }

    /// Tarea no entregable con contenido por defecto.
    pub fn non_deliverable(key: impl Into<String>) -> Self {
        Self::new(key, ServiceType::NonDeliverable, "Task")
    }

    /// Tarea de servicio con contenido por defecto.
    pub fn service(key: impl Into<String>) -> Self {
        Self::new(key, ServiceType::Service, "Task")
    }

    pub fn service_type(&self) -> ServiceType {
        self.service_type
    }

    pub fn content(&self) -> String {
        self.content.borrow().clone()
    }

    pub fn append_content(&self, suffix: &str) {
        self.content.borrow_mut().push_str(suffix);
    }
}

impl Document for Task {
    fn doc_type(&self) -> &str {
        "sample.Task"
    }

    fn key(&self) -> String {
        self.key.clone()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Usuario con una matriz plana de permisos. La aplicación de ejemplo no
/// distingue por documento: el permiso vale para cualquier tarea.
#[derive(Debug, Clone)]
pub struct TeamUser {
    username: String,
    permissions: HashSet<String>,
}

impl TeamUser {
    pub fn new<I, P>(username: impl Into<String>, permissions: I) -> Self
        where I: IntoIterator<Item = P>,
              P: Into<String>
    {
        TeamUser { username: username.into(),
                   permissions: permissions.into_iter().map(Into::into).collect() }
    }

    /// Usuario sin ningún permiso.
    pub fn without_permissions(username: impl Into<String>) -> Self {
        Self::new(username, Vec::<String>::new())
    }

    /// Usuario con todos los permisos de la aplicación de ejemplo.
    pub fn with_all_permissions(username: impl Into<String>) -> Self {
        Self::new(username, ALL_PERMISSIONS.iter().copied())
    }
}

impl User for TeamUser {
    fn username(&self) -> &str {
        &self.username
    }

    fn has_permission(&self, permission: &str, _document: &dyn Document) -> bool {
        self.permissions.contains(permission)
    }
}
