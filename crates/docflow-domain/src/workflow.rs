//! Especificación de workflow: raíz del modelo.

use serde::{Deserialize, Serialize};

use crate::course::CourseSpec;
use crate::errors::{SpecEntity, SpecError};
use crate::node::{NodeKind, NodeRef, NodeSpec};
use crate::CourseIdx;

/// Definición inmutable de un proceso, ligada a un tipo de documento.
///
/// Posee sus cursos en una arena ordenada; exactamente uno es el curso raíz
/// (profundidad 0, código vacío). Una vez instalada no se modifica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSpec {
    pub(crate) code: String,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) document_type: String,
    pub(crate) create_permission: Option<String>,
    pub(crate) cancel_permission: Option<String>,
    pub(crate) courses: Vec<CourseSpec>,
}

impl WorkflowSpec {
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Tipo de documento (`<app>.<Model>`) que aceptan las instancias.
    pub fn document_type(&self) -> &str {
        &self.document_type
    }

    pub fn create_permission(&self) -> Option<&str> {
        self.create_permission.as_deref()
    }

    pub fn cancel_permission(&self) -> Option<&str> {
        self.cancel_permission.as_deref()
    }

    pub fn courses(&self) -> &[CourseSpec] {
        &self.courses
    }

    pub fn course(&self, idx: CourseIdx) -> &CourseSpec {
        &self.courses[idx]
    }

    pub fn course_by_code(&self, code: &str) -> Option<CourseIdx> {
        self.courses.iter().position(|c| c.code == code)
    }

    /// Nodo referenciado por un `NodeRef` de esta arena.
    pub fn node(&self, node: NodeRef) -> &NodeSpec {
        &self.courses[node.course].nodes[node.node]
    }

    /// Curso raíz, verificando que exista exactamente uno.
    pub fn root_course(&self) -> Result<CourseIdx, SpecError> {
        let mut roots = self.courses.iter().enumerate().filter(|(_, c)| c.is_root());
        let entity = SpecEntity::Workflow { workflow: self.code.clone() };
        match (roots.next(), roots.next()) {
            (Some((idx, _)), None) => Ok(idx),
            (None, _) => Err(SpecError::WorkflowHasNoMainCourse { entity }),
            (Some(_), Some(_)) => Err(SpecError::WorkflowHasMultipleMainCourses { entity }),
        }
    }

    /// Splits que abren un curso dado (sus "callers"), como referencias de
    /// nodo de la arena.
    pub fn callers(&self, course: CourseIdx) -> Vec<NodeRef> {
        let mut found = Vec::new();
        for (cidx, c) in self.courses.iter().enumerate() {
            for (nidx, n) in c.nodes.iter().enumerate() {
                if n.branches.contains(&course) {
                    found.push(NodeRef { course: cidx, node: nidx });
                }
            }
        }
        found
    }

    /// Rutas punteadas de todos los callables referenciados por la spec:
    /// handlers de llegada, joiners y condiciones. Para resolución temprana
    /// en la instalación.
    pub fn callable_paths(&self) -> Vec<(&'static str, String)> {
        let mut paths = Vec::new();
        for c in &self.courses {
            for n in &c.nodes {
                if let Some(h) = &n.landing_handler {
                    paths.push(("landing-handler", h.clone()));
                }
                if let Some(j) = &n.joiner {
                    paths.push(("joiner", j.clone()));
                }
            }
            for t in &c.transitions {
                if let Some(cond) = &t.condition {
                    paths.push(("condition", cond.clone()));
                }
            }
        }
        paths
    }

    /// Entidad de error para un curso de esta spec.
    pub(crate) fn course_entity(&self, course: CourseIdx) -> SpecEntity {
        SpecEntity::Course { workflow: self.code.clone(),
                             course: self.courses[course].code.clone() }
    }

    /// Entidad de error para un nodo de esta spec.
    pub(crate) fn node_entity(&self, course: CourseIdx, node: usize) -> SpecEntity {
        SpecEntity::Node { workflow: self.code.clone(),
                           course: self.courses[course].code.clone(),
                           node: self.courses[course].nodes[node].code.clone() }
    }

    /// Entidad de error para una transición de esta spec.
    pub(crate) fn transition_entity(&self, course: CourseIdx, transition: usize) -> SpecEntity {
        let t = &self.courses[course].transitions[transition];
        SpecEntity::Transition { workflow: self.code.clone(),
                                 course: self.courses[course].code.clone(),
                                 origin: self.node(t.origin()).code().to_string(),
                                 destination: self.node(t.destination()).code().to_string() }
    }

    /// Nodo único de un tipo requerido en un curso (enter, cancel, joined).
    pub fn required_node(&self, course: CourseIdx, kind: NodeKind) -> Result<usize, SpecError> {
        let found = self.courses[course].nodes_of_kind(kind);
        match found.as_slice() {
            [single] => Ok(*single),
            [] => Err(SpecError::CourseMissingRequiredNode { entity: self.course_entity(course),
                                                            required: kind }),
            _ => Err(SpecError::CourseMultipleRequiredNodes { entity: self.course_entity(course),
                                                             required: kind }),
        }
    }
}
