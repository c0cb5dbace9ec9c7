//! Instancias de ejecución: workflow, cursos y nodos.
//!
//! Una instancia de workflow es una arena de instancias de curso que forma
//! un árbol: la raíz (índice 0) corresponde al curso principal; cada split
//! alcanzado abre una instancia hija por rama declarada. El vínculo
//! curso-instancia -> nodo-instancia (a lo sumo uno) es la única fuente de
//! verdad del estado del curso, y su reemplazo es el paso atómico del motor.
//!
//! Al abandonar un split por una transición (camino del joiner), la
//! instancia de nodo reemplazada se lleva consigo los vínculos a sus ramas:
//! los cursos hijos quedan desconectados del árbol y dejan de ser
//! observables, igual que las rondas de join del modelo original.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use docflow_domain::{CourseIdx, NodeIdx, NodeKind, SpecError, WorkflowSpec};

use crate::document::DocumentRef;
use crate::errors::InstanceError;

/// Estado observable de una rama, tal como lo consume un joiner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BranchStatus {
    /// La rama sigue corriendo (o aún no arrancó).
    Running,
    /// La rama terminó en su nodo cancel.
    Cancelled,
    /// La rama fue unida a la fuerza.
    Joined,
    /// La rama salió por un nodo exit con este valor.
    Ended(u8),
}

impl BranchStatus {
    /// Código de salida convencional: `None` corriendo, `-1` cancelada o
    /// unida, `>= 0` el valor del exit.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            BranchStatus::Running => None,
            BranchStatus::Cancelled | BranchStatus::Joined => Some(-1),
            BranchStatus::Ended(value) => Some(*value as i32),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, BranchStatus::Running)
    }
}

/// Estado resumido de un curso para la consulta `status()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum CourseStatus {
    /// Sin instancia de nodo: aún no arrancó.
    Pending,
    /// Detenido en un nodo input.
    Waiting { node: String },
    /// Detenido en un split con ramas vivas.
    Splitting { node: String },
    /// Terminado en su nodo cancel.
    Cancelled { exit_code: i32 },
    /// Terminado por exit (valor del nodo) o unido a la fuerza (−1).
    Ended { exit_code: i32 },
}

/// Instancia de nodo: el nodo corriente de un curso.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInstance {
    pub(crate) node: NodeIdx,
    /// Índices de arena de las instancias de curso abiertas por este nodo
    /// (sólo splits).
    pub(crate) branches: Vec<usize>,
    pub(crate) reached_at: DateTime<Utc>,
}

impl NodeInstance {
    pub fn node(&self) -> NodeIdx {
        self.node
    }

    pub fn branches(&self) -> &[usize] {
        &self.branches
    }

    pub fn reached_at(&self) -> DateTime<Utc> {
        self.reached_at
    }
}

/// Instancia de curso: un camino paralelo del árbol de la instancia.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseInstance {
    pub(crate) course: CourseIdx,
    /// Índice de arena de la instancia de curso cuyo split abrió ésta;
    /// `None` únicamente para la raíz.
    pub(crate) parent: Option<usize>,
    pub(crate) node_instance: Option<NodeInstance>,
    /// Nivel de anidamiento al momento de una cancelación/join recursivo.
    /// Diagnóstico; no participa de ninguna decisión.
    pub(crate) term_level: Option<u32>,
    pub(crate) created_at: DateTime<Utc>,
}

impl CourseInstance {
    pub fn course(&self) -> CourseIdx {
        self.course
    }

    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    pub fn node_instance(&self) -> Option<&NodeInstance> {
        self.node_instance.as_ref()
    }

    pub fn term_level(&self) -> Option<u32> {
        self.term_level
    }
}

/// Instancia de workflow ligada a un documento.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowInstance {
    pub(crate) id: Uuid,
    pub(crate) workflow: String,
    pub(crate) document: DocumentRef,
    pub(crate) courses: Vec<CourseInstance>,
    pub(crate) created_at: DateTime<Utc>,
}

impl WorkflowInstance {
    /// Crea la instancia con su curso principal pendiente.
    pub fn new(spec: &WorkflowSpec, document: DocumentRef) -> Result<Self, SpecError> {
        let root = spec.root_course()?;
        Ok(WorkflowInstance { id: Uuid::new_v4(),
                              workflow: spec.code().to_string(),
                              document,
                              courses: vec![CourseInstance { course: root,
                                                             parent: None,
                                                             node_instance: None,
                                                             term_level: None,
                                                             created_at: Utc::now() }],
                              created_at: Utc::now() })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn workflow(&self) -> &str {
        &self.workflow
    }

    pub fn document(&self) -> &DocumentRef {
        &self.document
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Índice de arena del curso principal.
    pub fn root(&self) -> usize {
        0
    }

    pub fn course(&self, idx: usize) -> &CourseInstance {
        &self.courses[idx]
    }

    pub fn courses(&self) -> &[CourseInstance] {
        &self.courses
    }

    /// Nodo corriente de un curso, si lo hay.
    pub fn current_node_idx(&self, idx: usize) -> Option<NodeIdx> {
        self.courses[idx].node_instance.as_ref().map(|ni| ni.node)
    }

    /// Tipo del nodo corriente de un curso, si lo hay.
    pub fn current_kind(&self, spec: &WorkflowSpec, idx: usize) -> Option<NodeKind> {
        let instance = &self.courses[idx];
        instance.node_instance
                .as_ref()
                .map(|ni| spec.course(instance.course).node(ni.node).kind())
    }

    pub fn is_pending(&self, idx: usize) -> bool {
        self.courses[idx].node_instance.is_none()
    }

    pub fn is_waiting(&self, spec: &WorkflowSpec, idx: usize) -> bool {
        self.current_kind(spec, idx) == Some(NodeKind::Input)
    }

    pub fn is_splitting(&self, spec: &WorkflowSpec, idx: usize) -> bool {
        self.current_kind(spec, idx) == Some(NodeKind::Split)
    }

    pub fn is_cancelled(&self, spec: &WorkflowSpec, idx: usize) -> bool {
        self.current_kind(spec, idx) == Some(NodeKind::Cancel)
    }

    pub fn is_ended(&self, spec: &WorkflowSpec, idx: usize) -> bool {
        self.current_kind(spec, idx) == Some(NodeKind::Exit)
    }

    pub fn is_joined(&self, spec: &WorkflowSpec, idx: usize) -> bool {
        self.current_kind(spec, idx) == Some(NodeKind::Joined)
    }

    /// Un curso terminado (exit, cancel o joined) es inmutable.
    pub fn is_terminated(&self, spec: &WorkflowSpec, idx: usize) -> bool {
        self.current_kind(spec, idx).map(|k| k.is_terminal()).unwrap_or(false)
    }

    /// Estado de rama tal como lo consume un joiner.
    pub fn branch_status(&self, spec: &WorkflowSpec, idx: usize) -> BranchStatus {
        let instance = &self.courses[idx];
        match &instance.node_instance {
            None => BranchStatus::Running,
            Some(ni) => {
                let node = spec.course(instance.course).node(ni.node);
                match node.kind() {
                    NodeKind::Cancel => BranchStatus::Cancelled,
                    NodeKind::Joined => BranchStatus::Joined,
                    NodeKind::Exit => BranchStatus::Ended(node.exit_value().unwrap_or(0)),
                    _ => BranchStatus::Running,
                }
            }
        }
    }

    /// Ruta punteada del curso desde la raíz (vacía para la raíz).
    pub fn path_of(&self, spec: &WorkflowSpec, idx: usize) -> String {
        let mut parts = Vec::new();
        let mut current = idx;
        while let Some(parent) = self.courses[current].parent {
            parts.push(spec.course(self.courses[current].course).code().to_string());
            current = parent;
        }
        parts.reverse();
        parts.join(".")
    }

    /// Abre una instancia de curso hija pendiente y devuelve su índice.
    pub(crate) fn add_course(&mut self, course: CourseIdx, parent: Option<usize>) -> usize {
        self.courses.push(CourseInstance { course,
                                           parent,
                                           node_instance: None,
                                           term_level: None,
                                           created_at: Utc::now() });
        self.courses.len() - 1
    }

    /// Reemplaza atómicamente la instancia de nodo del curso.
    pub(crate) fn set_node_instance(&mut self, idx: usize, node_instance: NodeInstance) {
        self.courses[idx].node_instance = Some(node_instance);
    }

    pub(crate) fn set_term_level(&mut self, idx: usize, level: u32) {
        self.courses[idx].term_level = Some(level);
    }

    /// Verificación de consistencia bajo demanda: referencias curso/workflow
    /// coherentes y biyección de ramas en los splits.
    pub fn verify_consistency(&self, spec: &WorkflowSpec) -> Result<(), InstanceError> {
        if self.workflow != spec.code() {
            return Err(InstanceError::CourseInconsistent { path: String::new() });
        }
        for (idx, instance) in self.courses.iter().enumerate() {
            let path = self.path_of(spec, idx);
            if instance.course >= spec.courses().len() {
                return Err(InstanceError::CourseInconsistent { path });
            }
            let course_spec = spec.course(instance.course);
            if let Some(ni) = &instance.node_instance {
                if ni.node >= course_spec.nodes().len() {
                    return Err(InstanceError::NodeInconsistent { path });
                }
                let node = course_spec.node(ni.node);
                if node.kind() == NodeKind::Split {
                    let mut declared: Vec<&str> =
                        node.branches().iter().map(|&b| spec.course(b).code()).collect();
                    let mut opened: Vec<&str> = ni.branches
                                                  .iter()
                                                  .map(|&b| spec.course(self.courses[b].course).code())
                                                  .collect();
                    declared.sort_unstable();
                    opened.sort_unstable();
                    if declared != opened {
                        return Err(InstanceError::IncompleteSplitBranches { path });
                    }
                } else if !ni.branches.is_empty() {
                    return Err(InstanceError::NonSplitHasBranches { path });
                }
            }
        }
        Ok(())
    }
}
