//! Formato declarativo de entrada y su constructor.
//!
//! Una especificación se describe como un documento (JSON o estructura ya
//! parseada) con el workflow, sus cursos, nodos y transiciones referenciados
//! por código. `build` resuelve todos los códigos a índices de arena e
//! infiere la profundidad de cada curso como distancia mínima desde la raíz
//! sobre el grafo de ramas. El resultado NO está validado: el instalador
//! corre `validator::validate` sobre lo construido.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::course::CourseSpec;
use crate::errors::{SpecEntity, SpecError};
use crate::node::{NodeKind, NodeRef, NodeSpec};
use crate::slug::{is_valid_slug, is_valid_slug_or_empty};
use crate::transition::TransitionSpec;
use crate::workflow::WorkflowSpec;

/// Declaración de un workflow completo.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WorkflowDeclaration {
    /// Tipo de documento asociado, como `<app>.<Model>`.
    pub model: String,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub create_permission: Option<String>,
    #[serde(default)]
    pub cancel_permission: Option<String>,
    #[serde(default)]
    pub courses: Vec<CourseDeclaration>,
}

/// Declaración de un curso.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CourseDeclaration {
    /// Código del curso; vacío si, y sólo si, es el curso raíz.
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cancel_permission: Option<String>,
    #[serde(default)]
    pub nodes: Vec<NodeDeclaration>,
    #[serde(default)]
    pub transitions: Vec<TransitionDeclaration>,
}

/// Declaración de un nodo.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NodeDeclaration {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub landing_handler: Option<String>,
    #[serde(default)]
    pub exit_value: Option<u8>,
    #[serde(default)]
    pub joiner: Option<String>,
    #[serde(default)]
    pub execute_permission: Option<String>,
    /// Códigos de los cursos que abre este nodo (sólo splits).
    #[serde(default)]
    pub branches: Option<Vec<String>>,
}

/// Declaración de una transición, con origen y destino por código de nodo
/// dentro del mismo curso.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TransitionDeclaration {
    pub origin: String,
    pub destination: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub action_name: Option<String>,
    #[serde(default)]
    pub permission: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub priority: Option<u8>,
}

impl WorkflowDeclaration {
    /// Parsea una declaración desde JSON textual.
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    /// Construye una declaración desde un `Value` ya parseado.
    pub fn from_value(input: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(input)
    }
}

/// Construye la arena de especificación a partir de la declaración.
///
/// Resuelve códigos a índices, rechaza duplicados e infiere profundidades.
/// No ejecuta la validación estructural completa.
pub fn build(decl: &WorkflowDeclaration) -> Result<WorkflowSpec, SpecError> {
    let wf_entity = SpecEntity::Workflow { workflow: decl.code.clone() };
    if !is_valid_slug(&decl.code) {
        return Err(SpecError::FieldInvalid { entity: wf_entity,
                                             field: "code",
                                             reason: "workflow codes must be slugs of at most 20 chars".into() });
    }

    // Cascarones de curso con nodos; ramas y transiciones se resuelven una
    // vez que todos los cursos y nodos existen.
    let mut courses: Vec<CourseSpec> = Vec::with_capacity(decl.courses.len());
    for course_decl in &decl.courses {
        let entity = SpecEntity::Course { workflow: decl.code.clone(),
                                          course: course_decl.code.clone() };
        if !is_valid_slug_or_empty(&course_decl.code) {
            return Err(SpecError::FieldInvalid { entity,
                                                 field: "code",
                                                 reason: "course codes must be slugs of at most 20 chars".into() });
        }
        if courses.iter().any(|c| c.code == course_decl.code) {
            return Err(SpecError::FieldInvalid { entity,
                                                 field: "code",
                                                 reason: "duplicate course code".into() });
        }

        let mut nodes: Vec<NodeSpec> = Vec::with_capacity(course_decl.nodes.len());
        for node_decl in &course_decl.nodes {
            if nodes.iter().any(|n| n.code() == node_decl.code) {
                return Err(SpecError::FieldInvalid { entity: SpecEntity::Node { workflow: decl.code.clone(),
                                                                                course: course_decl.code.clone(),
                                                                                node: node_decl.code.clone() },
                                                     field: "code",
                                                     reason: "duplicate node code in course".into() });
            }
            let mut node = NodeSpec::new(node_decl.kind,
                                         node_decl.code.clone(),
                                         node_decl.name.clone(),
                                         node_decl.description.clone(),
                                         &decl.code,
                                         &course_decl.code)?;
            node.landing_handler = node_decl.landing_handler.clone();
            node.exit_value = node_decl.exit_value;
            node.joiner = node_decl.joiner.clone();
            node.execute_permission = normalize(node_decl.execute_permission.clone());
            nodes.push(node);
        }

        courses.push(CourseSpec { code: course_decl.code.clone(),
                                  name: course_decl.name.clone(),
                                  description: course_decl.description.clone(),
                                  depth: 0,
                                  cancel_permission: normalize(course_decl.cancel_permission.clone()),
                                  nodes,
                                  transitions: Vec::new() });
    }

    // El curso raíz es el de código vacío; debe existir exactamente uno.
    let root = {
        let mut roots = courses.iter().enumerate().filter(|(_, c)| c.code.is_empty());
        match (roots.next(), roots.next()) {
            (Some((idx, _)), None) => idx,
            (None, _) => return Err(SpecError::WorkflowHasNoMainCourse { entity: wf_entity }),
            (Some(_), Some(_)) => return Err(SpecError::WorkflowHasMultipleMainCourses { entity: wf_entity }),
        }
    };

    // Resolución de ramas: códigos de curso -> índices de arena.
    for (cidx, course_decl) in decl.courses.iter().enumerate() {
        for (nidx, node_decl) in course_decl.nodes.iter().enumerate() {
            if let Some(branch_codes) = &node_decl.branches {
                let mut branches = Vec::with_capacity(branch_codes.len());
                for code in branch_codes {
                    match courses.iter().position(|c| &c.code == code) {
                        Some(idx) => branches.push(idx),
                        None => {
                            return Err(SpecError::FieldInvalid { entity:
                                                                     node_entity(decl, cidx, nidx),
                                                                 field: "branches",
                                                                 reason: format!("unknown course `{}`", code) })
                        }
                    }
                }
                courses[cidx].nodes[nidx].branches = branches;
            }
        }
    }

    // Profundidad: BFS desde la raíz sobre las aristas de rama. Cursos no
    // alcanzados quedan con profundidad 1 y sin callers coherentes; el
    // validador los reporta.
    let mut depth: Vec<Option<u16>> = vec![None; courses.len()];
    depth[root] = Some(0);
    let mut queue = VecDeque::from([root]);
    while let Some(cidx) = queue.pop_front() {
        let next = depth[cidx].unwrap_or(0).saturating_add(1);
        let targets: Vec<usize> = courses[cidx].nodes
                                               .iter()
                                               .flat_map(|n| n.branches.iter().copied())
                                               .collect();
        for target in targets {
            if depth[target].is_none() {
                depth[target] = Some(next);
                queue.push_back(target);
            }
        }
    }
    for (cidx, course) in courses.iter_mut().enumerate() {
        course.depth = depth[cidx].unwrap_or(1);
    }

    // Resolución de transiciones, por curso.
    for (cidx, course_decl) in decl.courses.iter().enumerate() {
        let mut transitions = Vec::with_capacity(course_decl.transitions.len());
        for t_decl in &course_decl.transitions {
            let entity = SpecEntity::Transition { workflow: decl.code.clone(),
                                                  course: course_decl.code.clone(),
                                                  origin: t_decl.origin.clone(),
                                                  destination: t_decl.destination.clone() };
            let origin = courses[cidx].node_by_code(&t_decl.origin)
                                      .ok_or_else(|| SpecError::FieldInvalid { entity: entity.clone(),
                                                                               field: "origin",
                                                                               reason: format!("unknown node `{}`",
                                                                                               t_decl.origin) })?;
            let destination =
                courses[cidx].node_by_code(&t_decl.destination)
                             .ok_or_else(|| SpecError::FieldInvalid { entity: entity.clone(),
                                                                      field: "destination",
                                                                      reason: format!("unknown node `{}`",
                                                                                      t_decl.destination) })?;
            let mut transition = TransitionSpec::new(NodeRef { course: cidx, node: origin },
                                                     NodeRef { course: cidx, node: destination },
                                                     t_decl.name.clone(),
                                                     t_decl.description.clone());
            transition.action_name = t_decl.action_name.clone();
            transition.permission = normalize(t_decl.permission.clone());
            transition.condition = t_decl.condition.clone();
            transition.priority = t_decl.priority;
            transition.check_action_name(entity)?;
            transitions.push(transition);
        }
        courses[cidx].transitions = transitions;
    }

    Ok(WorkflowSpec { code: decl.code.clone(),
                      name: decl.name.clone(),
                      description: decl.description.clone(),
                      document_type: decl.model.clone(),
                      create_permission: normalize(decl.create_permission.clone()),
                      cancel_permission: normalize(decl.cancel_permission.clone()),
                      courses })
}

/// Los permisos declarados como cadena vacía equivalen a ausentes.
fn normalize(permission: Option<String>) -> Option<String> {
    permission.filter(|p| !p.is_empty())
}

fn node_entity(decl: &WorkflowDeclaration, cidx: usize, nidx: usize) -> SpecEntity {
    SpecEntity::Node { workflow: decl.code.clone(),
                       course: decl.courses[cidx].code.clone(),
                       node: decl.courses[cidx].nodes[nidx].code.clone() }
}
