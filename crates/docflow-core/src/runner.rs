//! Motor de recorrido: arranque, ejecución, cancelación y encadenamiento.
//!
//! El runner opera sobre una instancia mutable prestada; la fachada le
//! entrega una copia de trabajo y confirma sólo si la cadena completa
//! terminó sin error, lo que da el rollback de transacción que exige el
//! modelo. No hay puntos de suspensión: los callables se invocan con la
//! transacción activa y deben retornar pronto.
//!
//! Pasos internos:
//! - `move_to`: paso atómico a un nodo (handler de llegada + reemplazo de la
//!   instancia de nodo si el tipo es persistente; los splits abren una
//!   instancia de curso hija por rama).
//! - `run_transition`: re-validación defensiva, permisos, `move_to` y
//!   despacho según el tipo del destino (encadenando en step/multiplexer y
//!   notificando al padre al salir por exit).
//! - `split_branch_reached`: semántica de completitud del split, con y sin
//!   joiner.
//! - `cancel_course` / `join_course`: terminación recursiva en profundidad,
//!   idempotente frente a cursos ya terminados.

use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

use docflow_domain::{NodeKind, NodeRef, SpecEntity, SpecError, TransitionSpec, WorkflowSpec};

use crate::document::{Document, User};
use crate::errors::{EngineError, ExecError};
use crate::instance::{BranchStatus, CourseStatus, NodeInstance, WorkflowInstance};
use crate::permissions;
use crate::registry::CallableRegistry;

/// Acciones disponibles de un curso vivo, para `available_actions()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum CourseActions {
    Pending,
    Splitting,
    Cancelled,
    Ended,
    Waiting { actions: Vec<String> },
}

/// Contexto de una pasada del motor: spec, registro de callables, documento
/// y usuario actuante. Vive lo que dura una llamada pública.
pub struct Runner<'a> {
    pub spec: &'a WorkflowSpec,
    pub callables: &'a CallableRegistry,
    pub document: &'a dyn Document,
    pub user: &'a dyn User,
}

impl<'a> Runner<'a> {
    /// Arranca el curso pendiente en `path`: lo mueve a su enter y encadena
    /// por su única saliente.
    pub fn start(&self, instance: &mut WorkflowInstance, path: &str) -> Result<(), EngineError> {
        let idx = self.find_course(instance, path)?;
        if !instance.is_pending(idx) {
            if path.is_empty() {
                return Err(ExecError::InstanceNotPending { workflow: instance.workflow().to_string() }.into());
            }
            return Err(ExecError::CourseNotPending { path: path.to_string() }.into());
        }
        let course_idx = instance.course(idx).course();
        let enter = self.spec.required_node(course_idx, NodeKind::Enter)?;
        debug!("starting course `{}` of `{}`", path, instance.workflow());
        self.move_to(instance, idx, NodeRef { course: course_idx, node: enter })?;
        let transition = self.sole_outbound(course_idx, enter)?;
        self.run_transition(instance, idx, transition)
    }

    /// Toma la saliente `action` del input corriente del curso en `path`.
    pub fn execute(&self, instance: &mut WorkflowInstance, action: &str, path: &str) -> Result<(), EngineError> {
        let idx = self.find_course(instance, path)?;
        if !instance.is_waiting(self.spec, idx) {
            return Err(ExecError::CourseNotWaiting { path: path.to_string() }.into());
        }
        let course_idx = instance.course(idx).course();
        let node_idx = instance.current_node_idx(idx).unwrap_or_default();
        let transition = self.spec
                             .course(course_idx)
                             .outbound_by_action(node_idx, action)
                             .ok_or_else(|| ExecError::NodeTransitionDoesNotExist { path: path.to_string(),
                                                                                    action: action.to_string() })?;
        debug!("executing `{}` at `{}` of `{}`", action, path, instance.workflow());
        self.run_transition(instance, idx, transition)
    }

    /// Cancela el curso en `path` y, recursivamente, sus ramas vivas. Si el
    /// curso cancelado era rama de un split, notifica al padre.
    pub fn cancel(&self, instance: &mut WorkflowInstance, path: &str) -> Result<(), EngineError> {
        let idx = self.find_course(instance, path)?;
        if instance.is_terminated(self.spec, idx) {
            return Err(ExecError::CourseAlreadyTerminated { path: path.to_string() }.into());
        }
        permissions::can_cancel(self.spec, instance, idx, self.user, self.document)?;
        debug!("cancelling course `{}` of `{}`", path, instance.workflow());
        self.cancel_course(instance, idx, 0)?;
        if let Some(parent) = instance.course(idx).parent() {
            self.split_branch_reached(instance, parent, idx)?;
        }
        Ok(())
    }

    /// Resuelve una ruta punteada de códigos de curso a un índice de arena.
    pub fn find_course(&self, instance: &WorkflowInstance, path: &str) -> Result<usize, EngineError> {
        let mut idx = instance.root();
        if path.is_empty() {
            return Ok(idx);
        }
        for segment in path.split('.') {
            if !instance.is_splitting(self.spec, idx) {
                return Err(ExecError::CourseHasNoChildren { path: path.to_string() }.into());
            }
            let branches = instance.course(idx)
                                   .node_instance()
                                   .map(|ni| ni.branches().to_vec())
                                   .unwrap_or_default();
            let child = branches.into_iter().find(|&b| {
                            self.spec.course(instance.course(b).course()).code() == segment
                        });
            match child {
                Some(b) => idx = b,
                None => return Err(ExecError::CourseInstanceDoesNotExist { path: path.to_string() }.into()),
            }
        }
        Ok(idx)
    }

    /// Paso atómico a un nodo del curso: handler de llegada y, si el tipo es
    /// persistente, reemplazo de la instancia de nodo (con apertura de ramas
    /// para los splits).
    fn move_to(&self, instance: &mut WorkflowInstance, idx: usize, node: NodeRef) -> Result<NodeKind, EngineError> {
        let course_idx = instance.course(idx).course();
        if node.course != course_idx {
            return Err(ExecError::ForeignNode { node: self.spec.node(node).code().to_string() }.into());
        }
        let node_spec = self.spec.node(node);

        if let Some(handler_path) = node_spec.landing_handler() {
            let handler = self.callables.handler(handler_path)?;
            handler(self.document, self.user).map_err(|message| ExecError::CallableFailed {
                                                 callable: handler_path.to_string(),
                                                 message,
                                             })?;
        }

        if node_spec.kind().is_persistent() {
            let mut branches = Vec::new();
            if node_spec.kind() == NodeKind::Split {
                for &branch_course in node_spec.branches() {
                    branches.push(instance.add_course(branch_course, Some(idx)));
                }
            }
            instance.set_node_instance(idx, NodeInstance { node: node.node,
                                                           branches,
                                                           reached_at: chrono::Utc::now() });
        }
        debug!("course {} moved to `{}` ({})",
               idx,
               node_spec.code(),
               node_spec.kind());
        Ok(node_spec.kind())
    }

    /// Una transición, posiblemente encadenada según el tipo del destino.
    fn run_transition(&self,
                      instance: &mut WorkflowInstance,
                      idx: usize,
                      transition: &TransitionSpec)
                      -> Result<(), EngineError> {
        let course_idx = instance.course(idx).course();

        // Re-validación defensiva; barata en régimen.
        if transition.origin().course != course_idx || transition.destination().course != course_idx {
            return Err(SpecError::TransitionInconsistent { entity: self.transition_entity(transition) }.into());
        }

        permissions::can_advance(self.spec, instance, idx, transition, self.user, self.document)?;

        let destination = transition.destination();
        let kind = self.move_to(instance, idx, destination)?;
        match kind {
            NodeKind::Input | NodeKind::Split => Ok(()),
            NodeKind::Step => {
                let next = self.sole_outbound(course_idx, destination.node)?;
                self.run_transition(instance, idx, next)
            }
            NodeKind::Multiplexer => self.run_multiplexer(instance, idx, destination),
            NodeKind::Exit => match instance.course(idx).parent() {
                Some(parent) => self.split_branch_reached(instance, parent, idx),
                None => Ok(()),
            },
            // Destinos que el validador prohíbe; sólo alcanzable con una
            // spec construida por fuera del instalador.
            NodeKind::Enter | NodeKind::Cancel | NodeKind::Joined => {
                Err(SpecError::TransitionInconsistent { entity: self.transition_entity(transition) }.into())
            }
        }
    }

    /// Evalúa las salientes del multiplexer por prioridad ascendente y
    /// encadena por la primera condición verdadera.
    fn run_multiplexer(&self,
                       instance: &mut WorkflowInstance,
                       idx: usize,
                       node: NodeRef)
                       -> Result<(), EngineError> {
        let course = self.spec.course(node.course);
        let mut outbounds: Vec<&TransitionSpec> = course.outbounds(node.node).collect();
        outbounds.sort_by_key(|t| t.priority().unwrap_or(u8::MAX));

        for transition in outbounds {
            let entity = self.transition_entity(transition);
            let condition_path = transition.condition()
                                           .ok_or(SpecError::FieldRequired { entity,
                                                                             field: "condition" })?;
            let condition = self.callables.condition(condition_path)?;
            let satisfied =
                condition(self.document, self.user).map_err(|message| ExecError::CallableFailed {
                                                       callable: condition_path.to_string(),
                                                       message,
                                                   })?;
            if satisfied {
                return self.run_transition(instance, idx, transition);
            }
        }
        Err(ExecError::MultiplexerUnsatisfied { path: instance.path_of(self.spec, idx),
                                                node: course.node(node.node).code().to_string() }.into())
    }

    /// Una rama del split del curso `parent` alcanzó un estado terminal.
    ///
    /// Sin joiner (split de una saliente): cuando todas las ramas terminan
    /// se toma esa saliente. Con joiner: se le consulta con el mapa de
    /// estados; una acción fuerza el join de las ramas vivas y sale del
    /// split; `None` espera, salvo que ya no quede nada corriendo.
    fn split_branch_reached(&self,
                            instance: &mut WorkflowInstance,
                            parent: usize,
                            reached: usize)
                            -> Result<(), EngineError> {
        if !instance.is_splitting(self.spec, parent) {
            // El padre ya no está en el split (p.ej. cancelado): nada que
            // decidir.
            return Ok(());
        }
        let parent_course = instance.course(parent).course();
        let node_instance = match instance.course(parent).node_instance() {
            Some(ni) => ni,
            None => return Ok(()),
        };
        let split_idx = node_instance.node();
        let branches = node_instance.branches().to_vec();
        let split_spec = self.spec.course(parent_course).node(split_idx);

        match split_spec.joiner() {
            None => {
                if branches.iter().all(|&b| instance.is_terminated(self.spec, b)) {
                    debug!("all branches of `{}` terminated; leaving the split", split_spec.code());
                    let transition = self.sole_outbound(parent_course, split_idx)?;
                    self.run_transition(instance, parent, transition)
                } else {
                    Ok(())
                }
            }
            Some(joiner_path) => {
                let mut statuses: IndexMap<String, BranchStatus> = IndexMap::new();
                for &branch in &branches {
                    let code = self.spec.course(instance.course(branch).course()).code().to_string();
                    statuses.insert(code, instance.branch_status(self.spec, branch));
                }
                let reached_code = self.spec.course(instance.course(reached).course()).code().to_string();

                let joiner = self.callables.joiner(joiner_path)?;
                let verdict = joiner(self.document, &statuses, &reached_code)
                    .map_err(|message| ExecError::CallableFailed { callable: joiner_path.to_string(),
                                                                   message })?;

                let path = instance.path_of(self.spec, parent);
                match verdict {
                    Some(action) if action.trim().is_empty() => {
                        Err(ExecError::InvalidJoinerResult { path,
                                                             node: split_spec.code().to_string() }.into())
                    }
                    Some(action) => {
                        let transition =
                            self.spec
                                .course(parent_course)
                                .outbound_by_action(split_idx, &action)
                                .ok_or_else(|| ExecError::NodeTransitionDoesNotExist { path: path.clone(),
                                                                                       action: action.clone() })?;
                        debug!("joiner chose `{}`; force-joining live branches", action);
                        for &branch in &branches {
                            if !instance.is_terminated(self.spec, branch) {
                                self.join_course(instance, branch, 0)?;
                            }
                        }
                        self.run_transition(instance, parent, transition)
                    }
                    None => {
                        if branches.iter().all(|&b| instance.is_terminated(self.spec, b)) {
                            Err(ExecError::SplitJoinUnresolved { path,
                                                                 node: split_spec.code().to_string() }.into())
                        } else {
                            Ok(())
                        }
                    }
                }
            }
        }
    }

    /// Cancelación recursiva en profundidad. El curso se mueve a su nodo
    /// cancel antes que sus ramas, que heredan `level + 1` como nivel de
    /// terminación. Idempotente frente a cursos ya terminados.
    fn cancel_course(&self, instance: &mut WorkflowInstance, idx: usize, level: u32) -> Result<(), EngineError> {
        if instance.is_terminated(self.spec, idx) {
            return Ok(());
        }
        let children: Vec<usize> = match instance.course(idx).node_instance() {
            Some(ni) => ni.branches().to_vec(),
            None => Vec::new(),
        };
        let course_idx = instance.course(idx).course();
        let cancel = self.spec.required_node(course_idx, NodeKind::Cancel)?;
        self.move_to(instance, idx, NodeRef { course: course_idx, node: cancel })?;
        instance.set_term_level(idx, level);
        for child in children {
            self.cancel_course(instance, child, level + 1)?;
        }
        Ok(())
    }

    /// Join forzado recursivo: mueve el curso a su nodo joined (fallando si
    /// no tiene) y une sus ramas vivas. Idempotente frente a terminados.
    fn join_course(&self, instance: &mut WorkflowInstance, idx: usize, level: u32) -> Result<(), EngineError> {
        if instance.is_terminated(self.spec, idx) {
            return Ok(());
        }
        let children: Vec<usize> = match instance.course(idx).node_instance() {
            Some(ni) => ni.branches().to_vec(),
            None => Vec::new(),
        };
        let course_idx = instance.course(idx).course();
        let joined = self.spec
                         .course(course_idx)
                         .nodes_of_kind(NodeKind::Joined)
                         .into_iter()
                         .next()
                         .ok_or_else(|| ExecError::CourseNotJoinable { path: instance.path_of(self.spec, idx) })?;
        self.move_to(instance, idx, NodeRef { course: course_idx, node: joined })?;
        instance.set_term_level(idx, level);
        for child in children {
            self.join_course(instance, child, level + 1)?;
        }
        Ok(())
    }

    /// Acciones disponibles por curso vivo, filtradas por los permisos del
    /// usuario. Los cursos unidos se omiten: sólo existen transitoriamente
    /// alrededor de un join.
    pub fn available_actions(&self, instance: &WorkflowInstance) -> IndexMap<String, CourseActions> {
        let mut result = IndexMap::new();
        self.collect_actions(instance, instance.root(), &mut result);
        result
    }

    fn collect_actions(&self, instance: &WorkflowInstance, idx: usize, result: &mut IndexMap<String, CourseActions>) {
        let path = instance.path_of(self.spec, idx);
        if instance.is_pending(idx) {
            result.insert(path, CourseActions::Pending);
            return;
        }
        if instance.is_joined(self.spec, idx) {
            return;
        }
        if instance.is_cancelled(self.spec, idx) {
            result.insert(path, CourseActions::Cancelled);
            return;
        }
        if instance.is_ended(self.spec, idx) {
            result.insert(path, CourseActions::Ended);
            return;
        }
        if instance.is_splitting(self.spec, idx) {
            let branches = instance.course(idx)
                                   .node_instance()
                                   .map(|ni| ni.branches().to_vec())
                                   .unwrap_or_default();
            result.insert(path, CourseActions::Splitting);
            for branch in branches {
                self.collect_actions(instance, branch, result);
            }
            return;
        }
        // Curso detenido en un input: listar las acciones que el usuario
        // puede efectivamente tomar.
        let course_idx = instance.course(idx).course();
        let node_idx = match instance.current_node_idx(idx) {
            Some(n) => n,
            None => return,
        };
        let node = self.spec.course(course_idx).node(node_idx);
        let node_allowed = node.execute_permission()
                               .map(|p| self.user.has_permission(p, self.document))
                               .unwrap_or(true);
        let mut actions = Vec::new();
        if node_allowed {
            for transition in self.spec.course(course_idx).outbounds(node_idx) {
                let allowed = transition.permission()
                                        .map(|p| self.user.has_permission(p, self.document))
                                        .unwrap_or(true);
                if allowed {
                    if let Some(action) = transition.action_name() {
                        actions.push(action.to_string());
                    }
                }
            }
        }
        result.insert(path, CourseActions::Waiting { actions });
    }
}

/// Estado resumido por curso alcanzable del árbol. Los cursos unidos a la
/// fuerza se reportan terminados con código −1.
pub fn status(spec: &WorkflowSpec, instance: &WorkflowInstance) -> IndexMap<String, CourseStatus> {
    let mut result = IndexMap::new();
    collect_status(spec, instance, instance.root(), &mut result);
    result
}

fn collect_status(spec: &WorkflowSpec,
                  instance: &WorkflowInstance,
                  idx: usize,
                  result: &mut IndexMap<String, CourseStatus>) {
    let path = instance.path_of(spec, idx);
    let course_idx = instance.course(idx).course();
    match instance.current_node_idx(idx) {
        None => {
            result.insert(path, CourseStatus::Pending);
        }
        Some(node_idx) => {
            let node = spec.course(course_idx).node(node_idx);
            match node.kind() {
                NodeKind::Input => {
                    result.insert(path, CourseStatus::Waiting { node: node.code().to_string() });
                }
                NodeKind::Split => {
                    let branches = instance.course(idx)
                                           .node_instance()
                                           .map(|ni| ni.branches().to_vec())
                                           .unwrap_or_default();
                    result.insert(path, CourseStatus::Splitting { node: node.code().to_string() });
                    for branch in branches {
                        collect_status(spec, instance, branch, result);
                    }
                }
                NodeKind::Cancel => {
                    result.insert(path, CourseStatus::Cancelled { exit_code: -1 });
                }
                NodeKind::Joined => {
                    result.insert(path, CourseStatus::Ended { exit_code: -1 });
                }
                NodeKind::Exit => {
                    result.insert(path,
                                  CourseStatus::Ended { exit_code: node.exit_value().unwrap_or(0) as i32 });
                }
                // Transitorios: nunca persisten como instancia de nodo.
                NodeKind::Enter | NodeKind::Step | NodeKind::Multiplexer => {
                    result.insert(path, CourseStatus::Pending);
                }
            }
        }
    }
}

impl<'a> Runner<'a> {
    /// Única saliente de un nodo (enter, step o split sin joiner).
    fn sole_outbound(&self, course: docflow_domain::CourseIdx, node: usize) -> Result<&'a TransitionSpec, EngineError> {
        let mut outbounds = self.spec.course(course).outbounds(node);
        match (outbounds.next(), outbounds.next()) {
            (Some(t), None) => Ok(t),
            (None, _) => Err(SpecError::NodeHasNoOutbound { entity: self.node_entity(course, node) }.into()),
            (Some(_), Some(_)) => {
                Err(SpecError::NodeHasMultipleOutbounds { entity: self.node_entity(course, node) }.into())
            }
        }
    }

    fn node_entity(&self, course: docflow_domain::CourseIdx, node: usize) -> SpecEntity {
        SpecEntity::Node { workflow: self.spec.code().to_string(),
                           course: self.spec.course(course).code().to_string(),
                           node: self.spec.course(course).node(node).code().to_string() }
    }

    fn transition_entity(&self, transition: &TransitionSpec) -> SpecEntity {
        let origin = transition.origin();
        SpecEntity::Transition { workflow: self.spec.code().to_string(),
                                 course: self.spec.course(origin.course).code().to_string(),
                                 origin: self.spec.node(origin).code().to_string(),
                                 destination: self.spec.node(transition.destination()).code().to_string() }
    }
}
