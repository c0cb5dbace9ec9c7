//! Validación estructural completa de una especificación.
//!
//! Reporta el primer fallo encontrado, con la entidad ofensora. El orden es
//! determinista:
//! 1. Nivel workflow: curso raíz único y aciclicidad del grafo de ramas.
//! 2. Nivel curso: nodos requeridos y coherencia de callers.
//! 3. Nivel nodo: tabla de aridades y presencia de campos por tipo.
//! 4. Nivel transición: tabla de campos por tipo de origen y unicidades.
//! 5. Alcanzabilidad: BFS hacia adelante desde enter y hacia atrás desde
//!    los exit.
//! 6. Prohibición de caminos automáticos en cursos no raíz.

use std::collections::VecDeque;

use crate::errors::{SpecEntity, SpecError};
use crate::node::{NodeKind, NodeRef};
use crate::workflow::WorkflowSpec;
use crate::{CourseIdx, NodeIdx};

/// Valida la especificación completa. `Ok(())` garantiza que el runner puede
/// operar sin re-chequear estructura.
pub fn validate(spec: &WorkflowSpec) -> Result<(), SpecError> {
    check_workflow(spec)?;

    let callers: Vec<Vec<NodeRef>> = (0..spec.courses().len()).map(|c| spec.callers(c)).collect();
    for cidx in 0..spec.courses().len() {
        check_course(spec, cidx, &callers[cidx])?;
    }
    for cidx in 0..spec.courses().len() {
        for nidx in 0..spec.course(cidx).nodes().len() {
            check_node(spec, cidx, nidx)?;
        }
    }
    for cidx in 0..spec.courses().len() {
        for tidx in 0..spec.course(cidx).transitions().len() {
            check_transition(spec, cidx, tidx)?;
        }
    }
    for cidx in 0..spec.courses().len() {
        check_reachability(spec, cidx)?;
    }
    for cidx in 0..spec.courses().len() {
        if !spec.course(cidx).is_root() {
            check_automatic_path(spec, cidx)?;
        }
    }
    Ok(())
}

/// Unicidad del curso raíz y aciclicidad del grafo de dependencia de ramas.
fn check_workflow(spec: &WorkflowSpec) -> Result<(), SpecError> {
    spec.root_course()?;

    // DFS coloreado sobre las aristas curso -> rama. Gris = en pila, una
    // arista hacia un gris cierra un ciclo.
    const WHITE: u8 = 0;
    const GREY: u8 = 1;
    const BLACK: u8 = 2;

    fn visit(spec: &WorkflowSpec, cidx: CourseIdx, color: &mut [u8]) -> Result<(), SpecError> {
        color[cidx] = GREY;
        for node in spec.course(cidx).nodes() {
            for &branch in node.branches() {
                match color[branch] {
                    GREY => {
                        return Err(SpecError::WorkflowHasCircularDependentCourses {
                            entity: SpecEntity::Workflow { workflow: spec.code().to_string() },
                        })
                    }
                    WHITE => visit(spec, branch, color)?,
                    _ => {}
                }
            }
        }
        color[cidx] = BLACK;
        Ok(())
    }

    let mut color = vec![WHITE; spec.courses().len()];
    for start in 0..spec.courses().len() {
        if color[start] == WHITE {
            visit(spec, start, &mut color)?;
        }
    }
    Ok(())
}

/// Nodos requeridos del curso y coherencia de sus callers.
fn check_course(spec: &WorkflowSpec, cidx: CourseIdx, callers: &[NodeRef]) -> Result<(), SpecError> {
    spec.required_node(cidx, NodeKind::Enter)?;
    spec.required_node(cidx, NodeKind::Cancel)?;

    let course = spec.course(cidx);
    if course.nodes_of_kind(NodeKind::Exit).is_empty() {
        return Err(SpecError::CourseMissingRequiredNode { entity: spec.course_entity(cidx),
                                                         required: NodeKind::Exit });
    }

    if course.is_root() {
        // La raíz no puede ser rama de ningún split.
        if !callers.is_empty() {
            return Err(SpecError::CourseHasInvalidCallers { entity: spec.course_entity(cidx) });
        }
        return Ok(());
    }

    // Todo curso no raíz debe ser abierto por al menos un split de un curso
    // estrictamente menos profundo.
    let coherent = !callers.is_empty()
                   && callers.iter().all(|r| {
                          spec.node(*r).kind() == NodeKind::Split && spec.course(r.course).depth() < course.depth()
                      });
    if !coherent {
        return Err(SpecError::CourseHasInvalidCallers { entity: spec.course_entity(cidx) });
    }

    // Si algún caller usa joiner, el curso necesita su nodo joined.
    if callers.iter().any(|r| spec.node(*r).joiner().is_some()) {
        spec.required_node(cidx, NodeKind::Joined)?;
    }
    Ok(())
}

/// Tabla de aridades y presencia de campos según el tipo de nodo.
fn check_node(spec: &WorkflowSpec, cidx: CourseIdx, nidx: NodeIdx) -> Result<(), SpecError> {
    let course = spec.course(cidx);
    let node = course.node(nidx);
    let inbounds = course.inbounds(nidx).count();
    let outbounds = course.outbounds(nidx).count();
    let entity = spec.node_entity(cidx, nidx);

    let no_inbounds = |e: &SpecEntity| {
        if inbounds > 0 {
            Err(SpecError::NodeHasInbounds { entity: e.clone() })
        } else {
            Ok(())
        }
    };
    let some_inbounds = |e: &SpecEntity| {
        if inbounds == 0 {
            Err(SpecError::NodeHasNoInbound { entity: e.clone() })
        } else {
            Ok(())
        }
    };
    let no_outbounds = |e: &SpecEntity| {
        if outbounds > 0 {
            Err(SpecError::NodeHasOutbounds { entity: e.clone() })
        } else {
            Ok(())
        }
    };
    let one_outbound = |e: &SpecEntity| match outbounds {
        0 => Err(SpecError::NodeHasNoOutbound { entity: e.clone() }),
        1 => Ok(()),
        _ => Err(SpecError::NodeHasMultipleOutbounds { entity: e.clone() }),
    };
    let no_branches = |e: &SpecEntity| {
        if node.branches().is_empty() {
            Ok(())
        } else {
            Err(SpecError::NodeHasBranches { entity: e.clone() })
        }
    };

    match node.kind() {
        NodeKind::Enter => {
            no_inbounds(&entity)?;
            one_outbound(&entity)?;
            no_branches(&entity)?;
            field_null(node.exit_value().is_some(), "exit-value", &entity)?;
            field_null(node.joiner().is_some(), "joiner", &entity)?;
            field_null(node.execute_permission().is_some(), "execute-permission", &entity)?;
        }
        NodeKind::Exit => {
            some_inbounds(&entity)?;
            no_outbounds(&entity)?;
            no_branches(&entity)?;
            field_required(node.exit_value().is_some(), "exit-value", &entity)?;
            field_null(node.joiner().is_some(), "joiner", &entity)?;
            field_null(node.execute_permission().is_some(), "execute-permission", &entity)?;
        }
        NodeKind::Cancel | NodeKind::Joined => {
            no_inbounds(&entity)?;
            no_outbounds(&entity)?;
            no_branches(&entity)?;
            field_null(node.exit_value().is_some(), "exit-value", &entity)?;
            field_null(node.joiner().is_some(), "joiner", &entity)?;
            field_null(node.execute_permission().is_some(), "execute-permission", &entity)?;
        }
        NodeKind::Input => {
            some_inbounds(&entity)?;
            if outbounds == 0 {
                return Err(SpecError::NodeHasNoOutbound { entity });
            }
            no_branches(&entity)?;
            field_null(node.exit_value().is_some(), "exit-value", &entity)?;
            field_null(node.joiner().is_some(), "joiner", &entity)?;
            // execute_permission es opcional aquí.
        }
        NodeKind::Step => {
            some_inbounds(&entity)?;
            one_outbound(&entity)?;
            no_branches(&entity)?;
            field_null(node.exit_value().is_some(), "exit-value", &entity)?;
            field_null(node.joiner().is_some(), "joiner", &entity)?;
            field_null(node.execute_permission().is_some(), "execute-permission", &entity)?;
        }
        NodeKind::Multiplexer => {
            some_inbounds(&entity)?;
            match outbounds {
                0 => return Err(SpecError::NodeHasNoOutbound { entity }),
                1 => return Err(SpecError::NodeHasOneOutbound { entity }),
                _ => {}
            }
            no_branches(&entity)?;
            field_null(node.exit_value().is_some(), "exit-value", &entity)?;
            field_null(node.joiner().is_some(), "joiner", &entity)?;
            field_null(node.execute_permission().is_some(), "execute-permission", &entity)?;
        }
        NodeKind::Split => {
            some_inbounds(&entity)?;
            if outbounds == 0 {
                return Err(SpecError::NodeHasNoOutbound { entity });
            }
            if node.branches().len() < 2 {
                return Err(SpecError::NodeNotEnoughBranches { entity });
            }
            // Las ramas deben ser cursos estrictamente más profundos (mismo
            // workflow por construcción de la arena).
            if node.branches().iter().any(|&b| spec.course(b).depth() <= course.depth()) {
                return Err(SpecError::NodeInconsistentBranches { entity });
            }
            let consistent = match node.joiner() {
                None => outbounds == 1,
                Some(_) => outbounds >= 2,
            };
            if !consistent {
                return Err(SpecError::NodeInconsistentJoiner { entity });
            }
            field_null(node.exit_value().is_some(), "exit-value", &entity)?;
            field_null(node.execute_permission().is_some(), "execute-permission", &entity)?;
        }
    }
    Ok(())
}

/// Tabla de campos por tipo de origen y unicidades de acción/prioridad.
fn check_transition(spec: &WorkflowSpec, cidx: CourseIdx, tidx: usize) -> Result<(), SpecError> {
    let course = spec.course(cidx);
    let transition = &course.transitions()[tidx];
    let entity = spec.transition_entity(cidx, tidx);

    if transition.origin().course != cidx || transition.destination().course != cidx {
        return Err(SpecError::TransitionInconsistent { entity });
    }

    let origin = spec.node(transition.origin());
    match origin.kind() {
        NodeKind::Enter => {
            field_null(transition.action_name().is_some(), "action-name", &entity)?;
            field_null(transition.condition().is_some(), "condition", &entity)?;
            field_null(transition.priority().is_some(), "priority", &entity)?;
            // permission es opcional aquí.
        }
        NodeKind::Step => {
            field_null(transition.action_name().is_some(), "action-name", &entity)?;
            field_null(transition.permission().is_some(), "permission", &entity)?;
            field_null(transition.condition().is_some(), "condition", &entity)?;
            field_null(transition.priority().is_some(), "priority", &entity)?;
        }
        NodeKind::Input => {
            field_required(transition.action_name().is_some(), "action-name", &entity)?;
            field_null(transition.condition().is_some(), "condition", &entity)?;
            field_null(transition.priority().is_some(), "priority", &entity)?;
            unique_action_name(spec, cidx, tidx, &entity)?;
        }
        NodeKind::Split => {
            field_required(transition.action_name().is_some(), "action-name", &entity)?;
            field_null(transition.permission().is_some(), "permission", &entity)?;
            field_null(transition.condition().is_some(), "condition", &entity)?;
            field_null(transition.priority().is_some(), "priority", &entity)?;
            unique_action_name(spec, cidx, tidx, &entity)?;
        }
        NodeKind::Multiplexer => {
            field_required(transition.condition().is_some(), "condition", &entity)?;
            field_required(transition.priority().is_some(), "priority", &entity)?;
            field_null(transition.action_name().is_some(), "action-name", &entity)?;
            field_null(transition.permission().is_some(), "permission", &entity)?;
            unique_priority(spec, cidx, tidx, &entity)?;
        }
        // Los terminales no tienen salientes; el chequeo de nodo ya lo
        // reportó, pero el caso queda cubierto para validaciones parciales.
        NodeKind::Exit | NodeKind::Cancel | NodeKind::Joined => {
            return Err(SpecError::NodeHasOutbounds { entity: spec.node_entity(cidx, transition.origin().node) });
        }
    }
    Ok(())
}

fn unique_action_name(spec: &WorkflowSpec, cidx: CourseIdx, tidx: usize, entity: &SpecEntity) -> Result<(), SpecError> {
    let course = spec.course(cidx);
    let transition = &course.transitions()[tidx];
    let clash = course.transitions()
                      .iter()
                      .enumerate()
                      .any(|(other, t)| {
                          other != tidx
                          && t.origin() == transition.origin()
                          && t.action_name().is_some()
                          && t.action_name() == transition.action_name()
                      });
    if clash {
        return Err(SpecError::TransitionActionNameNotUnique { entity: entity.clone() });
    }
    Ok(())
}

fn unique_priority(spec: &WorkflowSpec, cidx: CourseIdx, tidx: usize, entity: &SpecEntity) -> Result<(), SpecError> {
    let course = spec.course(cidx);
    let transition = &course.transitions()[tidx];
    let clash = course.transitions()
                      .iter()
                      .enumerate()
                      .any(|(other, t)| {
                          other != tidx
                          && t.origin() == transition.origin()
                          && t.priority().is_some()
                          && t.priority() == transition.priority()
                      });
    if clash {
        return Err(SpecError::TransitionPriorityNotUnique { entity: entity.clone() });
    }
    Ok(())
}

/// BFS hacia adelante desde enter y hacia atrás desde los exit. Cancel y
/// joined quedan fuera de ambos requisitos: el runner los alcanza sin
/// transiciones.
fn check_reachability(spec: &WorkflowSpec, cidx: CourseIdx) -> Result<(), SpecError> {
    let course = spec.course(cidx);
    let total = course.nodes().len();
    let enter = spec.required_node(cidx, NodeKind::Enter)?;

    let mut forward = vec![false; total];
    forward[enter] = true;
    let mut queue = VecDeque::from([enter]);
    while let Some(current) = queue.pop_front() {
        for t in course.outbounds(current) {
            let next = t.destination().node;
            if !forward[next] {
                forward[next] = true;
                queue.push_back(next);
            }
        }
    }
    let missing: Vec<String> = course.nodes()
                                     .iter()
                                     .enumerate()
                                     .filter(|(i, n)| {
                                         !forward[*i] && !matches!(n.kind(), NodeKind::Cancel | NodeKind::Joined)
                                     })
                                     .map(|(_, n)| n.code().to_string())
                                     .collect();
    if !missing.is_empty() {
        return Err(SpecError::CourseUnreachableNodesByEnter { entity: spec.course_entity(cidx),
                                                              nodes: missing });
    }

    let mut backward = vec![false; total];
    let mut queue: VecDeque<NodeIdx> = course.nodes_of_kind(NodeKind::Exit).into();
    for &exit in &queue {
        backward[exit] = true;
    }
    while let Some(current) = queue.pop_front() {
        for t in course.inbounds(current) {
            let prev = t.origin().node;
            if !backward[prev] {
                backward[prev] = true;
                queue.push_back(prev);
            }
        }
    }
    let missing: Vec<String> = course.nodes()
                                     .iter()
                                     .enumerate()
                                     .filter(|(i, n)| {
                                         !backward[*i] && !matches!(n.kind(), NodeKind::Cancel | NodeKind::Joined)
                                     })
                                     .map(|(_, n)| n.code().to_string())
                                     .collect();
    if !missing.is_empty() {
        return Err(SpecError::CourseUnreachableNodesByExit { entity: spec.course_entity(cidx),
                                                             nodes: missing });
    }
    Ok(())
}

/// Ningún camino enter -> exit puede evitar todos los nodos input y split:
/// se retiran esos nodos del grafo y ningún exit debe seguir alcanzable.
fn check_automatic_path(spec: &WorkflowSpec, cidx: CourseIdx) -> Result<(), SpecError> {
    let course = spec.course(cidx);
    let enter = spec.required_node(cidx, NodeKind::Enter)?;

    let mut visited = vec![false; course.nodes().len()];
    visited[enter] = true;
    let mut queue = VecDeque::from([enter]);
    while let Some(current) = queue.pop_front() {
        for t in course.outbounds(current) {
            let next = t.destination().node;
            if visited[next] {
                continue;
            }
            match course.node(next).kind() {
                // Nodo retirado: el camino se corta aquí.
                NodeKind::Input | NodeKind::Split => continue,
                NodeKind::Exit => {
                    return Err(SpecError::CourseHasAutomaticPath { entity: spec.course_entity(cidx) });
                }
                _ => {
                    visited[next] = true;
                    queue.push_back(next);
                }
            }
        }
    }
    Ok(())
}

fn field_null(present: bool, field: &'static str, entity: &SpecEntity) -> Result<(), SpecError> {
    if present {
        Err(SpecError::FieldMustBeNull { entity: entity.clone(), field })
    } else {
        Ok(())
    }
}

fn field_required(present: bool, field: &'static str, entity: &SpecEntity) -> Result<(), SpecError> {
    if present {
        Ok(())
    } else {
        Err(SpecError::FieldRequired { entity: entity.clone(), field })
    }
}
