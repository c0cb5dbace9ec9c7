//! Errores de estado inválido de una especificación.
//!
//! Cada variante lleva la entidad ofensora (`SpecEntity`) y expone un código
//! estable (`code()`) apto para mapear a respuestas HTTP 400 por el host.
//! El validador reporta siempre el primer fallo encontrado, por lo que el
//! orden de los chequeos define qué variante se observa.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::node::NodeKind;

/// Referencia a la entidad de especificación que originó un error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecEntity {
    Workflow {
        workflow: String,
    },
    Course {
        workflow: String,
        course: String,
    },
    Node {
        workflow: String,
        course: String,
        node: String,
    },
    Transition {
        workflow: String,
        course: String,
        origin: String,
        destination: String,
    },
}

impl SpecEntity {
    /// Código del workflow al que pertenece la entidad.
    pub fn workflow(&self) -> &str {
        match self {
            SpecEntity::Workflow { workflow } => workflow,
            SpecEntity::Course { workflow, .. } => workflow,
            SpecEntity::Node { workflow, .. } => workflow,
            SpecEntity::Transition { workflow, .. } => workflow,
        }
    }
}

impl std::fmt::Display for SpecEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpecEntity::Workflow { workflow } => write!(f, "workflow `{}`", workflow),
            SpecEntity::Course { workflow, course } => write!(f, "course `{}.{}`", workflow, course),
            SpecEntity::Node { workflow, course, node } => write!(f, "node `{}.{}.{}`", workflow, course, node),
            SpecEntity::Transition { workflow,
                                     course,
                                     origin,
                                     destination, } => {
                write!(f, "transition `{}.{}.{}->{}`", workflow, course, origin, destination)
            }
        }
    }
}

/// Errores estructurales de la especificación (familia "estado inválido").
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecError {
    #[error("{entity}: no main course is defined (expected exactly one)")]
    WorkflowHasNoMainCourse { entity: SpecEntity },

    #[error("{entity}: multiple main courses are defined (expected exactly one)")]
    WorkflowHasMultipleMainCourses { entity: SpecEntity },

    #[error("{entity}: courses form a circular branch dependency")]
    WorkflowHasCircularDependentCourses { entity: SpecEntity },

    #[error("{entity}: missing required `{required}` node")]
    CourseMissingRequiredNode { entity: SpecEntity, required: NodeKind },

    #[error("{entity}: more than one `{required}` node defined")]
    CourseMultipleRequiredNodes { entity: SpecEntity, required: NodeKind },

    #[error("{entity}: nodes not reachable from the enter node: {nodes:?}")]
    CourseUnreachableNodesByEnter { entity: SpecEntity, nodes: Vec<String> },

    #[error("{entity}: nodes unable to reach an exit node: {nodes:?}")]
    CourseUnreachableNodesByExit { entity: SpecEntity, nodes: Vec<String> },

    #[error("{entity}: an enter-to-exit path avoids every input and split node")]
    CourseHasAutomaticPath { entity: SpecEntity },

    #[error("{entity}: callers are inconsistent with the course depth")]
    CourseHasInvalidCallers { entity: SpecEntity },

    #[error("{entity}: this node must not have inbound transitions")]
    NodeHasInbounds { entity: SpecEntity },

    #[error("{entity}: this node must have at least one inbound transition")]
    NodeHasNoInbound { entity: SpecEntity },

    #[error("{entity}: this node must not have outbound transitions")]
    NodeHasOutbounds { entity: SpecEntity },

    #[error("{entity}: this node must have at least one outbound transition")]
    NodeHasNoOutbound { entity: SpecEntity },

    #[error("{entity}: this node must have exactly one outbound transition")]
    NodeHasMultipleOutbounds { entity: SpecEntity },

    #[error("{entity}: this node must have more than one outbound transition")]
    NodeHasOneOutbound { entity: SpecEntity },

    #[error("{entity}: split nodes must declare at least two branches")]
    NodeNotEnoughBranches { entity: SpecEntity },

    #[error("{entity}: split branches must be deeper courses of the same workflow")]
    NodeInconsistentBranches { entity: SpecEntity },

    #[error("{entity}: splits with one outbound must have no joiner, splits with many outbounds must have one")]
    NodeInconsistentJoiner { entity: SpecEntity },

    #[error("{entity}: only split nodes may declare branches")]
    NodeHasBranches { entity: SpecEntity },

    #[error("{entity}: origin and destination must belong to the same course")]
    TransitionInconsistent { entity: SpecEntity },

    #[error("{entity}: action name is not unique among the origin's outbounds")]
    TransitionActionNameNotUnique { entity: SpecEntity },

    #[error("{entity}: priority is not unique among the origin's outbounds")]
    TransitionPriorityNotUnique { entity: SpecEntity },

    #[error("{entity}: field `{field}` must be empty")]
    FieldMustBeNull { entity: SpecEntity, field: &'static str },

    #[error("{entity}: field `{field}` is required")]
    FieldRequired { entity: SpecEntity, field: &'static str },

    #[error("{entity}: field `{field}` is invalid: {reason}")]
    FieldInvalid {
        entity: SpecEntity,
        field: &'static str,
        reason: String,
    },
}

impl SpecError {
    /// Código estable del error, apto para serializar hacia el host.
    pub fn code(&self) -> String {
        match self {
            SpecError::WorkflowHasNoMainCourse { .. } => "workflow-has-no-main-course".into(),
            SpecError::WorkflowHasMultipleMainCourses { .. } => "workflow-has-multiple-main-courses".into(),
            SpecError::WorkflowHasCircularDependentCourses { .. } => "workflow-has-circular-dependent-courses".into(),
            SpecError::CourseMissingRequiredNode { .. } => "course-missing-required-node".into(),
            SpecError::CourseMultipleRequiredNodes { .. } => "course-multiple-required-nodes".into(),
            SpecError::CourseUnreachableNodesByEnter { .. } => "course-has-unreachable-nodes-by-enter".into(),
            SpecError::CourseUnreachableNodesByExit { .. } => "course-has-unreachable-nodes-by-exit".into(),
            SpecError::CourseHasAutomaticPath { .. } => "course-has-automatic-path".into(),
            SpecError::CourseHasInvalidCallers { .. } => "course-has-invalid-callers".into(),
            SpecError::NodeHasInbounds { .. } => "node-has-inbounds".into(),
            SpecError::NodeHasNoInbound { .. } => "node-has-no-inbound".into(),
            SpecError::NodeHasOutbounds { .. } => "node-has-outbounds".into(),
            SpecError::NodeHasNoOutbound { .. } => "node-has-no-outbound".into(),
            SpecError::NodeHasMultipleOutbounds { .. } => "node-has-multiple-outbounds".into(),
            SpecError::NodeHasOneOutbound { .. } => "node-has-one-outbound".into(),
            SpecError::NodeNotEnoughBranches { .. } => "node-not-enough-branches".into(),
            SpecError::NodeInconsistentBranches { .. } => "node-inconsistent-branches".into(),
            SpecError::NodeInconsistentJoiner { .. } => "node-inconsistent-joiner".into(),
            SpecError::NodeHasBranches { .. } => "node-has-branches".into(),
            SpecError::TransitionInconsistent { .. } => "transition-inconsistent".into(),
            SpecError::TransitionActionNameNotUnique { .. } => "transition-action-name-not-unique".into(),
            SpecError::TransitionPriorityNotUnique { .. } => "transition-priority-not-unique".into(),
            SpecError::FieldMustBeNull { field, .. } => format!("{}-must-be-null", field),
            SpecError::FieldRequired { field, .. } => format!("{}-required", field),
            SpecError::FieldInvalid { field, .. } => format!("{}-invalid", field),
        }
    }

    /// Entidad ofensora.
    pub fn entity(&self) -> &SpecEntity {
        match self {
            SpecError::WorkflowHasNoMainCourse { entity }
            | SpecError::WorkflowHasMultipleMainCourses { entity }
            | SpecError::WorkflowHasCircularDependentCourses { entity }
            | SpecError::CourseMissingRequiredNode { entity, .. }
            | SpecError::CourseMultipleRequiredNodes { entity, .. }
            | SpecError::CourseUnreachableNodesByEnter { entity, .. }
            | SpecError::CourseUnreachableNodesByExit { entity, .. }
            | SpecError::CourseHasAutomaticPath { entity }
            | SpecError::CourseHasInvalidCallers { entity }
            | SpecError::NodeHasInbounds { entity }
            | SpecError::NodeHasNoInbound { entity }
            | SpecError::NodeHasOutbounds { entity }
            | SpecError::NodeHasNoOutbound { entity }
            | SpecError::NodeHasMultipleOutbounds { entity }
            | SpecError::NodeHasOneOutbound { entity }
            | SpecError::NodeNotEnoughBranches { entity }
            | SpecError::NodeInconsistentBranches { entity }
            | SpecError::NodeInconsistentJoiner { entity }
            | SpecError::NodeHasBranches { entity }
            | SpecError::TransitionInconsistent { entity }
            | SpecError::TransitionActionNameNotUnique { entity }
            | SpecError::TransitionPriorityNotUnique { entity }
            | SpecError::FieldMustBeNull { entity, .. }
            | SpecError::FieldRequired { entity, .. }
            | SpecError::FieldInvalid { entity, .. } => entity,
        }
    }
}
