//! Taxonomía de errores del runtime.
//!
//! Cuatro familias disjuntas, siguiendo la semántica de cada fallo:
//! - `SpecError` (re-exportada de `docflow-domain`): especificación
//!   estructuralmente inválida. HTTP 400.
//! - `InstanceError`: una instancia quedó o quedaría inconsistente. 400.
//! - `DeniedError`: autorización denegada. 403.
//! - `LookupError`: un código, documento o callable requerido no existe. 404.
//! - `ExecError`: una operación de ejecución no puede proceder. 500.
//!
//! `EngineError` agrega las familias y expone `code()` y `http_status()`
//! estables para el host. Todo error en medio de una cadena de transiciones
//! revierte la transacción completa.

use thiserror::Error;

use docflow_domain::SpecError;

/// Autorización denegada (familia 403).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeniedError {
    #[error("user may not instantiate workflow `{workflow}`")]
    CreateDenied { workflow: String },

    #[error("user may not cancel `{path}`: workflow-level permission missing")]
    CancelDeniedByWorkflow { workflow: String, path: String },

    #[error("user may not cancel `{path}`: course-level permission missing")]
    CancelDeniedByCourse { workflow: String, path: String },

    #[error("user may not act on node `{node}` at `{path}`")]
    AdvanceDeniedByNode { node: String, path: String },

    #[error("user may not take transition `{action:?}` at `{path}`")]
    AdvanceDeniedByTransition { action: Option<String>, path: String },

    #[error("course at `{path}` is standing on `{node}`, which accepts no user action")]
    AdvanceDeniedWrongNodeType { node: String, path: String },
}

impl DeniedError {
    pub fn code(&self) -> &'static str {
        match self {
            DeniedError::CreateDenied { .. } => "create-denied",
            DeniedError::CancelDeniedByWorkflow { .. } => "cancel-denied-by-workflow",
            DeniedError::CancelDeniedByCourse { .. } => "cancel-denied-by-course",
            DeniedError::AdvanceDeniedByNode { .. } => "advance-denied-by-node",
            DeniedError::AdvanceDeniedByTransition { .. } => "advance-denied-by-transition",
            DeniedError::AdvanceDeniedWrongNodeType { .. } => "advance-denied-wrong-node-type",
        }
    }
}

/// Elementos requeridos que no existen (familia 404).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("workflow `{workflow}` is not installed")]
    WorkflowDoesNotExist { workflow: String },

    #[error("document `{doc_type}#{key}` has no workflow instance")]
    DocumentHasNoInstance { doc_type: String, key: String },

    #[error("model `{model}` is not a known document type")]
    DocumentTypeUnknown { model: String },

    #[error("no {kind} is registered under `{path}`")]
    CallableDoesNotExist { kind: &'static str, path: String },
}

impl LookupError {
    pub fn code(&self) -> &'static str {
        match self {
            LookupError::WorkflowDoesNotExist { .. } => "workflow-does-not-exist",
            LookupError::DocumentHasNoInstance { .. } => "document-has-no-instance",
            LookupError::DocumentTypeUnknown { .. } => "document-type-unknown",
            LookupError::CallableDoesNotExist { .. } => "callable-does-not-exist",
        }
    }
}

/// Instancias inconsistentes con su especificación (familia 400).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InstanceError {
    #[error("workflow `{workflow}` expects documents of type `{expected}`, got `{actual}`")]
    DoesNotAcceptDocument {
        workflow: String,
        expected: String,
        actual: String,
    },

    #[error("document `{doc_type}#{key}` is already bound to a workflow instance")]
    DocumentAlreadyBound { doc_type: String, key: String },

    #[error("course instance at `{path}` does not match its workflow spec")]
    CourseInconsistent { path: String },

    #[error("node instance at `{path}` does not match its course spec")]
    NodeInconsistent { path: String },

    #[error("split node instance at `{path}` does not mirror its declared branches")]
    IncompleteSplitBranches { path: String },

    #[error("non-split node instance at `{path}` has instantiated branches")]
    NonSplitHasBranches { path: String },
}

impl InstanceError {
    pub fn code(&self) -> &'static str {
        match self {
            InstanceError::DoesNotAcceptDocument { .. } => "instance-does-not-accept-document",
            InstanceError::DocumentAlreadyBound { .. } => "document-already-bound",
            InstanceError::CourseInconsistent { .. } => "course-instance-inconsistent",
            InstanceError::NodeInconsistent { .. } => "node-instance-inconsistent",
            InstanceError::IncompleteSplitBranches { .. } => "node-instance-incomplete-split-branches",
            InstanceError::NonSplitHasBranches { .. } => "node-instance-non-split-has-branches",
        }
    }
}

/// Operaciones de ejecución que no pueden proceder (familia 500).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecError {
    #[error("the workflow instance is not pending")]
    InstanceNotPending { workflow: String },

    #[error("course at `{path}` is not pending")]
    CourseNotPending { path: String },

    #[error("course at `{path}` is not waiting on an input node")]
    CourseNotWaiting { path: String },

    #[error("course at `{path}` is already terminated")]
    CourseAlreadyTerminated { path: String },

    #[error("no child course instance matches `{path}`")]
    CourseInstanceDoesNotExist { path: String },

    #[error("course at `{path}` is not standing on a split: it has no children")]
    CourseHasNoChildren { path: String },

    #[error("no outbound named `{action}` leaves the current node at `{path}`")]
    NodeTransitionDoesNotExist { path: String, action: String },

    #[error("no multiplexer condition was satisfied at `{path}` (node `{node}`)")]
    MultiplexerUnsatisfied { path: String, node: String },

    #[error("joiner decided nothing although every branch of `{node}` at `{path}` terminated")]
    SplitJoinUnresolved { path: String, node: String },

    #[error("joiner returned an unusable result for `{node}` at `{path}`")]
    InvalidJoinerResult { path: String, node: String },

    #[error("course at `{path}` has no joined node and cannot be force-joined")]
    CourseNotJoinable { path: String },

    #[error("node `{node}` does not belong to the course being moved")]
    ForeignNode { node: String },

    #[error("user callable `{callable}` failed: {message}")]
    CallableFailed { callable: String, message: String },
}

impl ExecError {
    pub fn code(&self) -> &'static str {
        match self {
            ExecError::InstanceNotPending { .. } => "instance-not-pending",
            ExecError::CourseNotPending { .. } => "course-not-pending",
            ExecError::CourseNotWaiting { .. } => "course-not-waiting",
            ExecError::CourseAlreadyTerminated { .. } => "course-already-terminated",
            ExecError::CourseInstanceDoesNotExist { .. } => "course-instance-does-not-exist",
            ExecError::CourseHasNoChildren { .. } => "course-has-no-children",
            ExecError::NodeTransitionDoesNotExist { .. } => "node-transition-does-not-exist",
            ExecError::MultiplexerUnsatisfied { .. } => "multiplexer-unsatisfied",
            ExecError::SplitJoinUnresolved { .. } => "split-join-unresolved",
            ExecError::InvalidJoinerResult { .. } => "invalid-joiner-result",
            ExecError::CourseNotJoinable { .. } => "course-not-joinable",
            ExecError::ForeignNode { .. } => "foreign-node",
            ExecError::CallableFailed { .. } => "execution-error",
        }
    }
}

/// Error agregado que exponen todas las operaciones públicas del motor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Invalid(#[from] SpecError),

    #[error(transparent)]
    InvalidInstance(#[from] InstanceError),

    #[error(transparent)]
    Denied(#[from] DeniedError),

    #[error(transparent)]
    Missing(#[from] LookupError),

    #[error(transparent)]
    Execution(#[from] ExecError),

    #[error("malformed spec input: {message}")]
    MalformedInput { message: String },

    #[error("model `{model}` exists but is not a workflow document type")]
    NotADocumentType { model: String },

    #[error("workflow `{workflow}` is already installed")]
    WorkflowAlreadyInstalled { workflow: String },
}

impl EngineError {
    /// Código estable del error.
    pub fn code(&self) -> String {
        match self {
            EngineError::Invalid(e) => e.code(),
            EngineError::InvalidInstance(e) => e.code().to_string(),
            EngineError::Denied(e) => e.code().to_string(),
            EngineError::Missing(e) => e.code().to_string(),
            EngineError::Execution(e) => e.code().to_string(),
            EngineError::MalformedInput { .. } => "malformed-input".to_string(),
            EngineError::NotADocumentType { .. } => "not-a-document-type".to_string(),
            EngineError::WorkflowAlreadyInstalled { .. } => "workflow-already-installed".to_string(),
        }
    }

    /// Estado HTTP sugerido para el host.
    pub fn http_status(&self) -> u16 {
        match self {
            EngineError::Invalid(_)
            | EngineError::InvalidInstance(_)
            | EngineError::MalformedInput { .. }
            | EngineError::NotADocumentType { .. }
            | EngineError::WorkflowAlreadyInstalled { .. } => 400,
            EngineError::Denied(_) => 403,
            EngineError::Missing(_) => 404,
            EngineError::Execution(_) => 500,
        }
    }
}
