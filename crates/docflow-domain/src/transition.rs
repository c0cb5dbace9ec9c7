//! Transiciones: aristas dirigidas entre nodos del mismo curso.

use serde::{Deserialize, Serialize};

use crate::errors::{SpecEntity, SpecError};
use crate::node::NodeRef;
use crate::slug::is_valid_slug;

/// Arista dirigida de la especificación.
///
/// `action_name` identifica la transición entre las salientes de nodos
/// `input` y `split`; `condition` y `priority` sólo aplican a salientes de
/// `multiplexer`; `permission` sólo a salientes de `enter` e `input`. La
/// tabla de presencia la impone el validador.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionSpec {
    pub(crate) origin: NodeRef,
    pub(crate) destination: NodeRef,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) action_name: Option<String>,
    pub(crate) permission: Option<String>,
    pub(crate) condition: Option<String>,
    pub(crate) priority: Option<u8>,
}

impl TransitionSpec {
    pub fn new(origin: NodeRef, destination: NodeRef, name: impl Into<String>, description: impl Into<String>) -> Self {
        TransitionSpec { origin,
                         destination,
                         name: name.into(),
                         description: description.into(),
                         action_name: None,
                         permission: None,
                         condition: None,
                         priority: None }
    }

    /// Valida el `action_name` (si existe) como slug.
    pub(crate) fn check_action_name(&self, entity: SpecEntity) -> Result<(), SpecError> {
        match self.action_name.as_deref() {
            Some(action) if !is_valid_slug(action) => {
                Err(SpecError::FieldInvalid { entity,
                                              field: "action-name",
                                              reason: "action names must be slugs of at most 20 chars".into() })
            }
            _ => Ok(()),
        }
    }

    pub fn origin(&self) -> NodeRef {
        self.origin
    }

    pub fn destination(&self) -> NodeRef {
        self.destination
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn action_name(&self) -> Option<&str> {
        self.action_name.as_deref()
    }

    pub fn permission(&self) -> Option<&str> {
        self.permission.as_deref()
    }

    /// Ruta punteada de la condición (sólo salientes de multiplexer).
    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }

    pub fn priority(&self) -> Option<u8> {
        self.priority
    }
}
