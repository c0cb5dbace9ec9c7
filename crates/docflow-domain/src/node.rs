//! Nodos de un curso: tipos y entidad de especificación.
//!
//! El tipo de nodo gobierna el comportamiento en ejecución:
//! - Persistentes (`input`, `split`, `exit`, `cancel`, `joined`): al
//!   alcanzarlos se materializa una instancia de nodo.
//! - Transitorios (`enter`, `step`, `multiplexer`): el runner los atraviesa
//!   sin persistirlos.
//! - Terminales (`exit`, `cancel`, `joined`): el curso queda inmutable al
//!   alcanzarlos.

use serde::{Deserialize, Serialize};

use crate::errors::{SpecEntity, SpecError};
use crate::slug::is_valid_slug;
use crate::CourseIdx;

/// Tipo de nodo dentro de un curso.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Punto de entrada único del curso. Transitorio.
    Enter,
    /// Salida exitosa, con `exit_value` no negativo. Terminal.
    Exit,
    /// Salida por cancelación. Terminal, sin aristas.
    Cancel,
    /// Marca de rama unida a la fuerza por un joiner. Terminal, sin aristas.
    Joined,
    /// Espera una acción de usuario. Persistente.
    Input,
    /// Puente incondicional de un paso. Transitorio.
    Step,
    /// Ruteo condicional por prioridades. Transitorio.
    Multiplexer,
    /// Abre cursos hijos en paralelo. Persistente.
    Split,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Enter => "enter",
            NodeKind::Exit => "exit",
            NodeKind::Cancel => "cancel",
            NodeKind::Joined => "joined",
            NodeKind::Input => "input",
            NodeKind::Step => "step",
            NodeKind::Multiplexer => "multiplexer",
            NodeKind::Split => "split",
        }
    }

    /// Un nodo persistente reemplaza la instancia de nodo del curso al ser
    /// alcanzado.
    pub fn is_persistent(&self) -> bool {
        matches!(self,
                 NodeKind::Input | NodeKind::Split | NodeKind::Exit | NodeKind::Cancel | NodeKind::Joined)
    }

    /// Un nodo terminal deja el curso inmutable.
    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeKind::Exit | NodeKind::Cancel | NodeKind::Joined)
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Referencia a un nodo dentro de la arena del workflow: curso + posición.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    pub course: CourseIdx,
    pub node: usize,
}

/// Nodo de especificación.
///
/// Los campos opcionales sólo aplican a ciertos tipos; el validador impone
/// la tabla de presencia. `branches` referencia cursos por índice, resuelto
/// por el cargador declarativo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub(crate) kind: NodeKind,
    pub(crate) code: String,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) landing_handler: Option<String>,
    pub(crate) exit_value: Option<u8>,
    pub(crate) joiner: Option<String>,
    pub(crate) execute_permission: Option<String>,
    pub(crate) branches: Vec<CourseIdx>,
}

impl NodeSpec {
    /// Crea un nodo con los campos obligatorios, validando el código.
    pub fn new(kind: NodeKind,
               code: impl Into<String>,
               name: impl Into<String>,
               description: impl Into<String>,
               workflow: &str,
               course: &str)
               -> Result<Self, SpecError> {
        let code = code.into();
        if !is_valid_slug(&code) {
            return Err(SpecError::FieldInvalid { entity: SpecEntity::Node { workflow: workflow.to_string(),
                                                                            course: course.to_string(),
                                                                            node: code.clone() },
                                                 field: "code",
                                                 reason: "node codes must be slugs of at most 20 chars".into() });
        }
        Ok(NodeSpec { kind,
                      code,
                      name: name.into(),
                      description: description.into(),
                      landing_handler: None,
                      exit_value: None,
                      joiner: None,
                      execute_permission: None,
                      branches: Vec::new() })
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Ruta punteada del handler de llegada, si lo hay.
    pub fn landing_handler(&self) -> Option<&str> {
        self.landing_handler.as_deref()
    }

    /// Valor de salida (sólo nodos `exit`).
    pub fn exit_value(&self) -> Option<u8> {
        self.exit_value
    }

    /// Ruta punteada del joiner (sólo splits con más de un outbound).
    pub fn joiner(&self) -> Option<&str> {
        self.joiner.as_deref()
    }

    /// Permiso de ejecución (sólo nodos `input`).
    pub fn execute_permission(&self) -> Option<&str> {
        self.execute_permission.as_deref()
    }

    /// Cursos hijos que abre este nodo (sólo splits).
    pub fn branches(&self) -> &[CourseIdx] {
        &self.branches
    }
}
