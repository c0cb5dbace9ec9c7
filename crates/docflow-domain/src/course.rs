//! Cursos: subgrafos de nodos que forman un camino paralelo del workflow.

use serde::{Deserialize, Serialize};

use crate::node::{NodeKind, NodeSpec};
use crate::transition::TransitionSpec;
use crate::NodeIdx;

/// Curso de acción de un workflow.
///
/// El curso raíz (profundidad 0) tiene código vacío; los demás cursos son
/// abiertos por nodos split de cursos de menor profundidad. Los nodos y
/// transiciones viven en arenas indexadas; las transiciones referencian
/// nodos vía `NodeRef`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseSpec {
    pub(crate) code: String,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) depth: u16,
    pub(crate) cancel_permission: Option<String>,
    pub(crate) nodes: Vec<NodeSpec>,
    pub(crate) transitions: Vec<TransitionSpec>,
}

impl CourseSpec {
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Distancia mínima desde el curso raíz sobre el grafo de ramas.
    pub fn depth(&self) -> u16 {
        self.depth
    }

    pub fn cancel_permission(&self) -> Option<&str> {
        self.cancel_permission.as_deref()
    }

    pub fn is_root(&self) -> bool {
        self.depth == 0
    }

    pub fn nodes(&self) -> &[NodeSpec] {
        &self.nodes
    }

    pub fn node(&self, idx: NodeIdx) -> &NodeSpec {
        &self.nodes[idx]
    }

    pub fn transitions(&self) -> &[TransitionSpec] {
        &self.transitions
    }

    /// Busca un nodo por código.
    pub fn node_by_code(&self, code: &str) -> Option<NodeIdx> {
        self.nodes.iter().position(|n| n.code == code)
    }

    /// Índices de los nodos de un tipo dado, en orden de declaración.
    pub fn nodes_of_kind(&self, kind: NodeKind) -> Vec<NodeIdx> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.kind == kind)
            .map(|(i, _)| i)
            .collect()
    }

    /// Transiciones salientes de un nodo, en orden de declaración.
    pub fn outbounds(&self, node: NodeIdx) -> impl Iterator<Item = &TransitionSpec> {
        self.transitions.iter().filter(move |t| t.origin.node == node)
    }

    /// Transiciones entrantes a un nodo, en orden de declaración.
    pub fn inbounds(&self, node: NodeIdx) -> impl Iterator<Item = &TransitionSpec> {
        self.transitions.iter().filter(move |t| t.destination.node == node)
    }

    /// Saliente de un nodo `input` o `split` identificada por acción.
    pub fn outbound_by_action(&self, node: NodeIdx, action: &str) -> Option<&TransitionSpec> {
        self.outbounds(node).find(|t| t.action_name.as_deref() == Some(action))
    }
}
