//! Lookup of node implementations by type tag.
//!
//! The orchestrator holds a [`NodeRegistry`] and selects nodes by
//! [`NodeType`]; it never names a concrete node type.

use std::collections::BTreeMap;
use std::sync::Arc;

use pipeline::{ExecutionReport, Node, NodeConfig, NodeError, NodeResult, NodeType, RetryConfig};

use crate::http::{HttpClientConfig, HttpRequestNode};

const TRACING_TARGET: &str = "nodes::registry";

/// Registered nodes keyed by their type tag.
#[derive(Default, Clone)]
pub struct NodeRegistry {
    nodes: BTreeMap<NodeType, Arc<dyn Node>>,
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("node_types", &self.nodes.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl NodeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every built-in node.
    ///
    /// # Errors
    ///
    /// [`NodeError::Configuration`] if a built-in node cannot be constructed.
    pub fn with_defaults(http: HttpClientConfig, retry: RetryConfig) -> Result<Self, NodeError> {
        let mut registry = Self::new();
        let http_node = HttpRequestNode::new(http)?.with_retry_config(retry);
        registry.register(Arc::new(http_node));
        Ok(registry)
    }

    /// Registers `node` under its own type tag.
    ///
    /// Returns the node previously registered under the same tag, if any.
    pub fn register(&mut self, node: Arc<dyn Node>) -> Option<Arc<dyn Node>> {
        let node_type = node.node_type().clone();
        tracing::debug!(target: TRACING_TARGET, node_type = %node_type, "Registering node");
        self.nodes.insert(node_type, node)
    }

    /// Returns the node registered under `node_type`.
    pub fn get(&self, node_type: &NodeType) -> Option<Arc<dyn Node>> {
        self.nodes.get(node_type).cloned()
    }

    /// Returns every registered type tag in sorted order.
    pub fn node_types(&self) -> impl Iterator<Item = &NodeType> {
        self.nodes.keys()
    }

    /// Executes the node registered under `node_type`.
    ///
    /// # Errors
    ///
    /// [`NodeError::UnknownNodeType`] if nothing is registered under the tag;
    /// otherwise whatever the node's `execute` returns.
    pub async fn execute(
        &self,
        node_type: &NodeType,
        config: NodeConfig,
    ) -> Result<NodeResult, NodeError> {
        self.lookup(node_type)?.execute(config).await
    }

    /// Like [`execute`](Self::execute), returning the full execution report.
    pub async fn execute_with_report(
        &self,
        node_type: &NodeType,
        config: NodeConfig,
    ) -> Result<ExecutionReport, NodeError> {
        self.lookup(node_type)?.execute_with_report(config).await
    }

    fn lookup(&self, node_type: &NodeType) -> Result<Arc<dyn Node>, NodeError> {
        self.get(node_type)
            .ok_or_else(|| NodeError::UnknownNodeType(node_type.clone()))
    }
}
