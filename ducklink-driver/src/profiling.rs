//! Query profiling information.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{DuckDbError, DuckDbResult};
use crate::handle::{ConnectionHandle, ProfilingNode};

/// The profiling tree of the last query run on a connection.
///
/// Profiling has to be enabled first, for example with
/// `PRAGMA enable_profiling = 'no_output'`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfilingInfo {
    /// Metric name to rendered value.
    pub metrics: BTreeMap<String, String>,
    /// Profiles of child operators.
    pub children: Vec<ProfilingInfo>,
}

impl ProfilingInfo {
    pub(crate) fn collect(conn: &ConnectionHandle) -> DuckDbResult<Self> {
        let root = ProfilingNode::root(conn).ok_or(DuckDbError::ProfilingInfoEmpty)?;
        Ok(Self::from_node(&root))
    }

    fn from_node(node: &ProfilingNode) -> Self {
        Self {
            metrics: node.metrics().into_iter().collect(),
            children: node.children().iter().map(Self::from_node).collect(),
        }
    }

    /// Look up a metric by name.
    pub fn metric(&self, name: &str) -> Option<&str> {
        self.metrics.get(name).map(String::as_str)
    }

    /// Number of nodes in the tree, this one included.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Self::node_count).sum::<usize>()
    }
}
