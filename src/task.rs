use serde::Serialize;

use crate::instance::DataNode;

/// Lineage inferred for a single job: the tables it reads (dependent nodes) and
/// the tables it writes (generated nodes).
///
/// `empty()` is the identity of [`LineageTask::merge`] and `unknown()` is its
/// absorbing element: once a task is unknown, no merge makes it known again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LineageTask {
    is_unknown: bool,
    dependent_nodes: Vec<DataNode>,
    generated_nodes: Vec<DataNode>,
}

impl LineageTask {
    /// No lineage: nothing read, nothing written.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Lineage could not be inferred.
    pub fn unknown() -> Self {
        Self {
            is_unknown: true,
            dependent_nodes: vec![],
            generated_nodes: vec![],
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.is_unknown
    }

    pub fn dependent_nodes(&self) -> &[DataNode] {
        &self.dependent_nodes
    }

    pub fn generated_nodes(&self) -> &[DataNode] {
        &self.generated_nodes
    }

    pub fn add_dependent_node(&mut self, node: DataNode) {
        self.dependent_nodes.push(node);
    }

    pub fn add_generated_node(&mut self, node: DataNode) {
        self.generated_nodes.push(node);
    }

    /// Combines two tasks into a new one. If either side is unknown the result is
    /// a bare `unknown()`, otherwise node lists are concatenated in order.
    pub fn merge(&self, other: &LineageTask) -> LineageTask {
        if self.is_unknown || other.is_unknown {
            return LineageTask::unknown();
        }
        LineageTask {
            is_unknown: false,
            dependent_nodes: self
                .dependent_nodes
                .iter()
                .chain(&other.dependent_nodes)
                .cloned()
                .collect(),
            generated_nodes: self
                .generated_nodes
                .iter()
                .chain(&other.generated_nodes)
                .cloned()
                .collect(),
        }
    }

    /// Accumulates `other` into `self`. Node lists are always appended, so edges
    /// inferred by siblings survive even after the accumulator turns unknown.
    pub fn merge_into(&mut self, other: &LineageTask) {
        self.is_unknown |= other.is_unknown;
        self.dependent_nodes
            .extend(other.dependent_nodes.iter().cloned());
        self.generated_nodes
            .extend(other.generated_nodes.iter().cloned());
    }
}

impl FromIterator<LineageTask> for LineageTask {
    /// Folds tasks left to right with [`LineageTask::merge`].
    fn from_iter<I: IntoIterator<Item = LineageTask>>(iter: I) -> Self {
        iter.into_iter()
            .fold(LineageTask::empty(), |acc, task| acc.merge(&task))
    }
}
