// src/path_function.rs - Path-cost strategy contract consumed by the IFT orchestrator

use serde::{Deserialize, Serialize};

use crate::bucket_queue::BucketState;
use crate::errors::{IftError, Result};

/// Path value type shared by every path function
pub type PathValue = i64;

/// Value of a node that no path has reached yet
pub const INFINITY: PathValue = PathValue::MAX;

/// Which caller maps a path function maintains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PathConfig {
    /// Give every new root the next label of a counter starting at zero
    pub sequential_label: bool,
    /// Copy labels along propagated arcs
    pub track_label: bool,
    /// Record the predecessor of every conquered node
    pub track_predecessor: bool,
}

impl PathConfig {
    /// Values only
    pub fn simple() -> Self {
        Self::default()
    }

    /// Values, labels and predecessors
    pub fn complete(sequential_label: bool) -> Self {
        Self {
            sequential_label,
            track_label: true,
            track_predecessor: true,
        }
    }
}

/// Root initialization hook chosen from a [`PathConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveMode {
    Simple,
    Label,
    Predecessor,
    Complete,
}

/// Caller-owned maps borrowed by a path function for one run
#[derive(Debug)]
pub struct PathMaps<'a> {
    value: &'a mut [PathValue],
    label: Option<&'a mut [u32]>,
    predecessor: Option<&'a mut [usize]>,
    next_label: Option<u32>,
    config: PathConfig,
}

impl<'a> PathMaps<'a> {
    /// Borrow the value map and the optional label and predecessor maps.
    ///
    /// Every map present must match the value map in length, and `config`
    /// must agree with the maps supplied.
    pub fn new(
        value: &'a mut [PathValue],
        label: Option<&'a mut [u32]>,
        predecessor: Option<&'a mut [usize]>,
        config: PathConfig,
    ) -> Result<Self> {
        if config.track_label != label.is_some() {
            return Err(IftError::Config(format!(
                "track_label is {} but a label map was {}",
                config.track_label,
                if label.is_some() { "supplied" } else { "not supplied" }
            )));
        }
        if config.track_predecessor != predecessor.is_some() {
            return Err(IftError::Config(format!(
                "track_predecessor is {} but a predecessor map was {}",
                config.track_predecessor,
                if predecessor.is_some() { "supplied" } else { "not supplied" }
            )));
        }
        if config.sequential_label && !config.track_label {
            return Err(IftError::Config(
                "sequential_label requires a label map".to_string(),
            ));
        }

        let expected = value.len();
        if let Some(label) = label.as_deref() {
            check_len("label map", expected, label.len())?;
        }
        if let Some(predecessor) = predecessor.as_deref() {
            check_len("predecessor map", expected, predecessor.len())?;
        }

        Ok(Self {
            value,
            label,
            predecessor,
            next_label: config.sequential_label.then_some(0),
            config,
        })
    }

    /// Value map only
    pub fn values(value: &'a mut [PathValue]) -> Self {
        Self {
            value,
            label: None,
            predecessor: None,
            next_label: None,
            config: PathConfig::simple(),
        }
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn config(&self) -> PathConfig {
        self.config
    }

    pub fn remove_mode(&self) -> RemoveMode {
        match (self.next_label.is_some(), self.predecessor.is_some()) {
            (false, false) => RemoveMode::Simple,
            (false, true) => RemoveMode::Predecessor,
            (true, false) => RemoveMode::Label,
            (true, true) => RemoveMode::Complete,
        }
    }

    #[inline]
    pub fn value(&self, node: usize) -> PathValue {
        self.value[node]
    }

    #[inline]
    pub fn set_value(&mut self, node: usize, value: PathValue) {
        self.value[node] = value;
    }

    #[inline]
    pub fn label(&self, node: usize) -> Option<u32> {
        self.label.as_deref().map(|label| label[node])
    }

    #[inline]
    pub fn predecessor(&self, node: usize) -> Option<usize> {
        self.predecessor.as_deref().map(|predecessor| predecessor[node])
    }

    /// Label the next root will receive, when labels are sequential
    pub fn next_label(&self) -> Option<u32> {
        self.next_label
    }

    /// Give `node` a fresh label from the sequential counter
    pub fn assign_root_label(&mut self, node: usize) {
        if let (Some(label), Some(next)) = (self.label.as_deref_mut(), self.next_label.as_mut()) {
            label[node] = *next;
            *next += 1;
        }
    }

    /// Make `node` its own predecessor
    pub fn assign_root_predecessor(&mut self, node: usize) {
        if let Some(predecessor) = self.predecessor.as_deref_mut() {
            predecessor[node] = node;
        }
    }

    /// Store the path offered by `node` to `adj`
    pub fn commit(&mut self, node: usize, adj: usize, value: PathValue) {
        self.value[adj] = value;
        if let Some(label) = self.label.as_deref_mut() {
            label[adj] = label[node];
        }
        if let Some(predecessor) = self.predecessor.as_deref_mut() {
            predecessor[adj] = node;
        }
    }

    /// True when `adj` still hangs from `node` but carries a different label
    pub fn stale_edge(&self, node: usize, adj: usize) -> bool {
        match (self.label.as_deref(), self.predecessor.as_deref()) {
            (Some(label), Some(predecessor)) => {
                predecessor[adj] == node && label[adj] != label[node]
            }
            _ => false,
        }
    }
}

pub(crate) fn check_len(map: &'static str, expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(IftError::DimensionMismatch { map, expected, found });
    }
    Ok(())
}

/// Strategy that initializes roots and propagates path values across arcs.
///
/// Implementors supply the root rule ([`remove_simple`](Self::remove_simple))
/// and the arc rule ([`candidate`](Self::candidate)); label and predecessor
/// bookkeeping, the capability check and both propagation modes are shared.
pub trait PathFunction<'a> {
    fn maps(&self) -> &PathMaps<'a>;

    fn maps_mut(&mut self) -> &mut PathMaps<'a>;

    /// Initialize `node` when it leaves the queue as a root (`state == Inserted`).
    /// Returns whether `node` may propagate.
    fn remove_simple(&mut self, node: usize, state: BucketState) -> bool;

    /// Path value `node` offers to `adj`, reached through adjacency `adj_position`
    fn candidate(&self, node: usize, adj: usize, adj_position: usize) -> PathValue;

    /// Whether path values never decrease along a path. Decreasing functions
    /// maximise: the queue hands out the largest value first and a candidate
    /// must exceed the current value to propagate.
    fn increasing(&self) -> bool {
        true
    }

    /// Best value `node` can ever reach
    fn best_value(&self, node: usize) -> PathValue {
        self.maps().value(node)
    }

    #[inline]
    fn value(&self, node: usize) -> PathValue {
        self.maps().value(node)
    }

    fn node_count(&self) -> usize {
        self.maps().len()
    }

    fn remove_label(&mut self, node: usize, state: BucketState) -> bool {
        if state == BucketState::Inserted {
            self.maps_mut().assign_root_label(node);
        }
        self.remove_simple(node, state)
    }

    fn remove_predecessor(&mut self, node: usize, state: BucketState) -> bool {
        if state == BucketState::Inserted {
            self.maps_mut().assign_root_predecessor(node);
        }
        self.remove_simple(node, state)
    }

    fn remove_complete(&mut self, node: usize, state: BucketState) -> bool {
        if state == BucketState::Inserted {
            let maps = self.maps_mut();
            maps.assign_root_label(node);
            maps.assign_root_predecessor(node);
        }
        self.remove_simple(node, state)
    }

    /// Root hook matching the configured maps
    fn remove(&mut self, node: usize, state: BucketState) -> bool {
        match self.maps().remove_mode() {
            RemoveMode::Simple => self.remove_simple(node, state),
            RemoveMode::Label => self.remove_label(node, state),
            RemoveMode::Predecessor => self.remove_predecessor(node, state),
            RemoveMode::Complete => self.remove_complete(node, state),
        }
    }

    /// Whether `candidate < current` under this function's ordering
    #[inline]
    fn improves(&self, candidate: PathValue, current: PathValue) -> bool {
        if self.increasing() {
            candidate < current
        } else {
            candidate > current
        }
    }

    /// Cheap test run before [`propagate`](Self::propagate)
    fn capable(&self, node: usize, adj: usize, adj_state: BucketState) -> bool {
        adj_state != BucketState::Removed && self.improves(self.value(node), self.value(adj))
    }

    /// Test run before [`propagate_differential`](Self::propagate_differential).
    /// A stale edge passes even when `node` cannot improve on `adj`.
    fn capable_differential(&self, node: usize, adj: usize, adj_state: BucketState) -> bool {
        adj_state != BucketState::Removed
            && (self.improves(self.value(node), self.value(adj))
                || self.maps().stale_edge(node, adj))
    }

    /// Offer the path through `node` to `adj`; commits only strict improvements
    fn propagate(&mut self, node: usize, adj: usize, adj_position: usize) -> bool {
        let candidate = self.candidate(node, adj, adj_position);
        if self.improves(candidate, self.value(adj)) {
            self.maps_mut().commit(node, adj, candidate);
            return true;
        }
        false
    }

    /// Like [`propagate`](Self::propagate), but also rewrites `adj` when its
    /// predecessor is `node` and the labels have diverged
    fn propagate_differential(&mut self, node: usize, adj: usize, adj_position: usize) -> bool {
        let candidate = self.candidate(node, adj, adj_position);
        if self.improves(candidate, self.value(adj)) || self.maps().stale_edge(node, adj) {
            self.maps_mut().commit(node, adj, candidate);
            return true;
        }
        false
    }
}
