// src/ift.rs - Image Foresting Transform orchestration loop

use log::debug;
use serde::Serialize;

use crate::adjacency::{Adjacency, Neighbors};
use crate::bucket_queue::{BucketQueue, BucketState};
use crate::errors::{IftError, Result};
use crate::path_function::{PathFunction, PathValue, INFINITY};

/// Counters collected during one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IftStats {
    /// Nodes that left the queue
    pub removed: usize,
    /// Nodes that left the queue without ever being conquered
    pub roots: usize,
    /// Successful propagations
    pub propagations: usize,
}

/// Optimum-path forest computation over an adjacency relation.
///
/// The engine owns its bucket queue; path functions and their caller maps are
/// borrowed for the duration of [`run`](Self::run) only.
pub struct Ift<'g, A: Adjacency + ?Sized> {
    adjacency: &'g A,
    queue: BucketQueue,
    target: Option<usize>,
    differential: bool,
}

impl<'g, A: Adjacency + ?Sized> Ift<'g, A> {
    /// `max_weight` bounds the spread of path values queued at the same time.
    /// The queue serves increasing path functions with FIFO ties.
    pub fn new(adjacency: &'g A, max_weight: usize) -> Result<Self> {
        let queue = BucketQueue::new(adjacency.node_count(), max_weight)?;
        Ok(Self::with_queue(adjacency, queue))
    }

    /// Engine whose queue extraction order follows `function`
    pub fn for_function<'a, F>(
        adjacency: &'g A,
        max_weight: usize,
        function: &F,
        fifo: bool,
    ) -> Result<Self>
    where
        F: PathFunction<'a> + ?Sized,
    {
        let queue = BucketQueue::with_order(
            adjacency.node_count(),
            max_weight,
            function.increasing(),
            fifo,
        )?;
        Ok(Self::with_queue(adjacency, queue))
    }

    fn with_queue(adjacency: &'g A, queue: BucketQueue) -> Self {
        Self {
            adjacency,
            queue,
            target: None,
            differential: false,
        }
    }

    pub fn queue(&self) -> &BucketQueue {
        &self.queue
    }

    pub fn adjacency(&self) -> &A {
        self.adjacency
    }

    /// Insert one seed with an explicit queue weight
    pub fn insert_seed(&mut self, node: usize, weight: usize) -> Result<()> {
        self.queue.insert(node, weight)
    }

    /// Insert every seed at its current path value
    pub fn insert_seeds<'a, F>(&mut self, seeds: &[usize], function: &F) -> Result<()>
    where
        F: PathFunction<'a> + ?Sized,
    {
        for &seed in seeds {
            if seed >= function.node_count() {
                return Err(IftError::NodeOutOfRange {
                    node: seed,
                    node_count: function.node_count(),
                });
            }
            let weight = self.weight(seed, function.value(seed))?;
            self.queue.insert(seed, weight)?;
        }
        Ok(())
    }

    /// Stop the run as soon as `target` leaves the queue
    pub fn stop_at(&mut self, target: Option<usize>) {
        self.target = target;
    }

    /// Route propagation through [`PathFunction::propagate_differential`]
    pub fn set_differential(&mut self, enabled: bool) {
        self.differential = enabled;
    }

    /// Return the queue to its initial state
    pub fn reset(&mut self) {
        self.queue.reset();
    }

    fn weight(&self, node: usize, value: PathValue) -> Result<usize> {
        if value == INFINITY {
            return Err(IftError::WeightOutOfRange {
                node,
                weight: value,
                max_weight: self.queue.max_weight(),
            });
        }
        usize::try_from(value).map_err(|_| IftError::WeightOutOfRange {
            node,
            weight: value,
            max_weight: self.queue.max_weight(),
        })
    }

    /// Drain the queue, growing the forest with `function`
    pub fn run<'a, F>(&mut self, function: &mut F) -> Result<IftStats>
    where
        F: PathFunction<'a> + ?Sized,
    {
        let node_count = self.adjacency.node_count();
        if function.node_count() != node_count {
            return Err(IftError::DimensionMismatch {
                map: "path value map",
                expected: node_count,
                found: function.node_count(),
            });
        }
        if function.increasing() != self.queue.increasing() {
            return Err(IftError::Config(format!(
                "Path function is {} but the queue extracts the {} weight first",
                if function.increasing() { "increasing" } else { "decreasing" },
                if self.queue.increasing() { "smallest" } else { "largest" }
            )));
        }
        if self.differential {
            let config = function.maps().config();
            if !(config.track_label && config.track_predecessor) {
                return Err(IftError::Config(
                    "Differential propagation requires label and predecessor maps".to_string(),
                ));
            }
        }
        if let Some(target) = self.target {
            if target >= node_count {
                return Err(IftError::NodeOutOfRange { node: target, node_count });
            }
        }

        debug!(
            "Running IFT over {} nodes with {} seeds queued",
            node_count,
            self.queue.elements()
        );

        let mut stats = IftStats::default();
        while !self.queue.is_empty() {
            if let Some(target) = self.target {
                if self.queue.state(target) == BucketState::Removed {
                    debug!("Target {} reached", target);
                    break;
                }
            }

            let node = self.queue.remove()?;
            let state = self.queue.state(node);
            if state == BucketState::Inserted {
                stats.roots += 1;
            }
            let capable = function.remove(node, state);
            self.queue.finished(node);
            stats.removed += 1;
            if !capable {
                continue;
            }

            for (position, adj) in Neighbors::new(self.adjacency, node) {
                let adj_state = self.queue.state(adj);
                if adj_state == BucketState::Removed {
                    continue;
                }
                let capable = if self.differential {
                    function.capable_differential(node, adj, adj_state)
                } else {
                    function.capable(node, adj, adj_state)
                };
                if !capable {
                    continue;
                }

                let previous = function.value(adj);
                let propagated = if self.differential {
                    function.propagate_differential(node, adj, position)
                } else {
                    function.propagate(node, adj, position)
                };
                if propagated {
                    let old_weight = if adj_state.is_queued() {
                        self.weight(adj, previous)?
                    } else {
                        0
                    };
                    let new_weight = self.weight(adj, function.value(adj))?;
                    self.queue.update(adj, old_weight, new_weight)?;
                    stats.propagations += 1;
                }
            }
        }

        debug!(
            "IFT finished: {} removed, {} roots, {} propagations",
            stats.removed, stats.roots, stats.propagations
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjacency::{CompleteAdjacency, GridAdjacency, GridShape, ListAdjacency};
    use crate::bucket_queue::NIL;
    use crate::path_function::{PathConfig, PathMaps};
    use crate::path_functions::{MaxPathFunction, SumPathFunction};

    #[test]
    fn test_sum_chain() {
        let _ = env_logger::builder().is_test(true).try_init();
        let chain = ListAdjacency::chain(5);
        let handicap = vec![0, 1, 1, 1, 1];
        let mut value = vec![0, INFINITY, INFINITY, INFINITY, INFINITY];
        let mut label = vec![0; 5];
        let mut predecessor = vec![NIL; 5];

        let stats = {
            let maps = PathMaps::new(
                &mut value,
                Some(&mut label),
                Some(&mut predecessor),
                PathConfig::complete(true),
            )
            .unwrap();
            let mut sum = SumPathFunction::new(maps, &handicap).unwrap();
            let mut ift = Ift::new(&chain, 4).unwrap();
            ift.insert_seed(0, 0).unwrap();
            ift.run(&mut sum).unwrap()
        };

        assert_eq!(value, vec![0, 1, 2, 3, 4]);
        assert_eq!(label, vec![0; 5]);
        assert_eq!(predecessor, vec![0, 0, 1, 2, 3]);
        assert_eq!(stats, IftStats { removed: 5, roots: 1, propagations: 4 });
    }

    #[test]
    fn test_max_chain() {
        let chain = ListAdjacency::chain(5);
        let handicap = vec![5, 1, 1, 1, 1];
        let mut value = vec![5, INFINITY, INFINITY, INFINITY, INFINITY];
        {
            let mut max = MaxPathFunction::new(PathMaps::values(&mut value), &handicap).unwrap();
            let mut ift = Ift::new(&chain, 5).unwrap();
            ift.insert_seeds(&[0], &max).unwrap();
            ift.run(&mut max).unwrap();
        }
        assert_eq!(value, vec![5, 5, 5, 5, 5]);
    }

    #[test]
    fn test_two_seeds_split_the_chain() {
        let chain = ListAdjacency::chain(6);
        let handicap = vec![0, 1, 1, 1, 1, 0];
        let mut value = vec![0, INFINITY, INFINITY, INFINITY, INFINITY, 0];
        let mut label = vec![0; 6];
        let mut predecessor = vec![NIL; 6];
        {
            let maps = PathMaps::new(
                &mut value,
                Some(&mut label),
                Some(&mut predecessor),
                PathConfig::complete(true),
            )
            .unwrap();
            let mut sum = SumPathFunction::new(maps, &handicap).unwrap();
            let mut ift = Ift::new(&chain, 4).unwrap();
            ift.insert_seeds(&[0, 5], &sum).unwrap();
            ift.run(&mut sum).unwrap();
        }
        assert_eq!(value, vec![0, 1, 2, 2, 1, 0]);
        assert_eq!(label, vec![0, 0, 0, 1, 1, 1]);
        assert_eq!(predecessor, vec![0, 0, 1, 4, 5, 5]);
    }

    #[test]
    fn test_stop_at_target_leaves_far_nodes_unvisited() {
        let chain = ListAdjacency::chain(6);
        let handicap = vec![1; 6];
        let mut value = vec![INFINITY; 6];
        value[0] = 1;
        let mut ift = Ift::new(&chain, 2).unwrap();
        {
            let mut sum = SumPathFunction::new(PathMaps::values(&mut value), &handicap).unwrap();
            ift.insert_seeds(&[0], &sum).unwrap();
            ift.stop_at(Some(2));
            ift.run(&mut sum).unwrap();
        }
        assert_eq!(ift.queue().state(2), BucketState::Removed);
        assert_eq!(ift.queue().state(3), BucketState::Updated);
        assert_eq!(ift.queue().state(5), BucketState::NotVisited);
        assert_eq!(value[5], INFINITY);
    }

    #[test]
    fn test_dimension_mismatch_is_reported_before_running() {
        let chain = ListAdjacency::chain(4);
        let handicap = vec![0; 3];
        let mut value = vec![0; 3];
        let mut sum = SumPathFunction::new(PathMaps::values(&mut value), &handicap).unwrap();
        let mut ift = Ift::new(&chain, 4).unwrap();
        ift.insert_seed(0, 0).unwrap();
        let err = ift.run(&mut sum).unwrap_err();
        assert!(matches!(
            err,
            IftError::DimensionMismatch { expected: 4, found: 3, .. }
        ));
        assert_eq!(ift.queue().elements(), 1);
    }

    #[test]
    fn test_differential_requires_full_maps() {
        let chain = ListAdjacency::chain(2);
        let handicap = vec![0; 2];
        let mut value = vec![0; 2];
        let mut sum = SumPathFunction::new(PathMaps::values(&mut value), &handicap).unwrap();
        let mut ift = Ift::new(&chain, 1).unwrap();
        ift.set_differential(true);
        assert!(matches!(ift.run(&mut sum), Err(IftError::Config(_))));
    }

    #[test]
    fn test_infinite_seed_cannot_be_queued() {
        let chain = ListAdjacency::chain(2);
        let handicap = vec![0; 2];
        let mut value = vec![INFINITY; 2];
        let sum = SumPathFunction::new(PathMaps::values(&mut value), &handicap).unwrap();
        let mut ift = Ift::new(&chain, 1).unwrap();
        assert!(matches!(
            ift.insert_seeds(&[1], &sum),
            Err(IftError::WeightOutOfRange { node: 1, .. })
        ));
    }

    #[test]
    fn test_arc_beyond_window_is_fatal() {
        let chain = ListAdjacency::chain(3);
        let handicap = vec![0, 10, 0];
        let mut value = vec![0, INFINITY, INFINITY];
        let mut sum = SumPathFunction::new(PathMaps::values(&mut value), &handicap).unwrap();
        let mut ift = Ift::new(&chain, 4).unwrap();
        ift.insert_seeds(&[0, 2], &sum).unwrap();
        let err = ift.run(&mut sum).unwrap_err();
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn test_complete_graph_forest() {
        let complete = CompleteAdjacency::new(4);
        let handicap = vec![0, 3, 1, 2];
        let mut value = vec![0, INFINITY, INFINITY, INFINITY];
        let mut predecessor = vec![NIL; 4];
        {
            let config = PathConfig {
                track_predecessor: true,
                ..PathConfig::default()
            };
            let maps = PathMaps::new(&mut value, None, Some(&mut predecessor), config).unwrap();
            let mut max = MaxPathFunction::new(maps, &handicap).unwrap();
            let mut ift = Ift::new(&complete, 3).unwrap();
            ift.insert_seeds(&[0], &max).unwrap();
            ift.run(&mut max).unwrap();
        }
        assert_eq!(value, vec![0, 3, 1, 2]);
        assert_eq!(predecessor, vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_runs_are_deterministic() {
        let shape = GridShape::planar(6, 5).unwrap();
        let grid = GridAdjacency::hyperspheric(shape, 1.5).unwrap();
        let handicap: Vec<PathValue> = (0..30).map(|i| (i * 7 % 5) as PathValue).collect();

        let run = || {
            let mut value = vec![INFINITY; 30];
            let mut label = vec![0; 30];
            let mut predecessor = vec![NIL; 30];
            value[0] = handicap[0];
            value[29] = handicap[29];
            value[14] = handicap[14];
            {
                let maps = PathMaps::new(
                    &mut value,
                    Some(&mut label),
                    Some(&mut predecessor),
                    PathConfig::complete(true),
                )
                .unwrap();
                let mut sum = SumPathFunction::new(maps, &handicap).unwrap();
                let mut ift = Ift::new(&grid, 4).unwrap();
                ift.insert_seeds(&[0, 29, 14], &sum).unwrap();
                ift.run(&mut sum).unwrap();
            }
            (value, label, predecessor)
        };

        let first = run();
        let second = run();
        assert_eq!(first, second);
        assert!(first.0.iter().all(|&v| v != INFINITY));
    }

    /// Records the value every node holds when it is finalized
    struct Recording<'a, 'r> {
        inner: SumPathFunction<'a>,
        finalized: &'r mut Vec<Option<PathValue>>,
    }

    impl<'a, 'r> PathFunction<'a> for Recording<'a, 'r> {
        fn maps(&self) -> &PathMaps<'a> {
            self.inner.maps()
        }

        fn maps_mut(&mut self) -> &mut PathMaps<'a> {
            self.inner.maps_mut()
        }

        fn remove_simple(&mut self, node: usize, state: BucketState) -> bool {
            let capable = self.inner.remove_simple(node, state);
            self.finalized[node] = Some(self.inner.value(node));
            capable
        }

        fn candidate(&self, node: usize, adj: usize, adj_position: usize) -> PathValue {
            assert!(self.finalized[adj].is_none(), "finalized node {} offered a path", adj);
            self.inner.candidate(node, adj, adj_position)
        }
    }

    #[test]
    fn test_finalized_values_never_change() {
        let shape = GridShape::planar(7, 7).unwrap();
        let grid = GridAdjacency::hyperspheric(shape, 1.0).unwrap();
        let handicap: Vec<PathValue> = (0..49).map(|i| ((i * 13) % 9) as PathValue).collect();
        let mut value = vec![INFINITY; 49];
        value[24] = handicap[24];
        let mut finalized = vec![None; 49];
        {
            let inner = SumPathFunction::new(PathMaps::values(&mut value), &handicap).unwrap();
            let mut recording = Recording {
                inner,
                finalized: &mut finalized,
            };
            let mut ift = Ift::new(&grid, 8).unwrap();
            ift.insert_seeds(&[24], &recording).unwrap();
            let stats = ift.run(&mut recording).unwrap();
            assert_eq!(stats.removed, 49);
        }
        for node in 0..49 {
            assert_eq!(finalized[node], Some(value[node]));
        }
    }

    fn relabelled_max_chain(differential: bool) -> (Vec<PathValue>, Vec<u32>, Vec<usize>, IftStats) {
        let chain = ListAdjacency::chain(3);
        let handicap = vec![0; 3];
        let mut value = vec![0; 3];
        // a previous forest rooted at 0 whose root was relabelled from 1 to 2
        let mut label = vec![2, 1, 1];
        let mut predecessor = vec![0, 0, 1];
        let stats = {
            let maps = PathMaps::new(
                &mut value,
                Some(&mut label),
                Some(&mut predecessor),
                PathConfig::complete(false),
            )
            .unwrap();
            let mut max = MaxPathFunction::new(maps, &handicap).unwrap();
            let mut ift = Ift::new(&chain, 1).unwrap();
            ift.set_differential(differential);
            ift.insert_seeds(&[0], &max).unwrap();
            ift.run(&mut max).unwrap()
        };
        (value, label, predecessor, stats)
    }

    #[test]
    fn test_differential_run_relabels_plateau_subtree() {
        let (value, label, predecessor, stats) = relabelled_max_chain(true);
        assert_eq!(label, vec![2, 2, 2]);
        assert_eq!(predecessor, vec![0, 0, 1]);
        assert_eq!(value, vec![0, 0, 0]);
        assert_eq!(stats, IftStats { removed: 3, roots: 1, propagations: 2 });
    }

    #[test]
    fn test_plain_run_leaves_stale_labels() {
        let (_, label, _, stats) = relabelled_max_chain(false);
        assert_eq!(label, vec![2, 1, 1]);
        assert_eq!(stats.propagations, 0);
    }

    /// Widest path: the value of a path is its narrowest node capacity
    struct Widest<'a> {
        maps: PathMaps<'a>,
        capacity: &'a [PathValue],
    }

    impl<'a> PathFunction<'a> for Widest<'a> {
        fn maps(&self) -> &PathMaps<'a> {
            &self.maps
        }

        fn maps_mut(&mut self) -> &mut PathMaps<'a> {
            &mut self.maps
        }

        fn remove_simple(&mut self, _node: usize, _state: BucketState) -> bool {
            true
        }

        fn candidate(&self, node: usize, adj: usize, _adj_position: usize) -> PathValue {
            self.maps.value(node).min(self.capacity[adj])
        }

        fn increasing(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_decreasing_function_takes_widest_path() {
        // 0 reaches 3 through the narrow 1 or the wide 2
        let graph = ListAdjacency::from_edges(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]).unwrap();
        let capacity = vec![9, 2, 6, 8];
        let mut value = vec![9, 0, 0, 0];
        let mut predecessor = vec![NIL; 4];
        {
            let config = PathConfig {
                track_predecessor: true,
                ..PathConfig::default()
            };
            let maps = PathMaps::new(&mut value, None, Some(&mut predecessor), config).unwrap();
            let mut widest = Widest { maps, capacity: &capacity };
            let mut ift = Ift::for_function(&graph, 9, &widest, true).unwrap();
            assert!(!ift.queue().increasing());
            ift.insert_seeds(&[0], &widest).unwrap();
            ift.run(&mut widest).unwrap();
        }
        assert_eq!(value, vec![9, 2, 6, 6]);
        assert_eq!(predecessor, vec![0, 0, 0, 2]);
    }

    #[test]
    fn test_queue_order_must_match_function() {
        let chain = ListAdjacency::chain(2);
        let capacity = vec![4, 3];
        let mut value = vec![4, 0];
        let mut widest = Widest {
            maps: PathMaps::values(&mut value),
            capacity: &capacity,
        };
        let mut ift = Ift::new(&chain, 4).unwrap();
        ift.insert_seeds(&[0], &widest).unwrap();
        assert!(matches!(ift.run(&mut widest), Err(IftError::Config(_))));
    }

    #[test]
    fn test_trait_object_dispatch() {
        let chain = ListAdjacency::chain(3);
        let handicap = vec![2, 0, 4];
        let mut sum_value = vec![2, INFINITY, INFINITY];
        let mut max_value = vec![2, INFINITY, INFINITY];
        {
            let mut functions: Vec<Box<dyn PathFunction<'_> + '_>> = vec![
                Box::new(SumPathFunction::new(PathMaps::values(&mut sum_value), &handicap).unwrap()),
                Box::new(MaxPathFunction::new(PathMaps::values(&mut max_value), &handicap).unwrap()),
            ];
            for function in functions.iter_mut() {
                let mut ift = Ift::new(&chain, 4).unwrap();
                ift.insert_seeds(&[0], &**function).unwrap();
                ift.run(&mut **function).unwrap();
            }
        }
        assert_eq!(sum_value, vec![2, 2, 6]);
        assert_eq!(max_value, vec![2, 2, 4]);
    }
}
