// src/segmentation.rs - Segmentation operators built on the IFT engine

use std::collections::VecDeque;

use log::{debug, info, warn};
use serde::Serialize;

use crate::adjacency::{Adjacency, GridShape, Neighbors};
use crate::bucket_queue::NIL;
use crate::errors::{IftError, Result};
use crate::ift::{Ift, IftStats};
use crate::path_function::{check_len, PathConfig, PathFunction, PathMaps, PathValue, INFINITY};
use crate::path_functions::{
    EdgeMaxPathFunction, MaxPathFunction, OrientedExternPathFunction, SumPathFunction,
};
use crate::seeds::Seed;

/// Maps produced by one segmentation run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forest {
    pub value: Vec<PathValue>,
    pub label: Vec<u32>,
    pub predecessor: Vec<usize>,
    pub stats: IftStats,
}

impl Forest {
    /// Every node unreached: infinite value, label 0, no predecessor
    pub fn unreached(node_count: usize) -> Self {
        Self {
            value: vec![INFINITY; node_count],
            label: vec![0; node_count],
            predecessor: vec![NIL; node_count],
            stats: IftStats::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Nodes some path reached
    pub fn conquered(&self) -> usize {
        self.value.iter().filter(|&&v| v != INFINITY).count()
    }

    /// Root-to-node path through the predecessor map
    pub fn path_to(&self, node: usize) -> Result<Vec<usize>> {
        trace_path(&self.predecessor, node)
    }

    fn run<'a, A, F>(
        adjacency: &A,
        max_weight: usize,
        seeds: &[usize],
        target: Option<usize>,
        function: &mut F,
    ) -> Result<IftStats>
    where
        A: Adjacency + ?Sized,
        F: PathFunction<'a>,
    {
        let mut ift = Ift::new(adjacency, max_weight)?;
        ift.insert_seeds(seeds, function)?;
        ift.stop_at(target);
        ift.run(function)
    }
}

/// Optimum-path forest from live-wire tracing, with the traced boundary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveWire {
    pub forest: Forest,
    /// Seed-to-target path, empty without a target
    pub path: Vec<usize>,
}

fn check_seed_nodes<I>(nodes: I, node_count: usize) -> Result<()>
where
    I: IntoIterator<Item = usize>,
{
    let mut any = false;
    for node in nodes {
        any = true;
        if node >= node_count {
            return Err(IftError::NodeOutOfRange { node, node_count });
        }
    }
    if !any {
        return Err(IftError::Config("Segmentation requires at least one seed".to_string()));
    }
    Ok(())
}

/// Largest value of a map that must hold finite non-negative costs
fn finite_maximum(map: &'static str, values: &[PathValue]) -> Result<PathValue> {
    let mut top = 0;
    for &v in values {
        if v < 0 || v == INFINITY {
            return Err(IftError::Config(format!(
                "{} values must be finite and non-negative, found {}",
                map, v
            )));
        }
        top = top.max(v);
    }
    Ok(top)
}

fn window(map: &'static str, weight: PathValue) -> Result<usize> {
    usize::try_from(weight).map_err(|_| {
        IftError::Config(format!("{} range {} does not fit a bucket queue", map, weight))
    })
}

/// One node per regional minimum: a connected plateau of equal values with
/// no lower neighbour. Each plateau is represented by its smallest index.
pub fn local_minima<A: Adjacency + ?Sized>(values: &[PathValue], adjacency: &A) -> Result<Vec<usize>> {
    check_len("value map", adjacency.node_count(), values.len())?;

    let mut visited = vec![false; values.len()];
    let mut plateau = VecDeque::new();
    let mut minima = Vec::new();
    for start in 0..values.len() {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        plateau.push_back(start);
        let mut lowest = true;
        while let Some(node) = plateau.pop_front() {
            for (_, adj) in Neighbors::new(adjacency, node) {
                if values[adj] < values[node] {
                    lowest = false;
                } else if values[adj] == values[node] && !visited[adj] {
                    visited[adj] = true;
                    plateau.push_back(adj);
                }
            }
        }
        if lowest {
            minima.push(start);
        }
    }
    Ok(minima)
}

/// Seeded watershed transform.
///
/// Each seed grows a tree labelled with its own label under the max-arc path
/// cost over `gradient`. Seeds enter the queue one level above their
/// gradient.
pub fn watershed<A: Adjacency + ?Sized>(
    gradient: &[PathValue],
    adjacency: &A,
    seeds: &[Seed],
) -> Result<Forest> {
    let node_count = adjacency.node_count();
    check_len("gradient", node_count, gradient.len())?;
    check_seed_nodes(seeds.iter().map(|seed| seed.node), node_count)?;
    let top = finite_maximum("gradient", gradient)?;

    let mut forest = Forest::unreached(node_count);
    for seed in seeds {
        forest.value[seed.node] = gradient[seed.node] + 1;
        forest.label[seed.node] = seed.label;
    }
    let nodes: Vec<usize> = seeds.iter().map(|seed| seed.node).collect();

    let stats = {
        let maps = PathMaps::new(
            &mut forest.value,
            Some(&mut forest.label),
            Some(&mut forest.predecessor),
            PathConfig::complete(false),
        )?;
        let mut max = MaxPathFunction::new(maps, gradient)?;
        Forest::run(adjacency, window("gradient", top + 1)?, &nodes, None, &mut max)?
    };
    forest.stats = stats;

    info!(
        "Watershed: {} seeds, {} of {} nodes conquered",
        seeds.len(),
        forest.conquered(),
        node_count
    );
    Ok(forest)
}

/// Watershed seeded at every regional minimum of `gradient`.
///
/// Every node enters the queue one level above the best value it can reach;
/// the nodes still unconquered when they leave become roots, one per minimum
/// plateau. Regions are labelled 1, 2, ... in the order their roots leave.
pub fn watershed_from_minima<A: Adjacency + ?Sized>(
    gradient: &[PathValue],
    adjacency: &A,
) -> Result<Forest> {
    let node_count = adjacency.node_count();
    check_len("gradient", node_count, gradient.len())?;
    let top = finite_maximum("gradient", gradient)?;

    let mut forest = Forest::unreached(node_count);
    let nodes: Vec<usize> = (0..node_count).collect();
    let stats = {
        let maps = PathMaps::new(
            &mut forest.value,
            Some(&mut forest.label),
            Some(&mut forest.predecessor),
            PathConfig::complete(true),
        )?;
        let mut max = MaxPathFunction::new(maps, gradient)?;
        for &node in &nodes {
            let raised = max.best_value(node) + 1;
            max.maps_mut().set_value(node, raised);
        }
        Forest::run(adjacency, window("gradient", top + 1)?, &nodes, None, &mut max)?
    };
    forest.stats = stats;

    // label 0 stays reserved for unreached nodes
    for label in forest.label.iter_mut() {
        *label += 1;
    }
    debug!("Found {} regional minima", forest.stats.roots);
    Ok(forest)
}

/// Live-wire boundary tracing.
///
/// `cost` is low along the boundaries to follow (a complemented gradient,
/// typically). Paths accumulate `cost + 1` per node; the run stops as soon as
/// `target` is final and the optimum path to it is traced back.
pub fn live_wire<A: Adjacency + ?Sized>(
    cost: &[PathValue],
    adjacency: &A,
    seeds: &[usize],
    target: Option<usize>,
) -> Result<LiveWire> {
    let node_count = adjacency.node_count();
    check_len("cost", node_count, cost.len())?;
    check_seed_nodes(seeds.iter().copied(), node_count)?;
    if let Some(target) = target {
        if target >= node_count {
            return Err(IftError::NodeOutOfRange { node: target, node_count });
        }
    }
    let top = finite_maximum("cost", cost)?;
    let handicap: Vec<PathValue> = cost.iter().map(|&c| c + 1).collect();

    let mut forest = Forest::unreached(node_count);
    for &seed in seeds {
        forest.value[seed] = handicap[seed];
    }

    let stats = {
        let maps = PathMaps::new(
            &mut forest.value,
            Some(&mut forest.label),
            Some(&mut forest.predecessor),
            PathConfig::complete(true),
        )?;
        let mut sum = SumPathFunction::new(maps, &handicap)?;
        Forest::run(adjacency, window("cost", top + 1)?, seeds, target, &mut sum)?
    };
    forest.stats = stats;

    let path = match target {
        Some(target) => forest.path_to(target)?,
        None => Vec::new(),
    };
    if target.is_some() && path.is_empty() {
        warn!("Live-wire target is not connected to any seed");
    }
    debug!("Live-wire path of {} nodes", path.len());

    Ok(LiveWire { forest, path })
}

/// Region growing under the largest-jump path cost.
///
/// Every seed starts its own region, labelled in the order roots leave the
/// queue starting at 0.
pub fn edge_max_regions<A: Adjacency + ?Sized>(
    handicap: &[PathValue],
    shape: &GridShape,
    adjacency: &A,
    seeds: &[usize],
    force_root: bool,
) -> Result<Forest> {
    let node_count = adjacency.node_count();
    check_len("grid", node_count, shape.size())?;
    check_len("handicap", node_count, handicap.len())?;
    check_seed_nodes(seeds.iter().copied(), node_count)?;

    let top = finite_maximum("handicap", handicap)?;
    let bottom = handicap.iter().copied().min().unwrap_or(0);
    let spread = (top - bottom)
        .checked_mul(shape.ndims() as PathValue)
        .ok_or_else(|| IftError::Config("Handicap range overflows the path value".to_string()))?;

    let mut forest = Forest::unreached(node_count);
    for &seed in seeds {
        forest.value[seed] = 0;
    }

    let stats = {
        let maps = PathMaps::new(
            &mut forest.value,
            Some(&mut forest.label),
            Some(&mut forest.predecessor),
            PathConfig::complete(true),
        )?;
        let mut edge = EdgeMaxPathFunction::new(maps, handicap, shape, force_root)?;
        Forest::run(adjacency, window("handicap", spread)?, seeds, None, &mut edge)?
    };
    forest.stats = stats;

    info!("Edge-max regions: {} regions", forest.stats.roots);
    Ok(forest)
}

/// Object/background segmentation under the oriented arc cost.
///
/// Seeds labelled 0 grow background trees; any other label is object.
pub fn oriented_watershed<A: Adjacency + ?Sized>(
    handicap: &[PathValue],
    intensity: &[PathValue],
    adjacency: &A,
    seeds: &[Seed],
    alpha: f64,
    restriction: Option<&[usize]>,
) -> Result<Forest> {
    let node_count = adjacency.node_count();
    check_len("handicap", node_count, handicap.len())?;
    check_seed_nodes(seeds.iter().map(|seed| seed.node), node_count)?;
    if !seeds.iter().any(|seed| seed.label == 0) || seeds.iter().all(|seed| seed.label == 0) {
        warn!("Oriented watershed seeded without both object and background seeds");
    }

    let top = finite_maximum("handicap", handicap)?;
    // largest arc: 2 * top scaled by 1 + alpha, rounded, plus both offsets
    let largest_arc = (2.0 * top as f64 * (1.0 + alpha.clamp(0.0, 1.0))).round() + 2.0;
    if largest_arc >= INFINITY as f64 {
        return Err(IftError::Config("Handicap range overflows the path value".to_string()));
    }

    let mut forest = Forest::unreached(node_count);
    for seed in seeds {
        forest.value[seed.node] = 0;
        forest.label[seed.node] = seed.label;
    }
    let nodes: Vec<usize> = seeds.iter().map(|seed| seed.node).collect();

    let stats = {
        let maps = PathMaps::new(
            &mut forest.value,
            Some(&mut forest.label),
            Some(&mut forest.predecessor),
            PathConfig::complete(false),
        )?;
        let mut oriented =
            OrientedExternPathFunction::new(maps, handicap, intensity, restriction, alpha)?;
        Forest::run(
            adjacency,
            window("handicap", largest_arc as PathValue)?,
            &nodes,
            None,
            &mut oriented,
        )?
    };
    forest.stats = stats;

    let object = forest.label.iter().filter(|&&label| label != 0).count();
    info!("Oriented watershed: {} object nodes of {}", object, node_count);
    Ok(forest)
}

/// Walk the predecessor map from `node` back to its root.
///
/// Returns the path root first, or an empty path when `node` was never
/// reached.
pub fn trace_path(predecessor: &[usize], node: usize) -> Result<Vec<usize>> {
    let node_count = predecessor.len();
    if node >= node_count {
        return Err(IftError::NodeOutOfRange { node, node_count });
    }
    if predecessor[node] == NIL {
        return Ok(Vec::new());
    }

    let mut path = vec![node];
    let mut current = node;
    loop {
        let pred = predecessor[current];
        if pred == current {
            break;
        }
        if pred >= node_count {
            return Err(IftError::NodeOutOfRange { node: pred, node_count });
        }
        if path.len() == node_count {
            return Err(IftError::PredecessorCycle { node: current });
        }
        path.push(pred);
        current = pred;
    }
    path.reverse();
    Ok(path)
}
