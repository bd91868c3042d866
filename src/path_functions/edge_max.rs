// src/path_functions/edge_max.rs - Maximum-arc path cost for clustering and region growing

use crate::adjacency::GridShape;
use crate::bucket_queue::BucketState;
use crate::errors::Result;
use crate::path_function::{check_len, PathFunction, PathMaps, PathValue, INFINITY};

/// Path cost is the largest handicap jump between consecutive nodes.
///
/// Roots start at the sum over every axis of the central difference of the
/// handicap around them (out-of-grid samples are replaced by the root's own
/// handicap), or at zero when `force_root` is set so that every seed keeps
/// its own tree.
#[derive(Debug)]
pub struct EdgeMaxPathFunction<'a> {
    maps: PathMaps<'a>,
    handicap: &'a [PathValue],
    shape: &'a GridShape,
    force_root: bool,
}

impl<'a> EdgeMaxPathFunction<'a> {
    pub fn new(
        maps: PathMaps<'a>,
        handicap: &'a [PathValue],
        shape: &'a GridShape,
        force_root: bool,
    ) -> Result<Self> {
        check_len("handicap", maps.len(), handicap.len())?;
        check_len("grid", maps.len(), shape.size())?;
        Ok(Self {
            maps,
            handicap,
            shape,
            force_root,
        })
    }

    /// Sum of absolute central differences of the handicap at `node`
    pub fn local_variation(&self, node: usize) -> PathValue {
        let own = self.handicap[node];
        (0..self.shape.ndims())
            .map(|dim| {
                let before = self
                    .shape
                    .shift(node, dim, -1)
                    .map_or(own, |adj| self.handicap[adj]);
                let after = self
                    .shape
                    .shift(node, dim, 1)
                    .map_or(own, |adj| self.handicap[adj]);
                abs_diff(before, after)
            })
            .fold(0, PathValue::saturating_add)
    }
}

fn abs_diff(a: PathValue, b: PathValue) -> PathValue {
    PathValue::try_from(a.abs_diff(b)).unwrap_or(INFINITY)
}

impl<'a> PathFunction<'a> for EdgeMaxPathFunction<'a> {
    fn maps(&self) -> &PathMaps<'a> {
        &self.maps
    }

    fn maps_mut(&mut self) -> &mut PathMaps<'a> {
        &mut self.maps
    }

    fn remove_simple(&mut self, node: usize, state: BucketState) -> bool {
        if state == BucketState::Inserted {
            let root_value = if self.force_root {
                0
            } else {
                self.local_variation(node)
            };
            self.maps.set_value(node, root_value);
        }
        true
    }

    fn candidate(&self, node: usize, adj: usize, _adj_position: usize) -> PathValue {
        let arc = abs_diff(self.handicap[adj], self.handicap[node]);
        self.maps.value(node).max(arc)
    }
}
