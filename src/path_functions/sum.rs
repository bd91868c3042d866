// src/path_functions/sum.rs - Additive path cost, used by live-wire

use crate::bucket_queue::BucketState;
use crate::errors::Result;
use crate::path_function::{check_len, PathFunction, PathMaps, PathValue};

/// Path cost is the sum of the handicaps of every node on the path
#[derive(Debug)]
pub struct SumPathFunction<'a> {
    maps: PathMaps<'a>,
    handicap: &'a [PathValue],
}

impl<'a> SumPathFunction<'a> {
    pub fn new(maps: PathMaps<'a>, handicap: &'a [PathValue]) -> Result<Self> {
        check_len("handicap", maps.len(), handicap.len())?;
        Ok(Self { maps, handicap })
    }
}

impl<'a> PathFunction<'a> for SumPathFunction<'a> {
    fn maps(&self) -> &PathMaps<'a> {
        &self.maps
    }

    fn maps_mut(&mut self) -> &mut PathMaps<'a> {
        &mut self.maps
    }

    fn remove_simple(&mut self, node: usize, state: BucketState) -> bool {
        if state == BucketState::Inserted {
            self.maps.set_value(node, self.handicap[node]);
        }
        true
    }

    fn candidate(&self, node: usize, adj: usize, _adj_position: usize) -> PathValue {
        self.maps.value(node).saturating_add(self.handicap[adj])
    }

    fn best_value(&self, node: usize) -> PathValue {
        self.handicap[node]
    }
}
