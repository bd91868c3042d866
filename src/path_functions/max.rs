// src/path_functions/max.rs - Maximum-handicap path cost, used by the watershed transform

use crate::bucket_queue::BucketState;
use crate::errors::Result;
use crate::path_function::{check_len, PathFunction, PathMaps, PathValue};

/// Path cost is the largest handicap met along the path
#[derive(Debug)]
pub struct MaxPathFunction<'a> {
    maps: PathMaps<'a>,
    handicap: &'a [PathValue],
}

impl<'a> MaxPathFunction<'a> {
    pub fn new(maps: PathMaps<'a>, handicap: &'a [PathValue]) -> Result<Self> {
        check_len("handicap", maps.len(), handicap.len())?;
        Ok(Self { maps, handicap })
    }
}

impl<'a> PathFunction<'a> for MaxPathFunction<'a> {
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
        self.maps.value(node).max(self.handicap[adj])
    }

    fn best_value(&self, node: usize) -> PathValue {
        self.handicap[node]
    }
}
