// src/path_functions/oriented_extern.rs - Oriented arc cost for object/background segmentation

use crate::bucket_queue::BucketState;
use crate::errors::{IftError, Result};
use crate::path_function::{check_len, PathFunction, PathMaps, PathValue};

/// Arc cost on a directed graph that favours object boundaries with a given
/// polarity.
///
/// The arc weight `handicap(u) + handicap(v)` is scaled by `1 + alpha` or
/// `1 - alpha` depending on whether intensity falls or rises from `u` to `v`,
/// with the sign flipped for background trees (label 0). Arcs listed in the
/// optional geodesic restriction map collapse to the minimum cost. Path value
/// is the weight of the last arc.
#[derive(Debug)]
pub struct OrientedExternPathFunction<'a> {
    maps: PathMaps<'a>,
    handicap: &'a [PathValue],
    intensity: &'a [PathValue],
    restriction: Option<&'a [usize]>,
    alpha: f64,
}

impl<'a> OrientedExternPathFunction<'a> {
    pub fn new(
        maps: PathMaps<'a>,
        handicap: &'a [PathValue],
        intensity: &'a [PathValue],
        restriction: Option<&'a [usize]>,
        alpha: f64,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&alpha) {
            return Err(IftError::Config(format!(
                "Orientation alpha must be in [0, 1], got {}",
                alpha
            )));
        }
        if !maps.config().track_label {
            return Err(IftError::Config(
                "Oriented path function requires a label map".to_string(),
            ));
        }
        check_len("handicap", maps.len(), handicap.len())?;
        check_len("intensity", maps.len(), intensity.len())?;
        if let Some(restriction) = restriction {
            check_len("geodesic restriction", maps.len(), restriction.len())?;
        }

        Ok(Self {
            maps,
            handicap,
            intensity,
            restriction,
            alpha,
        })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    fn restricted(&self, node: usize, adj: usize, object: bool) -> bool {
        match self.restriction {
            Some(restriction) if object => restriction[node] == adj,
            Some(restriction) => restriction[adj] == node,
            None => false,
        }
    }
}

impl<'a> PathFunction<'a> for OrientedExternPathFunction<'a> {
    fn maps(&self) -> &PathMaps<'a> {
        &self.maps
    }

    fn maps_mut(&mut self) -> &mut PathMaps<'a> {
        &mut self.maps
    }

    fn remove_simple(&mut self, node: usize, state: BucketState) -> bool {
        if state == BucketState::Inserted {
            self.maps.set_value(node, 0);
        }
        true
    }

    fn candidate(&self, node: usize, adj: usize, _adj_position: usize) -> PathValue {
        let object = self.maps.label(node).is_some_and(|label| label != 0);

        let mut fraction = if self.intensity[node] > self.intensity[adj] {
            self.alpha
        } else if self.intensity[node] < self.intensity[adj] {
            -self.alpha
        } else {
            0.0
        };
        if !object {
            fraction = -fraction;
        }

        let mut arc = self.handicap[node] as f64 + self.handicap[adj] as f64;
        arc = (arc * (1.0 + fraction)).round() + 1.0;
        if self.restricted(node, adj, object) {
            arc = 0.0;
        }
        arc += 1.0;
        arc as PathValue
    }
}
