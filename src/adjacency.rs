// src/adjacency.rs - Neighbourhood enumeration over grids and explicit graphs

use crate::errors::{IftError, Result};

/// Dimensions of an N-D grid stored in a flat array, first axis fastest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridShape {
    dims: Vec<usize>,
    strides: Vec<usize>,
}

impl GridShape {
    pub fn new(dims: &[usize]) -> Result<Self> {
        if dims.is_empty() || dims.iter().any(|&d| d == 0) {
            return Err(IftError::Config(format!("Invalid grid dimensions {:?}", dims)));
        }

        let mut strides = Vec::with_capacity(dims.len());
        let mut stride = 1usize;
        for &dim in dims {
            strides.push(stride);
            stride = stride
                .checked_mul(dim)
                .ok_or_else(|| IftError::Config(format!("Grid {:?} is too large", dims)))?;
        }

        Ok(Self {
            dims: dims.to_vec(),
            strides,
        })
    }

    /// 2-D grid of `width` columns and `height` rows
    pub fn planar(width: usize, height: usize) -> Result<Self> {
        Self::new(&[width, height])
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn ndims(&self) -> usize {
        self.dims.len()
    }

    /// Total number of grid nodes
    pub fn size(&self) -> usize {
        self.dims.iter().product()
    }

    #[inline]
    pub fn coordinate(&self, index: usize, dim: usize) -> usize {
        (index / self.strides[dim]) % self.dims[dim]
    }

    pub fn coordinates(&self, index: usize) -> Vec<usize> {
        (0..self.ndims()).map(|dim| self.coordinate(index, dim)).collect()
    }

    /// Flat index of `coords`, or `None` when they fall outside the grid
    pub fn index(&self, coords: &[usize]) -> Option<usize> {
        if coords.len() != self.ndims() {
            return None;
        }
        let mut index = 0;
        for ((&c, &dim), &stride) in coords.iter().zip(&self.dims).zip(&self.strides) {
            if c >= dim {
                return None;
            }
            index += c * stride;
        }
        Some(index)
    }

    /// Neighbour of `index` shifted by `delta` along `dim`
    pub fn shift(&self, index: usize, dim: usize, delta: isize) -> Option<usize> {
        let c = self.coordinate(index, dim);
        let shifted = c.checked_add_signed(delta)?;
        if shifted >= self.dims[dim] {
            return None;
        }
        Some(index - c * self.strides[dim] + shifted * self.strides[dim])
    }
}

/// Neighbourhood relation consumed by the IFT orchestrator.
///
/// Each node has `positions()` adjacency slots; a slot yields `None` when the
/// neighbour falls outside the domain.
pub trait Adjacency {
    fn node_count(&self) -> usize;

    fn positions(&self) -> usize;

    fn neighbor(&self, node: usize, position: usize) -> Option<usize>;

    fn neighbors(&self, node: usize) -> Neighbors<'_, Self>
    where
        Self: Sized,
    {
        Neighbors::new(self, node)
    }
}

/// Lazy `(position, neighbour)` iterator over one node's adjacency
#[derive(Debug, Clone)]
pub struct Neighbors<'g, A: ?Sized> {
    adjacency: &'g A,
    node: usize,
    position: usize,
    positions: usize,
}

impl<'g, A: Adjacency + ?Sized> Neighbors<'g, A> {
    pub fn new(adjacency: &'g A, node: usize) -> Self {
        Self {
            adjacency,
            node,
            position: 0,
            positions: adjacency.positions(),
        }
    }
}

impl<'g, A: Adjacency + ?Sized> Iterator for Neighbors<'g, A> {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        while self.position < self.positions {
            let position = self.position;
            self.position += 1;
            if let Some(adj) = self.adjacency.neighbor(self.node, position) {
                return Some((position, adj));
            }
        }
        None
    }
}

/// Largest euclidean radius [`GridAdjacency::hyperspheric`] accepts
pub const MAX_RADIUS: f64 = 32.0;

/// Offsets within a euclidean radius on an N-D grid
#[derive(Debug, Clone)]
pub struct GridAdjacency {
    shape: GridShape,
    offsets: Vec<Vec<isize>>,
}

impl GridAdjacency {
    /// Every offset with 0 < |offset| <= `radius`, nearest first.
    /// A radius of 1 gives 4-neighbourhood in 2-D, 1.5 gives 8-neighbourhood.
    pub fn hyperspheric(shape: GridShape, radius: f64) -> Result<Self> {
        if !(1.0..=MAX_RADIUS).contains(&radius) {
            return Err(IftError::Config(format!(
                "Adjacency radius must be between 1.0 and {}, got {}",
                MAX_RADIUS, radius
            )));
        }

        let reach = radius.floor() as isize;
        let limit = radius * radius;
        let ndims = shape.ndims();
        let mut offsets = Vec::new();
        let mut offset = vec![-reach; ndims];
        loop {
            let norm: isize = offset.iter().map(|o| o * o).sum();
            if norm > 0 && (norm as f64) <= limit {
                offsets.push(offset.clone());
            }

            let mut dim = 0;
            while dim < ndims {
                if offset[dim] < reach {
                    offset[dim] += 1;
                    break;
                }
                offset[dim] = -reach;
                dim += 1;
            }
            if dim == ndims {
                break;
            }
        }

        offsets.sort_by(|a, b| {
            let na: isize = a.iter().map(|o| o * o).sum();
            let nb: isize = b.iter().map(|o| o * o).sum();
            na.cmp(&nb).then_with(|| a.iter().rev().cmp(b.iter().rev()))
        });

        Ok(Self { shape, offsets })
    }

    pub fn shape(&self) -> &GridShape {
        &self.shape
    }

    pub fn offsets(&self) -> &[Vec<isize>] {
        &self.offsets
    }
}

impl Adjacency for GridAdjacency {
    fn node_count(&self) -> usize {
        self.shape.size()
    }

    fn positions(&self) -> usize {
        self.offsets.len()
    }

    fn neighbor(&self, node: usize, position: usize) -> Option<usize> {
        let offset = &self.offsets[position];
        let mut adj = node;
        for (dim, &delta) in offset.iter().enumerate() {
            if delta != 0 {
                adj = self.shape.shift(adj, dim, delta)?;
            }
        }
        Some(adj)
    }
}

/// Every node is adjacent to every other node
#[derive(Debug, Clone, Copy)]
pub struct CompleteAdjacency {
    node_count: usize,
}

impl CompleteAdjacency {
    pub fn new(node_count: usize) -> Self {
        Self { node_count }
    }
}

impl Adjacency for CompleteAdjacency {
    fn node_count(&self) -> usize {
        self.node_count
    }

    fn positions(&self) -> usize {
        self.node_count
    }

    fn neighbor(&self, node: usize, position: usize) -> Option<usize> {
        (position != node && position < self.node_count).then_some(position)
    }
}

/// Explicit neighbour lists for arbitrary graphs
#[derive(Debug, Clone, Default)]
pub struct ListAdjacency {
    lists: Vec<Vec<usize>>,
    positions: usize,
}

impl ListAdjacency {
    pub fn new(lists: Vec<Vec<usize>>) -> Result<Self> {
        let node_count = lists.len();
        for &adj in lists.iter().flatten() {
            if adj >= node_count {
                return Err(IftError::NodeOutOfRange { node: adj, node_count });
            }
        }
        let positions = lists.iter().map(Vec::len).max().unwrap_or(0);
        Ok(Self { lists, positions })
    }

    /// Undirected graph from an edge list; neighbours keep edge order
    pub fn from_edges(node_count: usize, edges: &[(usize, usize)]) -> Result<Self> {
        let mut lists = vec![Vec::new(); node_count];
        for &(a, b) in edges {
            if a >= node_count || b >= node_count {
                return Err(IftError::NodeOutOfRange {
                    node: a.max(b),
                    node_count,
                });
            }
            lists[a].push(b);
            lists[b].push(a);
        }
        Self::new(lists)
    }

    /// Path graph 0 - 1 - ... - (n - 1)
    pub fn chain(node_count: usize) -> Self {
        let lists = (0..node_count)
            .map(|node| {
                let mut adj = Vec::with_capacity(2);
                if node > 0 {
                    adj.push(node - 1);
                }
                if node + 1 < node_count {
                    adj.push(node + 1);
                }
                adj
            })
            .collect();
        Self {
            lists,
            positions: if node_count > 1 { 2 } else { 0 },
        }
    }
}

impl Adjacency for ListAdjacency {
    fn node_count(&self) -> usize {
        self.lists.len()
    }

    fn positions(&self) -> usize {
        self.positions
    }

    fn neighbor(&self, node: usize, position: usize) -> Option<usize> {
        self.lists[node].get(position).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_coordinates_round_trip() {
        let shape = GridShape::new(&[4, 3, 2]).unwrap();
        assert_eq!(shape.size(), 24);
        assert_eq!(shape.coordinates(0), vec![0, 0, 0]);
        assert_eq!(shape.coordinates(5), vec![1, 1, 0]);
        assert_eq!(shape.coordinates(23), vec![3, 2, 1]);
        assert_eq!(shape.index(&[3, 2, 1]), Some(23));
        assert_eq!(shape.index(&[4, 0, 0]), None);
        assert_eq!(shape.index(&[1, 1]), None);
    }

    #[test]
    fn test_grid_shift_respects_bounds() {
        let shape = GridShape::planar(3, 3).unwrap();
        assert_eq!(shape.shift(4, 0, 1), Some(5));
        assert_eq!(shape.shift(4, 1, -1), Some(1));
        assert_eq!(shape.shift(2, 0, 1), None);
        assert_eq!(shape.shift(0, 1, -1), None);
    }

    #[test]
    fn test_invalid_shapes() {
        assert!(GridShape::new(&[]).is_err());
        assert!(GridShape::new(&[3, 0]).is_err());
    }

    #[test]
    fn test_four_and_eight_neighbourhoods() {
        let shape = GridShape::planar(5, 5).unwrap();
        let four = GridAdjacency::hyperspheric(shape.clone(), 1.0).unwrap();
        assert_eq!(four.positions(), 4);
        let eight = GridAdjacency::hyperspheric(shape, 1.5).unwrap();
        assert_eq!(eight.positions(), 8);

        // Axis neighbours precede diagonals
        assert!(eight.offsets()[..4]
            .iter()
            .all(|o| o.iter().map(|v| v.abs()).sum::<isize>() == 1));

        let center = 12;
        let mut adj: Vec<usize> = eight.neighbors(center).map(|(_, a)| a).collect();
        adj.sort_unstable();
        assert_eq!(adj, vec![6, 7, 8, 11, 13, 16, 17, 18]);
    }

    #[test]
    fn test_corner_neighbours_are_clipped() {
        let shape = GridShape::planar(3, 2).unwrap();
        let eight = GridAdjacency::hyperspheric(shape, 1.5).unwrap();
        let mut adj: Vec<usize> = eight.neighbors(0).map(|(_, a)| a).collect();
        adj.sort_unstable();
        assert_eq!(adj, vec![1, 3, 4]);
    }

    #[test]
    fn test_neighbors_report_positions_and_restart() {
        let chain = ListAdjacency::chain(3);
        let first: Vec<(usize, usize)> = chain.neighbors(1).collect();
        assert_eq!(first, vec![(0, 0), (1, 2)]);
        let again: Vec<(usize, usize)> = chain.neighbors(1).collect();
        assert_eq!(first, again);
        assert_eq!(chain.neighbors(0).collect::<Vec<_>>(), vec![(0, 1)]);
    }

    #[test]
    fn test_radius_outside_bounds_is_rejected() {
        let shape = GridShape::planar(2, 2).unwrap();
        assert!(matches!(
            GridAdjacency::hyperspheric(shape.clone(), 0.5),
            Err(IftError::Config(_))
        ));
        assert!(matches!(
            GridAdjacency::hyperspheric(shape.clone(), f64::INFINITY),
            Err(IftError::Config(_))
        ));
        assert!(matches!(
            GridAdjacency::hyperspheric(shape, f64::NAN),
            Err(IftError::Config(_))
        ));
    }

    #[test]
    fn test_complete_adjacency_skips_self() {
        let complete = CompleteAdjacency::new(4);
        let adj: Vec<usize> = complete.neighbors(2).map(|(_, a)| a).collect();
        assert_eq!(adj, vec![0, 1, 3]);
    }

    #[test]
    fn test_list_adjacency_validation() {
        assert!(matches!(
            ListAdjacency::new(vec![vec![1], vec![5]]),
            Err(IftError::NodeOutOfRange { node: 5, node_count: 2 })
        ));
        let graph = ListAdjacency::from_edges(3, &[(0, 2), (2, 1)]).unwrap();
        assert_eq!(graph.neighbors(2).map(|(_, a)| a).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(graph.positions(), 2);
    }
}
