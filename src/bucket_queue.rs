// src/bucket_queue.rs - Integer bucket queue used by the IFT orchestrator

use log::{debug, trace};

use crate::errors::{IftError, Result};

/// Sentinel for "no node" in intrusive links and predecessor maps
pub const NIL: usize = usize::MAX;

/// Life cycle of a node inside one queue run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BucketState {
    #[default]
    NotVisited,
    Inserted,
    Updated,
    Removed,
}

impl BucketState {
    /// True while the node holds an entry in some bucket
    pub fn is_queued(self) -> bool {
        matches!(self, BucketState::Inserted | BucketState::Updated)
    }
}

#[derive(Debug, Clone, Copy)]
struct IdentityNode {
    prev: usize,
    next: usize,
    state: BucketState,
}

impl Default for IdentityNode {
    fn default() -> Self {
        Self {
            prev: NIL,
            next: NIL,
            state: BucketState::NotVisited,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    first: usize,
    last: usize,
}

impl Default for Bucket {
    fn default() -> Self {
        Self { first: NIL, last: NIL }
    }
}

/// Bucket-sort priority queue over a fixed set of node identities.
///
/// Every node owns one link record; each integer weight owns one list
/// threaded through those records. Extraction walks a cursor over empty
/// buckets (upwards from the minimum for increasing queues, downwards from
/// the maximum otherwise), so a run whose extracted weights move one way
/// costs O(1) amortized per operation. Ties leave in insertion order when
/// `fifo` is set and in reverse insertion order otherwise.
///
/// Weights index buckets modulo `max_weight + 1`: `max_weight` bounds the
/// spread between the smallest and largest weight queued at the same time.
/// Runs whose weights all fall in `0..=max_weight` never wrap.
#[derive(Debug, Clone)]
pub struct BucketQueue {
    identity: Vec<IdentityNode>,
    buckets: Vec<Bucket>,
    minimum: usize,
    maximum: usize,
    elements: usize,
    increasing: bool,
    fifo: bool,
}

impl BucketQueue {
    /// Create a minimum-first FIFO queue for `node_count` identities and
    /// weights `0..=max_weight`
    pub fn new(node_count: usize, max_weight: usize) -> Result<Self> {
        Self::with_order(node_count, max_weight, true, true)
    }

    /// Like [`new`](Self::new), choosing the extraction order: minimum first
    /// when `increasing`, maximum first otherwise; `fifo` breaks ties by
    /// insertion order, LIFO otherwise
    pub fn with_order(
        node_count: usize,
        max_weight: usize,
        increasing: bool,
        fifo: bool,
    ) -> Result<Self> {
        let bucket_count = max_weight.checked_add(1).ok_or(IftError::Allocation {
            what: "buckets",
            count: max_weight,
        })?;

        let mut identity = Vec::new();
        identity
            .try_reserve_exact(node_count)
            .map_err(|_| IftError::Allocation {
                what: "identity nodes",
                count: node_count,
            })?;
        identity.resize(node_count, IdentityNode::default());

        let mut buckets = Vec::new();
        buckets
            .try_reserve_exact(bucket_count)
            .map_err(|_| IftError::Allocation {
                what: "buckets",
                count: bucket_count,
            })?;
        buckets.resize(bucket_count, Bucket::default());

        debug!(
            "Created {} bucket queue with {} nodes and {} buckets",
            if increasing { "increasing" } else { "decreasing" },
            node_count,
            bucket_count
        );

        Ok(Self {
            identity,
            buckets,
            minimum: 0,
            maximum: 0,
            elements: 0,
            increasing,
            fifo,
        })
    }

    #[inline]
    fn index(&self, weight: usize) -> usize {
        weight % self.buckets.len()
    }

    fn check_node(&self, node: usize) -> Result<()> {
        if node >= self.identity.len() {
            return Err(IftError::NodeOutOfRange {
                node,
                node_count: self.identity.len(),
            });
        }
        Ok(())
    }

    /// Largest weight spread the queue can hold
    pub fn max_weight(&self) -> usize {
        self.buckets.len() - 1
    }

    /// Append `node` to the tail of the bucket for `weight`
    pub fn insert(&mut self, node: usize, weight: usize) -> Result<()> {
        self.check_node(node)?;
        if self.identity[node].state.is_queued() {
            return Err(IftError::DoubleInsertion { node, weight });
        }

        if self.elements == 0 {
            self.minimum = weight;
            self.maximum = weight;
        } else {
            let new_min = self.minimum.min(weight);
            let new_max = self.maximum.max(weight);
            if new_max - new_min > self.max_weight() {
                return Err(IftError::WeightOutOfRange {
                    node,
                    weight: i64::try_from(weight).unwrap_or(i64::MAX),
                    max_weight: self.max_weight(),
                });
            }
            self.minimum = new_min;
            self.maximum = new_max;
        }

        let idx = self.index(weight);
        let Bucket { first, last } = self.buckets[idx];
        let (prev, next) = if self.fifo {
            if last == NIL {
                self.buckets[idx].first = node;
            } else {
                self.identity[last].next = node;
            }
            self.buckets[idx].last = node;
            (last, NIL)
        } else {
            if first == NIL {
                self.buckets[idx].last = node;
            } else {
                self.identity[first].prev = node;
            }
            self.buckets[idx].first = node;
            (NIL, first)
        };
        self.identity[node] = IdentityNode {
            prev,
            next,
            state: BucketState::Inserted,
        };
        self.elements += 1;

        trace!("Inserted node {} with weight {} ({} queued)", node, weight, self.elements);
        Ok(())
    }

    /// Remove and return the head of the lowest non-empty bucket (highest
    /// for decreasing queues).
    ///
    /// The node keeps its state so the caller can tell roots (`Inserted`)
    /// from conquered nodes (`Updated`) before calling [`finished`](Self::finished).
    pub fn remove(&mut self) -> Result<usize> {
        if self.elements == 0 {
            return Err(IftError::QueueUnderflow);
        }

        let idx = if self.increasing {
            let mut idx = self.index(self.minimum);
            while self.buckets[idx].first == NIL {
                self.minimum += 1;
                idx = self.index(self.minimum);
            }
            idx
        } else {
            let mut idx = self.index(self.maximum);
            while self.buckets[idx].first == NIL {
                self.maximum -= 1;
                idx = self.index(self.maximum);
            }
            idx
        };

        let node = self.buckets[idx].first;
        let next = self.identity[node].next;
        self.buckets[idx].first = next;
        if next == NIL {
            self.buckets[idx].last = NIL;
        } else {
            self.identity[next].prev = NIL;
        }
        self.identity[node].next = NIL;
        self.elements -= 1;

        trace!("Removed node {} at weight {}", node, self.cursor());
        Ok(node)
    }

    /// Unlink `node` from the bucket of `weight` in O(1)
    pub fn remove_at(&mut self, node: usize, weight: usize) -> Result<()> {
        self.check_node(node)?;
        let IdentityNode { prev, next, state } = self.identity[node];
        if !state.is_queued() {
            return Err(IftError::InvalidState {
                node,
                operation: "remove_at",
                state,
            });
        }

        let idx = self.index(weight);
        let bucket = self.buckets[idx];
        if (prev == NIL && bucket.first != node) || (next == NIL && bucket.last != node) {
            return Err(IftError::NodeNotInBucket { node, weight });
        }

        if prev == NIL {
            self.buckets[idx].first = next;
        } else {
            self.identity[prev].next = next;
        }
        if next == NIL {
            self.buckets[idx].last = prev;
        } else {
            self.identity[next].prev = prev;
        }

        self.identity[node] = IdentityNode {
            prev: NIL,
            next: NIL,
            state: BucketState::Removed,
        };
        self.elements -= 1;
        Ok(())
    }

    /// Move `node` from `old_weight` to `new_weight`, or insert it when it is not queued.
    /// The node ends in state `Updated` either way.
    pub fn update(&mut self, node: usize, old_weight: usize, new_weight: usize) -> Result<()> {
        self.check_node(node)?;
        let state = self.identity[node].state;
        match state {
            BucketState::Removed => {
                return Err(IftError::InvalidState {
                    node,
                    operation: "update",
                    state,
                })
            }
            BucketState::Inserted | BucketState::Updated => {
                trace!("Updating node {} from {} to {}", node, old_weight, new_weight);
                self.remove_at(node, old_weight)?;
            }
            BucketState::NotVisited => {}
        }

        self.insert(node, new_weight)?;
        self.identity[node].state = BucketState::Updated;
        Ok(())
    }

    /// Freeze `node`: it will never be revisited in this run
    pub fn finished(&mut self, node: usize) {
        self.identity[node].state = BucketState::Removed;
    }

    pub fn is_empty(&self) -> bool {
        self.elements == 0
    }

    /// Number of queued nodes
    pub fn elements(&self) -> usize {
        self.elements
    }

    /// # Panics
    /// When `node` is outside the queue's identity range.
    pub fn state(&self, node: usize) -> BucketState {
        self.identity[node].state
    }

    /// Number of buckets
    pub fn buckets(&self) -> usize {
        self.buckets.len()
    }

    /// Number of identities the queue was built for
    pub fn node_count(&self) -> usize {
        self.identity.len()
    }

    /// Current position of the minimum cursor
    pub fn minimum(&self) -> usize {
        self.minimum
    }

    /// Current position of the maximum cursor
    pub fn maximum(&self) -> usize {
        self.maximum
    }

    /// Whether the smallest weight leaves first
    pub fn increasing(&self) -> bool {
        self.increasing
    }

    pub fn fifo(&self) -> bool {
        self.fifo
    }

    /// Weight of the bucket extraction resumes from
    pub fn cursor(&self) -> usize {
        if self.increasing {
            self.minimum
        } else {
            self.maximum
        }
    }

    /// Nodes currently linked in the bucket of `weight`, head first
    pub fn bucket_nodes(&self, weight: usize) -> Vec<usize> {
        let mut nodes = Vec::new();
        let mut node = self.buckets[self.index(weight)].first;
        while node != NIL {
            nodes.push(node);
            node = self.identity[node].next;
        }
        nodes
    }

    /// Return every node to `NotVisited`, empty all buckets and rewind the cursor
    pub fn reset(&mut self) {
        self.identity.fill(IdentityNode::default());
        self.buckets.fill(Bucket::default());
        self.elements = 0;
        self.minimum = 0;
        self.maximum = 0;
    }

    /// Rewind the extraction cursor as far as the window allows.
    ///
    /// Every queued weight lies in `minimum..=maximum`, a span no wider than
    /// `max_weight`, so the cursor moves to the far end of the window that
    /// still ends at the opposite bound. For an increasing queue whose
    /// weights never exceeded `max_weight` that is weight zero.
    pub fn reset_minimum(&mut self) {
        if self.elements == 0 {
            self.minimum = 0;
            self.maximum = 0;
        } else if self.increasing {
            self.minimum = self.maximum.saturating_sub(self.max_weight());
        } else {
            self.maximum = self.minimum.saturating_add(self.max_weight());
        }
    }
}
