/* Binary space partitioning tree for radius queries over point sets.
Copyright (C) 2023  Alexander Pyattaev

This program is free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation, either version 3 of the License, or
(at your option) any later version.

This program is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

//! Contains the tree struct, which holds the element arena and handles
//! insertion and leaf splitting.

use crate::tuple::Tuple;
use arrayvec::ArrayVec;
use slab::Slab;
use std::fmt;

/// How many tuples a leaf buckets up before it is split into a node.
pub const LEAF_COUNT_MAX: usize = 16;

/// Soft cap on tree depth. Going past it is logged, never fatal: insertion
/// proceeds, but sphere iterators allocated before the growth may have
/// undersized stacks.
pub const MAX_TREE_DEPTH: usize = 100;

/// Type for relative pointers to elements in the arena. Kept 32bit for cache
/// locality during lookups. Should you need > 4 billion elements in the tree
/// do let me know who sells you the RAM.
pub type ElemPtr = u32;

/// The root element always sits at slot 0 of the arena.
pub(crate) const ROOT_ELEMENT: ElemPtr = 0;

/// A bucket of up to [`LEAF_COUNT_MAX`] record references.
#[derive(Debug)]
pub struct LeafData<'a, T: Tuple> {
    pub tuples: ArrayVec<&'a T, LEAF_COUNT_MAX>,
}

impl<'a, T: Tuple> Default for LeafData<'a, T> {
    fn default() -> Self {
        Self {
            tuples: ArrayVec::new(),
        }
    }
}

impl<'a, T: Tuple> LeafData<'a, T> {
    /// Selection sort on coordinate `dim`, smallest value first. The bucket
    /// is at most [`LEAF_COUNT_MAX`] long, so the quadratic cost is a
    /// constant and not worth a comparator-based sort.
    fn sort(&mut self, dim: usize) {
        for i in (1..self.tuples.len()).rev() {
            let mut champion = self.tuples[i].value_at(dim);
            for j in (0..i).rev() {
                let challenger = self.tuples[j].value_at(dim);
                if challenger > champion {
                    self.tuples.swap(i, j);
                    champion = challenger;
                }
            }
        }
    }
}

/// A binary split along one coordinate axis.
///
/// `dim` and `split_value` never change once the node exists. `left` holds
/// values `<= split_value`, `right` holds values `>= split_value`; ties go to
/// whichever side is lighter at insertion time.
#[derive(Debug, Clone, Copy)]
pub struct NodeData {
    pub dim: u8,
    pub split_value: f32,
    pub left: ElemPtr,
    pub right: ElemPtr,
    /// total number of tuples under this node
    pub count: u32,
}

/// One slot of the element arena.
#[derive(Debug)]
pub enum Element<'a, T: Tuple> {
    Leaf(LeafData<'a, T>),
    Node(NodeData),
}

impl<'a, T: Tuple> Default for Element<'a, T> {
    fn default() -> Self {
        Element::Leaf(LeafData::default())
    }
}

/// The tree itself. `N` is the dimensionality of the indexed space; split
/// axes cycle through `0..N` as depth increases.
///
/// Records are inserted one at a time by reference and never move again.
/// There is no removal and no rebalancing, which keeps every split
/// immutable once made and the depth watermark monotonic.
///
/// Internals are partially based on:
///  * https://stackoverflow.com/questions/41946007/efficient-and-well-explained-implementation-of-a-quadtree-for-2d-collision-det
#[derive(Debug)]
pub struct Bspt<'a, const N: usize, T: Tuple> {
    /// All elements of the tree. Child links are arena indices, so a leaf
    /// splitting into a node is a single slot overwrite.
    pub(crate) elements: Slab<Element<'a, T>>,

    /// Deepest leaf level seen so far (a leaf's level is its number of
    /// ancestor nodes). Never decreases; sizes iterator traversal stacks.
    pub(crate) tree_depth: usize,
}

impl<'a, const N: usize, T: Tuple> Bspt<'a, N, T> {
    /// creates a new, empty tree
    pub fn new() -> Self {
        Self::with_capacity(1)
    }

    /// create a tree with preallocated arena space for roughly
    /// `expected_tuples` records
    pub fn with_capacity(expected_tuples: usize) -> Self {
        // a split turns one full leaf into two half-full ones, so the steady
        // state is about 2 elements per LEAF_COUNT_MAX tuples
        let mut elements = Slab::with_capacity(1 + 2 * expected_tuples / LEAF_COUNT_MAX);
        // create the root leaf right away, no point having a tree without a root.
        let r = elements.insert(Element::default());
        // Slab always returns 0 for the first inserted element, right? Better check...
        debug_assert_eq!(r as ElemPtr, ROOT_ELEMENT);

        Self {
            elements,
            tree_depth: 1,
        }
    }

    /// Insert a record by reference. Always succeeds; duplicates and
    /// co-located points are allowed.
    pub fn add_tuple(&mut self, tuple: &'a T) {
        let mut idx = ROOT_ELEMENT;
        let mut level = 0;
        loop {
            let (dim, split_value, left, right) = match &self.elements[idx as usize] {
                Element::Leaf(bucket) => {
                    if !bucket.tuples.is_full() {
                        break;
                    }
                    // full bucket: split it into a node, then retry the same
                    // slot at the same level
                    self.split_leaf(idx, level);
                    continue;
                }
                Element::Node(node) => {
                    (node.dim as usize, node.split_value, node.left, node.right)
                }
            };

            let v = tuple.value_at(dim);
            // on a tie, favor the lighter subtree so planar and co-located
            // input cannot pile onto one side forever
            let descend_left = v < split_value
                || (v == split_value && self.count_of(left) <= self.count_of(right));

            match &mut self.elements[idx as usize] {
                Element::Node(node) => node.count += 1,
                Element::Leaf(_) => unreachable!(),
            }
            idx = if descend_left { left } else { right };
            level += 1;
        }

        match &mut self.elements[idx as usize] {
            Element::Leaf(bucket) => bucket.tuples.push(tuple),
            Element::Node(_) => unreachable!(),
        }
    }

    /// Convert the full leaf in slot `idx` (sitting at `level`) into a node
    /// with two half-full leaf children.
    fn split_leaf(&mut self, idx: ElemPtr, level: usize) {
        let dim = level % N;

        let Element::Leaf(mut bucket) = std::mem::take(&mut self.elements[idx as usize]) else {
            unreachable!("split target must be a leaf");
        };
        debug_assert!(bucket.tuples.is_full());

        bucket.sort(dim);
        let split_value = bucket.tuples[LEAF_COUNT_MAX / 2 - 1].value_at(dim);
        let upper: ArrayVec<&'a T, LEAF_COUNT_MAX> =
            bucket.tuples.drain(LEAF_COUNT_MAX / 2..).collect();

        // the truncated original keeps the low half as the left child,
        // a fresh leaf takes the high half as the right child
        let left = self.elements.insert(Element::Leaf(bucket)) as ElemPtr;
        let right = self.elements.insert(Element::Leaf(LeafData { tuples: upper })) as ElemPtr;
        self.elements[idx as usize] = Element::Node(NodeData {
            dim: dim as u8,
            split_value,
            left,
            right,
            count: LEAF_COUNT_MAX as u32,
        });

        if level == self.tree_depth {
            self.tree_depth = level + 1;
            if self.tree_depth > MAX_TREE_DEPTH {
                log::warn!(
                    "bspt depth {} exceeds the soft cap of {MAX_TREE_DEPTH}; \
                     sphere iterators allocated earlier are undersized",
                    self.tree_depth
                );
            }
        }
    }

    /// number of tuples under element `idx`
    #[inline]
    pub(crate) fn count_of(&self, idx: ElemPtr) -> u32 {
        match &self.elements[idx as usize] {
            Element::Leaf(bucket) => bucket.tuples.len() as u32,
            Element::Node(node) => node.count,
        }
    }

    /// get the number of tuples in the tree
    #[inline]
    pub fn len(&self) -> usize {
        self.count_of(ROOT_ELEMENT) as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// the depth watermark: deepest leaf level reached so far (at least 1)
    #[inline]
    pub fn depth(&self) -> usize {
        self.tree_depth
    }

    /// Diagnostic counts over the whole arena.
    pub fn stats(&self) -> TreeStats {
        let mut leaf_count = 0;
        let mut node_count = 0;
        for (_, element) in self.elements.iter() {
            match element {
                Element::Leaf(_) => leaf_count += 1,
                Element::Node(_) => node_count += 1,
            }
        }
        TreeStats {
            tuple_count: self.len(),
            tree_depth: self.tree_depth,
            leaf_count,
            node_count,
        }
    }
}

impl<'a, const N: usize, T: Tuple> Default for Bspt<'a, N, T> {
    /// creates a new, empty tree
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of tree shape, for logs and debugging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeStats {
    pub tuple_count: usize,
    pub tree_depth: usize,
    pub leaf_count: usize,
    pub node_count: usize,
}

impl fmt::Display for TreeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bspt: {} tuples, depth {}, {} leaves, {} nodes",
            self.tuple_count, self.tree_depth, self.leaf_count, self.node_count
        )
    }
}
