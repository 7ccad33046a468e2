use colored::Colorize;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::fmt::{self, Debug, Display};
use std::hash::{Hash, Hasher};
use std::mem;
use std::ops::Index;

use crate::error::{TreeError, TreeResult};
use crate::node_allocator::{NodeAllocator, TreeField as Field, SENTINEL};

// Register aliases
pub const COLOR: u32 = Field::Color as u32;
pub const SIZE: u32 = Field::Size as u32;

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
pub enum Color {
    Black = 0,
    Red = 1,
}

/// Exploits the fact that LEFT and RIGHT are set to 0 and 1 respectively
#[inline(always)]
fn opposite(dir: u32) -> u32 {
    1 - dir
}

/// An order-statistic red-black tree: a sorted set (or multiset, via the
/// `_multi` insertion paths) whose nodes carry subtree sizes, so that
/// positional lookups (`get`, `index_of`, `pop`) run in O(log n) alongside
/// the usual ordered operations.
pub struct RbTree<T: Ord> {
    root: u32,
    allocator: NodeAllocator<T>,
}

impl<T: Ord> Default for RbTree<T> {
    fn default() -> Self {
        RbTree {
            root: SENTINEL,
            allocator: NodeAllocator::new(),
        }
    }
}

impl<T: Ord> RbTree<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        RbTree {
            root: SENTINEL,
            allocator: NodeAllocator::with_capacity(capacity),
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.allocator.size() as usize
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline(always)]
    pub fn root(&self) -> u32 {
        self.root
    }

    pub fn clear(&mut self) {
        self.root = SENTINEL;
        self.allocator.clear();
    }

    /// Borrows the value stored at a node handle, if the handle is live
    pub fn node_value(&self, node: u32) -> Option<&T> {
        self.allocator.get(node).get_value()
    }

    pub(crate) fn node_value_mut(&mut self, node: u32) -> Option<&mut T> {
        self.allocator.get_mut(node).get_value_mut()
    }

    #[inline(always)]
    fn value(&self, node: u32) -> &T {
        self.allocator
            .get(node)
            .get_value()
            .expect("internal node without a value")
    }

    #[inline(always)]
    fn value_mut(&mut self, node: u32) -> &mut T {
        self.allocator
            .get_mut(node)
            .get_value_mut()
            .expect("internal node without a value")
    }

    #[inline(always)]
    fn color_red(&mut self, node: u32) {
        if node != SENTINEL {
            self.allocator.set_register(node, Color::Red as u32, COLOR);
        }
    }

    #[inline(always)]
    fn color_black(&mut self, node: u32) {
        self.allocator
            .set_register(node, Color::Black as u32, COLOR);
    }

    #[inline(always)]
    fn color_node(&mut self, node: u32, color: u32) {
        self.allocator.set_register(node, color, COLOR);
    }

    #[inline(always)]
    pub fn is_red(&self, node: u32) -> bool {
        self.allocator.get_register(node, COLOR) == Color::Red as u32
    }

    #[inline(always)]
    pub fn is_black(&self, node: u32) -> bool {
        self.allocator.get_register(node, COLOR) == Color::Black as u32
    }

    #[inline(always)]
    fn get_child(&self, node: u32, dir: u32) -> u32 {
        self.allocator.get_register(node, dir)
    }

    #[inline(always)]
    pub fn is_leaf(&self, node: u32) -> bool {
        self.get_left(node) == SENTINEL && self.get_right(node) == SENTINEL
    }

    pub fn get_dir(&self, node: u32, dir: u32) -> u32 {
        if dir == Field::Left as u32 {
            self.get_left(node)
        } else {
            self.get_right(node)
        }
    }

    #[inline(always)]
    pub fn get_left(&self, node: u32) -> u32 {
        self.allocator.get_register(node, Field::Left as u32)
    }

    #[inline(always)]
    pub fn get_right(&self, node: u32) -> u32 {
        self.allocator.get_register(node, Field::Right as u32)
    }

    #[inline(always)]
    pub fn get_color(&self, node: u32) -> u32 {
        self.allocator.get_register(node, COLOR)
    }

    #[inline(always)]
    pub fn get_parent(&self, node: u32) -> u32 {
        self.allocator.get_register(node, Field::Parent as u32)
    }

    /// Size of the subtree rooted at `node`; 0 for the sentinel
    #[inline(always)]
    pub fn get_size(&self, node: u32) -> u32 {
        self.allocator.get_register(node, SIZE)
    }

    #[inline(always)]
    fn update_size(&mut self, node: u32) {
        if node != SENTINEL {
            let size = self.get_size(self.get_left(node)) + self.get_size(self.get_right(node)) + 1;
            self.allocator.set_register(node, size, SIZE);
        }
    }

    fn new_node(&mut self, value: T) -> u32 {
        let node_index = self.allocator.add_node(value);
        self.allocator.set_register(node_index, 1, SIZE);
        node_index
    }

    fn remove_node(&mut self, node: u32) -> T {
        // Clear all registers
        self.allocator.clear_register(node, Field::Parent as u32);
        self.allocator.clear_register(node, COLOR);
        self.allocator.clear_register(node, Field::Left as u32);
        self.allocator.clear_register(node, Field::Right as u32);
        self.allocator.clear_register(node, SIZE);
        // Release the slot to the free list and take the payload out
        self.allocator
            .remove_node(node)
            .expect("tried to free the sentinel")
    }

    #[inline(always)]
    fn connect(&mut self, parent: u32, child: u32, dir: u32) {
        self.allocator
            .connect(parent, child, dir, Field::Parent as u32);
    }

    #[inline(always)]
    fn child_dir(&self, parent: u32, child: u32) -> u32 {
        let left = self.get_left(parent);
        let right = self.get_right(parent);
        if child == left {
            Field::Left as u32
        } else if child == right {
            Field::Right as u32
        } else {
            panic!("Nodes are not connected");
        }
    }

    /// Puts `new_child` where `old_child` hangs off `parent`; with a sentinel
    /// parent, `new_child` becomes the root
    fn replace_child(&mut self, parent: u32, old_child: u32, new_child: u32) {
        if parent == SENTINEL {
            self.root = new_child;
            self.allocator
                .set_register(new_child, SENTINEL, Field::Parent as u32);
            return;
        }
        let dir = self.child_dir(parent, old_child);
        self.connect(parent, new_child, dir);
    }

    /// This helper function connects the parent of `target` to `source`.
    /// It is the start of the process of removing `target` from the tree.
    #[inline(always)]
    fn transplant(&mut self, target: u32, source: u32) {
        let parent = self.get_parent(target);
        self.replace_child(parent, target, source);
    }

    fn rotate_dir(&mut self, parent_index: u32, dir: u32) -> Option<u32> {
        let grandparent_index = self.get_parent(parent_index);
        if !matches!(
            FromPrimitive::from_u32(dir),
            Some(Field::Left) | Some(Field::Right),
        ) {
            return None;
        }
        let sibling_index = self.get_child(parent_index, opposite(dir));
        if sibling_index == SENTINEL {
            return None;
        }
        let child_index = self.get_child(sibling_index, dir);
        self.connect(sibling_index, parent_index, dir);
        self.connect(parent_index, child_index, opposite(dir));
        if grandparent_index != SENTINEL {
            self.connect(
                grandparent_index,
                sibling_index,
                self.child_dir(grandparent_index, parent_index),
            );
        } else {
            self.allocator
                .clear_register(sibling_index, Field::Parent as u32);
            self.root = sibling_index;
        }
        // Recompute subtree sizes bottom-up: the demoted parent first, then
        // the node that took its place. Ancestor sizes are unchanged
        self.update_size(parent_index);
        self.update_size(sibling_index);
        Some(sibling_index)
    }

    fn fix_insert(&mut self, mut node: u32) {
        while self.is_red(self.get_parent(node)) {
            let mut parent = self.get_parent(node);
            let mut grandparent = self.get_parent(parent);
            if grandparent == SENTINEL {
                assert!(parent == self.root);
                break;
            }
            let dir = self.child_dir(grandparent, parent);
            let uncle = self.get_child(grandparent, opposite(dir));
            if self.is_red(uncle) {
                self.color_black(uncle);
                self.color_black(parent);
                self.color_red(grandparent);
                node = grandparent;
            } else {
                if self.child_dir(parent, node) == opposite(dir) {
                    self.rotate_dir(parent, dir);
                    node = parent;
                }
                parent = self.get_parent(node);
                grandparent = self.get_parent(parent);
                self.color_black(parent);
                self.color_red(grandparent);
                self.rotate_dir(grandparent, opposite(dir));
            }
        }
        self.color_black(self.root);
    }

    fn insert_node(&mut self, value: T, multiset: bool) -> (u32, Option<T>) {
        if self.root == SENTINEL {
            let node_index = self.new_node(value);
            self.root = node_index;
            return (node_index, None);
        }
        let mut reference_node = self.root;
        loop {
            let (target, dir) = match value.cmp(self.value(reference_node)) {
                Ordering::Less => (self.get_left(reference_node), Field::Left as u32),
                Ordering::Equal if !multiset => {
                    let old = mem::replace(self.value_mut(reference_node), value);
                    return (reference_node, Some(old));
                }
                // Equal values sort to the right in multiset mode, so the
                // leftmost occurrence is always found down the `<` branch
                _ => (self.get_right(reference_node), Field::Right as u32),
            };
            if target == SENTINEL {
                let node_index = self.new_node(value);
                self.color_red(node_index);
                self.connect(reference_node, node_index, dir);
                let mut ancestor = reference_node;
                while ancestor != SENTINEL {
                    let size = self.get_size(ancestor);
                    self.allocator.set_register(ancestor, size + 1, SIZE);
                    ancestor = self.get_parent(ancestor);
                }
                // This is only false when the parent is the root
                if self.get_parent(reference_node) != SENTINEL {
                    self.fix_insert(node_index);
                }
                return (node_index, None);
            }
            reference_node = target;
        }
    }

    /// Inserts `value` with set semantics: an equal value already in the tree
    /// is overwritten and returned, with no structural change
    pub fn insert(&mut self, value: T) -> Option<T> {
        self.insert_node(value, false).1
    }

    /// Inserts `value` with multiset semantics, keeping duplicates. Returns
    /// the handle of the newly attached node
    pub fn insert_multi(&mut self, value: T) -> u32 {
        self.insert_node(value, true).0
    }

    pub fn extend_multi<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.insert_multi(value);
        }
    }

    pub fn find(&self, value: &T) -> Option<&T> {
        match self.get_addr(value) {
            SENTINEL => None,
            node => Some(self.value(node)),
        }
    }

    #[inline(always)]
    pub fn contains(&self, value: &T) -> bool {
        self.get_addr(value) != SENTINEL
    }

    pub fn get_addr(&self, value: &T) -> u32 {
        self.get_addr_by(|stored| value.cmp(stored))
    }

    /// Descends by an arbitrary ordering probe; `probe` reports how the
    /// sought position compares to the node it is given. Used by the map view
    /// to look entries up by key alone
    pub fn get_addr_by<F>(&self, mut probe: F) -> u32
    where
        F: FnMut(&T) -> Ordering,
    {
        let mut reference_node = self.root;
        while reference_node != SENTINEL {
            reference_node = match probe(self.value(reference_node)) {
                Ordering::Less => self.get_left(reference_node),
                Ordering::Greater => self.get_right(reference_node),
                Ordering::Equal => return reference_node,
            };
        }
        SENTINEL
    }

    pub fn first(&self) -> Option<&T> {
        match self.root {
            SENTINEL => None,
            root => Some(self.value(self.find_min(root))),
        }
    }

    pub fn last(&self) -> Option<&T> {
        match self.root {
            SENTINEL => None,
            root => Some(self.value(self.find_max(root))),
        }
    }

    fn find_min(&self, index: u32) -> u32 {
        let mut node = index;
        while self.get_left(node) != SENTINEL {
            node = self.get_left(node);
        }
        node
    }

    fn find_max(&self, index: u32) -> u32 {
        let mut node = index;
        while self.get_right(node) != SENTINEL {
            node = self.get_right(node);
        }
        node
    }

    fn normalize_index(&self, i: isize) -> TreeResult<usize> {
        let len = self.len();
        let index = if i < 0 { i + len as isize } else { i };
        if index < 0 || index >= len as isize {
            return Err(TreeError::IndexOutOfRange { index: i, len });
        }
        Ok(index as usize)
    }

    fn node_at_rank(&self, rank: usize) -> TreeResult<u32> {
        let mut node = self.root;
        let mut rank = rank as u32;
        while node != SENTINEL {
            let left_size = self.get_size(self.get_left(node));
            match rank.cmp(&left_size) {
                Ordering::Less => node = self.get_left(node),
                Ordering::Equal => return Ok(node),
                Ordering::Greater => {
                    rank -= left_size + 1;
                    node = self.get_right(node);
                }
            }
        }
        Err(TreeError::Corruption("rank descent reached a leaf"))
    }

    /// Returns the value at in-order position `i`; negative indices count
    /// from the back
    pub fn get(&self, i: isize) -> TreeResult<&T> {
        let node = self.node_at_rank(self.normalize_index(i)?)?;
        Ok(self.value(node))
    }

    /// In-order position of the first occurrence of `value`
    pub fn index_of(&self, value: &T) -> TreeResult<usize> {
        self.index_of_by(|stored| value.cmp(stored))
    }

    pub fn index_of_by<F>(&self, mut probe: F) -> TreeResult<usize>
    where
        F: FnMut(&T) -> Ordering,
    {
        let mut node = self.root;
        let mut before: u32 = 0;
        let mut first = None;
        while node != SENTINEL {
            let left_size = self.get_size(self.get_left(node));
            match probe(self.value(node)) {
                Ordering::Less => node = self.get_left(node),
                Ordering::Equal => {
                    // Found one occurrence; keep looking for earlier ones
                    first = Some((before + left_size) as usize);
                    node = self.get_left(node);
                }
                Ordering::Greater => {
                    before += left_size + 1;
                    node = self.get_right(node);
                }
            }
        }
        first.ok_or(TreeError::KeyMissing)
    }

    /// Removes `value` and returns the stored payload
    pub fn remove(&mut self, value: &T) -> TreeResult<T> {
        match self.get_addr(value) {
            SENTINEL => Err(TreeError::KeyMissing),
            node => Ok(self.delete_node(node)),
        }
    }

    /// Removes and returns the value at in-order position `i`
    pub fn pop(&mut self, i: isize) -> TreeResult<T> {
        let node = self.node_at_rank(self.normalize_index(i)?)?;
        Ok(self.delete_node(node))
    }

    pub fn pop_last(&mut self) -> TreeResult<T> {
        self.pop(-1)
    }

    /// Physically exchanges the tree positions of `a` and `b`. Colors and
    /// subtree sizes belong to positions rather than payloads, so they are
    /// exchanged as well; payloads stay with their handles, which keeps
    /// outstanding node handles (cursors) valid across the swap
    fn swap_node_links(&mut self, a: u32, b: u32) {
        let (color_a, color_b) = (self.get_color(a), self.get_color(b));
        self.color_node(a, color_b);
        self.color_node(b, color_a);
        let (size_a, size_b) = (self.get_size(a), self.get_size(b));
        self.allocator.set_register(a, size_b, SIZE);
        self.allocator.set_register(b, size_a, SIZE);
        let (parent_a, parent_b) = (self.get_parent(a), self.get_parent(b));
        self.replace_child(parent_a, a, b);
        self.replace_child(parent_b, b, a);
        // When a and b were adjacent the replace above leaves a self-link;
        // re-registering the children below repairs it
        let (left_a, right_a) = (self.get_left(a), self.get_right(a));
        let (left_b, right_b) = (self.get_left(b), self.get_right(b));
        self.allocator.set_register(a, left_b, Field::Left as u32);
        self.allocator.set_register(a, right_b, Field::Right as u32);
        self.allocator.set_register(b, left_a, Field::Left as u32);
        self.allocator.set_register(b, right_a, Field::Right as u32);
        for child in [self.get_left(a), self.get_right(a)] {
            self.allocator.set_register(child, a, Field::Parent as u32);
        }
        for child in [self.get_left(b), self.get_right(b)] {
            self.allocator.set_register(child, b, Field::Parent as u32);
        }
    }

    pub(crate) fn delete_node(&mut self, target: u32) -> T {
        // In-order neighbor with at most one internal child: the minimum of
        // the right subtree when there is one, else the maximum of the left
        let mut pivot = target;
        if self.get_right(target) != SENTINEL {
            pivot = self.find_min(self.get_right(target));
        } else if self.get_left(target) != SENTINEL {
            pivot = self.find_max(self.get_left(target));
        }
        if pivot != target {
            self.swap_node_links(target, pivot);
        }
        // `target` now sits at the bottom; decrement sizes up to the root
        let mut ancestor = self.get_parent(target);
        while ancestor != SENTINEL {
            let size = self.get_size(ancestor);
            self.allocator.set_register(ancestor, size - 1, SIZE);
            ancestor = self.get_parent(ancestor);
        }
        let child = if self.get_right(target) == SENTINEL {
            self.get_left(target)
        } else {
            self.get_right(target)
        };
        let parent = self.get_parent(target);
        // A sentinel may be spliced into a fix-up position; remember where it
        // hangs since the sentinel itself carries no parent
        let parent_dir = if child == SENTINEL && parent != SENTINEL {
            Some((parent, self.child_dir(parent, target)))
        } else {
            None
        };
        let was_black = self.is_black(target);
        self.transplant(target, child);
        let value = self.remove_node(target);
        if was_black {
            self.fix_remove(child, parent_dir);
        }
        value
    }

    fn fix_remove(&mut self, mut node_index: u32, parent_dir: Option<(u32, u32)>) {
        if node_index == SENTINEL && parent_dir.is_none() {
            return;
        }
        while node_index != self.root && self.is_black(node_index) {
            let (parent, dir) = if node_index == SENTINEL {
                parent_dir.expect("detached fix-up position without a parent")
            } else {
                let parent = self.get_parent(node_index);
                (parent, self.child_dir(parent, node_index))
            };
            let mut sibling = self.get_child(parent, opposite(dir));
            if self.is_red(sibling) {
                self.color_black(sibling);
                self.color_red(parent);
                self.rotate_dir(parent, dir);
                sibling = self.get_dir(parent, opposite(dir));
            }
            if self.is_black(self.get_left(sibling)) && self.is_black(self.get_right(sibling)) {
                self.color_red(sibling);
                node_index = parent;
            } else {
                if self.is_black(self.get_dir(sibling, opposite(dir))) {
                    self.color_black(self.get_dir(sibling, dir));
                    self.color_red(sibling);
                    self.rotate_dir(sibling, opposite(dir));
                    sibling = self.get_dir(parent, opposite(dir));
                }
                self.color_node(sibling, self.get_color(parent));
                self.color_black(parent);
                self.color_black(self.get_dir(sibling, opposite(dir)));
                self.rotate_dir(parent, dir);
                node_index = self.root;
            }
        }
        self.color_black(node_index);
    }

    fn successor(&self, node: u32) -> u32 {
        if self.get_right(node) != SENTINEL {
            return self.find_min(self.get_right(node));
        }
        let mut node = node;
        while self.get_parent(node) != SENTINEL && node == self.get_right(self.get_parent(node)) {
            node = self.get_parent(node);
        }
        self.get_parent(node)
    }

    fn predecessor(&self, node: u32) -> u32 {
        if self.get_left(node) != SENTINEL {
            return self.find_max(self.get_left(node));
        }
        let mut node = node;
        while self.get_parent(node) != SENTINEL && node == self.get_left(self.get_parent(node)) {
            node = self.get_parent(node);
        }
        self.get_parent(node)
    }

    #[inline(always)]
    fn step(&self, node: u32, fwd: bool) -> u32 {
        if fwd {
            self.successor(node)
        } else {
            self.predecessor(node)
        }
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            tree: self,
            front: match self.root {
                SENTINEL => SENTINEL,
                root => self.find_min(root),
            },
            back: match self.root {
                SENTINEL => SENTINEL,
                root => self.find_max(root),
            },
            remaining: self.len(),
        }
    }

    /// In-order iterator over node handles rather than values
    pub fn node_iter(&self) -> NodeIter<'_, T> {
        NodeIter {
            tree: self,
            front: match self.root {
                SENTINEL => SENTINEL,
                root => self.find_min(root),
            },
            back: match self.root {
                SENTINEL => SENTINEL,
                root => self.find_max(root),
            },
            remaining: self.len(),
        }
    }

    /// Forward in-order cursor that may delete the element it stands on
    pub fn cursor(&mut self) -> Cursor<'_, T> {
        self.cursor_dir(true)
    }

    /// Reverse in-order cursor
    pub fn cursor_rev(&mut self) -> Cursor<'_, T> {
        self.cursor_dir(false)
    }

    fn cursor_dir(&mut self, fwd: bool) -> Cursor<'_, T> {
        let nxt = match self.root {
            SENTINEL => SENTINEL,
            root if fwd => self.find_min(root),
            root => self.find_max(root),
        };
        Cursor {
            tree: self,
            node: SENTINEL,
            nxt,
            fwd,
        }
    }

    /// Python-style slice: the values at `start`, `start + step`, ... short
    /// of `stop`, with negative indices counting from the back and both
    /// bounds clamped to the tree
    pub fn slice(&self, start: isize, stop: isize, step: isize) -> TreeResult<Vec<&T>> {
        if step == 0 {
            return Err(TreeError::InvalidArgument("slice step cannot be zero"));
        }
        let len = self.len() as isize;
        let clamp = |i: isize, lo: isize, hi: isize| -> isize {
            let i = if i < 0 { i + len } else { i };
            i.max(lo).min(hi)
        };
        let mut out = Vec::new();
        if step > 0 {
            let (mut i, stop) = (clamp(start, 0, len), clamp(stop, 0, len));
            while i < stop {
                out.push(self.get(i)?);
                i += step;
            }
        } else {
            let (mut i, stop) = (clamp(start, -1, len - 1), clamp(stop, -1, len - 1));
            while i > stop {
                out.push(self.get(i)?);
                i += step;
            }
        }
        Ok(out)
    }

    /// DJB2 rolling hash over the in-order values; trees that compare equal
    /// hash equal. An empty tree hashes to 0
    pub fn hash_value(&self) -> u64
    where
        T: Hash,
    {
        if self.is_empty() {
            return 0;
        }
        let mut h: u64 = 5381;
        for value in self.iter() {
            let mut hasher = DefaultHasher::new();
            value.hash(&mut hasher);
            h = h.wrapping_mul(33) ^ hasher.finish();
        }
        h
    }

    pub fn union(&self, other: &Self) -> Self
    where
        T: Clone,
    {
        let mut merged = Self::new();
        merged.extend(self.iter().cloned());
        merged.extend(other.iter().cloned());
        merged
    }

    pub fn intersect(&self, other: &Self) -> Self
    where
        T: Clone,
    {
        let mut merged = Self::new();
        let mut a = self.iter().peekable();
        let mut b = other.iter().peekable();
        while let (Some(&x), Some(&y)) = (a.peek(), b.peek()) {
            match x.cmp(y) {
                Ordering::Less => {
                    a.next();
                }
                Ordering::Greater => {
                    b.next();
                }
                Ordering::Equal => {
                    merged.insert(x.clone());
                    a.next();
                    b.next();
                }
            }
        }
        merged
    }

    /// Members of `self` that are not members of `other`
    pub fn diff(&self, other: &Self) -> Self
    where
        T: Clone,
    {
        let mut merged = Self::new();
        let mut a = self.iter().peekable();
        let mut b = other.iter().peekable();
        while let Some(&x) = a.peek() {
            match b.peek() {
                None => {
                    merged.insert(x.clone());
                    a.next();
                }
                Some(&y) => match x.cmp(y) {
                    Ordering::Less => {
                        merged.insert(x.clone());
                        a.next();
                    }
                    Ordering::Equal => {
                        a.next();
                        b.next();
                    }
                    Ordering::Greater => {
                        b.next();
                    }
                },
            }
        }
        merged
    }

    pub fn symmetric_diff(&self, other: &Self) -> Self
    where
        T: Clone,
    {
        let mut merged = Self::new();
        let mut a = self.iter().peekable();
        let mut b = other.iter().peekable();
        loop {
            match (a.peek(), b.peek()) {
                (None, None) => break,
                (Some(&x), None) => {
                    merged.insert(x.clone());
                    a.next();
                }
                (None, Some(&y)) => {
                    merged.insert(y.clone());
                    b.next();
                }
                (Some(&x), Some(&y)) => match x.cmp(y) {
                    Ordering::Less => {
                        merged.insert(x.clone());
                        a.next();
                    }
                    Ordering::Greater => {
                        merged.insert(y.clone());
                        b.next();
                    }
                    Ordering::Equal => {
                        a.next();
                        b.next();
                    }
                },
            }
        }
        merged
    }

    /// Walks the whole tree and verifies the red-black and order-statistic
    /// invariants. For debugging and tests
    pub fn check(&self) -> TreeResult<()> {
        if self.root == SENTINEL {
            return match self.allocator.size() {
                0 => Ok(()),
                n => Err(TreeError::InvariantViolated(format!(
                    "empty tree still holds {} allocated nodes",
                    n
                ))),
            };
        }
        if self.is_red(self.root) {
            return Err(TreeError::InvariantViolated("root is red".to_string()));
        }
        if self.get_parent(self.root) != SENTINEL {
            return Err(TreeError::InvariantViolated(format!(
                "root points at parent {}",
                self.get_parent(self.root)
            )));
        }
        let mut visited = 0usize;
        let mut black_height = None;
        let mut prev: Option<&T> = None;
        for node in self.node_iter() {
            visited += 1;
            let (left, right) = (self.get_left(node), self.get_right(node));
            if self.is_red(node) && (self.is_red(left) || self.is_red(right)) {
                return Err(TreeError::InvariantViolated(format!(
                    "red node {} has a red child",
                    node
                )));
            }
            for child in [left, right] {
                if child != SENTINEL && self.get_parent(child) != node {
                    return Err(TreeError::InvariantViolated(format!(
                        "node {} does not point back at its parent {}",
                        child, node
                    )));
                }
            }
            let expected = self.get_size(left) + self.get_size(right) + 1;
            if self.get_size(node) != expected {
                return Err(TreeError::InvariantViolated(format!(
                    "node {} has size {} but its subtrees sum to {}",
                    node,
                    self.get_size(node),
                    expected
                )));
            }
            if left == SENTINEL || right == SENTINEL {
                // Count black nodes on the path up from a node with a leaf
                // child; every such path must agree
                let mut blacks = 1u32;
                let mut ancestor = node;
                while ancestor != SENTINEL {
                    blacks += self.is_black(ancestor) as u32;
                    ancestor = self.get_parent(ancestor);
                }
                match black_height {
                    None => black_height = Some(blacks),
                    Some(height) if height != blacks => {
                        return Err(TreeError::InvariantViolated(format!(
                            "black-height mismatch: {} vs {}",
                            height, blacks
                        )));
                    }
                    _ => {}
                }
            }
            let value = self.value(node);
            if let Some(prev) = prev {
                if prev > value {
                    return Err(TreeError::InvariantViolated(
                        "in-order traversal is not sorted".to_string(),
                    ));
                }
            }
            prev = Some(value);
        }
        if visited != self.len() {
            return Err(TreeError::InvariantViolated(format!(
                "traversal visited {} nodes but {} are allocated",
                visited,
                self.len()
            )));
        }
        if self.get_size(self.root) as usize != self.len() {
            return Err(TreeError::InvariantViolated(format!(
                "root size {} disagrees with allocator size {}",
                self.get_size(self.root),
                self.len()
            )));
        }
        Ok(())
    }

    pub fn pretty_print(&self)
    where
        T: Debug,
    {
        let mut s = String::new();
        let mut stack = vec![(self.root, "".to_string(), "".to_string())];
        let ranks = self
            .node_iter()
            .enumerate()
            .map(|(i, node)| (node, i))
            .collect::<BTreeMap<_, _>>();

        while let Some((node, mut padding, pointer)) = stack.pop() {
            if node == SENTINEL {
                continue;
            }
            let label = format!("{:?} ({})", self.value(node), ranks[&node]);
            s.push_str(&padding);
            s.push_str(&pointer);
            if self.is_red(node) {
                s.push_str(&format!("{}", label.as_str().red()));
            } else {
                s.push_str(&label);
            }
            s.push('\n');
            padding.push_str("│  ");

            let right_pointer = "└──".to_string();
            let left_pointer = if self.get_right(node) != SENTINEL {
                "├──".to_string()
            } else {
                "└──".to_string()
            };

            stack.push((self.get_right(node), padding.clone(), right_pointer));
            stack.push((self.get_left(node), padding.clone(), left_pointer));
        }
        println!("{}", s);
    }

    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, node: u32) -> fmt::Result
    where
        T: Display,
    {
        if node == SENTINEL {
            return write!(f, ".");
        }
        write!(f, "(")?;
        self.fmt_node(f, self.get_left(node))?;
        write!(
            f,
            ",{}:{},",
            self.value(node),
            if self.is_black(node) { "B" } else { "R" }
        )?;
        self.fmt_node(f, self.get_right(node))?;
        write!(f, ")")
    }
}

/// Parenthesized in-order rendering: `(L,value:COLOR,R)` with `.` leaves
impl<T: Ord + Display> Display for RbTree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_node(f, self.root)
    }
}

impl<T: Ord + Debug> Debug for RbTree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T: Ord> Extend<T> for RbTree<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl<T: Ord> FromIterator<T> for RbTree<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut tree = Self::new();
        tree.extend(iter);
        tree
    }
}

impl<T: Ord> PartialEq for RbTree<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: Ord> Eq for RbTree<T> {}

impl<T: Ord> PartialOrd for RbTree<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Lexicographic with length first: [1] < [2] < [1,1] < [1,2] < [1,2,0]
impl<T: Ord> Ord for RbTree<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.len()
            .cmp(&other.len())
            .then_with(|| self.iter().cmp(other.iter()))
    }
}

impl<T: Ord + Hash> Hash for RbTree<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash_value());
    }
}

impl<T: Ord> Index<usize> for RbTree<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        self.get(index as isize).unwrap()
    }
}

impl<'a, T: Ord> IntoIterator for &'a RbTree<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct Iter<'a, T: Ord> {
    tree: &'a RbTree<T>,
    front: u32,
    back: u32,
    remaining: usize,
}

impl<'a, T: Ord> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.front;
        self.front = self.tree.successor(node);
        self.remaining -= 1;
        Some(self.tree.value(node))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T: Ord> DoubleEndedIterator for Iter<'a, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.back;
        self.back = self.tree.predecessor(node);
        self.remaining -= 1;
        Some(self.tree.value(node))
    }
}

impl<'a, T: Ord> ExactSizeIterator for Iter<'a, T> {}

pub struct NodeIter<'a, T: Ord> {
    tree: &'a RbTree<T>,
    front: u32,
    back: u32,
    remaining: usize,
}

impl<'a, T: Ord> Iterator for NodeIter<'a, T> {
    type Item = u32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.front;
        self.front = self.tree.successor(node);
        self.remaining -= 1;
        Some(node)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T: Ord> DoubleEndedIterator for NodeIter<'a, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.back;
        self.back = self.tree.predecessor(node);
        self.remaining -= 1;
        Some(node)
    }
}

impl<'a, T: Ord> ExactSizeIterator for NodeIter<'a, T> {}

/// An in-order cursor over a mutably borrowed tree. The only mutation it
/// permits is deleting the element it currently stands on, which keeps the
/// rest of the traversal intact
pub struct Cursor<'a, T: Ord> {
    tree: &'a mut RbTree<T>,
    node: u32,
    nxt: u32,
    fwd: bool,
}

impl<'a, T: Ord> Cursor<'a, T> {
    /// Advances to the next element and returns it. A finished cursor keeps
    /// returning `None`
    pub fn next(&mut self) -> Option<&T> {
        if self.node == SENTINEL {
            self.node = self.nxt;
            self.nxt = SENTINEL;
        } else {
            self.node = self.tree.step(self.node, self.fwd);
        }
        match self.node {
            SENTINEL => None,
            node => Some(self.tree.value(node)),
        }
    }

    /// Handle of the node the cursor stands on
    pub fn node(&self) -> Option<u32> {
        match self.node {
            SENTINEL => None,
            node => Some(node),
        }
    }

    /// Deletes the element the cursor stands on and returns its value; the
    /// traversal resumes with the element that would have followed it
    pub fn delete(&mut self) -> Option<T> {
        if self.node == SENTINEL {
            return None;
        }
        // Pick the continuation before the structure changes underneath it
        self.nxt = self.tree.step(self.node, self.fwd);
        let value = self.tree.delete_node(self.node);
        self.node = SENTINEL;
        Some(value)
    }
}

#[test]
/// This test addresses the case where a node's parent and uncle are both red.
/// This is resolved by coloring the parent and uncle black and the grandparent red.
fn test_insert_with_red_parent_and_uncle() {
    let mut tree = RbTree::<u64>::new();
    let addrs = vec![
        tree.insert_multi(61),
        tree.insert_multi(52),
        tree.insert_multi(85),
        tree.insert_multi(76),
        tree.insert_multi(93),
    ];

    let parent = addrs[4];
    let uncle = addrs[3];
    let grandparent = addrs[2];

    assert_eq!(tree.get_left(addrs[0]), addrs[1]);
    assert_eq!(tree.get_right(addrs[0]), grandparent);
    assert_eq!(tree.get_parent(addrs[1]), addrs[0]);
    assert_eq!(tree.get_parent(grandparent), addrs[0]);

    assert_eq!(tree.get_left(grandparent), uncle);
    assert_eq!(tree.get_right(grandparent), parent);
    assert_eq!(tree.get_parent(uncle), grandparent);
    assert_eq!(tree.get_parent(parent), grandparent);

    assert!(tree.is_black(addrs[0]) && tree.is_black(addrs[1]) && tree.is_black(grandparent));
    assert!(tree.is_red(uncle) && tree.is_red(parent));

    let leaf = tree.insert_multi(100);

    assert!(
        tree.is_black(addrs[0])
            && tree.is_black(addrs[1])
            && tree.is_black(uncle)
            && tree.is_black(parent)
    );
    assert!(tree.is_red(grandparent) && tree.is_red(leaf));

    assert_eq!(tree.get_size(addrs[0]), 6);
    assert_eq!(tree.get_size(grandparent), 4);
    assert_eq!(tree.get_size(parent), 2);
    tree.check().unwrap();
}

#[test]
/// This test addresses the case where a node's parent (P) is red and uncle is black.
/// The new leaf (L) is the right child of the parent and the parent is the right
/// child of the grandparent (G).
///
/// "P is right child of G and L is right child of P."
///
/// We resolve this by rotating the grandparent left and then
/// fixing the colors.
fn test_right_insert_with_red_right_child_parent_and_black_uncle() {
    let mut tree = RbTree::<u64>::new();
    let addrs = vec![
        tree.insert_multi(61),
        tree.insert_multi(52),
        tree.insert_multi(85),
        tree.insert_multi(93),
    ];

    let parent = addrs[3];
    // Uncle is black as it is null
    let grandparent = addrs[2];

    assert!(tree.is_black(addrs[0]) && tree.is_black(addrs[1]) && tree.is_black(grandparent));
    assert!(tree.is_red(parent));

    assert_eq!(tree.get_left(addrs[0]), addrs[1]);
    assert_eq!(tree.get_right(addrs[0]), grandparent);
    assert_eq!(tree.get_parent(addrs[1]), addrs[0]);
    assert_eq!(tree.get_parent(grandparent), addrs[0]);

    assert_eq!(tree.get_left(grandparent), SENTINEL);
    assert_eq!(tree.get_right(grandparent), parent);
    assert_eq!(tree.get_parent(parent), grandparent);

    let leaf = tree.insert_multi(100);

    assert!(tree.is_black(addrs[0]) && tree.is_black(addrs[1]) && tree.is_black(parent));
    assert!(tree.is_red(grandparent) && tree.is_red(leaf));

    assert_eq!(tree.get_left(addrs[0]), addrs[1]);
    assert_eq!(tree.get_right(addrs[0]), parent);
    assert_eq!(tree.get_parent(addrs[1]), addrs[0]);
    assert_eq!(tree.get_parent(parent), addrs[0]);

    assert_eq!(tree.get_left(parent), grandparent);
    assert_eq!(tree.get_right(parent), leaf);
    assert_eq!(tree.get_parent(grandparent), parent);
    assert_eq!(tree.get_parent(leaf), parent);
    assert!(tree.is_leaf(leaf) && tree.is_leaf(grandparent));

    assert_eq!(tree.get_size(addrs[0]), 5);
    assert_eq!(tree.get_size(parent), 3);
    assert_eq!(tree.get_size(grandparent), 1);
    tree.check().unwrap();
}

#[test]
/// This test addresses the case where a node's parent is red and uncle is black.
/// The new leaf is the left child of the parent and the parent is the right
/// child of the grandparent.
///
/// "P is right child of G and L is left child of P."
///
/// We resolve this by rotating the parent right then applying the same
/// algorithm as the previous test.
fn test_left_insert_with_red_right_child_parent_and_black_uncle() {
    let mut tree = RbTree::<u64>::new();
    let addrs = vec![
        tree.insert_multi(61),
        tree.insert_multi(52),
        tree.insert_multi(85),
        tree.insert_multi(93),
    ];

    let parent = addrs[3];
    // Uncle is black as it is null
    let grandparent = addrs[2];

    assert!(tree.is_black(addrs[0]) && tree.is_black(addrs[1]) && tree.is_black(grandparent));
    assert!(tree.is_red(parent));

    let leaf = tree.insert_multi(87);

    assert!(tree.is_black(addrs[0]) && tree.is_black(addrs[1]) && tree.is_black(leaf));
    assert!(tree.is_red(grandparent) && tree.is_red(parent));

    assert_eq!(tree.get_left(addrs[0]), addrs[1]);
    assert_eq!(tree.get_right(addrs[0]), leaf);
    assert_eq!(tree.get_parent(addrs[1]), addrs[0]);
    assert_eq!(tree.get_parent(leaf), addrs[0]);

    assert_eq!(tree.get_left(leaf), grandparent);
    assert_eq!(tree.get_right(leaf), parent);
    assert_eq!(tree.get_parent(grandparent), leaf);
    assert_eq!(tree.get_parent(parent), leaf);
    assert!(tree.is_leaf(parent) && tree.is_leaf(grandparent));
    tree.check().unwrap();
}

#[test]
/// This test addresses the case where a node's parent is red and uncle is black.
/// The new leaf is the left child of the parent and the parent is the left
/// child of the grandparent.
///
/// "P is left child of G and L is left child of P."
///
/// We resolve this by rotating the grandparent right and then
/// fixing the colors.
fn test_left_insert_with_red_left_child_parent_and_black_uncle() {
    let mut tree = RbTree::<u64>::new();
    let addrs = vec![
        tree.insert_multi(61),
        tree.insert_multi(85),
        tree.insert_multi(52),
        tree.insert_multi(41),
    ];

    let parent = addrs[3];
    // Uncle is black as it is null
    let grandparent = addrs[2];

    assert!(tree.is_black(addrs[0]) && tree.is_black(addrs[1]) && tree.is_black(grandparent));
    assert!(tree.is_red(parent));

    let leaf = tree.insert_multi(25);

    assert!(tree.is_black(addrs[0]) && tree.is_black(addrs[1]) && tree.is_black(parent));
    assert!(tree.is_red(grandparent) && tree.is_red(leaf));

    assert_eq!(tree.get_right(addrs[0]), addrs[1]);
    assert_eq!(tree.get_left(addrs[0]), parent);
    assert_eq!(tree.get_parent(addrs[1]), addrs[0]);
    assert_eq!(tree.get_parent(parent), addrs[0]);

    assert_eq!(tree.get_right(parent), grandparent);
    assert_eq!(tree.get_left(parent), leaf);
    assert_eq!(tree.get_parent(grandparent), parent);
    assert_eq!(tree.get_parent(leaf), parent);
    assert!(tree.is_leaf(leaf) && tree.is_leaf(grandparent));
    tree.check().unwrap();
}

#[test]
/// This test addresses the case where a node's parent is red and uncle is black.
/// The new leaf is the right child of the parent and the parent is the left
/// child of the grandparent.
///
/// "P is left child of G and L is right child of P."
///
/// We resolve this by rotating the parent left then applying the same
/// algorithm as the previous test.
fn test_right_insert_with_red_left_child_parent_and_black_uncle() {
    let mut tree = RbTree::<u64>::new();
    let addrs = vec![
        tree.insert_multi(61),
        tree.insert_multi(85),
        tree.insert_multi(52),
        tree.insert_multi(41),
    ];

    let parent = addrs[3];
    // Uncle is black as it is null
    let grandparent = addrs[2];

    assert!(tree.is_black(addrs[0]) && tree.is_black(addrs[1]) && tree.is_black(grandparent));
    assert!(tree.is_red(parent));

    let leaf = tree.insert_multi(47);

    assert!(tree.is_black(addrs[0]) && tree.is_black(addrs[1]) && tree.is_black(leaf));
    assert!(tree.is_red(grandparent) && tree.is_red(parent));

    assert_eq!(tree.get_right(addrs[0]), addrs[1]);
    assert_eq!(tree.get_left(addrs[0]), leaf);
    assert_eq!(tree.get_parent(addrs[1]), addrs[0]);
    assert_eq!(tree.get_parent(leaf), addrs[0]);

    assert_eq!(tree.get_right(leaf), grandparent);
    assert_eq!(tree.get_left(leaf), parent);
    assert_eq!(tree.get_parent(grandparent), leaf);
    assert_eq!(tree.get_parent(parent), leaf);
    assert!(tree.is_leaf(parent) && tree.is_leaf(grandparent));
    tree.check().unwrap();
}

#[test]
fn test_insert_ordering_and_rank() {
    let mut tree = RbTree::new();
    tree.extend([4, 8, 9, 3, 6]);
    tree.check().unwrap();
    assert_eq!(tree.iter().copied().collect::<Vec<_>>(), vec![3, 4, 6, 8, 9]);
    assert_eq!(tree.len(), 5);
    assert_eq!(*tree.get(0).unwrap(), 3);
    assert_eq!(*tree.get(-1).unwrap(), 9);
    assert_eq!(*tree.get(2).unwrap(), 6);
    assert_eq!(tree[4], 9);
    assert_eq!(tree.index_of(&6).unwrap(), 2);
    assert_eq!(tree.index_of(&3).unwrap(), 0);
    assert_eq!(
        tree.get(5),
        Err(TreeError::IndexOutOfRange { index: 5, len: 5 })
    );
    assert_eq!(
        tree.get(-6),
        Err(TreeError::IndexOutOfRange { index: -6, len: 5 })
    );
    assert_eq!(tree.index_of(&5), Err(TreeError::KeyMissing));
}

#[test]
fn test_set_insert_replaces() {
    let mut tree = RbTree::new();
    assert_eq!(tree.insert(5), None);
    assert_eq!(tree.insert(5), Some(5));
    assert_eq!(tree.len(), 1);
    tree.check().unwrap();
}

#[test]
fn test_remove_value() {
    let mut tree = RbTree::new();
    tree.extend([4, 8, 9, 3, 6]);
    assert_eq!(tree.remove(&4), Ok(4));
    tree.check().unwrap();
    assert_eq!(tree.iter().copied().collect::<Vec<_>>(), vec![3, 6, 8, 9]);
    assert_eq!(tree.len(), 4);
    assert_eq!(tree.remove(&4), Err(TreeError::KeyMissing));
    assert_eq!(tree.len(), 4);
    for v in [3, 6, 8, 9] {
        assert_eq!(tree.remove(&v), Ok(v));
        tree.check().unwrap();
    }
    assert!(tree.is_empty());
}

#[test]
fn test_pop_by_rank() {
    let mut tree = RbTree::new();
    tree.extend([4, 8, 9, 3, 6]);
    assert_eq!(tree.pop(0), Ok(3));
    tree.check().unwrap();
    assert_eq!(tree.pop(-1), Ok(9));
    tree.check().unwrap();
    assert_eq!(tree.pop(1), Ok(6));
    tree.check().unwrap();
    assert_eq!(tree.pop_last(), Ok(8));
    assert_eq!(tree.pop(0), Ok(4));
    assert_eq!(
        tree.pop(0),
        Err(TreeError::IndexOutOfRange { index: 0, len: 0 })
    );
    tree.check().unwrap();
}

#[test]
fn test_multiset_first_occurrence_index() {
    let mut tree = RbTree::new();
    tree.extend_multi([3, 2, 1, 1, 2, 3]);
    tree.check().unwrap();
    assert_eq!(tree.len(), 6);
    assert_eq!(
        tree.iter().copied().collect::<Vec<_>>(),
        vec![1, 1, 2, 2, 3, 3]
    );
    assert_eq!(tree.index_of(&1).unwrap(), 0);
    assert_eq!(tree.index_of(&2).unwrap(), 2);
    assert_eq!(tree.index_of(&3).unwrap(), 4);
}

#[test]
fn test_equality_across_insertion_orders() {
    let a: RbTree<i64> = [3, 10, 2, 7, 1, 4, 6, 5, 8, 9].into_iter().collect();
    let b: RbTree<i64> = [4, 8, 9, 3, 6, 1, 2, 10, 5, 7].into_iter().collect();
    assert_eq!(a, b);
    assert_eq!(a.hash_value(), b.hash_value());
    assert_ne!(a.hash_value(), 0);
    assert_eq!(RbTree::<i64>::new().hash_value(), 0);
}

#[test]
fn test_lexicographic_order() {
    let trees: Vec<RbTree<i64>> = [
        vec![1],
        vec![2],
        vec![1, 1],
        vec![1, 2],
        vec![1, 2, 0],
    ]
    .into_iter()
    .map(|values| {
        let mut tree = RbTree::new();
        tree.extend_multi(values);
        tree
    })
    .collect();
    for pair in trees.windows(2) {
        assert!(pair[0] < pair[1]);
        assert!(pair[1] > pair[0]);
        assert_ne!(pair[0], pair[1]);
    }
}

#[test]
fn test_slice() {
    let mut tree = RbTree::new();
    tree.extend([1, 2, 3, 4]);
    let values = |slice: Vec<&i64>| slice.into_iter().copied().collect::<Vec<_>>();
    assert_eq!(values(tree.slice(0, 4, 1).unwrap()), vec![1, 2, 3, 4]);
    assert_eq!(values(tree.slice(1, 3, 1).unwrap()), vec![2, 3]);
    assert_eq!(values(tree.slice(0, 4, 2).unwrap()), vec![1, 3]);
    assert_eq!(values(tree.slice(0, 100, 1).unwrap()), vec![1, 2, 3, 4]);
    assert_eq!(values(tree.slice(3, -5, -1).unwrap()), vec![4, 3, 2, 1]);
    assert_eq!(values(tree.slice(2, 2, 1).unwrap()), Vec::<i64>::new());
    assert_eq!(
        tree.slice(0, 4, 0),
        Err(TreeError::InvalidArgument("slice step cannot be zero"))
    );
    let empty = RbTree::<i64>::new();
    assert_eq!(values(empty.slice(0, 10, 1).unwrap()), Vec::<i64>::new());
}

#[test]
fn test_set_algebra() {
    let a: RbTree<i64> = (0..10).collect();
    let b: RbTree<i64> = (7..20).collect();
    let list = |t: &RbTree<i64>| t.iter().copied().collect::<Vec<_>>();

    let union = a.union(&b);
    union.check().unwrap();
    assert_eq!(list(&union), (0..20).collect::<Vec<_>>());
    assert_eq!(union.union(&union), union);
    assert_eq!(a.union(&b), b.union(&a));

    let intersection = a.intersect(&b);
    intersection.check().unwrap();
    assert_eq!(list(&intersection), vec![7, 8, 9]);
    assert_eq!(a.intersect(&b), b.intersect(&a));

    let difference = a.diff(&b);
    difference.check().unwrap();
    assert_eq!(list(&difference), (0..7).collect::<Vec<_>>());
    assert!(a.diff(&a).is_empty());

    let symmetric = a.symmetric_diff(&b);
    symmetric.check().unwrap();
    assert_eq!(
        list(&symmetric),
        (0..7).chain(10..20).collect::<Vec<_>>()
    );
    assert!(a.symmetric_diff(&a).is_empty());
}

#[test]
fn test_iter_double_ended() {
    let tree: RbTree<i64> = [5, 1, 4, 2, 3].into_iter().collect();
    let mut iter = tree.iter();
    assert_eq!(iter.len(), 5);
    assert_eq!(iter.next(), Some(&1));
    assert_eq!(iter.next_back(), Some(&5));
    assert_eq!(iter.next(), Some(&2));
    assert_eq!(iter.next_back(), Some(&4));
    assert_eq!(iter.next(), Some(&3));
    assert_eq!(iter.next(), None);
    assert_eq!(iter.next_back(), None);
    assert_eq!(
        tree.iter().rev().copied().collect::<Vec<_>>(),
        vec![5, 4, 3, 2, 1]
    );
}

#[test]
fn test_finished_iterator_stays_finished() {
    let tree: RbTree<char> = ['a', 'b', 'c', 'd', 'e'].into_iter().collect();
    let mut iter = tree.iter();
    for _ in 0..tree.len() {
        assert!(iter.next().is_some());
    }
    // Do it again for good measure
    assert!(iter.next().is_none());
    assert!(iter.next().is_none());

    let mut tree = tree;
    let mut cursor = tree.cursor();
    for _ in 0..5 {
        assert!(cursor.next().is_some());
    }
    assert!(cursor.next().is_none());
    assert!(cursor.next().is_none());
    assert!(cursor.delete().is_none());
}

#[test]
fn test_cursor_delete_evens() {
    let mut tree = RbTree::new();
    tree.extend([4, 8, 9, 3, 6]);
    let mut cursor = tree.cursor();
    while let Some(&value) = cursor.next() {
        if value % 2 == 0 {
            assert_eq!(cursor.delete(), Some(value));
        }
    }
    tree.check().unwrap();
    assert_eq!(tree.iter().copied().collect::<Vec<_>>(), vec![3, 9]);
    assert_eq!(tree.len(), 2);
}

#[test]
fn test_cursor_drain_all() {
    let mut tree = RbTree::new();
    tree.extend([4, 8, 9, 3, 6]);
    let mut drained = vec![];
    let mut cursor = tree.cursor();
    while cursor.next().is_some() {
        drained.push(cursor.delete().unwrap());
    }
    assert_eq!(drained, vec![3, 4, 6, 8, 9]);
    assert!(tree.is_empty());
    tree.check().unwrap();

    let mut cursor = tree.cursor();
    assert!(cursor.next().is_none());
    assert!(cursor.delete().is_none());
}

#[test]
fn test_cursor_reverse() {
    let mut tree = RbTree::new();
    tree.extend([4, 8, 9, 3, 6]);
    let mut seen = vec![];
    let mut cursor = tree.cursor_rev();
    while let Some(&value) = cursor.next() {
        seen.push(value);
        if value % 2 == 1 {
            cursor.delete();
        }
    }
    assert_eq!(seen, vec![9, 8, 6, 4, 3]);
    tree.check().unwrap();
    assert_eq!(tree.iter().copied().collect::<Vec<_>>(), vec![4, 6, 8]);
}

#[test]
fn test_display_tree_string() {
    let mut tree = RbTree::new();
    assert_eq!(format!("{}", tree), ".");
    tree.extend([2, 1, 3]);
    assert_eq!(format!("{}", tree), "((.,1:R,.),2:B,(.,3:R,.))");
}

#[test]
fn test_find_first_last() {
    let mut tree = RbTree::new();
    assert_eq!(tree.first(), None);
    assert_eq!(tree.last(), None);
    tree.extend([4, 8, 9, 3, 6]);
    assert_eq!(tree.find(&8), Some(&8));
    assert_eq!(tree.find(&7), None);
    assert!(tree.contains(&3) && !tree.contains(&5));
    assert_eq!(tree.first(), Some(&3));
    assert_eq!(tree.last(), Some(&9));
    tree.clear();
    assert!(tree.is_empty());
    tree.check().unwrap();
    tree.insert(1);
    assert_eq!(tree.len(), 1);
    tree.check().unwrap();
}

#[test]
fn test_check_detects_violations() {
    let mut tree = RbTree::new();
    tree.extend([4, 8, 9, 3, 6]);
    tree.check().unwrap();
    // Force the root red behind the engine's back
    let root = tree.root();
    tree.allocator.set_register(root, Color::Red as u32, COLOR);
    assert!(matches!(
        tree.check(),
        Err(TreeError::InvariantViolated(_))
    ));
    tree.allocator
        .set_register(root, Color::Black as u32, COLOR);
    tree.check().unwrap();
    // Now corrupt a subtree size
    tree.allocator.set_register(root, 42, SIZE);
    assert!(matches!(
        tree.check(),
        Err(TreeError::InvariantViolated(_))
    ));
}

#[test]
fn test_ascending_and_descending_inserts_stay_balanced() {
    let mut tree = RbTree::new();
    for v in 0..256 {
        tree.insert(v);
        tree.check().unwrap();
    }
    for v in (0..256).rev() {
        assert_eq!(tree.remove(&v), Ok(v));
        tree.check().unwrap();
    }
    for v in (0..256).rev() {
        tree.insert(v);
        tree.check().unwrap();
    }
    assert_eq!(tree.len(), 256);
    for (i, value) in tree.iter().enumerate() {
        assert_eq!(*value, i as i32);
    }
}
