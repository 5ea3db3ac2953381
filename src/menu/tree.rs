//! Menu tree arena.
//!
//! Nodes live in a fixed-capacity arena and refer to their children by
//! index, so the tree is built once at boot and never reallocates. Each
//! node carries a stable numeric [`ItemId`] used for dispatch.
//!
//! Invariants enforced here:
//! - only `Submenu` nodes have children;
//! - a `Value`/`Toggle` node's value is always inside its range.

use heapless::Vec;

pub type ItemId = u16;

/// Arena capacity.
pub const MAX_NODES: usize = 40;
/// Children per submenu.
pub const MAX_CHILDREN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Action,
    Submenu,
    /// Adjustable number. `step` is the amount one encoder detent moves
    /// it; values snap to multiples of `step` (then clamp to the range).
    Value { min: i32, max: i32, step: i32 },
    /// 0 = off, 1 = on.
    Toggle,
    /// Read-only line with a right-aligned detail string.
    Info(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub id: ItemId,
    pub label: &'static str,
    pub kind: ItemKind,
    value: i32,
    pub enabled: bool,
    children: Vec<usize, MAX_CHILDREN>,
}

impl MenuItem {
    pub fn value(&self) -> i32 {
        self.value
    }

    pub fn is_submenu(&self) -> bool {
        self.kind == ItemKind::Submenu
    }

    pub fn is_editable(&self) -> bool {
        matches!(self.kind, ItemKind::Value { .. } | ItemKind::Toggle)
    }

    pub fn children(&self) -> &[usize] {
        &self.children
    }

    fn range(&self) -> (i32, i32) {
        match self.kind {
            ItemKind::Value { min, max, .. } => (min, max),
            ItemKind::Toggle => (0, 1),
            _ => (0, 0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeError {
    ArenaFull,
    TooManyChildren,
    /// Tried to add a child under a non-submenu node.
    NotASubmenu,
    UnknownNode,
}

#[derive(Debug, Clone)]
pub struct MenuTree {
    nodes: Vec<MenuItem, MAX_NODES>,
}

impl MenuTree {
    /// New tree whose root is a submenu titled `title`.
    pub fn new(id: ItemId, title: &'static str) -> Self {
        let mut nodes = Vec::new();
        // Capacity is non-zero, so the root always fits.
        let _ = nodes.push(MenuItem {
            id,
            label: title,
            kind: ItemKind::Submenu,
            value: 0,
            enabled: true,
            children: Vec::new(),
        });
        Self { nodes }
    }

    pub const ROOT: usize = 0;

    /// Append a node under `parent`. Returns the new node's index.
    pub fn add(
        &mut self,
        parent: usize,
        id: ItemId,
        label: &'static str,
        kind: ItemKind,
    ) -> Result<usize, TreeError> {
        let parent_node = self.nodes.get(parent).ok_or(TreeError::UnknownNode)?;
        if !parent_node.is_submenu() {
            return Err(TreeError::NotASubmenu);
        }
        if parent_node.children.is_full() {
            return Err(TreeError::TooManyChildren);
        }
        let index = self.nodes.len();
        let value = match kind {
            ItemKind::Value { min, .. } => min,
            _ => 0,
        };
        self.nodes
            .push(MenuItem {
                id,
                label,
                kind,
                value,
                enabled: true,
                children: Vec::new(),
            })
            .map_err(|_| TreeError::ArenaFull)?;
        self.nodes[parent]
            .children
            .push(index)
            .map_err(|_| TreeError::TooManyChildren)?;
        Ok(index)
    }

    pub fn node(&self, index: usize) -> Option<&MenuItem> {
        self.nodes.get(index)
    }

    pub fn find(&self, id: ItemId) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    pub fn child_count(&self, index: usize) -> usize {
        self.node(index).map_or(0, |n| n.children.len())
    }

    /// Index of the `nth` child of `index`.
    pub fn child(&self, index: usize, nth: usize) -> Option<usize> {
        self.node(index).and_then(|n| n.children.get(nth).copied())
    }

    /// Set a node's value, clamped into its range. Returns the stored value.
    pub fn set_value(&mut self, index: usize, value: i32) -> Option<i32> {
        let node = self.nodes.get_mut(index)?;
        let (min, max) = node.range();
        node.value = value.clamp(min, max);
        Some(node.value)
    }

    pub fn set_value_by_id(&mut self, id: ItemId, value: i32) -> Option<i32> {
        let index = self.find(id)?;
        self.set_value(index, value)
    }

    /// Move a value by `detents` steps, snapping to the step grid.
    /// Toggles flip on any odd movement. Returns the new value.
    pub fn adjust(&mut self, index: usize, detents: i32) -> Option<i32> {
        let node = self.nodes.get(index)?;
        let next = match node.kind {
            ItemKind::Value { step, .. } => {
                let step = step.max(1);
                let raw = node.value + detents * step;
                // Nearest multiple of `step`, ties rounded up (-15 becomes -10).
                (raw + step / 2).div_euclid(step) * step
            }
            ItemKind::Toggle if detents % 2 != 0 => 1 - node.value,
            _ => return Some(node.value),
        };
        self.set_value(index, next)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> (MenuTree, usize) {
        let mut t = MenuTree::new(1, "Main");
        let sub = t.add(MenuTree::ROOT, 10, "Sub", ItemKind::Submenu).unwrap();
        let val = t
            .add(sub, 11, "Level", ItemKind::Value { min: 0, max: 255, step: 10 })
            .unwrap();
        (t, val)
    }

    #[test]
    fn only_submenus_take_children() {
        let (mut t, val) = small();
        assert_eq!(
            t.add(val, 99, "x", ItemKind::Action),
            Err(TreeError::NotASubmenu)
        );
    }

    #[test]
    fn values_clamp_to_range() {
        let (mut t, val) = small();
        assert_eq!(t.set_value(val, 400), Some(255));
        assert_eq!(t.set_value(val, -3), Some(0));
    }

    #[test]
    fn brightness_snaps_to_tens() {
        let (mut t, val) = small();
        t.set_value(val, 255);
        assert_eq!(t.adjust(val, -1), Some(250));
        assert_eq!(t.adjust(val, -1), Some(240));
        assert_eq!(t.adjust(val, 3), Some(255));
        t.set_value(val, 3);
        assert_eq!(t.adjust(val, -1), Some(0));
    }

    #[test]
    fn negative_ties_round_up() {
        let mut t = MenuTree::new(1, "Main");
        let offset = t
            .add(MenuTree::ROOT, 2, "Offset", ItemKind::Value { min: -50, max: 50, step: 10 })
            .unwrap();
        t.set_value(offset, -25);
        assert_eq!(t.adjust(offset, 1), Some(-10));
        t.set_value(offset, -24);
        assert_eq!(t.adjust(offset, -1), Some(-30));
    }

    #[test]
    fn toggle_flips() {
        let mut t = MenuTree::new(1, "Main");
        let tog = t.add(MenuTree::ROOT, 2, "Sound", ItemKind::Toggle).unwrap();
        assert_eq!(t.adjust(tog, 1), Some(1));
        assert_eq!(t.adjust(tog, -1), Some(0));
        assert_eq!(t.adjust(tog, 2), Some(0));
    }

    #[test]
    fn child_limit_enforced() {
        let mut t = MenuTree::new(1, "Main");
        for i in 0..MAX_CHILDREN {
            t.add(MenuTree::ROOT, 100 + i as u16, "x", ItemKind::Action)
                .unwrap();
        }
        assert_eq!(
            t.add(MenuTree::ROOT, 200, "y", ItemKind::Action),
            Err(TreeError::TooManyChildren)
        );
    }
}
