//! Menu navigation state machine.
//!
//! Tracks where the user is in the [`MenuTree`]: the current submenu, a
//! bounded stack of ancestors, the highlighted row, the scroll window and
//! whether the highlighted Value/Toggle item is being edited.
//!
//! Invariants (whenever the current node has children):
//! `selected < child_count` and
//! `scroll <= selected <= scroll + viewport - 1`.

use heapless::Vec;

use super::tree::{ItemId, ItemKind, MenuTree};

/// Ancestor stack depth.
pub const MAX_DEPTH: usize = 10;
/// Height of one menu row in pixels.
pub const ITEM_HEIGHT: i32 = 12;
/// Pixels reserved for the title line.
pub const TITLE_HEIGHT: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuNav {
    Up,
    Down,
    Select,
    Back,
}

/// What a navigation step did, for the caller to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    /// An Action leaf was selected.
    Activated(ItemId),
    /// A Value/Toggle item changed while editing.
    ValueChanged(ItemId, i32),
    EnteredSubmenu(ItemId),
    WentBack,
    EditStarted(ItemId),
    EditFinished(ItemId),
}

#[derive(Debug, Clone)]
pub struct MenuNavigator {
    current: usize,
    stack: Vec<usize, MAX_DEPTH>,
    selected: usize,
    scroll: usize,
    viewport: usize,
    editing: bool,
}

impl MenuNavigator {
    /// Start at the root with a viewport sized for `display_height`.
    pub fn new(display_height: i32) -> Self {
        let rows = ((display_height - TITLE_HEIGHT) / ITEM_HEIGHT).max(1);
        Self {
            current: MenuTree::ROOT,
            stack: Vec::new(),
            selected: 0,
            scroll: 0,
            viewport: rows as usize,
            editing: false,
        }
    }

    pub fn navigate(&mut self, nav: MenuNav, tree: &mut MenuTree) -> Option<MenuAction> {
        let count = tree.child_count(self.current);
        match nav {
            MenuNav::Up => {
                self.finish_edit();
                if self.selected > 0 {
                    self.selected -= 1;
                    self.update_scroll();
                }
                None
            }
            MenuNav::Down => {
                self.finish_edit();
                if self.selected + 1 < count {
                    self.selected += 1;
                    self.update_scroll();
                }
                None
            }
            MenuNav::Select => self.select(tree),
            MenuNav::Back => self.back(),
        }
    }

    /// Encoder rotation: adjusts the edited value, otherwise moves the
    /// highlight one row per detent.
    pub fn rotate(&mut self, detents: i32, tree: &mut MenuTree) -> Option<MenuAction> {
        if detents == 0 {
            return None;
        }
        if self.editing {
            let index = tree.child(self.current, self.selected)?;
            let before = tree.node(index)?.value();
            let after = tree.adjust(index, detents)?;
            let id = tree.node(index)?.id;
            return (after != before).then_some(MenuAction::ValueChanged(id, after));
        }
        let nav = if detents > 0 { MenuNav::Down } else { MenuNav::Up };
        for _ in 0..detents.unsigned_abs() {
            self.navigate(nav, tree);
        }
        None
    }

    fn select(&mut self, tree: &mut MenuTree) -> Option<MenuAction> {
        let index = tree.child(self.current, self.selected)?;
        let node = tree.node(index)?;
        if !node.enabled {
            return None;
        }
        let id = node.id;
        match node.kind {
            ItemKind::Submenu => {
                if self.stack.push(self.current).is_err() {
                    log::warn!("MENU: depth limit reached, not entering '{}'", node.label);
                    return None;
                }
                self.current = index;
                self.reset_cursor();
                Some(MenuAction::EnteredSubmenu(id))
            }
            ItemKind::Value { .. } | ItemKind::Toggle => {
                self.editing = !self.editing;
                Some(if self.editing {
                    MenuAction::EditStarted(id)
                } else {
                    MenuAction::EditFinished(id)
                })
            }
            ItemKind::Action => Some(MenuAction::Activated(id)),
            ItemKind::Info(_) => None,
        }
    }

    fn back(&mut self) -> Option<MenuAction> {
        self.finish_edit();
        let parent = self.stack.pop()?;
        self.current = parent;
        self.reset_cursor();
        Some(MenuAction::WentBack)
    }

    fn finish_edit(&mut self) {
        self.editing = false;
    }

    fn reset_cursor(&mut self) {
        self.selected = 0;
        self.scroll = 0;
        self.editing = false;
    }

    fn update_scroll(&mut self) {
        if self.selected < self.scroll {
            self.scroll = self.selected;
        } else if self.selected >= self.scroll + self.viewport {
            self.scroll = self.selected + 1 - self.viewport;
        }
    }

    pub fn return_to_root(&mut self) {
        self.current = MenuTree::ROOT;
        self.stack.clear();
        self.reset_cursor();
    }

    pub fn is_at_root(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn current_node(&self) -> usize {
        self.current
    }

    pub fn current_title<'t>(&self, tree: &'t MenuTree) -> &'t str {
        tree.node(self.current).map_or("", |n| n.label)
    }

    /// Arena index of the highlighted row.
    pub fn selected_item(&self, tree: &MenuTree) -> Option<usize> {
        tree.child(self.current, self.selected)
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll
    }

    pub fn viewport(&self) -> usize {
        self.viewport
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> MenuTree {
        let mut t = MenuTree::new(1, "Main");
        for i in 0..7 {
            t.add(MenuTree::ROOT, 100 + i, "item", ItemKind::Action).unwrap();
        }
        let sub = t.add(MenuTree::ROOT, 10, "Settings", ItemKind::Submenu).unwrap();
        t.add(sub, 11, "Level", ItemKind::Value { min: 1, max: 10, step: 1 })
            .unwrap();
        t.add(sub, 12, "Sound", ItemKind::Toggle).unwrap();
        t.add(sub, 13, "About", ItemKind::Info("v1")).unwrap();
        t
    }

    #[test]
    fn viewport_from_display_height() {
        assert_eq!(MenuNavigator::new(64).viewport(), 4);
    }

    #[test]
    fn scrolls_to_keep_selection_visible() {
        let mut t = tree();
        let mut nav = MenuNavigator::new(64);
        for _ in 0..5 {
            nav.navigate(MenuNav::Down, &mut t);
        }
        assert_eq!(nav.selected_index(), 5);
        assert_eq!(nav.scroll_offset(), 2);
        for _ in 0..20 {
            nav.navigate(MenuNav::Down, &mut t);
        }
        assert_eq!(nav.selected_index(), 7);
        for _ in 0..20 {
            nav.navigate(MenuNav::Up, &mut t);
        }
        assert_eq!((nav.selected_index(), nav.scroll_offset()), (0, 0));
    }

    #[test]
    fn select_enters_submenu_and_back_returns() {
        let mut t = tree();
        let mut nav = MenuNavigator::new(64);
        nav.rotate(7, &mut t);
        assert_eq!(nav.navigate(MenuNav::Select, &mut t), Some(MenuAction::EnteredSubmenu(10)));
        assert_eq!(nav.current_title(&t), "Settings");
        assert!(!nav.is_at_root());
        assert_eq!(nav.navigate(MenuNav::Back, &mut t), Some(MenuAction::WentBack));
        assert!(nav.is_at_root());
        assert_eq!(nav.selected_index(), 0);
        assert_eq!(nav.navigate(MenuNav::Back, &mut t), None);
    }

    #[test]
    fn edit_mode_adjusts_value() {
        let mut t = tree();
        let mut nav = MenuNavigator::new(64);
        nav.rotate(7, &mut t);
        nav.navigate(MenuNav::Select, &mut t);
        assert_eq!(nav.navigate(MenuNav::Select, &mut t), Some(MenuAction::EditStarted(11)));
        assert!(nav.is_editing());
        assert_eq!(nav.rotate(3, &mut t), Some(MenuAction::ValueChanged(11, 4)));
        // Clamped at max: no change reported.
        nav.rotate(20, &mut t);
        assert_eq!(nav.rotate(1, &mut t), None);
        assert_eq!(nav.navigate(MenuNav::Select, &mut t), Some(MenuAction::EditFinished(11)));
        // Rotation moves the highlight again.
        nav.rotate(1, &mut t);
        assert_eq!(nav.selected_index(), 1);
    }

    #[test]
    fn leaving_node_cancels_edit() {
        let mut t = tree();
        let mut nav = MenuNavigator::new(64);
        nav.rotate(7, &mut t);
        nav.navigate(MenuNav::Select, &mut t);
        nav.navigate(MenuNav::Select, &mut t);
        nav.navigate(MenuNav::Back, &mut t);
        assert!(!nav.is_editing());
    }

    #[test]
    fn action_and_info_rows() {
        let mut t = tree();
        let mut nav = MenuNavigator::new(64);
        assert_eq!(nav.navigate(MenuNav::Select, &mut t), Some(MenuAction::Activated(100)));
        nav.rotate(7, &mut t);
        nav.navigate(MenuNav::Select, &mut t);
        nav.rotate(2, &mut t);
        assert_eq!(nav.navigate(MenuNav::Select, &mut t), None);
    }

    #[test]
    fn return_to_root_resets_everything() {
        let mut t = tree();
        let mut nav = MenuNavigator::new(64);
        nav.rotate(7, &mut t);
        nav.navigate(MenuNav::Select, &mut t);
        nav.rotate(1, &mut t);
        nav.return_to_root();
        assert!(nav.is_at_root());
        assert_eq!(nav.selected_index(), 0);
        assert_eq!(nav.current_node(), MenuTree::ROOT);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn nav_op() -> impl Strategy<Value = MenuNav> {
        prop_oneof![
            Just(MenuNav::Up),
            Just(MenuNav::Down),
            Just(MenuNav::Select),
            Just(MenuNav::Back),
        ]
    }

    proptest! {
        #[test]
        fn selection_and_scroll_stay_in_bounds(
            ops in proptest::collection::vec(nav_op(), 0..200),
            height in 22i32..128,
        ) {
            let mut t = crate::menu::build_main_menu(&crate::config::DeviceSettings::default(), false);
            let mut nav = MenuNavigator::new(height);
            for op in ops {
                nav.navigate(op, &mut t);
                let count = t.child_count(nav.current_node());
                prop_assert!(nav.selected_index() < count.max(1));
                if count > 0 {
                    prop_assert!(nav.scroll_offset() <= nav.selected_index());
                    prop_assert!(nav.selected_index() < nav.scroll_offset() + nav.viewport());
                }
            }
        }
    }
}
