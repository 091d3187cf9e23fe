use crate::error::TaintError;
use crate::host::{HostStore, Tracked};
use crate::interop::callbacks::{get_item, should_be_tainted};

pub const MIN_DEPTH: i32 = 4;

#[derive(Debug)]
pub struct TreeNode {
    pub left: Option<Box<TreeNode>>,
    pub right: Option<Box<TreeNode>>,
    /// Cleared by [`delete_tree`] once a tainted item was checked.
    pub item: Option<Tracked<i64>>,
}

fn new_tree_node(store: &mut HostStore, level: i32, left: Option<Box<TreeNode>>, right: Option<Box<TreeNode>>) -> Box<TreeNode> {
    let item = get_item(store, Tracked::new(level)).map(i64::from);
    Box::new(TreeNode {
        left,
        right,
        item: Some(item),
    })
}

/// Builds a complete tree; the root sits at level `depth`, leaves at level 0.
pub fn bottom_up_tree(store: &mut HostStore, depth: i32) -> Box<TreeNode> {
    if depth > 0 {
        let left = bottom_up_tree(store, depth - 1);
        let right = bottom_up_tree(store, depth - 1);
        new_tree_node(store, depth, Some(left), Some(right))
    } else {
        new_tree_node(store, depth, None, None)
    }
}

/// Sum of all items; tainted as soon as one contributing item is.
pub fn item_check(tree: &TreeNode) -> Tracked<i64> {
    let mut result = Tracked::new(0i64);
    if let Some(item) = tree.item {
        result += item;
    }
    if let (Some(left), Some(right)) = (&tree.left, &tree.right) {
        result += item_check(left);
        result += item_check(right);
    }
    result
}

/// Walks the tree bottom-up, asserting each item's taint against the level
/// it is expected to sit at. `depth` must be the level of `tree`.
pub fn delete_tree(store: &HostStore, depth: i32, tree: &mut TreeNode) -> Result<(), TaintError> {
    if let (Some(left), Some(right)) = (tree.left.as_deref_mut(), tree.right.as_deref_mut()) {
        delete_tree(store, depth - 1, left)?;
        delete_tree(store, depth - 1, right)?;
    }

    let item = tree.item.unwrap_or_default();
    if should_be_tainted(depth) {
        store.assert_is_tainted(&item)?;
        tree.item = None;
    } else {
        store.assert_is_not_tainted(&item)?;
    }
    Ok(())
}

pub fn benchmark(store: &mut HostStore, n: i32) -> Result<i64, TaintError> {
    let max_depth = if MIN_DEPTH + 2 > n { MIN_DEPTH + 2 } else { n };
    let stretch_depth = max_depth + 1;

    let mut result = Tracked::new(0i64);

    let mut stretch_tree = bottom_up_tree(store, stretch_depth);
    let check = item_check(&stretch_tree);
    store.assert_is_tainted(&check)?;
    result += check;
    delete_tree(store, stretch_depth, &mut stretch_tree)?;
    drop(stretch_tree);

    let mut long_lived_tree = bottom_up_tree(store, max_depth);

    let mut depth = MIN_DEPTH;
    while depth <= max_depth {
        let iterations = 1i64 << (max_depth - depth + MIN_DEPTH);
        let mut check = Tracked::new(0i64);

        for _ in 0..iterations {
            let mut temp_tree = bottom_up_tree(store, depth);
            let cur_check = item_check(&temp_tree);
            if depth >= 0b11 {
                store.assert_is_tainted(&cur_check)?;
            } else {
                store.assert_is_not_tainted(&cur_check)?;
            }
            check += cur_check;
            delete_tree(store, depth, &mut temp_tree)?;
        }

        if iterations > 0 && depth >= 0b11 {
            store.assert_is_tainted(&check)?;
        } else {
            store.assert_is_not_tainted(&check)?;
        }
        result += check;
        depth += 2;
    }

    result += item_check(&long_lived_tree);
    delete_tree(store, max_depth, &mut long_lived_tree)?;

    store.assert_is_tainted(&result)?;
    Ok(store.sanitize(result).into_inner())
}
