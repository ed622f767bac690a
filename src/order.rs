//! Order classes so a parent is always emitted before its subclasses.
//!
//! Some targets (Python among them) cannot forward-declare a superclass, so
//! emitters consume classes in this order. The inheritance forest is rebuilt
//! under a synthetic root, then walked pre-order: each class is immediately
//! followed by its own subclasses, keeping sibling subtrees grouped instead
//! of settling for an arbitrary topological order.

use crate::model::{Model, ProtocolClass};

/// One node of the inheritance forest. The synthetic root holds no class.
struct TreeNode {
    class_index: Option<usize>,
    children: Vec<TreeNode>,
}

impl TreeNode {
    fn new(class_index: Option<usize>) -> TreeNode {
        TreeNode {
            class_index,
            children: Vec::new(),
        }
    }

    fn find_mut(&mut self, name: &str, classes: &[ProtocolClass]) -> Option<&mut TreeNode> {
        if let Some(index) = self.class_index {
            if classes[index].name == name {
                return Some(self);
            }
        }
        for child in &mut self.children {
            if let Some(found) = child.find_mut(name, classes) {
                return Some(found);
            }
        }
        None
    }

    fn preorder(&self, out: &mut Vec<usize>) {
        if let Some(index) = self.class_index {
            out.push(index);
        }
        for child in &self.children {
            child.preorder(out);
        }
    }
}

/// Classes ordered so every class appears after its parent. Parentless
/// classes keep their declaration order at the top level.
pub fn order_classes(model: &Model) -> Vec<&ProtocolClass> {
    let classes = model.classes();
    let mut root = TreeNode::new(None);
    let mut unplaced: Vec<usize> = (0..classes.len()).collect();

    // Repeatedly place every class whose parent is already in the forest,
    // until nothing moves. A class whose parent never appears is a
    // validation error and is simply left out here.
    loop {
        let before = unplaced.len();
        unplaced.retain(|&index| {
            let parent_node = match classes[index].parent.as_deref() {
                None => Some(&mut root),
                Some(parent) => root.find_mut(parent, classes),
            };
            match parent_node {
                Some(node) => {
                    node.children.push(TreeNode::new(Some(index)));
                    false
                }
                None => true,
            }
        });
        if unplaced.is_empty() || unplaced.len() == before {
            break;
        }
    }

    let mut order = Vec::new();
    root.preorder(&mut order);
    order.into_iter().map(|index| &classes[index]).collect()
}
