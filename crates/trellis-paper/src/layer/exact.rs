use crate::dom::{Dom, NodeId};

use super::{Layer, MODEL_ID_ATTR};

/// Layer whose cell order is restored by an insertion sort over the existing children.
///
/// Inserting only appends; the order is fixed by the next [`Layer::sort`].
#[derive(Debug)]
pub struct ExactLayer {
    id: String,
    group: NodeId,
}

impl ExactLayer {
    pub fn new(id: &str, group: NodeId) -> Self {
        Self {
            id: id.to_string(),
            group,
        }
    }
}

impl Layer for ExactLayer {
    fn id(&self) -> &str {
        &self.id
    }

    fn group(&self) -> NodeId {
        self.group
    }

    fn holds_cells(&self) -> bool {
        true
    }

    fn insert_cell_view(&mut self, dom: &mut Dom, node: NodeId, _z: i64) {
        if dom.parent(node) == Some(self.group) {
            return;
        }
        dom.append_child(self.group, node);
    }

    fn sort(&mut self, dom: &mut Dom, z_of: &dyn Fn(&str) -> Option<i64>) {
        let mut nodes: Vec<(NodeId, i64)> = dom
            .children(self.group)
            .iter()
            .filter_map(|n| {
                let id = dom.attr(*n, MODEL_ID_ATTR)?;
                Some((*n, z_of(id).unwrap_or(0)))
            })
            .collect();

        // Stable insertion sort; each displacement is a single DOM move in front of the node
        // currently holding the target slot.
        for i in 1..nodes.len() {
            let (node, z) = nodes[i];
            let mut j = i;
            while j > 0 && nodes[j - 1].1 > z {
                j -= 1;
            }
            if j == i {
                continue;
            }
            let reference = nodes[j].0;
            dom.insert_before(self.group, node, Some(reference));
            nodes[j..=i].rotate_right(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(dom: &mut Dom, id: &str) -> NodeId {
        let n = dom.create_element("g");
        dom.set_attr(n, MODEL_ID_ATTR, id);
        n
    }

    #[test]
    fn sort_orders_by_z_and_keeps_ties_stable() {
        let mut dom = Dom::new("svg");
        let group = dom.create_element("g");
        let mut layer = ExactLayer::new("cells", group);
        let ids = ["c", "a", "d", "b"];
        let nodes: Vec<NodeId> = ids.iter().map(|id| node(&mut dom, id)).collect();
        for n in &nodes {
            layer.insert_cell_view(&mut dom, *n, 0);
        }

        let z = |id: &str| match id {
            "a" => Some(1),
            "b" => Some(1),
            "c" => Some(3),
            "d" => Some(0),
            _ => None,
        };
        layer.sort(&mut dom, &z);
        let order: Vec<&str> = dom
            .children(group)
            .iter()
            .map(|n| dom.attr(*n, MODEL_ID_ATTR).unwrap())
            .collect();
        assert_eq!(order, vec!["d", "a", "b", "c"]);

        let rev = dom.revision();
        layer.sort(&mut dom, &z);
        assert_eq!(dom.revision(), rev);
    }

    #[test]
    fn insert_does_not_move_existing_children() {
        let mut dom = Dom::new("svg");
        let group = dom.create_element("g");
        let mut layer = ExactLayer::new("cells", group);
        let a = node(&mut dom, "a");
        let b = node(&mut dom, "b");
        layer.insert_cell_view(&mut dom, a, 5);
        layer.insert_cell_view(&mut dom, b, 0);
        layer.insert_cell_view(&mut dom, a, 5);
        assert_eq!(dom.children(group), &[a, b]);
    }
}
