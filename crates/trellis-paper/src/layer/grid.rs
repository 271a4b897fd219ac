use trellis_geom::fmt::fmt_num;

use crate::dom::{Dom, NodeId};

use super::{Layer, names};

const PATTERN_ID: &str = "trellis-grid-pattern";

/// Background grid drawn as a dot pattern covering the paper.
#[derive(Debug)]
pub struct GridLayer {
    group: NodeId,
}

impl GridLayer {
    pub fn new(group: NodeId) -> Self {
        Self { group }
    }

    /// Redraws the grid; an empty group when `enabled` is false.
    pub fn draw(&mut self, dom: &mut Dom, grid_size: f64, width: f64, height: f64, enabled: bool) {
        dom.clear_children(self.group);
        if !enabled || grid_size <= 1.0 {
            return;
        }

        let size = fmt_num(grid_size);
        let defs = dom.create_element("defs");
        let pattern = dom.create_element("pattern");
        dom.set_attr(pattern, "id", PATTERN_ID);
        dom.set_attr(pattern, "width", &size);
        dom.set_attr(pattern, "height", &size);
        dom.set_attr(pattern, "patternUnits", "userSpaceOnUse");
        let dot = dom.create_element("rect");
        dom.set_attr(dot, "width", "1");
        dom.set_attr(dot, "height", "1");
        dom.set_attr(dot, "fill", "#AAAAAA");
        dom.append_child(pattern, dot);
        dom.append_child(defs, pattern);
        dom.append_child(self.group, defs);

        let fill = dom.create_element("rect");
        dom.set_attr(fill, "width", &fmt_num(width));
        dom.set_attr(fill, "height", &fmt_num(height));
        dom.set_attr(fill, "fill", &format!("url(#{PATTERN_ID})"));
        dom.append_child(self.group, fill);
    }
}

impl Layer for GridLayer {
    fn id(&self) -> &str {
        names::GRID
    }

    fn group(&self) -> NodeId {
        self.group
    }

    fn reset(&mut self, _dom: &mut Dom) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_is_drawn_only_when_enabled() {
        let mut dom = Dom::new("svg");
        let group = dom.create_element("g");
        let mut grid = GridLayer::new(group);
        grid.draw(&mut dom, 10.0, 100.0, 50.0, false);
        assert!(dom.children(group).is_empty());

        grid.draw(&mut dom, 10.0, 100.0, 50.0, true);
        let svg = dom.to_svg(group);
        assert!(svg.contains(r#"<pattern id="trellis-grid-pattern" width="10" height="10""#));
        assert!(svg.contains(r#"<rect width="100" height="50" fill="url(#trellis-grid-pattern)"/>"#));
    }
}
