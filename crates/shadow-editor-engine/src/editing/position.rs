use crate::EditorError;
use crate::host::HostTree;
use crate::shadow::{NodeId, NodeKind};

use super::Editor;

impl<H: HostTree> Editor<H> {
    /// Text node whose range contains `position`.
    ///
    /// Starts from the current node when it covers the position, otherwise
    /// from the root. Where no text exists at the position a placeholder text
    /// node is created, so the host may change.
    pub fn find_suitable_node_for_position(
        &mut self,
        position: usize,
    ) -> Result<NodeId, EditorError> {
        let position = self.clamp_position(position);
        let start = match self.current_shadow() {
            Some(current) if self.tree.node(current).contains_position(position) => current,
            _ => self.tree.root(),
        };
        self.find_suitable_node_in(start, position)
    }

    fn find_suitable_node_in(
        &mut self,
        mut id: NodeId,
        position: usize,
    ) -> Result<NodeId, EditorError> {
        loop {
            let node = self.tree.node(id);
            let host = node.host;
            match node.kind {
                NodeKind::Text if !node.ignorable => return Ok(id),
                NodeKind::Text => {
                    id = node.parent.unwrap_or(self.tree.root());
                }
                NodeKind::Other => return Err(EditorError::UnclassifiableNode(host)),
                NodeKind::Tag if node.void => {
                    let parent = self
                        .host
                        .parent(host)
                        .ok_or(EditorError::DetachedNode(host))?;
                    let lone_break = node.is_tag("br") && self.host.children(parent).len() == 1;
                    let next = self.host.next_sibling(host);
                    let placeholder = if lone_break {
                        self.insert_placeholder(parent, Some(host), Some(host))?
                    } else {
                        self.insert_placeholder(parent, next, None)?
                    };
                    return self.shadow_for(placeholder);
                }
                NodeKind::Tag => {
                    if let [only] = node.children[..] {
                        let child = self.tree.node(only);
                        if child.is_tag("br") {
                            log::debug!("suitable node: tag with only a break as child");
                            let br = child.host;
                            let placeholder = self.insert_placeholder(host, Some(br), Some(br))?;
                            return self.shadow_for(placeholder);
                        }
                    }

                    let deepest = self
                        .tree
                        .filter(id, |n| {
                            n.contains_position(position)
                                && !n.void
                                && !n.ignorable
                                && n.kind != NodeKind::Other
                        })
                        .last()
                        .copied();
                    match deepest {
                        Some(next) if next != id => {
                            log::debug!("suitable node: descending into deepest matching node");
                            id = next;
                        }
                        _ => {
                            log::debug!("creating placeholder text node in {host:?}");
                            let placeholder = self.insert_placeholder(host, None, None)?;
                            return self.shadow_for(placeholder);
                        }
                    }
                }
            }
        }
    }
}
