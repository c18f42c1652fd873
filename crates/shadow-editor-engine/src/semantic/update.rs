use std::collections::HashMap;

use crate::EditorError;
use crate::editing::{ChangeContext, Editor};
use crate::host::{HostId, HostKind, HostTree, markup, split_chars};
use crate::shadow::{NodeId, NodeKind, ShadowTree};

use super::selection::{NodeSetSelection, RangeSelection, Selection};
use super::spec::{AttrKey, ForceContext, RemoveValue, UpdateSpec};

/// How an update restructures the selection before attributes change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Move the selection under a new container.
    Wrap,
    /// Put a new container inside each selected node.
    Nest,
    /// Change the selected nodes themselves.
    Update,
}

impl From<ForceContext> for Strategy {
    fn from(force: ForceContext) -> Self {
        match force {
            ForceContext::Wrap => Strategy::Wrap,
            ForceContext::Nest => Strategy::Nest,
        }
    }
}

/// A node-set selection is complex when it cannot be reduced to one
/// contiguous block.
///
/// Walking up from the members one level at a time, while more than one
/// distinct parent remains every child of every such parent must already be
/// selected (or be a parent accepted at a lower level).
pub fn is_complex_selection(tree: &ShadowTree, selection: &NodeSetSelection) -> bool {
    if selection.nodes.len() <= 1 {
        return false;
    }
    let Some(mut selected) = selection
        .nodes
        .iter()
        .map(|&host| tree.lookup(host))
        .collect::<Option<Vec<NodeId>>>()
    else {
        return true;
    };

    let mut level = distinct_parents(tree, &selected);
    loop {
        match level.len() {
            0 => return true,
            1 => return false,
            _ => {}
        }
        for &parent in &level {
            let covered = tree.node(parent).children.iter().all(|child| {
                let node = tree.node(*child);
                node.kind == NodeKind::Other || node.ignorable || selected.contains(child)
            });
            if !covered {
                return true;
            }
        }
        selected.extend(level.iter().copied());
        level = distinct_parents(tree, &level);
    }
}

fn distinct_parents(tree: &ShadowTree, nodes: &[NodeId]) -> Vec<NodeId> {
    let mut parents = Vec::new();
    for parent in nodes.iter().filter_map(|&id| tree.parent(id)) {
        if !parents.contains(&parent) {
            parents.push(parent);
        }
    }
    parents
}

/// Picks the restructuring strategy for `spec` applied to `selection`.
pub fn choose_strategy<H: HostTree>(
    selection: &Selection,
    spec: &UpdateSpec,
    host: &H,
) -> Result<Strategy, EditorError> {
    let nodes = match selection {
        Selection::Range(_) => return Ok(Strategy::Wrap),
        Selection::Nodes(nodes) => nodes,
    };

    // Content-only updates have no attributes to place in a new context.
    if spec.has_content_override() && !spec.has_attribute_changes() {
        return Ok(Strategy::Update);
    }
    if spec.remove.is_some() {
        return Ok(Strategy::Update);
    }
    let first = nodes.nodes.first().copied();

    if let Some(add) = &spec.add {
        if nodes.nodes.len() > 1 {
            return Ok(add.force_new_context.map_or(Strategy::Nest, Strategy::from));
        }
        if let Some(force) = add.force_new_context {
            return Ok(force.into());
        }
        let sets_resource = spec
            .set
            .as_ref()
            .is_some_and(|s| s.attributes.contains_key(&AttrKey::Resource));
        if sets_resource {
            return Ok(Strategy::Update);
        }
        let introduces_resource = add.attributes.contains_key(&AttrKey::About);
        return match first {
            Some(member) => wrap_or_nest(host, member, introduces_resource),
            None => Err(EditorError::UnsupportedSelection("empty selection".into())),
        };
    }

    if let Some(set) = &spec.set {
        let identifies_resource = set.attributes.contains_key(&AttrKey::About)
            || set.attributes.contains_key(&AttrKey::Resource);
        if identifies_resource || nodes.nodes.len() > 1 {
            return Ok(Strategy::Update);
        }
        return match first {
            Some(member) => wrap_or_nest(host, member, false),
            None => Err(EditorError::UnsupportedSelection("empty selection".into())),
        };
    }

    Err(EditorError::UnsupportedSpecification(
        "an update needs remove, add or set".into(),
    ))
}

/// Single-member inspection of the attributes already present.
fn wrap_or_nest<H: HostTree>(
    host: &H,
    member: HostId,
    introduces_resource: bool,
) -> Result<Strategy, EditorError> {
    let literal = host.has_attribute(member, AttrKey::Content.name())
        || host.has_attribute(member, AttrKey::Datatype.name());
    if literal {
        return Err(EditorError::UnsupportedSpecification(
            "node already carries a literal content marker".into(),
        ));
    }
    if host.has_attribute(member, AttrKey::Property.name()) && introduces_resource {
        return Ok(Strategy::Nest);
    }
    Ok(Strategy::Wrap)
}

impl<H: HostTree> Editor<H> {
    /// Applies `spec` to `selection` and returns the nodes whose attributes
    /// were changed.
    ///
    /// Every precondition (selection shape, strategy, content markup) is
    /// checked before the host is touched.
    pub fn update(
        &mut self,
        selection: &Selection,
        spec: &UpdateSpec,
    ) -> Result<Vec<HostId>, EditorError> {
        if let Some(desc) = &spec.desc {
            log::debug!("update: {desc}");
        }
        if spec.is_empty() {
            return Err(reject(EditorError::UnsupportedSpecification(
                "update changes nothing".into(),
            )));
        }
        if selection.is_empty() {
            return Err(reject(EditorError::UnsupportedSelection("empty selection".into())));
        }
        self.rebuild()?;

        if let Selection::Nodes(set) = selection {
            for &node in &set.nodes {
                if !self.host.is_attached(node) {
                    return Err(reject(EditorError::DetachedNode(node)));
                }
                self.shadow_for(node)?;
            }
            if is_complex_selection(&self.tree, set) {
                return Err(reject(EditorError::UnsupportedSelection(
                    "selection cannot be reduced to one contiguous block".into(),
                )));
            }
        }

        let strategy = choose_strategy(selection, spec, &self.host).map_err(reject)?;
        log::debug!("update strategy: {strategy:?}");

        let content = spec.has_content_override() && strategy == Strategy::Update;
        if spec.has_content_override() && !content {
            log::warn!("content overrides are not combined with {strategy:?}, skipping them");
        }
        if content {
            if let Some(inner) = spec.set.as_ref().and_then(|s| s.inner_markup.as_deref()) {
                markup::parse(inner)?;
            }
        }

        let targets = match (strategy, selection) {
            (_, Selection::Range(range)) => vec![self.wrap_range(range)?],
            (Strategy::Wrap, Selection::Nodes(set)) => {
                if set.nodes.contains(&self.host.root()) {
                    return Err(reject(EditorError::RootNode(self.host.root())));
                }
                self.wrap_each(&set.nodes)
            }
            (Strategy::Nest, Selection::Nodes(set)) => self.nest_each(&set.nodes),
            (Strategy::Update, Selection::Nodes(set)) => set.nodes.clone(),
        };

        for &target in &targets {
            self.apply_attributes(target, spec);
            if content {
                self.apply_inner_content(target, spec)?;
            }
        }

        self.rebuild()?;
        self.set_current_position(self.selection.anchor, false)?;
        self.listener.element_update();
        self.schedule_diff(ChangeContext::default());
        Ok(targets)
    }

    /// Aligns the range edges with node boundaries and moves the minimal
    /// covering node set under one new wrapper.
    fn wrap_range(&mut self, range: &RangeSelection) -> Result<HostId, EditorError> {
        let mut fragments = range.fragments.clone();
        fragments.sort_by_key(|f| (f.start, f.end));
        fragments.retain(|f| f.start < f.end);
        let (Some(start), Some(end)) = (
            fragments.first().map(|f| f.start),
            fragments.iter().map(|f| f.end).max(),
        ) else {
            return Err(EditorError::UnsupportedSelection("empty selection".into()));
        };

        for fragment in &fragments {
            let id = self.shadow_for(fragment.node)?;
            self.isolate_text(id, fragment.start, fragment.end);
        }
        self.rebuild()?;

        let order: HashMap<NodeId, usize> = self
            .tree
            .preorder(self.tree.root())
            .into_iter()
            .enumerate()
            .map(|(index, id)| (id, index))
            .collect();
        let root = self.tree.root();
        let mut covering: Vec<NodeId> = Vec::new();
        for fragment in &fragments {
            let mut id = self.shadow_for(fragment.node)?;
            while let Some(parent) = self.tree.parent(id) {
                let p = self.tree.node(parent);
                if parent == root || p.start < start || p.end > end {
                    break;
                }
                id = parent;
            }
            if !covering.contains(&id) {
                covering.push(id);
            }
        }
        let mut covering: Vec<NodeId> = covering
            .iter()
            .copied()
            .filter(|&id| {
                !covering
                    .iter()
                    .any(|&other| other != id && self.tree.is_descendant(id, other))
            })
            .collect();
        covering.sort_by_key(|id| order.get(id).copied().unwrap_or(usize::MAX));

        let hosts: Vec<HostId> = covering.iter().map(|&id| self.tree.node(id).host).collect();
        let Some(&first) = hosts.first() else {
            return Err(EditorError::UnsupportedSelection("nothing to wrap".into()));
        };
        let parent = self
            .host
            .parent(first)
            .ok_or(EditorError::DetachedNode(first))?;
        let wrapper = self.host.create_element(&self.options.wrap_tag);
        self.host.insert_before(parent, wrapper, Some(first));
        for node in hosts {
            self.host.insert_before(wrapper, node, None);
        }
        Ok(wrapper)
    }

    /// Splits a text node so that one text node covers exactly
    /// `[start, end)`.
    fn isolate_text(&mut self, id: NodeId, start: usize, end: usize) {
        let node = self.tree.node(id);
        if node.kind != NodeKind::Text {
            return;
        }
        let host = node.host;
        let from = start.max(node.start) - node.start;
        let to = end.min(node.end) - node.start;
        let text = node.text.clone();
        let Some(parent) = self.host.parent(host) else {
            return;
        };

        let (before, rest) = split_chars(&text, from);
        let (infix, after) = split_chars(rest, to - from);
        if !before.is_empty() {
            let prefix = self.host.create_text(before);
            self.host.insert_before(parent, prefix, Some(host));
        }
        if !after.is_empty() {
            let suffix = self.host.create_text(after);
            let next = self.host.next_sibling(host);
            self.host.insert_before(parent, suffix, next);
        }
        self.host.set_text(host, infix);
    }

    fn wrap_each(&mut self, nodes: &[HostId]) -> Vec<HostId> {
        let mut wrappers = Vec::new();
        for &node in nodes {
            let Some(parent) = self.host.parent(node) else {
                continue;
            };
            let wrapper = self.host.create_element(&self.options.wrap_tag);
            self.host.insert_before(parent, wrapper, Some(node));
            self.host.insert_before(wrapper, node, None);
            wrappers.push(wrapper);
        }
        wrappers
    }

    fn nest_each(&mut self, nodes: &[HostId]) -> Vec<HostId> {
        let mut containers = Vec::new();
        for &node in nodes {
            if self.host.kind(node) != Some(HostKind::Element) {
                log::warn!("cannot nest under non-element node {node:?}");
                continue;
            }
            let children = self.host.children(node).to_vec();
            let container = self.host.create_element(&self.options.nest_tag);
            self.host.insert_before(node, container, children.first().copied());
            for child in children {
                self.host.insert_before(container, child, None);
            }
            containers.push(container);
        }
        containers
    }

    /// `remove` before `add` before `set`, per attribute.
    fn apply_attributes(&mut self, node: HostId, spec: &UpdateSpec) {
        if self.host.kind(node) != Some(HostKind::Element) {
            if spec.has_attribute_changes() {
                log::warn!("cannot set attributes on non-element node {node:?}");
            }
            return;
        }
        for key in AttrKey::ALL {
            let name = key.name();
            if let Some(value) = spec.remove.as_ref().and_then(|r| r.attributes.get(&key)) {
                self.remove_tokens(node, name, value);
            }
            if let Some(values) = spec.add.as_ref().and_then(|a| a.attributes.get(&key)) {
                self.add_tokens(node, name, values);
            }
            if let Some(value) = spec.set.as_ref().and_then(|s| s.attributes.get(&key)) {
                self.host.set_attribute(node, name, value);
            }
        }
    }

    fn remove_tokens(&mut self, node: HostId, name: &str, value: &RemoveValue) {
        if matches!(value, RemoveValue::All) {
            self.host.remove_attribute(node, name);
            return;
        }
        let Some(current) = self.host.attribute(node, name) else {
            return;
        };
        let kept: Vec<&str> = current
            .split_whitespace()
            .filter(|token| !value.matches(token))
            .collect();
        let kept = kept.join(" ");
        if kept.is_empty() {
            self.host.remove_attribute(node, name);
        } else {
            self.host.set_attribute(node, name, &kept);
        }
    }

    fn add_tokens(&mut self, node: HostId, name: &str, values: &[String]) {
        let mut tokens: Vec<String> = self
            .host
            .attribute(node, name)
            .map(|current| current.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        for token in values.iter().flat_map(|v| v.split_whitespace()) {
            if !tokens.iter().any(|t| t == token) {
                tokens.push(token.to_string());
            }
        }
        self.host.set_attribute(node, name, &tokens.join(" "));
    }

    fn apply_inner_content(&mut self, node: HostId, spec: &UpdateSpec) -> Result<(), EditorError> {
        if self.host.kind(node) != Some(HostKind::Element) {
            log::warn!("cannot replace the content of non-element node {node:?}");
            return Ok(());
        }
        if spec.remove.as_ref().is_some_and(|r| r.inner_content) {
            self.host.set_inner_markup(node, "")?;
        }
        if let Some(inner) = spec.set.as_ref().and_then(|s| s.inner_markup.as_deref()) {
            self.host.set_inner_markup(node, inner)?;
        }
        Ok(())
    }
}

fn reject(err: EditorError) -> EditorError {
    log::warn!("update rejected: {err}");
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::EditorOptions;
    use crate::host::MemoryHost;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn editor(markup: &str) -> Editor<MemoryHost> {
        Editor::new(
            MemoryHost::from_markup(markup).unwrap(),
            EditorOptions::default(),
        )
        .unwrap()
    }

    fn at(editor: &Editor<MemoryHost>, path: &[usize]) -> HostId {
        path.iter().fold(editor.host().root(), |node, &index| {
            editor.host().children(node)[index]
        })
    }

    #[test]
    fn three_leaves_under_two_parents_is_complex() {
        let editor = editor("<div><p><b>1</b><b>2</b></p><p><b>3</b><b>4</b></p></div>");
        let leaves = [
            at(&editor, &[0, 0, 1]),
            at(&editor, &[0, 1, 0]),
            at(&editor, &[0, 1, 1]),
        ];
        let set = NodeSetSelection {
            nodes: leaves.to_vec(),
        };
        assert!(is_complex_selection(editor.tree(), &set));
    }

    #[rstest]
    #[case::single_member(vec![vec![0, 0, 0]], false)]
    #[case::siblings(vec![vec![0, 0, 0], vec![0, 0, 1]], false)]
    #[case::full_cousins(vec![vec![0, 0, 0], vec![0, 0, 1], vec![0, 1, 0], vec![0, 1, 1]], false)]
    #[case::partial_cousins(vec![vec![0, 0, 1], vec![0, 1, 0]], true)]
    fn complexity(#[case] paths: Vec<Vec<usize>>, #[case] expected: bool) {
        let editor = editor("<div><p><b>1</b><b>2</b></p><p><b>3</b><b>4</b></p></div>");
        let nodes = paths.iter().map(|p| at(&editor, p)).collect();
        let set = NodeSetSelection { nodes };
        assert_eq!(is_complex_selection(editor.tree(), &set), expected);
    }

    #[test]
    fn complex_selection_is_rejected_untouched() {
        let mut editor = editor("<div><p><b>1</b><b>2</b></p><p><b>3</b><b>4</b></p></div>");
        let before = editor.markup();
        let selection = editor.select_nodes(&[
            at(&editor, &[0, 0, 1]),
            at(&editor, &[0, 1, 0]),
            at(&editor, &[0, 1, 1]),
        ]);
        let spec = UpdateSpec::new().add(AttrKey::Typeof, "ex:T");
        assert!(matches!(
            editor.update(&selection, &spec),
            Err(EditorError::UnsupportedSelection(_))
        ));
        assert_eq!(editor.markup(), before);
    }

    #[test]
    fn token_removal_then_addition() {
        let mut editor = editor(r#"<span property="a b">x</span>"#);
        let span = at(&editor, &[0]);
        let selection = editor.select_nodes(&[span]);
        let spec = UpdateSpec::new()
            .remove(AttrKey::Property, RemoveValue::Literal("a".into()))
            .add(AttrKey::Property, "c");

        let targets = editor.update(&selection, &spec).unwrap();
        assert_eq!(targets, vec![span]);
        assert_eq!(editor.host().attribute(span, "property"), Some("b c"));
    }

    #[test]
    fn removing_every_token_drops_the_attribute() {
        let mut editor = editor(r#"<span typeof="ex:A ex:B" about="x">x</span>"#);
        let span = at(&editor, &[0]);
        let selection = editor.select_nodes(&[span]);
        let pattern = regex::Regex::new("^ex:").unwrap();
        let spec = UpdateSpec::new()
            .remove(AttrKey::Typeof, RemoveValue::Pattern(pattern))
            .remove(AttrKey::About, RemoveValue::All);

        editor.update(&selection, &spec).unwrap();
        assert_eq!(editor.markup(), "<span>x</span>");
    }

    #[test]
    fn range_selection_is_wrapped() {
        let mut editor = editor("<p>hello brave world</p>");
        let selection = editor.select_range(6, 11).unwrap();
        let spec = UpdateSpec::new().add(AttrKey::Property, "ex:adjective");

        let targets = editor.update(&selection, &spec).unwrap();
        assert_eq!(targets.len(), 1);
        insta::assert_snapshot!(
            editor.markup(),
            @r#"<p>hello <div property="ex:adjective">brave</div> world</p>"#
        );
        assert_eq!(editor.text(), "hello brave world");
    }

    #[test]
    fn content_is_dropped_when_members_are_nested() {
        let mut editor = editor("<p>a</p><p>b</p>");
        let selection = editor.select_nodes(&[at(&editor, &[0]), at(&editor, &[1])]);
        let spec = UpdateSpec::new()
            .add(AttrKey::Typeof, "ex:T")
            .set_inner_markup("<i>z</i>");

        assert_eq!(
            choose_strategy(&selection, &spec, editor.host()).unwrap(),
            Strategy::Nest
        );
        editor.update(&selection, &spec).unwrap();
        assert_eq!(
            editor.markup(),
            r#"<p><span typeof="ex:T">a</span></p><p><span typeof="ex:T">b</span></p>"#
        );
    }

    #[test]
    fn content_is_dropped_when_the_range_is_wrapped() {
        let mut editor = editor("<p>hello brave world</p>");
        let selection = editor.select_range(6, 11).unwrap();
        let spec = UpdateSpec::new()
            .set(AttrKey::Typeof, "ex:T")
            .set_inner_markup("<i>z</i>");

        editor.update(&selection, &spec).unwrap();
        assert_eq!(
            editor.markup(),
            r#"<p>hello <div typeof="ex:T">brave</div> world</p>"#
        );
    }

    #[test]
    fn range_wrap_lifts_fully_covered_parents() {
        let mut editor = editor("<p>ab</p><p>cd</p><p>ef</p>");
        let selection = editor.select_range(1, 4).unwrap();
        editor
            .update(&selection, &UpdateSpec::new().set(AttrKey::Typeof, "ex:T"))
            .unwrap();
        insta::assert_snapshot!(
            editor.markup(),
            @r#"<p>a<div typeof="ex:T">b<p>cd</p></div></p><p>ef</p>"#
        );
    }

    #[test]
    fn multiple_members_nest_by_default() {
        let mut editor = editor("<p>a<b>x</b></p><p>b</p>");
        let selection = editor.select_nodes(&[at(&editor, &[0]), at(&editor, &[1])]);
        editor
            .update(&selection, &UpdateSpec::new().add(AttrKey::Typeof, "ex:T"))
            .unwrap();
        assert_eq!(
            editor.markup(),
            r#"<p><span typeof="ex:T">a<b>x</b></span></p><p><span typeof="ex:T">b</span></p>"#
        );
    }

    #[test]
    fn forced_wrap_wraps_each_member() {
        let mut editor = editor("<p>a</p><p>b</p>");
        let selection = editor.select_nodes(&[at(&editor, &[0]), at(&editor, &[1])]);
        let spec = UpdateSpec::new()
            .add(AttrKey::Typeof, "ex:T")
            .force_new_context(ForceContext::Wrap);
        editor.update(&selection, &spec).unwrap();
        assert_eq!(
            editor.markup(),
            r#"<div typeof="ex:T"><p>a</p></div><div typeof="ex:T"><p>b</p></div>"#
        );
    }

    #[rstest]
    #[case::plain(r#"<p>x</p>"#, Strategy::Wrap)]
    #[case::property(r#"<p property="ex:p">x</p>"#, Strategy::Wrap)]
    fn single_member_add(#[case] markup: &str, #[case] expected: Strategy) {
        let editor = editor(markup);
        let selection = editor.select_nodes(&[at(&editor, &[0])]);
        let spec = UpdateSpec::new().add(AttrKey::Typeof, "ex:T");
        assert_eq!(choose_strategy(&selection, &spec, editor.host()).unwrap(), expected);
    }

    #[test]
    fn new_resource_under_a_property_nests() {
        let editor = editor(r#"<p property="ex:p">x</p>"#);
        let selection = editor.select_nodes(&[at(&editor, &[0])]);
        let spec = UpdateSpec::new().add(AttrKey::About, "ex:thing");
        assert_eq!(
            choose_strategy(&selection, &spec, editor.host()).unwrap(),
            Strategy::Nest
        );
    }

    #[test]
    fn literal_content_marker_is_unsupported() {
        let mut editor = editor(r#"<p property="ex:p" content="42">x</p>"#);
        let before = editor.markup();
        let selection = editor.select_nodes(&[at(&editor, &[0])]);
        let spec = UpdateSpec::new().add(AttrKey::Typeof, "ex:T");
        assert!(matches!(
            editor.update(&selection, &spec),
            Err(EditorError::UnsupportedSpecification(_))
        ));
        assert_eq!(editor.markup(), before);
    }

    #[test]
    fn set_resource_updates_in_place() {
        let mut editor = editor("<p>x</p>");
        let p = at(&editor, &[0]);
        let selection = editor.select_nodes(&[p]);
        let spec = UpdateSpec::new()
            .add(AttrKey::Typeof, "ex:T")
            .set(AttrKey::Resource, "ex:r");
        editor.update(&selection, &spec).unwrap();
        assert_eq!(editor.markup(), r#"<p typeof="ex:T" resource="ex:r">x</p>"#);
    }

    #[test]
    fn content_override_updates_in_place() {
        let mut editor = editor("<p>old</p>");
        let selection = editor.select_nodes(&[at(&editor, &[0])]);
        let spec = UpdateSpec::new().set_inner_markup("<i>new</i>");
        editor.update(&selection, &spec).unwrap();
        assert_eq!(editor.markup(), "<p><i>new</i></p>");
        assert_eq!(editor.text(), "new");
    }

    #[test]
    fn empty_inputs_are_rejected() {
        let mut editor = editor("<p>x</p>");
        let p = at(&editor, &[0]);
        let nothing = editor.select_nodes(&[]);
        let spec = UpdateSpec::new().set(AttrKey::Typeof, "ex:T");
        assert!(matches!(
            editor.update(&nothing, &spec),
            Err(EditorError::UnsupportedSelection(_))
        ));

        let selection = editor.select_nodes(&[p]);
        assert!(matches!(
            editor.update(&selection, &UpdateSpec::new()),
            Err(EditorError::UnsupportedSpecification(_))
        ));
        assert_eq!(editor.markup(), "<p>x</p>");
    }
}
