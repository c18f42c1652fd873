use serde_json::Value;
use uuid::Uuid;

use crate::EditorError;
use crate::host::{HostId, HostTree};

use super::{ChangeContext, Editor};

/// An external component mounted inside the document. Rendering it is the
/// embedder's job; the editor only tracks where it lives.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub id: Uuid,
    pub element: HostId,
    pub name: String,
    pub content: Value,
}

impl<H: HostTree> Editor<H> {
    /// Inserts a non-editable placeholder element for a component at
    /// `position` and registers it.
    pub fn insert_component(
        &mut self,
        position: usize,
        name: &str,
        content: Value,
    ) -> Result<Uuid, EditorError> {
        let id = Uuid::new_v4();
        let markup = format!(
            r#"<div contenteditable="false" id="editor-{id}"><!-- component {id} --></div>"#
        );
        let nodes =
            self.replace_text_with_html(position, position, &markup, ChangeContext::default())?;
        let element = nodes
            .first()
            .copied()
            .ok_or_else(|| EditorError::UnsupportedSpecification("empty component markup".into()))?;
        self.register_component(id, element, name, content)
    }

    /// Registers an element that is already part of the document.
    pub fn insert_component_into(
        &mut self,
        element: HostId,
        name: &str,
        content: Value,
    ) -> Result<Uuid, EditorError> {
        if !self.host.is_attached(element) {
            return Err(EditorError::DetachedNode(element));
        }
        self.register_component(Uuid::new_v4(), element, name, content)
    }

    /// Unregisters a component and removes its element from the document.
    pub fn remove_component(&mut self, id: Uuid) -> Result<Option<Component>, EditorError> {
        let Some(component) = self.components.remove(&id) else {
            log::warn!("no component registered with id {id}");
            return Ok(None);
        };
        if self.host.is_attached(component.element) && component.element != self.host.root() {
            self.remove_node(component.element, ChangeContext::default())?;
        }
        self.rebuild()?;
        self.update_selection_after_complex_input()?;
        Ok(Some(component))
    }

    pub fn component(&self, id: Uuid) -> Option<&Component> {
        self.components.get(&id)
    }

    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    fn register_component(
        &mut self,
        id: Uuid,
        element: HostId,
        name: &str,
        content: Value,
    ) -> Result<Uuid, EditorError> {
        log::debug!("registering component {name} as {id}");
        self.components.insert(
            id,
            Component {
                id,
                element,
                name: name.to_string(),
                content,
            },
        );
        self.rebuild()?;
        self.update_selection_after_complex_input()?;
        Ok(id)
    }
}
