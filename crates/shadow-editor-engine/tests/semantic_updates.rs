use pretty_assertions::assert_eq;
use serde_json::json;
use shadow_editor_engine::{
    Editor, EditorError, EditorEvent, EditorOptions, EventQueue, HostId, HostTree, MemoryHost,
    UpdateSpec,
};

fn editor(markup: &str) -> (Editor<MemoryHost>, EventQueue) {
    let events = EventQueue::new();
    let editor = Editor::new(
        MemoryHost::from_markup(markup).unwrap(),
        EditorOptions::default(),
    )
    .unwrap()
    .with_listener(events.clone());
    (editor, events)
}

fn child(editor: &Editor<MemoryHost>, path: &[usize]) -> HostId {
    path.iter().fold(editor.host().root(), |node, &i| {
        editor.host().children(node)[i]
    })
}

#[test]
fn json_property_update_replaces_tokens() {
    let (mut editor, events) = editor(r#"<p><span property="a b">x</span></p>"#);
    let span = child(&editor, &[0, 0]);
    let selection = editor.select_nodes(&[span]);
    let spec = UpdateSpec::from_json(&json!({
        "remove": { "property": "a" },
        "add": { "property": "c" },
        "desc": "swap a for c",
    }))
    .unwrap();

    editor.update(&selection, &spec).unwrap();
    assert_eq!(editor.host().attribute(span, "property"), Some("b c"));
    assert!(events.drain().contains(&EditorEvent::ElementUpdated));
}

#[test]
fn complex_selection_leaves_the_document_alone() {
    let markup = "<div><p><b>1</b><b>2</b></p><p><b>3</b><b>4</b></p></div>";
    let (mut editor, events) = editor(markup);
    let selection = editor.select_nodes(&[
        child(&editor, &[0, 0, 1]),
        child(&editor, &[0, 1, 0]),
        child(&editor, &[0, 1, 1]),
    ]);
    let spec = UpdateSpec::from_json(&json!({ "add": { "typeof": "ex:Thing" } })).unwrap();

    let result = editor.update(&selection, &spec);
    assert!(matches!(result, Err(EditorError::UnsupportedSelection(_))));
    assert_eq!(editor.markup(), markup);
    assert!(!events.drain().contains(&EditorEvent::ElementUpdated));
}

#[test]
fn range_update_wraps_the_selected_text() {
    let (mut editor, _) = editor("<p>The quick fox</p>");
    let selection = editor.select_range(4, 9).unwrap();
    let spec = UpdateSpec::from_json(&json!({
        "add": { "typeof": ["ex:Speed", "ex:Adjective"] },
        "set": { "about": "ex:quick" },
    }))
    .unwrap();

    editor.update(&selection, &spec).unwrap();
    insta::assert_snapshot!(
        editor.markup(),
        @r#"<p>The <div about="ex:quick" typeof="ex:Speed ex:Adjective">quick</div> fox</p>"#
    );
    assert_eq!(editor.text(), "The quick fox");
}

#[test]
fn inner_markup_override_from_json() {
    let (mut editor, _) = editor("<p>old</p><p>keep</p>");
    let selection = editor.select_nodes(&[child(&editor, &[0])]);
    let spec = UpdateSpec::from_json(&json!({
        "remove": { "innerHTML": true },
        "set": { "innerHTML": "<em>new</em>" },
    }))
    .unwrap();

    editor.update(&selection, &spec).unwrap();
    assert_eq!(editor.markup(), "<p><em>new</em></p><p>keep</p>");
}

#[test]
fn malformed_inner_markup_aborts_before_any_change() {
    let (mut editor, _) = editor("<p>old</p>");
    let selection = editor.select_nodes(&[child(&editor, &[0])]);
    let spec = UpdateSpec::new()
        .set(shadow_editor_engine::AttrKey::About, "ex:old")
        .set_inner_markup("<em>new</i>");

    assert!(matches!(
        editor.update(&selection, &spec),
        Err(EditorError::Markup(_))
    ));
    assert_eq!(editor.markup(), "<p>old</p>");
}
