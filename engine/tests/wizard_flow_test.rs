//! Integration tests for the wizard.
//!
//! A three-stage import wizard is driven the way a user would: clicking the
//! invitation, picking a file in the dialog and confirming it.

use std::sync::Arc;

use webui_engine::document::Document;
use webui_engine::element::Element;
use webui_engine::engine::Engine;
use webui_engine::testing::ScriptedTransport;

const DOCUMENT: &str = r#"
<webapp>
  <ui_style name="s">
    <UI_CONCEPT><NAV_PANEL_BUTTON_STYLE>back</NAV_PANEL_BUTTON_STYLE></UI_CONCEPT>
    <UI_FILE_DIALOG><NAV_BUTTON_STYLE>nav</NAV_BUTTON_STYLE></UI_FILE_DIALOG>
    <UI_INVITATION/>
    <UI_TABLE/>
    <UI_FORM><SUBMIT_STYLE>submit</SUBMIT_STYLE></UI_FORM>
    <UI_DATE_RANGE/>
  </ui_style>
  <ui_layout name="import">
    <UI_CONCEPT name="import">
      <UI_INVITATION name="hello"><TITLE>Import</TITLE><TEXT>Click to start</TEXT></UI_INVITATION>
      <STAGE_2><UI_FILE_DIALOG name="src"><TITLE>Source</TITLE></UI_FILE_DIALOG></STAGE_2>
      <STAGE_3>
        <UI_TABLE name="preview">
          <TITLE>Preview</TITLE>
          <UI_FORM name="filter"><UI_DATE_RANGE name="period"/></UI_FORM>
        </UI_TABLE>
      </STAGE_3>
    </UI_CONCEPT>
  </ui_layout>
  <ui_setup>
    <UI_STYLE use="s"/>
    <UI_LAYOUT use="import"/>
    <UI_OUTPUT use="main"/>
  </ui_setup>
</webapp>
"#;

const LISTING: &str = r#"{
    "type": "file_dialog", "name": "import/src", "cur_dir": "in",
    "files": {
        "..": {"is_directory": true},
        "orders.csv": {"is_directory": false, "size": 4096}
    }
}"#;

const PREVIEW: &str = r#"{
    "type": "table", "name": "import/preview",
    "meta": [{"name": "Col"}],
    "data": [["v1"]]
}"#;

fn button(root: &Element, label: &str) -> Element {
    root.find_by_tag("button")
        .into_iter()
        .find(|b| b.text().as_deref() == Some(label))
        .unwrap_or_else(|| panic!("no {label} button"))
}

/// Walks the wizard from the invitation to the preview and back.
#[tokio::test]
async fn test_import_wizard_flow() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.respond("import/src", LISTING);
    transport.respond("import/preview", PREVIEW);
    let engine = Engine::builder(Document::parse(DOCUMENT).unwrap(), transport.clone()).build();
    let main = Element::new("div");
    engine.add_mount_point("main", main.clone());

    engine.construct_layout().unwrap();
    let registry = engine.registry();
    let hello = registry.instance("import/hello").unwrap();
    let dialog = registry.instance("import/src").unwrap();
    let preview = registry.instance("import/preview").unwrap();

    assert!(hello.element().is_visible());
    assert!(!dialog.element().is_visible());
    assert!(main.text_content().contains("Import"));
    assert!(main.text_content().contains("Click to start"));

    // Stage 1 -> 2
    assert!(hello.element().click());
    assert!(dialog.element().is_visible());
    assert!(!hello.element().is_visible());
    dialog.sync_with_backend().unwrap().settled().await;

    let open = button(&main, "Open");
    assert_eq!(open.class().as_deref(), Some("nav"));
    let back = button(&main, "Close");
    assert!(!back.is_visible());

    let row = dialog
        .element()
        .find_by_tag("tr")
        .into_iter()
        .find(|tr| tr.text_content().starts_with("orders.csv"))
        .expect("listing should show orders.csv");
    assert!(row.click());
    assert!(main.text_content().contains("Source: orders.csv"));

    // Stage 2 -> 3
    assert!(open.click());
    assert!(preview.element().is_visible());
    preview.sync_with_backend().unwrap().settled().await;
    dialog.sync_with_backend().unwrap().settled().await;

    assert!(transport
        .requests_for("import/src")
        .contains(&"webui/import/src?action=open&file=in/orders.csv".to_string()));
    assert!(back.is_visible());
    assert!(main.find_by_tag("button").iter().all(|b| b.text().as_deref() != Some("Open")));
    let cells: Vec<String> = preview
        .element()
        .find_by_tag("td")
        .iter()
        .map(|td| td.text().unwrap_or_default())
        .collect();
    assert_eq!(cells, vec!["v1"]);

    // The preview's filter moved to the form area and renders once.
    assert_eq!(main.find_by_tag("input").len(), 2);
    let submits: Vec<Element> = main
        .find_by_tag("button")
        .into_iter()
        .filter(|b| b.class().as_deref() == Some("submit"))
        .collect();
    assert_eq!(submits.len(), 1);
    assert!(preview.element().find_by_tag("input").is_empty());

    // Back to the dialog
    assert!(back.click());
    assert!(dialog.element().is_visible());
    assert!(!preview.element().is_visible());
}

/// Cancelling the dialog returns to the invitation.
#[tokio::test]
async fn test_cancel_goes_back() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.respond("import/src", LISTING);
    let engine = Engine::builder(Document::parse(DOCUMENT).unwrap(), transport).build();
    let main = Element::new("div");
    engine.add_mount_point("main", main.clone());
    engine.construct_layout().unwrap();

    let hello = engine.registry().instance("import/hello").unwrap();
    assert!(hello.element().click());

    assert!(button(&main, "Cancel").click());
    assert!(hello.element().is_visible());
    assert!(main.text_content().contains("Import"));
}
