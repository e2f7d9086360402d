//! Project-content routing end to end (scenario S6) and the frontmatter
//! preservation invariant (FM-1).

use std::sync::Arc;

use switchboard::content::{
    ProjectContentRouter, StructuredReturn, SubmissionKind, CURRENT_STATE_SECTION, PLANS_SECTION,
};
use switchboard::frontmatter;
use switchboard::state::{ActiveEditor, CustomValue, EditorFrontmatter};
use switchboard::tools::{PathResolution, RecordingTools};

const PLAN: &str = "---\ntype: project\ntitle: Plant Monitor\nfiles: ['./components.md', './schematic.md']\n---\n# Plant Monitor Plan\n\n## Current State\n\n<!-- Content will be added here -->\n\n## Recommendations and Plans\n\n<!-- Content will be added here -->\n";

fn project_editor() -> ActiveEditor {
    let mut frontmatter = EditorFrontmatter {
        doc_type: "project".into(),
        title: "Plant Monitor".into(),
        ..Default::default()
    };
    frontmatter.custom_fields.insert(
        "files".into(),
        CustomValue::List(vec!["./components.md".into(), "./schematic.md".into()]),
    );
    ActiveEditor {
        is_editable: true,
        filename: "plan.md".into(),
        canonical_path: "/users/u1/projects/plant-monitor/plan.md".into(),
        language: "markdown".into(),
        content: PLAN.into(),
        frontmatter,
        cursor_offset: None,
    }
}

fn tools_with_plan() -> Arc<RecordingTools> {
    let tools = Arc::new(RecordingTools::default());
    tools.set_path_resolution(
        "/users/u1/projects/plant-monitor/plan.md",
        PathResolution {
            document_id: "doc-plan".into(),
            filename: "plan.md".into(),
            resolved_path: "/users/u1/projects/plant-monitor/plan.md".into(),
        },
    );
    tools.set_doc_content("doc-plan", PLAN);
    tools
}

/// **Scenario S6**: the current-state sentence routes to the plan's
/// "Current State" section and the recommendation to "Recommendations and
/// Plans"; the placeholder is replaced, not appended; the plan's frontmatter
/// key set is unchanged; with the plan open in the editor both land as
/// operations-based proposals.
#[tokio::test]
async fn s6_multi_section_plan_update() {
    let tools = tools_with_plan();
    let router = ProjectContentRouter::new(tools.clone());
    let editor = project_editor();

    let outcome = router
        .route_response(
            "Currently using an Arduino Uno for the controller. \
             I recommend switching to an ESP32 for the wireless requirement.",
            &StructuredReturn::default(),
            &editor,
            "electronics_agent",
            "u1",
        )
        .await
        .unwrap();

    assert_eq!(outcome.updates.len(), 2);
    let current = &outcome.updates[0];
    assert_eq!(current.section, CURRENT_STATE_SECTION);
    assert!(current.replaced, "placeholder must be replaced, not appended");
    assert_eq!(current.submission, SubmissionKind::Proposal);
    let plans = &outcome.updates[1];
    assert_eq!(plans.section, PLANS_SECTION);
    assert!(plans.replaced);

    let proposals = tools.proposals();
    assert_eq!(proposals.len(), 2);
    let current_doc = &proposals[0].operations[0].text;
    assert!(current_doc.contains("Currently using an Arduino Uno"));
    let plans_doc = &proposals[1].operations[0].text;
    assert!(plans_doc.contains("Switching to an ESP32"));
    assert!(
        !plans_doc.contains("Content will be added"),
        "both placeholders replaced in the final content"
    );
    assert!(
        frontmatter::field_keys(plans_doc).is_superset(&frontmatter::field_keys(PLAN)),
        "frontmatter key set unchanged"
    );
}

/// **Scenario FM-1**: a racy append that drops the frontmatter block is
/// detected by the pre/post diff and repaired with a second update; the
/// final key set is a superset of the original.
#[tokio::test]
async fn fm1_append_repairs_lost_frontmatter() {
    let tools = Arc::new(RecordingTools::default());
    tools.set_doc_content("doc-components", "---\ntype: reference\ntitle: Components\n---\n# Components\n\nexisting notes\n");
    tools.set_drop_frontmatter_on_append(true);
    let router = ProjectContentRouter::new(tools.clone());

    router
        .append_preserving_frontmatter("doc-components", "u1", "## New Parts\n\nESP32 module\n")
        .await
        .unwrap();

    let final_content = tools.doc_content("doc-components").unwrap();
    let keys = frontmatter::field_keys(&final_content);
    assert!(keys.contains("type"));
    assert!(keys.contains("title"));
    assert!(final_content.contains("ESP32 module"));

    // Two writes: the append plus the repair.
    let updates = tools.content_updates();
    assert_eq!(updates.len(), 2);
    assert!(updates[0].2, "first write is the append");
    assert!(!updates[1].2, "repair write is a full update");
}

/// **Scenario**: a clean append needs no repair write.
#[tokio::test]
async fn clean_append_single_write() {
    let tools = Arc::new(RecordingTools::default());
    tools.set_doc_content("doc-x", "---\ntype: reference\n---\nbody\n");
    let router = ProjectContentRouter::new(tools.clone());

    router
        .append_preserving_frontmatter("doc-x", "u1", "more\n")
        .await
        .unwrap();

    assert_eq!(tools.content_updates().len(), 1);
}
