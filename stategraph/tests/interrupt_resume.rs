//! Interrupt-before semantics: halt, checkpoint, resume.

use std::sync::Arc;

use async_trait::async_trait;

use stategraph::{
    AgentError, MemorySaver, Next, Node, RunnableConfig, StateGraph, StreamEvent, END, START,
};
use tokio_stream::StreamExt;

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
struct ApprovalState {
    visited: Vec<String>,
    approved: bool,
    note: String,
}

struct Step(&'static str);

#[async_trait]
impl Node<ApprovalState> for Step {
    fn id(&self) -> &str {
        self.0
    }
    async fn run(&self, mut state: ApprovalState) -> Result<(ApprovalState, Next), AgentError> {
        state.visited.push(self.0.to_string());
        Ok((state, Next::Continue))
    }
}

fn build_graph(
    saver: Arc<MemorySaver<ApprovalState>>,
) -> stategraph::CompiledStateGraph<ApprovalState> {
    let mut graph = StateGraph::<ApprovalState>::new();
    graph.add_node("gather", Arc::new(Step("gather")));
    graph.add_node("web_search", Arc::new(Step("web_search")));
    graph.add_node("synthesize", Arc::new(Step("synthesize")));
    graph.add_edge(START, "gather");
    graph.add_edge("gather", "web_search");
    graph.add_edge("web_search", "synthesize");
    graph.add_edge("synthesize", END);
    graph.interrupt_before(["web_search"]);
    graph.compile_with_checkpointer(saver).unwrap()
}

/// **Scenario**: the engine halts *before* executing an interrupt-before
/// node; the checkpoint carries `next = [node]` and the node did not run.
#[tokio::test]
async fn interrupt_before_halts_without_executing() {
    let saver = Arc::new(MemorySaver::new());
    let graph = build_graph(saver);
    let config = RunnableConfig::for_thread("u1:c1");

    let err = graph
        .invoke(Some(ApprovalState::default()), Some(config.clone()))
        .await
        .unwrap_err();
    assert!(err.is_interrupt());

    let snapshot = graph.get_state(&config).await.unwrap().unwrap();
    assert_eq!(snapshot.next, vec!["web_search".to_string()]);
    assert_eq!(snapshot.values.visited, vec!["gather"]);
}

/// **Scenario**: resuming with new input merges it into the stored values
/// and executes the interrupted node first, then runs to END.
#[tokio::test]
async fn resume_with_input_executes_interrupted_node() {
    let saver = Arc::new(MemorySaver::new());
    let graph = build_graph(saver);
    let config = RunnableConfig::for_thread("u1:c1");

    let _ = graph
        .invoke(Some(ApprovalState::default()), Some(config.clone()))
        .await
        .unwrap_err();

    // New turn: the replace-updater makes the input the resumed state, so a
    // caller resumes with the snapshot values plus its own edits.
    let snapshot = graph.get_state(&config).await.unwrap().unwrap();
    let mut resumed = snapshot.values.clone();
    resumed.approved = true;
    let out = graph
        .invoke(Some(resumed), Some(config.clone()))
        .await
        .unwrap();

    assert_eq!(out.visited, vec!["gather", "web_search", "synthesize"]);
    assert!(out.approved);

    let final_snapshot = graph.get_state(&config).await.unwrap().unwrap();
    assert!(final_snapshot.next.is_empty());
}

/// **Scenario**: approval-only resume: update_state mutates the stored
/// values without advancing; invoke(None) then continues from the interrupt
/// with every other field intact.
#[tokio::test]
async fn approval_only_resume_preserves_state() {
    let saver = Arc::new(MemorySaver::new());
    let graph = build_graph(saver);
    let config = RunnableConfig::for_thread("u2:c9");

    let _ = graph
        .invoke(
            Some(ApprovalState {
                note: "original question".into(),
                ..Default::default()
            }),
            Some(config.clone()),
        )
        .await
        .unwrap_err();

    graph
        .update_state(&config, |s| s.approved = true)
        .await
        .unwrap();

    // The updated checkpoint keeps the pending next set.
    let snapshot = graph.get_state(&config).await.unwrap().unwrap();
    assert!(snapshot.is_interrupted());
    assert!(snapshot.values.approved);

    let out = graph.invoke(None, Some(config.clone())).await.unwrap();
    assert_eq!(out.note, "original question");
    assert_eq!(out.visited, vec!["gather", "web_search", "synthesize"]);
}

/// **Scenario**: streaming emits an Interrupt event (and no Done) when the
/// run pauses; a fresh run emits Done at END.
#[tokio::test]
async fn stream_emits_interrupt_event() {
    let saver = Arc::new(MemorySaver::new());
    let graph = build_graph(saver);
    let config = RunnableConfig::for_thread("u3:c1");

    let mut stream = graph.stream(Some(ApprovalState::default()), Some(config));
    let mut saw_interrupt = false;
    let mut saw_done = false;
    while let Some(ev) = stream.next().await {
        match ev {
            StreamEvent::Interrupt { node_id } => {
                assert_eq!(node_id, "web_search");
                saw_interrupt = true;
            }
            StreamEvent::Done(_) => saw_done = true,
            _ => {}
        }
    }
    assert!(saw_interrupt);
    assert!(!saw_done);
}
