//! Per-node checkpointing and checkpoint linearity across turns.

use std::sync::Arc;

use async_trait::async_trait;

use stategraph::{
    AgentError, Checkpointer, MemorySaver, Next, Node, RunnableConfig, StateGraph, END, START,
};

#[derive(Clone, Debug, Default, PartialEq)]
struct CountState {
    visited: Vec<String>,
    turn: u32,
}

struct Step(&'static str);

#[async_trait]
impl Node<CountState> for Step {
    fn id(&self) -> &str {
        self.0
    }
    async fn run(&self, mut state: CountState) -> Result<(CountState, Next), AgentError> {
        state.visited.push(self.0.to_string());
        Ok((state, Next::Continue))
    }
}

fn two_step_graph(
    saver: Arc<MemorySaver<CountState>>,
) -> stategraph::CompiledStateGraph<CountState> {
    let mut graph = StateGraph::<CountState>::new();
    graph.add_node("one", Arc::new(Step("one")));
    graph.add_node("two", Arc::new(Step("two")));
    graph.add_edge(START, "one");
    graph.add_edge("one", "two");
    graph.add_edge("two", END);
    graph.compile_with_checkpointer(saver).unwrap()
}

/// **Scenario**: a checkpoint is written after every node; the final one has
/// an empty next set.
#[tokio::test]
async fn checkpoint_after_each_node() {
    let saver = Arc::new(MemorySaver::new());
    let graph = two_step_graph(saver.clone());
    let config = RunnableConfig::for_thread("t1");

    graph
        .invoke(Some(CountState::default()), Some(config.clone()))
        .await
        .unwrap();

    let items = saver.list(&config, None).await.unwrap();
    assert_eq!(items.len(), 2);

    let latest = saver.get_tuple(&config).await.unwrap().unwrap();
    assert!(latest.next.is_empty());
    assert_eq!(latest.values.visited, vec!["one", "two"]);
}

/// **Scenario**: checkpoint linearity — the snapshot visible at the start of
/// turn 2 equals the checkpoint written at the end of turn 1.
#[tokio::test]
async fn checkpoint_linearity_across_turns() {
    let saver = Arc::new(MemorySaver::new());
    let graph = two_step_graph(saver);
    let config = RunnableConfig::for_thread("t2");

    let turn1 = graph
        .invoke(
            Some(CountState {
                turn: 1,
                ..Default::default()
            }),
            Some(config.clone()),
        )
        .await
        .unwrap();

    let before_turn2 = graph.get_state(&config).await.unwrap().unwrap();
    assert_eq!(before_turn2.values, turn1);

    let turn2 = graph
        .invoke(
            Some(CountState {
                turn: 2,
                ..Default::default()
            }),
            Some(config.clone()),
        )
        .await
        .unwrap();
    let after_turn2 = graph.get_state(&config).await.unwrap().unwrap();
    assert_eq!(after_turn2.values, turn2);
}

/// **Scenario**: distinct threads never observe each other's checkpoints.
#[tokio::test]
async fn thread_isolation() {
    let saver = Arc::new(MemorySaver::new());
    let graph = two_step_graph(saver);
    let cfg_a = RunnableConfig::for_thread("userA:conv1");
    let cfg_b = RunnableConfig::for_thread("userB:conv1");

    graph
        .invoke(
            Some(CountState {
                turn: 7,
                ..Default::default()
            }),
            Some(cfg_a.clone()),
        )
        .await
        .unwrap();

    assert!(graph.get_state(&cfg_b).await.unwrap().is_none());
    assert_eq!(graph.get_state(&cfg_a).await.unwrap().unwrap().values.turn, 7);
}

/// **Scenario**: without a thread_id nothing is persisted and invoke still
/// completes.
#[tokio::test]
async fn no_thread_id_skips_persistence() {
    let saver = Arc::new(MemorySaver::new());
    let graph = two_step_graph(saver.clone());

    let out = graph
        .invoke(Some(CountState::default()), None)
        .await
        .unwrap();
    assert_eq!(out.visited, vec!["one", "two"]);

    let err = saver.list(&RunnableConfig::default(), None).await;
    assert!(err.is_err());
}
