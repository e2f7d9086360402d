//! Compiled state graph: immutable, supports invoke, stream, and state
//! inspection.
//!
//! Built by `StateGraph::compile` or `compile_with_checkpointer`. Holds
//! nodes, routing, the interrupt-before set, and an optional checkpointer.
//! With a checkpointer and `config.thread_id`, a checkpoint `{values, next}`
//! is written after every node, so a later invocation on the same thread
//! resumes from the exact point the previous one halted.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::channels::BoxedStateUpdater;
use crate::error::AgentError;
use crate::memory::{
    Checkpoint, CheckpointSource, Checkpointer, RunnableConfig, StateSnapshot,
};
use crate::stream::StreamEvent;

use super::interrupt::{GraphInterrupt, Interrupt};
use super::state_graph::END;
use super::{Next, NextEntry, Node};

/// Executable workflow graph.
///
/// **Interaction**: Created by `StateGraph::compile*`; one instance per
/// agent, constructed once at startup and shared. The graph is stateless
/// across invocations; all mutable per-turn state lives in `S` and the
/// checkpoint store.
#[derive(Clone)]
pub struct CompiledStateGraph<S> {
    pub(super) nodes: HashMap<String, Arc<dyn Node<S>>>,
    pub(super) first_node_id: String,
    pub(super) next_map: HashMap<String, NextEntry<S>>,
    pub(super) interrupt_before: HashSet<String>,
    pub(super) checkpointer: Option<Arc<dyn Checkpointer<S>>>,
    pub(super) state_updater: BoxedStateUpdater<S>,
}

impl<S> CompiledStateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Runs the graph until END or an interrupt-before node.
    ///
    /// - `input = Some(state)`, no pending interrupt: fresh run from entry.
    /// - `input = Some(state)`, pending interrupt: the input is merged into
    ///   the stored values (via the graph's state updater) and execution
    ///   begins *at* the interrupted node.
    /// - `input = None`, pending interrupt: resumes from the stored values
    ///   unchanged (approval-only resume after `update_state`).
    /// - `input = None`, nothing pending: error.
    ///
    /// Returns `Err(AgentError::Interrupted)` when halting at an interrupt
    /// point; the checkpoint written just before carries `next = [node]`.
    pub async fn invoke(
        &self,
        input: Option<S>,
        config: Option<RunnableConfig>,
    ) -> Result<S, AgentError> {
        let config = config.unwrap_or_default();
        self.run_loop(input, &config, None).await
    }

    /// Streamed variant of `invoke`: yields an event per node transition,
    /// `Interrupt` when pausing, then exactly one of `Done`/`Error` (an
    /// interrupted run ends after its `Interrupt` event).
    pub fn stream(
        &self,
        input: Option<S>,
        config: Option<RunnableConfig>,
    ) -> ReceiverStream<StreamEvent<S>> {
        let (tx, rx) = mpsc::channel(64);
        let this = self.clone();
        tokio::spawn(async move {
            let config = config.unwrap_or_default();
            match this.run_loop(input, &config, Some(&tx)).await {
                Ok(state) => {
                    let _ = tx.send(StreamEvent::Done(state)).await;
                }
                Err(AgentError::Interrupted(_)) => {
                    // Interrupt event already emitted by the run loop.
                }
                Err(e) => {
                    let _ = tx.send(StreamEvent::Error(e.to_string())).await;
                }
            }
        });
        ReceiverStream::new(rx)
    }

    /// Returns the thread's latest checkpoint as `{values, next,
    /// checkpoint_id}`, or `None` when the thread has no checkpoint yet
    /// (normal for a first turn).
    pub async fn get_state(
        &self,
        config: &RunnableConfig,
    ) -> Result<Option<StateSnapshot<S>>, AgentError> {
        let checkpointer = self
            .checkpointer
            .as_ref()
            .ok_or_else(|| AgentError::ExecutionFailed("graph has no checkpointer".into()))?;
        let tuple = checkpointer
            .get_tuple(config)
            .await
            .map_err(|e| AgentError::ExecutionFailed(format!("checkpoint read: {}", e)))?;
        Ok(tuple.map(|cp| StateSnapshot {
            values: cp.values,
            next: cp.next,
            checkpoint_id: cp.id,
        }))
    }

    /// Writes a new checkpoint whose values are the current values mutated
    /// by `f`, without advancing execution. The `next` set is preserved, so
    /// an interrupted thread stays interrupted (resume with `invoke(None)`).
    pub async fn update_state(
        &self,
        config: &RunnableConfig,
        f: impl FnOnce(&mut S) + Send,
    ) -> Result<(), AgentError> {
        let checkpointer = self
            .checkpointer
            .as_ref()
            .ok_or_else(|| AgentError::ExecutionFailed("graph has no checkpointer".into()))?;
        let current = checkpointer
            .get_tuple(config)
            .await
            .map_err(|e| AgentError::ExecutionFailed(format!("checkpoint read: {}", e)))?
            .ok_or_else(|| {
                AgentError::ExecutionFailed("update_state: thread has no checkpoint".into())
            })?;
        let mut values = current.values;
        f(&mut values);
        let step = current.metadata.step;
        let checkpoint =
            Checkpoint::from_state(values, current.next, CheckpointSource::Update, step);
        checkpointer
            .put(config, &checkpoint)
            .await
            .map_err(|e| AgentError::ExecutionFailed(format!("checkpoint write: {}", e)))?;
        Ok(())
    }

    /// Cancels a pending interrupt: writes a new checkpoint with the same
    /// values and an empty `next` set, so the next invocation starts fresh.
    /// A no-op when the thread has no checkpoint.
    pub async fn clear_interrupt(&self, config: &RunnableConfig) -> Result<(), AgentError> {
        let checkpointer = self
            .checkpointer
            .as_ref()
            .ok_or_else(|| AgentError::ExecutionFailed("graph has no checkpointer".into()))?;
        let current = checkpointer
            .get_tuple(config)
            .await
            .map_err(|e| AgentError::ExecutionFailed(format!("checkpoint read: {}", e)))?;
        let Some(current) = current else {
            return Ok(());
        };
        if current.next.is_empty() {
            return Ok(());
        }
        let step = current.metadata.step;
        let checkpoint =
            Checkpoint::from_state(current.values, Vec::new(), CheckpointSource::Update, step);
        checkpointer
            .put(config, &checkpoint)
            .await
            .map_err(|e| AgentError::ExecutionFailed(format!("checkpoint write: {}", e)))?;
        Ok(())
    }

    /// True when the graph persists checkpoints.
    pub fn has_checkpointer(&self) -> bool {
        self.checkpointer.is_some()
    }

    async fn save_checkpoint(
        &self,
        config: &RunnableConfig,
        state: &S,
        next: Vec<String>,
        step: i64,
        events: Option<&mpsc::Sender<StreamEvent<S>>>,
    ) -> Result<(), AgentError> {
        if let Some(cp) = &self.checkpointer {
            if config.thread_id.is_some() {
                let checkpoint =
                    Checkpoint::from_state(state.clone(), next, CheckpointSource::Loop, step);
                cp.put(config, &checkpoint)
                    .await
                    .map_err(|e| AgentError::ExecutionFailed(format!("checkpoint write: {}", e)))?;
                if let Some(tx) = events {
                    let _ = tx
                        .send(StreamEvent::Checkpoint {
                            checkpoint_id: checkpoint.id,
                        })
                        .await;
                }
            }
        }
        Ok(())
    }

    /// Shared run loop used by invoke() and stream().
    async fn run_loop(
        &self,
        input: Option<S>,
        config: &RunnableConfig,
        events: Option<&mpsc::Sender<StreamEvent<S>>>,
    ) -> Result<S, AgentError> {
        if self.nodes.is_empty() || !self.nodes.contains_key(&self.first_node_id) {
            return Err(AgentError::ExecutionFailed("empty graph".into()));
        }

        // Resolve the starting point: a pending interrupt on this thread
        // resumes at the stored `next` node; otherwise a fresh run starts at
        // the entry node.
        let pending = match (&self.checkpointer, &config.thread_id) {
            (Some(cp), Some(_)) => cp
                .get_tuple(config)
                .await
                .map_err(|e| AgentError::ExecutionFailed(format!("checkpoint read: {}", e)))?
                .filter(|t| !t.next.is_empty()),
            _ => None,
        };

        let (mut state, mut current_id, mut resuming) = match (input, pending) {
            (Some(input_state), Some(cp)) => {
                let mut values = cp.values;
                self.state_updater.apply_update(&mut values, &input_state);
                let node = cp.next[0].clone();
                tracing::debug!(node = %node, "resuming interrupted thread with new input");
                (values, node, true)
            }
            (None, Some(cp)) => {
                let node = cp.next[0].clone();
                tracing::debug!(node = %node, "resuming interrupted thread from stored state");
                (cp.values, node, true)
            }
            (Some(input_state), None) => (input_state, self.first_node_id.clone(), false),
            (None, None) => {
                return Err(AgentError::ExecutionFailed(
                    "no input and no pending interrupt to resume".into(),
                ))
            }
        };

        let limit = config.effective_recursion_limit();
        let mut steps: usize = 0;

        loop {
            // Static interrupt point: checkpoint and halt *before* executing,
            // unless this invocation is resuming into exactly this node.
            if self.interrupt_before.contains(&current_id) && !resuming {
                self.save_checkpoint(
                    config,
                    &state,
                    vec![current_id.clone()],
                    steps as i64,
                    events,
                )
                .await?;
                if let Some(tx) = events {
                    let _ = tx
                        .send(StreamEvent::Interrupt {
                            node_id: current_id.clone(),
                        })
                        .await;
                }
                tracing::info!(node = %current_id, "interrupt before node");
                return Err(GraphInterrupt(Interrupt::before_node(current_id)).into());
            }
            resuming = false;

            if steps >= limit {
                return Err(AgentError::RecursionLimitExceeded(limit));
            }
            steps += 1;

            let node = self
                .nodes
                .get(&current_id)
                .cloned()
                .ok_or_else(|| AgentError::ExecutionFailed(format!("unknown node {current_id}")))?;

            if let Some(tx) = events {
                let _ = tx
                    .send(StreamEvent::NodeStart {
                        node_id: current_id.clone(),
                    })
                    .await;
            }
            tracing::debug!(node = %current_id, step = steps, "node start");

            let (new_state, next) = match node.run(state.clone()).await {
                Ok(output) => output,
                Err(AgentError::Interrupted(interrupt)) => {
                    // Dynamic interrupt raised inside the node: persist so the
                    // node re-executes on resume.
                    self.save_checkpoint(
                        config,
                        &state,
                        vec![current_id.clone()],
                        steps as i64,
                        events,
                    )
                    .await?;
                    if let Some(tx) = events {
                        let _ = tx
                            .send(StreamEvent::Interrupt {
                                node_id: current_id.clone(),
                            })
                            .await;
                    }
                    return Err(AgentError::Interrupted(interrupt));
                }
                Err(e) => {
                    tracing::error!(node = %current_id, error = %e, "node failed");
                    return Err(e);
                }
            };

            self.state_updater.apply_update(&mut state, &new_state);

            if let Some(tx) = events {
                let _ = tx
                    .send(StreamEvent::NodeEnd {
                        node_id: current_id.clone(),
                    })
                    .await;
                let _ = tx.send(StreamEvent::Values(state.clone())).await;
            }

            let next_id: Option<String> =
                if let Some(NextEntry::Conditional(router)) = self.next_map.get(&current_id) {
                    let target = router.resolve_next(&state);
                    tracing::debug!(from = %current_id, to = %target, "conditional routing");
                    Some(target)
                } else {
                    match next {
                        Next::End => None,
                        Next::Node(id) => Some(id),
                        Next::Continue => self.next_map.get(&current_id).and_then(|e| {
                            if let NextEntry::Unconditional(id) = e {
                                Some(id.clone())
                            } else {
                                None
                            }
                        }),
                    }
                };

            let should_end = next_id.is_none() || next_id.as_deref() == Some(END);
            let next_vec = if should_end {
                Vec::new()
            } else {
                vec![next_id.clone().unwrap_or_default()]
            };
            self.save_checkpoint(config, &state, next_vec, steps as i64, events)
                .await?;

            if should_end {
                tracing::debug!(steps, "graph complete");
                return Ok(state);
            }
            if let Some(id) = next_id {
                current_id = id;
            }
        }
    }
}
