// SPDX-License-Identifier: MIT

//! Workflow graph construction and validation
//!
//! Everything the transition table can get wrong is rejected here, before a
//! run exists: duplicate steps, steps without an outgoing edge, edges to
//! unregistered targets, steps unreachable from the entry, and steps with no
//! path to END. A compiled [`Workflow`] can only fail for step-level or
//! store-level reasons.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use crate::error::GraphError;
use crate::relay::checkpoint::{CheckpointStore, MemoryCheckpointStore};
use crate::relay::registry::StepRegistry;
use crate::relay::state::{StateSchema, WorkflowState};
use crate::relay::step::Step;

use super::executor::Workflow;
use super::types::{Edge, Transition, END};

/// Safety ceiling on executed steps per run; routers can form cycles the
/// static analysis cannot bound
const DEFAULT_STEP_CEILING: u32 = 100;

pub struct GraphBuilder {
    name: String,
    schema: StateSchema,
    steps: Vec<Arc<dyn Step>>,
    edges: Vec<(String, Edge)>,
    entry: Option<String>,
    store: Option<Arc<dyn CheckpointStore>>,
    step_timeout: Option<Duration>,
    step_ceiling: u32,
}

impl GraphBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: StateSchema::new(),
            steps: Vec::new(),
            edges: Vec::new(),
            entry: None,
            store: None,
            step_timeout: None,
            step_ceiling: DEFAULT_STEP_CEILING,
        }
    }

    /// Declare the extension-field schema; merge behavior is fixed from here
    pub fn schema(mut self, schema: StateSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn add_step(mut self, step: Arc<dyn Step>) -> Self {
        self.steps.push(step);
        self
    }

    /// Unconditional edge `from -> to`; `to` may be [`END`]
    pub fn add_edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push((from.into(), Edge::To(to.into())));
        self
    }

    /// Conditional edge: `decide` is evaluated against the post-merge state
    /// and may only return one of `targets` (or end the run)
    pub fn add_router<F>(
        mut self,
        from: impl Into<String>,
        targets: impl IntoIterator<Item = impl Into<String>>,
        decide: F,
    ) -> Self
    where
        F: Fn(&WorkflowState) -> Transition + Send + Sync + 'static,
    {
        self.edges.push((
            from.into(),
            Edge::Route {
                targets: targets.into_iter().map(Into::into).collect(),
                decide: Arc::new(decide),
            },
        ));
        self
    }

    /// Designate the entry step
    pub fn entry(mut self, name: impl Into<String>) -> Self {
        self.entry = Some(name.into());
        self
    }

    /// Inject a checkpoint store; defaults to [`MemoryCheckpointStore`]
    pub fn store(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Deadline applied to each step invocation
    pub fn step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = Some(timeout);
        self
    }

    pub fn step_ceiling(mut self, ceiling: u32) -> Self {
        self.step_ceiling = ceiling;
        self
    }

    /// Validate the graph and freeze it into an executable [`Workflow`]
    pub fn compile(self) -> Result<Workflow, GraphError> {
        let mut registry = StepRegistry::new();
        for step in self.steps {
            registry.register(step)?;
        }

        let entry = self.entry.ok_or(GraphError::MissingEntry)?;
        if !registry.contains(&entry) {
            return Err(GraphError::UnknownEntry(entry));
        }

        let mut edges: HashMap<String, Edge> = HashMap::new();
        for (from, edge) in self.edges {
            if !registry.contains(&from) {
                return Err(GraphError::UnknownSource(from));
            }
            if edges.contains_key(&from) {
                return Err(GraphError::DuplicateEdge(from));
            }
            if let Edge::Route { targets, .. } = &edge {
                if targets.is_empty() {
                    return Err(GraphError::EmptyRouter(from));
                }
            }
            for target in edge.targets() {
                if target != END && !registry.contains(target) {
                    return Err(GraphError::UnknownTarget {
                        from,
                        to: target.to_string(),
                    });
                }
            }
            edges.insert(from, edge);
        }

        for name in registry.names() {
            if !edges.contains_key(name) {
                return Err(GraphError::MissingEdge(name.to_string()));
            }
        }

        validate_reachability(&registry, &edges, &entry)?;

        log::info!(
            "Compiled workflow '{}' with {} steps, entry '{}'",
            self.name,
            registry.len(),
            entry
        );

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryCheckpointStore::new()));

        Ok(Workflow::new(
            self.name,
            self.schema,
            registry,
            edges,
            entry,
            store,
            self.step_timeout,
            self.step_ceiling,
        ))
    }
}

/// Every step must be reachable from the entry, and every reachable step
/// must have some path to END
fn validate_reachability(
    registry: &StepRegistry,
    edges: &HashMap<String, Edge>,
    entry: &str,
) -> Result<(), GraphError> {
    // Forward walk from the entry
    let mut reachable: HashSet<&str> = HashSet::new();
    let mut frontier = vec![entry];
    while let Some(current) = frontier.pop() {
        if !reachable.insert(current) {
            continue;
        }
        if let Some(edge) = edges.get(current) {
            for target in edge.targets() {
                if target != END {
                    frontier.push(target);
                }
            }
        }
    }

    for name in registry.names() {
        if !reachable.contains(name) {
            return Err(GraphError::Unreachable(name.to_string()));
        }
    }

    // Fixpoint over "can reach END"
    let mut can_end: HashSet<&str> = HashSet::new();
    loop {
        let mut grew = false;
        for (from, edge) in edges {
            if can_end.contains(from.as_str()) {
                continue;
            }
            let escapes = edge
                .targets()
                .iter()
                .any(|t| *t == END || can_end.contains(t));
            if escapes {
                can_end.insert(from.as_str());
                grew = true;
            }
        }
        if !grew {
            break;
        }
    }

    for name in &reachable {
        if !can_end.contains(name) {
            return Err(GraphError::NoPathToEnd(name.to_string()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::state::StateUpdate;
    use crate::relay::step::RunContext;
    use async_trait::async_trait;
    use std::error::Error;

    struct NoopStep {
        name: String,
    }

    #[async_trait]
    impl Step for NoopStep {
        fn name(&self) -> &str {
            &self.name
        }

        async fn run(
            &self,
            _state: &WorkflowState,
            _ctx: &RunContext,
        ) -> Result<StateUpdate, Box<dyn Error + Send + Sync>> {
            Ok(StateUpdate::none())
        }
    }

    fn step(name: &str) -> Arc<dyn Step> {
        Arc::new(NoopStep {
            name: name.to_string(),
        })
    }

    #[test]
    fn test_compile_linear_graph() {
        let workflow = GraphBuilder::new("linear")
            .add_step(step("a"))
            .add_step(step("b"))
            .add_edge("a", "b")
            .add_edge("b", END)
            .entry("a")
            .compile();

        assert!(workflow.is_ok());
    }

    #[test]
    fn test_compile_branching_graph() {
        let workflow = GraphBuilder::new("branching")
            .add_step(step("classify"))
            .add_step(step("search"))
            .add_step(step("answer"))
            .add_router("classify", ["search", "answer"], |_| {
                Transition::to("answer")
            })
            .add_edge("search", END)
            .add_edge("answer", END)
            .entry("classify")
            .compile();

        assert!(workflow.is_ok());
    }

    #[test]
    fn test_missing_entry() {
        let err = GraphBuilder::new("g")
            .add_step(step("a"))
            .add_edge("a", END)
            .compile()
            .unwrap_err();
        assert!(matches!(err, GraphError::MissingEntry));
    }

    #[test]
    fn test_unknown_entry() {
        let err = GraphBuilder::new("g")
            .add_step(step("a"))
            .add_edge("a", END)
            .entry("nope")
            .compile()
            .unwrap_err();
        assert!(matches!(err, GraphError::UnknownEntry(name) if name == "nope"));
    }

    #[test]
    fn test_duplicate_step() {
        let err = GraphBuilder::new("g")
            .add_step(step("a"))
            .add_step(step("a"))
            .add_edge("a", END)
            .entry("a")
            .compile()
            .unwrap_err();
        assert!(matches!(err, GraphError::DuplicateStep(_)));
    }

    #[test]
    fn test_step_without_edge() {
        let err = GraphBuilder::new("g")
            .add_step(step("a"))
            .entry("a")
            .compile()
            .unwrap_err();
        assert!(matches!(err, GraphError::MissingEdge(name) if name == "a"));
    }

    #[test]
    fn test_duplicate_edge() {
        let err = GraphBuilder::new("g")
            .add_step(step("a"))
            .add_edge("a", END)
            .add_edge("a", END)
            .entry("a")
            .compile()
            .unwrap_err();
        assert!(matches!(err, GraphError::DuplicateEdge(name) if name == "a"));
    }

    #[test]
    fn test_edge_to_unregistered_target() {
        let err = GraphBuilder::new("g")
            .add_step(step("a"))
            .add_edge("a", "ghost")
            .entry("a")
            .compile()
            .unwrap_err();
        assert!(matches!(err, GraphError::UnknownTarget { to, .. } if to == "ghost"));
    }

    #[test]
    fn test_router_with_unregistered_target() {
        let err = GraphBuilder::new("g")
            .add_step(step("a"))
            .add_router("a", ["ghost"], |_| Transition::End)
            .entry("a")
            .compile()
            .unwrap_err();
        assert!(matches!(err, GraphError::UnknownTarget { to, .. } if to == "ghost"));
    }

    #[test]
    fn test_router_with_no_targets() {
        let targets: Vec<String> = vec![];
        let err = GraphBuilder::new("g")
            .add_step(step("a"))
            .add_router("a", targets, |_| Transition::End)
            .entry("a")
            .compile()
            .unwrap_err();
        assert!(matches!(err, GraphError::EmptyRouter(_)));
    }

    #[test]
    fn test_edge_from_unregistered_step() {
        let err = GraphBuilder::new("g")
            .add_step(step("a"))
            .add_edge("a", END)
            .add_edge("ghost", END)
            .entry("a")
            .compile()
            .unwrap_err();
        assert!(matches!(err, GraphError::UnknownSource(name) if name == "ghost"));
    }

    #[test]
    fn test_unreachable_step() {
        let err = GraphBuilder::new("g")
            .add_step(step("a"))
            .add_step(step("island"))
            .add_edge("a", END)
            .add_edge("island", END)
            .entry("a")
            .compile()
            .unwrap_err();
        assert!(matches!(err, GraphError::Unreachable(name) if name == "island"));
    }

    #[test]
    fn test_cycle_with_no_exit() {
        let err = GraphBuilder::new("g")
            .add_step(step("a"))
            .add_step(step("b"))
            .add_edge("a", "b")
            .add_edge("b", "a")
            .entry("a")
            .compile()
            .unwrap_err();
        assert!(matches!(err, GraphError::NoPathToEnd(_)));
    }

    #[test]
    fn test_cycle_with_exit_is_allowed() {
        // A retry loop that can escape through the router is legal
        let workflow = GraphBuilder::new("g")
            .add_step(step("work"))
            .add_step(step("check"))
            .add_edge("work", "check")
            .add_router("check", vec!["work".to_string(), END.to_string()], |_| {
                Transition::End
            })
            .entry("work")
            .compile();
        assert!(workflow.is_ok());
    }
}
