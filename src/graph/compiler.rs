//! The render graph compiler (§4.7): turns a builder's declared accesses
//! into an ordered [`ExecutionPlan`].

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::error::GraphError;
use crate::graph::builder::{PassNode, RenderGraphBuilder};
use crate::graph::pass::PassRenderer;
use crate::ids::{RenderPassHandle, RenderTargetHandle};
use crate::resources::render_pass::RenderPassCache;
use crate::rhi::Rhi;
use crate::types::{PassPosition, ResourceAccess, WELL_KNOWN_VIEWPORT_COLOR};

pub struct ExecutionStep {
    pub pass_name: String,
    pub renderer: Box<dyn PassRenderer>,
    pub render_targets: Vec<RenderTargetHandle>,
    pub pass_position: PassPosition,
    pub pass_handle: RenderPassHandle,
}

#[derive(Default)]
pub struct ExecutionPlan {
    pub steps: Vec<ExecutionStep>,
}

impl ExecutionPlan {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl std::fmt::Debug for ExecutionPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.steps.iter().map(|s| &s.pass_name))
            .finish()
    }
}

/// Topologically order the builder's passes, detect cycles and unsatisfied
/// reads, assign each pass a [`PassPosition`] relative to the viewport
/// color writer sequence, and resolve each pass into a cached
/// [`crate::resources::render_pass::RenderPass`] (§4.7 steps 1-6).
pub fn compile(
    builder: RenderGraphBuilder,
    render_pass_cache: &RenderPassCache,
    rhi: &mut dyn Rhi,
) -> anyhow::Result<ExecutionPlan> {
    let RenderGraphBuilder { imported, passes } = builder;
    let order = topological_order(&passes)?;
    let positions = assign_positions(&passes, &order);
    let mut passes: Vec<Option<PassNode>> = passes.into_iter().map(Some).collect();

    let mut steps = Vec::with_capacity(order.len());
    for index in order {
        let PassNode { name, renderer, accesses } = passes[index].take().expect("each index visited once");
        let config = renderer.render_pass_config();
        let position = positions[&index];
        let pass_handle = render_pass_cache
            .get_or_create(config, position, rhi)
            .map_err(|e| anyhow::anyhow!(e))?;

        let render_targets = accesses
            .iter()
            .filter(|(_, access)| *access == ResourceAccess::Write)
            .filter_map(|(name, _)| imported.get(name).copied())
            .collect();

        steps.push(ExecutionStep {
            pass_name: name,
            renderer,
            render_targets,
            pass_position: position,
            pass_handle,
        });
    }

    Ok(ExecutionPlan { steps })
}

fn topological_order(passes: &[PassNode]) -> Result<Vec<usize>, GraphError> {
    let n = passes.len();
    let mut producers: HashMap<&str, Vec<usize>> = HashMap::new();
    let mut consumers: HashMap<&str, Vec<usize>> = HashMap::new();

    for (i, pass) in passes.iter().enumerate() {
        for (name, access) in &pass.accesses {
            match access {
                ResourceAccess::Write => producers.entry(name.as_str()).or_default().push(i),
                ResourceAccess::Read => consumers.entry(name.as_str()).or_default().push(i),
            }
        }
    }

    let mut indegree = vec![0usize; n];
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];

    for (name, cons) in &consumers {
        let prods = producers
            .get(name)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| GraphError::MissingProducer((*name).to_string()))?;
        for &p in prods {
            for &c in cons {
                if p != c {
                    adjacency[p].push(c);
                    indegree[c] += 1;
                }
            }
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = indegree
        .iter()
        .enumerate()
        .filter(|&(_, &degree)| degree == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(n);
    while let Some(Reverse(i)) = ready.pop() {
        order.push(i);
        for &next in &adjacency[i] {
            indegree[next] -= 1;
            if indegree[next] == 0 {
                ready.push(Reverse(next));
            }
        }
    }

    if order.len() != n {
        return Err(GraphError::Cycle);
    }
    Ok(order)
}

/// Assign each pass's [`PassPosition`] relative to the sequence of passes
/// that write `viewport.color`, in topological order (§4.7 step 5). Passes
/// that never write the viewport color target are not part of that
/// sequence; see `DESIGN.md` for why they default to `Middle`.
fn assign_positions(passes: &[PassNode], order: &[usize]) -> HashMap<usize, PassPosition> {
    let writers: Vec<usize> = order
        .iter()
        .copied()
        .filter(|&i| {
            passes[i]
                .accesses
                .iter()
                .any(|(name, access)| name == WELL_KNOWN_VIEWPORT_COLOR && *access == ResourceAccess::Write)
        })
        .collect();

    let mut positions = HashMap::with_capacity(passes.len());
    for &i in order {
        let position = if writers.len() == 1 && writers[0] == i {
            PassPosition::Standalone
        } else if writers.first() == Some(&i) {
            PassPosition::First
        } else if writers.last() == Some(&i) {
            PassPosition::Last
        } else {
            PassPosition::Middle
        };
        positions.insert(i, position);
    }
    positions
}
