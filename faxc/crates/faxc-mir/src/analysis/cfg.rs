//! Control-flow graph over a [`MirFunction`]'s basic blocks: predecessor/
//! successor edges, dominators (iterative fixed-point), and natural loops —
//! used by the dead-block elimination pass in [`crate::opt`].

use crate::mir::{terminator_targets, BlockId, MirFunction};
use std::collections::{HashMap, HashSet, VecDeque};

pub struct ControlFlowGraph {
    pub predecessors: HashMap<BlockId, HashSet<BlockId>>,
    pub successors: HashMap<BlockId, HashSet<BlockId>>,
    pub dominators: HashMap<BlockId, HashSet<BlockId>>,
    pub idom: HashMap<BlockId, BlockId>,
    pub postorder: HashMap<BlockId, u32>,
}

impl ControlFlowGraph {
    pub fn new(func: &MirFunction) -> Self {
        let mut predecessors: HashMap<BlockId, HashSet<BlockId>> = HashMap::new();
        let mut successors: HashMap<BlockId, HashSet<BlockId>> = HashMap::new();

        for i in 0..func.basic_blocks.len() {
            let id = BlockId(i as u32);
            predecessors.insert(id, HashSet::new());
            successors.insert(id, HashSet::new());
        }

        for (i, block) in func.basic_blocks.iter().enumerate() {
            let id = BlockId(i as u32);
            for target in terminator_targets(&block.terminator) {
                successors.get_mut(&id).unwrap().insert(target);
                predecessors.get_mut(&target).unwrap().insert(id);
            }
        }

        let postorder = compute_postorder(&successors, func.start_block);

        let mut cfg = Self { predecessors, successors, dominators: HashMap::new(), idom: HashMap::new(), postorder };
        cfg.compute_dominators(func);
        cfg
    }

    /// Classic iterative dataflow dominator computation (Cooper/Harvey/Kennedy
    /// style without the reverse-postorder speedup — function bodies here are
    /// small enough it doesn't matter).
    fn compute_dominators(&mut self, func: &MirFunction) {
        let blocks: Vec<BlockId> = (0..func.basic_blocks.len()).map(|i| BlockId(i as u32)).collect();
        if blocks.is_empty() {
            return;
        }
        let entry = func.start_block;

        let mut doms: HashMap<BlockId, HashSet<BlockId>> = HashMap::new();
        for &block_id in &blocks {
            let set = if block_id == entry { HashSet::from([entry]) } else { blocks.iter().copied().collect() };
            doms.insert(block_id, set);
        }

        let mut changed = true;
        while changed {
            changed = false;
            for &block_id in &blocks {
                if block_id == entry {
                    continue;
                }
                let preds = &self.predecessors[&block_id];
                if preds.is_empty() {
                    continue;
                }
                let mut new_dom: Option<HashSet<BlockId>> = None;
                for pred in preds {
                    let pred_dom = &doms[pred];
                    new_dom = Some(match new_dom {
                        None => pred_dom.clone(),
                        Some(acc) => acc.intersection(pred_dom).copied().collect(),
                    });
                }
                let mut new_dom = new_dom.unwrap();
                new_dom.insert(block_id);
                if new_dom != doms[&block_id] {
                    doms.insert(block_id, new_dom);
                    changed = true;
                }
            }
        }

        self.dominators = doms;
        self.compute_immediate_dominators(&blocks, entry);
    }

    fn compute_immediate_dominators(&mut self, blocks: &[BlockId], entry: BlockId) {
        for &block_id in blocks {
            if block_id == entry {
                continue;
            }
            let doms = &self.dominators[&block_id];
            let mut idom_candidate: Option<BlockId> = None;
            for &candidate in blocks {
                if candidate == block_id || !doms.contains(&candidate) {
                    continue;
                }
                let is_idom = blocks.iter().all(|&other| {
                    other == candidate || other == block_id || !doms.contains(&other) || self.dominators[&other].contains(&candidate)
                });
                if is_idom && (idom_candidate.is_none() || self.postorder[&candidate] > self.postorder[&idom_candidate.unwrap()]) {
                    idom_candidate = Some(candidate);
                }
            }
            if let Some(idom) = idom_candidate {
                self.idom.insert(block_id, idom);
            }
        }
    }

    pub fn is_reachable(&self, block: BlockId, func: &MirFunction) -> bool {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(func.start_block);
        visited.insert(func.start_block);

        while let Some(current) = queue.pop_front() {
            if current == block {
                return true;
            }
            if let Some(succs) = self.successors.get(&current) {
                for &succ in succs {
                    if visited.insert(succ) {
                        queue.push_back(succ);
                    }
                }
            }
        }
        false
    }

    /// Every block with no path from the start block — what's left after
    /// running this is exactly the dead-block set [`crate::opt`] removes.
    pub fn unreachable_blocks(&self, func: &MirFunction) -> HashSet<BlockId> {
        (0..func.basic_blocks.len()).map(|i| BlockId(i as u32)).filter(|&b| !self.is_reachable(b, func)).collect()
    }

    pub fn find_loops(&self) -> HashMap<BlockId, LoopInfo> {
        let mut loops = HashMap::new();
        for (header, preds) in &self.predecessors {
            if !preds.contains(header) {
                continue;
            }
            let mut loop_blocks = HashSet::new();
            let mut queue: VecDeque<BlockId> = preds.iter().copied().filter(|p| p != header).collect();
            while let Some(block) = queue.pop_front() {
                if block == *header || !loop_blocks.insert(block) {
                    continue;
                }
                if let Some(block_preds) = self.predecessors.get(&block) {
                    queue.extend(block_preds.iter().copied().filter(|p| !loop_blocks.contains(p)));
                }
            }
            loops.insert(*header, LoopInfo { header: *header, blocks: loop_blocks });
        }
        loops
    }
}

#[derive(Debug)]
pub struct LoopInfo {
    pub header: BlockId,
    pub blocks: HashSet<BlockId>,
}

fn compute_postorder(successors: &HashMap<BlockId, HashSet<BlockId>>, entry: BlockId) -> HashMap<BlockId, u32> {
    let mut visited = HashSet::new();
    let mut postorder = HashMap::new();
    let mut counter = 0;

    fn dfs(
        node: BlockId,
        successors: &HashMap<BlockId, HashSet<BlockId>>,
        visited: &mut HashSet<BlockId>,
        postorder: &mut HashMap<BlockId, u32>,
        counter: &mut u32,
    ) {
        visited.insert(node);
        if let Some(succs) = successors.get(&node) {
            for &succ in succs {
                if !visited.contains(&succ) {
                    dfs(succ, successors, visited, postorder, counter);
                }
            }
        }
        postorder.insert(node, *counter);
        *counter += 1;
    }

    dfs(entry, successors, &mut visited, &mut postorder, &mut counter);
    postorder
}

pub fn dominates(cfg: &ControlFlowGraph, a: BlockId, b: BlockId) -> bool {
    cfg.dominators.get(&b).is_some_and(|doms| doms.contains(&a))
}

pub fn dominated_blocks(cfg: &ControlFlowGraph, block: BlockId) -> Vec<BlockId> {
    cfg.dominators.iter().filter(|(_, doms)| doms.contains(&block)).map(|(id, _)| *id).collect()
}
