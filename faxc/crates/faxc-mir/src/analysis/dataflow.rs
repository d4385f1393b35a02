//! Local-liveness analysis over a [`MirFunction`]'s basic blocks — feeds the
//! dead-store elimination pass in [`crate::opt`]. Only [`LocalId`]s are
//! tracked: [`TempId`]s are defined exactly once and used exactly where
//! produced (the lowerer never reorders across blocks, and `Operand` can
//! only name a `Temp` or a `Constant`, never a bare local), so they need no
//! fixed-point treatment.

use crate::analysis::cfg::ControlFlowGraph;
use crate::mir::{BasicBlock, BlockId, Call, CallResult, LocalId, MirFunction, Place, PlaceBase, RValue, Statement};
use std::collections::{HashMap, HashSet};

#[derive(Default)]
pub struct LivenessAnalysis {
    pub block_entry: HashMap<BlockId, HashSet<LocalId>>,
    pub block_exit: HashMap<BlockId, HashSet<LocalId>>,
}

pub fn analyze_liveness(func: &MirFunction, cfg: &ControlFlowGraph) -> LivenessAnalysis {
    let mut block_entry: HashMap<BlockId, HashSet<LocalId>> = HashMap::new();
    let mut block_exit: HashMap<BlockId, HashSet<LocalId>> = HashMap::new();

    for i in 0..func.basic_blocks.len() {
        let id = BlockId(i as u32);
        block_entry.insert(id, HashSet::new());
        block_exit.insert(id, HashSet::new());
    }

    let block_count = func.basic_blocks.len();
    let max_iterations = block_count.saturating_mul(block_count).max(1);
    let mut iterations = 0;
    let mut changed = true;

    while changed && iterations < max_iterations {
        changed = false;
        iterations += 1;

        for (i, block) in func.basic_blocks.iter().enumerate() {
            let id = BlockId(i as u32);
            let mut out = HashSet::new();
            if let Some(succs) = cfg.successors.get(&id) {
                for succ in succs {
                    out.extend(block_entry[succ].iter().copied());
                }
            }

            let in_set = block_in(block, &out);
            if in_set != block_entry[&id] {
                changed = true;
                block_entry.insert(id, in_set);
            }
            block_exit.insert(id, out);
        }
    }

    LivenessAnalysis { block_entry, block_exit }
}

fn block_in(block: &BasicBlock, out: &HashSet<LocalId>) -> HashSet<LocalId> {
    let mut uses = HashSet::new();
    let mut defines = HashSet::new();

    for stmt in &block.statements {
        statement_effects(stmt, &mut uses, &mut defines);
    }
    // Terminator operands are always `Temp`/`Constant`, never a bare local —
    // nothing to contribute here.

    let mut result = uses;
    for id in out {
        if !defines.contains(id) {
            result.insert(*id);
        }
    }
    result
}

fn statement_effects(stmt: &Statement, uses: &mut HashSet<LocalId>, defines: &mut HashSet<LocalId>) {
    match stmt {
        Statement::Define(_, rvalue) => rvalue_uses(rvalue, uses),
        Statement::Assign(place, _operand) => place_effect(place, uses, defines),
        Statement::Load(_, place) => place_uses(place, uses),
        Statement::Init(place, _pattern) => place_effect(place, uses, defines),
        Statement::Call(call) => call_effects(call, uses, defines),
    }
}

/// A plain `Local(id)` place with no projection is a full overwrite (def);
/// anything with a projection, or a `Pointer` base, still reads the base it
/// derives from.
fn place_effect(place: &Place, uses: &mut HashSet<LocalId>, defines: &mut HashSet<LocalId>) {
    match &place.base {
        PlaceBase::Local(id) => {
            if place.projections.is_empty() {
                defines.insert(*id);
            } else {
                uses.insert(*id);
            }
        }
        PlaceBase::Pointer(_) => {}
    }
}

fn place_uses(place: &Place, uses: &mut HashSet<LocalId>) {
    if let PlaceBase::Local(id) = &place.base {
        uses.insert(*id);
    }
}

fn rvalue_uses(rvalue: &RValue, uses: &mut HashSet<LocalId>) {
    if let RValue::Ref(place) = rvalue {
        place_uses(place, uses);
    }
}

fn call_effects(call: &Call, uses: &mut HashSet<LocalId>, defines: &mut HashSet<LocalId>) {
    if let CallResult::Sret(place) = &call.result {
        place_effect(place, uses, defines);
    }
}
