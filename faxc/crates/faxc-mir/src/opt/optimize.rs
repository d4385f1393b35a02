//! Post-lowering cleanup: removes basic blocks the lowerer left behind with
//! no live predecessor (e.g. a `loop` that never breaks still allocates a
//! break block per §4.8.3, closed with a self-`Goto` purely to satisfy
//! Invariant 2) and `Define`/`Load` statements whose temp nothing reads.
//!
//! Both passes are conservative on purpose: neither pass touches `Assign`,
//! `Init`, or `Call` — proving a memory write is dead would need knowing
//! whether the written local is read on every path forward, which this
//! module doesn't attempt.

use crate::analysis::cfg::ControlFlowGraph;
use crate::mir::{BlockId, InitPattern, MirFunction, MirModule, Operand, Place, PlaceBase, RValue, Statement, TempId, Terminator};
use std::collections::HashSet;

pub fn optimize_module(module: &mut MirModule) {
    for func in &mut module.functions {
        remove_unreachable_blocks(func);
        remove_dead_defines(func);
    }
}

fn remove_unreachable_blocks(func: &mut MirFunction) {
    let cfg = ControlFlowGraph::new(func);
    let dead = cfg.unreachable_blocks(func);
    if dead.is_empty() {
        return;
    }

    let mut remap = vec![None; func.basic_blocks.len()];
    let mut kept = Vec::with_capacity(func.basic_blocks.len());
    for (i, block) in func.basic_blocks.drain(..).enumerate() {
        let id = BlockId(i as u32);
        if dead.contains(&id) {
            continue;
        }
        remap[i] = Some(BlockId(kept.len() as u32));
        kept.push(block);
    }

    for block in &mut kept {
        for phi in &mut block.phis {
            phi.incoming.retain_mut(|(from, _)| match remap[from.0 as usize] {
                Some(new_id) => {
                    *from = new_id;
                    true
                }
                None => false,
            });
        }
        remap_terminator(&mut block.terminator, &remap);
    }

    func.basic_blocks = kept;
    func.start_block = remap[func.start_block.0 as usize].expect("start block is always reachable");
}

fn remap_terminator(term: &mut Terminator, remap: &[Option<BlockId>]) {
    match term {
        Terminator::Goto(target) => *target = remap[target.0 as usize].expect("goto target must be reachable"),
        Terminator::SwitchInt { targets, otherwise, .. } => {
            for (_, target) in targets.iter_mut() {
                *target = remap[target.0 as usize].expect("switch target must be reachable");
            }
            *otherwise = remap[otherwise.0 as usize].expect("switch otherwise must be reachable");
        }
        Terminator::Return(_) => {}
    }
}

/// Iterates `Define`/`Load` elimination to a fixed point: killing one dead
/// temp can make another `Define` that only fed it dead in turn.
fn remove_dead_defines(func: &mut MirFunction) {
    for _ in 0..4 {
        let used = collect_used_temps(func);
        let mut changed = false;
        for block in &mut func.basic_blocks {
            let before = block.statements.len();
            block.statements.retain(|stmt| match stmt {
                Statement::Define(id, _) | Statement::Load(id, _) => used.contains(id),
                _ => true,
            });
            changed |= block.statements.len() != before;
        }
        if !changed {
            break;
        }
    }
}

fn collect_used_temps(func: &MirFunction) -> HashSet<TempId> {
    let mut used = HashSet::new();
    for block in &func.basic_blocks {
        for phi in &block.phis {
            for (_, op) in &phi.incoming {
                operand_use(op, &mut used);
            }
        }
        for stmt in &block.statements {
            match stmt {
                Statement::Define(_, rvalue) => rvalue_use(rvalue, &mut used),
                Statement::Assign(place, op) => {
                    place_use(place, &mut used);
                    operand_use(op, &mut used);
                }
                Statement::Load(_, place) => place_use(place, &mut used),
                Statement::Init(place, pattern) => {
                    place_use(place, &mut used);
                    init_pattern_use(pattern, &mut used);
                }
                Statement::Call(call) => {
                    for arg in &call.args {
                        operand_use(arg, &mut used);
                    }
                    if let crate::mir::CallResult::Sret(place) = &call.result {
                        place_use(place, &mut used);
                    }
                }
            }
        }
        terminator_use(&block.terminator, &mut used);
    }
    used
}

fn operand_use(op: &Operand, used: &mut HashSet<TempId>) {
    if let Operand::Temp(id) = op {
        used.insert(*id);
    }
}

fn place_use(place: &Place, used: &mut HashSet<TempId>) {
    if let PlaceBase::Pointer(id) = &place.base {
        used.insert(*id);
    }
    for proj in &place.projections {
        if let crate::mir::Projection::Index(op) = proj {
            operand_use(op, used);
        }
    }
}

fn rvalue_use(rvalue: &RValue, used: &mut HashSet<TempId>) {
    match rvalue {
        RValue::Use(op) | RValue::UnaryOp(_, op) | RValue::Cast(_, op, _) => operand_use(op, used),
        RValue::Ref(place) => place_use(place, used),
        RValue::BinaryOp(_, left, right) => {
            operand_use(left, used);
            operand_use(right, used);
        }
    }
}

fn init_pattern_use(pattern: &InitPattern, used: &mut HashSet<TempId>) {
    match pattern {
        InitPattern::Struct { leaves } | InitPattern::ArrayLiteral { leaves } => {
            for leaf in leaves {
                if let crate::mir::InitLeaf::Value(op) = leaf {
                    operand_use(op, used);
                }
            }
        }
        InitPattern::ArrayRepeat { leaf, .. } => {
            if let crate::mir::InitLeaf::Value(op) = leaf {
                operand_use(op, used);
            }
        }
        InitPattern::Copy { src } => place_use(src, used),
    }
}

fn terminator_use(term: &Terminator, used: &mut HashSet<TempId>) {
    match term {
        Terminator::Goto(_) => {}
        Terminator::SwitchInt { discriminant, .. } => operand_use(discriminant, used),
        Terminator::Return(op) => {
            if let Some(op) = op {
                operand_use(op, used);
            }
        }
    }
}
