//! §4.8.1 function setup: local/temp allocation, block management, and the
//! statement/terminator emission primitives the lowerer drives directly.
//!
//! A block with no terminator yet is still "open" (`current_block` points
//! at it); calling [`Builder::terminate`] closes it and clears
//! `current_block`, which is exactly Invariant 5's "a diverging expression
//! leaves MIR unreachable" — the lowerer doesn't need to track reachability
//! separately, it falls out of always terminating through this method.

use crate::mir::{
    AbiAlias, AbiParam, BasicBlock, BlockId, Local, LocalId, MirFunction, MirFunctionId,
    MirFunctionSig, Phi, ReturnDesc, Statement, TempId, Terminator,
};
use faxc_sem::types::Type;
use faxc_sem::{Context, SemanticError, SemanticResult, TypeId};
use faxc_util::{Span, Symbol};

/// An aggregate (struct or array) crosses the ABI boundary indirectly;
/// everything else (primitives, references, unit) is passed by value
/// (§4.8.1).
pub fn is_aggregate(ctx: &Context, ty: TypeId) -> bool {
    matches!(ctx.types.resolve(ty), Type::Struct { .. } | Type::Array { .. })
}

struct BlockBuilder {
    phis: Vec<Phi>,
    statements: Vec<Statement>,
    terminator: Option<Terminator>,
}

pub struct Builder {
    fn_span: Span,
    locals: Vec<Local>,
    temp_types: Vec<TypeId>,
    blocks: Vec<BlockBuilder>,
    current: Option<BlockId>,
}

impl Builder {
    pub fn new(fn_span: Span) -> Self {
        Builder { fn_span, locals: Vec::new(), temp_types: Vec::new(), blocks: Vec::new(), current: None }
    }

    pub fn push_local(&mut self, ty: TypeId, name: Option<Symbol>, span: Span, alias: Option<AbiAlias>) -> LocalId {
        let id = LocalId(self.locals.len() as u32);
        self.locals.push(Local { ty, name, span, alias });
        id
    }

    pub fn local_mut(&mut self, id: LocalId) -> &mut Local {
        &mut self.locals[id.0 as usize]
    }

    pub fn push_temp(&mut self, ty: TypeId) -> TempId {
        let id = TempId(self.temp_types.len() as u32);
        self.temp_types.push(ty);
        id
    }

    pub fn new_block(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(BlockBuilder { phis: Vec::new(), statements: Vec::new(), terminator: None });
        id
    }

    pub fn set_current_block(&mut self, id: BlockId) {
        self.current = Some(id);
    }

    pub fn current_block(&self) -> Option<BlockId> {
        self.current
    }

    /// No-op when there is no current block — code following a diverging
    /// expression is unreachable and its statements are simply never
    /// materialized (§4.8.5).
    pub fn push_statement(&mut self, stmt: Statement) {
        if let Some(id) = self.current {
            self.blocks[id.0 as usize].statements.push(stmt);
        }
    }

    pub fn push_phi(&mut self, block: BlockId, phi: Phi) {
        self.blocks[block.0 as usize].phis.push(phi);
    }

    /// Closes the current block with `term` and clears `current_block`.
    /// A no-op if there is no current block (already terminated/unreachable).
    pub fn terminate(&mut self, term: Terminator) {
        if let Some(id) = self.current.take() {
            self.blocks[id.0 as usize].terminator = Some(term);
        }
    }

    /// Terminates a specific (possibly not current) block. Used to close out
    /// blocks that provably have no predecessor — e.g. a loop's break block
    /// when the loop never breaks — which still need a terminator to satisfy
    /// Invariant 2 even though control never reaches them.
    pub fn force_terminate(&mut self, block: BlockId, term: Terminator) {
        self.blocks[block.0 as usize].terminator = Some(term);
    }

    /// Marks subsequent code as unreachable without terminating any block —
    /// used when a whole construct (e.g. a never-breaking `loop`) has already
    /// terminated every block it touched on its own.
    pub fn clear_current(&mut self) {
        self.current = None;
    }

    pub fn finish(
        self,
        id: MirFunctionId,
        name: Symbol,
        sig: MirFunctionSig,
        start_block: BlockId,
    ) -> SemanticResult<MirFunction> {
        let fn_span = self.fn_span;
        let mut basic_blocks = Vec::with_capacity(self.blocks.len());
        for (i, b) in self.blocks.into_iter().enumerate() {
            let terminator = b.terminator.ok_or_else(|| {
                SemanticError::new(
                    format!("internal consistency error: block {i} in `{}` has no terminator", name.as_str()),
                    fn_span,
                )
            })?;
            basic_blocks.push(BasicBlock { phis: b.phis, statements: b.statements, terminator });
        }
        Ok(MirFunction { id, name, sig, locals: self.locals, temp_types: self.temp_types, basic_blocks, start_block })
    }
}

/// Classifies `params`/`ret` into the ABI-lowered parameter list and return
/// descriptor (§4.8.1). Scalars pass `Direct`; aggregates pass
/// `ByValCallerCopy` (params) or `SRet` (an aggregate return, via a hidden
/// pointer parameter).
pub fn classify_signature(ctx: &Context, params: &[TypeId], ret: TypeId) -> MirFunctionSig {
    let abi_params = params
        .iter()
        .map(|&ty| if is_aggregate(ctx, ty) { AbiParam::ByValCallerCopy(ty) } else { AbiParam::Direct(ty) })
        .collect();

    let ret_desc = if ctx.types.is_never(ret) {
        ReturnDesc::RetNever
    } else if ctx.types.is_unit(ret) {
        ReturnDesc::RetVoid
    } else if is_aggregate(ctx, ret) {
        ReturnDesc::RetIndirectSRet
    } else {
        ReturnDesc::RetDirect(ret)
    };

    MirFunctionSig { logical_params: params.to_vec(), abi_params, ret: ret_desc }
}
