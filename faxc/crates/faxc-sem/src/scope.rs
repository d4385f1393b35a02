//! A stack of scopes ("ribs") used by name resolution (§4.2). Each rib maps a
//! surface name to whatever HIR entity last bound it; looking a name up walks
//! outward from the current rib until a binding or the module root is found.

use crate::hir::{ConstId, EnumId, FunctionId, LocalId, LoopId, StructId};
use faxc_util::{Idx, IndexVec, Symbol};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RibId(pub u32);

impl Idx for RibId {
    fn from_usize(idx: usize) -> Self {
        RibId(idx as u32)
    }
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// What a name resolves to. Types and values share one namespace here: the
/// surface language has no syntax that would make `Binding::Struct` collide
/// with `Binding::Function` in the same rib.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Local(LocalId),
    Const(ConstId),
    Function(FunctionId),
    Struct(StructId),
    Enum(EnumId),
}

#[derive(Debug)]
pub struct Rib {
    pub bindings: HashMap<Symbol, Binding>,
    pub parent: Option<RibId>,
    pub kind: RibKind,
}

#[derive(Debug, Clone, Copy)]
pub enum RibKind {
    Module,
    Function,
    Block,
    Loop(LoopId),
}

pub struct ScopeTree {
    pub ribs: IndexVec<RibId, Rib>,
    pub current_rib: RibId,
}

impl ScopeTree {
    pub fn new() -> Self {
        let mut ribs = IndexVec::new();
        let root = ribs.push(Rib {
            bindings: HashMap::new(),
            parent: None,
            kind: RibKind::Module,
        });
        ScopeTree {
            ribs,
            current_rib: root,
        }
    }

    pub fn enter_scope(&mut self, kind: RibKind) -> RibId {
        let new_rib = self.ribs.push(Rib {
            bindings: HashMap::new(),
            parent: Some(self.current_rib),
            kind,
        });
        self.current_rib = new_rib;
        new_rib
    }

    pub fn exit_scope(&mut self) {
        if let Some(parent) = self.ribs[self.current_rib].parent {
            self.current_rib = parent;
        }
    }

    /// Binds in the current rib, returning the prior binding if `name`
    /// shadowed one already present in this exact rib (not an enclosing one —
    /// shadowing an outer binding is always legal, §4.2).
    pub fn add_binding(&mut self, name: Symbol, binding: Binding) -> Option<Binding> {
        self.ribs[self.current_rib].bindings.insert(name, binding)
    }

    pub fn resolve(&self, name: Symbol) -> Option<Binding> {
        let mut rib_id = self.current_rib;
        loop {
            let rib = &self.ribs[rib_id];
            if let Some(&binding) = rib.bindings.get(&name) {
                return Some(binding);
            }
            match rib.parent {
                Some(parent) => rib_id = parent,
                None => return None,
            }
        }
    }

    /// Innermost enclosing loop, for unlabeled `break`/`continue` (§4.1, §5).
    pub fn enclosing_loop(&self) -> Option<LoopId> {
        let mut rib_id = self.current_rib;
        loop {
            let rib = &self.ribs[rib_id];
            if let RibKind::Loop(id) = rib.kind {
                return Some(id);
            }
            match rib.parent {
                Some(parent) => rib_id = parent,
                None => return None,
            }
        }
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}
