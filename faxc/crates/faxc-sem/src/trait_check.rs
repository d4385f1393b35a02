//! C6: trait-conformance checking (§4.5). Two phases: collect every trait's
//! required items into a name-keyed map, then for each impl that names a
//! trait, verify it supplies a matching item per name — same category
//! (method vs. const), same `self`-mode, same parameter/return `TypeId`s.
//! A trait impl missing an item, or supplying one with the wrong shape, is
//! an error; nothing here checks the item *bodies* — that's C5's job,
//! already done before this pass runs.

use crate::context::{Context, TraitItemSig};
use crate::error::{SemanticError, SemanticResult};
use crate::hir::*;

pub fn check_program(program: &Program, ctx: &Context) -> SemanticResult<()> {
    for imp in &program.impls {
        let Some(trait_def) = imp.trait_ref else { continue };
        let trait_id = program
            .traits
            .iter()
            .position(|t| t.def_id == trait_def)
            .map(|i| TraitId(i as u32))
            .ok_or_else(|| SemanticError::new("impl references an unknown trait", imp.span))?;
        check_impl_against_trait(program, ctx, imp, trait_id)?;
    }
    Ok(())
}

fn check_impl_against_trait(
    program: &Program,
    ctx: &Context,
    imp: &ImplItem,
    trait_id: TraitId,
) -> SemanticResult<()> {
    let trait_info = ctx.trait_info(trait_id);
    for (name, required) in &trait_info.items {
        let provided = imp.items.iter().find(|item| match item {
            ImplItemKind::Method(id) => program.method(*id).name == *name,
            ImplItemKind::Const(id) => program.const_def(*id).name == *name,
        });
        let Some(provided) = provided else {
            return Err(SemanticError::new(
                format!("impl is missing trait item `{}`", name.as_str()),
                imp.span,
            ));
        };
        match (required, provided) {
            (
                TraitItemSig::Method { self_mode: req_mode, params: req_params, ret: req_ret },
                ImplItemKind::Method(id),
            ) => {
                let sig = ctx.method_sig(*id);
                let method = program.method(*id);
                if Some(method.self_mode) != *req_mode {
                    return Err(SemanticError::new(
                        format!("method `{}` has a different `self` mode than its trait", name.as_str()),
                        method.span,
                    ));
                }
                if &sig.params != req_params || sig.ret != *req_ret {
                    return Err(SemanticError::new(
                        format!("method `{}` does not match its trait signature", name.as_str()),
                        method.span,
                    ));
                }
            }
            (TraitItemSig::Const(req_ty), ImplItemKind::Const(id)) => {
                let ty = ctx.const_type(*id);
                if ty != *req_ty {
                    return Err(SemanticError::new(
                        format!("const `{}` does not match its trait type", name.as_str()),
                        program.const_def(*id).span,
                    ));
                }
            }
            _ => {
                return Err(SemanticError::new(
                    format!("trait item `{}` and its impl disagree on kind", name.as_str()),
                    imp.span,
                ));
            }
        }
    }
    Ok(())
}
