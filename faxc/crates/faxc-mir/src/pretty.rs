//! Textual MIR emitter — the "MIR emitter" half of the external interface in
//! spec §6.1. Renders a [`MirModule`] to a readable, rustc-MIR-flavored text
//! form: one function per block of `fn name(...) -> ret { ... }`, one basic
//! block per `bbN:`, one line per statement/terminator.

use crate::mir::{
    AbiParam, BasicBlock, BlockId, Call, CallResult, Constant, FunctionRef, InitLeaf, InitPattern,
    Local, MirFunction, MirModule, Operand, Phi, Place, PlaceBase, Projection, RValue, ReturnDesc,
    Statement, Terminator,
};
use faxc_sem::types::Type;
use faxc_sem::Context;
use std::fmt::Write;

pub fn print_module(module: &MirModule, ctx: &Context) -> String {
    let mut out = String::new();
    for external in &module.external_functions {
        let _ = writeln!(out, "extern fn {}{};", external.name.as_str(), format_sig(&external.sig, ctx));
    }
    if !module.external_functions.is_empty() {
        out.push('\n');
    }
    for (i, func) in module.functions.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        print_function(&mut out, func, ctx);
    }
    out
}

fn print_function(out: &mut String, func: &MirFunction, ctx: &Context) {
    let _ = writeln!(out, "fn {}{} {{", func.name.as_str(), format_sig(&func.sig, ctx));
    for (i, local) in func.locals.iter().enumerate() {
        print_local(out, crate::mir::LocalId(i as u32), local, ctx);
    }
    for (i, ty) in func.temp_types.iter().enumerate() {
        let _ = writeln!(out, "    let t{}: {};", i, format_type(ctx, *ty));
    }
    for (i, block) in func.basic_blocks.iter().enumerate() {
        print_block(out, BlockId(i as u32), block, func.start_block);
    }
    out.push_str("}\n");
}

fn print_local(out: &mut String, id: crate::mir::LocalId, local: &Local, ctx: &Context) {
    let alias = match local.alias {
        Some(crate::mir::AbiAlias::Param(i)) => format!(" // abi param {i}"),
        Some(crate::mir::AbiAlias::SRet) => " // sret slot".to_string(),
        None => String::new(),
    };
    let name = local.name.map(|s| format!(" /* {} */", s.as_str())).unwrap_or_default();
    let _ = writeln!(out, "    let _{}: {}{name}{alias}", id.0, format_type(ctx, local.ty));
}

fn print_block(out: &mut String, id: BlockId, block: &BasicBlock, start: BlockId) {
    let marker = if id == start { " (start)" } else { "" };
    let _ = writeln!(out, "    bb{}{marker}: {{", id.0);
    for phi in &block.phis {
        print_phi(out, phi);
    }
    for stmt in &block.statements {
        let _ = writeln!(out, "        {};", format_statement(stmt));
    }
    let _ = writeln!(out, "        {};", format_terminator(&block.terminator));
    out.push_str("    }\n");
}

fn print_phi(out: &mut String, phi: &Phi) {
    let incoming: Vec<String> = phi.incoming.iter().map(|(b, op)| format!("bb{} => {}", b.0, format_operand(op))).collect();
    let _ = writeln!(out, "        t{} = phi [{}];", phi.dest.0, incoming.join(", "));
}

fn format_statement(stmt: &Statement) -> String {
    match stmt {
        Statement::Define(id, rvalue) => format!("t{} = {}", id.0, format_rvalue(rvalue)),
        Statement::Assign(place, op) => format!("{} = {}", format_place(place), format_operand(op)),
        Statement::Load(id, place) => format!("t{} = load {}", id.0, format_place(place)),
        Statement::Init(place, pattern) => format!("init {} = {}", format_place(place), format_init_pattern(pattern)),
        Statement::Call(call) => format_call(call),
    }
}

fn format_terminator(term: &Terminator) -> String {
    match term {
        Terminator::Goto(target) => format!("goto bb{}", target.0),
        Terminator::SwitchInt { discriminant, targets, otherwise } => {
            let arms: Vec<String> = targets.iter().map(|(v, b)| format!("{v} => bb{}", b.0)).collect();
            format!("switchInt({}) [{}, otherwise => bb{}]", format_operand(discriminant), arms.join(", "), otherwise.0)
        }
        Terminator::Return(op) => match op {
            Some(op) => format!("return {}", format_operand(op)),
            None => "return".to_string(),
        },
    }
}

fn format_call(call: &Call) -> String {
    let callee = match call.callee {
        FunctionRef::Internal(id) => format!("fn{}", id.0),
        FunctionRef::External(id) => format!("extern{}", id.0),
    };
    let args: Vec<String> = call.args.iter().map(format_operand).collect();
    let dest = match &call.result {
        CallResult::None => String::new(),
        CallResult::Temp(id) => format!("t{} = ", id.0),
        CallResult::Sret(place) => format!("{} = ", format_place(place)),
    };
    format!("{dest}call {callee}({})", args.join(", "))
}

fn format_rvalue(rvalue: &RValue) -> String {
    match rvalue {
        RValue::Use(op) => format_operand(op),
        RValue::Ref(place) => format!("&{}", format_place(place)),
        RValue::UnaryOp(op, operand) => format!("{:?}({})", op, format_operand(operand)),
        RValue::BinaryOp(op, left, right) => format!("{:?}({}, {})", op, format_operand(left), format_operand(right)),
        RValue::Cast(kind, operand, ty) => format!("{:?}({}) as {:?}", kind, format_operand(operand), ty),
    }
}

fn format_operand(op: &Operand) -> String {
    match op {
        Operand::Temp(id) => format!("t{}", id.0),
        Operand::Constant(c) => format_constant(c),
    }
}

fn format_constant(c: &Constant) -> String {
    match c {
        Constant::Int(v) => v.to_string(),
        Constant::Uint(v) => format!("{v}u"),
        Constant::Bool(v) => v.to_string(),
        Constant::Char(v) => format!("{v:?}"),
        Constant::String(s) => format!("{:?}", s.as_str()),
        Constant::Unit => "()".to_string(),
    }
}

fn format_place(place: &Place) -> String {
    let mut base = match &place.base {
        PlaceBase::Local(id) => format!("_{}", id.0),
        PlaceBase::Pointer(id) => format!("(*t{})", id.0),
    };
    for proj in &place.projections {
        match proj {
            Projection::Field(idx) => base = format!("{base}.{idx}"),
            Projection::Index(op) => base = format!("{base}[{}]", format_operand(op)),
        }
    }
    base
}

fn format_init_pattern(pattern: &InitPattern) -> String {
    match pattern {
        InitPattern::Struct { leaves } => format!("{{ {} }}", leaves.iter().map(format_init_leaf).collect::<Vec<_>>().join(", ")),
        InitPattern::ArrayLiteral { leaves } => format!("[{}]", leaves.iter().map(format_init_leaf).collect::<Vec<_>>().join(", ")),
        InitPattern::ArrayRepeat { leaf, count } => format!("[{}; {count}]", format_init_leaf(leaf)),
        InitPattern::Copy { src } => format!("copy {}", format_place(src)),
    }
}

fn format_init_leaf(leaf: &InitLeaf) -> String {
    match leaf {
        InitLeaf::Value(op) => format_operand(op),
        InitLeaf::Omitted => "<omitted>".to_string(),
    }
}

fn format_sig(sig: &crate::mir::MirFunctionSig, ctx: &Context) -> String {
    let params: Vec<String> = sig
        .abi_params
        .iter()
        .map(|p| match p {
            AbiParam::Direct(ty) => format_type(ctx, *ty),
            AbiParam::ByValCallerCopy(ty) => format!("{} (by-val-caller-copy)", format_type(ctx, *ty)),
            AbiParam::SRet(ty) => format!("sret {}", format_type(ctx, *ty)),
        })
        .collect();
    let ret = match sig.ret {
        ReturnDesc::RetDirect(ty) => format_type(ctx, ty),
        ReturnDesc::RetIndirectSRet => "() /* via sret */".to_string(),
        ReturnDesc::RetVoid => "()".to_string(),
        ReturnDesc::RetNever => "!".to_string(),
    };
    format!("({}) -> {ret}", params.join(", "))
}

pub fn format_type(ctx: &Context, ty: faxc_sem::TypeId) -> String {
    match ctx.types.resolve(ty) {
        Type::Primitive(p) => format!("{p:?}").to_lowercase(),
        Type::Struct { def_ref } => struct_name(ctx, *def_ref).unwrap_or_else(|| format!("struct#{}", def_ref.0)),
        Type::Enum { def_ref } => enum_name(ctx, *def_ref).unwrap_or_else(|| format!("enum#{}", def_ref.0)),
        Type::Reference { referent, is_mutable } => {
            format!("&{}{}", if *is_mutable { "mut " } else { "" }, format_type(ctx, *referent))
        }
        Type::Array { element, size } => format!("[{}; {size}]", format_type(ctx, *element)),
        Type::Unit => "()".to_string(),
        Type::Never => "!".to_string(),
        Type::Underscore => "_".to_string(),
    }
}

fn struct_name(ctx: &Context, def_ref: faxc_util::DefId) -> Option<String> {
    ctx.struct_names.iter().find(|(_, (_, d))| *d == def_ref).map(|(name, _)| name.as_str().to_string())
}

fn enum_name(ctx: &Context, def_ref: faxc_util::DefId) -> Option<String> {
    ctx.enum_names.iter().find(|(_, (_, d))| *d == def_ref).map(|(name, _)| name.as_str().to_string())
}
