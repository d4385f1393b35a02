//! HIR pretty-printer (supplemented feature, grounded in the original
//! implementation's `pretty_print.hpp`): renders a checked [`Program`] back
//! to a readable, S-expression-flavored text form. Used by the driver's
//! `--dump-hir` flag and by tests that want a stable text assertion target
//! instead of poking at internal HIR indices.

use crate::hir::*;
use std::fmt::Write;

pub fn print_program(program: &Program) -> String {
    let mut out = String::new();
    for (i, s) in program.structs.iter().enumerate() {
        print_struct(&mut out, StructId(i as u32), s);
    }
    for (i, e) in program.enums.iter().enumerate() {
        print_enum(&mut out, EnumId(i as u32), e);
    }
    for (i, c) in program.consts.iter().enumerate() {
        print_const(&mut out, ConstId(i as u32), c);
    }
    for (i, f) in program.functions.iter().enumerate() {
        print_function(&mut out, FunctionId(i as u32), f);
    }
    for (i, m) in program.methods.iter().enumerate() {
        print_method(&mut out, MethodId(i as u32), m);
    }
    out
}

fn print_struct(out: &mut String, id: StructId, item: &StructItem) {
    let _ = writeln!(out, "(struct {} #{}", item.name.as_str(), id.0);
    for f in &item.fields {
        let _ = writeln!(out, "  (field {} {})", f.name.as_str(), fmt_ty(&f.ty));
    }
    out.push_str(")\n");
}

fn print_enum(out: &mut String, id: EnumId, item: &EnumItem) {
    let _ = writeln!(out, "(enum {} #{}", item.name.as_str(), id.0);
    for v in &item.variants {
        match &v.data {
            VariantData::Unit => {
                let _ = writeln!(out, "  (variant {})", v.name.as_str());
            }
            VariantData::Tuple(tys) => {
                let tys: Vec<String> = tys.iter().map(fmt_ty).collect();
                let _ = writeln!(out, "  (variant {} ({}))", v.name.as_str(), tys.join(" "));
            }
            VariantData::Struct(fields) => {
                let names: Vec<String> = fields.iter().map(|f| format!("{} {}", f.name.as_str(), fmt_ty(&f.ty))).collect();
                let _ = writeln!(out, "  (variant {} {{{}}})", v.name.as_str(), names.join(", "));
            }
        }
    }
    out.push_str(")\n");
}

fn print_const(out: &mut String, id: ConstId, item: &ConstItem) {
    let _ = writeln!(out, "(const {} #{} : {})", item.name.as_str(), id.0, fmt_ty(&item.ty));
}

fn print_function(out: &mut String, id: FunctionId, item: &FnItem) {
    let params: Vec<String> = item.params.iter().map(|p| fmt_local(item, *p)).collect();
    let _ = writeln!(out, "(fn {} #{} ({}) -> {}", item.name.as_str(), id.0, params.join(" "), fmt_ty(&item.ret_type));
    print_block(out, &item.body, 1);
    out.push_str(")\n");
}

fn print_method(out: &mut String, id: MethodId, item: &MethodItem) {
    let self_kind = match item.self_mode {
        SelfMode::Value => "self",
        SelfMode::Ref => "&self",
        SelfMode::RefMut => "&mut self",
    };
    let params: Vec<String> = item.params.iter().map(|p| fmt_local(item, *p)).collect();
    let _ = writeln!(out, "(method {} #{} ({self_kind} {}) -> {}", item.name.as_str(), id.0, params.join(" "), fmt_ty(&item.ret_type));
    print_block(out, &item.body, 1);
    out.push_str(")\n");
}

fn fmt_local(locals_owner: &impl LocalsOwner, id: LocalId) -> String {
    let local = locals_owner.local(id);
    format!("({} {})", local.name.as_str(), fmt_ty(&local.ty))
}

/// Both `FnItem` and `MethodItem` store their locals the same way; this
/// lets `fmt_local` look a param up without duplicating itself per caller.
trait LocalsOwner {
    fn local(&self, id: LocalId) -> &LocalDef;
}

impl LocalsOwner for FnItem {
    fn local(&self, id: LocalId) -> &LocalDef {
        &self.locals[id.0 as usize]
    }
}

impl LocalsOwner for MethodItem {
    fn local(&self, id: LocalId) -> &LocalDef {
        &self.locals[id.0 as usize]
    }
}

fn fmt_ty(ann: &TypeAnnotation) -> String {
    match ann {
        TypeAnnotation::Resolved(id) => format!("t#{}", id.0),
        TypeAnnotation::Unresolved(u) => match u {
            UnresolvedType::Name(n) => n.as_str().to_string(),
            UnresolvedType::Reference(inner, is_mut) => format!("&{}{}", if *is_mut { "mut " } else { "" }, fmt_ty(inner)),
            UnresolvedType::Array(inner, size) => format!("[{}; {size}]", fmt_ty(inner)),
            UnresolvedType::Unit => "()".to_string(),
            UnresolvedType::Underscore => "_".to_string(),
        },
    }
}

fn print_block(out: &mut String, block: &Block, depth: usize) {
    let indent = "  ".repeat(depth);
    let _ = writeln!(out, "{indent}(block");
    for stmt in &block.stmts {
        print_stmt(out, stmt, depth + 1);
    }
    if let Some(trailing) = &block.trailing {
        print_expr(out, trailing, depth + 1);
    }
    let _ = writeln!(out, "{indent})");
}

fn print_stmt(out: &mut String, stmt: &Stmt, depth: usize) {
    let indent = "  ".repeat(depth);
    match stmt {
        Stmt::Let(let_stmt) => {
            let _ = writeln!(out, "{indent}(let {}", fmt_pattern(&let_stmt.pattern));
            if let Some(init) = &let_stmt.init {
                print_expr(out, init, depth + 1);
            }
            let _ = writeln!(out, "{indent})");
        }
        Stmt::Expr(expr) => print_expr(out, expr, depth),
        Stmt::Item(_) => {
            let _ = writeln!(out, "{indent}(item)");
        }
    }
}

fn fmt_pattern(pattern: &Pattern) -> String {
    match pattern {
        Pattern::Wildcard => "_".to_string(),
        Pattern::BindingDef(local_ref) => fmt_local_ref(local_ref),
        Pattern::ReferencePattern { subpattern, is_mutable } => format!("&{}{}", if *is_mutable { "mut " } else { "" }, fmt_pattern(subpattern)),
    }
}

fn fmt_local_ref(local_ref: &LocalRef) -> String {
    match local_ref {
        LocalRef::Resolved(id) => format!("_{}", id.0),
        LocalRef::Unresolved { name, .. } => name.as_str().to_string(),
    }
}

fn print_expr(out: &mut String, expr: &Expr, depth: usize) {
    let indent = "  ".repeat(depth);
    match &expr.kind {
        ExprKind::Literal(lit) => {
            let _ = writeln!(out, "{indent}{}", fmt_literal(lit));
        }
        ExprKind::Name(name_use) => {
            let _ = writeln!(out, "{indent}{}", fmt_name_use(name_use));
        }
        ExprKind::TypeStatic(ts) => {
            let _ = writeln!(out, "{indent}{}::{}", ts.ty_name.as_str(), ts.member_name.as_str());
        }
        ExprKind::Binary { op, left, right } => {
            let _ = writeln!(out, "{indent}({op:?}");
            print_expr(out, left, depth + 1);
            print_expr(out, right, depth + 1);
            let _ = writeln!(out, "{indent})");
        }
        ExprKind::Unary { op, operand } => {
            let _ = writeln!(out, "{indent}({op:?}");
            print_expr(out, operand, depth + 1);
            let _ = writeln!(out, "{indent})");
        }
        ExprKind::Call { callee, args } => {
            let _ = writeln!(out, "{indent}(call");
            print_expr(out, callee, depth + 1);
            for arg in args {
                print_expr(out, arg, depth + 1);
            }
            let _ = writeln!(out, "{indent})");
        }
        ExprKind::MethodCall { receiver, method_name, args, .. } => {
            let _ = writeln!(out, "{indent}(method-call {}", method_name.as_str());
            print_expr(out, receiver, depth + 1);
            for arg in args {
                print_expr(out, arg, depth + 1);
            }
            let _ = writeln!(out, "{indent})");
        }
        ExprKind::Field { base, field } => {
            let field_str = match field {
                FieldRef::Name(n) => n.as_str().to_string(),
                FieldRef::Resolved(idx) => format!("#{idx}"),
            };
            let _ = writeln!(out, "{indent}(field {field_str}");
            print_expr(out, base, depth + 1);
            let _ = writeln!(out, "{indent})");
        }
        ExprKind::Index { base, index } => {
            let _ = writeln!(out, "{indent}(index");
            print_expr(out, base, depth + 1);
            print_expr(out, index, depth + 1);
            let _ = writeln!(out, "{indent})");
        }
        ExprKind::Block(block) => print_block(out, block, depth),
        ExprKind::If { cond, then_branch, else_branch } => {
            let _ = writeln!(out, "{indent}(if");
            print_expr(out, cond, depth + 1);
            print_block(out, then_branch, depth + 1);
            if let Some(else_branch) = else_branch {
                print_expr(out, else_branch, depth + 1);
            }
            let _ = writeln!(out, "{indent})");
        }
        ExprKind::Loop { body, .. } => {
            let _ = writeln!(out, "{indent}(loop");
            print_block(out, body, depth + 1);
            let _ = writeln!(out, "{indent})");
        }
        ExprKind::While { cond, body, .. } => {
            let _ = writeln!(out, "{indent}(while");
            print_expr(out, cond, depth + 1);
            print_block(out, body, depth + 1);
            let _ = writeln!(out, "{indent})");
        }
        ExprKind::Assign { place, value } => {
            let _ = writeln!(out, "{indent}(assign");
            print_expr(out, place, depth + 1);
            print_expr(out, value, depth + 1);
            let _ = writeln!(out, "{indent})");
        }
        ExprKind::Cast { operand, target } => {
            let _ = writeln!(out, "{indent}(cast {}", fmt_ty(target));
            print_expr(out, operand, depth + 1);
            let _ = writeln!(out, "{indent})");
        }
        ExprKind::StructLiteral { name, fields, .. } => {
            let _ = writeln!(out, "{indent}(struct-literal {}", name.as_str());
            for (field_name, value) in fields {
                let _ = writeln!(out, "{indent}  {}:", field_name.as_str());
                print_expr(out, value, depth + 2);
            }
            let _ = writeln!(out, "{indent})");
        }
        ExprKind::ArrayLiteral(elems) => {
            let _ = writeln!(out, "{indent}(array");
            for e in elems {
                print_expr(out, e, depth + 1);
            }
            let _ = writeln!(out, "{indent})");
        }
        ExprKind::ArrayRepeat { value, count } => {
            let _ = writeln!(out, "{indent}(array-repeat");
            print_expr(out, value, depth + 1);
            print_expr(out, count, depth + 1);
            let _ = writeln!(out, "{indent})");
        }
        ExprKind::Break { value, .. } => {
            let _ = writeln!(out, "{indent}(break");
            if let Some(value) = value {
                print_expr(out, value, depth + 1);
            }
            let _ = writeln!(out, "{indent})");
        }
        ExprKind::Continue { .. } => {
            let _ = writeln!(out, "{indent}(continue)");
        }
        ExprKind::Return { value, .. } => {
            let _ = writeln!(out, "{indent}(return");
            if let Some(value) = value {
                print_expr(out, value, depth + 1);
            }
            let _ = writeln!(out, "{indent})");
        }
    }
}

fn fmt_literal(lit: &Literal) -> String {
    match lit {
        Literal::Int { value, negative } => {
            if *negative {
                format!("-{value}")
            } else {
                value.to_string()
            }
        }
        Literal::Bool(b) => b.to_string(),
        Literal::Char(c) => format!("{c:?}"),
        Literal::String(s) => format!("{:?}", s.as_str()),
        Literal::Unit => "()".to_string(),
    }
}

fn fmt_name_use(name_use: &NameUse) -> String {
    match name_use {
        NameUse::UnresolvedIdentifier(name) => name.as_str().to_string(),
        NameUse::Variable(id) => format!("_{}", id.0),
        NameUse::ConstUse(id) => format!("const#{}", id.0),
        NameUse::FuncUse(id) => format!("fn#{}", id.0),
        NameUse::EnumVariant { def_ref, index } => format!("enum#{}::variant#{index}", def_ref.0),
        NameUse::StructConst { def_ref, assoc_const } => format!("struct#{}::const#{}", def_ref.0, assoc_const.0),
        NameUse::StructStatic { def_ref, assoc_fn } => format!("struct#{}::fn#{}", def_ref.0, assoc_fn.0),
    }
}
