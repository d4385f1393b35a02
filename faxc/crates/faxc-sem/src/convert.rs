//! C2: converts the parser's AST into HIR (§4.1). This is a structural
//! one-to-one walk — no names are resolved and no types are checked here —
//! except for three desugarings performed in place:
//!
//! - `x OP= e` becomes `x = (x OP e)`.
//! - unary minus applied directly to an integer literal folds into a
//!   negative-flagged literal rather than a `Unary` node.
//! - a two-segment path `A::B` becomes `TypeStatic{ty_name: A, member: B}`;
//!   a single segment becomes an unresolved identifier; more than two
//!   segments is rejected (no module system in scope).

use crate::error::{SemanticError, SemanticResult};
use crate::hir::*;
use faxc_par::ast;
use faxc_util::{DefIdGenerator, Span, Symbol};

pub struct Converter {
    def_gen: DefIdGenerator,
    program: Program,
}

impl Converter {
    pub fn new() -> Self {
        Converter {
            def_gen: DefIdGenerator::new(),
            program: Program::new(),
        }
    }

    pub fn convert_program(mut self, items: Vec<ast::Item>) -> SemanticResult<Program> {
        for item in items {
            self.convert_item(item)?;
        }
        Ok(self.program)
    }

    fn convert_item(&mut self, item: ast::Item) -> SemanticResult<()> {
        match item {
            ast::Item::Fn(f) => {
                reject_non_goals_fn(&f)?;
                let id = FunctionId(self.program.functions.len() as u32);
                let converted = self.convert_fn_item(f)?;
                self.program.functions.push(converted);
                self.program.items.push(Item::Function(id));
            }
            ast::Item::Struct(s) => {
                let id = StructId(self.program.structs.len() as u32);
                let converted = self.convert_struct_item(s)?;
                self.program.structs.push(converted);
                self.program.items.push(Item::StructDef(id));
            }
            ast::Item::Enum(e) => {
                let id = EnumId(self.program.enums.len() as u32);
                let converted = self.convert_enum_item(e)?;
                self.program.enums.push(converted);
                self.program.items.push(Item::EnumDef(id));
            }
            ast::Item::Const(c) => {
                let id = ConstId(self.program.consts.len() as u32);
                let converted = self.convert_const_item(c)?;
                self.program.consts.push(converted);
                self.program.items.push(Item::ConstDef(id));
            }
            ast::Item::Trait(t) => {
                let id = TraitId(self.program.traits.len() as u32);
                let converted = self.convert_trait_item(t)?;
                self.program.traits.push(converted);
                self.program.items.push(Item::Trait(id));
            }
            ast::Item::Impl(i) => {
                let id = ImplId(self.program.impls.len() as u32);
                let converted = self.convert_impl_item(i, id)?;
                self.program.impls.push(converted);
                self.program.items.push(Item::Impl(id));
            }
            ast::Item::Use(_) | ast::Item::Static(_) => {
                // No module system, no mutable statics in scope.
                return Err(SemanticError::new(
                    "use declarations and static items are not supported",
                    Span::DUMMY,
                ));
            }
        }
        Ok(())
    }

    fn convert_fn_item(&mut self, f: ast::FnItem) -> SemanticResult<FnItem> {
        let def_id = self.def_gen.next();
        let span = f.span;
        let mut locals = Vec::new();
        let params = f
            .params
            .iter()
            .map(|p| {
                let ty = self.convert_type(&p.ty)?;
                Ok(push_local(&mut locals, p.name, p.mutable, ty, span))
            })
            .collect::<SemanticResult<Vec<_>>>()?;
        let ret_type = match &f.ret_type {
            Some(t) => self.convert_type(t)?,
            None => TypeAnnotation::Unresolved(UnresolvedType::Unit),
        };
        let body = self.convert_block(f.body, &mut locals)?;
        Ok(FnItem {
            def_id,
            name: f.name,
            params,
            ret_type,
            locals,
            body,
            span,
        })
    }

    fn convert_struct_item(&mut self, s: ast::StructItem) -> SemanticResult<StructItem> {
        let def_id = self.def_gen.next();
        let fields = s
            .fields
            .iter()
            .map(|f| {
                Ok(FieldDef {
                    name: f.name,
                    ty: self.convert_type(&f.ty)?,
                })
            })
            .collect::<SemanticResult<Vec<_>>>()?;
        Ok(StructItem {
            def_id,
            name: s.name,
            fields,
            span: s.span,
        })
    }

    fn convert_enum_item(&mut self, e: ast::EnumItem) -> SemanticResult<EnumItem> {
        let def_id = self.def_gen.next();
        let variants = e
            .variants
            .iter()
            .map(|v| {
                let data = match &v.data {
                    ast::VariantData::Unit => VariantData::Unit,
                    ast::VariantData::Tuple(tys) => VariantData::Tuple(
                        tys.iter()
                            .map(|t| self.convert_type(t))
                            .collect::<SemanticResult<Vec<_>>>()?,
                    ),
                    ast::VariantData::Struct(fields) => VariantData::Struct(
                        fields
                            .iter()
                            .map(|f| {
                                Ok(FieldDef {
                                    name: f.name,
                                    ty: self.convert_type(&f.ty)?,
                                })
                            })
                            .collect::<SemanticResult<Vec<_>>>()?,
                    ),
                };
                Ok(VariantDef {
                    def_id: self.def_gen.next(),
                    name: v.name,
                    data,
                })
            })
            .collect::<SemanticResult<Vec<_>>>()?;
        Ok(EnumItem {
            def_id,
            name: e.name,
            variants,
            span: e.span,
        })
    }

    fn convert_const_item(&mut self, c: ast::ConstItem) -> SemanticResult<ConstItem> {
        let def_id = self.def_gen.next();
        let ty = self.convert_type(&c.ty)?;
        let mut dummy_locals = Vec::new();
        let value = self.convert_expr(c.value, &mut dummy_locals)?;
        Ok(ConstItem {
            def_id,
            name: c.name,
            ty,
            value,
            span: c.span,
        })
    }

    fn convert_trait_item(&mut self, t: ast::TraitItem) -> SemanticResult<TraitItem> {
        let def_id = self.def_gen.next();
        let items = t
            .items
            .iter()
            .map(|m| match m {
                ast::TraitMember::Method(sig) => {
                    let self_mode = self_mode_of(&sig.params);
                    let param_types = sig
                        .params
                        .iter()
                        .filter(|p| !is_self_param(p))
                        .map(|p| self.convert_type(&p.ty))
                        .collect::<SemanticResult<Vec<_>>>()?;
                    let ret_type = match &sig.ret_type {
                        Some(t) => self.convert_type(t)?,
                        None => TypeAnnotation::Unresolved(UnresolvedType::Unit),
                    };
                    Ok(TraitItemKind::Method(TraitFnSig {
                        def_id: self.def_gen.next(),
                        name: sig.name,
                        self_mode,
                        param_types,
                        ret_type,
                    }))
                }
                ast::TraitMember::Const(name, ty, _default) => {
                    Ok(TraitItemKind::Const(*name, self.convert_type(ty)?))
                }
                ast::TraitMember::Type(_, _) => Err(SemanticError::new(
                    "associated types are not supported",
                    Span::DUMMY,
                )),
            })
            .collect::<SemanticResult<Vec<_>>>()?;
        Ok(TraitItem {
            def_id,
            name: t.name,
            items,
            span: Span::DUMMY,
        })
    }

    fn convert_impl_item(&mut self, i: ast::ImplItem, impl_id: ImplId) -> SemanticResult<ImplItem> {
        if !i.generics.is_empty() {
            return Err(SemanticError::new("generic impls are not supported", Span::DUMMY));
        }
        let self_ty = self.convert_type(&i.self_ty)?;
        let trait_ref = None; // resolved to a DefId by name resolution, not here.
        let trait_name = match &i.trait_ref {
            Some(ast::Type::Path(p)) if p.segments.len() == 1 => Some(p.segments[0].ident),
            Some(_) => {
                return Err(SemanticError::new("malformed trait reference", Span::DUMMY))
            }
            None => None,
        };
        let _ = trait_name; // recorded by name resolution via a side table, not stored on ImplItem directly here.
        let mut items = Vec::new();
        for member in i.items {
            match member {
                ast::ImplMember::Method(f) => {
                    reject_non_goals_fn(&f)?;
                    let method_id = MethodId(self.program.methods.len() as u32);
                    let method = self.convert_method_item(f, impl_id)?;
                    self.program.methods.push(method);
                    items.push(ImplItemKind::Method(method_id));
                }
                ast::ImplMember::Const(name, ty, value) => {
                    let def_id = self.def_gen.next();
                    let ty = self.convert_type(&ty)?;
                    let mut dummy_locals = Vec::new();
                    let value = self.convert_expr(value, &mut dummy_locals)?;
                    let const_id = ConstId(self.program.consts.len() as u32);
                    self.program.consts.push(ConstItem {
                        def_id,
                        name,
                        ty,
                        value,
                        span: Span::DUMMY,
                    });
                    items.push(ImplItemKind::Const(const_id));
                }
                ast::ImplMember::Type(_, _) => {
                    return Err(SemanticError::new(
                        "associated types are not supported",
                        Span::DUMMY,
                    ))
                }
            }
        }
        Ok(ImplItem {
            self_ty,
            trait_ref,
            items,
            span: Span::DUMMY,
        })
    }

    fn convert_method_item(&mut self, f: ast::FnItem, owning_impl: ImplId) -> SemanticResult<MethodItem> {
        let def_id = self.def_gen.next();
        let span = f.span;
        let self_mode = self_mode_of(&f.params);
        let mut locals = Vec::new();
        let params = f
            .params
            .iter()
            .filter(|p| !is_self_param(p))
            .map(|p| {
                let ty = self.convert_type(&p.ty)?;
                Ok(push_local(&mut locals, p.name, p.mutable, ty, span))
            })
            .collect::<SemanticResult<Vec<_>>>()?;
        let ret_type = match &f.ret_type {
            Some(t) => self.convert_type(t)?,
            None => TypeAnnotation::Unresolved(UnresolvedType::Unit),
        };
        let body = self.convert_block(f.body, &mut locals)?;
        Ok(MethodItem {
            def_id,
            name: f.name,
            self_mode,
            params,
            ret_type,
            locals,
            body,
            span,
            owning_impl,
        })
    }

    fn convert_block(&mut self, block: ast::Block, locals: &mut Vec<LocalDef>) -> SemanticResult<Block> {
        let mut stmts = Vec::with_capacity(block.stmts.len());
        for stmt in block.stmts {
            if let Some(converted) = self.convert_stmt(stmt, locals)? {
                stmts.push(converted);
            }
        }
        let trailing = block
            .trailing
            .map(|e| self.convert_expr(*e, locals).map(Box::new))
            .transpose()?;
        Ok(Block {
            stmts,
            trailing,
            span: block.span,
            info: None,
        })
    }

    fn convert_stmt(&mut self, stmt: ast::Stmt, locals: &mut Vec<LocalDef>) -> SemanticResult<Option<Stmt>> {
        match stmt {
            ast::Stmt::Let(l) => {
                let ty = l.ty.as_ref().map(|t| self.convert_type(t)).transpose()?;
                let init = l.init.map(|e| self.convert_expr(e, locals)).transpose()?;
                let pattern = self.convert_pattern(l.pattern, l.mutable, locals)?;
                Ok(Some(Stmt::Let(LetStmt { pattern, ty, init })))
            }
            ast::Stmt::Expr(e) => Ok(Some(Stmt::Expr(self.convert_expr(e, locals)?))),
            ast::Stmt::Return(e) => Ok(Some(Stmt::Expr(self.convert_return(e, locals)?))),
            ast::Stmt::Break(label) => {
                reject_label(label)?;
                Ok(Some(Stmt::Expr(Expr::new(
                    ExprKind::Break {
                        value: None,
                        target: None,
                    },
                    Span::DUMMY,
                ))))
            }
            ast::Stmt::Continue(label) => {
                reject_label(label)?;
                Ok(Some(Stmt::Expr(Expr::new(
                    ExprKind::Continue { target: None },
                    Span::DUMMY,
                ))))
            }
            ast::Stmt::If(if_stmt) => Ok(Some(Stmt::Expr(self.convert_if(if_stmt, locals)?))),
            ast::Stmt::While(w) => {
                reject_label(w.label)?;
                let cond = Box::new(self.convert_expr(w.cond, locals)?);
                let body = self.convert_block(w.body, locals)?;
                Ok(Some(Stmt::Expr(Expr::new(
                    ExprKind::While {
                        id: LoopId(next_loop_id()),
                        cond,
                        body,
                    },
                    Span::DUMMY,
                ))))
            }
            ast::Stmt::For(_) => Err(SemanticError::new("for loops are not supported", Span::DUMMY)),
            ast::Stmt::Item(item) => {
                let before = self.program.items.len();
                self.convert_item(item)?;
                // The freshly converted item was appended at the program
                // level; thread its `Item` handle back into this block so
                // name resolution can hoist it within the enclosing scope.
                let handle = self.program.items[before];
                Ok(Some(Stmt::Item(handle)))
            }
        }
    }

    fn convert_return(&mut self, e: Option<Box<ast::Expr>>, locals: &mut Vec<LocalDef>) -> SemanticResult<Expr> {
        let value = e.map(|e| self.convert_expr(*e, locals).map(Box::new)).transpose()?;
        Ok(Expr::new(ExprKind::Return { value, target: None }, Span::DUMMY))
    }

    fn convert_if(&mut self, s: ast::IfStmt, locals: &mut Vec<LocalDef>) -> SemanticResult<Expr> {
        let cond = Box::new(self.convert_expr(s.cond, locals)?);
        let then_branch = self.convert_block(s.then_block, locals)?;
        let else_branch = match s.else_clause {
            Some(clause) => Some(Box::new(match *clause {
                ast::ElseClause::Block(b) => {
                    let block = self.convert_block(b, locals)?;
                    Expr::new(ExprKind::Block(block), Span::DUMMY)
                }
                ast::ElseClause::If(inner) => self.convert_if(inner, locals)?,
            })),
            None => None,
        };
        Ok(Expr::new(
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            },
            Span::DUMMY,
        ))
    }

    fn convert_pattern(
        &mut self,
        pat: ast::Pattern,
        is_mut: bool,
        locals: &mut Vec<LocalDef>,
    ) -> SemanticResult<Pattern> {
        match pat {
            ast::Pattern::Wildcard => Ok(Pattern::Wildcard),
            ast::Pattern::Ident(name, mutability) => {
                let is_mut = is_mut || matches!(mutability, ast::Mutability::Mutable);
                Ok(Pattern::BindingDef(LocalRef::Unresolved {
                    name,
                    is_mut,
                    is_ref: false,
                }))
            }
            _ => Err(SemanticError::new(
                "only wildcard and binding patterns are supported",
                Span::DUMMY,
            )),
        }
        .map(|p| {
            let _ = locals; // locals grow lazily once name resolution owns binding creation (§4.2).
            p
        })
    }

    fn convert_expr(&mut self, expr: ast::Expr, locals: &mut Vec<LocalDef>) -> SemanticResult<Expr> {
        match expr {
            ast::Expr::Literal(ast::Literal::Float(_)) => {
                Err(SemanticError::new("floating-point literals are not supported", Span::DUMMY))
            }
            ast::Expr::Literal(lit) => Ok(Expr::new(ExprKind::Literal(convert_literal(lit)), Span::DUMMY)),
            ast::Expr::Path(path) => self.convert_path(path),
            ast::Expr::Binary(b) => {
                let left = Box::new(self.convert_expr(*b.left, locals)?);
                let right = Box::new(self.convert_expr(*b.right, locals)?);
                Ok(Expr::new(
                    ExprKind::Binary {
                        op: convert_binop(b.op),
                        left,
                        right,
                    },
                    b.span,
                ))
            }
            ast::Expr::Unary(u) => self.convert_unary(u, locals),
            ast::Expr::Call(c) => {
                let callee = Box::new(self.convert_expr(*c.func, locals)?);
                let args = c
                    .args
                    .into_iter()
                    .map(|a| self.convert_expr(a, locals))
                    .collect::<SemanticResult<Vec<_>>>()?;
                Ok(Expr::new(ExprKind::Call { callee, args }, c.span))
            }
            ast::Expr::MethodCall(m) => {
                let receiver = Box::new(self.convert_expr(*m.receiver, locals)?);
                let args = m
                    .call_args
                    .into_iter()
                    .map(|a| self.convert_expr(a, locals))
                    .collect::<SemanticResult<Vec<_>>>()?;
                Ok(Expr::new(
                    ExprKind::MethodCall {
                        receiver,
                        method_name: m.method,
                        method: None,
                        args,
                    },
                    Span::DUMMY,
                ))
            }
            ast::Expr::Field(f) => {
                let base = Box::new(self.convert_expr(*f.object, locals)?);
                Ok(Expr::new(
                    ExprKind::Field {
                        base,
                        field: FieldRef::Name(f.field),
                    },
                    f.span,
                ))
            }
            ast::Expr::Index(i) => {
                let base = Box::new(self.convert_expr(*i.object, locals)?);
                let index = Box::new(self.convert_expr(*i.index, locals)?);
                Ok(Expr::new(ExprKind::Index { base, index }, Span::DUMMY))
            }
            ast::Expr::Block(b) => Ok(Expr::new(ExprKind::Block(self.convert_block(b, locals)?), Span::DUMMY)),
            ast::Expr::If(i) => {
                let cond = Box::new(self.convert_expr(*i.cond, locals)?);
                let then_branch = self.convert_block(i.then_block, locals)?;
                let else_branch = i
                    .else_block
                    .map(|e| self.convert_expr(*e, locals).map(Box::new))
                    .transpose()?;
                Ok(Expr::new(
                    ExprKind::If {
                        cond,
                        then_branch,
                        else_branch,
                    },
                    Span::DUMMY,
                ))
            }
            ast::Expr::Loop(body) => {
                let body = self.convert_block(body, locals)?;
                Ok(Expr::new(
                    ExprKind::Loop {
                        id: LoopId(next_loop_id()),
                        body,
                        break_type: None,
                    },
                    Span::DUMMY,
                ))
            }
            ast::Expr::While(cond, body) => {
                let cond = Box::new(self.convert_expr(*cond, locals)?);
                let body = self.convert_block(body, locals)?;
                Ok(Expr::new(
                    ExprKind::While {
                        id: LoopId(next_loop_id()),
                        cond,
                        body,
                    },
                    Span::DUMMY,
                ))
            }
            ast::Expr::Assign(a) => {
                let place = Box::new(self.convert_expr(*a.place, locals)?);
                let value = Box::new(self.convert_expr(*a.value, locals)?);
                Ok(Expr::new(ExprKind::Assign { place, value }, Span::DUMMY))
            }
            ast::Expr::CompoundAssign(c) => {
                // `x OP= e` -> `x = (x OP e)`.
                let place = self.convert_expr(*c.place.clone(), locals)?;
                let lhs_copy = self.convert_expr(*c.place, locals)?;
                let value = self.convert_expr(*c.value, locals)?;
                let rhs = Expr::new(
                    ExprKind::Binary {
                        op: convert_binop(c.op),
                        left: Box::new(lhs_copy),
                        right: Box::new(value),
                    },
                    Span::DUMMY,
                );
                Ok(Expr::new(
                    ExprKind::Assign {
                        place: Box::new(place),
                        value: Box::new(rhs),
                    },
                    Span::DUMMY,
                ))
            }
            ast::Expr::Return(e) => self.convert_return(e, locals),
            ast::Expr::Break(value, label) => {
                reject_label(label)?;
                let value = value.map(|e| self.convert_expr(*e, locals).map(Box::new)).transpose()?;
                Ok(Expr::new(ExprKind::Break { value, target: None }, Span::DUMMY))
            }
            ast::Expr::Continue(label) => {
                reject_label(label)?;
                Ok(Expr::new(ExprKind::Continue { target: None }, Span::DUMMY))
            }
            ast::Expr::Cast(e, ty) => {
                let operand = Box::new(self.convert_expr(*e, locals)?);
                let target = self.convert_type(&ty)?;
                Ok(Expr::new(ExprKind::Cast { operand, target }, Span::DUMMY))
            }
            ast::Expr::StructLiteral(s) => self.convert_struct_literal(*s, locals),
            ast::Expr::Array(items) => {
                let items = items
                    .into_iter()
                    .map(|e| self.convert_expr(e, locals))
                    .collect::<SemanticResult<Vec<_>>>()?;
                Ok(Expr::new(ExprKind::ArrayLiteral(items), Span::DUMMY))
            }
            ast::Expr::EnumVariant(v) => self.convert_enum_variant(*v),
            ast::Expr::Range(_)
            | ast::Expr::Tuple(_)
            | ast::Expr::Match(_)
            | ast::Expr::Closure(_)
            | ast::Expr::Async(_)
            | ast::Expr::Await(_) => Err(SemanticError::new(
                "this expression form is not supported",
                Span::DUMMY,
            )),
        }
    }

    fn convert_unary(&mut self, u: ast::UnaryExpr, locals: &mut Vec<LocalDef>) -> SemanticResult<Expr> {
        if u.op == ast::UnOp::Neg {
            if let ast::Expr::Literal(ast::Literal::Int(n)) = *u.expr {
                return Ok(Expr::new(
                    ExprKind::Literal(Literal::Int {
                        value: n,
                        negative: true,
                    }),
                    u.span,
                ));
            }
        }
        let operand = Box::new(self.convert_expr(*u.expr, locals)?);
        let op = match u.op {
            ast::UnOp::Neg => UnOp::Neg,
            ast::UnOp::Not => UnOp::Not,
            ast::UnOp::Deref => UnOp::Deref,
            ast::UnOp::Ref(is_mut) => UnOp::Ref(is_mut),
            ast::UnOp::BitNot => UnOp::Not,
        };
        Ok(Expr::new(ExprKind::Unary { op, operand }, u.span))
    }

    fn convert_struct_literal(&mut self, s: ast::StructLiteralExpr, locals: &mut Vec<LocalDef>) -> SemanticResult<Expr> {
        if s.path.segments.len() != 1 {
            return Err(SemanticError::new("malformed struct name", Span::DUMMY));
        }
        if s.base.is_some() {
            return Err(SemanticError::new(
                "functional-update struct syntax is not supported",
                Span::DUMMY,
            ));
        }
        let name = s.path.segments[0].ident;
        let fields = s
            .fields
            .into_iter()
            .map(|f| Ok((f.name, self.convert_expr(f.expr, locals)?)))
            .collect::<SemanticResult<Vec<_>>>()?;
        // `def_ref` is filled in by name resolution once `name` resolves to
        // a struct definition; a placeholder id is patched in at that point.
        Ok(Expr::new(
            ExprKind::StructLiteral {
                def_ref: StructId(u32::MAX),
                name,
                fields,
            },
            Span::DUMMY,
        ))
    }

    fn convert_enum_variant(&mut self, v: ast::EnumVariantExpr) -> SemanticResult<Expr> {
        // Variants carrying data can be declared (`VariantData::Tuple`/`Struct`
        // on `EnumItem`) but never constructed or destructured here: the only
        // destructuring form is `match`, which is out of scope, so a
        // data-carrying variant has no way to produce or consume its payload.
        if !matches!(v.data, ast::EnumVariantData::Unit) {
            return Err(SemanticError::new(
                "enum variants with data cannot be constructed",
                Span::DUMMY,
            ));
        }
        if v.path.segments.len() != 1 {
            return Err(SemanticError::new("malformed enum name", Span::DUMMY));
        }
        Ok(Expr::new(
            ExprKind::TypeStatic(TypeStatic {
                ty_name: v.path.segments[0].ident,
                member_name: v.variant,
            }),
            Span::DUMMY,
        ))
    }

    fn convert_path(&mut self, path: ast::Path) -> SemanticResult<Expr> {
        match path.segments.len() {
            1 => Ok(Expr::new(
                ExprKind::Name(NameUse::UnresolvedIdentifier(path.segments[0].ident)),
                Span::DUMMY,
            )),
            2 => Ok(Expr::new(
                ExprKind::TypeStatic(TypeStatic {
                    ty_name: path.segments[0].ident,
                    member_name: path.segments[1].ident,
                }),
                Span::DUMMY,
            )),
            _ => Err(SemanticError::new(
                "paths with more than two segments are not supported",
                Span::DUMMY,
            )),
        }
    }

    fn convert_type(&mut self, ty: &ast::Type) -> SemanticResult<TypeAnnotation> {
        let unresolved = match ty {
            ast::Type::Unit => UnresolvedType::Unit,
            ast::Type::Inferred => UnresolvedType::Underscore,
            ast::Type::Path(p) if p.segments.len() == 1 => UnresolvedType::Name(p.segments[0].ident),
            ast::Type::Reference(inner, m) => UnresolvedType::Reference(
                Box::new(self.convert_type(inner)?),
                matches!(m, ast::Mutability::Mutable),
            ),
            ast::Type::Array(inner, size) => UnresolvedType::Array(Box::new(self.convert_type(inner)?), *size),
            ast::Type::Never
            | ast::Type::Path(_)
            | ast::Type::Generic(_, _)
            | ast::Type::Pointer(_, _)
            | ast::Type::Slice(_)
            | ast::Type::Tuple(_)
            | ast::Type::Fn(_, _)
            | ast::Type::TraitObject(_)
            | ast::Type::ImplTrait(_) => {
                return Err(SemanticError::new(
                    "this type form is not supported",
                    Span::DUMMY,
                ))
            }
        };
        Ok(TypeAnnotation::Unresolved(unresolved))
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new()
    }
}

fn push_local(locals: &mut Vec<LocalDef>, name: Symbol, is_mutable: bool, ty: TypeAnnotation, span: Span) -> LocalId {
    let id = LocalId(locals.len() as u32);
    locals.push(LocalDef {
        name,
        is_mutable,
        ty,
        span,
    });
    id
}

fn convert_literal(lit: ast::Literal) -> Literal {
    match lit {
        ast::Literal::Int(n) => Literal::Int {
            value: n,
            negative: false,
        },
        ast::Literal::Bool(b) => Literal::Bool(b),
        ast::Literal::Char(c) => Literal::Char(c),
        ast::Literal::String(s) => Literal::String(s),
        ast::Literal::Unit => Literal::Unit,
        ast::Literal::Float(_) => Literal::Unit, // unreachable: rejected before reaching here.
    }
}

fn convert_binop(op: ast::BinOp) -> BinOp {
    match op {
        ast::BinOp::Add => BinOp::Add,
        ast::BinOp::Sub => BinOp::Sub,
        ast::BinOp::Mul => BinOp::Mul,
        ast::BinOp::Div => BinOp::Div,
        ast::BinOp::Mod => BinOp::Mod,
        ast::BinOp::Eq => BinOp::Eq,
        ast::BinOp::Ne => BinOp::Ne,
        ast::BinOp::Lt => BinOp::Lt,
        ast::BinOp::Gt => BinOp::Gt,
        ast::BinOp::Le => BinOp::Le,
        ast::BinOp::Ge => BinOp::Ge,
        ast::BinOp::And => BinOp::And,
        ast::BinOp::Or => BinOp::Or,
        ast::BinOp::BitAnd => BinOp::BitAnd,
        ast::BinOp::BitOr => BinOp::BitOr,
        ast::BinOp::BitXor => BinOp::BitXor,
        ast::BinOp::Shl => BinOp::Shl,
        ast::BinOp::Shr => BinOp::Shr,
    }
}

fn is_self_param(p: &ast::Param) -> bool {
    p.name.eq_str("self")
}

fn self_mode_of(params: &[ast::Param]) -> Option<SelfMode> {
    let self_param = params.iter().find(|p| is_self_param(p))?;
    Some(match &self_param.ty {
        ast::Type::Reference(_, ast::Mutability::Mutable) => SelfMode::RefMut,
        ast::Type::Reference(_, ast::Mutability::Immutable) => SelfMode::Ref,
        _ => SelfMode::Value,
    })
}

fn reject_non_goals_fn(f: &ast::FnItem) -> SemanticResult<()> {
    if !f.generics.is_empty() {
        return Err(SemanticError::new("generic functions are not supported", f.span));
    }
    if f.async_kw {
        return Err(SemanticError::new("async functions are not supported", f.span));
    }
    Ok(())
}

fn reject_label(label: Option<Symbol>) -> SemanticResult<()> {
    if label.is_some() {
        return Err(SemanticError::new(
            "labeled break/continue is not supported",
            Span::DUMMY,
        ));
    }
    Ok(())
}

// Loop identity is assigned during conversion rather than by control-flow
// linking: the expression checker's endpoint algebra (§4.4.2) needs to peel
// a break/continue's target against its *own* enclosing loop while it is
// still walking the tree, before the separate C7 pass ever runs.
use std::sync::atomic::{AtomicU32, Ordering};
static NEXT_LOOP_ID: AtomicU32 = AtomicU32::new(0);
fn next_loop_id() -> u32 {
    NEXT_LOOP_ID.fetch_add(1, Ordering::Relaxed)
}
