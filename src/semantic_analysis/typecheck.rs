use crate::ast::*;
use crate::semantic_analysis::symbol_table::{Symbol, SymbolKind, SymbolTable};
use crate::semantic_analysis::{InnerSemError, Result, SemError};

struct TypeChecker {
    table: SymbolTable,
    /// Return type and name of the function whose body is being walked.
    current_fn: Option<(Type, Identifier)>,
}

fn err<T>(inner: InnerSemError, span: Span) -> Result<T> {
    Err(SemError::new(inner, span))
}

fn op_text(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::LessThan => "<",
        BinaryOp::GreaterThan => ">",
        BinaryOp::LessOrEqual => "<=",
        BinaryOp::GreaterOrEqual => ">=",
        BinaryOp::IsEqual => "==",
        BinaryOp::IsNotEqual => "!=",
        BinaryOp::LogicalAnd => "&&",
        BinaryOp::LogicalOr => "||",
    }
}

/// True for the initializer shapes a global is allowed to have: an integer
/// or bool literal, optionally behind a unary minus.
fn is_constant_init(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::IntLit(_) | ExprKind::BoolLit(_) => true,
        ExprKind::Unary(UnaryOp::Negate, inner) => matches!(inner.kind, ExprKind::IntLit(_)),
        _ => false,
    }
}

impl TypeChecker {
    fn new() -> Self {
        Self {
            table: SymbolTable::new(),
            current_fn: None,
        }
    }

    fn declare(&mut self, symbol: Symbol, span: Span) -> Result<()> {
        let name = symbol.name.clone();
        self.table
            .declare(symbol)
            .map_err(|()| SemError::new(InnerSemError::Redeclaration(name), span))
    }

    fn symbol_for_vardec(&self, dec: &VarDecl) -> Symbol {
        let level = self.table.level();
        if let Some(size) = dec.array_size {
            Symbol::array(dec.name.clone(), dec.ty, size, level)
        } else if dec.is_const {
            Symbol::constant(dec.name.clone(), dec.ty, level)
        } else {
            Symbol::var(dec.name.clone(), dec.ty, level)
        }
    }

    fn check_vardec_shape(&self, dec: &VarDecl) -> Result<()> {
        if dec.ty == Type::Void {
            return err(InnerSemError::VoidVariable(dec.name.clone()), dec.span);
        }
        if dec.array_size == Some(0) {
            return err(
                InnerSemError::ArraySizeMustBePositive(dec.name.clone()),
                dec.span,
            );
        }
        if dec.is_const {
            if dec.array_size.is_some() {
                return err(InnerSemError::ConstArray(dec.name.clone()), dec.span);
            }
            if dec.init.is_none() {
                return err(InnerSemError::ConstWithoutInit(dec.name.clone()), dec.span);
            }
        }
        Ok(())
    }

    /// Sub-pass 1: collect function signatures and global variables into the
    /// global scope before any body is walked, so forward references and
    /// hoisted calls are legal.
    fn collect_globals(&mut self, program: &Program) -> Result<()> {
        for dec in &program.declarations {
            match dec {
                Declaration::Fun(fun) => {
                    for param in &fun.params {
                        if param.ty == Type::Void {
                            return err(
                                InnerSemError::VoidVariable(param.name.clone()),
                                param.span,
                            );
                        }
                    }
                    let ptypes = fun.params.iter().map(|p| p.ty).collect();
                    let symbol = Symbol::function(fun.name.clone(), fun.return_type, ptypes);
                    self.declare(symbol, fun.span)?;
                }
                Declaration::Var(var) => {
                    self.check_vardec_shape(var)?;
                    if let Some(init) = &var.init {
                        if !is_constant_init(init) {
                            return err(
                                InnerSemError::NonConstantInit(var.name.clone()),
                                init.span,
                            );
                        }
                        let init_type = self.check_expr(init)?;
                        if init_type != var.ty {
                            return err(
                                InnerSemError::TypeMismatch {
                                    expected: var.ty,
                                    got: init_type,
                                },
                                init.span,
                            );
                        }
                    }
                    self.declare(self.symbol_for_vardec(var), var.span)?;
                }
            }
        }
        Ok(())
    }

    /// Sub-pass 2: walk every function body with a scope stack.
    fn check_bodies(&mut self, program: &Program) -> Result<()> {
        for dec in &program.declarations {
            if let Declaration::Fun(fun) = dec {
                self.current_fn = Some((fun.return_type, fun.name.clone()));
                self.table.enter_scope();
                for param in &fun.params {
                    let level = self.table.level();
                    self.declare(
                        Symbol::var(param.name.clone(), param.ty, level),
                        param.span,
                    )?;
                }
                self.check_block(&fun.body)?;
                self.table.exit_scope();
                self.current_fn = None;
            }
        }
        Ok(())
    }

    fn check_main(&self) -> Result<()> {
        let main_span = Span::new(1, 1);
        let Some(symbol) = self.table.resolve("main") else {
            return err(InnerSemError::MissingMain, main_span);
        };
        let arity_ok = symbol.param_types.as_ref().is_some_and(Vec::is_empty);
        let type_ok = matches!(symbol.ty, Type::Void | Type::Int);
        if symbol.kind != SymbolKind::Func || !arity_ok || !type_ok {
            return err(InnerSemError::BadMainSignature, main_span);
        }
        Ok(())
    }

    fn check_block(&mut self, block: &Block) -> Result<()> {
        self.table.enter_scope();
        for stmt in &block.stmts {
            self.check_statement(stmt)?;
        }
        self.table.exit_scope();
        Ok(())
    }

    fn check_condition(&mut self, condition: &Expr) -> Result<()> {
        let ty = self.check_expr(condition)?;
        if !matches!(ty, Type::Bool | Type::Int) {
            return err(InnerSemError::ConditionMustBeBoolOrInt(ty), condition.span);
        }
        Ok(())
    }

    fn check_local_decl(&mut self, dec: &VarDecl) -> Result<()> {
        self.check_vardec_shape(dec)?;
        // declared before its initializer is checked, matching the scoping
        // the IR generator uses
        self.declare(self.symbol_for_vardec(dec), dec.span)?;
        if let Some(init) = &dec.init {
            let init_type = self.check_expr(init)?;
            if init_type != dec.ty {
                return err(
                    InnerSemError::TypeMismatch {
                        expected: dec.ty,
                        got: init_type,
                    },
                    init.span,
                );
            }
        }
        Ok(())
    }

    fn check_assign(&mut self, assign: &Assign) -> Result<()> {
        let Some(symbol) = self.table.resolve(&assign.target) else {
            return err(
                InnerSemError::UndeclaredVariable(assign.target.clone()),
                assign.span,
            );
        };
        match symbol.kind {
            SymbolKind::Var => (),
            SymbolKind::Const => {
                return err(
                    InnerSemError::AssignToConst(assign.target.clone()),
                    assign.span,
                )
            }
            SymbolKind::Array => {
                return err(
                    InnerSemError::ArrayUsedAsScalar(assign.target.clone()),
                    assign.span,
                )
            }
            SymbolKind::Func => {
                return err(
                    InnerSemError::FunctionNameAsVariable(assign.target.clone()),
                    assign.span,
                )
            }
        }
        let expected = symbol.ty;
        let got = self.check_expr(&assign.value)?;
        if got != expected {
            return err(
                InnerSemError::TypeMismatch { expected, got },
                assign.value.span,
            );
        }
        Ok(())
    }

    /// Resolve `name` as an array symbol and check `index` is an int;
    /// returns the element type.
    fn check_array_access(&mut self, name: &str, index: &Expr, span: Span) -> Result<Type> {
        let Some(symbol) = self.table.resolve(name) else {
            return err(InnerSemError::UndeclaredVariable(name.to_owned()), span);
        };
        if symbol.kind != SymbolKind::Array {
            return err(InnerSemError::NotAnArray(name.to_owned()), span);
        }
        let element = symbol.ty;
        let index_type = self.check_expr(index)?;
        if index_type != Type::Int {
            return err(InnerSemError::ArrayIndexMustBeInt(index_type), index.span);
        }
        Ok(element)
    }

    fn check_statement(&mut self, stmt: &Statement) -> Result<()> {
        match stmt {
            Statement::Decl(dec) => self.check_local_decl(dec),
            Statement::Compound(block) => self.check_block(block),
            Statement::If(if_st) => {
                self.check_condition(&if_st.condition)?;
                self.check_statement(&if_st.then)?;
                if let Some(els) = &if_st.els {
                    self.check_statement(els)?;
                }
                Ok(())
            }
            Statement::While(while_st) => {
                self.check_condition(&while_st.condition)?;
                self.check_statement(&while_st.body)
            }
            Statement::For(for_st) => {
                self.table.enter_scope();
                if let Some(init) = &for_st.init {
                    self.check_statement(init)?;
                }
                if let Some(condition) = &for_st.condition {
                    self.check_condition(condition)?;
                }
                if let Some(update) = &for_st.update {
                    self.check_expr(update)?;
                }
                self.check_statement(&for_st.body)?;
                self.table.exit_scope();
                Ok(())
            }
            Statement::Return(value, span) => self.check_return(value.as_ref(), *span),
            Statement::Break(_) | Statement::Continue(_) => Ok(()),
            Statement::Print(expr, _) => {
                let ty = self.check_expr(expr)?;
                if ty != Type::Int {
                    return err(InnerSemError::PrintRequiresInt(ty), expr.span);
                }
                Ok(())
            }
            Statement::Assign(assign) => self.check_assign(assign),
            Statement::ArrayStore(store) => {
                let element = self.check_array_access(&store.array, &store.index, store.span)?;
                let got = self.check_expr(&store.value)?;
                if got != element {
                    return err(
                        InnerSemError::TypeMismatch {
                            expected: element,
                            got,
                        },
                        store.value.span,
                    );
                }
                Ok(())
            }
            Statement::Expr(expr) => self.check_expr(expr).map(|_| ()),
        }
    }

    fn check_return(&mut self, value: Option<&Expr>, span: Span) -> Result<()> {
        let (return_type, name) = self
            .current_fn
            .clone()
            .expect("return only occurs inside a function body");
        match value {
            None => {
                if return_type != Type::Void {
                    return err(InnerSemError::ReturnWithoutValue(name), span);
                }
            }
            Some(value) => {
                if return_type == Type::Void {
                    return err(InnerSemError::ReturnValueInVoid(name), span);
                }
                let got = self.check_expr(value)?;
                if got != return_type {
                    return err(
                        InnerSemError::TypeMismatch {
                            expected: return_type,
                            got,
                        },
                        value.span,
                    );
                }
            }
        }
        Ok(())
    }

    fn check_incdec(&mut self, operand: &Expr, span: Span) -> Result<Type> {
        match &operand.kind {
            ExprKind::Ident(name) => {
                let Some(symbol) = self.table.resolve(name) else {
                    return err(InnerSemError::UndeclaredVariable(name.clone()), operand.span);
                };
                match symbol.kind {
                    SymbolKind::Const => {
                        return err(InnerSemError::AssignToConst(name.clone()), span)
                    }
                    SymbolKind::Var if symbol.ty == Type::Int => (),
                    _ => return err(InnerSemError::IncDecRequiresIntLvalue, span),
                }
                Ok(Type::Int)
            }
            ExprKind::ArrayLoad(name, index) => {
                let element = self.check_array_access(name, index, operand.span)?;
                if element != Type::Int {
                    return err(InnerSemError::IncDecRequiresIntLvalue, span);
                }
                Ok(Type::Int)
            }
            _ => err(InnerSemError::IncDecRequiresIntLvalue, span),
        }
    }

    fn check_call(&mut self, name: &str, args: &[Expr], span: Span) -> Result<Type> {
        let Some(symbol) = self.table.resolve(name) else {
            return err(InnerSemError::UndeclaredFunction(name.to_owned()), span);
        };
        if symbol.kind != SymbolKind::Func {
            return err(InnerSemError::NotAFunction(name.to_owned()), span);
        }
        let return_type = symbol.ty;
        let ptypes = symbol
            .param_types
            .clone()
            .expect("functions always carry param types");
        if ptypes.len() != args.len() {
            return err(
                InnerSemError::ArityMismatch {
                    name: name.to_owned(),
                    expected: ptypes.len(),
                    got: args.len(),
                },
                span,
            );
        }
        for (arg, expected) in args.iter().zip(ptypes) {
            let got = self.check_expr(arg)?;
            if got != expected {
                return err(InnerSemError::TypeMismatch { expected, got }, arg.span);
            }
        }
        Ok(return_type)
    }

    fn check_expr(&mut self, expr: &Expr) -> Result<Type> {
        match &expr.kind {
            ExprKind::IntLit(_) => Ok(Type::Int),
            ExprKind::BoolLit(_) => Ok(Type::Bool),
            ExprKind::FloatLit(_) => err(InnerSemError::FloatUnsupported, expr.span),
            ExprKind::Ident(name) => {
                let Some(symbol) = self.table.resolve(name) else {
                    return err(InnerSemError::UndeclaredVariable(name.clone()), expr.span);
                };
                match symbol.kind {
                    SymbolKind::Var | SymbolKind::Const => Ok(symbol.ty),
                    SymbolKind::Array => {
                        err(InnerSemError::ArrayUsedAsScalar(name.clone()), expr.span)
                    }
                    SymbolKind::Func => {
                        err(InnerSemError::FunctionNameAsVariable(name.clone()), expr.span)
                    }
                }
            }
            ExprKind::ArrayLoad(name, index) => self.check_array_access(name, index, expr.span),
            ExprKind::Binary(op, left, right) => {
                let lt = self.check_expr(left)?;
                let rt = self.check_expr(right)?;
                if op.is_arithmetic() || op.is_relational() {
                    if lt != Type::Int || rt != Type::Int {
                        return err(InnerSemError::BinaryOperandsMustBeInt(op_text(*op)), expr.span);
                    }
                    let result = if op.is_relational() {
                        Type::Bool
                    } else {
                        Type::Int
                    };
                    Ok(result)
                } else if op.is_equality() {
                    if lt != rt || !matches!(lt, Type::Int | Type::Bool) {
                        return err(InnerSemError::EqualityOperandMismatch(lt, rt), expr.span);
                    }
                    Ok(Type::Bool)
                } else {
                    // && and ||
                    if lt != Type::Bool || rt != Type::Bool {
                        return err(
                            InnerSemError::LogicalOperandsMustBeBool(op_text(*op)),
                            expr.span,
                        );
                    }
                    Ok(Type::Bool)
                }
            }
            ExprKind::Unary(UnaryOp::Negate, operand) => {
                let ty = self.check_expr(operand)?;
                if ty != Type::Int {
                    return err(InnerSemError::BinaryOperandsMustBeInt("-"), expr.span);
                }
                Ok(Type::Int)
            }
            ExprKind::Unary(UnaryOp::LogicalNot, operand) => {
                let ty = self.check_expr(operand)?;
                if ty != Type::Bool {
                    return err(InnerSemError::LogicalOperandsMustBeBool("!"), expr.span);
                }
                Ok(Type::Bool)
            }
            ExprKind::Unary(op, operand) if op.is_incdec() => {
                self.check_incdec(operand, expr.span)
            }
            ExprKind::Unary(_, _) => unreachable!("all unary operators covered"),
            ExprKind::Call(name, args) => self.check_call(name, args, expr.span),
            ExprKind::ReadInt => Ok(Type::Int),
        }
    }
}

pub fn check_types(program: &Program) -> Result<()> {
    let mut checker = TypeChecker::new();
    checker.collect_globals(program)?;
    checker.check_bodies(program)?;
    checker.check_main()
}
