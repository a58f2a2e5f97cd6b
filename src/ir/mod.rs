mod instruction;
#[cfg(test)]
mod ir_tests;

use crate::ast::{
    BinaryOp as AstBinaryOp, Block, Declaration, Expr, ExprKind, For, FunDecl, Identifier, If,
    Program, Statement, Type, UnaryOp as AstUnaryOp, VarDecl, While,
};
use std::collections::HashMap;

pub use instruction::*;

/// Per-function counter pools. Reset on every function boundary so IR stays
/// readable and label/temp numbering is deterministic.
struct NameGenerator {
    temp_count: u64,
    label_count: u64,
}

impl NameGenerator {
    fn new() -> Self {
        Self {
            temp_count: 0,
            label_count: 0,
        }
    }

    fn temp(&mut self) -> Identifier {
        let c = self.temp_count;
        self.temp_count += 1;
        format!("t{c}")
    }

    fn label(&mut self) -> Identifier {
        let c = self.label_count;
        self.label_count += 1;
        format!("L{c}")
    }
}

/// break/continue targets of the innermost enclosing loop.
struct LoopLabels {
    break_label: Identifier,
    continue_label: Identifier,
}

struct Lowering {
    /// Program-wide version counter for `name_M` renaming; never reset, so
    /// globals and locals of different functions can never collide.
    var_count: u64,
    scopes: Vec<HashMap<Identifier, Identifier>>,
    loop_stack: Vec<LoopLabels>,
}

impl From<AstBinaryOp> for BinaryOp {
    fn from(op: AstBinaryOp) -> Self {
        use AstBinaryOp as A;
        match op {
            A::Add => Self::Add,
            A::Sub => Self::Sub,
            A::Mul => Self::Mul,
            A::Div => Self::Div,
            A::Mod => Self::Mod,
            A::LessThan => Self::Lt,
            A::GreaterThan => Self::Gt,
            A::LessOrEqual => Self::Le,
            A::GreaterOrEqual => Self::Ge,
            A::IsEqual => Self::Eq,
            A::IsNotEqual => Self::Neq,
            A::LogicalAnd | A::LogicalOr => {
                unreachable!("short-circuit operators never lower directly")
            }
        }
    }
}

impl Lowering {
    fn new() -> Self {
        Self {
            var_count: 0,
            scopes: vec![HashMap::new()],
            loop_stack: Vec::new(),
        }
    }

    fn enter_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn exit_scope(&mut self) {
        self.scopes.pop();
    }

    /// Register `name` in the innermost scope under a fresh `name_M`.
    fn declare(&mut self, name: &str) -> Identifier {
        let unique = format!("{name}_{}", self.var_count);
        self.var_count += 1;
        self.scopes
            .last_mut()
            .expect("always one scope")
            .insert(name.to_owned(), unique.clone());
        unique
    }

    fn resolve(&self, name: &str) -> Identifier {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .cloned()
            .expect("validated before lowering")
    }

    fn lower_global(&mut self, dec: &VarDecl) -> StaticVariable {
        let unique = self.declare(&dec.name);
        if let Some(size) = dec.array_size {
            return StaticVariable {
                name: unique,
                init: 0,
                slots: size,
            };
        }
        let init = match dec.init.as_ref().map(|e| &e.kind) {
            Some(ExprKind::IntLit(v)) => *v,
            Some(ExprKind::BoolLit(b)) => i64::from(*b),
            Some(ExprKind::Unary(AstUnaryOp::Negate, inner)) => match inner.kind {
                ExprKind::IntLit(v) => -v,
                _ => unreachable!("validated as constant initializer"),
            },
            Some(_) => unreachable!("validated as constant initializer"),
            None => 0,
        };
        StaticVariable {
            name: unique,
            init,
            slots: 1,
        }
    }

    fn lower_function(&mut self, fun: &FunDecl) -> IrFunction {
        let mut ng = NameGenerator::new();
        let mut body = Instructions::new();

        self.enter_scope();
        let params = fun
            .params
            .iter()
            .map(|p| self.declare(&p.name))
            .collect();
        self.lower_block(&fun.body, &mut body, &mut ng);
        self.exit_scope();

        // fall-through exit; sema already proved non-void bodies return on
        // every structural path
        if !matches!(body.last(), Some(Instruction::Return(_))) {
            let value = (fun.return_type != Type::Void).then_some(Value::Constant(0));
            body.push(Instruction::Return(value));
        }

        IrFunction {
            name: fun.name.clone(),
            params,
            body,
        }
    }

    fn lower_block(&mut self, block: &Block, out: &mut Instructions, ng: &mut NameGenerator) {
        self.enter_scope();
        for stmt in &block.stmts {
            self.lower_statement(stmt, out, ng);
        }
        self.exit_scope();
    }

    fn lower_statement(&mut self, stmt: &Statement, out: &mut Instructions, ng: &mut NameGenerator) {
        match stmt {
            Statement::Decl(dec) => self.lower_local_decl(dec, out, ng),
            Statement::Compound(block) => self.lower_block(block, out, ng),
            Statement::If(if_st) => self.lower_if(if_st, out, ng),
            Statement::While(while_st) => self.lower_while(while_st, out, ng),
            Statement::For(for_st) => self.lower_for(for_st, out, ng),
            Statement::Return(value, _) => {
                let value = value.as_ref().map(|e| self.lower_expr(e, out, ng));
                out.push(Instruction::Return(value));
            }
            Statement::Break(_) => {
                let target = self
                    .loop_stack
                    .last()
                    .expect("validated inside a loop")
                    .break_label
                    .clone();
                out.push(Instruction::Jump(target));
            }
            Statement::Continue(_) => {
                let target = self
                    .loop_stack
                    .last()
                    .expect("validated inside a loop")
                    .continue_label
                    .clone();
                out.push(Instruction::Jump(target));
            }
            Statement::Print(expr, _) => {
                let value = self.lower_expr(expr, out, ng);
                out.push(Instruction::Print(value));
            }
            Statement::Assign(assign) => {
                let value = self.lower_expr(&assign.value, out, ng);
                let dst = self.resolve(&assign.target);
                out.push(Instruction::Mov { dst, src: value });
            }
            Statement::ArrayStore(store) => {
                let index = self.lower_expr(&store.index, out, ng);
                let value = self.lower_expr(&store.value, out, ng);
                let array = self.resolve(&store.array);
                out.push(Instruction::ArrayStore {
                    array,
                    index,
                    value,
                });
            }
            Statement::Expr(expr) => {
                let _ = self.lower_expr(expr, out, ng);
            }
        }
    }

    fn lower_local_decl(&mut self, dec: &VarDecl, out: &mut Instructions, ng: &mut NameGenerator) {
        let unique = self.declare(&dec.name);
        if let Some(size) = dec.array_size {
            out.push(Instruction::Alloca { name: unique, size });
            return;
        }
        if let Some(init) = &dec.init {
            let value = self.lower_expr(init, out, ng);
            out.push(Instruction::Mov {
                dst: unique,
                src: value,
            });
        }
    }

    fn lower_if(&mut self, if_st: &If, out: &mut Instructions, ng: &mut NameGenerator) {
        let condition = self.lower_expr(&if_st.condition, out, ng);

        if let Some(els) = &if_st.els {
            let label_else = ng.label();
            let label_end = ng.label();
            out.push(Instruction::JumpIfFalse(condition, label_else.clone()));
            self.lower_statement(&if_st.then, out, ng);
            out.push(Instruction::Jump(label_end.clone()));
            out.push(Instruction::Label(label_else));
            self.lower_statement(els, out, ng);
            out.push(Instruction::Label(label_end));
        } else {
            let label_end = ng.label();
            out.push(Instruction::JumpIfFalse(condition, label_end.clone()));
            self.lower_statement(&if_st.then, out, ng);
            out.push(Instruction::Label(label_end));
        }
    }

    fn lower_while(&mut self, while_st: &While, out: &mut Instructions, ng: &mut NameGenerator) {
        let label_head = ng.label();
        let label_end = ng.label();

        out.push(Instruction::Label(label_head.clone()));
        let condition = self.lower_expr(&while_st.condition, out, ng);
        out.push(Instruction::JumpIfFalse(condition, label_end.clone()));

        self.loop_stack.push(LoopLabels {
            break_label: label_end.clone(),
            continue_label: label_head.clone(),
        });
        self.lower_statement(&while_st.body, out, ng);
        self.loop_stack.pop();

        out.push(Instruction::Jump(label_head));
        out.push(Instruction::Label(label_end));
    }

    fn lower_for(&mut self, for_st: &For, out: &mut Instructions, ng: &mut NameGenerator) {
        // the init declaration lives in its own scope wrapping the loop
        self.enter_scope();

        if let Some(init) = &for_st.init {
            self.lower_statement(init, out, ng);
        }

        let label_head = ng.label();
        let label_continue = ng.label();
        let label_end = ng.label();

        out.push(Instruction::Label(label_head.clone()));
        if let Some(condition) = &for_st.condition {
            let condition = self.lower_expr(condition, out, ng);
            out.push(Instruction::JumpIfFalse(condition, label_end.clone()));
        }

        self.loop_stack.push(LoopLabels {
            break_label: label_end.clone(),
            continue_label: label_continue.clone(),
        });
        self.lower_statement(&for_st.body, out, ng);
        self.loop_stack.pop();

        out.push(Instruction::Label(label_continue));
        if let Some(update) = &for_st.update {
            let _ = self.lower_expr(update, out, ng);
        }
        out.push(Instruction::Jump(label_head));
        out.push(Instruction::Label(label_end));

        self.exit_scope();
    }

    fn lower_incdec(
        &mut self,
        op: AstUnaryOp,
        operand: &Expr,
        out: &mut Instructions,
        ng: &mut NameGenerator,
    ) -> Value {
        let delta = match op {
            AstUnaryOp::PrefixIncrement | AstUnaryOp::PostfixIncrement => BinaryOp::Add,
            _ => BinaryOp::Sub,
        };
        let prefix = matches!(op, AstUnaryOp::PrefixIncrement | AstUnaryOp::PrefixDecrement);

        match &operand.kind {
            ExprKind::Ident(name) => {
                let var = self.resolve(name);
                if prefix {
                    // ADD t, x, 1; MOV x, t; value is x
                    let t = ng.temp();
                    out.push(Instruction::Binary {
                        op: delta,
                        dst: t.clone(),
                        src1: Value::Var(var.clone()),
                        src2: Value::Constant(1),
                    });
                    out.push(Instruction::Mov {
                        dst: var.clone(),
                        src: Value::Var(t),
                    });
                    Value::Var(var)
                } else {
                    // MOV t, x; ADD t2, x, 1; MOV x, t2; value is t
                    let old = ng.temp();
                    out.push(Instruction::Mov {
                        dst: old.clone(),
                        src: Value::Var(var.clone()),
                    });
                    let new = ng.temp();
                    out.push(Instruction::Binary {
                        op: delta,
                        dst: new.clone(),
                        src1: Value::Var(var.clone()),
                        src2: Value::Constant(1),
                    });
                    out.push(Instruction::Mov {
                        dst: var,
                        src: Value::Var(new),
                    });
                    Value::Var(old)
                }
            }
            ExprKind::ArrayLoad(name, index) => {
                let index = self.lower_expr(index, out, ng);
                let array = self.resolve(name);
                let old = ng.temp();
                out.push(Instruction::ArrayLoad {
                    dst: old.clone(),
                    array: array.clone(),
                    index: index.clone(),
                });
                let new = ng.temp();
                out.push(Instruction::Binary {
                    op: delta,
                    dst: new.clone(),
                    src1: Value::Var(old.clone()),
                    src2: Value::Constant(1),
                });
                out.push(Instruction::ArrayStore {
                    array,
                    index,
                    value: Value::Var(new.clone()),
                });
                if prefix {
                    Value::Var(new)
                } else {
                    Value::Var(old)
                }
            }
            _ => unreachable!("validated as an lvalue"),
        }
    }

    /// Short-circuit `&&` through a false-label and a result temporary:
    ///
    /// ```text
    /// JMP_IF_FALSE a, Lfalse
    /// JMP_IF_FALSE b, Lfalse
    /// MOV t, 1
    /// JMP Lend
    /// LABEL Lfalse
    /// MOV t, 0
    /// LABEL Lend
    /// ```
    ///
    /// The result temporary is written once per arm; the arms are mutually
    /// exclusive and live in separate basic blocks.
    fn lower_and(
        &mut self,
        left: &Expr,
        right: &Expr,
        out: &mut Instructions,
        ng: &mut NameGenerator,
    ) -> Value {
        let false_label = ng.label();
        let end_label = ng.label();
        let result = ng.temp();

        let v1 = self.lower_expr(left, out, ng);
        out.push(Instruction::JumpIfFalse(v1, false_label.clone()));
        let v2 = self.lower_expr(right, out, ng);
        out.push(Instruction::JumpIfFalse(v2, false_label.clone()));

        out.push(Instruction::Mov {
            dst: result.clone(),
            src: Value::Constant(1),
        });
        out.push(Instruction::Jump(end_label.clone()));
        out.push(Instruction::Label(false_label));
        out.push(Instruction::Mov {
            dst: result.clone(),
            src: Value::Constant(0),
        });
        out.push(Instruction::Label(end_label));

        Value::Var(result)
    }

    /// Short-circuit `||`. Only JMP_IF_FALSE exists, so a true left operand
    /// is detected by falling past its false-jump.
    fn lower_or(
        &mut self,
        left: &Expr,
        right: &Expr,
        out: &mut Instructions,
        ng: &mut NameGenerator,
    ) -> Value {
        let rhs_label = ng.label();
        let false_label = ng.label();
        let end_label = ng.label();
        let result = ng.temp();

        let v1 = self.lower_expr(left, out, ng);
        out.push(Instruction::JumpIfFalse(v1, rhs_label.clone()));
        out.push(Instruction::Mov {
            dst: result.clone(),
            src: Value::Constant(1),
        });
        out.push(Instruction::Jump(end_label.clone()));

        out.push(Instruction::Label(rhs_label));
        let v2 = self.lower_expr(right, out, ng);
        out.push(Instruction::JumpIfFalse(v2, false_label.clone()));
        out.push(Instruction::Mov {
            dst: result.clone(),
            src: Value::Constant(1),
        });
        out.push(Instruction::Jump(end_label.clone()));

        out.push(Instruction::Label(false_label));
        out.push(Instruction::Mov {
            dst: result.clone(),
            src: Value::Constant(0),
        });
        out.push(Instruction::Label(end_label));

        Value::Var(result)
    }

    fn lower_expr(&mut self, expr: &Expr, out: &mut Instructions, ng: &mut NameGenerator) -> Value {
        match &expr.kind {
            ExprKind::IntLit(v) => Value::Constant(*v),
            ExprKind::BoolLit(b) => Value::Constant(i64::from(*b)),
            ExprKind::FloatLit(_) => unreachable!("rejected by semantic analysis"),
            ExprKind::Ident(name) => Value::Var(self.resolve(name)),
            ExprKind::ArrayLoad(name, index) => {
                let index = self.lower_expr(index, out, ng);
                let array = self.resolve(name);
                let dst = ng.temp();
                out.push(Instruction::ArrayLoad {
                    dst: dst.clone(),
                    array,
                    index,
                });
                Value::Var(dst)
            }
            ExprKind::Binary(AstBinaryOp::LogicalAnd, left, right) => {
                self.lower_and(left, right, out, ng)
            }
            ExprKind::Binary(AstBinaryOp::LogicalOr, left, right) => {
                self.lower_or(left, right, out, ng)
            }
            ExprKind::Binary(op, left, right) => {
                let src1 = self.lower_expr(left, out, ng);
                let src2 = self.lower_expr(right, out, ng);
                let dst = ng.temp();
                out.push(Instruction::Binary {
                    op: BinaryOp::from(*op),
                    dst: dst.clone(),
                    src1,
                    src2,
                });
                Value::Var(dst)
            }
            ExprKind::Unary(AstUnaryOp::Negate, operand) => {
                let src = self.lower_expr(operand, out, ng);
                let dst = ng.temp();
                out.push(Instruction::Binary {
                    op: BinaryOp::Sub,
                    dst: dst.clone(),
                    src1: Value::Constant(0),
                    src2: src,
                });
                Value::Var(dst)
            }
            ExprKind::Unary(AstUnaryOp::LogicalNot, operand) => {
                let src = self.lower_expr(operand, out, ng);
                let dst = ng.temp();
                out.push(Instruction::Not {
                    dst: dst.clone(),
                    src,
                });
                Value::Var(dst)
            }
            ExprKind::Unary(op, operand) => self.lower_incdec(*op, operand, out, ng),
            ExprKind::Call(name, args) => {
                let values: Vec<Value> = args
                    .iter()
                    .map(|arg| self.lower_expr(arg, out, ng))
                    .collect();
                // push order is right-to-left
                for value in values.into_iter().rev() {
                    out.push(Instruction::Param(value));
                }
                let dst = ng.temp();
                out.push(Instruction::Call {
                    dst: dst.clone(),
                    name: name.clone(),
                    arity: args.len(),
                });
                Value::Var(dst)
            }
            ExprKind::ReadInt => {
                let dst = ng.temp();
                out.push(Instruction::ReadInt { dst: dst.clone() });
                Value::Var(dst)
            }
        }
    }
}

/// Lower a validated program into flat TAC. Globals are registered first so
/// every function body sees them; functions come out in source order.
pub fn lower(program: &Program) -> IrProgram {
    let mut lowering = Lowering::new();
    let mut items = Vec::new();

    for dec in &program.declarations {
        if let Declaration::Var(var) = dec {
            let static_var = lowering.lower_global(var);
            items.push(TopLevel::Static(static_var));
        }
    }
    for dec in &program.declarations {
        if let Declaration::Fun(fun) = dec {
            items.push(TopLevel::Fun(lowering.lower_function(fun)));
        }
    }

    IrProgram { items }
}
