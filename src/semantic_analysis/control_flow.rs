use crate::ast::*;
use crate::semantic_analysis::{InnerSemError, Result, SemError};

/// Structural control-flow checks: `break`/`continue` must sit inside a
/// loop body, and a non-void function must return on every terminating
/// path. The return check is structural, not data-flow based: a block
/// "returns" when its last statement does, an `if` returns when both arms
/// do, and a loop returns when its body does.
pub fn check_control_flow(program: &Program) -> Result<()> {
    for dec in &program.declarations {
        if let Declaration::Fun(fun) = dec {
            check_loop_context(&fun.body, 0)?;
            // main falls back to an implicit `return 0`, like C
            if fun.name == "main" {
                continue;
            }
            if fun.return_type != Type::Void && !block_returns(&fun.body) {
                return Err(SemError::new(
                    InnerSemError::MissingReturn(fun.name.clone()),
                    fun.span,
                ));
            }
        }
    }
    Ok(())
}

fn check_loop_context(block: &Block, depth: usize) -> Result<()> {
    for stmt in &block.stmts {
        check_statement(stmt, depth)?;
    }
    Ok(())
}

fn check_statement(stmt: &Statement, depth: usize) -> Result<()> {
    match stmt {
        Statement::Break(span) if depth == 0 => {
            Err(SemError::new(InnerSemError::BreakOutsideOfLoop, *span))
        }
        Statement::Continue(span) if depth == 0 => {
            Err(SemError::new(InnerSemError::ContinueOutsideOfLoop, *span))
        }
        Statement::Compound(block) => check_loop_context(block, depth),
        Statement::If(if_st) => {
            check_statement(&if_st.then, depth)?;
            if let Some(els) = &if_st.els {
                check_statement(els, depth)?;
            }
            Ok(())
        }
        Statement::While(while_st) => check_statement(&while_st.body, depth + 1),
        Statement::For(for_st) => check_statement(&for_st.body, depth + 1),
        _ => Ok(()),
    }
}

fn block_returns(block: &Block) -> bool {
    block.stmts.last().is_some_and(stmt_returns)
}

fn stmt_returns(stmt: &Statement) -> bool {
    match stmt {
        Statement::Return(_, _) => true,
        Statement::Compound(block) => block_returns(block),
        Statement::If(if_st) => {
            if_st.els.as_ref().is_some_and(|els| stmt_returns(els)) && stmt_returns(&if_st.then)
        }
        Statement::While(while_st) => stmt_returns(&while_st.body),
        Statement::For(for_st) => stmt_returns(&for_st.body),
        _ => false,
    }
}
