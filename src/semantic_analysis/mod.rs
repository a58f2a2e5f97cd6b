mod control_flow;
#[cfg(test)]
mod sem_tests;
mod symbol_table;
mod typecheck;

use crate::ast::{Identifier, Program, Span, Type};
use std::fmt;

pub use symbol_table::{Symbol, SymbolKind, SymbolTable};

pub type Result<T> = std::result::Result<T, SemError>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InnerSemError {
    // name resolution / const discipline
    UndeclaredVariable(Identifier),
    UndeclaredFunction(Identifier),
    Redeclaration(Identifier),
    AssignToConst(Identifier),
    ConstWithoutInit(Identifier),
    NonConstantInit(Identifier),
    FunctionNameAsVariable(Identifier),
    NotAFunction(Identifier),
    MissingMain,
    // types
    TypeMismatch { expected: Type, got: Type },
    BinaryOperandsMustBeInt(&'static str),
    LogicalOperandsMustBeBool(&'static str),
    EqualityOperandMismatch(Type, Type),
    ConditionMustBeBoolOrInt(Type),
    NotAnArray(Identifier),
    ArrayUsedAsScalar(Identifier),
    ArrayIndexMustBeInt(Type),
    ArraySizeMustBePositive(Identifier),
    ConstArray(Identifier),
    PrintRequiresInt(Type),
    VoidVariable(Identifier),
    FloatUnsupported,
    IncDecRequiresIntLvalue,
    ReturnValueInVoid(Identifier),
    ReturnWithoutValue(Identifier),
    BadMainSignature,
    // call shape
    ArityMismatch {
        name: Identifier,
        expected: usize,
        got: usize,
    },
    // control flow
    BreakOutsideOfLoop,
    ContinueOutsideOfLoop,
    MissingReturn(Identifier),
}

/// A semantic error pinned to the source position that triggered it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SemError {
    inner: InnerSemError,
    span: Span,
}

impl SemError {
    pub(crate) fn new(inner: InnerSemError, span: Span) -> Self {
        Self { inner, span }
    }

    pub fn position(&self) -> (u32, u32) {
        (self.span.line, self.span.col)
    }

    pub fn inner(&self) -> &InnerSemError {
        &self.inner
    }

    /// The diagnostic kind prefix for this error.
    pub fn kind(&self) -> &'static str {
        use InnerSemError as E;
        match self.inner {
            E::UndeclaredVariable(_)
            | E::UndeclaredFunction(_)
            | E::Redeclaration(_)
            | E::AssignToConst(_)
            | E::ConstWithoutInit(_)
            | E::NonConstantInit(_)
            | E::FunctionNameAsVariable(_)
            | E::NotAFunction(_)
            | E::MissingMain => "NameError",
            E::ArityMismatch { .. } => "ArityError",
            E::BreakOutsideOfLoop | E::ContinueOutsideOfLoop => "ControlFlowError",
            E::MissingReturn(_) => "ReturnError",
            _ => "TypeError",
        }
    }
}

impl fmt::Display for SemError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}: {} at line {}, col {}",
            self.kind(),
            self.inner,
            self.span.line,
            self.span.col
        )
    }
}

impl fmt::Display for InnerSemError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use InnerSemError as E;
        match self {
            E::UndeclaredVariable(name) => write!(f, "undeclared variable {name}"),
            E::UndeclaredFunction(name) => write!(f, "call to undeclared function {name}"),
            E::Redeclaration(name) => {
                write!(f, "redeclaration of {name} in the same scope")
            }
            E::AssignToConst(name) => write!(f, "cannot assign to const {name}"),
            E::ConstWithoutInit(name) => {
                write!(f, "const variable {name} must be initialized")
            }
            E::NonConstantInit(name) => {
                write!(f, "global variable {name} has non-constant initializer")
            }
            E::FunctionNameAsVariable(name) => write!(f, "function {name} used as a variable"),
            E::NotAFunction(name) => write!(f, "{name} is not a function"),
            E::MissingMain => write!(f, "missing main function"),
            E::TypeMismatch { expected, got } => {
                write!(f, "expected type {expected}, got {got}")
            }
            E::BinaryOperandsMustBeInt(op) => {
                write!(f, "operator '{op}' requires int operands")
            }
            E::LogicalOperandsMustBeBool(op) => {
                write!(f, "operator '{op}' requires bool operands")
            }
            E::EqualityOperandMismatch(t1, t2) => {
                write!(f, "cannot compare {t1} with {t2}")
            }
            E::ConditionMustBeBoolOrInt(t) => {
                write!(f, "condition must be bool or int, got {t}")
            }
            E::NotAnArray(name) => write!(f, "{name} is not an array"),
            E::ArrayUsedAsScalar(name) => write!(f, "array {name} used as a scalar"),
            E::ArrayIndexMustBeInt(t) => write!(f, "array index must be int, got {t}"),
            E::ArraySizeMustBePositive(name) => {
                write!(f, "array {name} must have a positive size")
            }
            E::ConstArray(name) => write!(f, "array {name} cannot be const"),
            E::PrintRequiresInt(t) => write!(f, "print requires an int argument, got {t}"),
            E::VoidVariable(name) => write!(f, "variable {name} cannot have type void"),
            E::FloatUnsupported => write!(f, "float expressions are not supported"),
            E::IncDecRequiresIntLvalue => {
                write!(f, "increment/decrement requires an int variable")
            }
            E::ReturnValueInVoid(name) => {
                write!(f, "void function {name} cannot return a value")
            }
            E::ReturnWithoutValue(name) => {
                write!(f, "non-void function {name} must return a value")
            }
            E::BadMainSignature => {
                write!(f, "main must have signature void main() or int main()")
            }
            E::ArityMismatch {
                name,
                expected,
                got,
            } => write!(
                f,
                "function {name} called with {got} arguments, but expected {expected}"
            ),
            E::BreakOutsideOfLoop => write!(f, "break statement outside of loop"),
            E::ContinueOutsideOfLoop => write!(f, "continue statement outside of loop"),
            E::MissingReturn(name) => {
                write!(f, "function {name} may not return on every path")
            }
        }
    }
}

impl std::error::Error for SemError {}

/// Validate the whole program: name resolution, type checking and const
/// discipline first, then the structural control-flow rules.
pub fn validate(program: &Program) -> Result<()> {
    typecheck::check_types(program)?;
    control_flow::check_control_flow(program)
}
