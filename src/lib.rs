/*!
This crate is the core of a native compiler for **NanoC** - a small
statically-typed imperative language with C-like syntax. The compiler lowers
NanoC source text through a classical multi-pass pipeline into x86-64
assembly (NASM syntax) that links against the C `printf`/`scanf` runtime.
This project follows these ideas and goals:
  * **No external dependencies in the core** - Error handling, argument
    parsing and the lexer are handwritten on top of Rust's [std]. The only
    dependency is [anyhow] inside the driver binary, for I/O plumbing.
  * **No unstable features** - The crate compiles with the stable toolchain.
  * **Reusable passes** - Every module except [ast] is hidden behind a
    feature flag with the same name, so any prefix of the pipeline can be
    reused as a library (e.g. for lexing or parsing NanoC code).

## Compilation stages
1. **Lexing** - [lex](lexer::lex) scans the source for known token kinds and
   produces a `Vec` of [Token](lexer::Token) - kind, lexeme and the `(line,
   col)` where the lexeme starts. An unknown character produces
   [LexError](lexer::LexError).
2. **Parsing** - [parse](parser::parse) consumes the tokens with one-token
   lookahead and produces a [Program](ast::Program). Expressions are parsed
   by precedence climbing. The first syntactic mismatch raises
   [ParseError](parser::ParseError); there is no error recovery.
3. **Validation** - [validate](semantic_analysis::validate) resolves names
   against a scope stack, type-checks every expression, enforces `const`,
   arity, return-path and loop-context rules, and checks that `main` exists.
   Function signatures are collected up front, so forward references are
   legal. Any violation produces [SemError](semantic_analysis::SemError).
4. **IR generation** - [lower](ir::lower) turns the validated AST into flat
   [three-address code] per function. Temporaries (`t0`, `t1`, ..) and
   labels (`L0`, `L1`, ..) are numbered per function; named variables get a
   `name_M` suffix per declaration so shadowing stays unambiguous.
5. **Optimization** - [optimize](optimize::optimize) runs constant
   folding/propagation (intra-basic-block), strength reduction and dead
   code elimination to a bounded fixpoint. Jumps, labels and everything
   side-effecting are never touched.
6. **Codegen** - [codegen](codegen::codegen) lowers the optimized IR into an
   assembly AST with stack-frame slots for every variable and temporary.
   Arguments are passed on the stack right-to-left with caller cleanup.
7. **Emission** - [emission] implements [Display] for the assembly AST,
   rendering NASM text that expects `printf` and `scanf` as externs.

## Calling convention
Internal functions receive their arguments on the stack, pushed
right-to-left, and the caller pops them after the call. This deviates from
the System V ABI on purpose: it keeps the frame model trivial. Stack
alignment before `printf`/`scanf` calls is best-effort (frames are rounded
to 16 bytes, no per-call fixup).

[three-address code]: https://en.wikipedia.org/wiki/Three-address_code
[anyhow]: https://docs.rs/anyhow
[std]: https://doc.rust-lang.org/std/
[Display]: https://doc.rust-lang.org/std/fmt/trait.Display.html
*/

#![deny(unused_must_use)]
#![warn(clippy::pedantic)]
#![allow(clippy::wildcard_imports)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_errors_doc)]

pub mod ast;
#[cfg(feature = "codegen")]
pub mod codegen;
#[cfg(feature = "emission")]
pub mod emission;
#[cfg(feature = "ir")]
pub mod ir;
#[cfg(feature = "lexer")]
pub mod lexer;
#[cfg(feature = "optimize")]
pub mod optimize;
#[cfg(feature = "parser")]
pub mod parser;
#[cfg(feature = "semantic_analysis")]
pub mod semantic_analysis;

#[cfg(feature = "emission")]
use std::fmt;

/// Output target of the backend.
#[cfg(feature = "emission")]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Target {
    #[default]
    X86_64,
    /// Planned; selecting it is an error for now.
    Riscv,
}

#[cfg(feature = "emission")]
#[derive(Clone, Debug, Default)]
pub struct Options {
    pub target: Target,
    /// Kept for call-site readability; all phase artifacts are currently
    /// retained either way, which is what REPL drivers echo.
    pub emit_phases: bool,
}

/// Everything the pipeline produced for one source text.
#[cfg(feature = "emission")]
#[derive(Clone, Debug)]
pub struct Artifacts {
    pub tokens: Vec<lexer::Token>,
    pub ast: ast::Program,
    pub ir: ir::IrProgram,
    pub optimized_ir: ir::IrProgram,
    pub asm: String,
}

/// First error of any phase; compilation is panic-mode, so there is at most
/// one. `Display` renders the diagnostic line the driver prints:
/// `<kind>: <message> at line <L>, col <C>`.
#[cfg(feature = "emission")]
#[derive(Debug)]
pub enum CompileError {
    Lex(lexer::LexError),
    Parse(parser::ParseError),
    Sem(semantic_analysis::SemError),
    Internal(ir::InternalError),
    UnsupportedTarget(Target),
}

#[cfg(feature = "emission")]
impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lex(e) => write!(f, "{e}"),
            Self::Parse(e) => write!(f, "{e}"),
            Self::Sem(e) => write!(f, "{e}"),
            Self::Internal(e) => write!(f, "{e}"),
            Self::UnsupportedTarget(t) => {
                write!(f, "InternalError: target {t:?} is not yet supported")
            }
        }
    }
}

#[cfg(feature = "emission")]
impl std::error::Error for CompileError {}

#[cfg(feature = "emission")]
impl From<lexer::LexError> for CompileError {
    fn from(e: lexer::LexError) -> Self {
        Self::Lex(e)
    }
}

#[cfg(feature = "emission")]
impl From<parser::ParseError> for CompileError {
    fn from(e: parser::ParseError) -> Self {
        Self::Parse(e)
    }
}

#[cfg(feature = "emission")]
impl From<semantic_analysis::SemError> for CompileError {
    fn from(e: semantic_analysis::SemError) -> Self {
        Self::Sem(e)
    }
}

#[cfg(feature = "emission")]
impl From<ir::InternalError> for CompileError {
    fn from(e: ir::InternalError) -> Self {
        Self::Internal(e)
    }
}

/// Run the whole pipeline on one in-memory source string.
///
/// Every phase consumes its input immutably and produces a fresh value; the
/// artifacts of all phases are returned together so drivers can echo them.
#[cfg(feature = "emission")]
pub fn compile(source: &str, options: &Options) -> Result<Artifacts, CompileError> {
    if options.target != Target::X86_64 {
        return Err(CompileError::UnsupportedTarget(options.target));
    }

    let tokens = lexer::lex(source)?;
    let program = parser::parse(&tokens)?;
    semantic_analysis::validate(&program)?;
    let ir = ir::lower(&program);
    let optimized_ir = optimize::optimize(&ir);
    optimize::verify(&optimized_ir)?;
    let asm_ast = codegen::codegen(&optimized_ir)?;
    let asm = asm_ast.to_string();

    Ok(Artifacts {
        tokens,
        ast: program,
        ir,
        optimized_ir,
        asm,
    })
}
