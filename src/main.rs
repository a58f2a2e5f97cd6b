//! The nanoc driver: compiles a `.nc` file down to an executable through
//! `nasm` and the system C toolchain, or runs an interactive session that
//! echoes every phase of the pipeline.
//!
//! Exit codes: 0 on success, 1 on a compilation error, 2 on I/O failure.

#![deny(unused_must_use)]
#![warn(clippy::pedantic)]
#![allow(clippy::wildcard_imports)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::struct_excessive_bools)]

use std::env;
use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::process::{exit, Command, ExitCode};

use anyhow::{anyhow, Context, Result};

use nanoc::{compile, CompileError, Options};

#[derive(Default)]
struct Args {
    lex: bool,
    parse: bool,
    validate: bool,
    ir: bool,
    opt: bool,
    no_assemble: bool,
    no_link: bool,
    input: Option<PathBuf>,
}

impl Args {
    fn parse() -> Self {
        let mut args = Self::default();

        for arg in env::args().skip(1) {
            match arg.as_str() {
                "--lex" => args.lex = true,
                "--parse" => args.parse = true,
                "--validate" => args.validate = true,
                "--ir" => args.ir = true,
                "--opt" => args.opt = true,
                "-S" | "--no-assemble" => args.no_assemble = true,
                "-c" | "--no-link" => args.no_link = true,
                "-h" | "--help" => Self::usage(),
                _ => {
                    if args.input.is_some() {
                        Self::usage();
                    }
                    args.input = Some(PathBuf::from(arg));
                }
            }
        }
        args
    }

    fn usage() -> ! {
        let cmd0 = env::args().next().unwrap_or_else(|| "nanoc".to_owned());
        print!(
            "NanoC compiler\n\n\
             Usage: {cmd0} [OPTIONS] [FILE]\n\n\
             With no FILE, reads a program from stdin and echoes all phases.\n\n\
             Options:\n\
             \x20 -h, --help             Show this message\n\
             \x20     --lex              Stop after lexing\n\
             \x20     --parse            Stop after parsing\n\
             \x20     --validate         Stop after semantic analysis\n\
             \x20     --ir               Stop after IR generation\n\
             \x20     --opt              Stop after optimization\n\
             \x20 -S, --no-assemble      Compile only; do not assemble or link\n\
             \x20                        (Output assembly file)\n\
             \x20 -c, --no-link          Compile and assemble, but do not link\n\
             \x20                        (Output object file)\n"
        );
        exit(0)
    }
}

fn run_repl() -> Result<()> {
    println!("NanoC compiler interactive mode");
    println!("Type a program, then press Ctrl-D to compile:");

    let mut source = String::new();
    std::io::stdin()
        .read_to_string(&mut source)
        .context("failed to read stdin")?;

    let artifacts = compile(
        &source,
        &Options {
            emit_phases: true,
            ..Options::default()
        },
    )?;

    println!("\n[1] Tokens:");
    for token in &artifacts.tokens {
        println!("  {token:?}");
    }

    println!("\n[2] Abstract syntax tree:");
    println!("{:#?}", artifacts.ast);

    println!("\n[3] Semantic analysis:");
    println!("  passed");

    println!("\n[4] Intermediate representation:");
    print!("{}", artifacts.ir);

    println!("\n[5] Optimized IR:");
    print!("{}", artifacts.optimized_ir);

    println!("\n[6] Assembly:");
    print!("{}", artifacts.asm);

    Ok(())
}

fn compile_file(args: &Args) -> Result<()> {
    let input = args.input.as_ref().expect("checked by caller");
    let source = fs::read_to_string(input)
        .with_context(|| format!("cannot read {}", input.to_string_lossy()))?;

    let tokens = nanoc::lexer::lex(&source)?;
    if args.lex {
        dbg!(tokens);
        return Ok(());
    }

    let program = nanoc::parser::parse(&tokens)?;
    if args.parse {
        dbg!(program);
        return Ok(());
    }

    nanoc::semantic_analysis::validate(&program)?;
    if args.validate {
        dbg!(program);
        return Ok(());
    }

    let ir = nanoc::ir::lower(&program);
    if args.ir {
        print!("{ir}");
        return Ok(());
    }

    let optimized = nanoc::optimize::optimize(&ir);
    nanoc::optimize::verify(&optimized)?;
    if args.opt {
        print!("{optimized}");
        return Ok(());
    }

    let asm_ast = nanoc::codegen::codegen(&optimized)?;

    let mut asm_file = input.clone();
    asm_file.set_extension("s");
    fs::write(&asm_file, asm_ast.to_string())
        .with_context(|| format!("cannot write {}", asm_file.to_string_lossy()))?;

    if args.no_assemble {
        return Ok(());
    }

    let mut object_file = input.clone();
    object_file.set_extension("o");
    let status = Command::new("nasm")
        .arg("-felf64")
        .arg(&asm_file)
        .arg("-o")
        .arg(&object_file)
        .status()
        .context("failed to run nasm")?;
    if !status.success() {
        return Err(anyhow!("assembler failed"));
    }
    fs::remove_file(&asm_file)?;

    if args.no_link {
        return Ok(());
    }

    let mut out_file = input.clone();
    out_file.set_extension("");
    // gcc links in the C runtime that provides printf and scanf
    let status = Command::new("gcc")
        .arg("-no-pie")
        .arg(&object_file)
        .arg("-o")
        .arg(&out_file)
        .status()
        .context("failed to run linker")?;
    if !status.success() {
        return Err(anyhow!("linker failed"));
    }
    fs::remove_file(&object_file)?;

    Ok(())
}

fn is_compile_error(err: &anyhow::Error) -> bool {
    err.is::<CompileError>()
        || err.is::<nanoc::lexer::LexError>()
        || err.is::<nanoc::parser::ParseError>()
        || err.is::<nanoc::semantic_analysis::SemError>()
        || err.is::<nanoc::ir::InternalError>()
}

fn main() -> ExitCode {
    let args = Args::parse();

    let result = if args.input.is_some() {
        compile_file(&args)
    } else {
        run_repl()
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            if is_compile_error(&err) {
                ExitCode::from(1)
            } else {
                ExitCode::from(2)
            }
        }
    }
}
