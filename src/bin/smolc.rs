//! The main compiler binary: takes a source file and an output format, runs
//! it through the fixed pipeline (`smolc::driver::compile`), and prints the
//! requested artifact. Run with `--help` for more info.

use clap::{Parser, ValueEnum};
use smolc::driver;
use smolc::front;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// The input file.
    file: String,

    /// The artifact to print.
    #[arg(value_enum, short, long, default_value_t = Output::Asm)]
    out: Output,

    /// Restrict per-pass IR tracing to these stage names (comma-separated);
    /// traces every stage if omitted. Stage names match those passed to
    /// `PassManager::trace` in `driver::pipeline`, e.g. `shrink`,
    /// `remove_complex_operands`, `explicate_control`, `allocate_registers`.
    #[arg(short, long, value_delimiter = ',')]
    passes: Vec<String>,

    /// Enable debug-level tracing output (implied by non-empty `--passes`).
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
enum Output {
    /// The list of tokens.
    Tokens,
    /// The surface AST, after parsing.
    Ast,
    /// The control-flow IR, after explicate-control.
    Cir,
    /// The resulting x86-64 assembly.
    Asm,
}

fn main() {
    let args = Args::parse();

    let filter = if args.verbose || !args.passes.is_empty() { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .without_time()
        .init();

    if let Err(e) = run(&args) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let input = std::fs::read_to_string(&args.file)?;

    match args.out {
        Output::Tokens => {
            let mut lexer = front::lex::Lexer::new(&input);
            while let Some(token) = lexer.next()? {
                println!("{token}");
            }
        }
        Output::Ast => {
            let ast = front::parse(&input)?;
            println!("{ast:?}");
        }
        Output::Cir => {
            let cir = driver::pipeline::compile_to_cir(&input, &args.passes)?;
            println!("{cir}");
        }
        Output::Asm => {
            let result = driver::compile(&input, &args.passes)?;
            println!("{}", result.assembly);
        }
    }
    Ok(())
}
