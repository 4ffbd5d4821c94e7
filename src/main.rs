// cfront: C front end driver — parse, resolve, print the typed tree.

mod ast;
mod context;
mod diagnostics;
mod parser;
mod sema;

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use ast::RenderMode;
use context::Context;
use parser::Parser;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Parse command-line arguments
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        let program_name = args.first().map(String::as_str).unwrap_or("cfront");
        eprintln!("Error: No input file provided");
        eprintln!();
        eprintln!("Usage: {program_name} <file.c>");
        return ExitCode::FAILURE;
    }

    let input_file = &args[1];
    if !Path::new(input_file).exists() {
        eprintln!("Error: File '{input_file}' not found");
        return ExitCode::FAILURE;
    }

    let source = match fs::read_to_string(input_file) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Error: Failed to read '{input_file}': {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut ctx = Context::new();

    eprintln!("Parsing {input_file}...");
    let mut tree = match Parser::new(&source, &mut ctx).parse() {
        Ok(tree) => tree,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    eprintln!("Resolving...");
    if let Err(err) = sema::resolve(&mut tree, &mut ctx) {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }

    print!("{}", tree.render(RenderMode::Current));

    for notice in ctx.take_notices() {
        eprintln!("{notice}");
    }

    ExitCode::SUCCESS
}
