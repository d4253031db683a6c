use clap::Parser;
use lexem::memory::MemoryConfig;
use num_traits::ToPrimitive;
use repl::logger::ShellLogger;
use repl::Shell;
use std::path::PathBuf;

mod lexer;
mod repl;

/// interactive shell over the lexem memory engine
#[derive(Parser, Debug)]
#[command(name = "lexem", version, about)]
struct Args {
    /// run a garbage collection after this many allocations (0 disables it)
    #[arg(long, default_value_t = 0)]
    gc_threshold: usize,

    /// error, warn, info, debug or trace
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// file of shell commands to run instead of the interactive session
    script: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();
    ShellLogger::init(&args.log_level);

    let mut shell = Shell::new(MemoryConfig {
        gc_threshold: args.gc_threshold,
    });
    let Some(path) = args.script else {
        repl::serve_repl(&mut shell);
        return;
    };

    let source = match std::fs::read_to_string(&path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("could not read {}: {e}", path.display());
            std::process::exit(1);
        }
    };
    let name = path.display().to_string();
    if let Err(e) = repl::run_script(&mut shell, &name, &source) {
        std::process::exit(e.kind().to_i32().unwrap_or(1));
    }
}
