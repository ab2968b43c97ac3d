//! Vela Compiler CLI
//!
//! Compiles and runs each source file in order, unit by unit.

use std::io::Read;
use std::path::PathBuf;

use vela_compile::{CompileError, SessionConfig};
use velac::runtime::stdout_sink;
use velac::{init_tracing, new_session};

struct Options {
    import_dirs: Vec<PathBuf>,
    use_cache: bool,
    print_symbols: bool,
    sources: Vec<String>,
}

fn print_usage() {
    eprintln!("Usage: velac [options] [files...]");
    eprintln!();
    eprintln!("Reads standard input when no file (or `-`) is given.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -I <dir>          Add an import search directory");
    eprintln!("  --no-cache        Neither read nor write import caches");
    eprintln!("  --print-symbols   List native symbols after the run");
    eprintln!("  -h, --help        Show this message");
}

fn parse_args(args: &[String]) -> Options {
    let mut options = Options {
        import_dirs: Vec::new(),
        use_cache: true,
        print_symbols: false,
        sources: Vec::new(),
    };

    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        if arg == "-I" {
            let Some(dir) = args.get(i + 1) else {
                eprintln!("error: -I requires a directory");
                std::process::exit(1);
            };
            options.import_dirs.push(PathBuf::from(dir));
            i += 2;
            continue;
        }
        if let Some(dir) = arg.strip_prefix("-I") {
            options.import_dirs.push(PathBuf::from(dir));
        } else if arg == "--no-cache" {
            options.use_cache = false;
        } else if arg == "--print-symbols" {
            options.print_symbols = true;
        } else if arg == "-h" || arg == "--help" {
            print_usage();
            std::process::exit(0);
        } else if arg == "-" || !arg.starts_with('-') {
            options.sources.push(arg.clone());
        } else {
            eprintln!("error: unknown option '{arg}'");
            print_usage();
            std::process::exit(1);
        }
        i += 1;
    }

    if options.sources.is_empty() {
        options.sources.push("-".to_owned());
    }
    options
}

fn fail(err: &CompileError) -> ! {
    eprintln!("{}: {err}", err.category());
    std::process::exit(1);
}

fn main() {
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = parse_args(&args);

    let mut config = SessionConfig::from_env();
    for dir in options.import_dirs {
        config.import_paths.push(dir);
    }
    if !options.use_cache {
        config = config.with_cache(false, false);
    }

    let mut session = match new_session(config, stdout_sink()) {
        Ok(session) => session,
        Err(err) => fail(&err),
    };

    for source in &options.sources {
        let result = if source == "-" {
            let mut text = String::new();
            if let Err(err) = std::io::stdin().read_to_string(&mut text) {
                fail(&CompileError::Io {
                    path: PathBuf::from("<stdin>"),
                    source: err,
                });
            }
            session.run_source("<stdin>", text)
        } else {
            session.run_file(source)
        };
        if let Err(err) = result {
            fail(&err);
        }
    }

    let stats = session.stats();
    tracing::debug!(
        units = stats.units_compiled,
        cached = stats.units_loaded_from_cache,
        files = stats.files_compiled.len(),
        "run finished"
    );

    if options.print_symbols {
        for name in session.native_symbols() {
            println!("{name}");
        }
    }
}
