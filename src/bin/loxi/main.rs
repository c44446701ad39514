use std::io::Write;

use lox::{analysis::{self, Diagnostic, Resolver, Severity}, ast::{Parser, Stmt}, errors, interpreter::{self, Interpreter}, lexer::Scanner, LoxError};
use lox::cmdline::{CommandLineOptions, USAGE};
use tracing::debug;

/// Why a script could not be run to completion.
enum Failure {
    /// The problems were found, and reported, before the script started running.
    Static,
    Runtime(LoxError),
    System(LoxError),
}

impl Failure {
    fn exit_code(&self) -> i32 {
        match self {
            Failure::Static => 65,
            Failure::Runtime(_) => 70,
            Failure::System(_) => 1,
        }
    }
}

impl From<LoxError> for Failure {
    fn from(err: LoxError) -> Self {
        Failure::System(err)
    }
}

fn main() {
    let opts = CommandLineOptions::parse();
    if opts.help {
        println!("{}", USAGE);
        return;
    }

    init_tracing(opts.debug);

    let result = std::thread::Builder::new()
        .name("interpreter".to_string())
        .stack_size(interpreter::STACK_SIZE)
        .spawn(move || match &opts.file {
            Some(file) => run_file(file, &opts),
            None => run_prompt(&opts),
        })
        .map_err(|e| Failure::System(LoxError::from(e)))
        .and_then(|handle| handle.join().unwrap_or_else(|_| Err(Failure::System(errors::system(
            "The interpreter thread panicked.",
            "This is a bug in the interpreter, please report it with example code.",
        )))));

    if let Err(failure) = result {
        if let Failure::Runtime(e) | Failure::System(e) = &failure {
            eprintln!("{}", e);
        }

        std::process::exit(failure.exit_code());
    }
}

fn init_tracing(debug: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "lox=debug,loxi=debug" } else { "warn" }));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).without_time().with_target(true))
        .with(filter)
        .init();
}

fn run_file(filename: &str, opts: &CommandLineOptions) -> Result<(), Failure> {
    let content = std::fs::read(filename).map_err(LoxError::from)?;
    let content = std::str::from_utf8(&content).map_err(|_e| errors::system(
        "The file you provided is not a valid UTF-8 file.",
        "Make sure that the file is a valid UTF-8 file.",
    ))?;

    let stmts = parse(content)?;

    let diagnostics = analysis::resolve(&stmts);
    report(&diagnostics, opts.warnings);
    if diagnostics.iter().any(Diagnostic::is_fatal) {
        return Err(Failure::Static);
    }

    debug!(file = filename, statements = stmts.len(), "running script");
    Interpreter::default().interpret(&stmts).map_err(Failure::Runtime)
}

fn run_prompt(opts: &CommandLineOptions) -> Result<(), Failure> {
    let mut session = Session {
        resolver: Resolver::default(),
        interpreter: Interpreter::default(),
    };

    let mut buffer = String::new();
    loop {
        print!("> ");
        std::io::stdout().flush().map_err(LoxError::from)?;

        buffer.clear();
        if std::io::stdin().read_line(&mut buffer).map_err(LoxError::from)? == 0 || buffer.trim() == "exit" {
            break;
        }

        match session.run(&buffer, opts.warnings) {
            Ok(()) | Err(Failure::Static) => {},
            Err(Failure::Runtime(e)) | Err(Failure::System(e)) => eprintln!("{}", e),
        }
    }

    report(&session.resolver.finish(), opts.warnings);
    Ok(())
}

/// An interactive prompt, where each line continues the program entered so far.
struct Session {
    resolver: Resolver,
    interpreter: Interpreter,
}

impl Session {
    fn run(&mut self, source: &str, warnings: bool) -> Result<(), Failure> {
        let stmts = parse(source)?;

        let slots = self.resolver.global_slots();
        let diagnostics = self.resolver.resolve(&stmts);
        report(&diagnostics, warnings);
        if diagnostics.iter().any(Diagnostic::is_fatal) {
            return Err(Failure::Static);
        }

        self.interpreter.ensure_global_slots(slots);
        self.interpreter.interpret(&stmts).map_err(Failure::Runtime)
    }
}

fn parse(source: &str) -> Result<Vec<Stmt>, Failure> {
    let mut had_error = false;

    let (stmts, errs) = Parser::parse(&mut Scanner::new(source).inspect(|t| if let Err(e) = t {
        eprintln!("{}", e);
        had_error = true;
    }).filter_map(|t| t.ok()));

    for err in &errs {
        eprintln!("{}", err);
    }

    if had_error || !errs.is_empty() {
        return Err(Failure::Static);
    }

    Ok(stmts)
}

fn report(diagnostics: &[Diagnostic], warnings: bool) {
    for diagnostic in diagnostics {
        match diagnostic.severity() {
            Severity::Warning if !warnings => {},
            _ => eprintln!("{}", diagnostic),
        }
    }
}
