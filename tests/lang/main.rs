use lox::{analysis::{self, Severity}, ast::Parser, interpreter::{Interpreter, STACK_SIZE}, lexer::Scanner, CaptureOutput, LoxError};
use pretty_assertions::assert_eq;
use regex::Regex;

include!(concat!(env!("OUT_DIR"), "/tests/lang.rs"));

/// Collects the text following every comment in `content` which matches `pattern`.
fn expectations(content: &str, pattern: &str) -> Vec<String> {
    Regex::new(pattern)
        .expect("regex should compile correctly")
        .captures_iter(content)
        .map(|c| c.get(1).map(|m| m.as_str().trim_end().to_string()).unwrap_or_default())
        .collect()
}

/// Runs the script at `path` on a thread with enough stack for the
/// interpreter's default call depth.
fn run_file(path: &str) -> Result<(), LoxError> {
    let path = path.to_string();
    let handle = std::thread::Builder::new()
        .stack_size(STACK_SIZE)
        .spawn(move || check_file(&path))?;

    match handle.join() {
        Ok(result) => result,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

fn check_file(path: &str) -> Result<(), LoxError> {
    let content = std::fs::read_to_string(path)?;

    let expected_output = expectations(&content, r"//\s*expect: (.*)");
    let expected_runtime_error = expectations(&content, r"//\s*expect runtime error: (.*)");
    let expected_static_errors = expectations(&content, r"//\s*Error(?:: (.*))?");
    let expected_warnings = expectations(&content, r"//\s*expect warning: (.*)");

    let mut static_errors = Vec::new();
    let (stmts, errs) = Parser::parse(&mut Scanner::new(&content).inspect(|t| if let Err(e) = t {
        static_errors.push(e.description().to_string());
    }).filter_map(|t| t.ok()));

    static_errors.extend(errs.iter().map(|e| e.description().to_string()));

    let diagnostics = analysis::resolve(&stmts);
    static_errors.extend(diagnostics.iter().filter(|d| d.is_fatal()).map(|d| d.description().to_string()));

    if !expected_warnings.is_empty() {
        let warnings: Vec<&str> = diagnostics.iter().filter(|d| d.severity() == Severity::Warning).map(|d| d.description()).collect();
        assert_eq!(expected_warnings, warnings, "warnings reported for {}", path);
    }

    if !expected_static_errors.is_empty() {
        assert!(!static_errors.is_empty(), "expected {} to fail static analysis", path);
        for expected in expected_static_errors.iter().filter(|e| !e.is_empty()) {
            assert!(static_errors.contains(expected), "expected the error {:?} for {}, got {:?}", expected, path, static_errors);
        }

        return Ok(());
    }

    assert!(static_errors.is_empty(), "did not expect any errors in {}, got {:?}", path, static_errors);

    let output = CaptureOutput::default();
    let mut interpreter = Interpreter::default().with_output(Box::new(output.clone()));

    match (interpreter.interpret(&stmts), expected_runtime_error.first()) {
        (Ok(()), None) => {},
        (Ok(()), Some(expected)) => panic!("expected the runtime error {:?} from {}", expected, path),
        (Err(err), Some(expected)) => {
            assert!(err.is_runtime(), "expected a runtime error from {}, got {}", path, err);
            assert_eq!(expected.as_str(), err.description());
        },
        (Err(err), None) => return Err(err),
    }

    let actual = output.to_string();
    assert_eq!(expected_output, actual.lines().collect::<Vec<&str>>(), "output of {}", path);

    Ok(())
}
