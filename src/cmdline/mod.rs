pub const USAGE: &str = "Usage: loxi [options] [script]

Runs the provided Lox script, or starts an interactive prompt when no script is given.

Options:
  -d, --debug        Log the interpreter's progress at the debug level (overridden by RUST_LOG)
      --no-warnings  Do not report warnings found while analysing the script
  -h, --help         Show this message";

#[derive(Debug, Clone, PartialEq)]
pub struct CommandLineOptions {
    pub file: Option<String>,
    pub debug: bool,
    pub warnings: bool,
    pub help: bool,
}

impl Default for CommandLineOptions {
    fn default() -> Self {
        Self {
            file: None,
            debug: false,
            warnings: true,
            help: false,
        }
    }
}

impl CommandLineOptions {
    pub fn parse() -> Self {
        Self::parse_from(std::env::args().skip(1))
    }

    pub fn parse_from<I: IntoIterator<Item = S>, S: Into<String>>(args: I) -> Self {
        let mut options = CommandLineOptions::default();

        for arg in args.into_iter().map(Into::into) {
            match arg.as_str() {
                "-d" | "--debug" => options.debug = true,
                "--no-warnings" => options.warnings = false,
                "-h" | "--help" => options.help = true,
                _ => {
                    if options.file.is_none() {
                        options.file = Some(arg);
                    } else {
                        eprintln!("Ignoring unrecognized command line argument: {}", arg);
                    }
                }
            }
        }

        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = CommandLineOptions::parse_from(Vec::<String>::new());
        assert_eq!(options, CommandLineOptions::default());
        assert!(options.warnings);
    }

    #[test]
    fn flags_and_file() {
        let options = CommandLineOptions::parse_from(["--debug", "script.lox", "--no-warnings", "extra.lox"]);
        assert_eq!(options, CommandLineOptions {
            file: Some("script.lox".to_string()),
            debug: true,
            warnings: false,
            help: false,
        });

        assert!(CommandLineOptions::parse_from(["-h"]).help);
    }
}
