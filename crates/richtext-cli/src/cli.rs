use anyhow::Result;
use std::path::PathBuf;

pub const USAGE: &str = "\
Usage: richtext-cli [OPTIONS] [INPUT]

Sanitize institution-authored rich text. Reads INPUT, or stdin when INPUT is
omitted or '-'.

Options:
      --html             Treat input as an HTML fragment (default)
      --json             Treat input as backend JSON records
      --field NAME       Rich-text field to sanitize in JSON mode (repeatable)
      --pretty           Pretty-print JSON output
      --compact          Compact JSON output
  -o, --output PATH      Write to PATH instead of stdout
      --init-config      Write the default configuration file and exit
  -h, --help             Show this help
  -V, --version          Show version";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputFormat {
    #[default]
    Html,
    Json,
}

/// One sanitization run. Unset options fall back to the loaded config.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Invocation {
    pub format: InputFormat,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub fields: Vec<String>,
    pub pretty: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Run(Invocation),
    InitConfig,
    Help,
    Version,
}

impl Command {
    /// Parse arguments, excluding the program name.
    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut invocation = Invocation::default();
        let mut args = args.into_iter().map(Into::into);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => return Ok(Command::Help),
                "-V" | "--version" => return Ok(Command::Version),
                "--init-config" => return Ok(Command::InitConfig),
                "--html" => invocation.format = InputFormat::Html,
                "--json" => invocation.format = InputFormat::Json,
                "--pretty" => invocation.pretty = Some(true),
                "--compact" => invocation.pretty = Some(false),
                "--field" => {
                    let name = Self::value_for(&arg, args.next())?;
                    if name.trim().is_empty() {
                        return Err(anyhow::anyhow!("--field requires a non-empty name"));
                    }
                    invocation.fields.push(name);
                }
                "-o" | "--output" => {
                    let path = Self::value_for(&arg, args.next())?;
                    invocation.output = Some(PathBuf::from(path));
                }
                "-" => Self::set_input(&mut invocation, None)?,
                other if other.starts_with('-') => {
                    return Err(anyhow::anyhow!("Unknown option: {}", other));
                }
                path => Self::set_input(&mut invocation, Some(PathBuf::from(path)))?,
            }
        }

        Ok(Command::Run(invocation))
    }

    fn value_for(flag: &str, value: Option<String>) -> Result<String> {
        value.ok_or_else(|| anyhow::anyhow!("{} requires a value", flag))
    }

    fn set_input(invocation: &mut Invocation, path: Option<PathBuf>) -> Result<()> {
        if invocation.input.is_some() {
            return Err(anyhow::anyhow!("Only one input may be given"));
        }
        invocation.input = path;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments_sanitizes_stdin_as_html() {
        let command = Command::parse(Vec::<String>::new()).unwrap();
        assert_eq!(command, Command::Run(Invocation::default()));
    }

    #[test]
    fn test_json_invocation() {
        let command = Command::parse([
            "--json",
            "--field",
            "description",
            "--field",
            "summary",
            "--pretty",
            "-o",
            "out.json",
            "programs.json",
        ])
        .unwrap();

        let Command::Run(invocation) = command else {
            panic!("expected a run command");
        };
        assert_eq!(invocation.format, InputFormat::Json);
        assert_eq!(invocation.fields, vec!["description", "summary"]);
        assert_eq!(invocation.pretty, Some(true));
        assert_eq!(invocation.output, Some(PathBuf::from("out.json")));
        assert_eq!(invocation.input, Some(PathBuf::from("programs.json")));
    }

    #[test]
    fn test_dash_reads_stdin() {
        let Command::Run(invocation) = Command::parse(["--html", "-"]).unwrap() else {
            panic!("expected a run command");
        };
        assert!(invocation.input.is_none());
    }

    #[test]
    fn test_meta_commands() {
        assert_eq!(Command::parse(["--help"]).unwrap(), Command::Help);
        assert_eq!(Command::parse(["-V"]).unwrap(), Command::Version);
        assert_eq!(
            Command::parse(["--init-config"]).unwrap(),
            Command::InitConfig
        );
    }

    #[test]
    fn test_invalid_arguments() {
        assert!(Command::parse(["--bogus"]).is_err());
        assert!(Command::parse(["--field"]).is_err());
        assert!(Command::parse(["--field", " "]).is_err());
        assert!(Command::parse(["-o"]).is_err());
        assert!(Command::parse(["a.html", "b.html"]).is_err());
    }
}
