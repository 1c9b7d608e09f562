//! Command-line front-end for the `mocksmith` binary.

use std::env;
use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::path::PathBuf;

use crate::error::Result;
use crate::generator::{Generator, GeneratorConfig, OutputLayout, TypeStatus};
use crate::input;
use crate::logging::{self, LogFormat, LogLevel, LogSettings};
use crate::runtime::{ConstructionPolicy, MissingStubPolicy};

/// Error raised for malformed command lines.
#[derive(Debug)]
pub struct CliError {
    message: String,
}

impl CliError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for CliError {}

/// Parsed command line.
#[derive(Debug)]
pub struct Cli {
    pub command: Command,
    pub log: LogSettings,
}

#[derive(Debug)]
pub enum Command {
    Generate {
        model: PathBuf,
        targets: Vec<String>,
        outputs: OutputLayout,
        preprocessor: Option<String>,
        disable_module_import: bool,
        only_protocols: bool,
        default_stubs: bool,
        absent_instances: bool,
        json_report: bool,
    },
    Inspect {
        model: PathBuf,
    },
    Help,
    Version,
}

const USAGE: &str = "\
mocksmith - generate test doubles from a parsed declaration model

USAGE:
    mocksmith <command> [options]

COMMANDS:
    generate    Generate mocks for a set of target modules
    inspect     List the declarations in a model file
    help        Show this message
    version     Show the version

GENERATE OPTIONS:
    --model <path>           Declaration model JSON (required)
    --targets <a,b,...>      Target modules (or MOCKSMITH_TARGETS)
    --output-dir <dir>       One artifact per module under <dir> (default .)
    --outputs <p1,p2,...>    Explicit artifact paths, one per target module
    --merged-output <path>   Merge all mocks into a single artifact
    --preprocessor <expr>    Wrap output in a conditional-compilation guard
    --disable-module-import  Assume same-module visibility in generated code
    --only-protocols         Mock interface-like declarations only
    --default-stubs          Return safe defaults for unstubbed members
    --absent-instances       Failable constructors return absent instances
    --json                   Print the per-type report as JSON
    --log-level <level>      error | warn | info | debug | trace
    --log-format <format>    auto | text | json
";

impl Cli {
    /// Parse an argument list (without the program name).
    ///
    /// # Errors
    /// Returns a [`CliError`] for unknown commands or options, missing flag
    /// values, and inconsistent output configurations.
    pub fn parse_from<I, S>(args: I) -> std::result::Result<Cli, CliError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args: Vec<String> = args.into_iter().map(Into::into).collect();
        if args.is_empty() {
            return Ok(Cli {
                command: Command::Help,
                log: LogSettings::default(),
            });
        }
        let command = args.remove(0);
        match command.as_str() {
            "generate" => Self::parse_generate(args),
            "inspect" => Self::parse_inspect(args),
            "help" | "--help" | "-h" => Ok(Cli {
                command: Command::Help,
                log: LogSettings::default(),
            }),
            "version" | "--version" => Ok(Cli {
                command: Command::Version,
                log: LogSettings::default(),
            }),
            other => Err(CliError::new(format!(
                "unknown command `{other}`; run `mocksmith help`"
            ))),
        }
    }

    fn parse_generate(args: Vec<String>) -> std::result::Result<Cli, CliError> {
        let mut model: Option<PathBuf> = None;
        let mut targets: Vec<String> = Vec::new();
        let mut output_dir: Option<PathBuf> = None;
        let mut explicit_outputs: Vec<PathBuf> = Vec::new();
        let mut merged_output: Option<PathBuf> = None;
        let mut preprocessor: Option<String> = None;
        let mut disable_module_import = false;
        let mut only_protocols = false;
        let mut default_stubs = false;
        let mut absent_instances = false;
        let mut json_report = false;
        let mut log = LogSettings::default();

        let mut iter = args.into_iter();
        while let Some(flag) = iter.next() {
            match flag.as_str() {
                "--model" => model = Some(PathBuf::from(take_value(&mut iter, &flag)?)),
                "--targets" => {
                    targets = split_list(&take_value(&mut iter, &flag)?);
                }
                "--output-dir" => output_dir = Some(PathBuf::from(take_value(&mut iter, &flag)?)),
                "--outputs" => {
                    explicit_outputs = split_list(&take_value(&mut iter, &flag)?)
                        .into_iter()
                        .map(PathBuf::from)
                        .collect();
                }
                "--merged-output" => {
                    merged_output = Some(PathBuf::from(take_value(&mut iter, &flag)?));
                }
                "--preprocessor" => preprocessor = Some(take_value(&mut iter, &flag)?),
                "--disable-module-import" => disable_module_import = true,
                "--only-protocols" => only_protocols = true,
                "--default-stubs" => default_stubs = true,
                "--absent-instances" => absent_instances = true,
                "--json" => json_report = true,
                "--log-level" => {
                    let value = take_value(&mut iter, &flag)?;
                    let level = LogLevel::parse(&value)
                        .ok_or_else(|| CliError::new(format!("invalid log level `{value}`")))?;
                    log.apply_level(level);
                }
                "--log-format" => {
                    let value = take_value(&mut iter, &flag)?;
                    let format = LogFormat::parse(&value)
                        .ok_or_else(|| CliError::new(format!("invalid log format `{value}`")))?;
                    log.apply_format(format);
                }
                other => return Err(CliError::new(format!("unknown option `{other}`"))),
            }
        }

        let model = model.ok_or_else(|| CliError::new("`--model <path>` is required"))?;
        if targets.is_empty() {
            if let Some(env_targets) = env::var_os("MOCKSMITH_TARGETS") {
                targets = split_list(&env_targets.to_string_lossy());
            }
        }
        if targets.is_empty() {
            return Err(CliError::new(
                "`--targets <a,b,...>` is required (or set MOCKSMITH_TARGETS)",
            ));
        }

        let outputs = match (merged_output, explicit_outputs.is_empty(), output_dir) {
            (Some(path), true, None) => OutputLayout::Merged(path),
            (None, false, None) => {
                if explicit_outputs.len() != targets.len() {
                    return Err(CliError::new(format!(
                        "`--outputs` lists {} path(s) for {} target(s)",
                        explicit_outputs.len(),
                        targets.len()
                    )));
                }
                OutputLayout::Explicit(explicit_outputs)
            }
            (None, true, directory) => {
                OutputLayout::PerModule(directory.unwrap_or_else(|| PathBuf::from(".")))
            }
            _ => {
                return Err(CliError::new(
                    "`--output-dir`, `--outputs`, and `--merged-output` are mutually exclusive",
                ))
            }
        };

        Ok(Cli {
            command: Command::Generate {
                model,
                targets,
                outputs,
                preprocessor,
                disable_module_import,
                only_protocols,
                default_stubs,
                absent_instances,
                json_report,
            },
            log,
        })
    }

    fn parse_inspect(args: Vec<String>) -> std::result::Result<Cli, CliError> {
        let mut model: Option<PathBuf> = None;
        let mut log = LogSettings::default();
        let mut iter = args.into_iter();
        while let Some(flag) = iter.next() {
            match flag.as_str() {
                "--model" => model = Some(PathBuf::from(take_value(&mut iter, &flag)?)),
                "--log-level" => {
                    let value = take_value(&mut iter, &flag)?;
                    let level = LogLevel::parse(&value)
                        .ok_or_else(|| CliError::new(format!("invalid log level `{value}`")))?;
                    log.apply_level(level);
                }
                other => return Err(CliError::new(format!("unknown option `{other}`"))),
            }
        }
        let model = model.ok_or_else(|| CliError::new("`--model <path>` is required"))?;
        Ok(Cli {
            command: Command::Inspect { model },
            log,
        })
    }
}

fn take_value(
    iter: &mut impl Iterator<Item = String>,
    flag: &str,
) -> std::result::Result<String, CliError> {
    iter.next()
        .ok_or_else(|| CliError::new(format!("`{flag}` expects a value")))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Execute a parsed command.
///
/// # Errors
/// Fails when the model cannot be loaded, the run-level configuration is
/// invalid, or an artifact cannot be written.
pub fn dispatch(cli: Cli) -> Result<()> {
    logging::init_logging(&cli.log.merged_with_env());
    match cli.command {
        Command::Help => {
            print!("{USAGE}");
            Ok(())
        }
        Command::Version => {
            println!("mocksmith {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::Inspect { model } => run_inspect(&model),
        Command::Generate {
            model,
            targets,
            outputs,
            preprocessor,
            disable_module_import,
            only_protocols,
            default_stubs,
            absent_instances,
            json_report,
        } => {
            let config = GeneratorConfig {
                target_modules: targets,
                outputs,
                preprocessor_condition: preprocessor,
                import_module: !disable_module_import,
                only_protocols,
                missing_stub_policy: if default_stubs {
                    MissingStubPolicy::ReturnDefault
                } else {
                    MissingStubPolicy::Fail
                },
                construction_policy: if absent_instances {
                    ConstructionPolicy::Fail
                } else {
                    ConstructionPolicy::Succeed
                },
            };
            run_generate(&model, &config, json_report)
        }
    }
}

fn run_inspect(model_path: &std::path::Path) -> Result<()> {
    let model = input::load_model(model_path)?;
    for (_, declaration) in model.iter() {
        println!(
            "{} {} ({} member(s))",
            match declaration.kind {
                crate::model::DeclarationKind::Interface => "interface",
                crate::model::DeclarationKind::Class => "class",
            },
            declaration.name.qualified(),
            declaration.members.len()
        );
    }
    Ok(())
}

fn run_generate(
    model_path: &std::path::Path,
    config: &GeneratorConfig,
    json_report: bool,
) -> Result<()> {
    let model = input::load_model(model_path)?;
    let report = Generator::generate(&model, config)?;

    // The engine hands artifacts back; writing them is this layer's job.
    // Failed types never produced an artifact, so nothing partial lands.
    for artifact in &report.artifacts {
        if let Some(parent) = artifact.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&artifact.path, &artifact.contents)?;
        tracing::info!(
            target: "write",
            path = %artifact.path.display(),
            types = artifact.types.len(),
            "artifact written"
        );
    }

    if json_report {
        println!(
            "{}",
            serde_json::to_string_pretty(&report.outcomes)
                .map_err(|err| crate::error::Error::internal(err.to_string()))?
        );
        return Ok(());
    }

    for outcome in &report.outcomes {
        match &outcome.status {
            TypeStatus::Generated { mock_name } => {
                println!("generated {} -> {mock_name}", outcome.name);
            }
            TypeStatus::Skipped { reason } => {
                println!("skipped {} ({reason})", outcome.name);
            }
            TypeStatus::Failed => {
                eprintln!("failed {}", outcome.name);
            }
        }
        for diagnostic in &outcome.diagnostics {
            eprintln!("  {diagnostic}");
        }
    }
    Ok(())
}

/// Print a top-level error the way the binary reports it.
pub fn report_error(error: &crate::error::Error) {
    eprintln!("error: {error}");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn generate_requires_a_model() {
        let err = Cli::parse_from(args(&["generate", "--targets", "App"])).unwrap_err();
        assert!(err.to_string().contains("--model"));
    }

    #[test]
    fn generate_parses_full_flag_set() {
        let cli = Cli::parse_from(args(&[
            "generate",
            "--model",
            "model.json",
            "--targets",
            "App,Net",
            "--merged-output",
            "AllMocks.generated.swift",
            "--preprocessor",
            "DEBUG",
            "--disable-module-import",
            "--only-protocols",
            "--default-stubs",
            "--absent-instances",
        ]))
        .unwrap();

        let Command::Generate {
            targets,
            outputs,
            preprocessor,
            disable_module_import,
            only_protocols,
            default_stubs,
            absent_instances,
            ..
        } = cli.command
        else {
            panic!("expected a generate command");
        };
        assert_eq!(targets, ["App", "Net"]);
        assert!(matches!(outputs, OutputLayout::Merged(_)));
        assert_eq!(preprocessor.as_deref(), Some("DEBUG"));
        assert!(disable_module_import);
        assert!(only_protocols);
        assert!(default_stubs);
        assert!(absent_instances);
    }

    #[test]
    fn outputs_count_must_match_targets() {
        let err = Cli::parse_from(args(&[
            "generate",
            "--model",
            "model.json",
            "--targets",
            "App,Net",
            "--outputs",
            "only-one.swift",
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("2 target(s)"));
    }

    #[test]
    fn conflicting_output_flags_are_rejected() {
        let err = Cli::parse_from(args(&[
            "generate",
            "--model",
            "model.json",
            "--targets",
            "App",
            "--output-dir",
            "out",
            "--merged-output",
            "all.swift",
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("mutually exclusive"));
    }

    #[test]
    fn unknown_command_is_reported() {
        let err = Cli::parse_from(args(&["install"])).unwrap_err();
        assert!(err.to_string().contains("unknown command"));
    }

    #[test]
    fn empty_invocation_shows_help() {
        let cli = Cli::parse_from(Vec::<String>::new()).unwrap();
        assert!(matches!(cli.command, Command::Help));
    }
}
