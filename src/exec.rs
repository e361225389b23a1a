//! # Templated Command Execution
//!
//! This module turns a resolved [`TemplatedCommand`](crate::config::TemplatedCommand)
//! into a running process. It is responsible for:
//!
//! - expanding command tokens: literal tokens go through placeholder
//!   substitution, function-call tokens are resolved against an explicit
//!   [`FunctionRegistry`] (built-ins plus caller-supplied extras) and their
//!   results spliced into the token stream;
//! - deciding host-vs-container execution from the command's resolved
//!   container options, including building the image first when the options
//!   carry a Dockerfile build spec;
//! - injecting merged environment entries and mounting the working tree into
//!   the container;
//! - capturing output and scrubbing secret-marked values from every log line
//!   and from raised errors. Upstream commands pass OAuth tokens embedded in
//!   URLs through here, so redaction is a correctness requirement, not
//!   cosmetics.
//!
//! Execution is strictly sequential and blocking; a `dry_run` flag logs what
//! would run and reports synthetic success instead of executing.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, error, info, log, Level};

use crate::config::{ImageSource, TemplatedCommand, Token};
use crate::defaults::{REDACTED_OUT_SECRET, SPEC_REPO_MOUNTPOINT};
use crate::error::{Error, Result};
use crate::template;

/// One expanded command-line element, with a secrecy marker controlling how
/// it appears in logs and errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmdPart {
    pub value: String,
    pub secret: bool,
}

impl CmdPart {
    pub fn plain(value: impl Into<String>) -> Self {
        CmdPart {
            value: value.into(),
            secret: false,
        }
    }

    pub fn secret(value: impl Into<String>) -> Self {
        CmdPart {
            value: value.into(),
            secret: true,
        }
    }

    /// The value as it may appear in logs.
    pub fn logged(&self) -> &str {
        if self.secret {
            REDACTED_OUT_SECRET
        } else {
            &self.value
        }
    }
}

/// Captured result of a finished subprocess.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// A callable usable from function-call tokens.
///
/// Receives the execution working directory plus the (already substituted)
/// positional and keyword arguments, and returns the tokens to splice into
/// the command line.
pub type CommandFunction =
    Box<dyn Fn(&Path, &[String], &BTreeMap<String, String>) -> Result<Vec<String>>>;

/// The set of functions callable from command tokens.
///
/// The registry is passed explicitly into the executor so the callable set
/// stays auditable; callers extend it per invocation (the generate command
/// injects its default generator invocation this way).
pub struct FunctionRegistry {
    functions: BTreeMap<String, CommandFunction>,
}

impl FunctionRegistry {
    /// Registry with only the built-in functions (`glob`, `glob_re`).
    pub fn builtin() -> Self {
        let mut registry = FunctionRegistry {
            functions: BTreeMap::new(),
        };
        registry.register("glob", Box::new(glob_function));
        registry.register("glob_re", Box::new(glob_re_function));
        registry
    }

    pub fn register(&mut self, name: &str, function: CommandFunction) {
        self.functions.insert(name.to_string(), function);
    }

    fn get(&self, name: &str) -> Option<&CommandFunction> {
        self.functions.get(name)
    }
}

/// Expand glob patterns relative to `cwd`, returning matches relative to it.
fn glob_function(
    cwd: &Path,
    args: &[String],
    _kwargs: &BTreeMap<String, String>,
) -> Result<Vec<String>> {
    let mut result = Vec::new();
    for pattern in args {
        let full_pattern = cwd.join(pattern);
        let mut matches = Vec::new();
        for entry in glob::glob(&full_pattern.to_string_lossy())? {
            let path = entry?;
            let relative = path.strip_prefix(cwd).unwrap_or(&path);
            matches.push(relative.to_string_lossy().into_owned());
        }
        matches.sort();
        result.extend(matches);
    }
    Ok(result)
}

/// Like `glob`, but keeps only matches accepted by a regex. The glob pattern
/// is the first argument, the regex the second (or the `filter` kwarg).
fn glob_re_function(
    cwd: &Path,
    args: &[String],
    kwargs: &BTreeMap<String, String>,
) -> Result<Vec<String>> {
    let pattern = args.first().ok_or_else(|| Error::ConfigParse {
        message: "glob_re requires a glob pattern as its first argument".to_string(),
        hint: None,
    })?;
    let filter = args
        .get(1)
        .or_else(|| kwargs.get("filter"))
        .ok_or_else(|| Error::ConfigParse {
            message: "glob_re requires a regex as its second argument or 'filter' kwarg"
                .to_string(),
            hint: None,
        })?;
    let regex = regex::Regex::new(filter)?;
    let matches = glob_function(cwd, std::slice::from_ref(pattern), kwargs)?;
    Ok(matches
        .into_iter()
        .filter(|m| regex.is_match(m))
        .collect())
}

/// Expand a configured command line into concrete command parts.
///
/// Literal tokens go through placeholder substitution against `variables`;
/// function-call tokens are resolved against `functions` and their results
/// spliced in; secret tokens are substituted but keep their secrecy marker.
/// An unknown function name is fatal and names the function and command.
pub fn expand_commandline(
    command: &TemplatedCommand,
    cwd: &Path,
    variables: &BTreeMap<String, String>,
    functions: &FunctionRegistry,
) -> Result<Vec<CmdPart>> {
    let mut parts = Vec::new();
    for token in &command.commandline {
        match token {
            Token::Literal(value) => {
                parts.push(CmdPart::plain(template::render(value, variables)));
            }
            Token::Secret { item, secret } => {
                let rendered = template::render(item, variables);
                parts.push(CmdPart {
                    value: rendered,
                    secret: *secret,
                });
            }
            Token::Call {
                function,
                args,
                kwargs,
            } => {
                let callable = functions.get(function).ok_or_else(|| Error::UnknownFunction {
                    function: function.clone(),
                    command: command.description.clone(),
                })?;
                let args: Vec<String> = args
                    .iter()
                    .map(|a| template::render(a, variables))
                    .collect();
                let kwargs: BTreeMap<String, String> = kwargs
                    .iter()
                    .map(|(k, v)| (k.clone(), template::render(v, variables)))
                    .collect();
                for value in callable(cwd, &args, &kwargs)? {
                    parts.push(CmdPart::plain(value));
                }
            }
        }
    }
    Ok(parts)
}

/// Replace every secret value occurring in `text` with the redaction marker.
fn scrub(text: &str, parts: &[CmdPart]) -> String {
    let mut scrubbed = text.to_string();
    for part in parts.iter().filter(|p| p.secret && !p.value.is_empty()) {
        scrubbed = scrubbed.replace(&part.value, REDACTED_OUT_SECRET);
    }
    scrubbed
}

/// Run a host subprocess with captured output and redacting logging.
///
/// `additional_env` entries are added on top of the inherited process
/// environment. A nonzero exit is returned as [`Error::Process`] carrying
/// the (scrubbed) captured output.
pub fn run_command(
    parts: &[CmdPart],
    description: &str,
    cwd: &Path,
    additional_env: &BTreeMap<String, String>,
    level: Level,
    dry_run: bool,
) -> Result<CommandOutput> {
    let (program, args) = parts.split_first().ok_or_else(|| Error::ConfigParse {
        message: format!("command '{}' expanded to an empty command line", description),
        hint: None,
    })?;

    let logged: Vec<&str> = parts.iter().map(CmdPart::logged).collect();
    log!(level, "Running command '{}'", logged.join(" "));

    if dry_run {
        info!("Dry run, not executing");
        return Ok(CommandOutput::default());
    }

    let output = Command::new(&program.value)
        .args(args.iter().map(|p| &p.value))
        .current_dir(cwd)
        .envs(additional_env)
        .output()?;

    let result = CommandOutput {
        code: output.status.code().unwrap_or(-1),
        stdout: scrub(&String::from_utf8_lossy(&output.stdout), parts),
        stderr: scrub(&String::from_utf8_lossy(&output.stderr), parts),
    };

    if output.status.success() {
        debug!(
            "Command result: RETCODE: {}\nSTDOUT:\n{}STDERR:\n{}",
            result.code, result.stdout, result.stderr
        );
        Ok(result)
    } else {
        error!(
            "Error in called process: RETCODE: {}\nSTDOUT:\n{}STDERR:\n{}",
            result.code, result.stdout, result.stderr
        );
        Err(Error::Process {
            description: description.to_string(),
            code: output.status.code(),
            output: format!("{}{}", result.stdout, result.stderr),
        })
    }
}

/// Execution switches shared by all orchestration commands.
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// Log what would run instead of executing.
    pub dry_run: bool,
    /// Extra flags appended to every container run invocation.
    pub extra_container_run_args: Vec<String>,
}

/// Join path components while dropping no-op `.` segments, so container
/// working directories don't end up as `/tmp/spec-repo/./.`.
fn join_normalized(base: &Path, relative: &Path) -> PathBuf {
    let mut joined = base.to_path_buf();
    for component in relative.components() {
        if component.as_os_str() != "." {
            joined.push(component);
        }
    }
    joined
}

fn sanitize_label(label: &str) -> String {
    label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}

/// Execute one resolved templated command.
///
/// Expands the token stream (with `variables` plus `cwd` injected as a
/// variable), merges `env_overrides` over the command's configured
/// environment, and dispatches either to a host subprocess (`system: true`)
/// or to a container run that mounts the invocation working directory at a
/// fixed path. Fails with [`Error::Process`] on nonzero exit and
/// [`Error::UnknownFunction`] before launching anything when a function-call
/// token cannot be resolved.
pub fn run_config_command(
    command: &TemplatedCommand,
    context_label: &str,
    cwd: &Path,
    variables: &BTreeMap<String, String>,
    functions: &FunctionRegistry,
    env_overrides: &BTreeMap<String, String>,
    options: &ExecOptions,
) -> Result<CommandOutput> {
    let mut variables = variables.clone();
    variables.insert("cwd".to_string(), cwd.display().to_string());

    info!("Running command '{}'", command.description);
    let parts = expand_commandline(command, cwd, &variables, functions)?;

    let opts = command.container_opts();
    let mut environment = opts.environment.clone();
    environment.extend(env_overrides.clone());

    if opts.is_system() {
        return run_command(
            &parts,
            &command.description,
            cwd,
            &environment,
            Level::Info,
            options.dry_run,
        );
    }

    let image = match opts.image() {
        ImageSource::Reference(reference) => reference,
        ImageSource::Build {
            dockerfile,
            context,
        } => {
            let tag = format!("apigentools-build-{}", sanitize_label(context_label));
            let build_parts = vec![
                CmdPart::plain("docker"),
                CmdPart::plain("build"),
                CmdPart::plain("-t"),
                CmdPart::plain(&tag),
                CmdPart::plain("-f"),
                CmdPart::plain(dockerfile),
                CmdPart::plain(context),
            ];
            run_command(
                &build_parts,
                &format!("build image for {}", context_label),
                Path::new("."),
                &BTreeMap::new(),
                Level::Info,
                options.dry_run,
            )?;
            tag
        }
    };

    let mount_source = std::env::current_dir()?;
    let container_workdir = join_normalized(
        &join_normalized(Path::new(SPEC_REPO_MOUNTPOINT), cwd),
        Path::new(opts.workdir()),
    );

    let (entrypoint, arguments) = parts.split_first().ok_or_else(|| Error::ConfigParse {
        message: format!(
            "command '{}' expanded to an empty command line",
            command.description
        ),
        hint: None,
    })?;

    let mut run_parts = vec![
        CmdPart::plain("docker"),
        CmdPart::plain("run"),
        CmdPart::plain("--rm"),
        CmdPart::plain("-v"),
        CmdPart::plain(format!(
            "{}:{}",
            mount_source.display(),
            SPEC_REPO_MOUNTPOINT
        )),
        CmdPart::plain("-w"),
        CmdPart::plain(container_workdir.display().to_string()),
    ];
    for (key, value) in &environment {
        run_parts.push(CmdPart::plain("-e"));
        run_parts.push(CmdPart::plain(format!("{}={}", key, value)));
    }
    for extra in &options.extra_container_run_args {
        run_parts.push(CmdPart::plain(extra));
    }
    run_parts.push(CmdPart::plain("--entrypoint"));
    run_parts.push(entrypoint.clone());
    run_parts.push(CmdPart::plain(image));
    run_parts.extend(arguments.iter().cloned());

    run_command(
        &run_parts,
        &command.description,
        Path::new("."),
        &BTreeMap::new(),
        Level::Info,
        options.dry_run,
    )
}
