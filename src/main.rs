use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, ValueEnum};
use promptty::output::{render, write_captured};
use promptty::{Config, MatchRule, QuotePolicy, parse_duration};
use std::io::{self, IsTerminal};
use std::time::Duration;
use tracing::{Level, debug};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "promptty",
    about = "Run a command in a PTY with a timeout, answering its first prompt",
    version
)]
struct Args {
    /// Full command line to run
    #[arg(short, long)]
    command: Option<String>,

    /// Deadline after which the command is killed (e.g. 500ms, 30s, 1m30s)
    #[arg(
        short,
        long = "timeout-duration",
        value_parser = parse_duration,
        default_value = "60s"
    )]
    timeout: Duration,

    /// Line written to the terminal once the prompt matches
    #[arg(long, default_value = "")]
    stdin: String,

    /// Prompt must start with this text
    #[arg(
        long = "prompt-starts-with",
        aliases = ["prompt-startsWith", "stdinRule-startsWith"],
        default_value = ""
    )]
    starts_with: String,

    /// Prompt must end with this text
    #[arg(
        long = "prompt-ends-with",
        aliases = ["prompt-endsWith", "stdinRule-endsWith"],
        default_value = ""
    )]
    ends_with: String,

    /// Prompt must contain this text
    #[arg(
        long = "prompt-contains",
        aliases = ["stdinRule-contains"],
        default_value = ""
    )]
    contains: String,

    /// Prompt must match this regular expression
    #[arg(
        long = "prompt-regex",
        aliases = ["prompt-matchRegex", "stdinRule-regex"],
        default_value = ""
    )]
    regex: String,

    /// How nested single and double quotes split the command line
    #[arg(long, value_enum, default_value_t = Quotes::Independent)]
    quote_policy: Quotes,

    /// Quiet period that marks the end of a prompt
    #[arg(long, value_parser = parse_duration, default_value = "50ms")]
    prompt_settle: Duration,

    /// Show the prompt as an escaped literal in verbose output
    #[arg(long)]
    escape_prompt: bool,

    /// Print captured stdout as an escaped literal
    #[arg(long)]
    escape_stdout: bool,

    /// Print captured stderr as an escaped literal
    #[arg(long)]
    escape_stderr: bool,

    /// Log the prompt and read errors
    #[arg(short, long)]
    verbose: bool,

    /// Print nothing; the exit code alone reports the outcome
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Quotes {
    Independent,
    Shared,
}

impl From<Quotes> for QuotePolicy {
    fn from(quotes: Quotes) -> Self {
        match quotes {
            Quotes::Independent => QuotePolicy::Independent,
            Quotes::Shared => QuotePolicy::Shared,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose, args.quiet);

    let Some(command) = args.command.as_deref().filter(|c| !c.trim().is_empty()) else {
        eprintln!("{}", Args::command().render_help());
        std::process::exit(1);
    };

    let rule = MatchRule::default()
        .starts_with(&args.starts_with)
        .ends_with(&args.ends_with)
        .contains(&args.contains)
        .regex(&args.regex);
    let config = Config::builder(command)
        .timeout(args.timeout)
        .stdin(&args.stdin)
        .rule(rule)
        .quote_policy(args.quote_policy.into())
        .prompt_settle(args.prompt_settle)
        .verbose(args.verbose)
        .build()
        .context("Invalid configuration")?;

    let result = promptty::run(&config)
        .await
        .with_context(|| format!("Failed to run command: {command}"))?;

    if let Some(prompt) = &result.prompt {
        debug!(
            "[Prompt] '{}'",
            String::from_utf8_lossy(&render(prompt, args.escape_prompt))
        );
    }
    if !result.success {
        debug!(error = %result.error, exit_code = result.exit_code, "command failed");
    }

    if !args.quiet {
        write_captured(&mut io::stdout(), &result.stdout, args.escape_stdout)?;
        write_captured(&mut io::stderr(), &result.stderr, args.escape_stderr)?;
    }

    std::process::exit(result.exit_code);
}

fn init_tracing(verbose: bool, quiet: bool) {
    let level = if verbose {
        Level::DEBUG
    } else if quiet {
        Level::ERROR
    } else {
        Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(io::stderr().is_terminal())
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .init();
}
