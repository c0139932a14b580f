use std::ffi::OsString;
use std::io::{self, Write};

use mvtrace::config::{ENV_ENABLED, ENV_OUTPUT};
use mvtrace::{Interceptor, TraceConfig, TraceOutput};
use mvtrace_harness::{WorkloadConfig, run_workload};

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    workload: WorkloadConfig,
    output: Option<String>,
    show_help: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    let env_configured = std::env::var_os(ENV_OUTPUT).is_some()
        || std::env::var_os(ENV_ENABLED).is_some();

    let exit_code = run(std::env::args_os(), env_configured, &mut stdout, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Run the workload. Trace lines go to the configured sink; a memory sink's
/// retained lines are printed to `out` once the run ends. The JSON report
/// goes to `err`.
fn run<I, W, E>(args: I, env_configured: bool, out: &mut W, err: &mut E) -> i32
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let options = match parse_args(args) {
        Ok(options) => options,
        Err(message) => {
            let _ = writeln!(err, "error: {message}");
            let _ = write_usage(err);
            return 2;
        }
    };

    if options.show_help {
        if write_usage(out).is_err() {
            return 1;
        }
        return 0;
    }

    let config = match trace_config(options.output.as_deref(), env_configured) {
        Ok(config) => config,
        Err(error) => {
            let _ = writeln!(err, "error: {error}");
            return 2;
        }
    };

    let interceptor = match Interceptor::from_config(&config) {
        Ok(interceptor) => interceptor,
        Err(error) => {
            let _ = writeln!(err, "error: {error}");
            return 1;
        }
    };

    let report = match run_workload(&options.workload, &interceptor) {
        Ok(report) => report,
        Err(error) => {
            let _ = writeln!(err, "error: {error}");
            return 1;
        }
    };

    if let Some(ring) = interceptor.emitter().sink().as_ring_buffer() {
        for line in ring.snapshot() {
            if writeln!(out, "{line}").is_err() {
                return 1;
            }
        }
    }

    match serde_json::to_string_pretty(&report) {
        Ok(json) => {
            if writeln!(err, "{json}").is_err() {
                return 1;
            }
        }
        Err(error) => {
            let _ = writeln!(err, "error: {error}");
            return 1;
        }
    }
    0
}

/// `--output` wins; otherwise the environment; otherwise stdout.
fn trace_config(output: Option<&str>, env_configured: bool) -> mvtrace::Result<TraceConfig> {
    match output {
        Some(spec) => {
            let output = TraceOutput::parse(spec)?;
            let enabled = output != TraceOutput::Disabled;
            Ok(TraceConfig { enabled, output })
        }
        None if env_configured => TraceConfig::from_env(),
        None => Ok(TraceConfig::enabled(TraceOutput::Stdout)),
    }
}

fn parse_args<I>(args: I) -> Result<CliOptions, String>
where
    I: IntoIterator<Item = OsString>,
{
    let mut iter = args.into_iter();
    let _argv0 = iter.next();

    let mut workload = WorkloadConfig::default();
    let mut output: Option<String> = None;
    let mut show_help = false;

    while let Some(argument) = iter.next() {
        let arg = argument.to_string_lossy();
        let arg_str = arg.as_ref();

        let (flag, inline) = match arg_str.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag, Some(value.to_owned())),
            _ => (arg_str, None),
        };

        let mut value = |name: &str| -> Result<String, String> {
            match inline.clone() {
                Some(value) => Ok(value),
                None => iter
                    .next()
                    .map(|v| v.to_string_lossy().into_owned())
                    .ok_or_else(|| format!("missing argument for `{name}`")),
            }
        };

        match flag {
            "-h" | "--help" => show_help = true,
            "-t" | "--threads" => {
                workload.threads = parse_number(&value("--threads")?, "--threads")?;
            }
            "-o" | "--output" => {
                if output.is_some() {
                    return Err(String::from("`--output` may only be provided once"));
                }
                output = Some(value("--output")?);
            }
            "--department" => workload.department = value("--department")?,
            "--salary-delta" => {
                workload.salary_delta = parse_number(&value("--salary-delta")?, "--salary-delta")?;
            }
            "--limit" => {
                workload.select_limit = parse_number(&value("--limit")?, "--limit")?;
            }
            _ => return Err(format!("unknown argument `{arg_str}`")),
        }
    }

    Ok(CliOptions {
        workload,
        output,
        show_help,
    })
}

fn parse_number<T: std::str::FromStr>(value: &str, flag: &str) -> Result<T, String> {
    value
        .parse::<T>()
        .map_err(|_| format!("invalid integer for `{flag}`: `{value}`"))
}

fn write_usage<W>(out: &mut W) -> io::Result<()>
where
    W: Write,
{
    writeln!(
        out,
        "Usage: mvtrace-runner [-t|--threads N] [-o|--output SPEC] [--department NAME]\n\
         \x20                     [--salary-delta N] [--limit N]\n\
         \n\
         Runs N concurrent sessions of\n\
         \x20 BEGIN; UPDATE employees SET salary = salary + DELTA WHERE department = NAME;\n\
         \x20 COMMIT; SELECT * FROM employees LIMIT N;\n\
         and writes one trace line per BEGIN/COMMIT/READ/WRITE to the output.\n\
         \n\
         SPEC: off | stdout | stderr | memory[:N] | <file path>\n\
         memory keeps the last N lines and prints them when the run ends.\n\
         Without --output, {ENV_OUTPUT}/{ENV_ENABLED} are honored, else stdout.\n\
         A JSON report is written to stderr; RUST_LOG controls diagnostics.\n",
    )
}
