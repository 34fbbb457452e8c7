mod config;
mod explain;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use clap::{Parser, Subcommand};
use config::ConfigMerger;
use fs_err as fs;
use pvstate_core::pipeline::{attach_input, attach_run};
use pvstate_core::{
    MigrationError, QueryScope, SessionLookup, StepChain, Version, migrate_text, sniff_version,
};
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "pvstate",
    version,
    about = "Forward-only migration of saved ParaView state files."
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Migrate a state file to the current schema.
    Migrate(MigrateArgs),
    /// Print the declared and effective version of a state file.
    Sniff(SniffArgs),
    /// List the migration steps in application order.
    ListSteps(ListStepsArgs),
    /// Explain what a migration step does and how to apply it by hand.
    Explain(ExplainArgs),
}

#[derive(Debug, Parser)]
struct MigrateArgs {
    /// State file to migrate (.pvsm).
    input: Utf8PathBuf,

    /// Write the migrated state here instead of stdout.
    #[arg(long)]
    out: Option<Utf8PathBuf>,

    /// Write a JSON migration report.
    #[arg(long)]
    report: Option<Utf8PathBuf>,

    /// Print a unified diff of input and output instead of the migrated state.
    #[arg(long, default_value_t = false)]
    diff: bool,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Debug, Parser)]
struct SniffArgs {
    /// State file to inspect.
    input: Utf8PathBuf,

    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Debug, clap::Args)]
struct CommonArgs {
    /// Config file (default: pvstate.toml next to the input).
    #[arg(long)]
    config: Option<Utf8PathBuf>,

    /// Run without a session; context-dependent edits fall back and warn.
    #[arg(long, default_value_t = false)]
    no_session: bool,

    /// Where per-proxy lookups search.
    #[arg(long, value_enum)]
    query_scope: Option<ScopeArg>,

    /// Oldest supported state version.
    #[arg(long)]
    floor: Option<Version>,
}

#[derive(Debug, Parser)]
struct ListStepsArgs {
    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Parser)]
struct ExplainArgs {
    /// Step key, transition label or target version (e.g., "pv.5_4_to_5_5", "5.4->5.5", "5.5").
    step: String,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum ScopeArg {
    Proxy,
    Document,
}

impl From<ScopeArg> for QueryScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Proxy => QueryScope::Proxy,
            ScopeArg::Document => QueryScope::Document,
        }
    }
}

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        error!("{:?}", e);
        eprintln!("error: {:#}", e);
        return ExitCode::from(exit_code_for(&e));
    }
    ExitCode::SUCCESS
}

fn exit_code_for(e: &anyhow::Error) -> u8 {
    e.downcast_ref::<MigrationError>()
        .and_then(|m| u8::try_from(m.exit_code()).ok())
        .unwrap_or(1)
}

fn real_main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Migrate(args) => cmd_migrate(args),
        Command::Sniff(args) => cmd_sniff(args),
        Command::ListSteps(args) => cmd_list_steps(args),
        Command::Explain(args) => cmd_explain(args),
    }
}

fn input_dir(input: &Utf8Path) -> &Utf8Path {
    match input.parent() {
        Some(dir) if !dir.as_str().is_empty() => dir,
        _ => Utf8Path::new("."),
    }
}

fn merged_config(input: &Utf8Path, common: &CommonArgs) -> anyhow::Result<config::MergedConfig> {
    let file_config = config::load_or_default(common.config.as_deref(), input_dir(input))
        .context("load pvstate.toml config")?;
    let merged = ConfigMerger::new(file_config).merge_migrate_args(
        common.query_scope.map(Into::into),
        common.floor,
        common.no_session,
    )?;
    debug!(
        "merged config: query_scope={}, floor={}, session={}",
        merged.settings.query_scope.as_str(),
        merged.settings.floor,
        merged.session.is_some()
    );
    Ok(merged)
}

fn cmd_migrate(args: MigrateArgs) -> anyhow::Result<()> {
    let merged = merged_config(&args.input, &args.common)?;
    let text =
        fs::read_to_string(&args.input).with_context(|| format!("read {}", args.input))?;

    let chain = StepChain::new();
    let session = merged.session.as_ref().map(|s| s as &dyn SessionLookup);
    let started = Utc::now();
    let (migrated, mut report) = migrate_text(&text, session, &merged.settings, &chain)?;
    let ended = Utc::now();

    for warning in &report.warnings {
        eprintln!("warning: {}", warning);
    }

    if let Some(out) = &args.out {
        fs::write(out, &migrated).with_context(|| format!("write {}", out))?;
        info!("wrote migrated state to {}", out);
    }
    if args.diff {
        print!("{}", diffy::create_patch(&text, &migrated));
    } else if args.out.is_none() {
        print!("{}", migrated);
    }

    if let Some(path) = &args.report {
        attach_input(&mut report, args.input.as_str(), text.as_bytes());
        attach_run(&mut report, started, ended);
        write_json(path, &report)?;
        info!("wrote report to {}", path);
    }
    Ok(())
}

fn cmd_sniff(args: SniffArgs) -> anyhow::Result<()> {
    let merged = merged_config(&args.input, &args.common)?;
    let text =
        fs::read_to_string(&args.input).with_context(|| format!("read {}", args.input))?;
    let host = pvstate_xml::parse_element(&text).map_err(MigrationError::Parse)?;
    let sniffed = sniff_version(&host, &merged.settings)?;

    let chain = StepChain::new();
    let pending: Vec<String> = chain
        .pending(sniffed.effective)
        .map(|s| s.meta().transition.to_string())
        .collect();

    if let Some(warning) = &sniffed.warning {
        eprintln!("warning: {}", warning);
    }

    match args.format {
        OutputFormat::Text => {
            println!(
                "declared:  {}",
                sniffed.declared.as_deref().unwrap_or("(none)")
            );
            println!("effective: {}", sniffed.effective);
            if pending.is_empty() {
                println!("pending:   (none, state is current)");
            } else {
                println!("pending:   {}", pending.join(", "));
            }
        }
        OutputFormat::Json => {
            let v = serde_json::json!({
                "declared": sniffed.declared,
                "effective": sniffed.effective,
                "pending": pending,
                "warning": sniffed.warning,
            });
            println!("{}", serde_json::to_string_pretty(&v)?);
        }
    }
    Ok(())
}

fn write_json<T: serde::Serialize>(path: &Utf8Path, v: &T) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(v).context("serialize json")?;
    fs::write(path, s).with_context(|| format!("write {}", path))?;
    Ok(())
}

fn cmd_explain(args: ExplainArgs) -> anyhow::Result<()> {
    use explain::{explanation, list_step_keys, lookup_step, reflow};

    let chain = StepChain::new();
    let Some(step) = lookup_step(&chain, &args.step) else {
        let available = list_step_keys(&chain).join(", ");
        anyhow::bail!(
            "Unknown step: '{}'\n\nAvailable steps: {}",
            args.step,
            available
        );
    };
    let meta = step.meta();

    println!("================================================================================");
    println!("STEP: {}", meta.title);
    println!("================================================================================");
    println!();
    println!("Key:         {}", meta.key);
    println!("Transition:  {}", meta.transition);
    println!(
        "Session:     {}",
        if meta.uses_session { "consulted" } else { "not used" }
    );
    println!();

    println!("DESCRIPTION");
    println!("--------------------------------------------------------------------------------");
    println!("{}", reflow(meta.description));
    println!();

    let Some(notes) = explanation(meta.key) else {
        return Ok(());
    };

    println!("TOUCHES");
    println!("--------------------------------------------------------------------------------");
    for target in notes.touches {
        println!("  - {}", target);
    }
    println!();

    if !notes.session_inputs.is_empty() {
        println!("SESSION INPUTS");
        println!("--------------------------------------------------------------------------------");
        for input in notes.session_inputs {
            println!("  - {}", input);
        }
        println!();
    }

    if !notes.warnings.is_empty() {
        println!("WARNINGS");
        println!("--------------------------------------------------------------------------------");
        for kind in notes.warnings {
            println!("  - {}", kind);
        }
        println!();
    }

    println!("MANUAL MIGRATION");
    println!("--------------------------------------------------------------------------------");
    println!("{}", notes.manual);
    println!();

    Ok(())
}

fn cmd_list_steps(args: ListStepsArgs) -> anyhow::Result<()> {
    let chain = StepChain::new();

    match args.format {
        OutputFormat::Text => {
            println!("Migration steps:\n");
            println!("  {:<16} {:<12} {:<8} TITLE", "KEY", "TRANSITION", "SESSION");
            println!("  {:<16} {:<12} {:<8} -----", "---", "----------", "-------");
            for meta in chain.metas() {
                println!(
                    "  {:<16} {:<12} {:<8} {}",
                    meta.key,
                    meta.transition.to_string(),
                    if meta.uses_session { "yes" } else { "no" },
                    meta.title
                );
            }
            println!();
            println!("Use 'pvstate explain <key>' for details.");
        }
        OutputFormat::Json => {
            let steps: Vec<_> = chain
                .metas()
                .iter()
                .map(|m| {
                    serde_json::json!({
                        "key": m.key,
                        "from": m.transition.from,
                        "to": m.transition.to,
                        "title": m.title,
                        "uses_session": m.uses_session,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&steps)?);
        }
    }
    Ok(())
}
