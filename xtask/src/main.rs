use anyhow::Context;
use clap::{Parser, Subcommand};
use fs_err as fs;
use std::path::Path;
use std::process::Command as ProcessCommand;

const FIXTURES_DIR: &str = "tests/fixtures";

#[derive(Debug, Parser)]
#[command(name = "xtask", about = "Workspace helper tasks")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print schema identifiers used by pvstate.
    PrintSchemas,
    /// Create a fixture directory with an input.pvsm skeleton.
    NewFixture {
        name: String,
        /// State version declared by the skeleton.
        #[arg(long, default_value = "4.0.1")]
        version: String,
    },
    /// Bless golden fixtures (overwrite expected outputs).
    BlessFixtures,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::PrintSchemas => {
            println!("{}", pvstate_types::schema::PVSTATE_REPORT_V1);
            println!("{}", pvstate_types::schema::SERVER_MANAGER_STATE);
        }
        Command::NewFixture { name, version } => {
            let dir = Path::new(FIXTURES_DIR).join(&name);
            if dir.exists() {
                anyhow::bail!("fixture {} already exists", dir.display());
            }
            fs::create_dir_all(&dir)?;
            fs::write(
                dir.join("input.pvsm"),
                format!(
                    "<?xml version=\"1.0\"?>\n<{tag} version=\"{version}\">\n</{tag}>\n",
                    tag = pvstate_types::schema::SERVER_MANAGER_STATE
                ),
            )?;
            println!(
                "created {}/input.pvsm; run `cargo xtask bless-fixtures` once it is filled in",
                dir.display()
            );
        }
        Command::BlessFixtures => {
            let status = ProcessCommand::new("cargo")
                .args(["test", "-p", "pvstate-core", "--test", "golden_fixtures"])
                .env("PVSTATE_BLESS", "1")
                .status()
                .context("run golden fixture blessing")?;
            if !status.success() {
                anyhow::bail!("bless-fixtures failed");
            }
        }
    }
    Ok(())
}
