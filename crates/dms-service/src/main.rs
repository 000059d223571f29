use clap::Parser;
use dms_service::cmd::{self, Cli};

fn main() -> anyhow::Result<()> {
    cmd::run(Cli::parse())
}
