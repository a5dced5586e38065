use clap::Parser;
use cmd::{context::Ctx, pull::Pull};

mod cmd;

#[derive(Parser, Debug)]
struct Args {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Parser, Debug)]
enum Commands {
    Pull(Pull),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let ctx = Ctx::init()?;
    let args = Args::parse();

    match args.command {
        Commands::Pull(cmd) => cmd.run(&ctx).await?,
    }
    Ok(())
}
