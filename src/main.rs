use clap::Parser;
use visearch::Opts;
use visearch::cli::SubCommandExtend;
use visearch::config::SubCommand;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let opts = Opts::parse();
    match &opts.subcmd {
        SubCommand::Add(cmd) => cmd.run(&opts).await,
        SubCommand::Search(cmd) => cmd.run(&opts).await,
        SubCommand::Show(cmd) => cmd.run(&opts).await,
        SubCommand::Server(cmd) => cmd.run(&opts).await,
        SubCommand::Export(cmd) => cmd.run(&opts).await,
    }
}
