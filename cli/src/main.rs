mod commands;
mod terminal;

use commands::{CommandLine, Commands, classify, discover, info};
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();
    let quiet = commands.quiet;

    logging::init(commands.verbose);
    print::banner(quiet);

    match commands.command {
        Commands::Info => {
            print::header("network information", quiet);
            info::info(quiet)
        }
        Commands::Discover(args) => {
            print::header("getting ready for discovery", quiet);
            discover::discover(args, quiet).await
        }
        Commands::Classify(args) => {
            print::header("classifier", quiet);
            classify::classify(args, quiet)
        }
    }
}
