//! fixloop CLI entry point.

use clap::Parser;

use fixloop::cli::{commands, handle_error, Cli, Commands, GlobalOptions};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let global = GlobalOptions::from(&cli);

    let result = match cli.command {
        Commands::Run(args) => commands::run::execute(args, &global).await,
        Commands::Frameworks(args) => commands::frameworks::execute(args, &global).await,
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => handle_error(err, global.json),
    }
}
