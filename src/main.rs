// replmux - shared interpreter session over console, serial and TCP
use clap::Parser;
use replmux::cli::args::Args;
use replmux::cli::commands::execute_command;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Exit explicitly: a pending stdin read would otherwise hold the runtime open
    match execute_command(args).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
