use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// Command line arguments for replmux
#[derive(Parser, Debug)]
#[command(
    name = "replmux",
    version = env!("CARGO_PKG_VERSION"),
    about = "Share one interpreter session between the console, serial ports and TCP clients",
    long_about = "Runs a single interactive interpreter session that reads input from the local console, any configured serial ports and every connected TCP client, and sends its output to all of them."
)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress logging
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the shared session
    Serve(ServeArgs),
    /// List serial ports
    Ports,
    /// Configuration management commands
    Config(ConfigArgs),
    /// Display version information
    Version,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output
    Json,
    /// Table output
    Table,
    /// CSV output
    Csv,
}

/// Session arguments; each one overrides the configuration file
#[derive(ClapArgs, Debug, Default)]
pub struct ServeArgs {
    /// TCP port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind the listener to
    #[arg(long)]
    pub bind: Option<String>,

    /// Serial port to attach (repeatable)
    #[arg(short, long = "serial")]
    pub serial: Vec<String>,

    /// Baud rate for serial ports given on the command line
    #[arg(short, long, default_value = "115200")]
    pub baud: u32,

    /// Do not attach stdin/stdout
    #[arg(long)]
    pub no_console: bool,

    /// Do not accept TCP connections
    #[arg(long)]
    pub no_listen: bool,

    /// Input queue capacity
    #[arg(long)]
    pub queue_capacity: Option<usize>,
}

/// Configuration management arguments
#[derive(ClapArgs, Debug)]
pub struct ConfigArgs {
    /// Configuration subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,
    /// Write an example project configuration
    Init {
        /// Directory to create `.replmux/config.toml` in
        #[arg(default_value = ".")]
        path: String,
    },
    /// Print configuration file locations
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_serve() {
        let args = Args::try_parse_from([
            "replmux", "serve", "--port", "2424", "-s", "/dev/ttyACM0", "-s", "/dev/ttyUSB1",
            "--no-console",
        ])
        .unwrap();

        match args.command {
            Command::Serve(serve) => {
                assert_eq!(serve.port, Some(2424));
                assert_eq!(serve.serial, vec!["/dev/ttyACM0", "/dev/ttyUSB1"]);
                assert_eq!(serve.baud, 115_200);
                assert!(serve.no_console);
                assert!(!serve.no_listen);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_config_init_default_path() {
        let args = Args::try_parse_from(["replmux", "config", "init"]).unwrap();
        match args.command {
            Command::Config(ConfigArgs { command: ConfigCommand::Init { path } }) => {
                assert_eq!(path, ".");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
