use crate::cli::args::{Args, Command, ConfigCommand, ServeArgs};
use crate::cli::output::{ConsoleWriter, OutputWriter, PortEntry};
use crate::core::session::{run_session, LineEcho, Session, SessionConfig, SessionEnd};
use crate::domain::config::{ReplMuxConfig, SerialPortConfig};
use crate::domain::error::ReplMuxResult;
use crate::infrastructure::config::ConfigManager;
use crate::infrastructure::console::ConsoleTransport;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::serial::{list_ports, SerialTransport};
use crate::infrastructure::tcp::Listener;
use std::path::Path;
use tracing::{info, warn};

/// Execute CLI command
pub async fn execute_command(args: Args) -> ReplMuxResult<()> {
    let writer = ConsoleWriter::new(args.output.clone());

    let config_manager = ConfigManager::new()?;
    let config = if let Some(config_path) = &args.config {
        config_manager.load_config_from_path(Path::new(config_path))?
    } else {
        config_manager.load_config()?
    };

    if !args.quiet {
        let level = if args.verbose { "debug" } else { config.global.log_level.as_str() };
        if let Err(e) = init_logging(level) {
            eprintln!("Warning: logging unavailable: {}", e);
        }
    }

    match args.command {
        Command::Serve(serve_args) => {
            let mut config = config;
            apply_serve_args(&mut config, &serve_args);
            let end = serve(config).await?;
            info!("Session ended: {:?}", end);
            Ok(())
        }
        Command::Ports => {
            let ports: Vec<PortEntry> = list_ports()?.iter().map(PortEntry::from).collect();
            writer.write_ports(&ports)?;
            Ok(())
        }
        Command::Config(config_args) => match config_args.command {
            ConfigCommand::Show => {
                writer.write_config(&config)?;
                Ok(())
            }
            ConfigCommand::Init { path } => {
                let written = config_manager.init_project_config(Path::new(&path))?;
                writer.write_message(&format!("Wrote {}", written.display()))?;
                Ok(())
            }
            ConfigCommand::Path => {
                writer.write_message(&format!(
                    "global: {}",
                    config_manager.get_global_config_path_ref().display()
                ))?;
                match config_manager.get_project_config_path() {
                    Some(path) => writer.write_message(&format!("project: {}", path.display()))?,
                    None => writer.write_message("project: none")?,
                }
                Ok(())
            }
        },
        Command::Version => {
            writer.write_message(&format!("replmux {}", env!("CARGO_PKG_VERSION")))?;
            Ok(())
        }
    }
}

/// Fold command line overrides into the loaded configuration.
pub fn apply_serve_args(config: &mut ReplMuxConfig, args: &ServeArgs) {
    if let Some(port) = args.port {
        config.listener.port = port;
    }
    if let Some(bind) = &args.bind {
        config.listener.host = bind.clone();
    }
    if args.no_listen {
        config.listener.enabled = false;
    }
    if args.no_console {
        config.console.enabled = false;
    }
    if let Some(capacity) = args.queue_capacity {
        config.global.queue_capacity = capacity;
    }
    for port in &args.serial {
        config.serial.push(SerialPortConfig::new(port.clone(), args.baud));
    }
}

/// Attach every configured transport and run the built-in interpreter until
/// it exits or the process is interrupted.
pub async fn serve(config: ReplMuxConfig) -> ReplMuxResult<SessionEnd> {
    config.validate()?;

    let (session, mut console) = Session::new(&SessionConfig::from(&config.global));

    let listener = if config.listener.enabled {
        Some(Listener::bind(&config.listener).await?.start(session.clone()))
    } else {
        None
    };

    for serial in &config.serial {
        let transport = SerialTransport::open(serial)?;
        session.attach(transport).await;
    }

    if config.console.enabled {
        session.attach(ConsoleTransport::stdio()).await;
    }

    if session.registry().is_empty().await && listener.is_none() {
        warn!("No transports attached; nothing can reach the session");
    }

    let mut interpreter = LineEcho::new(config.global.interrupt_char);
    let end = tokio::select! {
        end = run_session(&mut interpreter, &mut console) => end,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
            SessionEnd::InputClosed
        }
    };

    if let Some(listener) = listener {
        let accepted = listener.stop().await?;
        info!("Listener served {} connections", accepted);
    }
    session.shutdown().await;

    Ok(end)
}
