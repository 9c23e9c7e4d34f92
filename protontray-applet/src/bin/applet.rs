use clap::Parser;
use protontray::applet::{Applet, AppletParts};
use protontray::config::{AppletConfig, StatusSource};
use protontray::constants::{APPLET_NAME, APPLET_VERSION, DEFAULT_ENV_PREFIX};
use protontray::instance::ensure_single_instance;
use protontray::servers::ServerDirectory;
use protontray::status::{CliStatusProbe, InterfaceStatusProbe, StatusProbe};
use protontray::utils::command::{CommandRunner, SystemCommandRunner};
use protontray::utils::expand_path;
use protontray::utils::tracing::log_subscriber;
use protontray::vpn::{CommandSet, VpnCommand};
use protontray::Result;
use protontray_applet::menu::MenuModel;
use protontray_applet::notifier::DesktopNotifier;
use protontray_applet::tray::{AppletTray, TrayHandle};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Command line arguments for the ProtonVPN tray applet.
#[derive(Parser)]
#[command(name = "protontray", version)]
pub struct Args {
    /// Path to the configuration file (default = ~/.config/protontray/config.toml, if present)
    #[arg(long)]
    pub config_path: Option<PathBuf>,
    /// Environment variable prefix for configuration overrides
    #[arg(long, default_value = DEFAULT_ENV_PREFIX)]
    pub env_prefix: String,
    /// Log level (trace, debug, info, warn, error), overrides the configuration file
    #[arg(long)]
    pub log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = AppletConfig::load(args.config_path.as_deref(), &args.env_prefix)?;

    let log_level = args.log_level.as_deref().unwrap_or(&config.log.level);
    tracing::subscriber::set_global_default(log_subscriber(log_level))?;

    info!("Starting {APPLET_NAME} {APPLET_VERSION}");

    if let Err(e) = ensure_single_instance() {
        error!("{e}");
        std::process::exit(1);
    }

    let servers = ServerDirectory::load_or_empty(&expand_path(&config.servers.file));
    let commands = CommandSet::from_config(&config.cli);
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemCommandRunner);

    let probe: Arc<dyn StatusProbe> = match config.status.source {
        StatusSource::Cli => Arc::new(CliStatusProbe::new(
            runner.clone(),
            commands.invocation(&VpnCommand::Status)?,
        )),
        StatusSource::Interface => Arc::new(InterfaceStatusProbe::new(
            config.status.tunnel_interface.clone(),
        )),
    };

    let (events_tx, events_rx) = mpsc::unbounded_channel();

    let tray = AppletTray::new(
        MenuModel::new(&servers),
        config.tray.clone(),
        events_tx.clone(),
    );
    let service = ksni::TrayService::new(tray);
    let tray_handle = TrayHandle::new(service.handle());
    let tray_view = TrayHandle::new(service.handle());
    service.spawn();

    let applet = Applet::new(
        AppletParts {
            runner,
            probe,
            commands,
            poll_interval: config.status.poll_interval(),
            notifier: Box::new(DesktopNotifier),
            view: Box::new(tray_view),
            notifications_enabled: config.notifications.enabled,
        },
        events_tx,
    );

    let result = applet.run(events_rx).await;
    tray_handle.shutdown();

    result
}
