//! Window Grouper: drag windows into a tabbed host, restore them on exit.
//!
//! Usage: `window-grouper [--config <path>]`

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::info;

use window_grouper::logging::init_logging;
use window_grouper::platform;
use window_grouper::GrouperConfig;

fn parse_args() -> Result<Option<PathBuf>> {
    let mut args = std::env::args().skip(1);
    let mut config = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = args.next().context("--config needs a path")?;
                config = Some(PathBuf::from(path));
            }
            other => bail!("Unknown argument: {}", other),
        }
    }
    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config_path = parse_args()?;
    let config = GrouperConfig::load(config_path.as_deref())?;
    init_logging(&config.log)?;

    info!("╔═══════════════════════════════════════════════════════════════╗");
    info!("║                 Window Grouper v{:<30}║", env!("CARGO_PKG_VERSION"));
    info!("║   Drop a window on the host to group it, close to restore     ║");
    info!("╚═══════════════════════════════════════════════════════════════╝");
    info!(
        "Platform: {} | layout: {:?} | tick: {:?}",
        platform::get_platform_name(),
        config.layout_mode,
        config.tick_interval()
    );

    if !platform::is_supported() {
        bail!(
            "Window capture is not supported on {}",
            platform::get_platform_name()
        );
    }
    run(&config).await
}

#[cfg(target_os = "windows")]
async fn run(config: &GrouperConfig) -> Result<()> {
    use tracing::{error, warn};
    use window_grouper::host::win32::Win32Shell;
    use window_grouper::Engine;

    let system = platform::create_window_system()?;
    let shell = Win32Shell::create(config).context("Failed to create host window")?;
    let mut engine = Engine::new(system, shell, config);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Ctrl-C handler failed: {}", e);
            std::future::pending::<()>().await;
        }
    };
    let report = engine.run(shutdown).await;

    if report.failed > 0 {
        warn!("{} window(s) could not be restored", report.failed);
    }
    info!("Window Grouper stopped ({} restored)", report.restored);
    Ok(())
}

#[cfg(not(target_os = "windows"))]
async fn run(_config: &GrouperConfig) -> Result<()> {
    Ok(())
}
