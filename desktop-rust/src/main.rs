mod app;
mod io;
mod model;

use app::{configure_fonts, DesktopApp};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let env = io::load_environment()?;
    let options = eframe::NativeOptions::default();
    eframe::run_native(
        "CAD Text Extractor",
        options,
        Box::new(move |cc| {
            configure_fonts(&cc.egui_ctx);
            Box::new(DesktopApp::new(env))
        }),
    )
    .map_err(|e| anyhow::anyhow!("起動に失敗: {e}"))
}
