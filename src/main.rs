mod app;
mod config;
mod font;
mod grid;
mod labels;
mod launch;
mod paginate;
mod palette;
mod renderer;
mod scan;
mod session;
mod video;

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("sharingan=info"))
        .init();

    let cli_args = std::env::args().skip(1).collect::<Vec<_>>();
    let (initial_request, initial_status) = match launch::parse_launch_request_from_args(&cli_args)
    {
        Ok(request) => (request, None),
        Err(err) => {
            log::warn!("Ignoring launch args: {err}");
            (None, Some(format!("Launch args error: {err}")))
        }
    };

    let config = config::ViewerConfig::load(
        initial_request
            .as_ref()
            .and_then(|request| request.config_path.as_deref()),
    );
    let label_font = font::LabelFont::load(config.font_path.as_deref());

    let native_options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 820.0])
            .with_min_inner_size([640.0, 420.0])
            .with_decorations(false)
            .with_resizable(true),
        ..Default::default()
    };

    eframe::run_native(
        "Sharingan Viewer",
        native_options,
        Box::new(move |_cc| {
            Ok(Box::new(app::ViewerApp::new(
                config,
                label_font,
                initial_request,
                initial_status,
            )))
        }),
    )
}
