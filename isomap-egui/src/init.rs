//! Starting the viewer application natively or in the browser.

use eframe::AppCreator;
use isomap::ViewerConfig;

use crate::app::IsomapApp;
use crate::runtime::Spawner;

/// Id of the canvas the application is drawn into in the browser.
#[cfg(target_arch = "wasm32")]
pub const CANVAS_ID: &str = "the_canvas_id";

/// Runs the viewer in a native window until it is closed.
#[cfg(not(target_arch = "wasm32"))]
pub fn run(config: ViewerConfig) -> anyhow::Result<()> {
    use tokio::runtime::Runtime;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let runtime = Runtime::new()?;
    let spawner = Spawner::new(runtime.handle().clone());
    std::thread::spawn(move || runtime.block_on(std::future::pending::<()>()));

    let title = config.title.clone();
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(&title)
            .with_inner_size([1280.0, 800.0]),
        ..Default::default()
    };

    eframe::run_native(&title, native_options, app_creator(config, spawner))
        .map_err(|err| anyhow::anyhow!("Failed to run the viewer: {err}"))
}

/// Starts the viewer in the page canvas with id [`CANVAS_ID`].
#[cfg(target_arch = "wasm32")]
pub fn run(config: ViewerConfig) -> anyhow::Result<()> {
    // Redirect `log` messages to the browser console.
    eframe::WebLogger::init(log::LevelFilter::Info).ok();

    wasm_bindgen_futures::spawn_local(async move {
        if let Err(err) = start_web(config).await {
            log::error!("Failed to start the viewer: {err}");
        }
    });

    Ok(())
}

#[cfg(target_arch = "wasm32")]
async fn start_web(config: ViewerConfig) -> anyhow::Result<()> {
    use eframe::wasm_bindgen::JsCast as _;

    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| anyhow::anyhow!("No document"))?;

    let canvas = document
        .get_element_by_id(CANVAS_ID)
        .ok_or_else(|| anyhow::anyhow!("Failed to find {CANVAS_ID}"))?
        .dyn_into::<web_sys::HtmlCanvasElement>()
        .map_err(|_| anyhow::anyhow!("{CANVAS_ID} is not a canvas"))?;

    let result = eframe::WebRunner::new()
        .start(
            canvas,
            eframe::WebOptions::default(),
            app_creator(config, Spawner::new()),
        )
        .await;

    if let Some(loading_text) = document.get_element_by_id("loading_text") {
        match &result {
            Ok(()) => loading_text.remove(),
            Err(_) => loading_text.set_inner_html(
                "<p> The app has crashed. See the developer console for details. </p>",
            ),
        }
    }

    result.map_err(|err| anyhow::anyhow!("Failed to start eframe: {err:?}"))
}

fn app_creator<'app>(config: ViewerConfig, spawner: Spawner) -> AppCreator<'app> {
    Box::new(move |cc: &eframe::CreationContext<'_>| {
        let app = IsomapApp::new(&cc.egui_ctx, config, spawner)?;
        Ok(Box::new(app))
    })
}
