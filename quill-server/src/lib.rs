use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use quill_core::{ConfigError, PageRenderer, ProcessorCatalog, Settings};
use tokio::sync::broadcast;
use tower_http::services::ServeDir;

mod handlers;
pub mod live_reload;

/// Configuration for the preview server
#[derive(Debug, Clone)]
pub struct PreviewServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to serve on
    pub port: u16,
    /// Directory of pre-rendered `.html` pages
    pub content: PathBuf,
    /// Static files (stylesheets, scripts, images) served as-is
    pub assets: PathBuf,
    /// Auto-open browser
    pub open: bool,
    /// Reload open pages when content changes
    pub live_reload: bool,
    /// Patterns to ignore when watching
    pub ignore: Vec<String>,
}

impl Default for PreviewServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            content: PathBuf::from("./pages"),
            assets: PathBuf::from("./public"),
            open: false,
            live_reload: true,
            ignore: vec![],
        }
    }
}

/// The renderer, or the error page to show instead when a module is broken.
pub(crate) type RendererSlot = Result<PageRenderer, String>;

#[derive(Clone)]
pub struct AppState {
    pub(crate) renderer: Arc<RendererSlot>,
    pub(crate) content_root: PathBuf,
    pub(crate) reload_tx: broadcast::Sender<String>,
}

impl AppState {
    pub fn new(renderer: PageRenderer, content_root: PathBuf) -> Self {
        Self::from_slot(Ok(renderer), content_root)
    }

    /// Every page request is answered with `error_page` and a 500.
    pub fn broken(error_page: String, content_root: PathBuf) -> Self {
        Self::from_slot(Err(error_page), content_root)
    }

    fn from_slot(slot: RendererSlot, content_root: PathBuf) -> Self {
        let (reload_tx, _) = broadcast::channel::<String>(100);
        Self {
            renderer: Arc::new(slot),
            content_root,
            reload_tx,
        }
    }
}

/// Builds the renderer for `settings`. An unknown part processor does not
/// stop the server; it turns every page into the module error page.
pub fn build_state(settings: Settings, config: &PreviewServerConfig) -> Result<AppState> {
    let mut catalog = ProcessorCatalog::new();
    catalog.insert(live_reload::PROCESSOR_NAME, live_reload::inject_script);

    match PageRenderer::with_catalog(settings.clone(), &catalog) {
        Ok(mut renderer) => {
            let already_named = settings
                .part_processors
                .iter()
                .any(|name| name == live_reload::PROCESSOR_NAME);
            if config.live_reload && !already_named {
                renderer.register_processor(live_reload::inject_script);
            }
            Ok(AppState::new(renderer, config.content.clone()))
        }
        Err(err @ ConfigError::UnknownPartProcessor(_)) => {
            tracing::error!("{}", err);
            let page = PageRenderer::render_module_error(&settings, &err);
            Ok(AppState::broken(page, config.content.clone()))
        }
        Err(err) => Err(err).context("invalid site settings"),
    }
}

pub fn router(state: AppState, assets: PathBuf) -> Router {
    Router::new()
        .route("/", get(handlers::page))
        .route("/index.php", get(handlers::page))
        .route("/__livereload", get(live_reload::websocket_handler))
        .fallback_service(ServeDir::new(assets))
        .with_state(state)
}

/// Renders wiki pages from a content directory on request.
pub struct PreviewServer {
    config: PreviewServerConfig,
    settings: Settings,
}

impl PreviewServer {
    pub fn new(config: PreviewServerConfig, settings: Settings) -> Self {
        Self { config, settings }
    }

    pub async fn run(self) -> Result<()> {
        if !self.config.content.exists() {
            return Err(anyhow::anyhow!(
                "Content directory does not exist: {}",
                self.config.content.display()
            ));
        }

        let state = build_state(self.settings, &self.config)?;

        if self.config.live_reload {
            let reload_tx = state.reload_tx.clone();
            let mut watch_paths = vec![self.config.content.clone()];
            if self.config.assets.exists() {
                watch_paths.push(self.config.assets.clone());
            }
            let ignore_patterns = self.config.ignore.clone();

            tokio::spawn(async move {
                if let Err(e) =
                    live_reload::start_file_watcher(watch_paths, reload_tx, ignore_patterns).await
                {
                    tracing::error!("File watcher error: {}", e);
                }
            });
        }

        let app = router(state, self.config.assets.clone());

        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;

        tracing::info!("Serving at http://{}", addr);
        tracing::info!("Pages from: {}", self.config.content.display());

        if self.config.open {
            if let Err(e) = open::that(format!("http://{}", addr)) {
                tracing::warn!("Failed to open browser: {}", e);
            }
        }

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
