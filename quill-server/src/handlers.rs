use axum::{
    extract::{Query, State},
    http::{HeaderName, HeaderValue, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
};
use std::path::PathBuf;

use quill_core::{
    Anonymous, ContentDir, HeaderSink, PageRenderer, RenderError, Request, ResponseHead, ScanError,
};
use serde::Deserialize;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub(crate) struct PageQuery {
    page: Option<String>,
    action: Option<String>,
    printable: Option<String>,
}

/// GET `/?page=<name>`: renders `<content>/<name>.html` inside the site
/// templates.
pub(crate) async fn page(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
    uri: Uri,
) -> Response {
    let renderer = match state.renderer.as_ref() {
        Ok(renderer) => renderer,
        Err(error_page) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, Html(error_page.clone())).into_response();
        }
    };
    let settings = renderer.settings();

    let page = query.page.filter(|p| !p.is_empty());
    let (content, page_html) = match load_content(state.content_root.clone(), page.clone()).await {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::error!("failed to load content: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, e).into_response();
        }
    };

    let Some(page) = page else {
        let request = Request::view(&settings.default_page);
        let mut head = ResponseHead::with_status(StatusCode::SEE_OTHER.as_u16());
        head.set_header("Location", request.uri.clone());
        let body = format!(
            "<p>Redirecting to <a href='{0}'>{0}</a>.</p>",
            request.uri
        );
        let result = renderer
            .begin(&request, &Anonymous, &content)
            .render_main("Redirecting", &body, &mut head);
        return respond(renderer, head, result);
    };

    let printable = query.printable.is_some();
    let request = Request::new(
        page.as_str(),
        query.action.as_deref().unwrap_or("view"),
        uri.to_string(),
    )
    .printable(printable);

    let escaped = html_escape::encode_text(&page);
    let (status, title, body) = match page_html {
        Some(html) => (StatusCode::OK, escaped.to_string(), html),
        None => (
            StatusCode::NOT_FOUND,
            format!("{} - Not found", escaped),
            format!("<p>The page <em>{}</em> does not exist yet.</p>", escaped),
        ),
    };
    tracing::info!(status = status.as_u16(), "GET {}", uri);

    let mut head = ResponseHead::with_status(status.as_u16());
    let pass = renderer.begin(&request, &Anonymous, &content);
    let result = if printable {
        pass.render_minimal(&title, &body, &mut head)
    } else {
        pass.render_main(&title, &body, &mut head)
    };
    respond(renderer, head, result)
}

/// Scans the content directory and reads `page` off the async workers.
async fn load_content(
    root: PathBuf,
    page: Option<String>,
) -> Result<(ContentDir, Option<String>), String> {
    let loaded = tokio::task::spawn_blocking(move || -> Result<_, ScanError> {
        let content = ContentDir::scan(&root)?;
        let html = match &page {
            Some(page) => content.read_page(page)?,
            None => None,
        };
        Ok((content, html))
    })
    .await;

    match loaded {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(e) => Err(format!("content loader panicked: {}", e)),
    }
}

/// Turns a finished render into an HTTP response carrying the headers the
/// renderer wrote.
fn respond(
    renderer: &PageRenderer,
    head: ResponseHead,
    result: Result<quill_core::RenderedPage, RenderError>,
) -> Response {
    let page = match result {
        Ok(page) => page,
        Err(RenderError::Config(e)) => {
            tracing::error!("render failed: {}", e);
            let html = PageRenderer::render_module_error(renderer.settings(), &e);
            return (StatusCode::INTERNAL_SERVER_ERROR, Html(html)).into_response();
        }
    };

    let mut response = Html(page.html).into_response();
    *response.status_mut() =
        StatusCode::from_u16(head.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    for (name, value) in head.headers {
        match (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            (Ok(name), Ok(value)) => {
                response.headers_mut().insert(name, value);
            }
            _ => tracing::warn!("dropping invalid response header '{}'", name),
        }
    }
    response
}
