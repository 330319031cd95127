//! Page rendering.
//!
//! A [`PageRenderer`] is built once at startup and holds everything shared by
//! all pages: settings, active features, the bootstrap assets, the static push
//! hints and the part processors. Each request then opens a [`RenderPass`],
//! which works on its own copy of the assets and push hints so nothing added
//! while rendering one page leaks into the next.

use std::time::Instant;

use chrono::{DateTime, Datelike, Local, TimeZone};

use crate::assets::AssetRegistry;
use crate::collab::{Anonymous, Features, PageIndex, Session};
use crate::config::{LogoPosition, Settings};
use crate::error::{ConfigError, RenderError};
use crate::nav::{Navigation, encode_component, render_username};
use crate::parts::{PartProcessor, PartProcessorRegistry, Parts, ProcessorCatalog};
use crate::push::{HeaderSink, PushHints, ResourceType, ResponseHead};
use crate::template::{
    BODY_TOKEN, MAIN_TEMPLATE, MINIMAL_TEMPLATE, PAGE_TEMPLATE, expand_body, fill_time_taken,
    substitute,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// What the current request is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// The page being looked at.
    pub page: String,
    pub action: String,
    /// The request URI, used to come back here after logging in.
    pub uri: String,
    /// Printable pages get a smaller logo.
    pub printable: bool,
}

impl Request {
    pub fn new(page: impl Into<String>, action: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            page: page.into(),
            action: action.into(),
            uri: uri.into(),
            printable: false,
        }
    }

    /// A plain `view` request for `page`.
    pub fn view(page: &str) -> Self {
        Self::new(
            page,
            "view",
            format!("?action=view&page={}", encode_component(page)),
        )
    }

    pub fn printable(mut self, printable: bool) -> Self {
        self.printable = printable;
        self
    }
}

#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub html: String,
    /// Number of preload hints sent, `None` if no `Link` header went out.
    pub push_count: Option<usize>,
}

#[derive(Debug)]
pub struct PageRenderer {
    settings: Settings,
    features: Features,
    assets: AssetRegistry,
    push: PushHints,
    processors: PartProcessorRegistry,
}

impl PageRenderer {
    /// Validates `settings` and registers the bootstrap assets and the
    /// configured push hints. No part processors are registered.
    pub fn new(settings: Settings) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self {
            features: Features::new(settings.features.iter().cloned()),
            assets: AssetRegistry::bootstrap(&settings),
            push: PushHints::from_static(&settings.http2_server_push_items),
            processors: PartProcessorRegistry::new(),
            settings,
        })
    }

    /// Like [`PageRenderer::new`], then registers every processor named in
    /// `settings.part_processors` from `catalog`, in order.
    pub fn with_catalog(settings: Settings, catalog: &ProcessorCatalog) -> Result<Self, ConfigError> {
        let mut renderer = Self::new(settings)?;
        for name in renderer.settings.part_processors.clone() {
            renderer.processors.register_named(&name, catalog)?;
        }
        Ok(renderer)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn features(&self) -> &Features {
        &self.features
    }

    pub fn register_processor(&mut self, processor: impl PartProcessor + 'static) {
        self.processors.register(processor);
    }

    /// Assets added here go out with every page.
    pub fn assets_mut(&mut self) -> &mut AssetRegistry {
        &mut self.assets
    }

    /// Hints added here go out with every page.
    pub fn push_mut(&mut self) -> &mut PushHints {
        &mut self.push
    }

    /// Starts rendering a page for one request.
    pub fn begin<'a>(
        &'a self,
        request: &'a Request,
        session: &'a dyn Session,
        pages: &'a dyn PageIndex,
    ) -> RenderPass<'a> {
        RenderPass {
            renderer: self,
            request,
            session,
            pages,
            assets: self.assets.clone(),
            push: self.push.clone(),
            started: Instant::now(),
        }
    }

    /// The page shown when a module was misconfigured. Never fails: if the
    /// settings cannot render a page at all, a bare document is returned.
    pub fn render_module_error(settings: &Settings, error: &ConfigError) -> String {
        let sitename = &settings.sitename;
        let email = html_escape::encode_safe(&settings.admin_details.email);
        let title = format!("{} - Module Error", sitename);
        let content = format!(
            "<p>{site} has got a misbehaving module installed ({error}). Please contact {site}'s administrator {name} at <a href='mailto:{email}'>{email}</a>.</p>",
            site = sitename,
            error = html_escape::encode_text(&error.to_string()),
            name = settings.admin_details.name,
            email = email,
        );

        let mut bare = settings.clone();
        bare.part_processors.clear();
        let rendered = PageRenderer::new(bare).and_then(|renderer| {
            let request = Request::view(&settings.default_page);
            let pages: Vec<String> = Vec::new();
            let mut head = ResponseHead::with_status(500);
            renderer
                .begin(&request, &Anonymous, &pages)
                .render_main(&title, &content, &mut head)
                .map_err(|RenderError::Config(e)| e)
        });

        match rendered {
            Ok(page) => page.html,
            Err(e) => {
                tracing::warn!("module error page fell back to bare HTML: {}", e);
                format!(
                    "<!DOCTYPE html>\n<html><head><meta charset='utf-8' /><title>{}</title></head><body>{}</body></html>",
                    title, content
                )
            }
        }
    }
}

/// Rendering state for a single request.
pub struct RenderPass<'a> {
    renderer: &'a PageRenderer,
    request: &'a Request,
    session: &'a dyn Session,
    pages: &'a dyn PageIndex,
    assets: AssetRegistry,
    push: PushHints,
    started: Instant,
}

impl<'a> RenderPass<'a> {
    /// Assets for this page only.
    pub fn assets_mut(&mut self) -> &mut AssetRegistry {
        &mut self.assets
    }

    /// Push hints for this page only.
    pub fn push_mut(&mut self) -> &mut PushHints {
        &mut self.push
    }

    pub fn render_main(
        self,
        title: &str,
        content: &str,
        head: &mut dyn HeaderSink,
    ) -> Result<RenderedPage, RenderError> {
        self.render(title, content, Some(MAIN_TEMPLATE), head)
    }

    pub fn render_minimal(
        self,
        title: &str,
        content: &str,
        head: &mut dyn HeaderSink,
    ) -> Result<RenderedPage, RenderError> {
        self.render(title, content, Some(MINIMAL_TEMPLATE), head)
    }

    /// Renders a complete HTML document. `body` defaults to the main body
    /// template. Unless the response is a redirect or its headers are
    /// already out, the preload `Link` header is written to `head`.
    pub fn render(
        mut self,
        title: &str,
        content: &str,
        body: Option<&str>,
        head: &mut dyn HeaderSink,
    ) -> Result<RenderedPage, RenderError> {
        let renderer = self.renderer;
        let settings = &renderer.settings;
        let features = &renderer.features;

        let sitename = sitename_html(settings, self.request.printable)?;

        if settings.favicon.starts_with('/') {
            self.push.add(ResourceType::Image, settings.favicon.clone());
        }

        let header_html = self.assets.header_html(settings, features, &mut self.push);
        let nav = Navigation::new(settings, features, self.session, self.request);

        let admins: Vec<String> = settings
            .admins
            .iter()
            .map(|name| render_username(settings, name))
            .collect();

        let mut parts = Parts::new();
        parts.insert(BODY_TOKEN, body.unwrap_or(MAIN_TEMPLATE));
        parts.insert("{sitename}", sitename);
        parts.insert("{version}", VERSION);
        parts.insert("{favicon-url}", settings.favicon.as_str());
        parts.insert("{header-html}", header_html);
        parts.insert(
            "{navigation-bar}",
            nav.render_bar(&settings.nav_links, &settings.nav_links_extra, "top"),
        );
        parts.insert(
            "{navigation-bar-bottom}",
            nav.render_bar(&settings.nav_links_bottom, &[], "bottom"),
        );
        parts.insert("{admin-details-name}", settings.admin_details.name.as_str());
        parts.insert("{admin-details-email}", settings.admin_details.email.as_str());
        parts.insert("{admins-name-list}", admins.join(", "));
        parts.insert("{generation-date}", format_generation_date(&Local::now()));
        parts.insert(
            "{all-pages-datalist}",
            all_pages_datalist(self.pages, settings.dynamic_page_suggestion_count),
        );
        parts.insert("{footer-message}", settings.footer_message.as_str());
        parts.insert("{content}", content);
        parts.insert("{extra}", "");
        parts.insert("{title}", title);

        renderer.processors.run_all(&mut parts);

        let page = match parts.remove(BODY_TOKEN) {
            Some(body) => expand_body(PAGE_TEMPLATE, &body),
            None => PAGE_TEMPLATE.to_string(),
        };
        let html = substitute(&page, &parts);

        let elapsed = self.started.elapsed().as_secs_f64() * 1000.0;
        let html = fill_time_taken(&html, elapsed);

        let push_count = if !head.headers_sent() && !head.is_redirect() {
            self.push.emit(settings.http2_server_push, head)
        } else {
            None
        };

        tracing::debug!(
            page = %self.request.page,
            elapsed_ms = elapsed,
            "rendered '{}'",
            title
        );

        Ok(RenderedPage { html, push_count })
    }
}

/// The site name with the logo, if there is one, on the configured side.
fn sitename_html(settings: &Settings, printable: bool) -> Result<String, ConfigError> {
    let position = settings.logo_position()?;
    if settings.logo_url.is_empty() {
        return Ok(settings.sitename.clone());
    }

    let class = if printable { "logo small" } else { "logo" };
    let logo = format!("<img class='{}' src='{}' />", class, settings.logo_url);
    Ok(match position {
        LogoPosition::Left => format!("{} {}", logo, settings.sitename),
        LogoPosition::Right => format!("{} {}", settings.sitename, logo),
    })
}

/// The `<datalist>` behind the search box.
///
/// Page names are sorted by plain byte order, so upper case names come
/// before lower case ones.
pub fn all_pages_datalist(pages: &dyn PageIndex, dynamic_suggestion_count: u32) -> String {
    let mut html = String::from("<datalist id='allpages'>\n");

    if dynamic_suggestion_count > 0 {
        html.push_str("<option value='Loading suggestions...' />");
    } else {
        let mut names = pages.page_names();
        names.sort();
        names.dedup();
        for name in &names {
            html.push_str(&format!(
                "\t\t\t<option value=\"{}\" />\n",
                html_escape::encode_double_quoted_attribute(name)
            ));
        }
    }

    html.push_str("\t\t</datalist>");
    html
}

/// e.g. `Saturday 17th of October 2026 at 09:05pm +00:00`. chrono has no
/// zone abbreviations for local time, so the zone name is the offset.
pub fn format_generation_date<Tz: TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let day = date.day();
    format!(
        "{} {}{} of {} at {}",
        date.format("%A"),
        day,
        ordinal_suffix(day),
        date.format("%B %Y"),
        date.format("%I:%M%P %Z")
    )
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}
