//! Everything that ends up in the document `<head>`: extra header HTML, the
//! stylesheet and the scripts.

use std::sync::LazyLock;

use regex::Regex;

use crate::collab::Features;
use crate::config::Settings;
use crate::push::{PushHints, ResourceType};

/// Stylesheet used when `css = "auto"`.
pub const DEFAULT_CSS: &str = include_str!("../assets/default.css");

pub const MATH_RENDERING_URL: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/mathjax/2.7.1/MathJax.js?config=TeX-MML-AM_CHTML";

const MATH_RENDERING_CONFIG: &str = r#"<script type='text/x-mathjax-config'>
		MathJax.Hub.Config({
			tex2jax: {
				inlineMath: [ ['$','$'], ['\\(','\\)'] ],
				processEscapes: true,
				skipTags: ['script','noscript','style','textarea','pre','code']
			}
		});
	</script>"#;

/// Alt + Enter in the search box opens the result in a new tab.
pub const SEARCH_NEW_TAB_SNIPPET: &str = r#"// Alt + Enter support in the top search box
window.addEventListener("load", function(event) {
	document.querySelector("input[type=search]").addEventListener("keyup", function(event) {
		// Listen for Alt + Enter
		if(event.keyCode == 13 && event.altKey) {
			event.stopPropagation();
			event.preventDefault();
			event.cancelBubble = true;
			event.target.form.setAttribute("target", "_blank");
			event.target.form.submit();
			event.target.form.removeAttribute("target");
			return false; // Required by some browsers
		}
	});
});
"#;

static CSS_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^/]*//|^/").expect("valid regex"));
static CSS_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/\*[^*]*\*+(?:[^/*][^*]*\*+)*/").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static PUNCTUATION_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*([:;{}])\s*").expect("valid regex"));

/// Scripts and head HTML collected for a page.
#[derive(Debug, Clone, Default)]
pub struct AssetRegistry {
    extra_header_html: Vec<String>,
    script_snippets: Vec<String>,
    script_links: Vec<String>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The assets every page carries, registered once at startup.
    pub fn bootstrap(settings: &Settings) -> Self {
        let mut assets = Self::new();
        if settings.enable_math_rendering {
            assets.add_script_link(MATH_RENDERING_URL);
        }
        assets.add_script_snippet(SEARCH_NEW_TAB_SNIPPET);
        assets
    }

    pub fn add_script_link(&mut self, url: impl Into<String>) {
        self.script_links.push(url.into());
    }

    pub fn add_script_snippet(&mut self, code: impl Into<String>) {
        self.script_snippets.push(code.into());
    }

    pub fn add_header_html(&mut self, html: impl Into<String>) {
        self.extra_header_html.push(html.into());
    }

    pub fn script_links(&self) -> &[String] {
        &self.script_links
    }

    pub fn script_snippets(&self) -> &[String] {
        &self.script_snippets
    }

    /// Renders the contents of `<head>` after the fixed meta tags. Relative
    /// stylesheet and script paths are added to `push` on the way.
    pub fn header_html(
        &self,
        settings: &Settings,
        features: &Features,
        push: &mut PushHints,
    ) -> String {
        let mut html = self.extra_header_html.concat();
        html.push_str(&css_html(settings, push));
        html.push_str(&self.scripts_html(push));

        if features.is_active(Features::SEARCH) {
            html.push_str(&format!(
                "\t\t<link rel='search' type='application/opensearchdescription+xml' href='?action=opensearch-description' title='{} Search' />\n",
                settings.sitename
            ));
        }

        if settings.enable_math_rendering {
            html.push_str(MATH_RENDERING_CONFIG);
        }

        html
    }

    fn scripts_html(&self, push: &mut PushHints) -> String {
        let mut html = String::from("<!-- Javascript -->\n");
        for snippet in &self.script_snippets {
            html.push_str(&format!("<script defer>\n{}\n</script>\n", snippet));
        }
        for link in &self.script_links {
            if link.starts_with('/') {
                push.add(ResourceType::Script, link.clone());
            }
            html.push_str(&format!("<script src='{}' defer></script>\n", link));
        }
        html
    }
}

/// Whether the `css` setting points at a stylesheet rather than holding CSS.
pub fn is_css_url(css: &str) -> bool {
    CSS_URL.is_match(css)
}

pub fn css_html(settings: &Settings, push: &mut PushHints) -> String {
    if is_css_url(&settings.css) {
        if settings.css.starts_with('/') {
            push.add(ResourceType::Style, settings.css.clone());
        }
        return format!("<link rel='stylesheet' href='{}' />\n", settings.css);
    }

    let css = if settings.css == "auto" {
        DEFAULT_CSS
    } else {
        settings.css.as_str()
    };
    if settings.optimize_pages {
        format!("<style>{}</style>\n", minify_css(css))
    } else {
        format!("<style>{}</style>\n", css)
    }
}

/// Strips comments and any whitespace CSS does not need.
pub fn minify_css(css: &str) -> String {
    let css = CSS_COMMENT.replace_all(css, "");
    let css = WHITESPACE.replace_all(&css, " ");
    let css = PUNCTUATION_SPACE.replace_all(&css, "$1");
    css.trim().to_string()
}
