use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};

use crate::collab::{Features, Session};
use crate::config::Settings;
use crate::render::Request;

/// Characters left alone when a value is dropped into a URL.
const URL_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

pub(crate) fn encode_component(input: &str) -> String {
    utf8_percent_encode(input, URL_COMPONENT).to_string()
}

pub const NAV_DIVIDER: &str = "<span class='nav-divider inflexible'> | </span>";

/// Only the top level bar may open a "More..." submenu.
const MAX_MENU_DEPTH: usize = 1;

/// One item of a navigation bar.
///
/// In the settings file an entry is either a `[text, url]` pair, one of the
/// keywords `user-status`, `search`, `divider`, `menu`, or any other string,
/// which is taken to be a ready-made HTML fragment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "RawNavEntry", into = "RawNavEntry")]
pub enum NavEntry {
    /// `{page}` in the url is replaced with the current page name.
    Link { text: String, url: String },
    UserStatus,
    Search,
    Divider,
    Menu,
    Raw(String),
}

impl NavEntry {
    pub fn link(text: impl Into<String>, url: impl Into<String>) -> Self {
        NavEntry::Link {
            text: text.into(),
            url: url.into(),
        }
    }
}

#[derive(Deserialize, Serialize)]
#[serde(untagged)]
enum RawNavEntry {
    Pair(String, String),
    Word(String),
}

impl From<RawNavEntry> for NavEntry {
    fn from(raw: RawNavEntry) -> Self {
        match raw {
            RawNavEntry::Pair(text, url) => NavEntry::Link { text, url },
            RawNavEntry::Word(word) => match word.as_str() {
                "user-status" => NavEntry::UserStatus,
                "search" => NavEntry::Search,
                "divider" => NavEntry::Divider,
                "menu" => NavEntry::Menu,
                _ => NavEntry::Raw(word),
            },
        }
    }
}

impl From<NavEntry> for RawNavEntry {
    fn from(entry: NavEntry) -> Self {
        match entry {
            NavEntry::Link { text, url } => RawNavEntry::Pair(text, url),
            NavEntry::UserStatus => RawNavEntry::Word("user-status".into()),
            NavEntry::Search => RawNavEntry::Word("search".into()),
            NavEntry::Divider => RawNavEntry::Word("divider".into()),
            NavEntry::Menu => RawNavEntry::Word("menu".into()),
            NavEntry::Raw(html) => RawNavEntry::Word(html),
        }
    }
}

/// Renders navigation bars and usernames for one request.
pub struct Navigation<'a> {
    settings: &'a Settings,
    features: &'a Features,
    session: &'a dyn Session,
    request: &'a Request,
}

impl<'a> Navigation<'a> {
    pub fn new(
        settings: &'a Settings,
        features: &'a Features,
        session: &'a dyn Session,
        request: &'a Request,
    ) -> Self {
        Self {
            settings,
            features,
            session,
            request,
        }
    }

    /// Renders `entries` as a `<nav>` element. A `menu` entry opens a
    /// submenu holding `overflow`.
    pub fn render_bar(&self, entries: &[NavEntry], overflow: &[NavEntry], class: &str) -> String {
        self.render_bar_at(entries, overflow, class, 0)
    }

    fn render_bar_at(
        &self,
        entries: &[NavEntry],
        overflow: &[NavEntry],
        class: &str,
        depth: usize,
    ) -> String {
        let mut html = format!("<nav class='{}'>\n", class);

        for entry in entries {
            match entry {
                NavEntry::Link { text, url } => {
                    let href = url.replace("{page}", &encode_component(&self.request.page));
                    html.push_str(&format!("<span><a href='{}'>{}</a></span>", href, text));
                }
                NavEntry::UserStatus => html.push_str(&self.render_user_status()),
                NavEntry::Search => html.push_str(
                    "<span class='inflexible'><form method='get' action='index.php' style='display: inline;'><input type='search' name='page' list='allpages' placeholder='Type a page name here and hit enter' /><input type='hidden' name='search-redirect' value='true' /></form></span>",
                ),
                NavEntry::Divider => html.push_str(NAV_DIVIDER),
                NavEntry::Menu if depth >= MAX_MENU_DEPTH => {
                    tracing::warn!("ignoring nested menu entry in navigation bar '{}'", class);
                }
                NavEntry::Menu => {
                    html.push_str("<span class='inflexible nav-more'><label for='more-menu-toggler'>More...</label>\n<input type='checkbox' class='off-screen' id='more-menu-toggler' />");
                    html.push_str(&self.render_bar_at(overflow, &[], "nav-more-menu", depth + 1));
                    html.push_str("</span>");
                }
                NavEntry::Raw(fragment) => {
                    html.push_str(&format!("<span>{}</span>", fragment));
                }
            }
        }

        html.push_str("</nav>");
        html
    }

    fn render_user_status(&self) -> String {
        if !self.session.is_logged_in() {
            let returnto = if self.request.action == "logout" {
                format!(
                    "?action=view&page={}",
                    encode_component(&self.settings.default_page)
                )
            } else {
                self.request.uri.clone()
            };
            return format!(
                "<span class='not-logged-in'><a href='index.php?action=login&returnto={}'>Login</a></span>",
                encode_component(&returnto)
            );
        }

        let role = if self.session.is_admin() {
            "moderator"
        } else {
            "normal-user"
        };
        let mut html = format!("<span class='inflexible logged-in {}'>", role);
        if self.features.is_active(Features::USER_PREFERENCES) {
            html.push_str(&format!(
                "<a href='?action=user-preferences'>{}</a>",
                self.settings.user_preferences_button_text
            ));
        }
        html.push_str(&self.render_username(self.session.username()));
        html.push_str(" <small>(<a href='index.php?action=logout'>Logout</a>)</small>");
        html.push_str("</span>");
        html
    }

    pub fn render_username(&self, name: &str) -> String {
        render_username(self.settings, name)
    }
}

/// A link to the user's page with their avatar and, for admins, the admin
/// marker in front of the name.
pub fn render_username(settings: &Settings, name: &str) -> String {
    let mut html = format!(
        "<a href='?page={}'>",
        encode_component(&settings.user_page(name))
    );
    if settings.avatars_show {
        html.push_str(&format!(
            "<img class='avatar' src='?action=avatar&user={}&size={}' /> ",
            encode_component(name),
            settings.avatars_size
        ));
    }
    if settings.is_admin(name) {
        html.push_str(&settings.admin_display_char);
    }
    html.push_str(&html_escape::encode_safe(name));
    html.push_str("</a>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::{Anonymous, User};
    use pretty_assertions::assert_eq;

    fn request() -> Request {
        Request {
            page: "Main Page".into(),
            action: "view".into(),
            uri: "/?page=Main Page".into(),
            printable: false,
        }
    }

    #[test]
    fn test_anonymous_bar_keeps_entry_order() {
        let settings = Settings::default();
        let features = Features::default();
        let request = request();
        let nav = Navigation::new(&settings, &features, &Anonymous, &request);

        let html = nav.render_bar(
            &[NavEntry::UserStatus, NavEntry::Divider, NavEntry::Search],
            &[],
            "top",
        );

        assert!(html.starts_with("<nav class='top'>"));
        let login = html.find("action=login").unwrap();
        let divider = html.find(NAV_DIVIDER).unwrap();
        let search = html.find("type='search'").unwrap();
        assert!(login < divider && divider < search);
        assert_eq!(html.matches(NAV_DIVIDER).count(), 1);
    }

    #[test]
    fn test_login_returns_to_current_uri() {
        let settings = Settings::default();
        let features = Features::default();
        let request = request();
        let nav = Navigation::new(&settings, &features, &Anonymous, &request);

        let html = nav.render_bar(&[NavEntry::UserStatus], &[], "top");
        assert!(html.contains("returnto=%2F%3Fpage%3DMain%20Page'"));
    }

    #[test]
    fn test_login_after_logout_returns_to_default_page() {
        let settings = Settings::default();
        let features = Features::default();
        let request = Request {
            action: "logout".into(),
            ..request()
        };
        let nav = Navigation::new(&settings, &features, &Anonymous, &request);

        let html = nav.render_bar(&[NavEntry::UserStatus], &[], "top");
        assert!(!html.contains("logout"));
        assert!(html.contains(&encode_component("?action=view&page=Main%20Page")));
    }

    #[test]
    fn test_logged_in_status() {
        let settings = Settings {
            admins: vec!["alice".into()],
            avatars_show: false,
            ..Settings::default()
        };
        let features = Features::new([Features::USER_PREFERENCES]);
        let request = request();
        let user = User::new("alice", true);
        let nav = Navigation::new(&settings, &features, &user, &request);

        let html = nav.render_bar(&[NavEntry::UserStatus], &[], "top");
        assert!(html.contains("logged-in moderator"));
        assert!(html.contains("?action=user-preferences"));
        assert!(html.contains("<a href='?page=Users%2Falice'>&#9670; alice</a>"));
        assert!(html.contains("action=logout"));
    }

    #[test]
    fn test_preferences_link_needs_feature() {
        let settings = Settings::default();
        let features = Features::default();
        let request = request();
        let user = User::new("bob", false);
        let nav = Navigation::new(&settings, &features, &user, &request);

        let html = nav.render_bar(&[NavEntry::UserStatus], &[], "top");
        assert!(html.contains("logged-in normal-user"));
        assert!(!html.contains("user-preferences"));
    }

    #[test]
    fn test_link_substitutes_encoded_page() {
        let settings = Settings::default();
        let features = Features::default();
        let request = request();
        let nav = Navigation::new(&settings, &features, &Anonymous, &request);

        let html = nav.render_bar(&[NavEntry::link("Edit", "?action=edit&page={page}")], &[], "top");
        assert_eq!(
            html,
            "<nav class='top'>\n<span><a href='?action=edit&page=Main%20Page'>Edit</a></span></nav>"
        );
    }

    #[test]
    fn test_menu_renders_overflow_once() {
        let settings = Settings::default();
        let features = Features::default();
        let request = request();
        let nav = Navigation::new(&settings, &features, &Anonymous, &request);

        // The nested menu entry must not recurse again
        let overflow = [NavEntry::link("All Pages", "?action=list"), NavEntry::Menu];
        let html = nav.render_bar(&[NavEntry::Menu], &overflow, "top");

        assert!(html.contains("<nav class='nav-more-menu'>"));
        assert_eq!(html.matches("More...").count(), 1);
        assert!(html.contains("?action=list"));
    }

    #[test]
    fn test_raw_fragment_is_passed_through() {
        let settings = Settings::default();
        let features = Features::default();
        let request = request();
        let nav = Navigation::new(&settings, &features, &Anonymous, &request);

        let html = nav.render_bar(&[NavEntry::Raw("<b>beta</b>".into())], &[], "bottom");
        assert!(html.contains("<span><b>beta</b></span>"));
    }

    #[test]
    fn test_admin_username_with_avatar() {
        let settings = Settings {
            admins: vec!["alice".into()],
            avatars_show: true,
            avatars_size: 48,
            ..Settings::default()
        };

        let html = render_username(&settings, "alice");
        assert_eq!(
            html,
            "<a href='?page=Users%2Falice'><img class='avatar' src='?action=avatar&user=alice&size=48' /> &#9670; alice</a>"
        );
        let avatar = html.find("<img").unwrap();
        let marker = html.find("&#9670;").unwrap();
        let name = html.rfind("alice<").unwrap();
        assert!(avatar < marker && marker < name);
    }

    #[test]
    fn test_username_is_escaped() {
        let settings = Settings {
            avatars_show: false,
            ..Settings::default()
        };
        let html = render_username(&settings, "<eve>");
        assert!(html.contains("&lt;eve&gt;"));
        assert!(!html.contains("&#9670;"));
    }
}
