use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::nav::NavEntry;
use crate::push::PushHint;

/// Site-wide settings consulted on every render.
///
/// Anything not present in the TOML file falls back to the values in
/// [`Settings::default`].
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct Settings {
    pub sitename: String,
    pub logo_url: String,
    /// Either `left` or `right`, case sensitive.
    pub logo_position: String,
    pub favicon: String,
    pub admins: Vec<String>,
    /// Glyph shown in front of admin usernames.
    pub admin_display_char: String,
    pub admin_details: AdminDetails,
    pub footer_message: String,
    /// A stylesheet URL, a block of CSS, or `auto` for the built-in theme.
    pub css: String,
    pub optimize_pages: bool,
    pub avatars_show: bool,
    pub avatars_size: u32,
    pub enable_math_rendering: bool,
    pub http2_server_push: bool,
    /// Resources advertised on every page, as `[type, path]` pairs.
    pub http2_server_push_items: Vec<PushHint>,
    /// When positive, the page datalist is filled in client side.
    pub dynamic_page_suggestion_count: u32,
    pub nav_links: Vec<NavEntry>,
    /// Entries of the "More..." menu.
    pub nav_links_extra: Vec<NavEntry>,
    pub nav_links_bottom: Vec<NavEntry>,
    pub default_page: String,
    pub user_page_prefix: String,
    pub user_preferences_button_text: String,
    /// Optional features that are switched on, e.g. `search`.
    pub features: Vec<String>,
    /// Part processors to enable by name, in run order.
    pub part_processors: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sitename: "Quill".into(),
            logo_url: String::new(),
            logo_position: "left".into(),
            favicon: "/favicon.ico".into(),
            admins: vec!["admin".into()],
            admin_display_char: "&#9670; ".into(),
            admin_details: AdminDetails::default(),
            footer_message: "All content is under <a href='?page=License' target='_blank'>this license</a>. Please make sure that you read and understand the license, especially if you are thinking about copying some (or all) of this site's content, as it may restrict you from doing so.".into(),
            css: "auto".into(),
            optimize_pages: true,
            avatars_show: true,
            avatars_size: 32,
            enable_math_rendering: false,
            http2_server_push: true,
            http2_server_push_items: Vec::new(),
            dynamic_page_suggestion_count: 7,
            nav_links: vec![
                NavEntry::UserStatus,
                NavEntry::Search,
                NavEntry::Divider,
                NavEntry::link("Home", "?action=view&page=Main Page"),
                NavEntry::link("Edit", "?action=edit&page={page}"),
                NavEntry::Divider,
                NavEntry::Menu,
            ],
            nav_links_extra: vec![
                NavEntry::link("Printable", "?action=view&printable=yes&page={page}"),
                NavEntry::link("Recent Changes", "?action=recent-changes"),
                NavEntry::link("All Pages", "?action=list"),
            ],
            nav_links_bottom: vec![
                NavEntry::link("All Pages", "?action=list"),
                NavEntry::link("Recent Changes", "?action=recent-changes"),
                NavEntry::link("Credits", "?action=credits"),
            ],
            default_page: "Main Page".into(),
            user_page_prefix: "Users".into(),
            user_preferences_button_text: "&#9881; ".into(),
            features: Vec::new(),
            part_processors: Vec::new(),
        }
    }
}

impl Settings {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&data)?;

        Ok(settings)
    }

    /// Checks the values that would otherwise only blow up mid-render.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.logo_position()?;
        Ok(())
    }

    pub fn logo_position(&self) -> Result<LogoPosition, ConfigError> {
        self.logo_position.parse()
    }

    pub fn is_admin(&self, username: &str) -> bool {
        self.admins.iter().any(|admin| admin == username)
    }

    /// The wiki page belonging to a user.
    pub fn user_page(&self, username: &str) -> String {
        format!("{}/{}", self.user_page_prefix, username)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct AdminDetails {
    pub name: String,
    pub email: String,
}

impl Default for AdminDetails {
    fn default() -> Self {
        Self {
            name: "Administrator".into(),
            email: "admin@localhost".into(),
        }
    }
}

/// Where the logo goes relative to the site name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoPosition {
    Left,
    Right,
}

impl FromStr for LogoPosition {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(LogoPosition::Left),
            "right" => Ok(LogoPosition::Right),
            other => Err(ConfigError::InvalidLogoPosition(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::push::ResourceType;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.logo_position().unwrap(), LogoPosition::Left);
    }

    #[test]
    fn test_logo_position_is_case_sensitive() {
        assert!("Left".parse::<LogoPosition>().is_err());
        assert_eq!("right".parse::<LogoPosition>().unwrap(), LogoPosition::Right);
    }

    #[test]
    fn test_center_logo_fails_validation() {
        let settings = Settings {
            logo_position: "center".into(),
            ..Settings::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLogoPosition(ref p) if p == "center"));
    }

    #[test]
    fn test_parse_toml() {
        let settings: Settings = toml::from_str(
            r#"
            sitename = "Tea Wiki"
            admins = ["alice", "bob"]
            nav_links = ["user-status", "divider", ["Home", "?page=Home"], "<b>hi</b>"]
            http2_server_push_items = [["style", "/theme.css"]]

            [admin_details]
            name = "Alice"
            email = "alice@example.org"
            "#,
        )
        .unwrap();

        assert_eq!(settings.sitename, "Tea Wiki");
        assert!(settings.is_admin("bob"));
        assert!(!settings.is_admin("carol"));
        assert_eq!(settings.admin_details.email, "alice@example.org");
        assert_eq!(
            settings.nav_links,
            vec![
                NavEntry::UserStatus,
                NavEntry::Divider,
                NavEntry::link("Home", "?page=Home"),
                NavEntry::Raw("<b>hi</b>".into()),
            ]
        );
        assert_eq!(
            settings.http2_server_push_items,
            vec![PushHint::new(ResourceType::Style, "/theme.css")]
        );
        // Untouched fields keep their defaults
        assert_eq!(settings.default_page, "Main Page");
    }

    #[test]
    fn test_user_page() {
        let settings = Settings::default();
        assert_eq!(settings.user_page("alice"), "Users/alice");
    }
}
