use anyhow::{Context, Result, bail};
use clap::{Arg, ArgMatches, Command};
use quill_core::{
    Anonymous, ConfigError, ContentDir, PageRenderer, ProcessorCatalog, Request, ResponseHead,
    Session, User,
};
use quill_server::live_reload;

use crate::config::QuillConfig;

pub fn make_subcommand() -> Command {
    Command::new("render")
        .about("Render one page to stdout or a file")
        .arg(
            Arg::new("page")
                .long("page")
                .value_name("NAME")
                .help("Page to render, e.g. \"Main Page\" or \"Guides/Setup\"")
                .required(true),
        )
        .arg(
            Arg::new("printable")
                .long("printable")
                .help("Use the printable layout")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("user")
                .short('u')
                .long("user")
                .value_name("NAME")
                .help("Render as this logged in user"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Write the page here instead of stdout"),
        )
        .arg(
            Arg::new("content")
                .short('s')
                .long("content")
                .value_name("DIR")
                .help("Directory of pre-rendered pages"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file"),
        )
}

pub fn execute(args: &ArgMatches) -> Result<()> {
    let config = QuillConfig::load(args)?;
    let page = args
        .get_one::<String>("page")
        .context("--page is required")?;
    let printable = args.get_flag("printable");
    let output = args.get_one::<String>("output");

    let content = ContentDir::scan(config.content_dir())?;

    let mut catalog = ProcessorCatalog::new();
    catalog.insert(live_reload::PROCESSOR_NAME, live_reload::inject_script);

    let renderer = match PageRenderer::with_catalog(config.settings.clone(), &catalog) {
        Ok(renderer) => renderer,
        Err(err @ ConfigError::UnknownPartProcessor(_)) => {
            write_output(
                output,
                &PageRenderer::render_module_error(&config.settings, &err),
            )?;
            return Err(err.into());
        }
        Err(err) => return Err(err.into()),
    };

    let Some(html) = content.read_page(page)? else {
        bail!(
            "Page '{}' does not exist in {}",
            page,
            content.root().display()
        );
    };

    let user = args
        .get_one::<String>("user")
        .map(|name| User::new(name.as_str(), config.settings.is_admin(name)));
    let session: &dyn Session = match &user {
        Some(user) => user,
        None => &Anonymous,
    };

    let request = Request::view(page).printable(printable);
    let mut head = ResponseHead::default();
    let pass = renderer.begin(&request, session, &content);
    let rendered = if printable {
        pass.render_minimal(page, &html, &mut head)?
    } else {
        pass.render_main(page, &html, &mut head)?
    };

    if let Some(link) = head.header("Link") {
        tracing::info!("Link: {}", link);
    }
    write_output(output, &rendered.html)?;

    Ok(())
}

fn write_output(output: Option<&String>, html: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, html).with_context(|| format!("failed to write {}", path))?;
            tracing::info!("Page written to {}", path);
        }
        None => println!("{}", html),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("pages")).unwrap();
        std::fs::write(dir.path().join("pages/Main Page.html"), "<p>Hi</p>").unwrap();
        std::fs::write(
            dir.path().join("quill.toml"),
            "sitename = \"Tea\"\nadmins = [\"alice\"]\n",
        )
        .unwrap();
        dir
    }

    fn run(dir: &tempfile::TempDir, extra: &[&str]) -> (Result<()>, String) {
        let out = dir.path().join("out.html");
        let mut argv = vec![
            "render".to_string(),
            "--content".to_string(),
            dir.path().join("pages").display().to_string(),
            "--config".to_string(),
            dir.path().join("quill.toml").display().to_string(),
            "--output".to_string(),
            out.display().to_string(),
        ];
        argv.extend(extra.iter().map(|s| s.to_string()));

        let matches = make_subcommand().try_get_matches_from(argv).unwrap();
        let result = execute(&matches);
        let html = std::fs::read_to_string(&out).unwrap_or_default();
        (result, html)
    }

    #[test]
    fn test_render_page_to_file() {
        let dir = site();
        let (result, html) = run(&dir, &["--page", "Main Page", "--user", "alice"]);

        result.unwrap();
        assert!(html.contains("<p>Hi</p>"));
        assert!(html.contains("<title>Main Page</title>"));
        assert!(html.contains("logged-in moderator"));
    }

    #[test]
    fn test_render_printable() {
        let dir = site();
        let (result, html) = run(&dir, &["--page", "Main Page", "--printable"]);

        result.unwrap();
        assert!(html.contains("<main class='printable'><p>Hi</p></main>"));
    }

    #[test]
    fn test_render_missing_page() {
        let dir = site();
        let (result, html) = run(&dir, &["--page", "Nowhere"]);

        assert!(result.unwrap_err().to_string().contains("does not exist"));
        assert!(html.is_empty());
    }

    #[test]
    fn test_render_unknown_processor_writes_error_page() {
        let dir = site();
        std::fs::write(
            dir.path().join("quill.toml"),
            "sitename = \"Tea\"\npart_processors = [\"sparkles\"]\n",
        )
        .unwrap();
        let (result, html) = run(&dir, &["--page", "Main Page"]);

        assert!(result.is_err());
        assert!(html.contains("<title>Tea - Module Error</title>"));
    }
}
