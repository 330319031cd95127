use anyhow::Result;
use clap::{Arg, ArgMatches, Command};
use quill_server::{PreviewServer, PreviewServerConfig};

use crate::config::QuillConfig;

pub fn make_subcommand() -> Command {
    Command::new("serve")
        .about("Start the preview server with live reload")
        .arg(
            Arg::new("content")
                .short('s')
                .long("content")
                .value_name("DIR")
                .help("Directory of pre-rendered pages"),
        )
        .arg(
            Arg::new("assets")
                .short('a')
                .long("assets")
                .value_name("DIR")
                .help("Static files served next to the pages"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file"),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Port to serve on")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .value_name("HOST")
                .help("Host to bind to"),
        )
        .arg(
            Arg::new("open")
                .long("open")
                .help("Open browser automatically")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-live-reload")
                .long("no-live-reload")
                .help("Do not reload pages when files change")
                .action(clap::ArgAction::SetTrue),
        )
}

pub async fn execute(args: &ArgMatches) -> Result<()> {
    let config = QuillConfig::load(args)?;

    let server_config = PreviewServerConfig {
        host: config.run.host.clone(),
        port: config.run.port,
        content: config.content_dir(),
        assets: config.assets_dir(),
        open: config.run.open,
        live_reload: config.run.live_reload,
        ignore: vec![".git".to_string(), ".tmp".to_string(), "~".to_string()],
    };

    PreviewServer::new(server_config, config.settings).run().await
}
