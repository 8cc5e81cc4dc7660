use anyhow::bail;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod app;
mod cli;
mod config;
mod metadata;
mod scrape;
#[cfg(test)]
mod tests;
mod web;
use app::{PreviewService, ScrapeSettings};
use config::{Config, RendererKind};
use metadata::{ImageList, OriginalUrl};

fn init_logging() {
    // stdout is left to command output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let args = cli::Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if args.no_headless {
        config.renderer = RendererKind::Plain;
    }

    let renderer = scrape::make_renderer(&config)?;
    log::debug!("using {} renderer", renderer.name());
    let service = PreviewService::new(renderer, ScrapeSettings::from(&config));

    match args.command {
        cli::Command::Serve { listen } => {
            let listen = listen.unwrap_or_else(|| config.listen.clone());
            let state = web::SharedState::new(service, config.max_sessions);
            web::start_daemon(state, &listen)
        }

        cli::Command::Preview { url } => {
            let Some(preview) = service.build_preview(&url) else {
                bail!("could not generate preview for {url}");
            };

            println!("{}", serde_json::to_string_pretty(&preview)?);
            Ok(())
        }

        cli::Command::Images { url } => {
            let images = service.all_images(&url)?;
            if images.is_empty() {
                bail!("no images found on {url}");
            }

            println!("{}", serde_json::to_string_pretty(&ImageList { images })?);
            Ok(())
        }

        cli::Command::OriginalUrl { url } => {
            let original = OriginalUrl {
                original_url: service.original_url(&url),
            };

            println!("{}", serde_json::to_string_pretty(&original)?);
            Ok(())
        }
    }
}
