use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to a yaml config file. Created with defaults if missing.
    #[clap(short, long)]
    pub config: Option<PathBuf>,

    /// Don't use headless browser, scrape the served markup instead
    #[clap(long, default_value = "false")]
    pub no_headless: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the http service
    Serve {
        /// Address to listen on, overrides the config
        #[clap(short, long)]
        listen: Option<String>,
    },

    /// Print the link preview of a page
    Preview {
        /// a url
        url: String,
    },

    /// Print every usable image of a page
    Images {
        /// a url
        url: String,
    },

    /// Print where a url ends up after redirects
    OriginalUrl {
        /// a url
        url: String,
    },
}
