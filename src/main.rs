use std::io::{self, Read};

use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "canto-phrase",
    version,
    about = "Cantonese readings (Jyutping and katakana) for Japanese or Cantonese phrases"
)]
struct Cli {
    /// Source language of the phrase: auto, ja or yue
    #[arg(short = 'L', long = "source-lang", default_value = "auto")]
    source_lang: String,

    /// Only annotate the phrase; no translation calls
    #[arg(long = "offline")]
    offline: bool,

    /// Run the HTTP server instead of reading stdin
    #[arg(long = "server")]
    server: bool,

    /// Server bind address (overrides [server] addr)
    #[arg(long = "addr")]
    addr: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    canto_phrase::logging::init(cli.verbose)?;

    if cli.server {
        let settings = canto_phrase::settings::load_settings(
            cli.read_settings.as_deref().map(std::path::Path::new),
        )?;
        let addr = cli.addr.unwrap_or_else(|| settings.server_addr.clone());
        return canto_phrase::server::run_server(settings, addr).await;
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;

    let output = canto_phrase::run(
        canto_phrase::Config {
            source_lang: cli.source_lang,
            offline: cli.offline,
            settings_path: cli.read_settings,
        },
        Some(buffer),
    )
    .await?;

    println!("{}", output);
    Ok(())
}
