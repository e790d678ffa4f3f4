use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use vigil::{EventMask, FnHandler, Notifier, Settings};

#[derive(Parser)]
#[command(name = "vigil")]
#[command(about = "Watch paths for filesystem events and print them")]
struct Cli {
    /// Path to a config file (defaults to ./vigil.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch one or more paths and print each event
    Watch {
        /// Paths to watch
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Event mask as hex (overrides watch.default_mask)
        #[arg(short, long)]
        mask: Option<String>,
    },

    /// Show the effective configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Settings::load().context("failed to load config")?,
    };

    vigil::logging::init_with_config(&settings.logging);

    match cli.command {
        Commands::Watch { paths, mask } => watch(&settings, paths, mask),
        Commands::Config => {
            let rendered = toml::to_string_pretty(&settings)?;
            print!("{rendered}");
            Ok(())
        }
    }
}

fn watch(settings: &Settings, paths: Vec<PathBuf>, mask: Option<String>) -> Result<()> {
    let bits = match mask {
        Some(raw) => u32::from_str_radix(raw.trim_start_matches("0x"), 16)
            .with_context(|| format!("invalid mask '{raw}'"))?,
        None => settings
            .default_mask_bits()
            .context("invalid watch.default_mask in config")?,
    };
    let mask = EventMask::from_raw(bits);

    let backend = vigil::InotifyBackend::new().context("failed to open inotify channel")?;
    let notifier = Notifier::builder()
        .backend(backend)
        .buffer_size(settings.watch.buffer_size)
        .overflow_handler(FnHandler::new("overflow", |_event| {
            eprintln!("kernel event queue overflowed, events were dropped");
            Ok(())
        }))
        .build()?;

    let printer: Arc<dyn vigil::EventHandler> = Arc::new(FnHandler::new("print", |event| {
        println!("{event}");
        Ok(())
    }));

    for path in &paths {
        notifier
            .add_watch(path, mask, vec![Arc::clone(&printer)])
            .with_context(|| format!("cannot watch {}", path.display()))?;
    }

    notifier.start()?;
    eprintln!("watching {} path(s), press Enter to stop", paths.len());

    let mut line = String::new();
    let _ = std::io::stdin().read_line(&mut line);

    notifier.request_stop();
    notifier.join();
    Ok(())
}
