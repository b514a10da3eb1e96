use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use console::Emoji;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use podcatch::{
    Channel, Episode, NoopReporter, ProgressEvent, ProgressReporter, ProviderConfig, ReqwestClient,
    SharedProgressReporter, expand_url_shortcut, load_channel_if_exists, normalize_feed_url,
    resolve_feed_source, save_channel, strip_credentials,
};

// Emoji with fallback for terminals without Unicode support
static MICROPHONE: Emoji<'_, '_> = Emoji("🎙️  ", "");
static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "[~] ");
static HEADPHONES: Emoji<'_, '_> = Emoji("🎧 ", "[i] ");
static PROBE: Emoji<'_, '_> = Emoji("📡 ", "[?] ");
static NEW: Emoji<'_, '_> = Emoji("✨ ", "[+] ");
static PARTY: Emoji<'_, '_> = Emoji("🎉 ", "[*] ");
static FOLDER: Emoji<'_, '_> = Emoji("📁 ", "");

/// Discover new episodes of a SoundCloud user's tracks or favorites
#[derive(Parser, Debug)]
#[command(name = "podcatch")]
#[command(about = "Discover new episodes of SoundCloud feeds and keep them in a state file")]
#[command(version)]
struct Args {
    /// Feed URL, or a shortcut like sc:<user> or scfav:<user>
    feed: String,

    /// JSON file holding the channel state (created if missing)
    state_file: PathBuf,

    /// SoundCloud API consumer key
    #[arg(long, env = "PODCATCH_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Per-request timeout in seconds (0 disables the timeout)
    #[arg(short, long, default_value = "30")]
    timeout: u64,

    /// Quiet mode - suppress progress output
    #[arg(short, long)]
    quiet: bool,
}

/// Progress reporter using indicatif for terminal output
struct IndicatifReporter {
    multi: MultiProgress,
    main_bar: ProgressBar,
    probe_bar: Mutex<Option<ProgressBar>>,
}

impl IndicatifReporter {
    fn new() -> Self {
        let multi = MultiProgress::new();

        let main_style = ProgressStyle::default_bar()
            .template("{spinner:.green} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());

        let main_bar = multi.add(ProgressBar::new_spinner());
        main_bar.set_style(main_style);
        main_bar.enable_steady_tick(Duration::from_millis(100));

        Self {
            multi,
            main_bar,
            probe_bar: Mutex::new(None),
        }
    }

    fn probe_bar(&self, total: usize) -> ProgressBar {
        let mut slot = self.probe_bar.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(bar) = slot.as_ref() {
            return bar.clone();
        }

        let style = ProgressStyle::default_bar()
            .template(&format!("  {PROBE}[{{bar:30.cyan/blue}}] {{pos}}/{{len}} {{wide_msg}}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");

        let bar = self.multi.add(ProgressBar::new(total as u64));
        bar.set_style(style);
        *slot = Some(bar.clone());
        bar
    }

    fn finish_probe_bar(&self) {
        let mut slot = self.probe_bar.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(bar) = slot.take() {
            bar.finish_and_clear();
        }
    }
}

impl ProgressReporter for IndicatifReporter {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::FetchingListing { channel_url } => {
                self.main_bar
                    .set_message(format!("{SEARCH}Fetching tracks: {}", channel_url.cyan()));
            }

            ProgressEvent::ListingReceived {
                total_tracks,
                downloadable_tracks,
            } => {
                self.main_bar.set_message(format!(
                    "{HEADPHONES}{} tracks listed, {} downloadable",
                    total_tracks.to_string().cyan(),
                    downloadable_tracks.to_string().yellow()
                ));
            }

            ProgressEvent::ProbingTrack {
                index,
                total,
                title,
            } => {
                let bar = self.probe_bar(total);
                bar.set_position(index as u64);
                bar.set_message(truncate_title(&title, 40));
            }

            ProgressEvent::EpisodeDiscovered { title, .. } => {
                if let Some(bar) = self
                    .probe_bar
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .as_ref()
                {
                    bar.inc(1);
                }
                let _ = self
                    .multi
                    .println(format!("  {NEW}{}", truncate_title(&title, 60).green()));
            }

            ProgressEvent::SyncCompleted {
                new_count,
                seen_count,
            } => {
                self.finish_probe_bar();
                self.main_bar.finish_and_clear();
                println!(
                    "\n{PARTY}{} {} new, {} already known",
                    "Sync complete:".bold().green(),
                    new_count.to_string().green().bold(),
                    seen_count.saturating_sub(new_count).to_string().yellow(),
                );
            }
        }
    }
}

fn truncate_title(title: &str, max_len: usize) -> String {
    if title.chars().count() <= max_len {
        title.to_string()
    } else {
        let kept: String = title.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Summary line for a new episode; the media URL carries the API key and is left out
fn episode_line(episode: &Episode) -> String {
    format!(
        "  {} {} {}",
        episode.title.bold(),
        episode.filename.dimmed(),
        episode.link.cyan()
    )
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    if !args.quiet {
        println!(
            "\n{}{} {}\n",
            MICROPHONE,
            "podcatch".bold().magenta(),
            "- SoundCloud Feed Catcher".dimmed()
        );
    }

    let expanded = expand_url_shortcut(&args.feed);
    let url = normalize_feed_url(&expanded)
        .with_context(|| format!("Not a valid feed URL: {}", args.feed))?;

    let mut channel = match load_channel_if_exists(&args.state_file)
        .with_context(|| format!("Failed to load {}", args.state_file.display()))?
    {
        Some(channel) => {
            let requested = strip_credentials(&url);
            if channel.url != requested {
                bail!(
                    "{} belongs to {}, not {}",
                    args.state_file.display(),
                    channel.url,
                    requested
                );
            }
            channel
        }
        None => Channel::new(&url).context("Failed to read credentials from feed URL")?,
    };

    let timeout = (args.timeout > 0).then(|| Duration::from_secs(args.timeout));
    let config = ProviderConfig::new(args.api_key).with_timeout(timeout);
    let client = ReqwestClient::from_config(&config).context("Failed to create HTTP client")?;

    let source = resolve_feed_source(&channel.url, &client, &config)
        .with_context(|| format!("No provider handles {}", channel.url))?;

    channel.title = source.title();
    channel.link = source.link();
    channel.description = source.description();
    match source.image().await {
        Ok(image) => channel.image = image,
        Err(e) => warn!(error = %e, "Failed to fetch cover art, keeping previous image"),
    }

    let reporter: SharedProgressReporter = if args.quiet {
        NoopReporter::shared()
    } else {
        Arc::new(IndicatifReporter::new())
    };

    let outcome = source
        .new_episodes(&mut channel, &reporter)
        .await
        .context("Failed to sync channel")?;

    save_channel(&channel, &args.state_file).context("Failed to save channel state")?;

    if !args.quiet {
        for episode in &outcome.new_episodes {
            println!("{}", episode_line(episode));
        }
        println!(
            "\n{FOLDER}State: {}\n",
            args.state_file.display().to_string().cyan()
        );
    }

    Ok(())
}
