use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use song_player_core::{
    parse_fragment, render, EntryHandle, LayoutMode, OfflineTransport, PlayerError,
    PlaylistController, PlaylistEntry, PlaylistFlags, PlaylistState, RenderOptions, Song,
    Transport, Viewport,
};
use tracing_subscriber::EnvFilter;

fn main() -> song_player_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render { song, layout, width, height, zoom, flash } => {
            run_render(&song, &layout, width, height, zoom, flash)
        }
        Commands::Playlist { file, shuffle, repeat_song, repeat_playlist, steps, seed } => {
            run_playlist(&file, shuffle, repeat_song, repeat_playlist, steps, seed)
        }
        Commands::Fragment { fragment } => run_fragment(&fragment),
    }
}

fn run_render(
    song_path: &PathBuf,
    layout: &str,
    width: f64,
    height: f64,
    zoom: bool,
    flash: bool,
) -> song_player_core::Result<()> {
    let mode = LayoutMode::from_id(layout)
        .ok_or(PlayerError::InvalidInput("unknown layout identifier"))?;
    let contents = std::fs::read_to_string(song_path)?;
    let song: Song = serde_json::from_str(&contents).map_err(|err| PlayerError::msg(err.to_string()))?;

    tracing::info!(layout, width, height, zoom, "rendering timeline scene");

    let scene = render(
        Some(&song),
        mode,
        Viewport::new(width, height),
        RenderOptions { zoom, mobile: false, flash_enabled: flash, piano_depth: 40.0 },
    );
    let json =
        serde_json::to_string_pretty(&scene).map_err(|err| PlayerError::msg(err.to_string()))?;
    println!("{json}");
    Ok(())
}

fn run_playlist(
    file: &PathBuf,
    shuffle: bool,
    repeat_song: bool,
    repeat_playlist: bool,
    steps: usize,
    seed: u64,
) -> song_player_core::Result<()> {
    let contents = std::fs::read_to_string(file)?;
    let raw: Vec<serde_json::Value> =
        serde_json::from_str(&contents).map_err(|err| PlayerError::msg(err.to_string()))?;

    let entries: Vec<PlaylistEntry> = raw
        .iter()
        .enumerate()
        .map(|(index, value)| {
            let song_data = value
                .get("song")
                .and_then(|song| song.as_str())
                .unwrap_or_default();
            let repetitions = value.get("repetitions").map(|reps| match reps.as_str() {
                Some(text) => text.to_string(),
                None => reps.to_string(),
            });
            PlaylistEntry::new(EntryHandle(index), song_data, repetitions.as_deref())
        })
        .collect();

    let mut state = PlaylistState::new(entries);
    state.flags = PlaylistFlags { repeat_song, shuffle, repeat_playlist };
    let mut controller = PlaylistController::new(state);
    let mut transport = OfflineTransport::new();
    let mut rng = SmallRng::seed_from_u64(seed);

    controller.select(0, &mut transport);
    transport.play();
    tracing::info!(entries = controller.state.len(), "simulating playlist");

    for step in 0..steps {
        let Some(advance) = controller.advance(&mut rng, &mut transport) else {
            println!("playlist is empty");
            return Ok(());
        };
        controller.select(advance.index, &mut transport);
        if advance.halt {
            println!("step {step}: selected entry {} and halted", advance.index);
            break;
        }
        transport.play();
        println!(
            "step {step}: playing entry {} ({})",
            advance.index,
            transport.loaded_data().unwrap_or("?"),
        );
    }
    Ok(())
}

fn run_fragment(fragment: &str) -> song_player_core::Result<()> {
    let request = parse_fragment(fragment);
    let json =
        serde_json::to_string_pretty(&request).map_err(|err| PlayerError::msg(err.to_string()))?;
    println!("{json}");
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Playlist song player demo tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a song's timeline scene to JSON.
    Render {
        /// Path to a JSON song description.
        song: PathBuf,
        /// Layout mode identifier (classic, top, boxbeep, piano, vertical,
        /// middle, shitbox4).
        #[arg(short, long, default_value = "classic")]
        layout: String,
        #[arg(long, default_value_t = 1280.0)]
        width: f64,
        #[arg(long, default_value_t = 720.0)]
        height: f64,
        /// Expand the timeline for horizontal scrolling.
        #[arg(long)]
        zoom: bool,
        /// Emit note-flash overlays.
        #[arg(long)]
        flash: bool,
    },
    /// Simulate playlist traversal from a JSON entry list.
    Playlist {
        /// Path to a JSON array of `{ "song": ..., "repetitions": ... }`.
        file: PathBuf,
        #[arg(long)]
        shuffle: bool,
        #[arg(long)]
        repeat_song: bool,
        #[arg(long)]
        repeat_playlist: bool,
        /// Number of song completions to simulate.
        #[arg(short, long, default_value_t = 10)]
        steps: usize,
        /// Seed for the shuffle decisions.
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
    /// Parse a URL fragment and print the resulting request.
    Fragment { fragment: String },
}
