use anyhow::Context;
use std::path::PathBuf;

#[derive(Debug, Default)]
struct CliArgs {
    config_dir: Option<PathBuf>,
    songs: Option<PathBuf>,
    playlist: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1).collect())?;

    let root = match args.config_dir {
        Some(dir) => dir,
        None => playbar::config::config_root()?,
    };
    let mut settings = playbar::config::load_settings_from(&playbar::config::settings_path(&root))?;
    if let Some(songs) = args.songs {
        settings.songs_dir = songs;
    }
    if let Some(playlist) = args.playlist {
        settings.playlist = playlist;
    }

    let log_path = settings.log_path(&root);
    playbar::logging::init(&log_path)
        .with_context(|| format!("failed to set up logging at {}", log_path.display()))?;
    log::info!(
        "starting with songs from {} and playlist {}",
        settings.songs_dir.display(),
        settings.playlist.display()
    );

    playbar::app::run(settings)
}

fn parse_args(args: Vec<String>) -> anyhow::Result<CliArgs> {
    let mut out = CliArgs::default();
    let mut index = 0;
    while index < args.len() {
        let flag = args[index].as_str();
        match flag {
            "--config-dir" | "--songs" | "--playlist" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("{flag} requires a path");
                };
                if value.trim().is_empty() {
                    anyhow::bail!("{flag} cannot be empty");
                }
                let value = PathBuf::from(value.trim());
                match flag {
                    "--config-dir" => out.config_dir = Some(value),
                    "--songs" => out.songs = Some(value),
                    _ => out.playlist = Some(value),
                }
            }
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other => anyhow::bail!("unknown argument {other}"),
        }
        index += 1;
    }
    Ok(out)
}

fn print_help() {
    println!("playbar");
    println!("  --config-dir DIR    Read settings.json from DIR");
    println!("  --songs DIR         Directory tracks are resolved against");
    println!("  --playlist FILE     Playlist to open at startup");
    println!();
    println!("Keys: space play/pause, n/b next/previous, left/right seek,");
    println!("      enter play row, 1-9/tab switch playlist, q quit");
}
