use clap::{Parser, Subcommand};
use log::LevelFilter;
use serde::Serialize;
use tatix_ar::archive::{pack_dir, unpack_archive, CollectOptions};
use tatix_ar::selftest::self_test;
use tatix_ar::ArchiveReader;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "tatix-ar", about = "Pack a directory tree into a flat rootfs archive and back")]
struct Cli {
    /// Log debug output (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Archive every regular file under DIR_PATH
    Enc {
        dir_path:     PathBuf,
        archive_file: PathBuf,
        /// Follow symbolic links while walking the tree
        #[arg(short = 'L', long)]
        follow_links: bool,
    },
    /// Extract ARCHIVE_FILE into DIR_PATH
    Dec {
        archive_file: PathBuf,
        dir_path:     PathBuf,
    },
    /// Round-trip DIR_PATH through the archive format in memory
    Test {
        dir_path: PathBuf,
        #[arg(short = 'L', long)]
        follow_links: bool,
    },
    /// List archive contents
    List {
        archive_file: PathBuf,
        /// Emit a JSON array instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct ListedEntry<'a> {
    path:     &'a str,
    size:     u64,
    offset:   u64,
    checksum: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .format_timestamp(None)
        .init();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {

        // ── Enc ──────────────────────────────────────────────────────────────
        Commands::Enc { dir_path, archive_file, follow_links } => {
            let opts = CollectOptions { follow_links };
            pack_dir(&dir_path, &archive_file, &opts)?;
            println!(
                "Directory '{}' archived successfully to '{}'.",
                dir_path.display(),
                archive_file.display()
            );
        }

        // ── Dec ──────────────────────────────────────────────────────────────
        Commands::Dec { archive_file, dir_path } => {
            unpack_archive(&archive_file, &dir_path)?;
            println!(
                "Archive '{}' extracted successfully to '{}'.",
                archive_file.display(),
                dir_path.display()
            );
        }

        // ── Test ─────────────────────────────────────────────────────────────
        Commands::Test { dir_path, follow_links } => {
            let opts = CollectOptions { follow_links };
            self_test(&dir_path, &opts)?;
            println!("Archive test passed successfully!");
        }

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { archive_file, json } => {
            let buf = std::fs::read(&archive_file)?;
            let reader = ArchiveReader::new(&buf)?;
            let mut listed = Vec::with_capacity(reader.len());
            for entry in reader.entries() {
                let entry = entry?;
                listed.push(ListedEntry {
                    path:     entry.path,
                    size:     entry.size(),
                    offset:   entry.offset,
                    checksum: hex::encode(entry.checksum.to_be_bytes()),
                });
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&listed)?);
            } else {
                println!("Archive: {}", archive_file.display());
                println!("{:<40} {:>12} {:>12}  Checksum", "Path", "Size", "Offset");
                for e in &listed {
                    println!("{:<40} {:>12} {:>12}  {}", e.path, e.size, e.offset, e.checksum);
                }
                println!("{} file(s), {} bytes", listed.len(), reader.header().total_size);
            }
        }
    }

    Ok(())
}
