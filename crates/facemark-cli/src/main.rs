use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod config;
mod engine;
mod store;

use engine::RecognizeOutcome;

#[derive(Parser)]
#[command(name = "facemark", about = "Facemark attendance CLI — enroll, recognize, records")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll a person from a face image
    Enroll {
        /// Display name for the person
        #[arg(short, long)]
        name: String,
        /// Path to the image file
        #[arg(short, long)]
        image: PathBuf,
    },
    /// Recognize a face image and record today's attendance
    Recognize {
        /// Path to the image file
        #[arg(short, long)]
        image: PathBuf,
    },
    /// List enrolled people
    List,
    /// Remove an enrollment by ID
    Remove {
        /// Enrollment ID to remove
        id: String,
    },
    /// Show recorded attendance, newest day first
    Records,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config::Config::from_env();
    let mut engine = engine::Engine::open(&config)?;

    match cli.command {
        Commands::Enroll { name, image } => {
            let bytes = std::fs::read(&image)
                .with_context(|| format!("reading image {}", image.display()))?;
            let record = engine.enroll(&name, &bytes)?;
            println!("enrolled {} with id {}", record.name, record.id);
        }
        Commands::Recognize { image } => {
            let bytes = std::fs::read(&image)
                .with_context(|| format!("reading image {}", image.display()))?;
            match engine.recognize(&bytes)? {
                RecognizeOutcome::Recognized {
                    id,
                    name,
                    score,
                    new_attendance,
                } => {
                    if new_attendance {
                        println!("recognized {name} ({id}), score {score:.3} — attendance recorded");
                    } else {
                        println!(
                            "recognized {name} ({id}), score {score:.3} — already recorded today"
                        );
                    }
                }
                RecognizeOutcome::NoMatch { closest, skipped } => match closest {
                    Some((id, score)) => {
                        let name = engine.name_of(&id).unwrap_or("?");
                        println!("no match (closest: {name} at {score:.3}, {skipped} skipped)");
                    }
                    None => println!("no match (no comparable enrollments)"),
                },
            }
        }
        Commands::List => {
            if engine.enrollments().is_empty() {
                println!("no enrollments");
            }
            for record in engine.enrollments() {
                println!(
                    "{}  {}  enrolled {}",
                    record.id,
                    record.name,
                    record.enrolled_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
        Commands::Remove { id } => {
            if engine.remove(&id)? {
                println!("removed {id}");
            } else {
                println!("no enrollment with id {id}");
            }
        }
        Commands::Records => {
            if engine.attendance_days().is_empty() {
                println!("no attendance recorded");
            }
            for (day, entries) in engine.attendance_days().iter().rev() {
                for entry in entries {
                    let name = engine.name_of(&entry.id).unwrap_or("?");
                    println!("{day}  {}  {name}  ({})", entry.time, entry.id);
                }
            }
        }
    }

    Ok(())
}
