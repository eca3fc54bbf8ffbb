use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Inspect and edit a monofs volume image.
#[derive(Parser)]
pub struct Cli {
    /// Backing image, created and formatted on first use
    #[arg(long, short)]
    pub image: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create/format the image and print the volume geometry
    Format,
    /// List a directory
    Ls {
        #[arg(default_value = "/")]
        path: String,
    },
    /// Create an empty regular file
    Touch { path: String },
    /// Copy a host file into the volume
    Put { source: PathBuf, path: String },
    /// Copy a file out of the volume
    Get { path: String, dest: PathBuf },
    /// Print a file's bytes to stdout
    Cat { path: String },
    /// Remove a file
    Rm { path: String },
    /// Remove an empty directory
    Rmdir { path: String },
    /// Move a file
    Mv { from: String, to: String },
    /// Print inode metadata and the blocks it owns
    Stat { path: String },
    /// Resize a file
    Truncate { path: String, size: usize },
}
