mod cli;

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::sync::Arc;

use clap::Parser;
use monofs::{FileKind, Storage};
use monofs::{BLOCK_SIZE, INODE_COUNT, TOTAL_BLOCKS};
use monofs_host::ImageFile;

use cli::{Cli, Command};

fn main() -> io::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let storage = Storage::open(Arc::new(ImageFile::open(&cli.image)?));

    match cli.command {
        Command::Format => {
            let (blocks_used, inodes_used) = storage.allocation_counts();
            println!("{TOTAL_BLOCKS} blocks x {BLOCK_SIZE} bytes, {INODE_COUNT} inodes");
            println!("{blocks_used} blocks and {inodes_used} inodes in use");
        }
        Command::Ls { path } => {
            for name in storage.list(&path).map_err(to_io)? {
                println!("{name}");
            }
        }
        Command::Touch { path } => {
            storage
                .mknod(&path, FileKind::Regular as u32 | 0o644)
                .map_err(to_io)?;
        }
        Command::Put { source, path } => {
            log::info!("copying {} into {path}", source.display());
            let mut data = Vec::new();
            File::open(&source)?.read_to_end(&mut data)?;

            if !storage.access(&path) {
                storage
                    .mknod(&path, FileKind::Regular as u32 | 0o644)
                    .map_err(to_io)?;
            }
            let written = storage.write(&path, &data, 0).map_err(to_io)?;
            if written < data.len() {
                return Err(io::Error::other(format!(
                    "volume full: only {written} of {} bytes copied",
                    data.len()
                )));
            }
            println!("{written} bytes copied");
        }
        Command::Get { path, dest } => {
            let data = slurp(&storage, &path)?;
            fs::write(&dest, &data)?;
            println!("{} bytes copied", data.len());
        }
        Command::Cat { path } => {
            io::stdout().write_all(&slurp(&storage, &path)?)?;
        }
        Command::Rm { path } => storage.unlink(&path).map_err(to_io)?,
        Command::Rmdir { path } => storage.rmdir(&path).map_err(to_io)?,
        Command::Mv { from, to } => storage.rename(&from, &to).map_err(to_io)?,
        Command::Stat { path } => {
            let st = storage.stat(&path).map_err(to_io)?;
            println!("inum: {}", st.ino);
            println!("mode: {:o}", st.mode);
            println!("links: {}", st.links);
            println!("size: {}", st.size);
            println!("blocks:");
            let node = storage.resolve(&path).map_err(to_io)?;
            for block in node.owned_blocks() {
                println!("  {block}");
            }
        }
        Command::Truncate { path, size } => storage.truncate(&path, size).map_err(to_io)?,
    }

    storage.sync();
    Ok(())
}

/// Whole-file read through the façade.
fn slurp(storage: &Storage, path: &str) -> io::Result<Vec<u8>> {
    let st = storage.stat(path).map_err(to_io)?;
    let mut data = vec![0u8; st.size as usize];
    let read = storage.read(path, &mut data, 0).map_err(to_io)?;
    data.truncate(read);
    Ok(data)
}

fn to_io(err: monofs::Error) -> io::Error {
    io::Error::other(format!("{err:?}"))
}
