//! stegofs - an encrypted virtual filesystem hidden inside PNG images.
//!
//! Operates on a "store" directory holding the posts of a Local backend;
//! the filesystem is located through a small pointer sidecar in the same
//! directory.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use stegofs::fs::{FilesystemState, FsMetadata, ROOT_INODE};
use stegofs::models::Directory;
use stegofs::ows::{LocalClient, Ows};

#[derive(Parser)]
#[command(name = "stegofs")]
#[command(author, version)]
#[command(
    about = "Encrypted virtual filesystem hidden inside PNG images",
    long_about = "Stores an encrypted filesystem as innocuous-looking PNG images. \
                  Every file, directory, and the inode table itself is sealed with \
                  AES-256-GCM and spread across image posts."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new filesystem in a store directory
    Init {
        /// Directory that will hold the image posts
        store_dir: PathBuf,
    },

    /// List directory contents
    Ls {
        /// Directory holding the image posts
        store_dir: PathBuf,

        /// Filesystem path to list (default: /)
        #[arg(default_value = "/")]
        path: String,
    },

    /// Create a directory
    Mkdir {
        /// Directory holding the image posts
        store_dir: PathBuf,

        /// Filesystem path for the new directory
        path: String,
    },

    /// Write a file, creating it if needed
    Write {
        /// Directory holding the image posts
        store_dir: PathBuf,

        /// Filesystem path for the file
        path: String,

        /// Input file to write (default: stdin)
        #[arg(long, conflicts_with = "data")]
        input: Option<PathBuf>,

        /// String data to write
        #[arg(long, conflicts_with = "input")]
        data: Option<String>,
    },

    /// Read a file
    Read {
        /// Directory holding the image posts
        store_dir: PathBuf,

        /// Filesystem path to read
        path: String,

        /// Output file (default: stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Delete a file
    Rm {
        /// Directory holding the image posts
        store_dir: PathBuf,

        /// Filesystem path to delete
        path: String,
    },

    /// Show filesystem status
    Info {
        /// Directory holding the image posts
        store_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Init { store_dir } => cmd_init(&store_dir).await,
        Commands::Ls { store_dir, path } => cmd_ls(&store_dir, &path).await,
        Commands::Mkdir { store_dir, path } => cmd_mkdir(&store_dir, &path).await,
        Commands::Write {
            store_dir,
            path,
            input,
            data,
        } => cmd_write(&store_dir, &path, input, data).await,
        Commands::Read {
            store_dir,
            path,
            output,
        } => cmd_read(&store_dir, &path, output).await,
        Commands::Rm { store_dir, path } => cmd_rm(&store_dir, &path).await,
        Commands::Info { store_dir } => cmd_info(&store_dir).await,
    }
}

fn prompt_password(prompt: &str) -> String {
    rpassword::prompt_password(prompt).unwrap_or_else(|_| {
        eprint!("{}", prompt);
        let _ = io::stderr().flush();
        let mut password = String::new();
        let _ = io::stdin().read_line(&mut password);
        password.trim().to_string()
    })
}

/// Open an existing filesystem through the pointer sidecar.
async fn mount(store_dir: &Path) -> anyhow::Result<FilesystemState> {
    let meta = FsMetadata::load(store_dir)?;
    if !meta.is_initialized() {
        bail!("no filesystem found in {}", store_dir.display());
    }

    let password = prompt_password("Password: ");

    let mut state = FilesystemState::new(password);
    state.add_client(Arc::new(LocalClient::new(store_dir)?));
    state
        .load_inode_table(meta.ows, Some(&meta.inode_table_ids))
        .await
        .context("could not load the filesystem (wrong password?)")?;

    Ok(state)
}

/// Record where the inode table now lives.
fn save_pointer(store_dir: &Path, state: &FilesystemState) -> anyhow::Result<()> {
    let posts = state.inode_table_posts();
    let ows = posts.first().map_or(Ows::Local, |post| post.ows);
    let ids = posts.iter().map(|post| post.id.clone()).collect();
    FsMetadata::new(ows, ids).save(store_dir)?;
    Ok(())
}

/// Walk a slash-separated path down from the root directory.
async fn resolve_dir(state: &FilesystemState, path: &str) -> anyhow::Result<Directory> {
    let mut dir = state.get_directory(ROOT_INODE).await?;
    for part in path.split('/').filter(|p| !p.is_empty()) {
        let inode = dir
            .inode_of(part)
            .with_context(|| format!("no such directory: {}", part))?;
        dir = state
            .get_directory(inode)
            .await
            .with_context(|| format!("{} is not a directory", part))?;
    }
    Ok(dir)
}

/// Split a path into its parent path and final component.
fn split_parent(path: &str) -> anyhow::Result<(&str, &str)> {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((parent, name)) if !name.is_empty() => Ok((parent, name)),
        _ if !trimmed.is_empty() => Ok(("", trimmed)),
        _ => bail!("invalid path: {}", path),
    }
}

async fn cmd_init(store_dir: &Path) -> anyhow::Result<()> {
    let meta = FsMetadata::load(store_dir)?;
    if meta.is_initialized() {
        bail!("a filesystem already exists in {}", store_dir.display());
    }

    let password = prompt_password("Enter password: ");
    let confirm = prompt_password("Confirm password: ");
    if password != confirm {
        bail!("passwords do not match");
    }

    let mut state = FilesystemState::new(password);
    state.add_client(Arc::new(LocalClient::new(store_dir)?));
    state.create(Ows::Local).await?;
    save_pointer(store_dir, &state)?;

    println!("Filesystem initialized in {}", store_dir.display());
    println!(
        "  Inode table posts: {}",
        state.inode_table_posts().len()
    );
    Ok(())
}

async fn cmd_ls(store_dir: &Path, path: &str) -> anyhow::Result<()> {
    let state = mount(store_dir).await?;
    let dir = resolve_dir(&state, path).await?;

    if dir.is_empty() {
        println!("(empty)");
        return Ok(());
    }

    for (name, inode) in dir.entries() {
        let entry = state.entry(*inode)?;
        let type_char = if entry.is_directory { 'd' } else { '-' };
        let size = if entry.is_directory {
            "-".to_string()
        } else {
            entry.size.to_string()
        };
        println!("{} {:>10}  {}", type_char, size, name);
    }
    Ok(())
}

async fn cmd_mkdir(store_dir: &Path, path: &str) -> anyhow::Result<()> {
    let mut state = mount(store_dir).await?;

    let (parent_path, name) = split_parent(path)?;
    let mut parent = resolve_dir(&state, parent_path).await?;

    state.create_directory(&mut parent, name, Ows::Local).await?;
    save_pointer(store_dir, &state)?;

    println!("Created directory {}", path);
    Ok(())
}

async fn cmd_write(
    store_dir: &Path,
    path: &str,
    input: Option<PathBuf>,
    data: Option<String>,
) -> anyhow::Result<()> {
    let content = match (input, data) {
        (Some(file), None) => std::fs::read(&file)?,
        (None, Some(s)) => s.into_bytes(),
        (None, None) => {
            let mut buffer = Vec::new();
            io::stdin().read_to_end(&mut buffer)?;
            buffer
        }
        (Some(_), Some(_)) => unreachable!(),
    };

    let mut state = mount(store_dir).await?;
    let (parent_path, name) = split_parent(path)?;
    let mut parent = resolve_dir(&state, parent_path).await?;

    match parent.inode_of(name) {
        Ok(inode) => state.update_file(inode, Ows::Local, &content).await?,
        Err(_) => {
            state
                .create_file(&mut parent, name, Ows::Local, &content)
                .await?;
        }
    }
    save_pointer(store_dir, &state)?;

    println!("Wrote {} bytes to {}", content.len(), path);
    Ok(())
}

async fn cmd_read(store_dir: &Path, path: &str, output: Option<PathBuf>) -> anyhow::Result<()> {
    let state = mount(store_dir).await?;

    let (parent_path, name) = split_parent(path)?;
    let parent = resolve_dir(&state, parent_path).await?;
    let inode = parent.inode_of(name)?;
    let data = state.get_file(inode).await?;

    match output {
        Some(file) => {
            std::fs::write(&file, &data)?;
            println!("Wrote {} bytes to {}", data.len(), file.display());
        }
        None => io::stdout().write_all(&data)?,
    }
    Ok(())
}

async fn cmd_rm(store_dir: &Path, path: &str) -> anyhow::Result<()> {
    let mut state = mount(store_dir).await?;

    let (parent_path, name) = split_parent(path)?;
    let mut parent = resolve_dir(&state, parent_path).await?;

    state.remove_file(&mut parent, name).await?;
    save_pointer(store_dir, &state)?;

    println!("Deleted {}", path);
    Ok(())
}

async fn cmd_info(store_dir: &Path) -> anyhow::Result<()> {
    let state = mount(store_dir).await?;
    let table = state.inode_table();

    let mut files = 0u64;
    let mut dirs = 0u64;
    let mut total_size = 0u64;
    let mut total_posts = 0usize;
    for (_, entry) in table.iter() {
        if entry.is_directory {
            dirs += 1;
        } else {
            files += 1;
            total_size += entry.size;
        }
        total_posts += entry.posts.len();
    }

    println!("stegofs information");
    println!("===================");
    println!("Store directory:   {}", store_dir.display());
    println!("Inode table posts: {}", state.inode_table_posts().len());
    println!();
    println!("Contents:");
    println!("  Directories:     {}", dirs);
    println!("  Files:           {}", files);
    println!("  Total file size: {} bytes", total_size);
    println!("  Entry posts:     {}", total_posts);
    Ok(())
}
