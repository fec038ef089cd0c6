mod output;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use locker_core::{
    open_fs_locker, AuthenticationProvider, FileAuthProvider, FsLocker, LockerConfig,
    PrincipalId,
};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "locker")]
#[command(about = "Digital locker: per-user secure file storage")]
struct Cli {
    /// Directory holding the index, users and stored files
    #[arg(long, env = "LOCKER_DATA_DIR", global = true)]
    data_dir: Option<String>,

    /// Username to act as
    #[arg(long, short, env = "LOCKER_USER", global = true)]
    user: Option<String>,

    /// Password for --user
    #[arg(long, env = "LOCKER_PASSWORD", global = true, hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new user (password taken from --password)
    Register {
        /// Username to register
        username: String,
        /// Contact e-mail (optional)
        #[arg(long)]
        email: Option<String>,
    },
    /// Store a file; use `-` to read the content from stdin
    Store {
        /// Source file, or `-` for stdin
        path: PathBuf,
        /// Name to store the file under (defaults to the source file name)
        #[arg(long)]
        name: Option<String>,
    },
    /// Show details of a stored file
    Info {
        /// Stored file name
        name: String,
    },
    /// Write a stored file to stdout
    Cat {
        /// Stored file name
        name: String,
    },
    /// Copy a stored file into a directory
    Download {
        /// Stored file name
        name: String,
        /// Destination directory
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    /// List your files
    List,
    /// Delete a stored file
    Delete {
        /// Stored file name
        name: String,
    },
    /// Show registered users, stored files and storage location
    Status,
}

/// Entry point for the `locker` console.
///
/// # Environment Variables
/// - `LOCKER_DATA_DIR`: data directory (default: "locker_data")
/// - `LOCKER_USER` / `LOCKER_PASSWORD`: credentials used by file commands
/// - `RUST_LOG`: log filter; logs go to stderr
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("locker_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = LockerConfig::from_override(cli.data_dir.clone())?;
    let auth = FileAuthProvider::open(config.users_path())?;

    let Some(command) = cli.command.as_ref() else {
        println!("Use 'locker --help' for commands");
        return Ok(());
    };

    match command {
        Commands::Register { username, email } => {
            let password = cli
                .password
                .as_deref()
                .context("--password (or LOCKER_PASSWORD) is required to register")?;
            auth.register_with_email(username, password, email.as_deref())?;
            println!("Registration successful! You can now log in as {}.", username.trim());
        }
        Commands::Status => {
            let locker = open_fs_locker(&config)?;
            println!("Digital Locker");
            println!("Total registered users: {}", auth.user_count());
            println!("Total stored files: {}", locker.file_count());
            println!("Storage location: {}", config.blobs_dir().display());
        }
        Commands::Store { path, name } => {
            let owner = login(&auth, &cli)?;
            let locker = open_fs_locker(&config)?;
            let (logical_name, bytes) = read_source(path, name.as_deref())?;

            let record = locker.store(&owner, &logical_name, &bytes)?;
            println!(
                "Stored {} ({})",
                record.logical_name,
                output::format_file_size(record.size_bytes)
            );
        }
        Commands::Info { name } => {
            let owner = login(&auth, &cli)?;
            let locker = open_fs_locker(&config)?;
            show_info(&locker, &owner, name)?;
        }
        Commands::Cat { name } => {
            let owner = login(&auth, &cli)?;
            let locker = open_fs_locker(&config)?;
            let bytes = locker.read_bytes(&owner, name)?;

            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.flush()?;
        }
        Commands::Download { name, dir } => {
            let owner = login(&auth, &cli)?;
            let locker = open_fs_locker(&config)?;
            let target = download(&locker, &owner, name, dir)?;
            println!("File downloaded successfully to: {}", target.display());
        }
        Commands::List => {
            let owner = login(&auth, &cli)?;
            let locker = open_fs_locker(&config)?;
            let files = locker.list(&owner);

            if files.is_empty() {
                println!("No files found.");
            } else {
                print!("{}", output::file_table(&files));
            }
        }
        Commands::Delete { name } => {
            let owner = login(&auth, &cli)?;
            let locker = open_fs_locker(&config)?;
            locker.delete(&owner, name)?;
            println!("Deleted {}", name);
        }
    }

    Ok(())
}

fn login(auth: &FileAuthProvider, cli: &Cli) -> anyhow::Result<PrincipalId> {
    let user = cli
        .user
        .as_deref()
        .context("--user (or LOCKER_USER) is required")?;
    let password = cli
        .password
        .as_deref()
        .context("--password (or LOCKER_PASSWORD) is required")?;

    Ok(auth.authenticate(user, password)?)
}

/// Reads the upload content and picks the logical name for it.
fn read_source(path: &Path, name: Option<&str>) -> anyhow::Result<(String, Vec<u8>)> {
    if path == Path::new("-") {
        let Some(name) = name else {
            bail!("--name is required when reading from stdin");
        };
        let mut bytes = Vec::new();
        std::io::stdin()
            .read_to_end(&mut bytes)
            .context("failed to read stdin")?;
        return Ok((name.to_string(), bytes));
    }

    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read source file {}", path.display()))?;
    let logical_name = match name {
        Some(name) => name.to_string(),
        None => path
            .file_name()
            .and_then(|n| n.to_str())
            .context("source path has no usable file name; pass --name")?
            .to_string(),
    };

    Ok((logical_name, bytes))
}

fn show_info(locker: &FsLocker, owner: &str, name: &str) -> anyhow::Result<()> {
    let record = locker.retrieve(owner, name)?;
    print!("{}", output::file_details(&record));

    let integrity = match locker.verify(owner, name) {
        Ok(true) => "ok".to_string(),
        Ok(false) => "MISMATCH".to_string(),
        Err(e) => format!("unavailable ({e})"),
    };
    println!("Integrity: {integrity}");

    Ok(())
}

fn download(locker: &FsLocker, owner: &str, name: &str, dir: &Path) -> anyhow::Result<PathBuf> {
    let record = locker.retrieve(owner, name)?;
    let bytes = locker.read_bytes(owner, name)?;

    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let target = dir.join(record.logical_name.as_str());
    std::fs::write(&target, bytes)
        .with_context(|| format!("failed to write {}", target.display()))?;

    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn store_command_parses_name_and_global_credentials() {
        let cli = Cli::try_parse_from([
            "locker", "store", "notes.txt", "--name", "n.txt", "--user", "alice",
        ])
        .unwrap();

        assert_eq!(cli.user.as_deref(), Some("alice"));
        assert!(matches!(
            cli.command,
            Some(Commands::Store { ref name, .. }) if name.as_deref() == Some("n.txt")
        ));
    }

    #[test]
    fn read_source_defaults_to_file_name() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("report.pdf");
        std::fs::write(&source, b"%PDF").unwrap();

        let (name, bytes) = read_source(&source, None).unwrap();
        assert_eq!(name, "report.pdf");
        assert_eq!(bytes, b"%PDF");

        let (name, _) = read_source(&source, Some("renamed.pdf")).unwrap();
        assert_eq!(name, "renamed.pdf");
    }

    #[test]
    fn read_source_from_stdin_requires_name() {
        assert!(read_source(Path::new("-"), None).is_err());
    }

    #[test]
    fn download_writes_logical_name_into_directory() {
        let temp = TempDir::new().unwrap();
        let config = LockerConfig::new(temp.path().join("data")).unwrap();
        let locker = open_fs_locker(&config).unwrap();
        locker.store("alice", "notes.txt", b"hello").unwrap();

        let out_dir = temp.path().join("out");
        let target = download(&locker, "alice", "notes.txt", &out_dir).unwrap();

        assert_eq!(target, out_dir.join("notes.txt"));
        assert_eq!(std::fs::read(&target).unwrap(), b"hello");
    }
}
