//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;
use sonic_mirror::download::MIN_WORKERS;

const EXAMPLES: &str = "\
Examples:
  sonic-mirror music.server.local ~/Music
  sonic-mirror https://music.server.me ~/Music --netrc-file ~/.another-netrc
  sonic-mirror https://music.server.me:1234 ~/Music -F mp3 -b 320";

/// Mirror an OpenSubsonic music library into a local directory.
///
/// Songs already present under any extension are skipped, and every file is
/// named after the audio format its bytes contain.
#[derive(Parser)]
#[command(name = "sonic-mirror")]
#[command(author, version, about, after_help = EXAMPLES)]
#[command(disable_version_flag = true)]
pub struct Args {
    /// OpenSubsonic server: [http[s]://]host[:port]; port defaults to 80 for
    /// http, 443 for https, and 8080 when neither is given
    pub source: String,

    /// Destination directory (must already exist)
    pub destination: PathBuf,

    /// netrc file with login credentials [default: ~/.netrc]
    #[arg(long, value_name = "FILE")]
    pub netrc_file: Option<PathBuf>,

    /// Username for server login
    #[arg(short, long)]
    pub user: Option<String>,

    /// Password for server login; prefer a netrc file over passing it in plaintext
    #[arg(short, long)]
    pub password: Option<String>,

    /// Target bitrate for transcoded files in kbps; 0 means no limit
    #[arg(short, long, value_parser = clap::value_parser!(u32))]
    pub bitrate: Option<u32>,

    /// Audio format to request (navidrome supports mp3, flac, aac and raw)
    #[arg(short = 'F', long)]
    pub format: Option<String>,

    /// Override the extension of every file instead of inferring it
    #[arg(short, long, value_parser = parse_extension)]
    pub extension: Option<String>,

    /// Maximum parallel downloads [default: available parallelism]
    #[arg(short, long, value_name = "N", value_parser = parse_worker_count)]
    pub threads: Option<usize>,

    /// Download songs even if they are already in the destination
    #[arg(short, long)]
    pub force: bool,

    /// Logging detail: -V critical only, -VV errors, -VVV warnings,
    /// -VVVV info (default), -VVVVV debug, -VVVVVV trace
    #[arg(short = 'V', long, action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Don't show dynamic UI elements such as progress bars
    #[arg(long)]
    pub non_interactive: bool,

    /// Disable colored log output (also honors NO_COLOR and TERM=dumb)
    #[arg(long)]
    pub no_color: bool,

    /// Print version (`-V` is taken by --verbosity)
    #[arg(long, action = clap::ArgAction::Version)]
    #[allow(dead_code)]
    version: Option<bool>,
}

// Hand-written so the password never reaches logs.
impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("source", &self.source)
            .field("destination", &self.destination)
            .field("netrc_file", &self.netrc_file)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("bitrate", &self.bitrate)
            .field("format", &self.format)
            .field("extension", &self.extension)
            .field("threads", &self.threads)
            .field("force", &self.force)
            .field("verbosity", &self.verbosity)
            .field("non_interactive", &self.non_interactive)
            .field("no_color", &self.no_color)
            .finish_non_exhaustive()
    }
}

fn parse_worker_count(value: &str) -> Result<usize, String> {
    let count: usize = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid number of threads '{value}'"))?;
    if count >= MIN_WORKERS {
        Ok(count)
    } else {
        Err(format!("number of threads must be at least {MIN_WORKERS}"))
    }
}

fn parse_extension(value: &str) -> Result<String, String> {
    let extension = value.trim().trim_start_matches('.');
    if extension.is_empty() {
        return Err("extension must not be empty".to_string());
    }
    if extension.contains(['/', '\\']) {
        return Err(format!("extension '{value}' must not contain path separators"));
    }
    Ok(extension.to_string())
}
