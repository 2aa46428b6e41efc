use clap::{Parser, Subcommand};
use qcv::{scan_segments, Archive, Buffer, SIGNATURE};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Component, Path, PathBuf};

#[derive(Parser)]
#[command(name = "qcv", about = "The .qcv archive container CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack one or more files into a new .qcv archive
    Pack {
        #[arg(short, long)]
        output: PathBuf,
        /// Archive comment
        #[arg(short, long)]
        comment: Option<String>,
        /// Per-entry comment, as NAME=TEXT (repeatable)
        #[arg(long = "entry-comment", value_parser = parse_entry_comment)]
        entry_comments: Vec<(String, String)>,
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,
    },
    /// Append a new segment to an existing archive; its entries and comment
    /// override earlier ones on load
    Append {
        archive: PathBuf,
        #[arg(short, long)]
        comment: Option<String>,
        #[arg(long = "entry-comment", value_parser = parse_entry_comment)]
        entry_comments: Vec<(String, String)>,
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,
    },
    /// List archive contents
    List {
        input: PathBuf,
    },
    /// Extract every entry into a directory
    Extract {
        input: PathBuf,
        #[arg(short = 'C', long, default_value = ".")]
        output_dir: PathBuf,
    },
    /// Show the segment layout
    Info {
        input: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    match Cli::parse().command {

        // ── Pack ─────────────────────────────────────────────────────────────
        Commands::Pack { output, comment, entry_comments, input } => {
            let ar = build_archive(&input, comment, &entry_comments)?;
            ar.write_to(fs::File::create(&output)?)?;
            println!("Created: {}", output.display());
        }

        // ── Append ───────────────────────────────────────────────────────────
        Commands::Append { archive, comment, entry_comments, input } => {
            // Refuse to append to something that is not an archive.
            Archive::from_buffer(&read_buffer(&archive)?)?;
            let segment = build_archive(&input, comment, &entry_comments)?.to_buffer()?;
            let mut file = OpenOptions::new().append(true).open(&archive)?;
            file.write_all(&segment.borrow())?;
            println!("Appended {} byte segment to {}", segment.len(), archive.display());
        }

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { input } => {
            let ar = Archive::from_buffer(&read_buffer(&input)?)?;
            println!("Archive: {}", input.display());
            if let Some(c) = ar.comment() {
                println!("Comment: {c}");
            }
            println!("{:<32} {:>12}  Comment", "Name", "Size");
            for (name, entry) in ar.entries() {
                println!("{:<32} {:>12}  {}", name, entry.data().len(), entry.comment().unwrap_or("-"));
            }
        }

        // ── Extract ──────────────────────────────────────────────────────────
        Commands::Extract { input, output_dir } => {
            let ar = Archive::from_buffer(&read_buffer(&input)?)?;
            for (name, entry) in ar.entries() {
                let dest = safe_join(&output_dir, name)
                    .ok_or_else(|| format!("refusing to extract entry with unsafe name {name:?}"))?;
                if let Some(parent) = dest.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&dest, &*entry.data().buffer().borrow())?;
                println!("  extracted  {}", dest.display());
            }
            println!("Unpacked to: {}", output_dir.display());
        }

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input } => {
            let buf = read_buffer(&input)?;
            let ar = Archive::from_buffer(&buf)?;
            let segments = scan_segments(&buf)?;
            let parsed: usize = segments.iter().map(|s| s.length).sum();

            println!("── .qcv Archive ─────────────────────────────────────────");
            println!("  Path           {}", input.display());
            println!("  Signature      {}", hex::encode(&buf.borrow()[..buf.len().min(SIGNATURE.len())]));
            println!("  Size           {} B", buf.len());
            println!("  Trailing       {} B", buf.len() - parsed);
            println!("  Entries        {}", ar.len());
            println!("  Segments ({}):", segments.len());
            for seg in &segments {
                println!("    @{:<10} v{}  data {:>10} B  index {:>8} B  entries {:>5}  {}",
                    seg.offset, seg.version, seg.data_size(),
                    seg.length - seg.index_offset, seg.entry_count,
                    seg.comment.as_deref().unwrap_or(""));
            }
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn read_buffer(path: &Path) -> std::io::Result<Buffer> {
    Ok(Buffer::from_vec(fs::read(path)?))
}

fn build_archive(
    inputs: &[PathBuf],
    comment: Option<String>,
    entry_comments: &[(String, String)],
) -> Result<Archive, Box<dyn std::error::Error>> {
    let mut ar = Archive::new();
    if let Some(c) = comment {
        ar.set_comment(c);
    }
    for path in inputs {
        let name = path.file_name()
            .ok_or_else(|| format!("not a file: {}", path.display()))?
            .to_string_lossy()
            .into_owned();
        let entry_comment = entry_comments.iter().rev()
            .find(|(n, _)| *n == name)
            .map(|(_, c)| c.as_str());
        if ar.entry(&name).is_some() {
            log::warn!("duplicate entry name {name:?}: {} replaces an earlier input", path.display());
        }
        ar.add_data(&name, Buffer::from_vec(fs::read(path)?), entry_comment);
        println!("  packed  {}", path.display());
    }
    Ok(ar)
}

fn parse_entry_comment(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(n, c)| (n.to_owned(), c.to_owned()))
        .ok_or_else(|| format!("expected NAME=TEXT, got {s:?}"))
}

/// Join an opaque entry name onto `dir`, or `None` if it would escape it.
fn safe_join(dir: &Path, name: &str) -> Option<PathBuf> {
    let rel = Path::new(name);
    if rel.components().all(|c| matches!(c, Component::Normal(_))) {
        Some(dir.join(rel))
    } else {
        None
    }
}
