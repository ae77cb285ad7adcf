use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Host of the field value being stored: an existing entity, or one not saved yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostArg {
    New,
    Id(u64),
}

fn parse_host(value: &str) -> Result<HostArg, String> {
    if value.eq_ignore_ascii_case("new") {
        return Ok(HostArg::New);
    }
    match value.parse::<u64>() {
        Ok(0) | Err(_) => Err(format!(
            "'{value}' is not a host id; expected a positive number or 'new'"
        )),
        Ok(id) => Ok(HostArg::Id(id)),
    }
}

#[derive(Parser)]
#[command(name = "shard")]
#[command(author, version)]
#[command(about = "Convert embedded content markers between authoring, storage and display markup")]
#[command(
    long_about = "Shard embeds one content item (the guest) inside a rich-text field of another \
    (the host). This tool converts field markup between the editor's authoring format, the \
    storage format kept with the host, and the display format shown to readers, against a \
    site described by a JSON file."
)]
#[command(after_help = "\
EXAMPLES:

    # Store editor markup for field body[0] of entity 7
    shard store --site site.json --host 7 --field body body.html

    # Same, and write the new embed records back to the site file
    shard store --site site.json --host 7 --field body --write body.html

    # Store for an entity that has not been saved yet
    shard store --site site.json --host new --field body body.html

    # Render stored markup for readers
    shard display --site site.json stored.html

    # Turn stored markup back into editor markup
    cat stored.html | shard edit --site site.json

    # List the embed markers in a file
    shard scan body.html

CONFIGURATION:

Shard looks for configuration files in this order:
  1. Explicit --config path
  2. shard.toml or .shard.toml in current/parent directories
  3. ~/.config/shard/config.toml (XDG)
  4. Built-in defaults

Example .shard.toml:

    embed_types = [\"shard\", \"note\"]
    view_modes = [\"full\", \"teaser\"]
    content_types = [\"article\", \"page\"]
    fields = [\"body\"]
    site = \"site.json\"")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to config file
    #[arg(long, global = true)]
    #[arg(help = "Path to configuration file")]
    #[arg(
        long_help = "Path to a custom configuration file. If not specified, shard will \
        search for .shard.toml or shard.toml in the current directory and its parents, \
        then fall back to ~/.config/shard/config.toml."
    )]
    pub config: Option<PathBuf>,

    /// Path to the site file
    #[arg(long, global = true)]
    #[arg(help = "Path to the JSON site file")]
    #[arg(
        long_help = "Path to a JSON file holding the site's entities, embed records, guest \
        renderings and field definitions. Overrides the `site` setting of the configuration \
        file. Without either, an empty site is used."
    )]
    pub site: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert authoring markup to storage markup
    #[command(
        long_about = "Convert one field value from the editor's authoring format to storage \
        format. Every embed marker gets an embed record; for an existing host the records are \
        stored right away, for a new host they are printed to stderr as JSON and the markup \
        carries placeholder ids."
    )]
    #[command(after_help = "\
EXAMPLES:

    # Store body[0] of entity 7
    shard store --host 7 --field body body.html

    # Store the second value of a multi-valued field
    shard store --host 7 --field body --index 1 body.html

    # Persist the new records in the site file
    shard store --host 7 --field body --write body.html")]
    Store {
        /// Input file (stdin if not provided)
        #[arg(help = "Input file path")]
        file: Option<PathBuf>,

        /// Host entity id, or `new`
        #[arg(long, value_parser = parse_host)]
        #[arg(help = "Host entity id, or 'new' for an entity not saved yet")]
        host: HostArg,

        /// Field holding the markup
        #[arg(long)]
        #[arg(help = "Name of the host field")]
        field: String,

        /// Index of the value in a multi-valued field
        #[arg(long, default_value_t = 0)]
        #[arg(help = "Zero-based index of the field value")]
        index: usize,

        /// Write new records back to the site file
        #[arg(long)]
        #[arg(help = "Save the site file with the new embed records")]
        write: bool,
    },
    /// Convert storage markup to display markup
    #[command(
        long_about = "Render stored markup for readers: every embed marker is filled with its \
        guest's rendering at the recorded view mode, with the host's local content merged in."
    )]
    Display {
        /// Input file (stdin if not provided)
        #[arg(help = "Input file path")]
        file: Option<PathBuf>,
    },
    /// Convert storage markup to authoring markup
    #[command(
        long_about = "Turn stored markup back into the editor's authoring format: markers get \
        their guest id, view mode and widget class back and show the guest's rendering."
    )]
    Edit {
        /// Input file (stdin if not provided)
        #[arg(help = "Input file path")]
        file: Option<PathBuf>,
    },
    /// List embed markers
    #[command(
        long_about = "List every element carrying an embed type, with its line, whether the \
        type is recognised, and the guest, record id and view mode it refers to."
    )]
    Scan {
        /// Input file (stdin if not provided)
        #[arg(help = "Input file path")]
        file: Option<PathBuf>,
    },
}
