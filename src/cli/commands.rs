use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "harvester")]
#[command(about = "Rebuild a calendar day of news from a backward-paginated feed")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Harvest one section and write the JSON artifact
    Fetch {
        /// Feed section to harvest (overrides HARVEST_SECTION)
        #[arg(short, long)]
        section: Option<String>,

        /// Calendar day to harvest, YYYYMMDD in the feed's offset. Omit for the most recent items
        #[arg(short, long)]
        date: Option<String>,

        /// Stop after this many items when no date is given (overrides HARVEST_COUNT_LIMIT)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Maximum number of pages to request (overrides HARVEST_MAX_ITERATIONS)
        #[arg(long)]
        max_iterations: Option<u32>,

        /// Pause between page requests in milliseconds (overrides HARVEST_DELAY_MS)
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Directory for the artifact (overrides HARVEST_OUTPUT_DIR)
        #[arg(short, long)]
        output_dir: Option<String>,

        /// Print the artifact to stdout instead of writing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the UTC window and starting cursor for a day
    Window {
        /// Day as YYYYMMDD
        date: String,
    },

    /// Show how a published-time string resolves to UTC
    ParseTime {
        /// Raw timestamp text, e.g. "Tue Jun 10, 5:00PM CDT"
        text: String,

        /// Year to assume when the text has none (defaults to the current year)
        #[arg(long)]
        year: Option<i32>,
    },
}
