use clap::Parser;


#[derive(Parser, Debug)]
#[command(version, about = "Consumes refiner block files and inserts them into the database", long_about = None)]
pub struct Cli {
    /// Config file with indexer settings
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<String>,

    /// Database connection string
    #[arg(long)]
    pub database: Option<String>,

    /// Source folder populated with block json files
    #[arg(short, long)]
    pub source_folder: Option<String>,

    /// Block to start from; 0 resumes from the last indexed block
    #[arg(short, long)]
    pub from_block: Option<u64>,

    /// Block to end on (exclusive); 0 means never stop
    #[arg(short, long)]
    pub to_block: Option<u64>,

    /// Genesis block; blocks below it are never indexed
    #[arg(short, long)]
    pub genesis_block: Option<u64>,

    /// Keep consumed json files on disk
    #[arg(short, long)]
    pub keep_files: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,
}
