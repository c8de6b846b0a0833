// src/cli.rs

use crate::pipeline::PipelineConfig;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Contributor network graphs from git/hg repositories", long_about = None)]
pub struct Args {
    /// Log debug details
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Hide progress bars
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the network from a CSV list of packages
    Network(NetworkArgs),

    /// List the packages named in requirements*.txt files as CSV
    Requirements {
        /// CSV file to write
        output: PathBuf,

        /// Directories to search recursively
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

#[derive(ClapArgs, Debug)]
pub struct NetworkArgs {
    /// CSV with name, repository_type, repository_url and depended_by columns
    pub input: PathBuf,

    /// Directory receiving the site, data/ and static/img/
    pub output: PathBuf,

    /// Static site template copied into the output directory
    #[arg(long)]
    pub template_dir: Option<PathBuf>,

    /// Where repositories are cloned [default: <system temp>/repositories]
    #[arg(long)]
    pub temp_dir: Option<PathBuf>,

    /// Warn about packages without commit authors instead of failing
    #[arg(long)]
    pub skip_empty: bool,

    /// Keep remote avatar URLs instead of downloading the images
    #[arg(long)]
    pub no_avatars: bool,
}

impl NetworkArgs {
    pub fn into_config(self, show_progress: bool) -> PipelineConfig {
        PipelineConfig {
            input: self.input,
            output_dir: self.output,
            template_dir: self.template_dir,
            temp_dir: self.temp_dir.unwrap_or_else(|| std::env::temp_dir().join("repositories")),
            skip_empty: self.skip_empty,
            fetch_avatars: !self.no_avatars,
            show_progress,
        }
    }
}
