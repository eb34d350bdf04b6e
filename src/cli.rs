use clap::{Parser, Subcommand};
use std::path::PathBuf;

use sbc::limits::ConfigSize;

#[derive(Parser)]
#[command(name = "sbc")]
#[command(about = "Front end for tokenized BASIC programs")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the tokens of a program, one per line
    Tokens(TokensArgs),
    /// Parse a program and print its statement tree
    Parse(ParseArgs),
}

#[derive(clap::Args)]
pub struct TokensArgs {
    /// Tokenized program file
    pub file: PathBuf,
}

#[derive(clap::Args)]
pub struct ParseArgs {
    /// Tokenized program file
    pub file: PathBuf,

    /// Pool size preset: small, medium or large
    #[arg(long)]
    pub size: Option<ConfigSize>,

    /// project.toml with a [limits] table
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Also print pool usage
    #[arg(long)]
    pub usage: bool,
}
