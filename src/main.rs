mod cli;

use std::error::Error;
use std::process::ExitCode;

use clap::Parser as _;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, ParseArgs, TokensArgs};
use sbc::context::ParserContext;
use sbc::dump::{render_token, render_tree, render_usage};
use sbc::lexer::{Lexer, TokenKind};
use sbc::limits::PoolLimits;

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_env("SBC_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Tokens(args) => run_tokens(args),
        Commands::Parse(args) => run_parse(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_tokens(args: TokensArgs) -> Result<(), Box<dyn Error>> {
    let mut lexer = Lexer::open(&args.file, &PoolLimits::default())?;
    loop {
        let token = lexer.next_token()?;
        println!("{}", render_token(&token, lexer.token_text()));
        if token.kind == TokenKind::Eof {
            return Ok(());
        }
    }
}

fn limits_for(args: &ParseArgs) -> Result<PoolLimits, Box<dyn Error>> {
    let limits = match (&args.config, args.size) {
        (Some(path), _) => PoolLimits::from_project_toml(path)?,
        (None, Some(size)) => PoolLimits::for_size(size),
        (None, None) => PoolLimits::default(),
    };
    Ok(limits)
}

fn run_parse(args: ParseArgs) -> Result<(), Box<dyn Error>> {
    let limits = limits_for(&args)?;
    debug!(?limits, file = %args.file.display(), "parsing");

    let mut ctx = ParserContext::with_limits(limits)?;
    ctx.parse_file(&args.file)?;

    print!("{}", render_tree(&ctx));
    if args.usage {
        print!("{}", render_usage(&ctx));
    }
    Ok(())
}
