//! Financial CRAG shell
//!
//! # Usage
//!
//! ```bash
//! export OPENAI_API_KEY=... NEWSAPI_API_KEY=... TAVILY_API_KEY=...
//! cargo run --bin crag-bot -p agent-crag -- --ticker AAPL
//! ```

use agent_crag::bot::{BotReply, CragBot};
use agent_crag::{CragConfig, CragError, CragSession, EmbeddingBackend};
use agent_utils::{LogFormat, init_tracing};
use clap::Parser;
use std::io::{self, BufRead, Write};

#[derive(Debug, Parser)]
#[command(name = "crag-bot", version, about = "Corrective RAG Q&A over one stock at a time")]
struct Args {
    /// Ticker to load before the prompt appears
    #[arg(short, long)]
    ticker: Option<String>,

    /// Documents retrieved per question (overrides CRAG_TOP_K)
    #[arg(long)]
    top_k: Option<usize>,

    /// Use offline lexical embeddings instead of the embeddings API
    #[arg(long)]
    lexical: bool,
}

fn print_banner() {
    println!(
        r"
==============================================================
                     Financial CRAG Bot

  setup <TICKER>     load market data and news
  query <QUESTION>   ask about the loaded ticker
  help               all commands
  exit               leave
==============================================================
"
    );
}

fn load_config(args: &Args) -> agent_crag::Result<CragConfig> {
    let mut config = CragConfig::from_env()?;
    if let Some(top_k) = args.top_k {
        config.top_k = top_k;
    }
    if args.lexical {
        config.embeddings = EmbeddingBackend::Lexical;
    }
    config.validate()?;
    Ok(config)
}

fn report_startup_error(err: CragError) -> anyhow::Result<()> {
    match err {
        CragError::ConfigurationMissing(names) => {
            eprintln!("Missing: {}", names.join(", "));
            anyhow::bail!("fix the listed environment variables and try again")
        }
        other => Err(other.into()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing("warn,agent_crag=info", LogFormat::from_env());

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => return report_startup_error(e),
    };

    print_banner();
    println!("Configuration:");
    println!("  Model: {}", config.model);
    println!(
        "  API Base: {}",
        config.openai_api_base.as_deref().unwrap_or("https://api.openai.com/v1")
    );
    println!("  Embeddings: {:?}", config.embeddings);
    println!("  Top K: {}", config.top_k);
    println!();

    let session = CragSession::from_config(&config)?;
    println!("Checking API keys...");
    if let Err(e) = session.preflight().await {
        return report_startup_error(e);
    }
    let bot = CragBot::new(session);

    if let Some(ticker) = &args.ticker {
        println!("Loading {ticker}...");
        match bot.process_input(&format!("setup {ticker}")).await {
            Ok(BotReply::Text(reply)) => println!("{reply}\n"),
            Ok(BotReply::Exit) => return Ok(()),
            Err(e) => eprintln!("Error: {e}\n"),
        }
    }

    repl(&bot, io::stdin().lock()).await?;
    Ok(())
}

/// Read commands until `exit`, end of input or an unreadable line
async fn repl(bot: &CragBot, mut input: impl BufRead) -> io::Result<()> {
    let mut stdout = io::stdout();

    loop {
        print!("{}", bot.prompt().await);
        stdout.flush()?;

        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) => {
                println!("\nGoodbye!");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("Error reading input: {e}");
                break;
            }
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match bot.process_input(line).await {
            Ok(BotReply::Text(reply)) => println!("{reply}\n"),
            Ok(BotReply::Exit) => {
                println!("Goodbye!");
                break;
            }
            Err(e) => eprintln!("Error: {e}\n"),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Read};

    struct BrokenInput;

    impl Read for BrokenInput {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("terminal closed"))
        }
    }

    fn offline_bot() -> CragBot {
        let config = CragConfig::builder()
            .openai_api_key("sk-test")
            .newsapi_api_key("news-test")
            .tavily_api_key("tvly-test")
            .embeddings(EmbeddingBackend::Lexical)
            .build()
            .unwrap();
        CragBot::new(CragSession::from_config(&config).unwrap())
    }

    #[tokio::test]
    async fn test_unreadable_input_ends_the_loop() {
        repl(&offline_bot(), BufReader::new(BrokenInput)).await.unwrap();
    }

    #[tokio::test]
    async fn test_exit_and_end_of_input() {
        let bot = offline_bot();
        repl(&bot, "help\nexit\nstatus\n".as_bytes()).await.unwrap();
        repl(&bot, "".as_bytes()).await.unwrap();
    }
}
