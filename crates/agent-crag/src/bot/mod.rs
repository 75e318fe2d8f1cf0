//! Interactive CRAG shell
//!
//! Turns lines of input into session calls and formats the replies.
//!
//! # Example
//!
//! ```rust,ignore
//! use agent_crag::{CragBot, CragConfig, CragSession};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = CragConfig::from_env()?;
//!     let bot = CragBot::new(CragSession::from_config(&config)?);
//!     let reply = bot.process_input("setup AAPL").await?;
//!     Ok(())
//! }
//! ```

pub mod commands;

use crate::error::Result;
use crate::session::{CragSession, SetupSummary};
use crate::types::Answer;

pub use commands::Command;

const DEFAULT_PROMPT: &str = "CRAG > ";

/// What the shell should do after a line of input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotReply {
    Text(String),
    Exit,
}

/// CRAG shell over one session
pub struct CragBot {
    session: CragSession,
}

impl CragBot {
    pub fn new(session: CragSession) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &CragSession {
        &self.session
    }

    /// `<TICKER> > ` once a ticker is loaded, `CRAG > ` before
    pub async fn prompt(&self) -> String {
        self.session
            .current_ticker()
            .await
            .map_or_else(|| DEFAULT_PROMPT.to_string(), |ticker| format!("{ticker} > "))
    }

    /// Process user input and return a response
    pub async fn process_input(&self, input: &str) -> Result<BotReply> {
        let command = Command::parse(input)?;
        self.execute_command(command).await
    }

    /// Execute a parsed command
    pub async fn execute_command(&self, command: Command) -> Result<BotReply> {
        let text = match command {
            Command::Setup { ticker } => format_setup(&self.session.setup(&ticker).await?),
            Command::Query { text } => format_answer(&self.session.ask(&text).await?),
            Command::Text { text } => {
                if self.session.current_ticker().await.is_none() {
                    format!("Unknown command: {text}\nType `help` for the list of commands.")
                } else {
                    format_answer(&self.session.ask(&text).await?)
                }
            }
            Command::Status => match self.session.current_ticker().await {
                Some(ticker) => format!("Loaded ticker: {ticker}"),
                None => "No ticker loaded. Run `setup <TICKER>` first.".to_string(),
            },
            Command::Help => Command::help_text().trim().to_string(),
            Command::Exit => return Ok(BotReply::Exit),
        };
        Ok(BotReply::Text(text))
    }
}

fn format_setup(summary: &SetupSummary) -> String {
    let mut text = format!(
        "Loaded {} ({}): {} documents indexed, {} news articles.",
        summary.ticker, summary.company, summary.documents, summary.news_items
    );
    if let Some(reason) = &summary.news_error {
        text.push_str(&format!("\nNews unavailable: {reason}"));
    }
    text
}

/// Quality tier and web usage, then the answer
pub fn format_answer(answer: &Answer) -> String {
    format!(
        "Quality: {} | Web: {}\n\n{}",
        answer.tier_used.as_str().to_uppercase(),
        if answer.used_corrective { "yes" } else { "no" },
        answer.text
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MarketSnapshot, MockMarketDataSource, MockNewsSource, PriceSummary};
    use crate::config::CragConfig;
    use crate::error::CragError;
    use crate::services::{MockAnswerService, MockCorrectiveSearchProvider};
    use crate::session::SessionComponents;
    use crate::store::{InMemoryEvidenceStore, LexicalEmbedder};
    use crate::types::Tier;
    use std::sync::Arc;
    use uuid::Uuid;

    fn bot(
        judge: MockAnswerService,
        corrective: MockCorrectiveSearchProvider,
        generator: MockAnswerService,
    ) -> CragBot {
        let mut market = MockMarketDataSource::new();
        market.expect_snapshot().returning(|ticker| {
            Ok(MarketSnapshot {
                ticker: ticker.to_string(),
                price: PriceSummary {
                    start: 100.0,
                    current: 104.0,
                    return_pct: 4.0,
                    avg_volume: 1_000.0,
                    low: 99.0,
                    high: 105.0,
                    sessions: 20,
                },
                overview: None,
            })
        });
        let mut news = MockNewsSource::new();
        news.expect_recent().returning(|_| Ok(Vec::new()));

        let config = CragConfig::builder()
            .openai_api_key("sk-test")
            .newsapi_api_key("news-test")
            .tavily_api_key("tvly-test")
            .build()
            .unwrap();
        let session = CragSession::new(
            SessionComponents {
                market: Arc::new(market),
                news: Arc::new(news),
                store: Arc::new(InMemoryEvidenceStore::new(Arc::new(LexicalEmbedder::default()))),
                judge: Arc::new(judge),
                corrective: Arc::new(corrective),
                generator: Arc::new(generator),
                checks: Vec::new(),
            },
            &config,
        );
        CragBot::new(session)
    }

    fn idle_bot() -> CragBot {
        bot(
            MockAnswerService::new(),
            MockCorrectiveSearchProvider::new(),
            MockAnswerService::new(),
        )
    }

    fn text(reply: BotReply) -> String {
        match reply {
            BotReply::Text(text) => text,
            BotReply::Exit => panic!("unexpected exit"),
        }
    }

    #[test]
    fn test_format_answer() {
        let answer = Answer {
            text: "Shares rose 4%.".to_string(),
            tier_used: Tier::Ambiguous,
            used_corrective: true,
            run_id: Uuid::nil(),
        };
        assert_eq!(
            format_answer(&answer),
            "Quality: AMBIGUOUS | Web: yes\n\nShares rose 4%."
        );
    }

    #[tokio::test]
    async fn test_prompt_follows_current_ticker() {
        let bot = idle_bot();
        assert_eq!(bot.prompt().await, "CRAG > ");

        let reply = text(bot.process_input("setup msft").await.unwrap());
        assert_eq!(reply, "Loaded MSFT (MSFT): 1 documents indexed, 0 news articles.");
        assert_eq!(bot.prompt().await, "MSFT > ");
    }

    #[tokio::test]
    async fn test_plain_text_before_setup() {
        let bot = idle_bot();
        let reply = text(bot.process_input("how is it doing?").await.unwrap());
        assert!(reply.starts_with("Unknown command: how is it doing?"));
    }

    #[tokio::test]
    async fn test_explicit_query_before_setup_errors() {
        let bot = idle_bot();
        assert!(matches!(
            bot.process_input("query price?").await,
            Err(CragError::NotReady)
        ));
    }

    #[tokio::test]
    async fn test_plain_text_after_setup_is_a_question() {
        let mut judge = MockAnswerService::new();
        judge
            .expect_generate()
            .times(1)
            .returning(|_| Ok("incorrect".to_string()));
        let mut corrective = MockCorrectiveSearchProvider::new();
        corrective
            .expect_search()
            .times(1)
            .returning(|_, _| Ok(vec!["Guidance was raised.".to_string()]));
        let mut generator = MockAnswerService::new();
        generator
            .expect_generate()
            .times(1)
            .returning(|_| Ok("Guidance went up.".to_string()));

        let bot = bot(judge, corrective, generator);
        bot.process_input("setup AAPL").await.unwrap();
        let reply = text(bot.process_input("What about guidance?").await.unwrap());
        assert_eq!(reply, "Quality: INCORRECT | Web: yes\n\nGuidance went up.");
    }

    #[tokio::test]
    async fn test_status_help_exit() {
        let bot = idle_bot();
        let status = text(bot.process_input("status").await.unwrap());
        assert!(status.starts_with("No ticker loaded"));
        let help = text(bot.process_input("/help").await.unwrap());
        assert!(help.starts_with("Financial CRAG Commands"));
        assert_eq!(bot.process_input("exit").await.unwrap(), BotReply::Exit);
    }
}
