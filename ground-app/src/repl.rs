use crate::wiring::App;
use anyhow::Result;
use ground_chat::{ChatSession, ConversationController};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

const QUERY_PROMPT: &str = "Please input your search query. Enter q to quit > ";
const FOLLOW_UP_PROMPT: &str = "Please input your query. Enter q to quit > ";

#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Quit,
    NewSession,
    Blank,
    Message(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    match line.trim() {
        "q" => Input::Quit,
        "/new" => Input::NewSession,
        "" => Input::Blank,
        text => Input::Message(text),
    }
}

pub async fn run(app: &App, max_turns: usize) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    chat_loop(&app.controller, max_turns, stdin, tokio::io::stdout()).await
}

/// Reads one message per line until `q` or end of input. A session accepts
/// at most `max_turns` answered messages; `/new` replaces it with a fresh one.
async fn chat_loop<R, W>(
    controller: &ConversationController,
    max_turns: usize,
    input: R,
    mut out: W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut session = ChatSession::new();
    let mut turns = 0usize;

    loop {
        let prompt = if session.is_active() {
            FOLLOW_UP_PROMPT
        } else {
            QUERY_PROMPT
        };
        out.write_all(prompt.as_bytes()).await?;
        out.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let message = match parse_input(&line) {
            Input::Quit => break,
            Input::Blank => continue,
            Input::NewSession => {
                tracing::info!(previous = %session.id(), "repl.session.reset");
                session = ChatSession::new();
                turns = 0;
                continue;
            }
            Input::Message(text) => text,
        };

        if turns >= max_turns {
            out.write_all(
                format!(
                    "This session reached its limit of {max_turns} messages. Type /new to start over or q to quit.\n"
                )
                .as_bytes(),
            )
            .await?;
            continue;
        }

        match controller.handle(&mut session, message).await {
            Ok(reply) => {
                turns += 1;
                out.write_all(format!("{reply}\n").as_bytes()).await?
            }
            Err(e) if e.is_cache_expired() => {
                out.write_all(
                    format!("{e}\nThe grounding context is no longer available. Type /new to search again.\n")
                        .as_bytes(),
                )
                .await?
            }
            Err(e) => out.write_all(format!("Error: {e}\n").as_bytes()).await?,
        }
    }

    out.flush().await?;
    Ok(())
}
