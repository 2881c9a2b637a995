use std::io::{BufRead, Write};

use tracing::{debug, info};

use crate::config::RagConfig;
use crate::embedding::embedder_from_config;
use crate::error::Result;
use crate::llm::OllamaLlm;
use crate::pipeline::{RagPipeline, build_pipeline};

const ASK: &str = "\nAsk a question (or 'exit' to quit): ";

#[derive(Debug, Clone, PartialEq, Eq)]
enum SessionState {
    AwaitingInput,
    Answering(String),
    Terminated,
}

/// Why the session ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Exit,
    EndOfInput,
}

/// Reads questions line by line until "exit" or end of input. The first
/// failing question ends the session with that error. Input is read with
/// blocking calls; nothing else runs while waiting for the user.
pub async fn run_session<R, W>(pipeline: &RagPipeline, mut input: R, output: &mut W) -> Result<SessionEnd>
where
    R: BufRead,
    W: Write,
{
    let mut state = SessionState::AwaitingInput;

    loop {
        state = match state {
            SessionState::AwaitingInput => {
                write!(output, "{ASK}")?;
                output.flush()?;

                let mut line = String::new();
                if input.read_line(&mut line)? == 0 {
                    writeln!(output)?;
                    return Ok(SessionEnd::EndOfInput);
                }
                let line = line.trim_end_matches(['\n', '\r']);
                let query = line.trim();

                if line.eq_ignore_ascii_case("exit") {
                    writeln!(output, "Exiting...")?;
                    SessionState::Terminated
                } else if query.is_empty() {
                    writeln!(output, "Please enter a question.")?;
                    SessionState::AwaitingInput
                } else {
                    SessionState::Answering(query.to_string())
                }
            }
            SessionState::Answering(question) => {
                info!(question = %question, "answering");
                let answer = pipeline.answer(&question).await?;
                debug!(context_chunks = answer.context.chunks.len(), "answered");
                writeln!(output, "\nAnswer: {}", answer.text)?;
                SessionState::AwaitingInput
            }
            SessionState::Terminated => return Ok(SessionEnd::Exit),
        };
    }
}

/// Builds the Ollama-backed pipeline and talks to the user on stdin/stdout.
pub async fn run(config: &RagConfig) -> Result<SessionEnd> {
    info!(
        embedder = config.embedder.name(),
        embedding_model = %config.embedding_model,
        llm_model = %config.llm_model,
        endpoint = %config.ollama_url,
        "starting"
    );
    let embedder = embedder_from_config(config);
    let llm = OllamaLlm::new(config.ollama_url.clone(), config.llm_model.clone());
    let pipeline = build_pipeline(config, embedder, Box::new(llm)).await?;

    let stdin = std::io::stdin().lock();
    let mut stdout = std::io::stdout();
    run_session(&pipeline, stdin, &mut stdout).await
}
