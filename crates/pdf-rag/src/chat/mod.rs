//! Interactive question loop
//!
//! One line per turn: retrieve, generate, print. No state is carried between
//! turns. The loop returns why it stopped; the caller owns process exit.

use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::Result;
use crate::generation::AnswerGenerator;
use crate::retrieval::{Retrieval, Retriever};

/// Keyword that ends the session, matched case-insensitively
pub const EXIT_KEYWORD: &str = "exit";

/// Why a chat session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The user typed the exit keyword
    UserExit,
    /// Input was closed
    EndOfInput,
}

enum State {
    Prompt,
    Dispatch(String),
    Exit(ExitReason),
}

/// Retrieval-augmented chat over one index namespace
pub struct ChatSession {
    retriever: Retriever,
    generator: AnswerGenerator,
}

impl ChatSession {
    pub fn new(retriever: Retriever, generator: AnswerGenerator) -> Self {
        Self {
            retriever,
            generator,
        }
    }

    /// Run until the exit keyword or end of input
    pub async fn run<R, W>(&self, mut input: R, output: &mut W) -> Result<ExitReason>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        writeln!(output, "Welcome to your PDF RAG chatbot!")?;
        writeln!(output, "Ask questions about your document.\nType 'exit' to quit.\n")?;

        let mut state = State::Prompt;
        loop {
            state = match state {
                State::Prompt => {
                    write!(output, "You: ")?;
                    output.flush()?;
                    read_turn(&mut input).await?
                }
                State::Dispatch(question) => {
                    self.answer_turn(&question, output).await?;
                    State::Prompt
                }
                State::Exit(reason) => {
                    if reason == ExitReason::UserExit {
                        writeln!(output, "Goodbye!")?;
                    } else {
                        writeln!(output)?;
                    }
                    output.flush()?;
                    return Ok(reason);
                }
            };
        }
    }

    /// Answer one question, writing progress lines as it goes
    pub async fn answer_turn<W: Write>(&self, question: &str, output: &mut W) -> Result<String> {
        writeln!(output, "\nStep 1: Searching documents...")?;
        output.flush()?;

        let retrieval = self.retriever.retrieve(question).await;
        match &retrieval {
            Retrieval::NoMatches => writeln!(output, "No matching documents found.")?,
            Retrieval::Found { .. } => {
                writeln!(output, "Found {} matching documents.", retrieval.match_count())?
            }
            Retrieval::Failed => {}
        }

        writeln!(output, "\nStep 2: Generating answer...")?;
        output.flush()?;

        let answer = self.generator.answer(question, retrieval.context()).await;
        writeln!(output, "\nAssistant: {}\n", answer)?;
        output.flush()?;

        Ok(answer)
    }
}

/// Read one line and decide what to do with it
///
/// Bytes that are not UTF-8 are replaced rather than ending the session.
async fn read_turn<R: AsyncBufRead + Unpin>(input: &mut R) -> Result<State> {
    let mut buf = Vec::new();
    if input.read_until(b'\n', &mut buf).await? == 0 {
        return Ok(State::Exit(ExitReason::EndOfInput));
    }

    let line = String::from_utf8_lossy(&buf);
    let question = line.trim();
    Ok(if question.eq_ignore_ascii_case(EXIT_KEYWORD) {
        State::Exit(ExitReason::UserExit)
    } else if question.is_empty() {
        State::Prompt
    } else {
        State::Dispatch(question.to_string())
    })
}
