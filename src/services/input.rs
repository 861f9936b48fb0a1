// SPDX-License-Identifier: MIT

//! Interactive line input

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex as StdMutex;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

use crate::error::InputError;

/// Source of one line of user input per prompt
#[async_trait]
pub trait LineReader: Send + Sync {
    /// Show `prompt` and return the next line without its terminator
    async fn read_line(&self, prompt: &str) -> Result<String, InputError>;
}

/// Reads from the process's standard input
pub struct StdinReader {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl StdinReader {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(io::stdin()).lines()),
        }
    }
}

impl Default for StdinReader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LineReader for StdinReader {
    async fn read_line(&self, prompt: &str) -> Result<String, InputError> {
        let mut stdout = io::stdout();
        stdout
            .write_all(format!("{}\nYour input: ", prompt).as_bytes())
            .await?;
        stdout.flush().await?;

        let mut lines = self.lines.lock().await;
        match lines.next_line().await? {
            Some(line) => Ok(line.trim_end_matches('\r').to_string()),
            None => Err(InputError::Closed(prompt.to_string())),
        }
    }
}

/// Replays canned answers; records every prompt it was asked
#[derive(Default)]
pub struct ScriptedReader {
    answers: StdMutex<VecDeque<String>>,
    prompts: StdMutex<Vec<String>>,
}

impl ScriptedReader {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: StdMutex::new(answers.into_iter().map(Into::into).collect()),
            prompts: StdMutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LineReader for ScriptedReader {
    async fn read_line(&self, prompt: &str) -> Result<String, InputError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        self.answers
            .lock()
            .ok()
            .and_then(|mut a| a.pop_front())
            .ok_or_else(|| InputError::Closed(prompt.to_string()))
    }
}
