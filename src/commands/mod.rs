use chrono::{DateTime, Local};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::config::{mask_secret, Credentials};
use crate::document::{is_pdf_file_name, UploadedDocument};
use crate::session::SessionCache;
use crate::workflow::{Outcome, QaWorkflow, ServiceFactory, SubmitForm};

mod system;

/// A parsed line of terminal input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetLlmKey(String),
    SetEmbeddingKey(String),
    SetVectorKey(String),
    SetIndex(String),
    Upload(String),
    Ask(String),
    Status,
    Help,
    Exit,
    Empty,
}

pub fn parse_command(input: &str) -> Result<Command, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(Command::Empty);
    }

    match input.to_lowercase().as_str() {
        "help" => return Ok(Command::Help),
        "exit" | "quit" => return Ok(Command::Exit),
        "status" => return Ok(Command::Status),
        _ => {}
    }

    if let Some(rest) = input.strip_prefix("set ") {
        let (key, value) = rest
            .trim()
            .split_once(char::is_whitespace)
            .map(|(k, v)| (k, v.trim()))
            .unwrap_or((rest.trim(), ""));
        let value = value.to_string();
        return match key {
            "llm-key" => Ok(Command::SetLlmKey(value)),
            "embedding-key" => Ok(Command::SetEmbeddingKey(value)),
            "vector-key" => Ok(Command::SetVectorKey(value)),
            "index" => Ok(Command::SetIndex(value)),
            other => Err(format!(
                "Unknown setting '{}'. Use llm-key, embedding-key, vector-key or index.",
                other
            )),
        };
    }

    if let Some(path) = input.strip_prefix("upload ") {
        return Ok(Command::Upload(path.trim().to_string()));
    }

    if input.eq_ignore_ascii_case("upload") {
        return Err("Please provide a path to a PDF file.\nUsage: upload <path>".to_string());
    }

    if let Some(query) = input.strip_prefix("ask ") {
        return Ok(Command::Ask(query.trim().to_string()));
    }

    Ok(Command::Ask(input.to_string()))
}

/// Whether the input loop should keep reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandFlow {
    Continue,
    Exit,
}

/// Terminal front end over the submit workflow; holds one session cache.
pub struct CommandHandler<F: ServiceFactory> {
    workflow: QaWorkflow<F>,
    credentials: Credentials,
    upload: Option<UploadedDocument>,
    uploaded_at: Option<DateTime<Local>>,
    cache: SessionCache,
}

impl<F: ServiceFactory> CommandHandler<F> {
    pub fn new(workflow: QaWorkflow<F>, credentials: Credentials) -> Self {
        Self {
            workflow,
            credentials,
            upload: None,
            uploaded_at: None,
            cache: SessionCache::new(),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn upload(&self) -> Option<&UploadedDocument> {
        self.upload.as_ref()
    }

    pub async fn handle_command(&mut self, input: &str) -> Result<CommandFlow, String> {
        match parse_command(input)? {
            Command::Empty => {}
            Command::Help => system::print_help(),
            Command::Exit => {
                system::print_goodbye();
                return Ok(CommandFlow::Exit);
            }
            Command::Status => self.print_status(),
            Command::SetLlmKey(key) => {
                self.credentials.llm_api_key = key;
                println!("✅ Groq API key updated");
            }
            Command::SetEmbeddingKey(key) => {
                self.credentials.embedding_api_key = key;
                println!("✅ Cohere API key updated");
            }
            Command::SetVectorKey(key) => {
                self.credentials.vector_store_api_key = key;
                println!("✅ Pinecone API key updated");
            }
            Command::SetIndex(name) => {
                println!("✅ Index set to {}", name.bright_yellow());
                self.credentials.index_name = name;
            }
            Command::Upload(path) => self.handle_upload(&path).await?,
            Command::Ask(query) => {
                let outcome = self.ask(&query).await;
                print_outcome(&outcome);
            }
        }
        Ok(CommandFlow::Continue)
    }

    /// Every `upload` gets a fresh identity, even when the same file is read again.
    async fn handle_upload(&mut self, path: &str) -> Result<(), String> {
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(path)
            .to_string();

        if !is_pdf_file_name(&file_name) {
            return Err(format!("'{}' is not a PDF file. Please upload a .pdf document.", file_name));
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| format!("Failed to read {}: {}", path, e))?;

        println!(
            "📄 Loaded {} ({} bytes)",
            file_name.bright_yellow(),
            bytes.len().to_string().cyan()
        );
        self.upload = Some(UploadedDocument::new(file_name, bytes));
        self.uploaded_at = Some(Local::now());
        Ok(())
    }

    pub async fn ask(&mut self, query: &str) -> Outcome {
        let form = SubmitForm::new(self.credentials.clone(), self.upload.clone(), query);

        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message("Please wait...");
        spinner.enable_steady_tick(Duration::from_millis(100));

        let outcome = self.workflow.submit(&mut self.cache, &form).await;

        spinner.finish_and_clear();
        outcome
    }

    fn print_status(&self) {
        let display = |value: &str| {
            if value.is_empty() {
                "(not set)".dimmed().to_string()
            } else {
                mask_secret(value)
            }
        };

        println!("\n⚙️ Settings:");
        println!("  Groq API key:        {}", display(&self.credentials.llm_api_key));
        println!("  Cohere API key:      {}", display(&self.credentials.embedding_api_key));
        println!("  Pinecone API key:    {}", display(&self.credentials.vector_store_api_key));
        let index = if self.credentials.index_name.is_empty() {
            "(not set)".dimmed().to_string()
        } else {
            self.credentials.index_name.clone()
        };
        println!("  Pinecone index name: {}", index);

        println!("\n📁 Document:");
        match (&self.upload, self.uploaded_at) {
            (Some(doc), Some(at)) => println!(
                "  {} ({} bytes, uploaded {})",
                doc.file_name().bright_yellow(),
                doc.len(),
                at.format("%Y-%m-%d %H:%M:%S")
            ),
            (Some(doc), None) => println!("  {} ({} bytes)", doc.file_name().bright_yellow(), doc.len()),
            (None, _) => println!("  {}", "(none)".dimmed()),
        }

        let indexed = match (self.cache.cached_document(), &self.upload) {
            (Some(cached), Some(doc)) if cached == doc.id() => "indexed".green().to_string(),
            (Some(_), _) => "stale, will re-index on next question".yellow().to_string(),
            (None, _) => "nothing indexed yet".dimmed().to_string(),
        };
        println!("  Retriever: {}", indexed);
        println!();
    }
}

pub fn print_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Success(answer) => println!("\n✅ {}\n", answer.bright_green()),
        Outcome::Warning(message) => println!("\n⚠️ {}\n", message.yellow()),
        Outcome::Error(message) => println!("\n❌ {}\n", message.red()),
    }
}
