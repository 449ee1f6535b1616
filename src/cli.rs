// src/cli.rs
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::client::KycClient;
use crate::config::KycConfig;
use crate::errors::Result;
use crate::evaluation::{ApplicantFields, Evaluation, OowResponses};
use crate::transport::Transport;

#[derive(Parser, Debug)]
#[command(name = "alloy-kyc", version, about = "Run Alloy KYC evaluations from the command line")]
pub struct Cli {
    /// TOML config file; environment variables are used when omitted.
    #[arg(long, short, env = "ALLOY_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Submit a new evaluation from a JSON file of applicant fields.
    Create { applicant: PathBuf },
    /// Look up an evaluation by token.
    Fetch { token: String },
    /// Answer an out-of-wallet challenge with a JSON responses file.
    Answer { token: String, responses: PathBuf },
    /// Fork an evaluation into a new one.
    Fork { token: String },
}

impl Cli {
    pub fn load_config(&self) -> Result<KycConfig> {
        match &self.config {
            Some(path) => KycConfig::from_toml_file(path),
            None => KycConfig::from_env(),
        }
    }
}

fn read_json<D: serde::de::DeserializeOwned>(path: &Path) -> Result<D> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Executes `command` and returns the resulting evaluation.
pub async fn run<T: Transport>(client: &KycClient<T>, command: &Command) -> Result<Evaluation> {
    match command {
        Command::Create { applicant } => {
            let fields: ApplicantFields = read_json(applicant)?;
            client.create(&fields).await
        }
        Command::Fetch { token } => client.fetch(token).await,
        Command::Answer { token, responses } => {
            let responses: OowResponses = read_json(responses)?;
            let current = client.fetch(token).await?;
            client.submit_oow_responses(&current, &responses).await
        }
        Command::Fork { token } => {
            let current = client.fetch(token).await?;
            client.fork(&current).await
        }
    }
}

/// Plain-text report of an evaluation.
pub fn render(evaluation: &Evaluation) -> String {
    let mut out = String::new();
    out.push_str(&format!("status_code:      {}\n", evaluation.status_code()));
    out.push_str(&format!(
        "evaluation_token: {}\n",
        evaluation.evaluation_token().unwrap_or("-")
    ));
    if let Some(message) = evaluation.error_message() {
        out.push_str(&format!("error:            {}\n", message));
        return out;
    }
    out.push_str(&format!(
        "result:           {}\n",
        evaluation.result().map(|r| r.to_string()).unwrap_or_else(|| "-".to_string())
    ));
    out.push_str(&format!("success:          {}\n", evaluation.is_success()));
    out.push_str(&format!("partial_success:  {}\n", evaluation.is_partial_success()));
    out.push_str(&format!("manual_review:    {}\n", evaluation.is_manual_review()));
    out.push_str(&format!("denied:           {}\n", evaluation.is_denied()));
    out.push_str(&format!("requires_oow:     {}\n", evaluation.requires_oow()));
    for question in evaluation.oow_questions() {
        out.push_str(&format!("  Q{} {}\n", question.id, question.question));
        for choice in &question.answers {
            out.push_str(&format!("     {}) {}\n", choice.id, choice.answer));
        }
    }
    out
}
