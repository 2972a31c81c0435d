//! The three agents, each a prompt plus one generation call.

use std::time::Duration;

use jecai_core::{CaseNumber, Extraction, Marker, extract};
use tracing::{info, warn};

use crate::gemini::{AiError, GeminiClient};
use crate::prompts::{self, Part, PetitionRequest};

/// Drafting reads every piece of evidence, so it gets a long deadline.
pub const PETITION_TIMEOUT: Duration = Duration::from_secs(600);

/// A drafted petition and the fields pulled out of it.
#[derive(Debug, Clone)]
pub struct Draft {
    pub text: String,
    pub value: Extraction,
    pub case_number: Option<CaseNumber>,
}

impl Draft {
    pub fn from_text(text: String) -> Self {
        let value = extract(&text, &Marker::value());
        let case_number = CaseNumber::find(&text);
        Self {
            text,
            value,
            case_number,
        }
    }
}

pub struct Agents {
    client: GeminiClient,
}

impl Agents {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }

    pub async fn draft_petition(&self, req: &PetitionRequest) -> Result<Draft, AiError> {
        let parts = prompts::petition_parts(req);
        info!(
            client = %req.client_name,
            evidence = req.evidence.len(),
            "drafting petition"
        );
        let generation = self
            .client
            .generate_with_timeout(&parts, PETITION_TIMEOUT)
            .await?;
        let draft = Draft::from_text(generation.text);
        if let Extraction::Missing(reason) = &draft.value {
            warn!(%reason, "petition drafted without a claim value");
        }
        Ok(draft)
    }

    pub async fn judge_profile(
        &self,
        judge: &str,
        court: &str,
        case: Option<&CaseNumber>,
    ) -> Result<String, AiError> {
        let prompt = prompts::judge_profile_prompt(judge, court, case);
        info!(judge, court, "profiling judge");
        Ok(self.client.generate(&[Part::Text(prompt)]).await?.text)
    }

    pub async fn client_message(
        &self,
        phase: &str,
        client: &str,
        hearing: Option<&str>,
    ) -> Result<String, AiError> {
        let prompt = prompts::client_message_prompt(phase, client, hearing);
        Ok(self.client.generate(&[Part::Text(prompt)]).await?.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jecai_core::MissReason;

    #[test]
    fn draft_extracts_value_and_case_number() {
        let text = "Processo relacionado 0001234-71.2024.8.26.0100.\n\
                    Dá-se à causa o valor de R$ 8.000,00.\n\
                    [[VALOR_CALCULADO: R$ 8.000,00]]"
            .to_string();
        let draft = Draft::from_text(text);
        assert_eq!(draft.value, Extraction::Found("R$ 8.000,00".into()));
        assert_eq!(
            draft.case_number.map(|n| n.to_string()).as_deref(),
            Some("0001234-71.2024.8.26.0100")
        );
    }

    #[test]
    fn draft_without_marker_reports_absence() {
        let draft = Draft::from_text("EXCELENTÍSSIMO SENHOR JUIZ...".into());
        assert_eq!(draft.value, Extraction::Missing(MissReason::MarkerAbsent));
        assert!(draft.case_number.is_none());
    }
}
