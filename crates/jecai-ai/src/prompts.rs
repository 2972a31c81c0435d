//! Prompt templates for the three agents.
//!
//! - Petition: drafts a JEC initial petition from the client's account and
//!   image/audio evidence, tagging the claim value with
//!   `[[VALOR_CALCULADO: ...]]` for [`jecai_core::extract`].
//! - Jurimetrics: sketches a judge's decision profile.
//! - Communication: short WhatsApp message telling the client what happens next.

use jecai_core::extract::{VALUE_LABEL, VALUE_PENDING};
use jecai_core::{CaseNumber, Court};

// ── Prompt templates ──

const PETITION_SYSTEM: &str = "\
Você é um Advogado Especialista em Juizados Especiais Cíveis (Lei 9.099/95).
TAREFA: Analisar as provas e redigir uma Petição Inicial completa.

ESTRUTURA OBRIGATÓRIA:
1. Endereçamento (Ao Juízo do JEC da Comarca...)
2. Qualificação das partes (Deixe campos [PREENCHER] se faltar dados)
3. DOS FATOS: Resuma o relato e descreva O QUE VOCÊ VÊ nos prints/provas (datas, valores, conversas).
4. DO DIREITO: Cite CDC, Código Civil ou Súmulas.
5. DOS PEDIDOS: Liquide os pedidos (estime valores de Dano Moral se cabível).
6. Valor da Causa.";

const EVIDENCE_HEADER: &str = "SEGUE ABAIXO AS PROVAS DOCUMENTAIS (PRINTS/FOTOS/ÁUDIOS):";

/// One piece of multimodal prompt content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    /// Raw bytes; encoded for the wire by the client.
    Inline { mime_type: String, data: Vec<u8> },
}

impl Part {
    pub fn text(s: impl Into<String>) -> Self {
        Part::Text(s.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text(s) => Some(s),
            Part::Inline { .. } => None,
        }
    }
}

/// An uploaded proof: screenshot, photo, or voice note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evidence {
    pub name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl Evidence {
    /// Build evidence from a file name, inferring the MIME type from its
    /// extension. Returns `None` for unsupported formats.
    pub fn from_file(name: &str, data: Vec<u8>) -> Option<Self> {
        let ext = name.rsplit_once('.')?.1;
        let mime_type = mime_for_extension(ext)?;
        Some(Self {
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            data,
        })
    }
}

/// MIME types accepted as evidence.
pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "mp3" => Some("audio/mp3"),
        "wav" => Some("audio/wav"),
        "ogg" | "opus" => Some("audio/ogg"),
        "m4a" => Some("audio/aac"),
        _ => None,
    }
}

/// Input for the petition agent.
#[derive(Debug, Clone, Default)]
pub struct PetitionRequest {
    pub client_name: String,
    pub court: Option<Court>,
    /// The client's own account of what happened.
    pub facts: String,
    /// Value the lawyer estimated at intake, if any.
    pub estimated_value: Option<String>,
    pub evidence: Vec<Evidence>,
}

/// Ordered content for the petition agent: instructions, facts, then
/// evidence.
pub fn petition_parts(req: &PetitionRequest) -> Vec<Part> {
    let mut instructions = format!(
        "{PETITION_SYSTEM}\n\n\
         Ao final, informe o valor da causa em uma linha isolada no formato \
         [[{VALUE_LABEL}: R$ 0.000,00]]. Se não for possível calcular, use \
         [[{VALUE_LABEL}: {VALUE_PENDING}]]."
    );
    if let Some(court) = &req.court {
        instructions.push_str(&format!("\nTribunal: {court}."));
    }

    let mut parts = vec![Part::Text(instructions)];

    let mut relato = format!("RELATO DO CLIENTE ({}): {}", req.client_name, req.facts.trim());
    if let Some(value) = &req.estimated_value {
        relato.push_str(&format!("\nVALOR ESTIMADO PELO ADVOGADO: {value}"));
    }
    parts.push(Part::Text(relato));

    if !req.evidence.is_empty() {
        parts.push(Part::text(EVIDENCE_HEADER));
        for ev in &req.evidence {
            parts.push(Part::Inline {
                mime_type: ev.mime_type.clone(),
                data: ev.data.clone(),
            });
        }
    }
    parts
}

/// Jurimetrics profile for a judge.
pub fn judge_profile_prompt(judge: &str, court: &str, case: Option<&CaseNumber>) -> String {
    let mut prompt = format!(
        "Atue como um analista de Jurimetria.\n\
         Juiz: {judge} ({court}).\n"
    );
    if let Some(n) = case {
        prompt.push_str(&format!("Processo de referência: {n}.\n"));
    }
    prompt.push_str(
        "\nBaseado em padrões comuns de julgamento, crie um perfil:\n\
         1. É \"Juiz de Lei\" (Legalista) ou \"Juiz de Equidade\" (Mais flexível)?\n\
         2. Rigor com Dano Moral (Mero aborrecimento vs Dano in re ipsa).\n\
         3. Dica estratégica para audiência com ele.",
    );
    prompt
}

/// WhatsApp message for a client after a phase change.
pub fn client_message_prompt(phase: &str, client: &str, hearing: Option<&str>) -> String {
    let mut prompt = format!(
        "Crie uma mensagem curta e empática para WhatsApp.\n\
         Destinatário: Cliente {client}.\n\
         Contexto: O processo mudou para a fase '{phase}'.\n"
    );
    if let Some(h) = hearing {
        prompt.push_str(&format!("Dados da Audiência: {h}\n"));
    }
    prompt.push_str("\nOriente o cliente sobre o próximo passo de forma simples.");
    prompt
}
