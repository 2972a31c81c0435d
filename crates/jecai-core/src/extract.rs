//! Field extraction from generated text.
//!
//! Drafting prompts ask the model to tag machine-readable values with a
//! bracketed sentinel such as `[[VALOR_CALCULADO: R$ 1.234,56]]`. Court
//! process numbers are located by their fixed CNJ shape instead. Both are
//! best-effort: the model may omit the tag, leave it empty, or fill it with a
//! placeholder, and [`Extraction`] keeps those cases apart.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::CoreError;
use crate::cnj;

/// Sentinel label carrying the computed claim value.
pub const VALUE_LABEL: &str = "VALOR_CALCULADO";

/// Shown while a value has not been computed.
pub const VALUE_PENDING: &str = "A Calcular";
/// Shown when the value lives behind an external link.
pub const SEE_LINK: &str = "Ver no Link";
/// Shown while a profile or value is still being reviewed.
pub const UNDER_REVIEW: &str = "Sob Análise";

/// Payloads the model uses to say "no value" instead of omitting the tag.
pub const PLACEHOLDERS: [&str; 3] = [VALUE_PENDING, SEE_LINK, UNDER_REVIEW];

static VALUE_SENTINEL: LazyLock<Regex> =
    LazyLock::new(|| sentinel_regex(VALUE_LABEL).expect("value sentinel regex is valid"));

/// What to look for in a block of text.
#[derive(Debug, Clone)]
pub enum Marker {
    /// `[[LABEL: payload]]`
    Sentinel { label: String, re: Regex },
    /// `NNNNNNN-DD.AAAA.J.TR.OOOO`
    CaseNumber,
}

impl Marker {
    /// Sentinel marker for an arbitrary label.
    ///
    /// Labels are matched literally and may contain letters, digits,
    /// underscores and spaces.
    pub fn sentinel(label: &str) -> Result<Self, CoreError> {
        let label = label.trim();
        let valid = !label.is_empty()
            && label
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == ' ');
        if !valid {
            return Err(CoreError::InvalidLabel(label.to_string()));
        }
        let re = sentinel_regex(label).map_err(|_| CoreError::InvalidLabel(label.to_string()))?;
        Ok(Marker::Sentinel {
            label: label.to_string(),
            re,
        })
    }

    /// The `[[VALOR_CALCULADO: ...]]` marker used by the petition agent.
    pub fn value() -> Self {
        Marker::Sentinel {
            label: VALUE_LABEL.to_string(),
            re: VALUE_SENTINEL.clone(),
        }
    }

    fn first_payload<'t>(&self, text: &'t str) -> Option<&'t str> {
        match self {
            Marker::Sentinel { re, .. } => re
                .captures(text)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim()),
            Marker::CaseNumber => cnj::PATTERN.find(text).map(|m| m.as_str()),
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Marker::Sentinel { label, .. } => write!(f, "[[{label}: ...]]"),
            Marker::CaseNumber => f.write_str("CNJ case number"),
        }
    }
}

fn sentinel_regex(label: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"(?s)\[\[\s*{}\s*:\s*(.*?)\s*\]\]",
        regex::escape(label)
    ))
}

/// Why an extraction came back empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissReason {
    /// The text contains no marker at all.
    MarkerAbsent,
    /// The marker is present with nothing inside.
    EmptyPayload,
    /// The marker carries a "no value" placeholder such as `A Calcular`.
    Placeholder(String),
}

impl fmt::Display for MissReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissReason::MarkerAbsent => f.write_str("marker absent"),
            MissReason::EmptyPayload => f.write_str("empty payload"),
            MissReason::Placeholder(p) => write!(f, "placeholder {p:?}"),
        }
    }
}

/// Outcome of looking for a marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Found(String),
    Missing(MissReason),
}

impl Extraction {
    pub fn is_found(&self) -> bool {
        matches!(self, Extraction::Found(_))
    }

    pub fn into_option(self) -> Option<String> {
        match self {
            Extraction::Found(v) => Some(v),
            Extraction::Missing(_) => None,
        }
    }

    /// Collapse to a display string, substituting `fallback` for any miss.
    pub fn or(self, fallback: &str) -> String {
        self.into_option().unwrap_or_else(|| fallback.to_string())
    }
}

/// Find the first occurrence of `marker` in `text` and classify it.
pub fn extract(text: &str, marker: &Marker) -> Extraction {
    let outcome = match marker.first_payload(text) {
        None => Extraction::Missing(MissReason::MarkerAbsent),
        Some("") => Extraction::Missing(MissReason::EmptyPayload),
        Some(p) => match PLACEHOLDERS.iter().find(|ph| p.eq_ignore_ascii_case(ph)) {
            Some(ph) => Extraction::Missing(MissReason::Placeholder(ph.to_string())),
            None => Extraction::Found(p.to_string()),
        },
    };
    if let Extraction::Missing(reason) = &outcome {
        debug!(%marker, %reason, "no value extracted");
    }
    outcome
}

/// First payload of `marker` in `text` as written, or `fallback` when the
/// marker does not occur. Never fails.
pub fn extract_or(text: &str, marker: &Marker, fallback: &str) -> String {
    marker
        .first_payload(text)
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_sentinel_returns_payload() {
        let text = "DOS PEDIDOS\n...\n[[VALOR_CALCULADO: R$ 1.234,56]]\nTermos em que pede deferimento.";
        assert_eq!(
            extract(text, &Marker::value()),
            Extraction::Found("R$ 1.234,56".into())
        );
        assert_eq!(extract_or(text, &Marker::value(), VALUE_PENDING), "R$ 1.234,56");
    }

    #[test]
    fn missing_sentinel_uses_fallback() {
        let text = "Petição sem valor marcado.";
        assert_eq!(extract_or(text, &Marker::value(), VALUE_PENDING), "A Calcular");
        assert_eq!(
            extract(text, &Marker::value()),
            Extraction::Missing(MissReason::MarkerAbsent)
        );
    }

    #[test]
    fn first_sentinel_wins() {
        let text = "[[VALOR_CALCULADO: R$ 10,00]] e depois [[VALOR_CALCULADO: R$ 20,00]]";
        assert_eq!(extract_or(text, &Marker::value(), "-"), "R$ 10,00");
    }

    #[test]
    fn whitespace_around_label_and_payload_is_tolerated() {
        let text = "[[ VALOR_CALCULADO :   R$ 5.000,00  ]]";
        assert_eq!(
            extract(text, &Marker::value()).into_option().as_deref(),
            Some("R$ 5.000,00")
        );
    }

    #[test]
    fn placeholder_is_distinguished_from_absence() {
        let text = "[[VALOR_CALCULADO: A Calcular]]";
        assert_eq!(
            extract(text, &Marker::value()),
            Extraction::Missing(MissReason::Placeholder("A Calcular".into()))
        );
        // The legacy form hands back the payload as written.
        assert_eq!(extract_or(text, &Marker::value(), "-"), "A Calcular");
    }

    #[test]
    fn empty_payload_is_reported() {
        let text = "[[VALOR_CALCULADO: ]]";
        assert_eq!(
            extract(text, &Marker::value()),
            Extraction::Missing(MissReason::EmptyPayload)
        );
    }

    #[test]
    fn payload_is_opaque_text() {
        let text = "[[VALOR_CALCULADO: cerca de dez mil reais]]";
        assert_eq!(
            extract(text, &Marker::value()).or(VALUE_PENDING),
            "cerca de dez mil reais"
        );
    }

    #[test]
    fn custom_label_is_matched_literally() {
        let marker = Marker::sentinel("DANO_MORAL").unwrap();
        let text = "[[VALOR_CALCULADO: R$ 1,00]] [[DANO_MORAL: R$ 8.000,00]]";
        assert_eq!(extract_or(text, &marker, "-"), "R$ 8.000,00");
    }

    #[test]
    fn invalid_labels_are_rejected() {
        assert!(matches!(
            Marker::sentinel(""),
            Err(CoreError::InvalidLabel(_))
        ));
        assert!(matches!(
            Marker::sentinel("A]]B"),
            Err(CoreError::InvalidLabel(_))
        ));
    }

    #[test]
    fn case_number_is_found_inside_prose() {
        let text = "autos 0001234-56.2024.8.26.0100 julgou";
        assert_eq!(
            extract_or(text, &Marker::CaseNumber, SEE_LINK),
            "0001234-56.2024.8.26.0100"
        );
    }

    #[test]
    fn case_number_absent_falls_back() {
        let text = "processo ainda não distribuído";
        assert_eq!(extract_or(text, &Marker::CaseNumber, SEE_LINK), "Ver no Link");
    }

    #[test]
    fn case_number_needs_exact_group_widths() {
        let text = "número 001234-56.2024.8.26.0100 incompleto";
        assert!(!extract(text, &Marker::CaseNumber).is_found());
    }

    #[test]
    fn case_number_ignores_non_ascii_digits() {
        let text = "autos ٠٠٠١٢٣٤-٥٦.٢٠٢٤.٨.٢٦.٠١٠٠ e 0001234-71.2024.8.26.0100";
        assert_eq!(
            extract(text, &Marker::CaseNumber),
            Extraction::Found("0001234-71.2024.8.26.0100".into())
        );
        let fullwidth = "autos ０００１２３４-７１.２０２４.８.２６.０１００";
        assert!(!extract(fullwidth, &Marker::CaseNumber).is_found());
    }
}
