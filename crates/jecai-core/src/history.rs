//! Case history: the `historico` column.
//!
//! Older rows pack several fields into one string, `LABEL: value` segments
//! joined by `||`, with no escaping and no version marker. [`encode`] and
//! [`decode`] keep that format readable and writable. New rows are written
//! as a versioned [`HistoryRecord`] JSON document, and [`HistoryRecord::parse`]
//! accepts either form.

use chrono::{Local, NaiveDate, NaiveDateTime, SubsecRound};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::CoreError;
use crate::extract::{Extraction, MissReason, PLACEHOLDERS, VALUE_PENDING};

pub const SEPARATOR: &str = "||";

/// Segment labels used in legacy blobs.
pub mod labels {
    pub const FATOS: &str = "FATOS";
    pub const RELATO_FATOS: &str = "RELATO_FATOS";
    pub const VALOR: &str = "VALOR";
    pub const DATA: &str = "DATA";
    pub const FLAGS: &str = "FLAGS";
}

/// Flag set when the drafted petition carried no value marker at all.
pub const FLAG_VALUE_MISSING: &str = "VALOR_AUSENTE";
/// Flag set when the model explicitly left the value to be computed.
pub const FLAG_VALUE_DEFERRED: &str = "VALOR_A_CALCULAR";

const LEGACY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Join `label: value` segments with [`SEPARATOR`].
///
/// Values are written as-is. A value containing the separator or another
/// `LABEL:` will not decode back to itself.
pub fn encode<L: AsRef<str>, V: AsRef<str>>(fields: &[(L, V)]) -> String {
    fields
        .iter()
        .map(|(label, value)| format!("{}: {}", label.as_ref(), value.as_ref()))
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

/// Text after the first `label:` up to the next separator, trimmed.
///
/// This is a plain substring search: `FATOS` also matches inside
/// `RELATO_FATOS:`. Use [`HistoryRecord::parse`] for segment-exact reads.
pub fn lookup<'a>(blob: &'a str, label: &str) -> Option<&'a str> {
    let key = format!("{label}:");
    let start = blob.find(&key)? + key.len();
    let rest = &blob[start..];
    let end = rest.find(SEPARATOR).unwrap_or(rest.len());
    Some(rest[..end].trim())
}

/// Like [`lookup`], returning the whole blob when the label is absent.
pub fn decode<'a>(blob: &'a str, label: &str) -> &'a str {
    lookup(blob, label).unwrap_or(blob)
}

/// Like [`lookup`], returning `fallback` when the label is absent.
pub fn decode_or<'a>(blob: &'a str, label: &str, fallback: &'a str) -> &'a str {
    lookup(blob, label).unwrap_or(fallback)
}

pub const CURRENT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub at: NaiveDateTime,
    pub note: String,
}

/// Structured case history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub version: u32,
    /// The client's original account of the facts.
    #[serde(default)]
    pub facts: String,
    /// Claim value as drafted, e.g. `R$ 1.234,56`. `None` until computed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub events: Vec<HistoryEvent>,
    #[serde(default)]
    pub flags: Vec<String>,
}

impl Default for HistoryRecord {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            facts: String::new(),
            value: None,
            recorded_at: None,
            events: Vec::new(),
            flags: Vec::new(),
        }
    }
}

impl HistoryRecord {
    pub fn new(facts: impl Into<String>) -> Self {
        Self {
            facts: facts.into(),
            recorded_at: Some(now()),
            ..Self::default()
        }
    }

    /// Read a stored blob in either the JSON or the legacy form.
    pub fn parse(blob: &str) -> Result<Self, CoreError> {
        if blob.trim_start().starts_with('{') {
            let record: Self = serde_json::from_str(blob)?;
            if record.version > CURRENT_VERSION {
                return Err(CoreError::UnsupportedVersion(record.version));
            }
            return Ok(record);
        }
        Ok(Self::parse_legacy(blob))
    }

    /// Segment-exact reading of a `LABEL: value||...` blob.
    ///
    /// `RELATO_FATOS` takes precedence over `FATOS`. Segments that start with
    /// a timestamp become events. Unlabelled text is appended to the facts.
    pub fn parse_legacy(blob: &str) -> Self {
        let mut record = Self::default();
        let mut relato: Option<String> = None;
        let mut fatos: Option<String> = None;
        let mut loose: Vec<&str> = Vec::new();

        for segment in blob.split(SEPARATOR).map(str::trim) {
            if segment.is_empty() {
                continue;
            }
            if let Some(event) = parse_event(segment) {
                record.events.push(event);
                continue;
            }
            let Some((label, value)) = segment.split_once(':') else {
                loose.push(segment);
                continue;
            };
            let value = value.trim();
            match label.trim() {
                labels::RELATO_FATOS => {
                    relato.get_or_insert_with(|| value.to_string());
                }
                labels::FATOS => {
                    fatos.get_or_insert_with(|| value.to_string());
                }
                labels::VALOR => {
                    if record.value.is_none() && !is_placeholder(value) && !value.is_empty() {
                        record.value = Some(value.to_string());
                    }
                }
                labels::DATA => match parse_timestamp(value) {
                    Some(at) => record.recorded_at = Some(at),
                    None => warn!(value, "unreadable DATA segment in history"),
                },
                labels::FLAGS => record.flags.extend(
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|f| !f.is_empty())
                        .map(str::to_string),
                ),
                _ => loose.push(segment),
            }
        }

        let mut facts = relato.or(fatos).unwrap_or_default();
        for text in loose {
            if !facts.is_empty() {
                facts.push('\n');
            }
            facts.push_str(text);
        }
        record.facts = facts;
        record
    }

    /// Record the outcome of value extraction from a drafted petition.
    pub fn set_value(&mut self, extraction: &Extraction) {
        self.flags
            .retain(|f| f != FLAG_VALUE_MISSING && f != FLAG_VALUE_DEFERRED);
        match extraction {
            Extraction::Found(v) => self.value = Some(v.clone()),
            Extraction::Missing(reason) => {
                self.value = None;
                let flag = match reason {
                    MissReason::Placeholder(_) => FLAG_VALUE_DEFERRED,
                    MissReason::MarkerAbsent | MissReason::EmptyPayload => FLAG_VALUE_MISSING,
                };
                self.flags.push(flag.to_string());
            }
        }
    }

    pub fn push_event(&mut self, note: impl Into<String>) {
        self.push_event_at(now(), note);
    }

    pub fn push_event_at(&mut self, at: NaiveDateTime, note: impl Into<String>) {
        self.events.push(HistoryEvent {
            at,
            note: note.into(),
        });
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }

    /// Value for display, `A Calcular` when not computed.
    pub fn display_value(&self) -> &str {
        self.value.as_deref().unwrap_or(VALUE_PENDING)
    }

    /// Versioned JSON form written to the `historico` column.
    pub fn to_blob(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Legacy `LABEL: value||...` form.
    pub fn to_legacy(&self) -> String {
        let mut fields: Vec<(String, String)> = vec![
            (labels::RELATO_FATOS.into(), self.facts.clone()),
            (labels::VALOR.into(), self.display_value().to_string()),
        ];
        if let Some(at) = self.recorded_at {
            fields.push((
                labels::DATA.into(),
                at.format(LEGACY_TIME_FORMAT).to_string(),
            ));
        }
        if !self.flags.is_empty() {
            fields.push((labels::FLAGS.into(), self.flags.join(",")));
        }
        for event in &self.events {
            fields.push((
                event.at.format(LEGACY_TIME_FORMAT).to_string(),
                event.note.clone(),
            ));
        }
        encode(&fields)
    }
}

/// Local wall-clock time at microsecond precision.
fn now() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(6)
}

fn is_placeholder(value: &str) -> bool {
    PLACEHOLDERS.iter().any(|p| value.eq_ignore_ascii_case(p))
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%d/%m/%Y %H:%M:%S", "%d/%m/%Y %H:%M"] {
        if let Ok(at) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(at);
        }
    }
    for fmt in ["%Y-%m-%d", "%d/%m/%Y"] {
        if let Ok(day) = NaiveDate::parse_from_str(s, fmt) {
            return day.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// `2024-05-01 14:03:22.123456: Petição gerada via IA.`
fn parse_event(segment: &str) -> Option<HistoryEvent> {
    let (head, note) = segment.split_once(": ")?;
    let at = parse_timestamp(head)?;
    Some(HistoryEvent {
        at,
        note: note.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn encode_joins_segments() {
        let blob = encode(&[("FATOS", "voo cancelado"), ("VALOR", "R$ 3.000,00")]);
        assert_eq!(blob, "FATOS: voo cancelado||VALOR: R$ 3.000,00");
    }

    #[test]
    fn decode_reads_back_encoded_fields() {
        let blob = encode(&[("FATOS", "x"), ("VALOR", "y")]);
        assert_eq!(decode(&blob, "VALOR"), "y");
        assert_eq!(decode(&blob, "FATOS"), "x");
    }

    #[test]
    fn decode_absent_label_returns_whole_blob() {
        let blob = "2024-05-01 14:03:22.123456: Petição gerada via IA.";
        assert_eq!(decode(blob, "FATOS"), blob);
        assert_eq!(decode_or(blob, "FATOS", "Sem relato"), "Sem relato");
        assert_eq!(lookup(blob, "FATOS"), None);
    }

    #[test]
    fn decode_matches_substrings() {
        let blob = "RELATO_FATOS: a||FATOS: b";
        // First occurrence of "FATOS:" is inside RELATO_FATOS.
        assert_eq!(decode(blob, "FATOS"), "a");
    }

    #[test]
    fn separator_inside_value_truncates() {
        let blob = encode(&[("FATOS", "a||b"), ("VALOR", "y")]);
        assert_eq!(decode(&blob, "FATOS"), "a");
    }

    #[test]
    fn legacy_parse_prefers_relato() {
        let record = HistoryRecord::parse("FATOS: curto||RELATO_FATOS: completo||VALOR: R$ 10,00").unwrap();
        assert_eq!(record.facts, "completo");
        assert_eq!(record.value.as_deref(), Some("R$ 10,00"));
    }

    #[test]
    fn legacy_parse_basic_blob() {
        let record = HistoryRecord::parse("FATOS: a||VALOR: R$ 10,00").unwrap();
        assert_eq!(record.facts, "a");
        assert_eq!(record.value.as_deref(), Some("R$ 10,00"));
        assert_eq!(record.version, CURRENT_VERSION);
    }

    #[test]
    fn legacy_placeholder_value_is_none() {
        let record = HistoryRecord::parse("FATOS: a||VALOR: A Calcular").unwrap();
        assert_eq!(record.value, None);
        assert_eq!(record.display_value(), "A Calcular");
    }

    #[test]
    fn legacy_timestamp_line_becomes_event() {
        let record =
            HistoryRecord::parse("2024-05-01 14:03:22.123456: Petição gerada via IA.").unwrap();
        assert!(record.facts.is_empty());
        assert_eq!(record.events.len(), 1);
        assert_eq!(record.events[0].note, "Petição gerada via IA.");
        assert_eq!(
            record.events[0].at.format("%Y-%m-%d %H:%M:%S").to_string(),
            "2024-05-01 14:03:22"
        );
    }

    #[test]
    fn legacy_flags_and_date() {
        let record =
            HistoryRecord::parse("FATOS: a||DATA: 01/05/2024 09:30||FLAGS: urgente, idoso").unwrap();
        assert_eq!(record.recorded_at, Some(at("2024-05-01 09:30:00")));
        assert_eq!(record.flags, vec!["urgente", "idoso"]);
    }

    #[test]
    fn unlabelled_text_is_kept_as_facts() {
        let record = HistoryRecord::parse("Cliente relatou cobrança indevida").unwrap();
        assert_eq!(record.facts, "Cliente relatou cobrança indevida");
    }

    #[test]
    fn json_blob_round_trips() {
        let mut record = HistoryRecord::new("voo cancelado sem aviso");
        record.set_value(&Extraction::Found("R$ 5.000,00".into()));
        record.push_event_at(at("2024-05-01 14:03:22"), "Petição gerada via IA.");

        let blob = record.to_blob().unwrap();
        assert!(blob.contains("\"version\":1"));
        assert_eq!(HistoryRecord::parse(&blob).unwrap(), record);
    }

    #[test]
    fn future_version_is_rejected() {
        let blob = r#"{"version": 9, "facts": "x"}"#;
        assert!(matches!(
            HistoryRecord::parse(blob),
            Err(CoreError::UnsupportedVersion(9))
        ));
    }

    #[test]
    fn broken_json_is_an_error() {
        assert!(matches!(
            HistoryRecord::parse("{not json"),
            Err(CoreError::HistoryJson(_))
        ));
    }

    #[test]
    fn set_value_flags_distinguish_misses() {
        let mut record = HistoryRecord::default();
        record.set_value(&Extraction::Missing(MissReason::MarkerAbsent));
        assert!(record.has_flag(FLAG_VALUE_MISSING));

        record.set_value(&Extraction::Missing(MissReason::Placeholder("A Calcular".into())));
        assert!(record.has_flag(FLAG_VALUE_DEFERRED));
        assert!(!record.has_flag(FLAG_VALUE_MISSING));

        record.set_value(&Extraction::Found("R$ 1,00".into()));
        assert!(record.flags.is_empty());
        assert_eq!(record.display_value(), "R$ 1,00");
    }

    #[test]
    fn legacy_form_parses_back() {
        let mut record = HistoryRecord {
            facts: "compra não entregue".into(),
            value: Some("R$ 2.500,00".into()),
            recorded_at: Some(at("2024-03-10 08:00:00")),
            ..HistoryRecord::default()
        };
        record.flags.push("urgente".into());
        record.push_event_at(at("2024-03-10 08:05:00"), "Petição gerada via IA.");

        let legacy = record.to_legacy();
        assert_eq!(decode(&legacy, labels::VALOR), "R$ 2.500,00");
        assert_eq!(HistoryRecord::parse_legacy(&legacy), record);
    }

    #[test]
    fn legacy_form_keeps_microseconds() {
        let mut record = HistoryRecord::new("cobrança em duplicidade");
        record.push_event("Petição gerada via IA.");
        record.push_event_at(
            NaiveDateTime::parse_from_str("2024-03-10 08:05:00.590717", "%Y-%m-%d %H:%M:%S%.f")
                .unwrap(),
            "Status alterado para Protocolado.",
        );

        let legacy = record.to_legacy();
        assert!(legacy.contains("2024-03-10 08:05:00.590717: Status alterado"));
        let back = HistoryRecord::parse_legacy(&legacy);
        assert_eq!(back.recorded_at, record.recorded_at);
        assert_eq!(back.events, record.events);
    }
}
