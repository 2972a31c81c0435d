//! Terminal rendering for case records.
//!
//! A case is shown as a vertical card grouped into client, process, and
//! history sections. The history blob is parsed; when that fails the raw
//! text is shown instead.

use std::fmt;

use jecai_core::{CaseRecord, HistoryRecord};

const LABEL_WIDTH: usize = 16;
const FACTS_PREVIEW: usize = 60;

/// Vertical card for a single case.
pub fn case_card(case: &CaseRecord) -> String {
    Card(case).to_string()
}

/// One line per case: id, client, court, status, value.
pub fn case_table(cases: &[CaseRecord]) -> String {
    Table(cases).to_string()
}

struct Card<'a>(&'a CaseRecord);

impl fmt::Display for Card<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let case = self.0;
        writeln!(f, "=== #{} {} ===", case.id, case.client_name)?;
        writeln!(f)?;

        section(
            f,
            "Cliente",
            &[("nome", case.client_name.as_str()), ("telefone", case.client_phone.as_str())],
        )?;
        section(
            f,
            "Processo",
            &[("tribunal", case.court.as_str()), ("status", case.status.as_str())],
        )?;

        writeln!(f, "Histórico")?;
        match HistoryRecord::parse(&case.history) {
            Ok(history) => {
                field(f, "relato", &history.facts)?;
                field(f, "valor", history.display_value())?;
                if let Some(at) = history.recorded_at {
                    field(f, "registrado", &at.format("%d/%m/%Y %H:%M").to_string())?;
                }
                if !history.flags.is_empty() {
                    field(f, "sinalizações", &history.flags.join(", "))?;
                }
                for event in &history.events {
                    writeln!(f, "  {}  {}", event.at.format("%d/%m/%Y %H:%M"), event.note)?;
                }
            }
            Err(e) => {
                field(f, "erro", &e.to_string())?;
                field(f, "bruto", &case.history)?;
            }
        }
        Ok(())
    }
}

struct Table<'a>(&'a [CaseRecord]);

impl fmt::Display for Table<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>5}  {:<24} {:<8} {:<18} {}",
            "id", "cliente", "tribunal", "status", "valor"
        )?;
        for case in self.0 {
            let value = HistoryRecord::parse(&case.history)
                .map(|h| h.display_value().to_string())
                .unwrap_or_else(|_| "?".to_string());
            writeln!(
                f,
                "{:>5}  {:<24} {:<8} {:<18} {}",
                case.id,
                truncate(&case.client_name, 24),
                case.court,
                case.status,
                value
            )?;
        }
        Ok(())
    }
}

fn section(f: &mut fmt::Formatter<'_>, header: &str, fields: &[(&str, &str)]) -> fmt::Result {
    if fields.iter().all(|(_, v)| v.is_empty()) {
        return Ok(());
    }
    writeln!(f, "{header}")?;
    for (label, value) in fields {
        field(f, label, value)?;
    }
    writeln!(f)
}

fn field(f: &mut fmt::Formatter<'_>, label: &str, value: &str) -> fmt::Result {
    if value.is_empty() {
        return Ok(());
    }
    let value = if label == "relato" {
        truncate(value, FACTS_PREVIEW)
    } else {
        value.to_string()
    };
    writeln!(f, "  {label:<LABEL_WIDTH$} {value}")
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let cut: String = s.chars().take(max.saturating_sub(1)).collect();
    format!("{cut}…")
}
