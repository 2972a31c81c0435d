//! Case records as stored in the `processos` table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// State court a case is filed with.
///
/// The intake form offers the three courts the office works with most plus
/// "Outros"; anything else read back from storage is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Court {
    Tjrj,
    Tjsp,
    Tjmg,
    Outros,
    Other(String),
}

impl Court {
    /// Courts offered at intake, in display order.
    pub const INTAKE_CHOICES: [Court; 4] = [Court::Tjrj, Court::Tjsp, Court::Tjmg, Court::Outros];

    pub fn as_str(&self) -> &str {
        match self {
            Court::Tjrj => "TJRJ",
            Court::Tjsp => "TJSP",
            Court::Tjmg => "TJMG",
            Court::Outros => "Outros",
            Court::Other(s) => s,
        }
    }
}

impl fmt::Display for Court {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl From<String> for Court {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "TJRJ" => Court::Tjrj,
            "TJSP" => Court::Tjsp,
            "TJMG" => Court::Tjmg,
            "OUTROS" => Court::Outros,
            _ => Court::Other(s),
        }
    }
}

impl From<Court> for String {
    fn from(c: Court) -> Self {
        c.as_str().to_string()
    }
}

impl FromStr for Court {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Court::from(s.to_string()))
    }
}

/// Procedural phase of a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum CaseStatus {
    /// Draft petition generated, not yet filed.
    PetitionReady,
    /// Filed with the court; a CNJ number exists.
    Filed,
    HearingScheduled,
    Judged,
    Other(String),
}

impl CaseStatus {
    pub fn as_str(&self) -> &str {
        match self {
            CaseStatus::PetitionReady => "Petição Pronta",
            CaseStatus::Filed => "Protocolado",
            CaseStatus::HearingScheduled => "Audiência Marcada",
            CaseStatus::Judged => "Julgado",
            CaseStatus::Other(s) => s,
        }
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl From<String> for CaseStatus {
    fn from(s: String) -> Self {
        match s.trim() {
            "Petição Pronta" => CaseStatus::PetitionReady,
            "Protocolado" => CaseStatus::Filed,
            "Audiência Marcada" => CaseStatus::HearingScheduled,
            "Julgado" => CaseStatus::Judged,
            _ => CaseStatus::Other(s),
        }
    }
}

impl From<CaseStatus> for String {
    fn from(s: CaseStatus) -> Self {
        s.as_str().to_string()
    }
}

impl FromStr for CaseStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(CaseStatus::from(s.to_string()))
    }
}

/// Insert payload for a new case. The id is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCase {
    pub client_name: String,
    pub client_phone: String,
    pub court: Court,
    pub status: CaseStatus,
    /// History blob, either legacy `LABEL: value||...` text or a
    /// [`HistoryRecord`](crate::HistoryRecord) JSON document.
    pub history: String,
}

/// A stored case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub id: i64,
    pub client_name: String,
    pub client_phone: String,
    pub court: Court,
    pub status: CaseStatus,
    pub history: String,
}
