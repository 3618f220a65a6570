use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Api,
    Ui,
}

/// A keyword lot with its parsed amount.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    /// Announcement id (API) or nearby title (UI).
    pub edital: Option<String>,
    pub lote: Option<String>,
    pub valor: f64,
    pub raw: String,
    pub source: Origin,
}

pub fn total(findings: &[Finding]) -> f64 {
    findings.iter().map(|f| f.valor).sum()
}
