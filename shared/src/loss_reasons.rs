//! Catalog of reasons a trader can tag on a losing trade.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LossReason {
    pub value: &'static str,
    pub emoji: &'static str,
    pub label: &'static str,
}

pub const LOSS_REASONS: &[LossReason] = &[
    LossReason { value: "crt_contre_crt_htf", emoji: "📊", label: "CRT Contre crt htf" },
    LossReason { value: "contre_sma", emoji: "📈", label: "Contre sma" },
    LossReason { value: "pas_extremite", emoji: "📍", label: "Pas extrémité" },
    LossReason { value: "erreur_psychologique", emoji: "🧠", label: "Erreur psychologique (fomo / panic)" },
    LossReason { value: "stop_loss_trop_serre", emoji: "⚠️", label: "Stop loss trop serré" },
    LossReason { value: "manip_sans_fvg", emoji: "🔄", label: "Manip sans fvg" },
    LossReason { value: "faible_itmss", emoji: "📉", label: "Faible ITMSS" },
];

/// Bucket key for losses carrying no reason.
pub const UNSPECIFIED: &str = "unspecified";

pub fn find_loss_reason(value: &str) -> Option<&'static LossReason> {
    LOSS_REASONS.iter().find(|r| r.value == value)
}

/// `"<emoji> <label>"` for known reasons, the raw value otherwise.
pub fn loss_reason_label(value: &str) -> String {
    if value == UNSPECIFIED {
        return "Non renseigné".to_string();
    }
    match find_loss_reason(value) {
        Some(reason) => format!("{} {}", reason.emoji, reason.label),
        None => value.to_string(),
    }
}
