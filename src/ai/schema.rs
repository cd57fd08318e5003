use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::AiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    fn from_value(value: &Value) -> Option<Self> {
        match value.as_str()?.trim().to_ascii_uppercase().as_str() {
            "HIGH" => Some(Confidence::High),
            "MEDIUM" => Some(Confidence::Medium),
            "LOW" => Some(Confidence::Low),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Scam,
    Risky,
    Safe,
    /// Only ever produced locally for degraded results
    Error,
}

impl Verdict {
    pub fn emoji(&self) -> &'static str {
        match self {
            Verdict::Safe => "🟢",
            Verdict::Risky => "🟡",
            Verdict::Scam => "🔴",
            Verdict::Error => "❌",
        }
    }
}

/// Model placeholders that mean "no risks" and must not be rendered as one
fn is_placeholder_risk(risk: &str) -> bool {
    let lowered = risk.trim().to_ascii_lowercase();
    lowered.is_empty()
        || lowered == "none"
        || lowered == "n/a"
        || lowered.contains("none identified")
        || lowered.contains("no risks")
        || lowered.contains("no significant risks")
}

fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

/// Model-listed risks as a set: placeholders dropped, first occurrence kept
pub(crate) fn risk_set(value: &Value) -> Vec<String> {
    let mut seen = HashSet::new();
    string_list(value)
        .into_iter()
        .filter(|r| !is_placeholder_risk(r))
        .filter(|r| seen.insert(r.trim().to_ascii_lowercase()))
        .collect()
}

fn text_of(value: &Value, default: &str) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => default.to_string(),
    }
}

fn count_of(value: &Value) -> u64 {
    value
        .as_u64()
        .or_else(|| value.as_f64().map(|f| f.max(0.0) as u64))
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .unwrap_or(0)
}

/// Token-safety reply: `{safety_score, verdict, risks, reason, confidence}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSafetyVerdict {
    pub safety_score: u8,
    pub verdict: Verdict,
    pub risks: Vec<String>,
    pub reason: String,
    pub confidence: Confidence,
}

impl TokenSafetyVerdict {
    pub fn from_value(json: &Value) -> Result<Self, AiError> {
        let verdict = match json["verdict"].as_str().map(|v| v.trim().to_ascii_uppercase()) {
            Some(v) if v == "SAFE" => Verdict::Safe,
            Some(v) if v == "RISKY" => Verdict::Risky,
            Some(v) if v == "SCAM" => Verdict::Scam,
            other => {
                return Err(AiError::Parse(format!(
                    "Unexpected verdict in safety analysis: {}",
                    other.unwrap_or_else(|| "missing".into())
                )));
            }
        };

        let score = json["safety_score"]
            .as_f64()
            .or_else(|| json["safety_score"].as_str().and_then(|s| s.trim().parse().ok()))
            .ok_or_else(|| AiError::Parse("Missing safety_score in safety analysis".into()))?;

        Ok(Self {
            safety_score: score.clamp(0.0, 100.0).round() as u8,
            verdict,
            risks: risk_set(&json["risks"]),
            reason: text_of(&json["reason"], "No reason given"),
            confidence: Confidence::from_value(&json["confidence"]).unwrap_or(Confidence::Low),
        })
    }
}

/// Wallet-activity reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletInsight {
    pub win_rate: String,
    pub total_trades: u64,
    pub profitable_trades: u64,
    pub biggest_win: String,
    pub biggest_loss: String,
    pub most_profitable_pair: String,
    pub risk_patterns: Vec<String>,
    pub recommendation: String,
    pub average_hold_time: String,
}

impl WalletInsight {
    pub fn from_value(json: &Value) -> Result<Self, AiError> {
        if json.get("recommendation").is_none() && json.get("win_rate").is_none() {
            return Err(AiError::Parse("Wallet analysis missing recommendation and win_rate".into()));
        }

        Ok(Self {
            win_rate: text_of(&json["win_rate"], "N/A"),
            total_trades: count_of(&json["total_trades"]),
            profitable_trades: count_of(&json["profitable_trades"]),
            biggest_win: text_of(&json["biggest_win"], "-"),
            biggest_loss: text_of(&json["biggest_loss"], "-"),
            most_profitable_pair: text_of(&json["most_profitable_pair"], "-"),
            risk_patterns: risk_set(&json["risk_patterns"]),
            recommendation: text_of(&json["recommendation"], "No recommendations available"),
            average_hold_time: text_of(&json["average_hold_time"], "-"),
        })
    }
}

/// Plain-language explanation of an address, transaction or token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: String,
    #[serde(rename = "keyActions", alias = "key_actions")]
    pub key_actions: Vec<String>,
    /// Empty means no concerns
    pub risks: Vec<String>,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
}

impl AnalysisResult {
    pub fn from_value(json: &Value) -> Result<Self, AiError> {
        let summary = json["summary"]
            .as_str()
            .ok_or_else(|| AiError::Parse("Explanation is missing a summary".into()))?;

        let key_actions = if json["key_actions"].is_array() {
            &json["key_actions"]
        } else {
            &json["keyActions"]
        };

        Ok(Self {
            summary: summary.to_string(),
            key_actions: string_list(key_actions),
            risks: risk_set(&json["risks"]),
            details: text_of(&json["details"], ""),
            confidence: Confidence::from_value(&json["confidence"]),
        })
    }

    /// Prose answers become a summary-only result
    pub fn from_prose(text: &str) -> Self {
        Self {
            summary: text.trim().to_string(),
            key_actions: Vec::new(),
            risks: Vec::new(),
            details: String::new(),
            confidence: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn safety_verdict_filters_placeholder_risks() {
        let verdict = TokenSafetyVerdict::from_value(&json!({
            "safety_score": 80,
            "verdict": "SAFE",
            "risks": ["None identified", "Owner can mint"],
            "reason": "ok",
            "confidence": "HIGH"
        }))
        .unwrap();
        assert_eq!(verdict.verdict, Verdict::Safe);
        assert_eq!(verdict.risks, vec!["Owner can mint".to_string()]);
        assert_eq!(verdict.confidence, Confidence::High);
    }

    #[test]
    fn repeated_risks_collapse_even_when_apart() {
        let risks = risk_set(&json!(["Owner can mint", "Honeypot", "owner can mint ", "None", "Honeypot"]));
        assert_eq!(risks, vec!["Owner can mint".to_string(), "Honeypot".to_string()]);
    }

    #[test]
    fn unknown_verdict_is_parse_error() {
        let err = TokenSafetyVerdict::from_value(&json!({"safety_score": 10, "verdict": "MAYBE"}))
            .unwrap_err();
        assert!(matches!(err, AiError::Parse(_)));
    }

    #[test]
    fn score_is_clamped() {
        let verdict = TokenSafetyVerdict::from_value(&json!({"safety_score": "140", "verdict": "risky"}))
            .unwrap();
        assert_eq!(verdict.safety_score, 100);
        assert_eq!(verdict.verdict, Verdict::Risky);
        assert_eq!(verdict.confidence, Confidence::Low);
    }

    #[test]
    fn wallet_insight_accepts_numeric_win_rate() {
        let insight = WalletInsight::from_value(&json!({
            "win_rate": 62.5,
            "total_trades": "12",
            "recommendation": "Reduce position size"
        }))
        .unwrap();
        assert_eq!(insight.win_rate, "62.5");
        assert_eq!(insight.total_trades, 12);
        assert_eq!(insight.biggest_win, "-");
    }

    #[test]
    fn explanation_accepts_either_action_spelling() {
        let result = AnalysisResult::from_value(&json!({
            "summary": "A token transfer",
            "keyActions": ["Sent 5 USDC"],
            "risks": [],
            "details": "ERC-20"
        }))
        .unwrap();
        let out = serde_json::to_value(&result).unwrap();
        assert_eq!(out["keyActions"], json!(["Sent 5 USDC"]));
        assert!(out.get("confidence").is_none());
    }
}
