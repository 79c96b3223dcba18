//! Decision record: the strict four-key output of a decider

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CallbotError, Result};

/// Fixed intent catalog. IDs are stable: storage and dashboards key off them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    DeclareClaim,
    CheckStatus,
    MedicalDocuments,
    PaymentInfo,
    UpdateInfo,
    GeneralInfo,
    ContractCancellation,
    Complaint,
    ClaimDispute,
    LegalIssue,
    FraudReport,
    DeathClaim,
    HumanTransfer,
    /// Only produced as the safe fallback decision
    GeneralInquiry,
    Unknown,
}

impl Intent {
    /// Catalog order. Ties between intents go to the earlier one.
    pub const ALL: [Intent; 16] = [
        Intent::Greeting,
        Intent::DeclareClaim,
        Intent::CheckStatus,
        Intent::MedicalDocuments,
        Intent::PaymentInfo,
        Intent::UpdateInfo,
        Intent::GeneralInfo,
        Intent::ContractCancellation,
        Intent::Complaint,
        Intent::ClaimDispute,
        Intent::LegalIssue,
        Intent::FraudReport,
        Intent::DeathClaim,
        Intent::HumanTransfer,
        Intent::GeneralInquiry,
        Intent::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::DeclareClaim => "declare_claim",
            Self::CheckStatus => "check_status",
            Self::MedicalDocuments => "medical_documents",
            Self::PaymentInfo => "payment_info",
            Self::UpdateInfo => "update_info",
            Self::GeneralInfo => "general_info",
            Self::ContractCancellation => "contract_cancellation",
            Self::Complaint => "complaint",
            Self::ClaimDispute => "claim_dispute",
            Self::LegalIssue => "legal_issue",
            Self::FraudReport => "fraud_report",
            Self::DeathClaim => "death_claim",
            Self::HumanTransfer => "human_transfer",
            Self::GeneralInquiry => "general_inquiry",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = CallbotError;

    fn from_str(s: &str) -> Result<Self> {
        Intent::ALL
            .iter()
            .copied()
            .find(|intent| intent.as_str() == s)
            .ok_or_else(|| CallbotError::SchemaViolation(format!("intent `{s}` not in catalog")))
    }
}

/// Coarse severity derived from text
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Med,
    High,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Med => "med",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Answer automatically from the knowledge base
    RagQuery,
    /// Hand the call to a human agent
    Escalate,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RagQuery => "rag_query",
            Self::Escalate => "escalate",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-turn decision. Exactly these four keys; unknown keys are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Decision {
    pub intent: Intent,
    pub urgency: Urgency,
    pub action: Action,
    pub confidence: f64,
}

impl Decision {
    pub fn new(intent: Intent, urgency: Urgency, action: Action, confidence: f64) -> Self {
        Self {
            intent,
            urgency,
            action,
            confidence,
        }
    }

    /// Substituted when the decision engine fails mid-call
    pub fn safe_default() -> Self {
        Self::new(Intent::GeneralInquiry, Urgency::Low, Action::RagQuery, 0.5)
    }

    /// Check the range contract. Enum fields are enforced by the type system;
    /// confidence must be finite and within [0, 1].
    pub fn validate(&self) -> Result<()> {
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(CallbotError::SchemaViolation(format!(
                "confidence {} outside [0, 1]",
                self.confidence
            )));
        }
        Ok(())
    }

    /// Parse and validate a raw JSON decision (model output).
    pub fn from_json(raw: &str) -> Result<Self> {
        let decision: Decision = serde_json::from_str(raw)
            .map_err(|e| CallbotError::SchemaViolation(format!("{e} in `{raw}`")))?;
        decision.validate()?;
        Ok(decision)
    }
}
