//! Keyword catalog: intent, urgency and sensitive-term tables
//!
//! The catalog is plain data. `CatalogSource` is what gets serialized (and can
//! be loaded from TOML to replace the built-in French tables); `KeywordCatalog`
//! is the compiled, immutable form injected into the classifier and the
//! override layer.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::error::{CallbotError, Result};
use crate::types::Intent;

lazy_static! {
    static ref FRENCH_INSURANCE: Arc<KeywordCatalog> = Arc::new(
        KeywordCatalog::compile(&CatalogSource::french_insurance())
            .expect("built-in catalog patterns are valid")
    );
}

/// Patterns for one intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentPatterns {
    pub intent: Intent,
    pub patterns: Vec<String>,
}

/// Uncompiled catalog tables. Intent order is catalog order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSource {
    pub urgency_high: Vec<String>,
    pub urgency_med: Vec<String>,
    /// Substring-matched, first match in list order wins
    pub sensitive_keywords: Vec<String>,
    /// Words that prove a transcript is not ASR garbage
    pub vocabulary: Vec<String>,
    pub intents: Vec<IntentPatterns>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn intent(intent: Intent, patterns: &[&str]) -> IntentPatterns {
    IntentPatterns {
        intent,
        patterns: strings(patterns),
    }
}

impl CatalogSource {
    /// Built-in French insurance tables (ASR-tolerant, lowercase input)
    pub fn french_insurance() -> Self {
        Self {
            intents: vec![
                intent(
                    Intent::Greeting,
                    &[
                        r"\b(bonjour|bonsoir|salut|coucou)\b",
                        r"\b(allô|allo|hello|hi)\b",
                        r"\bje m'appelle\b",
                    ],
                ),
                intent(
                    Intent::DeclareClaim,
                    &[
                        r"(déclar|declar|signal)\w*\s+(un |une |le |la |mon |ma )?(sinistre|accident|dommage|problème)",
                        r"\bj'ai (eu|fait) (un|une)\s+(accident|chute|brûlure|coupure)",
                        r"(ouvrir|créer|enregistrer) (un )?dossier",
                        r"\bsinistre\b",
                        r"\baccident\b",
                    ],
                ),
                intent(
                    Intent::CheckStatus,
                    &[
                        r"(suivi|statut|état|avancement)\s+(de |du )?(mon |ma )?(dossier|demande|sinistre)",
                        r"\bo[ùu] en est\b",
                        r"\b(numéro|num) (de )?(dossier|référence)",
                        r"(quand|combien de temps|délai)\b.*\b(règlement|indemnisation|remboursement)",
                    ],
                ),
                intent(
                    Intent::MedicalDocuments,
                    &[
                        r"\b(certificat|arrêt) (médical|de travail)",
                        r"\b(facture|rapport|compte rendu) médical",
                        r"\b(quels?|quelles?)\s+(pièces?|documents?|papiers?)",
                        r"\b(j'ai envoyé|je dois envoyer)\b",
                    ],
                ),
                intent(
                    Intent::PaymentInfo,
                    &[
                        r"\b(indemnisation|virement|paiement|versement)\b",
                        r"\b(rib|iban)\b",
                        r"\bmon argent\b",
                        r"\bremboursements?\b",
                    ],
                ),
                intent(
                    Intent::UpdateInfo,
                    &[
                        r"(modifier|changer|mettre à jour)\s+(mon |ma |mes |l')?(adresse|coordonnées|téléphone|informations?|rib|email)",
                        r"\b(nouvelle adresse|déménag\w*)",
                    ],
                ),
                intent(
                    Intent::GeneralInfo,
                    &[
                        r"\b(garanties?|contrats?|couvertures?)\b",
                        r"(qu'est-ce qui est couvert|est-ce que ça couvre)",
                        r"\b(bénéficiaire|qui est couvert)\b",
                        r"\b(espace client|horaires?|comment (faire|accéder))\b",
                    ],
                ),
                intent(
                    Intent::ContractCancellation,
                    &[
                        r"\b(résilier|résiliation)\b",
                        r"\b(annuler|arrêter) (mon |le |ma )?(contrat|assurance)",
                        r"\bpréavis\b",
                    ],
                ),
                intent(
                    Intent::Complaint,
                    &[
                        r"\b(réclamation|mécontent\w*|inadmissible|scandale)\b",
                        r"(pas d'accord|pas normal|pas reçu|ça fait longtemps)",
                        r"\b(en colère|furieux|furieuse)\b",
                    ],
                ),
                intent(
                    Intent::ClaimDispute,
                    &[
                        r"\b(contester|contestation|litige|recours)\b",
                        r"\brefus\w*\b.*\b(dossier|indemnisation|sinistre|prise en charge)",
                    ],
                ),
                intent(
                    Intent::LegalIssue,
                    &[
                        r"\b(avocats?|tribunal|procès|justice|juridique)\b",
                        r"\b(porter plainte|plainte)\b",
                        r"\bmise en demeure\b",
                    ],
                ),
                intent(
                    Intent::FraudReport,
                    &[
                        r"\b(fraudes?|frauduleu\w*|escroquerie|arnaque)\b",
                        r"\b(usurpation|vol d'identité)\b",
                        r"\bquelqu'un a utilisé\b",
                    ],
                ),
                intent(
                    Intent::DeathClaim,
                    &[
                        r"\b(décès|deces|décédé\w*|decede\w*|mort|défunt\w*)\b",
                        r"\b(obsèques|obseques|succession)\b",
                    ],
                ),
                intent(
                    Intent::HumanTransfer,
                    &[
                        r"\b(conseiller|conseillère|humain|opérateur|responsable)\b",
                        r"\b(parler à|parler a|transférer|transferer)\b",
                    ],
                ),
            ],
            urgency_high: strings(&[
                r"\b(urgent|urgente|urgence)\b",
                r"\b(hôpital|hopital|hospitalisée?|hospitalisation)\b",
                r"\bambulance\b",
                r"\bperte de connaissance\b",
                r"\bsang\b",
                r"\bgrave\b",
                r"\bfractures?\b",
                r"\b(chirurgie|opération)\b",
                r"\bincapacité permanente\b",
                r"\bipc\b",
                r"\b(prothèse|amputation)\b",
                r"\bsoins intensifs\b",
                r"\b(coma|samu|inconsciente?)\b",
            ]),
            urgency_med: strings(&[
                r"\bdouleurs?\b",
                r"\b(blessure|blessée?)\b",
                r"\bchute\b",
                r"\baccident\b",
                r"\barrêt de travail\b",
                r"\btraumatisme\b",
                r"\b(coupure|brûlure|contusion|entorse|plaie)\b",
                r"\b(consultation|médecin)\b",
                r"\bplâtre\b",
            ]),
            sensitive_keywords: strings(&[
                "avocat",
                "plainte",
                "tribunal",
                "fraude",
                "escroquerie",
                "décès",
                "décédé",
                "deces",
                "decede",
                "suicide",
                "urgence",
                "ambulance",
                "samu",
                "mise en demeure",
            ]),
            vocabulary: strings(&[
                // greetings and courtesy
                "bonjour", "bonsoir", "salut", "allo", "allô", "hello", "merci", "revoir",
                // yes / no
                "oui", "non", "ok", "okay", "d'accord", "daccord", "bien", "parfait",
                // insurance terms
                "assurance", "contrat", "sinistre", "accident", "dossier", "remboursement",
                "indemnisation", "paiement", "garantie", "adresse", "conseiller", "aide",
                "question", "police", "prime", "santé", "médecin", "hôpital",
            ]),
        }
    }

    /// Load a catalog from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| CallbotError::Config(format!("{}: {e}", path.display())))?;
        Ok(toml::from_str(&raw)?)
    }
}

/// Compiled catalog. Immutable once built; share it through `Arc`.
#[derive(Debug)]
pub struct KeywordCatalog {
    intents: Vec<(Intent, Vec<Regex>)>,
    urgency_high: Vec<Regex>,
    urgency_med: Vec<Regex>,
    sensitive_keywords: Vec<String>,
    vocabulary: Vec<String>,
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|source| CallbotError::InvalidPattern {
                pattern: p.clone(),
                source,
            })
        })
        .collect()
}

impl KeywordCatalog {
    pub fn compile(source: &CatalogSource) -> Result<Self> {
        let intents = source
            .intents
            .iter()
            .map(|entry| Ok((entry.intent, compile_all(&entry.patterns)?)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            intents,
            urgency_high: compile_all(&source.urgency_high)?,
            urgency_med: compile_all(&source.urgency_med)?,
            sensitive_keywords: source.sensitive_keywords.iter().map(|k| k.to_lowercase()).collect(),
            vocabulary: source.vocabulary.iter().map(|w| w.to_lowercase()).collect(),
        })
    }

    /// Shared built-in catalog
    pub fn french_insurance() -> Arc<Self> {
        Arc::clone(&FRENCH_INSURANCE)
    }

    pub fn intents(&self) -> &[(Intent, Vec<Regex>)] {
        &self.intents
    }

    pub fn urgency_high(&self) -> &[Regex] {
        &self.urgency_high
    }

    pub fn urgency_med(&self) -> &[Regex] {
        &self.urgency_med
    }

    /// First sensitive keyword contained in `lowered`, in list order
    pub fn find_sensitive<'a>(&'a self, lowered: &str) -> Option<&'a str> {
        self.sensitive_keywords
            .iter()
            .find(|k| lowered.contains(k.as_str()))
            .map(|k| k.as_str())
    }

    /// Does any token of `lowered` belong to the known vocabulary?
    pub fn has_known_word(&self, lowered: &str) -> bool {
        lowered
            .split(|c: char| !(c.is_alphanumeric() || c == '\''))
            .filter(|t| !t.is_empty())
            .any(|token| self.vocabulary.iter().any(|w| w == token))
    }
}
