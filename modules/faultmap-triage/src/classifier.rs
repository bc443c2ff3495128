//! Priority classification of a report's free text.
//!
//! Two strategies share the [`PriorityClassifier`] seam:
//! - [`KeywordClassifier`]: ordered keyword tiers, deterministic.
//! - [`AssistedClassifier`]: asks a remote label classifier under a deadline
//!   and falls back to the keyword tiers on any failure.

use std::sync::Arc;
use std::time::Duration;

use ai_client::{Claude, LabelClassifier};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use faultmap_common::{Config, Priority, ReportType};

// ---------------------------------------------------------------------------
// Keyword tiers
// ---------------------------------------------------------------------------

/// Life-safety and critical-service terms. Order matters: first hit wins.
pub const URGENTE_KEYWORDS: &[&str] = &[
    // health
    "hospital",
    "hospitais",
    "centro de saúde",
    "centro de saude",
    "clínica",
    "clinica",
    "urgência",
    "urgencia",
    // elder and child care
    "lar de idosos",
    "lares",
    "casa de repouso",
    "idosos",
    "creche",
    "infantário",
    "infantario",
    "jardim de infância",
    "jardim de infancia",
    "escola",
    "escolas",
    "farmácia",
    "farmacia",
    // water pumping
    "bombagem",
    "estação elevatória",
    "estacao elevatoria",
    "captação de água",
    // medical equipment at home
    "oxigénio",
    "oxigenio",
    "ventilador",
    "diálise",
    "dialise",
    "equipamento médico",
    "equipamento medico",
    // downed or live lines
    "poste caído",
    "poste caido",
    "postes caídos",
    "postes caidos",
    "cabo caído",
    "cabo caido",
    "cabos caídos",
    "cabos caidos",
    "fio caído",
    "fios caídos",
    "com corrente",
    "cabo elétrico",
    "cabo eletrico",
    // critical national and regional roads
    "a1",
    "a8",
    "a17",
    "a19",
    "ic2",
    "ic8",
    "ic9",
    "ic36",
    "en1",
    "n1",
    "en8",
    "n8",
    "en109",
    "n109",
    "en113",
    "n113",
    "en242",
    "n242",
];

/// Economic, shelter and public-service terms.
pub const IMPORTANTE_KEYWORDS: &[&str] = &[
    "loja",
    "lojas",
    "comércio",
    "comercio",
    "supermercado",
    "mercado",
    "restaurante",
    "café",
    "fábrica",
    "fabrica",
    "empresa",
    "empresas",
    "armazém",
    "armazem",
    "abrigo",
    "centro de acolhimento",
    "pavilhão",
    "pavilhao",
    "junta de freguesia",
    "câmara municipal",
    "camara municipal",
    "tribunal",
    "bombeiros",
    "quartel",
    "ponte",
    "pontes",
];

/// Road codes ("a1", "n8", "ic2") are short enough to occur inside other
/// words and digits, so they only count as whole tokens. Every other keyword
/// is plain substring containment, which lets "farmácia" hit "farmácias".
fn is_road_code(keyword: &str) -> bool {
    keyword.chars().any(|c| c.is_ascii_digit()) && keyword.chars().all(|c| c.is_ascii_alphanumeric())
}

fn contains_keyword(haystack: &str, keyword: &str) -> bool {
    if !is_road_code(keyword) {
        return haystack.contains(keyword);
    }
    haystack.match_indices(keyword).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + keyword.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// The tier and keyword that decide a text, scanning urgente before importante.
pub fn keyword_match(text: &str) -> Option<(Priority, &'static str)> {
    let tiers: [(Priority, &[&'static str]); 2] = [
        (Priority::Urgente, URGENTE_KEYWORDS),
        (Priority::Importante, IMPORTANTE_KEYWORDS),
    ];
    tiers.into_iter().find_map(|(priority, keywords)| {
        keywords
            .iter()
            .find(|kw| contains_keyword(text, kw))
            .map(|kw| (priority, *kw))
    })
}

/// Deterministic classification. Total: every input maps to a tier.
pub fn classify_by_keywords(description: &str, report_type: ReportType, street: &str) -> Priority {
    let text = format!("{description} {report_type} {street}").to_lowercase();
    match keyword_match(&text) {
        Some((priority, keyword)) => {
            debug!(%priority, keyword, "Keyword decided priority");
            priority
        }
        None => Priority::Normal,
    }
}

// ---------------------------------------------------------------------------
// Strategy seam
// ---------------------------------------------------------------------------

/// Text a classifier sees for one report.
#[derive(Debug, Clone, Copy)]
pub struct ClassifierInput<'a> {
    pub description: &'a str,
    pub report_type: ReportType,
    pub street: &'a str,
}

impl ClassifierInput<'_> {
    fn prompt_text(&self) -> String {
        format!(
            "Tipo: {}\nRua: {}\nDescrição: {}",
            self.report_type, self.street, self.description
        )
    }
}

/// Maps a report to an urgency tier. Never fails.
#[async_trait]
pub trait PriorityClassifier: Send + Sync {
    async fn classify(&self, input: &ClassifierInput<'_>) -> Priority;
}

pub struct KeywordClassifier;

#[async_trait]
impl PriorityClassifier for KeywordClassifier {
    async fn classify(&self, input: &ClassifierInput<'_>) -> Priority {
        classify_by_keywords(input.description, input.report_type, input.street)
    }
}

const LABEL_INSTRUCTIONS: &str = "Classifica a urgência de uma ocorrência reportada por um \
    residente após uma catástrofe. \"urgente\": risco para a vida ou serviços críticos \
    (hospitais, lares, escolas, farmácias, bombagem de água, equipamento médico, cabos ou \
    postes caídos, estradas nacionais). \"importante\": comércio, abrigos, edifícios públicos, \
    bombeiros, pontes. \"normal\": tudo o resto.";

/// Remote-assisted classification with an owned deadline.
///
/// Transport errors, timeouts and answers outside the three labels all
/// degrade to [`classify_by_keywords`]. No retries.
pub struct AssistedClassifier {
    labeler: Arc<dyn LabelClassifier>,
    timeout: Duration,
}

impl AssistedClassifier {
    pub fn new(labeler: Arc<dyn LabelClassifier>, timeout: Duration) -> Self {
        Self { labeler, timeout }
    }
}

#[async_trait]
impl PriorityClassifier for AssistedClassifier {
    async fn classify(&self, input: &ClassifierInput<'_>) -> Priority {
        let labels: Vec<&str> = Priority::ALL.iter().map(Priority::as_str).collect();
        let text = input.prompt_text();

        let outcome = tokio::time::timeout(
            self.timeout,
            self.labeler.classify(LABEL_INSTRUCTIONS, &text, &labels),
        )
        .await;

        let remote = match outcome {
            Ok(Ok(label)) => {
                let parsed = Priority::from_label(label.trim().to_lowercase().as_str());
                if parsed.is_none() {
                    warn!(label = label.as_str(), "Remote classifier answered outside the label set");
                }
                parsed
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Remote classifier failed");
                None
            }
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "Remote classifier timed out");
                None
            }
        };

        remote.unwrap_or_else(|| {
            classify_by_keywords(input.description, input.report_type, input.street)
        })
    }
}

/// Pick the classifier strategy from configuration.
pub fn classifier_from_config(config: &Config) -> Arc<dyn PriorityClassifier> {
    if !config.priority_ai_enabled {
        return Arc::new(KeywordClassifier);
    }
    match config.anthropic_api_key.as_deref() {
        Some(key) => {
            info!(
                model = config.priority_ai_model.as_str(),
                timeout_ms = config.priority_ai_timeout.as_millis() as u64,
                "Assisted priority classification enabled"
            );
            let claude = Claude::new(key, config.priority_ai_model.clone());
            Arc::new(AssistedClassifier::new(Arc::new(claude), config.priority_ai_timeout))
        }
        None => {
            warn!("PRIORITY_AI_ENABLED is set but ANTHROPIC_API_KEY is missing; using keywords only");
            Arc::new(KeywordClassifier)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn road_codes_match_only_as_whole_tokens() {
        assert!(!contains_keyword("casa1", "a1"));
        assert!(!contains_keyword("lote a12", "a1"));
        assert!(!contains_keyword("n80", "n8"));
        assert!(contains_keyword("corte na a1, sentido sul", "a1"));
        assert!(contains_keyword("ic2 km 120", "ic2"));
    }

    #[test]
    fn word_keywords_match_inside_longer_words() {
        assert!(contains_keyword("material escolar", "escola"));
        assert!(contains_keyword("serviço hospitalar", "hospital"));
    }

    #[test]
    fn plural_forms_of_urgent_places_are_urgent() {
        for text in [
            "sem luz nas farmácias",
            "clínicas sem luz",
            "creches sem água",
            "hospitalar sem luz",
            "postes caídos na estrada",
        ] {
            assert_eq!(
                classify_by_keywords(text, ReportType::Electricity, ""),
                Priority::Urgente,
                "{text}"
            );
        }
    }

    #[test]
    fn plural_forms_of_important_places_are_important() {
        assert_eq!(
            classify_by_keywords("restaurantes e fábricas sem rede", ReportType::TelecomMobile, ""),
            Priority::Importante
        );
    }

    #[test]
    fn urgente_tier_beats_importante_tier() {
        let p = classify_by_keywords("sem luz no hospital e na loja", ReportType::Electricity, "");
        assert_eq!(p, Priority::Urgente);
    }

    #[test]
    fn importante_keyword_alone() {
        let p = classify_by_keywords("loja sem rede", ReportType::TelecomMobile, "");
        assert_eq!(p, Priority::Importante);
    }

    #[test]
    fn street_is_scanned_too() {
        let p = classify_by_keywords("árvore na estrada", ReportType::Roads, "IC2 km 120");
        assert_eq!(p, Priority::Urgente);
    }

    #[test]
    fn case_and_accents_are_normalised_by_lowercasing() {
        let p = classify_by_keywords("FARMÁCIA sem água", ReportType::Water, "");
        assert_eq!(p, Priority::Urgente);
    }

    #[test]
    fn no_keyword_is_normal() {
        let p = classify_by_keywords("", ReportType::Water, "");
        assert_eq!(p, Priority::Normal);
    }

    #[test]
    fn keyword_match_reports_first_keyword_in_list_order() {
        // "lar de idosos" precedes "creche" in the urgente list.
        let hit = keyword_match("creche ao lado do lar de idosos");
        assert_eq!(hit, Some((Priority::Urgente, "lar de idosos")));
    }

    #[tokio::test]
    async fn enabled_flag_without_key_falls_back_to_keywords() {
        let config = Config { priority_ai_enabled: true, anthropic_api_key: None, ..Config::default() };
        let classifier = classifier_from_config(&config);

        let input = ClassifierInput {
            description: "ponte com fissuras",
            report_type: ReportType::Roads,
            street: "",
        };
        assert_eq!(classifier.classify(&input).await, Priority::Importante);
    }
}
