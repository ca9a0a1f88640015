//! Bag-of-keywords intent classifier.
//!
//! A question is lowercased and checked against each intent's keyword list
//! in table order. Confidence is the share of an intent's keywords found in
//! the question; the highest confidence wins and ties go to the intent
//! listed first. No match at all yields [`Intent::General`].

use std::fmt;

use serde::Serialize;

use crate::gateway::DataGroup;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Financial,
    Students,
    Courses,
    Attendance,
    Techniques,
    Analytics,
    General,
}

/// Keyword table in priority order.
const INTENT_KEYWORDS: &[(Intent, &[&str])] = &[
    (
        Intent::Financial,
        &[
            "financeiro",
            "pagamento",
            "inadimplente",
            "receita",
            "plano",
            "mensalidade",
            "assinatura",
        ],
    ),
    (
        Intent::Students,
        &["aluno", "estudante", "matricula", "cadastro", "perfil"],
    ),
    (
        Intent::Courses,
        &["curso", "aula", "conteudo", "modulo", "programa"],
    ),
    (
        Intent::Attendance,
        &["frequencia", "presença", "falta", "checkin", "comparecimento"],
    ),
    (
        Intent::Techniques,
        &["tecnica", "movimento", "golpe", "defesa", "ataque", "krav maga"],
    ),
    (
        Intent::Analytics,
        &[
            "relatorio",
            "estatistica",
            "analise",
            "metricas",
            "dashboard",
            "resumo",
        ],
    ),
];

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Financial => "financial",
            Intent::Students => "students",
            Intent::Courses => "courses",
            Intent::Attendance => "attendance",
            Intent::Techniques => "techniques",
            Intent::Analytics => "analytics",
            Intent::General => "general",
        }
    }

    /// Live-data groups fetched for this intent, most relevant first.
    pub fn data_groups(&self) -> &'static [DataGroup] {
        match self {
            Intent::Financial => &[DataGroup::Financial, DataGroup::Students],
            Intent::Students => &[DataGroup::Students, DataGroup::Financial],
            Intent::Courses => &[DataGroup::Courses, DataGroup::Students],
            Intent::Attendance => &[DataGroup::Students, DataGroup::Courses],
            Intent::Techniques => &[DataGroup::Techniques],
            Intent::Analytics => &[
                DataGroup::Analytics,
                DataGroup::Students,
                DataGroup::Financial,
            ],
            Intent::General => &[DataGroup::Students],
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a question into exactly one intent.
pub fn classify_intent(question: &str) -> Intent {
    let lower = question.to_lowercase();
    let mut best: Option<(Intent, f64)> = None;

    for (intent, keywords) in INTENT_KEYWORDS {
        let matches = keywords.iter().filter(|k| lower.contains(*k)).count();
        if matches == 0 {
            continue;
        }
        let confidence = matches as f64 / keywords.len() as f64;
        // Strictly greater: on ties the earlier table entry stays.
        if best.map_or(true, |(_, c)| confidence > c) {
            best = Some((*intent, confidence));
        }
    }

    best.map(|(intent, _)| intent).unwrap_or(Intent::General)
}
