//! Answer templates.
//!
//! Each builder turns the retrieved document hits and live-data slots into a
//! Markdown-flavoured Portuguese answer. Output is a pure function of the
//! inputs. A failed group is named in the answer together with its error.

use std::fmt::Write;

use serde_json::Value;

use crate::gateway::{DataGroup, GroupData, GroupOutcome, StudentsSummary};
use crate::intent::Intent;
use crate::models::SearchHit;

/// Live-data slots as returned by the gateway, in request order.
pub type LiveData = [(DataGroup, GroupOutcome)];

/// Pick the template for `intent` and render the answer.
pub fn compose_answer(
    intent: Intent,
    question: &str,
    hits: &[SearchHit],
    live: &LiveData,
) -> String {
    match intent {
        Intent::Financial => financial_answer(live, hits),
        Intent::Students => students_answer(live),
        Intent::Courses => courses_answer(live, hits),
        Intent::Techniques => techniques_answer(live, hits),
        _ => general_answer(question, live, hits),
    }
}

/// Answer from documents alone, used when live data is disabled.
pub fn document_answer(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "❌ Nenhuma informação encontrada nos documentos disponíveis.".to_string();
    }

    let mut out = format!(
        "📚 **Informações dos Documentos** ({} resultados):\n\n",
        hits.len()
    );
    for (index, hit) in hits.iter().take(3).enumerate() {
        let _ = writeln!(out, "{}. **{}**", index + 1, hit.chunk.source_title);
        let _ = writeln!(out, "   {}...", snippet(&hit.chunk.content, 150));
        let _ = writeln!(out, "   *Pontuação: {}*\n", hit.score);
    }
    out
}

fn slot(live: &LiveData, group: DataGroup) -> Option<&GroupOutcome> {
    live.iter().find(|(g, _)| *g == group).map(|(_, outcome)| outcome)
}

fn unavailable(what: &str, outcome: Option<&GroupOutcome>) -> String {
    match outcome.and_then(GroupOutcome::error) {
        Some(error) => format!(
            "❌ Não foi possível acessar dados {} no momento ({}).",
            what, error
        ),
        None => format!("❌ Não foi possível acessar dados {} no momento.", what),
    }
}

fn snippet(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn percent(part: usize, total: usize) -> usize {
    if total == 0 {
        0
    } else {
        ((part as f64 / total as f64) * 100.0).round() as usize
    }
}

fn display_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "-".to_string(),
        Some(other) => other.to_string(),
    }
}

fn write_categories(out: &mut String, summary: &StudentsSummary) {
    let _ = writeln!(out, "• Adultos: {}", summary.categories.adult);
    let _ = writeln!(out, "• Adolescentes: {}", summary.categories.teen);
    let _ = writeln!(out, "• Crianças: {}", summary.categories.child);
}

fn students_summary(live: &LiveData) -> Option<&StudentsSummary> {
    match slot(live, DataGroup::Students)?.data()? {
        GroupData::Students { summary, .. } => Some(summary),
        _ => None,
    }
}

fn financial_answer(live: &LiveData, hits: &[SearchHit]) -> String {
    let financial = slot(live, DataGroup::Financial);
    let Some(GroupData::Financial { plans, .. }) = financial.and_then(GroupOutcome::data) else {
        return unavailable("financeiros", financial);
    };

    let mut out = String::from("💰 **SITUAÇÃO FINANCEIRA DA ACADEMIA**\n\n");
    let _ = writeln!(out, "📋 **Planos Disponíveis**: {}", plans.len());
    if !plans.is_empty() {
        let active = plans
            .iter()
            .filter(|p| p.get("isActive").and_then(Value::as_bool) == Some(true))
            .count();
        let _ = writeln!(out, "• Planos Ativos: {}", active);

        // Most popular is approximated by the cheapest plan.
        let price = |p: &Value| p.get("price").and_then(Value::as_f64).unwrap_or(f64::MAX);
        if let Some(popular) = plans.iter().min_by(|a, b| price(a).total_cmp(&price(b))) {
            let _ = writeln!(
                out,
                "• Plano Mais Popular: {} - R$ {}",
                display_value(popular.get("name")),
                display_value(popular.get("price"))
            );
        }
    }

    if let Some(summary) = students_summary(live) {
        let _ = writeln!(
            out,
            "\n👥 **Alunos**: {} ativos de {} total",
            summary.active, summary.total
        );
        write_categories(&mut out, summary);
        if summary.recent_registrations > 0 {
            let _ = writeln!(
                out,
                "• Novas matrículas (30 dias): {}",
                summary.recent_registrations
            );
        }
    } else if let Some(error) = slot(live, DataGroup::Students).and_then(GroupOutcome::error) {
        let _ = writeln!(out, "\n👥 **Alunos**: indisponível ({})", error);
    }

    if !hits.is_empty() {
        out.push_str("\n📚 **Informações dos Documentos**:\n");
        for hit in hits.iter().take(2) {
            let _ = writeln!(
                out,
                "• {}: {}...",
                hit.chunk.source_title,
                snippet(&hit.chunk.content, 100)
            );
        }
    }

    out
}

fn students_answer(live: &LiveData) -> String {
    let students = slot(live, DataGroup::Students);
    let Some(summary) = students_summary(live) else {
        return unavailable("dos alunos", students);
    };

    let mut out = String::from("👥 **GESTÃO DE ALUNOS**\n\n");
    out.push_str("📊 **Resumo Geral**:\n");
    let _ = writeln!(out, "• Total: {} alunos", summary.total);
    let _ = writeln!(
        out,
        "• Ativos: {} ({}%)",
        summary.active,
        percent(summary.active, summary.total)
    );
    let _ = writeln!(out, "• Inativos: {}\n", summary.inactive);

    out.push_str("📈 **Por Categoria**:\n");
    write_categories(&mut out, summary);

    if summary.recent_registrations > 0 {
        let _ = writeln!(
            out,
            "\n🆕 **Matrículas Recentes (30 dias)**: {}",
            summary.recent_registrations
        );
    }

    out
}

fn courses_answer(live: &LiveData, hits: &[SearchHit]) -> String {
    let mut out = String::from("📚 **GESTÃO DE CURSOS**\n\n");

    let courses = slot(live, DataGroup::Courses);
    match courses.and_then(GroupOutcome::data) {
        Some(GroupData::Courses { summary, .. }) => {
            out.push_str("📊 **Resumo Geral**:\n");
            let _ = writeln!(out, "• Total: {} cursos", summary.total);
            let _ = writeln!(out, "• Ativos: {}\n", summary.active);
            out.push_str("📈 **Por Nível**:\n");
            let _ = writeln!(out, "• Iniciante: {}", summary.levels.beginner);
            let _ = writeln!(out, "• Intermediário: {}", summary.levels.intermediate);
            let _ = writeln!(out, "• Avançado: {}", summary.levels.advanced);
        }
        _ => {
            let _ = writeln!(out, "{}", unavailable("dos cursos", courses));
        }
    }

    if !hits.is_empty() {
        out.push_str("\n📋 **Conteúdo dos Documentos de Curso**:\n");
        for hit in hits.iter().take(2) {
            let _ = writeln!(out, "• {}...", snippet(&hit.chunk.source_title, 50));
        }
    }

    out
}

fn techniques_answer(live: &LiveData, hits: &[SearchHit]) -> String {
    let mut out = String::from("🥋 **BASE DE TÉCNICAS KRAV MAGA**\n\n");

    let techniques = slot(live, DataGroup::Techniques);
    match techniques.and_then(GroupOutcome::data) {
        Some(GroupData::Techniques { list }) => {
            let _ = writeln!(out, "📊 **Técnicas Cadastradas**: {}", list.len());

            // Categories in order of first appearance.
            let mut categories: Vec<(String, usize)> = Vec::new();
            for technique in list {
                let category = technique
                    .get("category")
                    .and_then(Value::as_str)
                    .filter(|c| !c.is_empty())
                    .unwrap_or("OUTROS");
                match categories.iter_mut().find(|(c, _)| c == category) {
                    Some((_, count)) => *count += 1,
                    None => categories.push((category.to_string(), 1)),
                }
            }

            out.push_str("\n📈 **Por Categoria**:\n");
            for (category, count) in &categories {
                let _ = writeln!(out, "• {}: {} técnicas", category, count);
            }
        }
        _ => {
            let _ = writeln!(out, "{}", unavailable("de técnicas", techniques));
        }
    }

    if !hits.is_empty() {
        out.push_str("\n📚 **Técnicas Identificadas nos Documentos**:\n");
        for hit in hits.iter().take(3) {
            let _ = writeln!(out, "• {}...", snippet(&hit.chunk.content, 80));
        }
    }

    out
}

fn general_answer(question: &str, live: &LiveData, hits: &[SearchHit]) -> String {
    let mut out = String::from("🤖 **ASSISTENTE DA ACADEMIA**\n\n");
    let _ = writeln!(out, "❓ **Sua Pergunta**: {}\n", question);

    out.push_str("📊 **Dados Disponíveis**:\n");
    for (group, outcome) in live {
        let name = group.as_str().to_uppercase();
        match outcome {
            GroupOutcome::Ready(_) => {
                let _ = writeln!(out, "• ✅ {}: Dados atualizados", name);
            }
            GroupOutcome::Failed { error } => {
                let _ = writeln!(out, "• ❌ {}: {}", name, error);
            }
        }
    }

    if !hits.is_empty() {
        let _ = writeln!(
            out,
            "\n📚 **Documentos Relacionados**: {} encontrados",
            hits.len()
        );
    }

    out.push_str(
        "\n💡 **Dica**: Seja mais específico para obter informações detalhadas sobre alunos, cursos, finanças ou técnicas.",
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{CategoryCounts, CoursesSummary, LevelCounts};
    use crate::models::{Chunk, DocumentType};
    use serde_json::json;

    fn hit(title: &str, content: &str, score: u32) -> SearchHit {
        SearchHit {
            chunk: Chunk {
                id: format!("{}_0", title),
                source_id: title.to_string(),
                source_title: title.to_string(),
                content: content.to_string(),
                doc_type: DocumentType::Text,
                tags: vec![],
                embedding: None,
            },
            score,
        }
    }

    fn students(active: usize, total: usize) -> (DataGroup, GroupOutcome) {
        (
            DataGroup::Students,
            GroupOutcome::Ready(GroupData::Students {
                list: vec![],
                summary: StudentsSummary {
                    total,
                    active,
                    inactive: total - active,
                    categories: CategoryCounts {
                        adult: total,
                        teen: 0,
                        child: 0,
                    },
                    recent_registrations: 0,
                },
            }),
        )
    }

    fn failed(group: DataGroup, error: &str) -> (DataGroup, GroupOutcome) {
        (
            group,
            GroupOutcome::Failed {
                error: error.to_string(),
            },
        )
    }

    #[test]
    fn test_students_answer() {
        let live = vec![students(10, 12)];
        let answer = compose_answer(Intent::Students, "q", &[], &live);
        assert!(answer.contains("• Total: 12 alunos"));
        assert!(answer.contains("• Ativos: 10 (83%)"));
        assert!(answer.contains("• Inativos: 2"));
        assert!(!answer.contains("Matrículas Recentes"));
    }

    #[test]
    fn test_students_answer_without_students() {
        let live = vec![failed(DataGroup::Students, "HTTP 503: Service Unavailable")];
        let answer = compose_answer(Intent::Students, "q", &[], &live);
        assert!(answer.starts_with("❌"));
        assert!(answer.contains("HTTP 503"));
    }

    #[test]
    fn test_financial_answer_picks_cheapest_plan() {
        let live = vec![
            (
                DataGroup::Financial,
                GroupOutcome::Ready(GroupData::Financial {
                    plans: vec![
                        json!({"name": "Anual", "price": 1200, "isActive": true}),
                        json!({"name": "Mensal", "price": 150, "isActive": true}),
                        json!({"name": "Antigo", "price": 99.5, "isActive": false}),
                    ],
                    summary: json!({}),
                }),
            ),
            students(3, 4),
        ];
        let hits = vec![hit("Contrato", &"x".repeat(300), 1)];
        let answer = compose_answer(Intent::Financial, "q", &hits, &live);
        assert!(answer.contains("📋 **Planos Disponíveis**: 3"));
        assert!(answer.contains("• Planos Ativos: 2"));
        assert!(answer.contains("• Plano Mais Popular: Antigo - R$ 99.5"));
        assert!(answer.contains("3 ativos de 4 total"));
        assert!(answer.contains(&format!("• Contrato: {}...", "x".repeat(100))));
    }

    #[test]
    fn test_financial_answer_reports_failure() {
        let live = vec![
            failed(DataGroup::Financial, "HTTP 500: Internal Server Error"),
            students(1, 1),
        ];
        let answer = compose_answer(Intent::Financial, "q", &[], &live);
        assert!(answer.contains("financeiros"));
        assert!(answer.contains("HTTP 500"));
    }

    #[test]
    fn test_courses_answer_truncates_titles() {
        let live = vec![(
            DataGroup::Courses,
            GroupOutcome::Ready(GroupData::Courses {
                list: vec![],
                summary: CoursesSummary {
                    total: 2,
                    active: 1,
                    levels: LevelCounts {
                        beginner: 1,
                        intermediate: 1,
                        advanced: 0,
                    },
                },
            }),
        )];
        let long_title = "T".repeat(80);
        let answer = compose_answer(Intent::Courses, "q", &[hit(&long_title, "c", 1)], &live);
        assert!(answer.contains("• Total: 2 cursos"));
        assert!(answer.contains("• Intermediário: 1"));
        assert!(answer.contains(&format!("• {}...\n", "T".repeat(50))));
    }

    #[test]
    fn test_techniques_group_by_category() {
        let live = vec![(
            DataGroup::Techniques,
            GroupOutcome::Ready(GroupData::Techniques {
                list: vec![
                    json!({"category": "DEFESA"}),
                    json!({"category": "ATAQUE"}),
                    json!({"category": "DEFESA"}),
                    json!({}),
                ],
            }),
        )];
        let answer = compose_answer(Intent::Techniques, "q", &[], &live);
        assert!(answer.contains("Técnicas Cadastradas**: 4"));
        let defesa = answer.find("• DEFESA: 2 técnicas").unwrap();
        let ataque = answer.find("• ATAQUE: 1 técnicas").unwrap();
        assert!(defesa < ataque);
        assert!(answer.contains("• OUTROS: 1 técnicas"));
    }

    #[test]
    fn test_general_answer_lists_sources() {
        let live = vec![students(1, 1), failed(DataGroup::Courses, "timeout")];
        let answer = compose_answer(
            Intent::Attendance,
            "Qual a frequência?",
            &[hit("a", "b", 1)],
            &live,
        );
        assert!(answer.contains("❓ **Sua Pergunta**: Qual a frequência?"));
        assert!(answer.contains("• ✅ STUDENTS: Dados atualizados"));
        assert!(answer.contains("• ❌ COURSES: timeout"));
        assert!(answer.contains("1 encontrados"));
    }

    #[test]
    fn test_document_answer() {
        assert!(document_answer(&[]).starts_with("❌ Nenhuma informação"));
        let hits: Vec<SearchHit> = (0..5)
            .map(|i| hit(&format!("D{}", i), "texto", 5 - i))
            .collect();
        let answer = document_answer(&hits);
        assert!(answer.contains("(5 resultados)"));
        assert!(answer.contains("3. **D2**"));
        assert!(!answer.contains("4. **D3**"));
        assert!(answer.contains("*Pontuação: 5*"));
    }
}
