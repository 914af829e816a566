//! Synthesis Engine
//!
//! Builds one grounded prompt from the user's request, the extracted needs
//! and every evidence record, then returns the model's report verbatim.

use sdk::types::EvidenceRecord;
use std::fmt::Write;

use crate::llm::GenerationClient;

/// Placeholder for a rating or map link the provider left out
const NOT_PROVIDED: &str = "（無資料）";

#[derive(Clone)]
pub struct SynthesisEngine {
    llm: GenerationClient,
}

impl SynthesisEngine {
    pub fn new(llm: GenerationClient) -> Self {
        Self { llm }
    }

    /// Produce the recommendation report. Makes exactly one generation call.
    pub async fn synthesize(
        &self,
        original_query: &str,
        needs: &[String],
        evidence: &[EvidenceRecord],
    ) -> String {
        let prompt = build_synthesis_prompt(original_query, needs, evidence);

        tracing::debug!(
            "Synthesis prompt: {} records, {} chars",
            evidence.len(),
            prompt.chars().count()
        );

        self.llm.chat(&prompt, None).await
    }
}

/// Assemble the synthesis prompt
pub fn build_synthesis_prompt(
    original_query: &str,
    needs: &[String],
    evidence: &[EvidenceRecord],
) -> String {
    let needs_text = if needs.is_empty() {
        "（無特別需求）".to_string()
    } else {
        needs.join("、")
    };

    format!(
        "使用者原始需求：{original_query}\n\
         提取的關鍵需求：{needs_text}\n\
         搜尋到的原始數據：\n{evidence}\n\
         請以專業咖啡師的語氣推薦。要求：\n\
         1. 必須針對使用者提到的每一項特定需求，逐一與每家店的評論與網路文章進行證據比對。\n\
         2. 使用 Markdown 表格呈現比較結果。\n\
         3. 內容需完整，請勿省略重要細節。\n\
         4. 提供每家店的 Google Maps 連結。\n\
         5. 若無符合需求的店家，請禮貌回覆並建議調整需求。",
        evidence = render_evidence(evidence),
    )
}

/// Render records as numbered markdown sections
fn render_evidence(evidence: &[EvidenceRecord]) -> String {
    let mut out = String::new();

    for (i, record) in evidence.iter().enumerate() {
        let candidate = &record.candidate;
        let rating = candidate
            .rating
            .map(|r| format!("{:.1}", r))
            .unwrap_or_else(|| NOT_PROVIDED.to_string());

        // Writing to a String cannot fail
        let _ = writeln!(out, "### {}. {}", i + 1, candidate.name);
        let _ = writeln!(out, "- 評分：{}", rating);
        let _ = writeln!(out, "- 地址：{}", candidate.address);
        let _ = writeln!(out, "- 營業時間：{}", record.opening_hours);
        let _ = writeln!(
            out,
            "- 地圖連結：{}",
            record.map_url.as_deref().unwrap_or(NOT_PROVIDED)
        );

        let _ = writeln!(out, "- 評論：");
        if record.reviews().is_empty() {
            let _ = writeln!(out, "  - （無評論）");
        }
        for review in record.reviews() {
            let _ = writeln!(out, "  - {}", single_line(review));
        }

        let _ = writeln!(out, "- 網路文章摘錄：");
        if record.web_excerpts().is_empty() {
            let _ = writeln!(out, "  - （無相關文章）");
        }
        for excerpt in record.web_excerpts() {
            let _ = writeln!(out, "  - {}", single_line(excerpt));
        }
    }

    out
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
