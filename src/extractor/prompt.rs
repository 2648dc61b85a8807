//! Extraction prompt construction.

use crate::models::AnswerKey;

/// Build the direct raw URL for a folder's exam PDF.
///
/// The directory argument is used as given (relative to the dataset
/// root); separators are normalized to `/` and spaces percent-encoded.
pub fn pdf_link(link_base: &str, directory: &str, prova_file: &str) -> String {
    let normalized = directory.replace('\\', "/");
    let path = normalized
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
        .replace(' ', "%20");

    format!("{}/{}/{}", link_base.trim_end_matches('/'), path, prova_file)
}

/// Build the full extraction prompt for one exam folder.
///
/// The example document is rendered from the typed schema so the prompt
/// and the model types cannot drift apart.
pub fn build_prompt(pdf_link: &str) -> String {
    let example = serde_json::to_string_pretty(&AnswerKey::example(pdf_link))
        .unwrap_or_else(|_| String::from("{}"));

    PROMPT_TEMPLATE
        .replace("{structure}", &example)
        .replace("{pdf_link}", pdf_link)
}

const PROMPT_TEMPLATE: &str = r#"You are a specialized data extraction API. Your sole function is to process two uploaded PDF files, prova.pdf and gabarito.pdf, and generate a single, precise JSON output.

Constraints:
  - The output MUST be only the raw JSON object.

Instructions:
 - Analyze the prova.pdf to identify the specific exam version (e.g., "Prova V", "Prova K", etc.).
 - Using the identified exam version, locate the corresponding answer key column in the gabarito.pdf.
 - Read both documents to extract all necessary information.
 - Populate the following JSON structure exactly as specified.

JSON Output Structure:
{structure}

Field Population Rules:
  - pdf_link: the pdf is hosted at {pdf_link}
  - data: Extract the exam date from the documents and format it as YYYY-MM-DD.
  - qtd_questoes: Determine the total count of questions in the exam.
  - opcoes_resposta: This field should be a static array: ["A", "B", "C", "D", "E"].
  - questoes: This must be an object containing entries for every question number (from 1 to the total). For each question:
      - disciplina: Determine the academic discipline based on the question's content in prova.pdf. Use "Interdisciplinar" if it blends multiple distinct fields.
      - resposta: Extract the correct single-letter answer from the matched answer key in gabarito.pdf. Invalid, annulled or non-existent answers should be represented as "N/A".
"#;

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str =
        "https://raw.githubusercontent.com/cirillom/gabarito-digital-data/refs/heads/main";

    #[test]
    fn test_pdf_link_encodes_spaces() {
        let link = pdf_link(BASE, "fuvest/2024/1a Fase", "prova.pdf");
        assert_eq!(
            link,
            format!("{}/fuvest/2024/1a%20Fase/prova.pdf", BASE)
        );
    }

    #[test]
    fn test_pdf_link_normalizes_backslashes() {
        let link = pdf_link(BASE, r"fuvest\2024\1a Fase", "prova.pdf");
        assert_eq!(
            link,
            format!("{}/fuvest/2024/1a%20Fase/prova.pdf", BASE)
        );
    }

    #[test]
    fn test_pdf_link_strips_leading_dot_segment() {
        let link = pdf_link(BASE, "./unicamp/2023", "prova.pdf");
        assert_eq!(link, format!("{}/unicamp/2023/prova.pdf", BASE));
    }

    #[test]
    fn test_prompt_embeds_link_and_schema() {
        let link = pdf_link(BASE, "fuvest/2024/1a Fase", "prova.pdf");
        let prompt = build_prompt(&link);

        assert!(prompt.contains(&link));
        assert!(prompt.contains("\"qtd_questoes\": 2"));
        assert!(prompt.contains("Interdisciplinar"));
        assert!(prompt.contains("\"opcoes_resposta\""));
        assert!(prompt.contains("N/A"));
    }

    #[test]
    fn test_prompt_has_no_unfilled_placeholders() {
        let prompt = build_prompt("https://example.com/prova.pdf");
        assert!(!prompt.contains("{structure}"));
        assert!(!prompt.contains("{pdf_link}"));
    }
}
