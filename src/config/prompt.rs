use std::fmt;

use crate::history::format_history_for_prompt;
use crate::models::chat::ConversationHistory;

/// Emitted by the backend on a line it cannot translate, instead of dropping the line.
pub const ESCAPE_MARKER: &str = "[[NO_TRANSLATION]]";

pub const NO_HISTORY_MARKER: &str = "(no previous conversation)";

pub const SOURCE_OPEN: &str = "<<<SOURCE";
pub const SOURCE_CLOSE: &str = "SOURCE>>>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    TraditionalChinese,
    Khmer,
    English,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::TraditionalChinese, Language::Khmer, Language::English];

    pub fn display_name(&self) -> &'static str {
        match self {
            Language::TraditionalChinese => "Traditional Chinese",
            Language::Khmer => "Khmer",
            Language::English => "English",
        }
    }

    /// Output languages for a detected source, in the order they must appear.
    pub fn targets(&self) -> [Language; 2] {
        match self {
            Language::TraditionalChinese => [Language::Khmer, Language::English],
            Language::Khmer => [Language::TraditionalChinese, Language::English],
            Language::English => [Language::TraditionalChinese, Language::Khmer],
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Sections of the compiled instruction, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptSection {
    Persona,
    Procedure,
    Formatting,
    History,
    Source,
}

impl PromptSection {
    pub const ALL: [PromptSection; 5] = [
        PromptSection::Persona,
        PromptSection::Procedure,
        PromptSection::Formatting,
        PromptSection::History,
        PromptSection::Source,
    ];

    pub fn header(&self) -> &'static str {
        match self {
            PromptSection::Persona => "## Role",
            PromptSection::Procedure => "## Procedure",
            PromptSection::Formatting => "## Output rules",
            PromptSection::History => "## Recent conversation",
            PromptSection::Source => "## Text to translate",
        }
    }
}

/// Turns a source message and its conversation history into one instruction block.
#[derive(Debug, Clone, Default)]
pub struct InstructionCompiler;

impl InstructionCompiler {
    pub fn new() -> Self {
        Self
    }

    pub fn compile(&self, source_text: &str, history: &ConversationHistory) -> String {
        PromptSection::ALL
            .iter()
            .map(|section| {
                format!("{}\n{}", section.header(), self.section_body(*section, source_text, history))
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn section_body(
        &self,
        section: PromptSection,
        source_text: &str,
        history: &ConversationHistory
    ) -> String {
        match section {
            PromptSection::Persona => persona(),
            PromptSection::Procedure => procedure(),
            PromptSection::Formatting => formatting_rules(),
            PromptSection::History => {
                if history.is_empty() {
                    NO_HISTORY_MARKER.to_string()
                } else {
                    format_history_for_prompt(history).trim_end().to_string()
                }
            }
            PromptSection::Source => format!("{}\n{}\n{}", SOURCE_OPEN, source_text, SOURCE_CLOSE),
        }
    }
}

fn persona() -> String {
    [
        "You are a precise, modern translation engine for Traditional Chinese, Khmer and English.",
        "Fidelity to the meaning of the source is your first priority; never add, drop or soften content.",
        "Within that constraint, prefer the most natural, current wording a native speaker would use in the same situation, including common colloquial expressions.",
    ].join("\n")
}

fn procedure() -> String {
    let languages = Language::ALL
        .iter()
        .map(|l| l.display_name())
        .collect::<Vec<_>>()
        .join(", ");
    let mut lines = vec![
        format!("1. Detect the dominant language of the text. It is one of: {}.", languages),
        "2. Translate the text into the two other languages, using this line order:".to_string()
    ];
    for source in Language::ALL {
        let [first, second] = source.targets();
        lines.push(
            format!("   - Source in {}: line 1 {}, line 2 {}.", source, first, second)
        );
    }
    lines.push(
        "3. Output exactly two lines, one translation per line. Never more, never fewer.".to_string()
    );
    lines.push(
        "4. Use the recent conversation only to resolve context such as pronouns, tone and terminology; never translate it again.".to_string()
    );
    lines.join("\n")
}

fn formatting_rules() -> String {
    [
        "- Do not repeat the source text.".to_string(),
        "- Do not prefix lines with language names or labels such as \"English:\".".to_string(),
        "- Do not add explanations, notes, quotes or any other commentary.".to_string(),
        "- Emoji: only if the source text ends with emoji, end each translated line with exactly the same emoji. Never invent or add other emoji.".to_string(),
        format!(
            "- If you cannot produce one of the translations, write {} on that line instead of leaving it out.",
            ESCAPE_MARKER
        ),
    ].join("\n")
}
