//! Prompt styles for rendering SFT records.
//!
//! A prompt style turns the `instruction` and `input` of a record into the
//! text the model sees before its response. The rendered prompt always ends
//! exactly where the response begins, so its token count is the number of
//! labels to mask.

use instructkit_core::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// System message used by the ChatML style.
pub const CHATML_SYSTEM_MESSAGE: &str = "You are a helpful assistant.";

const ALPACA_PREAMBLE: &str = "Below is an instruction that describes a task. \
     Write a response that appropriately completes the request.\n\n";
const ALPACA_INPUT_PREAMBLE: &str = "Below is an instruction that describes a task, \
     paired with an input that provides further context. \
     Write a response that appropriately completes the request.\n\n";

/// Known prompt styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptStyle {
    /// The instruction as-is, no markup.
    Default,
    /// Alpaca format: ### Instruction:\n...\n\n### Response:\n
    Alpaca,
    /// ChatML format: <|im_start|>role\ncontent<|im_end|>
    ChatMl,
    /// Llama-3 format: <|start_header_id|>role<|end_header_id|>\n\ncontent<|eot_id|>
    Llama3,
    /// Mistral format: [INST] message [/INST]
    Mistral,
    /// Gemma format: <start_of_turn>role\ncontent<end_of_turn>
    Gemma,
    /// Phi-3 format: <|user|>\ncontent<|end|>\n<|assistant|>\n
    Phi3,
}

impl PromptStyle {
    const ALL: [PromptStyle; 7] = [
        Self::Default,
        Self::Alpaca,
        Self::ChatMl,
        Self::Llama3,
        Self::Mistral,
        Self::Gemma,
        Self::Phi3,
    ];

    /// Resolve a prompt style by name (case insensitive).
    pub fn from_name(name: &str) -> Result<Self> {
        let lower = name.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|style| style.name() == lower)
            .or_else(|| match lower.as_str() {
                "raw" | "none" => Some(Self::Default),
                "llama-3" => Some(Self::Llama3),
                "phi-3" => Some(Self::Phi3),
                _ => None,
            })
            .ok_or_else(|| {
                Error::Config(format!(
                    "Unknown prompt style '{}'. Expected one of: {}",
                    name,
                    Self::names().join(", ")
                ))
            })
    }

    /// Canonical name of the style.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Alpaca => "alpaca",
            Self::ChatMl => "chatml",
            Self::Llama3 => "llama3",
            Self::Mistral => "mistral",
            Self::Gemma => "gemma",
            Self::Phi3 => "phi3",
        }
    }

    /// Canonical names of all styles.
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(PromptStyle::name).collect()
    }

    /// All styles.
    pub fn all() -> &'static [PromptStyle] {
        &Self::ALL
    }

    /// Render the prompt for an instruction and optional input.
    pub fn apply(&self, instruction: &str, input: &str) -> String {
        let user = || join_input(instruction, input);
        match self {
            Self::Default => user(),
            Self::Alpaca => format_alpaca(instruction, input),
            Self::ChatMl => format!(
                "<|im_start|>system\n{CHATML_SYSTEM_MESSAGE}<|im_end|>\n\
                 <|im_start|>user\n{}<|im_end|>\n\
                 <|im_start|>assistant\n",
                user()
            ),
            Self::Llama3 => format!(
                "<|begin_of_text|><|start_header_id|>user<|end_header_id|>\n\n{}<|eot_id|>\
                 <|start_header_id|>assistant<|end_header_id|>\n\n",
                user().trim()
            ),
            Self::Mistral => format!("[INST] {} [/INST]", user()),
            Self::Gemma => format!(
                "<start_of_turn>user\n{}<end_of_turn>\n<start_of_turn>model\n",
                user()
            ),
            Self::Phi3 => format!("<|user|>\n{}<|end|>\n<|assistant|>\n", user()),
        }
    }
}

impl Default for PromptStyle {
    fn default() -> Self {
        Self::ChatMl
    }
}

impl fmt::Display for PromptStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PromptStyle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

fn join_input(instruction: &str, input: &str) -> String {
    if input.is_empty() {
        instruction.to_string()
    } else {
        format!("{instruction}\n\n{input}")
    }
}

fn format_alpaca(instruction: &str, input: &str) -> String {
    if input.is_empty() {
        format!("{ALPACA_PREAMBLE}### Instruction:\n{instruction}\n\n### Response:\n")
    } else {
        format!(
            "{ALPACA_INPUT_PREAMBLE}### Instruction:\n{instruction}\n\n### Input:\n{input}\n\n### Response:\n"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(PromptStyle::from_name("chatml").unwrap(), PromptStyle::ChatMl);
        assert_eq!(PromptStyle::from_name("ChatML").unwrap(), PromptStyle::ChatMl);
        assert_eq!(PromptStyle::from_name("llama-3").unwrap(), PromptStyle::Llama3);
        assert_eq!(PromptStyle::from_name("raw").unwrap(), PromptStyle::Default);
        assert!(matches!(
            PromptStyle::from_name("vicuna"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_names_roundtrip() {
        for name in PromptStyle::names() {
            assert_eq!(PromptStyle::from_name(name).unwrap().name(), name);
        }
    }

    #[test]
    fn test_chatml_format() {
        let prompt = PromptStyle::ChatMl.apply("Hello, how are you?", "");
        assert!(prompt.starts_with("<|im_start|>system\nYou are a helpful assistant.<|im_end|>\n"));
        assert!(prompt.contains("<|im_start|>user\nHello, how are you?<|im_end|>\n"));
        assert!(prompt.ends_with("<|im_start|>assistant\n"));
    }

    #[test]
    fn test_alpaca_with_and_without_input() {
        let plain = PromptStyle::Alpaca.apply("Say hello", "");
        assert!(plain.contains("### Instruction:\nSay hello"));
        assert!(!plain.contains("### Input:"));
        assert!(plain.ends_with("### Response:\n"));

        let with_input = PromptStyle::Alpaca.apply("Summarize", "The fox jumps.");
        assert!(with_input.contains("### Input:\nThe fox jumps."));
        assert!(with_input.ends_with("### Response:\n"));
    }

    #[test]
    fn test_input_appended_to_instruction() {
        let prompt = PromptStyle::Default.apply("Translate", "bonjour");
        assert_eq!(prompt, "Translate\n\nbonjour");
        assert_eq!(PromptStyle::Default.apply("Translate", ""), "Translate");
    }

    #[test]
    fn test_chat_styles_end_at_response() {
        assert!(PromptStyle::Llama3
            .apply("What is 2+2?", "")
            .ends_with("<|start_header_id|>assistant<|end_header_id|>\n\n"));
        assert!(PromptStyle::Gemma
            .apply("Tell me a joke", "")
            .ends_with("<start_of_turn>model\n"));
        assert_eq!(PromptStyle::Mistral.apply("Hi", ""), "[INST] Hi [/INST]");
        assert!(PromptStyle::Phi3.apply("Hi", "").ends_with("<|assistant|>\n"));
    }
}
