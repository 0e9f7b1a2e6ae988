//! System prompt handling and generation defaults
//!
//! Every conversation carries a system prompt steering models toward
//! well-formed markdown; the fence-repair pass in the stream normalizer
//! cleans up what slips through anyway. Claude-style models take the prompt
//! as a separate field, everything else as a leading system message.

use crate::api::{ChatMessage, Role};

/// Default system prompt pushing proper fenced code blocks
pub const MARKDOWN_SYSTEM_PROMPT: &str = r#"You MUST format your responses using proper markdown formatting.

Rules for code blocks:
1. ALWAYS use triple backticks (```) to create code blocks, NEVER use single backticks for multi-line code.
2. ALWAYS specify the language immediately after the opening backticks (e.g., ```python, ```javascript, ```mermaid).
3. ALWAYS include a newline after the opening backticks with language and before the closing backticks.
4. NEVER nest code blocks inside other code blocks.
5. For Mermaid diagrams, always use ```mermaid as the language identifier.

Other markdown formatting:
- Use # for main headings, ## for subheadings, etc.
- Use * or - for bullet points
- Use 1. 2. 3. for numbered lists
- Use > for blockquotes
- Use **text** for bold, *text* for italic
- Use [text](URL) for links
- Use | tables | like | this | for tables with headers
"#;

/// Default maximum tokens to generate
pub const DEFAULT_MAX_TOKENS: u32 = 2000;
/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
/// Default nucleus sampling parameter
pub const DEFAULT_TOP_P: f64 = 0.9;

/// Model prefix for Claude-style system prompt handling
const CLAUDE_PREFIX: &str = "anthropic.claude";

/// Prepare messages and system content for a given model
///
/// For Claude-style models the system prompt becomes a separate field:
/// system-role messages are folded into it and removed from the list. For
/// every other family a system message is inserted at the front unless the
/// conversation already carries one.
///
/// Returns the processed message list and the system content to pass
/// out-of-band (Claude-style only).
pub fn prepare_messages(
    messages: &[ChatMessage],
    system_prompt: Option<&str>,
    model: &str,
) -> (Vec<ChatMessage>, Option<String>) {
    let prompt = system_prompt.unwrap_or(MARKDOWN_SYSTEM_PROMPT);

    if model.starts_with(CLAUDE_PREFIX) {
        let mut system_content = prompt.to_string();
        let mut non_system = Vec::with_capacity(messages.len());
        for msg in messages {
            if msg.role == Role::System {
                system_content.push_str("\n\n");
                system_content.push_str(&msg.content);
            } else {
                non_system.push(msg.clone());
            }
        }
        (non_system, Some(system_content))
    } else {
        let mut prepared = messages.to_vec();
        if !prepared.iter().any(|m| m.role == Role::System) {
            prepared.insert(0, ChatMessage::new(Role::System, prompt));
        }
        (prepared, None)
    }
}
