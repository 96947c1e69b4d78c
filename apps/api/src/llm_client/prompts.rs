// Shared prompt constants and prompt-building utilities.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Instruction against filling gaps with invented details.
pub const NO_INVENTION_INSTRUCTION: &str = "\
    Only use facts present in the provided content. \
    If a field is not supported by the content, return null for strings \
    and an empty array for lists. Do NOT infer or invent details.";
