// Cross-cutting prompt fragments. Each agent defines its own prompt text in
// agents/prompts.rs and appends these where needed.

/// Keeps agents from inventing evidence that was not supplied.
pub const GROUNDING_INSTRUCTION: &str = "\
    CRITICAL: Base every judgement on the resume summary, repository signals and \
    evidence chunks provided. Do NOT infer, interpolate, or invent projects, \
    employers or skills. If the evidence does not support a claim, say so.";

/// Fields that are lists must be JSON arrays even when there is one item.
pub const LIST_FIELDS_INSTRUCTION: &str = "\
    Every field documented as a list MUST be a JSON array of strings, even when it \
    has a single element.";

/// Rough token estimate used for input audit logging.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}
