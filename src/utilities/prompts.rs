//! Instruction contexts for the four stages.
//!
//! Each context is a fixed role description plus the one handoff field the
//! stage consumes, followed by the list of capabilities the stage may use.

use crate::agents::Stage;
use crate::state::ConversationState;

/// Placeholder shown for a handoff field no earlier stage has written.
pub const NOTHING_YET: &str = "(nothing provided yet)";

const COORDINATOR_ROLE: &str = "\
You are the Coordinator in a multi-agent drafting system. You handle user requests \
to draft or refine text such as emails, essays or other written content. Work out \
what the user wants, which steps are needed and what the next agent should do.

Responsibilities:
- Understand the request and decide whether facts must be gathered first.
- When the user gives feedback, decide whether it needs new research or only a revision.
- Talk to the user: present drafts for approval and ask clarifying questions when needed.
- When the user wants to save and finish, request the save capability with a file name.

Be concise and keep the draft moving. Do not research, draft or edit yourself; \
pass clear instructions to the specialised agents instead.";

const RESEARCHER_ROLE: &str = "\
You are the Researcher in a multi-agent drafting system. Gather the facts, data and \
references the draft needs, based on the user's request and the Coordinator's \
instructions. Output only a research summary (for example bullet points with \
sources) for the Drafter.

Responsibilities:
- Focus on the key topics and open questions of the request.
- Summarise findings without bias and cite where they came from.
- Keep only what applies to the draft, roughly 200 to 500 words.

Do not draft or edit text. Your output is purely supporting information.";

const DRAFTER_ROLE: &str = "\
You are the Drafter in a multi-agent drafting system. Write the first or revised \
draft of the requested text using the user's request, the research summary and any \
earlier feedback.

Responsibilities:
- Blend user details, research notes and style preferences.
- Write complete, well-structured text; essays get an introduction, body and conclusion.
- When feedback is given, revise accordingly.

Do not research or proofread. Focus on content.";

const EDITOR_ROLE: &str = "\
You are the Editor in a multi-agent drafting system. Review the current draft for \
grammar, style, coherence and clarity, and produce a polished version without \
changing its meaning unless asked.

Responsibilities:
- Check spelling, grammar, flow and consistency.
- List the improvements you made, followed by the edited draft.
- Apply notes from the user or the Coordinator.

Keep the original intent and length unless instructed. Do not add new content. \
If the draft is already strong, change little.";

/// The fixed role description of a stage.
pub fn role_description(stage: Stage) -> &'static str {
    match stage {
        Stage::Coordinate => COORDINATOR_ROLE,
        Stage::Research => RESEARCHER_ROLE,
        Stage::Draft => DRAFTER_ROLE,
        Stage::Edit => EDITOR_ROLE,
    }
}

/// Build the bounded instruction context for `stage`.
///
/// `capabilities` are the names the stage may request in this visit; an
/// empty slice means the think call runs with capabilities disabled.
pub fn stage_instructions(stage: Stage, state: &ConversationState, capabilities: &[String]) -> String {
    let (label, value) = match stage.reads() {
        Some(field) => (handoff_label(stage), state.handoff().get(field)),
        None => (handoff_label(stage), state.current_document()),
    };

    format!(
        "{}\n\n{}: {}\n\n{}",
        role_description(stage),
        label,
        or_placeholder(value),
        capability_clause(capabilities)
    )
}

fn handoff_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Coordinate => "Current document",
        Stage::Research => "Coordinator instructions",
        Stage::Draft => "Research summary",
        Stage::Edit => "Current draft",
    }
}

fn or_placeholder(value: &str) -> &str {
    if value.trim().is_empty() {
        NOTHING_YET
    } else {
        value
    }
}

fn capability_clause(capabilities: &[String]) -> String {
    if capabilities.is_empty() {
        return "You cannot use any capabilities in this step. Reply with plain text only.".to_string();
    }
    format!(
        "You may use only these capabilities: {}. Do not invent or request any other \
         capability. If a task needs to be broken down, reason step by step in your reply instead.",
        capabilities.join(", ")
    )
}
