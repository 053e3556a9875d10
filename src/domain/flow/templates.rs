//! Local message templates.
//!
//! Opening prompts, coaching prompts, and fallback text for every step.
//! These are used whenever the generative backend is unavailable or its
//! reply is unusable, so every strategy always has something to say.

use crate::domain::design::{Stage, StepId, StructuredData};

/// Chips attached to every refinement offer.
pub const OFFER_CHIPS: [&str; 2] = ["Keep and continue", "Make it more specific"];

/// Returns the opening prompt for a step.
///
/// Per-entry steps name the phase or milestone being filled.
pub fn opening_message_for_step(step: StepId, pending_target: Option<&str>) -> String {
    match (step, pending_target) {
        (StepId::Activities, Some(phase)) => format!(
            "What will students actually do during the **{}** phase? List a few hands-on activities.",
            phase
        ),
        (StepId::Descriptions, Some(milestone)) => format!(
            "Describe the **{}**: who is the audience, what format will it take, and what must it include?",
            milestone
        ),
        _ => opening_for(step).to_string(),
    }
}

/// Three local what-if prompts for a step.
pub fn coaching_prompts_for_step(step: StepId) -> [&'static str; 3] {
    match step {
        StepId::BigIdea => [
            "What if the big idea was about how communities change over time?",
            "What if the big idea centered on the relationship between people and place?",
            "What if the big idea focused on power and who gets to decide?",
        ],
        StepId::EssentialQuestion => [
            "What if you asked \"How might we make our community more resilient?\"",
            "What if you asked \"Why do people see the same problem differently?\"",
            "What if you asked \"What makes a solution fair?\"",
        ],
        StepId::Challenge => [
            "What if students designed a proposal for a real local decision maker?",
            "What if students created a public campaign to change one habit?",
            "What if students built a prototype that solves a problem at school?",
        ],
        StepId::Phases => [
            "What if the phases were Launch, Investigate, Create, Share?",
            "What if the phases were Discover, Define, Design, Deliver?",
            "What if the phases were Question, Research, Build, Present?",
        ],
        StepId::Activities => [
            "What if students interviewed people affected by the problem?",
            "What if students collected their own data in the field?",
            "What if students prototyped and tested an early idea with peers?",
        ],
        StepId::Resources => [
            "What if you invited a local expert as a guest reviewer?",
            "What if students used open public data sets?",
            "What if you partnered with a library or museum?",
        ],
        StepId::Milestones => [
            "What if you called it a Research Report?",
            "What if you called it a Policy Brief?",
            "What if you called it a Prototype Showcase?",
        ],
        StepId::Descriptions => [
            "What if the audience was a panel of community experts?",
            "What if the format was a five minute pitch with slides?",
            "What if it had to include evidence from student interviews?",
        ],
        StepId::Assessment => [
            "What if you used a rubric co-created with students?",
            "What if students presented to an authentic audience panel?",
            "What if you added peer critique and self-reflection?",
        ],
    }
}

/// Asks the educator to refine or keep the offered value.
pub fn offer_text(step: StepId, value: &str) -> String {
    format!(
        "That works well as your {}. Would you like to refine it further, or move forward with \"{}\"?",
        step.label(),
        value
    )
}

/// Acknowledges a committed value.
pub fn accepted_text(step: StepId, value: &str) -> String {
    format!("Locked in \"{}\" as your {}.", value, step.label())
}

/// Asks for a what-if prompt to be restated in the educator's words.
pub fn what_if_text(step: StepId, concept: Option<&str>) -> String {
    match concept {
        Some(concept) => format!(
            "It sounds like \"{}\" speaks to you. How would you put that in your own words as your {}?",
            concept,
            step.label()
        ),
        None => format!(
            "What part of that idea speaks to you? Put it in your own words as your {}.",
            step.label()
        ),
    }
}

/// Introduces coaching prompts after a help request.
pub fn help_text(step: StepId) -> String {
    format!(
        "Here are a few directions to spark your {}. Pick one to explore, or write your own.",
        step.label()
    )
}

/// Breaks a run of help requests.
pub fn help_loop_nudge(step: StepId) -> String {
    format!(
        "Let's lock something in. Write a rough first draft of your {} (even a few words is fine) and we'll refine it together.",
        step.label()
    )
}

/// Asks for more detail on a short or ambiguous answer.
pub fn elaboration_text(step: StepId) -> String {
    format!(
        "Could you say a bit more? Tell me what you have in mind for your {}.",
        step.label()
    )
}

/// Responds to a request to refine the open offer.
pub fn refinement_text(step: StepId, value: &str) -> String {
    format!(
        "Let's sharpen \"{}\". What would make this {} more specific to your students and community?",
        value,
        step.label()
    )
}

/// Coaches after a rejected answer.
pub fn rejection_text(reason: &str) -> String {
    format!("{} Want to try again? Here are some directions to consider.", reason)
}

/// Summarizes a finished stage and opens the next one.
pub fn stage_complete_text(completed: Stage, data: &StructuredData, next: Stage) -> String {
    let summary = data.summarize(completed);
    if next == Stage::Complete {
        return format!(
            "Your design is complete! Here is everything we captured:\n\n{}",
            data.summarize(Stage::Complete)
        );
    }
    match next.first_step() {
        Some(step) => format!(
            "The {} stage is complete:\n\n{}\n\nNow on to the {} stage. {}",
            completed.label(),
            summary,
            next.label(),
            opening_message_for_step(step, data.pending_target(step).as_deref())
        ),
        None => summary,
    }
}

/// Reply for input received after the design is finished.
pub fn design_complete_text(data: &StructuredData) -> String {
    format!(
        "Your design is already complete. Ask to edit a step if you want to change something.\n\n{}",
        data.summarize(Stage::Complete)
    )
}

/// Reopens a step for editing.
pub fn edit_text(step: StepId, pending_target: Option<&str>) -> String {
    format!(
        "Let's revisit your {}. {}",
        step.label(),
        opening_message_for_step(step, pending_target)
    )
}

const BIG_IDEA_OPENING: &str = "Let's start with the big idea. What enduring concept or theme should this project explore? State it as a sentence, for example \"Communities are shaped by the water they share.\"";

const ESSENTIAL_QUESTION_OPENING: &str = "Now let's turn the big idea into an essential question: an open question students will wrestle with throughout the project. What would you ask?";

const CHALLENGE_OPENING: &str = "What authentic challenge will students take on? Describe the real problem they will tackle and who it matters to.";

const PHASES_OPENING: &str = "Let's map the learning journey. What phases will the project move through? Give each a short name, for example Launch, Investigate, Create, Share.";

const ACTIVITIES_OPENING: &str = "What will students actually do in each phase? List a few hands-on activities.";

const RESOURCES_OPENING: &str = "What resources will students draw on? Think experts, places, tools, and texts.";

const MILESTONES_OPENING: &str = "Now for the deliverables. What will students produce along the way? Name each milestone product, for example a Research Report or a Policy Brief.";

const DESCRIPTIONS_OPENING: &str = "Describe each deliverable: who is the audience, what format will it take, and what must it include?";

const ASSESSMENT_OPENING: &str = "Finally, how will you assess the work authentically? Think rubrics, critique, portfolios, or presentations to a real audience.";

fn opening_for(step: StepId) -> &'static str {
    match step {
        StepId::BigIdea => BIG_IDEA_OPENING,
        StepId::EssentialQuestion => ESSENTIAL_QUESTION_OPENING,
        StepId::Challenge => CHALLENGE_OPENING,
        StepId::Phases => PHASES_OPENING,
        StepId::Activities => ACTIVITIES_OPENING,
        StepId::Resources => RESOURCES_OPENING,
        StepId::Milestones => MILESTONES_OPENING,
        StepId::Descriptions => DESCRIPTIONS_OPENING,
        StepId::Assessment => ASSESSMENT_OPENING,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::design::WriteMode;

    #[test]
    fn every_step_has_an_opening_and_three_prompts() {
        for step in StepId::all() {
            assert!(!opening_message_for_step(step, None).is_empty());
            let prompts = coaching_prompts_for_step(step);
            assert!(prompts.iter().all(|p| p.to_lowercase().starts_with("what if")));
        }
    }

    #[test]
    fn per_entry_opening_names_target() {
        let text = opening_message_for_step(StepId::Descriptions, Some("Policy Brief"));
        assert!(text.contains("Policy Brief"));
    }

    #[test]
    fn offer_text_names_value() {
        let text = offer_text(StepId::Milestones, "Research Report");
        assert!(text.contains("refine it further, or move forward with \"Research Report\""));
    }

    #[test]
    fn stage_complete_text_opens_next_stage() {
        let mut data = StructuredData::default();
        data.write(StepId::BigIdea, "Water connects us", WriteMode::Fill).unwrap();
        let text = stage_complete_text(Stage::Ideation, &data, Stage::Journey);
        assert!(text.contains("Big idea: Water connects us"));
        assert!(text.contains("Learning Journey"));
    }

    #[test]
    fn final_stage_text_announces_completion() {
        let data = StructuredData::default();
        let text = stage_complete_text(Stage::Deliverables, &data, Stage::Complete);
        assert!(text.starts_with("Your design is complete!"));
    }

    #[test]
    fn edit_text_names_step_and_target() {
        let text = edit_text(StepId::Activities, Some("Investigate"));
        assert!(text.starts_with("Let's revisit your phase activities."));
        assert!(text.contains("Investigate"));
    }
}
