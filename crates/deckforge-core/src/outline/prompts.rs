//! Prompt templates for the three outline stages.
//!
//! Each builder returns the instruction text only; [`LlmRequest::for_topic`]
//! appends the topic marker.
//!
//! [`LlmRequest::for_topic`]: crate::llm::LlmRequest::for_topic

pub const TOPIC_DELIM: &str = "<<<TOPIC>>>";
pub const SUMMARY_START: &str = "<<<SUMMARY_START>>>";
pub const SUMMARY_END: &str = "<<<SUMMARY_END>>>";

/// Prompt asking for a title plus `sentences` summary lines between fixed delimiters.
pub fn summary_prompt(topic: &str, sentences: usize) -> String {
    let mut prompt = format!(
        "Write detailed, accurate material about: **{topic}**. Reply using exactly \
         the delimited layout below and put nothing outside the delimiters.\n\n\
         {TOPIC_DELIM}\n\
         [Topic Title: a short descriptive title for the topic]\n\
         {TOPIC_DELIM}\n\
         {SUMMARY_START}\n"
    );
    for n in 1..=sentences {
        let hint = if n == 1 {
            "a complete, informative sentence."
        } else if n == sentences {
            "a closing sentence that ties the core idea together."
        } else {
            "a new fact or detail that builds on the previous sentence."
        };
        prompt.push_str(&format!("[Summary Sentence {n}: {hint}]\n"));
    }
    prompt.push_str(SUMMARY_END);
    prompt.push_str("\n\n");
    prompt.push_str(
        "Rules:\n\
         - Go beyond the basics; every sentence must carry non-trivial information.\n\
         - Aim for roughly 500 to 700 words across all sentences.\n\
         - Each sentence stands on its own. No lists or bullets inside a sentence.\n\
         - Do not repeat information between sentences.\n\
         - Cover the major concepts, principles and applications of the topic.\n\
         - Keep the delimiters exactly as shown; anything else breaks parsing.\n",
    );
    prompt
}

/// Prompt asking for one short fenced code snippet in `language`.
pub fn code_prompt(topic: &str, language: &str) -> String {
    format!(
        "Give a short {language} code snippet that directly demonstrates a key idea of \
         the topic '{topic}'.\n\n\
         Rules:\n\
         - The code must relate clearly to an important part of the topic, not a generic example.\n\
         - Keep it between 10 and 25 lines, complete and runnable.\n\
         - Do not add explanations or comments.\n\
         - Reply with ONLY the code inside one fenced block:\n\n\
         ```{language}\n\
         # code goes here\n\
         ```\n"
    )
}

/// Prompt turning a summary (and optional code) into `---` separated slide blocks.
pub fn structure_prompt(topic: &str, summary: &[String], code: Option<(&str, &str)>) -> String {
    let mut prompt = format!(
        "Turn the material below into a slide outline for a presentation on '{topic}'.\n\n\
         Layout:\n\
         - Start with one line: `Title: <presentation title>`\n\
         - Then write each slide in this form, ending every slide with a line holding only `---`:\n\n\
         Slide <number>: <short slide title>\n\
         - <bullet point>\n\
         - <bullet point>\n\
         - <bullet point>\n\n\
         Image Suggestion: <a specific description of a diagram, chart, screenshot or illustration for this slide>\n\
         ---\n\n\
         Rules:\n\
         - Write 5 to 7 slides with 3 to 5 bullets each.\n\
         - Bullets are short phrases of 10 to 20 words, not full sentences.\n\
         - Use only facts from the summary.\n\
         - Every slide ends with an Image Suggestion line.\n\
         - No conversational text.\n"
    );

    if code.is_some() {
        prompt.push_str(
            "- Put the code snippet on its own slide titled `Code Example`, right after \
             the slide it illustrates, inside a fenced block.\n",
        );
    }

    prompt.push_str("\nSummary:\n");
    for line in summary {
        prompt.push_str(line);
        prompt.push('\n');
    }

    if let Some((language, snippet)) = code {
        prompt.push_str(&format!("\nCode snippet:\n\n```{language}\n{snippet}\n```\n"));
    }

    prompt
}
