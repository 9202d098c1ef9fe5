//! Instruction payload for the generation authority
//!
//! Output is a pure function of the request: same request, same prompt.

use crate::request::GenerationRequest;

const PREAMBLE: &str = "\
You are a front-end engineer who turns UI designs into clean HTML styled with Tailwind CSS utility classes.
Use the attached image as the visual reference and produce markup for the component described below.
When functional JavaScript is requested, add only the script the component needs to work (menus, carousels, modals, tabs) inside a single <script> tag at the end of the markup.
Return only raw HTML, plus that one <script> tag when applicable. Do not wrap the output in markdown code fences. Do not add explanations, notes or any text outside the markup.";

const CLOSING: &str = "\
Match the layout, spacing, colours and typography of the image as closely as you can.
Respond with the HTML only.";

/// Build the instruction text for `request`.
pub fn build_prompt(request: &GenerationRequest) -> String {
    let options = request.options();
    let mut prompt = String::with_capacity(1024);

    prompt.push_str(PREAMBLE);
    prompt.push_str("\n\nRequirements:\n");
    prompt.push_str(&format!("- Component type: \"{}\"\n", request.category()));
    if let Some(template) = request.template() {
        prompt.push_str(&format!("- Structure/template: \"{}\"\n", template.label()));
    }
    if let Some(text) = request.custom_instructions() {
        prompt.push_str(&format!("- Custom instructions: \"{}\"\n", text));
    }
    prompt.push_str(&format!("- Responsive design: {}\n", options.responsive));
    prompt.push_str(&format!(
        "- Semantic, performance-optimised HTML: {}\n",
        options.performance_optimized
    ));
    prompt.push_str(&format!(
        "- Accessibility features (ARIA attributes, labels, focus states): {}\n",
        options.accessible
    ));
    prompt.push_str(&format!("- Functional JavaScript: {}\n", options.include_javascript));
    prompt.push('\n');
    prompt.push_str(CLOSING);
    prompt
}
