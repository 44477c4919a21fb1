//! System/user prompt rendering for restricted-item classification.
//!
//! Two prompt styles share the same reference-category listing:
//!
//! - [`PromptStyle::Recall`] is the classifier prompt. It asks for several
//!   plausible labels per image and tells the model to include borderline
//!   matches, since a missed restricted item costs more than a false flag.
//! - [`PromptStyle::Precise`] asks for clear matches only. SFT exports use it
//!   so the trained answer matches the single curated label string.

use serde::{Deserialize, Serialize};
use std::fmt::Write;

use super::Taxonomy;

/// User turn paired with every image in SFT records.
pub const USER_PROMPT: &str =
    "Please classify the item in this image according to the categories defined in the system.";

/// Assistant prefill that steers the model straight into the JSON answer.
pub const PREFILL: &str = "Here are the classification result:\n```json";

/// Label returned by the model when no category applies.
pub const NO_MATCH_LABEL: &str = "无";

/// Which instructions surround the reference categories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptStyle {
    /// Multi-label, recall-first classification
    #[default]
    Recall,
    /// Clear matches only
    Precise,
}

const RECALL_HEADER: &str = "\
##ROLE##
You are an advanced image classification specialist analyzing e-commerce product images to identify multiple relevant category labels from the ##REFERENCE_CATEGORIES##. Your primary focus is comprehensive coverage (recall) over strict precision.
";

const RECALL_REQUIREMENTS: &str = "
##CRITICAL_MULTI_LABEL_REQUIREMENTS##

**IMPORTANT: Multiple Labels Are Expected and Preferred**
- Output several labels whenever multiple categories from ##REFERENCE_CATEGORIES## are plausible
- Think of this as providing comprehensive classification alternatives, not just the single best match
- Consider related categories, different levels of specificity, and various product aspects
- **Even if one label seems most accurate, include other reasonable alternatives**
- **Err on the side of inclusion** - it's better to flag potential matches than miss restricted items

**When to Output Multiple Labels (ENCOURAGED)**
- The product could belong to multiple related categories from ##REFERENCE_CATEGORIES##
- Different components or features suggest different classifications
- Similar items with slight variations might fit different categories
- There's reasonable uncertainty between closely related categories
- Borderline cases that might pose compliance risks
- Items that share characteristics with multiple restricted categories

##ANALYSIS_FRAMEWORK##
Follow this 4-step process using chain-of-thought reasoning:

**Step 1: Comprehensive Physical Attribute Extraction**
- Extract **ALL** objective physical attributes of **ALL** items in the image
- Focus on neutral, geometric, and material properties
- **DO NOT** interpret purpose or function yet - just observe
- **Shape:** Cylindrical, rectangular, pointed tip, curved edge, ring-shaped, telescoping
- **Components:** Handle, blade, trigger, nozzle, switch, USB port, chain, electrodes
- **Material/Texture:** Metallic, plastic, fabric, wooden, smooth, serrated, crystalline
- **Text/Markings:** Any visible letters, numbers, symbols, warnings, brand names
- **Size indicators:** Dimensions, child-oriented designs, scale references

**Step 2: Multi-Aspect Feature Analysis**
- **Primary features:** Main identifying characteristics
- **Secondary features:** Additional elements that might suggest other categories
- **Contextual clues:** Usage scenarios, accompanying items, packaging
- **Safety indicators:** Warning labels, hazard symbols, age restrictions
- **Design intent:** Child-friendly designs, tactical appearances, concealment features

**Step 3: Comprehensive Category Matching**
Compare identified features with **ALL** categories in ##REFERENCE_CATEGORIES##:
- Match observed features with each category's definition and key features
- **Consider multiple perspectives** - how different reviewers might categorize this item
- **Include borderline cases** that might pose compliance risks
- **Don't dismiss close matches** - include categories that are \"reasonably close\"
- **Think about related categories** that share similar characteristics
";

const RECALL_TRAILER: &str = "
##COMPLIANCE_GUIDELINES##
**Critical Guidelines for E-commerce Compliance:**
- **Prioritize recall over precision** - better to flag potential issues than miss them
- **Include items that could reasonably match** definitions from ##REFERENCE_CATEGORIES##, even with uncertainty
- **Borderline cases should be included** rather than excluded
- **Focus on identifying potential compliance risks** across all applicable categories
- **Remember: Your role is to catch potential issues, not make final judgments**

##EXECUTION_INSTRUCTIONS##
You must strictly follow ##ANALYSIS_FRAMEWORK## and ##OUTPUT_REQUIREMENTS##.
- Follow the 4-step analysis framework, then answer directly in the required JSON format without showing your analysis steps
- Refer to ##REFERENCE_CATEGORIES## for all classification decisions
- Apply ##COMPLIANCE_GUIDELINES## throughout your analysis

##REFERENCE_CATEGORIES##
";

const RECALL_REMINDER: &str = "
##FINAL_REMINDER##
**Multi-label output is PREFERRED and EXPECTED from ##REFERENCE_CATEGORIES##.**
- Think: \"What are ALL the ways this item could be problematic based on ##REFERENCE_CATEGORIES##?\"
- When in doubt about any category from ##REFERENCE_CATEGORIES##, include rather than exclude
";

const PRECISE_FRAMEWORK: &str = "\
# Image Classification Assistant

## Role
You are an image analyzer specialized in classifying visual content according to provided reference categories.

## Analysis Framework
You must follow this 4-step process for every image:

### Step 1: Physical Attribute Extraction
- Extract the objective physical attributes of all items in the image.
- Focus strictly on neutral, geometric, and material properties.
- **DO NOT** interpret the item's purpose, function, or potential use.
- Shape, components, material/texture, and any visible text or markings.

### Step 2: Feature Analysis
Based on your description, identify key features:
- Look for specific shapes (cylindrical, pointed, etc.)
- Identify materials (metal, plastic, fabric, etc.)
- Note functional elements (buttons, switches, blades, etc.)
- Check for size indicators or child-oriented designs

### Step 3: Category Matching
Compare identified features with the reference categories:
- Match observed features with the \"Key Features\" listed for each category
- Consider the \"Definition\" to understand the intended use or design purpose
- Determine if the item meets the criteria for any category
";

/// Render the classifier system prompt: multi-label, recall-first, allowing
/// at most `max_labels` labels per answer.
pub fn render_system_prompt(taxonomy: &Taxonomy, max_labels: usize) -> String {
    render_prompt(taxonomy, max_labels, PromptStyle::Recall)
}

/// Render the system prompt for `taxonomy` in the given style.
pub fn render_prompt(taxonomy: &Taxonomy, max_labels: usize, style: PromptStyle) -> String {
    let mut out = String::with_capacity(64 * 1024);

    // Writing into a String cannot fail.
    match style {
        PromptStyle::Recall => {
            out.push_str(RECALL_HEADER);
            let _ = write!(
                out,
                "
##PRIMARY_TASK##
Analyze the provided image and identify **UP TO {max_labels} MOST RELEVANT** category labels from ##REFERENCE_CATEGORIES##. You are **STRONGLY ENCOURAGED** to output multiple labels when the image could reasonably belong to several categories or when there's reasonable uncertainty.
"
            );
            out.push_str(RECALL_REQUIREMENTS);
            let _ = write!(
                out,
                "
**Step 4: Multi-Label Classification Output**
- **PREFERRED: Output 2-{max_labels} category labels** when multiple reasonable matches exist
- **Order by confidence level** (highest confidence first)
- **Use ONLY the OUTPUT_LABEL values** from ##REFERENCE_CATEGORIES##
- Separate multiple labels with English commas \",\" only
- **Single label output should be exceptional** - only when truly only one category applies
- If absolutely no categories match, return \"{NO_MATCH_LABEL}\" (this should be rare)

##OUTPUT_REQUIREMENTS##
- Follow exact JSON format: {{\"result\":\"label1,label2\"}}
- At most {max_labels} labels
- **When uncertain between categories, include both rather than choosing one**
- **DO NOT include escaped Unicode characters** in output
"
            );
            out.push_str(RECALL_TRAILER);
        }
        PromptStyle::Precise => {
            out.push_str(PRECISE_FRAMEWORK);
            let _ = write!(
                out,
                "
### Step 4: Final Classification
Provide classification result following these rules:
- Return only the category labels (the OUTPUT_LABEL values)
- If multiple categories apply, separate them with English commas \",\"
- Maximum of {max_labels} categories, ordered from highest to lowest confidence
- If no categories match, return \"{NO_MATCH_LABEL}\"
- Format your response as JSON: {{\"result\":\"label1,label2\"}}

## Output Requirements
- Perform Steps 1-3 internally (do not show your analysis)
- Only output the final JSON result from Step 4
- Do NOT include escaped Unicode characters in your output

## Important Guidelines
- Be precise - only classify items that clearly match the definitions
- If uncertain about a match, err on the side of caution and exclude it

## Reference Categories
"
            );
        }
    }

    write_categories(&mut out, taxonomy);

    if style == PromptStyle::Recall {
        out.push_str(RECALL_REMINDER);
    }
    out
}

fn write_categories(out: &mut String, taxonomy: &Taxonomy) {
    let mut section: Option<&str> = None;
    let mut number = 0;
    for group in &taxonomy.groups {
        let group_section = group.section.as_deref();
        match group_section {
            Some(name) if section != Some(name) => {
                let _ = write!(out, "\n## {name}\n");
            }
            _ => {}
        }
        section = group_section;

        let _ = write!(out, "\n### {}\n", group.name);
        for category in &group.categories {
            number += 1;
            let _ = write!(
                out,
                "\n{number}. **{}**\n   - **Definition**: {}\n",
                category.english, category.definition
            );
            if !category.key_features.is_empty() {
                let _ = writeln!(out, "   - **Key Features**: {}", category.key_features);
            }
            let _ = writeln!(out, "   - **OUTPUT_LABEL**: {}", category.label);
        }
    }
}

/// Render the user turn sent with each image to the classifier.
///
/// The recall style carries few-shot multi-label examples; the precise style
/// is the plain [`USER_PROMPT`].
pub fn render_user_prompt(style: PromptStyle, max_labels: usize) -> String {
    match style {
        PromptStyle::Precise => USER_PROMPT.to_string(),
        PromptStyle::Recall => format!(
            "Here are examples of good image classifications:

Example 1: [Image of tactical folding knife with finger ring]
{{\"result\":\"刀具,爪刀\"}}

Example 2: [Image of children's cartoon backpack with size label]
{{\"result\":\"儿童包\"}}

Example 3: [Image of butterfly knife with dual handles]
{{\"result\":\"蝴蝶刀,刀具\"}}

Now analyze the image and classify the item(s) according to the categories defined in the system, following the same multi-label approach shown in the examples above.

**IMPORTANT**
- Output {max_labels} labels AT MOST
- Order labels from highest to lowest confidence"
        ),
    }
}
