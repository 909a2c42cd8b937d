//! Resource URIs and their listings.

use crate::types::{ResourceDefinition, ResourceTemplateDefinition};

pub const CONFIG_URI: &str = "stand://config";
pub const ROUNDS_URI: &str = "stand://rounds";
pub const ARTIFACTS_URI: &str = "stand://artifacts";
pub const ROUND_PREFIX: &str = "stand://round/";

pub fn list_templates() -> Vec<ResourceTemplateDefinition> {
    vec![ResourceTemplateDefinition::json(
        &format!("{ROUND_PREFIX}{{id}}"),
        "Round",
        "One round: state, prompt, artifact chain, last score",
    )]
}

pub fn list_resources() -> Vec<ResourceDefinition> {
    vec![
        ResourceDefinition::json(
            CONFIG_URI,
            "Scoring Configuration",
            "Default method, sensitivity, weights, thresholds and API key status",
        ),
        ResourceDefinition::json(
            ROUNDS_URI,
            "Rounds",
            "Summaries of every open round, oldest first",
        ),
        ResourceDefinition::json(ARTIFACTS_URI, "Artifacts", "Stored generated images"),
    ]
}
