//! Loader for YAML prompt overrides.

use crate::types::PromptDefinition;
use notewise_core::{AppError, AppResult};
use std::path::Path;

/// Load a prompt definition from a YAML file.
///
/// # Example
/// ```no_run
/// use notewise_prompt::load_prompt_file;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt_file(Path::new("prompts/strict.yaml"))?;
/// println!("Loaded prompt: {}", prompt.id);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt_file(path: &Path) -> AppResult<PromptDefinition> {
    tracing::debug!("Loading prompt from: {:?}", path);

    if !path.exists() {
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            path
        )));
    }

    let contents = std::fs::read_to_string(path)
        .map_err(|e| AppError::Prompt(format!("Failed to read prompt file {:?}: {}", path, e)))?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents)
        .map_err(|e| AppError::Prompt(format!("Failed to parse prompt YAML {:?}: {}", path, e)))?;

    validate_prompt(&definition)?;

    tracing::info!("Loaded prompt: {}", definition.id);

    Ok(definition)
}

fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.trim().is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.template.contains("{{question}}") {
        return Err(AppError::Prompt(format!(
            "Prompt template '{}' never references {{{{question}}}}",
            def.id
        )));
    }

    if matches!(&def.system, Some(system) if system.trim().is_empty()) {
        return Err(AppError::Prompt(
            "Prompt system directive cannot be blank".to_string(),
        ));
    }

    Ok(())
}
