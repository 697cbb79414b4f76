//! Builds the system prompt for a turn (§6): a default template rendered
//! with project instructions, the memory hot cache, and the discovered
//! skill index, unless `AgentConfig.system_prompt` overrides it outright.

use crate::config::AgentConfig;
use chrono::Local;
use minijinja::value::Value as JinjaValue;
use minijinja::{Environment, UndefinedBehavior, context};

const DEFAULT_SYSTEM_TEMPLATE: &str = r"You are a local coding co-worker operating directly in the user's workspace.

## Environment

Working directory: {{ working_dir }}
Date: {{ date }}
{% if hot_cache %}
## Memory

{{ hot_cache }}
{% endif %}
{% if instructions %}
## Project Instructions

{{ instructions }}
{% endif %}
{% if skills %}
## Available Skills

{% for skill in skills -%}
- {{ skill.name }}: {{ skill.description }}
{% endfor %}
{% endif %}
";

fn environment() -> Environment<'static> {
    let mut env = Environment::new();
    // Lenient undefined renders missing variables as empty rather than
    // erroring; the closest minijinja gets to the spec's "left verbatim"
    // wording for a template that only ever references known keys.
    env.set_undefined_behavior(UndefinedBehavior::Lenient);
    env.add_template("system", DEFAULT_SYSTEM_TEMPLATE)
        .expect("DEFAULT_SYSTEM_TEMPLATE must be valid minijinja syntax");
    env
}

/// Render the system prompt for a turn. `hot_cache` is the project/user
/// `AGENT.md` contents (empty string when neither exists).
pub fn build(config: &AgentConfig, hot_cache: &str, discovered_skills: &[(String, String)]) -> String {
    if let Some(override_prompt) = &config.system_prompt {
        return override_prompt.clone();
    }

    let env = environment();
    let tmpl = env.get_template("system").expect("system template registered");
    let skills: Vec<JinjaValue> = discovered_skills
        .iter()
        .map(|(name, description)| context! { name => name, description => description })
        .collect();

    tmpl.render(context! {
        working_dir => config.working_directory.display().to_string(),
        date => Local::now().format("%Y-%m-%d").to_string(),
        hot_cache => hot_cache,
        instructions => config.instructions.clone().unwrap_or_default(),
        skills => skills,
    })
    .unwrap_or_default()
}
