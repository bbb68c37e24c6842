//! Prompt templates for Puls.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("valid placeholder pattern"));

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub rag: RagPrompts,
    pub condense: CondensePrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}

/// Prompts for grounded answer generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagPrompts {
    pub system: String,
    pub user: String,
}

impl Default for RagPrompts {
    fn default() -> Self {
        Self {
            system: r#"Tu es un assistant spécialisé dans les événements culturels de {{city}}.
Tu aides les utilisateurs à découvrir des événements culturels en te basant uniquement
sur les informations disponibles dans la base de données.

Réponds toujours en français de manière friendly et utile.
Si tu ne trouves pas d'information pertinente, dis-le clairement.
Ne fabrique jamais d'informations."#
                .to_string(),

            user: r#"Contexte des événements trouvés :
{{context}}

Question : {{question}}

Réponse :"#
                .to_string(),
        }
    }
}

/// Prompts for rewriting a follow-up into a standalone question.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CondensePrompts {
    pub user: String,
}

impl Default for CondensePrompts {
    fn default() -> Self {
        Self {
            user: r#"Étant donné la conversation suivante et une question de suivi, reformule la question de suivi pour qu'elle soit une question autonome, dans sa langue d'origine.

Historique de la conversation :
{{chat_history}}

Question de suivi : {{question}}
Question autonome :"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let rag_path = custom_path.join("rag.toml");
            if rag_path.exists() {
                let content = std::fs::read_to_string(&rag_path)?;
                prompts.rag = toml::from_str(&content)?;
            }

            let condense_path = custom_path.join("condense.toml");
            if condense_path.exists() {
                let content = std::fs::read_to_string(&condense_path)?;
                prompts.condense = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Placeholders are resolved in a single pass over the template: substituted values
    /// are never rescanned, and unknown placeholders are left as they are.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        PLACEHOLDER
            .replace_all(template, |caps: &Captures| match vars.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(
        &self,
        template: &str,
        vars: &std::collections::HashMap<String, String>,
    ) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
