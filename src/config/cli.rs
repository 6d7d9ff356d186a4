use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "watson")]
#[command(about = "Call IBM Watson services from the command line")]
pub struct CliConfig {
    /// Credentials file with a `[services.<name>]` table per service.
    #[arg(long, short, default_value = "watson.toml")]
    pub config: PathBuf,

    #[arg(long, short, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Translate text with a model or a source/target pair.
    Translate {
        text: Vec<String>,
        #[arg(long, conflicts_with_all = ["source", "target"])]
        model: Option<String>,
        #[arg(long, default_value = "en")]
        source: String,
        #[arg(long, default_value = "es")]
        target: String,
    },
    /// Identify the language of a text.
    Identify { text: String },
    /// List the languages the translator can identify.
    Languages,
    /// Classify text with a trained Natural Language Classifier.
    Classify { classifier_id: String, text: String },
    /// Analyse the tone of a text.
    Tone {
        text: String,
        #[arg(long, value_delimiter = ',')]
        tones: Vec<String>,
    },
    /// Build a personality profile from a text file.
    Profile { path: PathBuf },
    /// List text-to-speech voices.
    Voices,
    /// List speech-to-text models.
    SpeechModels,
}

impl Command {
    /// Key of the `[services.<name>]` table the command needs.
    pub fn service_name(&self) -> &'static str {
        match self {
            Command::Translate { .. } | Command::Identify { .. } | Command::Languages => {
                "language_translator"
            }
            Command::Classify { .. } => "natural_language_classifier",
            Command::Tone { .. } => "tone_analyzer",
            Command::Profile { .. } => "personality_insights",
            Command::Voices => "text_to_speech",
            Command::SpeechModels => "speech_to_text",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_translate() {
        let cli = CliConfig::parse_from([
            "watson", "--config", "creds.toml", "translate", "Hello", "--target", "fr",
        ]);
        assert_eq!(cli.config, PathBuf::from("creds.toml"));
        match cli.command {
            Command::Translate {
                text,
                model,
                source,
                target,
            } => {
                assert_eq!(text, vec!["Hello".to_string()]);
                assert!(model.is_none());
                assert_eq!(source, "en");
                assert_eq!(target, "fr");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_service_names() {
        let cli = CliConfig::parse_from(["watson", "-v", "speech-models"]);
        assert!(cli.verbose);
        assert_eq!(cli.command.service_name(), "speech_to_text");

        let cli = CliConfig::parse_from(["watson", "tone", "I am happy", "--tones", "emotion,social"]);
        assert_eq!(cli.command.service_name(), "tone_analyzer");
    }
}
