use clap::Parser;
use serde::Serialize;
use watson_sdk::config::{CliConfig, Command, CredentialsConfig, LogFormat};
use watson_sdk::services::personality_insights::{ProfileContent, ProfileOptions};
use watson_sdk::services::tone_analyzer::ToneOptions;
use watson_sdk::services::{
    LanguageTranslator, NaturalLanguageClassifier, PersonalityInsights, SpeechToText,
    TextToSpeech, ToneAnalyzer,
};
use watson_sdk::services::language_translator::TranslateWith;
use watson_sdk::utils::logger;
use watson_sdk::{ErrorCategory, Result, WatsonError};

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(command: Command, config: &CredentialsConfig) -> Result<()> {
    let name = command.service_name();
    match command {
        Command::Translate {
            text,
            model,
            source,
            target,
        } => {
            let translator = config.configure(name, LanguageTranslator::new)?;
            let with = match model {
                Some(model_id) => TranslateWith::Model(model_id),
                None => TranslateWith::languages(source, target),
            };
            print_json(&translator.translate(&text, &with).await?)
        }
        Command::Identify { text } => {
            let translator = config.configure(name, LanguageTranslator::new)?;
            print_json(&translator.identify(&text).await?)
        }
        Command::Languages => {
            let translator = config.configure(name, LanguageTranslator::new)?;
            print_json(&translator.get_identifiable_languages().await?)
        }
        Command::Classify {
            classifier_id,
            text,
        } => {
            let classifier = config.configure(name, NaturalLanguageClassifier::new)?;
            print_json(&classifier.classify(&classifier_id, &text).await?)
        }
        Command::Tone { text, tones } => {
            let analyzer = config.configure(name, ToneAnalyzer::new)?;
            let options = ToneOptions {
                tones,
                ..ToneOptions::default()
            };
            print_json(&analyzer.get_tone(&text, &options).await?)
        }
        Command::Profile { path } => {
            let insights = config.configure(name, PersonalityInsights::new)?;
            let text = std::fs::read_to_string(&path)?;
            print_json(
                &insights
                    .get_profile(&ProfileContent::Text(text), &ProfileOptions::default())
                    .await?,
            )
        }
        Command::Voices => {
            let tts = config.configure(name, TextToSpeech::new)?;
            print_json(&tts.get_voices().await?)
        }
        Command::SpeechModels => {
            let stt = config.configure(name, SpeechToText::new)?;
            print_json(&stt.get_models().await?)
        }
    }
}

fn exit_code(error: &WatsonError) -> i32 {
    match error.category() {
        ErrorCategory::Configuration => 2,
        ErrorCategory::Authentication => 3,
        ErrorCategory::Network => 4,
        ErrorCategory::Service | ErrorCategory::Data => 1,
    }
}

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    let config = match CredentialsConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            logger::init_cli_logger(cli.verbose);
            tracing::error!("Failed to load {}: {}", cli.config.display(), e);
            eprintln!("❌ {}", e);
            std::process::exit(exit_code(&e));
        }
    };

    match config.logging.format {
        LogFormat::Json => logger::init_json_logger(config.logging.level.as_deref().unwrap_or("info")),
        LogFormat::Compact => logger::init_cli_logger(cli.verbose),
    }
    tracing::debug!("CLI config: {:?}", cli);

    if let Err(e) = run(cli.command, &config).await {
        tracing::error!("Request failed: {} (category: {:?})", e, e.category());
        eprintln!("❌ {}", e);
        if e.is_retryable() {
            eprintln!("💡 The failure looks transient; retrying later may succeed.");
        }
        std::process::exit(exit_code(&e));
    }
}
