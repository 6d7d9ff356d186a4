pub mod alchemy_language;
pub mod conversation;
pub mod language_translator;
pub mod natural_language_classifier;
pub mod personality_insights;
pub mod speech_to_text;
pub mod text_to_speech;
pub mod tone_analyzer;
pub mod visual_recognition;

pub use alchemy_language::AlchemyLanguage;
pub use conversation::Conversation;
pub use language_translator::LanguageTranslator;
pub use natural_language_classifier::NaturalLanguageClassifier;
pub use personality_insights::PersonalityInsights;
pub use speech_to_text::SpeechToText;
pub use text_to_speech::TextToSpeech;
pub use tone_analyzer::ToneAnalyzer;
pub use visual_recognition::VisualRecognition;
