use crate::utils::error::{Result, WatsonError};
use std::future::Future;
use tokio::task::JoinHandle;

/// Runs `operation` on the Tokio runtime and hands its outcome to exactly one
/// of the two closures.
///
/// Façades borrow `self`, so clone the façade into the future:
///
/// ```no_run
/// # use std::sync::Arc;
/// # use watson_sdk::core::auth::NoAuthentication;
/// # use watson_sdk::services::language_translator::LanguageTranslator;
/// # async fn run() {
/// let translator = LanguageTranslator::new(Arc::new(NoAuthentication::new()));
/// watson_sdk::core::callback::dispatch(
///     async move { translator.get_identifiable_languages().await },
///     |languages| println!("{} languages", languages.len()),
///     |error| eprintln!("failed: {}", error),
/// );
/// # }
/// ```
pub fn dispatch<T, Op, S, F>(operation: Op, on_success: S, on_failure: F) -> JoinHandle<()>
where
    T: Send + 'static,
    Op: Future<Output = Result<T>> + Send + 'static,
    S: FnOnce(T) + Send + 'static,
    F: FnOnce(WatsonError) + Send + 'static,
{
    tokio::spawn(async move {
        match operation.await {
            Ok(value) => on_success(value),
            Err(error) => on_failure(error),
        }
    })
}
