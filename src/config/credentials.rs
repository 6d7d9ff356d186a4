use crate::core::auth::{
    ApiKeyAuthentication, BasicAuthentication, IamAccessToken, IamAuthentication, KeyLocation,
};
use crate::core::gateway::WatsonGateway;
use crate::core::service::WatsonService;
use crate::domain::ports::AuthenticationStrategy;
use crate::utils::error::{Result, WatsonError};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Credentials and client settings for one or more Watson services.
///
/// ```toml
/// [http]
/// timeout_seconds = 30
///
/// [services.language_translator]
/// url = "https://gateway.watsonplatform.net/language-translator/api"
/// username = "${TRANSLATOR_USERNAME}"
/// password = "${TRANSLATOR_PASSWORD}"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub services: HashMap<String, ServiceCredentials>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpConfig {
    pub timeout_seconds: Option<u64>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceCredentials {
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub api_key: Option<String>,
    /// `header` (default) or `query`.
    pub api_key_location: Option<String>,
    /// Header or query parameter carrying `api_key`. Defaults to `api_key`.
    pub api_key_name: Option<String>,
    pub iam_api_key: Option<String>,
    pub iam_url: Option<String>,
    pub token_url: Option<String>,
    pub access_token: Option<String>,
}

impl CredentialsConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content)?;

        let config: Self =
            toml::from_str(&processed).map_err(|e| WatsonError::ConfigValidationError {
                field: "toml_parsing".to_string(),
                message: format!("TOML parsing error: {}", e),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Replaces `${VAR}` with the environment value. Unset variables are left as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| WatsonError::ConfigValidationError {
            field: "environment".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn service(&self, name: &str) -> Result<&ServiceCredentials> {
        self.services
            .get(name)
            .ok_or_else(|| WatsonError::MissingConfigError {
                field: format!("services.{}", name),
            })
    }

    /// A gateway honouring the `[http]` section.
    pub fn gateway(&self) -> WatsonGateway {
        let mut gateway = WatsonGateway::default();
        if let Some(seconds) = self.http.timeout_seconds {
            gateway = gateway.with_timeout(Duration::from_secs(seconds));
        }
        if let Some(user_agent) = &self.http.user_agent {
            gateway = gateway.with_user_agent(user_agent.clone());
        }
        gateway
    }

    /// Builds a façade for the named service: its credentials, its URL override
    /// and the shared gateway settings.
    pub fn configure<S, F>(&self, name: &str, build: F) -> Result<S>
    where
        S: WatsonService,
        F: FnOnce(Arc<dyn AuthenticationStrategy>) -> S,
    {
        let credentials = self.service(name)?;
        let mut service = build(credentials.authentication(name)?).with_gateway(self.gateway());
        if let Some(url) = &credentials.url {
            service = service.with_service_url(url.clone());
        }
        Ok(service)
    }
}

impl Validate for CredentialsConfig {
    fn validate(&self) -> Result<()> {
        if let Some(seconds) = self.http.timeout_seconds {
            validation::validate_range("http.timeout_seconds", seconds, 1, 3600)?;
        }
        if let Some(level) = &self.logging.level {
            validation::validate_one_of(
                "logging.level",
                level,
                &["trace", "debug", "info", "warn", "error"],
            )?;
        }
        for (name, credentials) in &self.services {
            credentials.validate_named(name)?;
        }
        Ok(())
    }
}

impl ServiceCredentials {
    fn validate_named(&self, name: &str) -> Result<()> {
        let field = |key: &str| format!("services.{}.{}", name, key);

        for (key, url) in [
            ("url", &self.url),
            ("iam_url", &self.iam_url),
            ("token_url", &self.token_url),
        ] {
            if let Some(url) = url {
                validation::validate_url(&field(key), url)?;
            }
        }
        for (key, value) in [
            ("username", &self.username),
            ("api_key", &self.api_key),
            ("iam_api_key", &self.iam_api_key),
            ("access_token", &self.access_token),
        ] {
            if let Some(value) = value {
                validation::validate_non_empty_string(&field(key), value)?;
            }
        }
        if let Some(location) = &self.api_key_location {
            validation::validate_one_of(&field("api_key_location"), location, &["header", "query"])?;
        }
        Ok(())
    }

    /// Picks a strategy from whichever credentials are present, most specific first:
    /// access token, IAM API key, token exchange, basic, API key.
    pub fn authentication(&self, name: &str) -> Result<Arc<dyn AuthenticationStrategy>> {
        if let Some(token) = &self.access_token {
            return Ok(Arc::new(IamAccessToken::new(token.clone())));
        }

        if let Some(api_key) = &self.iam_api_key {
            let auth = match &self.iam_url {
                Some(url) => IamAuthentication::with_url(api_key.clone(), url.clone()),
                None => IamAuthentication::new(api_key.clone()),
            };
            return Ok(Arc::new(auth));
        }

        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            let auth = match &self.token_url {
                Some(token_url) => {
                    let service_url = validation::validate_required_field(
                        &format!("services.{}.url", name),
                        &self.url,
                    )?;
                    BasicAuthentication::with_token_url(
                        username.clone(),
                        password.clone(),
                        token_url.clone(),
                        service_url.clone(),
                    )
                }
                None => BasicAuthentication::new(username.clone(), password.clone()),
            };
            return Ok(Arc::new(auth));
        }

        if let Some(api_key) = &self.api_key {
            let location = match self.api_key_location.as_deref() {
                Some("query") => KeyLocation::Query,
                _ => KeyLocation::Header,
            };
            let key_name = self.api_key_name.as_deref().unwrap_or("api_key");
            return Ok(Arc::new(ApiKeyAuthentication::new(
                key_name,
                api_key.clone(),
                location,
            )));
        }

        Err(WatsonError::MissingConfigError {
            field: format!(
                "services.{} (access_token, iam_api_key, username/password or api_key)",
                name
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::LanguageTranslator;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_services() {
        let config = CredentialsConfig::from_toml_str(
            r#"
[http]
timeout_seconds = 15

[logging]
level = "debug"
format = "json"

[services.language_translator]
username = "user"
password = "pass"

[services.visual_recognition]
api_key = "k"
api_key_location = "query"
"#,
        )
        .unwrap();

        assert_eq!(config.http.timeout_seconds, Some(15));
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(
            config.service("language_translator").unwrap().username.as_deref(),
            Some("user")
        );
        assert!(config.service("tone_analyzer").is_err());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("WATSON_TEST_CRED_USER", "from-env");

        let config = CredentialsConfig::from_toml_str(
            r#"
[services.tone_analyzer]
username = "${WATSON_TEST_CRED_USER}"
password = "${WATSON_TEST_CRED_UNSET}"
"#,
        )
        .unwrap();
        let credentials = config.service("tone_analyzer").unwrap();
        assert_eq!(credentials.username.as_deref(), Some("from-env"));
        assert_eq!(
            credentials.password.as_deref(),
            Some("${WATSON_TEST_CRED_UNSET}")
        );

        std::env::remove_var("WATSON_TEST_CRED_USER");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let bad_url = CredentialsConfig::from_toml_str(
            r#"
[services.conversation]
url = "not a url"
username = "u"
password = "p"
"#,
        );
        assert!(matches!(
            bad_url,
            Err(WatsonError::InvalidConfigValueError { .. })
        ));

        let bad_location = CredentialsConfig::from_toml_str(
            r#"
[services.visual_recognition]
api_key = "k"
api_key_location = "cookie"
"#,
        );
        assert!(bad_location.is_err());

        let bad_timeout = CredentialsConfig::from_toml_str("[http]\ntimeout_seconds = 0\n");
        assert!(bad_timeout.is_err());
    }

    #[test]
    fn test_strategy_priority() {
        let mut credentials = ServiceCredentials {
            username: Some("u".to_string()),
            password: Some("p".to_string()),
            api_key: Some("k".to_string()),
            ..ServiceCredentials::default()
        };
        // basic credentials produce a token without a round trip
        let auth = credentials.authentication("svc").unwrap();
        assert_eq!(auth.token().as_deref(), Some("Basic dTpw"));

        credentials.access_token = Some("bearer-token".to_string());
        let auth = credentials.authentication("svc").unwrap();
        assert_eq!(auth.token().as_deref(), Some("bearer-token"));
        assert!(!auth.can_refresh());

        let api_key_only = ServiceCredentials {
            api_key: Some("k".to_string()),
            ..ServiceCredentials::default()
        };
        let auth = api_key_only.authentication("svc").unwrap();
        assert_eq!(auth.token().as_deref(), Some("k"));

        assert!(matches!(
            ServiceCredentials::default().authentication("svc"),
            Err(WatsonError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_token_url_requires_service_url() {
        let credentials = ServiceCredentials {
            username: Some("u".to_string()),
            password: Some("p".to_string()),
            token_url: Some("https://gateway.watsonplatform.net/authorization/api/v1/token".to_string()),
            ..ServiceCredentials::default()
        };
        assert!(matches!(
            credentials.authentication("speech_to_text"),
            Err(WatsonError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_configure_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            br#"
[services.language_translator]
url = "http://localhost:9999/language-translator/api/"
username = "u"
password = "p"
"#,
        )
        .unwrap();

        let config = CredentialsConfig::from_file(file.path()).unwrap();
        let translator: LanguageTranslator = config
            .configure("language_translator", LanguageTranslator::new)
            .unwrap();
        assert_eq!(
            translator.service_url(),
            "http://localhost:9999/language-translator/api"
        );
    }
}
