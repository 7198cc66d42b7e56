use crate::error::ClientError;
use copilot_chat_core::types::ConversationId;
use reqwest::Url;
use std::str::FromStr;

/// API version sent with every direct-to-engine request.
pub const DEFAULT_API_VERSION: &str = "2022-03-01-preview";

pub const ENV_ENVIRONMENT_ID: &str = "COPILOT_ENVIRONMENT_ID";
pub const ENV_AGENT_IDENTIFIER: &str = "COPILOT_AGENT_IDENTIFIER";
pub const ENV_CLOUD: &str = "COPILOT_CLOUD";
pub const ENV_AGENT_TYPE: &str = "COPILOT_AGENT_TYPE";
pub const ENV_DIRECT_CONNECT_URL: &str = "COPILOT_DIRECT_CONNECT_URL";

/// Power Platform cloud hosting the agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PowerPlatformCloud {
    #[default]
    Prod,
    Preprod,
    Gov,
    High,
    DoD,
    Mooncake,
}

impl PowerPlatformCloud {
    fn api_host_suffix(self) -> &'static str {
        match self {
            PowerPlatformCloud::Prod => "api.powerplatform.com",
            PowerPlatformCloud::Preprod => "api.preprod.powerplatform.com",
            PowerPlatformCloud::Gov => "api.gov.powerplatform.microsoft.us",
            PowerPlatformCloud::High => "api.high.powerplatform.microsoft.us",
            PowerPlatformCloud::DoD => "api.appsplatform.us",
            PowerPlatformCloud::Mooncake => "api.powerplatform.partner.microsoftonline.cn",
        }
    }

    /// How many trailing characters of the environment id form their own
    /// host label.
    fn id_suffix_len(self) -> usize {
        match self {
            PowerPlatformCloud::Prod | PowerPlatformCloud::Preprod => 2,
            _ => 1,
        }
    }
}

impl FromStr for PowerPlatformCloud {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "prod" | "public" => Ok(PowerPlatformCloud::Prod),
            "preprod" => Ok(PowerPlatformCloud::Preprod),
            "gov" => Ok(PowerPlatformCloud::Gov),
            "high" => Ok(PowerPlatformCloud::High),
            "dod" => Ok(PowerPlatformCloud::DoD),
            "mooncake" => Ok(PowerPlatformCloud::Mooncake),
            other => Err(ClientError::config(format!("unknown cloud '{other}'"))),
        }
    }
}

/// How the agent was created, which selects the URL family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AgentType {
    #[default]
    Published,
    Prebuilt,
}

impl AgentType {
    fn path_segment(self) -> &'static str {
        match self {
            AgentType::Published => "dataverse-backed",
            AgentType::Prebuilt => "prebuilt",
        }
    }
}

impl FromStr for AgentType {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "published" => Ok(AgentType::Published),
            "prebuilt" => Ok(AgentType::Prebuilt),
            other => Err(ClientError::config(format!("unknown agent type '{other}'"))),
        }
    }
}

/// Where to reach the agent service.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Power Platform environment GUID.
    pub environment_id: String,
    /// Schema name of the agent.
    pub agent_identifier: String,
    pub cloud: PowerPlatformCloud,
    pub agent_type: AgentType,
    /// Full agent URL; bypasses host derivation when set.
    pub direct_connect_url: Option<String>,
    pub api_version: String,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            environment_id: String::new(),
            agent_identifier: String::new(),
            cloud: PowerPlatformCloud::default(),
            agent_type: AgentType::default(),
            direct_connect_url: None,
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }
}

impl ConnectionSettings {
    pub fn new(environment_id: impl Into<String>, agent_identifier: impl Into<String>) -> Self {
        Self {
            environment_id: environment_id.into(),
            agent_identifier: agent_identifier.into(),
            ..Self::default()
        }
    }

    /// Settings that talk to a fixed agent URL.
    pub fn direct(url: impl Into<String>) -> Self {
        Self::default().with_direct_connect_url(url)
    }

    pub fn with_cloud(mut self, cloud: PowerPlatformCloud) -> Self {
        self.cloud = cloud;
        self
    }

    pub fn with_agent_type(mut self, agent_type: AgentType) -> Self {
        self.agent_type = agent_type;
        self
    }

    pub fn with_direct_connect_url(mut self, url: impl Into<String>) -> Self {
        self.direct_connect_url = Some(url.into());
        self
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, treating blank values as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let mut settings = Self {
            environment_id: get(ENV_ENVIRONMENT_ID).unwrap_or_default(),
            agent_identifier: get(ENV_AGENT_IDENTIFIER).unwrap_or_default(),
            direct_connect_url: get(ENV_DIRECT_CONNECT_URL),
            ..Self::default()
        };
        if let Some(cloud) = get(ENV_CLOUD) {
            settings.cloud = cloud.parse()?;
        }
        if let Some(agent_type) = get(ENV_AGENT_TYPE) {
            settings.agent_type = agent_type.parse()?;
        }
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if self.direct_connect_url.is_some() {
            return Ok(());
        }
        if self.environment_id.trim().is_empty() {
            return Err(ClientError::config(format!("{ENV_ENVIRONMENT_ID} is not set")));
        }
        if self.agent_identifier.trim().is_empty() {
            return Err(ClientError::config(format!("{ENV_AGENT_IDENTIFIER} is not set")));
        }
        Ok(())
    }

    /// Agent base URL, without the conversations path.
    pub fn base_url(&self) -> Result<Url, ClientError> {
        if let Some(url) = &self.direct_connect_url {
            return Url::parse(url)
                .map_err(|e| ClientError::config(format!("invalid direct connect url '{url}': {e}")));
        }
        self.validate()?;

        let url = format!(
            "https://{}/copilotstudio/{}/authenticated/bots/{}",
            self.environment_host()?,
            self.agent_type.path_segment(),
            self.agent_identifier.trim()
        );
        Url::parse(&url).map_err(|e| ClientError::config(format!("invalid agent url '{url}': {e}")))
    }

    /// URL of the start-conversation handshake.
    pub fn start_url(&self) -> Result<Url, ClientError> {
        self.conversations_url(None)
    }

    /// URL for one turn of an existing conversation.
    pub fn turn_url(&self, conversation_id: &ConversationId) -> Result<Url, ClientError> {
        self.conversations_url(Some(conversation_id))
    }

    fn conversations_url(&self, conversation_id: Option<&ConversationId>) -> Result<Url, ClientError> {
        let mut url = self.base_url()?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ClientError::config(format!("agent url cannot be a base: {}", self.describe())))?;
            segments.pop_if_empty().push("conversations");
            if let Some(id) = conversation_id {
                segments.push(id.as_str());
            }
        }
        url.query_pairs_mut().append_pair("api-version", &self.api_version);
        Ok(url)
    }

    fn environment_host(&self) -> Result<String, ClientError> {
        let id: String = self
            .environment_id
            .trim()
            .chars()
            .filter(|c| *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        let suffix_len = self.cloud.id_suffix_len();
        if id.len() <= suffix_len || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ClientError::config(format!(
                "invalid environment id '{}'",
                self.environment_id
            )));
        }
        let (prefix, suffix) = id.split_at(id.len() - suffix_len);
        Ok(format!(
            "{prefix}.{suffix}.environment.{}",
            self.cloud.api_host_suffix()
        ))
    }

    fn describe(&self) -> String {
        self.direct_connect_url
            .clone()
            .unwrap_or_else(|| format!("{}/{}", self.environment_id, self.agent_identifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn derives_prod_host_from_environment_id() {
        let settings = ConnectionSettings::new("Default-1234-ABCD", "cr981_guildhall");
        let url = settings.start_url().unwrap();
        assert_eq!(
            url.as_str(),
            "https://default1234ab.cd.environment.api.powerplatform.com/copilotstudio/dataverse-backed/authenticated/bots/cr981_guildhall/conversations?api-version=2022-03-01-preview"
        );
    }

    #[test]
    fn non_prod_clouds_split_one_character() {
        let settings = ConnectionSettings::new("abc123", "agent")
            .with_cloud(PowerPlatformCloud::Gov)
            .with_agent_type(AgentType::Prebuilt);
        let url = settings.base_url().unwrap();
        assert_eq!(url.host_str(), Some("abc12.3.environment.api.gov.powerplatform.microsoft.us"));
        assert!(url.path().starts_with("/copilotstudio/prebuilt/"));
    }

    #[test]
    fn turn_url_appends_encoded_conversation_id() {
        let settings = ConnectionSettings::direct("http://127.0.0.1:3001/agent/");
        let url = settings.turn_url(&ConversationId::new("a b")).unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:3001/agent/conversations/a%20b?api-version=2022-03-01-preview"
        );
    }

    #[test]
    fn from_lookup_requires_ids_without_direct_url() {
        let empty: HashMap<&str, &str> = HashMap::new();
        let err = ConnectionSettings::from_lookup(|key| empty.get(key).map(|v| v.to_string()))
            .unwrap_err();
        assert!(matches!(err, ClientError::Config { .. }));

        let vars = HashMap::from([
            (ENV_DIRECT_CONNECT_URL, "http://localhost:9000/bot"),
            (ENV_CLOUD, "gov"),
        ]);
        let settings =
            ConnectionSettings::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(settings.cloud, PowerPlatformCloud::Gov);
        assert!(settings.direct_connect_url.is_some());
    }

    #[test]
    fn rejects_unknown_cloud_names() {
        assert!("moon".parse::<PowerPlatformCloud>().is_err());
        assert_eq!("DoD".parse::<PowerPlatformCloud>().unwrap(), PowerPlatformCloud::DoD);
    }

    #[test]
    fn rejects_short_environment_ids() {
        let settings = ConnectionSettings::new("a-b", "agent");
        assert!(settings.base_url().is_err());
    }
}
