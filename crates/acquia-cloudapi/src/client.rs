//! Asynchronous Cloud API client implementation.

use crate::models::{
    Database, DatabaseBackup, Environment, InstallType, MaxPhpProcsRequest, Server, Site, SshKey,
    SshKeyRequest, SvnUser, SvnUserRequest, Task,
};
use crate::paths;
use crate::Result;
use acquia_core::auth::{AuthProvider, BasicAuth};
use acquia_core::config::CloudApiConfig;
use acquia_core::dispatcher::RequestDispatcher;
use acquia_core::json::JsonCodec;
use acquia_core::names::{DatabaseName, EnvironmentName, ServerName, SiteName};
use acquia_core::request::{Body, Method};
use acquia_core::resource::{RawRecord, Resource, ResourceWrapper};
use acquia_core::transport::{ReqwestTransport, Transport};
use acquia_core::uri_template::Variables;
use bytes::Bytes;
use serde_json::json;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Default `User-Agent` for Cloud API requests.
pub const USER_AGENT: &str = concat!("acquia-cloudapi/", env!("CARGO_PKG_VERSION"));

/// Builder for [`CloudApiClient`].
///
/// Building validates the configuration and wires up authentication and the
/// transport. No network call happens until an endpoint method is awaited.
#[derive(Clone)]
pub struct CloudApiClientBuilder {
    config: CloudApiConfig,
    auth: Option<Arc<dyn AuthProvider>>,
    transport: Option<Arc<dyn Transport>>,
}

impl CloudApiClientBuilder {
    /// Create a builder for the default endpoint.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the credentials are invalid.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        Ok(Self::from_config(CloudApiConfig::new(username, password)?))
    }

    /// Create a builder from an existing configuration.
    #[must_use]
    pub fn from_config(config: CloudApiConfig) -> Self {
        Self {
            config,
            auth: None,
            transport: None,
        }
    }

    /// Create a builder from a key/value map (see [`CloudApiConfig::from_map`]).
    ///
    /// # Errors
    ///
    /// Returns [`acquia_core::Error::MissingConfig`] naming any missing required key.
    pub fn from_map<I, K, V>(supplied: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Ok(Self::from_config(CloudApiConfig::from_map(supplied)?))
    }

    /// Override the API endpoint (e.g. `https://cloudapi.acquia.com`).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config = self.config.with_base_url(base_url);
        self
    }

    /// Override the versioned base path.
    #[must_use]
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.config = self.config.with_base_path(base_path);
        self
    }

    /// Set a request timeout in seconds.
    #[must_use]
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.config = self.config.with_timeout(seconds);
        self
    }

    /// Override the `User-Agent` header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config = self.config.with_user_agent(user_agent);
        self
    }

    /// Replace the HTTP Basic provider built from the configured credentials.
    #[must_use]
    pub fn with_auth_provider(mut self, auth: Arc<dyn AuthProvider>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Replace the reqwest transport.
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if validation fails or the HTTP client
    /// cannot be built.
    pub fn build(self) -> Result<CloudApiClient> {
        self.config.validate_config()?;
        let base_url = self.config.parse_base_url()?;

        let auth = match self.auth {
            Some(auth) => auth,
            None => Arc::new(BasicAuth::new(self.config.credentials())),
        };
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(
                self.config.timeout(),
                Some(self.config.user_agent.as_deref().unwrap_or(USER_AGENT)),
            )?),
        };

        debug!(
            base_url = %base_url,
            base_path = %self.config.base_path,
            "Cloud API client built"
        );

        let dispatcher =
            RequestDispatcher::new(base_url, self.config.base_path.clone(), auth, transport);

        Ok(CloudApiClient {
            dispatcher,
            config: Arc::new(self.config),
        })
    }
}

impl fmt::Debug for CloudApiClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudApiClientBuilder")
            .field("config", &self.config)
            .field("custom_auth", &self.auth.is_some())
            .field("custom_transport", &self.transport.is_some())
            .finish()
    }
}

/// Asynchronous Cloud API client.
///
/// Cloning is cheap and clones share one dispatcher, so a client may be used
/// from many tasks at once. Every method issues exactly one request.
#[derive(Clone)]
pub struct CloudApiClient {
    dispatcher: RequestDispatcher,
    config: Arc<CloudApiConfig>,
}

impl CloudApiClient {
    /// Create a client for the default endpoint.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the credentials are invalid.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        CloudApiClientBuilder::new(username, password)?.build()
    }

    /// Create a client from a key/value configuration map.
    ///
    /// Defaults for `base_url` and `base_path` are merged first; `base_url`,
    /// `username` and `password` must then be present.
    ///
    /// # Errors
    ///
    /// Returns [`acquia_core::Error::MissingConfig`] naming the missing keys, or
    /// [`acquia_core::Error::ConfigError`] for malformed values.
    pub fn from_map<I, K, V>(supplied: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        CloudApiClientBuilder::from_map(supplied)?.build()
    }

    /// Start building a client.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the credentials are invalid.
    pub fn builder(
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<CloudApiClientBuilder> {
        CloudApiClientBuilder::new(username, password)
    }

    /// The configuration the client was built from.
    #[must_use]
    pub fn config(&self) -> &CloudApiConfig {
        &self.config
    }

    /// The API endpoint.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        self.dispatcher.base_url()
    }

    /// The dispatcher, for endpoints not wrapped by this client.
    #[must_use]
    pub fn dispatcher(&self) -> &RequestDispatcher {
        &self.dispatcher
    }

    /// List the names of every site the account can access.
    pub async fn sites(&self) -> Result<Vec<SiteName>> {
        self.dispatcher
            .call_as(Method::Get, paths::SITES, &Variables::new(), None)
            .await
    }

    /// Fetch a site.
    pub async fn site(&self, site: &SiteName) -> Result<Site> {
        self.get_one(paths::SITE, &site_vars(site)).await
    }

    /// List the environments of a site.
    pub async fn environments(&self, site: &SiteName) -> Result<Vec<Environment>> {
        self.get_list(paths::ENVIRONMENTS, &site_vars(site)).await
    }

    /// Fetch an environment.
    pub async fn environment(
        &self,
        site: &SiteName,
        env: &EnvironmentName,
    ) -> Result<Environment> {
        self.get_one(paths::ENVIRONMENT, &env_vars(site, env)).await
    }

    /// Install a distribution into an environment.
    pub async fn install_distro(
        &self,
        site: &SiteName,
        env: &EnvironmentName,
        install_type: InstallType,
        source: &str,
    ) -> Result<Task> {
        let vars = env_vars(site, env)
            .with("type", install_type)
            .with("source", source);
        self.send_one(Method::Post, paths::INSTALL_DISTRO, &vars, None)
            .await
    }

    /// List the servers of an environment.
    pub async fn servers(&self, site: &SiteName, env: &EnvironmentName) -> Result<Vec<Server>> {
        self.get_list(paths::SERVERS, &env_vars(site, env)).await
    }

    /// List the servers whose name matches a shell glob pattern.
    ///
    /// The pattern supports `*`, `?` and `[...]` classes (e.g. `web-[0-9]*`).
    /// Servers without a name never match.
    pub async fn servers_matching(
        &self,
        site: &SiteName,
        env: &EnvironmentName,
        pattern: &str,
    ) -> Result<Vec<Server>> {
        let servers = self.servers(site, env).await?;
        Ok(servers
            .into_iter()
            .filter(|server| {
                server
                    .wrapper()
                    .string("name")
                    .is_ok_and(|name| glob_matches(pattern, name))
            })
            .collect())
    }

    /// Fetch a server.
    pub async fn server(
        &self,
        site: &SiteName,
        env: &EnvironmentName,
        server: &ServerName,
    ) -> Result<Server> {
        self.get_one(paths::SERVER, &server_vars(site, env, server))
            .await
    }

    /// Calculate the maximum PHP process count for a server under each
    /// combination of memory limit and APC size.
    pub async fn max_php_procs(
        &self,
        site: &SiteName,
        env: &EnvironmentName,
        server: &ServerName,
        request: &MaxPhpProcsRequest,
    ) -> Result<RawRecord> {
        let value = self
            .dispatcher
            .call(
                Method::Post,
                paths::MAX_PHP_PROCS,
                &server_vars(site, env, server),
                Some(Body::json(request)?),
            )
            .await?;
        ResourceWrapper::from_value(value).map(ResourceWrapper::into_record)
    }

    /// List the SSH keys of a site.
    pub async fn ssh_keys(&self, site: &SiteName) -> Result<Vec<SshKey>> {
        self.get_list(paths::SSH_KEYS, &site_vars(site)).await
    }

    /// Fetch an SSH key.
    pub async fn ssh_key(&self, site: &SiteName, id: &str) -> Result<SshKey> {
        self.get_one(paths::SSH_KEY, &site_vars(site).with("id", id))
            .await
    }

    /// Grant an SSH public key access to a site.
    pub async fn add_ssh_key(
        &self,
        site: &SiteName,
        nickname: &str,
        ssh_pub_key: &str,
    ) -> Result<Task> {
        let body = Body::json(&SshKeyRequest {
            ssh_pub_key: ssh_pub_key.to_string(),
        })?;
        let vars = site_vars(site).with("nickname", nickname);
        self.send_one(Method::Post, paths::ADD_SSH_KEY, &vars, Some(body))
            .await
    }

    /// Revoke an SSH key.
    pub async fn delete_ssh_key(&self, site: &SiteName, id: &str) -> Result<Task> {
        let vars = site_vars(site).with("id", id);
        self.send_one(Method::Delete, paths::SSH_KEY, &vars, None)
            .await
    }

    /// List the SVN users of a site.
    pub async fn svn_users(&self, site: &SiteName) -> Result<Vec<SvnUser>> {
        self.get_list(paths::SVN_USERS, &site_vars(site)).await
    }

    /// Fetch an SVN user.
    pub async fn svn_user(&self, site: &SiteName, id: &str) -> Result<SvnUser> {
        self.get_one(paths::SVN_USER, &site_vars(site).with("id", id))
            .await
    }

    /// Create an SVN user.
    pub async fn add_svn_user(
        &self,
        site: &SiteName,
        username: &str,
        password: &str,
    ) -> Result<Task> {
        let body = Body::json(&SvnUserRequest {
            password: password.to_string(),
        })?;
        let vars = site_vars(site).with("username", username);
        self.send_one(Method::Post, paths::ADD_SVN_USER, &vars, Some(body))
            .await
    }

    /// Delete an SVN user.
    pub async fn delete_svn_user(&self, site: &SiteName, id: &str) -> Result<Task> {
        let vars = site_vars(site).with("id", id);
        self.send_one(Method::Delete, paths::SVN_USER, &vars, None)
            .await
    }

    /// List the databases of a site.
    pub async fn site_databases(&self, site: &SiteName) -> Result<Vec<Database>> {
        self.get_list(paths::SITE_DATABASES, &site_vars(site)).await
    }

    /// Fetch a site database.
    pub async fn site_database(&self, site: &SiteName, db: &DatabaseName) -> Result<Database> {
        self.get_one(paths::SITE_DATABASE, &site_vars(site).with("db", db))
            .await
    }

    /// List the databases of an environment.
    pub async fn environment_databases(
        &self,
        site: &SiteName,
        env: &EnvironmentName,
    ) -> Result<Vec<Database>> {
        self.get_list(paths::ENVIRONMENT_DATABASES, &env_vars(site, env))
            .await
    }

    /// Fetch an environment database.
    pub async fn environment_database(
        &self,
        site: &SiteName,
        env: &EnvironmentName,
        db: &DatabaseName,
    ) -> Result<Database> {
        self.get_one(paths::ENVIRONMENT_DATABASE, &db_vars(site, env, db))
            .await
    }

    /// List the backups of an environment database.
    pub async fn database_backups(
        &self,
        site: &SiteName,
        env: &EnvironmentName,
        db: &DatabaseName,
    ) -> Result<Vec<DatabaseBackup>> {
        self.get_list(paths::DATABASE_BACKUPS, &db_vars(site, env, db))
            .await
    }

    /// Fetch a database backup record.
    pub async fn database_backup(
        &self,
        site: &SiteName,
        env: &EnvironmentName,
        db: &DatabaseName,
        id: &str,
    ) -> Result<DatabaseBackup> {
        let vars = db_vars(site, env, db).with("id", id);
        self.get_one(paths::DATABASE_BACKUP, &vars).await
    }

    /// Download a database backup. The payload is returned undecoded.
    pub async fn download_database_backup(
        &self,
        site: &SiteName,
        env: &EnvironmentName,
        db: &DatabaseName,
        id: &str,
    ) -> Result<Bytes> {
        let vars = db_vars(site, env, db).with("id", id);
        self.dispatcher
            .download(paths::DATABASE_BACKUP_DOWNLOAD, &vars)
            .await
    }

    /// Serialize the client wiring, including credentials, as a service
    /// definition document.
    ///
    /// Output is markup-safe: `<`, `>`, `&`, `'` and `"` inside strings are
    /// written as `\u00XX` escapes.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn as_json(&self, pretty: bool) -> Result<String> {
        let document = json!({
            "services": {
                "cloud_api": {
                    "class": std::any::type_name::<Self>(),
                    "params": {
                        "username": self.config.username,
                        "password": self.config.password(),
                    }
                }
            }
        });
        JsonCodec::encode_markup_safe(&document, pretty)
    }

    /// Write [`as_json`](Self::as_json) to `path` and return it.
    ///
    /// # Errors
    ///
    /// Returns [`acquia_core::Error::Io`] if the file cannot be written.
    pub async fn write_json(&self, path: impl AsRef<Path>, pretty: bool) -> Result<String> {
        let path = path.as_ref();
        let document = self.as_json(pretty)?;
        warn!(
            path = %path.display(),
            "Writing Cloud API configuration including credentials to disk"
        );
        tokio::fs::write(path, &document).await?;
        Ok(document)
    }

    async fn get_one<R>(&self, template: &str, vars: &Variables) -> Result<R>
    where
        R: Resource,
    {
        self.send_one(Method::Get, template, vars, None).await
    }

    async fn get_list<R>(&self, template: &str, vars: &Variables) -> Result<Vec<R>>
    where
        R: Resource,
    {
        let value = self
            .dispatcher
            .call(Method::Get, template, vars, None)
            .await?;
        R::from_values(value)
    }

    async fn send_one<R>(
        &self,
        method: Method,
        template: &str,
        vars: &Variables,
        body: Option<Body>,
    ) -> Result<R>
    where
        R: Resource,
    {
        let value = self.dispatcher.call(method, template, vars, body).await?;
        R::from_value(value)
    }
}

impl fmt::Debug for CloudApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudApiClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for CloudApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let document = self.as_json(true).map_err(|_| fmt::Error)?;
        f.write_str(&document)
    }
}

fn site_vars(site: &SiteName) -> Variables {
    Variables::new().with("site", site)
}

fn env_vars(site: &SiteName, env: &EnvironmentName) -> Variables {
    site_vars(site).with("env", env)
}

fn server_vars(site: &SiteName, env: &EnvironmentName, server: &ServerName) -> Variables {
    env_vars(site, env).with("server", server)
}

fn db_vars(site: &SiteName, env: &EnvironmentName, db: &DatabaseName) -> Variables {
    env_vars(site, env).with("db", db)
}

/// Shell-style match in the manner of `fnmatch(3)` without flags: `*`
/// matches any run (including empty), `?` exactly one character and `[...]`
/// one character from a class such as `[a-z]`, negated with `[!...]` or
/// `[^...]`. A backslash escapes the next character and an unterminated `[`
/// matches itself.
fn glob_matches(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();

    let (mut p, mut n) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while n < name.len() {
        let step = match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, n));
                p += 1;
                continue;
            }
            Some('?') => Some(1),
            Some('[') => match bracket_class(&pattern[p..], name[n]) {
                Some((true, len)) => Some(len),
                Some((false, _)) => None,
                None => (name[n] == '[').then_some(1),
            },
            Some('\\') if p + 1 < pattern.len() => (pattern[p + 1] == name[n]).then_some(2),
            Some(&c) => (c == name[n]).then_some(1),
            None => None,
        };

        match (step, backtrack) {
            (Some(len), _) => {
                p += len;
                n += 1;
            }
            (None, Some((star, matched))) => {
                p = star + 1;
                n = matched + 1;
                backtrack = Some((star, matched + 1));
            }
            (None, None) => return false,
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

/// Match `ch` against the bracket class opening `class`.
///
/// Returns whether it matched and how many pattern characters the class
/// spans, or `None` when the class is never closed. A `]` right after the
/// opening bracket (or its negation) is a literal member.
fn bracket_class(class: &[char], ch: char) -> Option<(bool, usize)> {
    let mut i = 1;
    let negated = matches!(class.get(i), Some('!' | '^'));
    if negated {
        i += 1;
    }

    let mut matched = false;
    let mut first = true;
    loop {
        let member = *class.get(i)?;
        if member == ']' && !first {
            return Some((matched != negated, i + 1));
        }
        first = false;

        match (class.get(i + 1), class.get(i + 2)) {
            (Some('-'), Some(&end)) if end != ']' => {
                matched |= (member..=end).contains(&ch);
                i += 3;
            }
            _ => {
                matched |= member == ch;
                i += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acquia_core::Error;
    use serde_json::Value;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> CloudApiClient {
        CloudApiClientBuilder::new("user", "pass")
            .unwrap()
            .with_base_url(server.uri())
            .build()
            .unwrap()
    }

    fn site() -> SiteName {
        SiteName::from("devcloud:mysite")
    }

    fn env() -> EnvironmentName {
        EnvironmentName::from("prod")
    }

    #[test]
    fn test_glob_matches() {
        assert!(glob_matches("*", "web-14"));
        assert!(glob_matches("web-*", "web-14"));
        assert!(glob_matches("web-?4", "web-14"));
        assert!(glob_matches("*-1*", "staging-14"));
        assert!(glob_matches("web-14", "web-14"));
        assert!(!glob_matches("web-?", "web-14"));
        assert!(!glob_matches("db-*", "web-14"));
        assert!(!glob_matches("", "web-14"));
        assert!(glob_matches("", ""));
        assert!(glob_matches("**", ""));
    }

    #[test]
    fn test_glob_bracket_classes() {
        assert!(glob_matches("web-[0-9]*", "web-14"));
        assert!(glob_matches("web-1[45]", "web-14"));
        assert!(glob_matches("[wd]*", "db-3"));
        assert!(!glob_matches("web-[!0-9]*", "web-14"));
        assert!(!glob_matches("web-[^1]4", "web-14"));
        assert!(glob_matches("web-[!2-9]4", "web-14"));
        assert!(glob_matches("[]x]y", "]y"));
        assert!(glob_matches("*-[a-c]", "staging-b"));
        assert!(!glob_matches("*-[a-c]", "staging-d"));
    }

    #[test]
    fn test_glob_escapes_and_unterminated_class() {
        assert!(glob_matches(r"web\*", "web*"));
        assert!(!glob_matches(r"web\*", "web-14"));
        assert!(glob_matches(r"web\?", "web?"));
        assert!(glob_matches("web-[1", "web-[1"));
        assert!(!glob_matches("web-[1", "web-1"));
    }

    #[test]
    fn test_from_map_missing_password() {
        let err = CloudApiClient::from_map([("username", "user")]).unwrap_err();
        assert_eq!(
            err,
            Error::MissingConfig {
                keys: vec!["password".to_string()]
            }
        );
        assert!(err.is_config_error());
    }

    #[test]
    fn test_from_map_applies_defaults() {
        let client = CloudApiClient::from_map([("username", "user"), ("password", "pass")]).unwrap();
        assert_eq!(client.base_url().as_str(), "https://cloudapi.acquia.com/");
        assert_eq!(client.dispatcher().base_path(), "/v1");
    }

    #[test]
    fn test_as_json_dump() {
        let client = CloudApiClient::new("user", "p<a>ss").unwrap();
        let compact = client.as_json(false).unwrap();
        assert!(compact.contains(r#""password":"p\u003Ca\u003Ess""#));
        assert!(!compact.contains('<'));
        assert!(compact.contains("acquia_cloudapi::client::CloudApiClient"));

        let decoded: Value = serde_json::from_str(&compact).unwrap();
        assert_eq!(decoded["services"]["cloud_api"]["params"]["username"], "user");
        assert_eq!(decoded["services"]["cloud_api"]["params"]["password"], "p<a>ss");

        let pretty = client.to_string();
        assert!(pretty.contains("\n    \"services\""));
        assert_eq!(pretty, client.as_json(true).unwrap());
    }

    #[tokio::test]
    async fn test_write_json_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("cloudapi.json");
        let client = CloudApiClient::new("user", "pass").unwrap();

        let written = client.write_json(&file, true).await.unwrap();
        let on_disk = std::fs::read_to_string(&file).unwrap();
        assert_eq!(written, on_disk);
    }

    #[tokio::test]
    async fn test_write_json_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("missing").join("cloudapi.json");
        let client = CloudApiClient::new("user", "pass").unwrap();

        let err = client.write_json(&file, false).await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_debug_redacts_password() {
        let client = CloudApiClient::new("user", "hunter2").unwrap();
        assert!(!format!("{client:?}").contains("hunter2"));
    }

    #[tokio::test]
    async fn test_sites_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/sites.json"))
            .and(header("Authorization", "Basic dXNlcjpwYXNz"))
            .and(header("Content-Type", "application/json; charset=utf-8"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!(["devcloud:one", "enterprise-g1:two"])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let sites = test_client(&server).sites().await.unwrap();
        assert_eq!(sites, vec![SiteName::from("devcloud:one"), SiteName::from("enterprise-g1:two")]);
        assert_eq!(sites[1].hosting_stage(), "enterprise-g1");
    }

    #[tokio::test]
    async fn test_site_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/sites/devcloud%3Amysite.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "devcloud:mysite",
                "title": "My Site",
                "production_mode": "0",
                "vcs_type": "svn"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let site = test_client(&server).site(&site()).await.unwrap();
        assert_eq!(site.title().unwrap(), "My Site");
        assert!(!site.production_mode().unwrap());
        assert_eq!(site.to_string(), "devcloud:mysite");
    }

    #[tokio::test]
    async fn test_environment_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/sites/devcloud%3Amysite/envs/prod.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"name": "prod", "ssh_host": "h1"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let env = test_client(&server).environment(&site(), &env()).await.unwrap();
        assert_eq!(env.name().unwrap(), "prod");
        assert_eq!(env.ssh_host().unwrap(), "h1");
    }

    #[tokio::test]
    async fn test_servers_matching_filters_by_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/sites/devcloud%3Amysite/envs/prod/servers.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "web-14", "fqdn": "web-14.prod.hosting.acquia.com"},
                {"name": "web-15", "fqdn": "web-15.prod.hosting.acquia.com"},
                {"name": "ded-3", "fqdn": "ded-3.prod.hosting.acquia.com"},
                {"fqdn": "nameless.prod.hosting.acquia.com"}
            ])))
            .expect(2)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let all = client.servers(&site(), &env()).await.unwrap();
        assert_eq!(all.len(), 4);

        let web = client
            .servers_matching(&site(), &env(), "web-*")
            .await
            .unwrap();
        let names: Vec<String> = web.iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["web-14", "web-15"]);
    }

    #[tokio::test]
    async fn test_max_php_procs_posts_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(
                "/v1/sites/devcloud%3Amysite/envs/prod/servers/web-14/php-procs.json",
            ))
            .and(body_json(serde_json::json!({
                "memory_limits": ["64M", "128M"],
                "apc_shm": ["96M"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "64M": {"96M": 12},
                "128M": {"96M": 6}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let record = test_client(&server)
            .max_php_procs(
                &site(),
                &env(),
                &ServerName::from("web-14"),
                &MaxPhpProcsRequest::new(["64M", "128M"], ["96M"]),
            )
            .await
            .unwrap();
        assert_eq!(record["64M"]["96M"], 12);
    }

    #[tokio::test]
    async fn test_add_ssh_key_sends_nickname_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/sites/devcloud%3Amysite/sshkeys.json"))
            .and(query_param("nickname", "my laptop"))
            .and(body_json(serde_json::json!({"ssh_pub_key": "ssh-rsa AAAA me@host"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "1001",
                "queue": "site-update",
                "state": "waiting",
                "created": "1380000000"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let task = test_client(&server)
            .add_ssh_key(&site(), "my laptop", "ssh-rsa AAAA me@host")
            .await
            .unwrap();
        assert_eq!(task.id().unwrap(), "1001");
        assert!(!task.is_done().unwrap());
    }

    #[tokio::test]
    async fn test_delete_svn_user() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v1/sites/devcloud%3Amysite/svnusers/55.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": 7, "state": "done"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let task = test_client(&server)
            .delete_svn_user(&site(), "55")
            .await
            .unwrap();
        assert!(task.is_done().unwrap());
        assert_eq!(task.to_string(), "7");
    }

    #[tokio::test]
    async fn test_download_backup_returns_raw_bytes_with_auth() {
        let server = MockServer::start().await;
        let payload = vec![0x1f_u8, 0x8b, 0x08, 0x00, 0xff];
        Mock::given(method("GET"))
            .and(path(
                "/v1/sites/devcloud%3Amysite/envs/prod/dbs/mysite/backups/9/download.json",
            ))
            .and(header("Authorization", "Basic dXNlcjpwYXNz"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Type", "application/octet-stream")
                    .set_body_bytes(payload.clone()),
            )
            .expect(1)
            .mount(&server)
            .await;

        let bytes = test_client(&server)
            .download_database_backup(&site(), &env(), &DatabaseName::from("mysite"), "9")
            .await
            .unwrap();
        assert_eq!(bytes.to_vec(), payload);
    }

    #[tokio::test]
    async fn test_client_error_preserves_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/sites/devcloud%3Amysite/dbs/nope.json"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(serde_json::json!({"message": "Database not found"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = test_client(&server)
            .site_database(&site(), &DatabaseName::from("nope"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
        match err {
            Error::ClientError { message, body, .. } => {
                assert_eq!(message, "Database not found");
                assert_eq!(body, Some(serde_json::json!({"message": "Database not found"})));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_client_error_with_plain_text_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/sites/devcloud%3Amysite/sshkeys.json"))
            .respond_with(ResponseTemplate::new(403).set_body_string("<html>Forbidden</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let err = test_client(&server).ssh_keys(&site()).await.unwrap_err();
        assert_eq!(err.status(), Some(403));
    }

    #[tokio::test]
    async fn test_client_usable_after_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/sites/devcloud%3Amysite/svnusers.json"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/sites/devcloud%3Amysite/svnusers.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([{"id": "1", "username": "deploy"}])),
            )
            .mount(&server)
            .await;

        let client = test_client(&server);
        assert_eq!(client.svn_users(&site()).await.unwrap_err().status(), Some(500));

        let users = client.svn_users(&site()).await.unwrap();
        assert_eq!(users[0].username().unwrap(), "deploy");
        // SVN users carry no name, so they display as their id.
        assert_eq!(users[0].to_string(), "1");
    }

    #[tokio::test]
    async fn test_concurrent_calls_issue_independent_requests() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/sites/devcloud%3Amysite/envs.json"))
            .and(header("Authorization", "Basic dXNlcjpwYXNz"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!([{"name": "dev"}])),
            )
            .expect(2)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let other = client.clone();
        let (site_a, site_b) = (site(), site());
        let (first, second) = tokio::join!(
            client.environments(&site_a),
            other.environments(&site_b)
        );
        assert_eq!(first.unwrap()[0].to_string(), "dev");
        assert_eq!(second.unwrap()[0].to_string(), "dev");
    }

    #[tokio::test]
    async fn test_non_json_success_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/sites/devcloud%3Amysite.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = test_client(&server).site(&site()).await.unwrap_err();
        assert!(matches!(err, Error::DecodeError(_)));
    }

    #[tokio::test]
    async fn test_list_endpoint_rejects_object_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/sites/devcloud%3Amysite/dbs.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"name": "x"})))
            .mount(&server)
            .await;

        let err = test_client(&server)
            .site_databases(&site())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DecodeError(_)));
    }

    #[tokio::test]
    async fn test_install_distro_expands_type_and_source() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(
                "/v1/sites/devcloud%3Amysite/envs/dev/install/distro_url.json",
            ))
            .and(query_param("source", "https://example.com/drupal-7.tar.gz"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "88", "state": "waiting"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let task = test_client(&server)
            .install_distro(
                &site(),
                &EnvironmentName::from("dev"),
                InstallType::DistroUrl,
                "https://example.com/drupal-7.tar.gz",
            )
            .await
            .unwrap();
        assert_eq!(task.id().unwrap(), "88");
    }

    #[tokio::test]
    async fn test_add_svn_user_posts_password() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/sites/devcloud%3Amysite/svnusers/deploy.json"))
            .and(body_json(serde_json::json!({"password": "s3cret"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "90", "state": "done"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let task = test_client(&server)
            .add_svn_user(&site(), "deploy", "s3cret")
            .await
            .unwrap();
        assert!(task.is_done().unwrap());
    }

    #[tokio::test]
    async fn test_ssh_key_fetch_and_delete() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/sites/devcloud%3Amysite/sshkeys/21001.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "21001",
                "nickname": "laptop",
                "ssh_pub_key": "ssh-rsa AAAA"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/v1/sites/devcloud%3Amysite/sshkeys/21001.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "91", "state": "waiting"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let key = client.ssh_key(&site(), "21001").await.unwrap();
        assert_eq!(key.nickname().unwrap(), "laptop");

        let task = client.delete_ssh_key(&site(), "21001").await.unwrap();
        assert_eq!(task.state().unwrap(), "waiting");
    }

    #[tokio::test]
    async fn test_svn_user_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/sites/devcloud%3Amysite/svnusers/301.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "301", "username": "deploy"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let user = test_client(&server).svn_user(&site(), "301").await.unwrap();
        assert_eq!(user.id().unwrap(), "301");
    }

    #[tokio::test]
    async fn test_server_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/sites/devcloud%3Amysite/envs/prod/servers/web-14.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "web-14",
                "ami_type": "m1.large",
                "services": {"web": {}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let web = test_client(&server)
            .server(&site(), &env(), &ServerName::from("web-14"))
            .await
            .unwrap();
        assert_eq!(web.ami_type().unwrap(), "m1.large");
        assert!(web.has_service("web").unwrap());
    }

    #[tokio::test]
    async fn test_database_endpoints() {
        let server = MockServer::start().await;
        let db = DatabaseName::from("mysite");
        Mock::given(method("GET"))
            .and(path("/v1/sites/devcloud%3Amysite/dbs.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!([{"name": "mysite"}])),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/sites/devcloud%3Amysite/envs/prod/dbs.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "mysite", "instance_name": "mysitedb1"}
            ])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/sites/devcloud%3Amysite/envs/prod/dbs/mysite.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "mysite",
                "instance_name": "mysitedb1",
                "host": "ded-1"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/sites/devcloud%3Amysite/envs/prod/dbs/mysite/backups.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "1", "type": "daily"},
                {"id": "2", "type": "ondemand"}
            ])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/sites/devcloud%3Amysite/envs/prod/dbs/mysite/backups/2.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "2", "type": "ondemand"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        assert_eq!(client.site_databases(&site()).await.unwrap().len(), 1);

        let env_dbs = client.environment_databases(&site(), &env()).await.unwrap();
        assert_eq!(env_dbs[0].instance_name().unwrap(), "mysitedb1");

        let record = client
            .environment_database(&site(), &env(), &db)
            .await
            .unwrap();
        assert_eq!(record.host().unwrap(), "ded-1");

        let backups = client.database_backups(&site(), &env(), &db).await.unwrap();
        assert_eq!(backups.len(), 2);

        let backup = client
            .database_backup(&site(), &env(), &db, "2")
            .await
            .unwrap();
        assert_eq!(backup.backup_type().unwrap(), "ondemand");
    }
}
