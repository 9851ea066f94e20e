//! Endpoint path templates.
//!
//! Every template starts with `{+base_path}`, which the dispatcher binds to
//! the configured API version segment. Query parameters are part of the
//! template and expand like any other variable.

/// `GET` list of site names.
pub const SITES: &str = "{+base_path}/sites.json";
/// `GET` one site.
pub const SITE: &str = "{+base_path}/sites/{site}.json";

/// `GET` environments of a site.
pub const ENVIRONMENTS: &str = "{+base_path}/sites/{site}/envs.json";
/// `GET` one environment.
pub const ENVIRONMENT: &str = "{+base_path}/sites/{site}/envs/{env}.json";
/// `POST` install a distribution into an environment.
pub const INSTALL_DISTRO: &str =
    "{+base_path}/sites/{site}/envs/{env}/install/{type}.json?source={source}";

/// `GET` servers of an environment.
pub const SERVERS: &str = "{+base_path}/sites/{site}/envs/{env}/servers.json";
/// `GET` one server.
pub const SERVER: &str = "{+base_path}/sites/{site}/envs/{env}/servers/{server}.json";
/// `POST` PHP max-process calculation for a server.
pub const MAX_PHP_PROCS: &str =
    "{+base_path}/sites/{site}/envs/{env}/servers/{server}/php-procs.json";

/// `GET` SSH keys of a site.
pub const SSH_KEYS: &str = "{+base_path}/sites/{site}/sshkeys.json";
/// `GET`/`DELETE` one SSH key.
pub const SSH_KEY: &str = "{+base_path}/sites/{site}/sshkeys/{id}.json";
/// `POST` a new SSH key.
pub const ADD_SSH_KEY: &str = "{+base_path}/sites/{site}/sshkeys.json?nickname={nickname}";

/// `GET` SVN users of a site.
pub const SVN_USERS: &str = "{+base_path}/sites/{site}/svnusers.json";
/// `GET`/`DELETE` one SVN user.
pub const SVN_USER: &str = "{+base_path}/sites/{site}/svnusers/{id}.json";
/// `POST` a new SVN user.
pub const ADD_SVN_USER: &str = "{+base_path}/sites/{site}/svnusers/{username}.json";

/// `GET` databases of a site.
pub const SITE_DATABASES: &str = "{+base_path}/sites/{site}/dbs.json";
/// `GET` one site database.
pub const SITE_DATABASE: &str = "{+base_path}/sites/{site}/dbs/{db}.json";
/// `GET` databases of an environment.
pub const ENVIRONMENT_DATABASES: &str = "{+base_path}/sites/{site}/envs/{env}/dbs.json";
/// `GET` one environment database.
pub const ENVIRONMENT_DATABASE: &str = "{+base_path}/sites/{site}/envs/{env}/dbs/{db}.json";
/// `GET` backups of an environment database.
pub const DATABASE_BACKUPS: &str = "{+base_path}/sites/{site}/envs/{env}/dbs/{db}/backups.json";
/// `GET` one database backup.
pub const DATABASE_BACKUP: &str =
    "{+base_path}/sites/{site}/envs/{env}/dbs/{db}/backups/{id}.json";
/// `GET` the raw payload of a database backup.
pub const DATABASE_BACKUP_DOWNLOAD: &str =
    "{+base_path}/sites/{site}/envs/{env}/dbs/{db}/backups/{id}/download.json";

/// Every endpoint template.
pub const ALL: &[&str] = &[
    SITES,
    SITE,
    ENVIRONMENTS,
    ENVIRONMENT,
    INSTALL_DISTRO,
    SERVERS,
    SERVER,
    MAX_PHP_PROCS,
    SSH_KEYS,
    SSH_KEY,
    ADD_SSH_KEY,
    SVN_USERS,
    SVN_USER,
    ADD_SVN_USER,
    SITE_DATABASES,
    SITE_DATABASE,
    ENVIRONMENT_DATABASES,
    ENVIRONMENT_DATABASE,
    DATABASE_BACKUPS,
    DATABASE_BACKUP,
    DATABASE_BACKUP_DOWNLOAD,
];

#[cfg(test)]
mod tests {
    use super::*;
    use acquia_core::uri_template::{UriTemplate, Variables};

    #[test]
    fn test_all_templates_parse_with_base_path_prefix() {
        for template in ALL {
            let parsed = UriTemplate::parse(template).unwrap();
            assert_eq!(parsed.variables().next(), Some("base_path"));
        }
    }

    #[test]
    fn test_database_templates_use_db_variable() {
        for template in [SITE_DATABASE, ENVIRONMENT_DATABASE, DATABASE_BACKUP] {
            let parsed = UriTemplate::parse(template).unwrap();
            assert!(parsed.variables().any(|name| name == "db"));
            assert!(!parsed.variables().any(|name| name == "database"));
        }
    }

    #[test]
    fn test_install_template_expands_query() {
        let vars = Variables::new()
            .with("base_path", "/v1")
            .with("site", "devcloud:mysite")
            .with("env", "dev")
            .with("type", "distro_url")
            .with("source", "http://example.com/d.tar.gz");
        let path = UriTemplate::parse(INSTALL_DISTRO).unwrap().expand(&vars).unwrap();
        assert_eq!(
            path,
            "/v1/sites/devcloud%3Amysite/envs/dev/install/distro_url.json?source=http%3A%2F%2Fexample.com%2Fd.tar.gz"
        );
    }
}
