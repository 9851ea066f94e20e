//! Cloud API resource models.
//!
//! Every model wraps the record the server returned and reads fields on
//! demand. Construction only requires a JSON object; a missing or malformed
//! field surfaces when its accessor is called.

use acquia_core::names::{self, DatabaseName, EnvironmentName, ServerName, SiteName};
use acquia_core::resource::{RawRecord, Resource};
use acquia_core::{resource_type, Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Version control system backing a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VcsType {
    /// Git repository
    Git,
    /// Subversion repository
    Svn,
}

impl VcsType {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Git => "git",
            Self::Svn => "svn",
        }
    }
}

impl fmt::Display for VcsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VcsType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "git" => Ok(Self::Git),
            "svn" => Ok(Self::Svn),
            _ => Err(Error::invalid_field("vcs_type", "`git` or `svn`")),
        }
    }
}

/// Source kind for a distribution install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallType {
    /// A named distribution (e.g. `acquia-drupal-7`)
    DistroName,
    /// URL of a distribution archive
    DistroUrl,
    /// A drupal.org project name
    Project,
    /// URL of a drush make file
    MakeUrl,
}

impl InstallType {
    /// Path segment for the install endpoint.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DistroName => "distro_name",
            Self::DistroUrl => "distro_url",
            Self::Project => "project",
            Self::MakeUrl => "make_url",
        }
    }
}

impl fmt::Display for InstallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

resource_type!(
    /// A hosted site.
    Site,
    "site",
    display = "name",
    fields = [
        "name",
        "title",
        "unix_username",
        "vcs_type",
        "vcs_url",
        "production_mode"
    ]
);

impl Site {
    /// Site name in `stage:username` format.
    pub fn name(&self) -> Result<SiteName> {
        self.wrapper().string("name").map(SiteName::from)
    }

    /// Human-readable title.
    pub fn title(&self) -> Result<&str> {
        self.wrapper().string("title")
    }

    /// Unix account the site runs as.
    pub fn unix_username(&self) -> Result<&str> {
        self.wrapper().string("unix_username")
    }

    /// Version control system.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidField`] for anything other than `git` or `svn`.
    pub fn vcs_type(&self) -> Result<VcsType> {
        self.wrapper().string("vcs_type")?.parse()
    }

    /// Repository URL.
    pub fn vcs_url(&self) -> Result<&str> {
        self.wrapper().string("vcs_url")
    }

    /// Whether the site is in production mode.
    pub fn production_mode(&self) -> Result<bool> {
        self.wrapper().bool("production_mode")
    }

    /// The hosting stage: the part of the name before the first `:`, or the
    /// whole name when it has none.
    pub fn hosting_stage(&self) -> Result<&str> {
        self.wrapper().string("name").map(names::hosting_stage)
    }
}

resource_type!(
    /// An environment (`dev`, `test`, `prod`, ...) of a site.
    Environment,
    "environment",
    display = "name",
    fields = ["name", "ssh_host", "vcs_path", "db_clusters"]
);

impl Environment {
    /// Environment name.
    pub fn name(&self) -> Result<EnvironmentName> {
        self.wrapper().string("name").map(EnvironmentName::from)
    }

    /// Host to SSH into.
    pub fn ssh_host(&self) -> Result<&str> {
        self.wrapper().string("ssh_host")
    }

    /// Branch or tag deployed to the environment.
    pub fn vcs_path(&self) -> Result<&str> {
        self.wrapper().string("vcs_path")
    }

    /// Database cluster identifiers. Numeric identifiers are rendered in
    /// decimal.
    pub fn db_clusters(&self) -> Result<Vec<String>> {
        self.wrapper()
            .array("db_clusters")?
            .iter()
            .map(|cluster| match cluster {
                Value::String(id) => Ok(id.clone()),
                Value::Number(id) => Ok(id.to_string()),
                _ => Err(Error::invalid_field(
                    "db_clusters",
                    "an array of cluster identifiers",
                )),
            })
            .collect()
    }
}

resource_type!(
    /// A server in an environment.
    Server,
    "server",
    display = "name",
    fields = [
        "name",
        "fqdn",
        "ec2_region",
        "availability_zone",
        "ami_type",
        "services"
    ]
);

impl Server {
    /// Short server name (e.g. `web-14`).
    pub fn name(&self) -> Result<ServerName> {
        self.wrapper().string("name").map(ServerName::from)
    }

    /// Fully qualified domain name.
    pub fn fqdn(&self) -> Result<&str> {
        self.wrapper().string("fqdn")
    }

    /// EC2 region.
    pub fn ec2_region(&self) -> Result<&str> {
        self.wrapper().string("ec2_region")
    }

    /// EC2 availability zone.
    pub fn availability_zone(&self) -> Result<&str> {
        self.wrapper().string("availability_zone")
    }

    /// EC2 instance type.
    pub fn ami_type(&self) -> Result<&str> {
        self.wrapper().string("ami_type")
    }

    /// Services running on the server, keyed by service name.
    pub fn services(&self) -> Result<&RawRecord> {
        self.wrapper().object("services")
    }

    /// Returns true if the server runs `service`.
    pub fn has_service(&self, service: &str) -> Result<bool> {
        self.services().map(|services| services.contains_key(service))
    }
}

resource_type!(
    /// An SSH public key granted access to a site.
    SshKey,
    "ssh key",
    display = "id",
    fields = ["id", "nickname", "ssh_pub_key"]
);

impl SshKey {
    /// Key identifier.
    pub fn id(&self) -> Result<String> {
        self.wrapper().scalar("id")
    }

    /// Nickname given when the key was added.
    pub fn nickname(&self) -> Result<&str> {
        self.wrapper().string("nickname")
    }

    /// The public key.
    pub fn ssh_pub_key(&self) -> Result<&str> {
        self.wrapper().string("ssh_pub_key")
    }
}

resource_type!(
    /// An SVN user of a site.
    SvnUser,
    "svn user",
    display = "id",
    fields = ["id", "username"]
);

impl SvnUser {
    /// User identifier.
    pub fn id(&self) -> Result<String> {
        self.wrapper().scalar("id")
    }

    /// Login name.
    pub fn username(&self) -> Result<&str> {
        self.wrapper().string("username")
    }
}

resource_type!(
    /// A site or environment database.
    Database,
    "database",
    display = "name",
    fields = [
        "name",
        "instance_name",
        "username",
        "password",
        "host",
        "db_cluster"
    ]
);

impl Database {
    /// Logical database name.
    pub fn name(&self) -> Result<DatabaseName> {
        self.wrapper().string("name").map(DatabaseName::from)
    }

    /// Physical instance name for an environment database.
    pub fn instance_name(&self) -> Result<&str> {
        self.wrapper().string("instance_name")
    }

    /// Database login.
    pub fn username(&self) -> Result<&str> {
        self.wrapper().string("username")
    }

    /// Database password.
    pub fn password(&self) -> Result<&str> {
        self.wrapper().string("password")
    }

    /// Database host.
    pub fn host(&self) -> Result<&str> {
        self.wrapper().string("host")
    }

    /// Cluster the database lives on.
    pub fn db_cluster(&self) -> Result<String> {
        self.wrapper().scalar("db_cluster")
    }
}

resource_type!(
    /// A database backup.
    DatabaseBackup,
    "database backup",
    display = "id",
    fields = [
        "id",
        "name",
        "type",
        "path",
        "link",
        "checksum",
        "started",
        "completed",
        "deleted"
    ]
);

impl DatabaseBackup {
    /// Backup identifier.
    pub fn id(&self) -> Result<String> {
        self.wrapper().scalar("id")
    }

    /// Database the backup was taken from.
    pub fn name(&self) -> Result<&str> {
        self.wrapper().string("name")
    }

    /// Backup kind (`daily`, `ondemand`, ...).
    pub fn backup_type(&self) -> Result<&str> {
        self.wrapper().string("type")
    }

    /// Storage path on the server.
    pub fn path(&self) -> Result<&str> {
        self.wrapper().string("path")
    }

    /// Download link.
    pub fn link(&self) -> Result<&str> {
        self.wrapper().string("link")
    }

    /// Checksum of the backup file.
    pub fn checksum(&self) -> Result<&str> {
        self.wrapper().string("checksum")
    }

    /// When the backup started.
    pub fn started(&self) -> Result<DateTime<Utc>> {
        self.wrapper().timestamp("started")
    }

    /// When the backup completed.
    pub fn completed(&self) -> Result<DateTime<Utc>> {
        self.wrapper().timestamp("completed")
    }

    /// Whether the backup has been deleted.
    pub fn deleted(&self) -> Result<bool> {
        self.wrapper().bool("deleted")
    }
}

resource_type!(
    /// An asynchronous task queued by a write operation.
    Task,
    "task",
    display = "id",
    fields = [
        "id",
        "queue",
        "state",
        "description",
        "sender",
        "result",
        "created",
        "started",
        "completed"
    ]
);

impl Task {
    /// Task identifier.
    pub fn id(&self) -> Result<String> {
        self.wrapper().scalar("id")
    }

    /// Queue the task runs on.
    pub fn queue(&self) -> Result<&str> {
        self.wrapper().string("queue")
    }

    /// Current state (`waiting`, `started`, `done`, `error`, ...).
    pub fn state(&self) -> Result<&str> {
        self.wrapper().string("state")
    }

    /// Human-readable description.
    pub fn description(&self) -> Result<&str> {
        self.wrapper().string("description")
    }

    /// Account that queued the task.
    pub fn sender(&self) -> Result<&str> {
        self.wrapper().string("sender")
    }

    /// Task output, if any has been recorded.
    pub fn result(&self) -> Result<Option<&str>> {
        self.wrapper().opt_string("result")
    }

    /// When the task was queued.
    pub fn created(&self) -> Result<DateTime<Utc>> {
        self.wrapper().timestamp("created")
    }

    /// When the task started, if it has.
    pub fn started(&self) -> Result<Option<DateTime<Utc>>> {
        self.wrapper().opt_timestamp("started")
    }

    /// When the task completed, if it has.
    pub fn completed(&self) -> Result<Option<DateTime<Utc>>> {
        self.wrapper().opt_timestamp("completed")
    }

    /// Returns true once the task finished successfully.
    pub fn is_done(&self) -> Result<bool> {
        self.state().map(|state| state == "done")
    }

    /// Returns true if the task failed.
    pub fn is_failed(&self) -> Result<bool> {
        self.state().map(|state| matches!(state, "error" | "failed"))
    }
}

/// Body of a PHP max-process calculation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaxPhpProcsRequest {
    /// PHP memory limits to evaluate (e.g. `64M`).
    pub memory_limits: Vec<String>,
    /// APC shared memory sizes to evaluate (e.g. `96M`).
    pub apc_shm: Vec<String>,
}

impl MaxPhpProcsRequest {
    /// Create a request from memory limits and APC sizes.
    #[must_use]
    pub fn new<I, J, S, T>(memory_limits: I, apc_shm: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            memory_limits: memory_limits.into_iter().map(Into::into).collect(),
            apc_shm: apc_shm.into_iter().map(Into::into).collect(),
        }
    }
}

/// Body for adding an SSH key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshKeyRequest {
    /// The public key to grant access.
    pub ssh_pub_key: String,
}

/// Body for adding an SVN user.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SvnUserRequest {
    /// Password for the new user.
    pub password: String,
}

impl fmt::Debug for SvnUserRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SvnUserRequest")
            .field("password", &"[REDACTED]")
            .finish()
    }
}
