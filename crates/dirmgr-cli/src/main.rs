//! dirmgr - directory administration for employee and group entries
//!
//! Binds to an LDAP server with administrative credentials, runs one command and unbinds.

mod output;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dirmgr_core::AdminCredentials;
use dirmgr_ldap::{
    DirectoryAdminClient, DirectoryConfig, DistinguishedName, NewEmployee, SaltedSha256,
    DEFAULT_CONNECTION_TIMEOUT_SECS,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "dirmgr")]
#[command(version)]
#[command(about = "Administer employee and group entries in an LDAP directory", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory server (`host:port` or an ldap:// / ldaps:// URL)
    #[arg(long, env = "DIRMGR_SERVER", default_value = "localhost:10389")]
    server: String,

    /// Administrative bind DN
    #[arg(long, env = "DIRMGR_BIND_DN", default_value = "uid=admin,ou=system")]
    bind_dn: String,

    /// Administrative bind password
    #[arg(long, env = "DIRMGR_BIND_PASSWORD", hide_env_values = true)]
    password: String,

    /// Base DN holding employee entries
    #[arg(long, env = "DIRMGR_USER_BASE_DN")]
    user_base_dn: Option<DistinguishedName>,

    /// Base DN holding group entries
    #[arg(long, env = "DIRMGR_GROUP_BASE_DN")]
    group_base_dn: Option<DistinguishedName>,

    /// Upgrade a plain ldap:// connection with StartTLS
    #[arg(long)]
    starttls: bool,

    /// Skip TLS certificate verification
    #[arg(long)]
    no_tls_verify: bool,

    /// Additional PEM CA certificate to trust
    #[arg(long)]
    ca_cert: Option<PathBuf>,

    /// Connection and operation timeout in seconds
    #[arg(long, default_value_t = DEFAULT_CONNECTION_TIMEOUT_SECS)]
    timeout: u64,

    /// Print results and errors as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "DIRMGR_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Bind with the admin identity and report success
    Check,

    /// Create an employee entry
    AddEmployee {
        /// Employee number (keys the entry DN)
        employee_number: String,

        /// Given name
        #[arg(long)]
        given_name: String,

        /// Surname
        #[arg(long)]
        surname: String,

        /// Mail address
        #[arg(long)]
        mail: String,

        /// Initial password
        #[arg(long, env = "DIRMGR_EMPLOYEE_PASSWORD", hide_env_values = true)]
        employee_password: String,

        /// Store the password as salted {SSHA256}
        #[arg(long)]
        salted: bool,
    },

    /// Delete an employee entry
    DeleteEmployee {
        /// Employee number
        employee_number: String,
    },

    /// Move `cn=<name>` from one organizational unit to another
    MoveUser {
        /// Common name of the entry
        common_name: String,

        /// Current organizational unit DN
        #[arg(long)]
        from: DistinguishedName,

        /// Target organizational unit DN
        #[arg(long)]
        to: DistinguishedName,
    },

    /// List every person entry under the user base
    ListUsers,

    /// Show one employee entry
    ShowEmployee {
        /// Employee number
        employee_number: String,
    },

    /// Create a group entry
    CreateGroup {
        /// Group name
        name: String,

        /// POSIX group id (required by servers enforcing the NIS schema)
        #[arg(long)]
        gid: Option<u32>,
    },

    /// Add a member DN to a group
    AddMember {
        /// Group name
        group: String,

        /// Member DN
        member: DistinguishedName,
    },

    /// Remove a member DN from a group
    RemoveMember {
        /// Group name
        group: String,

        /// Member DN
        member: DistinguishedName,
    },

    /// Show a group and its members
    ShowGroup {
        /// Group name
        name: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::print_error(&err, cli.json);
            ExitCode::FAILURE
        }
    }
}

fn build_config(cli: &Cli) -> anyhow::Result<DirectoryConfig> {
    let credentials = AdminCredentials::new(cli.bind_dn.clone(), cli.password.clone());
    let mut config = DirectoryConfig::new(&cli.server, credentials)
        .with_context(|| format!("invalid server address `{}`", cli.server))?
        .with_starttls(cli.starttls)
        .with_tls_verification(!cli.no_tls_verify)
        .with_connection_timeout_secs(cli.timeout)
        .with_operation_timeout_secs(cli.timeout);

    if let Some(dn) = &cli.user_base_dn {
        config = config.with_user_base_dn(dn.clone());
    }
    if let Some(dn) = &cli.group_base_dn {
        config = config.with_group_base_dn(dn.clone());
    }
    if let Some(path) = &cli.ca_cert {
        config = config.with_tls_ca_cert(path.clone());
    }

    Ok(config)
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut client = DirectoryAdminClient::new(build_config(cli)?);
    if let Commands::AddEmployee { salted: true, .. } = cli.command {
        client = client.with_hasher(SaltedSha256);
    }

    client
        .connect()
        .await
        .with_context(|| format!("failed to bind to {}", client.config().url()))?;

    let outcome = execute(&mut client, &cli.command, cli.json).await;
    client.disconnect().await;
    outcome
}

async fn execute(
    client: &mut DirectoryAdminClient,
    command: &Commands,
    json: bool,
) -> anyhow::Result<()> {
    debug!(url = client.config().url(), "running command");

    match command {
        Commands::Check => {
            let config = client.config();
            let message = format!(
                "bound to {} as {}",
                config.url(),
                config.credentials().bind_dn()
            );
            output::print_message(&message, json)
        }
        Commands::AddEmployee {
            employee_number,
            given_name,
            surname,
            mail,
            employee_password,
            ..
        } => {
            let employee = NewEmployee::new(
                employee_number.as_str(),
                given_name.as_str(),
                surname.as_str(),
                mail.as_str(),
                employee_password.as_str(),
            );
            let dn = client.add_employee(&employee).await?;
            output::print_dn("created", &dn, json)
        }
        Commands::DeleteEmployee { employee_number } => {
            client.delete_employee(employee_number).await?;
            output::print_message(&format!("deleted employee {employee_number}"), json)
        }
        Commands::MoveUser {
            common_name,
            from,
            to,
        } => {
            let dn = client.move_user(common_name, from, to).await?;
            output::print_dn("moved", &dn, json)
        }
        Commands::ListUsers => {
            let users = client.show_all_users().await?;
            output::print_entries(&users, json)
        }
        Commands::ShowEmployee { employee_number } => {
            let employee = client.fetch_employee(employee_number).await?;
            output::print_employee(&employee, json)
        }
        Commands::CreateGroup { name, gid } => {
            let dn = match gid {
                Some(gid) => client.create_group_with_gid(name, *gid).await?,
                None => client.create_group(name).await?,
            };
            output::print_dn("created", &dn, json)
        }
        Commands::AddMember { group, member } => {
            client.add_user_to_group(group, member).await?;
            output::print_message(&format!("added {member} to {group}"), json)
        }
        Commands::RemoveMember { group, member } => {
            client.remove_user_from_group(group, member).await?;
            output::print_message(&format!("removed {member} from {group}"), json)
        }
        Commands::ShowGroup { name } => {
            let group = client.fetch_group(name).await?;
            output::print_group(&group, json)
        }
    }
}
