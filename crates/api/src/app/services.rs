//! Service wiring: picks store/directory backends from configuration.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use delegate_core::{Clock, SystemClock};
use delegate_infra::config::{ATTR_COMPANY_ID, ATTR_DELEGATED_ROLE};
use delegate_infra::directory::{AppRoleDirectory, InMemoryDirectory, UserDirectory};
use delegate_infra::invitation_store::{
    FileInvitationStore, InMemoryInvitationStore, InvitationStore, PostgresInvitationStore,
};
use delegate_infra::{AppConfig, InvitationService, RoleResolver, StoreConfig, UserAdminService};

use crate::connector::RedeemClaimNames;

/// Names the callback endpoints read from and write to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackSettings {
    /// Response attribute for resolved app roles.
    pub role_attribute: String,
    /// Payload field (matched ignoring case) carrying the invitation code.
    pub invitation_code_field: String,
    pub redeem_claims: RedeemClaimNames,
}

impl CallbackSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            role_attribute: config.role_attribute.clone(),
            invitation_code_field: config.attributes.invitation_code_field(),
            redeem_claims: RedeemClaimNames {
                company_id: config.attributes.extension_name(ATTR_COMPANY_ID),
                role: config.attributes.extension_name(ATTR_DELEGATED_ROLE),
            },
        }
    }
}

pub struct AppServices {
    pub invitations: InvitationService,
    pub users: UserAdminService,
    pub roles: RoleResolver,
    pub callback: CallbackSettings,
}

impl AppServices {
    pub fn new(
        store: Arc<dyn InvitationStore>,
        users: Arc<dyn UserDirectory>,
        app_roles: Arc<dyn AppRoleDirectory>,
        clock: Arc<dyn Clock>,
        callback: CallbackSettings,
    ) -> Self {
        Self {
            invitations: InvitationService::new(store, users.clone(), clock),
            users: UserAdminService::new(users),
            roles: RoleResolver::new(app_roles),
            callback,
        }
    }
}

pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let store: Arc<dyn InvitationStore> = match &config.store {
        StoreConfig::Memory => {
            warn!("invitations are kept in memory and lost on restart");
            Arc::new(InMemoryInvitationStore::new())
        }
        StoreConfig::File(dir) => {
            info!(dir = %dir.display(), "using file invitation store");
            Arc::new(
                FileInvitationStore::open(dir.clone())
                    .await
                    .context("opening file invitation store")?,
            )
        }
        StoreConfig::Postgres(url) => {
            info!("using postgres invitation store");
            Arc::new(
                PostgresInvitationStore::connect(url)
                    .await
                    .context("connecting to postgres invitation store")?,
            )
        }
    };

    let directory = match &config.directory_seed {
        Some(path) => {
            info!(seed = %path.display(), "loading directory seed");
            Arc::new(
                InMemoryDirectory::from_seed_file(path)
                    .await
                    .context("loading directory seed")?,
            )
        }
        None => {
            warn!("no directory seed configured; starting with an empty directory");
            Arc::new(InMemoryDirectory::new())
        }
    };

    Ok(AppServices::new(
        store,
        directory.clone(),
        directory,
        Arc::new(SystemClock),
        CallbackSettings::from_config(config),
    ))
}
