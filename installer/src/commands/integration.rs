use std::collections::BTreeMap;

use anyhow::Result;
use tracing::info;

use crate::app::App;
use crate::cli::IntegrationCommand;
use crate::integrations::IntegrationWrapper;

/// Stores the integration Secret built from the subcommand's flags, then
/// applies the configuration side-effect: a product providing the freshly
/// configured integration is disabled.
pub async fn run(app: &App, command: &IntegrationCommand) -> Result<()> {
    let (name, data, force) = match command {
        IntegrationCommand::Github(args) => (
            "github",
            BTreeMap::from([
                ("appId".to_owned(), args.app_id.clone()),
                ("clientId".to_owned(), args.client_id.clone()),
                ("clientSecret".to_owned(), args.client_secret.clone()),
                ("webhookSecret".to_owned(), args.webhook_secret.clone()),
                ("privateKey".to_owned(), args.private_key.clone()),
                ("host".to_owned(), args.host.clone()),
            ]),
            args.force,
        ),
        IntegrationCommand::Gitlab(args) => (
            "gitlab",
            BTreeMap::from([
                ("token".to_owned(), args.token.clone()),
                ("appId".to_owned(), args.app_id.clone()),
                ("appSecret".to_owned(), args.app_secret.clone()),
                ("host".to_owned(), args.host.clone()),
            ]),
            args.force,
        ),
        IntegrationCommand::Quay(args) => (
            "quay",
            BTreeMap::from([
                ("token".to_owned(), args.token.clone()),
                ("organization".to_owned(), args.organization.clone()),
                ("host".to_owned(), args.host.clone()),
            ]),
            args.force,
        ),
    };

    let client = app.kube_client().await?;
    let wrapper = IntegrationWrapper::new(&app.ctx, client);
    wrapper.apply(name, data, force).await?;
    info!(integration = name, "integration secret stored");

    let collection = app.collection()?;
    wrapper.disable_providing_product(name, &collection).await?;
    Ok(())
}
