use anyhow::{Result, bail};
use flotilla_config::{Config, ConfigError};
use tracing::info;

use crate::app::App;
use crate::cli::ConfigArgs;

pub async fn run(app: &App, args: &ConfigArgs) -> Result<()> {
    if args.create {
        create(app, args).await
    } else if args.get {
        get(app).await
    } else if args.delete {
        delete(app).await
    } else {
        bail!("pass one of --create, --get or --delete");
    }
}

async fn create(app: &App, args: &ConfigArgs) -> Result<()> {
    let namespace = args
        .namespace
        .as_deref()
        .unwrap_or(&app.ctx.namespace)
        .to_owned();
    let payload = match &args.path {
        Some(path) => std::fs::read_to_string(path)?,
        None => app.default_config_payload()?,
    };
    let config = Config::from_yaml(&payload, &namespace)?;

    let client = app.kube_client().await?;
    crate::k8s::ensure_namespace(&client, &namespace).await?;
    let manager = flotilla_config::ConfigMapManager::new(
        client,
        &namespace,
        &app.ctx.name,
        &app.ctx.config_label(),
    );
    match manager.create(&config).await {
        Ok(()) => {
            info!(namespace, "configuration created");
            Ok(())
        }
        Err(ConfigError::ConfigMapAlreadyExists(_)) if args.force => {
            manager.update(&config).await?;
            info!(namespace, "configuration updated");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

async fn get(app: &App) -> Result<()> {
    let client = app.kube_client().await?;
    let payload = app.config_manager(&client).get_payload().await?;
    print!("{payload}");
    Ok(())
}

async fn delete(app: &App) -> Result<()> {
    let client = app.kube_client().await?;
    app.config_manager(&client).delete().await?;
    info!("configuration deleted");
    Ok(())
}
