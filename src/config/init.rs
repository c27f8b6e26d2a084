// ABOUTME: Config scaffolding for new installations.
// ABOUTME: Writes a consign.yml template with every section filled in.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::{CONFIG_FILENAME, Config};

/// Write a template `consign.yml` into `dir`. Returns the path written.
pub fn init_config(dir: &Path, force: bool) -> Result<PathBuf> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let yaml = generate_template_yaml(&Config::template());
    std::fs::write(&config_path, yaml)?;

    Ok(config_path)
}

fn generate_template_yaml(config: &Config) -> String {
    let endpoints = &config.custody.endpoints;
    format!(
        r#"server:
  listen: "{listen}"

database:
  url: "{database}"

# Upper bound on any single custody, signing, or registry call
call_timeout: {timeout}

custody:
  base_url: "{custody_url}"
  client_id: {client_id}
  client_secret: {client_secret}
  endpoints:
    auth: "{auth}"
    deploy: "{deploy}"
    requests: "{requests}"
    approve: "{approve}"
    whitelists: "{whitelists}"
    whitelist_approve: "{whitelist_approve}"

signing:
  base_url: "{signing_url}"
  sign_endpoint: "{sign}"

registry:
  base_url: "{registry_url}"
  register_endpoint: "{register}"
"#,
        listen = config.server.listen,
        database = config.database.url,
        timeout = format!("{}s", config.call_timeout.as_secs()),
        custody_url = config.custody.base_url,
        client_id = config.custody.client_id.to_yaml(),
        client_secret = config.custody.client_secret.to_yaml(),
        auth = endpoints.auth,
        deploy = endpoints.deploy,
        requests = endpoints.requests,
        approve = endpoints.approve,
        whitelists = endpoints.whitelists,
        whitelist_approve = endpoints.whitelist_approve,
        signing_url = config.signing.base_url,
        sign = config.signing.sign_endpoint,
        registry_url = config.registry.base_url,
        register = config.registry.register_endpoint,
    )
}
