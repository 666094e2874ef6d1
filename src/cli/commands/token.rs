use anyhow::{anyhow, Context};
use serde_json::json;

use crate::auth::{generate_jwt, Claims, Role};
use crate::cli::utils::output_value;
use crate::cli::OutputFormat;
use crate::config;

/// Mint a JWT signed with the configured secret. Development aid only.
pub fn mint(uid: &str, company: &str, role: &str, hours: Option<u64>, output_format: &OutputFormat) -> anyhow::Result<()> {
    let role: Role = role.parse().map_err(|e: String| anyhow!(e))?;
    let security = &config::config().security;
    let hours = hours.unwrap_or(security.jwt_expiry_hours);

    let claims = Claims::new(uid, company, role, hours);
    let token = generate_jwt(&claims, &security.jwt_secret).context("failed to sign token")?;

    output_value(
        output_format,
        "Token minted",
        &token,
        Some(json!({"uid": uid, "companyId": company, "role": role, "exp": claims.exp})),
    )
}
