use anyhow::Result;
use serde_json::{json, Value};

use crate::config::AuthConfig;
use crate::vendors::{self, solaredge};

/// Diagnostic one-shot: fetch and print static site metadata. Does not
/// touch the store or the archive.
pub fn site_info() -> Result<()> {
    let auth = AuthConfig::load()?;
    let agent = vendors::agent()?;

    let info = json!({
        "details": Value::Object(solaredge::get_site_details(&agent, &auth)?),
        "data_period": solaredge::get_site_data_period(&agent, &auth)?,
        "overview": solaredge::get_site_overview(&agent, &auth)?,
        "environmental_benefits": Value::Object(
            solaredge::get_environmental_benefits(&agent, &auth)?
        ),
    });
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}
