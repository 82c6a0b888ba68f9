//! Desktop user-agent override for new pages

use anyhow::Result;
use chromiumoxide::{Page, cdp::browser_protocol::network::SetUserAgentOverrideParams};

use crate::utils::CHROME_USER_AGENT;

/// Report the pinned desktop Chrome user agent instead of the headless one
pub async fn apply_user_agent(page: &Page) -> Result<()> {
    page.execute(SetUserAgentOverrideParams {
        user_agent: CHROME_USER_AGENT.to_string(),
        accept_language: Some("en-US,en;q=0.9".to_string()),
        platform: None,
        user_agent_metadata: None,
    })
    .await?;
    Ok(())
}
