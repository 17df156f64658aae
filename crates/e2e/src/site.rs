//! Target application layout and reachability preflight

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};
use crate::page::Locator;

/// URLs, selectors and headings of the registration application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteMap {
    /// Application root
    pub base_url: String,

    /// Collected-forms endpoint the form posts to
    pub form_endpoint: String,

    pub registry_link: String,

    /// Text shown once the category step is open
    pub category_prompt: String,

    pub category_container: String,

    pub category_option: String,

    /// Heading of the company-information step
    pub company_info_heading: String,

    pub submit_button: String,

    pub submit_label: String,
}

impl Default for SiteMap {
    fn default() -> Self {
        Self {
            base_url: "https://dev.dexcarga.com/#/".to_string(),
            form_endpoint: "https://forms.hscollectedforms.net/collected-forms/submit/form"
                .to_string(),
            registry_link: r##"a[href="#/registry"] span.dxf-text-primary"##.to_string(),
            category_prompt: "Mi empresa es un(a)…".to_string(),
            category_container: ".row.col-md-8".to_string(),
            category_option: ".col-md-4.text-center".to_string(),
            company_info_heading: "Información de la empresa".to_string(),
            submit_button: "button.btn-primary".to_string(),
            submit_label: "Siguiente".to_string(),
        }
    }
}

impl SiteMap {
    /// Input bound to the given Angular form control
    pub fn control(&self, name: &str) -> Locator {
        Locator::css(format!(r#"input[formcontrolname="{}"]"#, name))
    }

    pub fn category(&self, index: usize) -> Locator {
        Locator::css(&self.category_option)
            .within(&self.category_container)
            .nth(index)
    }

    pub fn submit(&self) -> Locator {
        Locator::css(&self.submit_button).has_text(&self.submit_label)
    }
}

/// Wait until the application root answers with a non-server-error status
pub async fn wait_for_reachable(url: &str, timeout_duration: Duration) -> E2eResult<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;

    let start = Instant::now();
    let mut attempts = 0;

    while start.elapsed() < timeout_duration {
        attempts += 1;

        match client.get(url).send().await {
            Ok(resp) if !resp.status().is_server_error() => {
                info!("Target reachable at {} ({})", url, resp.status());
                return Ok(());
            }
            Ok(resp) => {
                warn!("Target returned {}", resp.status());
            }
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for {} to respond...", url);
                }
                if !e.is_connect() {
                    warn!("Reachability check error: {}", e);
                }
            }
        }

        sleep(Duration::from_millis(500)).await;
    }

    Err(E2eError::TargetUnreachable {
        url: url.to_string(),
        attempts,
    })
}
