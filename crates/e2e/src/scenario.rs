//! The registration scenarios and the state machine they walk through

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{E2eError, E2eResult};
use crate::fixture::Fixture;
use crate::intercept::{ExpectedSubmission, RequestMatcher};
use crate::page::{Locator, Page};
use crate::site::SiteMap;
use crate::suffix::UniqueSuffix;
use crate::wait::{poll_until, WaitConfig};

/// Progress of a single scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioState {
    NotStarted,
    CategorySelected,
    FormFilled,
    Submitted,
    TermsAccepted,
    Asserted,
    Failed,
}

impl ScenarioState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ScenarioState::Asserted | ScenarioState::Failed)
    }

    /// Forward-only transitions; any non-terminal state may fail
    pub fn can_transition_to(self, next: ScenarioState) -> bool {
        use ScenarioState::*;

        match (self, next) {
            (from, Failed) => !from.is_terminal(),
            (NotStarted, CategorySelected)
            | (CategorySelected, FormFilled)
            | (FormFilled, Submitted)
            // field-level validation needs no submission
            | (FormFilled, Asserted)
            | (Submitted, TermsAccepted)
            | (Submitted, Asserted)
            | (TermsAccepted, Asserted) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ScenarioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScenarioState::NotStarted => "NotStarted",
            ScenarioState::CategorySelected => "CategorySelected",
            ScenarioState::FormFilled => "FormFilled",
            ScenarioState::Submitted => "Submitted",
            ScenarioState::TermsAccepted => "TermsAccepted",
            ScenarioState::Asserted => "Asserted",
            ScenarioState::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// One path through the registration flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    HappyPath,
    InvalidPassword,
    MismatchedPassword,
    InvalidEmail,
}

impl Scenario {
    pub const ALL: [Scenario; 4] = [
        Scenario::HappyPath,
        Scenario::InvalidPassword,
        Scenario::MismatchedPassword,
        Scenario::InvalidEmail,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Scenario::HappyPath => "happy-path",
            Scenario::InvalidPassword => "invalid-password",
            Scenario::MismatchedPassword => "mismatched-password",
            Scenario::InvalidEmail => "invalid-email",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Scenario::HappyPath => {
                "Should navigate to registration, select Transporter, fill details, accept terms, and see success message"
            }
            Scenario::InvalidPassword => "Should display an error message if the password is not valid",
            Scenario::MismatchedPassword => {
                "Should display an error message if the password confirmation does not match"
            }
            Scenario::InvalidEmail => "Should display an error message if the email is not valid",
        }
    }

    pub fn from_name(name: &str) -> E2eResult<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.name() == name)
            .ok_or_else(|| E2eError::UnknownScenario(name.to_string()))
    }

    /// Run the scenario body; `flow` must already be set up
    pub async fn run<P: Page + ?Sized>(self, flow: &mut RegistrationFlow<'_, P>) -> E2eResult<()> {
        let fixture = flow.fixture;
        let info = &fixture.company_info;

        match self {
            Scenario::HappyPath => {
                let matcher = RequestMatcher::post(&flow.site.form_endpoint);
                let intercept = flow.page.expect_exchange(&matcher).await?;

                flow.fill_company_info().await?;
                flow.enter_passwords(&info.valid_password, &info.valid_password).await?;
                flow.submit().await?;

                let exchange = flow
                    .page
                    .await_exchange(intercept, flow.wait.intercept_timeout)
                    .await?;
                ExpectedSubmission::new(&info.cat_number, &flow.suffix).verify(&exchange)?;
                info!("Form submission captured ({} {})", exchange.method, exchange.status);

                flow.accept_terms().await?;
                flow.expect_text(&fixture.success_message).await?;
            }
            Scenario::InvalidPassword => {
                let matcher = RequestMatcher::post(&flow.site.form_endpoint);
                let intercept = flow.page.expect_exchange(&matcher).await?;

                flow.fill_company_info().await?;
                flow.enter_passwords(&info.invalid_password, &info.invalid_password).await?;
                flow.submit().await?;
                flow.expect_text(&fixture.invalid_password_error).await?;

                let observed = flow.page.observed_requests(intercept).await?;
                if observed != 0 {
                    return Err(E2eError::mismatch(
                        format!("outbound requests to {}", matcher),
                        "0",
                        observed.to_string(),
                    ));
                }
            }
            Scenario::MismatchedPassword => {
                flow.fill_company_info().await?;
                flow.enter_passwords(&info.valid_password, &info.mismatched_password).await?;
                flow.submit().await?;
                flow.expect_text(&fixture.password_mismatch_error).await?;
            }
            Scenario::InvalidEmail => {
                flow.fill_company_info().await?;
                flow.invalidate_email().await?;
                flow.expect_text(&fixture.email_validation_error).await?;
            }
        }

        flow.advance(ScenarioState::Asserted)
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Drives the registration UI for one scenario
pub struct RegistrationFlow<'a, P: Page + ?Sized> {
    page: &'a P,
    fixture: &'a Fixture,
    site: &'a SiteMap,
    wait: &'a WaitConfig,
    suffix: UniqueSuffix,
    state: ScenarioState,
    history: Vec<ScenarioState>,
}

impl<'a, P: Page + ?Sized> RegistrationFlow<'a, P> {
    pub fn new(
        page: &'a P,
        fixture: &'a Fixture,
        site: &'a SiteMap,
        wait: &'a WaitConfig,
        suffix: UniqueSuffix,
    ) -> Self {
        Self {
            page,
            fixture,
            site,
            wait,
            suffix,
            state: ScenarioState::NotStarted,
            history: vec![ScenarioState::NotStarted],
        }
    }

    pub fn state(&self) -> ScenarioState {
        self.state
    }

    /// Every state entered so far, starting with `NotStarted`
    pub fn history(&self) -> &[ScenarioState] {
        &self.history
    }

    pub fn suffix(&self) -> &UniqueSuffix {
        &self.suffix
    }

    pub fn advance(&mut self, next: ScenarioState) -> E2eResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(E2eError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        debug!("{} -> {}", self.state, next);
        self.state = next;
        self.history.push(next);
        Ok(())
    }

    /// Mark the scenario failed unless it already finished
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.state = ScenarioState::Failed;
            self.history.push(ScenarioState::Failed);
        }
    }

    /// Open the registration page and pick the fixture's category
    pub async fn setup(&mut self) -> E2eResult<()> {
        let site = self.site;

        self.page.goto(&site.base_url).await?;
        self.page.click(&Locator::css(&site.registry_link), false).await?;
        self.expect_visible(&Locator::text(&site.category_prompt), self.wait.default_timeout)
            .await?;

        self.page
            .click(&site.category(self.fixture.company_category_index), false)
            .await?;
        self.expect_visible(&Locator::text(&site.company_info_heading), self.wait.default_timeout)
            .await?;

        self.advance(ScenarioState::CategorySelected)
    }

    /// Type the company details, all carrying this scenario's suffix
    pub async fn fill_company_info(&mut self) -> E2eResult<()> {
        let site = self.site;
        let fixture = self.fixture;
        let info = &fixture.company_info;

        self.page.type_text(&site.control("catNumber"), &info.cat_number).await?;
        self.page
            .type_text(&site.control("name").nth(0), &self.suffix.company_name())
            .await?;
        self.page.type_text(&site.control("phone"), &info.phone).await?;
        self.page
            .type_text(&site.control("name").nth(1), &self.suffix.contact_name())
            .await?;
        self.page.type_text(&site.control("email"), &self.suffix.email()).await?;

        self.advance(ScenarioState::FormFilled)
    }

    pub async fn enter_passwords(&mut self, password: &str, confirmation: &str) -> E2eResult<()> {
        self.page.type_text(&self.site.control("password"), password).await?;
        self.page
            .type_text(&self.site.control("confirmPassword"), confirmation)
            .await
    }

    pub async fn submit(&mut self) -> E2eResult<()> {
        self.page.click(&self.site.submit(), false).await?;
        self.advance(ScenarioState::Submitted)
    }

    /// Scroll the terms to the end, tick the checkbox and accept
    pub async fn accept_terms(&mut self) -> E2eResult<()> {
        let fixture = self.fixture;
        let terms = &fixture.terms_and_conditions_selector;
        let accept = Locator::css(&terms.accept_button);

        self.page
            .scroll_to_end(&Locator::css(&terms.scrollable_container).last())
            .await?;
        self.page.click(&accept, false).await?;
        self.page.click(&Locator::css(&terms.terms_checkbox), true).await?;
        self.page.click(&accept.last(), false).await?;

        self.advance(ScenarioState::TermsAccepted)
    }

    /// Replace the email with one lacking '@' and move focus away
    pub async fn invalidate_email(&mut self) -> E2eResult<()> {
        let email = self.site.control("email");
        self.page.clear(&email).await?;
        self.page.type_text(&email, &self.fixture.invalid_email).await?;
        self.page.focus(&self.site.control("name").nth(0)).await
    }

    /// Wait up to the fixture's visibility timeout for `text`
    pub async fn expect_text(&self, text: &str) -> E2eResult<()> {
        self.expect_visible(&Locator::text(text), self.fixture.visibility_timeout())
            .await
    }

    pub async fn expect_visible(&self, locator: &Locator, timeout: Duration) -> E2eResult<()> {
        let page = self.page;
        poll_until(
            &format!("{} to be visible", locator),
            timeout,
            self.wait.poll_interval,
            move || page.is_visible(locator),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(ScenarioState::NotStarted, ScenarioState::CategorySelected, true)]
    #[test_case(ScenarioState::CategorySelected, ScenarioState::FormFilled, true)]
    #[test_case(ScenarioState::FormFilled, ScenarioState::Submitted, true)]
    #[test_case(ScenarioState::FormFilled, ScenarioState::Asserted, true)]
    #[test_case(ScenarioState::Submitted, ScenarioState::TermsAccepted, true)]
    #[test_case(ScenarioState::TermsAccepted, ScenarioState::Asserted, true)]
    #[test_case(ScenarioState::Submitted, ScenarioState::Failed, true)]
    #[test_case(ScenarioState::NotStarted, ScenarioState::FormFilled, false)]
    #[test_case(ScenarioState::Submitted, ScenarioState::FormFilled, false)]
    #[test_case(ScenarioState::Asserted, ScenarioState::Failed, false)]
    #[test_case(ScenarioState::Failed, ScenarioState::Failed, false)]
    fn test_transitions(from: ScenarioState, to: ScenarioState, allowed: bool) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn test_names_round_trip() {
        for scenario in Scenario::ALL {
            assert_eq!(Scenario::from_name(scenario.name()).unwrap(), scenario);
        }
        assert!(matches!(
            Scenario::from_name("checkout"),
            Err(E2eError::UnknownScenario(_))
        ));
    }
}
