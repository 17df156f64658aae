//! A scripted stand-in for the registration application

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use registration_e2e::intercept::{CapturedExchange, InterceptId, RequestMatcher};
use registration_e2e::page::{Locator, Page, PageFactory, Target};
use registration_e2e::site::SiteMap;
use registration_e2e::{E2eError, E2eResult, Fixture};

/// How the fake application misbehaves, if at all
#[derive(Debug, Clone)]
pub struct AppBehaviour {
    /// Status the form endpoint answers with
    pub submission_status: u16,
    /// Submit the form even when the passwords are rejected
    pub submit_invalid: bool,
    /// Never show the company-information heading
    pub hide_company_heading: bool,
    /// Report a different company name than the one typed
    pub tamper_company_name: bool,
    /// Accept the form without ever posting it to the form endpoint
    pub suppress_submission: bool,
}

impl Default for AppBehaviour {
    fn default() -> Self {
        Self {
            submission_status: 204,
            submit_invalid: false,
            hide_company_heading: false,
            tamper_company_name: false,
            suppress_submission: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Goto(String),
    Click { locator: String, force: bool },
    Type { locator: String, text: String },
    Clear(String),
    Focus(String),
    ScrollToEnd(String),
    ExpectExchange(String),
    Screenshot(PathBuf),
    Close,
}

#[derive(Default)]
struct State {
    actions: Vec<Action>,
    values: HashMap<String, String>,
    visible: Vec<String>,
    intercepts: Vec<RequestMatcher>,
    exchanges: Vec<CapturedExchange>,
    terms_checked: bool,
    accept_clicks: usize,
}

/// One fake page; clones share state so tests can inspect it afterwards
#[derive(Clone)]
pub struct FakePage {
    behaviour: AppBehaviour,
    fixture: Fixture,
    site: SiteMap,
    state: Arc<Mutex<State>>,
}

impl FakePage {
    pub fn actions(&self) -> Vec<Action> {
        self.state.lock().unwrap().actions.clone()
    }

    pub fn typed(&self) -> Vec<(String, String)> {
        self.actions()
            .into_iter()
            .filter_map(|a| match a {
                Action::Type { locator, text } => Some((locator, text)),
                _ => None,
            })
            .collect()
    }

    pub fn exchanges(&self) -> Vec<CapturedExchange> {
        self.state.lock().unwrap().exchanges.clone()
    }

    fn reveal(state: &mut State, text: &str) {
        state.visible.push(text.to_string());
    }

    fn value(state: &State, locator: &Locator) -> String {
        state.values.get(&locator.to_string()).cloned().unwrap_or_default()
    }

    fn on_submit(&self, state: &mut State) {
        let info = &self.fixture.company_info;
        let password = Self::value(state, &self.site.control("password"));
        let confirmation = Self::value(state, &self.site.control("confirmPassword"));

        let accepted = password == confirmation && password.len() >= 8;
        if (accepted || self.behaviour.submit_invalid) && !self.behaviour.suppress_submission {
            let mut company = Self::value(state, &self.site.control("name").nth(0));
            if self.behaviour.tamper_company_name {
                company.push_str("_tampered");
            }
            let exchange = CapturedExchange {
                method: "POST".to_string(),
                url: self.site.form_endpoint.clone(),
                status: self.behaviour.submission_status,
                body: json!({
                    "contactFields": { "email": Self::value(state, &self.site.control("email")) },
                    "formValues": {
                        "Número CAAT": Self::value(state, &self.site.control("catNumber")),
                        "Razón social": company,
                        "Nombre completo": Self::value(state, &self.site.control("name").nth(1)),
                        "Teléfono": info.phone,
                    }
                }),
            };
            state.exchanges.push(exchange);
        }

        if password != confirmation {
            Self::reveal(state, &self.fixture.password_mismatch_error);
        } else if !accepted {
            Self::reveal(state, &self.fixture.invalid_password_error);
        }
    }
}

#[async_trait]
impl Page for FakePage {
    async fn goto(&self, url: &str) -> E2eResult<()> {
        let mut state = self.state.lock().unwrap();
        state.actions.push(Action::Goto(url.to_string()));
        Ok(())
    }

    async fn click(&self, locator: &Locator, force: bool) -> E2eResult<()> {
        let mut state = self.state.lock().unwrap();
        state.actions.push(Action::Click {
            locator: locator.to_string(),
            force,
        });

        let terms = &self.fixture.terms_and_conditions_selector;
        let target = match &locator.target {
            Target::Css(css) => css.clone(),
            Target::Text(text) => text.clone(),
        };

        if target == self.site.registry_link {
            Self::reveal(&mut state, &self.site.category_prompt);
        } else if *locator == self.site.category(self.fixture.company_category_index) {
            if !self.behaviour.hide_company_heading {
                Self::reveal(&mut state, &self.site.company_info_heading);
            }
        } else if *locator == self.site.submit() {
            self.on_submit(&mut state);
        } else if target == terms.terms_checkbox {
            // The checkbox sits under the overlay; only a forced click reaches it.
            if !force {
                return Err(E2eError::ElementTimeout {
                    what: format!("click {}", locator),
                    timeout_ms: 10,
                });
            }
            state.terms_checked = true;
        } else if target == terms.accept_button {
            state.accept_clicks += 1;
            if state.terms_checked && state.accept_clicks >= 2 {
                Self::reveal(&mut state, &self.fixture.success_message);
            }
        }
        Ok(())
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> E2eResult<()> {
        let mut state = self.state.lock().unwrap();
        state.actions.push(Action::Type {
            locator: locator.to_string(),
            text: text.to_string(),
        });
        state
            .values
            .entry(locator.to_string())
            .or_default()
            .push_str(text);
        Ok(())
    }

    async fn clear(&self, locator: &Locator) -> E2eResult<()> {
        let mut state = self.state.lock().unwrap();
        state.actions.push(Action::Clear(locator.to_string()));
        state.values.remove(&locator.to_string());
        Ok(())
    }

    async fn focus(&self, locator: &Locator) -> E2eResult<()> {
        let mut state = self.state.lock().unwrap();
        state.actions.push(Action::Focus(locator.to_string()));
        let email = Self::value(&state, &self.site.control("email"));
        if !email.is_empty() && !email.contains('@') {
            Self::reveal(&mut state, &self.fixture.email_validation_error);
        }
        Ok(())
    }

    async fn scroll_to_end(&self, locator: &Locator) -> E2eResult<()> {
        let mut state = self.state.lock().unwrap();
        state.actions.push(Action::ScrollToEnd(locator.to_string()));
        Ok(())
    }

    async fn is_visible(&self, locator: &Locator) -> E2eResult<bool> {
        let state = self.state.lock().unwrap();
        Ok(match &locator.target {
            Target::Text(text) => state.visible.iter().any(|v| v.contains(text.as_str())),
            Target::Css(_) => true,
        })
    }

    async fn expect_exchange(&self, matcher: &RequestMatcher) -> E2eResult<InterceptId> {
        let mut state = self.state.lock().unwrap();
        state.actions.push(Action::ExpectExchange(matcher.to_string()));
        state.intercepts.push(matcher.clone());
        Ok(InterceptId(state.intercepts.len() as u64))
    }

    async fn await_exchange(
        &self,
        id: InterceptId,
        timeout: Duration,
    ) -> E2eResult<CapturedExchange> {
        let state = self.state.lock().unwrap();
        let matcher = &state.intercepts[id.0 as usize - 1];
        state
            .exchanges
            .iter()
            .find(|e| matcher.matches(&e.method, &e.url))
            .cloned()
            .ok_or_else(|| E2eError::InterceptTimeout {
                matcher: matcher.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            })
    }

    async fn observed_requests(&self, id: InterceptId) -> E2eResult<usize> {
        let state = self.state.lock().unwrap();
        let matcher = &state.intercepts[id.0 as usize - 1];
        Ok(state
            .exchanges
            .iter()
            .filter(|e| matcher.matches(&e.method, &e.url))
            .count())
    }

    async fn screenshot(&self, path: &Path) -> E2eResult<()> {
        self.state
            .lock()
            .unwrap()
            .actions
            .push(Action::Screenshot(path.to_path_buf()));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, b"\x89PNG fake")?;
        Ok(())
    }

    async fn close(&self) -> E2eResult<()> {
        self.state.lock().unwrap().actions.push(Action::Close);
        Ok(())
    }
}

/// Hands out fake pages and remembers them
#[derive(Clone)]
pub struct FakeFactory {
    behaviour: AppBehaviour,
    fixture: Fixture,
    site: SiteMap,
    pages: Arc<Mutex<Vec<FakePage>>>,
}

impl FakeFactory {
    pub fn new(behaviour: AppBehaviour, fixture: Fixture, site: SiteMap) -> Self {
        Self {
            behaviour,
            fixture,
            site,
            pages: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn pages(&self) -> Vec<FakePage> {
        self.pages.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFactory for FakeFactory {
    type Page = FakePage;

    async fn new_page(&self) -> E2eResult<FakePage> {
        let page = FakePage {
            behaviour: self.behaviour.clone(),
            fixture: self.fixture.clone(),
            site: self.site.clone(),
            state: Arc::new(Mutex::new(State::default())),
        };
        self.pages.lock().unwrap().push(page.clone());
        Ok(page)
    }
}

/// Fixture with short timeouts so failing waits end quickly
pub fn fast_fixture() -> Fixture {
    Fixture {
        visibility_timeout: 200,
        ..Fixture::default()
    }
}

pub fn fast_wait() -> registration_e2e::wait::WaitConfig {
    registration_e2e::wait::WaitConfig {
        poll_interval: Duration::from_millis(5),
        default_timeout: Duration::from_millis(100),
        intercept_timeout: Duration::from_millis(100),
    }
}
