//! Registration test data, loaded once before all scenarios

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{E2eError, E2eResult};

/// The complete fixture record.
///
/// Field names follow the `RegistrationData` JSON layout, so an existing
/// fixture file can be used as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fixture {
    /// Position of the account category card to select
    pub company_category_index: usize,

    pub company_info: CompanyInfo,

    pub terms_and_conditions_selector: TermsSelectors,

    pub success_message: String,

    pub password_mismatch_error: String,

    pub invalid_password_error: String,

    #[serde(default = "default_email_error")]
    pub email_validation_error: String,

    /// Value typed over the email field to trigger format validation
    #[serde(default = "default_invalid_email")]
    pub invalid_email: String,

    /// Visibility timeout in milliseconds
    pub visibility_timeout: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInfo {
    pub cat_number: String,
    pub phone: String,
    pub valid_password: String,
    pub invalid_password: String,
    pub mismatched_password: String,
}

/// Selectors for the terms-and-conditions overlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermsSelectors {
    pub scrollable_container: String,
    pub accept_button: String,
    pub terms_checkbox: String,
}

fn default_email_error() -> String {
    "Por favor, introduzca un correo electrónico válido.".to_string()
}

fn default_invalid_email() -> String {
    "invalidEmailFormat".to_string()
}

impl Default for Fixture {
    fn default() -> Self {
        Self {
            company_category_index: 2, // "Transportista"
            company_info: CompanyInfo {
                cat_number: "1234".to_string(),
                phone: "1234567890".to_string(),
                valid_password: "Altamira2015#".to_string(),
                invalid_password: "short".to_string(),
                mismatched_password: "differentPassword".to_string(),
            },
            terms_and_conditions_selector: TermsSelectors {
                scrollable_container: "app-tos.ng-star-inserted > .tos > #content-tos".to_string(),
                accept_button: "app-tos.ng-star-inserted > .tos > .botones > .dxf-btn-green"
                    .to_string(),
                terms_checkbox: "#exampleCheck1".to_string(),
            },
            success_message: "Exitoso".to_string(),
            password_mismatch_error:
                "La contraseña y la confirmación de la contraseña no son la misma.".to_string(),
            invalid_password_error: "Por favor, complete los campos obligatorios.".to_string(),
            email_validation_error: default_email_error(),
            invalid_email: default_invalid_email(),
            visibility_timeout: 10_000,
        }
    }
}

impl Fixture {
    /// Parse a fixture from a JSON string
    pub fn from_json(json: &str) -> E2eResult<Self> {
        let fixture: Self = serde_json::from_str(json)?;
        fixture.validate()?;
        Ok(fixture)
    }

    /// Parse a fixture from a YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let fixture: Self = serde_yaml::from_str(yaml)?;
        fixture.validate()?;
        Ok(fixture)
    }

    /// Load a fixture file; the format is picked from the extension
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&content),
            Some("json") => Self::from_json(&content),
            other => Err(E2eError::Fixture(format!(
                "unsupported fixture extension {:?} for {}",
                other,
                path.display()
            ))),
        }
    }

    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_millis(self.visibility_timeout)
    }

    /// Reject fixtures that could never drive a meaningful run
    pub fn validate(&self) -> E2eResult<()> {
        let info = &self.company_info;
        let terms = &self.terms_and_conditions_selector;

        let required = [
            ("companyInfo.catNumber", &info.cat_number),
            ("companyInfo.phone", &info.phone),
            ("companyInfo.validPassword", &info.valid_password),
            ("companyInfo.invalidPassword", &info.invalid_password),
            ("companyInfo.mismatchedPassword", &info.mismatched_password),
            ("termsAndConditionsSelector.scrollableContainer", &terms.scrollable_container),
            ("termsAndConditionsSelector.acceptButton", &terms.accept_button),
            ("termsAndConditionsSelector.termsCheckbox", &terms.terms_checkbox),
            ("successMessage", &self.success_message),
            ("passwordMismatchError", &self.password_mismatch_error),
            ("invalidPasswordError", &self.invalid_password_error),
            ("emailValidationError", &self.email_validation_error),
            ("invalidEmail", &self.invalid_email),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(E2eError::Fixture(format!("{} must not be empty", field)));
            }
        }

        if self.visibility_timeout == 0 {
            return Err(E2eError::Fixture("visibilityTimeout must be positive".to_string()));
        }
        if info.invalid_password == info.valid_password {
            return Err(E2eError::Fixture(
                "invalidPassword must differ from validPassword".to_string(),
            ));
        }
        if info.mismatched_password == info.valid_password {
            return Err(E2eError::Fixture(
                "mismatchedPassword must differ from validPassword".to_string(),
            ));
        }
        if self.invalid_email.contains('@') {
            return Err(E2eError::Fixture("invalidEmail must not contain '@'".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTRATION_DATA: &str = r##"{
        "companyCategoryIndex": 2,
        "companyInfo": {
            "catNumber": "1234",
            "phone": "1234567890",
            "validPassword": "Altamira2015#",
            "invalidPassword": "short",
            "mismatchedPassword": "differentPassword"
        },
        "termsAndConditionsSelector": {
            "scrollableContainer": "app-tos.ng-star-inserted > .tos > #content-tos",
            "acceptButton": "app-tos.ng-star-inserted > .tos > .botones > .dxf-btn-green",
            "termsCheckbox": "#exampleCheck1"
        },
        "successMessage": "Exitoso",
        "passwordMismatchError": "La contraseña y la confirmación de la contraseña no son la misma.",
        "invalidPasswordError": "Por favor, complete los campos obligatorios.",
        "emailValidationError": "Correo inválido",
        "visibilityTimeout": 10000
    }"##;

    #[test]
    fn test_parse_registration_data_json() {
        let fixture = Fixture::from_json(REGISTRATION_DATA).unwrap();
        assert_eq!(fixture.company_category_index, 2);
        assert_eq!(fixture.company_info.cat_number, "1234");
        assert_eq!(fixture.email_validation_error, "Correo inválido");
        assert_eq!(fixture.invalid_email, "invalidEmailFormat");
        assert_eq!(fixture.visibility_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_parse_yaml_matches_default() {
        let yaml = serde_yaml::to_string(&Fixture::default()).unwrap();
        let fixture = Fixture::from_yaml(&yaml).unwrap();
        assert_eq!(fixture, Fixture::default());
    }

    #[test]
    fn test_default_is_valid() {
        Fixture::default().validate().unwrap();
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let mut fixture = Fixture::default();
        fixture.visibility_timeout = 0;
        assert!(matches!(fixture.validate(), Err(E2eError::Fixture(_))));
    }

    #[test]
    fn test_rejects_mismatch_equal_to_valid() {
        let mut fixture = Fixture::default();
        fixture.company_info.mismatched_password = fixture.company_info.valid_password.clone();
        let err = fixture.validate().unwrap_err();
        assert!(err.to_string().contains("mismatchedPassword"));
    }

    #[test]
    fn test_rejects_empty_selector() {
        let mut fixture = Fixture::default();
        fixture.terms_and_conditions_selector.terms_checkbox = "  ".to_string();
        let err = fixture.validate().unwrap_err();
        assert!(err.to_string().contains("termsCheckbox"));
    }

    #[test]
    fn test_bundled_fixture_matches_default() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/RegistrationData.json");
        assert_eq!(Fixture::from_file(&path).unwrap(), Fixture::default());
    }

    #[test]
    fn test_from_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("RegistrationData.json");
        std::fs::write(&json_path, REGISTRATION_DATA).unwrap();
        assert!(Fixture::from_file(&json_path).is_ok());

        let txt_path = dir.path().join("data.txt");
        std::fs::write(&txt_path, REGISTRATION_DATA).unwrap();
        assert!(matches!(Fixture::from_file(&txt_path), Err(E2eError::Fixture(_))));
    }
}
