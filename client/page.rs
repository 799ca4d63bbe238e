use crate::{
	error::SubmitError,
	form::{FormState, UnknownField},
	result::PredictionResult,
	submit::SubmissionController,
};
use heart_deps::tokio;

/// The prediction page: the form and the controller that submits it. Resetting the form also discards the displayed result.
pub struct PredictionPage {
	form: FormState,
	controller: SubmissionController,
}

impl PredictionPage {
	pub fn new(controller: SubmissionController) -> PredictionPage {
		PredictionPage {
			form: FormState::new(),
			controller,
		}
	}

	pub fn form(&self) -> &FormState {
		&self.form
	}

	pub fn controller(&self) -> &SubmissionController {
		&self.controller
	}

	pub fn update(&mut self, key: &str, raw_value: &str) -> Result<(), UnknownField> {
		self.form.update_by_key(key, raw_value)
	}

	pub fn reset(&mut self) {
		self.form.reset();
		self.controller.clear_result();
	}

	pub async fn submit(&self) -> Result<PredictionResult, SubmitError> {
		self.controller.submit(self.form.record()).await
	}
}

#[cfg(test)]
use crate::{
	api::ApiClient,
	form::MedicalParameters,
	submit::Phase,
	test_server::TestServer,
	tokens::{MemoryTokenStore, TokenStore},
};
#[cfg(test)]
use std::sync::Arc;

#[tokio::test]
async fn test_reset_restores_form_and_clears_result() {
	let server = TestServer::replying(
		200,
		r#"{"prediction": 0, "probability": 0.2, "risk_level": "Low"}"#,
	);
	let tokens: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::with_token("abc"));
	let controller = SubmissionController::new(ApiClient::new(server.url()).unwrap(), tokens);
	let mut page = PredictionPage::new(controller);
	page.update("age", "67").unwrap();
	page.update("thal", "7").unwrap();
	page.submit().await.unwrap();
	assert!(page.controller().snapshot().result.is_some());
	page.reset();
	assert_eq!(page.form().record(), &MedicalParameters::default());
	let snapshot = page.controller().snapshot();
	assert_eq!(snapshot.phase, Phase::Idle);
	assert_eq!(snapshot.result, None);
}
