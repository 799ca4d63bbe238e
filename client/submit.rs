use crate::{
	api::ApiClient,
	error::SubmitError,
	form::MedicalParameters,
	notification::{Notification, NotificationKind, Notifier},
	result::PredictionResult,
	tokens::{TokenStore, TOKEN_KEY},
};
use heart_deps::{log, tokio};
use heart_util::error::Result;
use std::sync::{Arc, Mutex};

pub const SUCCESS_MESSAGE: &str = "Prediction completed successfully";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
	Idle,
	Loading,
	Success,
	Error,
}

/// What the page shows at one moment.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
	pub phase: Phase,
	pub result: Option<PredictionResult>,
	pub notification: Option<Notification>,
}

impl Snapshot {
	pub fn is_loading(&self) -> bool {
		self.phase == Phase::Loading
	}
}

struct State {
	phase: Phase,
	result: Option<PredictionResult>,
	/// The sequence number of the most recently started submission. Only its response may change what is displayed.
	latest: u64,
}

pub type Listener = Arc<dyn Fn(&Snapshot) + Send + Sync>;

/// Runs submissions against the prediction service and keeps the state the page displays.
pub struct SubmissionController {
	api: ApiClient,
	tokens: Arc<dyn TokenStore>,
	notifier: Notifier,
	state: Arc<Mutex<State>>,
	listener: Option<Listener>,
}

impl SubmissionController {
	pub fn new(api: ApiClient, tokens: Arc<dyn TokenStore>) -> SubmissionController {
		SubmissionController {
			api,
			tokens,
			notifier: Notifier::default(),
			state: Arc::new(Mutex::new(State {
				phase: Phase::Idle,
				result: None,
				latest: 0,
			})),
			listener: None,
		}
	}

	pub fn with_notifier(mut self, notifier: Notifier) -> SubmissionController {
		self.notifier = notifier;
		self
	}

	/// Call `listener` with a fresh snapshot every time the displayed state changes.
	pub fn with_listener(
		mut self,
		listener: impl Fn(&Snapshot) + Send + Sync + 'static,
	) -> SubmissionController {
		self.listener = Some(Arc::new(listener));
		self
	}

	pub fn api(&self) -> &ApiClient {
		&self.api
	}

	pub fn notifier(&self) -> &Notifier {
		&self.notifier
	}

	pub fn snapshot(&self) -> Snapshot {
		snapshot(&self.state, &self.notifier)
	}

	/// Submit `record` and return the outcome. The outcome of a submission that was overtaken by a newer one is still returned, but it does not change the displayed state.
	pub async fn submit(
		&self,
		record: &MedicalParameters,
	) -> Result<PredictionResult, SubmitError> {
		let sequence = self.begin();
		let outcome = self.request(record).await;
		self.finish(sequence, &outcome);
		outcome
	}

	/// Discard the displayed result. Responses to submissions started before this call are ignored.
	pub fn clear_result(&self) {
		{
			let mut state = self.state.lock().unwrap();
			state.latest += 1;
			state.phase = Phase::Idle;
			state.result = None;
		}
		self.emit();
	}

	/// Remove the session token, telling the service first if there is a token to tell it about. A failed logout request does not keep the token.
	pub async fn logout(&self) -> Result<()> {
		if let Some(token) = self.tokens.get(TOKEN_KEY) {
			if let Err(error) = self.api.logout(&token).await {
				log::warn!("logout request failed: {}", error);
			}
		}
		self.tokens.remove(TOKEN_KEY)?;
		self.clear_result();
		Ok(())
	}

	fn begin(&self) -> u64 {
		let sequence = {
			let mut state = self.state.lock().unwrap();
			state.latest += 1;
			state.phase = Phase::Loading;
			state.result = None;
			state.latest
		};
		log::debug!("starting submission {}", sequence);
		self.emit();
		sequence
	}

	async fn request(&self, record: &MedicalParameters) -> Result<PredictionResult, SubmitError> {
		if let Err(mut errors) = record.validate() {
			if !errors.is_empty() {
				return Err(SubmitError::InvalidField(errors.remove(0)));
			}
		}
		let token = self
			.tokens
			.get(TOKEN_KEY)
			.ok_or(SubmitError::Unauthenticated)?;
		let outcome = self.api.predict(&token, record).await;
		if let Err(SubmitError::SessionExpired) = outcome {
			if let Err(error) = self.tokens.remove(TOKEN_KEY) {
				log::error!("failed to remove the expired session token: {}", error);
			}
		}
		outcome
	}

	fn finish(&self, sequence: u64, outcome: &Result<PredictionResult, SubmitError>) {
		{
			let mut state = self.state.lock().unwrap();
			if sequence != state.latest {
				log::debug!(
					"discarding the response to submission {}, submission {} is newer",
					sequence,
					state.latest
				);
				return;
			}
			match outcome {
				Ok(result) => {
					state.phase = Phase::Success;
					state.result = Some(result.clone());
				}
				Err(_) => {
					state.phase = Phase::Error;
					state.result = None;
				}
			}
		}
		match outcome {
			Ok(result) => {
				log::info!(
					"submission {} succeeded: prediction {} probability {} risk level {}",
					sequence,
					result.prediction,
					result.probability,
					result.risk_level
				);
				let generation = self.notifier.show(SUCCESS_MESSAGE, NotificationKind::Success);
				self.expire_notification(generation);
			}
			Err(error) => {
				log::warn!("submission {} failed: {}", sequence, error);
				let generation = self.notifier.show(error.to_string(), NotificationKind::Error);
				self.expire_notification(generation);
			}
		}
		self.emit();
	}

	/// Dismiss the notification when its timer runs out and tell the listener, unless a newer notification replaced it first.
	fn expire_notification(&self, generation: u64) {
		let state = self.state.clone();
		let notifier = self.notifier.clone();
		let listener = self.listener.clone();
		tokio::spawn(async move {
			if notifier.expire(generation).await {
				emit(&state, &notifier, listener.as_ref());
			}
		});
	}

	fn emit(&self) {
		emit(&self.state, &self.notifier, self.listener.as_ref());
	}
}

fn snapshot(state: &Mutex<State>, notifier: &Notifier) -> Snapshot {
	let state = state.lock().unwrap();
	Snapshot {
		phase: state.phase,
		result: state.result.clone(),
		notification: notifier.current(),
	}
}

fn emit(state: &Mutex<State>, notifier: &Notifier, listener: Option<&Listener>) {
	if let Some(listener) = listener {
		listener(&snapshot(state, notifier));
	}
}

#[cfg(test)]
use crate::{
	result::{render, Tone},
	test_server::{unreachable_url, Reply, TestServer},
	tokens::MemoryTokenStore,
};
#[cfg(test)]
use heart_deps::{serde_json, url::Url};

#[cfg(test)]
const HIGH_RISK: &str = r#"{"prediction": 1, "probability": 0.82, "risk_level": "high"}"#;

#[cfg(test)]
fn controller(url: Url, tokens: &Arc<MemoryTokenStore>) -> SubmissionController {
	let tokens: Arc<dyn TokenStore> = tokens.clone();
	SubmissionController::new(ApiClient::new(url).unwrap(), tokens)
}

#[tokio::test]
async fn test_submit_success() {
	let server = TestServer::replying(200, HIGH_RISK);
	let tokens = Arc::new(MemoryTokenStore::with_token("abc"));
	let controller = controller(server.url(), &tokens);
	let record = MedicalParameters::default();
	let result = controller.submit(&record).await.unwrap();
	let requests = server.requests();
	assert_eq!(requests.len(), 1);
	assert_eq!(requests[0].method, "POST");
	assert_eq!(requests[0].path, "/predict");
	assert_eq!(requests[0].authorization.as_deref(), Some("Bearer abc"));
	assert_eq!(
		requests[0].content_type.as_deref(),
		Some("application/json")
	);
	let sent: MedicalParameters = serde_json::from_slice(&requests[0].body).unwrap();
	assert_eq!(sent, record);
	let snapshot = controller.snapshot();
	assert_eq!(snapshot.phase, Phase::Success);
	assert_eq!(snapshot.result.as_ref(), Some(&result));
	assert_eq!(
		snapshot.notification,
		Some(Notification {
			message: SUCCESS_MESSAGE.to_owned(),
			kind: NotificationKind::Success,
		})
	);
	let card = render(&result);
	assert_eq!(card.prediction_label, "Positive");
	assert_eq!(card.risk_label, "High");
	assert_eq!(card.gauge.percentage, 82);
	assert_eq!(card.gauge.tone, Tone::Red);
	assert_eq!(tokens.get(TOKEN_KEY), Some("abc".to_owned()));
}

#[tokio::test]
async fn test_submit_without_token_makes_no_request() {
	let server = TestServer::replying(200, HIGH_RISK);
	let tokens = Arc::new(MemoryTokenStore::new());
	let controller = controller(server.url(), &tokens);
	let outcome = controller.submit(&MedicalParameters::default()).await;
	assert_eq!(outcome, Err(SubmitError::Unauthenticated));
	assert!(server.requests().is_empty());
	let snapshot = controller.snapshot();
	assert_eq!(snapshot.phase, Phase::Error);
	assert_eq!(snapshot.result, None);
	assert_eq!(
		snapshot.notification,
		Some(Notification {
			message: "Please login to use the prediction feature".to_owned(),
			kind: NotificationKind::Error,
		})
	);
}

#[tokio::test]
async fn test_rejected_token_is_removed() {
	for status in &[401, 422] {
		let server = TestServer::replying(*status, r#"{"msg": "Token has expired"}"#);
		let tokens = Arc::new(MemoryTokenStore::with_token("abc"));
		let controller = controller(server.url(), &tokens);
		let outcome = controller.submit(&MedicalParameters::default()).await;
		assert_eq!(outcome, Err(SubmitError::SessionExpired));
		assert_eq!(server.requests().len(), 1);
		assert_eq!(tokens.get(TOKEN_KEY), None);
		let snapshot = controller.snapshot();
		assert_eq!(snapshot.result, None);
		assert_eq!(
			snapshot.notification.map(|n| n.message),
			Some("Session expired, please login again".to_owned())
		);
	}
}

#[tokio::test]
async fn test_service_error_keeps_token() {
	let server = TestServer::replying(500, r#"{"error": "model not loaded"}"#);
	let tokens = Arc::new(MemoryTokenStore::with_token("abc"));
	let controller = controller(server.url(), &tokens);
	let outcome = controller.submit(&MedicalParameters::default()).await;
	assert_eq!(outcome, Err(SubmitError::ServiceError { status: 500 }));
	assert_eq!(tokens.get(TOKEN_KEY), Some("abc".to_owned()));
	assert_eq!(
		controller.snapshot().notification.map(|n| n.message),
		Some("API error: 500".to_owned())
	);
}

#[tokio::test]
async fn test_malformed_response() {
	let server = TestServer::replying(200, r#"{"prediction": "yes"}"#);
	let tokens = Arc::new(MemoryTokenStore::with_token("abc"));
	let controller = controller(server.url(), &tokens);
	let outcome = controller.submit(&MedicalParameters::default()).await;
	assert_eq!(outcome, Err(SubmitError::MalformedResponse));
	assert_eq!(controller.snapshot().phase, Phase::Error);
}

#[tokio::test]
async fn test_unreachable_service() {
	let tokens = Arc::new(MemoryTokenStore::with_token("abc"));
	let controller = controller(unreachable_url(), &tokens);
	let outcome = controller.submit(&MedicalParameters::default()).await;
	assert_eq!(outcome, Err(SubmitError::ServiceUnreachable));
	assert_eq!(tokens.get(TOKEN_KEY), Some("abc".to_owned()));
	let snapshot = controller.snapshot();
	assert_eq!(snapshot.phase, Phase::Error);
	assert_eq!(snapshot.notification.map(|n| n.kind), Some(NotificationKind::Error));
}

#[tokio::test]
async fn test_invalid_field_blocks_submission() {
	let server = TestServer::replying(200, HIGH_RISK);
	let tokens = Arc::new(MemoryTokenStore::with_token("abc"));
	let controller = controller(server.url(), &tokens);
	let mut record = MedicalParameters::default();
	record.chol = f64::NAN;
	let outcome = controller.submit(&record).await;
	match outcome {
		Err(SubmitError::InvalidField(error)) => {
			assert_eq!(error.to_string(), "Cholesterol (mg/dl) must be a number")
		}
		outcome => panic!("unexpected outcome {:?}", outcome),
	}
	assert!(server.requests().is_empty());
}

#[tokio::test]
async fn test_stale_response_is_discarded() {
	let server = TestServer::start(|request| {
		let record: MedicalParameters = serde_json::from_slice(&request.body).unwrap();
		if record.age == 70.0 {
			Reply::new(200, HIGH_RISK).delayed(std::time::Duration::from_millis(200))
		} else {
			Reply::new(
				200,
				r#"{"prediction": 0, "probability": 0.12, "risk_level": "low"}"#,
			)
		}
	});
	let tokens = Arc::new(MemoryTokenStore::with_token("abc"));
	let controller = controller(server.url(), &tokens);
	let mut slow = MedicalParameters::default();
	slow.age = 70.0;
	let fast = MedicalParameters::default();
	let (slow_outcome, fast_outcome) =
		tokio::join!(controller.submit(&slow), controller.submit(&fast));
	assert_eq!(slow_outcome.unwrap().risk_level, "high");
	let fast_result = fast_outcome.unwrap();
	assert_eq!(server.requests().len(), 2);
	let snapshot = controller.snapshot();
	assert_eq!(snapshot.phase, Phase::Success);
	assert_eq!(snapshot.result, Some(fast_result));
}

#[tokio::test]
async fn test_listener_sees_loading_then_result() {
	let server = TestServer::replying(200, HIGH_RISK);
	let tokens = Arc::new(MemoryTokenStore::with_token("abc"));
	let phases = Arc::new(Mutex::new(Vec::new()));
	let seen = phases.clone();
	let controller = controller(server.url(), &tokens).with_listener(move |snapshot| {
		seen.lock().unwrap().push(snapshot.phase);
	});
	controller.submit(&MedicalParameters::default()).await.unwrap();
	controller.clear_result();
	assert_eq!(
		*phases.lock().unwrap(),
		vec![Phase::Loading, Phase::Success, Phase::Idle]
	);
	assert_eq!(controller.snapshot().result, None);
}

#[tokio::test]
async fn test_clear_result_discards_pending_response() {
	let server = TestServer::start(|_| {
		Reply::new(200, HIGH_RISK).delayed(std::time::Duration::from_millis(100))
	});
	let tokens = Arc::new(MemoryTokenStore::with_token("abc"));
	let controller = controller(server.url(), &tokens);
	let record = MedicalParameters::default();
	let clear = async {
		tokio::time::delay_for(std::time::Duration::from_millis(20)).await;
		controller.clear_result();
	};
	let (outcome, ()) = tokio::join!(controller.submit(&record), clear);
	assert!(outcome.is_ok());
	let snapshot = controller.snapshot();
	assert_eq!(snapshot.phase, Phase::Idle);
	assert_eq!(snapshot.result, None);
}

#[tokio::test]
async fn test_logout() {
	let server = TestServer::replying(200, r#"{"message": "Logged out successfully"}"#);
	let tokens = Arc::new(MemoryTokenStore::with_token("abc"));
	let controller = controller(server.url(), &tokens);
	controller.logout().await.unwrap();
	let requests = server.requests();
	assert_eq!(requests.len(), 1);
	assert_eq!(requests[0].path, "/logout");
	assert_eq!(requests[0].authorization.as_deref(), Some("Bearer abc"));
	assert_eq!(tokens.get(TOKEN_KEY), None);
}

#[tokio::test]
async fn test_logout_removes_token_when_the_request_fails() {
	let server = TestServer::replying(500, "{}");
	let tokens = Arc::new(MemoryTokenStore::with_token("abc"));
	controller(server.url(), &tokens).logout().await.unwrap();
	assert_eq!(tokens.get(TOKEN_KEY), None);
	let tokens = Arc::new(MemoryTokenStore::with_token("abc"));
	controller(unreachable_url(), &tokens).logout().await.unwrap();
	assert_eq!(tokens.get(TOKEN_KEY), None);
}

#[tokio::test]
async fn test_logout_without_token_makes_no_request() {
	let server = TestServer::replying(200, "{}");
	let tokens = Arc::new(MemoryTokenStore::new());
	controller(server.url(), &tokens).logout().await.unwrap();
	assert!(server.requests().is_empty());
}

#[tokio::test]
async fn test_notification_expiry_reaches_listener() {
	let server = TestServer::replying(200, HIGH_RISK);
	let tokens = Arc::new(MemoryTokenStore::with_token("abc"));
	let shown = Arc::new(Mutex::new(Vec::new()));
	let seen = shown.clone();
	let controller = controller(server.url(), &tokens)
		.with_notifier(Notifier::new(std::time::Duration::from_millis(50)))
		.with_listener(move |snapshot| {
			seen.lock().unwrap().push(snapshot.notification.is_some());
		});
	controller.submit(&MedicalParameters::default()).await.unwrap();
	assert_eq!(*shown.lock().unwrap(), vec![false, true]);
	tokio::time::delay_for(std::time::Duration::from_millis(200)).await;
	assert_eq!(*shown.lock().unwrap(), vec![false, true, false]);
	assert_eq!(controller.snapshot().notification, None);
}

#[tokio::test]
async fn test_replaced_notification_expires_once() {
	let server = TestServer::replying(500, "{}");
	let tokens = Arc::new(MemoryTokenStore::with_token("abc"));
	let shown = Arc::new(Mutex::new(Vec::new()));
	let seen = shown.clone();
	let controller = controller(server.url(), &tokens)
		.with_notifier(Notifier::new(std::time::Duration::from_millis(300)))
		.with_listener(move |snapshot| {
			seen.lock().unwrap().push(snapshot.notification.is_some());
		});
	let record = MedicalParameters::default();
	controller.submit(&record).await.unwrap_err();
	controller.submit(&record).await.unwrap_err();
	tokio::time::delay_for(std::time::Duration::from_millis(800)).await;
	assert_eq!(*shown.lock().unwrap(), vec![false, true, true, true, false]);
	assert_eq!(controller.snapshot().notification, None);
}
