use crate::{error::SubmitError, form::MedicalParameters, result::PredictionResult};
use heart_deps::{
	log,
	reqwest::{self, header, StatusCode},
	serde_json, tokio,
	url::{self, Url},
};
use heart_util::error::Result;

pub const DEFAULT_API_URL: &str = "http://localhost:5000";

/// The HTTP client for the prediction service.
#[derive(Clone, Debug)]
pub struct ApiClient {
	http: reqwest::Client,
	base_url: Url,
	predict_url: Url,
	logout_url: Url,
}

impl ApiClient {
	/// Endpoints are resolved relative to `base_url`, which may or may not end with a slash.
	pub fn new(mut base_url: Url) -> Result<ApiClient, url::ParseError> {
		if !base_url.path().ends_with('/') {
			let path = format!("{}/", base_url.path());
			base_url.set_path(&path);
		}
		let predict_url = base_url.join("predict")?;
		let logout_url = base_url.join("logout")?;
		Ok(ApiClient {
			http: reqwest::Client::new(),
			base_url,
			predict_url,
			logout_url,
		})
	}

	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	pub fn predict_url(&self) -> &Url {
		&self.predict_url
	}

	pub fn logout_url(&self) -> &Url {
		&self.logout_url
	}

	/// Send exactly one prediction request. Nothing is retried.
	pub async fn predict(
		&self,
		token: &str,
		record: &MedicalParameters,
	) -> Result<PredictionResult, SubmitError> {
		let response = self
			.http
			.post(self.predict_url.clone())
			.bearer_auth(token)
			.json(record)
			.send()
			.await
			.map_err(|error| {
				log::warn!("failed to reach {}: {}", self.predict_url, error);
				SubmitError::ServiceUnreachable
			})?;
		check_status(response.status())?;
		// The status was a success, so an unreadable body counts as a malformed response.
		let body = response.bytes().await.map_err(|error| {
			log::warn!("failed to read the prediction response: {}", error);
			SubmitError::MalformedResponse
		})?;
		parse_result(&body)
	}

	/// Tell the service the session is over. Callers drop the token whatever this returns.
	pub async fn logout(&self, token: &str) -> Result<()> {
		self.http
			.post(self.logout_url.clone())
			.bearer_auth(token)
			.header(header::CONTENT_TYPE, "application/json")
			.send()
			.await?
			.error_for_status()?;
		Ok(())
	}
}

/// 401 and 422 mean the service rejected the token.
pub fn check_status(status: StatusCode) -> Result<(), SubmitError> {
	if status == StatusCode::UNAUTHORIZED || status == StatusCode::UNPROCESSABLE_ENTITY {
		return Err(SubmitError::SessionExpired);
	}
	if !status.is_success() {
		return Err(SubmitError::ServiceError {
			status: status.as_u16(),
		});
	}
	Ok(())
}

pub fn parse_result(body: &[u8]) -> Result<PredictionResult, SubmitError> {
	serde_json::from_slice(body).map_err(|error| {
		log::warn!("failed to parse the prediction response: {}", error);
		SubmitError::MalformedResponse
	})
}

#[test]
fn test_endpoints() {
	let client = ApiClient::new(DEFAULT_API_URL.parse().unwrap()).unwrap();
	assert_eq!(client.predict_url().as_str(), "http://localhost:5000/predict");
	assert_eq!(client.logout_url().as_str(), "http://localhost:5000/logout");
	let client = ApiClient::new("https://example.com/api".parse().unwrap()).unwrap();
	assert_eq!(client.predict_url().as_str(), "https://example.com/api/predict");
	let client = ApiClient::new("https://example.com/api/".parse().unwrap()).unwrap();
	assert_eq!(client.logout_url().as_str(), "https://example.com/api/logout");
}

#[test]
fn test_check_status() {
	assert_eq!(check_status(StatusCode::OK), Ok(()));
	assert_eq!(check_status(StatusCode::CREATED), Ok(()));
	assert_eq!(
		check_status(StatusCode::UNAUTHORIZED),
		Err(SubmitError::SessionExpired)
	);
	assert_eq!(
		check_status(StatusCode::UNPROCESSABLE_ENTITY),
		Err(SubmitError::SessionExpired)
	);
	assert_eq!(
		check_status(StatusCode::FORBIDDEN),
		Err(SubmitError::ServiceError { status: 403 })
	);
	assert_eq!(
		check_status(StatusCode::INTERNAL_SERVER_ERROR),
		Err(SubmitError::ServiceError { status: 500 })
	);
}

#[test]
fn test_parse_result() {
	let result =
		parse_result(br#"{"prediction": 1, "probability": 0.82, "risk_level": "High"}"#).unwrap();
	assert_eq!(
		result,
		PredictionResult {
			prediction: 1.0,
			probability: 0.82,
			risk_level: "High".to_owned(),
		}
	);
	assert_eq!(
		parse_result(br#"{"prediction": 1}"#),
		Err(SubmitError::MalformedResponse)
	);
	assert_eq!(
		parse_result(b"<html>oops</html>"),
		Err(SubmitError::MalformedResponse)
	);
}

#[tokio::test]
async fn test_truncated_body_is_malformed() {
	let client = ApiClient::new(crate::test_server::truncated_body_url().await).unwrap();
	let outcome = client.predict("abc", &MedicalParameters::default()).await;
	assert_eq!(outcome, Err(SubmitError::MalformedResponse));
}
