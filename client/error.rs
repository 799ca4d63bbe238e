use crate::form::FieldError;
use derive_more::{Display, Error};

/// Every way a submission can fail. The display text is the message shown to the user.
#[derive(Clone, Debug, Display, Error, PartialEq)]
pub enum SubmitError {
	#[display(fmt = "{}", _0)]
	InvalidField(FieldError),
	#[display(fmt = "Please login to use the prediction feature")]
	Unauthenticated,
	#[display(fmt = "Session expired, please login again")]
	SessionExpired,
	#[display(fmt = "Failed to get prediction. Please ensure the backend is running.")]
	ServiceUnreachable,
	#[display(fmt = "API error: {}", status)]
	ServiceError {
		#[error(not(source))]
		status: u16,
	},
	#[display(fmt = "Received an invalid response from the prediction service")]
	MalformedResponse,
}

#[test]
fn test_messages() {
	assert_eq!(
		SubmitError::Unauthenticated.to_string(),
		"Please login to use the prediction feature"
	);
	assert_eq!(
		SubmitError::SessionExpired.to_string(),
		"Session expired, please login again"
	);
	assert_eq!(
		SubmitError::ServiceError { status: 503 }.to_string(),
		"API error: 503"
	);
}
