/*!
The client side of the heart disease prediction service. A `PredictionPage` holds the medical parameters the user enters, a `SubmissionController` sends them to the service with the session token from an injected `TokenStore`, and `result::render` turns the service's answer into what the result card shows.
*/

pub mod api;
pub mod error;
pub mod form;
pub mod notification;
pub mod page;
pub mod result;
pub mod submit;
pub mod tokens;

#[cfg(test)]
mod test_server;

pub use self::{
	api::{ApiClient, DEFAULT_API_URL},
	error::SubmitError,
	form::{Field, FieldError, FormState, MedicalParameters},
	notification::{Notification, NotificationKind, Notifier},
	page::PredictionPage,
	result::{render, PredictionResult, ResultCard},
	submit::{Phase, Snapshot, SubmissionController},
	tokens::{FileTokenStore, MemoryTokenStore, TokenStore, TOKEN_KEY},
};
