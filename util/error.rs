/// A boxed error that any error type with a static lifetime can be converted into with `?`.
pub type Error = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Create an `Error` from a format string, like `format!`.
#[macro_export]
macro_rules! err {
	($($arg:tt)*) => {
		$crate::error::Error::from(format!($($arg)*))
	};
}

#[test]
fn test_err() {
	let error = err!("failed to read {}", "token");
	assert_eq!(error.to_string(), "failed to read token");
	let result: Result<()> = Err(std::io::Error::new(std::io::ErrorKind::Other, "disk").into());
	assert_eq!(result.unwrap_err().to_string(), "disk");
}
