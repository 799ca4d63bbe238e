use derive_more::{Display, Error};
use heart_deps::lexical;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The thirteen medical parameters sent to the prediction service. Field names match the keys the service expects.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MedicalParameters {
	pub age: f64,
	pub sex: f64,
	pub cp: f64,
	pub trestbps: f64,
	pub chol: f64,
	pub fbs: f64,
	pub restecg: f64,
	pub thalach: f64,
	pub exang: f64,
	pub oldpeak: f64,
	pub slope: f64,
	pub ca: f64,
	pub thal: f64,
}

impl Default for MedicalParameters {
	fn default() -> MedicalParameters {
		MedicalParameters {
			age: 50.0,
			sex: 1.0,
			cp: 1.0,
			trestbps: 120.0,
			chol: 200.0,
			fbs: 0.0,
			restecg: 0.0,
			thalach: 100.0,
			exang: 0.0,
			oldpeak: 0.0,
			slope: 1.0,
			ca: 0.0,
			thal: 3.0,
		}
	}
}

impl MedicalParameters {
	pub fn get(&self, field: Field) -> f64 {
		match field {
			Field::Age => self.age,
			Field::Sex => self.sex,
			Field::ChestPainType => self.cp,
			Field::RestingBloodPressure => self.trestbps,
			Field::Cholesterol => self.chol,
			Field::FastingBloodSugar => self.fbs,
			Field::RestingEcg => self.restecg,
			Field::MaxHeartRate => self.thalach,
			Field::ExerciseAngina => self.exang,
			Field::StDepression => self.oldpeak,
			Field::StSlope => self.slope,
			Field::MajorVessels => self.ca,
			Field::Thalassemia => self.thal,
		}
	}

	pub fn set(&mut self, field: Field, value: f64) {
		let slot = match field {
			Field::Age => &mut self.age,
			Field::Sex => &mut self.sex,
			Field::ChestPainType => &mut self.cp,
			Field::RestingBloodPressure => &mut self.trestbps,
			Field::Cholesterol => &mut self.chol,
			Field::FastingBloodSugar => &mut self.fbs,
			Field::RestingEcg => &mut self.restecg,
			Field::MaxHeartRate => &mut self.thalach,
			Field::ExerciseAngina => &mut self.exang,
			Field::StDepression => &mut self.oldpeak,
			Field::StSlope => &mut self.slope,
			Field::MajorVessels => &mut self.ca,
			Field::Thalassemia => &mut self.thal,
		};
		*slot = value;
	}

	/// Check that every field holds a finite number and that every categorical field holds one of its options. All failing fields are reported, in form order.
	pub fn validate(&self) -> Result<(), Vec<FieldError>> {
		let errors: Vec<FieldError> = Field::ALL
			.iter()
			.filter_map(|field| field.check(self.get(*field)).err())
			.collect();
		if errors.is_empty() {
			Ok(())
		} else {
			Err(errors)
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
	Age,
	Sex,
	ChestPainType,
	RestingBloodPressure,
	Cholesterol,
	FastingBloodSugar,
	RestingEcg,
	MaxHeartRate,
	ExerciseAngina,
	StDepression,
	StSlope,
	MajorVessels,
	Thalassemia,
}

/// How a field is presented to the user. Number bounds are hints for the input, they are not enforced.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Input {
	Number { min: f64, max: f64, step: f64 },
	Select(&'static [(f64, &'static str)]),
}

const NO_YES: &[(f64, &str)] = &[(0.0, "No"), (1.0, "Yes")];

impl Field {
	pub const ALL: [Field; 13] = [
		Field::Age,
		Field::Sex,
		Field::ChestPainType,
		Field::RestingBloodPressure,
		Field::Cholesterol,
		Field::FastingBloodSugar,
		Field::RestingEcg,
		Field::MaxHeartRate,
		Field::ExerciseAngina,
		Field::StDepression,
		Field::StSlope,
		Field::MajorVessels,
		Field::Thalassemia,
	];

	pub fn key(self) -> &'static str {
		match self {
			Field::Age => "age",
			Field::Sex => "sex",
			Field::ChestPainType => "cp",
			Field::RestingBloodPressure => "trestbps",
			Field::Cholesterol => "chol",
			Field::FastingBloodSugar => "fbs",
			Field::RestingEcg => "restecg",
			Field::MaxHeartRate => "thalach",
			Field::ExerciseAngina => "exang",
			Field::StDepression => "oldpeak",
			Field::StSlope => "slope",
			Field::MajorVessels => "ca",
			Field::Thalassemia => "thal",
		}
	}

	pub fn label(self) -> &'static str {
		match self {
			Field::Age => "Age",
			Field::Sex => "Sex",
			Field::ChestPainType => "Chest Pain Type",
			Field::RestingBloodPressure => "Resting BP (mmHg)",
			Field::Cholesterol => "Cholesterol (mg/dl)",
			Field::FastingBloodSugar => "FBS > 120 mg/dl",
			Field::RestingEcg => "Resting ECG",
			Field::MaxHeartRate => "Max Heart Rate",
			Field::ExerciseAngina => "Exercise Angina",
			Field::StDepression => "ST Depression",
			Field::StSlope => "ST Slope",
			Field::MajorVessels => "Major Vessels",
			Field::Thalassemia => "Thalassemia",
		}
	}

	pub fn input(self) -> Input {
		match self {
			Field::Age => Input::Number {
				min: 1.0,
				max: 120.0,
				step: 1.0,
			},
			Field::Sex => Input::Select(&[(0.0, "Female"), (1.0, "Male")]),
			Field::ChestPainType => Input::Select(&[
				(0.0, "Typical Angina"),
				(1.0, "Atypical Angina"),
				(2.0, "Non-anginal Pain"),
				(3.0, "Asymptomatic"),
			]),
			Field::RestingBloodPressure => Input::Number {
				min: 90.0,
				max: 200.0,
				step: 1.0,
			},
			Field::Cholesterol => Input::Number {
				min: 100.0,
				max: 400.0,
				step: 1.0,
			},
			Field::FastingBloodSugar => Input::Select(NO_YES),
			Field::RestingEcg => Input::Select(&[
				(0.0, "Normal"),
				(1.0, "ST-T Abnormality"),
				(2.0, "LV Hypertrophy"),
			]),
			Field::MaxHeartRate => Input::Number {
				min: 60.0,
				max: 220.0,
				step: 1.0,
			},
			Field::ExerciseAngina => Input::Select(NO_YES),
			Field::StDepression => Input::Number {
				min: 0.0,
				max: 10.0,
				step: 0.1,
			},
			Field::StSlope => Input::Select(&[(0.0, "Upsloping"), (1.0, "Flat"), (2.0, "Downsloping")]),
			Field::MajorVessels => Input::Select(&[(0.0, "0"), (1.0, "1"), (2.0, "2"), (3.0, "3")]),
			Field::Thalassemia => Input::Select(&[
				(3.0, "Normal"),
				(6.0, "Fixed Defect"),
				(7.0, "Reversible Defect"),
			]),
		}
	}

	fn check(self, value: f64) -> Result<(), FieldError> {
		if !value.is_finite() {
			return Err(FieldError {
				field: self,
				kind: FieldErrorKind::NotANumber,
			});
		}
		if let Input::Select(options) = self.input() {
			if !options.iter().any(|(option, _)| *option == value) {
				return Err(FieldError {
					field: self,
					kind: FieldErrorKind::NotAnOption(value),
				});
			}
		}
		Ok(())
	}
}

impl fmt::Display for Field {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.key())
	}
}

#[derive(Debug, Display, Error, PartialEq)]
#[display(fmt = "unknown field \"{}\"", key)]
pub struct UnknownField {
	#[error(not(source))]
	pub key: String,
}

impl FromStr for Field {
	type Err = UnknownField;
	fn from_str(key: &str) -> Result<Field, UnknownField> {
		Field::ALL
			.iter()
			.copied()
			.find(|field| field.key() == key)
			.ok_or_else(|| UnknownField {
				key: key.to_owned(),
			})
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldError {
	pub field: Field,
	pub kind: FieldErrorKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FieldErrorKind {
	NotANumber,
	NotAnOption(f64),
}

impl fmt::Display for FieldError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.kind {
			FieldErrorKind::NotANumber => write!(f, "{} must be a number", self.field.label()),
			FieldErrorKind::NotAnOption(_) => {
				let options = match self.field.input() {
					Input::Select(options) => options
						.iter()
						.map(|(value, _)| value.to_string())
						.collect::<Vec<_>>()
						.join(", "),
					Input::Number { .. } => String::new(),
				};
				write!(f, "{} must be one of {}", self.field.label(), options)
			}
		}
	}
}

impl std::error::Error for FieldError {}

/// The form holding the values the user typed. Updates never fail: a value that does not parse is stored as NaN and rejected later by `validate`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormState {
	record: MedicalParameters,
}

impl FormState {
	pub fn new() -> FormState {
		FormState::default()
	}

	pub fn record(&self) -> &MedicalParameters {
		&self.record
	}

	pub fn update(&mut self, field: Field, raw_value: &str) {
		let value = lexical::parse::<f64, _>(raw_value.trim()).unwrap_or(f64::NAN);
		self.record.set(field, value);
	}

	pub fn update_by_key(&mut self, key: &str, raw_value: &str) -> Result<(), UnknownField> {
		let field: Field = key.parse()?;
		self.update(field, raw_value);
		Ok(())
	}

	pub fn reset(&mut self) {
		self.record = MedicalParameters::default();
	}

	/// The text to show in the field's input. NaN shows as an empty input.
	pub fn display_value(&self, field: Field) -> String {
		let value = self.record.get(field);
		if value.is_nan() {
			String::new()
		} else {
			value.to_string()
		}
	}

	pub fn validate(&self) -> Result<MedicalParameters, Vec<FieldError>> {
		self.record.validate()?;
		Ok(self.record)
	}
}

#[test]
fn test_baseline() {
	let form = FormState::new();
	let record = form.validate().unwrap();
	assert_eq!(record.age, 50.0);
	assert_eq!(record.sex, 1.0);
	assert_eq!(record.cp, 1.0);
	assert_eq!(record.trestbps, 120.0);
	assert_eq!(record.chol, 200.0);
	assert_eq!(record.fbs, 0.0);
	assert_eq!(record.restecg, 0.0);
	assert_eq!(record.thalach, 100.0);
	assert_eq!(record.exang, 0.0);
	assert_eq!(record.oldpeak, 0.0);
	assert_eq!(record.slope, 1.0);
	assert_eq!(record.ca, 0.0);
	assert_eq!(record.thal, 3.0);
}

#[test]
fn test_update_stores_unparseable_values_as_nan() {
	let mut form = FormState::new();
	form.update(Field::Age, "63");
	form.update(Field::StDepression, " 2.3 ");
	form.update(Field::Cholesterol, "");
	form.update(Field::MaxHeartRate, "fast");
	assert_eq!(form.record().age, 63.0);
	assert_eq!(form.record().oldpeak, 2.3);
	assert!(form.record().chol.is_nan());
	assert!(form.record().thalach.is_nan());
	assert_eq!(form.display_value(Field::Age), "63");
	assert_eq!(form.display_value(Field::Cholesterol), "");
}

#[test]
fn test_validate_reports_every_bad_field() {
	let mut form = FormState::new();
	form.update(Field::Cholesterol, "");
	form.update(Field::Thalassemia, "4");
	let errors = form.validate().unwrap_err();
	assert_eq!(
		errors,
		vec![
			FieldError {
				field: Field::Cholesterol,
				kind: FieldErrorKind::NotANumber,
			},
			FieldError {
				field: Field::Thalassemia,
				kind: FieldErrorKind::NotAnOption(4.0),
			},
		]
	);
	assert_eq!(errors[0].to_string(), "Cholesterol (mg/dl) must be a number");
	assert_eq!(errors[1].to_string(), "Thalassemia must be one of 3, 6, 7");
}

#[test]
fn test_reset_restores_baseline() {
	let mut form = FormState::new();
	for field in Field::ALL.iter() {
		form.update(*field, "not a number");
	}
	assert!(form.validate().is_err());
	form.reset();
	assert_eq!(form.record(), &MedicalParameters::default());
}

#[test]
fn test_update_by_key() {
	let mut form = FormState::new();
	form.update_by_key("trestbps", "145").unwrap();
	assert_eq!(form.record().trestbps, 145.0);
	let error = form.update_by_key("pressure", "145").unwrap_err();
	assert_eq!(error.to_string(), "unknown field \"pressure\"");
}

#[test]
fn test_serialize_uses_service_keys() {
	let value = heart_deps::serde_json::to_value(MedicalParameters::default()).unwrap();
	let keys: Vec<&str> = value.as_object().unwrap().keys().map(|k| k.as_str()).collect();
	let mut expected: Vec<&str> = Field::ALL.iter().map(|field| field.key()).collect();
	expected.sort_unstable();
	assert_eq!(keys, expected);
}
