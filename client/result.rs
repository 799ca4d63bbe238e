use serde::{Deserialize, Serialize};

pub const DISCLAIMER: &str = "This prediction is based on the provided medical parameters and should not be considered as medical advice. Please consult with a healthcare professional.";

/// The body of a successful response from the prediction service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
	pub prediction: f64,
	pub probability: f64,
	pub risk_level: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RiskLevel {
	Low,
	Medium,
	High,
	Unknown,
}

impl RiskLevel {
	/// Risk levels are matched case insensitively. Anything unrecognized is `Unknown`, never an error.
	pub fn parse(risk_level: &str) -> RiskLevel {
		match risk_level.to_lowercase().as_str() {
			"low" => RiskLevel::Low,
			"medium" => RiskLevel::Medium,
			"high" => RiskLevel::High,
			_ => RiskLevel::Unknown,
		}
	}

	pub fn presentation(self) -> RiskPresentation {
		let (tone, icon) = match self {
			RiskLevel::Low => (Tone::Green, '✓'),
			RiskLevel::Medium => (Tone::Yellow, '⚠'),
			RiskLevel::High => (Tone::Red, '!'),
			RiskLevel::Unknown => (Tone::Gray, '?'),
		};
		RiskPresentation {
			background_tone: tone,
			border_tone: tone,
			text_tone: tone,
			icon,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tone {
	Green,
	Yellow,
	Red,
	Gray,
}

impl Tone {
	fn name(self) -> &'static str {
		match self {
			Tone::Green => "green",
			Tone::Yellow => "yellow",
			Tone::Red => "red",
			Tone::Gray => "gray",
		}
	}

	pub fn background_class(self) -> String {
		format!("bg-{}-50", self.name())
	}

	pub fn border_class(self) -> String {
		format!("border-{}-200", self.name())
	}

	pub fn text_class(self) -> String {
		format!("text-{}-700", self.name())
	}

	pub fn fill_class(self) -> String {
		format!("bg-{}-500", self.name())
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RiskPresentation {
	pub background_tone: Tone,
	pub border_tone: Tone,
	pub text_tone: Tone,
	pub icon: char,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Gauge {
	pub percentage: i64,
	pub tone: Tone,
}

impl Gauge {
	/// The gauge tone depends only on the percentage: green below 50, yellow below 75, red otherwise.
	pub fn new(probability: f64) -> Gauge {
		let percentage = (probability * 100.0).round() as i64;
		let tone = if percentage < 50 {
			Tone::Green
		} else if percentage < 75 {
			Tone::Yellow
		} else {
			Tone::Red
		};
		Gauge { percentage, tone }
	}
}

/// Everything needed to draw the result card.
#[derive(Clone, Debug, PartialEq)]
pub struct ResultCard {
	pub risk_level: RiskLevel,
	pub risk_label: String,
	pub presentation: RiskPresentation,
	pub gauge: Gauge,
	pub prediction_label: &'static str,
}

pub fn render(result: &PredictionResult) -> ResultCard {
	let risk_level = RiskLevel::parse(&result.risk_level);
	let risk_label = match risk_level {
		RiskLevel::Low => "Low".to_owned(),
		RiskLevel::Medium => "Medium".to_owned(),
		RiskLevel::High => "High".to_owned(),
		RiskLevel::Unknown => result.risk_level.clone(),
	};
	let prediction_label = if result.prediction == 0.0 {
		"Negative"
	} else {
		"Positive"
	};
	ResultCard {
		risk_level,
		risk_label,
		presentation: risk_level.presentation(),
		gauge: Gauge::new(result.probability),
		prediction_label,
	}
}

#[test]
fn test_gauge() {
	assert_eq!(
		Gauge::new(0.873),
		Gauge {
			percentage: 87,
			tone: Tone::Red
		}
	);
	assert_eq!(Gauge::new(0.494).tone, Tone::Green);
	assert_eq!(Gauge::new(0.5).tone, Tone::Yellow);
	assert_eq!(Gauge::new(0.74).tone, Tone::Yellow);
	assert_eq!(Gauge::new(0.75).tone, Tone::Red);
	assert_eq!(Gauge::new(0.0).percentage, 0);
	assert_eq!(Gauge::new(1.0).percentage, 100);
}

#[test]
fn test_risk_level_is_case_insensitive() {
	for risk_level in &["high", "HIGH", "High", "hIgH"] {
		let card = render(&PredictionResult {
			prediction: 1.0,
			probability: 0.9,
			risk_level: risk_level.to_string(),
		});
		assert_eq!(card.risk_level, RiskLevel::High);
		assert_eq!(card.risk_label, "High");
		assert_eq!(card.presentation.text_tone, Tone::Red);
		assert_eq!(card.presentation.icon, '!');
	}
}

#[test]
fn test_unknown_risk_level_falls_back_to_gray() {
	let card = render(&PredictionResult {
		prediction: 0.0,
		probability: 0.1,
		risk_level: "elevated".to_owned(),
	});
	assert_eq!(card.risk_label, "elevated");
	assert_eq!(
		card.presentation,
		RiskPresentation {
			background_tone: Tone::Gray,
			border_tone: Tone::Gray,
			text_tone: Tone::Gray,
			icon: '?',
		}
	);
	assert_eq!(card.prediction_label, "Negative");
}

#[test]
fn test_render() {
	let card = render(&PredictionResult {
		prediction: 1.0,
		probability: 0.82,
		risk_level: "high".to_owned(),
	});
	insta::assert_debug_snapshot!(card, @r###"
 ResultCard {
     risk_level: High,
     risk_label: "High",
     presentation: RiskPresentation {
         background_tone: Red,
         border_tone: Red,
         text_tone: Red,
         icon: '!',
     },
     gauge: Gauge {
         percentage: 82,
         tone: Red,
     },
     prediction_label: "Positive",
 }
 "###);
}

#[test]
fn test_tone_classes() {
	assert_eq!(Tone::Yellow.background_class(), "bg-yellow-50");
	assert_eq!(Tone::Yellow.border_class(), "border-yellow-200");
	assert_eq!(Tone::Yellow.text_class(), "text-yellow-700");
	assert_eq!(Tone::Green.fill_class(), "bg-green-500");
}
