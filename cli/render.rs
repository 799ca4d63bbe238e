use heart_client::{
	form::{Field, Input},
	result::{Gauge, ResultCard, Tone, DISCLAIMER},
	Notification, NotificationKind,
};
use heart_deps::colored::{ColoredString, Colorize};
use std::fmt::Write;

const GAUGE_WIDTH: usize = 40;

fn paint(text: &str, tone: Tone) -> ColoredString {
	match tone {
		Tone::Green => text.green(),
		Tone::Yellow => text.yellow(),
		Tone::Red => text.red(),
		Tone::Gray => text.bright_black(),
	}
}

/// Draw a gauge as a bar of `width` cells, filled in proportion to the percentage.
pub fn gauge_bar(gauge: &Gauge, width: usize) -> String {
	let percentage = gauge.percentage.max(0).min(100) as usize;
	let filled = (percentage * width + 50) / 100;
	let bar = format!("{}{}", "█".repeat(filled), "░".repeat(width - filled));
	paint(&bar, gauge.tone).to_string()
}

pub fn result_card(card: &ResultCard) -> String {
	let presentation = card.presentation;
	let mut output = String::new();
	writeln!(
		output,
		"{} {}",
		paint(&presentation.icon.to_string(), presentation.text_tone).bold(),
		"Risk Assessment".bold()
	)
	.unwrap();
	writeln!(
		output,
		"  {}",
		paint(&card.risk_label, presentation.text_tone).bold()
	)
	.unwrap();
	writeln!(output, "  Probability: {}%", card.gauge.percentage).unwrap();
	writeln!(output).unwrap();
	writeln!(
		output,
		"{:<width$}{:>4}",
		"Confidence Level",
		format!("{}%", card.gauge.percentage),
		width = GAUGE_WIDTH - 4
	)
	.unwrap();
	writeln!(output, "{}", gauge_bar(&card.gauge, GAUGE_WIDTH)).unwrap();
	writeln!(output).unwrap();
	writeln!(output, "{:<20}{}", "Prediction Result", card.prediction_label).unwrap();
	writeln!(
		output,
		"{:<20}{}",
		"Risk Level",
		paint(&card.risk_label, presentation.text_tone)
	)
	.unwrap();
	writeln!(output).unwrap();
	writeln!(output, "{}", DISCLAIMER.dimmed()).unwrap();
	output
}

pub fn notification(notification: &Notification) -> String {
	match notification.kind {
		NotificationKind::Success => format!("{} {}", "✓".green().bold(), notification.message),
		NotificationKind::Error => format!("{} {}", "✕".red().bold(), notification.message),
	}
}

/// One line per field: key, label, default and what the field accepts.
pub fn fields() -> String {
	let defaults = heart_client::MedicalParameters::default();
	let mut output = String::new();
	for field in Field::ALL.iter().copied() {
		let accepts = match field.input() {
			Input::Number { min, max, step } => format!("{} to {} by {}", min, max, step),
			Input::Select(options) => options
				.iter()
				.map(|(value, label)| format!("{} {}", value, label))
				.collect::<Vec<_>>()
				.join(", "),
		};
		writeln!(
			output,
			"{}{:<36}{:<8}{}",
			format!("{:<10}", field.key()).bold(),
			field.label(),
			defaults.get(field),
			accepts
		)
		.unwrap();
	}
	output
}

#[cfg(test)]
use heart_client::{render, PredictionResult};

#[cfg(test)]
fn plain() {
	heart_deps::colored::control::set_override(false);
}

#[test]
fn test_gauge_bar() {
	plain();
	let bar = |percentage| {
		gauge_bar(
			&Gauge {
				percentage,
				tone: Tone::Red,
			},
			10,
		)
	};
	assert_eq!(bar(0), "░░░░░░░░░░");
	assert_eq!(bar(82), "████████░░");
	assert_eq!(bar(100), "██████████");
	assert_eq!(bar(130), "██████████");
}

#[test]
fn test_result_card() {
	plain();
	let card = render(&PredictionResult {
		prediction: 1.0,
		probability: 0.82,
		risk_level: "high".to_owned(),
	});
	insta::assert_snapshot!(result_card(&card), @r###"
 ! Risk Assessment
   High
   Probability: 82%

 Confidence Level                     82%
 █████████████████████████████████░░░░░░░

 Prediction Result   Positive
 Risk Level          High

 This prediction is based on the provided medical parameters and should not be considered as medical advice. Please consult with a healthcare professional.
 "###);
}

#[test]
fn test_notification() {
	plain();
	let line = notification(&Notification {
		message: "Session expired, please login again".to_owned(),
		kind: NotificationKind::Error,
	});
	assert_eq!(line, "✕ Session expired, please login again");
}
