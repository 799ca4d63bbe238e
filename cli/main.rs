//! This module contains the main entrypoint to the heart cli.

use clap::{Parser, Subcommand};
use heart_client::{
	render, ApiClient, FileTokenStore, PredictionPage, SubmissionController, TokenStore,
	DEFAULT_API_URL, TOKEN_KEY,
};
use heart_deps::{colored::Colorize, dirs, tokio, url::Url};
use heart_util::{err, error::Result};
use std::{path::PathBuf, sync::Arc};

mod render;

#[derive(Parser)]
#[clap(
	about = "Predict heart disease risk from medical parameters.",
	disable_help_subcommand = true
)]
struct Options {
	#[clap(
		long,
		env = "API_URL",
		default_value = DEFAULT_API_URL,
		help = "the base url of the prediction service"
	)]
	api_url: Url,
	#[clap(
		long,
		env = "HEART_DATA_DIR",
		help = "the directory the session token is kept in"
	)]
	data_dir: Option<PathBuf>,
	#[clap(subcommand)]
	command: Command,
}

#[derive(Subcommand)]
enum Command {
	#[clap(about = "submit the medical parameters and print the prediction")]
	#[clap(
		long_about = "submit the medical parameters and print the prediction. Every field starts at its default, pass key=value to change it. Run `heart fields` to see the keys."
	)]
	Predict {
		#[clap(value_name = "KEY=VALUE")]
		values: Vec<String>,
	},
	#[clap(about = "list the medical parameters")]
	Fields,
	#[clap(about = "manage the session token")]
	Token {
		#[clap(subcommand)]
		command: TokenCommand,
	},
	#[clap(about = "end the session")]
	Logout,
}

#[derive(Subcommand)]
enum TokenCommand {
	#[clap(about = "store a session token")]
	Set { token: String },
	#[clap(about = "remove the stored session token")]
	Clear,
	#[clap(about = "print whether a session token is stored")]
	Status,
}

fn main() {
	let options = Options::parse();
	let env = env_logger::Env::default().default_filter_or("heart_client=error");
	env_logger::Builder::from_env(env)
		.format_level(false)
		.format_module_path(false)
		.format_timestamp(None)
		.init();
	let result = match &options.command {
		Command::Predict { values } => cli_predict(&options, values),
		Command::Fields => cli_fields(),
		Command::Token { command } => cli_token(&options, command),
		Command::Logout => cli_logout(&options),
	};
	if let Err(error) = result {
		eprintln!("{}: {}", "error".red().bold(), error);
		std::process::exit(1);
	}
}

fn cli_predict(options: &Options, values: &[String]) -> Result<()> {
	let controller = controller(options)?.with_listener(|snapshot| {
		if snapshot.is_loading() {
			eprintln!("Analyzing medical parameters...");
		}
	});
	let mut page = PredictionPage::new(controller);
	for value in values {
		let (key, raw_value) = parse_assignment(value)?;
		page.update(key, raw_value)?;
	}
	if let Err(errors) = page.form().validate() {
		for error in errors.iter() {
			eprintln!("{}: {}", "invalid".red().bold(), error);
		}
		return Err(err!("{} invalid field(s)", errors.len()));
	}
	let outcome = runtime()?.block_on(page.submit());
	let snapshot = page.controller().snapshot();
	if let Some(result) = snapshot.result.as_ref() {
		print!("{}", render::result_card(&render(result)));
	}
	if let Some(notification) = snapshot.notification.as_ref() {
		eprintln!("{}", render::notification(notification));
	}
	match outcome {
		Ok(_) => Ok(()),
		Err(_) => Err(err!("prediction failed")),
	}
}

fn cli_fields() -> Result<()> {
	print!("{}", render::fields());
	Ok(())
}

fn cli_token(options: &Options, command: &TokenCommand) -> Result<()> {
	let tokens = token_store(options)?;
	match command {
		TokenCommand::Set { token } => {
			let token = token.trim();
			if token.is_empty() {
				return Err(err!("the token must not be empty"));
			}
			tokens.set(TOKEN_KEY, token)?;
			eprintln!("Stored the session token in {}.", tokens.dir().display());
		}
		TokenCommand::Clear => {
			tokens.remove(TOKEN_KEY)?;
			eprintln!("Removed the session token.");
		}
		TokenCommand::Status => {
			if tokens.get(TOKEN_KEY).is_some() {
				println!("logged in");
			} else {
				println!("not logged in");
			}
		}
	}
	Ok(())
}

fn cli_logout(options: &Options) -> Result<()> {
	let controller = controller(options)?;
	runtime()?.block_on(controller.logout())?;
	eprintln!("Logged out.");
	Ok(())
}

fn controller(options: &Options) -> Result<SubmissionController> {
	let api = ApiClient::new(options.api_url.clone())?;
	let tokens: Arc<dyn TokenStore> = Arc::new(token_store(options)?);
	Ok(SubmissionController::new(api, tokens))
}

fn token_store(options: &Options) -> Result<FileTokenStore> {
	let dir = match options.data_dir.as_ref() {
		Some(dir) => dir.clone(),
		None => default_data_dir()?,
	};
	Ok(FileTokenStore::new(dir))
}

fn default_data_dir() -> Result<PathBuf> {
	let data_dir = dirs::data_dir().ok_or_else(|| err!("failed to find user data directory"))?;
	Ok(data_dir.join("heart"))
}

fn runtime() -> Result<tokio::runtime::Runtime> {
	let runtime = tokio::runtime::Builder::new()
		.basic_scheduler()
		.enable_all()
		.build()?;
	Ok(runtime)
}

/// Split a `key=value` argument. The value may be empty, in which case the field fails validation.
fn parse_assignment(argument: &str) -> Result<(&str, &str)> {
	let index = argument
		.find('=')
		.ok_or_else(|| err!("expected key=value, got \"{}\"", argument))?;
	let key = argument[..index].trim();
	if key.is_empty() {
		return Err(err!("expected key=value, got \"{}\"", argument));
	}
	Ok((key, &argument[index + 1..]))
}

#[test]
fn test_parse_assignment() {
	assert_eq!(parse_assignment("age=67").unwrap(), ("age", "67"));
	assert_eq!(parse_assignment("oldpeak=2.3").unwrap(), ("oldpeak", "2.3"));
	assert_eq!(parse_assignment(" ca =1").unwrap(), ("ca", "1"));
	assert_eq!(parse_assignment("age=").unwrap(), ("age", ""));
	assert!(parse_assignment("age").is_err());
	assert!(parse_assignment("=67").is_err());
}

#[test]
fn test_options() {
	let options = Options::try_parse_from(&[
		"heart",
		"--api-url",
		"http://example.com:8000",
		"predict",
		"age=67",
		"thal=7",
	])
	.unwrap();
	assert_eq!(options.api_url.as_str(), "http://example.com:8000/");
	match options.command {
		Command::Predict { values } => assert_eq!(values, vec!["age=67", "thal=7"]),
		_ => panic!("expected the predict command"),
	}
	let options = Options::try_parse_from(&["heart", "token", "set", "abc"]).unwrap();
	assert!(matches!(
		options.command,
		Command::Token {
			command: TokenCommand::Set { ref token }
		} if token == "abc"
	));
}
